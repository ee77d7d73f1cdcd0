use crate::models::ColumnDescriptor;
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter};
use crate::Result;

/// Renders a `create table` statement from catalog information.
pub struct DdlQueryBuilder<'q> {
    sql: String,
    identifier_quoter: &'q IdentifierQuoter,
}

impl<'a> DdlQueryBuilder<'a> {
    pub fn new(identifier_quoter: &'a IdentifierQuoter) -> Self {
        Self {
            sql: String::new(),
            identifier_quoter,
        }
    }

    pub fn create_table(&mut self, schema: &str, table: &str) -> Result<DdlTableBuilder<'a, '_>> {
        let table = self.identifier_quoter.quote_table(schema, table)?;
        self.sql.push_str("create table ");
        self.sql.push_str(&table);
        self.sql.push_str(" (");

        Ok(DdlTableBuilder {
            query_builder: self,
            has_first_line: false,
        })
    }

    pub fn build(mut self) -> String {
        self.sql.push_str("\n);");

        self.sql
    }
}

pub struct DdlTableBuilder<'q, 'b> {
    query_builder: &'b mut DdlQueryBuilder<'q>,
    has_first_line: bool,
}

impl<'q> DdlTableBuilder<'q, '_> {
    pub fn column<'b>(&'b mut self, name: &str, data_type: &str) -> Result<DdlTableColumnBuilder<'b>> {
        let name = self
            .query_builder
            .identifier_quoter
            .quote(name, AttemptedKeywordUsage::ColumnName)?;
        self.start_new_line();
        self.query_builder
            .sql
            .push_str(&format!("    {} {}", name, data_type));

        Ok(DdlTableColumnBuilder {
            sql: &mut self.query_builder.sql,
        })
    }

    /// Adds a column as described by the catalog, including nullability and default.
    pub fn column_from_descriptor(&mut self, column: &ColumnDescriptor) -> Result<&mut Self> {
        let mut column_builder = self.column(&column.name, &column.declared_type)?;
        if !column.is_nullable {
            column_builder.not_null();
        }
        if let Some(default_expr) = &column.default_expr {
            column_builder.default(default_expr);
        }

        Ok(self)
    }

    /// Adds a named constraint. `definition` is the constraint body as `pg_get_constraintdef` renders it.
    pub fn constraint(&mut self, name: &str, definition: &str) -> Result<&mut Self> {
        let name = self
            .query_builder
            .identifier_quoter
            .quote(name, AttemptedKeywordUsage::Other)?;
        self.start_new_line();
        self.query_builder
            .sql
            .push_str(&format!("    constraint {} {}", name, definition));

        Ok(self)
    }

    fn start_new_line(&mut self) {
        if self.has_first_line {
            self.query_builder.sql.push_str(",\n")
        } else {
            self.query_builder.sql.push('\n');
            self.has_first_line = true;
        }
    }
}

pub struct DdlTableColumnBuilder<'a> {
    sql: &'a mut String,
}

impl DdlTableColumnBuilder<'_> {
    pub fn not_null(&mut self) -> &mut Self {
        self.sql.push_str(" not null");

        self
    }

    pub fn default(&mut self, expression: &str) -> &mut Self {
        self.sql.push_str(" default ");
        self.sql.push_str(expression);

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TablescopeError;
    use indoc::indoc;

    #[test]
    fn builds_create_table_expression() {
        let quoter = IdentifierQuoter::empty();
        let mut builder = DdlQueryBuilder::new(&quoter);
        let mut table_builder = builder.create_table("public", "my_table").unwrap();
        table_builder.column("id", "integer").unwrap().not_null().default("nextval('my_table_id_seq'::regclass)");
        table_builder.column("name", "character varying(255)").unwrap();
        table_builder.constraint("my_table_pkey", "PRIMARY KEY (id)").unwrap();
        let result = builder.build();

        assert_eq!(
            result,
            indoc! {r#"
        create table public.my_table (
            id integer not null default nextval('my_table_id_seq'::regclass),
            name character varying(255),
            constraint my_table_pkey PRIMARY KEY (id)
        );"#}
        );
    }

    #[test]
    fn columns_from_descriptors() {
        let quoter = IdentifierQuoter::empty();
        let mut builder = DdlQueryBuilder::new(&quoter);
        let mut table_builder = builder.create_table("Sales", "Order").unwrap();
        table_builder
            .column_from_descriptor(&ColumnDescriptor {
                name: "Total".to_string(),
                declared_type: "numeric(10,2)".to_string(),
                udt_name: "numeric".to_string(),
                is_nullable: false,
                default_expr: Some("0".to_string()),
                ordinal_position: 1,
            })
            .unwrap()
            .constraint("positive_total", r#"CHECK (("Total" >= (0)::numeric))"#)
            .unwrap();
        let result = builder.build();

        assert_eq!(
            result,
            indoc! {r#"
        create table "Sales"."Order" (
            "Total" numeric(10,2) not null default 0,
            constraint positive_total CHECK (("Total" >= (0)::numeric))
        );"#}
        );
    }

    #[test]
    fn rejects_invalid_names() {
        let quoter = IdentifierQuoter::empty();
        let mut builder = DdlQueryBuilder::new(&quoter);

        assert!(matches!(
            builder.create_table("public", ""),
            Err(TablescopeError::InvalidIdentifier { .. })
        ));
    }
}
