use crate::models::{
    ColumnDescriptor, DatabaseValue, FilterSpec, ForeignKeyDescriptor, OperatorKind, Pagination,
    PatternMatching, RecordValues, SortDirection, SortSpec, CONVENTIONAL_KEY_COLUMN,
};
use crate::quoting::{AttemptedKeywordUsage, IdentifierQuoter};
use crate::{Result, TablescopeError};
use itertools::Itertools;
use tokio_postgres::types::ToSql;

/// Incrementally builds a statement, keeping SQL text and bound values apart.
///
/// Identifiers only ever enter the text through [`IdentifierQuoter`], and values only ever
/// as `$n` placeholders with the value itself in [`BuiltQuery::params`].
pub struct QueryBuilder<'q> {
    sql: String,
    params: Vec<DatabaseValue>,
    identifier_quoter: &'q IdentifierQuoter,
}

/// A finished statement and the values for its placeholders, in order.
#[derive(Debug, Eq, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

impl BuiltQuery {
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

/// How rows are ordered when the caller did not ask for a sort.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DefaultOrder {
    /// Newest first by the given key column.
    KeyDescending(String),
    /// The physical row location. Stable as long as the table is not modified.
    PhysicalLocation,
}

impl DefaultOrder {
    /// Prefers a single column primary key, then a column named `id`, then the physical location.
    pub fn for_table(primary_key: &[String], columns: &[ColumnDescriptor]) -> Self {
        match primary_key {
            [key] => DefaultOrder::KeyDescending(key.clone()),
            _ if columns.iter().any(|c| c.name == CONVENTIONAL_KEY_COLUMN) => {
                DefaultOrder::KeyDescending(CONVENTIONAL_KEY_COLUMN.to_string())
            }
            _ => DefaultOrder::PhysicalLocation,
        }
    }
}

impl<'q> QueryBuilder<'q> {
    pub fn new(identifier_quoter: &'q IdentifierQuoter) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            identifier_quoter,
        }
    }

    pub fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn push_column(&mut self, column: &str) -> Result<&mut Self> {
        let quoted = self
            .identifier_quoter
            .quote(column, AttemptedKeywordUsage::ColumnName)?;
        self.sql.push_str(&quoted);
        Ok(self)
    }

    pub fn push_table(&mut self, schema: &str, table: &str) -> Result<&mut Self> {
        let quoted = self.identifier_quoter.quote_table(schema, table)?;
        self.sql.push_str(&quoted);
        Ok(self)
    }

    /// Binds a value and writes its placeholder.
    pub fn push_value(&mut self, value: impl Into<DatabaseValue>) -> &mut Self {
        self.params.push(value.into());
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
        self
    }

    /// Binds a value meant for `column`.
    ///
    /// Values for columns of a type [`DatabaseValue`] cannot encode are sent as text and cast
    /// by the server, using the type as the catalog declares it.
    pub fn push_value_for(&mut self, value: impl Into<DatabaseValue>, column: Option<&ColumnDescriptor>) -> &mut Self {
        match column {
            Some(column) if !column.is_natively_decoded() => self
                .push_sql("cast(")
                .push_value(value)
                .push_sql("::text as ")
                .push_sql(&column.declared_type)
                .push_sql(")"),
            _ => self.push_value(value),
        }
    }

    /// Writes the select list for the columns.
    ///
    /// Columns that [`DatabaseValue`] cannot decode directly are cast to text under their own name.
    /// Without any known columns this falls back to `*`.
    pub fn push_projection(&mut self, columns: &[ColumnDescriptor]) -> Result<&mut Self> {
        if columns.is_empty() {
            self.sql.push('*');
            return Ok(self);
        }

        let items = columns
            .iter()
            .map(|c| {
                let name = self
                    .identifier_quoter
                    .quote(&c.name, AttemptedKeywordUsage::ColumnName)?;
                Ok(if c.is_natively_decoded() {
                    name
                } else {
                    format!("{name}::text as {name}")
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.sql.push_str(&items.iter().join(", "));
        Ok(self)
    }

    /// Writes the where clause for the filter, or nothing without a filter.
    pub fn push_filter(
        &mut self,
        filter: Option<&FilterSpec>,
        columns: &[ColumnDescriptor],
        pattern_matching: PatternMatching,
    ) -> Result<&mut Self> {
        let Some(filter) = filter else {
            return Ok(self);
        };

        let column = find_column(columns, &filter.column);

        self.push_sql(" where ").push_column(&filter.column)?;

        let comparison = match filter.operator {
            OperatorKind::Equals => " = ",
            OperatorKind::NotEquals => " != ",
            OperatorKind::GreaterThan => " > ",
            OperatorKind::GreaterOrEqual => " >= ",
            OperatorKind::LessThan => " < ",
            OperatorKind::LessOrEqual => " <= ",
            OperatorKind::Contains | OperatorKind::StartsWith | OperatorKind::EndsWith => {
                let escaped = escape_like_pattern(&filter.value);
                let pattern = match filter.operator {
                    OperatorKind::Contains => format!("%{escaped}%"),
                    OperatorKind::StartsWith => format!("{escaped}%"),
                    _ => format!("%{escaped}"),
                };
                self.push_pattern_match(pattern, pattern_matching);
                return Ok(self);
            }
        };

        self.push_sql(comparison).push_value_for(filter.value.as_str(), column);
        Ok(self)
    }

    /// Expects the column to already be written.
    fn push_pattern_match(&mut self, pattern: String, pattern_matching: PatternMatching) -> &mut Self {
        self.push_sql("::text ")
            .push_sql(pattern_matching.operator())
            .push_sql(" ")
            .push_value(pattern)
            .push_sql(r" escape '\'")
    }

    /// Writes the order by clause for rows of `schema.table`.
    ///
    /// Columns are qualified with the table, so they refer to the stored value and not to a
    /// text cast of the same name in the projection. The default order always ends the clause,
    /// which keeps pages of a sort with ties from overlapping.
    pub fn push_order_by(
        &mut self,
        schema: &str,
        table: &str,
        sort: Option<&SortSpec>,
        default_order: &DefaultOrder,
    ) -> Result<&mut Self> {
        self.push_sql(" order by ");

        if let Some(sort) = sort {
            self.push_qualified_column(schema, table, &sort.column)?
                .push_sql(" ")
                .push_sql(sort.direction.keyword());

            if matches!(default_order, DefaultOrder::KeyDescending(key) if *key == sort.column) {
                return Ok(self);
            }

            self.push_sql(", ");
        }

        let tiebreaker = match default_order {
            DefaultOrder::KeyDescending(column) => self.push_qualified_column(schema, table, column)?,
            DefaultOrder::PhysicalLocation => self.push_table(schema, table)?.push_sql(".ctid"),
        };
        tiebreaker
            .push_sql(" ")
            .push_sql(SortDirection::Descending.keyword());

        Ok(self)
    }

    fn push_qualified_column(&mut self, schema: &str, table: &str, column: &str) -> Result<&mut Self> {
        self.push_table(schema, table)?.push_sql(".").push_column(column)
    }

    pub fn push_pagination(&mut self, pagination: &Pagination) -> &mut Self {
        self.push_sql(" limit ")
            .push_value(pagination.limit())
            .push_sql(" offset ")
            .push_value(pagination.offset())
    }

    pub fn build(self) -> BuiltQuery {
        BuiltQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

fn find_column<'c>(columns: &'c [ColumnDescriptor], name: &str) -> Option<&'c ColumnDescriptor> {
    columns.iter().find(|c| c.name == name)
}

/// Escapes the characters `like` treats specially, so the value only ever matches literally.
pub(crate) fn escape_like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Where a statement runs, and what is known about the columns there.
pub(crate) struct TableTarget<'t> {
    pub schema: &'t str,
    pub table: &'t str,
    pub columns: &'t [ColumnDescriptor],
}

pub(crate) fn count_query(
    quoter: &IdentifierQuoter,
    target: &TableTarget,
    filter: Option<&FilterSpec>,
    pattern_matching: PatternMatching,
) -> Result<BuiltQuery> {
    let mut builder = QueryBuilder::new(quoter);
    builder
        .push_sql("select count(*) from ")
        .push_table(target.schema, target.table)?
        .push_filter(filter, target.columns, pattern_matching)?;
    Ok(builder.build())
}

pub(crate) fn page_query(
    quoter: &IdentifierQuoter,
    target: &TableTarget,
    pagination: &Pagination,
    sort: Option<&SortSpec>,
    filter: Option<&FilterSpec>,
    default_order: &DefaultOrder,
    pattern_matching: PatternMatching,
) -> Result<BuiltQuery> {
    let mut builder = QueryBuilder::new(quoter);
    builder
        .push_sql("select ")
        .push_projection(target.columns)?
        .push_sql(" from ")
        .push_table(target.schema, target.table)?
        .push_filter(filter, target.columns, pattern_matching)?
        .push_order_by(target.schema, target.table, sort, default_order)?
        .push_pagination(pagination);
    Ok(builder.build())
}

pub(crate) fn insert_query(quoter: &IdentifierQuoter, target: &TableTarget, values: &RecordValues) -> Result<BuiltQuery> {
    let mut builder = QueryBuilder::new(quoter);
    builder.push_sql("insert into ").push_table(target.schema, target.table)?;

    if values.is_empty() {
        builder.push_sql(" default values");
    } else {
        builder.push_sql(" (");
        for (idx, column) in values.columns().enumerate() {
            if idx > 0 {
                builder.push_sql(", ");
            }
            builder.push_column(column)?;
        }
        builder.push_sql(") values (");
        for (idx, (column, value)) in values.iter().enumerate() {
            if idx > 0 {
                builder.push_sql(", ");
            }
            builder.push_value_for(value.clone(), find_column(target.columns, column));
        }
        builder.push_sql(")");
    }

    builder.push_sql(" returning ").push_projection(target.columns)?;
    Ok(builder.build())
}

pub(crate) fn update_query(
    quoter: &IdentifierQuoter,
    target: &TableTarget,
    key_column: &str,
    id: &DatabaseValue,
    values: &RecordValues,
) -> Result<BuiltQuery> {
    let mut assignments = values.iter().filter(|(column, _)| *column != key_column).peekable();

    if assignments.peek().is_none() {
        return Err(TablescopeError::NothingToUpdate {
            schema: target.schema.to_string(),
            table: target.table.to_string(),
        });
    }

    let mut builder = QueryBuilder::new(quoter);
    builder
        .push_sql("update ")
        .push_table(target.schema, target.table)?
        .push_sql(" set ");

    for (idx, (column, value)) in assignments.enumerate() {
        if idx > 0 {
            builder.push_sql(", ");
        }
        builder
            .push_column(column)?
            .push_sql(" = ")
            .push_value_for(value.clone(), find_column(target.columns, column));
    }

    builder
        .push_sql(" where ")
        .push_column(key_column)?
        .push_sql(" = ")
        .push_value_for(id.clone(), find_column(target.columns, key_column))
        .push_sql(" returning ")
        .push_projection(target.columns)?;

    Ok(builder.build())
}

/// Returns `None` for an empty id list, as there is nothing to delete.
pub(crate) fn delete_query(
    quoter: &IdentifierQuoter,
    target: &TableTarget,
    key_column: &str,
    ids: &[DatabaseValue],
) -> Result<Option<BuiltQuery>> {
    if ids.is_empty() {
        return Ok(None);
    }

    let key = find_column(target.columns, key_column);

    let mut builder = QueryBuilder::new(quoter);
    builder
        .push_sql("delete from ")
        .push_table(target.schema, target.table)?
        .push_sql(" where ")
        .push_column(key_column)?
        .push_sql(" in (");

    for (idx, id) in ids.iter().enumerate() {
        if idx > 0 {
            builder.push_sql(", ");
        }
        builder.push_value_for(id.clone(), key);
    }
    builder.push_sql(")");

    Ok(Some(builder.build()))
}

/// `columns` are the columns of the referenced table.
pub(crate) fn linked_record_query(
    quoter: &IdentifierQuoter,
    foreign_key: &ForeignKeyDescriptor,
    columns: &[ColumnDescriptor],
    value: &DatabaseValue,
) -> Result<BuiltQuery> {
    let mut builder = QueryBuilder::new(quoter);
    builder
        .push_sql("select ")
        .push_projection(columns)?
        .push_sql(" from ")
        .push_table(&foreign_key.target_schema, &foreign_key.target_table)?
        .push_sql(" where ")
        .push_column(&foreign_key.target_column)?
        .push_sql(" = ")
        .push_value_for(value.clone(), find_column(columns, &foreign_key.target_column))
        .push_sql(" limit 1");
    Ok(builder.build())
}

/// `columns` are the columns of the referenced table.
pub(crate) fn related_options_query(
    quoter: &IdentifierQuoter,
    foreign_key: &ForeignKeyDescriptor,
    columns: &[ColumnDescriptor],
    search: Option<&str>,
    limit: i64,
    pattern_matching: PatternMatching,
) -> Result<BuiltQuery> {
    let target_column = find_column(columns, &foreign_key.target_column);

    let mut builder = QueryBuilder::new(quoter);
    builder.push_sql("select distinct ").push_column(&foreign_key.target_column)?;

    if !target_column.is_some_and(|c| c.is_natively_decoded()) {
        builder.push_sql("::text");
    }

    builder
        .push_sql(" as value, ")
        .push_column(&foreign_key.target_column)?
        .push_sql("::text as label from ")
        .push_table(&foreign_key.target_schema, &foreign_key.target_table)?;

    if let Some(search) = search.filter(|s| !s.is_empty()) {
        builder
            .push_sql(" where ")
            .push_column(&foreign_key.target_column)?
            .push_pattern_match(format!("%{}%", escape_like_pattern(search)), pattern_matching);
    }

    builder.push_sql(" order by 1 limit ").push_value(limit);

    Ok(builder.build())
}
