mod constraint;
mod foreign_key;
mod keyword;
mod schema;
mod table;
mod table_column;
#[cfg(all(test, feature = "pg_tests"))]
mod tests;

use crate::ddl_query_builder::DdlQueryBuilder;
use crate::models::*;
use crate::postgres_client_wrapper::PostgresClientWrapper;
use crate::quoting::IdentifierQuoter;
use crate::Result;
use std::collections::HashMap;
use tracing::{instrument, warn};

/// Reads table structure from the system catalogs.
///
/// Every lookup goes to the database, nothing is cached between calls.
pub struct CatalogReader<'a> {
    connection: &'a PostgresClientWrapper,
}

impl CatalogReader<'_> {
    pub fn new(connection: &PostgresClientWrapper) -> CatalogReader {
        CatalogReader { connection }
    }

    /// Builds an [`IdentifierQuoter`] knowing the keywords of the connected server.
    #[instrument(skip_all)]
    pub async fn load_identifier_quoter(&self) -> Result<IdentifierQuoter> {
        let keywords = self.get_keywords().await?;

        let keywords: HashMap<_, _> = keywords
            .into_iter()
            .map(|k| (k.word, k.category.allowed_usage()))
            .collect();

        Ok(IdentifierQuoter::new(keywords))
    }

    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        Ok(self.get_schemas().await?.into_iter().map(|s| s.name).collect())
    }

    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        Ok(self
            .get_tables(schema)
            .await?
            .into_iter()
            .map(|t| t.table_name)
            .collect())
    }

    pub async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(self
            .get_columns(schema, table)
            .await?
            .iter()
            .map(|c| c.to_column_descriptor())
            .collect())
    }

    /// The primary key columns in key order, empty when no primary key is declared.
    pub async fn primary_key(&self, schema: &str, table: &str) -> Result<Vec<String>> {
        Ok(self
            .get_primary_key_columns(schema, table)
            .await?
            .into_iter()
            .map(|c| c.column_name)
            .collect())
    }

    /// The column used to address single rows of the table.
    pub async fn row_key(&self, schema: &str, table: &str) -> Result<RowKey> {
        let primary_key = self.primary_key(schema, table).await?;

        RowKey::from_primary_key(schema, table, primary_key)
    }

    /// The single column foreign key declared on `column`, if any.
    pub async fn find_foreign_key(&self, schema: &str, table: &str, column: &str) -> Result<Option<ForeignKeyDescriptor>> {
        let foreign_keys = self.get_foreign_keys_for_column(schema, table, column).await?;

        Ok(foreign_keys.into_iter().next().map(ForeignKeyDescriptor::from))
    }

    /// A `create table` statement for the table, or an empty string if it cannot be produced.
    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn table_definition(&self, quoter: &IdentifierQuoter, schema: &str, table: &str) -> String {
        match self.build_table_definition(quoter, schema, table).await {
            Ok(Some(ddl)) => ddl,
            Ok(None) => {
                warn!("Table {}.{} does not exist, no definition available", schema, table);
                String::new()
            }
            Err(e) => {
                warn!(kind = ?e.kind(), "Failed to build table definition: {}", e.user_message());
                String::new()
            }
        }
    }

    async fn build_table_definition(&self, quoter: &IdentifierQuoter, schema: &str, table: &str) -> Result<Option<String>> {
        let (columns, constraints) = futures::try_join!(
            self.list_columns(schema, table),
            self.get_constraint_definitions(schema, table)
        )?;

        if columns.is_empty() {
            return Ok(None);
        }

        let mut builder = DdlQueryBuilder::new(quoter);
        let mut table_builder = builder.create_table(schema, table)?;

        for column in &columns {
            table_builder.column_from_descriptor(column)?;
        }

        for constraint in &constraints {
            table_builder.constraint(&constraint.constraint_name, &constraint.definition)?;
        }

        Ok(Some(builder.build()))
    }
}

macro_rules! define_catalog_query {
    ($fn_name:ident, $result:ident, $query:literal, ($($param:ident: $param_type:ty),*)) => {
        impl $crate::catalog::CatalogReader<'_> {
            #[tracing::instrument(skip_all)]
            pub(in crate::catalog) async fn $fn_name(&self, $($param: $param_type),*) -> $crate::Result<Vec<$result>> {
                self.connection.get_results($query, &[$(&$param),*]).await
            }
        }
    };
}

pub(crate) use define_catalog_query;
