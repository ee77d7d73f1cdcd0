use crate::models::*;
use crate::query_builder::{linked_record_query, related_options_query};
use crate::table_browser::TableBrowser;
use crate::Result;
use tracing::{debug, instrument};

impl TableBrowser<'_> {
    /// Follows the foreign key declared on `column` to the row `value` points at.
    ///
    /// Returns `None` when the column is not a single column foreign key. When it is, but the
    /// referenced row does not exist, the link is returned without a row.
    #[instrument(skip_all, fields(schema = schema, table = table, column = column))]
    pub async fn resolve_link(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        value: &DatabaseValue,
    ) -> Result<Option<LinkedRecord>> {
        let Some(foreign_key) = self.catalog.find_foreign_key(schema, table, column).await? else {
            debug!("Column is not a foreign key");
            return Ok(None);
        };

        let row = if value.is_null() {
            None
        } else {
            let columns = self
                .catalog
                .list_columns(&foreign_key.target_schema, &foreign_key.target_table)
                .await?;
            let query = linked_record_query(&self.identifier_quoter, &foreign_key, &columns, value)?;

            let rows = self
                .connection
                .query_rows(&query.sql, &query.param_refs())
                .await?;

            rows.first().map(RecordValues::from_row).transpose()?
        };

        Ok(Some(LinkedRecord {
            target_schema: foreign_key.target_schema,
            target_table: foreign_key.target_table,
            target_column: foreign_key.target_column,
            row,
        }))
    }

    /// Lists the distinct values of the column a foreign key references, to pick a new value from.
    ///
    /// `search` narrows the options to values whose text contains it. A column without a
    /// foreign key has no options.
    #[instrument(skip_all, fields(schema = schema, table = table, column = column))]
    pub async fn related_options(
        &self,
        schema: &str,
        table: &str,
        column: &str,
        search: Option<&str>,
    ) -> Result<RelatedOptions> {
        let Some(foreign_key) = self.catalog.find_foreign_key(schema, table, column).await? else {
            debug!("Column is not a foreign key");
            return Ok(RelatedOptions::default());
        };

        let columns = self
            .catalog
            .list_columns(&foreign_key.target_schema, &foreign_key.target_table)
            .await?;

        let query = related_options_query(
            &self.identifier_quoter,
            &foreign_key,
            &columns,
            search,
            i64::from(self.options.related_options_limit),
            self.options.pattern_matching,
        )?;

        let options = self
            .connection
            .get_results::<RelatedOption>(&query.sql, &query.param_refs())
            .await?;

        Ok(RelatedOptions {
            foreign_key: Some(foreign_key),
            options,
        })
    }
}
