use crate::catalog::CatalogReader;
use crate::models::*;
use crate::postgres_client_wrapper::PostgresClientWrapper;
use crate::query_builder::{
    count_query, delete_query, insert_query, page_query, update_query, DefaultOrder, TableTarget,
};
use crate::quoting::IdentifierQuoter;
use crate::{default, Result, TablescopeError};
use futures::try_join;
use tracing::{debug, instrument, warn};

/// The most options [`TableBrowser::related_options`] returns unless configured otherwise.
pub const DEFAULT_RELATED_OPTIONS_LIMIT: u32 = 100;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableBrowserOptions {
    /// Case sensitivity of `contains`, `starts_with` and `ends_with`, and of option searches.
    pub pattern_matching: PatternMatching,
    pub related_options_limit: u32,
}

impl Default for TableBrowserOptions {
    fn default() -> Self {
        Self {
            pattern_matching: PatternMatching::CaseInsensitive,
            related_options_limit: DEFAULT_RELATED_OPTIONS_LIMIT,
        }
    }
}

/// Browses and edits arbitrary tables of one database.
///
/// Holds no per-table state, every operation reads what it needs from the catalog.
/// The underlying client pipelines requests, so a single browser can be shared between tasks.
pub struct TableBrowser<'a> {
    pub(crate) connection: &'a PostgresClientWrapper,
    pub(crate) catalog: CatalogReader<'a>,
    pub(crate) identifier_quoter: IdentifierQuoter,
    pub(crate) options: TableBrowserOptions,
}

impl<'a> TableBrowser<'a> {
    pub async fn new(connection: &'a PostgresClientWrapper) -> Result<Self> {
        Self::with_options(connection, default()).await
    }

    pub async fn with_options(connection: &'a PostgresClientWrapper, options: TableBrowserOptions) -> Result<Self> {
        let catalog = CatalogReader::new(connection);
        let identifier_quoter = catalog.load_identifier_quoter().await?;

        Ok(TableBrowser {
            connection,
            catalog,
            identifier_quoter,
            options,
        })
    }

    pub fn options(&self) -> &TableBrowserOptions {
        &self.options
    }

    pub fn identifier_quoter(&self) -> &IdentifierQuoter {
        &self.identifier_quoter
    }

    #[instrument(skip_all)]
    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        self.catalog.list_schemas().await
    }

    #[instrument(skip_all, fields(schema = schema))]
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        self.catalog.list_tables(schema).await
    }

    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn list_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.catalog.list_columns(schema, table).await
    }

    /// A best-effort `create table` statement, empty when it cannot be produced.
    pub async fn table_definition(&self, schema: &str, table: &str) -> String {
        self.catalog
            .table_definition(&self.identifier_quoter, schema, table)
            .await
    }

    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn count(&self, schema: &str, table: &str, filter: Option<&FilterSpec>) -> Result<i64> {
        let columns = self.catalog.list_columns(schema, table).await?;

        self.count_rows(&TableTarget { schema, table, columns: &columns }, filter)
            .await
    }

    /// Reads one page of rows. Without a sort the rows come in the table's default order,
    /// which is the same across calls as long as the table does not change.
    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn page(
        &self,
        schema: &str,
        table: &str,
        pagination: Pagination,
        sort: Option<&SortSpec>,
        filter: Option<&FilterSpec>,
    ) -> Result<TablePage> {
        let (columns, primary_key) = try_join!(
            self.catalog.list_columns(schema, table),
            self.catalog.primary_key(schema, table)
        )?;

        let rows = self
            .read_rows(
                &TableTarget { schema, table, columns: &columns },
                &primary_key,
                &pagination,
                sort,
                filter,
            )
            .await?;

        Ok(TablePage { columns, rows })
    }

    /// Reads the columns, the total number of matching rows and one page of them.
    ///
    /// The count and the page are separate statements and do not share a snapshot.
    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn browse(
        &self,
        schema: &str,
        table: &str,
        pagination: Pagination,
        sort: Option<&SortSpec>,
        filter: Option<&FilterSpec>,
    ) -> Result<TableView> {
        let (columns, primary_key) = try_join!(
            self.catalog.list_columns(schema, table),
            self.catalog.primary_key(schema, table)
        )?;

        let target = TableTarget { schema, table, columns: &columns };

        let (total_records, rows) = try_join!(
            self.count_rows(&target, filter),
            self.read_rows(&target, &primary_key, &pagination, sort, filter)
        )?;

        Ok(TableView {
            columns,
            total_records,
            pagination,
            rows,
        })
    }

    async fn count_rows(&self, target: &TableTarget<'_>, filter: Option<&FilterSpec>) -> Result<i64> {
        let query = count_query(&self.identifier_quoter, target, filter, self.options.pattern_matching)?;

        self.connection
            .get_single_result(&query.sql, &query.param_refs())
            .await
    }

    async fn read_rows(
        &self,
        target: &TableTarget<'_>,
        primary_key: &[String],
        pagination: &Pagination,
        sort: Option<&SortSpec>,
        filter: Option<&FilterSpec>,
    ) -> Result<Vec<RecordValues>> {
        let default_order = DefaultOrder::for_table(primary_key, target.columns);
        let query = page_query(
            &self.identifier_quoter,
            target,
            pagination,
            sort,
            filter,
            &default_order,
            self.options.pattern_matching,
        )?;

        let rows = self
            .connection
            .query_rows(&query.sql, &query.param_refs())
            .await?;

        rows.iter().map(RecordValues::from_row).collect()
    }

    /// Inserts a row and returns it as stored, including generated values.
    ///
    /// Failures are reported in the result instead of as an error.
    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn insert(&self, schema: &str, table: &str, values: &RecordValues) -> MutationResult {
        match self.try_insert(schema, table, values).await {
            Ok(row) => MutationResult::ok(row),
            Err(e) => {
                warn!(operation = "insert", kind = ?e.kind(), "Failed to insert into {}.{}: {}", schema, table, e.user_message());
                MutationResult::failed(&e)
            }
        }
    }

    async fn try_insert(&self, schema: &str, table: &str, values: &RecordValues) -> Result<RecordValues> {
        let columns = self.catalog.list_columns(schema, table).await?;
        let query = insert_query(
            &self.identifier_quoter,
            &TableTarget { schema, table, columns: &columns },
            values,
        )?;

        let rows = self
            .connection
            .query_rows(&query.sql, &query.param_refs())
            .await?;

        match rows.first() {
            Some(row) => RecordValues::from_row(row),
            None => Err(TablescopeError::InvalidNumberOfResults {
                actual: 0,
                expected: 1,
            }),
        }
    }

    /// Updates the row whose key equals `id` and returns it as stored.
    ///
    /// A value for the key column itself is ignored. Updating a row that does not exist
    /// is reported as not found.
    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn update(&self, schema: &str, table: &str, id: &DatabaseValue, values: &RecordValues) -> MutationResult {
        match self.try_update(schema, table, id, values).await {
            Ok(row) => MutationResult::ok(row),
            Err(e) => {
                warn!(operation = "update", kind = ?e.kind(), "Failed to update {}.{}: {}", schema, table, e.user_message());
                MutationResult::failed(&e)
            }
        }
    }

    async fn try_update(
        &self,
        schema: &str,
        table: &str,
        id: &DatabaseValue,
        values: &RecordValues,
    ) -> Result<RecordValues> {
        let (columns, key) = try_join!(
            self.catalog.list_columns(schema, table),
            self.catalog.row_key(schema, table)
        )?;

        let query = update_query(
            &self.identifier_quoter,
            &TableTarget { schema, table, columns: &columns },
            key.column(),
            id,
            values,
        )?;

        let rows = self
            .connection
            .query_rows(&query.sql, &query.param_refs())
            .await?;

        match rows.first() {
            Some(row) => RecordValues::from_row(row),
            None => Err(TablescopeError::RecordNotFound {
                schema: schema.to_string(),
                table: table.to_string(),
                column: key.column().to_string(),
                value: id.to_string(),
            }),
        }
    }

    /// Deletes every row whose key is one of `ids`. An empty list deletes nothing and runs no statement.
    #[instrument(skip_all, fields(schema = schema, table = table))]
    pub async fn delete(&self, schema: &str, table: &str, ids: &[DatabaseValue]) -> DeleteResult {
        if ids.is_empty() {
            debug!("No ids given, nothing to delete");
            return DeleteResult::ok(0);
        }

        match self.try_delete(schema, table, ids).await {
            Ok(deleted) => DeleteResult::ok(deleted),
            Err(e) => {
                warn!(operation = "delete", kind = ?e.kind(), "Failed to delete from {}.{}: {}", schema, table, e.user_message());
                DeleteResult::failed(&e)
            }
        }
    }

    async fn try_delete(&self, schema: &str, table: &str, ids: &[DatabaseValue]) -> Result<u64> {
        let (columns, key) = try_join!(
            self.catalog.list_columns(schema, table),
            self.catalog.row_key(schema, table)
        )?;

        let Some(query) = delete_query(
            &self.identifier_quoter,
            &TableTarget { schema, table, columns: &columns },
            key.column(),
            ids,
        )?
        else {
            return Ok(0);
        };

        self.connection
            .execute(&query.sql, &query.param_refs())
            .await
    }
}
