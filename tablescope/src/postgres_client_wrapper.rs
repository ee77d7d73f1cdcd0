use crate::Result;
use crate::TablescopeError;
use std::fmt::Display;
use tokio::task::JoinHandle;
use tokio_postgres::row::RowIndex;
use tokio_postgres::types::{FromSqlOwned, ToSql};
use tokio_postgres::{Client, NoTls, Row, SimpleQueryMessage};
use tracing::debug;

/// Parameters as handed to the driver.
pub type SqlParams<'a> = [&'a (dyn ToSql + Sync)];

pub struct PostgresClientWrapper {
    client: Client,
    join_handle: JoinHandle<Result<()>>,
    version: i32,
}

impl PostgresClientWrapper {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

        // The connection object performs the actual communication with the database,
        // so spawn it off to run on its own.
        let join_handle = tokio::spawn(async move {
            match connection.await {
                Err(e) => Err(TablescopeError::PostgresError(e)),
                Ok(_) => Ok(()),
            }
        });

        let messages = client.simple_query("SHOW server_version_num;").await?;
        let version = parse_server_version(&messages)?;

        Ok(PostgresClientWrapper {
            client,
            join_handle,
            version,
        })
    }

    pub async fn execute_non_query(&self, sql: &str) -> Result {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| TablescopeError::PostgresErrorWithQuery {
                source: e,
                query: sql.to_string(),
            })?;

        Ok(())
    }

    /// Executes a statement with bound parameters and returns the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &SqlParams<'_>) -> Result<u64> {
        debug!(sql, parameters = params.len(), "executing statement");
        self.client
            .execute(sql, params)
            .await
            .map_err(|e| TablescopeError::PostgresErrorWithQuery {
                source: e,
                query: sql.to_string(),
            })
    }

    /// Runs a query with bound parameters and returns the raw rows.
    pub async fn query_rows(&self, sql: &str, params: &SqlParams<'_>) -> Result<Vec<Row>> {
        debug!(sql, parameters = params.len(), "running query");
        self.client
            .query(sql, params)
            .await
            .map_err(|e| TablescopeError::PostgresErrorWithQuery {
                source: e,
                query: sql.to_string(),
            })
    }

    pub async fn get_results<T: FromRow>(&self, sql: &str, params: &SqlParams<'_>) -> Result<Vec<T>> {
        let query_results = self.query_rows(sql, params).await?;

        let mut output = Vec::with_capacity(query_results.len());

        for row in query_results.into_iter() {
            output.push(T::from_row(row)?);
        }

        Ok(output)
    }

    pub async fn get_result<T: FromRow>(&self, sql: &str, params: &SqlParams<'_>) -> Result<T> {
        let results = self.get_results(sql, params).await?;
        if results.len() != 1 {
            return Err(TablescopeError::InvalidNumberOfResults {
                actual: results.len(),
                expected: 1,
            });
        }

        results
            .into_iter()
            .next()
            .ok_or(TablescopeError::InvalidNumberOfResults {
                actual: 0,
                expected: 1,
            })
    }

    pub async fn get_single_results<T: FromSqlOwned>(&self, sql: &str, params: &SqlParams<'_>) -> Result<Vec<T>> {
        let r = self
            .get_results::<(T,)>(sql, params)
            .await?
            .into_iter()
            .map(|t| t.0)
            .collect();

        Ok(r)
    }

    pub async fn get_single_result<T: FromSqlOwned>(&self, sql: &str, params: &SqlParams<'_>) -> Result<T> {
        let result = self.get_result::<(T,)>(sql, params).await?;
        Ok(result.0)
    }

    pub fn version(&self) -> i32 {
        self.version
    }
}

impl Drop for PostgresClientWrapper {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

/// Newer drivers send a row description ahead of the rows, so the first row is searched for.
fn parse_server_version(messages: &[SimpleQueryMessage]) -> Result<i32> {
    let version: i32 = messages
        .iter()
        .find_map(|m| match m {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .and_then(|row| row.get(0))
        .and_then(|v| v.parse().ok())
        .ok_or(TablescopeError::InvalidPostgresVersionResponse)?;

    if version < 120000 {
        return Err(TablescopeError::UnsupportedPostgresVersion(version));
    }

    Ok(version / 1000)
}

pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self>;
}

impl<T1: FromSqlOwned> FromRow for (T1,) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((row.try_get(0)?,))
    }
}

impl<T1: FromSqlOwned, T2: FromSqlOwned> FromRow for (T1, T2) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((row.try_get(0)?, row.try_get(1)?))
    }
}

impl<T1: FromSqlOwned, T2: FromSqlOwned, T3: FromSqlOwned> FromRow for (T1, T2, T3) {
    fn from_row(row: Row) -> Result<Self> {
        Ok((row.try_get(0)?, row.try_get(1)?, row.try_get(2)?))
    }
}

pub(crate) trait FromPgChar: Sized {
    fn from_pg_char(c: char) -> std::result::Result<Self, TablescopeError>;
}

pub(crate) trait RowEnumExt {
    fn try_get_enum_value<T: FromPgChar, I: RowIndex + Display>(&self, idx: I) -> Result<T>;
}

impl RowEnumExt for Row {
    fn try_get_enum_value<T: FromPgChar, I: RowIndex + Display>(&self, idx: I) -> Result<T> {
        let value: i8 = self.try_get(idx)?;
        let c = value as u8 as char;
        T::from_pg_char(c)
    }
}
