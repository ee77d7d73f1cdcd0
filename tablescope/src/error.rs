use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TablescopeError {
    #[error("Error from postgres: `{0}`")]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Error from postgres: `{query}` when executing query: `{source}`")]
    PostgresErrorWithQuery {
        query: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("Invalid number of results returned from query. Expected `{expected}`, got `{actual}`")]
    InvalidNumberOfResults { actual: usize, expected: usize },

    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: &'static str },

    #[error("Unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("Unknown sort direction '{0}'")]
    UnknownSortDirection(String),

    #[error("Table {schema}.{table} has a composite primary key ({}), which is not supported", .columns.iter().join(", "))]
    CompositePrimaryKey {
        schema: String,
        table: String,
        columns: Vec<String>,
    },

    #[error("No columns left to update in {schema}.{table}")]
    NothingToUpdate { schema: String, table: String },

    #[error("No record in {schema}.{table} where {column} = {value}")]
    RecordNotFound {
        schema: String,
        table: String,
        column: String,
        value: String,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Expected a JSON object of column names to values, got {0}")]
    PayloadNotAnObject(&'static str),

    #[error("Invalid pg char value for {type_name}: '{value}'")]
    InvalidPgChar { type_name: &'static str, value: char },

    #[error("Unsupported postgres version: {0}. Minimum supported version is 12")]
    UnsupportedPostgresVersion(i32),

    #[error("Invalid response from postgres when asking for the server version")]
    InvalidPostgresVersionResponse,
}

/// The broad categories every failure falls into.
///
/// Callers use this to decide between "show a validation message",
/// "nothing there" and "the database is unhappy" without matching on every variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Constraint,
    Connectivity,
}

impl TablescopeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TablescopeError::PostgresError(e)
            | TablescopeError::PostgresErrorWithQuery { source: e, .. } => {
                if e.as_db_error().is_some() {
                    ErrorKind::Constraint
                } else if is_parameter_conversion_error(e) {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Connectivity
                }
            }
            TablescopeError::InvalidIdentifier { .. }
            | TablescopeError::UnknownOperator(_)
            | TablescopeError::UnknownSortDirection(_)
            | TablescopeError::CompositePrimaryKey { .. }
            | TablescopeError::NothingToUpdate { .. }
            | TablescopeError::JsonError(_)
            | TablescopeError::PayloadNotAnObject(_) => ErrorKind::Validation,
            TablescopeError::RecordNotFound { .. } => ErrorKind::NotFound,
            TablescopeError::InvalidNumberOfResults { .. }
            | TablescopeError::InvalidPgChar { .. }
            | TablescopeError::UnsupportedPostgresVersion(_)
            | TablescopeError::InvalidPostgresVersionResponse => ErrorKind::Connectivity,
        }
    }

    /// A message that is safe to show to an end user.
    ///
    /// Database failures are reduced to the message the server produced, so the SQL text
    /// that was executed never leaks out of the library.
    pub fn user_message(&self) -> String {
        match self {
            TablescopeError::PostgresError(e)
            | TablescopeError::PostgresErrorWithQuery { source: e, .. } => match e.as_db_error() {
                Some(db_error) => match db_error.detail() {
                    Some(detail) => format!("{}: {}", db_error.message(), detail),
                    None => db_error.message().to_string(),
                },
                None => match std::error::Error::source(e) {
                    Some(source) => source.to_string(),
                    None => e.to_string(),
                },
            },
            other => other.to_string(),
        }
    }
}

/// Parameter encoding failures surface from the driver as a plain error with the
/// conversion problem as its source.
fn is_parameter_conversion_error(e: &tokio_postgres::Error) -> bool {
    std::error::Error::source(e)
        .map(|source| source.is::<crate::models::ValueConversionError>())
        .unwrap_or(false)
}

pub type Result<T = ()> = std::result::Result<T, TablescopeError>;
