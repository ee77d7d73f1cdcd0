#[cfg(any(test, feature = "test_utilities"))]
pub mod test_helpers;

mod catalog;
mod ddl_query_builder;
mod error;
mod link_resolver;
mod models;
mod postgres_client_wrapper;
mod query_builder;
mod quoting;
mod table_browser;

pub use catalog::CatalogReader;
pub use ddl_query_builder::*;
pub use error::*;
pub use models::*;
pub use postgres_client_wrapper::{FromRow, PostgresClientWrapper, SqlParams};
pub use query_builder::{BuiltQuery, DefaultOrder, QueryBuilder};
pub use quoting::{AllowedKeywordUsage, AttemptedKeywordUsage, IdentifierQuoter, MAX_IDENTIFIER_LENGTH};
pub use table_browser::*;

pub(crate) fn default<T: Default>() -> T {
    T::default()
}
