use crate::models::{DatabaseValue, RecordValues};
use crate::postgres_client_wrapper::FromRow;
use serde::Serialize;
use tokio_postgres::Row;

/// A single column foreign key, as found in `pg_constraint`.
#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct ForeignKeyDescriptor {
    pub constraint_name: String,
    pub source_column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

/// The row a foreign key value points at.
#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct LinkedRecord {
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
    /// `None` when the referenced row does not exist (e.g. the constraint is not validated).
    pub row: Option<RecordValues>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct RelatedOption {
    pub value: DatabaseValue,
    pub label: String,
}

impl FromRow for RelatedOption {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(RelatedOption {
            value: row.try_get(0)?,
            label: row.try_get(1)?,
        })
    }
}

/// Candidate values for a foreign key column, used to populate a picker.
#[derive(Debug, Eq, PartialEq, Clone, Default, Serialize)]
pub struct RelatedOptions {
    /// The foreign key the options were read through, `None` when the column is not a reference.
    pub foreign_key: Option<ForeignKeyDescriptor>,
    pub options: Vec<RelatedOption>,
}
