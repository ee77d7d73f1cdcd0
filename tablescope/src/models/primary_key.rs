use crate::{Result, TablescopeError};
use serde::Serialize;

/// The column used to address single rows when updating and deleting.
#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub enum RowKey {
    /// The table declares a single column primary key.
    PrimaryKey(String),
    /// The table declares no primary key, so the column named `id` is assumed.
    Conventional(String),
}

/// The column every mutation assumes to exist when no primary key is declared.
pub const CONVENTIONAL_KEY_COLUMN: &str = "id";

impl RowKey {
    pub fn column(&self) -> &str {
        match self {
            RowKey::PrimaryKey(c) | RowKey::Conventional(c) => c,
        }
    }

    /// Picks the key from the declared primary key columns.
    ///
    /// Composite keys are rejected, as rows are addressed by a single value.
    pub fn from_primary_key(schema: &str, table: &str, mut columns: Vec<String>) -> Result<Self> {
        match columns.len() {
            0 => Ok(RowKey::Conventional(CONVENTIONAL_KEY_COLUMN.to_string())),
            1 => Ok(RowKey::PrimaryKey(columns.remove(0))),
            _ => Err(TablescopeError::CompositePrimaryKey {
                schema: schema.to_string(),
                table: table.to_string(),
                columns,
            }),
        }
    }
}
