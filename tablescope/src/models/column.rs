use crate::models::value::NATIVELY_DECODED_TYPES;
use serde::Serialize;

/// A single column of a table, as reported by the catalog.
#[derive(Debug, Eq, PartialEq, Clone, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// The type as Postgres would write it in DDL, e.g. `integer` or `character varying(255)`.
    pub declared_type: String,
    /// The catalog name of the type, e.g. `int4` or `varchar`.
    pub udt_name: String,
    pub is_nullable: bool,
    pub default_expr: Option<String>,
    pub ordinal_position: i32,
}

impl ColumnDescriptor {
    /// Whether values of this column can be read as-is, or have to be cast to text first.
    pub fn is_natively_decoded(&self) -> bool {
        NATIVELY_DECODED_TYPES.contains(&self.udt_name.as_str())
    }
}
