use crate::error::ErrorKind;
use crate::models::{ColumnDescriptor, Pagination, RecordValues};
use crate::TablescopeError;
use serde::Serialize;

/// The outcome of an insert or update.
///
/// Mutations never fail with an error, the failure is reported here so it can be shown inline.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct MutationResult {
    pub success: bool,
    pub data: Option<RecordValues>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl MutationResult {
    pub fn ok(data: RecordValues) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(error: &TablescopeError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.user_message()),
            error_kind: Some(error.kind()),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct DeleteResult {
    pub success: bool,
    pub deleted: u64,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl DeleteResult {
    pub fn ok(deleted: u64) -> Self {
        Self {
            success: true,
            deleted,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(error: &TablescopeError) -> Self {
        Self {
            success: false,
            deleted: 0,
            error: Some(error.user_message()),
            error_kind: Some(error.kind()),
        }
    }
}

/// One page of rows, together with the columns they were read through.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct TablePage {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<RecordValues>,
}

/// Everything a grid needs to render a table: columns, the total count and one page of rows.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct TableView {
    pub columns: Vec<ColumnDescriptor>,
    pub total_records: i64,
    pub pagination: Pagination,
    pub rows: Vec<RecordValues>,
}

impl TableView {
    pub fn total_pages(&self) -> i64 {
        let page_size = self.pagination.page_size as i64;
        (self.total_records + page_size - 1) / page_size
    }
}
