use crate::postgres_client_wrapper::{FromPgChar, FromRow, RowEnumExt};
use crate::quoting::AllowedKeywordUsage;
use crate::TablescopeError;
use tokio_postgres::Row;

use super::define_catalog_query;

pub struct KeywordResult {
    pub word: String,
    pub category: KeywordCategory,
}

impl FromRow for KeywordResult {
    fn from_row(row: Row) -> crate::Result<Self> {
        Ok(KeywordResult {
            word: row.try_get(0)?,
            category: row.try_get_enum_value(1)?,
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeywordCategory {
    Unreserved,
    AllowedInColumnName,
    AllowedInTypeOrFunctionName,
    Reserved,
}

impl KeywordCategory {
    pub fn allowed_usage(&self) -> AllowedKeywordUsage {
        AllowedKeywordUsage {
            column_name: matches!(
                self,
                KeywordCategory::Unreserved | KeywordCategory::AllowedInColumnName
            ),
            type_or_function_name: matches!(
                self,
                KeywordCategory::Unreserved | KeywordCategory::AllowedInTypeOrFunctionName
            ),
        }
    }
}

impl FromPgChar for KeywordCategory {
    fn from_pg_char(c: char) -> crate::Result<Self> {
        match c {
            'U' => Ok(KeywordCategory::Unreserved),
            'C' => Ok(KeywordCategory::AllowedInColumnName),
            'T' => Ok(KeywordCategory::AllowedInTypeOrFunctionName),
            'R' => Ok(KeywordCategory::Reserved),
            _ => Err(TablescopeError::InvalidPgChar {
                type_name: "KeywordCategory",
                value: c,
            }),
        }
    }
}

//language=postgresql
define_catalog_query!(get_keywords, KeywordResult, r#"
select word, catcode from pg_get_keywords() where catcode <> 'U'
"#, ());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_or_function_name_keywords_are_not_column_names() {
        let usage = KeywordCategory::AllowedInTypeOrFunctionName.allowed_usage();
        assert!(!usage.column_name);
        assert!(usage.type_or_function_name);

        let usage = KeywordCategory::AllowedInColumnName.allowed_usage();
        assert!(usage.column_name);
        assert!(!usage.type_or_function_name);

        let usage = KeywordCategory::Reserved.allowed_usage();
        assert!(!usage.column_name);
        assert!(!usage.type_or_function_name);
    }
}
