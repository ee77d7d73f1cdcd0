use crate::{Result, TablescopeError};
use std::collections::HashMap;

/// The longest identifier Postgres keeps without truncating it (`NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Provides utilities for quoting identifiers in PostgreSQL as needed.
///
/// This is the only place caller supplied schema, table and column names are turned into SQL text.
#[derive(Debug)]
pub struct IdentifierQuoter {
    /// Keywords that might need to be escaped, and whether they are allowed to be used as column names or type/function names.
    keywords: HashMap<String, AllowedKeywordUsage>,
}

/// How a keyword is allowed to be used.
#[derive(Debug, Copy, Clone)]
pub struct AllowedKeywordUsage {
    pub column_name: bool,
    pub type_or_function_name: bool,
}

/// How an identifier is attempted to be used.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AttemptedKeywordUsage {
    ColumnName,
    TypeOrFunctionName,
    Other,
}

impl IdentifierQuoter {
    /// Creates a new IdentifierQuoter with the specified keywords and their allowed usages.
    pub fn new(keywords: HashMap<String, AllowedKeywordUsage>) -> Self {
        Self { keywords }
    }

    /// Creates a new IdentifierQuoter with no keywords.
    ///
    /// This is mainly useful for testing as it doesn't require connecting to Postgres.
    pub fn empty() -> Self {
        Self {
            keywords: HashMap::new(),
        }
    }

    /// Validates and quotes an identifier as needed.
    ///
    /// Empty names, names containing NUL and names longer than [`MAX_IDENTIFIER_LENGTH`] bytes are rejected.
    /// Everything else is either a plain lower case identifier, or ends up double quoted with any
    /// embedded double quote doubled, so it can never terminate the quoted region.
    ///
    /// Ported from <https://github.com/postgres/postgres/blob/97957fdbaa429c7c582d4753b108cb1e23e1b28a/src/backend/utils/adt/ruleutils.c#L11975>
    pub fn quote(&self, identifier: impl AsRef<str>, usage: AttemptedKeywordUsage) -> Result<String> {
        let identifier = identifier.as_ref();

        validate_identifier(identifier)?;

        let mut chars = identifier.chars();

        let safe = if let Some(allowed) = self.keywords.get(identifier) {
            match usage {
                AttemptedKeywordUsage::ColumnName => allowed.column_name,
                AttemptedKeywordUsage::TypeOrFunctionName => allowed.type_or_function_name,
                AttemptedKeywordUsage::Other => false,
            }
        } else {
            matches!(chars.next(), Some('a'..='z' | '_'))
                && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        };

        if safe {
            Ok(identifier.to_string())
        } else {
            let escaped = identifier.replace('"', r#""""#);

            Ok(format!("\"{escaped}\""))
        }
    }

    /// Quotes a `schema.table` pair.
    pub fn quote_table(&self, schema: &str, table: &str) -> Result<String> {
        Ok(format!(
            "{}.{}",
            self.quote(schema, AttemptedKeywordUsage::Other)?,
            self.quote(table, AttemptedKeywordUsage::Other)?
        ))
    }
}

fn validate_identifier(identifier: &str) -> Result {
    let reason = if identifier.is_empty() {
        "identifiers cannot be empty"
    } else if identifier.contains('\0') {
        "identifiers cannot contain NUL characters"
    } else if identifier.len() > MAX_IDENTIFIER_LENGTH {
        "identifiers cannot be longer than 63 bytes"
    } else {
        return Ok(());
    };

    Err(TablescopeError::InvalidIdentifier {
        identifier: identifier.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use crate::quoting::{AllowedKeywordUsage, AttemptedKeywordUsage, IdentifierQuoter};
    use crate::TablescopeError;
    use std::collections::HashMap;

    fn quoter() -> IdentifierQuoter {
        IdentifierQuoter::new(HashMap::from([
            (
                "table".to_string(),
                AllowedKeywordUsage {
                    type_or_function_name: false,
                    column_name: false,
                },
            ),
            (
                "name".to_string(),
                AllowedKeywordUsage {
                    type_or_function_name: true,
                    column_name: true,
                },
            ),
        ]))
    }

    #[test]
    fn quoting() {
        let quoter = quoter();

        macro_rules! test_quote {
            ($identifier:literal, $expected:literal) => {
                let quoted = quoter.quote($identifier, AttemptedKeywordUsage::Other).unwrap();
                assert_eq!(quoted, $expected);
            };
        }

        test_quote!("table", "\"table\"");
        test_quote!("table1", "table1");
        test_quote!("table_1", "table_1");
        test_quote!("table-1", "\"table-1\"");
        test_quote!("table 1", "\"table 1\"");
        test_quote!("1table", "\"1table\"");
        test_quote!("my_table", "my_table");
        test_quote!("MyTable", "\"MyTable\"");
        test_quote!("my\"table", "\"my\"\"table\"");
    }

    #[test]
    fn keywords_depend_on_usage() {
        let quoter = quoter();

        assert_eq!(quoter.quote("name", AttemptedKeywordUsage::ColumnName).unwrap(), "name");
        assert_eq!(quoter.quote("name", AttemptedKeywordUsage::Other).unwrap(), "\"name\"");
        assert_eq!(quoter.quote("table", AttemptedKeywordUsage::ColumnName).unwrap(), "\"table\"");
    }

    #[test]
    fn injection_attempts_stay_inside_the_identifier() {
        let quoter = IdentifierQuoter::empty();

        let quoted = quoter
            .quote(r#""; DROP TABLE x; --"#, AttemptedKeywordUsage::ColumnName)
            .unwrap();

        assert_eq!(quoted, r#""""; DROP TABLE x; --""#);
        // Every quote inside the identifier is doubled, so only the outer pair delimits it.
        let inner = &quoted[1..quoted.len() - 1];
        assert!(!inner.replace("\"\"", "").contains('"'));
    }

    #[test]
    fn rejects_invalid_identifiers() {
        let quoter = IdentifierQuoter::empty();

        let too_long = "a".repeat(64);

        for identifier in ["", "nul\0byte", too_long.as_str()] {
            let result = quoter.quote(identifier, AttemptedKeywordUsage::Other);
            assert!(
                matches!(result, Err(TablescopeError::InvalidIdentifier { .. })),
                "expected '{}' to be rejected, got {:?}",
                identifier.escape_debug(),
                result
            );
        }

        assert!(quoter.quote("a".repeat(63), AttemptedKeywordUsage::Other).is_ok());
    }

    #[test]
    fn quotes_tables_with_schema() {
        let quoter = quoter();

        assert_eq!(quoter.quote_table("public", "users").unwrap(), "public.users");
        assert_eq!(quoter.quote_table("My Schema", "table").unwrap(), "\"My Schema\".\"table\"");
    }
}
