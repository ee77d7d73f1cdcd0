use crate::{Result, TablescopeError};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum OperatorKind {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 9] = [
        OperatorKind::Equals,
        OperatorKind::NotEquals,
        OperatorKind::Contains,
        OperatorKind::StartsWith,
        OperatorKind::EndsWith,
        OperatorKind::GreaterThan,
        OperatorKind::GreaterOrEqual,
        OperatorKind::LessThan,
        OperatorKind::LessOrEqual,
    ];

    /// The token used for the operator in request parameters.
    pub fn token(&self) -> &'static str {
        match self {
            OperatorKind::Equals => "eq",
            OperatorKind::NotEquals => "neq",
            OperatorKind::Contains => "contains",
            OperatorKind::StartsWith => "starts_with",
            OperatorKind::EndsWith => "ends_with",
            OperatorKind::GreaterThan => "gt",
            OperatorKind::GreaterOrEqual => "gte",
            OperatorKind::LessThan => "lt",
            OperatorKind::LessOrEqual => "lte",
        }
    }
}

impl FromStr for OperatorKind {
    type Err = TablescopeError;

    fn from_str(s: &str) -> Result<Self> {
        OperatorKind::ALL
            .into_iter()
            .find(|op| op.token() == s)
            .ok_or_else(|| TablescopeError::UnknownOperator(s.to_string()))
    }
}

impl Display for OperatorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// A single `column <operator> value` condition.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct FilterSpec {
    pub column: String,
    pub operator: OperatorKind,
    pub value: String,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, operator: OperatorKind, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Builds a filter from raw request parameters.
    ///
    /// A filter is only active when all three parts are present, but once it is,
    /// an unknown operator is an error rather than being ignored.
    pub fn parse(column: Option<&str>, operator: Option<&str>, value: Option<&str>) -> Result<Option<Self>> {
        match (column, operator, value) {
            (Some(column), Some(operator), Some(value)) if !column.is_empty() && !operator.is_empty() => {
                Ok(Some(Self::new(column, operator.parse()?, value)))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = TablescopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Ascending),
            "desc" => Ok(SortDirection::Descending),
            _ => Err(TablescopeError::UnknownSortDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    /// Builds a sort from raw request parameters. Both parts have to be present.
    pub fn parse(column: Option<&str>, direction: Option<&str>) -> Result<Option<Self>> {
        match (column, direction) {
            (Some(column), Some(direction)) if !column.is_empty() => {
                Ok(Some(Self::new(column, direction.parse()?)))
            }
            _ => Ok(None),
        }
    }
}

/// How the pattern operators (`contains`, `starts_with`, `ends_with`) compare text.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize)]
pub enum PatternMatching {
    #[default]
    CaseInsensitive,
    CaseSensitive,
}

impl PatternMatching {
    pub(crate) fn operator(&self) -> &'static str {
        match self {
            PatternMatching::CaseInsensitive => "ilike",
            PatternMatching::CaseSensitive => "like",
        }
    }
}
