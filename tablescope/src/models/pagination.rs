use serde::Serialize;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Which slice of a table to read. Both values are always at least 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Creates a pagination, replacing non-positive values with the defaults.
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: positive_or(page, DEFAULT_PAGE),
            page_size: positive_or(page_size, DEFAULT_PAGE_SIZE),
        }
    }

    /// Creates a pagination from raw request parameters.
    ///
    /// Missing, non-numeric and non-positive values fall back to the defaults instead of failing.
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Self {
        let parse = |s: Option<&str>| s.and_then(|s| s.trim().parse::<i64>().ok()).unwrap_or(0);

        Self::new(parse(page), parse(page_size))
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.page_size).unwrap_or(i64::MAX)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1)
            .checked_mul(self.page_size)
            .and_then(|o| i64::try_from(o).ok())
            .unwrap_or(i64::MAX)
    }
}

fn positive_or(value: i64, default: u64) -> u64 {
    if value > 0 {
        value as u64
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_offsets() {
        assert_eq!(Pagination::new(1, 100).offset(), 0);
        assert_eq!(Pagination::new(3, 25).offset(), 50);
        assert_eq!(Pagination::new(3, 25).limit(), 25);
    }

    #[test]
    fn normalizes_non_positive_values() {
        assert_eq!(Pagination::new(0, 10), Pagination { page: 1, page_size: 10 });
        assert_eq!(Pagination::new(-4, -1), Pagination::default());
    }

    #[test]
    fn parses_permissively() {
        assert_eq!(Pagination::parse(Some("2"), Some("50")), Pagination { page: 2, page_size: 50 });
        assert_eq!(Pagination::parse(Some("abc"), None), Pagination::default());
        assert_eq!(Pagination::parse(Some(" 7 "), Some("1.5")), Pagination { page: 7, page_size: 100 });
    }

    #[test]
    fn huge_offsets_saturate() {
        assert_eq!(Pagination::new(i64::MAX, i64::MAX).offset(), i64::MAX);
    }
}
