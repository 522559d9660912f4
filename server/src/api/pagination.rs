//! Lenient `page`/`limit` query parsing.
//!
//! Missing, unparsable or non-positive values fall back to the defaults;
//! `limit` is clamped to [`MAX_LIMIT`].

use serde::Deserialize;

/// Page used when none is given.
pub const DEFAULT_PAGE: i64 = 1;
/// Page size used when none is given.
pub const DEFAULT_LIMIT: i64 = 10;
/// Largest accepted page size.
pub const MAX_LIMIT: i64 = 100;

/// Raw query string parameters.
///
/// Kept as strings so a bad value degrades to the default instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    /// 1-based page number
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
}

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    limit: i64,
}

impl Page {
    /// Normalize `number` and `limit`.
    #[must_use]
    pub fn new(number: i64, limit: i64) -> Self {
        let number = if number < 1 { DEFAULT_PAGE } else { number };
        let limit = match limit {
            l if l < 1 => DEFAULT_LIMIT,
            l => l.min(MAX_LIMIT),
        };
        Self { number, limit }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn number(self) -> i64 {
        self.number
    }

    /// Page size.
    #[must_use]
    pub const fn limit(self) -> i64 {
        self.limit
    }

    /// Number of records to skip.
    #[must_use]
    pub fn offset(self) -> i64 {
        (self.number - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` records.
    #[must_use]
    pub fn total_pages(self, total: i64) -> i64 {
        if total <= 0 {
            return 0;
        }
        (total + self.limit - 1) / self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl From<PaginationQuery> for Page {
    fn from(query: PaginationQuery) -> Self {
        let parse = |value: Option<String>, default: i64| {
            value
                .and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        Self::new(parse(query.page, DEFAULT_PAGE), parse(query.limit, DEFAULT_LIMIT))
    }
}
