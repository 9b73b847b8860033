//! Collection query and page types shared by every list screen.
//!
//! A [`CollectionQuery`] is rebuilt for each fetch from the current page
//! and the applied filters; a [`CollectionPage`] is what comes back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Page size used when a screen does not declare its own.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Upper bound on the page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Clamp a requested page number. Page numbers are 1-based.
pub fn clamp_page(page: Option<u32>) -> u32 {
    page.unwrap_or(1).max(1)
}

/// Clamp a requested page size into `1..=max`, using `default` when absent.
pub fn clamp_limit(limit: Option<u32>, default: u32, max: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, max)
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Parameters for one list retrieval.
///
/// `filters` holds the applied filter values exactly as committed; blank
/// values are kept here but never make it into [`to_params`](Self::to_params).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub page: u32,
    pub limit: u32,
    pub filters: BTreeMap<String, String>,
}

impl CollectionQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: clamp_page(Some(page)),
            limit: clamp_limit(Some(limit), DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
            filters: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Filters that will actually be sent: trimmed, blanks dropped.
    pub fn effective_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .map(|(k, v)| (k.as_str(), v.trim()))
            .filter(|(_, v)| !v.is_empty())
    }

    /// Query-string pairs: `page`, `limit`, then non-empty filters in key order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        params.extend(
            self.effective_filters()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        params
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Pagination block returned alongside every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn has_next_page(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_prev_page(&self) -> bool {
        self.page > 1
    }

    /// Whether `page` is a valid navigation target for this result set.
    pub fn contains_page(&self, page: u32) -> bool {
        page >= 1 && page <= self.pages.max(1)
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPage<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_omit_blank_and_whitespace_filters() {
        let query = CollectionQuery::new(2, 9)
            .with_filter("doctorId", "")
            .with_filter("city", "   ")
            .with_filter("name", "  Rao ");

        assert_eq!(
            query.to_params(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("limit".to_string(), "9".to_string()),
                ("name".to_string(), "Rao".to_string()),
            ]
        );
    }

    #[test]
    fn new_clamps_page_and_limit() {
        let query = CollectionQuery::new(0, 500);
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_LIMIT);
    }

    #[test]
    fn clamp_helpers() {
        assert_eq!(clamp_page(None), 1);
        assert_eq!(clamp_page(Some(0)), 1);
        assert_eq!(clamp_page(Some(4)), 4);
        assert_eq!(clamp_limit(None, 9, MAX_PAGE_LIMIT), 9);
        assert_eq!(clamp_limit(Some(0), 9, MAX_PAGE_LIMIT), 1);
        assert_eq!(clamp_limit(Some(1000), 9, MAX_PAGE_LIMIT), MAX_PAGE_LIMIT);
    }

    #[test]
    fn pagination_boundaries() {
        let first = Pagination { total: 27, page: 1, pages: 3, limit: 9 };
        assert!(first.has_next_page());
        assert!(!first.has_prev_page());

        let last = Pagination { page: 3, ..first };
        assert!(!last.has_next_page());
        assert!(last.has_prev_page());

        assert!(first.contains_page(3));
        assert!(!first.contains_page(4));
        assert!(!first.contains_page(0));
    }

    #[test]
    fn empty_result_still_has_page_one() {
        let empty = Pagination { total: 0, page: 1, pages: 0, limit: 10 };
        assert!(empty.contains_page(1));
        assert!(!empty.has_next_page());
    }
}
