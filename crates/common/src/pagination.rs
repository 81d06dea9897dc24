//! Page-number pagination.
//!
//! List pages are addressed by a 1-based `?page=` parameter. Requests outside
//! the valid range never fail: a non-numeric value falls back to the first
//! page and an out-of-range number clamps to the last page.

use serde::Serialize;

/// A requested page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number. Zero means "past the end" and resolves to the
    /// last page.
    pub number: u64,
    /// Number of items per page.
    pub per_page: u64,
}

impl PageRequest {
    /// Create a page request for the given page number.
    #[must_use]
    pub const fn new(number: u64, per_page: u64) -> Self {
        Self { number, per_page }
    }

    /// Request the first page.
    #[must_use]
    pub const fn first(per_page: u64) -> Self {
        Self::new(1, per_page)
    }

    /// Parse a raw `?page=` query value.
    ///
    /// Missing or non-numeric values select the first page; numbers below 1
    /// select the last page (resolved against the total during the query).
    #[must_use]
    pub fn from_param(raw: Option<&str>, per_page: u64) -> Self {
        let number = match raw.map(str::trim) {
            None | Some("") => 1,
            Some(s) => match s.parse::<i64>() {
                Ok(n) if n < 1 => 0,
                Ok(n) => n as u64,
                Err(_) => 1,
            },
        };
        Self::new(number, per_page.max(1))
    }

    /// Clamp the requested number into `1..=total_pages`.
    ///
    /// An empty result set still has one (empty) page.
    #[must_use]
    pub const fn resolve(&self, total_pages: u64) -> u64 {
        let last = if total_pages == 0 { 1 } else { total_pages };
        if self.number == 0 || self.number > last {
            last
        } else {
            self.number
        }
    }
}

/// One resolved page of items plus the surrounding counts.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page, in query order.
    pub items: Vec<T>,
    /// 1-based number of this page.
    pub number: u64,
    /// Page size the query was run with.
    pub per_page: u64,
    /// Total number of items across all pages.
    pub total_items: u64,
    /// Total number of pages (at least 1).
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// An empty first page.
    #[must_use]
    pub const fn empty(per_page: u64) -> Self {
        Self {
            items: Vec::new(),
            number: 1,
            per_page,
            total_items: 0,
            total_pages: 1,
        }
    }

    /// Whether a page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// Whether a page precedes this one.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Convert the items while keeping the page counts.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
