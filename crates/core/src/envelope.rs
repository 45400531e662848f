//! Paginated list envelope.

use serde::{Serialize, Serializer};

use crate::document::Document;
use crate::query::{DEFAULT_LIMIT, DEFAULT_PAGE};

/// A 1-based page of `limit` records.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl PageWindow {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Number of records skipped before this page.
    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    fn end_index(&self) -> u64 {
        self.start_index().saturating_add(self.limit)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

impl PaginationLinks {
    /// `next` exists iff the page ends before `total`; `prev` iff the page
    /// does not start at the first record.
    pub fn for_window(window: PageWindow, total: u64) -> Self {
        let next = (window.end_index() < total).then(|| PageLink {
            page: window.page + 1,
            limit: window.limit,
        });
        let prev = (window.start_index() > 0).then(|| PageLink {
            page: window.page - 1,
            limit: window.limit,
        });
        Self { next, prev }
    }
}

/// `total / limit` when that exceeds one, else one.
///
/// The ratio is not rounded up.
pub fn total_pages(total: u64, limit: u64) -> f64 {
    let ratio = total as f64 / limit.max(1) as f64;
    if ratio > 1.0 { ratio } else { 1.0 }
}

/// The list response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub success: bool,
    pub count: usize,
    pub pagination: PaginationLinks,
    pub data: Vec<Document>,
    /// Size of the whole collection, independent of the filter.
    pub total: u64,
    #[serde(serialize_with = "serialize_page_count")]
    pub total_pages: f64,
}

impl Envelope {
    pub fn new(data: Vec<Document>, total: u64, window: PageWindow) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination: PaginationLinks::for_window(window, total),
            data,
            total,
            total_pages: total_pages(total, window.limit),
        }
    }
}

/// Whole page counts serialize as integers, fractional ones as floats.
fn serialize_page_count<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && *value >= 0.0 && *value <= u64::MAX as f64 {
        serializer.serialize_u64(*value as u64)
    } else {
        serializer.serialize_f64(*value)
    }
}
