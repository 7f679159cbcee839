//! Paged procedure results

use serde::Serialize;

use super::value::Record;

/// Rows of one page plus the totals the procedure reported
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub records: Vec<Record>,
    /// Matching rows across all pages
    pub total_records: i64,
    pub total_pages: i64,
}

impl PaginationResult {
    /// Check if there's a page after `page_number`.
    pub fn has_next(&self, page_number: u32) -> bool {
        i64::from(page_number) < self.total_pages
    }

    /// Check if there's a page before `page_number`.
    pub fn has_prev(&self, page_number: u32) -> bool {
        page_number > 1
    }
}

/// Reference page count: `ceil(total / page_size)`, zero when there are
/// no records.
pub fn page_count(total_records: i64, page_size: u32) -> i64 {
    if total_records <= 0 || page_size == 0 {
        return 0;
    }
    let size = i64::from(page_size);
    (total_records + size - 1) / size
}
