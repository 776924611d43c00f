//! Listing and pagination value types.
//!
//! # Invariants
//! - `total_pages >= 1`, even when `total == 0`.
//! - The effective page is clamped into `1..=total_pages`.
//! - `has_prev == (page > 1)` and `has_next == (page < total_pages)`.

use crate::model::Record;
use serde::Serialize;

/// Rows returned by a listing: full entities, or preview projections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing<E> {
    Full(Vec<E>),
    Preview(Vec<Record>),
}

impl<E> Listing<E> {
    pub fn len(&self) -> usize {
        match self {
            Self::Full(items) => items.len(),
            Self::Preview(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, Self::Preview(_))
    }

    /// Full entities; `None` for a preview listing.
    pub fn into_full(self) -> Option<Vec<E>> {
        match self {
            Self::Full(items) => Some(items),
            Self::Preview(_) => None,
        }
    }

    /// Preview rows; `None` for a full listing.
    pub fn into_preview(self) -> Option<Vec<Record>> {
        match self {
            Self::Full(_) => None,
            Self::Preview(rows) => Some(rows),
        }
    }
}

/// Options for an unpaginated filter listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<u32>,
    pub offset: u32,
    /// Defaults to the insert audit column when `None`.
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    pub is_preview: bool,
    /// Explicit projection; the contract's preview fields when `None` or empty.
    pub preview_fields: Option<Vec<String>>,
}

/// One page request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
    pub is_preview: bool,
    pub preview_fields: Option<Vec<String>>,
}

impl PageRequest {
    /// Newest-first request for `page` with `per_page` rows.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            sort_by: None,
            sort_desc: true,
            is_preview: false,
            preview_fields: None,
        }
    }

    pub fn sorted_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.sort_by = Some(column.into());
        self.sort_desc = descending;
        self
    }

    /// Requests a preview projection; `None` uses the contract defaults.
    pub fn preview(mut self, fields: Option<Vec<String>>) -> Self {
        self.is_preview = true;
        self.preview_fields = fields;
        self
    }
}

/// One page of results plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<E> {
    pub items: Listing<E>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Effective page position computed from a total row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub total_pages: u64,
    pub offset: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Clamps `page` into range for `total` rows of `per_page` (both >= 1).
pub fn plan_page(total: u64, page: u32, per_page: u32) -> PageWindow {
    let per_page = u64::from(per_page.max(1));
    let total_pages = total.div_ceil(per_page).max(1);
    let effective = u64::from(page.max(1)).min(total_pages);
    PageWindow {
        page: u32::try_from(effective).unwrap_or(u32::MAX),
        total_pages,
        offset: (effective - 1) * per_page,
        has_next: effective < total_pages,
        has_prev: effective > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::plan_page;
    use proptest::prelude::*;

    #[test]
    fn empty_result_still_has_one_page() {
        let window = plan_page(0, 1, 20);
        assert_eq!(window.total_pages, 1);
        assert_eq!(window.page, 1);
        assert_eq!(window.offset, 0);
        assert!(!window.has_next);
        assert!(!window.has_prev);
    }

    #[test]
    fn page_past_the_end_clamps_to_last_page() {
        let window = plan_page(45, 999, 20);
        assert_eq!(window.page, 3);
        assert_eq!(window.offset, 40);
        assert!(window.has_prev);
        assert!(!window.has_next);
    }

    proptest! {
        #[test]
        fn window_invariants_hold(total in 0u64..5_000, page in 1u32..500, per_page in 1u32..200) {
            let window = plan_page(total, page, per_page);
            prop_assert!(window.total_pages >= 1);
            prop_assert_eq!(window.total_pages, std::cmp::max(1, total.div_ceil(u64::from(per_page))));
            prop_assert!(window.page >= 1);
            prop_assert!(u64::from(window.page) <= window.total_pages);
            prop_assert_eq!(window.has_prev, window.page > 1);
            prop_assert_eq!(window.has_next, u64::from(window.page) < window.total_pages);
            if total == 0 {
                prop_assert_eq!(window.offset, 0);
            } else {
                prop_assert!(window.offset < total);
            }
        }
    }
}
