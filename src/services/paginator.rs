//! Reverse-chronological page window over a record list
//!
//! Pure: the caller owns the page cursor and passes it in every cycle.

use serde::{Deserialize, Serialize};

/// One page of history, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Effective 1-based page after clamping
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Paginate an ascending list in descending order.
///
/// `page` is clamped into `1..=total_pages`; a `page_size` of 0 is treated as 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let skip = (page - 1) * page_size;
    let items = items
        .iter()
        .rev()
        .skip(skip)
        .take(page_size)
        .cloned()
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}
