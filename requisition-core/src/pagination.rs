//! Client-side pagination over already-fetched, already-filtered collections.

use serde::{Deserialize, Serialize};

/// A page request clamped to the bounds of the collection it paginates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    pub page: usize,
    pub page_size: usize,
}

impl Paginator {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size: page_size.max(1),
        }
    }

    /// Number of pages for `total` items; an empty collection still has one
    /// (empty) page so the page indicator never reads "0 of 0".
    pub fn total_pages(&self, total: usize) -> usize {
        if total == 0 {
            1
        } else {
            total.div_ceil(self.page_size)
        }
    }

    /// Current page clamped to `[1, total_pages]`.
    pub fn clamped_page(&self, total: usize) -> usize {
        self.page.clamp(1, self.total_pages(total))
    }

    /// The slice of `items` visible on the (clamped) current page.
    pub fn page_of<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let page = self.clamped_page(items.len());
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(items.len());
        if start >= items.len() {
            &[]
        } else {
            &items[start..end]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_to_upper_bound() {
        let p = Paginator::new(99, 10);
        assert_eq!(p.clamped_page(25), 3);
    }

    #[test]
    fn page_clamps_to_lower_bound() {
        let p = Paginator::new(0, 10);
        assert_eq!(p.clamped_page(25), 1);
    }

    #[test]
    fn empty_collection_has_one_page() {
        let p = Paginator::new(1, 10);
        assert_eq!(p.total_pages(0), 1);
        let items: Vec<i32> = vec![];
        assert!(p.page_of(&items).is_empty());
    }

    #[test]
    fn last_page_is_partial() {
        let items: Vec<i32> = (0..25).collect();
        let p = Paginator::new(3, 10);
        assert_eq!(p.page_of(&items), &[20, 21, 22, 23, 24]);
    }

    #[test]
    fn zero_page_size_is_bumped_to_one() {
        let p = Paginator::new(1, 0);
        assert_eq!(p.page_size, 1);
    }
}
