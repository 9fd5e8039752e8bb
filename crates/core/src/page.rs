//! Offset paging for list endpoints.

use serde::{Deserialize, Serialize};

/// Requested page (1-based).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "PageRequest::default_page")]
    pub page: u32,
    #[serde(default = "PageRequest::default_per_page")]
    pub per_page: u32,
}

impl PageRequest {
    pub const MAX_PER_PAGE: u32 = 100;

    fn default_page() -> u32 {
        1
    }

    fn default_per_page() -> u32 {
        20
    }

    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Clamp to sane bounds: page ≥ 1, 1 ≤ per_page ≤ [`Self::MAX_PER_PAGE`].
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Cut one page out of an already filtered and sorted result set.
    pub fn apply<T>(self, items: Vec<T>) -> Page<T> {
        let req = self.normalized();
        let total = items.len();
        let start = (req.page as usize - 1).saturating_mul(req.per_page as usize);
        let items = items
            .into_iter()
            .skip(start)
            .take(req.per_page as usize)
            .collect();
        Page {
            items,
            page: req.page,
            per_page: req.per_page,
            total,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::default_page(), Self::default_per_page())
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_slices_requested_page() {
        let page = PageRequest::new(2, 3).apply((1..=8).collect::<Vec<_>>());
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 8);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let page = PageRequest::new(5, 10).apply(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn normalized_clamps_bounds() {
        let req = PageRequest::new(0, 10_000).normalized();
        assert_eq!(req, PageRequest::new(1, PageRequest::MAX_PER_PAGE));
    }
}
