//! Deterministic page slicing for the book feed.
//!
//! The feed endpoint accepts `?page=&limit=` where both default when
//! absent. Values are clamped here rather than rejected: a zero or
//! negative `page` would otherwise produce a negative skip, and an
//! unclamped `limit` is a resource-exhaustion gap.

/// Default page number when the query parameter is absent.
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size when the query parameter is absent.
pub const DEFAULT_LIMIT: i64 = 5;

/// Upper bound on the page size a single request may ask for.
pub const MAX_LIMIT: i64 = 100;

/// Normalized pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Build a request from raw (possibly absent, possibly out-of-range)
    /// query values, applying defaults and clamps.
    pub fn from_raw(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        Self { page, limit }
    }

    /// Number of rows to skip: `(page - 1) * limit`.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Total number of pages needed for `total_items` rows.
    pub fn total_pages(&self, total_items: i64) -> i64 {
        if total_items <= 0 {
            0
        } else {
            (total_items + self.limit - 1) / self.limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let req = PageRequest::from_raw(None, None);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 5);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn twelve_items_limit_five() {
        // 12 items, limit 5: pages are 1-5, 6-10, 11-12.
        let page1 = PageRequest::from_raw(Some(1), Some(5));
        assert_eq!(page1.offset(), 0);
        assert_eq!(page1.total_pages(12), 3);

        let page3 = PageRequest::from_raw(Some(3), Some(5));
        assert_eq!(page3.offset(), 10);
        assert_eq!(page3.total_pages(12), 3);
    }

    #[test]
    fn zero_and_negative_page_clamp_to_one() {
        assert_eq!(PageRequest::from_raw(Some(0), None).offset(), 0);
        assert_eq!(PageRequest::from_raw(Some(-4), None).offset(), 0);
    }

    #[test]
    fn limit_is_clamped_to_ceiling() {
        let req = PageRequest::from_raw(None, Some(10_000));
        assert_eq!(req.limit, MAX_LIMIT);

        let req = PageRequest::from_raw(None, Some(0));
        assert_eq!(req.limit, 1);
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest::from_raw(None, Some(5));
        assert_eq!(req.total_pages(0), 0);
        assert_eq!(req.total_pages(1), 1);
        assert_eq!(req.total_pages(5), 1);
        assert_eq!(req.total_pages(6), 2);
    }
}
