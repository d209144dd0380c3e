//! Shared query parameter types for API handlers.

use serde::Deserialize;
use taskforge_core::pagination::{clamp_limit, clamp_page, page_to_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Page-based pagination (`?page=&limit=`), 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    /// Clamped `(page, limit, offset)`.
    pub fn resolve(&self) -> (i64, i64, i64) {
        let page = clamp_page(self.page);
        let limit = clamp_limit(self.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        (page, limit, page_to_offset(page, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_and_clamps() {
        assert_eq!(PageParams::default().resolve(), (1, DEFAULT_PAGE_SIZE, 0));
        let params = PageParams {
            page: Some(3),
            limit: Some(10_000),
        };
        assert_eq!(params.resolve(), (3, MAX_PAGE_SIZE, 2 * MAX_PAGE_SIZE));
    }
}
