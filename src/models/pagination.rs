use serde::Serialize;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Normalized limit/offset pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// 1-based page numbers, as used by the admin console.
    pub fn from_page_number(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let limit = limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
        let page = page.unwrap_or(1).max(1);
        Self { limit, offset: (page - 1).saturating_mul(limit) }
    }

    pub fn with_total(self, total: i64) -> Pagination {
        Pagination { total, limit: self.limit, offset: self.offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(Page::new(None, None, 20), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(1000), Some(-5), 20), Page { limit: 100, offset: 0 });
        assert_eq!(Page::new(Some(0), Some(40), 20), Page { limit: 1, offset: 40 });
    }

    #[test]
    fn page_numbers_convert_to_offsets() {
        assert_eq!(Page::from_page_number(Some(3), Some(10), 10).offset, 20);
        assert_eq!(Page::from_page_number(Some(0), None, 10).offset, 0);
    }

    #[test]
    fn huge_page_number_saturates_instead_of_overflowing() {
        let page = Page::from_page_number(Some(i64::MAX), Some(100), 20);
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, i64::MAX);
        assert_eq!(Page::from_page_number(Some(i64::MIN), Some(100), 20).offset, 0);
    }
}
