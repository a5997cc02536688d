use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 50;

/// 1-indexed page request. Zero or absent fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    fn effective(&self) -> (u32, u32) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);
        (page, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

/// Slice `items` down to the requested page.
///
/// Total pages is `ceil(total / limit)` with a floor of one, so an empty set
/// still reports page 1 of 1. `has_more` holds iff the requested page is
/// before the last.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> (Vec<T>, PageInfo) {
    let (page, limit) = request.effective();
    let total = items.len() as u32;
    let total_pages = total.div_ceil(limit).max(1);

    let start = ((page - 1) as usize).saturating_mul(limit as usize);
    let paged: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(limit as usize)
        .collect();

    (
        paged,
        PageInfo {
            page,
            limit,
            total,
            total_pages,
            has_more: page < total_pages,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_one_page_with_no_more() {
        let (items, info) = paginate(Vec::<u32>::new(), PageRequest::default());
        assert!(items.is_empty());
        assert_eq!(info.page, 1);
        assert_eq!(info.limit, 50);
        assert_eq!(info.total, 0);
        assert_eq!(info.total_pages, 1);
        assert!(!info.has_more);
    }

    #[test]
    fn total_pages_is_ceiling() {
        let items: Vec<u32> = (0..101).collect();
        let (_, info) = paginate(items, PageRequest::new(1, 50));
        assert_eq!(info.total, 101);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_more);
    }

    #[test]
    fn last_page_carries_remainder() {
        let items: Vec<u32> = (0..101).collect();
        let (page_items, info) = paginate(items, PageRequest::new(3, 50));
        assert_eq!(page_items, vec![100]);
        assert!(!info.has_more);
    }

    #[test]
    fn page_past_the_end_is_empty_not_panic() {
        let items: Vec<u32> = (0..10).collect();
        let (page_items, info) = paginate(items, PageRequest::new(5, 10));
        assert!(page_items.is_empty());
        assert_eq!(info.total_pages, 1);
        assert!(!info.has_more);
    }

    #[test]
    fn zero_page_and_limit_fall_back_to_defaults() {
        let items: Vec<u32> = (0..60).collect();
        let (page_items, info) = paginate(items, PageRequest::new(0, 0));
        assert_eq!(info.page, 1);
        assert_eq!(info.limit, 50);
        assert_eq!(page_items.len(), 50);
        assert!(info.has_more);
    }

    #[test]
    fn exact_multiple_has_no_extra_page() {
        let items: Vec<u32> = (0..100).collect();
        let (_, info) = paginate(items, PageRequest::new(2, 50));
        assert_eq!(info.total_pages, 2);
        assert!(!info.has_more);
    }
}
