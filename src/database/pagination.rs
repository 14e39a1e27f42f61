use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Requested page. Pages are 1-based; a page past the end is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page number
    pub page_index: u32,
    pub page_size: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: 10,
        }
    }
}

impl PaginationParams {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self { page_index, page_size }
    }

    pub fn is_valid(&self) -> bool {
        self.page_index >= 1 && self.page_size >= 1
    }

    /// Clamp the page size into `1..=max`
    pub fn capped(self, max: u32) -> Self {
        Self {
            page_index: self.page_index.max(1),
            page_size: self.page_size.clamp(1, max.max(1)),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page_index.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

/// Page metadata, also sent to clients in the `X-Pagination` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageMeta {
    pub fn new(params: &PaginationParams, total_count: i64) -> Self {
        let page_size = i64::from(params.page_size.max(1));
        let total_pages = (total_count + page_size - 1) / page_size;
        let current = i64::from(params.page_index);
        Self {
            current_page: params.page_index,
            page_size: params.page_size,
            total_count,
            total_pages,
            has_previous: current > 1,
            has_next: current < total_pages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            meta: self.meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_follow_page_index() {
        assert_eq!(PaginationParams::new(1, 10).offset(), 0);
        assert_eq!(PaginationParams::new(3, 10).offset(), 20);
        assert_eq!(PaginationParams::new(3, 10).limit(), 10);
    }

    #[test]
    fn validity_and_capping() {
        assert!(!PaginationParams::new(0, 10).is_valid());
        assert!(!PaginationParams::new(1, 0).is_valid());
        assert_eq!(PaginationParams::new(0, 500).capped(100), PaginationParams::new(1, 100));
        assert_eq!(PaginationParams::new(2, 0).capped(100), PaginationParams::new(2, 1));
    }

    #[test]
    fn meta_for_partial_last_page() {
        let meta = PageMeta::new(&PaginationParams::new(3, 10), 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_previous);
        assert!(!meta.has_next);

        let meta = PageMeta::new(&PaginationParams::new(1, 10), 0);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
    }
}
