use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Normalised page request: `page >= 1`, `limit` in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let limit = limit
            .unwrap_or(DEFAULT_LIMIT as i64)
            .clamp(1, MAX_LIMIT as i64) as u32;

        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    pub fn meta(&self, total: i64) -> PageMeta {
        let limit = self.limit as i64;
        PageMeta {
            total,
            page: self.page,
            limit: self.limit,
            total_pages: (total.max(0) + limit - 1) / limit,
        }
    }

    /// Slice of an already ordered collection; used by the in-memory store.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.offset() as usize).min(items.len());
        let end = start.saturating_add(self.limit as usize).min(items.len());
        &items[start..end]
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[schema(example = 42)]
    pub total: i64,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 5)]
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_to_first_page_of_ten() {
        let p = Pagination::new(None, None);
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination { page: 1, limit: 1 });
        assert_eq!(Pagination::new(Some(-4), Some(500)), Pagination { page: 1, limit: 100 });
    }

    #[test]
    fn second_page_of_ten_starts_at_eleventh_item() {
        let items: Vec<u32> = (1..=25).collect();
        let p = Pagination::new(Some(2), Some(10));

        assert_eq!(p.offset(), 10);
        assert_eq!(p.slice(&items), &items[10..20]);
        assert_eq!(p.meta(25).total_pages, 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let items = vec![1, 2, 3];
        assert!(Pagination::new(Some(5), Some(10)).slice(&items).is_empty());
    }

    #[test]
    fn zero_total_has_zero_pages() {
        assert_eq!(Pagination::default().meta(0).total_pages, 0);
    }

    proptest! {
        #[test]
        fn total_pages_is_ceiling_division(total in 0i64..100_000, limit in 1i64..=100) {
            let meta = Pagination::new(Some(1), Some(limit)).meta(total);
            let expected = (total as f64 / limit as f64).ceil() as i64;
            prop_assert_eq!(meta.total_pages, expected);
        }
    }
}
