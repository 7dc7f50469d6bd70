//! 1-based page slicing

use serde::{Deserialize, Serialize};

use crate::core::{DirectoryError, DirectoryResult};

/// Pagination descriptor returned alongside every page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

/// Slice `items` to page `page` (clamped to at least 1) of `page_size` items.
///
/// Pages past the end are empty, not errors.
pub fn paginate<T>(items: Vec<T>, page: i64, page_size: i64) -> DirectoryResult<Page<T>> {
    if page_size <= 0 {
        return Err(DirectoryError::InvalidPageSize(page_size));
    }
    let page = page.max(1);
    let total = items.len();
    let size = usize::try_from(page_size).unwrap_or(usize::MAX);
    let start = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(size);
    let end = start.saturating_add(size);

    let data: Vec<T> = if start >= total {
        Vec::new()
    } else {
        items.into_iter().skip(start).take(size).collect()
    };

    Ok(Page {
        data,
        pagination: Pagination {
            page,
            limit: page_size,
            total,
            total_pages: total.div_ceil(size),
            has_next: end < total,
            has_prev: page > 1,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_and_last_page() {
        let items: Vec<u32> = (0..25).collect();

        let first = paginate(items.clone(), 1, 10).unwrap();
        assert_eq!(first.data, (0..10).collect::<Vec<_>>());
        assert!(first.pagination.has_next);
        assert!(!first.pagination.has_prev);
        assert_eq!(first.pagination.total_pages, 3);

        let last = paginate(items, 3, 10).unwrap();
        assert_eq!(last.data, (20..25).collect::<Vec<_>>());
        assert!(!last.pagination.has_next);
        assert!(last.pagination.has_prev);
    }

    #[test]
    fn test_page_clamped_and_size_rejected() {
        let clamped = paginate(vec![1, 2, 3], -4, 2).unwrap();
        assert_eq!(clamped.pagination.page, 1);
        assert_eq!(clamped.data, vec![1, 2]);

        assert!(matches!(
            paginate(vec![1], 1, 0),
            Err(DirectoryError::InvalidPageSize(0))
        ));
    }

    #[test]
    fn test_empty_list_and_past_end() {
        let empty = paginate(Vec::<u8>::new(), 1, 10).unwrap();
        assert_eq!(empty.pagination.total_pages, 0);
        assert!(!empty.pagination.has_next);

        let past = paginate(vec![1, 2], 9, 10).unwrap();
        assert!(past.data.is_empty());
        assert!(past.pagination.has_prev);
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = paginate(vec![1], 1, 5).unwrap();
        let value = serde_json::to_value(page.pagination).unwrap();
        assert_eq!(value["totalPages"], 1);
        assert_eq!(value["hasNext"], false);
    }

    proptest! {
        #[test]
        fn prop_page_matches_slice(len in 0usize..200, page in -3i64..30, size in 1i64..40) {
            let items: Vec<usize> = (0..len).collect();
            let result = paginate(items.clone(), page, size).unwrap();

            let p = page.max(1) as usize;
            let s = size as usize;
            let start = ((p - 1) * s).min(len);
            let end = (p * s).min(len);
            prop_assert_eq!(&result.data[..], &items[start..end]);
            prop_assert_eq!(result.pagination.has_next, p * s < len);
            prop_assert_eq!(result.pagination.has_prev, p > 1);
            prop_assert_eq!(result.pagination.total_pages, (len + s - 1) / s);
        }
    }
}
