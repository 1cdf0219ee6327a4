//! Pagination query parameters and response metadata.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::domain::entities::Page;

/// Pagination query parameters.
///
/// Uses `serde_with` to parse page numbers from query strings as integers.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<i64>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl PaginationParams {
    /// Validates the parameters and fills in defaults.
    ///
    /// # Returns
    ///
    /// `(page, page_size)`, 1-based page.
    ///
    /// # Errors
    ///
    /// - Page must be > 0
    /// - Page size must be between 1 and `max_page_size`
    pub fn resolve(&self, default_page_size: i64, max_page_size: i64) -> Result<(i64, i64), String> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(default_page_size);

        if page < 1 {
            return Err("Page must be greater than 0".to_string());
        }

        if !(1..=max_page_size).contains(&page_size) {
            return Err(format!("Page size must be between 1 and {}", max_page_size));
        }

        Ok((page, page_size))
    }
}

/// Pagination block included in list responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub page_size: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> From<&Page<T>> for PaginationMeta {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            page_size: page.page_size,
            total_items: page.total,
            total_pages: page.total_pages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, page_size: Option<i64>) -> PaginationParams {
        PaginationParams { page, page_size }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(params(None, None).resolve(12, 50).unwrap(), (1, 12));
    }

    #[test]
    fn test_custom_page_and_size() {
        assert_eq!(params(Some(3), Some(50)).resolve(12, 50).unwrap(), (3, 50));
    }

    #[test]
    fn test_page_zero_is_error() {
        assert!(params(Some(0), None).resolve(12, 50).is_err());
        assert!(params(Some(-1), None).resolve(12, 50).is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(params(None, Some(0)).resolve(12, 50).is_err());
        assert!(params(None, Some(51)).resolve(12, 50).is_err());
        assert!(params(None, Some(1)).resolve(12, 50).is_ok());
    }

    #[test]
    fn test_query_string_parsing() {
        let p: PaginationParams = serde_json::from_str(r#"{"page": "2", "page_size": "20"}"#).unwrap();
        assert_eq!(p.page, Some(2));
        assert_eq!(p.page_size, Some(20));
    }

    #[test]
    fn test_meta_from_page() {
        let page = Page::new(vec![1, 2], 2, 2, 5);
        let meta = PaginationMeta::from(&page);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.total_items, 5);
    }
}
