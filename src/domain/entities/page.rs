use serde::Serialize;

/// One page of a listing together with the total item count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, page_size: i64, total: i64) -> Self {
        Self {
            items,
            page,
            page_size,
            total,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.page_size <= 0 {
            return 0;
        }
        (self.total + self.page_size - 1) / self.page_size
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Converts a 1-based page number and page size into a row offset.
pub fn offset(page: i64, page_size: i64) -> i64 {
    (page.max(1) - 1) * page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(Page::<i32>::new(vec![], 1, 10, 0).total_pages(), 0);
        assert_eq!(Page::<i32>::new(vec![], 1, 10, 10).total_pages(), 1);
        assert_eq!(Page::<i32>::new(vec![], 1, 10, 11).total_pages(), 2);
    }

    #[test]
    fn test_navigation() {
        let first = Page::<i32>::new(vec![], 1, 10, 25);
        assert!(!first.has_prev());
        assert!(first.has_next());

        let last = Page::<i32>::new(vec![], 3, 10, 25);
        assert!(last.has_prev());
        assert!(!last.has_next());
    }

    #[test]
    fn test_offset() {
        assert_eq!(offset(1, 20), 0);
        assert_eq!(offset(3, 20), 40);
        assert_eq!(offset(0, 20), 0);
    }
}
