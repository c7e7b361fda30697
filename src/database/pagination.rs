use serde::{Deserialize, Serialize};

use super::error::{ApiError, TypeError};
use crate::constants::MAX_PAGE_SIZE;

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// 1-based page number and page size, read from `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: i64,
    ) -> Result<Self, TypeError> {
        let page = match page {
            Some(page) => page
                .parse::<i64>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| TypeError::new("page must be a positive integer"))?,
            None => 1,
        };
        let limit = match limit {
            Some(limit) => limit
                .parse::<i64>()
                .ok()
                .filter(|l| *l >= 1)
                .ok_or_else(|| TypeError::new("limit must be a positive integer"))?,
            None => default_limit,
        };

        let request = Self::new(page, limit);
        if request.page.checked_mul(request.limit).is_none() {
            return Err(TypeError::new("page must be a positive integer"));
        }

        Ok(request)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// An empty page past the first one does not exist.
    pub fn check_rows<T>(&self, rows: &[T]) -> Result<(), ApiError> {
        if rows.is_empty() && self.page > 1 {
            return Err(ApiError::Missing("Invalid page"));
        }
        Ok(())
    }

    fn link(&self, page: i64) -> String {
        format!("?page={page}&limit={}", self.limit)
    }
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        let next = if request.page.saturating_mul(request.limit) < total_rows {
            Some(request.link(request.page + 1))
        } else {
            None
        };
        let previous = if request.page > 1 {
            let last_page = ((total_rows + request.limit - 1) / request.limit).max(1);
            Some(request.link((request.page - 1).min(last_page)))
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn map<U, F>(self, f: F) -> PageContext<U>
    where
        F: FnMut(T) -> U,
    {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_links_forward_only() {
        let page = PageContext::from_rows(vec![1, 2, 3], 7, PageRequest::new(1, 3));

        assert_eq!(page.count, 7);
        assert_eq!(page.next.as_deref(), Some("?page=2&limit=3"));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn last_page_links_backward_only() {
        let page = PageContext::from_rows(vec![7], 7, PageRequest::new(3, 3));

        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("?page=2&limit=3"));
    }

    #[test]
    fn page_past_the_end_points_back_to_the_last_page() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 4, PageRequest::new(9, 2));

        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("?page=2&limit=2"));
    }

    #[test]
    fn parses_query_values() {
        assert_eq!(
            PageRequest::parse(Some("2"), Some("10"), 6).unwrap(),
            PageRequest { page: 2, limit: 10 }
        );
        assert_eq!(PageRequest::parse(None, None, 6).unwrap().limit, 6);
        assert_eq!(PageRequest::parse(None, Some("1000"), 6).unwrap().limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(3, 5).offset(), 10);

        assert!(PageRequest::parse(Some("0"), None, 6).is_err());
        assert!(PageRequest::parse(Some("-3"), None, 6).is_err());
        assert!(PageRequest::parse(None, Some("many"), 6).is_err());
    }

    #[test]
    fn huge_page_numbers_are_rejected() {
        assert!(PageRequest::parse(Some("9223372036854775807"), None, 6).is_err());
        assert!(PageRequest::parse(Some("9223372036854775807"), Some("1"), 6).is_ok());

        let request = PageRequest::new(i64::MAX, MAX_PAGE_SIZE);
        assert_eq!(request.offset(), i64::MAX);
        assert_eq!(
            PageContext::from_rows(Vec::<i32>::new(), 10, request).next,
            None
        );
    }

    #[test]
    fn empty_page_after_the_first_is_missing() {
        let empty: Vec<i32> = vec![];

        assert!(matches!(
            PageRequest::new(9, 6).check_rows(&empty),
            Err(ApiError::Missing("Invalid page"))
        ));
        assert!(PageRequest::new(1, 6).check_rows(&empty).is_ok());
        assert!(PageRequest::new(2, 6).check_rows(&[1]).is_ok());
    }
}
