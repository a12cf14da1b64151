//! Page requests, page results and pagination metadata

use crate::core::error::{RepositoryError, RepositoryResult};
use crate::query::sort::Sort;
use serde::{Deserialize, Serialize};

/// A request for one page of an ordered result set
///
/// Page indexes start at 0; the size is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: usize,
    size: usize,
    #[serde(default)]
    sort: Sort,
}

impl PageRequest {
    /// Create a page request, rejecting a zero page size
    pub fn of(page: usize, size: usize) -> RepositoryResult<Self> {
        if size == 0 {
            return Err(RepositoryError::InvalidPageRequest(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            page,
            size,
            sort: Sort::unsorted(),
        })
    }

    /// Create a sorted page request
    pub fn sorted(page: usize, size: usize, sort: Sort) -> RepositoryResult<Self> {
        Ok(Self::of(page, size)?.with_sort(sort))
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Zero-based page index
    pub fn page_number(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Number of rows to skip
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    /// The offset/limit window this page covers
    pub fn window(&self) -> QueryWindow {
        QueryWindow {
            offset: self.offset(),
            limit: Some(self.size),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }

    pub fn first(&self) -> Self {
        Self {
            page: 0,
            ..self.clone()
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    /// Clamp the page size to `max`
    pub(crate) fn clamped(mut self, max: Option<usize>) -> Self {
        if let Some(max) = max {
            self.size = self.size.clamp(1, max.max(1));
        }
        self
    }
}

/// Offset/limit slice of a result set handed to the persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryWindow {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl QueryWindow {
    pub fn limit(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }

    /// Apply the window to an already ordered sequence
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let rows = rows.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

/// One page of results plus totals across all pages
///
/// A page built without a request (`unpaged`) holds every matching row in a
/// single page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    total_elements: u64,
    request: Option<PageRequest>,
}

impl<T> Page<T> {
    /// Create a page for `request` with the given total
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            total_elements,
            request: Some(request),
        }
    }

    /// A single page holding all rows
    pub fn unpaged(content: Vec<T>) -> Self {
        let total_elements = content.len() as u64;
        Self {
            content,
            total_elements,
            request: None,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    /// `ceil(total_elements / size)`; an unpaged page is always one page
    pub fn total_pages(&self) -> usize {
        match &self.request {
            Some(request) => (self.total_elements as usize).div_ceil(request.page_size()),
            None => 1,
        }
    }

    /// Zero-based page index
    pub fn number(&self) -> usize {
        self.request.as_ref().map_or(0, PageRequest::page_number)
    }

    /// Requested page size (the content length for unpaged pages)
    pub fn size(&self) -> usize {
        self.request
            .as_ref()
            .map_or(self.content.len(), PageRequest::page_size)
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn has_previous(&self) -> bool {
        self.number() > 0
    }

    pub fn has_next(&self) -> bool {
        self.number() + 1 < self.total_pages()
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn request(&self) -> Option<&PageRequest> {
        self.request.as_ref()
    }

    /// Request for the following page, if there is one
    pub fn next_request(&self) -> Option<PageRequest> {
        self.request
            .as_ref()
            .filter(|_| self.has_next())
            .map(PageRequest::next)
    }

    /// Convert the content, keeping paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            request: self.request,
        }
    }

    pub fn metadata(&self) -> PaginationMeta {
        PaginationMeta {
            page: self.number(),
            size: self.size(),
            total: self.total_elements,
            total_pages: self.total_pages(),
            has_next: self.has_next(),
            has_prev: self.has_previous(),
        }
    }

    /// Serializable form of the page
    pub fn into_response(self) -> PaginatedResponse<T> {
        let pagination = self.metadata();
        PaginatedResponse {
            data: self.content,
            pagination,
        }
    }
}

/// Paginated response structure
///
/// This structure wraps paginated data with metadata about pagination state.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Current page index (starts at 0)
    pub page: usize,

    /// Number of items per page
    pub size: usize,

    /// Total number of items (after filters)
    pub total: u64,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_rejected() {
        let err = PageRequest::of(0, 0).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PAGE_REQUEST");
    }

    #[test]
    fn test_offset_and_navigation() {
        let request = PageRequest::of(2, 10).unwrap();
        assert_eq!(request.offset(), 20);
        assert_eq!(request.next().page_number(), 3);
        assert_eq!(request.previous_or_first().page_number(), 1);
        assert_eq!(request.first().page_number(), 0);
        assert!(!request.first().has_previous());
    }

    #[test]
    fn test_page_arithmetic() {
        let page = Page::new(vec![1, 2, 3], PageRequest::of(0, 3).unwrap(), 145);
        assert_eq!(page.total_pages(), 49);
        assert!(page.is_first());
        assert!(page.has_next());
        assert_eq!(page.next_request().map(|r| r.page_number()), Some(1));
    }

    #[test]
    fn test_last_page() {
        let page = Page::new(vec![7], PageRequest::of(2, 3).unwrap(), 7);
        assert_eq!(page.total_pages(), 3);
        assert!(page.is_last());
        assert!(page.has_previous());
        assert_eq!(page.next_request(), None);
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let page: Page<i32> = Page::new(vec![], PageRequest::of(0, 5).unwrap(), 0);
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
        assert!(!page.has_content());
    }

    #[test]
    fn test_unpaged_is_a_single_page() {
        let page = Page::unpaged(vec!["a", "b", "c"]);
        assert_eq!(page.total_elements(), 3);
        assert_eq!(page.total_pages(), 1);
        assert_eq!(page.size(), 3);
        assert!(page.is_first() && page.is_last());
    }

    #[test]
    fn test_window_apply() {
        let rows = vec![1, 2, 3, 4, 5];
        assert_eq!(PageRequest::of(1, 2).unwrap().window().apply(rows.clone()), vec![3, 4]);
        assert_eq!(QueryWindow::limit(1).apply(rows.clone()), vec![1]);
        assert_eq!(QueryWindow::default().apply(rows), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_clamp() {
        let request = PageRequest::of(0, 500).unwrap().clamped(Some(100));
        assert_eq!(request.page_size(), 100);
    }

    #[test]
    fn test_response_serialization() {
        let page = Page::new(vec!["x"], PageRequest::of(0, 1).unwrap(), 2);
        let json = serde_json::to_value(page.into_response()).unwrap();
        assert_eq!(json["data"], serde_json::json!(["x"]));
        assert_eq!(json["pagination"]["total_pages"], 2);
        assert_eq!(json["pagination"]["has_next"], true);
        assert_eq!(json["pagination"]["has_prev"], false);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let page = Page::new(vec![1, 2], PageRequest::of(0, 2).unwrap(), 5);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.content(), &[10, 20]);
        assert_eq!(mapped.total_elements(), 5);
        assert_eq!(mapped.total_pages(), 3);
    }
}
