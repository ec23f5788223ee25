//! Pagination request and response envelope.

use serde::Serialize;

pub const PAGE_SIZE_MAX: u32 = 100;

/// Zero-based page request with a clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Builds a request; `size` of zero or none falls back to `default_size`
    /// and anything above `PAGE_SIZE_MAX` is clamped.
    pub fn new(page: Option<u32>, size: Option<u32>, default_size: u32) -> Self {
        let size = match size {
            None | Some(0) => default_size,
            Some(value) => value.min(PAGE_SIZE_MAX),
        };
        Self {
            page: page.unwrap_or(0),
            size: size.clamp(1, PAGE_SIZE_MAX),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// One page of results with totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size);
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, PageRequest, PAGE_SIZE_MAX};

    #[test]
    fn request_defaults_and_clamps_size() {
        assert_eq!(PageRequest::new(None, None, 10).size, 10);
        assert_eq!(PageRequest::new(None, Some(0), 20).size, 20);
        assert_eq!(PageRequest::new(Some(2), Some(500), 10).size, PAGE_SIZE_MAX);
        assert_eq!(PageRequest::new(Some(3), Some(10), 10).offset(), 30);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], PageRequest::new(Some(0), Some(2), 10), 5);
        assert_eq!(page.total_pages, 3);

        let empty: Page<i32> = Page::new(Vec::new(), PageRequest::new(None, None, 10), 0);
        assert_eq!(empty.total_pages, 0);
    }
}
