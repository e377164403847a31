//! Page requests and responses

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Requested page window. Pages are 1-based; size is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Returns None when `page` is 0 or `size` is 0
    pub fn new(page: u32, size: u32) -> Option<Self> {
        if page == 0 || size == 0 {
            return None;
        }
        Some(Self { page, size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Index range of this page within a sequence of `total` items.
    ///
    /// Empty when the page lies beyond the end of the sequence.
    pub fn window(&self, total: usize) -> Range<usize> {
        let size = self.size as usize;
        let start = (self.page as usize - 1).saturating_mul(size);
        if start >= total {
            return total..total;
        }
        start..start.saturating_add(size).min(total)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Page metadata published alongside every windowed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageResponse {
    /// Requested page (not clamped to `pages`)
    pub page: u32,
    pub page_size: u32,
    /// Items satisfying the filter, before paging
    pub total_size: usize,
    pub pages: u32,
}

impl PageResponse {
    pub fn new(request: PageRequest, total_size: usize) -> Self {
        let size = request.size() as usize;
        let pages = total_size.div_ceil(size);
        Self {
            page: request.page(),
            page_size: request.size(),
            total_size,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}
