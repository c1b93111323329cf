use serde::Serialize;
use std::num::NonZeroUsize;

/// Requested page size and 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_size: NonZeroUsize,
    pub current_page: usize,
}

impl PageWindow {
    pub fn new(page_size: NonZeroUsize, current_page: usize) -> Self {
        PageWindow {
            page_size,
            current_page: current_page.max(1),
        }
    }

    pub fn total_pages(&self, total_items: usize) -> usize {
        total_items.div_ceil(self.page_size.get()).max(1)
    }

    /// Next page, or the same page when already on the last one.
    pub fn next(self, total_pages: usize) -> Self {
        PageWindow {
            current_page: self.current_page.saturating_add(1).min(total_pages.max(1)),
            ..self
        }
    }

    /// Previous page, or page 1 when already there.
    pub fn prev(self) -> Self {
        PageWindow {
            current_page: self.current_page.saturating_sub(1).max(1),
            ..self
        }
    }
}

/// One page of a sequence plus the paging numbers the view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
}

/// Slice `items` to the requested page.
///
/// `current_page` is clamped into `1..=total_pages`, so a page number left
/// over from a larger sequence lands on the last page rather than an empty one.
pub fn paginate<T: Clone>(items: &[T], window: PageWindow) -> Page<T> {
    let size = window.page_size.get();
    let total_pages = window.total_pages(items.len());
    let current_page = window.current_page.clamp(1, total_pages);

    let start = ((current_page - 1) * size).min(items.len());
    let end = (start + size).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        total_pages,
        current_page,
        page_size: size,
        total_items: items.len(),
    }
}
