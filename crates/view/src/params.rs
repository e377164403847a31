//! Parameter stores
//!
//! Observable cells the display layer writes into. Each [`Property`] only
//! notifies observers when the stored value actually changes.

use blotter_core::{DEFAULT_PAGE_SIZE, PageRequest, PageResponse, SortSelection};
use std::sync::Arc;
use tokio::sync::watch;

/// Observable value cell
pub struct Property<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Property<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Store a value. Returns false (and notifies nobody) if it was unchanged.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq + Default + Send + Sync + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Paging controls plus the last page metadata published by the view
#[derive(Clone)]
pub struct PageParameters {
    pub current_page: Property<u32>,
    pub page_size: Property<u32>,
    pub response: Property<PageResponse>,
}

impl Default for PageParameters {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageParameters {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: Property::new(1),
            page_size: Property::new(page_size),
            response: Property::default(),
        }
    }

    /// Current page request, if the stored page and size are usable
    pub fn request(&self) -> Option<PageRequest> {
        PageRequest::new(self.current_page.get(), self.page_size.get())
    }

    pub fn can_next(&self) -> bool {
        self.current_page.get() < self.response.get().pages
    }

    pub fn can_previous(&self) -> bool {
        self.current_page.get() > 1
    }

    /// Step forward, bounded by the page count last published
    pub fn next_page(&self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.current_page.set(self.current_page.get() + 1)
    }

    pub fn previous_page(&self) -> bool {
        if !self.can_previous() {
            return false;
        }
        self.current_page.set(self.current_page.get() - 1)
    }

    pub fn total_size(&self) -> usize {
        self.response.get().total_size
    }

    pub fn page_count(&self) -> u32 {
        self.response.get().pages
    }
}

/// Everything the display layer controls
#[derive(Clone)]
pub struct ViewParameters {
    pub search_text: Property<String>,
    pub sort: Property<SortSelection>,
    pub page: PageParameters,
}

impl Default for ViewParameters {
    fn default() -> Self {
        Self::new(SortSelection::default(), DEFAULT_PAGE_SIZE)
    }
}

impl ViewParameters {
    pub fn new(sort: SortSelection, page_size: u32) -> Self {
        Self {
            search_text: Property::new(String::new()),
            sort: Property::new(sort),
            page: PageParameters::new(page_size),
        }
    }
}
