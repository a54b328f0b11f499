use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use log::trace;
use log::warn;

use crate::error::Error;
use crate::error::Result;
use crate::page_array::ObjectArray;
use crate::page_array::PageArray;
use crate::page_array::Word;

/// Slots per page: 16 KiB of `u64` words.
pub const DEFAULT_PAGE_WORDS: usize = 2048;

/// Freed word pages kept around for reuse.
pub const DEFAULT_RETAINED_PAGES: usize = 1024;

pub(crate) type Page = Box<[u64]>;

/// Sizing and budget of a [`PagePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Slots per page. Must be a non-zero power of two.
    pub page_words: usize,
    /// Maximum pages outstanding at once, `None` for no limit.
    pub max_pages: Option<usize>,
    /// Maximum freed pages cached for reuse.
    pub retained_pages: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            page_words: DEFAULT_PAGE_WORDS,
            max_pages: None,
            retained_pages: DEFAULT_RETAINED_PAGES,
        }
    }
}

impl PoolConfig {
    /// Sets the page size in slots.
    pub fn page_words(mut self, page_words: usize) -> Self {
        self.page_words = page_words;
        self
    }

    /// Caps the number of pages outstanding at once.
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Sets how many freed pages are cached for reuse.
    pub fn retained_pages(mut self, retained_pages: usize) -> Self {
        self.retained_pages = retained_pages;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.page_words == 0 || !self.page_words.is_power_of_two() {
            return Err(Error::invalid_argument(
                "page_words",
                format!("must be a non-zero power of two, got {}", self.page_words),
            ));
        }
        Ok(())
    }
}

struct Inner {
    config: PoolConfig,
    page_shift: u32,
    in_use: AtomicUsize,
    free: Mutex<Vec<Page>>,
}

/// Shared pool of fixed-size pages backing every [`PageArray`] and
/// [`ObjectArray`].
///
/// The handle is cheap to clone and safe to share between threads. Arrays
/// drawn from it are exclusively owned by whoever allocated them and give
/// their pages back on release or drop.
///
/// ```rust
/// use paged_hash::PagePool;
/// use paged_hash::PoolConfig;
///
/// let pool = PagePool::new(PoolConfig::default().page_words(64)).unwrap();
/// let mut array = pool.allocate::<i64>(100).unwrap();
/// array.set(99, -7);
/// assert_eq!(pool.pages_in_use(), 2);
///
/// array.release();
/// assert_eq!(pool.pages_in_use(), 0);
/// ```
#[derive(Clone)]
pub struct PagePool {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for PagePool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagePool")
            .field("config", &self.inner.config)
            .field("in_use", &self.pages_in_use())
            .field("cached", &self.pages_cached())
            .finish()
    }
}

impl Default for PagePool {
    fn default() -> Self {
        Self::from_valid(PoolConfig::default())
    }
}

impl PagePool {
    /// Creates a pool with the given config.
    ///
    /// Fails with [`Error::InvalidArgument`] when `page_words` is not a
    /// non-zero power of two.
    pub fn new(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: PoolConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                page_shift: config.page_words.trailing_zeros(),
                config,
                in_use: AtomicUsize::new(0),
                free: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Slots per page.
    pub fn page_words(&self) -> usize {
        self.inner.config.page_words
    }

    pub(crate) fn page_shift(&self) -> u32 {
        self.inner.page_shift
    }

    /// Pages currently held by live arrays.
    pub fn pages_in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Freed pages waiting for reuse.
    pub fn pages_cached(&self) -> usize {
        self.inner
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Allocates a zero-filled array of `len` slots.
    pub fn allocate<T: Word>(&self, len: usize) -> Result<PageArray<T>> {
        PageArray::new(self.clone(), len)
    }

    /// Allocates an array of `len` empty object slots.
    pub fn allocate_objects<T>(&self, len: usize) -> Result<ObjectArray<T>> {
        ObjectArray::new(self.clone(), len)
    }

    /// Number of pages needed to hold `len` slots.
    pub(crate) fn pages_for(&self, len: usize) -> usize {
        len.div_ceil(self.page_words())
    }

    /// Counts `pages` against the budget without handing out storage.
    pub(crate) fn reserve(&self, pages: usize) -> Result<()> {
        if pages == 0 {
            return Ok(());
        }

        let limit = self.inner.config.max_pages.unwrap_or(usize::MAX);
        self.inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                in_use.checked_add(pages).filter(|&total| total <= limit)
            })
            .map(|_| ())
            .map_err(|in_use| {
                warn!("page pool refused {pages} pages ({in_use} in use, limit {limit})");
                Error::AllocationFailure {
                    requested: pages,
                    in_use,
                    limit,
                }
            })
    }

    /// Returns `pages` to the budget.
    pub(crate) fn unreserve(&self, pages: usize) {
        if pages == 0 {
            return;
        }

        let previous = self.inner.in_use.fetch_sub(pages, Ordering::AcqRel);
        debug_assert!(
            previous >= pages,
            "released {pages} pages but only {previous} were outstanding"
        );
    }

    /// Hands out `count` zeroed word pages, reusing cached ones first.
    pub(crate) fn acquire(&self, count: usize) -> Result<Vec<Page>> {
        self.reserve(count)?;

        let mut pages = Vec::with_capacity(count);
        {
            let mut free = self.inner.free.lock().unwrap_or_else(PoisonError::into_inner);
            while pages.len() < count {
                match free.pop() {
                    Some(page) => pages.push(page),
                    None => break,
                }
            }
        }

        let reused = pages.len();
        for page in pages.iter_mut() {
            page.fill(0);
        }
        pages.resize_with(count, || {
            vec![0u64; self.page_words()].into_boxed_slice()
        });

        if reused > 0 {
            trace!("reused {reused} of {count} pages from pool");
        }
        Ok(pages)
    }

    /// Takes pages back, caching up to `retained_pages` of them.
    pub(crate) fn recycle(&self, pages: impl IntoIterator<Item = Page>) {
        let mut returned = 0;
        let mut kept = 0;
        {
            let mut free = self.inner.free.lock().unwrap_or_else(PoisonError::into_inner);
            for page in pages {
                debug_assert_eq!(page.len(), self.page_words());
                returned += 1;
                if free.len() < self.inner.config.retained_pages {
                    free.push(page);
                    kept += 1;
                }
            }
        }

        self.unreserve(returned);
        if returned > 0 {
            trace!("recycled {returned} pages, cached {kept}");
        }
    }
}
