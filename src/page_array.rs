use core::marker::PhantomData;
use core::ops::Range;

use crate::error::Result;
use crate::pool::Page;
use crate::pool::PagePool;

/// A `Copy` type that can be stored in a word page as raw `u64` bits.
pub trait Word: Copy {
    /// The bit pattern stored in the page.
    fn to_word(self) -> u64;
    /// Rebuilds the value from its stored bit pattern.
    fn from_word(word: u64) -> Self;
}

macro_rules! impl_word_as {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Word for $ty {
                #[inline(always)]
                fn to_word(self) -> u64 {
                    self as u64
                }

                #[inline(always)]
                fn from_word(word: u64) -> Self {
                    word as $ty
                }
            }
        )*
    };
}

impl_word_as!(u64, i64, usize);

impl Word for f64 {
    #[inline(always)]
    fn to_word(self) -> u64 {
        self.to_bits()
    }

    #[inline(always)]
    fn from_word(word: u64) -> Self {
        f64::from_bits(word)
    }
}

#[inline(always)]
fn check_bounds(index: usize, len: usize) {
    assert!(
        index < len,
        "index out of bounds: the len is {len} but the index is {index}"
    );
}

/// A large array of primitive slots split across pool pages.
///
/// Freshly allocated and freshly grown slots read as zero. Slots at or past
/// `len` are kept zeroed so a later grow never exposes stale data.
pub struct PageArray<T: Word> {
    pool: PagePool,
    pages: Vec<Page>,
    len: usize,
    shift: u32,
    page_mask: usize,
    _phantom: PhantomData<T>,
}

impl<T: Word + core::fmt::Debug> core::fmt::Debug for PageArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PageArray")
            .field("len", &self.len)
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl<T: Word> Drop for PageArray<T> {
    fn drop(&mut self) {
        self.pool.recycle(core::mem::take(&mut self.pages));
    }
}

impl<T: Word> PageArray<T> {
    pub(crate) fn new(pool: PagePool, len: usize) -> Result<Self> {
        let pages = pool.acquire(pool.pages_for(len))?;
        Ok(Self {
            shift: pool.page_shift(),
            page_mask: pool.page_words() - 1,
            pool,
            pages,
            len,
            _phantom: PhantomData,
        })
    }

    /// Number of logical slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Shorthand for `self.len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads slot `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        check_bounds(index, self.len);
        T::from_word(self.pages[index >> self.shift][index & self.page_mask])
    }

    /// Writes slot `index`, returning what was there.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) -> T {
        check_bounds(index, self.len);
        let word = &mut self.pages[index >> self.shift][index & self.page_mask];
        T::from_word(core::mem::replace(word, value.to_word()))
    }

    /// Writes `value` into every slot of `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range reaches past `self.len()`.
    pub fn fill(&mut self, range: Range<usize>, value: T) {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "range {range:?} out of bounds for length {}",
            self.len
        );
        self.fill_words(range, value.to_word());
    }

    fn fill_words(&mut self, range: Range<usize>, word: u64) {
        let mut index = range.start;
        while index < range.end {
            let page = index >> self.shift;
            let offset = index & self.page_mask;
            let stop = (range.end - index).min(self.page_mask + 1 - offset);
            self.pages[page][offset..offset + stop].fill(word);
            index += stop;
        }
    }

    /// Changes the logical length, keeping slots `0..min(old, new)`.
    ///
    /// Growing draws whole pages from the pool; a refused request leaves the
    /// array untouched. Shrinking hands trailing pages back.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        let needed = self.pool.pages_for(new_len);
        if needed > self.pages.len() {
            let extra = self.pool.acquire(needed - self.pages.len())?;
            self.pages.extend(extra);
        } else if needed < self.pages.len() {
            let tail = self.pages.split_off(needed);
            self.pool.recycle(tail);
        }

        if new_len < self.len {
            let kept = self.pages.len() << self.shift;
            self.fill_words(new_len..self.len.min(kept), 0);
        }
        self.len = new_len;
        Ok(())
    }

    /// Hands every page back to the pool.
    pub fn release(self) {
        drop(self);
    }
}

type ObjectPage<T> = Box<[Option<T>]>;

/// A large array of optional values split into pool-sized pages.
///
/// Pages count against the pool budget but are never cached, since the pool
/// only recycles word pages.
pub struct ObjectArray<T> {
    pool: PagePool,
    pages: Vec<ObjectPage<T>>,
    len: usize,
    shift: u32,
    page_mask: usize,
}

impl<T> core::fmt::Debug for ObjectArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObjectArray")
            .field("len", &self.len)
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl<T> Drop for ObjectArray<T> {
    fn drop(&mut self) {
        let pages = self.pages.len();
        self.pages.clear();
        self.pool.unreserve(pages);
    }
}

impl<T> ObjectArray<T> {
    pub(crate) fn new(pool: PagePool, len: usize) -> Result<Self> {
        let count = pool.pages_for(len);
        pool.reserve(count)?;

        let page_words = pool.page_words();
        Ok(Self {
            pages: (0..count).map(|_| Self::empty_page(page_words)).collect(),
            shift: pool.page_shift(),
            page_mask: page_words - 1,
            pool,
            len,
        })
    }

    fn empty_page(page_words: usize) -> ObjectPage<T> {
        core::iter::repeat_with(|| None).take(page_words).collect()
    }

    /// Number of logical slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Shorthand for `self.len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the value in slot `index`, if any.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        check_bounds(index, self.len);
        self.pages[index >> self.shift][index & self.page_mask].as_ref()
    }

    /// Returns a mutable reference to the value in slot `index`, if any.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        check_bounds(index, self.len);
        self.pages[index >> self.shift][index & self.page_mask].as_mut()
    }

    /// Replaces slot `index`, returning what was there.
    #[inline]
    pub fn set(&mut self, index: usize, value: Option<T>) -> Option<T> {
        check_bounds(index, self.len);
        core::mem::replace(
            &mut self.pages[index >> self.shift][index & self.page_mask],
            value,
        )
    }

    /// Empties slot `index`, returning its value.
    #[inline]
    pub fn take(&mut self, index: usize) -> Option<T> {
        self.set(index, None)
    }

    /// Changes the logical length, keeping slots `0..min(old, new)`.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        let needed = self.pool.pages_for(new_len);
        let current = self.pages.len();
        if needed > current {
            self.pool.reserve(needed - current)?;
            let page_words = self.page_mask + 1;
            self.pages
                .extend((current..needed).map(|_| Self::empty_page(page_words)));
        } else if needed < current {
            self.pages.truncate(needed);
            self.pool.unreserve(current - needed);
        }

        if new_len < self.len {
            let kept = self.pages.len() << self.shift;
            for index in new_len..self.len.min(kept) {
                self.pages[index >> self.shift][index & self.page_mask] = None;
            }
        }
        self.len = new_len;
        Ok(())
    }

    /// Drops every value and returns the pages to the budget.
    pub fn release(self) {
        drop(self);
    }
}
