use crate::error::Result;
use crate::hash::hash;
use crate::hash_table::Buckets;
use crate::hash_table::DEFAULT_MAX_LOAD_FACTOR;
use crate::hash_table::Entry;
use crate::hash_table::PagedHashTable;
use crate::page_array::PageArray;
use crate::pool::PagePool;

/// Bucket store for [`LongHash`].
///
/// `ids[bucket]` is `id + 1` for a used bucket and `0` for an unused one, so
/// zeroed pages need no initialisation. `keys[id]` is dense in insertion
/// order.
#[derive(Debug)]
pub struct LongHashBuckets {
    ids: PageArray<u64>,
    keys: PageArray<i64>,
}

impl LongHashBuckets {
    /// Allocates a store of `capacity` unused buckets from `pool`.
    pub fn new(pool: &PagePool, capacity: usize) -> Result<Self> {
        Ok(Self {
            ids: pool.allocate(capacity)?,
            keys: pool.allocate(capacity)?,
        })
    }

    #[inline]
    fn id_at(&self, index: usize) -> u64 {
        self.ids.get(index) - 1
    }

    #[inline]
    fn key_at(&self, index: usize) -> i64 {
        self.keys.get(self.id_at(index) as usize)
    }
}

impl Buckets for LongHashBuckets {
    fn resize(&mut self, capacity: usize) -> Result<()> {
        self.ids.resize(capacity)?;
        self.keys.resize(capacity)
    }

    #[inline]
    fn is_used(&self, index: usize) -> bool {
        self.ids.get(index) != 0
    }

    #[inline]
    fn hash_at(&self, index: usize) -> u64 {
        hash(self.key_at(index))
    }

    #[inline]
    fn relocate(&mut self, from: usize, to: usize) {
        let id = self.ids.set(from, 0);
        let previous = self.ids.set(to, id);
        debug_assert_eq!(previous, 0);
    }
}

/// Outcome of [`LongHash::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Added {
    /// The key was new and got this id.
    New(u64),
    /// The key was already present under this id.
    Existing(u64),
}

impl Added {
    /// The key's id either way.
    pub fn id(self) -> u64 {
        match self {
            Added::New(id) | Added::Existing(id) => id,
        }
    }
}

/// A set of `i64` keys that hands out dense ids `0..len()` in insertion
/// order.
///
/// Ids stay stable across growth, which makes this the usual way to map
/// sparse keys onto dense per-key arrays.
///
/// ```rust
/// use paged_hash::PagePool;
/// use paged_hash::long_hash::Added;
/// use paged_hash::long_hash::LongHash;
///
/// let pool = PagePool::default();
/// let mut ords = LongHash::new(&pool).unwrap();
/// assert_eq!(ords.add(17).unwrap(), Added::New(0));
/// assert_eq!(ords.add(-4).unwrap(), Added::New(1));
/// assert_eq!(ords.add(17).unwrap(), Added::Existing(0));
/// assert_eq!(ords.find(-4), Some(1));
/// assert_eq!(ords.get(1), -4);
/// ```
#[derive(Debug)]
pub struct LongHash {
    table: PagedHashTable<LongHashBuckets>,
}

impl LongHash {
    /// Creates an empty hash with the default load factor.
    pub fn new(pool: &PagePool) -> Result<Self> {
        Self::with_capacity(1, DEFAULT_MAX_LOAD_FACTOR, pool)
    }

    /// Creates a hash that holds `capacity` keys before growing.
    pub fn with_capacity(capacity: usize, max_load_factor: f32, pool: &PagePool) -> Result<Self> {
        Ok(Self {
            table: PagedHashTable::new(capacity, max_load_factor, |buckets| {
                LongHashBuckets::new(pool, buckets)
            })?,
        })
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Shorthand for `self.len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Adds `key`, assigning the next id if it is new.
    pub fn add(&mut self, key: i64) -> Result<Added> {
        let id = self.table.len() as u64;
        match self.table.entry(hash(key), |b, i| b.key_at(i) == key)? {
            Entry::Occupied(entry) => Ok(Added::Existing(entry.buckets().id_at(entry.index()))),
            Entry::Vacant(entry) => {
                entry.insert(|b, i| {
                    b.keys.set(id as usize, key);
                    b.ids.set(i, id + 1);
                });
                Ok(Added::New(id))
            }
        }
    }

    /// Id of `key`, if present.
    pub fn find(&self, key: i64) -> Option<u64> {
        self.table
            .find(hash(key), |b, i| b.key_at(i) == key)
            .map(|index| self.table.buckets().id_at(index))
    }

    /// Key that was given `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()`.
    pub fn get(&self, id: u64) -> i64 {
        assert!(
            (id as usize) < self.len(),
            "id {id} out of range for {} keys",
            self.len()
        );
        self.table.buckets().keys.get(id as usize)
    }

    /// Keys in id order.
    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        let keys = &self.table.buckets().keys;
        (0..self.len()).map(move |id| keys.get(id))
    }

    /// Computes a histogram of probe distances.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Returns every page to the pool.
    pub fn release(self) {
        drop(self);
    }
}
