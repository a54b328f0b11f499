use crate::error::Result;
use crate::hash::hash;
use crate::hash_table::Buckets;
use crate::hash_table::DEFAULT_MAX_LOAD_FACTOR;
use crate::hash_table::Entry;
use crate::hash_table::PagedHashTable;
use crate::page_array::ObjectArray;
use crate::page_array::PageArray;
use crate::pool::PagePool;

/// Bucket store for [`LongObjectHashMap`]. A bucket is used exactly when its
/// value slot is `Some`.
#[derive(Debug)]
pub struct LongObjectBuckets<T> {
    keys: PageArray<i64>,
    values: ObjectArray<T>,
}

impl<T> LongObjectBuckets<T> {
    /// Allocates a store of `capacity` unused buckets from `pool`.
    pub fn new(pool: &PagePool, capacity: usize) -> Result<Self> {
        Ok(Self {
            keys: pool.allocate(capacity)?,
            values: pool.allocate_objects(capacity)?,
        })
    }
}

impl<T> Buckets for LongObjectBuckets<T> {
    fn resize(&mut self, capacity: usize) -> Result<()> {
        self.keys.resize(capacity)?;
        self.values.resize(capacity)
    }

    #[inline]
    fn is_used(&self, index: usize) -> bool {
        self.values.get(index).is_some()
    }

    #[inline]
    fn hash_at(&self, index: usize) -> u64 {
        hash(self.keys.get(index))
    }

    fn relocate(&mut self, from: usize, to: usize) {
        let value = self.values.take(from);
        debug_assert!(value.is_some());
        self.keys.set(to, self.keys.get(from));
        self.values.set(to, value);
    }
}

/// An `i64` to `T` map over pooled pages.
///
/// ```rust
/// use paged_hash::PagePool;
/// use paged_hash::long_object_map::LongObjectHashMap;
///
/// let pool = PagePool::default();
/// let mut names = LongObjectHashMap::new(&pool).unwrap();
/// names.put(7, "seven".to_string()).unwrap();
/// names.get_mut(7).unwrap().push('!');
/// assert_eq!(names.get(7).map(String::as_str), Some("seven!"));
/// assert_eq!(names.remove(7), Some("seven!".to_string()));
/// ```
#[derive(Debug)]
pub struct LongObjectHashMap<T> {
    table: PagedHashTable<LongObjectBuckets<T>>,
}

impl<T> LongObjectHashMap<T> {
    /// Creates an empty map with the default load factor.
    pub fn new(pool: &PagePool) -> Result<Self> {
        Self::with_capacity(1, DEFAULT_MAX_LOAD_FACTOR, pool)
    }

    /// Creates a map that holds `capacity` entries before growing.
    pub fn with_capacity(capacity: usize, max_load_factor: f32, pool: &PagePool) -> Result<Self> {
        Ok(Self {
            table: PagedHashTable::new(capacity, max_load_factor, |buckets| {
                LongObjectBuckets::new(pool, buckets)
            })?,
        })
    }

    /// Number of entries.
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

    /// Maps `key` to `value`, returning the previous value.
    pub fn put(&mut self, key: i64, value: T) -> Result<Option<T>> {
        match self.table.entry(hash(key), |b, i| b.keys.get(i) == key)? {
            Entry::Occupied(mut entry) => {
                let index = entry.index();
                Ok(entry.buckets_mut().values.set(index, Some(value)))
            }
            Entry::Vacant(entry) => {
                entry.insert(|b, i| {
                    b.keys.set(i, key);
                    b.values.set(i, Some(value));
                });
                Ok(None)
            }
        }
    }

    fn index_of(&self, key: i64) -> Option<usize> {
        self.table.find(hash(key), |b, i| b.keys.get(i) == key)
    }

    /// Value mapped to `key`.
    pub fn get(&self, key: i64) -> Option<&T> {
        let index = self.index_of(key)?;
        self.table.buckets().values.get(index)
    }

    /// Mutable reference to the value mapped to `key`.
    pub fn get_mut(&mut self, key: i64) -> Option<&mut T> {
        let index = self.index_of(key)?;
        self.table.buckets_mut().values.get_mut(index)
    }

    /// Whether `key` is mapped.
    pub fn contains_key(&self, key: i64) -> bool {
        self.index_of(key).is_some()
    }

    /// Unmaps `key`, returning its value.
    pub fn remove(&mut self, key: i64) -> Option<T> {
        self.table
            .find_entry(hash(key), |b, i| b.keys.get(i) == key)
            .and_then(|entry| entry.remove(|b, i| b.values.take(i)))
    }

    /// Entries in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &T)> + '_ {
        let buckets = self.table.buckets();
        self.table.used_indices().filter_map(move |index| {
            buckets
                .values
                .get(index)
                .map(|value| (buckets.keys.get(index), value))
        })
    }

    /// Computes a histogram of probe distances.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> crate::hash_table::ProbeHistogram {
        self.table.probe_histogram()
    }

    /// Drops every value and returns every page to the pool.
    pub fn release(self) {
        drop(self);
    }
}
