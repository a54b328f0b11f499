use crate::error::Result;
use crate::hash::hash;
use crate::hash_table::Buckets;
use crate::hash_table::DEFAULT_MAX_LOAD_FACTOR;
use crate::hash_table::Entry;
use crate::hash_table::PagedHashTable;
use crate::page_array::PageArray;
use crate::pool::PagePool;

const BITS: usize = u64::BITS as usize;

/// Bucket store for [`LongLongHashMap`]: parallel key and value arrays plus
/// an occupancy bitset, one bit per bucket.
#[derive(Debug)]
pub struct LongLongBuckets {
    keys: PageArray<i64>,
    values: PageArray<i64>,
    used: PageArray<u64>,
}

impl LongLongBuckets {
    /// Allocates a store of `capacity` unused buckets from `pool`.
    pub fn new(pool: &PagePool, capacity: usize) -> Result<Self> {
        Ok(Self {
            keys: pool.allocate(capacity)?,
            values: pool.allocate(capacity)?,
            used: pool.allocate(capacity.div_ceil(BITS))?,
        })
    }

    #[inline]
    fn set_used(&mut self, index: usize, used: bool) {
        let word = self.used.get(index / BITS);
        let bit = 1u64 << (index % BITS);
        self.used
            .set(index / BITS, if used { word | bit } else { word & !bit });
    }

    #[inline]
    fn key(&self, index: usize) -> i64 {
        self.keys.get(index)
    }

    #[inline]
    fn value(&self, index: usize) -> i64 {
        self.values.get(index)
    }

    fn write(&mut self, index: usize, key: i64, value: i64) {
        self.keys.set(index, key);
        self.values.set(index, value);
        self.set_used(index, true);
    }

    fn clear(&mut self, index: usize) -> i64 {
        self.set_used(index, false);
        self.keys.set(index, 0);
        self.values.set(index, 0)
    }
}

impl Buckets for LongLongBuckets {
    fn resize(&mut self, capacity: usize) -> Result<()> {
        self.keys.resize(capacity)?;
        self.values.resize(capacity)?;
        self.used.resize(capacity.div_ceil(BITS))
    }

    #[inline]
    fn is_used(&self, index: usize) -> bool {
        self.used.get(index / BITS) & (1u64 << (index % BITS)) != 0
    }

    #[inline]
    fn hash_at(&self, index: usize) -> u64 {
        hash(self.key(index))
    }

    fn relocate(&mut self, from: usize, to: usize) {
        let key = self.key(from);
        let value = self.clear(from);
        self.write(to, key, value);
    }
}

/// An `i64` to `i64` map over pooled pages.
///
/// ```rust
/// use paged_hash::PagePool;
/// use paged_hash::long_long_map::LongLongHashMap;
///
/// let pool = PagePool::default();
/// let mut counts = LongLongHashMap::new(&pool).unwrap();
/// assert_eq!(counts.put(3, 10).unwrap(), None);
/// assert_eq!(counts.put(3, 11).unwrap(), Some(10));
/// assert_eq!(counts.get(3), Some(11));
/// assert_eq!(counts.remove(3), Some(11));
/// assert!(counts.is_empty());
/// ```
#[derive(Debug)]
pub struct LongLongHashMap {
    table: PagedHashTable<LongLongBuckets>,
}

impl LongLongHashMap {
    /// Creates an empty map with the default load factor.
    pub fn new(pool: &PagePool) -> Result<Self> {
        Self::with_capacity(1, DEFAULT_MAX_LOAD_FACTOR, pool)
    }

    /// Creates a map that holds `capacity` entries before growing.
    pub fn with_capacity(capacity: usize, max_load_factor: f32, pool: &PagePool) -> Result<Self> {
        Ok(Self {
            table: PagedHashTable::new(capacity, max_load_factor, |buckets| {
                LongLongBuckets::new(pool, buckets)
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
    pub fn put(&mut self, key: i64, value: i64) -> Result<Option<i64>> {
        match self.table.entry(hash(key), |b, i| b.key(i) == key)? {
            Entry::Occupied(mut entry) => {
                let index = entry.index();
                Ok(Some(entry.buckets_mut().values.set(index, value)))
            }
            Entry::Vacant(entry) => {
                entry.insert(|b, i| b.write(i, key, value));
                Ok(None)
            }
        }
    }

    /// Value mapped to `key`.
    pub fn get(&self, key: i64) -> Option<i64> {
        self.table
            .find(hash(key), |b, i| b.key(i) == key)
            .map(|index| self.table.buckets().value(index))
    }

    /// Whether `key` is mapped.
    pub fn contains_key(&self, key: i64) -> bool {
        self.get(key).is_some()
    }

    /// Unmaps `key`, returning its value.
    pub fn remove(&mut self, key: i64) -> Option<i64> {
        self.table
            .find_entry(hash(key), |b, i| b.key(i) == key)
            .map(|entry| entry.remove(|b, i| b.clear(i)))
    }

    /// Entries in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let buckets = self.table.buckets();
        self.table
            .used_indices()
            .map(move |index| (buckets.key(index), buckets.value(index)))
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::error::Error;
    use crate::pool::PoolConfig;

    fn small_pages() -> PagePool {
        PagePool::new(PoolConfig::default().page_words(32)).unwrap()
    }

    #[test]
    fn put_get_overwrite() {
        let pool = small_pages();
        let mut map = LongLongHashMap::new(&pool).unwrap();
        assert_eq!(map.put(0, 0).unwrap(), None);
        assert_eq!(map.get(0), Some(0));
        assert_eq!(map.put(0, -9).unwrap(), Some(0));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(1));
    }

    #[test]
    fn growth_doubles_from_sized_table() {
        let _ = env_logger::builder().is_test(true).try_init();
        let pool = small_pages();
        let mut map = LongLongHashMap::with_capacity(10, 0.6, &pool).unwrap();
        assert_eq!(map.capacity(), 32);

        for key in 0..19 {
            map.put(key, key * 10).unwrap();
        }
        assert_eq!(map.capacity(), 32);

        map.put(19, 190).unwrap();
        assert_eq!(map.capacity(), 64);
        assert_eq!(map.table.max_size(), 38);
        for key in 0..20 {
            assert_eq!(map.get(key), Some(key * 10));
        }
    }

    #[test]
    fn matches_reference_under_churn() {
        let pool = small_pages();
        let mut rng = SmallRng::seed_from_u64(0xfeed);
        let mut map = LongLongHashMap::new(&pool).unwrap();
        let mut reference = HashMap::new();

        for step in 0..30_000 {
            let key = rng.random_range(-2000..2000i64);
            if rng.random_bool(0.65) {
                let value = rng.random::<i64>();
                assert_eq!(map.put(key, value).unwrap(), reference.insert(key, value));
            } else {
                assert_eq!(map.remove(key), reference.remove(&key), "step {step}");
            }
            assert_eq!(map.len(), reference.len());
        }

        for (&key, &value) in &reference {
            assert_eq!(map.get(key), Some(value));
        }
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort_unstable();
        let mut expected: Vec<_> = reference.into_iter().collect();
        expected.sort_unstable();
        assert_eq!(entries, expected);
    }

    #[test]
    fn remove_missing_is_none() {
        let pool = small_pages();
        let mut map = LongLongHashMap::new(&pool).unwrap();
        assert_eq!(map.remove(5), None);
        map.put(5, 1).unwrap();
        assert_eq!(map.remove(6), None);
        assert_eq!(map.remove(5), Some(1));
        assert_eq!(map.remove(5), None);
    }

    #[test]
    fn release_returns_pages_for_reuse() {
        let pool = small_pages();
        let mut map = LongLongHashMap::new(&pool).unwrap();
        for key in 0..2000 {
            map.put(key, key).unwrap();
        }
        let held = pool.pages_in_use();
        map.release();
        assert_eq!(pool.pages_in_use(), 0);
        assert!(pool.pages_cached() >= held.min(PoolConfig::default().retained_pages));

        let mut again = LongLongHashMap::with_capacity(2000, 0.6, &pool).unwrap();
        for key in 0..2000 {
            assert_eq!(again.put(key, -key).unwrap(), None);
        }
        assert_eq!(again.get(1999), Some(-1999));
    }

    #[test]
    fn budget_failure_surfaces() {
        let pool = PagePool::new(PoolConfig::default().page_words(32).max_pages(6)).unwrap();
        let mut map = LongLongHashMap::new(&pool).unwrap();
        let err = (0..10_000)
            .map(|key| map.put(key, key))
            .find_map(|result| result.err())
            .unwrap();
        assert!(matches!(err, Error::AllocationFailure { limit: 6, .. }));
    }

    #[test]
    fn bad_load_factor_is_rejected() {
        let pool = small_pages();
        let err = LongLongHashMap::with_capacity(8, 1.0, &pool).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(pool.pages_in_use(), 0);
    }
}
