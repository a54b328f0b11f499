use core::fmt::Debug;

use log::debug;

use crate::error::Error;
use crate::error::Result;
use crate::hash::next_slot;
use crate::hash::slot;

/// Load factor used when callers have no better idea.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.6;

#[inline(always)]
fn target_max_size(buckets: usize, max_load_factor: f32) -> usize {
    (buckets as f64 * max_load_factor as f64) as usize
}

fn bucket_count(capacity: usize, max_load_factor: f32) -> Result<usize> {
    let wanted = ((capacity as f64 / max_load_factor as f64) as usize).saturating_add(1);
    wanted
        .checked_next_power_of_two()
        .map(|buckets| buckets.max(1))
        .ok_or_else(|| {
            Error::invalid_argument(
                "capacity",
                format!("{capacity} entries at load factor {max_load_factor} overflows usize"),
            )
        })
}

/// Storage layout plugged into a [`PagedHashTable`].
///
/// The table owns probing and growth; the store decides what a bucket holds
/// and how an entry moves between buckets. Implementations must keep the
/// number of used buckets equal to the table's `len()`.
pub trait Buckets {
    /// Grows the backing arrays to `capacity` buckets.
    ///
    /// Buckets `0..old_capacity` must keep their contents at the same
    /// indices, and the new buckets must read as unused.
    fn resize(&mut self, capacity: usize) -> Result<()>;

    /// Whether bucket `index` holds an entry.
    fn is_used(&self, index: usize) -> bool;

    /// Hash of the entry in used bucket `index`.
    fn hash_at(&self, index: usize) -> u64;

    /// Moves the entry in bucket `from` into the unused bucket `to`, leaving
    /// `from` unused.
    fn relocate(&mut self, from: usize, to: usize);

    /// Treats the entry at `index` as removed and puts it back through the
    /// regular probe sequence under `mask`.
    ///
    /// The entry ends up either in the first unused bucket on its probe
    /// sequence or, if the sequence reaches `index` first, where it already
    /// was.
    fn remove_and_add(&mut self, index: usize, mask: usize) {
        debug_assert!(self.is_used(index), "bucket {index} is not used");

        let mut pos = slot(self.hash_at(index), mask);
        while pos != index {
            if !self.is_used(pos) {
                self.relocate(index, pos);
                debug_assert!(self.is_used(pos) && !self.is_used(index));
                return;
            }
            pos = next_slot(pos, mask);
        }
    }
}

/// Probe distance statistics.
///
/// Compiled with `cfg(test)` or the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `counts[d]` is the number of entries sitting `d` buckets past their
    /// home bucket.
    pub counts: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Longest probe distance present.
    pub fn max_distance(&self) -> usize {
        self.counts.len().saturating_sub(1)
    }

    /// Average probe distance, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: usize = self.counts.iter().enumerate().map(|(d, c)| d * c).sum();
        weighted as f64 / total as f64
    }

    /// Pretty-print the histogram.
    pub fn print(&self) {
        println!("=== Probe Length Histogram ===");
        let total = self.total().max(1);
        for (distance, count) in self.counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let pct = *count as f64 / total as f64 * 100.0;
            let bar = "#".repeat((pct / 2.0).ceil() as usize);
            println!("{distance:>4}: {count:>8} ({pct:>6.2}%) {bar}");
        }
        println!("mean probe distance: {:.3}", self.mean());
    }
}

/// Open-addressing hash table with linear probing over a pluggable
/// [`Buckets`] store.
///
/// Capacity is always a power of two and doubles in place once the table
/// holds `max_size()` entries, where `max_size = floor(capacity *
/// max_load_factor)`. Callers hash their keys themselves and pass an
/// equality predicate that inspects the store at a bucket index.
///
/// ```rust
/// use paged_hash::PagePool;
/// use paged_hash::hash_table::PagedHashTable;
/// use paged_hash::long_long_map::LongLongBuckets;
///
/// let pool = PagePool::default();
/// let table = PagedHashTable::new(10, 0.6, |buckets| LongLongBuckets::new(&pool, buckets))
///     .unwrap();
/// assert_eq!(table.capacity(), 32);
/// assert_eq!(table.max_size(), 19);
/// ```
pub struct PagedHashTable<B> {
    buckets: B,
    capacity: usize,
    mask: usize,
    size: usize,
    max_size: usize,
    max_load_factor: f32,
}

impl<B: Debug> Debug for PagedHashTable<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PagedHashTable")
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("max_size", &self.max_size)
            .field("max_load_factor", &self.max_load_factor)
            .field("buckets", &self.buckets)
            .finish()
    }
}

impl<B: Buckets> PagedHashTable<B> {
    /// Creates a table sized so `capacity` entries fit without growing.
    ///
    /// `init` receives the bucket count and must return a store with that
    /// many unused buckets.
    ///
    /// Fails with [`Error::InvalidArgument`] if `max_load_factor` is not in
    /// the open interval `(0, 1)` or the bucket count would overflow.
    pub fn new(
        capacity: usize,
        max_load_factor: f32,
        init: impl FnOnce(usize) -> Result<B>,
    ) -> Result<Self> {
        if !(max_load_factor > 0.0 && max_load_factor < 1.0) {
            return Err(Error::invalid_argument(
                "max_load_factor",
                format!("must be in (0, 1), got {max_load_factor}"),
            ));
        }

        let buckets = bucket_count(capacity, max_load_factor)?;
        Ok(Self {
            buckets: init(buckets)?,
            capacity: buckets,
            mask: buckets - 1,
            size: 0,
            max_size: target_max_size(buckets, max_load_factor),
            max_load_factor,
        })
    }

    /// Number of buckets. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `capacity() - 1`.
    pub fn mask(&self) -> usize {
        self.mask
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Shorthand for `self.len() == 0`.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Entry count at which the next insertion grows the table.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The load factor fixed at construction.
    pub fn max_load_factor(&self) -> f32 {
        self.max_load_factor
    }

    /// The underlying store.
    pub fn buckets(&self) -> &B {
        &self.buckets
    }

    /// The underlying store, mutably.
    ///
    /// Callers may rewrite payloads in place but must not change which
    /// buckets are used.
    pub fn buckets_mut(&mut self) -> &mut B {
        &mut self.buckets
    }

    /// Consumes the table, handing back its store.
    pub fn into_buckets(self) -> B {
        self.buckets
    }

    /// Indices of used buckets in ascending order.
    pub fn used_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.capacity).filter(move |&index| self.buckets.is_used(index))
    }

    /// Finds the bucket holding an entry for `hash` that satisfies `eq`.
    pub fn find(&self, hash: u64, eq: impl Fn(&B, usize) -> bool) -> Option<usize> {
        match self.probe(hash, eq) {
            (index, true) => Some(index),
            (_, false) => None,
        }
    }

    /// Gets the entry for `hash` and `eq`, growing first if the table is
    /// full.
    ///
    /// Growth happens before the probe, so a vacant entry returned here can
    /// always be filled without exceeding `max_size()`.
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&B, usize) -> bool) -> Result<Entry<'_, B>> {
        while self.size >= self.max_size {
            self.grow()?;
        }

        let (index, found) = self.probe(hash, eq);
        Ok(if found {
            Entry::Occupied(OccupiedEntry { table: self, index })
        } else {
            Entry::Vacant(VacantEntry { table: self, index })
        })
    }

    /// Gets the occupied entry for `hash` and `eq` without growing.
    pub fn find_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&B, usize) -> bool,
    ) -> Option<OccupiedEntry<'_, B>> {
        match self.probe(hash, eq) {
            (index, true) => Some(OccupiedEntry { table: self, index }),
            (_, false) => None,
        }
    }

    /// Walks the probe sequence of `hash` and stops at the first bucket that
    /// is unused or matches.
    ///
    /// Terminates because `max_size < capacity` leaves at least one unused
    /// bucket.
    #[inline]
    fn probe(&self, hash: u64, eq: impl Fn(&B, usize) -> bool) -> (usize, bool) {
        let mut index = slot(hash, self.mask);
        loop {
            if !self.buckets.is_used(index) {
                return (index, false);
            }
            if eq(&self.buckets, index) {
                return (index, true);
            }
            index = next_slot(index, self.mask);
        }
    }

    /// Doubles the capacity in place and rehashes.
    ///
    /// Pass one re-adds every entry of the old range. Entries whose home
    /// bucket was taken at that point spill into the start of the new upper
    /// half as one contiguous run, and pass two re-adds that run.
    #[cold]
    fn grow(&mut self) -> Result<()> {
        debug_assert_eq!(self.size, self.max_size);

        let previous_capacity = self.capacity;
        let previous_size = self.size;
        let new_capacity = previous_capacity
            .checked_mul(2)
            .ok_or_else(Error::overflow)?;

        self.buckets.resize(new_capacity)?;
        self.capacity = new_capacity;
        self.mask = new_capacity - 1;

        for index in 0..previous_capacity {
            if self.buckets.is_used(index) {
                self.buckets.remove_and_add(index, self.mask);
            }
        }
        for index in previous_capacity..new_capacity {
            if !self.buckets.is_used(index) {
                break;
            }
            self.buckets.remove_and_add(index, self.mask);
        }

        self.max_size = target_max_size(new_capacity, self.max_load_factor);

        debug_assert_eq!(self.size, previous_size);
        debug_assert!(self.size <= self.max_size);
        debug_assert_eq!(self.used_indices().count(), self.size);

        debug!(
            "grew paged hash table from {previous_capacity} to {new_capacity} buckets \
             ({} entries, max {})",
            self.size, self.max_size
        );
        Ok(())
    }

    /// Computes a histogram of probe distances for the current table state.
    ///
    /// Compiled with `cfg(test)` or the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut counts = Vec::new();
        for index in self.used_indices() {
            let home = slot(self.buckets.hash_at(index), self.mask);
            let distance = index.wrapping_sub(home) & self.mask;
            if counts.len() <= distance {
                counts.resize(distance + 1, 0);
            }
            counts[distance] += 1;
        }
        ProbeHistogram { counts }
    }
}

/// A view into a single bucket, which may either be vacant or occupied.
pub enum Entry<'a, B: Buckets> {
    /// A used bucket whose entry matched.
    Occupied(OccupiedEntry<'a, B>),
    /// The unused bucket where a new entry belongs.
    Vacant(VacantEntry<'a, B>),
}

impl<'a, B: Buckets> Entry<'a, B> {
    /// Bucket index the entry refers to.
    pub fn index(&self) -> usize {
        match self {
            Entry::Occupied(entry) => entry.index,
            Entry::Vacant(entry) => entry.index,
        }
    }
}

/// A vacant bucket on the probe sequence of the searched hash.
pub struct VacantEntry<'a, B: Buckets> {
    table: &'a mut PagedHashTable<B>,
    index: usize,
}

impl<'a, B: Buckets> VacantEntry<'a, B> {
    /// Bucket index a new entry will occupy.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Fills the bucket through `write` and counts the new entry.
    ///
    /// `write` must leave the bucket used.
    pub fn insert(self, write: impl FnOnce(&mut B, usize)) -> usize {
        write(&mut self.table.buckets, self.index);
        debug_assert!(self.table.buckets.is_used(self.index));

        self.table.size += 1;
        debug_assert!(self.table.size <= self.table.max_size);
        self.index
    }
}

/// A used bucket whose entry matched.
pub struct OccupiedEntry<'a, B: Buckets> {
    table: &'a mut PagedHashTable<B>,
    index: usize,
}

impl<'a, B: Buckets> OccupiedEntry<'a, B> {
    /// Bucket index of the matched entry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The store, to read the matched entry.
    pub fn buckets(&self) -> &B {
        &self.table.buckets
    }

    /// The store, to update the matched entry in place.
    pub fn buckets_mut(&mut self) -> &mut B {
        &mut self.table.buckets
    }

    /// Removes the entry through `take`, which must leave the bucket unused,
    /// then closes the gap by re-adding the rest of the cluster.
    pub fn remove<R>(self, take: impl FnOnce(&mut B, usize) -> R) -> R {
        let table = self.table;
        let removed = take(&mut table.buckets, self.index);
        debug_assert!(!table.buckets.is_used(self.index));
        table.size -= 1;

        let mut index = next_slot(self.index, table.mask);
        while table.buckets.is_used(index) {
            table.buckets.remove_and_add(index, table.mask);
            index = next_slot(index, table.mask);
        }
        removed
    }
}
