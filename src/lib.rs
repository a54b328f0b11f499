#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

/// Error type shared by the pool and the tables.
pub mod error;

/// Key mixing and bucket addressing.
pub mod hash;

/// The generic paged hash table and its [`Buckets`](hash_table::Buckets)
/// strategy trait.
///
/// Concrete maps pick a bucket layout and get probing, in-place growth and
/// removal from [`PagedHashTable`](hash_table::PagedHashTable).
pub mod hash_table;

pub mod long_hash;

pub mod long_long_map;

pub mod long_object_map;

/// Page-backed primitive and object arrays.
pub mod page_array;

/// The shared page recycler.
pub mod pool;

pub use error::Error;
pub use error::Result;
pub use hash_table::PagedHashTable;
pub use long_hash::LongHash;
pub use long_long_map::LongLongHashMap;
pub use long_object_map::LongObjectHashMap;
pub use page_array::ObjectArray;
pub use page_array::PageArray;
pub use pool::PagePool;
pub use pool::PoolConfig;
