//! Typed facade over [`FlatMap`] for plain-old-data keys and values.

use core::cmp::Ordering;
use core::fmt::{self, Debug};
use core::marker::PhantomData;
use core::mem;

use bytemuck::Zeroable;
use trait_set::trait_set;

use crate::error::Result;
use crate::map::FlatMap;

// Until `trait_alias` is stabilized, we have to use a macro
trait_set! {
    /// General value type: plain old data
    pub trait Value = bytemuck::Pod + Debug;

    /// General key type: plain old data with a total order
    pub trait Key = Value + Ord;
}

/// A [`FlatMap`] whose keys and values are fixed-size POD types.
///
/// Keys compare with their native [`Ord`] implementation rather than by
/// encoded bytes, so little-endian integer keys still sort numerically in
/// sorted mode. Key and value widths come from the types; zero-sized
/// types are rejected at construction.
pub struct TypedMap<K: Key, V: Value> {
    inner: FlatMap,
    _marker: PhantomData<(K, V)>,
}

/// Decode two stored keys and compare with the native order.
fn pod_ordering<K: Key>(stored: &[u8], query: &[u8]) -> Ordering {
    bytemuck::pod_read_unaligned::<K>(stored).cmp(&bytemuck::pod_read_unaligned::<K>(query))
}

impl<K: Key, V: Value> TypedMap<K, V> {
    /// Create a map over `K` keys and `V` values. `capacity` is a growth
    /// hint, at least 1.
    pub fn new(sorted: bool, capacity: usize) -> Result<Self> {
        let inner = FlatMap::with_ordering(
            sorted,
            mem::size_of::<K>(),
            mem::size_of::<V>(),
            capacity,
            pod_ordering::<K>,
        )?;

        Ok(TypedMap {
            inner,
            _marker: PhantomData,
        })
    }

    /// Insert `value` under `key`, or replace the existing value.
    pub fn set(&mut self, key: K, value: V) -> Result<()> {
        self.inner
            .set(bytemuck::bytes_of(&key), bytemuck::bytes_of(&value))
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &K) -> Result<V> {
        let mut out = V::zeroed();
        self.inner
            .get(bytemuck::bytes_of(key), bytemuck::bytes_of_mut(&mut out))?;
        Ok(out)
    }

    /// The value stored under `key`, if present.
    pub fn lookup(&self, key: &K) -> Option<V> {
        self.inner
            .lookup(bytemuck::bytes_of(key))
            .map(bytemuck::pod_read_unaligned)
    }

    /// Remove the pair stored under `key`.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        self.inner.delete(bytemuck::bytes_of(key))
    }

    /// Whether a pair is stored under `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(bytemuck::bytes_of(key))
    }

    /// Release every pair. Capacity is retained.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the map holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate decoded pairs in index order (ascending key order in
    /// sorted mode).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (K, V)> + '_ {
        self.inner
            .iter()
            .map(|(k, v)| (bytemuck::pod_read_unaligned(k), bytemuck::pod_read_unaligned(v)))
    }

    /// The underlying byte-level map.
    pub fn as_flat(&self) -> &FlatMap {
        &self.inner
    }
}

impl<K: Key, V: Value> Debug for TypedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
