use core::cmp::Ordering;
use core::fmt::{self, Debug};

use dyn_array::DynArray;

use crate::error::{MapError, Result};
use crate::pair::{alloc_buf, release_buf, Pair, PairHandle, HANDLE_SIZE};
use crate::search::{BinarySearch, LinearSearch, ScanSearch, Search};

/// Ordering function over raw key bytes. Both arguments are exactly
/// `key_size` bytes; the first is a stored key, the second the query.
pub type KeyOrdering = fn(&[u8], &[u8]) -> Ordering;

/// The default key order. Equivalent to `memcmp` over `key_size` bytes:
/// multi-byte keys compare as big-endian unsigned sequences unless the
/// caller encodes them otherwise.
fn byte_lexicographic(stored: &[u8], query: &[u8]) -> Ordering {
    stored.cmp(query)
}

/// Key-bytes threshold past which a sorted map bisects instead of
/// scanning.
const BINARY_SEARCH_CUTOFF: usize = 1024;

/// An array-backed associative container with fixed-width keys and values.
///
/// Keys and values are opaque byte strings whose widths are fixed at
/// construction; every pair owns its buffers exclusively, and no two live
/// pairs share an equal key. A map built in sorted mode keeps pairs in
/// ascending key order on every mutation, trading `O(n)` shift-inserts for
/// `O(log n)` lookups; an unsorted map appends and scans.
///
/// Single-owner, single-threaded mutation only: share across threads
/// behind external synchronization.
///
/// # Example
///
/// ```
/// use flatkv::FlatMap;
///
/// let mut map = FlatMap::new(true, 4, 4, 4)?;
/// map.set(&7u32.to_be_bytes(), &[1, 2, 3, 4])?;
///
/// let mut out = [0u8; 4];
/// map.get(&7u32.to_be_bytes(), &mut out)?;
/// assert_eq!(out, [1, 2, 3, 4]);
/// # Ok::<(), flatkv::MapError>(())
/// ```
pub struct FlatMap {
    sorted: bool,
    key_size: usize,
    val_size: usize,
    cmp: KeyOrdering,
    slots: DynArray,
}

// Every reachable buffer is exclusively owned through the stored handles,
// so moving the map moves sole ownership, and shared access is read-only.
unsafe impl Send for FlatMap {}
unsafe impl Sync for FlatMap {}

impl FlatMap {
    /// Create a map with byte-lexicographic key order.
    ///
    /// `key_size` and `val_size` fix the byte widths of every key and
    /// value for the map's lifetime; `capacity` is a growth hint. All
    /// three must be at least 1.
    pub fn new(sorted: bool, key_size: usize, val_size: usize, capacity: usize) -> Result<Self> {
        Self::with_ordering(sorted, key_size, val_size, capacity, byte_lexicographic)
    }

    /// Create a map with a caller-supplied key ordering.
    ///
    /// The function is consulted for equality in both modes and for
    /// placement in sorted mode, so it must be a total order over
    /// `key_size`-byte strings.
    pub fn with_ordering(
        sorted: bool,
        key_size: usize,
        val_size: usize,
        capacity: usize,
        cmp: KeyOrdering,
    ) -> Result<Self> {
        if key_size < 1 {
            return Err(MapError::ZeroKeySize);
        }
        if val_size < 1 {
            return Err(MapError::ZeroValueSize);
        }
        if capacity < 1 {
            return Err(MapError::ZeroCapacity);
        }

        let slots = DynArray::new(HANDLE_SIZE, capacity)?;

        Ok(FlatMap {
            sorted,
            key_size,
            val_size,
            cmp,
            slots,
        })
    }

    /// Copy the value stored under `key` into `out`.
    ///
    /// `out` must be exactly `val_size` bytes. Fails with
    /// [`MapError::Empty`] when no pairs are stored and
    /// [`MapError::UnknownKey`] on a miss. Never mutates.
    pub fn get(&self, key: &[u8], out: &mut [u8]) -> Result<()> {
        self.check_key(key)?;
        self.check_val(out)?;
        if self.slots.is_empty() {
            return Err(MapError::Empty);
        }

        match self.search(key) {
            Ok(index) => {
                // SAFETY: search returned an in-bounds index.
                out.copy_from_slice(unsafe { self.handle_at(index).val_bytes(self.val_size) });
                Ok(())
            }
            Err(_) => Err(MapError::UnknownKey),
        }
    }

    /// Borrow the value stored under `key`, if present.
    pub fn lookup(&self, key: &[u8]) -> Option<&[u8]> {
        if key.len() != self.key_size {
            return None;
        }
        let index = self.search(key).ok()?;
        // SAFETY: search returned an in-bounds index.
        Some(unsafe { self.handle_at(index).val_bytes(self.val_size) })
    }

    /// Insert `val` under `key`, or replace the value of the existing
    /// pair.
    ///
    /// Updating never changes the pair count. A new pair goes to its
    /// ascending-key position in sorted mode (shifting later pairs up) and
    /// to the end otherwise; inserting into an empty map is valid. On any
    /// failure the map is left unchanged.
    pub fn set(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
        self.check_key(key)?;
        self.check_val(val)?;

        match self.search(key) {
            Ok(index) => self.replace_val(index, val),
            Err(index) => {
                let handle = Pair::new(key, val)?.into_handle();
                if let Err(e) = self.slots.insert(index, handle.as_bytes()) {
                    // SAFETY: the handle was never installed, so taking the
                    // buffers back here is the only release.
                    drop(unsafe { handle.into_pair(self.key_size, self.val_size) });
                    return Err(e.into());
                }
                Ok(())
            }
        }
    }

    /// Remove the pair stored under `key`, releasing its buffers.
    ///
    /// Removal is ordered, so a sorted map stays sorted.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.check_key(key)?;
        if self.slots.is_empty() {
            return Err(MapError::Empty);
        }

        let index = self.search(key).map_err(|_| MapError::UnknownKey)?;
        // SAFETY: search returned an in-bounds index.
        let handle = unsafe { self.handle_at(index) };
        self.slots.remove(index)?;
        // SAFETY: the handle's bytes just left the array, so this is the
        // sole owner of the buffers.
        drop(unsafe { handle.into_pair(self.key_size, self.val_size) });
        Ok(())
    }

    /// Release every pair's buffers, then reset the backing array.
    /// Capacity is retained, so the map is immediately reusable.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            // SAFETY: the loop is bounded by the live length, and the array
            // is wiped before anything can observe the stale handles.
            let handle = unsafe { self.handle_at(index) };
            drop(unsafe { handle.into_pair(self.key_size, self.val_size) });
        }
        self.slots.clear();
    }

    /// Fallible deep copy. [`Clone`] panics where this reports an
    /// allocation failure.
    pub fn try_clone(&self) -> Result<Self> {
        let mut clone = FlatMap {
            sorted: self.sorted,
            key_size: self.key_size,
            val_size: self.val_size,
            cmp: self.cmp,
            slots: DynArray::new(HANDLE_SIZE, self.capacity())?,
        };

        for index in 0..self.len() {
            // SAFETY: index is bounded by the live length.
            let (key, val) = unsafe { self.view_at(index) };
            let handle = Pair::new(key, val)?.into_handle();
            if let Err(e) = clone.slots.push(handle.as_bytes()) {
                drop(unsafe { handle.into_pair(self.key_size, self.val_size) });
                return Err(e.into());
            }
        }

        Ok(clone)
    }

    /// Whether a pair is stored under `key`.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        key.len() == self.key_size && self.search(key).is_ok()
    }

    /// Borrow a pair by its index in the backing array. In sorted mode,
    /// index order is ascending key order.
    pub fn entry_at(&self, index: usize) -> Option<(&[u8], &[u8])> {
        if index < self.len() {
            // SAFETY: just bounds-checked.
            Some(unsafe { self.view_at(index) })
        } else {
            None
        }
    }

    /// The first stored pair, if any. In sorted mode, the smallest key.
    pub fn first(&self) -> Option<(&[u8], &[u8])> {
        self.entry_at(0)
    }

    /// The last stored pair, if any. In sorted mode, the largest key.
    pub fn last(&self) -> Option<(&[u8], &[u8])> {
        if self.is_empty() {
            None
        } else {
            self.entry_at(self.len() - 1)
        }
    }

    /// Iterate stored pairs in index order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&[u8], &[u8])> {
        // SAFETY: the range is bounded by the live length, and `&self`
        // pins the handles for the iterator's lifetime.
        (0..self.len()).map(move |index| unsafe { self.view_at(index) })
    }

    /// Number of stored pairs.
    pub const fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the map holds no pairs.
    pub const fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pair capacity before the next backing-array growth.
    pub const fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Fixed byte width of every key.
    pub const fn key_size(&self) -> usize {
        self.key_size
    }

    /// Fixed byte width of every value.
    pub const fn val_size(&self) -> usize {
        self.val_size
    }

    /// Whether the map maintains ascending key order.
    pub const fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Locate `key`: `Ok(index)` of the matching pair, or `Err(index)`
    /// with the insertion position that keeps a sorted map sorted (the end
    /// of the array for unsorted maps).
    fn search(&self, key: &[u8]) -> core::result::Result<usize, usize> {
        let len = self.slots.len();
        let probe = |index: usize| {
            // SAFETY: every strategy probes strictly below `len`.
            let stored = unsafe { self.handle_at(index).key_bytes(self.key_size) };
            (self.cmp)(stored, key)
        };

        if self.sorted {
            if len * self.key_size > BINARY_SEARCH_CUTOFF {
                BinarySearch::search(len, probe)
            } else {
                LinearSearch::search(len, probe)
            }
        } else {
            ScanSearch::search(len, probe)
        }
    }

    /// Swap a fresh value buffer into the pair at `index`, releasing the
    /// old buffer exactly once. The new buffer is allocated before the old
    /// one is touched, so a failure leaves the stored pair intact.
    fn replace_val(&mut self, index: usize, val: &[u8]) -> Result<()> {
        let new_val = alloc_buf(val)?;

        // SAFETY: the caller located `index` through search.
        let mut handle = unsafe { self.handle_at(index) };
        let old_val = handle.val;
        handle.val = Box::into_raw(new_val).cast::<u8>();

        match self.slots.set(index, handle.as_bytes()) {
            Ok(()) => {
                // SAFETY: the stored handle now owns the new buffer; the
                // old one has exactly this release.
                unsafe { release_buf(old_val, self.val_size) };
                Ok(())
            }
            Err(e) => {
                // SAFETY: storage rejected the write, so the stored handle
                // still owns the old buffer; release the new one instead.
                unsafe { release_buf(handle.val, self.val_size) };
                Err(e.into())
            }
        }
    }

    /// Read the handle stored at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be less than `self.len()`.
    unsafe fn handle_at(&self, index: usize) -> PairHandle {
        PairHandle::from_bytes(self.slots.get_unchecked(index))
    }

    /// Borrow the key and value buffers of the pair at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be less than `self.len()`.
    unsafe fn view_at(&self, index: usize) -> (&[u8], &[u8]) {
        let handle = self.handle_at(index);
        (
            handle.key_bytes(self.key_size),
            handle.val_bytes(self.val_size),
        )
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() == self.key_size {
            Ok(())
        } else {
            Err(MapError::KeySizeMismatch {
                expected: self.key_size,
                actual: key.len(),
            })
        }
    }

    fn check_val(&self, val: &[u8]) -> Result<()> {
        if val.len() == self.val_size {
            Ok(())
        } else {
            Err(MapError::ValueSizeMismatch {
                expected: self.val_size,
                actual: val.len(),
            })
        }
    }
}

impl Drop for FlatMap {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Debug for FlatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for FlatMap {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }

        self.key_size == other.key_size
            && self.val_size == other.val_size
            && self.iter().eq(other.iter())
    }
}

impl Eq for FlatMap {}

impl Clone for FlatMap {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(clone) => clone,
            Err(e) => panic!("FlatMap clone failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Big-endian keys so byte order matches numeric order.
    fn key(x: u32) -> [u8; 4] {
        x.to_be_bytes()
    }

    fn val(x: u32) -> [u8; 4] {
        x.to_le_bytes()
    }

    #[test]
    fn test_rejects_degenerate_construction() {
        assert_eq!(
            FlatMap::new(false, 0, 4, 4).unwrap_err(),
            MapError::ZeroKeySize
        );
        assert_eq!(
            FlatMap::new(false, 4, 0, 4).unwrap_err(),
            MapError::ZeroValueSize
        );
        assert_eq!(
            FlatMap::new(false, 4, 4, 0).unwrap_err(),
            MapError::ZeroCapacity
        );
    }

    #[test]
    fn test_set_and_get_round_trip() {
        for sorted in [false, true] {
            let mut map = FlatMap::new(sorted, 4, 4, 4).unwrap();
            for i in [3u32, 1, 2] {
                map.set(&key(i), &val(i * 10)).unwrap();
            }

            let mut out = [0u8; 4];
            for i in 1..=3u32 {
                map.get(&key(i), &mut out).unwrap();
                assert_eq!(out, val(i * 10));
            }
            assert_eq!(map.len(), 3);
        }
    }

    #[test]
    fn test_update_keeps_count() {
        for sorted in [false, true] {
            let mut map = FlatMap::new(sorted, 4, 4, 4).unwrap();
            map.set(&key(1), &val(10)).unwrap();
            map.set(&key(2), &val(20)).unwrap();
            map.set(&key(1), &val(99)).unwrap();

            assert_eq!(map.len(), 2);
            let mut out = [0u8; 4];
            map.get(&key(1), &mut out).unwrap();
            assert_eq!(out, val(99));
            map.get(&key(2), &mut out).unwrap();
            assert_eq!(out, val(20));
        }
    }

    #[test]
    fn test_empty_map_errors() {
        let mut map = FlatMap::new(false, 4, 4, 4).unwrap();
        let mut out = [0u8; 4];
        assert_eq!(map.get(&key(1), &mut out).unwrap_err(), MapError::Empty);
        assert_eq!(map.delete(&key(1)).unwrap_err(), MapError::Empty);

        // set has no emptiness precondition
        map.set(&key(1), &val(9)).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_unknown_key() {
        let mut map = FlatMap::new(false, 4, 4, 4).unwrap();
        map.set(&key(1), &val(1)).unwrap();

        let mut out = [0u8; 4];
        assert_eq!(
            map.get(&key(2), &mut out).unwrap_err(),
            MapError::UnknownKey
        );
        assert_eq!(map.delete(&key(2)).unwrap_err(), MapError::UnknownKey);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_argument_size_checks() {
        let mut map = FlatMap::new(false, 4, 4, 4).unwrap();
        map.set(&key(1), &val(1)).unwrap();

        let mut out = [0u8; 4];
        assert_eq!(
            map.get(&[0u8; 3], &mut out).unwrap_err(),
            MapError::KeySizeMismatch {
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(
            map.get(&key(1), &mut [0u8; 5]).unwrap_err(),
            MapError::ValueSizeMismatch {
                expected: 4,
                actual: 5
            }
        );
        assert_eq!(
            map.set(&key(1), &[0u8; 2]).unwrap_err(),
            MapError::ValueSizeMismatch {
                expected: 4,
                actual: 2
            }
        );
        assert_eq!(
            map.delete(&[0u8; 8]).unwrap_err(),
            MapError::KeySizeMismatch {
                expected: 4,
                actual: 8
            }
        );
        assert!(!map.contains_key(&[0u8; 3]));
        assert!(map.lookup(&[0u8; 3]).is_none());
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let mut map = FlatMap::new(false, 4, 4, 4).unwrap();
        map.set(&key(1), &val(9)).unwrap();
        map.set(&key(2), &val(8)).unwrap();

        map.delete(&key(1)).unwrap();
        assert_eq!(map.len(), 1);

        let mut out = [0u8; 4];
        assert_eq!(
            map.get(&key(1), &mut out).unwrap_err(),
            MapError::UnknownKey
        );
        map.get(&key(2), &mut out).unwrap();
        assert_eq!(out, val(8));
    }

    #[test]
    fn test_unsorted_end_to_end() {
        let mut map = FlatMap::new(false, 4, 4, 4).unwrap();
        map.set(&[1, 0, 0, 0], &[9, 9, 9, 9]).unwrap();
        map.set(&[2, 0, 0, 0], &[8, 8, 8, 8]).unwrap();

        let mut out = [0u8; 4];
        map.get(&[1, 0, 0, 0], &mut out).unwrap();
        assert_eq!(out, [9, 9, 9, 9]);

        map.delete(&[1, 0, 0, 0]).unwrap();
        assert_eq!(
            map.get(&[1, 0, 0, 0], &mut out).unwrap_err(),
            MapError::UnknownKey
        );

        map.get(&[2, 0, 0, 0], &mut out).unwrap();
        assert_eq!(out, [8, 8, 8, 8]);
    }

    #[test]
    fn test_sorted_insert_positions() {
        let mut map = FlatMap::new(true, 4, 4, 4).unwrap();
        for i in [5u32, 1, 9, 3, 7, 0] {
            map.set(&key(i), &val(i)).unwrap();
        }

        let stored: Vec<u32> = map
            .iter()
            .map(|(k, _)| u32::from_be_bytes(k.try_into().unwrap()))
            .collect();
        assert_eq!(stored, vec![0, 1, 3, 5, 7, 9]);

        let mut out = [0u8; 4];
        for i in [0u32, 1, 3, 5, 7, 9] {
            map.get(&key(i), &mut out).unwrap();
            assert_eq!(out, val(i));
        }
        for i in [2u32, 4, 6, 8, 10] {
            assert_eq!(
                map.get(&key(i), &mut out).unwrap_err(),
                MapError::UnknownKey
            );
        }
    }

    #[test]
    fn test_sorted_stays_sorted_after_deletes() {
        let mut map = FlatMap::new(true, 4, 4, 2).unwrap();
        for i in 0..10u32 {
            map.set(&key(i), &val(i)).unwrap();
        }
        for i in [0u32, 4, 9] {
            map.delete(&key(i)).unwrap();
        }

        let stored: Vec<u32> = map
            .iter()
            .map(|(k, _)| u32::from_be_bytes(k.try_into().unwrap()))
            .collect();
        assert_eq!(stored, vec![1, 2, 3, 5, 6, 7, 8]);
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        for sorted in [false, true] {
            let mut map = FlatMap::new(sorted, 4, 4, 1).unwrap();
            for i in 0..64u32 {
                map.set(&key(i), &val(i)).unwrap();
            }
            assert_eq!(map.len(), 64);

            let mut out = [0u8; 4];
            for i in 0..64u32 {
                map.get(&key(i), &mut out).unwrap();
                assert_eq!(out, val(i));
            }
        }
    }

    #[test]
    fn test_clear_makes_map_reusable() {
        let mut map = FlatMap::new(true, 4, 4, 4).unwrap();
        for i in 0..6u32 {
            map.set(&key(i), &val(i)).unwrap();
        }

        map.clear();
        assert!(map.is_empty());

        let mut out = [0u8; 4];
        assert_eq!(map.get(&key(0), &mut out).unwrap_err(), MapError::Empty);

        map.set(&key(3), &val(3)).unwrap();
        map.get(&key(3), &mut out).unwrap();
        assert_eq!(out, val(3));
    }

    #[test]
    fn test_first_last_entry_at() {
        let mut map = FlatMap::new(true, 4, 4, 4).unwrap();
        assert!(map.first().is_none());
        assert!(map.last().is_none());

        for i in [2u32, 1, 3] {
            map.set(&key(i), &val(i)).unwrap();
        }

        assert_eq!(map.first().unwrap().0, &key(1));
        assert_eq!(map.last().unwrap().0, &key(3));
        assert_eq!(map.entry_at(1).unwrap().0, &key(2));
        assert!(map.entry_at(3).is_none());
    }

    #[test]
    fn test_iter_is_double_ended() {
        let mut map = FlatMap::new(true, 4, 4, 4).unwrap();
        for i in [1u32, 2, 3] {
            map.set(&key(i), &val(i)).unwrap();
        }

        let mut iter = map.iter();
        assert_eq!(iter.next().unwrap().0, &key(1));
        assert_eq!(iter.next_back().unwrap().0, &key(3));
        assert_eq!(iter.next().unwrap().0, &key(2));
        assert!(iter.next_back().is_none());
    }

    #[test]
    fn test_custom_ordering() {
        fn descending(stored: &[u8], query: &[u8]) -> Ordering {
            query.cmp(stored)
        }

        let mut map = FlatMap::with_ordering(true, 4, 4, 4, descending).unwrap();
        for i in [1u32, 3, 2] {
            map.set(&key(i), &val(i)).unwrap();
        }

        let stored: Vec<u32> = map
            .iter()
            .map(|(k, _)| u32::from_be_bytes(k.try_into().unwrap()))
            .collect();
        assert_eq!(stored, vec![3, 2, 1]);

        let mut out = [0u8; 4];
        map.get(&key(2), &mut out).unwrap();
        assert_eq!(out, val(2));
    }

    #[test]
    fn test_clone_and_eq() {
        let mut map = FlatMap::new(true, 4, 4, 4).unwrap();
        for i in [4u32, 2, 6] {
            map.set(&key(i), &val(i)).unwrap();
        }

        let copy = map.clone();
        assert_eq!(copy, map);

        // the copy owns its own buffers
        map.set(&key(2), &val(99)).unwrap();
        assert_ne!(copy, map);

        let mut out = [0u8; 4];
        copy.get(&key(2), &mut out).unwrap();
        assert_eq!(out, val(2));
    }

    #[test]
    fn test_binary_search_path_past_cutoff() {
        // 512 keys of 4 bytes exceeds the cutoff, so lookups bisect.
        let mut map = FlatMap::new(true, 4, 4, 8).unwrap();
        for i in (0..1024u32).step_by(2) {
            map.set(&key(i), &val(i)).unwrap();
        }
        assert_eq!(map.len(), 512);

        let mut out = [0u8; 4];
        for i in (0..1024u32).step_by(2) {
            map.get(&key(i), &mut out).unwrap();
            assert_eq!(out, val(i));
        }
        for i in (1..1024u32).step_by(2) {
            assert_eq!(
                map.get(&key(i), &mut out).unwrap_err(),
                MapError::UnknownKey
            );
        }

        // out-of-order insert still lands in place
        map.set(&key(301), &val(301)).unwrap();
        let stored: Vec<u32> = map
            .iter()
            .map(|(k, _)| u32::from_be_bytes(k.try_into().unwrap()))
            .collect();
        let mut expected: Vec<u32> = (0..1024).step_by(2).collect();
        expected.push(301);
        expected.sort_unstable();
        assert_eq!(stored, expected);
    }
}
