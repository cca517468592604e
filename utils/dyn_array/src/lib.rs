//! A resizable, type-erased array of fixed-size elements.
//!
//! [`DynArray`] stores elements as raw bytes with one shared per-element
//! width chosen at construction, addressed by index. It is the storage
//! primitive for containers whose element layout is only known at runtime;
//! it never interprets element contents, so any sub-resources referenced by
//! an element are the caller's to manage.

use thiserror::Error;

/// Errors reported by [`DynArray`] operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayError {
    /// Element size must be at least one byte.
    #[error("element size must be at least 1 byte")]
    ZeroElementSize,

    /// Initial capacity must be at least one element.
    #[error("initial capacity must be at least 1 element")]
    ZeroCapacity,

    /// An element argument had the wrong byte length.
    #[error("element is {actual} bytes, expected {expected}")]
    ElementSizeMismatch {
        /// The array's fixed element width.
        expected: usize,
        /// Byte length of the rejected argument.
        actual: usize,
    },

    /// Index past the logical end of the array.
    #[error("index {index} out of range (len {len})")]
    OutOfRange {
        /// The rejected index.
        index: usize,
        /// Logical size at the time of the call.
        len: usize,
    },

    /// The backing buffer could not be allocated or grown.
    #[error("failed to allocate {bytes} bytes of backing storage")]
    AllocFailed {
        /// Total byte size of the allocation that failed.
        bytes: usize,
    },
}

/// A growable sequence of fixed-size elements stored as raw bytes.
///
/// All elements share one byte width, fixed at construction. Removal is
/// ordered: trailing elements shift down by one index, preserving the
/// relative order of what remains. Capacity doubles when the array is full;
/// growth failure is reported as [`ArrayError::AllocFailed`] rather than
/// aborting the process.
#[derive(Debug, Clone)]
pub struct DynArray {
    elem_size: usize,
    len: usize,
    cap: usize,
    buf: Vec<u8>,
}

impl DynArray {
    /// Create an array of `elem_size`-byte elements with room for
    /// `capacity` of them before the first growth.
    pub fn new(elem_size: usize, capacity: usize) -> Result<Self, ArrayError> {
        if elem_size < 1 {
            return Err(ArrayError::ZeroElementSize);
        }
        if capacity < 1 {
            return Err(ArrayError::ZeroCapacity);
        }

        let bytes = elem_size
            .checked_mul(capacity)
            .ok_or(ArrayError::AllocFailed { bytes: usize::MAX })?;

        let mut buf = Vec::new();
        buf.try_reserve_exact(bytes)
            .map_err(|_| ArrayError::AllocFailed { bytes })?;

        Ok(DynArray {
            elem_size,
            len: 0,
            cap: capacity,
            buf,
        })
    }

    /// Borrow the element at `index`.
    pub fn get(&self, index: usize) -> Result<&[u8], ArrayError> {
        self.check_index(index)?;
        let off = index * self.elem_size;
        Ok(&self.buf[off..off + self.elem_size])
    }

    /// Borrow the element at `index` without a bounds check.
    ///
    /// # Safety
    ///
    /// `index` must be less than `self.len()`.
    pub unsafe fn get_unchecked(&self, index: usize) -> &[u8] {
        debug_assert!(index < self.len);
        let off = index * self.elem_size;
        self.buf.get_unchecked(off..off + self.elem_size)
    }

    /// Overwrite the element at `index` with a copy of `elem`.
    pub fn set(&mut self, index: usize, elem: &[u8]) -> Result<(), ArrayError> {
        self.check_elem(elem)?;
        self.check_index(index)?;
        let off = index * self.elem_size;
        self.buf[off..off + self.elem_size].copy_from_slice(elem);
        Ok(())
    }

    /// Append a copy of `elem`, growing the backing storage if the array is
    /// full. Returns the index of the new element.
    pub fn push(&mut self, elem: &[u8]) -> Result<usize, ArrayError> {
        self.check_elem(elem)?;
        self.reserve_one()?;
        self.buf.extend_from_slice(elem);
        self.len += 1;
        Ok(self.len - 1)
    }

    /// Insert a copy of `elem` at `index`, shifting trailing elements up by
    /// one. `index == len` appends.
    pub fn insert(&mut self, index: usize, elem: &[u8]) -> Result<(), ArrayError> {
        self.check_elem(elem)?;
        if index > self.len {
            return Err(ArrayError::OutOfRange {
                index,
                len: self.len,
            });
        }
        self.reserve_one()?;

        let es = self.elem_size;
        let off = index * es;
        let end = self.len * es;

        // Capacity is reserved, so neither call reallocates.
        self.buf.resize(end + es, 0);
        self.buf.copy_within(off..end, off + es);
        self.buf[off..off + es].copy_from_slice(elem);
        self.len += 1;
        Ok(())
    }

    /// Remove the element at `index`, shifting trailing elements down by
    /// one. The relative order of the remaining elements is preserved.
    pub fn remove(&mut self, index: usize) -> Result<(), ArrayError> {
        self.check_index(index)?;
        let es = self.elem_size;
        let off = index * es;
        let end = self.len * es;

        self.buf.copy_within(off + es..end, off);
        self.buf.truncate(end - es);
        self.len -= 1;
        Ok(())
    }

    /// Reset the logical size to zero. Capacity is retained, so the array
    /// is immediately reusable. Element contents are discarded as raw
    /// bytes; sub-resources they reference are untouched.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.len = 0;
    }

    /// Number of live elements.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the array holds no elements.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of elements the array can hold before the next growth.
    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Fixed byte width of every element.
    pub const fn elem_size(&self) -> usize {
        self.elem_size
    }

    fn check_index(&self, index: usize) -> Result<(), ArrayError> {
        if index < self.len {
            Ok(())
        } else {
            Err(ArrayError::OutOfRange {
                index,
                len: self.len,
            })
        }
    }

    fn check_elem(&self, elem: &[u8]) -> Result<(), ArrayError> {
        if elem.len() == self.elem_size {
            Ok(())
        } else {
            Err(ArrayError::ElementSizeMismatch {
                expected: self.elem_size,
                actual: elem.len(),
            })
        }
    }

    /// Ensure room for one more element, doubling capacity when full.
    fn reserve_one(&mut self) -> Result<(), ArrayError> {
        if self.len < self.cap {
            return Ok(());
        }

        let new_cap = self
            .cap
            .checked_mul(2)
            .ok_or(ArrayError::AllocFailed { bytes: usize::MAX })?;
        let bytes = new_cap
            .checked_mul(self.elem_size)
            .ok_or(ArrayError::AllocFailed { bytes: usize::MAX })?;

        self.buf
            .try_reserve_exact(bytes - self.buf.len())
            .map_err(|_| ArrayError::AllocFailed { bytes })?;
        self.cap = new_cap;
        Ok(())
    }
}
