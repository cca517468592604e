//! Pair lifecycle: owned key/value buffers and the raw handle form the
//! backing array actually stores.

use core::mem;
use core::ptr;
use core::slice;

use crate::error::MapError;

/// One key/value entry with exclusively owned buffers.
pub(crate) struct Pair {
    pub key: Box<[u8]>,
    pub val: Box<[u8]>,
}

/// The stored form of a [`Pair`]: two thin pointers to the leaked buffers.
/// Buffer lengths are the map's fixed `key_size`/`val_size`, so they are
/// not carried per element.
///
/// A handle is plain data with no drop glue. Exactly one live handle
/// refers to any buffer; the map alone turns handles back into owned
/// pairs to release them.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct PairHandle {
    pub key: *mut u8,
    pub val: *mut u8,
}

pub(crate) const HANDLE_SIZE: usize = mem::size_of::<PairHandle>();

impl Pair {
    /// Copy `key` and `val` into freshly allocated buffers. Allocation
    /// failure is reported as [`MapError::AllocFailed`]; if the value
    /// buffer fails, the already-built key buffer is released on the way
    /// out.
    pub fn new(key: &[u8], val: &[u8]) -> Result<Self, MapError> {
        Ok(Pair {
            key: alloc_buf(key)?,
            val: alloc_buf(val)?,
        })
    }

    /// Leak both buffers into a raw handle for storage.
    pub fn into_handle(self) -> PairHandle {
        PairHandle {
            key: Box::into_raw(self.key).cast::<u8>(),
            val: Box::into_raw(self.val).cast::<u8>(),
        }
    }
}

impl PairHandle {
    /// Reassemble the owned pair this handle was made from. Dropping the
    /// result releases both buffers.
    ///
    /// # Safety
    ///
    /// The handle must have come from [`Pair::into_handle`] with these
    /// exact buffer sizes, and no other live handle or pair may refer to
    /// the same buffers.
    pub unsafe fn into_pair(self, key_size: usize, val_size: usize) -> Pair {
        Pair {
            key: Box::from_raw(ptr::slice_from_raw_parts_mut(self.key, key_size)),
            val: Box::from_raw(ptr::slice_from_raw_parts_mut(self.val, val_size)),
        }
    }

    /// Borrow the key buffer.
    ///
    /// # Safety
    ///
    /// The handle must refer to live buffers of these sizes, and the
    /// returned slice must not outlive them.
    pub unsafe fn key_bytes<'a>(self, key_size: usize) -> &'a [u8] {
        slice::from_raw_parts(self.key, key_size)
    }

    /// Borrow the value buffer.
    ///
    /// # Safety
    ///
    /// Same contract as [`PairHandle::key_bytes`].
    pub unsafe fn val_bytes<'a>(self, val_size: usize) -> &'a [u8] {
        slice::from_raw_parts(self.val, val_size)
    }

    /// View the handle itself as the raw element bytes stored in the
    /// backing array.
    pub fn as_bytes(&self) -> &[u8] {
        // Two pointers, repr(C), no padding.
        unsafe { slice::from_raw_parts((self as *const PairHandle).cast::<u8>(), HANDLE_SIZE) }
    }

    /// Read a handle back out of stored element bytes, which carry no
    /// alignment guarantee.
    pub fn from_bytes(bytes: &[u8]) -> PairHandle {
        debug_assert_eq!(bytes.len(), HANDLE_SIZE);
        unsafe { ptr::read_unaligned(bytes.as_ptr().cast::<PairHandle>()) }
    }
}

/// Copy `bytes` into a fresh exclusively owned buffer, reporting
/// allocation failure instead of aborting.
pub(crate) fn alloc_buf(bytes: &[u8]) -> Result<Box<[u8]>, MapError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes.len())
        .map_err(|_| MapError::AllocFailed { bytes: bytes.len() })?;
    buf.extend_from_slice(bytes);
    Ok(buf.into_boxed_slice())
}

/// Release a leaked buffer by pointer and length.
///
/// # Safety
///
/// `ptr` must have come from [`Pair::into_handle`] (or an equivalent
/// `Box::into_raw` of a `len`-byte boxed slice) and must not be released
/// twice.
pub(crate) unsafe fn release_buf(ptr: *mut u8, len: usize) {
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)));
}
