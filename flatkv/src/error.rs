//! Error types for map operations.

use dyn_array::ArrayError;
use thiserror::Error;

/// Result type for map operations.
pub type Result<T> = core::result::Result<T, MapError>;

/// Errors reported by [`FlatMap`](crate::FlatMap) operations.
///
/// Every failure is a returned value; no operation panics, and the map
/// stays usable after any error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Key size must be at least one byte.
    #[error("key size must be at least 1 byte")]
    ZeroKeySize,

    /// Value size must be at least one byte.
    #[error("value size must be at least 1 byte")]
    ZeroValueSize,

    /// Initial capacity must be at least one element.
    #[error("initial capacity must be at least 1 element")]
    ZeroCapacity,

    /// A key argument had the wrong byte length.
    #[error("key is {actual} bytes, expected {expected}")]
    KeySizeMismatch {
        /// The map's fixed key width.
        expected: usize,
        /// Byte length of the rejected argument.
        actual: usize,
    },

    /// A value argument or output buffer had the wrong byte length.
    #[error("value is {actual} bytes, expected {expected}")]
    ValueSizeMismatch {
        /// The map's fixed value width.
        expected: usize,
        /// Byte length of the rejected argument.
        actual: usize,
    },

    /// The operation requires at least one stored pair.
    #[error("map is empty")]
    Empty,

    /// No stored pair matches the queried key.
    #[error("key not present")]
    UnknownKey,

    /// A pair buffer could not be allocated.
    #[error("failed to allocate a {bytes}-byte pair buffer")]
    AllocFailed {
        /// Byte size of the buffer that could not be allocated.
        bytes: usize,
    },

    /// The backing array failed.
    #[error(transparent)]
    Storage(#[from] ArrayError),
}
