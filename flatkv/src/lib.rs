//! An array-backed associative container with fixed-width keys and values.
//!
//! [`FlatMap`] stores key/value pairs as exclusively owned byte buffers
//! behind a resizable, type-erased array ([`dyn_array::DynArray`]). Keys
//! compare by bytes — there is no hashing — either lexicographically (the
//! default, exact `memcmp` semantics) or through a caller-supplied
//! ordering function. A map constructed in sorted mode keeps its pairs in
//! ascending key order on every mutation, trading `O(n)` shift-inserts
//! for `O(log n)` lookups; an unsorted map appends and scans.
//!
//! [`TypedMap`] is a thin facade for plain-old-data key/value types, with
//! native `Ord` key comparison.
//!
//! Everything here is single-threaded and in-memory: share a map across
//! threads only behind external synchronization.

mod error;
mod map;
mod pair;
mod search;
mod typed;

#[cfg(feature = "serde")]
mod serde;

pub use dyn_array::{ArrayError, DynArray};
pub use error::{MapError, Result};
pub use map::{FlatMap, KeyOrdering};
pub use search::{BinarySearch, LinearSearch, ScanSearch, Search};
pub use typed::{Key, TypedMap, Value};
