//! Optional serde support for [`FlatMap`].
//!
//! A map serializes as its construction parameters followed by its
//! entries. Ordering functions cannot be serialized: deserialization
//! restores the byte-lexicographic default and re-places entries through
//! `set`, so a map serialized under a custom ordering comes back sorted
//! under the default order.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::map::FlatMap;

impl Serialize for FlatMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(&[u8], &[u8])> = self.iter().collect();

        let mut st = serializer.serialize_struct("FlatMap", 4)?;
        st.serialize_field("sorted", &self.is_sorted())?;
        st.serialize_field("key_size", &self.key_size())?;
        st.serialize_field("val_size", &self.val_size())?;
        st.serialize_field("entries", &entries)?;
        st.end()
    }
}

struct FlatMapVisitor;

impl<'de> Visitor<'de> for FlatMapVisitor {
    type Value = FlatMap;

    fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
        formatter.write_str("a FlatMap header followed by its entries")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<FlatMap, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let sorted: bool = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let key_size: usize = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let val_size: usize = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        let entries: Vec<(Vec<u8>, Vec<u8>)> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(3, &self))?;

        let mut map = FlatMap::new(sorted, key_size, val_size, entries.len().max(1))
            .map_err(de::Error::custom)?;

        // set() validates entry byte lengths and re-places each pair.
        for (key, val) in &entries {
            map.set(key, val).map_err(de::Error::custom)?;
        }

        Ok(map)
    }
}

impl<'de> Deserialize<'de> for FlatMap {
    fn deserialize<D>(deserializer: D) -> Result<FlatMap, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_struct(
            "FlatMap",
            &["sorted", "key_size", "val_size", "entries"],
            FlatMapVisitor,
        )
    }
}
