#![cfg(feature = "serde")]

use flatkv::FlatMap;

#[test]
fn bincode_round_trip_sorted() {
    let mut map = FlatMap::new(true, 4, 4, 4).unwrap();
    for i in [5u32, 1, 3] {
        map.set(&i.to_be_bytes(), &(i * 7).to_le_bytes()).unwrap();
    }

    let bytes = bincode::serialize(&map).unwrap();
    let restored: FlatMap = bincode::deserialize(&bytes).unwrap();

    assert_eq!(restored, map);
    assert!(restored.is_sorted());
    assert_eq!(restored.key_size(), 4);
    assert_eq!(restored.val_size(), 4);
}

#[test]
fn bincode_round_trip_preserves_insertion_order() {
    let mut map = FlatMap::new(false, 2, 3, 2).unwrap();
    for (k, v) in [([9u8, 0], [1u8, 1, 1]), ([2, 0], [2, 2, 2]), ([5, 0], [3, 3, 3])] {
        map.set(&k, &v).unwrap();
    }

    let bytes = bincode::serialize(&map).unwrap();
    let restored: FlatMap = bincode::deserialize(&bytes).unwrap();

    let original: Vec<_> = map.iter().collect();
    let round_tripped: Vec<_> = restored.iter().collect();
    assert_eq!(round_tripped, original);
    assert!(!restored.is_sorted());
}
