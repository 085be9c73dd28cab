//! Property: directory hashes do not depend on creation or enumeration order

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use strata::cache::AlwaysRehash;
use strata::snapshot::Snapshotter;
use strata::MemoryStorage;
use tempfile::TempDir;

fn entries() -> impl Strategy<Value = (Vec<(String, Vec<u8>)>, Vec<(String, Vec<u8>)>)> {
    let contents = prop::collection::vec(any::<u8>(), 0..64);
    prop::collection::btree_map("[a-z][a-z0-9_.]{0,7}", contents, 1..12)
        .prop_flat_map(|map: BTreeMap<String, Vec<u8>>| {
            let ordered: Vec<_> = map.into_iter().collect();
            (Just(ordered.clone()), Just(ordered).prop_shuffle())
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_creation_order_does_not_change_hash((ordered, shuffled) in entries()) {
        let temp_dir = TempDir::new().unwrap();
        let hash_of = |name: &str, files: &[(String, Vec<u8>)]| {
            let dir = temp_dir.path().join(name);
            fs::create_dir(&dir).unwrap();
            for (file, bytes) in files {
                fs::write(dir.join(file), bytes).unwrap();
            }
            Snapshotter::new(&MemoryStorage::new())
                .with_detector(Arc::new(AlwaysRehash))
                .snapshot(&dir)
                .unwrap()
                .unwrap()
                .0
        };

        prop_assert_eq!(hash_of("ordered", &ordered), hash_of("shuffled", &shuffled));
    }
}
