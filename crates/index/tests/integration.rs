//! Integration tests for index crate

use conpack_hash::Hash;
use conpack_index::ConsolidatedPackageIndex;
use conpack_types::SourceFile;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

fn descriptor(pkg: u8, platform: u8, dest: u8, content: u8) -> SourceFile {
    SourceFile {
        package_id: format!("pkg{pkg}"),
        version: "1.0.0".into(),
        is_single_payload: pkg == 0,
        platform: format!("plat{platform}"),
        source_archive_path: PathBuf::from(format!("/scratch/pkg{pkg}.zip")),
        source_entry_name: format!("plat{platform}/file{dest}"),
        destination_entry_name: format!("file{dest}"),
        content_hash: Hash::from_data(&[content]),
    }
}

fn descriptors() -> impl Strategy<Value = Vec<SourceFile>> {
    prop::collection::vec((0u8..3, 0u8..3, 0u8..5, 0u8..4), 0..40).prop_map(|raw| {
        raw.into_iter()
            .map(|(p, pl, d, c)| descriptor(p, pl, d, c))
            .collect()
    })
}

proptest! {
    #[test]
    fn index_json_is_order_independent(files in descriptors(), seed in any::<u64>()) {
        let forward = ConsolidatedPackageIndex::from_source_files(&files).unwrap();

        let mut shuffled = files.clone();
        // Deterministic permutation driven by the seed
        let len = shuffled.len();
        if len > 1 {
            let mut state = seed;
            for i in (1..len).rev() {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                let j = usize::try_from(state % (i as u64 + 1)).unwrap();
                shuffled.swap(i, j);
            }
        }
        let permuted = ConsolidatedPackageIndex::from_source_files(&shuffled).unwrap();

        prop_assert_eq!(forward.to_json().unwrap(), permuted.to_json().unwrap());
    }

    #[test]
    fn index_lists_exactly_the_group_hashes(files in descriptors()) {
        let index = ConsolidatedPackageIndex::from_source_files(&files).unwrap();
        index.validate().unwrap();

        let mut expected: BTreeMap<(String, String), BTreeSet<Hash>> = BTreeMap::new();
        for f in &files {
            expected
                .entry((f.package_id.clone(), f.platform.clone()))
                .or_default()
                .insert(f.content_hash);
        }

        for ((pkg, platform), hashes) in &expected {
            let listed = index.hashes_for(pkg, platform).unwrap();
            let listed_set: BTreeSet<Hash> = listed.iter().copied().collect();
            prop_assert_eq!(listed.len(), listed_set.len());
            prop_assert_eq!(&listed_set, hashes);
        }

        let platform_count: usize = index.packages.values().map(|p| p.platforms.len()).sum();
        prop_assert_eq!(platform_count, expected.len());
    }
}

#[test]
fn test_json_roundtrip_preserves_index() {
    let files = vec![descriptor(0, 0, 0, 0), descriptor(1, 1, 1, 1), descriptor(1, 2, 1, 2)];
    let index = ConsolidatedPackageIndex::from_source_files(&files).unwrap();
    let parsed = ConsolidatedPackageIndex::from_json(&index.to_json().unwrap()).unwrap();
    assert_eq!(parsed, index);
    assert_eq!(
        parsed.platforms("pkg1").collect::<Vec<_>>(),
        vec!["plat1", "plat2"]
    );
    assert!(parsed.package("pkg0").unwrap().is_single_payload);
}

#[test]
fn test_from_json_rejects_bad_hash() {
    let json = r#"{ "A": { "id": "A", "version": "1", "isSinglePayload": false,
                   "platforms": { "win": ["not-a-hash"] } } }"#;
    assert!(ConsolidatedPackageIndex::from_json(json).is_err());
}

#[test]
fn test_empty_input_gives_empty_object() {
    let index = ConsolidatedPackageIndex::from_source_files(&[]).unwrap();
    assert_eq!(index.to_json().unwrap(), "{}");
}
