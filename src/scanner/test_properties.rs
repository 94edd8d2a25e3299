//! Property-based tests for scanner invariants.
//!
//! Random trees check that directory size equals the sum of file sizes in
//! any layout, that filtered scans never report anything under
//! `node_modules` or a dot-prefixed directory, and that the large-file
//! threshold is strict.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use proptest::prelude::*;
use tempfile::TempDir;

use super::entry::FileEntry;
use super::exclusion::{NODE_MODULES, SkipRules};
use super::filter::{ExtensionSet, scan_extensions};
use super::large::find_large_files;
use super::size::{directory_report, directory_size};
use super::walker::WalkOptions;

// ──────────────────── strategies ────────────────────

fn arb_segment() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z]{1,6}",
        1 => Just(NODE_MODULES.to_string()),
        1 => "\\.[a-z]{1,4}",
    ]
}

fn arb_file_name() -> impl Strategy<Value = String> {
    ("[a-z]{1,6}", prop_oneof![Just("png"), Just("svg"), Just("js"), Just("txt")])
        .prop_map(|(stem, ext)| format!("{stem}.{ext}"))
}

/// Relative file path -> size. A map so no path is generated twice.
fn arb_tree() -> impl Strategy<Value = BTreeMap<PathBuf, u64>> {
    prop::collection::btree_map(
        (prop::collection::vec(arb_segment(), 0..4), arb_file_name()).prop_map(
            |(dirs, file)| {
                let mut path: PathBuf = dirs.into_iter().collect();
                path.push(file);
                path
            },
        ),
        0u64..4096,
        0..24,
    )
}

// ──────────────────── helpers ────────────────────

/// Materialize the tree. Paths that collide with an existing file used as a
/// directory (or vice versa) are dropped from the returned map.
fn materialize(tree: &BTreeMap<PathBuf, u64>) -> (TempDir, BTreeMap<PathBuf, u64>) {
    let tmp = TempDir::new().unwrap();
    let mut written = BTreeMap::new();
    for (rel, size) in tree {
        let path = tmp.path().join(rel);
        let Some(parent) = path.parent() else { continue };
        if fs::create_dir_all(parent).is_err() || path.is_dir() {
            continue;
        }
        let file = fs::File::create(&path).unwrap();
        file.set_len(*size).unwrap();
        written.insert(rel.clone(), *size);
    }
    (tmp, written)
}

fn under_pruned_dir(path: &Path, root: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap();
    rel.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == NODE_MODULES || name.starts_with('.')
        }
        _ => false,
    })
}

fn standard() -> WalkOptions {
    WalkOptions::default().with_skip(SkipRules::standard())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Total size is the sum of every file, hidden and dependency trees included.
    #[test]
    fn size_equals_sum_of_files(tree in arb_tree()) {
        let (tmp, written) = materialize(&tree);
        let expected: u64 = written.values().sum();

        let scan = directory_size(tmp.path(), &standard());
        prop_assert!(!scan.is_partial());
        prop_assert_eq!(scan.value, expected);

        let report = directory_report(tmp.path(), &standard());
        prop_assert_eq!(report.total_bytes, expected);
        let child_sum: u64 = report.children.iter().map(|c| c.size_bytes).sum();
        let top_level: u64 = written
            .iter()
            .filter(|(rel, _)| rel.components().count() == 1)
            .map(|(_, size)| size)
            .sum();
        prop_assert_eq!(child_sum + top_level, expected);
    }

    /// Filtered scans never surface files under pruned directories.
    #[test]
    fn scans_skip_node_modules_and_hidden(tree in arb_tree()) {
        let (tmp, written) = materialize(&tree);
        let exts = ExtensionSet::new(["png", "svg", "js", "txt"]);

        let scan = scan_extensions(tmp.path(), &exts, &standard());
        for entry in &scan.value {
            prop_assert!(!under_pruned_dir(&entry.path, tmp.path()), "{}", entry.path.display());
        }

        let visible = written
            .keys()
            .filter(|rel| !under_pruned_dir(&tmp.path().join(rel), tmp.path()))
            .count();
        prop_assert_eq!(scan.value.len(), visible);

        let large = find_large_files(tmp.path(), 0, &standard());
        for entry in &large.value {
            prop_assert!(!under_pruned_dir(&entry.path, tmp.path()), "{}", entry.path.display());
        }
    }

    /// Exactly the visible files strictly above the threshold are reported.
    #[test]
    fn large_file_threshold_is_strict(tree in arb_tree(), threshold in 0u64..4096) {
        let (tmp, written) = materialize(&tree);

        let mut found: Vec<PathBuf> = find_large_files(tmp.path(), threshold, &standard())
            .value
            .iter()
            .map(|e: &FileEntry| e.path.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        found.sort();

        let expected: Vec<PathBuf> = written
            .iter()
            .filter(|(rel, size)| {
                **size > threshold && !under_pruned_dir(&tmp.path().join(rel), tmp.path())
            })
            .map(|(rel, _)| rel.clone())
            .collect();
        prop_assert_eq!(found, expected);
    }
}
