//! Directory size calculator and per-child breakdown.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::scanner::walker::{DirectoryWalker, Scan, SkippedPath, WalkOptions};

/// Recursive size of one immediate child directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildSize {
    pub name: String,
    pub size_bytes: u64,
}

/// Total size of a tree plus its immediate child directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryReport {
    pub root: PathBuf,
    pub total_bytes: u64,
    /// Immediate child directories in listing order.
    pub children: Vec<ChildSize>,
    pub skipped: Vec<SkippedPath>,
}

impl DirectoryReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Total bytes of all regular files under `root`; a missing root is 0.
///
/// Hidden directories and `node_modules` are counted; any skip rules in
/// `options` are ignored.
pub fn directory_size(root: &Path, options: &WalkOptions) -> Scan<u64> {
    let walker = DirectoryWalker::new(unfiltered(options));
    walker.fold(root, 0u64, |total, entry| total.saturating_add(entry.size_bytes))
}

/// Size `root` and break the total down by immediate child directory.
///
/// One traversal: each file is attributed to the first path component below
/// the root. Files directly in the root count toward the total only.
pub fn directory_report(root: &Path, options: &WalkOptions) -> DirectoryReport {
    let options = unfiltered(options);
    let child_dirs = list_child_dirs(root, options.follow_symlinks);

    let walker = DirectoryWalker::new(options);
    let scan = walker.fold(
        root,
        (0u64, HashMap::<OsString, u64>::new()),
        |(total, mut per_child), entry| {
            if let Some(first) = first_component_below(&entry.path, root) {
                let slot = per_child.entry(first).or_insert(0);
                *slot = slot.saturating_add(entry.size_bytes);
            }
            (total.saturating_add(entry.size_bytes), per_child)
        },
    );

    let (total_bytes, per_child) = scan.value;
    let children = child_dirs
        .into_iter()
        .map(|name| ChildSize {
            size_bytes: per_child.get(&name).copied().unwrap_or(0),
            name: name.to_string_lossy().into_owned(),
        })
        .collect();

    DirectoryReport {
        root: root.to_path_buf(),
        total_bytes,
        children,
        skipped: scan.skipped,
    }
}

fn unfiltered(options: &WalkOptions) -> WalkOptions {
    WalkOptions {
        follow_symlinks: options.follow_symlinks,
        max_depth: options.max_depth,
        ..WalkOptions::default()
    }
}

/// Names of the immediate child directories of `root`, in listing order.
fn list_child_dirs(root: &Path, follow_symlinks: bool) -> Vec<OsString> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|entry| {
            entry.file_type().is_ok_and(|ft| {
                ft.is_dir()
                    || (follow_symlinks
                        && ft.is_symlink()
                        && fs::metadata(entry.path()).is_ok_and(|m| m.is_dir()))
            })
        })
        .map(|entry| entry.file_name())
        .collect()
}

/// First component of `path` below `root`, if the file is nested in a child directory.
fn first_component_below(path: &Path, root: &Path) -> Option<OsString> {
    let relative = path.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    components.next()?;
    match first {
        Component::Normal(name) => Some(name.to_os_string()),
        _ => None,
    }
}
