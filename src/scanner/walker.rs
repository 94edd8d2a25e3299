//! Work-list directory walker with skip rules, symlink policy, and partial results.
//!
//! Every scan in the crate is a fold over the regular files this walker
//! yields. Traversal keeps an explicit stack of pending directories instead of
//! recursing, so nesting depth only costs heap. Failures below the root never
//! abort a walk: the affected subtree is recorded in [`Scan::skipped`] and the
//! walk moves on.
//!
//! Invariants:
//! - Symlinks are leaves unless `follow_symlinks` is set
//! - When following, each directory (by device + inode) is entered at most once
//! - Directories deeper than `max_depth` are reported, never listed
//! - Skip rules are applied to the directory entry before any stat, so
//!   pruned entries are never stat'ed, listed, or reported

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::ScannerConfig;
use crate::core::errors::Result;
use crate::scanner::entry::FileEntry;
use crate::scanner::exclusion::SkipRules;

/// Default bound on directory nesting below a scan root.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Traversal options shared by every scanner.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub follow_symlinks: bool,
    /// Deepest directory level (root = 0) whose contents are listed.
    pub max_depth: usize,
    pub skip: SkipRules,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            skip: SkipRules::none(),
        }
    }
}

impl WalkOptions {
    /// Options for filtered scans: standard skip rules plus configured excludes.
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        Ok(Self {
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
            skip: SkipRules::with_excludes(&config.extra_excludes)?,
        })
    }

    /// Same options with a different skip rule set.
    #[must_use]
    pub fn with_skip(&self, skip: SkipRules) -> Self {
        Self {
            skip,
            ..self.clone()
        }
    }
}

/// Why part of a tree was not visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PermissionDenied,
    /// Removed between listing and visiting, or a dangling symlink.
    Vanished,
    /// Directory already entered through another path (symlink cycle or alias).
    SymlinkCycle,
    DepthLimit,
    Unreadable,
}

/// A subtree or entry the walk could not visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPath {
    pub path: PathBuf,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SkippedPath {
    fn new(path: PathBuf, reason: SkipReason) -> Self {
        Self {
            path,
            reason,
            detail: None,
        }
    }

    pub(crate) fn from_io(path: PathBuf, err: &std::io::Error) -> Self {
        let reason = match err.kind() {
            ErrorKind::PermissionDenied => SkipReason::PermissionDenied,
            ErrorKind::NotFound => SkipReason::Vanished,
            _ => SkipReason::Unreadable,
        };
        Self {
            path,
            reason,
            detail: Some(err.to_string()),
        }
    }
}

/// A scan result that may be partial.
///
/// `skipped` is empty when every reachable entry was visited; otherwise it
/// lists what was left out, so "nothing found" and "could not look" stay
/// distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scan<T> {
    pub value: T,
    pub skipped: Vec<SkippedPath>,
}

impl<T> Scan<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            skipped: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Scan<U> {
        Scan {
            value: f(self.value),
            skipped: self.skipped,
        }
    }
}

/// Identity of a directory for revisit detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DirIdentity {
    #[cfg(unix)]
    Inode(u64, u64),
    #[cfg(not(unix))]
    Canonical(PathBuf),
}

/// Item in the work list: (directory, depth).
type WorkItem = (PathBuf, usize);

/// Single-threaded directory walker.
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalker {
    options: WalkOptions,
}

impl DirectoryWalker {
    pub fn new(options: WalkOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Fold every regular file under `root` into an accumulator.
    ///
    /// A missing root yields `init` with no skips. A root that is itself a
    /// regular file is folded as a one-file tree.
    pub fn fold<B, F>(&self, root: &Path, init: B, mut f: F) -> Scan<B>
    where
        F: FnMut(B, FileEntry) -> B,
    {
        let mut acc = init;
        let mut skipped = Vec::new();

        // The root argument is always resolved through symlinks.
        let root_meta = match fs::metadata(root) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => return Scan::complete(acc),
            Err(err) => {
                skipped.push(SkippedPath::from_io(root.to_path_buf(), &err));
                return Scan {
                    value: acc,
                    skipped,
                };
            }
        };

        if root_meta.is_file() {
            acc = f(acc, FileEntry::new(root.to_path_buf(), root_meta.len()));
            return Scan::complete(acc);
        }
        if !root_meta.is_dir() {
            return Scan::complete(acc);
        }

        let mut visited: HashSet<DirIdentity> = HashSet::new();
        if self.options.follow_symlinks {
            visited.insert(dir_identity(root, &root_meta));
        }

        let mut work: Vec<WorkItem> = vec![(root.to_path_buf(), 0)];

        while let Some((dir_path, depth)) = work.pop() {
            let entries = match fs::read_dir(&dir_path) {
                Ok(entries) => entries,
                Err(err) => {
                    skipped.push(SkippedPath::from_io(dir_path, &err));
                    continue;
                }
            };

            for entry_result in entries {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(err) => {
                        skipped.push(SkippedPath::from_io(dir_path.clone(), &err));
                        continue;
                    }
                };

                let child_path = entry.path();
                let name_os = entry.file_name();
                let name = name_os.to_string_lossy();
                let relative = child_path.strip_prefix(root).unwrap_or(&child_path);
                let skip = &self.options.skip;

                // Skip rules run on the directory entry alone, before any stat.
                if skip.should_prune(relative, name.as_ref(), false) {
                    continue;
                }

                let Ok(ft) = entry.file_type() else {
                    skipped.push(SkippedPath::new(child_path, SkipReason::Unreadable));
                    continue;
                };

                // Symlinks are leaves unless following is enabled.
                if ft.is_symlink() && !self.options.follow_symlinks {
                    continue;
                }

                // A followed symlink may point at a directory, so it is judged as one.
                let may_be_dir = ft.is_dir() || ft.is_symlink();
                if may_be_dir && skip.should_prune(relative, name.as_ref(), true) {
                    continue;
                }

                let meta = if ft.is_symlink() {
                    fs::metadata(&child_path)
                } else {
                    entry.metadata()
                };
                let meta = match meta {
                    Ok(meta) => meta,
                    Err(err) => {
                        skipped.push(SkippedPath::from_io(child_path, &err));
                        continue;
                    }
                };

                if meta.is_dir() {
                    let child_depth = depth + 1;
                    if child_depth > self.options.max_depth {
                        skipped.push(SkippedPath::new(child_path, SkipReason::DepthLimit));
                        continue;
                    }
                    if self.options.follow_symlinks
                        && !visited.insert(dir_identity(&child_path, &meta))
                    {
                        skipped.push(SkippedPath::new(child_path, SkipReason::SymlinkCycle));
                        continue;
                    }
                    work.push((child_path, child_depth));
                } else if meta.is_file() {
                    acc = f(acc, FileEntry::new(child_path, meta.len()));
                }
            }
        }

        Scan {
            value: acc,
            skipped,
        }
    }

    /// Collect every regular file under `root` that satisfies `keep`.
    pub fn collect_files<P>(&self, root: &Path, mut keep: P) -> Scan<Vec<FileEntry>>
    where
        P: FnMut(&FileEntry) -> bool,
    {
        self.fold(root, Vec::new(), |mut files, entry| {
            if keep(&entry) {
                files.push(entry);
            }
            files
        })
    }
}

#[cfg(unix)]
fn dir_identity(_path: &Path, meta: &fs::Metadata) -> DirIdentity {
    use std::os::unix::fs::MetadataExt;
    DirIdentity::Inode(meta.dev(), meta.ino())
}

#[cfg(not(unix))]
fn dir_identity(path: &Path, _meta: &fs::Metadata) -> DirIdentity {
    DirIdentity::Canonical(fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(path: &Path, len: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    fn names(scan: &Scan<Vec<FileEntry>>) -> HashSet<String> {
        scan.value.iter().map(FileEntry::file_name).collect()
    }

    #[test]
    fn walks_nested_tree() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("a/b/c.txt"), 3);
        write_file(&tmp.path().join("d.txt"), 4);

        let walker = DirectoryWalker::default();
        let scan = walker.collect_files(tmp.path(), |_| true);

        assert_eq!(names(&scan), HashSet::from(["c.txt".into(), "d.txt".into()]));
        assert!(!scan.is_partial());
    }

    #[test]
    fn missing_root_is_empty_and_complete() {
        let tmp = TempDir::new().unwrap();
        let walker = DirectoryWalker::default();
        let scan = walker.fold(&tmp.path().join("absent"), 0u64, |acc, e| acc + e.size_bytes);
        assert_eq!(scan.value, 0);
        assert!(!scan.is_partial());
    }

    #[test]
    fn file_root_is_a_single_entry() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("index.html");
        write_file(&file, 42);

        let scan = DirectoryWalker::default().collect_files(&file, |_| true);
        assert_eq!(scan.value.len(), 1);
        assert_eq!(scan.value[0].size_bytes, 42);
    }

    #[test]
    fn skip_rules_prune_whole_subtrees() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("node_modules/pkg/x.png"), 10);
        write_file(&tmp.path().join(".cache/y.png"), 10);
        write_file(&tmp.path().join("public/.hidden.png"), 10);
        write_file(&tmp.path().join("public/z.png"), 10);

        let options = WalkOptions::default().with_skip(SkipRules::standard());
        let scan = DirectoryWalker::new(options).collect_files(tmp.path(), |_| true);

        assert_eq!(names(&scan), HashSet::from(["z.png".into()]));
    }

    #[test]
    fn depth_limit_is_reported() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("a/shallow.txt"), 1);
        write_file(&tmp.path().join("a/b/deep.txt"), 1);

        let options = WalkOptions {
            max_depth: 1,
            ..WalkOptions::default()
        };
        let scan = DirectoryWalker::new(options).collect_files(tmp.path(), |_| true);

        assert_eq!(names(&scan), HashSet::from(["shallow.txt".into()]));
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].reason, SkipReason::DepthLimit);
        assert_eq!(scan.skipped[0].path, tmp.path().join("a/b"));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let tmp = TempDir::new().unwrap();
        let mut deep = tmp.path().to_path_buf();
        for _ in 0..200 {
            deep.push("d");
        }
        write_file(&deep.join("leaf.txt"), 7);

        let scan = DirectoryWalker::default().fold(tmp.path(), 0u64, |acc, e| acc + e.size_bytes);
        assert_eq!(scan.value, 7);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_leaves_by_default() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("real/file.txt"), 5);
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("real/file.txt"),
            tmp.path().join("file-link.txt"),
        )
        .unwrap();

        let scan = DirectoryWalker::default().fold(tmp.path(), 0u64, |acc, e| acc + e.size_bytes);
        assert_eq!(scan.value, 5);
        assert!(!scan.is_partial());
    }

    #[cfg(unix)]
    #[test]
    fn follow_mode_detects_cycles() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        write_file(&root.join("a/file.txt"), 5);
        std::os::unix::fs::symlink(&root, root.join("a/loop")).unwrap();

        let options = WalkOptions {
            follow_symlinks: true,
            ..WalkOptions::default()
        };
        let scan = DirectoryWalker::new(options).fold(&root, 0u64, |acc, e| acc + e.size_bytes);

        assert_eq!(scan.value, 5);
        assert!(
            scan.skipped
                .iter()
                .any(|s| s.reason == SkipReason::SymlinkCycle && s.path == root.join("a/loop"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_reported_as_vanished_when_following() {
        let tmp = TempDir::new().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("dangling"))
            .unwrap();

        let options = WalkOptions {
            follow_symlinks: true,
            ..WalkOptions::default()
        };
        let scan = DirectoryWalker::new(options).fold(tmp.path(), 0u64, |acc, e| acc + e.size_bytes);
        assert_eq!(scan.value, 0);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].reason, SkipReason::Vanished);
    }

    #[cfg(unix)]
    #[test]
    fn pruned_dangling_links_are_not_reported_when_following() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("public/a.png"), 4);
        std::os::unix::fs::symlink(tmp.path().join("gone-cache"), tmp.path().join(".cache-link"))
            .unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone-deps"), tmp.path().join("node_modules"))
            .unwrap();

        let options = WalkOptions {
            follow_symlinks: true,
            ..WalkOptions::default().with_skip(SkipRules::standard())
        };
        let scan = DirectoryWalker::new(options).collect_files(tmp.path(), |_| true);

        assert_eq!(names(&scan), HashSet::from(["a.png".into()]));
        assert!(!scan.is_partial(), "{:?}", scan.skipped);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subtree_is_skipped_and_siblings_survive() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("public/ok.png"), 3);
        write_file(&tmp.path().join("locked/secret.png"), 9);
        let locked = tmp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass mode bits; nothing to observe then.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scan = DirectoryWalker::default().collect_files(tmp.path(), |_| true);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(names(&scan), HashSet::from(["ok.png".into()]));
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].path, locked);
        assert_eq!(scan.skipped[0].reason, SkipReason::PermissionDenied);
        assert!(scan.skipped[0].detail.is_some());
    }

    #[test]
    fn directory_removed_before_listing_is_vanished() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("d1/f.txt"), 1);
        write_file(&tmp.path().join("d2/f.txt"), 1);
        let dirs = [tmp.path().join("d1"), tmp.path().join("d2")];

        // Both directories are queued before either is listed; the first
        // file seen deletes the other one.
        let scan = DirectoryWalker::default().fold(tmp.path(), Vec::new(), |mut seen, entry| {
            if seen.is_empty() {
                for dir in &dirs {
                    if entry.path.parent() != Some(dir.as_path()) {
                        fs::remove_dir_all(dir).unwrap();
                    }
                }
            }
            seen.push(entry.path);
            seen
        });

        assert_eq!(scan.value.len(), 1);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].reason, SkipReason::Vanished);
        let survivor = scan.value[0].parent().unwrap();
        assert_ne!(scan.skipped[0].path, survivor);
        assert!(dirs.contains(&scan.skipped[0].path));
    }

    #[test]
    fn options_from_config_carry_excludes() {
        let tmp = TempDir::new().unwrap();
        write_file(&tmp.path().join("public/legacy/old.png"), 1);
        write_file(&tmp.path().join("public/new.png"), 1);

        let config = ScannerConfig {
            extra_excludes: vec!["public/legacy".to_string()],
            ..ScannerConfig::default()
        };
        let options = WalkOptions::from_config(&config).unwrap();
        let scan = DirectoryWalker::new(options).collect_files(tmp.path(), |_| true);
        assert_eq!(names(&scan), HashSet::from(["new.png".into()]));
    }

    #[test]
    fn scan_map_keeps_skips() {
        let scan = Scan {
            value: 3u64,
            skipped: vec![SkippedPath::new(PathBuf::from("x"), SkipReason::DepthLimit)],
        };
        let mapped = scan.map(|v| v * 2);
        assert_eq!(mapped.value, 6);
        assert!(mapped.is_partial());
    }
}
