//! Large-file detector.

use std::path::Path;

use crate::scanner::entry::FileEntry;
use crate::scanner::walker::{DirectoryWalker, Scan, WalkOptions};

/// Every regular file under `root` strictly larger than `threshold_bytes`.
///
/// Skip rules come from `options`. Unreadable subtrees end up in
/// [`Scan::skipped`]; whatever was readable is still returned.
pub fn find_large_files(
    root: &Path,
    threshold_bytes: u64,
    options: &WalkOptions,
) -> Scan<Vec<FileEntry>> {
    DirectoryWalker::new(options.clone())
        .collect_files(root, |entry| entry.size_bytes > threshold_bytes)
}

/// Sort largest first, ties by path, for display.
pub fn sort_by_size_desc(files: &mut [FileEntry]) {
    files.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| a.path.cmp(&b.path))
    });
}
