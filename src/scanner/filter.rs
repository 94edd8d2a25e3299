//! Extension-filtered scanner.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::path::Path;

use crate::core::config::normalize_extension;
use crate::scanner::entry::FileEntry;
use crate::scanner::walker::{DirectoryWalker, Scan, WalkOptions};

/// Case-insensitive set of accepted extensions (`png`, `.png`, `.PNG` are equal).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtensionSet {
    extensions: HashSet<String>,
}

impl ExtensionSet {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, extension: &str) -> bool {
        !extension.is_empty() && self.extensions.contains(extension)
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Every regular file under `root` whose extension is in `extensions`.
///
/// Uses the skip rules carried by `options`; callers pass
/// [`SkipRules::standard`](crate::scanner::exclusion::SkipRules::standard) or
/// a config-derived set to prune `node_modules` and dot-prefixed entries.
pub fn scan_extensions(
    root: &Path,
    extensions: &ExtensionSet,
    options: &WalkOptions,
) -> Scan<Vec<FileEntry>> {
    DirectoryWalker::new(options.clone())
        .collect_files(root, |entry| extensions.contains(&entry.extension))
}
