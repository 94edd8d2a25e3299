//! Unused-asset detection by substring search over source files.
//!
//! An asset counts as referenced when its file name (`logo.png`) or its stem
//! (`logo`) appears anywhere in a source file. This is a byte-level search,
//! not an import graph: dynamic paths and string concatenation are invisible
//! to it, so results are reported as *potentially* unused.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use memchr::memmem;
use serde::Serialize;

use crate::scanner::entry::FileEntry;
use crate::scanner::filter::{ExtensionSet, scan_extensions};
use crate::scanner::walker::{SkippedPath, WalkOptions};

/// Result of an unused-asset pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedAssetReport {
    pub assets_scanned: usize,
    pub sources_scanned: usize,
    /// Assets with no name or stem match in any source file.
    pub unused: Vec<FileEntry>,
    pub skipped: Vec<SkippedPath>,
}

impl UnusedAssetReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub fn unused_bytes(&self) -> u64 {
        self.unused.iter().map(|f| f.size_bytes).sum()
    }
}

struct Needles {
    asset: FileEntry,
    name: memmem::Finder<'static>,
    stem: Option<memmem::Finder<'static>>,
}

impl Needles {
    fn new(asset: FileEntry) -> Self {
        let name = asset.file_name();
        let stem = asset
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty() && *s != name);
        Self {
            name: memmem::Finder::new(name.as_bytes()).into_owned(),
            stem: stem.map(|s| memmem::Finder::new(s.as_bytes()).into_owned()),
            asset,
        }
    }

    fn found_in(&self, haystack: &[u8]) -> bool {
        self.name.find(haystack).is_some()
            || self
                .stem
                .as_ref()
                .is_some_and(|finder| finder.find(haystack).is_some())
    }
}

/// Assets under `asset_dir` not referenced by any source file under `source_dir`.
///
/// Both trees are scanned with the skip rules in `options`. Source files
/// that cannot be read are recorded as skipped; an asset only referenced
/// from such a file will be reported as unused.
pub fn find_unused_assets(
    asset_dir: &Path,
    asset_extensions: &ExtensionSet,
    source_dir: &Path,
    source_extensions: &ExtensionSet,
    options: &WalkOptions,
) -> UnusedAssetReport {
    let assets = scan_extensions(asset_dir, asset_extensions, options);
    let sources = scan_extensions(source_dir, source_extensions, options);

    let assets_scanned = assets.value.len();
    let sources_scanned = sources.value.len();
    let mut skipped = assets.skipped;
    skipped.extend(sources.skipped);

    let mut pending: Vec<Needles> = assets.value.into_iter().map(Needles::new).collect();

    for source in &sources.value {
        if pending.is_empty() {
            break;
        }
        let contents = match fs::read(&source.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                skipped.push(SkippedPath::from_io(source.path.clone(), &err));
                continue;
            }
        };
        pending.retain(|needles| !needles.found_in(&contents));
    }

    let mut unused: Vec<FileEntry> = pending.into_iter().map(|n| n.asset).collect();
    unused.sort_by(|a, b| a.path.cmp(&b.path));

    UnusedAssetReport {
        assets_scanned,
        sources_scanned,
        unused,
        skipped,
    }
}
