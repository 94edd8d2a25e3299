//! Asset manifest: the fixed, ordered list of paths slated for removal.
//!
//! Entries come from `[prune] manifest` in the config or from a list file
//! (one path per line, `#` comments). They are never discovered by scanning.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::core::errors::{AuditError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetManifest {
    entries: Vec<PathBuf>,
}

impl AssetManifest {
    /// Build from literal entries. Duplicates collapse, first occurrence wins.
    ///
    /// Entries that would remove the whole project (`.`, a filesystem root)
    /// or climb out of it with `..` are rejected.
    pub fn new<I, P>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::build(entries.into_iter().map(Into::into), Path::new("<config>"))
    }

    /// Parse a list file: one path per line, blank lines and `#` comments ignored.
    pub fn from_list_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let entries = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PathBuf::from);
        Self::build(entries, path)
    }

    fn build(entries: impl Iterator<Item = PathBuf>, source: &Path) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for entry in entries {
            check_entry(&entry, source)?;
            // `./public/a.png` and `public/a.png` are the same entry.
            let entry: PathBuf = entry
                .components()
                .filter(|c| *c != Component::CurDir)
                .collect();
            if seen.insert(entry.clone()) {
                out.push(entry);
            }
        }
        Ok(Self { entries: out })
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries joined onto `base` when relative, in manifest order.
    pub fn resolve(&self, base: &Path) -> Vec<PathBuf> {
        self.entries
            .iter()
            .map(|entry| {
                if entry.is_absolute() {
                    entry.clone()
                } else {
                    base.join(entry)
                }
            })
            .collect()
    }
}

fn check_entry(entry: &Path, source: &Path) -> Result<()> {
    let reject = |why: &str| AuditError::ManifestParse {
        path: source.to_path_buf(),
        details: format!("{why}: {}", entry.display()),
    };

    if entry.components().any(|c| c == Component::ParentDir) {
        return Err(reject("entry must not contain `..`"));
    }
    let names_a_file = entry
        .components()
        .any(|c| matches!(c, Component::Normal(_)));
    if !names_a_file {
        return Err(reject("entry must name a file or directory"));
    }
    Ok(())
}
