//! Scan-time file snapshots.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// One regular file as observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase, with the leading `.`; empty when the name has none.
    pub extension: String,
}

impl FileEntry {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        let extension = extension_of(&path);
        Self {
            path,
            size_bytes,
            extension,
        }
    }

    /// Final path component, lossily converted.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Extension of `path`'s file name: the text after the final `.`, lowercased,
/// with the dot kept. Dotfiles such as `.env` have no extension.
pub fn extension_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) if !ext.is_empty() => format!(".{}", ext.to_string_lossy().to_lowercase()),
        _ => String::new(),
    }
}
