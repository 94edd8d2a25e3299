//! Manifest pruner: remove listed assets, then verify critical paths survive.
//!
//! Per entry, in manifest order:
//! 1. Absent → `NotFound`, continue
//! 2. Dry run → `WouldRemove { bytes }`, filesystem untouched
//! 3. Remove (`remove_file` / `remove_dir_all`) → `Removed { bytes }`
//! 4. Removal error → `Failed`, continue
//!
//! Nothing here aborts the batch; callers inspect the report.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::errors::{AuditError, Result};
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::prune::manifest::AssetManifest;
use crate::scanner::size::directory_size;
use crate::scanner::walker::WalkOptions;

/// What happened to one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PruneOutcome {
    Removed { bytes: u64 },
    WouldRemove { bytes: u64 },
    NotFound,
    Failed { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneItem {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: PruneOutcome,
}

/// Summary of a prune pass, outcomes in manifest order.
#[derive(Debug, Clone, Serialize)]
pub struct PruneReport {
    pub items: Vec<PruneItem>,
    /// Bytes actually deleted.
    pub bytes_freed: u64,
    /// Bytes a dry run would have deleted.
    pub bytes_reclaimable: u64,
    pub dry_run: bool,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

impl PruneReport {
    pub fn removed(&self) -> usize {
        self.count(|o| matches!(o, PruneOutcome::Removed { .. } | PruneOutcome::WouldRemove { .. }))
    }

    pub fn not_found(&self) -> usize {
        self.count(|o| matches!(o, PruneOutcome::NotFound))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PruneOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&PruneOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

/// Which critical paths exist after pruning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CriticalCheck {
    pub present: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl CriticalCheck {
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PruneOptions {
    pub dry_run: bool,
    /// Traversal options used to size directory entries.
    pub walk: WalkOptions,
}

/// Removes manifest entries relative to a base directory.
pub struct ManifestPruner {
    base: PathBuf,
    options: PruneOptions,
}

impl ManifestPruner {
    pub fn new(base: impl Into<PathBuf>, options: PruneOptions) -> Self {
        Self {
            base: base.into(),
            options,
        }
    }

    pub fn prune(&self, manifest: &AssetManifest, log: &mut ActivityLog) -> PruneReport {
        let start = Instant::now();
        let mut report = PruneReport {
            items: Vec::with_capacity(manifest.len()),
            bytes_freed: 0,
            bytes_reclaimable: 0,
            dry_run: self.options.dry_run,
            duration: Duration::ZERO,
        };

        for (entry, path) in manifest.entries().iter().zip(manifest.resolve(&self.base)) {
            let outcome = self.prune_one(&path);
            let display = entry.to_string_lossy().into_owned();
            match &outcome {
                PruneOutcome::Removed { bytes } => {
                    report.bytes_freed += bytes;
                    log.record(ActivityEvent::AssetRemoved {
                        path: display,
                        size_bytes: *bytes,
                        dry_run: false,
                    });
                }
                PruneOutcome::WouldRemove { bytes } => {
                    report.bytes_reclaimable += bytes;
                    log.record(ActivityEvent::AssetRemoved {
                        path: display,
                        size_bytes: *bytes,
                        dry_run: true,
                    });
                }
                PruneOutcome::NotFound => {
                    log.record(ActivityEvent::AssetMissing { path: display });
                }
                PruneOutcome::Failed { code, message } => {
                    log.record(ActivityEvent::AssetRemovalFailed {
                        path: display,
                        error_code: code.clone(),
                        error_message: message.clone(),
                    });
                }
            }
            report.items.push(PruneItem { path, outcome });
        }

        report.duration = start.elapsed();
        report
    }

    /// Check each critical path (relative to the base) for existence.
    /// Missing paths are logged, never fatal.
    pub fn check_critical(&self, critical: &[PathBuf], log: &mut ActivityLog) -> CriticalCheck {
        let mut check = CriticalCheck::default();
        for rel in critical {
            let path = if rel.is_absolute() {
                rel.clone()
            } else {
                self.base.join(rel)
            };
            // symlink_metadata: a dangling link still counts as present.
            if fs::symlink_metadata(&path).is_ok() {
                check.present.push(rel.clone());
            } else {
                log.record(ActivityEvent::CriticalPathMissing {
                    path: rel.to_string_lossy().into_owned(),
                });
                check.missing.push(rel.clone());
            }
        }
        check
    }

    fn prune_one(&self, path: &Path) -> PruneOutcome {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return PruneOutcome::NotFound;
            }
            Err(err) => return failed(&AuditError::io(path, err)),
        };

        let is_dir = meta.is_dir();
        let bytes = if is_dir {
            directory_size(path, &self.options.walk).value
        } else {
            meta.len()
        };

        if self.options.dry_run {
            return PruneOutcome::WouldRemove { bytes };
        }

        match delete_path(path, is_dir) {
            Ok(()) => PruneOutcome::Removed { bytes },
            Err(err) => failed(&err),
        }
    }
}

fn delete_path(path: &Path, is_dir: bool) -> Result<()> {
    if is_dir {
        fs::remove_dir_all(path).map_err(|e| AuditError::io(path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| AuditError::io(path, e))?;
    }

    if fs::symlink_metadata(path).is_ok() {
        return Err(AuditError::Runtime {
            details: format!("path still exists after removal: {}", path.display()),
        });
    }
    Ok(())
}

fn failed(err: &AuditError) -> PruneOutcome {
    PruneOutcome::Failed {
        code: err.code().to_string(),
        message: err.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn serialize_duration_ms<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
