//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use asset_auditor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{AuditError, Result};

// Scanner
pub use crate::scanner::entry::FileEntry;
pub use crate::scanner::exclusion::SkipRules;
pub use crate::scanner::filter::{ExtensionSet, scan_extensions};
pub use crate::scanner::large::{find_large_files, sort_by_size_desc};
pub use crate::scanner::references::{UnusedAssetReport, find_unused_assets};
pub use crate::scanner::size::{DirectoryReport, directory_report, directory_size};
pub use crate::scanner::walker::{DirectoryWalker, Scan, SkippedPath, WalkOptions};

// Policy
pub use crate::policy::advice::{find_heavy_dependencies, recommendations};
pub use crate::policy::threshold::{ThresholdPolicy, Verdict, format_bytes};

// Prune
pub use crate::prune::manifest::AssetManifest;
pub use crate::prune::pruner::{ManifestPruner, PruneOptions, PruneReport};

// Build
pub use crate::build::{BuildOutcome, BuildRunner};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLog};
