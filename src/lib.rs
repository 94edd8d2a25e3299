#![forbid(unsafe_code)]

//! Asset Auditor: deploy-time checks for a web project's build output.
//!
//! - **Scanner**: bounded directory walks for total size, extension filters,
//!   large files, and assets never referenced from source.
//! - **Policy**: a byte ceiling on the build output, plus advisory
//!   recommendations and heavy-dependency detection.
//! - **Prune**: removal of a fixed asset manifest with critical-file checks.
//! - **Build**: the project's build tool run as a subprocess.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use asset_auditor::prelude::*;
//!
//! let report = directory_report(std::path::Path::new("dist"), &WalkOptions::default());
//! let verdict = ThresholdPolicy::new(10 * 1024 * 1024, "deploy limit").evaluate_report(&report);
//! println!("{}", verdict.summary);
//! ```

pub mod prelude;

pub mod build;
pub mod core;
pub mod logger;
pub mod policy;
pub mod prune;
pub mod scanner;
