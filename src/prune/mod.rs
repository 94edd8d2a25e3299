//! Manifest-driven asset removal with critical-path verification.

pub mod manifest;
pub mod pruner;
