//! Size ceiling policy and verdicts.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use crate::core::config::PolicyConfig;
use crate::scanner::size::DirectoryReport;

/// A named byte-size ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThresholdPolicy {
    pub ceiling_bytes: u64,
    pub label: String,
}

/// Outcome of checking a total against a [`ThresholdPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub within_policy: bool,
    pub total_bytes: u64,
    pub ceiling_bytes: u64,
    pub label: String,
    pub summary: String,
}

impl ThresholdPolicy {
    pub fn new(ceiling_bytes: u64, label: impl Into<String>) -> Self {
        Self {
            ceiling_bytes,
            label: label.into(),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.ceiling_bytes, config.label.clone())
    }

    /// `total <= ceiling` is within policy. Pure; callers decide what a
    /// failed verdict means.
    pub fn evaluate(&self, total_bytes: u64) -> Verdict {
        let within_policy = total_bytes <= self.ceiling_bytes;
        let summary = if within_policy {
            format!(
                "{} is within the {} of {}",
                format_bytes(total_bytes),
                self.label,
                format_bytes(self.ceiling_bytes)
            )
        } else {
            format!(
                "{} exceeds the {} of {} by {}",
                format_bytes(total_bytes),
                self.label,
                format_bytes(self.ceiling_bytes),
                format_bytes(total_bytes - self.ceiling_bytes)
            )
        };
        Verdict {
            within_policy,
            total_bytes,
            ceiling_bytes: self.ceiling_bytes,
            label: self.label.clone(),
            summary,
        }
    }

    pub fn evaluate_report(&self, report: &DirectoryReport) -> Verdict {
        self.evaluate(report.total_bytes)
    }
}

/// Human-readable size with base-1024 units. Below 1 KB the exact byte count
/// is shown; above, two decimals. GB is the largest unit.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;

    if bytes >= GIB {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
