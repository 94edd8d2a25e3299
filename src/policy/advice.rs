//! Deployment advice: heavy runtime dependencies and size recommendations.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::AdviceConfig;
use crate::core::errors::{AuditError, Result};
use crate::policy::threshold::{Verdict, format_bytes};
use crate::scanner::entry::FileEntry;

/// Only the dependency tables of `package.json` are read.
#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
}

/// A runtime dependency matching a heavy-dependency pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeavyDependency {
    pub name: String,
    pub version: String,
    pub pattern: String,
}

/// Runtime dependencies in `package_json` whose names match any of `patterns`.
///
/// A missing `package.json` yields no findings. Dev dependencies are ignored.
pub fn find_heavy_dependencies(
    package_json: &Path,
    patterns: &[String],
) -> Result<Vec<HeavyDependency>> {
    let raw = match fs::read_to_string(package_json) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(AuditError::io(package_json, err)),
    };
    let manifest: PackageManifest =
        serde_json::from_str(&raw).map_err(|e| AuditError::Serialization {
            context: "package.json",
            details: e.to_string(),
        })?;

    let compiled = patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map(|re| (p.as_str(), re))
                .map_err(|e| AuditError::InvalidConfig {
                    details: format!("heavy dependency pattern {p:?}: {e}"),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(manifest
        .dependencies
        .into_iter()
        .filter_map(|(name, version)| {
            let (pattern, _) = compiled.iter().find(|(_, re)| re.is_match(&name))?;
            Some(HeavyDependency {
                version: version.as_str().unwrap_or_default().to_string(),
                pattern: (*pattern).to_string(),
                name,
            })
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceLevel {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub level: AdviceLevel,
    pub message: String,
}

impl Recommendation {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: AdviceLevel::Warning,
            message: message.into(),
        }
    }

    fn info(message: &str) -> Self {
        Self {
            level: AdviceLevel::Info,
            message: message.to_string(),
        }
    }
}

/// Measurements the recommendations are derived from.
#[derive(Debug, Clone, Copy)]
pub struct AdviceInputs<'a> {
    pub public_dir_bytes: u64,
    pub large_files: &'a [FileEntry],
    pub build_verdict: Option<&'a Verdict>,
}

/// Size-driven recommendations first, then the general ones.
pub fn recommendations(inputs: &AdviceInputs<'_>, config: &AdviceConfig) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if inputs.public_dir_bytes > config.public_dir_warning_bytes {
        out.push(Recommendation::warning(format!(
            "public assets total {} (over {}); move large images to object storage",
            format_bytes(inputs.public_dir_bytes),
            format_bytes(config.public_dir_warning_bytes)
        )));
    }

    if inputs
        .large_files
        .iter()
        .any(|f| matches!(f.extension.as_str(), ".png" | ".jpg" | ".jpeg"))
    {
        out.push(Recommendation::warning(
            "large raster images found; compress them or convert to WebP",
        ));
    }

    if let Some(verdict) = inputs.build_verdict
        && !verdict.within_policy
    {
        out.push(Recommendation::warning(format!(
            "build exceeds the {}: {}",
            verdict.label, verdict.summary
        )));
    }

    out.push(Recommendation::info(
        "use lazy loading for images and components",
    ));
    out.push(Recommendation::info("enable gzip compression on the server"));
    out.push(Recommendation::info("consider a CDN for static assets"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::threshold::ThresholdPolicy;
    use tempfile::TempDir;

    fn patterns() -> Vec<String> {
        AdviceConfig::default().heavy_dependency_patterns
    }

    #[test]
    fn heavy_dependencies_match_runtime_deps_only() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("package.json");
        fs::write(
            &pkg,
            r#"{
                "name": "app",
                "dependencies": {
                    "react": "^18.2.0",
                    "moment-timezone": "^0.5.0",
                    "lodash": "4.17.21",
                    "@mui/material-ui-icons": "1.0.0"
                },
                "devDependencies": { "antd": "5.0.0" }
            }"#,
        )
        .unwrap();

        let found = find_heavy_dependencies(&pkg, &patterns()).unwrap();
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["@mui/material-ui-icons", "lodash", "moment-timezone"]);
        assert_eq!(found[1].version, "4.17.21");
        assert_eq!(found[2].pattern, "moment");
    }

    #[test]
    fn missing_package_json_is_empty() {
        let tmp = TempDir::new().unwrap();
        let found = find_heavy_dependencies(&tmp.path().join("package.json"), &patterns()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn malformed_package_json_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("package.json");
        fs::write(&pkg, "{ not json").unwrap();
        let err = find_heavy_dependencies(&pkg, &patterns()).unwrap_err();
        assert_eq!(err.code(), "AUD-2101");
    }

    #[test]
    fn recommendations_follow_measurements() {
        let config = AdviceConfig::default();
        let large = vec![FileEntry::new("public/hero.PNG".into(), 900_000)];
        let verdict = ThresholdPolicy::new(10, "limit").evaluate(20);

        let recs = recommendations(
            &AdviceInputs {
                public_dir_bytes: 6 * 1024 * 1024,
                large_files: &large,
                build_verdict: Some(&verdict),
            },
            &config,
        );
        let warnings: Vec<_> = recs
            .iter()
            .filter(|r| r.level == AdviceLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].message.contains("object storage"));
        assert!(warnings[1].message.contains("WebP"));
        assert!(warnings[2].message.contains("build exceeds the limit"));
    }

    #[test]
    fn quiet_project_gets_only_general_tips() {
        let recs = recommendations(
            &AdviceInputs {
                public_dir_bytes: 1024,
                large_files: &[FileEntry::new("public/intro.mp4".into(), 900_000)],
                build_verdict: None,
            },
            &AdviceConfig::default(),
        );
        assert_eq!(recs.len(), 3);
        assert!(recs.iter().all(|r| r.level == AdviceLevel::Info));
    }
}
