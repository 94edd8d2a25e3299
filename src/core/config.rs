//! Configuration system: TOML file + env var overrides + project defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{AuditError, Result};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "asset-audit.toml";

/// 10 MiB: the deployment platform ceiling the deploy scripts were written against.
pub const DEFAULT_CEILING_BYTES: u64 = 10 * 1024 * 1024;

/// Full auditor configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub policy: PolicyConfig,
    pub scanner: ScannerConfig,
    pub prune: PruneConfig,
    pub build: BuildConfig,
    pub advice: AdviceConfig,
    pub paths: PathsConfig,
}

/// Size ceiling of the deployment target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    pub ceiling_bytes: u64,
    pub label: String,
}

/// Traversal behavior and scan defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Project root; every relative path in this config resolves against it.
    pub root: PathBuf,
    pub follow_symlinks: bool,
    pub max_depth: usize,
    /// Extra shell-style globs pruned by the filtered scanners.
    pub extra_excludes: Vec<String>,
    pub image_extensions: Vec<String>,
    pub source_extensions: Vec<String>,
    pub large_file_threshold_bytes: u64,
    pub public_dir: PathBuf,
    pub source_dir: PathBuf,
}

/// Manifest of deployable-tree paths to remove, plus post-prune sanity checks.
///
/// `manifest` defaults to empty: pruning removes nothing until it is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PruneConfig {
    pub manifest: Vec<PathBuf>,
    pub critical_paths: Vec<PathBuf>,
}

/// External build tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildConfig {
    pub command: Vec<String>,
    pub output_dir: PathBuf,
    pub clean_before_build: bool,
}

/// Thresholds and patterns for optimisation advice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdviceConfig {
    pub heavy_dependency_patterns: Vec<String>,
    pub public_dir_warning_bytes: u64,
}

/// Filesystem paths used by the auditor itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PathsConfig {
    /// Config file the effective config was loaded from (if any).
    pub config_file: Option<PathBuf>,
    /// JSONL activity log. `None` disables activity logging.
    pub activity_log: Option<PathBuf>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ceiling_bytes: DEFAULT_CEILING_BYTES,
            label: "deployment platform limit".to_string(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            follow_symlinks: false,
            max_depth: 256,
            extra_excludes: Vec::new(),
            image_extensions: [".png", ".jpg", ".jpeg", ".gif", ".svg"]
                .map(String::from)
                .to_vec(),
            source_extensions: [".tsx", ".ts", ".jsx", ".js"].map(String::from).to_vec(),
            large_file_threshold_bytes: 500 * 1024,
            public_dir: PathBuf::from("public"),
            source_dir: PathBuf::from("src"),
        }
    }
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            manifest: Vec::new(),
            critical_paths: ["public/vite.svg", "index.html", "package.json"]
                .map(PathBuf::from)
                .to_vec(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: ["npm", "run", "build"].map(String::from).to_vec(),
            output_dir: PathBuf::from("dist"),
            clean_before_build: true,
        }
    }
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            heavy_dependency_patterns: ["moment", "lodash", "antd", "material-ui"]
                .map(String::from)
                .to_vec(),
            public_dir_warning_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Default configuration path (relative to the working directory).
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default path;
    /// defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| AuditError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let mut parsed: Self = toml::from_str(&raw)?;
            parsed.paths.config_file = Some(path_buf);
            parsed
        } else if is_explicit_path {
            return Err(AuditError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve a config-relative path against the scan root.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.scanner.root.join(path)
        }
    }

    /// Deterministic hash of the effective config for the activity log.
    ///
    /// FNV-1a over canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("AUDIT_CEILING_BYTES") {
            self.policy.ceiling_bytes = parse_env_u64("AUDIT_CEILING_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("AUDIT_ROOT") {
            self.scanner.root = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Normalize extension lists to the lowercase dotted form and strip
    /// trailing slashes from the root.
    fn normalize(&mut self) {
        for list in [
            &mut self.scanner.image_extensions,
            &mut self.scanner.source_extensions,
        ] {
            for ext in list.iter_mut() {
                *ext = normalize_extension(ext);
            }
            list.retain(|ext| !ext.is_empty());
            list.dedup();
        }

        let s = self.scanner.root.to_string_lossy();
        if s.len() > 1
            && let Some(stripped) = s.strip_suffix('/')
        {
            self.scanner.root = PathBuf::from(stripped);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.policy.ceiling_bytes == 0 {
            return Err(AuditError::InvalidConfig {
                details: "policy.ceiling_bytes must be > 0".to_string(),
            });
        }
        if self.policy.label.trim().is_empty() {
            return Err(AuditError::InvalidConfig {
                details: "policy.label must not be empty".to_string(),
            });
        }
        if self.scanner.max_depth == 0 {
            return Err(AuditError::InvalidConfig {
                details: "scanner.max_depth must be >= 1".to_string(),
            });
        }
        if self.scanner.large_file_threshold_bytes == 0 {
            return Err(AuditError::InvalidConfig {
                details: "scanner.large_file_threshold_bytes must be > 0".to_string(),
            });
        }
        if self.scanner.image_extensions.is_empty() || self.scanner.source_extensions.is_empty()
        {
            return Err(AuditError::InvalidConfig {
                details: "scanner.image_extensions and scanner.source_extensions must not be empty"
                    .to_string(),
            });
        }
        if self
            .build
            .command
            .first()
            .is_none_or(|program| program.trim().is_empty())
        {
            return Err(AuditError::InvalidConfig {
                details: "build.command must name a program".to_string(),
            });
        }

        for pattern in &self.scanner.extra_excludes {
            crate::scanner::exclusion::validate_glob_pattern(pattern)?;
        }
        for pattern in &self.advice.heavy_dependency_patterns {
            regex::Regex::new(pattern).map_err(|e| AuditError::InvalidConfig {
                details: format!("advice.heavy_dependency_patterns entry {pattern:?}: {e}"),
            })?;
        }

        Ok(())
    }
}

/// Lowercase an extension and give it a leading dot (`PNG` → `.png`).
#[must_use]
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }
    format!(".{}", trimmed.to_lowercase())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| AuditError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{AuditError, Config, normalize_extension};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.policy.ceiling_bytes, 10_485_760);
    }

    #[test]
    fn zero_ceiling_rejected() {
        let mut cfg = Config::default();
        cfg.policy.ceiling_bytes = 0;
        let err = cfg.validate().expect_err("expected ceiling error");
        assert!(err.to_string().contains("ceiling_bytes"));
    }

    #[test]
    fn empty_build_command_rejected() {
        let mut cfg = Config::default();
        cfg.build.command.clear();
        let err = cfg.validate().expect_err("expected build command error");
        assert!(err.to_string().contains("build.command"));
    }

    #[test]
    fn invalid_dependency_regex_rejected() {
        let mut cfg = Config::default();
        cfg.advice.heavy_dependency_patterns = vec!["(unclosed".to_string()];
        let err = cfg.validate().expect_err("expected regex error");
        assert!(matches!(err, AuditError::InvalidConfig { .. }));
    }

    #[test]
    fn env_overrides_ceiling_and_root() {
        let mut cfg = Config::default();
        let overrides = vars(&[("AUDIT_CEILING_BYTES", "2048"), ("AUDIT_ROOT", "/srv/site")]);
        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");
        assert_eq!(cfg.policy.ceiling_bytes, 2048);
        assert_eq!(cfg.scanner.root, PathBuf::from("/srv/site"));
    }

    #[test]
    fn env_invalid_ceiling_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("AUDIT_CEILING_BYTES", "ten megabytes")]);
        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid number should fail");
        match err {
            AuditError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("AUDIT_CEILING_BYTES"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn normalize_lowercases_and_dots_extensions() {
        let mut cfg = Config::default();
        cfg.scanner.image_extensions = vec!["PNG".into(), ".Svg".into(), "  ".into()];
        cfg.scanner.root = PathBuf::from("/srv/site/");
        cfg.normalize();
        assert_eq!(cfg.scanner.image_extensions, vec![".png", ".svg"]);
        assert_eq!(cfg.scanner.root, PathBuf::from("/srv/site"));
    }

    #[test]
    fn normalize_extension_handles_bare_and_dotted() {
        assert_eq!(normalize_extension("png"), ".png");
        assert_eq!(normalize_extension(".JPEG"), ".jpeg");
        assert_eq!(normalize_extension("."), "");
        assert_eq!(normalize_extension(".ÄB"), ".äb");
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/asset-audit/config.toml")));
        assert!(matches!(result, Err(AuditError::MissingConfig { .. })));
    }

    #[test]
    fn load_parses_partial_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset-audit.toml");
        std::fs::write(
            &path,
            r#"
[policy]
ceiling_bytes = 4096

[prune]
manifest = ["public/logo.png", "screenshot.png"]
"#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.policy.ceiling_bytes, 4096);
        assert_eq!(cfg.policy.label, "deployment platform limit");
        assert_eq!(cfg.prune.manifest.len(), 2);
        assert_eq!(cfg.paths.config_file.as_deref(), Some(path.as_path()));
        assert_eq!(cfg.build.output_dir, PathBuf::from("dist"));
    }

    #[test]
    fn resolve_joins_relative_paths_onto_root() {
        let mut cfg = Config::default();
        cfg.scanner.root = PathBuf::from("/srv/site");
        assert_eq!(
            cfg.resolve(Path::new("dist")),
            PathBuf::from("/srv/site/dist")
        );
        assert_eq!(cfg.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = Config::default();
        let before = cfg.stable_hash().expect("hash");
        let mut modified = Config::default();
        modified.policy.ceiling_bytes += 1;
        let after = modified.stable_hash().expect("hash");
        assert_ne!(before, after);
        assert_eq!(before, cfg.stable_hash().expect("hash"));
    }
}
