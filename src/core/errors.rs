//! AUD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AuditError>;

/// Top-level error type for the asset auditor.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("[AUD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[AUD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[AUD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[AUD-2001] build command `{command}` failed: {details}")]
    BuildFailed { command: String, details: String },

    #[error("[AUD-2002] manifest parse failure in {path}: {details}")]
    ManifestParse { path: PathBuf, details: String },

    #[error("[AUD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[AUD-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[AUD-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[AUD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl AuditError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "AUD-1001",
            Self::MissingConfig { .. } => "AUD-1002",
            Self::ConfigParse { .. } => "AUD-1003",
            Self::BuildFailed { .. } => "AUD-2001",
            Self::ManifestParse { .. } => "AUD-2002",
            Self::Serialization { .. } => "AUD-2101",
            Self::PermissionDenied { .. } => "AUD-3001",
            Self::Io { .. } => "AUD-3002",
            Self::Runtime { .. } => "AUD-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    ///
    /// Permission failures are lifted into [`AuditError::PermissionDenied`]
    /// so callers can match on them without inspecting the io kind.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied { path };
        }
        Self::Io { path, source }
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for AuditError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<AuditError> {
        vec![
            AuditError::InvalidConfig {
                details: String::new(),
            },
            AuditError::MissingConfig {
                path: PathBuf::new(),
            },
            AuditError::ConfigParse {
                context: "",
                details: String::new(),
            },
            AuditError::BuildFailed {
                command: String::new(),
                details: String::new(),
            },
            AuditError::ManifestParse {
                path: PathBuf::new(),
                details: String::new(),
            },
            AuditError::Serialization {
                context: "",
                details: String::new(),
            },
            AuditError::PermissionDenied {
                path: PathBuf::new(),
            },
            AuditError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            AuditError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(AuditError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_display_includes_code() {
        for err in all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code {}: {msg}",
                err.code()
            );
        }
    }

    #[test]
    fn build_failure_is_not_retryable() {
        let err = AuditError::BuildFailed {
            command: "npm run build".to_string(),
            details: "exit status 1".to_string(),
        };
        assert!(err.to_string().contains("npm run build"));
    }

    #[test]
    fn io_convenience_constructor() {
        let err = AuditError::io(
            "/tmp/test.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "AUD-3002");
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn io_constructor_lifts_permission_denied() {
        let err = AuditError::io(
            "/root/secret",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, AuditError::PermissionDenied { .. }));
        assert_eq!(err.code(), "AUD-3001");
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: AuditError = json_err.into();
        assert_eq!(err.code(), "AUD-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: AuditError = toml_err.into();
        assert_eq!(err.code(), "AUD-1003");
    }
}
