//! Skip rules for filtered scans: `node_modules`, dot-prefixed names, and
//! config-level glob excludes.
//!
//! Pruned directories are never listed, so nothing beneath them is visited.
//! Glob patterns are matched against the path relative to the scan root,
//! using `/` as separator:
//! - `**` matches across path components
//! - `*` matches within a single component
//! - `?` matches one character other than `/`

#![allow(missing_docs)]

use std::path::Path;

use regex::Regex;

use crate::core::errors::{AuditError, Result};

/// Directory name pruned by the standard rules.
pub const NODE_MODULES: &str = "node_modules";

/// Compiled glob pattern for relative-path matching.
#[derive(Debug, Clone)]
struct GlobPattern {
    original: String,
    compiled: Regex,
}

/// Which entries a traversal must not visit.
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    prune_hidden: bool,
    prune_node_modules: bool,
    patterns: Vec<GlobPattern>,
}

impl SkipRules {
    /// Visit everything. Used by the size calculator.
    pub fn none() -> Self {
        Self::default()
    }

    /// Prune `node_modules` directories and every dot-prefixed file or directory.
    pub fn standard() -> Self {
        Self {
            prune_hidden: true,
            prune_node_modules: true,
            patterns: Vec::new(),
        }
    }

    /// Standard rules plus shell-style glob excludes.
    pub fn with_excludes(patterns: &[String]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|pat| {
                Ok(GlobPattern {
                    original: pat.clone(),
                    compiled: glob_to_regex(pat)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns: compiled,
            ..Self::standard()
        })
    }

    /// Whether the entry named `name` (at `relative` under the scan root)
    /// should be pruned.
    pub fn should_prune(&self, relative: &Path, name: &str, is_dir: bool) -> bool {
        if self.prune_hidden && name.starts_with('.') {
            return true;
        }
        if self.prune_node_modules && is_dir && name == NODE_MODULES {
            return true;
        }
        if self.patterns.is_empty() {
            return false;
        }
        let rel = normalize_path_for_matching(relative);
        self.patterns.iter().any(|pat| pat.compiled.is_match(&rel))
    }

    /// The glob patterns this rule set was built from.
    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.original.as_str()).collect()
    }
}

/// Validate that a glob pattern can be compiled.
pub fn validate_glob_pattern(pattern: &str) -> Result<()> {
    glob_to_regex(pattern).map(|_| ())
}

/// Convert a shell-style glob pattern to an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let normalized_pattern = pattern.replace('\\', "/");
    let normalized_pattern = normalized_pattern.trim_start_matches("./");
    let mut regex_str = String::with_capacity(pattern.len() * 2);
    regex_str.push('^');

    let chars: Vec<char> = normalized_pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                if i + 2 < chars.len() && chars[i + 2] == '/' {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            '.' | '+' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '$' | '|' | '\\' => {
                regex_str.push('\\');
                regex_str.push(chars[i]);
                i += 1;
            }
            c => {
                regex_str.push(c);
                i += 1;
            }
        }
    }

    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| AuditError::InvalidConfig {
        details: format!("invalid glob pattern {pattern:?}: {err}"),
    })
}

fn normalize_path_for_matching(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
