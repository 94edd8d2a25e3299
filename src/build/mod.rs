//! Build runner: delegate to the project's build tool as a subprocess.
//!
//! Only the exit status and the files it leaves behind matter. A failed build
//! is fatal to the audit; nothing is measured on a partial output tree.

#![allow(missing_docs)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::config::BuildConfig;
use crate::core::errors::{AuditError, Result};
use crate::logger::activity::{ActivityEvent, ActivityLog};

/// Where the build tool's stdout goes. Stderr is always inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildOutput {
    #[default]
    Inherit,
    /// Keep our stdout clean for machine-readable output.
    Stderr,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub command: String,
    pub exit_code: Option<i32>,
    pub output_dir: PathBuf,
    pub cleaned: bool,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct BuildRunner {
    program: String,
    args: Vec<String>,
    project_dir: PathBuf,
    output_dir: PathBuf,
    clean_before_build: bool,
    output: BuildOutput,
}

impl BuildRunner {
    /// `output_dir` is resolved against `project_dir` when relative.
    pub fn from_config(config: &BuildConfig, project_dir: &Path) -> Result<Self> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| AuditError::InvalidConfig {
                details: "build.command must name a program".to_string(),
            })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            project_dir: project_dir.to_path_buf(),
            output_dir: project_dir.join(&config.output_dir),
            clean_before_build: config.clean_before_build,
            output: BuildOutput::Inherit,
        })
    }

    #[must_use]
    pub fn with_output(mut self, output: BuildOutput) -> Self {
        self.output = output;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Clean the output directory (if configured), run the build, and
    /// require a zero exit status.
    pub fn run(&self, log: &mut ActivityLog) -> Result<BuildOutcome> {
        let result = self.run_inner();
        match &result {
            Ok(outcome) => log.record(ActivityEvent::BuildCompleted {
                command: outcome.command.clone(),
                duration_ms: duration_ms(outcome.duration),
            }),
            Err(err) => log.record(ActivityEvent::BuildFailed {
                command: self.command_line(),
                error_code: err.code().to_string(),
                error_message: err.to_string(),
            }),
        }
        result
    }

    fn run_inner(&self) -> Result<BuildOutcome> {
        let start = Instant::now();
        let command = self.command_line();

        let cleaned = if self.clean_before_build {
            self.clean_output_dir()?
        } else {
            false
        };

        let stdout = match self.output {
            BuildOutput::Inherit => Stdio::inherit(),
            BuildOutput::Stderr => Stdio::from(io::stderr()),
        };
        let status = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| AuditError::BuildFailed {
                command: command.clone(),
                details: format!("failed to spawn: {e}"),
            })?;

        if !status.success() {
            return Err(AuditError::BuildFailed {
                command,
                details: status.code().map_or_else(
                    || "terminated by signal".to_string(),
                    |code| format!("exit status {code}"),
                ),
            });
        }

        Ok(BuildOutcome {
            command,
            exit_code: status.code(),
            output_dir: self.output_dir.clone(),
            cleaned,
            duration: start.elapsed(),
        })
    }

    /// Remove the output directory; `Ok(false)` when it did not exist.
    fn clean_output_dir(&self) -> Result<bool> {
        match fs::remove_dir_all(&self.output_dir) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AuditError::io(&self.output_dir, err)),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

fn serialize_duration_ms<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration_ms(*duration))
}
