//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use asset_auditor::build::{BuildOutcome, BuildOutput, BuildRunner};
use asset_auditor::core::config::Config;
use asset_auditor::core::errors::AuditError;
use asset_auditor::core::paths::{display_relative, resolve_absolute_path};
use asset_auditor::logger::activity::{ActivityEvent, ActivityLog};
use asset_auditor::policy::advice::{
    AdviceInputs, AdviceLevel, HeavyDependency, Recommendation, find_heavy_dependencies,
    recommendations,
};
use asset_auditor::policy::threshold::{ThresholdPolicy, Verdict, format_bytes};
use asset_auditor::prune::manifest::AssetManifest;
use asset_auditor::prune::pruner::{
    CriticalCheck, ManifestPruner, PruneOptions, PruneOutcome, PruneReport,
};
use asset_auditor::scanner::entry::FileEntry;
use asset_auditor::scanner::exclusion::NODE_MODULES;
use asset_auditor::scanner::filter::{ExtensionSet, scan_extensions};
use asset_auditor::scanner::large::{find_large_files, sort_by_size_desc};
use asset_auditor::scanner::references::{UnusedAssetReport, find_unused_assets};
use asset_auditor::scanner::size::{DirectoryReport, directory_report, directory_size};
use asset_auditor::scanner::walker::{SkippedPath, WalkOptions};

/// Deploy-time asset auditor for web build output.
#[derive(Debug, Parser)]
#[command(
    name = "asset-audit",
    author,
    version,
    about = "Asset Auditor - build size ceilings, large files, and asset cleanup",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (results and errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Measure a build output tree against the size ceiling.
    Analyze(AnalyzeArgs),
    /// List files above a size threshold.
    Large(LargeArgs),
    /// List files with the given extensions (images by default).
    Scan(ScanArgs),
    /// List public assets not referenced from source files.
    Unused(UnusedArgs),
    /// Remove the configured asset manifest and verify critical files.
    ///
    /// The manifest is empty unless `[prune] manifest` is set in the config
    /// or `--manifest FILE` is given; with neither, nothing is removed.
    Prune(PruneArgs),
    /// Run the configured build command.
    Build(BuildArgs),
    /// Prune, verify, build, and gate the build output on the ceiling.
    Deploy(DeployArgs),
    /// Pre-deploy report: sizes, large files, build verdict, and advice.
    Prepare(PrepareArgs),
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
    /// Show version and optional build metadata.
    Version(VersionArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct AnalyzeArgs {
    /// Tree to measure (defaults to the configured build output directory).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
    /// Override the size ceiling in bytes.
    #[arg(long, value_name = "BYTES")]
    ceiling: Option<u64>,
    /// Report a violation without failing.
    #[arg(long)]
    no_fail: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct LargeArgs {
    /// Tree to search (defaults to the project root).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
    /// Size threshold in bytes; files strictly larger are listed.
    #[arg(long, value_name = "BYTES")]
    threshold: Option<u64>,
    /// Show at most this many files.
    #[arg(long, value_name = "N")]
    top: Option<usize>,
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    /// Trees to scan (defaults to the project root).
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Accepted extensions (repeatable or comma-separated).
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    extensions: Vec<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct UnusedArgs {
    /// Asset directory (defaults to the configured public directory).
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,
    /// Source directory (defaults to the configured source directory).
    #[arg(long, value_name = "DIR")]
    sources: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct PruneArgs {
    /// Report what would be removed without touching the filesystem.
    #[arg(long)]
    dry_run: bool,
    /// Read the manifest from a list file instead of `[prune] manifest`.
    #[arg(long, value_name = "FILE")]
    manifest: Option<PathBuf>,
    /// Critical paths to verify afterwards (replaces the configured list).
    #[arg(long, value_name = "PATH")]
    critical: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct BuildArgs {
    /// Keep the existing output directory instead of removing it first.
    #[arg(long)]
    no_clean: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct DeployArgs {
    /// Preview the prune and skip the build.
    #[arg(long)]
    dry_run: bool,
    /// Report a ceiling violation without failing.
    #[arg(long)]
    no_fail: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct PrepareArgs {
    /// Large-file threshold in bytes (defaults to the configured value).
    #[arg(long, value_name = "BYTES")]
    threshold: Option<u64>,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
    /// Validate configuration and exit.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Args, Default)]
struct VersionArgs {
    /// Include additional build metadata fields.
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure, including a failed build.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// Measured size exceeds the configured ceiling.
    #[error("{0}")]
    PolicyViolation(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
            Self::PolicyViolation(_) => 5,
        }
    }
}

impl From<AuditError> for CliError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::InvalidConfig { .. }
            | AuditError::MissingConfig { .. }
            | AuditError::ConfigParse { .. }
            | AuditError::ManifestParse { .. } => Self::User(err.to_string()),
            AuditError::Serialization { .. } => Self::Internal(err.to_string()),
            AuditError::BuildFailed { .. }
            | AuditError::PermissionDenied { .. }
            | AuditError::Io { .. }
            | AuditError::Runtime { .. } => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || output_mode(cli) == OutputMode::Json {
        control::set_override(false);
    }

    match &cli.command {
        Command::Analyze(args) => run_analyze(cli, args),
        Command::Large(args) => run_large(cli, args),
        Command::Scan(args) => run_scan(cli, args),
        Command::Unused(args) => run_unused(cli, args),
        Command::Prune(args) => run_prune(cli, args),
        Command::Build(args) => run_build(cli, args),
        Command::Deploy(args) => run_deploy(cli, args),
        Command::Prepare(args) => run_prepare(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
        Command::Version(args) => emit_version(cli, args),
    }
}

// ---------------------------------------------------------------------------
// Session: loaded config + activity log, shared by every audit command
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    log: ActivityLog,
    mode: OutputMode,
}

impl Session {
    fn open(cli: &Cli, command: &str) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let mut log = config
            .paths
            .activity_log
            .as_deref()
            .map_or_else(ActivityLog::disabled, ActivityLog::open);
        log.record(ActivityEvent::AuditStarted {
            command: command.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: config.stable_hash()?,
        });
        let session = Self {
            config,
            log,
            mode: output_mode(cli),
        };
        if cli.verbose {
            let options = session.walk_options()?;
            debug(
                cli,
                "CONFIG",
                &format!(
                    "root={} source={} excludes={:?}",
                    resolve_absolute_path(session.root()).display(),
                    session
                        .config
                        .paths
                        .config_file
                        .as_deref()
                        .map_or_else(|| "defaults".to_string(), |p| p.display().to_string()),
                    options.skip.patterns(),
                ),
            );
        }
        Ok(session)
    }

    fn root(&self) -> &Path {
        &self.config.scanner.root
    }

    fn walk_options(&self) -> Result<WalkOptions, CliError> {
        Ok(WalkOptions::from_config(&self.config.scanner)?)
    }

    fn policy(&self, ceiling_override: Option<u64>) -> Result<ThresholdPolicy, CliError> {
        let mut policy = ThresholdPolicy::from_config(&self.config.policy);
        if let Some(ceiling) = ceiling_override {
            if ceiling == 0 {
                return Err(CliError::User("--ceiling must be > 0".to_string()));
            }
            policy.ceiling_bytes = ceiling;
        }
        Ok(policy)
    }

    fn build_runner(&self) -> Result<BuildRunner, CliError> {
        let output = match self.mode {
            OutputMode::Human => BuildOutput::Inherit,
            OutputMode::Json => BuildOutput::Stderr,
        };
        Ok(BuildRunner::from_config(&self.config.build, self.root())?.with_output(output))
    }

    fn record_scan(
        &mut self,
        command: &str,
        root: &Path,
        files: usize,
        bytes: u64,
        skipped: usize,
        start: Instant,
    ) {
        self.log.record(ActivityEvent::ScanCompleted {
            command: command.to_string(),
            root: root.to_string_lossy().into_owned(),
            files: files as u64,
            total_bytes: bytes,
            skipped: skipped as u64,
            duration_ms: elapsed_ms(start),
        });
    }

    fn record_report(&mut self, command: &str, report: &DirectoryReport, start: Instant) {
        self.record_scan(
            command,
            &report.root,
            report.children.len(),
            report.total_bytes,
            report.skipped.len(),
            start,
        );
    }

    fn record_verdict(&mut self, verdict: &Verdict) {
        self.log.record(ActivityEvent::PolicyVerdict {
            total_bytes: verdict.total_bytes,
            ceiling_bytes: verdict.ceiling_bytes,
            within_policy: verdict.within_policy,
        });
    }
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

fn run_analyze(cli: &Cli, args: &AnalyzeArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "analyze")?;
    let start = Instant::now();
    let target = args
        .path
        .clone()
        .unwrap_or_else(|| session.config.resolve(&session.config.build.output_dir));
    let policy = session.policy(args.ceiling)?;

    let report = directory_report(&target, &session.walk_options()?);
    let verdict = policy.evaluate_report(&report);
    session.record_report("analyze", &report, start);
    session.record_verdict(&verdict);

    match session.mode {
        OutputMode::Human => {
            if !target.exists() {
                note(cli, &format!("{} does not exist; measured as empty", target.display()));
            }
            print_directory_report(&report);
            print_verdict(&verdict);
            report_skipped(cli, &report.skipped);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "analyze",
                "report": report,
                "verdict": verdict,
            });
            write_json_line(&payload)?;
        }
    }

    enforce_verdict(&verdict, args.no_fail)
}

// ---------------------------------------------------------------------------
// large
// ---------------------------------------------------------------------------

fn run_large(cli: &Cli, args: &LargeArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "large")?;
    let start = Instant::now();
    let root = args.path.clone().unwrap_or_else(|| session.root().to_path_buf());
    let threshold = args
        .threshold
        .unwrap_or(session.config.scanner.large_file_threshold_bytes);

    let mut scan = find_large_files(&root, threshold, &session.walk_options()?);
    sort_by_size_desc(&mut scan.value);
    let total: u64 = scan.value.iter().map(|f| f.size_bytes).sum();
    session.record_scan(
        "large",
        &root,
        scan.value.len(),
        total,
        scan.skipped.len(),
        start,
    );

    let shown = args.top.map_or(scan.value.len(), |n| n.min(scan.value.len()));

    match session.mode {
        OutputMode::Human => {
            println!(
                "{} (> {}) under {}",
                "Large files".bold(),
                format_bytes(threshold),
                root.display()
            );
            if scan.value.is_empty() {
                println!("  {}", "No files above threshold.".green());
            } else {
                print_file_table(&scan.value[..shown], &root);
                if shown < scan.value.len() {
                    println!("  ... and {} more", scan.value.len() - shown);
                }
                println!();
                println!("  Total: {} in {} files", format_bytes(total), scan.value.len());
            }
            report_skipped(cli, &scan.skipped);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "large",
                "root": root.to_string_lossy(),
                "threshold_bytes": threshold,
                "count": scan.value.len(),
                "total_bytes": total,
                "files": &scan.value[..shown],
                "skipped": scan.skipped,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "scan")?;
    let start = Instant::now();
    let roots = if args.paths.is_empty() {
        vec![session.root().to_path_buf()]
    } else {
        args.paths.clone()
    };
    let extensions = if args.extensions.is_empty() {
        ExtensionSet::new(&session.config.scanner.image_extensions)
    } else {
        ExtensionSet::new(&args.extensions)
    };
    if extensions.is_empty() {
        return Err(CliError::User("--ext must name at least one extension".to_string()));
    }
    let options = session.walk_options()?;

    let mut files: Vec<FileEntry> = Vec::new();
    let mut skipped: Vec<SkippedPath> = Vec::new();
    for root in &roots {
        let scan = scan_extensions(root, &extensions, &options);
        files.extend(scan.value);
        skipped.extend(scan.skipped);
    }
    let total: u64 = files.iter().map(|f| f.size_bytes).sum();
    let label = roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    session.record_scan("scan", Path::new(&label), files.len(), total, skipped.len(), start);

    match session.mode {
        OutputMode::Human => {
            println!("{} under {label}", "Asset scan".bold());
            if files.is_empty() {
                println!("  No matching files.");
            } else {
                let base = if roots.len() == 1 { roots[0].as_path() } else { Path::new("") };
                print_file_table(&files, base);
                println!();
                println!("  Total: {} in {} files", format_bytes(total), files.len());
            }
            report_skipped(cli, &skipped);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "scan",
                "roots": roots,
                "count": files.len(),
                "total_bytes": total,
                "files": files,
                "skipped": skipped,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// unused
// ---------------------------------------------------------------------------

fn run_unused(cli: &Cli, args: &UnusedArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "unused")?;
    let start = Instant::now();
    let scanner = &session.config.scanner;
    let assets = args
        .assets
        .clone()
        .unwrap_or_else(|| session.config.resolve(&scanner.public_dir));
    let sources = args
        .sources
        .clone()
        .unwrap_or_else(|| session.config.resolve(&scanner.source_dir));

    let report = find_unused_assets(
        &assets,
        &ExtensionSet::new(&scanner.image_extensions),
        &sources,
        &ExtensionSet::new(&scanner.source_extensions),
        &session.walk_options()?,
    );
    session.record_scan(
        "unused",
        &assets,
        report.unused.len(),
        report.unused_bytes(),
        report.skipped.len(),
        start,
    );

    match session.mode {
        OutputMode::Human => print_unused(cli, &report, &assets),
        OutputMode::Json => {
            let payload = json!({
                "command": "unused",
                "assets_dir": assets.to_string_lossy(),
                "sources_dir": sources.to_string_lossy(),
                "report": report,
                "unused_bytes": report.unused_bytes(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_unused(cli: &Cli, report: &UnusedAssetReport, assets: &Path) {
    println!(
        "{} ({} assets checked against {} source files)",
        "Potentially unused assets".bold(),
        report.assets_scanned,
        report.sources_scanned
    );
    if report.unused.is_empty() {
        println!("  {}", "Every asset is referenced.".green());
    } else {
        print_file_table(&report.unused, assets);
        println!();
        println!(
            "  {} unused, {} total",
            report.unused.len(),
            format_bytes(report.unused_bytes())
        );
        note(cli, "matches are by file name or stem; verify before deleting");
    }
    report_skipped(cli, &report.skipped);
}

// ---------------------------------------------------------------------------
// prune
// ---------------------------------------------------------------------------

fn run_prune(cli: &Cli, args: &PruneArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "prune")?;
    let manifest = match &args.manifest {
        Some(file) => AssetManifest::from_list_file(file)?,
        None => AssetManifest::new(session.config.prune.manifest.clone())?,
    };
    let critical = if args.critical.is_empty() {
        session.config.prune.critical_paths.clone()
    } else {
        args.critical.clone()
    };

    let (report, check) = prune_and_verify(&mut session, &manifest, &critical, args.dry_run)?;

    match session.mode {
        OutputMode::Human => {
            if manifest.is_empty() {
                note(cli, "manifest is empty; nothing to remove (set [prune] manifest)");
            }
            print_prune_report(&report, session.root());
            print_critical_check(&check);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "prune",
                "report": report,
                "critical": check,
            });
            write_json_line(&payload)?;
        }
    }

    prune_exit(&report)
}

fn prune_and_verify(
    session: &mut Session,
    manifest: &AssetManifest,
    critical: &[PathBuf],
    dry_run: bool,
) -> Result<(PruneReport, CriticalCheck), CliError> {
    let pruner = ManifestPruner::new(
        session.root(),
        PruneOptions {
            dry_run,
            walk: session.walk_options()?,
        },
    );
    let report = pruner.prune(manifest, &mut session.log);
    let check = pruner.check_critical(critical, &mut session.log);
    Ok((report, check))
}

fn prune_exit(report: &PruneReport) -> Result<(), CliError> {
    if report.failed() > 0 {
        return Err(CliError::Partial(format!(
            "{} of {} manifest entries could not be removed",
            report.failed(),
            report.items.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

fn run_build(cli: &Cli, args: &BuildArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "build")?;
    if args.no_clean {
        session.config.build.clean_before_build = false;
    }
    let runner = session.build_runner()?;
    debug(cli, "BUILD", &format!("running `{}`", runner.command_line()));
    let outcome = runner.run(&mut session.log)?;

    match session.mode {
        OutputMode::Human => print_build_outcome(&outcome),
        OutputMode::Json => {
            let payload = json!({
                "command": "build",
                "outcome": outcome,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// deploy: prune -> verify -> build -> analyze
// ---------------------------------------------------------------------------

fn run_deploy(cli: &Cli, args: &DeployArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "deploy")?;
    let manifest = AssetManifest::new(session.config.prune.manifest.clone())?;
    let critical = session.config.prune.critical_paths.clone();

    let (prune_report, check) = prune_and_verify(&mut session, &manifest, &critical, args.dry_run)?;
    if session.mode == OutputMode::Human {
        print_prune_report(&prune_report, session.root());
        print_critical_check(&check);
    }

    let build = if args.dry_run {
        note(cli, "dry run: build skipped; measuring the existing output");
        None
    } else {
        let runner = session.build_runner()?;
        if session.mode == OutputMode::Human {
            println!("\n{} `{}`", "Building:".bold(), runner.command_line());
        }
        let outcome = runner.run(&mut session.log)?;
        if session.mode == OutputMode::Human {
            print_build_outcome(&outcome);
        }
        Some(outcome)
    };

    let start = Instant::now();
    let output_dir = session.config.resolve(&session.config.build.output_dir);
    let report = directory_report(&output_dir, &session.walk_options()?);
    let verdict = session.policy(None)?.evaluate_report(&report);
    session.record_report("deploy", &report, start);
    session.record_verdict(&verdict);

    match session.mode {
        OutputMode::Human => {
            println!();
            print_directory_report(&report);
            print_verdict(&verdict);
            report_skipped(cli, &report.skipped);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "deploy",
                "dry_run": args.dry_run,
                "prune": prune_report,
                "critical": check,
                "build": build,
                "report": report,
                "verdict": verdict,
            });
            write_json_line(&payload)?;
        }
    }

    enforce_verdict(&verdict, args.no_fail)?;
    prune_exit(&prune_report)
}

// ---------------------------------------------------------------------------
// prepare: sizes, large files, build verdict, advice
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SizeLine {
    label: String,
    path: PathBuf,
    size_bytes: u64,
}

fn run_prepare(cli: &Cli, args: &PrepareArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, "prepare")?;
    let start = Instant::now();
    let options = session.walk_options()?;
    let config = session.config.clone();
    let root = config.scanner.root.clone();

    let public_dir = config.resolve(&config.scanner.public_dir);
    let measured = [
        ("project", root.clone()),
        ("source", config.resolve(&config.scanner.source_dir)),
        ("public", public_dir.clone()),
        ("dependencies", root.join(NODE_MODULES)),
    ];
    let mut skipped = Vec::new();
    let sizes: Vec<SizeLine> = measured
        .into_iter()
        .map(|(label, path)| {
            let scan = directory_size(&path, &options);
            skipped.extend(scan.skipped);
            SizeLine {
                label: label.to_string(),
                path,
                size_bytes: scan.value,
            }
        })
        .collect();
    let public_bytes = sizes.iter().find(|s| s.label == "public").map_or(0, |s| s.size_bytes);

    let threshold = args
        .threshold
        .unwrap_or(config.scanner.large_file_threshold_bytes);
    let mut large = find_large_files(&root, threshold, &options);
    sort_by_size_desc(&mut large.value);
    skipped.extend(large.skipped);
    let large_files = large.value;
    let project_bytes = sizes.first().map_or(0, |s| s.size_bytes);
    session.record_scan(
        "prepare",
        &root,
        large_files.len(),
        project_bytes,
        skipped.len(),
        start,
    );

    if session.mode == OutputMode::Human {
        println!("{}", "Project size".bold());
        for line in &sizes {
            println!("  {:<14} {:>12}", line.label, format_bytes(line.size_bytes));
        }
        println!("\n{} (> {})", "Large files".bold(), format_bytes(threshold));
        if large_files.is_empty() {
            println!("  {}", "None.".green());
        } else {
            print_file_table(&large_files, &root);
        }
    }

    let runner = session.build_runner()?;
    let output_dir = runner.output_dir().to_path_buf();
    let build = if output_dir.exists() {
        None
    } else {
        if session.mode == OutputMode::Human {
            println!("\n{} `{}`", "No build output; building:".bold(), runner.command_line());
        }
        Some(runner.run(&mut session.log)?)
    };

    let report = directory_report(&output_dir, &options);
    let verdict = session.policy(None)?.evaluate_report(&report);
    session.record_verdict(&verdict);

    let recs = recommendations(
        &AdviceInputs {
            public_dir_bytes: public_bytes,
            large_files: &large_files,
            build_verdict: Some(&verdict),
        },
        &config.advice,
    );
    let heavy = find_heavy_dependencies(
        &root.join("package.json"),
        &config.advice.heavy_dependency_patterns,
    )?;

    match session.mode {
        OutputMode::Human => {
            println!();
            print_verdict(&verdict);
            print_recommendations(&recs);
            print_heavy_dependencies(&heavy);
            report_skipped(cli, &skipped);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "prepare",
                "sizes": sizes,
                "large_file_threshold_bytes": threshold,
                "large_files": large_files,
                "build": build,
                "report": report,
                "verdict": verdict,
                "recommendations": recs,
                "heavy_dependencies": heavy,
                "skipped": skipped,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match Config::load(cli.config.as_deref()) {
            Ok(config) => {
                let hash = config.stable_hash()?;
                let source = config
                    .paths
                    .config_file
                    .as_deref()
                    .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("{}", "Configuration is valid.".green());
                        println!("  Source: {source}");
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "source": source,
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("{} {e}", "Configuration is INVALID:".red().bold());
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "code": e.code(),
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(CliError::User(format!("invalid config: {e}")))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// version
// ---------------------------------------------------------------------------

fn emit_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let version = env!("CARGO_PKG_VERSION");
    let package = env!("CARGO_PKG_NAME");
    let target = option_env!("TARGET").unwrap_or("unknown");
    let profile = option_env!("PROFILE").unwrap_or("unknown");
    let git_sha = option_env!("GIT_SHA").unwrap_or("unknown");

    match output_mode(cli) {
        OutputMode::Human => {
            println!("asset-audit {version}");
            if args.verbose {
                println!("package: {package}");
                println!("target: {target}");
                println!("profile: {profile}");
                println!("git_sha: {git_sha}");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "binary": "asset-audit",
                "version": version,
                "package": package,
                "build": {
                    "target": target,
                    "profile": profile,
                    "git_sha": git_sha,
                }
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Human output helpers
// ---------------------------------------------------------------------------

fn print_directory_report(report: &DirectoryReport) {
    println!(
        "{} {}: {}",
        "Size of".bold(),
        report.root.display(),
        format_bytes(report.total_bytes).bold()
    );
    for child in &report.children {
        println!("  {:<40} {:>12}", child.name, format_bytes(child.size_bytes));
    }
}

fn print_verdict(verdict: &Verdict) {
    if verdict.within_policy {
        println!("{} {}", "PASS".green().bold(), verdict.summary);
    } else {
        println!("{} {}", "FAIL".red().bold(), verdict.summary);
    }
}

fn print_file_table(files: &[FileEntry], base: &Path) {
    for file in files {
        println!(
            "  {:>12}  {}",
            format_bytes(file.size_bytes),
            display_relative(&file.path, base)
        );
    }
}

fn print_prune_report(report: &PruneReport, base: &Path) {
    let title = if report.dry_run {
        "Prune preview (dry run)"
    } else {
        "Prune"
    };
    println!("{}", title.bold());
    for item in &report.items {
        let path = display_relative(&item.path, base);
        match &item.outcome {
            PruneOutcome::Removed { bytes } => {
                println!("  {} {path} ({})", "removed".green(), format_bytes(*bytes));
            }
            PruneOutcome::WouldRemove { bytes } => {
                println!("  {} {path} ({})", "would remove".cyan(), format_bytes(*bytes));
            }
            PruneOutcome::NotFound => {
                println!("  {} {path}", "not found".yellow());
            }
            PruneOutcome::Failed { message, .. } => {
                println!("  {} {path}: {message}", "failed".red());
            }
        }
    }
    if report.dry_run {
        println!("  Reclaimable: {}", format_bytes(report.bytes_reclaimable));
    } else {
        println!("  Freed: {}", format_bytes(report.bytes_freed));
    }
}

fn print_critical_check(check: &CriticalCheck) {
    println!("{}", "Critical files".bold());
    for path in &check.present {
        println!("  {} {}", "ok".green(), path.display());
    }
    for path in &check.missing {
        println!("  {} {}", "MISSING".red().bold(), path.display());
    }
}

fn print_build_outcome(outcome: &BuildOutcome) {
    println!(
        "{} `{}` in {:.1}s",
        "Build succeeded:".green().bold(),
        outcome.command,
        outcome.duration.as_secs_f64()
    );
}

fn print_recommendations(recs: &[Recommendation]) {
    println!("\n{}", "Recommendations".bold());
    for rec in recs {
        match rec.level {
            AdviceLevel::Warning => println!("  {} {}", "!".yellow().bold(), rec.message),
            AdviceLevel::Info => println!("  - {}", rec.message),
        }
    }
}

fn print_heavy_dependencies(heavy: &[HeavyDependency]) {
    if heavy.is_empty() {
        return;
    }
    println!("\n{}", "Heavy dependencies".bold().yellow());
    for dep in heavy {
        println!(
            "  {} {} (consider alternatives or tree shaking)",
            dep.name, dep.version
        );
    }
}

/// Summarize skipped paths; list them in verbose mode.
fn report_skipped(cli: &Cli, skipped: &[SkippedPath]) {
    if skipped.is_empty() || cli.quiet {
        return;
    }
    if cli.verbose {
        for s in skipped {
            let detail = s.detail.as_deref().unwrap_or("");
            eprintln!("[AUD-SCAN] skipped {} ({:?}) {detail}", s.path.display(), s.reason);
        }
    } else {
        eprintln!(
            "{} {} paths could not be visited; results are partial (use -v for details)",
            "warning:".yellow(),
            skipped.len()
        );
    }
}

fn enforce_verdict(verdict: &Verdict, no_fail: bool) -> Result<(), CliError> {
    if verdict.within_policy || no_fail {
        Ok(())
    } else {
        Err(CliError::PolicyViolation(verdict.summary.clone()))
    }
}

fn note(cli: &Cli, message: &str) {
    if !cli.quiet {
        eprintln!("{} {message}", "note:".cyan());
    }
}

fn debug(cli: &Cli, component: &str, message: &str) {
    if cli.verbose {
        eprintln!("[AUD-{component}] {message}");
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("AUDIT_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
