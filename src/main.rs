//! lookalike - find duplicate files and visually similar images.
//!
//! Usage:
//!   lookalike [PATHS]...                     Report duplicates and similar images
//!   lookalike --to-file results.json PATH    Save the results for a later run
//!   lookalike --from-file results.json ...   Act on saved results without rescanning
//!   lookalike --delete-dupes-in DIR PATH     Drop duplicates stored under DIR
//!   lookalike --delete-prompt PATH           Choose which copy to keep
//!   lookalike --help                         Show help
//!
//! Nothing is removed unless `--force` is given.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lookalike_core::Snapshot;
use lookalike_engine::{Engine, EngineConfig, EngineReport};
use lookalike_ops::{
    Decision, KeepChoice, KeepChooser, OperationComplete, RemovalMode, RetentionPolicy,
    remove_files,
};
use lookalike_scan::{FileWalker, ScanConfig};

#[derive(Parser)]
#[command(
    name = "lookalike",
    version,
    about = "Find duplicate files and visually similar images",
    long_about = "lookalike finds byte-identical files across one or more directory \
                  trees, and groups images that look alike.\n\n\
                  Without --force, deletions and moves are only listed."
)]
struct Cli {
    /// Directories to search (defaults to current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Load results from <FILE> instead of scanning
    #[arg(long, value_name = "FILE")]
    from_file: Option<PathBuf>,

    /// Save results to <FILE>
    #[arg(long, value_name = "FILE")]
    to_file: Option<PathBuf>,

    /// Delete duplicates if they are contained in <PATH>
    #[arg(long, value_name = "PATH", conflicts_with = "delete_prompt")]
    delete_dupes_in: Option<PathBuf>,

    /// Ask which file to keep for each duplicate set
    #[arg(long)]
    delete_prompt: bool,

    /// Move files to <PATH> instead of deleting them
    #[arg(long, value_name = "PATH")]
    move_files: Option<PathBuf>,

    /// Minimum file size to consider (e.g., "1", "4KB", "1MB")
    #[arg(long, default_value = "1")]
    min_size: String,

    /// Actually delete or move files. Without this, they are only printed
    #[arg(long)]
    force: bool,

    /// Output additional information
    #[arg(short, long)]
    verbose: bool,

    /// Maximum perceptual hash distance for similar images
    #[arg(long, default_value_t = lookalike_core::DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: u32,

    /// Worker threads per hashing pool (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Skip the similar image search
    #[arg(long)]
    no_images: bool,

    /// Glob of files or directories to skip (repeatable)
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_symlinks: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, Serialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Settings resolved once from the command line.
#[derive(Debug, Serialize)]
struct AppConfig {
    from_file: Option<PathBuf>,
    to_file: Option<PathBuf>,
    delete_dupes_in: Option<PathBuf>,
    delete_prompt: bool,
    move_files: Option<PathBuf>,
    force: bool,
    verbose: bool,
    format: OutputFormat,
    scan: ScanConfig,
    engine: EngineConfig,
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self> {
        let scan = ScanConfig::builder()
            .roots(cli.paths)
            .min_size(parse_size(&cli.min_size)?)
            .follow_symlinks(cli.follow_symlinks)
            .ignore_patterns(cli.ignore)
            .threads(cli.threads)
            .build()
            .wrap_err("Invalid scan options")?;

        let engine = EngineConfig::builder()
            .hash_workers(cli.threads)
            .image_workers(cli.threads)
            .similarity_threshold(cli.threshold)
            .detect_images(!cli.no_images)
            .build()
            .wrap_err("Invalid engine options")?;

        Ok(Self {
            from_file: cli.from_file,
            to_file: cli.to_file,
            delete_dupes_in: cli.delete_dupes_in,
            delete_prompt: cli.delete_prompt,
            move_files: cli.move_files,
            force: cli.force,
            verbose: cli.verbose,
            format: cli.format,
            scan,
            engine,
        })
    }

    fn retention(&self) -> RetentionPolicy {
        match (&self.delete_dupes_in, self.delete_prompt) {
            (Some(prefix), _) => RetentionPolicy::DeleteIn(prefix.clone()),
            (None, true) => RetentionPolicy::Prompt,
            (None, false) => RetentionPolicy::ReportOnly,
        }
    }

    fn removal(&self) -> RemovalMode {
        match (&self.move_files, self.force) {
            (_, false) => RemovalMode::DryRun,
            (Some(dir), true) => RemovalMode::MoveTo(dir.clone()),
            (None, true) => RemovalMode::Delete,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::from_cli(cli)?;
    if config.verbose {
        eprintln!("{}", serde_json::to_string_pretty(&config)?);
    }

    let report = match &config.from_file {
        Some(path) => {
            eprintln!("Loading file {}", path.display());
            let snapshot = Snapshot::load(path).wrap_err("Could not load results file")?;
            EngineReport::from_groups(snapshot.groups)
        }
        None => {
            let report = run_scan(&config)?;
            if let Some(path) = &config.to_file {
                Snapshot::new(report.groups.clone())
                    .save(path)
                    .wrap_err("Could not save results file")?;
                eprintln!("Saved results to {}", path.display());
            }
            report
        }
    };

    match config.retention() {
        RetentionPolicy::ReportOnly => print_report(&report, config.format)?,
        policy => apply_retention(&report, &policy, &config)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Walk the configured roots and run the engine, with a live spinner.
fn run_scan(config: &AppConfig) -> Result<EngineReport> {
    let walker = FileWalker::new(config.scan.clone()).wrap_err("Invalid scan options")?;
    let walk = walker.walk().wrap_err("Invalid path")?;
    let engine = Engine::new(config.engine.clone()).wrap_err("Could not start engine")?;
    let counters = engine.counters();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning…");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let done = AtomicBool::new(false);
    let result = std::thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                let progress = counters.snapshot();
                spinner.set_message(format!(
                    "{} files seen, {} hashed ({}), {} images",
                    progress.files_observed,
                    progress.files_hashed,
                    format_size(progress.bytes_hashed),
                    progress.images_hashed,
                ));
                std::thread::sleep(Duration::from_millis(100));
            }
        });
        let result = engine.run(walk);
        done.store(true, Ordering::Release);
        result
    });

    let report = result.wrap_err("Scan failed")?;
    spinner.finish_with_message(format!(
        "Scanned {} files in {:.2}s",
        report.progress.files_observed,
        report.progress.elapsed.as_secs_f64()
    ));

    let warnings = walker.warnings();
    if !warnings.is_empty() {
        eprintln!("{} warning(s) during scan", warnings.len());
    }
    if report.progress.errors > 0 {
        eprintln!("{} file(s) could not be hashed", report.progress.errors);
    }

    Ok(report)
}

fn print_report(report: &EngineReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let duplicates = &report.duplicates;
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate File Report");
            println!("{}", "─".repeat(70));
            println!();

            if duplicates.groups.is_empty() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    duplicates.group_count, duplicates.files_with_duplicates
                );
                println!(
                    " Total wasted space: {}",
                    format_size(duplicates.total_wasted_space)
                );
                println!();

                for (i, group) in duplicates.groups.iter().enumerate() {
                    println!(
                        " Group {} ({} files, {} each, {} wasted)",
                        i + 1,
                        group.count(),
                        format_size(group.size),
                        format_size(group.wasted_bytes)
                    );
                    for path in &group.paths {
                        println!("   {}", path.display());
                    }
                    println!();
                }
            }

            if !report.clusters.is_empty() {
                println!("{}", "─".repeat(70));
                println!(" Similar Images ({} analyzed)", report.images_analyzed);
                println!("{}", "─".repeat(70));
                println!();

                for (i, cluster) in report.clusters.iter().enumerate() {
                    println!(" Cluster {} ({} images)", i + 1, cluster.len());
                    for member in &cluster.members {
                        if member.distance == 0 {
                            println!("   {}", member.path.display());
                        } else {
                            println!("   {} (distance {})", member.path.display(), member.distance);
                        }
                    }
                    println!();
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }

    Ok(())
}

/// Walk every finding through the retention policy and remove what it selects.
fn apply_retention(report: &EngineReport, policy: &RetentionPolicy, config: &AppConfig) -> Result<()> {
    if !report.has_findings() {
        eprintln!("No duplicates found.");
        return Ok(());
    }

    let mode = config.removal();
    let mut chooser = TerminalChooser;
    let mut total = OperationComplete::new(mode.operation_type());

    // Prefix deletion only trusts byte-identical content.
    let mut findings: Vec<Vec<PathBuf>> = report
        .duplicates
        .groups
        .iter()
        .map(|group| group.paths.clone())
        .collect();
    if matches!(policy, RetentionPolicy::Prompt) {
        findings.extend(report.clusters.iter().map(|cluster| cluster.paths()));
    }

    for members in findings {
        match policy.decide(&members, &mut chooser) {
            Decision::Keep => {}
            Decision::Invalid => println!("Invalid input"),
            Decision::Remove(victims) => {
                if mode == RemovalMode::DryRun {
                    for victim in &victims {
                        println!("Would delete {}", victim.display());
                    }
                }
                total.merge(remove_files(&victims, &mode));
            }
        }
    }

    eprintln!("{} ({})", total.summary(), format_size(total.bytes_processed));
    if mode == RemovalMode::DryRun && total.succeeded > 0 {
        eprintln!("Run again with --force to apply.");
    }
    if !total.is_success() {
        bail!("{} file(s) could not be removed", total.failed);
    }

    Ok(())
}

/// Asks on the terminal which member of a finding to keep.
struct TerminalChooser;

impl KeepChooser for TerminalChooser {
    fn choose(&mut self, members: &[PathBuf]) -> KeepChoice {
        let mut items = vec!["Keep all".to_string()];
        items.extend(members.iter().map(|path| path.display().to_string()));

        match Select::new()
            .with_prompt("Which file to keep?")
            .items(&items)
            .default(0)
            .interact_opt()
        {
            Ok(Some(0)) => KeepChoice::KeepAll,
            Ok(Some(index)) => KeepChoice::Keep(index - 1),
            Ok(None) => KeepChoice::Invalid,
            Err(err) => {
                tracing::warn!("prompt failed: {err}");
                KeepChoice::Invalid
            }
        }
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Parse a size string (e.g., "100", "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();

    let (digits, multiplier) = if let Some(rest) = s.strip_suffix("GB").or(s.strip_suffix('G')) {
        (rest, 1024 * 1024 * 1024)
    } else if let Some(rest) = s.strip_suffix("MB").or(s.strip_suffix('M')) {
        (rest, 1024 * 1024)
    } else if let Some(rest) = s.strip_suffix("KB").or(s.strip_suffix('K')) {
        (rest, 1024)
    } else if let Some(rest) = s.strip_suffix('B') {
        (rest, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: f64 = digits
        .trim()
        .parse()
        .wrap_err_with(|| format!("Invalid size {s:?}"))?;
    if num < 0.0 {
        bail!("Size cannot be negative: {s:?}");
    }

    Ok((num * multiplier as f64) as u64)
}
