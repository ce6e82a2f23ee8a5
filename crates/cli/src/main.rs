//! MergeTrend command-line tool.
//!
//! Provides subcommands for scanning a repository for historically conflicted
//! merges, replaying a single merge into a conflict time series, running a
//! resumable batch replay over many merges, and summarizing a previously
//! written trend file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use mergetrend_core::models::TrendRecord;
use mergetrend_core::{
    compute_all_trends, compute_trend, DiffyMerger, GitMergeFile, HistoryProvider, JsonFileSink,
    MergeToolKind, ReplayObserver, RunConfig, TextMerger, TrendError, TrendSink,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// MergeTrend command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "mergetrend",
    version,
    about = "Mine a git history for conflicted merges and chart how each conflict grew"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find all historically conflicted merge commits reachable from HEAD.
    Scan {
        /// Path to the git repository.
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Print the result as a JSON array instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Replay one merge commit and print its conflict time series.
    Trend {
        /// The merge commit to replay (hash or ref).
        commit: String,

        /// Path to the git repository.
        #[arg(short, long, default_value = ".")]
        repo: PathBuf,

        /// Text merge backend: git or diffy.
        #[arg(long, default_value = "git")]
        merge_tool: MergeToolKind,

        /// Print the full record as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Replay many merges in parallel and write the trend records to a file.
    Batch {
        /// Path to the git repository (overrides the config file).
        #[arg(short, long)]
        repo: Option<PathBuf>,

        /// File with one commit hash per line; scans the repository if absent.
        #[arg(long)]
        commits_file: Option<PathBuf>,

        /// Output path for the trend records (overrides the config file).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads; 0 means one per core (overrides the config file).
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Text merge backend: git or diffy (overrides the config file).
        #[arg(long)]
        merge_tool: Option<MergeToolKind>,

        /// Replay every commit even if already present in the output file.
        #[arg(long)]
        no_resume: bool,

        /// Path to a TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Summarize a previously written trend file.
    Summary {
        /// Path to the trend records file.
        #[arg(short, long, default_value = "trends.json")]
        input: PathBuf,

        /// Maximum number of merges to show.
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan { repo, json } => cmd_scan(&repo, json),
        Commands::Trend {
            commit,
            repo,
            merge_tool,
            json,
        } => cmd_trend(&repo, &commit, merge_tool, json),
        Commands::Batch {
            repo,
            commits_file,
            output,
            jobs,
            merge_tool,
            no_resume,
            config,
        } => cmd_batch(repo, commits_file, output, jobs, merge_tool, no_resume, config),
        Commands::Summary { input, limit } => cmd_summary(&input, limit),
    }
}

fn merger_for(kind: MergeToolKind) -> Box<dyn TextMerger> {
    match kind {
        MergeToolKind::Git => Box::new(GitMergeFile),
        MergeToolKind::Diffy => Box::new(DiffyMerger),
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Batch observer wired to an indicatif progress bar.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ReplayObserver for ProgressObserver {
    fn merge_completed(&self, commit: &str, steps: usize) {
        self.bar.set_message(format!("{} ({} steps)", short(commit), steps));
        self.bar.inc(1);
    }

    fn merge_failed(&self, commit: &str, error: &TrendError) {
        self.bar.println(format!("failed {}: {}", short(commit), error));
        self.bar.inc(1);
    }

    fn merge_skipped(&self, _commit: &str) {
        self.bar.inc(1);
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_scan(repo: &PathBuf, json: bool) -> Result<()> {
    let history = HistoryProvider::open(repo).context("failed to open repository")?;
    let merges = history
        .scan_conflicted_merges()
        .context("history scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&merges)?);
        return Ok(());
    }

    if merges.is_empty() {
        println!("No conflicted merges found.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["COMMIT", "SUMMARY"]);
    for merge in &merges {
        table.add_row(vec![merge.commit.clone(), merge.summary.clone()]);
    }
    println!("{table}");
    println!();
    println!("{} conflicted merge(s) found", merges.len());

    Ok(())
}

fn cmd_trend(repo: &PathBuf, commit: &str, merge_tool: MergeToolKind, json: bool) -> Result<()> {
    let merger = merger_for(merge_tool);
    let record = compute_trend(repo, commit, merger.as_ref())
        .map_err(|e| anyhow::anyhow!("replay of {} failed: {}", short(commit), e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Merge {}", record.commit);
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "TIME",
        "SIDE",
        "FILES",
        "LINES",
        "HUNKS",
        "COMMITS 1/2",
        "LOC 1/2",
        "AUTHORS",
    ]);
    for step in &record.steps {
        let side = match step.advanced {
            Some(side) => side.to_string(),
            None => "base".to_string(),
        };
        table.add_row(vec![
            step.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            side,
            step.conflict_files.to_string(),
            step.conflict_lines.to_string(),
            step.conflict_hunks.to_string(),
            format!("{}/{}", step.commits_branch1, step.commits_branch2),
            format!("{}/{}", step.loc_branch1, step.loc_branch2),
            step.authors_merge.to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_batch(
    repo: Option<PathBuf>,
    commits_file: Option<PathBuf>,
    output: Option<PathBuf>,
    jobs: Option<usize>,
    merge_tool: Option<MergeToolKind>,
    no_resume: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RunConfig::load(&path).context("failed to load configuration file")?,
        None => RunConfig::default(),
    };
    let repo = repo.unwrap_or(config.repository);
    let output = output.unwrap_or(config.output);
    let jobs = jobs.unwrap_or(config.jobs);
    let merge_tool = merge_tool.unwrap_or(config.merge_tool);
    let resume = !no_resume && config.resume;

    let hashes = match commits_file {
        Some(path) => read_commit_list(&path)?,
        None => {
            let history = HistoryProvider::open(&repo).context("failed to open repository")?;
            history
                .scan_conflicted_merges()
                .context("history scan failed")?
                .into_iter()
                .map(|m| m.commit)
                .collect()
        }
    };
    if hashes.is_empty() {
        println!("Nothing to replay.");
        return Ok(());
    }

    let sink = JsonFileSink::new(&output);
    let skip = if resume {
        sink.recorded_hashes()
            .context("failed to read existing output file")?
    } else {
        HashSet::new()
    };

    let merger = merger_for(merge_tool);
    let observer = ProgressObserver::new(hashes.len());

    let (records, summary) = match jobs {
        0 => compute_all_trends(&repo, &hashes, merger.as_ref(), &skip, &observer),
        n => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .context("failed to build worker pool")?
            .install(|| compute_all_trends(&repo, &hashes, merger.as_ref(), &skip, &observer)),
    };
    observer.finish();

    let mut all: Vec<TrendRecord> = if resume {
        sink.load_existing()
            .context("failed to reload existing output file")?
    } else {
        Vec::new()
    };
    all.extend(records);
    sink.write_all(&all).context("failed to write trend records")?;

    println!("Batch replay finished:");
    println!("  Completed : {}", summary.completed);
    println!("  Skipped   : {}", summary.skipped);
    println!("  Failed    : {}", summary.failed.len());
    println!("  Output    : {}", output.display());
    if !summary.failed.is_empty() {
        println!();
        println!("Failed merges:");
        for failure in &summary.failed {
            println!("  {}  {}", short(&failure.commit), failure.error);
        }
    }

    Ok(())
}

fn cmd_summary(input: &PathBuf, limit: usize) -> Result<()> {
    let sink = JsonFileSink::new(input);
    let records = sink
        .load_existing()
        .context("failed to read trend records")?;

    if records.is_empty() {
        println!("No trend records in {}.", input.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "COMMIT",
        "STEPS",
        "PEAK LINES",
        "FINAL FILES",
        "FINAL LINES",
        "FINAL HUNKS",
        "AUTHORS",
    ]);

    for record in records.iter().take(limit) {
        let peak_lines = record
            .steps
            .iter()
            .map(|s| s.conflict_lines)
            .max()
            .unwrap_or(0);
        let last = record.steps.last();
        table.add_row(vec![
            short(&record.commit).to_string(),
            record.steps.len().to_string(),
            peak_lines.to_string(),
            last.map_or(0, |s| s.conflict_files).to_string(),
            last.map_or(0, |s| s.conflict_lines).to_string(),
            last.map_or(0, |s| s.conflict_hunks).to_string(),
            last.map_or(0, |s| s.authors_merge).to_string(),
        ]);
    }
    println!("{table}");
    println!();
    println!("{} of {} merge(s) shown", records.len().min(limit), records.len());

    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

/// Read a commit list file: one hash per line, blank lines and `#` comments
/// ignored.
fn read_commit_list(path: &PathBuf) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read commit list {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
