//! CLI definition, run dispatch, and tracing setup.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use valuelist_core::{ProgressReporter, RunConfig, RunReport};
use valuelist_fetcher::{FilePageSource, HttpPageSource, PageSource};
use valuelist_shared::resolve_config;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// valuelist: wiki value list → numbered spreadsheet.
#[derive(Parser, Debug)]
#[command(
    name = "valuelist",
    version,
    about = "Scrape the value list page into a numbered .xlsx workbook.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./valuelist.toml, then ~/.valuelist/valuelist.toml).
    #[arg(long, env = "VALUELIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read the page from a saved HTML file instead of the network.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber based on CLI flags.
///
/// `RUST_LOG` takes precedence over `-v`.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "valuelist=info",
        1 => "valuelist=debug",
        _ => "valuelist=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Resolve config, pick the page source, and run the scrape once.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let app_config = resolve_config(cli.config.as_deref())?;
    let config = RunConfig::try_from(&app_config)?;

    info!(
        url = %config.source_url,
        output_dir = ?config.export.output_dir,
        input = ?cli.input,
        "configuration loaded"
    );

    let report = match &cli.input {
        Some(path) => scrape(&config, &FilePageSource::new(path)).await,
        None => {
            let source = HttpPageSource::new(&config.fetch)?;
            scrape(&config, &source).await
        }
    }
    .wrap_err("scrape failed; no output written")?;

    print_summary(&report);
    Ok(())
}

async fn scrape<S: PageSource>(config: &RunConfig, source: &S) -> Result<RunReport> {
    let reporter = CliProgress::new();
    let result = valuelist_core::run(config, source, &reporter).await;
    if result.is_err() {
        reporter.spinner.abandon_with_message("failed");
    }
    Ok(result?)
}

fn print_summary(report: &RunReport) {
    if !report.stats.unknown_keys.is_empty() {
        warn!(keys = ?report.stats.unknown_keys, "columns kept under their raw header");
    }

    println!();
    println!("  Value list exported");
    println!("  File:       {}", report.output_path.display());
    println!("  Records:    {}", report.records);
    println!("  Sections:   {}", report.sections);
    println!("  Sheets:     {}", report.sheets.join(", "));
    println!(
        "  Skipped:    {} rows, {} tables, {} duplicates",
        report.stats.rows_skipped, report.stats.tables_skipped, report.stats.duplicates_removed
    );
    if let Some(snapshot) = &report.snapshot {
        println!("  Snapshot:   {}", snapshot.display());
    }
    println!("  Run:        {}", report.run_id);
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner on stderr; hidden automatically when stderr is not a terminal.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn tables_found(&self, tables: usize, rows: usize) {
        self.spinner
            .set_message(format!("Cleaning {rows} rows from {tables} tables"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}
