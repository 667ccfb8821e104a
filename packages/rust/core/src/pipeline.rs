//! End-to-end scrape: page → tables → records → workbook.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use valuelist_export::export_records;
use valuelist_extract::extract_tables;
use valuelist_fetcher::{PageSource, fetch_ready_page, save_snapshot};
use valuelist_shared::{
    AppConfig, ExportConfig, FetchConfig, PipelineConfig, Record, Result, ValueListError,
};

use crate::categorize::Categorizer;
use crate::dedup::dedup;
use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

/// Everything one run needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source_url: Url,
    pub fetch: FetchConfig,
    pub pipeline: PipelineConfig,
    pub export: ExportConfig,
}

impl TryFrom<&AppConfig> for RunConfig {
    type Error = ValueListError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source_url: config.source_url()?,
            fetch: FetchConfig::from(config),
            pipeline: PipelineConfig::from(config),
            export: ExportConfig::from(config),
        })
    }
}

/// Counts collected while turning HTML into records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Tables kept by the extractor.
    pub tables: usize,
    /// Data rows in the kept tables.
    pub rows_extracted: usize,
    /// Rows dropped as malformed or empty.
    pub rows_skipped: usize,
    /// Tables dropped by section filter or minimum size.
    pub tables_skipped: usize,
    pub duplicates_removed: usize,
    /// Header keys with no alias, kept verbatim.
    pub unknown_keys: Vec<String>,
}

/// Cleaned records plus stage counts.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub records: Vec<Record>,
    pub stats: StageStats,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    /// The workbook written by this run.
    pub output_path: PathBuf,
    pub records: usize,
    pub sections: usize,
    pub sheets: Vec<String>,
    pub stats: StageStats,
    /// Page snapshot kept on success, when enabled.
    pub snapshot: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the page has been split into tables.
    fn tables_found(&self, tables: usize, rows: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn tables_found(&self, _tables: usize, _rows: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// HTML → records
// ---------------------------------------------------------------------------

/// Extract, normalize, categorize and deduplicate the tables in `html`.
///
/// A page that yields no tables or no records is a parse error.
#[instrument(skip_all, fields(bytes = html.len()))]
pub fn process_html(html: &str, config: &PipelineConfig) -> Result<ProcessOutput> {
    let extraction = extract_tables(html, config)?;
    if extraction.tables.is_empty() {
        return Err(ValueListError::parse(format!(
            "no data tables found ({} skipped)",
            extraction.tables_skipped
        )));
    }

    let mut stats = StageStats {
        tables: extraction.tables.len(),
        rows_extracted: extraction.row_count(),
        rows_skipped: extraction.rows_skipped,
        tables_skipped: extraction.tables_skipped,
        ..StageStats::default()
    };

    let mut categorizer = Categorizer::new(&config.aliases);
    let mut records = Vec::with_capacity(stats.rows_extracted);

    for table in &extraction.tables {
        let section = match normalize(&table.section) {
            s if s.is_empty() => format!("Table {}", table.index + 1),
            s => s,
        };
        let headers: Vec<String> = table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| match normalize(h) {
                h if h.is_empty() => format!("column_{}", i + 1),
                h => h,
            })
            .collect();

        for row in &table.rows {
            let cells: Vec<(String, String)> = headers
                .iter()
                .cloned()
                .zip(row.iter().map(|cell| normalize(cell)))
                .collect();

            if cells.iter().all(|(_, v)| v.is_empty()) {
                warn!(%section, "row empty after cleanup, skipping");
                stats.rows_skipped += 1;
                continue;
            }

            records.push(categorizer.categorize(&section, &cells));
        }
    }

    let (records, removed) = dedup(records);
    stats.duplicates_removed = removed;
    stats.unknown_keys = categorizer.unknown_keys();

    if records.is_empty() {
        return Err(ValueListError::parse("tables contained no usable rows"));
    }

    info!(
        tables = stats.tables,
        records = records.len(),
        rows_skipped = stats.rows_skipped,
        duplicates = stats.duplicates_removed,
        unknown_keys = stats.unknown_keys.len(),
        "records ready"
    );

    Ok(ProcessOutput { records, stats })
}

// ---------------------------------------------------------------------------
// Full run
// ---------------------------------------------------------------------------

/// Run the full scrape.
///
/// 1. Fetch the page, waiting until its tables render
/// 2. Extract and clean records
/// 3. Write the next numbered workbook
///
/// Any failure ends the run without output. Fetch and parse failures leave
/// the last page body in the snapshot directory.
#[instrument(skip_all, fields(run_id = tracing::field::Empty, url = %config.source_url))]
pub async fn run<S>(
    config: &RunConfig,
    source: &S,
    progress: &dyn ProgressReporter,
) -> Result<RunReport>
where
    S: PageSource,
{
    let start = Instant::now();
    let run_id = Uuid::now_v7().to_string();
    tracing::Span::current().record("run_id", run_id.as_str());

    info!(source = source.name(), "starting scrape");

    // --- Phase 1: Fetch ---
    progress.phase("Waiting for value tables");
    let html = match fetch_ready_page(source, &config.source_url, &config.fetch).await {
        Ok(html) => html,
        Err(e) => {
            if let Some(body) = e.snapshot() {
                keep_snapshot(&config.fetch, &run_id, "failed", body);
            }
            return Err(e);
        }
    };

    let snapshot = if config.fetch.snapshot_on_success {
        keep_snapshot(&config.fetch, &run_id, "fetched", &html)
    } else {
        None
    };

    // --- Phase 2: Process ---
    progress.phase("Extracting tables");
    let output = match process_html(&html, &config.pipeline) {
        Ok(output) => output,
        Err(e) => {
            keep_snapshot(&config.fetch, &run_id, "unparsed", &html);
            return Err(e);
        }
    };
    progress.tables_found(output.stats.tables, output.stats.rows_extracted);

    // --- Phase 3: Export ---
    progress.phase("Writing workbook");
    let summary = export_records(&output.records, &config.export, &run_id)?;

    let sections = {
        let mut seen: Vec<&str> = Vec::new();
        for record in &output.records {
            if !seen.contains(&record.section.as_str()) {
                seen.push(&record.section);
            }
        }
        seen.len()
    };

    let report = RunReport {
        run_id,
        output_path: summary.path,
        records: summary.records,
        sections,
        sheets: summary.sheets,
        stats: output.stats,
        snapshot,
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        path = ?report.output_path,
        records = report.records,
        sections = report.sections,
        elapsed_ms = report.elapsed.as_millis(),
        "scrape complete"
    );

    Ok(report)
}

/// Save a page snapshot; a failed save is logged, not raised.
fn keep_snapshot(config: &FetchConfig, run_id: &str, label: &str, html: &str) -> Option<PathBuf> {
    match save_snapshot(&config.snapshot_dir, run_id, label, html) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(error = %e, label, "could not save page snapshot");
            None
        }
    }
}
