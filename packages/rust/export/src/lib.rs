//! Spreadsheet export for cleaned value-list records.
//!
//! Writes one `.xlsx` workbook per run into the output directory, named
//! `<stem>_<n>.xlsx` with `n` one past the highest existing number. Existing
//! files are never overwritten.

mod naming;

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{info, instrument, warn};

use valuelist_shared::{ExportConfig, Record, Result, ValueListError};

use naming::{SheetNames, claim_next_file};

pub use naming::next_numbered_path;

/// Column holding each record's section label.
pub const SECTION_COLUMN: &str = "Section";

/// Name of the combined worksheet.
const VALUES_SHEET: &str = "Values";

/// Name of the run metadata worksheet.
const INFO_SHEET: &str = "Info";

/// What a finished export wrote.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Path of the new workbook.
    pub path: PathBuf,
    /// Data rows on the combined sheet.
    pub records: usize,
    /// Field columns (excluding the section column), in sheet order.
    pub columns: Vec<String>,
    /// Worksheet names in workbook order.
    pub sheets: Vec<String>,
}

/// Union of all field names, in first-seen order.
pub fn column_union(records: &[Record]) -> Vec<String> {
    union_of(records)
}

fn union_of<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in records.into_iter().flat_map(Record::keys) {
        if !columns.iter().any(|c| c == key) {
            columns.push(key.to_string());
        }
    }
    columns
}

/// Records grouped by section, groups in first-seen order.
fn group_by_section(records: &[Record]) -> Vec<(&str, Vec<&Record>)> {
    let mut groups: Vec<(&str, Vec<&Record>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(s, _)| *s == record.section) {
            Some((_, group)) => group.push(record),
            None => groups.push((record.section.as_str(), vec![record])),
        }
    }
    groups
}

/// Write `records` to the next numbered workbook under `config.output_dir`.
#[instrument(skip_all, fields(dir = ?config.output_dir, stem = %config.file_stem))]
pub fn export_records(
    records: &[Record],
    config: &ExportConfig,
    run_id: &str,
) -> Result<ExportSummary> {
    if records.is_empty() {
        return Err(ValueListError::export("no records to export"));
    }

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| ValueListError::io(&config.output_dir, e))?;

    let columns = column_union(records);
    let (mut workbook, sheets) = build_workbook(records, &columns, config, run_id)
        .map_err(|e| ValueListError::export(format!("failed to build workbook: {e}")))?;

    let (path, file) = claim_next_file(&config.output_dir, &config.file_stem, "xlsx")?;
    if let Err(e) = workbook.save_to_writer(file) {
        // Leave no half-written workbook behind under a claimed number.
        if let Err(rm) = std::fs::remove_file(&path) {
            warn!(?path, error = %rm, "failed to remove partial workbook");
        }
        return Err(ValueListError::export(format!(
            "failed to write {}: {e}",
            path.display()
        )));
    }

    info!(
        ?path,
        records = records.len(),
        columns = columns.len(),
        sheets = sheets.len(),
        "workbook written"
    );

    Ok(ExportSummary {
        path,
        records: records.len(),
        columns,
        sheets,
    })
}

fn build_workbook(
    records: &[Record],
    columns: &[String],
    config: &ExportConfig,
    run_id: &str,
) -> std::result::Result<(Workbook, Vec<String>), XlsxError> {
    let mut workbook = Workbook::new();
    let header_fmt = Format::new().set_bold();
    let mut names = SheetNames::default();
    names.reserve(VALUES_SHEET);
    names.reserve(INFO_SHEET);
    let mut sheets = Vec::new();

    // Combined sheet: every record, section column first.
    let all: Vec<&Record> = records.iter().collect();
    let sheet = workbook.add_worksheet();
    sheet.set_name(VALUES_SHEET)?;
    write_records(sheet, columns, &all, true, &header_fmt)?;
    sheets.push(VALUES_SHEET.to_string());

    let groups = group_by_section(records);

    if config.sheet_per_section {
        for (section, group) in &groups {
            let group_columns = union_of(group.iter().copied());
            let name = names.claim(section);

            let sheet = workbook.add_worksheet();
            sheet.set_name(&name)?;
            write_records(sheet, &group_columns, group, false, &header_fmt)?;
            sheets.push(name);
        }
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name(INFO_SHEET)?;
    let scraped_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let info_rows = [
        ("Source", config.source_url.clone()),
        ("Scraped at", scraped_at),
        ("Records", records.len().to_string()),
        ("Sections", groups.len().to_string()),
        ("Run id", run_id.to_string()),
    ];
    for (row, (label, value)) in (0u32..).zip(info_rows.iter()) {
        sheet.write_string_with_format(row, 0, *label, &header_fmt)?;
        sheet.write_string(row, 1, value)?;
    }
    sheet.autofit();
    sheets.push(INFO_SHEET.to_string());

    Ok((workbook, sheets))
}

/// Header row plus one row per record; absent fields stay blank.
fn write_records(
    sheet: &mut Worksheet,
    columns: &[String],
    records: &[&Record],
    with_section: bool,
    header_fmt: &Format,
) -> std::result::Result<(), XlsxError> {
    let offset: u16 = if with_section { 1 } else { 0 };

    if with_section {
        sheet.write_string_with_format(0, 0, SECTION_COLUMN, header_fmt)?;
    }
    for (col, name) in (offset..).zip(columns) {
        sheet.write_string_with_format(0, col, name, header_fmt)?;
    }

    for (row, record) in (1u32..).zip(records) {
        if with_section {
            sheet.write_string(row, 0, &record.section)?;
        }
        for (col, name) in (offset..).zip(columns) {
            let Some(value) = record.get(name) else { continue };
            match plain_number(value) {
                Some(n) => sheet.write_number(row, col, n)?,
                None => sheet.write_string(row, col, value)?,
            };
        }
    }

    let last_col = (offset as usize + columns.len()).saturating_sub(1) as u16;
    sheet.set_freeze_panes(1, 0)?;
    sheet.autofilter(0, 0, records.len() as u32, last_col)?;
    sheet.autofit();
    Ok(())
}

/// Parse values that are plain decimal numbers ("12", "-3.5").
///
/// Anything with grouping, units or leading zeros stays text so the sheet
/// shows exactly what the page showed.
fn plain_number(value: &str) -> Option<f64> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let plain = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1
        && !digits.starts_with('.')
        && !digits.ends_with('.')
        && !(digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0."));
    if plain { value.parse().ok() } else { None }
}
