//! HTML table extraction.
//!
//! Turns a value-list page into ordered [`RawTable`]s, each tagged with the
//! section it appeared under: the enclosing tab (`data-subtab`) when the page
//! uses tabbed content, otherwise the nearest preceding heading.

mod table;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

use valuelist_shared::{PipelineConfig, RawTable, Result, ValueListError, section_matches};

use table::{cell_text, is_nested, parse_table};

/// Tables found on a page plus what was thrown away on the way.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub tables: Vec<RawTable>,
    /// Tables dropped for having too few rows or an unwanted section.
    pub tables_skipped: usize,
    /// Malformed data rows dropped inside kept tables.
    pub rows_skipped: usize,
}

impl Extraction {
    /// Data rows across all kept tables.
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

/// Extract every table matching the configured selector.
#[instrument(skip_all, fields(selector = %config.table_selector))]
pub fn extract_tables(html: &str, config: &PipelineConfig) -> Result<Extraction> {
    let table_sel = Selector::parse(&config.table_selector).map_err(|e| {
        ValueListError::config(format!(
            "invalid table selector '{}': {e}",
            config.table_selector
        ))
    })?;
    let walk_sel = Selector::parse("h1, h2, h3, h4, table").expect("static selector");

    let doc = Html::parse_document(html);
    let wanted: HashSet<_> = doc.select(&table_sel).map(|t| t.id()).collect();

    let mut extraction = Extraction::default();
    let mut heading: Option<String> = None;
    let mut index = 0usize;

    // Document order: headings update the running label, tables consume it.
    for el in doc.select(&walk_sel) {
        if el.value().name() != "table" {
            if !is_nested(el) {
                heading = heading_text(el).or(heading);
            }
            continue;
        }
        if !wanted.contains(&el.id()) || is_nested(el) {
            continue;
        }

        let position = index;
        index += 1;

        let section = tab_label(el)
            .or_else(|| heading.clone())
            .unwrap_or_else(|| format!("Table {}", position + 1));

        if !config.sections.is_empty()
            && !config.sections.iter().any(|s| section_matches(s, &section))
        {
            debug!(%section, position, "section not selected, skipping table");
            extraction.tables_skipped += 1;
            continue;
        }

        let parsed = parse_table(el);
        if parsed.total_rows < config.min_rows.max(1) || parsed.rows.is_empty() {
            debug!(%section, position, rows = parsed.total_rows, "too few rows, skipping table");
            extraction.tables_skipped += 1;
            continue;
        }

        debug!(%section, position, rows = parsed.rows.len(), "table extracted");
        extraction.rows_skipped += parsed.rows_skipped;
        extraction.tables.push(RawTable {
            section,
            index: position,
            headers: parsed.headers,
            rows: parsed.rows,
        });
    }

    info!(
        tables = extraction.tables.len(),
        rows = extraction.row_count(),
        tables_skipped = extraction.tables_skipped,
        rows_skipped = extraction.rows_skipped,
        "extraction complete"
    );

    Ok(extraction)
}

/// Label of the closest enclosing tab panel, if any.
fn tab_label(el: ElementRef<'_>) -> Option<String> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|a| a.value().attr("data-subtab"))
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
}

/// Heading text without wiki `[edit]` links.
fn heading_text(el: ElementRef<'_>) -> Option<String> {
    static EDIT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\[\s*edit(?:\s+source)?\s*\]").expect("valid regex"));
    static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let headline_sel = Selector::parse(".mw-headline").expect("static selector");
    let raw = match el.select(&headline_sel).next() {
        Some(headline) => cell_text(headline),
        None => cell_text(el),
    };

    let text = EDIT_RE.replace_all(&raw, "");
    let text = SPACE_RE.replace_all(text.trim(), " ").to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABBED: &str = r#"<html><body>
        <h2><span class="mw-headline" id="Values">Values</span><span class="mw-editsection">[edit]</span></h2>
        <div class="cfx-tab cfx-tab-content" data-subtab="Game Pass">
          <table class="wikitable">
            <tr><th>name</th><th>value</th></tr>
            <tr><td>2x Speed</td><td>100</td></tr>
          </table>
        </div>
        <div class="cfx-tab cfx-tab-content" data-subtab="S Tier">
          <table class="wikitable">
            <tr><th>f</th><th>name</th></tr>
            <tr><td>Legendary</td><td>Shiny Shiny</td></tr>
            <tr><td>Rare</td><td>Bob</td></tr>
          </table>
        </div>
    </body></html>"#;

    const HEADINGS: &str = r#"<html><body>
        <table><tr><th>intro</th></tr><tr><td>before any heading</td></tr></table>
        <h2><span class="mw-headline" id="Skins">Skins</span><span class="mw-editsection">[edit]</span></h2>
        <table class="wikitable"><tr><th>name</th></tr><tr><td>Red</td></tr></table>
        <h3>Relics [edit source]</h3>
        <table class="wikitable"><tr><th>name</th></tr><tr><td>Orb</td></tr></table>
        <table class="wikitable"><tr><th>only header</th></tr></table>
    </body></html>"#;

    #[test]
    fn tabbed_page_labels_by_tab() {
        let out = extract_tables(TABBED, &PipelineConfig::default()).unwrap();
        let sections: Vec<&str> = out.tables.iter().map(|t| t.section.as_str()).collect();
        assert_eq!(sections, vec!["Game Pass", "S Tier"]);
        assert_eq!(out.tables[1].headers, vec!["f", "name"]);
        assert_eq!(out.tables[1].rows[0], vec!["Legendary", "Shiny Shiny"]);
        assert_eq!(out.row_count(), 3);
    }

    #[test]
    fn heading_page_labels_by_heading() {
        let out = extract_tables(HEADINGS, &PipelineConfig::default()).unwrap();
        let sections: Vec<&str> = out.tables.iter().map(|t| t.section.as_str()).collect();
        assert_eq!(sections, vec!["Table 1", "Skins", "Relics"]);
        // The header-only table is dropped.
        assert_eq!(out.tables_skipped, 1);
        assert_eq!(out.tables[2].index, 2);
    }

    #[test]
    fn section_filter_accepts_anchor_spelling() {
        let config = PipelineConfig {
            sections: vec!["S_Tier".into()],
            ..PipelineConfig::default()
        };
        let out = extract_tables(TABBED, &config).unwrap();
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].section, "S Tier");
        assert_eq!(out.tables_skipped, 1);
    }

    #[test]
    fn custom_table_selector() {
        let config = PipelineConfig {
            table_selector: "table.wikitable".into(),
            ..PipelineConfig::default()
        };
        let out = extract_tables(HEADINGS, &config).unwrap();
        assert_eq!(out.tables.len(), 2);
        assert_eq!(out.tables[0].section, "Skins");
    }

    #[test]
    fn page_without_tables_is_empty() {
        let out = extract_tables("<html><body><p>Loading</p></body></html>", &PipelineConfig::default())
            .unwrap();
        assert!(out.tables.is_empty());
    }

    #[test]
    fn invalid_selector_is_config_error() {
        let config = PipelineConfig {
            table_selector: "table[".into(),
            ..PipelineConfig::default()
        };
        let err = extract_tables(TABBED, &config).unwrap_err();
        assert!(matches!(err, ValueListError::Config { .. }));
    }
}
