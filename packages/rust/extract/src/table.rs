//! Row and cell reading for a single `<table>`.

use scraper::{ElementRef, Node, Selector};
use tracing::{debug, warn};

/// Upper bound for `colspan`, guarding against malformed markup.
const MAX_COLSPAN: usize = 64;

/// Header and data rows read from one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Data rows dropped as malformed.
    pub rows_skipped: usize,
    /// Rows seen in total, header included.
    pub total_rows: usize,
}

/// Read `table` into a header row plus padded data rows.
///
/// Rows of nested tables are ignored. The first non-empty row is the header.
pub(crate) fn parse_table(table: ElementRef<'_>) -> ParsedTable {
    let tr_sel = Selector::parse("tr").expect("static selector");

    let mut raw_rows = table
        .select(&tr_sel)
        .filter(|tr| nearest_table_is(*tr, table))
        .map(row_cells)
        .filter(|cells| !cells.is_empty());

    let Some(header_cells) = raw_rows.next() else {
        return ParsedTable::default();
    };

    let headers = unique_headers(&header_cells);
    let width = headers.len();
    let mut parsed = ParsedTable {
        headers,
        total_rows: 1,
        ..ParsedTable::default()
    };

    for mut cells in raw_rows {
        parsed.total_rows += 1;

        if cells.iter().all(|c| c.trim().is_empty()) {
            debug!("skipping empty row");
            continue;
        }
        if cells == header_cells {
            debug!("skipping repeated header row");
            continue;
        }

        if cells.len() > width {
            if cells[width..].iter().all(|c| c.trim().is_empty()) {
                cells.truncate(width);
            } else {
                warn!(
                    cells = cells.len(),
                    headers = width,
                    first = %cells[0].trim(),
                    "row wider than header, skipping"
                );
                parsed.rows_skipped += 1;
                continue;
            }
        }

        cells.resize(width, String::new());
        parsed.rows.push(cells);
    }

    parsed
}

/// Whether the closest `<table>` ancestor of `el` is `table` itself.
fn nearest_table_is(el: ElementRef<'_>, table: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
        .is_some_and(|a| a.id() == table.id())
}

/// Whether `el` sits inside another `<table>`.
pub(crate) fn is_nested(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "table")
}

/// Direct `th`/`td` children of a row, with `colspan` expanded.
fn row_cells(tr: ElementRef<'_>) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in tr.children().filter_map(ElementRef::wrap) {
        if !matches!(cell.value().name(), "th" | "td") {
            continue;
        }
        let span = cell
            .value()
            .attr("colspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        let text = cell_text(cell);
        for _ in 0..span {
            cells.push(text.clone());
        }
    }
    cells
}

/// Concatenated text of a cell. `<br>` becomes a space; script and style
/// content is dropped.
pub(crate) fn cell_text(cell: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .is_some_and(|p| matches!(p.value().name(), "script" | "style"));
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(el) if el.name() == "br" => out.push(' '),
            _ => {}
        }
    }
    out.trim().to_string()
}

/// Header keys with blanks named by position and repeats suffixed.
fn unique_headers(cells: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        let base = match cell.trim() {
            "" => format!("column_{}", i + 1),
            text => text.to_string(),
        };
        let mut key = base.clone();
        let mut n = 2;
        while headers.contains(&key) {
            key = format!("{base}_{n}");
            n += 1;
        }
        headers.push(key);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_table(html: &str) -> ParsedTable {
        let doc = Html::parse_document(html);
        let sel = Selector::parse("table").unwrap();
        let table = doc.select(&sel).next().expect("table in fixture");
        parse_table(table)
    }

    #[test]
    fn pads_short_rows() {
        let parsed = first_table(
            "<table><tr><th>name</th><th>f</th><th>value</th></tr>\
             <tr><td>Bob</td><td>Rare</td></tr></table>",
        );
        assert_eq!(parsed.headers, vec!["name", "f", "value"]);
        assert_eq!(parsed.rows, vec![vec!["Bob", "Rare", ""]]);
    }

    #[test]
    fn skips_wide_and_empty_rows() {
        let parsed = first_table(
            "<table><tr><th>name</th><th>f</th></tr>\
             <tr><td>Bob</td><td>Rare</td><td>extra</td></tr>\
             <tr><td> </td><td></td></tr>\
             <tr><th>name</th><th>f</th></tr>\
             <tr><td>Ann</td><td>Epic</td><td></td></tr></table>",
        );
        assert_eq!(parsed.rows, vec![vec!["Ann", "Epic"]]);
        assert_eq!(parsed.rows_skipped, 1);
        assert_eq!(parsed.total_rows, 5);
    }

    #[test]
    fn expands_colspan_and_names_blank_headers() {
        let parsed = first_table(
            "<table><tr><th></th><th>name</th><th>name</th></tr>\
             <tr><td colspan=\"2\">Shared</td><td>Bob</td></tr></table>",
        );
        assert_eq!(parsed.headers, vec!["column_1", "name", "name_2"]);
        assert_eq!(parsed.rows, vec![vec!["Shared", "Shared", "Bob"]]);
    }

    #[test]
    fn ignores_nested_table_rows() {
        let parsed = first_table(
            "<table><tr><th>name</th><th>info</th></tr>\
             <tr><td>Bob</td><td><table><tr><td>inner</td><td>x</td><td>y</td></tr></table></td></tr>\
             </table>",
        );
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0][0], "Bob");
    }

    #[test]
    fn cell_text_concatenates_and_breaks_on_br() {
        let doc = Html::parse_fragment(
            "<table><tr><td><a>Shiny</a>Shiny<br>Dragon<style>.x{}</style></td></tr></table>",
        );
        let sel = Selector::parse("td").unwrap();
        let td = doc.select(&sel).next().unwrap();
        assert_eq!(cell_text(td), "ShinyShiny Dragon");
    }
}
