//! Core domain types shared by the pipeline stages.

use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// RawTable
// ---------------------------------------------------------------------------

/// One table as found on the page, before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// Section label derived from page context (tab label or heading).
    pub section: String,
    /// Zero-based position of the table in the document.
    pub index: usize,
    /// Header cells, unique within the table.
    pub headers: Vec<String>,
    /// Data rows; every row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One table row after cleaning, keyed by field name.
///
/// Fields keep header order. Keys are unique within a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Grouping label from the page structure.
    pub section: String,
    /// `(field, value)` pairs in column order.
    pub fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            fields: Vec::new(),
        }
    }

    /// Look up a field value by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a field, replacing any existing value under the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Field names in column order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldAliases
// ---------------------------------------------------------------------------

/// Built-in header aliases: raw key → semantic field name.
const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("name", "Name"),
    ("n", "Name"),
    ("unit", "Name"),
    ("item", "Name"),
    ("character", "Name"),
    ("f", "Rarity"),
    ("g", "Rarity"),
    ("r", "Rarity"),
    ("rarity", "Rarity"),
    ("t", "Tier"),
    ("tier", "Tier"),
    ("v", "Value"),
    ("value", "Value"),
    ("worth", "Value"),
    ("d", "Demand"),
    ("demand", "Demand"),
    ("trend", "Trend"),
    ("s", "Stability"),
    ("stability", "Stability"),
    ("o", "Obtainment"),
    ("obtain", "Obtainment"),
    ("obtainment", "Obtainment"),
    ("how to obtain", "Obtainment"),
    ("notes", "Notes"),
    ("note", "Notes"),
];

/// Static mapping from raw header key to semantic field name.
///
/// Lookup trims the key and ignores ASCII case, and depends on nothing but
/// the key itself. Single-letter keys such as `f` only mean "Rarity" as
/// long as the page keeps its column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
    map: BTreeMap<String, String>,
}

impl FieldAliases {
    /// An empty table: every key passes through.
    fn empty() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Built-in aliases extended (or overridden) by `overrides`.
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut aliases = Self::default();
        for (raw, field) in overrides {
            aliases.insert(raw, field);
        }
        aliases
    }

    /// Add or replace one alias.
    pub fn insert(&mut self, raw: &str, field: &str) {
        self.map.insert(lookup_key(raw), field.trim().to_string());
    }

    /// Resolve a raw header key. `None` means the key is unknown.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.map.get(&lookup_key(raw)).map(String::as_str)
    }
}

impl Default for FieldAliases {
    fn default() -> Self {
        let mut aliases = Self::empty();
        for (raw, field) in DEFAULT_ALIASES {
            aliases.insert(raw, field);
        }
        aliases
    }
}

fn lookup_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Compare section names the way the page writes them in anchors and labels
/// (`S_Tier` and `s tier` both match `S Tier`).
pub fn section_matches(a: &str, b: &str) -> bool {
    fn fold(s: &str) -> String {
        s.trim().replace('_', " ").to_lowercase()
    }
    fold(a) == fold(b)
}
