//! Header key → semantic field mapping.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use valuelist_shared::{FieldAliases, Record};

/// Rewrites raw header keys into field names for one run.
///
/// Unknown keys are kept verbatim and reported once each.
pub struct Categorizer<'a> {
    aliases: &'a FieldAliases,
    unknown: BTreeSet<String>,
}

impl<'a> Categorizer<'a> {
    pub fn new(aliases: &'a FieldAliases) -> Self {
        Self {
            aliases,
            unknown: BTreeSet::new(),
        }
    }

    /// The field name `key` maps to; unknown keys map to themselves.
    fn field_for<'k>(&self, key: &'k str) -> &'k str
    where
        'a: 'k,
    {
        self.aliases.resolve(key).unwrap_or(key)
    }

    /// Build a record for `section` from `(raw key, value)` pairs.
    ///
    /// When two keys land on the same field the first non-empty value wins.
    pub fn categorize(&mut self, section: &str, row: &[(String, String)]) -> Record {
        let mut record = Record::new(section);

        for (key, value) in row {
            let field = self.field_for(key).to_string();
            if self.aliases.resolve(key).is_none() && self.unknown.insert(key.clone()) {
                warn!(key = %key, section, "unrecognized column header, keeping as-is");
            }

            match record.get(&field).map(str::is_empty) {
                None => record.fields.push((field, value.clone())),
                Some(true) => record.set(field, value.clone()),
                Some(false) => {
                    debug!(key = %key, field = %field, "field already filled, dropping duplicate column");
                }
            }
        }

        record
    }

    /// Keys that had no alias, in sorted order.
    pub fn unknown_keys(&self) -> Vec<String> {
        self.unknown.iter().cloned().collect()
    }
}
