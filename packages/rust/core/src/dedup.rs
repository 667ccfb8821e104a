//! Duplicate record removal.

use std::collections::HashSet;

use tracing::debug;

use valuelist_shared::Record;

use crate::normalize::normalize;

/// Field used as the record's identity.
pub const NAME_FIELD: &str = "Name";

#[derive(Debug, PartialEq, Eq, Hash)]
enum DedupKey {
    Named { section: String, name: String },
    Whole { section: String, fields: Vec<(String, String)> },
}

fn dedup_key(record: &Record) -> DedupKey {
    match record.get(NAME_FIELD).map(normalize) {
        Some(name) if !name.is_empty() => DedupKey::Named {
            section: record.section.clone(),
            name: name.to_lowercase(),
        },
        _ => DedupKey::Whole {
            section: record.section.clone(),
            fields: record.fields.clone(),
        },
    }
}

/// Drop records repeating an earlier (name, section), keeping first order.
///
/// Records without a name compare on all their fields. Returns the kept
/// records and how many were dropped.
pub fn dedup(records: Vec<Record>) -> (Vec<Record>, usize) {
    let mut seen = HashSet::with_capacity(records.len());
    let before = records.len();

    let kept: Vec<Record> = records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(dedup_key(record));
            if !fresh {
                debug!(section = %record.section, name = ?record.get(NAME_FIELD), "duplicate record dropped");
            }
            fresh
        })
        .collect();

    let removed = before - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(section: &str, fields: &[(&str, &str)]) -> Record {
        let mut r = Record::new(section);
        for (k, v) in fields {
            r.set(*k, *v);
        }
        r
    }

    #[test]
    fn drops_same_name_in_same_section() {
        let records = vec![
            rec("S Tier", &[("Name", "Shiny"), ("Value", "10")]),
            rec("S Tier", &[("Name", "shiny "), ("Value", "12")]),
            rec("A Tier", &[("Name", "Shiny"), ("Value", "5")]),
            rec("S Tier", &[("Name", "Bob")]),
        ];
        let (kept, removed) = dedup(records);

        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].get("Value"), Some("10"));
        assert_eq!(kept[1].section, "A Tier");
        assert_eq!(kept[2].get("Name"), Some("Bob"));
    }

    #[test]
    fn nameless_records_compare_on_all_fields() {
        let records = vec![
            rec("Stats", &[("z", "1")]),
            rec("Stats", &[("z", "1")]),
            rec("Stats", &[("z", "2")]),
            rec("Stats", &[("Name", ""), ("z", "2")]),
        ];
        let (kept, removed) = dedup(records);
        assert_eq!(removed, 1);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn dedup_is_idempotent() {
        let records = vec![
            rec("S Tier", &[("Name", "Shiny")]),
            rec("S Tier", &[("Name", "Shiny")]),
            rec("S Tier", &[("Name", "Bob")]),
            rec("Relics", &[("z", "x")]),
            rec("Relics", &[("z", "x")]),
        ];
        let (once, _) = dedup(records);
        let (twice, removed) = dedup(once.clone());
        assert_eq!(removed, 0);
        assert_eq!(twice, once);
    }
}
