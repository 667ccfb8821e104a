//! Numbered output files and worksheet names.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use valuelist_shared::{Result, ValueListError};

/// How many numbers to try when other writers keep taking the next one.
const MAX_CLAIM_ATTEMPTS: u32 = 100;

/// Longest worksheet name Excel accepts.
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Characters Excel rejects in worksheet names.
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Highest `n` among files named `<stem>_<n>.<ext>` in `dir` (0 when none).
fn highest_number(dir: &Path, stem: &str, ext: &str) -> Result<u32> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(ValueListError::io(dir, e)),
    };

    let prefix = format!("{stem}_");
    let suffix = format!(".{ext}");
    let mut highest = 0;

    for entry in entries {
        let entry = entry.map_err(|e| ValueListError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        let number = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok());

        if let Some(n) = number {
            highest = highest.max(n);
        }
    }

    Ok(highest)
}

/// The path the next export would use: one past the highest existing number.
pub fn next_numbered_path(dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    let next = highest_number(dir, stem, ext)? + 1;
    Ok(dir.join(format!("{stem}_{next}.{ext}")))
}

/// Create the next numbered file with create-new semantics.
///
/// An existing file is never opened for writing; if another writer takes the
/// number first, the next one is tried.
pub(crate) fn claim_next_file(dir: &Path, stem: &str, ext: &str) -> Result<(PathBuf, File)> {
    let mut number = highest_number(dir, stem, ext)? + 1;

    for _ in 0..MAX_CLAIM_ATTEMPTS {
        let path = dir.join(format!("{stem}_{number}.{ext}"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                debug!(?path, "claimed output file");
                return Ok((path, file));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(?path, "output file taken, trying next number");
                number += 1;
            }
            Err(e) => return Err(ValueListError::io(&path, e)),
        }
    }

    Err(ValueListError::export(format!(
        "could not claim a free {stem}_<n>.{ext} in {} after {MAX_CLAIM_ATTEMPTS} attempts",
        dir.display()
    )))
}

/// Tracks worksheet names already used in a workbook.
#[derive(Debug, Default)]
pub(crate) struct SheetNames {
    used: Vec<String>,
}

impl SheetNames {
    /// Reserve a name as-is (caller guarantees it is valid).
    pub fn reserve(&mut self, name: &str) {
        self.used.push(name.to_lowercase());
    }

    /// A valid, unused worksheet name derived from `label`.
    pub fn claim(&mut self, label: &str) -> String {
        let base = sanitize_sheet_name(label);
        let mut name = base.clone();
        let mut n = 2;
        while self.used.contains(&name.to_lowercase()) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
            name = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
            n += 1;
        }
        self.reserve(&name);
        name
    }
}

/// Make `label` acceptable as an Excel worksheet name.
pub(crate) fn sanitize_sheet_name(label: &str) -> String {
    let replaced: String = label
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let name: String = trimmed.chars().take(MAX_SHEET_NAME_CHARS).collect();
    let name = name.trim_end().to_string();

    if name.is_empty() || name.eq_ignore_ascii_case("history") {
        format!("Section {name}").trim().to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vl-{tag}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn next_after_existing_numbers() {
        let dir = temp_dir("naming");
        std::fs::write(dir.join("Values_1.xlsx"), b"one").unwrap();
        std::fs::write(dir.join("Values_2.xlsx"), b"two").unwrap();
        std::fs::write(dir.join("Values_x.xlsx"), b"junk").unwrap();
        std::fs::write(dir.join("Other_9.xlsx"), b"other").unwrap();
        std::fs::write(dir.join("Values_7.csv"), b"csv").unwrap();

        let next = next_numbered_path(&dir, "Values", "xlsx").unwrap();
        assert_eq!(next, dir.join("Values_3.xlsx"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn first_file_in_missing_dir_is_one() {
        let dir = std::env::temp_dir().join(format!("vl-missing-{}", uuid::Uuid::now_v7()));
        let next = next_numbered_path(&dir, "Values", "xlsx").unwrap();
        assert_eq!(next, dir.join("Values_1.xlsx"));
    }

    #[test]
    fn claim_never_reuses_existing_file() {
        let dir = temp_dir("claim");
        std::fs::write(dir.join("Values_1.xlsx"), b"keep me").unwrap();

        let (path, _file) = claim_next_file(&dir, "Values", "xlsx").unwrap();
        assert_eq!(path, dir.join("Values_2.xlsx"));
        let (path, _file) = claim_next_file(&dir, "Values", "xlsx").unwrap();
        assert_eq!(path, dir.join("Values_3.xlsx"));

        assert_eq!(std::fs::read(dir.join("Values_1.xlsx")).unwrap(), b"keep me");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        assert_eq!(sanitize_sheet_name("S/A Tier: [new]"), "S_A Tier_ _new_");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name(""), "Section");
        let long = sanitize_sheet_name("A very long section name that goes on");
        assert_eq!(long.chars().count(), 31);
        assert!(long.starts_with("A very long section name that"));

        let mut names = SheetNames::default();
        names.reserve("Values");
        assert_eq!(names.claim("values"), "values (2)");
        assert_eq!(names.claim("Skins"), "Skins");
        assert_eq!(names.claim("skins"), "skins (2)");
        assert_eq!(names.claim("Skins"), "Skins (3)");
    }
}
