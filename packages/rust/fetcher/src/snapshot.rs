//! Diagnostic HTML snapshots.
//!
//! A failed run keeps the last page body it saw so the workflow can upload
//! it as a build artifact.

use std::path::{Path, PathBuf};

use tracing::info;

use valuelist_shared::{Result, ValueListError};

/// Write `html` to `<dir>/page_<label>_<run_id>.html`, creating `dir`.
pub fn save_snapshot(dir: &Path, run_id: &str, label: &str, html: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| ValueListError::io(dir, e))?;

    let path = dir.join(format!("page_{label}_{run_id}.html"));
    std::fs::write(&path, html).map_err(|e| ValueListError::io(&path, e))?;

    info!(?path, bytes = html.len(), "saved page snapshot");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_named_snapshot() {
        let dir = std::env::temp_dir()
            .join(format!("vl-snapshot-{}", uuid::Uuid::now_v7()))
            .join("nested");

        let path = save_snapshot(&dir, "run42", "failed", "<html>partial</html>").unwrap();
        assert_eq!(path.file_name().unwrap(), "page_failed_run42.html");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>partial</html>");

        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }
}
