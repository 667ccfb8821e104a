//! Application configuration for valuelist.
//!
//! Config lives in `valuelist.toml`: an explicit `--config` path wins, then
//! the working directory, then `~/.valuelist/valuelist.toml`.
//! Missing files fall back to defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ValueListError};
use crate::types::FieldAliases;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "valuelist.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".valuelist";

/// Page scraped when no URL is configured.
const DEFAULT_SOURCE_URL: &str = "https://animeadventures.fandom.com/wiki/Value_List";

// ---------------------------------------------------------------------------
// Config structs (matching valuelist.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// What to scrape.
    #[serde(default)]
    pub source: SourceSettings,

    /// How to fetch it.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Where the spreadsheet goes.
    #[serde(default)]
    pub export: ExportSettings,

    /// Extra header aliases (`raw key = "Field"`), layered over the built-ins.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Page holding the value tables.
    #[serde(default = "default_source_url")]
    pub url: String,

    /// Sections to keep. Empty keeps every section.
    #[serde(default)]
    pub sections: Vec<String>,

    /// CSS selector for candidate tables.
    #[serde(default = "default_table_selector")]
    pub table_selector: String,

    /// Minimum rows (header included) for a table to count.
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            sections: Vec::new(),
            table_selector: default_table_selector(),
            min_rows: default_min_rows(),
        }
    }
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.into()
}
fn default_table_selector() -> String {
    "table".into()
}
fn default_min_rows() -> usize {
    2
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Total time to wait for the tables to appear.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Delay between readiness probes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Selector that must match before the page counts as loaded.
    #[serde(default = "default_ready_selector")]
    pub ready_selector: String,

    /// Directory for diagnostic HTML snapshots.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,

    /// Keep a snapshot even when the run succeeds.
    #[serde(default)]
    pub snapshot_on_success: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            wait_timeout_secs: default_wait_timeout(),
            poll_interval_ms: default_poll_interval(),
            ready_selector: default_ready_selector(),
            snapshot_dir: default_snapshot_dir(),
            snapshot_on_success: false,
        }
    }
}

fn default_user_agent() -> String {
    concat!("Mozilla/5.0 (compatible; valuelist/", env!("CARGO_PKG_VERSION"), ")").into()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_wait_timeout() -> u64 {
    60
}
fn default_poll_interval() -> u64 {
    2000
}
fn default_ready_selector() -> String {
    "table".into()
}
fn default_snapshot_dir() -> String {
    "snapshots".into()
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory receiving the numbered workbooks.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File name stem; files are named `<stem>_<n>.xlsx`.
    #[serde(default = "default_file_stem")]
    pub file_stem: String,

    /// Add one worksheet per section next to the combined sheet.
    #[serde(default = "default_true")]
    pub sheet_per_section: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_stem: default_file_stem(),
            sheet_per_section: true,
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_file_stem() -> String {
    "Anime_Adventures_Value_List".into()
}
fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.source.url).map_err(|e| {
            ValueListError::config(format!("invalid source url '{}': {e}", self.source.url))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValueListError::config(format!(
                "source url must be http(s), got '{}'",
                url.scheme()
            )));
        }

        if self.fetch.poll_interval_ms == 0 {
            return Err(ValueListError::config("fetch.poll_interval_ms must be > 0"));
        }
        if self.fetch.poll_interval_ms >= self.fetch.wait_timeout_secs.saturating_mul(1000) {
            return Err(ValueListError::config(
                "fetch.poll_interval_ms must be shorter than fetch.wait_timeout_secs",
            ));
        }

        let stem = self.export.file_stem.trim();
        if stem.is_empty() || stem.contains(['/', '\\']) {
            return Err(ValueListError::config(format!(
                "export.file_stem '{}' must be a plain, non-empty file name",
                self.export.file_stem
            )));
        }

        if let Some((raw, _)) = self.aliases.iter().find(|(_, field)| field.trim().is_empty()) {
            return Err(ValueListError::config(format!(
                "alias '{raw}' maps to an empty field name"
            )));
        }

        Ok(())
    }

    /// The source URL, parsed.
    pub fn source_url(&self) -> Result<Url> {
        Url::parse(&self.source.url).map_err(|e| {
            ValueListError::config(format!("invalid source url '{}': {e}", self.source.url))
        })
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (derived from AppConfig)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    pub ready_selector: String,
    pub snapshot_dir: PathBuf,
    pub snapshot_on_success: bool,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.fetch.user_agent.clone(),
            request_timeout: Duration::from_secs(config.fetch.request_timeout_secs),
            wait_timeout: Duration::from_secs(config.fetch.wait_timeout_secs),
            poll_interval: Duration::from_millis(config.fetch.poll_interval_ms),
            ready_selector: config.fetch.ready_selector.clone(),
            snapshot_dir: PathBuf::from(&config.fetch.snapshot_dir),
            snapshot_on_success: config.fetch.snapshot_on_success,
        }
    }
}

/// Runtime configuration for the extract → clean → dedup stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub aliases: FieldAliases,
    pub sections: Vec<String>,
    pub table_selector: String,
    pub min_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            aliases: FieldAliases::with_overrides(
                config.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            ),
            sections: config.source.sections.clone(),
            table_selector: config.source.table_selector.clone(),
            min_rows: config.source.min_rows,
        }
    }
}

/// Runtime export configuration.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub file_stem: String,
    pub sheet_per_section: bool,
    /// Written to the workbook's info sheet.
    pub source_url: String,
}

impl From<&AppConfig> for ExportConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.export.output_dir),
            file_stem: config.export.file_stem.trim().to_string(),
            sheet_per_section: config.export.sheet_per_section,
            source_url: config.source.url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.valuelist/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ValueListError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.valuelist/valuelist.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the user config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ValueListError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ValueListError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Resolve and validate the config for a run.
///
/// An explicit path must exist. Otherwise `./valuelist.toml` is preferred
/// over the user config, and defaults apply when neither exists.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config = match explicit {
        Some(path) => load_config_from(path)?,
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                tracing::debug!(path = ?local, "using config from working directory");
                load_config_from(&local)?
            } else {
                load_config()?
            }
        }
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("animeadventures.fandom.com"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.wait_timeout_secs, 60);
        assert_eq!(parsed.export.file_stem, "Anime_Adventures_Value_List");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn config_with_aliases_and_sections() {
        let toml_str = r#"
[source]
sections = ["S_Tier", "Relics"]

[export]
output_dir = "/tmp/values"

[aliases]
z = "Zone"
f = "Family"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.source.sections.len(), 2);
        assert_eq!(config.export.output_dir, "/tmp/values");

        let pipeline = PipelineConfig::from(&config);
        assert_eq!(pipeline.aliases.resolve("z"), Some("Zone"));
        assert_eq!(pipeline.aliases.resolve("f"), Some("Family"));
        assert_eq!(pipeline.aliases.resolve("name"), Some("Name"));
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.wait_timeout, Duration::from_secs(60));
        assert_eq!(fetch.poll_interval, Duration::from_millis(2000));
        assert_eq!(fetch.ready_selector, "table");
        assert!(!fetch.snapshot_on_success);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut config = AppConfig::default();
        config.source.url = "ftp://example.com/list".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fetch.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.fetch.wait_timeout_secs = 1;
        config.fetch.poll_interval_ms = 5000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.export.file_stem = "../escape".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.aliases.insert("x".into(), "  ".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alias 'x'"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let missing = std::env::temp_dir().join("valuelist-definitely-missing.toml");
        let result = resolve_config(Some(&missing));
        assert!(matches!(result, Err(ValueListError::Io { .. })));
    }
}
