//! Shared types, error model, and configuration for valuelist.
//!
//! This crate is the foundation depended on by all other valuelist crates.
//! It provides:
//! - [`ValueListError`]: the unified error type
//! - Domain types ([`Record`], [`RawTable`], [`FieldAliases`])
//! - Configuration ([`AppConfig`], runtime configs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExportConfig, ExportSettings, FetchConfig, FetchSettings, PipelineConfig,
    SourceSettings, config_dir, config_file_path, load_config, load_config_from,
    resolve_config,
};
pub use error::{Result, ValueListError};
pub use types::{FieldAliases, RawTable, Record, section_matches};
