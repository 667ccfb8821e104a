//! Core pipeline for valuelist.
//!
//! Cleans extracted tables into records and ties the stages together:
//! fetch → extract → normalize → categorize → dedup → export.

pub mod categorize;
pub mod dedup;
pub mod normalize;
pub mod pipeline;

pub use pipeline::{
    ProcessOutput, ProgressReporter, RunConfig, RunReport, SilentProgress, StageStats,
    process_html, run,
};
