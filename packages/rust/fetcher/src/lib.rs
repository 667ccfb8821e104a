//! Page fetching for valuelist.
//!
//! This crate provides:
//! - [`PageSource`]: where HTML comes from ([`HttpPageSource`], [`FilePageSource`])
//! - [`wait`]: poll-until-predicate-or-timeout
//! - [`fetch_ready_page`]: fetch until the page carries its tables
//! - [`snapshot`]: diagnostic HTML dumps

mod ready;
mod source;
pub mod snapshot;
pub mod wait;

pub use ready::{fetch_ready_page, page_is_ready};
pub use snapshot::save_snapshot;
pub use source::{FilePageSource, HttpPageSource, PageSource};
pub use wait::{WaitError, WaitOptions, wait_until};
