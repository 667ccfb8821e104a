//! valuelist: scrape a wiki value list into a numbered spreadsheet.
//!
//! Fetches the page, waits for its tables, cleans every row and writes
//! `<stem>_<n>.xlsx` into the output directory.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
