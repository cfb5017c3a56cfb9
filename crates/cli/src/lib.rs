//! kvoracle CLI -- validate recorded runs against their final MVCC log.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kvoracle_core::history::types::Step;
use kvoracle_core::store::LogEntry;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(
    name = "kvoracle",
    about = "Reference oracle for MVCC transactional-history validation"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate recorded run files
    Validate(ValidateArgs),
}

#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Run record JSON files: {"steps": [...], "log": [...]}
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output results as JSON (one object per file)
    #[arg(long)]
    pub json: bool,
}

/// One recorded run: the operation steps and the final MVCC log collected
/// after the run terminated.
#[derive(Debug, Deserialize)]
pub struct RunRecord {
    pub steps: Vec<Step>,
    pub log: Vec<LogEntry>,
}
