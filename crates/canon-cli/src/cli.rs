use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canon",
    about = "Canonical record of e-prints and their announcements",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "canon.toml")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply events from a JSON file to the record
    Ingest(IngestArgs),
    /// Show an e-print or one of its versions
    Show(ShowArgs),
    /// List announced events for a day, month, or year
    Events(EventsArgs),
    /// Show the event history of an e-print or version
    History(HistoryArgs),
    /// Recompute every checksum and report mismatches
    Verify(VerifyArgs),
    /// List stored keys beneath a prefix
    Ls(LsArgs),
}

#[derive(Args)]
pub struct IngestArgs {
    /// JSON file holding an array of events
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    /// `1901.00123` for the e-print, `1901.00123v2` for one version
    pub identifier: String,
}

#[derive(Args)]
pub struct EventsArgs {
    /// `YYYY-MM-DD`, `YYYY-MM`, or `YYYY`
    pub period: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub identifier: String,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "")]
    pub prefix: String,
}
