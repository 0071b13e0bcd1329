//! Command-line arguments

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    catalog::CatalogCommands, commit::CommitArgs, commit::ReopenArgs, commit::ValidateArgs,
    completions::CompletionsArgs, frac::FracArgs, grid::ClearArgs, grid::ColArgs, grid::KeyArgs,
    grid::RowArgs, grid::SetArgs, grid::ShowArgs, init::InitArgs, records::RecordsArgs,
    report::StatusArgs, report::SummaryArgs, size::SizeCommands, sync::SyncArgs,
};
use crate::entities::context::Phase;

#[derive(Parser, Debug)]
#[command(
    name = "qcm",
    version,
    about = "Record garment measurements and check them against spec tolerances",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Inspection phase (before or after wash); defaults to the configured phase
    #[arg(long, short = 'p', global = true, env = "QCM_PHASE")]
    pub phase: Option<Phase>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Auto)]
    pub output: OutputFormat,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table for lists, YAML for single items
    Auto,
    Table,
    Tsv,
    Csv,
    Yaml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an inspection for an order and color
    Init(InitArgs),

    /// Load and inspect measurement point catalogs
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Add, remove or resize sizes in the working set
    #[command(subcommand)]
    Size(SizeCommands),

    /// Switch a size to another tolerance key
    Key(KeyArgs),

    /// Toggle point rows of a size
    Row(RowArgs),

    /// Toggle a full sample column (every point measured)
    Col(ColArgs),

    /// Record a measurement deviation
    Set(SetArgs),

    /// Remove a recorded measurement
    Clear(ClearArgs),

    /// Show the measurement grid of a size
    Show(ShowArgs),

    /// List missing required measurements
    Validate(ValidateArgs),

    /// Commit a size's measurements and lock its key
    Commit(CommitArgs),

    /// Unlock a committed size and key for editing
    Reopen(ReopenArgs),

    /// Working set and committed pairs
    Status(StatusArgs),

    /// Pass/fail summary of committed records
    Summary(SummaryArgs),

    /// Save every committed record to the record store again
    Sync(SyncArgs),

    /// List the records held in the record store
    Records(RecordsArgs),

    /// Convert between fractions and decimals
    Frac(FracArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}
