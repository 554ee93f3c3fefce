use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use autoclaim_core::fx::CurrencyCode;

#[derive(Parser, Debug)]
#[command(name = "autoclaim")]
#[command(version, about = "Vehicle damage assessments and claim reports")]
pub struct Cli {
    /// SQLite database file. Overrides AUTOCLAIM_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage credit accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Run a damage assessment for an image
    Analyze(AnalyzeArgs),

    /// Browse saved reports
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// Print the damage overlays of a report
    Overlays(OverlaysArgs),

    /// Export a report as PDF
    Export(ExportArgs),
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Register a new account
    Create {
        /// Account id. Generated when omitted.
        #[arg(long)]
        id: Option<String>,

        /// Starting balance. Overrides AUTOCLAIM_STARTING_CREDITS.
        #[arg(long)]
        credits: Option<i64>,
    },

    /// Show balance and onboarding state
    Show { id: String },

    /// Mark onboarding as complete
    Onboard { id: String },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Account the analysis is charged to
    #[arg(long)]
    pub account: String,

    /// Photo of the damaged vehicle
    #[arg(long)]
    pub image: PathBuf,

    /// Recorded analysis response to replay
    #[arg(long)]
    pub response: PathBuf,

    /// Display currency. Overrides AUTOCLAIM_DISPLAY_CURRENCY.
    #[arg(long)]
    pub currency: Option<CurrencyCode>,
}

#[derive(Subcommand, Debug)]
pub enum ReportsCommand {
    /// List the reports of an account, newest first
    List {
        #[arg(long)]
        account: String,

        #[arg(long)]
        currency: Option<CurrencyCode>,
    },

    /// Show one report
    Show {
        id: String,

        #[arg(long)]
        currency: Option<CurrencyCode>,

        /// Print the stored assessment as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct OverlaysArgs {
    pub id: String,

    /// Rendered image width in pixels
    #[arg(long, default_value_t = 1000.0)]
    pub width: f64,

    /// Rendered image height in pixels
    #[arg(long, default_value_t = 1000.0)]
    pub height: f64,

    /// Finding to show as hovered
    #[arg(long)]
    pub hover: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub id: String,

    #[arg(long)]
    pub currency: Option<CurrencyCode>,

    /// Output directory. Overrides AUTOCLAIM_EXPORT_DIR.
    #[arg(long)]
    pub out: Option<PathBuf>,
}
