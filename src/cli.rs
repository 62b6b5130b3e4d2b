//! Command-line interface definition.

use bulk_verify_core::io::export::{ExportFilters, ExportFormat};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bulk-verify",
    version,
    about = "Verify email addresses in bulk against a verification service, within your credit balance."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML configuration file.
    #[arg(long, global = true, env = "BULK_VERIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the verification service.
    #[arg(long, global = true, env = "BULK_VERIFY_API_URL")]
    pub api_url: Option<String>,

    /// API token sent as `Authorization: Token <token>`.
    #[arg(long, global = true, env = "BULK_VERIFY_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Extra attempts for a failed verification call.
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify a batch of addresses.
    Verify(VerifyArgs),
    /// Show the remaining verification credits.
    Credits,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Addresses to verify.
    pub emails: Vec<String>,

    /// File with addresses separated by newlines, commas or semicolons.
    #[arg(long)]
    pub text_file: Option<PathBuf>,

    /// CSV file with a header row; each row's first address-shaped cell is verified.
    #[arg(long)]
    pub csv_file: Option<PathBuf>,

    /// Title for the history entry.
    #[arg(long)]
    pub title: Option<String>,

    /// Answer yes to partial-run and large-batch prompts.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Do not save the batch to the verification history.
    #[arg(long)]
    pub no_history: bool,

    /// Write an export file. A directory gets a dated default file name.
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    pub format: FormatArg,

    /// Export only results matching any of these (default: all).
    #[arg(long, value_enum, value_delimiter = ',')]
    pub only: Vec<FilterArg>,

    /// Print the results as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Csv,
    Excel,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Excel => ExportFormat::Excel,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterArg {
    Valid,
    Invalid,
    CatchAll,
    Safe,
    Medium,
    High,
}

/// Turns `--only` values into export filters; no values means everything.
pub fn export_filters(only: &[FilterArg]) -> ExportFilters {
    if only.is_empty() {
        return ExportFilters::default();
    }
    let mut filters = ExportFilters::none();
    for filter in only {
        match filter {
            FilterArg::Valid => filters.valid = true,
            FilterArg::Invalid => filters.invalid = true,
            FilterArg::CatchAll => filters.catch_all = true,
            FilterArg::Safe => filters.safe = true,
            FilterArg::Medium => filters.medium = true,
            FilterArg::High => filters.high = true,
        }
    }
    filters
}
