//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::grant::AccessScope;

/// Issue command arguments.
#[derive(Debug, Args)]
pub struct IssueCommand {
    /// The owner whose documents the code will release
    pub owner_id: String,

    /// Expiry in days (default from configuration)
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Intended audience for the code
    #[arg(short, long, value_enum, default_value = "global")]
    pub scope: ScopeArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Validate command arguments.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// The presented access code
    pub code: String,

    /// First name for corroboration / permanent-code lookup
    #[arg(long)]
    pub first: Option<String>,

    /// Last name for corroboration / permanent-code lookup
    #[arg(long)]
    pub last: Option<String>,

    /// Birth date (YYYY-MM-DD) for corroboration
    #[arg(long)]
    pub birth: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Extend command arguments.
#[derive(Debug, Args)]
pub struct ExtendCommand {
    /// The temporary code to extend
    pub code: String,

    /// Additional days to add to the expiry
    #[arg(short, long, default_value = "30")]
    pub days: u32,
}

/// Revoke command arguments.
#[derive(Debug, Args)]
pub struct RevokeCommand {
    /// The temporary code to revoke
    pub code: String,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// The owner whose grants to list
    pub owner_id: String,

    /// Include revoked and expired grants
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Documents command arguments.
#[derive(Debug, Args)]
pub struct DocumentsCommand {
    /// The owner whose aggregated documents to show
    pub owner_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Seed command arguments.
#[derive(Debug, Args)]
pub struct SeedCommand {
    /// Stable owner identifier
    pub owner_id: String,

    /// First name
    #[arg(long)]
    pub first: String,

    /// Last name
    #[arg(long)]
    pub last: String,

    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    pub birth: String,

    /// Also insert sample documents for manual testing
    #[arg(long)]
    pub with_documents: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Access-scope argument for issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    /// Anyone holding the code
    Global,
    /// A specific institution
    Institution,
    /// A specific named person
    Personal,
}

impl From<ScopeArg> for AccessScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Global => Self::Global,
            ScopeArg::Institution => Self::Institution,
            ScopeArg::Personal => Self::Personal,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
