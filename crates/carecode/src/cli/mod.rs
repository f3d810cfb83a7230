//! Command-line interface for carecode.
//!
//! This module provides the CLI structure and command handlers for the
//! `carecode` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DocumentsCommand, ExtendCommand, IssueCommand, ListCommand, OutputFormat,
    RevokeCommand, ScopeArg, SeedCommand, ValidateCommand,
};

/// carecode - Share advance-directive documents with short access codes
///
/// Aggregates a person's directive documents into one bundle and issues
/// short codes that release it: a permanent code tied to their identity,
/// and revocable temporary codes with an expiry.
#[derive(Debug, Parser)]
#[command(name = "carecode")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Issue a temporary access code for an owner's documents
    Issue(IssueCommand),

    /// Validate a presented code and print the released bundle
    Validate(ValidateCommand),

    /// Extend an active temporary code's expiry
    Extend(ExtendCommand),

    /// Revoke a temporary code
    Revoke(RevokeCommand),

    /// List grants for an owner
    List(ListCommand),

    /// Show an owner's aggregated documents
    Documents(DocumentsCommand),

    /// Register an identity and print its permanent code
    Seed(SeedCommand),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
