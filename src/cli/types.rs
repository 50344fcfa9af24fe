//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use super::commands::status::StatusArgs;
use super::commands::validate::ValidateArgs;

#[derive(Parser, Debug)]
#[command(name = "mlip-explore")]
#[command(about = "Adaptive exploration and convergence checks for potential training", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay recorded deviations through the scheduler and show convergence
    Status(StatusArgs),

    /// Load and validate a configuration file
    Validate(ValidateArgs),
}
