//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{BuildOverrides, DefinitionCommand, EvaluateCommand, InspectCommand, ScanLogCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Builds the SageMaker pipeline definition for the BERT reviews workflow
#[derive(Debug, Parser, Clone)]
#[command(name = "bert-pipeline")]
#[command(author = "Pipeline Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Builds the BERT reviews SageMaker pipeline definition", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to builder configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: BuildOverrides,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the pipeline definition JSON
    Definition(DefinitionCommand),

    /// Show parameters, steps and known issues
    Inspect(InspectCommand),

    /// Decide the accuracy branch for an evaluation report
    Evaluate(EvaluateCommand),

    /// Extract training metrics from a job log
    ScanLog(ScanLogCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
