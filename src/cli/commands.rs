//! CLI command definitions

use crate::core::config::BuilderConfig;
use clap::Args;
use std::path::PathBuf;

/// Print the pipeline definition
#[derive(Debug, Args, Clone)]
pub struct DefinitionCommand {
    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,

    /// Write the definition to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Show a summary of the pipeline
#[derive(Debug, Args, Clone)]
pub struct InspectCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Evaluate the accuracy condition locally
#[derive(Debug, Args, Clone)]
pub struct EvaluateCommand {
    /// Path to an evaluation report JSON document
    #[arg(short, long)]
    pub metrics: PathBuf,
}

/// Scan a training log
#[derive(Debug, Args, Clone)]
pub struct ScanLogCommand {
    /// Path to the training job log
    #[arg(short, long)]
    pub log: PathBuf,
}

/// Settings that override the configuration file
#[derive(Debug, Args, Clone, Default)]
pub struct BuildOverrides {
    /// AWS region
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// IAM role ARN
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Bucket for model artifacts
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Pipeline name
    #[arg(long, global = true)]
    pub pipeline_name: Option<String>,

    /// Model package group name
    #[arg(long, global = true)]
    pub model_package_group: Option<String>,

    /// Prefix for job output locations
    #[arg(long, global = true)]
    pub base_job_prefix: Option<String>,

    /// Account owning the session bucket
    #[arg(long, global = true)]
    pub account_id: Option<String>,

    /// Directory containing the step scripts
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,
}

impl BuildOverrides {
    /// Apply every override that was given
    pub fn apply(&self, config: &mut BuilderConfig) {
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(role) = &self.role {
            config.role = role.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.default_bucket = Some(bucket.clone());
        }
        if let Some(name) = &self.pipeline_name {
            config.pipeline_name = name.clone();
        }
        if let Some(group) = &self.model_package_group {
            config.model_package_group_name = group.clone();
        }
        if let Some(prefix) = &self.base_job_prefix {
            config.base_job_prefix = prefix.clone();
        }
        if let Some(account) = &self.account_id {
            config.account_id = Some(account.clone());
        }
        if let Some(dir) = &self.base_dir {
            config.base_dir = Some(dir.clone());
        }
    }
}
