//! Builder configuration from YAML

use crate::core::session::Session;
use crate::workflow::PipelineArgs;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up under the user's config directory
pub const CONFIG_FILE_NAME: &str = "pipeline.yaml";

/// Identifying inputs for a pipeline build, loaded from YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// AWS region to create and run the pipeline in
    #[serde(default = "default_region")]
    pub region: String,

    /// IAM role ARN used by the pipeline and its steps
    #[serde(default)]
    pub role: String,

    /// Bucket for model artifacts
    #[serde(default)]
    pub default_bucket: Option<String>,

    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,

    #[serde(default = "default_model_package_group_name")]
    pub model_package_group_name: String,

    #[serde(default = "default_base_job_prefix")]
    pub base_job_prefix: String,

    /// Account owning the session bucket (taken from the role ARN when absent)
    #[serde(default)]
    pub account_id: Option<String>,

    /// Directory containing the step scripts
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_pipeline_name() -> String {
    "BERT-pipeline".to_string()
}

fn default_model_package_group_name() -> String {
    "BERT-Reviews".to_string()
}

fn default_base_job_prefix() -> String {
    "BERT".to_string()
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            role: String::new(),
            default_bucket: None,
            pipeline_name: default_pipeline_name(),
            model_package_group_name: default_model_package_group_name(),
            base_job_prefix: default_base_job_prefix(),
            account_id: None,
            base_dir: None,
        }
    }
}

impl BuilderConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string, without validating
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BuilderConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Default config location under the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bert-pipeline").join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, else the default location if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::from_file(default),
            _ => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("region", &self.region),
            ("role", &self.role),
            ("pipeline_name", &self.pipeline_name),
            ("model_package_group_name", &self.model_package_group_name),
            ("base_job_prefix", &self.base_job_prefix),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Missing required setting '{}'", field);
            }
        }

        if !self.role.starts_with("arn:") || !self.role.contains(":role/") {
            anyhow::bail!("Role '{}' is not an IAM role ARN", self.role);
        }

        if self.resolved_account_id().is_none() {
            anyhow::bail!(
                "Cannot determine the account id; set 'account_id' or use a role ARN that contains it"
            );
        }

        Ok(())
    }

    /// Account id from config or from the role ARN
    pub fn resolved_account_id(&self) -> Option<String> {
        if let Some(account) = &self.account_id {
            return Some(account.clone());
        }
        // arn:<partition>:iam::<account>:role/<name>
        self.role
            .split(':')
            .nth(4)
            .filter(|account| !account.is_empty())
            .map(str::to_string)
    }

    /// Build the session for this configuration
    pub fn session(&self) -> Result<Session> {
        let account = self
            .resolved_account_id()
            .context("Cannot determine the account id for the session bucket")?;
        let base_dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to resolve current directory")?,
        };
        Ok(Session::new(&self.region, &account, base_dir))
    }

    /// Builder arguments; the artifact bucket defaults to the session bucket
    pub fn to_args(&self, session: &Session) -> PipelineArgs {
        PipelineArgs {
            region: self.region.clone(),
            role: self.role.clone(),
            default_bucket: self
                .default_bucket
                .clone()
                .unwrap_or_else(|| session.default_bucket().to_string()),
            pipeline_name: self.pipeline_name.clone(),
            model_package_group_name: self.model_package_group_name.clone(),
            base_job_prefix: self.base_job_prefix.clone(),
        }
    }
}
