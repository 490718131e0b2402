//! Execution context the pipeline is built against

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Session information shared by every step of one build
///
/// The timestamp is captured once so that all name-derived identifiers in a
/// build agree with each other.
#[derive(Debug, Clone)]
pub struct Session {
    default_bucket: String,
    timestamp: i64,
    base_dir: PathBuf,
}

impl Session {
    /// Create a session using the account's default SageMaker bucket
    pub fn new(region: &str, account_id: &str, base_dir: impl Into<PathBuf>) -> Self {
        Self::with_timestamp(region, account_id, base_dir, Utc::now())
    }

    /// Create a session with a fixed creation time
    pub fn with_timestamp(
        region: &str,
        account_id: &str,
        base_dir: impl Into<PathBuf>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            default_bucket: format!("sagemaker-{}-{}", region, account_id),
            timestamp: timestamp_ticks(at),
            base_dir: base_dir.into(),
        }
    }

    pub fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    /// Creation time in 100ns ticks since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Directory holding the step scripts
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Job name for a processor's base job name within this session
    pub fn job_name(&self, base_job_name: &str) -> String {
        format!("{}-{}", base_job_name, self.timestamp)
    }
}

fn timestamp_ticks(at: DateTime<Utc>) -> i64 {
    at.timestamp() * 10_000_000 + i64::from(at.timestamp_subsec_nanos() / 100)
}
