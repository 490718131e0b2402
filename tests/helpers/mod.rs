//! Shared fixtures for pipeline build tests
#![allow(dead_code)]

use bert_pipeline::core::Session;
use bert_pipeline::workflow::bert::{self, BertPipeline};
use bert_pipeline::PipelineArgs;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::path::PathBuf;

pub const ROLE: &str = "arn:aws:iam::111122223333:role/SageMakerExecution";
pub const ACCOUNT: &str = "111122223333";
pub const REGION: &str = "us-east-1";

/// Directory holding placeholder step scripts
pub fn scripts_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("bert_pipeline_test_scripts");
    std::fs::create_dir_all(&dir).unwrap();
    for script in [
        "preprocess-scikit-text-to-bert-feature-store.py",
        "tf_bert_reviews.py",
        "evaluate_model_metrics.py",
    ] {
        std::fs::write(dir.join(script), "# placeholder\n").unwrap();
    }
    dir
}

/// Session with a fixed creation time
pub fn session() -> Session {
    let at = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
    Session::with_timestamp(REGION, ACCOUNT, scripts_dir(), at)
}

pub fn args(pipeline_name: &str) -> PipelineArgs {
    PipelineArgs {
        region: REGION.to_string(),
        role: ROLE.to_string(),
        default_bucket: "bert-artifacts".to_string(),
        pipeline_name: pipeline_name.to_string(),
        model_package_group_name: "BERT-Reviews".to_string(),
        base_job_prefix: "BERT".to_string(),
    }
}

pub fn build_named(pipeline_name: &str) -> BertPipeline {
    bert::build(&session(), &args(pipeline_name)).expect("Pipeline should build")
}

pub fn build_default() -> BertPipeline {
    build_named("BERT-pipeline")
}

/// Evaluation report as written by the evaluation script
pub fn report(accuracy: f64) -> Value {
    json!({ "metrics": { "accuracy": { "value": accuracy } } })
}

/// Top-level step definition by name
pub fn step_definition<'a>(definition: &'a Value, name: &str) -> &'a Value {
    definition["Steps"]
        .as_array()
        .unwrap()
        .iter()
        .find(|step| step["Name"] == name)
        .unwrap_or_else(|| panic!("Step {} should be in the definition", name))
}
