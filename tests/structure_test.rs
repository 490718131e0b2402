//! Structural assembly of the BERT pipeline
//!
//! Run with: cargo test --test structure_test

mod helpers;

use bert_pipeline::core::{Branch, PipelineValue, StepKind};
use bert_pipeline::workflow::bert::{
    ACCURACY_THRESHOLD, CONDITION_STEP, EVALUATION_STEP, PROCESSING_STEP, REGISTER_STEP,
    TRAINING_STEP,
};
use helpers::*;

#[test]
fn test_declares_exactly_the_expected_parameters() {
    let built = build_default();

    assert_eq!(
        built.pipeline.parameter_names(),
        vec![
            "InputDataUrl",
            "ProcessingInstanceCount",
            "ProcessingInstanceType",
            "MaxSeqLength",
            "BalanceDataset",
            "TrainSplitPercentage",
            "ValidationSplitPercentage",
            "TestSplitPercentage",
            "FeatureStoreOfflinePrefix",
            "FeatureGroupName",
            "TrainingInstanceType",
            "TrainingInstanceCount",
            "ModelApprovalStatus",
            "DeployInstanceType",
            "DeployInstanceCount",
        ]
    );
}

#[test]
fn test_parameter_defaults() {
    let pipeline = build_default().pipeline;
    let default_of = |name: &str| pipeline.parameter(name).unwrap().default_value().to_string();

    assert_eq!(
        default_of("InputDataUrl"),
        "s3://sagemaker-us-east-1-111122223333/amazon-reviews-pds/tsv/"
    );
    assert_eq!(default_of("ProcessingInstanceType"), "ml.c5.2xlarge");
    assert_eq!(default_of("MaxSeqLength"), "64");
    assert_eq!(default_of("BalanceDataset"), "True");
    assert_eq!(default_of("TrainSplitPercentage"), "0.9");
    assert_eq!(default_of("ValidationSplitPercentage"), "0.05");
    assert_eq!(default_of("TestSplitPercentage"), "0.05");
    assert_eq!(default_of("FeatureStoreOfflinePrefix"), "reviews-feature-store-16000000000000000");
    assert_eq!(default_of("FeatureGroupName"), "reviews-feature-group-16000000000000000");
    assert_eq!(default_of("TrainingInstanceType"), "ml.c5.9xlarge");
    assert_eq!(default_of("ModelApprovalStatus"), "PendingManualApproval");
    assert_eq!(default_of("DeployInstanceType"), "ml.m5.4xlarge");
    assert_eq!(default_of("DeployInstanceCount"), "1");
}

#[test]
fn test_split_percentages_are_not_validated() {
    // Defaults are accepted as declared, whatever they sum to
    let pipeline = build_default().pipeline;
    assert!(pipeline.parameter("TrainSplitPercentage").is_some());
    assert!(pipeline
        .known_issues()
        .iter()
        .any(|issue| matches!(issue, bert_pipeline::KnownIssue::UnvalidatedSplit { .. })));
}

#[test]
fn test_active_step_list() {
    let pipeline = build_default().pipeline;
    assert_eq!(
        pipeline.step_names(),
        vec![PROCESSING_STEP, TRAINING_STEP, EVALUATION_STEP, CONDITION_STEP]
    );
}

#[test]
fn test_registration_only_inside_condition_branch() {
    let pipeline = build_default().pipeline;

    assert!(pipeline.step(REGISTER_STEP).is_none());
    let register = pipeline.find_step(REGISTER_STEP).expect("Registration should be nested");
    assert_eq!(register.kind(), StepKind::RegisterModel);

    let condition = pipeline.step(CONDITION_STEP).unwrap().as_condition().unwrap();
    assert_eq!(condition.if_steps.len(), 1);
    assert_eq!(condition.if_steps[0].name(), REGISTER_STEP);
    assert!(condition.else_steps.is_empty());
}

#[test]
fn test_training_channels_consume_matching_processing_outputs() {
    let pipeline = build_default().pipeline;
    let processing = pipeline.step(PROCESSING_STEP).unwrap().as_processing().unwrap();
    let training = pipeline.step(TRAINING_STEP).unwrap().as_training().unwrap();

    let output_names: Vec<&str> = processing.outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(output_names, vec!["bert-train", "bert-validation", "bert-test"]);

    for channel in ["train", "validation", "test"] {
        let input = training
            .channel(channel)
            .unwrap_or_else(|| panic!("Channel {} should exist", channel));
        let expected = processing.output_property(&format!("bert-{}", channel));
        assert_eq!(input.s3_data, expected);
        assert_eq!(input.content_type.as_deref(), Some("text/csv"));

        match &input.s3_data {
            PipelineValue::StepProperty { step, path } => {
                assert_eq!(step, PROCESSING_STEP);
                assert!(path.contains(&format!("Outputs['bert-{}']", channel)));
            }
            other => panic!("Channel {} should reference a step property, got {:?}", channel, other),
        }
    }
}

#[test]
fn test_evaluation_property_file() {
    let built = build_default();
    let evaluation = built
        .pipeline
        .step(EVALUATION_STEP)
        .unwrap()
        .as_processing()
        .unwrap();

    assert_eq!(evaluation.property_files.len(), 1);
    let file = &evaluation.property_files[0];
    assert_eq!(file.name, "EvaluationReport");
    assert_eq!(file.output_name, "metrics");
    assert_eq!(file.path, "evaluation.json");
    assert_eq!(built.evaluation_report, *file);
}

#[test]
fn test_metrics_source_uri_extends_first_evaluation_output() {
    let built = build_default();
    let evaluation = built
        .pipeline
        .step(EVALUATION_STEP)
        .unwrap()
        .as_processing()
        .unwrap();

    let stats = built.model_metrics.model_statistics.as_ref().unwrap();
    let first_output = evaluation.output_s3_uri(0).unwrap();
    assert_eq!(stats.s3_uri, format!("{}/evaluation.json", first_output));
    assert_eq!(stats.content_type, "application/json");
}

#[test]
fn test_model_metrics_not_attached_to_registration() {
    let pipeline = build_default().pipeline;
    let register = pipeline.find_step(REGISTER_STEP).unwrap().as_register_model().unwrap();
    assert!(register.model_metrics.is_none());
}

#[test]
fn test_threshold_literal() {
    assert_eq!(ACCURACY_THRESHOLD, 0.01);

    let pipeline = build_default().pipeline;
    let condition = pipeline.step(CONDITION_STEP).unwrap().as_condition().unwrap();
    assert_eq!(condition.conditions.len(), 1);
    assert_eq!(condition.conditions[0].right, PipelineValue::from(0.01));
}

#[test]
fn test_accuracy_straddling_threshold_selects_branch() {
    let pipeline = build_default().pipeline;
    let condition = pipeline.step(CONDITION_STEP).unwrap().as_condition().unwrap();

    let above = condition.select_branch(&report(0.0101)).unwrap();
    let at = condition.select_branch(&report(0.01)).unwrap();
    let below = condition.select_branch(&report(0.0099)).unwrap();

    assert_eq!(above, Branch::If);
    assert_eq!(at, Branch::If);
    assert_eq!(below, Branch::Else);

    let registered: Vec<&str> = condition.steps_for(Branch::If).iter().map(|s| s.name()).collect();
    assert_eq!(registered, vec![REGISTER_STEP]);
    assert!(condition.steps_for(Branch::Else).is_empty());
}

#[test]
fn test_missing_accuracy_is_an_error() {
    let pipeline = build_default().pipeline;
    let condition = pipeline.step(CONDITION_STEP).unwrap().as_condition().unwrap();
    let result = condition.select_branch(&serde_json::json!({ "metrics": {} }));
    assert!(result.is_err());
}

#[test]
fn test_job_arguments_use_parameter_defaults() {
    let pipeline = build_default().pipeline;
    let processing = pipeline.step(PROCESSING_STEP).unwrap().as_processing().unwrap();

    assert_eq!(
        processing.job_arguments,
        vec![
            "--train-split-percentage",
            "0.9",
            "--validation-split-percentage",
            "0.05",
            "--test-split-percentage",
            "0.05",
            "--max-seq-length",
            "64",
            "--balance-dataset",
            "True",
            "--feature-store-offline-prefix",
            "reviews-feature-store-16000000000000000",
            "--feature-group-name",
            "reviews-feature-group-16000000000000000",
        ]
    );

    let evaluation = pipeline.step(EVALUATION_STEP).unwrap().as_processing().unwrap();
    assert_eq!(evaluation.job_arguments, vec!["--max-seq-length", "64"]);
}

#[test]
fn test_max_seq_length_hyperparameter_references_parameter() {
    let pipeline = build_default().pipeline;
    let training = pipeline.step(TRAINING_STEP).unwrap().as_training().unwrap();

    assert_eq!(
        training.estimator.hyperparameter("max_seq_length"),
        Some(&PipelineValue::Parameter("MaxSeqLength".to_string()))
    );
    assert_eq!(
        training.estimator.hyperparameter("epochs"),
        Some(&PipelineValue::from(1i64))
    );
}

#[test]
fn test_evaluation_consumes_model_and_raw_input() {
    let pipeline = build_default().pipeline;
    let training = pipeline.step(TRAINING_STEP).unwrap().as_training().unwrap();
    let evaluation = pipeline.step(EVALUATION_STEP).unwrap().as_processing().unwrap();

    assert_eq!(evaluation.inputs.len(), 2);
    assert_eq!(evaluation.inputs[0].source, training.model_artifacts());
    assert_eq!(evaluation.inputs[0].destination, "/opt/ml/processing/input/model");
    assert_eq!(
        evaluation.inputs[1].source,
        PipelineValue::Parameter("InputDataUrl".to_string())
    );
}

#[test]
fn test_different_names_differ_only_in_name() {
    let first = build_named("reviews-a").pipeline;
    let second = build_named("reviews-b").pipeline;

    assert_eq!(first.name, "reviews-a");
    assert_eq!(second.name, "reviews-b");
    assert_eq!(first.definition(), second.definition());
    assert_eq!(first.parameter_names(), second.parameter_names());
    assert_eq!(first.step_names(), second.step_names());
}
