//! Rendered pipeline definition document
//!
//! Run with: cargo test --test definition_test

mod helpers;

use bert_pipeline::workflow::bert::{
    CONDITION_STEP, EVALUATION_STEP, PROCESSING_STEP, REGISTER_STEP, TRAINING_STEP,
};
use helpers::*;
use serde_json::{json, Value};

fn definition() -> Value {
    build_default().pipeline.definition()
}

#[test]
fn test_document_header() {
    let definition = definition();

    assert_eq!(definition["Version"], "2020-12-01");
    assert_eq!(definition["Parameters"].as_array().unwrap().len(), 15);
    assert_eq!(definition["Steps"].as_array().unwrap().len(), 4);
    assert_eq!(
        definition["PipelineExperimentConfig"],
        json!({
            "ExperimentName": { "Get": "Execution.PipelineName" },
            "TrialName": { "Get": "Execution.PipelineExecutionId" },
        })
    );
}

#[test]
fn test_parameter_entries() {
    let definition = definition();
    let parameters = definition["Parameters"].as_array().unwrap();

    assert_eq!(
        parameters[1],
        json!({ "Name": "ProcessingInstanceCount", "Type": "Integer", "DefaultValue": 1 })
    );
    assert_eq!(
        parameters[5],
        json!({ "Name": "TrainSplitPercentage", "Type": "Float", "DefaultValue": 0.9 })
    );
    assert_eq!(parameters[12]["Name"], "ModelApprovalStatus");
    assert_eq!(parameters[12]["Type"], "String");
    assert_eq!(parameters[12]["DefaultValue"], "PendingManualApproval");
}

#[test]
fn test_processing_step_shape() {
    let definition = definition();
    let step = step_definition(&definition, PROCESSING_STEP);
    let args = &step["Arguments"];

    assert_eq!(step["Type"], "Processing");
    assert_eq!(
        args["ProcessingResources"]["ClusterConfig"]["InstanceType"],
        json!({ "Get": "Parameters.ProcessingInstanceType" })
    );
    assert_eq!(args["StoppingCondition"]["MaxRuntimeInSeconds"], 7200);

    let inputs = args["ProcessingInputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0]["InputName"], "raw-input-data");
    assert_eq!(inputs[0]["S3Input"]["S3Uri"], json!({ "Get": "Parameters.InputDataUrl" }));
    assert_eq!(inputs[0]["S3Input"]["S3DataDistributionType"], "ShardedByS3Key");
    assert_eq!(inputs[1]["InputName"], "code");

    let outputs = args["ProcessingOutputConfig"]["Outputs"].as_array().unwrap();
    let names: Vec<&str> = outputs.iter().map(|o| o["OutputName"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["bert-train", "bert-validation", "bert-test"]);
    for output in outputs {
        assert_eq!(output["S3Output"]["S3UploadMode"], "EndOfJob");
    }

    let arguments = args["AppSpecification"]["ContainerArguments"].as_array().unwrap();
    assert_eq!(arguments[0], "--train-split-percentage");
    assert_eq!(arguments[1], "0.9");
    assert!(step.get("PropertyFiles").is_none());
}

#[test]
fn test_training_step_shape() {
    let definition = definition();
    let step = step_definition(&definition, TRAINING_STEP);
    let args = &step["Arguments"];

    assert_eq!(step["Type"], "Training");

    let image = args["AlgorithmSpecification"]["TrainingImage"].as_str().unwrap();
    assert!(image.starts_with("763104351884.dkr.ecr.us-east-1.amazonaws.com/tensorflow-training:2.3.1"));
    assert!(image.ends_with("-cpu-py37"));

    assert_eq!(args["OutputDataConfig"]["S3OutputPath"], "s3://bert-artifacts/BERT/output/model");
    assert_eq!(args["ResourceConfig"]["VolumeSizeInGB"], 1024);
    assert_eq!(
        args["ResourceConfig"]["InstanceType"],
        json!({ "Get": "Parameters.TrainingInstanceType" })
    );

    let channels = args["InputDataConfig"].as_array().unwrap();
    assert_eq!(channels.len(), 3);
    assert_eq!(channels[0]["ChannelName"], "train");
    assert_eq!(channels[0]["ContentType"], "text/csv");
    assert_eq!(
        channels[0]["DataSource"]["S3DataSource"]["S3Uri"],
        json!({
            "Get": "Steps.Processing.ProcessingOutputConfig.Outputs['bert-train'].S3Output.S3Uri"
        })
    );

    let hyperparameters = &args["HyperParameters"];
    assert_eq!(hyperparameters["max_seq_length"], json!({ "Get": "Parameters.MaxSeqLength" }));
    assert_eq!(hyperparameters["epochs"], "1");
    assert_eq!(hyperparameters["use_xla"], "true");
    assert_eq!(hyperparameters["learning_rate"], "0.00001");
    assert_eq!(hyperparameters["epsilon"], "1e-8");
    assert_eq!(hyperparameters["sagemaker_program"], "\"tf_bert_reviews.py\"");

    let metrics = args["AlgorithmSpecification"]["MetricDefinitions"].as_array().unwrap();
    assert_eq!(metrics.len(), 4);
    assert_eq!(metrics[0]["Name"], "train:loss");
    assert_eq!(metrics[3]["Name"], "validation:accuracy");
}

#[test]
fn test_evaluation_step_shape() {
    let definition = definition();
    let step = step_definition(&definition, EVALUATION_STEP);
    let args = &step["Arguments"];

    let inputs = args["ProcessingInputs"].as_array().unwrap();
    let names: Vec<&str> = inputs.iter().map(|i| i["InputName"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["input-1", "input-2", "code"]);
    assert_eq!(
        inputs[0]["S3Input"]["S3Uri"],
        json!({ "Get": "Steps.Train.ModelArtifacts.S3ModelArtifacts" })
    );

    assert_eq!(args["Environment"], json!({ "AWS_DEFAULT_REGION": "us-east-1" }));
    assert_eq!(
        args["AppSpecification"]["ContainerEntrypoint"],
        json!(["python3", "/opt/ml/processing/input/code/evaluate_model_metrics.py"])
    );
    assert_eq!(
        step["PropertyFiles"],
        json!([{
            "PropertyFileName": "EvaluationReport",
            "OutputName": "metrics",
            "FilePath": "evaluation.json",
        }])
    );

    let output = &args["ProcessingOutputConfig"]["Outputs"][0]["S3Output"];
    assert_eq!(
        output["S3Uri"],
        "s3://sagemaker-us-east-1-111122223333/sagemaker-scikit-learn-EvaluateBERTModel-16000000000000000/output/metrics"
    );
}

#[test]
fn test_condition_step_shape() {
    let definition = definition();
    let step = step_definition(&definition, CONDITION_STEP);
    let args = &step["Arguments"];

    assert_eq!(step["Type"], "Condition");
    assert_eq!(
        args["Conditions"],
        json!([{
            "Type": "GreaterThanOrEqualTo",
            "LeftValue": {
                "Std:JsonGet": {
                    "PropertyFile": { "Get": "Steps.EvaluateBERTModel.PropertyFiles.EvaluationReport" },
                    "Path": "metrics.accuracy.value",
                }
            },
            "RightValue": 0.01,
        }])
    );
    assert_eq!(args["ElseSteps"], json!([]));

    let register = &args["IfSteps"][0];
    assert_eq!(register["Name"], REGISTER_STEP);
    assert_eq!(register["Type"], "RegisterModel");
}

#[test]
fn test_register_step_shape() {
    let definition = definition();
    let condition = step_definition(&definition, CONDITION_STEP);
    let args = &condition["Arguments"]["IfSteps"][0]["Arguments"];

    assert_eq!(args["ModelPackageGroupName"], "BERT-Reviews");
    assert_eq!(args["ModelApprovalStatus"], json!({ "Get": "Parameters.ModelApprovalStatus" }));
    assert!(args.get("ModelMetrics").is_none());

    let inference = &args["InferenceSpecification"];
    assert_eq!(
        inference["Containers"][0]["ModelDataUrl"],
        json!({ "Get": "Steps.Train.ModelArtifacts.S3ModelArtifacts" })
    );
    assert!(inference["Containers"][0]["Image"]
        .as_str()
        .unwrap()
        .contains("tensorflow-inference:2.3.1-cpu"));
    assert_eq!(
        inference["SupportedRealtimeInferenceInstanceTypes"],
        json!([{ "Get": "Parameters.DeployInstanceType" }])
    );
}

#[test]
fn test_definition_json_parses_back() {
    let pipeline = build_default().pipeline;

    let compact = pipeline.definition_json(false).unwrap();
    let pretty = pipeline.definition_json(true).unwrap();
    assert!(!compact.contains('\n'));
    assert!(pretty.contains('\n'));

    let parsed: Value = serde_json::from_str(&compact).unwrap();
    assert_eq!(parsed, pipeline.definition());
    assert_eq!(serde_json::from_str::<Value>(&pretty).unwrap(), parsed);
}
