//! BERT reviews workflow
//!
//! Converts raw review TSVs into BERT features, trains a TensorFlow model on
//! them, evaluates it, and registers the model when its accuracy clears
//! [`ACCURACY_THRESHOLD`]. Below the threshold the pipeline simply ends.

use crate::core::{
    condition::{Condition, ConditionStep},
    image_uri::{self, ImageRequest, ImageScope, ImageUriError},
    parameter::Parameter,
    pipeline::{DefinitionError, KnownIssue, Pipeline},
    processing::{
        ProcessingInput, ProcessingOutput, ProcessingStep, Processor, S3DataDistribution,
        S3UploadMode,
    },
    property::PropertyFile,
    register::{MetricsSource, ModelMetrics, RegisterModelStep},
    session::Session,
    training::{Estimator, MetricDefinition, TrainingInput, TrainingStep, DEFAULT_MAX_RUNTIME_SECS},
    value::{JsonGet, PipelineValue},
};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const PROCESSING_STEP: &str = "Processing";
pub const TRAINING_STEP: &str = "Train";
pub const EVALUATION_STEP: &str = "EvaluateBERTModel";
pub const CONDITION_STEP: &str = "AccuracyCondition";
pub const REGISTER_STEP: &str = "RegisterBERTModel";

/// Minimum evaluation accuracy for registration
pub const ACCURACY_THRESHOLD: f64 = 0.01;
pub const ACCURACY_JSON_PATH: &str = "metrics.accuracy.value";

pub const EVALUATION_REPORT: &str = "EvaluationReport";
pub const EVALUATION_REPORT_PATH: &str = "evaluation.json";

const PREPROCESS_SCRIPT: &str = "preprocess-scikit-text-to-bert-feature-store.py";
const TRAIN_SCRIPT: &str = "tf_bert_reviews.py";
const EVALUATE_SCRIPT: &str = "evaluate_model_metrics.py";

const PROCESSING_MAX_RUNTIME_SECS: u64 = 7200;
const TENSORFLOW_VERSION: &str = "2.3.1";
const PY_VERSION: &str = "py37";

/// Feature splits written by the processing step, also the training channel names
const SPLITS: [&str; 3] = ["train", "validation", "test"];

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to list {}: {source}", .path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Image(#[from] ImageUriError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("Invalid metric definition '{name}': {source}")]
    Metric {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Step '{step}' declares no output at index {index}")]
    MissingOutput { step: String, index: usize },
}

/// Identifying inputs of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineArgs {
    pub region: String,
    pub role: String,
    /// Bucket for model artifacts
    pub default_bucket: String,
    pub pipeline_name: String,
    pub model_package_group_name: String,
    pub base_job_prefix: String,
}

/// Literal training hyperparameters; only the sequence length is a parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameters {
    pub epochs: i64,
    pub learning_rate: f64,
    pub epsilon: f64,
    pub train_batch_size: i64,
    pub validation_batch_size: i64,
    pub test_batch_size: i64,
    pub train_steps_per_epoch: i64,
    pub validation_steps: i64,
    pub test_steps: i64,
    pub use_xla: bool,
    pub use_amp: bool,
    pub freeze_bert_layer: bool,
    pub enable_sagemaker_debugger: bool,
    pub enable_checkpointing: bool,
    pub enable_tensorboard: bool,
    pub run_validation: bool,
    pub run_test: bool,
    pub run_sample_predictions: bool,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 1,
            learning_rate: 0.00001,
            epsilon: 0.00000001,
            train_batch_size: 128,
            validation_batch_size: 128,
            test_batch_size: 128,
            train_steps_per_epoch: 50,
            validation_steps: 50,
            test_steps: 50,
            use_xla: true,
            use_amp: true,
            freeze_bert_layer: false,
            enable_sagemaker_debugger: false,
            enable_checkpointing: false,
            enable_tensorboard: false,
            run_validation: true,
            run_test: false,
            run_sample_predictions: false,
        }
    }
}

impl Hyperparameters {
    fn to_pairs(&self, max_seq_length: PipelineValue) -> Vec<(String, PipelineValue)> {
        vec![
            ("epochs".to_string(), self.epochs.into()),
            ("learning_rate".to_string(), self.learning_rate.into()),
            ("epsilon".to_string(), self.epsilon.into()),
            ("train_batch_size".to_string(), self.train_batch_size.into()),
            ("validation_batch_size".to_string(), self.validation_batch_size.into()),
            ("test_batch_size".to_string(), self.test_batch_size.into()),
            ("train_steps_per_epoch".to_string(), self.train_steps_per_epoch.into()),
            ("validation_steps".to_string(), self.validation_steps.into()),
            ("test_steps".to_string(), self.test_steps.into()),
            ("use_xla".to_string(), self.use_xla.into()),
            ("use_amp".to_string(), self.use_amp.into()),
            ("max_seq_length".to_string(), max_seq_length),
            ("freeze_bert_layer".to_string(), self.freeze_bert_layer.into()),
            ("enable_sagemaker_debugger".to_string(), self.enable_sagemaker_debugger.into()),
            ("enable_checkpointing".to_string(), self.enable_checkpointing.into()),
            ("enable_tensorboard".to_string(), self.enable_tensorboard.into()),
            ("run_validation".to_string(), self.run_validation.into()),
            ("run_test".to_string(), self.run_test.into()),
            ("run_sample_predictions".to_string(), self.run_sample_predictions.into()),
        ]
    }
}

/// Metrics scraped from the training job logs
pub fn metric_definitions() -> Result<Vec<MetricDefinition>, BuildError> {
    [
        ("train:loss", "loss: ([0-9\\.]+)"),
        ("train:accuracy", "accuracy: ([0-9\\.]+)"),
        ("validation:loss", "val_loss: ([0-9\\.]+)"),
        ("validation:accuracy", "val_accuracy: ([0-9\\.]+)"),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        MetricDefinition::new(name, pattern).map_err(|source| BuildError::Metric {
            name: name.to_string(),
            source,
        })
    })
    .collect()
}

/// Everything a build produces
#[derive(Debug, Clone)]
pub struct BertPipeline {
    pub pipeline: Pipeline,
    /// Evaluation report location; not attached to registration
    pub model_metrics: ModelMetrics,
    pub evaluation_report: PropertyFile,
}

/// Build the pipeline definition
pub fn get_pipeline(session: &Session, args: &PipelineArgs) -> Result<Pipeline, BuildError> {
    build(session, args).map(|built| built.pipeline)
}

/// Build the pipeline definition along with its side artifacts
pub fn build(session: &Session, args: &PipelineArgs) -> Result<BertPipeline, BuildError> {
    let base_dir = session.base_dir();
    info!("BASE_DIR: {}", base_dir.display());

    let timestamp = session.timestamp();

    // No range checks: the split percentages are not required to sum to 1
    let input_data = Parameter::string(
        "InputDataUrl",
        format!("s3://{}/amazon-reviews-pds/tsv/", session.default_bucket()),
    );
    let processing_instance_count = Parameter::integer("ProcessingInstanceCount", 1);
    let processing_instance_type = Parameter::string("ProcessingInstanceType", "ml.c5.2xlarge");
    let max_seq_length = Parameter::integer("MaxSeqLength", 64);
    let balance_dataset = Parameter::string("BalanceDataset", "True");
    let train_split_percentage = Parameter::float("TrainSplitPercentage", 0.90);
    let validation_split_percentage = Parameter::float("ValidationSplitPercentage", 0.05);
    let test_split_percentage = Parameter::float("TestSplitPercentage", 0.05);
    let feature_store_offline_prefix = Parameter::string(
        "FeatureStoreOfflinePrefix",
        format!("reviews-feature-store-{}", timestamp),
    );
    let feature_group_name = Parameter::string(
        "FeatureGroupName",
        format!("reviews-feature-group-{}", timestamp),
    );
    let train_instance_type = Parameter::string("TrainingInstanceType", "ml.c5.9xlarge");
    let train_instance_count = Parameter::integer("TrainingInstanceCount", 1);
    let model_approval_status = Parameter::string("ModelApprovalStatus", "PendingManualApproval");
    let deploy_instance_type = Parameter::string("DeployInstanceType", "ml.m5.4xlarge");
    let deploy_instance_count = Parameter::integer("DeployInstanceCount", 1);

    // Processing

    let processor = Processor::sklearn(
        "0.20.0",
        &args.role,
        &args.region,
        processing_instance_type.reference(),
        processing_instance_count.reference(),
    )?
    .with_max_runtime(PROCESSING_MAX_RUNTIME_SECS);

    let processing_outputs: Vec<ProcessingOutput> = SPLITS
        .iter()
        .map(|split| {
            ProcessingOutput::new(
                &format!("bert-{}", split),
                &format!("/opt/ml/processing/output/bert/{}", split),
            )
            .with_upload_mode(S3UploadMode::EndOfJob)
        })
        .collect();

    // Job arguments carry the defaults, not runtime references
    let inlined = [
        ("--train-split-percentage", &train_split_percentage),
        ("--validation-split-percentage", &validation_split_percentage),
        ("--test-split-percentage", &test_split_percentage),
        ("--max-seq-length", &max_seq_length),
        ("--balance-dataset", &balance_dataset),
        ("--feature-store-offline-prefix", &feature_store_offline_prefix),
        ("--feature-group-name", &feature_group_name),
    ];
    let processing_arguments = inlined
        .iter()
        .flat_map(|(flag, param)| [flag.to_string(), param.default_value().to_string()]);

    let processing_step = ProcessingStep::new(PROCESSING_STEP, processor, session)
        .with_inputs(vec![ProcessingInput::new(
            input_data.reference(),
            "/opt/ml/processing/input/data/",
        )
        .named("raw-input-data")
        .with_distribution(S3DataDistribution::ShardedByS3Key)])
        .with_outputs(processing_outputs)
        .with_job_arguments(processing_arguments)
        .with_code(base_dir.join(PREPROCESS_SCRIPT).to_string_lossy().into_owned());

    // Training

    let model_path = format!(
        "s3://{}/{}/output/model",
        args.default_bucket, args.base_job_prefix
    );

    let listing = list_dir(base_dir)?;
    info!("os.listdir(BASE_DIR): {:?}", listing);
    let relisted = list_dir(base_dir)?;
    debug!(?relisted, "os.listdir(BASE_DIR)");

    let training_image = image_uri::retrieve(&ImageRequest {
        framework: "tensorflow",
        region: &args.region,
        version: TENSORFLOW_VERSION,
        py_version: Some(PY_VERSION),
        instance_type: &train_instance_type.default_value().to_string(),
        scope: ImageScope::Training,
    })?;

    let estimator = Estimator {
        entry_point: TRAIN_SCRIPT.to_string(),
        source_dir: base_dir.to_string_lossy().into_owned(),
        role: args.role.clone(),
        region: args.region.clone(),
        output_path: model_path,
        image_uri: training_image,
        instance_type: train_instance_type.reference(),
        instance_count: train_instance_count.reference(),
        volume_size_gb: 1024,
        input_mode: "File".to_string(),
        max_runtime_secs: DEFAULT_MAX_RUNTIME_SECS,
        metric_definitions: metric_definitions()?,
        hyperparameters: Hyperparameters::default().to_pairs(max_seq_length.reference()),
    };

    let training_step = SPLITS.iter().fold(
        TrainingStep::new(TRAINING_STEP, estimator),
        |step, split| {
            let source = processing_step.output_property(&format!("bert-{}", split));
            step.with_input(split, TrainingInput::new(source).with_content_type("text/csv"))
        },
    );

    // Evaluation

    let evaluation_processor = Processor::sklearn(
        "0.23-1",
        &args.role,
        &args.region,
        processing_instance_type.reference(),
        processing_instance_count.reference(),
    )?
    .with_env("AWS_DEFAULT_REGION", &args.region)
    .with_max_runtime(PROCESSING_MAX_RUNTIME_SECS);

    let evaluation_report = PropertyFile::new(EVALUATION_REPORT, "metrics", EVALUATION_REPORT_PATH);

    let evaluation_step = ProcessingStep::new(EVALUATION_STEP, evaluation_processor, session)
        .with_code(EVALUATE_SCRIPT)
        .with_inputs(vec![
            ProcessingInput::new(training_step.model_artifacts(), "/opt/ml/processing/input/model"),
            ProcessingInput::new(input_data.reference(), "/opt/ml/processing/input/data"),
        ])
        .with_outputs(vec![ProcessingOutput::new(
            "metrics",
            "/opt/ml/processing/output/metrics/",
        )
        .with_upload_mode(S3UploadMode::EndOfJob)])
        .with_job_arguments([
            "--max-seq-length".to_string(),
            max_seq_length.default_value().to_string(),
        ])
        .with_property_files(vec![evaluation_report.clone()]);

    let metrics_uri = evaluation_step
        .output_s3_uri(0)
        .ok_or_else(|| BuildError::MissingOutput {
            step: EVALUATION_STEP.to_string(),
            index: 0,
        })?;
    let model_metrics = ModelMetrics {
        model_statistics: Some(MetricsSource {
            s3_uri: format!("{}/{}", metrics_uri, EVALUATION_REPORT_PATH),
            content_type: "application/json".to_string(),
        }),
    };

    // Registration

    let inference_image = image_uri::retrieve(&ImageRequest {
        framework: "tensorflow",
        region: &args.region,
        version: TENSORFLOW_VERSION,
        py_version: Some(PY_VERSION),
        instance_type: &deploy_instance_type.default_value().to_string(),
        scope: ImageScope::Inference,
    })?;
    info!("{}", inference_image);

    let register_step = RegisterModelStep {
        name: REGISTER_STEP.to_string(),
        model_package_group_name: args.model_package_group_name.clone(),
        image_uri: inference_image,
        model_data: training_step.model_artifacts(),
        content_types: vec!["text/csv".to_string()],
        response_types: vec!["text/csv".to_string()],
        inference_instances: vec![deploy_instance_type.reference()],
        transform_instances: vec![deploy_instance_type.reference()],
        approval_status: model_approval_status.reference(),
        model_metrics: None,
    };

    let minimum_accuracy = Condition::greater_than_or_equal_to(
        PipelineValue::JsonGet(JsonGet::new(
            EVALUATION_STEP,
            &evaluation_report.name,
            ACCURACY_JSON_PATH,
        )),
        PipelineValue::from(ACCURACY_THRESHOLD),
    );

    let condition_step = ConditionStep::new(CONDITION_STEP, vec![minimum_accuracy])
        .with_if_steps(vec![register_step.into()])
        .with_else_steps(Vec::new());

    let mut issues: Vec<KnownIssue> = inlined
        .iter()
        .map(|(_, param)| KnownIssue::DefaultInlinedArgument {
            step: PROCESSING_STEP.to_string(),
            parameter: param.name.clone(),
        })
        .collect();
    issues.push(KnownIssue::DefaultInlinedArgument {
        step: EVALUATION_STEP.to_string(),
        parameter: max_seq_length.name.clone(),
    });
    issues.push(KnownIssue::UnvalidatedSplit {
        parameters: vec![
            train_split_percentage.name.clone(),
            validation_split_percentage.name.clone(),
            test_split_percentage.name.clone(),
        ],
    });
    issues.extend(unresolved_references(&input_data));
    issues.push(KnownIssue::UnattachedModelMetrics {
        step: REGISTER_STEP.to_string(),
    });
    issues.push(KnownIssue::PropertyFileDeserialization {
        step: EVALUATION_STEP.to_string(),
        property_file: evaluation_report.name.clone(),
    });

    let parameters = vec![
        input_data,
        processing_instance_count,
        processing_instance_type,
        max_seq_length,
        balance_dataset,
        train_split_percentage,
        validation_split_percentage,
        test_split_percentage,
        feature_store_offline_prefix,
        feature_group_name,
        train_instance_type,
        train_instance_count,
        model_approval_status,
        deploy_instance_type,
        deploy_instance_count,
    ];

    // Registration runs only from the condition branch
    let steps = vec![
        processing_step.into(),
        training_step.into(),
        evaluation_step.into(),
        condition_step.into(),
    ];

    let pipeline = Pipeline::new(&args.pipeline_name, parameters, steps)?.with_known_issues(issues);

    for issue in pipeline.known_issues() {
        debug!("Known issue: {}", issue);
    }

    Ok(BertPipeline {
        pipeline,
        model_metrics,
        evaluation_report,
    })
}

/// Identifiers the workflow used without defining, and what they are bound to here
fn unresolved_references(input_data: &Parameter) -> Vec<KnownIssue> {
    vec![
        KnownIssue::UnresolvedReference {
            identifier: "step_process".to_string(),
            resolved_to: format!("step '{}'", PROCESSING_STEP),
        },
        KnownIssue::UnresolvedReference {
            identifier: "step_train".to_string(),
            resolved_to: format!("step '{}'", TRAINING_STEP),
        },
        KnownIssue::UnresolvedReference {
            identifier: "raw_input_data_s3_uri".to_string(),
            resolved_to: format!("parameter '{}'", input_data.name),
        },
    ]
}

fn list_dir(path: &Path) -> Result<Vec<String>, BuildError> {
    let list_error = |source| BuildError::ListDir {
        path: path.to_path_buf(),
        source,
    };
    let mut names = std::fs::read_dir(path)
        .map_err(list_error)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(list_error)?;
    names.sort();
    Ok(names)
}
