//! Estimators and the training step

use crate::core::value::PipelineValue;
use regex::Regex;
use serde_json::{json, Map, Value};

/// Maximum training time used when the estimator sets none
pub const DEFAULT_MAX_RUNTIME_SECS: u64 = 86_400;

/// A named metric scraped from training logs
#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub name: String,
    pub regex: Regex,
}

impl MetricDefinition {
    pub fn new(name: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.to_string(),
            regex: Regex::new(pattern)?,
        })
    }

    /// Extract the metric value from a log line
    pub fn capture(&self, line: &str) -> Option<f64> {
        self.regex
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().trim_end_matches('.').parse().ok())
    }

    pub fn to_definition(&self) -> Value {
        json!({ "Name": self.name, "Regex": self.regex.as_str() })
    }
}

/// Framework training container configuration
#[derive(Debug, Clone)]
pub struct Estimator {
    pub entry_point: String,
    pub source_dir: String,
    pub role: String,
    pub region: String,
    pub output_path: String,
    pub image_uri: String,
    pub instance_type: PipelineValue,
    pub instance_count: PipelineValue,
    pub volume_size_gb: u32,
    pub input_mode: String,
    pub max_runtime_secs: u64,
    pub metric_definitions: Vec<MetricDefinition>,
    /// Ordered hyperparameters
    pub hyperparameters: Vec<(String, PipelineValue)>,
}

impl Estimator {
    /// Hyperparameters as the training container receives them
    ///
    /// Literals are JSON-encoded into strings; runtime references pass through.
    fn rendered_hyperparameters(&self) -> Map<String, Value> {
        let mut rendered = Map::new();
        for (key, value) in &self.hyperparameters {
            let entry = match value {
                PipelineValue::Literal(literal) => Value::String(literal.to_string()),
                other => other.to_definition(),
            };
            rendered.insert(key.clone(), entry);
        }
        rendered.insert(
            "sagemaker_program".to_string(),
            json!(encode_str(&self.entry_point)),
        );
        rendered.insert(
            "sagemaker_submit_directory".to_string(),
            json!(encode_str(&self.source_dir)),
        );
        rendered.insert(
            "sagemaker_region".to_string(),
            json!(encode_str(&self.region)),
        );
        rendered
    }

    pub fn hyperparameter(&self, key: &str) -> Option<&PipelineValue> {
        self.hyperparameters
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

fn encode_str(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// A named input channel of a training job
#[derive(Debug, Clone)]
pub struct TrainingInput {
    pub s3_data: PipelineValue,
    pub content_type: Option<String>,
}

impl TrainingInput {
    pub fn new(s3_data: PipelineValue) -> Self {
        Self {
            s3_data,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

/// A training job declared as a pipeline step
#[derive(Debug, Clone)]
pub struct TrainingStep {
    pub name: String,
    pub estimator: Estimator,
    /// Channels in declaration order
    pub inputs: Vec<(String, TrainingInput)>,
}

impl TrainingStep {
    pub fn new(name: &str, estimator: Estimator) -> Self {
        Self {
            name: name.to_string(),
            estimator,
            inputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, channel: &str, input: TrainingInput) -> Self {
        self.inputs.push((channel.to_string(), input));
        self
    }

    pub fn channel(&self, name: &str) -> Option<&TrainingInput> {
        self.inputs
            .iter()
            .find(|(channel, _)| channel == name)
            .map(|(_, input)| input)
    }

    /// Runtime reference to the trained model archive
    pub fn model_artifacts(&self) -> PipelineValue {
        PipelineValue::step_property(&self.name, "ModelArtifacts.S3ModelArtifacts")
    }

    pub fn arguments(&self) -> Value {
        let estimator = &self.estimator;

        let channels: Vec<Value> = self
            .inputs
            .iter()
            .map(|(channel, input)| {
                let mut entry = json!({
                    "ChannelName": channel,
                    "DataSource": {
                        "S3DataSource": {
                            "S3DataType": "S3Prefix",
                            "S3Uri": input.s3_data.to_definition(),
                            "S3DataDistributionType": "FullyReplicated",
                        }
                    }
                });
                if let Some(content_type) = &input.content_type {
                    entry["ContentType"] = json!(content_type);
                }
                entry
            })
            .collect();

        let metrics: Vec<Value> = estimator
            .metric_definitions
            .iter()
            .map(MetricDefinition::to_definition)
            .collect();

        json!({
            "AlgorithmSpecification": {
                "TrainingImage": estimator.image_uri,
                "TrainingInputMode": estimator.input_mode,
                "MetricDefinitions": metrics,
            },
            "OutputDataConfig": { "S3OutputPath": estimator.output_path },
            "StoppingCondition": { "MaxRuntimeInSeconds": estimator.max_runtime_secs },
            "ResourceConfig": {
                "InstanceCount": estimator.instance_count.to_definition(),
                "InstanceType": estimator.instance_type.to_definition(),
                "VolumeSizeInGB": estimator.volume_size_gb,
            },
            "RoleArn": estimator.role,
            "InputDataConfig": channels,
            "HyperParameters": estimator.rendered_hyperparameters(),
        })
    }

    pub fn to_definition(&self) -> Value {
        json!({
            "Name": self.name,
            "Type": "Training",
            "Arguments": self.arguments(),
        })
    }
}
