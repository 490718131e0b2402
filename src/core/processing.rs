//! Processing jobs: processors, inputs, outputs and the processing step

use crate::core::{
    image_uri::{self, ImageRequest, ImageScope, ImageUriError},
    property::PropertyFile,
    session::Session,
    value::PipelineValue,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

const CODE_INPUT_NAME: &str = "code";
const CODE_LOCAL_PATH: &str = "/opt/ml/processing/input/code";

/// Compute resources and container for a processing job
#[derive(Debug, Clone)]
pub struct Processor {
    pub base_job_name: String,
    pub image_uri: String,
    pub role: String,
    pub command: Vec<String>,
    pub instance_type: PipelineValue,
    pub instance_count: PipelineValue,
    pub volume_size_gb: u32,
    pub max_runtime_secs: Option<u64>,
    pub env: BTreeMap<String, String>,
}

impl Processor {
    /// Scikit-learn processor for the given framework version
    pub fn sklearn(
        framework_version: &str,
        role: &str,
        region: &str,
        instance_type: PipelineValue,
        instance_count: PipelineValue,
    ) -> Result<Self, ImageUriError> {
        let image_uri = image_uri::retrieve(&ImageRequest {
            framework: "sklearn",
            region,
            version: framework_version,
            py_version: None,
            instance_type: instance_type.as_literal_str().unwrap_or("ml.m5.xlarge"),
            scope: ImageScope::Processing,
        })?;

        Ok(Self {
            base_job_name: "sagemaker-scikit-learn".to_string(),
            image_uri,
            role: role.to_string(),
            command: vec!["python3".to_string()],
            instance_type,
            instance_count,
            volume_size_gb: 30,
            max_runtime_secs: None,
            env: BTreeMap::new(),
        })
    }

    pub fn with_max_runtime(mut self, secs: u64) -> Self {
        self.max_runtime_secs = Some(secs);
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }
}

/// How input objects are spread across processing instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum S3DataDistribution {
    #[default]
    FullyReplicated,
    ShardedByS3Key,
}

impl S3DataDistribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            S3DataDistribution::FullyReplicated => "FullyReplicated",
            S3DataDistribution::ShardedByS3Key => "ShardedByS3Key",
        }
    }
}

/// When output files are uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum S3UploadMode {
    #[default]
    EndOfJob,
    Continuous,
}

impl S3UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            S3UploadMode::EndOfJob => "EndOfJob",
            S3UploadMode::Continuous => "Continuous",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingInput {
    pub name: Option<String>,
    pub source: PipelineValue,
    pub destination: String,
    pub distribution: S3DataDistribution,
}

impl ProcessingInput {
    pub fn new(source: PipelineValue, destination: &str) -> Self {
        Self {
            name: None,
            source,
            destination: destination.to_string(),
            distribution: S3DataDistribution::default(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_distribution(mut self, distribution: S3DataDistribution) -> Self {
        self.distribution = distribution;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingOutput {
    pub name: String,
    /// Local path inside the container
    pub source: String,
    /// Target S3 location; generated from the job name when absent
    pub destination: Option<String>,
    pub upload_mode: S3UploadMode,
}

impl ProcessingOutput {
    pub fn new(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: source.to_string(),
            destination: None,
            upload_mode: S3UploadMode::default(),
        }
    }

    pub fn with_upload_mode(mut self, mode: S3UploadMode) -> Self {
        self.upload_mode = mode;
        self
    }
}

/// A processing job declared as a pipeline step
#[derive(Debug, Clone)]
pub struct ProcessingStep {
    pub name: String,
    pub processor: Processor,
    pub inputs: Vec<ProcessingInput>,
    pub outputs: Vec<ProcessingOutput>,
    pub job_arguments: Vec<String>,
    /// Script run by the processor
    pub code: String,
    pub property_files: Vec<PropertyFile>,
    job_name: String,
    bucket: String,
}

impl ProcessingStep {
    /// Job name is `<base job name>-<step name>-<session timestamp>`
    pub fn new(name: &str, processor: Processor, session: &Session) -> Self {
        let job_name = session.job_name(&format!("{}-{}", processor.base_job_name, name));
        Self {
            name: name.to_string(),
            processor,
            inputs: Vec::new(),
            outputs: Vec::new(),
            job_arguments: Vec::new(),
            code: String::new(),
            property_files: Vec::new(),
            job_name,
            bucket: session.default_bucket().to_string(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<ProcessingInput>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<ProcessingOutput>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_job_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.job_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_property_files(mut self, files: Vec<PropertyFile>) -> Self {
        self.property_files = files;
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Names of the declared inputs, generating `input-<n>` for unnamed ones
    pub fn input_names(&self) -> Vec<String> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                input
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("input-{}", i + 1))
            })
            .collect()
    }

    /// Resolved S3 URI of the output at `index`
    pub fn output_s3_uri(&self, index: usize) -> Option<String> {
        self.outputs.get(index).map(|output| self.resolve_destination(output))
    }

    /// Runtime reference to a named output's S3 location
    pub fn output_property(&self, output_name: &str) -> PipelineValue {
        PipelineValue::step_property(
            &self.name,
            format!(
                "ProcessingOutputConfig.Outputs['{}'].S3Output.S3Uri",
                output_name
            ),
        )
    }

    fn resolve_destination(&self, output: &ProcessingOutput) -> String {
        output.destination.clone().unwrap_or_else(|| {
            format!("s3://{}/{}/output/{}", self.bucket, self.job_name, output.name)
        })
    }

    fn code_file_name(&self) -> String {
        Path::new(&self.code)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.code.clone())
    }

    /// Body of the processing job request
    pub fn arguments(&self) -> Value {
        let code_file = self.code_file_name();

        let mut inputs: Vec<Value> = self
            .inputs
            .iter()
            .zip(self.input_names())
            .map(|(input, name)| {
                json!({
                    "InputName": name,
                    "AppManaged": false,
                    "S3Input": {
                        "S3Uri": input.source.to_definition(),
                        "LocalPath": input.destination,
                        "S3DataType": "S3Prefix",
                        "S3InputMode": "File",
                        "S3DataDistributionType": input.distribution.as_str(),
                    }
                })
            })
            .collect();

        if !self.code.is_empty() {
            inputs.push(json!({
                "InputName": CODE_INPUT_NAME,
                "AppManaged": false,
                "S3Input": {
                    "S3Uri": format!("s3://{}/{}/input/code/{}", self.bucket, self.job_name, code_file),
                    "LocalPath": CODE_LOCAL_PATH,
                    "S3DataType": "S3Prefix",
                    "S3InputMode": "File",
                    "S3DataDistributionType": S3DataDistribution::FullyReplicated.as_str(),
                }
            }));
        }

        let outputs: Vec<Value> = self
            .outputs
            .iter()
            .map(|output| {
                json!({
                    "OutputName": output.name,
                    "AppManaged": false,
                    "S3Output": {
                        "S3Uri": self.resolve_destination(output),
                        "LocalPath": output.source,
                        "S3UploadMode": output.upload_mode.as_str(),
                    }
                })
            })
            .collect();

        let mut entrypoint = self.processor.command.clone();
        entrypoint.push(format!("{}/{}", CODE_LOCAL_PATH, code_file));

        let mut app = Map::new();
        app.insert("ImageUri".to_string(), json!(self.processor.image_uri));
        app.insert("ContainerEntrypoint".to_string(), json!(entrypoint));
        if !self.job_arguments.is_empty() {
            app.insert("ContainerArguments".to_string(), json!(self.job_arguments));
        }

        let mut args = Map::new();
        args.insert(
            "ProcessingResources".to_string(),
            json!({
                "ClusterConfig": {
                    "InstanceType": self.processor.instance_type.to_definition(),
                    "InstanceCount": self.processor.instance_count.to_definition(),
                    "VolumeSizeInGB": self.processor.volume_size_gb,
                }
            }),
        );
        args.insert("AppSpecification".to_string(), Value::Object(app));
        args.insert("RoleArn".to_string(), json!(self.processor.role));
        args.insert("ProcessingInputs".to_string(), json!(inputs));
        args.insert(
            "ProcessingOutputConfig".to_string(),
            json!({ "Outputs": outputs }),
        );
        if let Some(secs) = self.processor.max_runtime_secs {
            args.insert(
                "StoppingCondition".to_string(),
                json!({ "MaxRuntimeInSeconds": secs }),
            );
        }
        if !self.processor.env.is_empty() {
            args.insert("Environment".to_string(), json!(self.processor.env));
        }

        Value::Object(args)
    }

    pub fn to_definition(&self) -> Value {
        let mut step = json!({
            "Name": self.name,
            "Type": "Processing",
            "Arguments": self.arguments(),
        });
        if !self.property_files.is_empty() {
            let files: Vec<Value> = self.property_files.iter().map(PropertyFile::to_definition).collect();
            step["PropertyFiles"] = json!(files);
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session() -> Session {
        let at = Utc.timestamp_opt(1_600_000_000, 0).unwrap();
        Session::with_timestamp("us-east-1", "111122223333", "/work", at)
    }

    fn processor() -> Processor {
        Processor::sklearn(
            "0.23-1",
            "arn:aws:iam::111122223333:role/Exec",
            "us-east-1",
            PipelineValue::string("ml.c5.2xlarge"),
            PipelineValue::from(1i64),
        )
        .unwrap()
        .with_max_runtime(7200)
    }

    #[test]
    fn test_unnamed_inputs_get_positional_names() {
        let step = ProcessingStep::new("Eval", processor(), &session()).with_inputs(vec![
            ProcessingInput::new("s3://a/model".into(), "/opt/ml/processing/input/model"),
            ProcessingInput::new("s3://a/data".into(), "/opt/ml/processing/input/data").named("raw"),
            ProcessingInput::new("s3://a/other".into(), "/opt/ml/processing/input/other"),
        ]);
        assert_eq!(step.input_names(), vec!["input-1", "raw", "input-3"]);
    }

    #[test]
    fn test_output_destination_generated_from_job_name() {
        let step = ProcessingStep::new("Eval", processor(), &session())
            .with_outputs(vec![ProcessingOutput::new("metrics", "/opt/ml/processing/output/metrics/")]);
        assert_eq!(
            step.output_s3_uri(0).unwrap(),
            "s3://sagemaker-us-east-1-111122223333/sagemaker-scikit-learn-Eval-16000000000000000/output/metrics"
        );
        assert!(step.output_s3_uri(1).is_none());
    }

    #[test]
    fn test_steps_sharing_a_processor_get_distinct_job_names() {
        let first = ProcessingStep::new("Processing", processor(), &session());
        let second = ProcessingStep::new("EvaluateBERTModel", processor(), &session());
        assert_eq!(first.job_name(), "sagemaker-scikit-learn-Processing-16000000000000000");
        assert_eq!(second.job_name(), "sagemaker-scikit-learn-EvaluateBERTModel-16000000000000000");
    }

    #[test]
    fn test_output_property_path() {
        let step = ProcessingStep::new("Processing", processor(), &session());
        assert_eq!(
            step.output_property("bert-train").to_definition(),
            json!({ "Get": "Steps.Processing.ProcessingOutputConfig.Outputs['bert-train'].S3Output.S3Uri" })
        );
    }

    #[test]
    fn test_arguments_include_code_input_and_entrypoint() {
        let step = ProcessingStep::new("Eval", processor(), &session())
            .with_code("/work/scripts/evaluate_model_metrics.py")
            .with_job_arguments(["--max-seq-length", "64"]);
        let args = step.arguments();

        let inputs = args["ProcessingInputs"].as_array().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0]["InputName"], "code");
        assert!(inputs[0]["S3Input"]["S3Uri"]
            .as_str()
            .unwrap()
            .ends_with("/input/code/evaluate_model_metrics.py"));

        assert_eq!(
            args["AppSpecification"]["ContainerEntrypoint"],
            json!(["python3", "/opt/ml/processing/input/code/evaluate_model_metrics.py"])
        );
        assert_eq!(
            args["AppSpecification"]["ContainerArguments"],
            json!(["--max-seq-length", "64"])
        );
        assert_eq!(args["StoppingCondition"]["MaxRuntimeInSeconds"], 7200);
    }

    #[test]
    fn test_property_files_only_rendered_when_declared() {
        let plain = ProcessingStep::new("A", processor(), &session()).to_definition();
        assert!(plain.get("PropertyFiles").is_none());

        let with_file = ProcessingStep::new("B", processor(), &session())
            .with_property_files(vec![PropertyFile::new("Report", "metrics", "evaluation.json")])
            .to_definition();
        assert_eq!(with_file["PropertyFiles"][0]["FilePath"], "evaluation.json");
    }
}
