//! Values that can appear in step arguments

use serde_json::{json, Value};
use std::fmt;

/// A value slot inside a step definition
///
/// Literals are rendered as-is. Everything else is a reference that the
/// orchestrator resolves when the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineValue {
    /// Literal JSON value
    Literal(Value),
    /// Reference to a pipeline parameter by name
    Parameter(String),
    /// Reference to a property of a previously declared step
    StepProperty { step: String, path: String },
    /// Execution variable such as `PipelineName`
    Execution(ExecutionVariable),
    /// Value read from a step's property file at runtime
    JsonGet(JsonGet),
}

/// Execution variables exposed by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionVariable {
    PipelineName,
    PipelineExecutionId,
}

impl ExecutionVariable {
    fn as_str(&self) -> &'static str {
        match self {
            ExecutionVariable::PipelineName => "PipelineName",
            ExecutionVariable::PipelineExecutionId => "PipelineExecutionId",
        }
    }
}

/// Lookup of a JSON path inside a step's property file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonGet {
    /// Step producing the property file
    pub step: String,
    /// Name of the property file declared on that step
    pub property_file: String,
    /// Dotted path into the JSON document
    pub json_path: String,
}

impl JsonGet {
    pub fn new(step: &str, property_file: &str, json_path: &str) -> Self {
        Self {
            step: step.to_string(),
            property_file: property_file.to_string(),
            json_path: json_path.to_string(),
        }
    }

    pub fn to_definition(&self) -> Value {
        json!({
            "Std:JsonGet": {
                "PropertyFile": {
                    "Get": format!("Steps.{}.PropertyFiles.{}", self.step, self.property_file)
                },
                "Path": self.json_path,
            }
        })
    }
}

impl PipelineValue {
    /// Build a literal string value
    pub fn string(value: impl Into<String>) -> Self {
        PipelineValue::Literal(Value::String(value.into()))
    }

    /// Build a step property reference
    pub fn step_property(step: &str, path: impl Into<String>) -> Self {
        PipelineValue::StepProperty {
            step: step.to_string(),
            path: path.into(),
        }
    }

    /// Render the value in pipeline definition form
    pub fn to_definition(&self) -> Value {
        match self {
            PipelineValue::Literal(value) => value.clone(),
            PipelineValue::Parameter(name) => json!({ "Get": format!("Parameters.{}", name) }),
            PipelineValue::StepProperty { step, path } => {
                json!({ "Get": format!("Steps.{}.{}", step, path) })
            }
            PipelineValue::Execution(var) => {
                json!({ "Get": format!("Execution.{}", var.as_str()) })
            }
            PipelineValue::JsonGet(get) => get.to_definition(),
        }
    }

    /// Literal string content, if this is a literal string
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            PipelineValue::Literal(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineValue::Literal(Value::String(s)) => write!(f, "{}", s),
            PipelineValue::Literal(value) => write!(f, "{}", value),
            PipelineValue::Parameter(name) => write!(f, "Parameters.{}", name),
            PipelineValue::StepProperty { step, path } => write!(f, "Steps.{}.{}", step, path),
            PipelineValue::Execution(var) => write!(f, "Execution.{}", var.as_str()),
            PipelineValue::JsonGet(get) => write!(
                f,
                "JsonGet({}.{}, {})",
                get.step, get.property_file, get.json_path
            ),
        }
    }
}

impl From<&str> for PipelineValue {
    fn from(value: &str) -> Self {
        PipelineValue::string(value)
    }
}

impl From<String> for PipelineValue {
    fn from(value: String) -> Self {
        PipelineValue::Literal(Value::String(value))
    }
}

impl From<i64> for PipelineValue {
    fn from(value: i64) -> Self {
        PipelineValue::Literal(json!(value))
    }
}

impl From<f64> for PipelineValue {
    fn from(value: f64) -> Self {
        PipelineValue::Literal(json!(value))
    }
}

impl From<bool> for PipelineValue {
    fn from(value: bool) -> Self {
        PipelineValue::Literal(Value::Bool(value))
    }
}
