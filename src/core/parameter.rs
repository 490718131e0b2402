//! Pipeline parameters

use crate::core::value::PipelineValue;
use serde_json::{json, Value};
use std::fmt;

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
    Float,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "String",
            ParameterType::Integer => "Integer",
            ParameterType::Float => "Float",
        }
    }
}

/// Default value of a parameter; its variant fixes the parameter type
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterDefault {
    String(String),
    Integer(i64),
    Float(f64),
}

impl ParameterDefault {
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterDefault::String(_) => ParameterType::String,
            ParameterDefault::Integer(_) => ParameterType::Integer,
            ParameterDefault::Float(_) => ParameterType::Float,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ParameterDefault::String(s) => json!(s),
            ParameterDefault::Integer(i) => json!(i),
            ParameterDefault::Float(f) => json!(f),
        }
    }
}

/// Rendered the way the step scripts receive it on the command line
impl fmt::Display for ParameterDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterDefault::String(s) => write!(f, "{}", s),
            ParameterDefault::Integer(i) => write!(f, "{}", i),
            ParameterDefault::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{:.1}", v),
            ParameterDefault::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A named, typed, defaulted pipeline input that can be overridden at submission
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: ParameterDefault,
}

impl Parameter {
    pub fn string(name: &str, default: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            default: ParameterDefault::String(default.into()),
        }
    }

    pub fn integer(name: &str, default: i64) -> Self {
        Self {
            name: name.to_string(),
            default: ParameterDefault::Integer(default),
        }
    }

    pub fn float(name: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            default: ParameterDefault::Float(default),
        }
    }

    pub fn parameter_type(&self) -> ParameterType {
        self.default.parameter_type()
    }

    pub fn default_value(&self) -> &ParameterDefault {
        &self.default
    }

    /// Runtime reference to this parameter
    pub fn reference(&self) -> PipelineValue {
        PipelineValue::Parameter(self.name.clone())
    }

    pub fn to_definition(&self) -> Value {
        json!({
            "Name": self.name,
            "Type": self.parameter_type().as_str(),
            "DefaultValue": self.default.to_json(),
        })
    }
}
