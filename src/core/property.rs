//! Property files declared on processing steps

use serde_json::{json, Value};

/// A JSON artifact written by a step whose contents conditions can read
///
/// The orchestrator fails to deserialize execution listings for pipelines
/// that declare property files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFile {
    pub name: String,
    /// Processing output the file is written under
    pub output_name: String,
    /// Path relative to that output
    pub path: String,
}

impl PropertyFile {
    pub fn new(name: &str, output_name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            output_name: output_name.to_string(),
            path: path.to_string(),
        }
    }

    pub fn to_definition(&self) -> Value {
        json!({
            "PropertyFileName": self.name,
            "OutputName": self.output_name,
            "FilePath": self.path,
        })
    }
}
