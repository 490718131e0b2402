//! Pipeline domain model

use crate::core::{
    parameter::Parameter,
    step::Step,
    value::{ExecutionVariable, PipelineValue},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Definition format version understood by the orchestrator
pub const DEFINITION_VERSION: &str = "2020-12-01";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Duplicate parameter name: {0}")]
    DuplicateParameter(String),

    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),

    #[error("Condition '{condition}' reads property file '{property_file}' that step '{step}' does not declare")]
    UndeclaredPropertyFile {
        condition: String,
        step: String,
        property_file: String,
    },
}

/// A structural defect carried by a definition
///
/// These are reported instead of being corrected so that the submitted
/// definition matches the workflow as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KnownIssue {
    /// Job argument taken from a parameter default; overrides never reach the job
    DefaultInlinedArgument { step: String, parameter: String },
    /// Percentages that are not checked to sum to one
    UnvalidatedSplit { parameters: Vec<String> },
    /// Identifier that was undefined where it was used
    UnresolvedReference { identifier: String, resolved_to: String },
    /// Step reachable only from inside a condition branch
    BranchOnlyStep { condition: String, step: String },
    /// Model metrics built but not attached to the registration step
    UnattachedModelMetrics { step: String },
    /// Property file that breaks execution-listing deserialization
    PropertyFileDeserialization { step: String, property_file: String },
}

impl fmt::Display for KnownIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownIssue::DefaultInlinedArgument { step, parameter } => write!(
                f,
                "step '{}' passes the default of '{}' as a job argument; overrides are ignored",
                step, parameter
            ),
            KnownIssue::UnvalidatedSplit { parameters } => write!(
                f,
                "split parameters {} are not checked to sum to 1",
                parameters.join(", ")
            ),
            KnownIssue::UnresolvedReference { identifier, resolved_to } => write!(
                f,
                "'{}' was undefined where used; bound to {}",
                identifier, resolved_to
            ),
            KnownIssue::BranchOnlyStep { condition, step } => write!(
                f,
                "step '{}' is not in the top-level step list; only '{}' references it",
                step, condition
            ),
            KnownIssue::UnattachedModelMetrics { step } => {
                write!(f, "model metrics are not attached to step '{}'", step)
            }
            KnownIssue::PropertyFileDeserialization { step, property_file } => write!(
                f,
                "property file '{}' on step '{}' breaks execution listing deserialization",
                property_file, step
            ),
        }
    }
}

/// Experiment and trial names recorded for each execution
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub experiment_name: PipelineValue,
    pub trial_name: PipelineValue,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            experiment_name: PipelineValue::Execution(ExecutionVariable::PipelineName),
            trial_name: PipelineValue::Execution(ExecutionVariable::PipelineExecutionId),
        }
    }
}

/// A named aggregate of parameters and top-level steps
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub steps: Vec<Step>,
    pub experiment_config: ExperimentConfig,
    known_issues: Vec<KnownIssue>,
}

impl Pipeline {
    /// Assemble a pipeline, rejecting duplicate parameter or step names and
    /// conditions that read undeclared property files
    ///
    /// Step ordering is left for the orchestrator to check.
    pub fn new(
        name: &str,
        parameters: Vec<Parameter>,
        steps: Vec<Step>,
    ) -> Result<Self, DefinitionError> {
        let mut seen = HashSet::new();
        for param in &parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(DefinitionError::DuplicateParameter(param.name.clone()));
            }
        }

        let mut seen = HashSet::new();
        let mut all_steps = Vec::new();
        let mut stack: Vec<&Step> = steps.iter().collect();
        while let Some(step) = stack.pop() {
            if !seen.insert(step.name()) {
                return Err(DefinitionError::DuplicateStep(step.name().to_string()));
            }
            stack.extend(step.nested_steps());
            all_steps.push(step);
        }

        for condition in all_steps.iter().filter_map(|step| step.as_condition()) {
            for get in condition.json_gets() {
                let declared = all_steps
                    .iter()
                    .filter(|step| step.name() == get.step)
                    .filter_map(|step| step.as_processing())
                    .any(|step| step.property_files.iter().any(|f| f.name == get.property_file));
                if !declared {
                    return Err(DefinitionError::UndeclaredPropertyFile {
                        condition: condition.name.clone(),
                        step: get.step.clone(),
                        property_file: get.property_file.clone(),
                    });
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            parameters,
            steps,
            experiment_config: ExperimentConfig::default(),
            known_issues: Vec::new(),
        })
    }

    pub fn with_known_issues(mut self, issues: Vec<KnownIssue>) -> Self {
        self.known_issues = issues;
        self
    }

    /// Known issues recorded at build time plus those found by `lint`
    pub fn known_issues(&self) -> Vec<KnownIssue> {
        let mut issues = self.known_issues.clone();
        for issue in self.lint() {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
        issues
    }

    /// Report steps that only exist inside condition branches
    pub fn lint(&self) -> Vec<KnownIssue> {
        let top_level: HashSet<&str> = self.steps.iter().map(Step::name).collect();
        let mut issues = Vec::new();
        for step in &self.steps {
            for nested in step.nested_steps() {
                if !top_level.contains(nested.name()) {
                    issues.push(KnownIssue::BranchOnlyStep {
                        condition: step.name().to_string(),
                        step: nested.name().to_string(),
                    });
                }
            }
        }
        issues
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// Top-level step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name() == name)
    }

    /// Step by name, searching condition branches too
    pub fn find_step(&self, name: &str) -> Option<&Step> {
        let mut stack: Vec<&Step> = self.steps.iter().collect();
        while let Some(step) = stack.pop() {
            if step.name() == name {
                return Some(step);
            }
            stack.extend(step.nested_steps());
        }
        None
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(Step::name).collect()
    }

    /// Render the pipeline definition document
    pub fn definition(&self) -> Value {
        let parameters: Vec<Value> = self.parameters.iter().map(Parameter::to_definition).collect();
        let steps: Vec<Value> = self.steps.iter().map(Step::to_definition).collect();
        json!({
            "Version": DEFINITION_VERSION,
            "Metadata": {},
            "Parameters": parameters,
            "PipelineExperimentConfig": {
                "ExperimentName": self.experiment_config.experiment_name.to_definition(),
                "TrialName": self.experiment_config.trial_name.to_definition(),
            },
            "Steps": steps,
        })
    }

    pub fn definition_json(&self, pretty: bool) -> serde_json::Result<String> {
        let definition = self.definition();
        if pretty {
            serde_json::to_string_pretty(&definition)
        } else {
            serde_json::to_string(&definition)
        }
    }
}
