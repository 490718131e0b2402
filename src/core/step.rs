//! Step domain model

use crate::core::{
    condition::ConditionStep,
    processing::ProcessingStep,
    register::RegisterModelStep,
    training::TrainingStep,
};
use serde_json::Value;
use std::fmt;

/// Kind of work a step declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Processing,
    Training,
    Condition,
    RegisterModel,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Processing => "Processing",
            StepKind::Training => "Training",
            StepKind::Condition => "Condition",
            StepKind::RegisterModel => "RegisterModel",
        };
        write!(f, "{}", name)
    }
}

/// A single declared unit of work in a pipeline
#[derive(Debug, Clone)]
pub enum Step {
    Processing(ProcessingStep),
    Training(TrainingStep),
    Condition(ConditionStep),
    RegisterModel(RegisterModelStep),
}

impl Step {
    pub fn name(&self) -> &str {
        match self {
            Step::Processing(step) => &step.name,
            Step::Training(step) => &step.name,
            Step::Condition(step) => &step.name,
            Step::RegisterModel(step) => &step.name,
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::Processing(_) => StepKind::Processing,
            Step::Training(_) => StepKind::Training,
            Step::Condition(_) => StepKind::Condition,
            Step::RegisterModel(_) => StepKind::RegisterModel,
        }
    }

    /// Steps nested inside this one (condition branches)
    pub fn nested_steps(&self) -> Vec<&Step> {
        match self {
            Step::Condition(step) => step.if_steps.iter().chain(&step.else_steps).collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_processing(&self) -> Option<&ProcessingStep> {
        match self {
            Step::Processing(step) => Some(step),
            _ => None,
        }
    }

    pub fn as_training(&self) -> Option<&TrainingStep> {
        match self {
            Step::Training(step) => Some(step),
            _ => None,
        }
    }

    pub fn as_condition(&self) -> Option<&ConditionStep> {
        match self {
            Step::Condition(step) => Some(step),
            _ => None,
        }
    }

    pub fn as_register_model(&self) -> Option<&RegisterModelStep> {
        match self {
            Step::RegisterModel(step) => Some(step),
            _ => None,
        }
    }

    pub fn to_definition(&self) -> Value {
        match self {
            Step::Processing(step) => step.to_definition(),
            Step::Training(step) => step.to_definition(),
            Step::Condition(step) => step.to_definition(),
            Step::RegisterModel(step) => step.to_definition(),
        }
    }
}

impl From<ProcessingStep> for Step {
    fn from(step: ProcessingStep) -> Self {
        Step::Processing(step)
    }
}

impl From<TrainingStep> for Step {
    fn from(step: TrainingStep) -> Self {
        Step::Training(step)
    }
}

impl From<ConditionStep> for Step {
    fn from(step: ConditionStep) -> Self {
        Step::Condition(step)
    }
}

impl From<RegisterModelStep> for Step {
    fn from(step: RegisterModelStep) -> Self {
        Step::RegisterModel(step)
    }
}
