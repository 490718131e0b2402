//! Core domain models for pipeline definitions
//!
//! This module defines the descriptors a pipeline is assembled from:
//! parameters, steps, conditions and the pipeline aggregate itself.

pub mod condition;
pub mod config;
pub mod image_uri;
pub mod parameter;
pub mod pipeline;
pub mod processing;
pub mod property;
pub mod register;
pub mod session;
pub mod step;
pub mod training;
pub mod value;

pub use condition::{Branch, Comparison, Condition, ConditionError, ConditionStep};
pub use parameter::{Parameter, ParameterDefault, ParameterType};
pub use pipeline::{DefinitionError, KnownIssue, Pipeline};
pub use session::Session;
pub use step::{Step, StepKind};
pub use value::{JsonGet, PipelineValue};
