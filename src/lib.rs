//! bert-pipeline - Builds the SageMaker pipeline definition for the BERT reviews workflow

pub mod cli;
pub mod core;
pub mod workflow;

// Re-export commonly used types
pub use core::{Parameter, Pipeline, PipelineValue, Session, Step, StepKind, KnownIssue};
pub use core::config::BuilderConfig;
pub use workflow::{get_pipeline, BuildError, PipelineArgs};
