//! Pipeline assembly
//!
//! ```text
//!                                                  . -RegisterModel
//!                                                 .
//!     Process-> Train -> (Evaluate -> Condition) .
//!                                                 .
//!                                                  . -(stop)
//! ```

pub mod bert;

pub use bert::{get_pipeline, BuildError, PipelineArgs};
