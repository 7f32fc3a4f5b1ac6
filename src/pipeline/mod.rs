//! The decision pipeline and its batch runner.

pub mod processor;
pub mod runner;
pub mod types;

pub use processor::{DecisionPipeline, PipelineSettings};
pub use runner::BatchRunner;
pub use types::{Disposition, Message, MessageRef};
