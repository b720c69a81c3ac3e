//! Review pipeline orchestration and progress streaming.

pub mod coordinator;
pub mod progress;

pub use coordinator::{Coordinator, PipelineError};
pub use progress::StreamMessage;
