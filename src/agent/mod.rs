//! Review workers and the backends they run on.
//!
//! This module provides the uniform worker adapter, its prompts, and the
//! injectable text-generation backend.

pub mod backend;
pub mod prompts;
pub mod worker;

pub use backend::{Backend, OllamaBackend, OllamaConfig};
pub use worker::{WorkerAdapter, WorkerKind};
