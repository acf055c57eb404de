//!
//! Pocsync Core - Core runtime for the Pocsync webhook automation platform
//!
//! This crate defines the pipeline model, the event matcher and router, the
//! integration registry, and the step and pipeline executors. It is the
//! foundation for all other crates in the platform.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Domain layer - pipelines, steps, events, execution records
pub mod domain;

/// Step and pipeline executors
pub mod executor;

/// Structural event/pattern matcher
pub mod matcher;

/// Integration and action registry
pub mod registry;

/// First-match event router
pub mod router;

/// Core value types and helpers
pub mod types;

/// Error types
pub mod error;

// Re-export key types
pub use domain::directory::{InMemoryPipelineDirectory, PipelineDirectory};
pub use domain::event::{Event, WorkItem};
pub use domain::execution::{ExecutionRecord, ExecutionStatus, StepResult};
pub use domain::pipeline::{generate_step_id, Pipeline, PipelineStatus, Step, StepType};
pub use error::CoreError;
pub use executor::pipeline::{CancellationFlag, PipelineExecutor};
pub use executor::step::StepExecutor;
pub use matcher::{matches, matches_pattern};
pub use registry::{ActionDefinition, Integration, IntegrationRegistry, IntegrationSummary};
pub use router::{EventRouter, RouteRule};
pub use types::JsonMap;

/// The single shape every action conforms to: one input map in, one output
/// map (or an error) out.
///
/// Handlers are registered at startup and invoked by name at runtime; they
/// must be safe to call concurrently from many worker tasks.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Invoke the action with the assembled input.
    ///
    /// A well-behaved action returns `Ok` with a JSON object; any other
    /// `Ok` shape is treated as a failure by the step executor.
    async fn call(&self, input: Value) -> Result<Value, CoreError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(Value) -> Result<Value, CoreError> + Send + Sync,
{
    async fn call(&self, input: Value) -> Result<Value, CoreError> {
        (self.0)(input)
    }
}

/// Wrap a synchronous closure as an [`ActionHandler`].
///
/// Convenient for field transforms and test actions that need no I/O.
pub fn handler_fn<F>(f: F) -> Arc<dyn ActionHandler>
where
    F: Fn(Value) -> Result<Value, CoreError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}
