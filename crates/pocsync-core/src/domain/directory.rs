use crate::domain::pipeline::Pipeline;
use crate::CoreError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Read-only collection of the pipelines known to the platform.
///
/// Storage is implementation-defined; the core only ever enumerates.
#[async_trait]
pub trait PipelineDirectory: Send + Sync {
    /// Snapshot of every known pipeline.
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, CoreError>;
}

/// Directory backed by an in-memory list, seeded at startup.
#[derive(Debug, Default)]
pub struct InMemoryPipelineDirectory {
    pipelines: RwLock<Vec<Pipeline>>,
}

impl InMemoryPipelineDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory seeded with pipelines.
    pub fn with_pipelines(pipelines: Vec<Pipeline>) -> Self {
        Self {
            pipelines: RwLock::new(pipelines),
        }
    }

    /// Add a pipeline, replacing any existing one with the same id.
    pub async fn insert(&self, pipeline: Pipeline) {
        let mut pipelines = self.pipelines.write().await;
        pipelines.retain(|existing| existing.id != pipeline.id);
        pipelines.push(pipeline);
    }
}

#[async_trait]
impl PipelineDirectory for InMemoryPipelineDirectory {
    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, CoreError> {
        Ok(self.pipelines.read().await.clone())
    }
}
