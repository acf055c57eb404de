//! Consumes `{pipeline, context}` work items from a pipeline queue and runs
//! them through the pipeline executor. Messages are acknowledged regardless
//! of execution outcome; failures are observable through logs and whatever
//! side effects the pipeline performed.

use crate::error::ServerResult;
use futures::StreamExt;
use pocsync_broker::{Delivery, MessageBroker};
use pocsync_core::{PipelineExecutor, WorkItem};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Worker pool consuming one pipeline queue.
pub struct PipelineConsumer {
    broker: Arc<dyn MessageBroker>,
    executor: Arc<PipelineExecutor>,
    queue: String,
    concurrency: usize,
    prefetch: u16,
}

impl PipelineConsumer {
    /// Create a pipeline consumer for one queue.
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        executor: Arc<PipelineExecutor>,
        queue: impl Into<String>,
        concurrency: usize,
        prefetch: u16,
    ) -> Self {
        Self {
            broker,
            executor,
            queue: queue.into(),
            concurrency,
            prefetch,
        }
    }

    /// Consume until the subscription ends. Pipelines run to completion on
    /// the worker task that pulled them.
    pub async fn run(self: Arc<Self>) -> ServerResult<()> {
        let mut deliveries = self.broker.subscribe(&self.queue, self.prefetch).await?;
        let pool = Arc::new(Semaphore::new(self.concurrency));
        info!(queue = %self.queue, concurrency = self.concurrency, "pipeline consumer started");

        while let Some(delivery) = deliveries.next().await {
            let Ok(permit) = pool.clone().acquire_owned().await else {
                break;
            };
            let consumer = self.clone();
            tokio::spawn(async move {
                consumer.handle_delivery(delivery).await;
                drop(permit);
            });
        }

        info!(queue = %self.queue, "pipeline consumer stopped");
        Ok(())
    }

    async fn handle_delivery(&self, delivery: Delivery) {
        let item: WorkItem = match serde_json::from_slice(delivery.payload()) {
            Ok(item) => item,
            Err(err) => {
                warn!(queue = %self.queue, error = %err, "discarding malformed work item");
                if let Err(err) = delivery.reject().await {
                    warn!(error = %err, "failed to reject malformed work item");
                }
                return;
            }
        };

        let context = item.context.to_value();
        let record = self.executor.execute(&item.pipeline, context).await;

        let summary = Value::Object(record.summary());
        if record.is_success() {
            info!(queue = %self.queue, %summary, "pipeline execution finished");
        } else {
            warn!(
                queue = %self.queue,
                %summary,
                error = record.error.as_deref().unwrap_or("unknown"),
                "pipeline execution failed"
            );
        }

        // on_failure = ack: execution failures never loop back through the
        // broker.
        if let Err(err) = delivery.ack().await {
            warn!(error = %err, "failed to ack work item");
        }
    }
}
