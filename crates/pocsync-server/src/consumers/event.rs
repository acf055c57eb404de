//! Consumes raw events from the ingress queue, matches them against the
//! pipeline directory, and fans matching pipelines out to their route's
//! queue as `{pipeline, context}` work items.

use crate::error::ServerResult;
use futures::StreamExt;
use pocsync_broker::{Delivery, MessageBroker};
use pocsync_core::{matches_pattern, Event, EventRouter, PipelineDirectory, WorkItem};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Worker pool consuming the ingress queue.
pub struct EventConsumer {
    broker: Arc<dyn MessageBroker>,
    directory: Arc<dyn PipelineDirectory>,
    router: Arc<EventRouter>,
    queue: String,
    concurrency: usize,
    prefetch: u16,
}

impl EventConsumer {
    /// Create an event consumer.
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        directory: Arc<dyn PipelineDirectory>,
        router: Arc<EventRouter>,
        queue: impl Into<String>,
        concurrency: usize,
        prefetch: u16,
    ) -> Self {
        Self {
            broker,
            directory,
            router,
            queue: queue.into(),
            concurrency,
            prefetch,
        }
    }

    /// Consume until the subscription ends. Each message is handled on its
    /// own task; in-flight messages are bounded by the worker-pool size on
    /// top of the broker's prefetch window.
    pub async fn run(self: Arc<Self>) -> ServerResult<()> {
        let mut deliveries = self.broker.subscribe(&self.queue, self.prefetch).await?;
        let pool = Arc::new(Semaphore::new(self.concurrency));
        info!(queue = %self.queue, concurrency = self.concurrency, "event consumer started");

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

        info!(queue = %self.queue, "event consumer stopped");
        Ok(())
    }

    async fn handle_delivery(&self, delivery: Delivery) {
        let event: Event = match serde_json::from_slice(delivery.payload()) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, "discarding malformed event message");
                if let Err(err) = delivery.reject().await {
                    warn!(error = %err, "failed to reject malformed message");
                }
                return;
            }
        };
        let event_value = event.to_value();

        let pipelines = match self.directory.list_pipelines().await {
            Ok(pipelines) => pipelines,
            Err(err) => {
                error!(error = %err, "failed to list pipelines, dropping event");
                ack(delivery).await;
                return;
            }
        };
        let matching: Vec<_> = pipelines
            .into_iter()
            .filter(|pipeline| matches_pattern(&event_value, &pipeline.pattern))
            .collect();

        let queue = match self.router.route(&event_value) {
            Ok(queue) => queue.to_string(),
            Err(err) => {
                warn!(path = %event.path, error = %err, "no route for event, dropping");
                ack(delivery).await;
                return;
            }
        };

        debug!(
            path = %event.path,
            matched = matching.len(),
            target = %queue,
            "fanning out event"
        );

        for pipeline in matching {
            let pipeline_id = pipeline.id.clone();
            let item = WorkItem {
                pipeline,
                context: event.clone(),
            };
            let payload = match serde_json::to_vec(&item) {
                Ok(payload) => payload,
                Err(err) => {
                    error!(%pipeline_id, error = %err, "failed to encode work item");
                    continue;
                }
            };
            // Best effort per envelope; one failed publish must not block
            // the other matching pipelines.
            if let Err(err) = self.broker.publish(&queue, &payload).await {
                error!(%pipeline_id, target = %queue, error = %err, "failed to publish work item");
            }
        }

        ack(delivery).await;
    }
}

async fn ack(delivery: Delivery) {
    if let Err(err) = delivery.ack().await {
        warn!(error = %err, "failed to ack message");
    }
}
