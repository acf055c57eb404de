//! In-memory implementation of the broker port.
//!
//! Intended for tests and development. Messages published before a
//! subscriber attaches are buffered and delivered on subscription; every
//! publish is also journaled so tests can assert on traffic per queue.

use crate::{BrokerResult, Delivery, DeliveryAck, DeliveryStream, MessageBroker};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Default)]
struct QueueState {
    buffer: VecDeque<Vec<u8>>,
    subscriber: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

/// In-memory broker; all state is lost when the instance is dropped.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
    journal: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl InMemoryBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every payload published to `queue` so far, in publish order.
    pub async fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        self.journal
            .lock()
            .await
            .iter()
            .filter(|(name, _)| name == queue)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Total number of messages published across all queues.
    pub async fn published_count(&self) -> usize {
        self.journal.lock().await.len()
    }
}

struct NoopAck;

#[async_trait]
impl DeliveryAck for NoopAck {
    async fn ack(self: Box<Self>) -> BrokerResult<()> {
        Ok(())
    }

    async fn reject(self: Box<Self>) -> BrokerResult<()> {
        Ok(())
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(&self, queue: &str, payload: &[u8]) -> BrokerResult<()> {
        self.journal
            .lock()
            .await
            .push((queue.to_string(), payload.to_vec()));

        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.to_string()).or_default();
        match &state.subscriber {
            Some(sender) if sender.send(payload.to_vec()).is_ok() => {}
            _ => {
                state.subscriber = None;
                state.buffer.push_back(payload.to_vec());
            }
        }
        Ok(())
    }

    async fn subscribe(&self, queue: &str, _prefetch: u16) -> BrokerResult<DeliveryStream> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.to_string()).or_default();
        while let Some(buffered) = state.buffer.pop_front() {
            let _ = sender.send(buffered);
        }
        state.subscriber = Some(sender);

        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver
                .recv()
                .await
                .map(|payload| (Delivery::new(payload, Box::new(NoopAck)), receiver))
        });
        Ok(Box::pin(stream))
    }
}
