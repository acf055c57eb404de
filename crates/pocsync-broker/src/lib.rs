//! Pocsync Broker
//!
//! Provides the message-broker port the consumers and ingress publish
//! through, plus two backends: an in-memory broker for tests and
//! development, and an AMQP 0-9-1 broker for production.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

pub mod amqp;
pub mod memory;

pub use amqp::AmqpBroker;
pub use memory::InMemoryBroker;

/// Errors that can occur during broker operations
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Broker connection error: {0}")]
    ConnectionError(String),

    #[error("Publish error: {0}")]
    PublishError(String),

    #[error("Consume error: {0}")]
    ConsumeError(String),

    #[error("Acknowledge error: {0}")]
    AckError(String),
}

impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        BrokerError::ConnectionError(err.to_string())
    }
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Stream of deliveries handed to a consumer
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Delivery> + Send>>;

/// Backend-specific acknowledgement handle carried by a [`Delivery`].
#[async_trait]
pub trait DeliveryAck: Send {
    /// Acknowledge the message.
    async fn ack(self: Box<Self>) -> BrokerResult<()>;

    /// Mark the message failed without requeueing it.
    async fn reject(self: Box<Self>) -> BrokerResult<()>;
}

/// One message pulled from a queue, with its acknowledgement handle.
pub struct Delivery {
    payload: Vec<u8>,
    ack: Box<dyn DeliveryAck>,
}

impl Delivery {
    /// Create a delivery from a payload and an acknowledgement handle.
    pub fn new(payload: Vec<u8>, ack: Box<dyn DeliveryAck>) -> Self {
        Self { payload, ack }
    }

    /// The raw message bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledge the message, consuming the delivery.
    pub async fn ack(self) -> BrokerResult<()> {
        self.ack.ack().await
    }

    /// Mark the message failed (no requeue), consuming the delivery.
    pub async fn reject(self) -> BrokerResult<()> {
        self.ack.reject().await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .finish_non_exhaustive()
    }
}

/// Trait defining the contract for message broker backends.
///
/// Messages are UTF-8 JSON; queues are created on demand. Delivery is
/// at-least-once: consumers must tolerate duplicates.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish one message to a queue.
    async fn publish(&self, queue: &str, payload: &[u8]) -> BrokerResult<()>;

    /// Subscribe to a queue with the given prefetch window.
    async fn subscribe(&self, queue: &str, prefetch: u16) -> BrokerResult<DeliveryStream>;
}
