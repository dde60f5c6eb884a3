use async_trait::async_trait;

use crate::domain::QueueMessage;

/// Durable, at-least-once work queue between the dispatcher and the workers.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn publish(&self, message: &QueueMessage) -> Result<(), QueueError>;

    /// Waits for the next delivery. `None` means the queue was closed.
    async fn receive(&self) -> Result<Option<Delivery>, QueueError>;
}

/// How a delivery leaves the consumer's hands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    Requeue,
    DeadLetter(String),
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Settlement::Ack => "ack",
            Settlement::Requeue => "requeue",
            Settlement::DeadLetter(_) => "dead_letter",
        }
    }
}

/// Transport-specific half of a delivery.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    async fn settle(&self, settlement: Settlement) -> Result<(), QueueError>;
}

/// One received message. Settling consumes it, so each delivery is settled at most once.
pub struct Delivery {
    pub body: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_count: u32,
    acknowledger: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, delivery_count: u32, acknowledger: Box<dyn Acknowledger>) -> Self {
        Self {
            body,
            delivery_count,
            acknowledger,
        }
    }

    pub async fn settle(self, settlement: Settlement) -> Result<(), QueueError> {
        self.acknowledger.settle(settlement).await
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("body_len", &self.body.len())
            .field("delivery_count", &self.delivery_count)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("settlement failed: {0}")]
    SettleFailed(String),
    #[error("queue closed")]
    Closed,
}
