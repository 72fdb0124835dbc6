pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ConsumerTag, Delivery, DeliveryTag, LaneResult};

/// Where and as whom to reach the message broker.
///
/// The core never interprets these values; they are handed to the broker
/// implementation when it connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub user: String,
    pub host: String,
}

impl BrokerConfig {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
        }
    }

    /// AMQP connection URL for this configuration
    pub fn url(&self) -> String {
        format!("amqp://{}@{}//", self.user, self.host)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new("guest", "localhost")
    }
}

/// Connection handle to a message broker with named queues.
///
/// Delivery is at-least-once: a consumed message stays in flight until it is
/// acked. Rejecting it, or losing its consumer, puts it back on its queue
/// marked as redelivered.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append a message to a queue
    async fn publish(&self, queue: &str, body: Vec<u8>) -> LaneResult<()>;

    /// Take the next message from a queue, waiting until one is available
    async fn consume(&self, queue: &str, consumer: &ConsumerTag) -> LaneResult<Delivery>;

    /// Acknowledge a delivery; the message is gone for good
    async fn ack(&self, tag: DeliveryTag) -> LaneResult<()>;

    /// Reject a delivery, optionally putting the message back on its queue
    async fn reject(&self, tag: DeliveryTag, requeue: bool) -> LaneResult<()>;

    /// Requeue every unacked delivery held by a lost consumer.
    ///
    /// Returns how many messages were requeued.
    async fn recover(&self, consumer: &ConsumerTag) -> LaneResult<usize>;

    /// Close the connection; blocked consumers return `Disconnected`
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;
}
