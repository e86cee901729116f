//! Publish/subscribe transport connecting drones to the monitoring service.

mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::TransportError;

pub use memory::InMemoryTransport;

/// A message received on or published to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Callback invoked once per message delivered on a subscribed topic.
pub type MessageHandler = Arc<dyn Fn(Message) -> BoxFuture<'static, ()> + Send + Sync>;

/// Topic-based message transport.
///
/// A topic has at most one subscription; subscribing again replaces the
/// previous handler.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError>;
}

/// Publishes `payload`, giving up after `budget`.
pub async fn publish_within(
    transport: &dyn Transport,
    topic: &str,
    payload: Vec<u8>,
    budget: Duration,
) -> Result<(), TransportError> {
    match tokio::time::timeout(budget, transport.publish(topic, payload)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(topic, ?budget, "publish timed out");
            Err(TransportError::TimedOut(budget))
        }
    }
}
