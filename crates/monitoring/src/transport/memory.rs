//! In-process transport used by tests and single-node deployments.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::{Message, MessageHandler, Transport};
use crate::error::TransportError;

#[derive(Default)]
struct TransportState {
    subscriptions: HashMap<String, MessageHandler>,
    published: Vec<Message>,
    disconnected: bool,
}

/// In-memory transport.
///
/// Messages are delivered to the subscriber on the publishing task before
/// `publish` returns. Every published message is also kept in a log.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<RwLock<TransportState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a lost broker connection for every subsequent call.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .disconnected = disconnected;
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .contains_key(topic)
    }

    /// Payloads published on `topic`, oldest first.
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .iter()
            .filter(|message| message.topic == topic)
            .map(|message| message.payload.clone())
            .collect()
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .disconnected
        {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let message = Message {
            topic: topic.to_string(),
            payload,
        };
        let handler = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.disconnected {
                return Err(TransportError::Disconnected);
            }
            state.published.push(message.clone());
            state.subscriptions.get(topic).cloned()
        };

        if let Some(handler) = handler {
            handler(message).await;
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.ensure_connected()?;
        tracing::debug!(topic, "subscribed");
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .insert(topic.to_string(), handler);
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        let removed = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .remove(topic);
        match removed {
            Some(_) => {
                tracing::debug!(topic, "unsubscribed");
                Ok(())
            }
            None => Err(TransportError::NotSubscribed(topic.to_string())),
        }
    }
}
