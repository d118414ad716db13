use super::{topic, BusError, BusMessage, MessageHandler, MessageTransport, QoS, Subscription};
use async_trait::async_trait;
use std::sync::RwLock;
use tracing::debug;

/// In-process bus delivering messages synchronously to matching handlers.
///
/// Used by tests in place of a broker connection.
#[derive(Default)]
pub struct InMemoryBus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message as if it had arrived from the broker.
    ///
    /// Returns the number of handlers that received it.
    pub fn fire_message(&self, topic: &str, payload: impl Into<Vec<u8>>) -> usize {
        self.dispatch(&BusMessage::new(topic, payload))
    }

    /// Registered subscriptions as `(filter, qos)` pairs, in registration order
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|s| (s.filter.clone(), s.qos))
            .collect()
    }

    fn dispatch(&self, message: &BusMessage) -> usize {
        // Clone matching handlers so a handler may subscribe without deadlocking
        let handlers: Vec<MessageHandler> = self
            .subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.matches(&message.topic))
            .map(|s| s.handler.clone())
            .collect();

        debug!(
            topic = %message.topic,
            handlers = handlers.len(),
            "Dispatching in-memory message"
        );

        for handler in &handlers {
            handler(message);
        }

        handlers.len()
    }
}

#[async_trait]
impl MessageTransport for InMemoryBus {
    async fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        handler: MessageHandler,
    ) -> Result<(), BusError> {
        topic::validate_subscribe_topic(filter)?;

        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Subscription {
                filter: filter.to_string(),
                qos,
                handler,
            });

        Ok(())
    }

    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        topic::validate_publish_topic(&message.topic)?;
        self.dispatch(&message);
        Ok(())
    }
}
