// Publish/subscribe transport used by the scanners

mod memory;
mod mqtt;
pub mod topic;

pub use memory::InMemoryBus;
pub use mqtt::{MqttConfig, MqttTransport};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;


/// Delivery guarantee requested for a subscription or a publish
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum QoS {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<i64> for QoS {
    type Error = InvalidQos;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(InvalidQos(other)),
        }
    }
}

impl From<QoS> for i64 {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Rejected QoS level
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid QoS level {0}: must be 0, 1 or 2")]
pub struct InvalidQos(pub i64);

/// A message travelling over the bus
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }

    /// Payload as text, replacing invalid UTF-8 sequences
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Callback invoked for every message matching a subscription
pub type MessageHandler = Arc<dyn Fn(&BusMessage) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("invalid topic '{topic}': {reason}")]
    InvalidTopic { topic: String, reason: &'static str },

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("bus is closed")]
    Closed,
}

/// Messaging transport a scanner subscribes through.
///
/// Handlers are called in arrival order for a given topic. Implementations
/// must not reorder messages published on the same topic.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Register `handler` for every message whose topic matches `filter`.
    async fn subscribe(
        &self,
        filter: &str,
        qos: QoS,
        handler: MessageHandler,
    ) -> Result<(), BusError>;

    /// Publish a message on the bus
    async fn publish(&self, message: BusMessage) -> Result<(), BusError>;
}

/// A registered subscription, shared by the transports
#[derive(Clone)]
pub(crate) struct Subscription {
    pub filter: String,
    pub qos: QoS,
    pub handler: MessageHandler,
}

impl Subscription {
    pub fn matches(&self, topic: &str) -> bool {
        topic::matches(&self.filter, topic)
    }
}
