use super::{topic, BusError, BusMessage, MessageHandler, MessageTransport, QoS, Subscription};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, Outgoing, Packet};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};


/// MQTT broker connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Generated as `device-tracker-<uuid>` when not set
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_host() -> String {
    std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string())
}

fn default_port() -> u16 {
    std::env::var("MQTT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1883)
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_clean_session() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: None,
            keep_alive_secs: default_keep_alive_secs(),
            username: None,
            password: None,
            clean_session: default_clean_session(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl MqttConfig {
    fn client_id(&self) -> String {
        self.client_id
            .clone()
            .unwrap_or_else(|| format!("device-tracker-{}", uuid::Uuid::new_v4().simple()))
    }

    fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id(), &self.host, self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        options.set_clean_session(self.clean_session);
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.clone().unwrap_or_default());
        }
        options
    }
}

impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl From<rumqttc::QoS> for QoS {
    fn from(qos: rumqttc::QoS) -> Self {
        match qos {
            rumqttc::QoS::AtMostOnce => QoS::AtMostOnce,
            rumqttc::QoS::AtLeastOnce => QoS::AtLeastOnce,
            rumqttc::QoS::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

type SharedSubscriptions = Arc<RwLock<Vec<Subscription>>>;

/// Upper bound on waiting for DISCONNECT to reach the broker
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport backed by an MQTT broker connection
pub struct MqttTransport {
    client: AsyncClient,
    subscriptions: SharedSubscriptions,
    connected: Arc<AtomicBool>,
    event_loop_task: JoinHandle<()>,
}

impl MqttTransport {
    /// Start the MQTT client.
    ///
    /// Returns immediately; the connection is established (and re-established)
    /// by a background task. Subscriptions are re-issued on every connect.
    pub fn connect(config: &MqttConfig) -> Self {
        info!(host = %config.host, port = config.port, "Connecting to MQTT broker");

        let (client, event_loop) = AsyncClient::new(config.mqtt_options(), config.queue_capacity);
        let subscriptions: SharedSubscriptions = Arc::new(RwLock::new(Vec::new()));
        let connected = Arc::new(AtomicBool::new(false));

        let event_loop_task = tokio::spawn(Self::event_loop(
            event_loop,
            client.clone(),
            Arc::clone(&subscriptions),
            Arc::clone(&connected),
        ));

        Self {
            client,
            subscriptions,
            connected,
            event_loop_task,
        }
    }

    /// Whether the broker acknowledged the current connection
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Disconnect from the broker and stop the event loop.
    ///
    /// The event loop exits once DISCONNECT has been written; it is aborted
    /// if that takes longer than two seconds.
    pub async fn disconnect(self) {
        let mut event_loop_task = self.event_loop_task;

        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "Failed to send MQTT disconnect");
            event_loop_task.abort();
            return;
        }

        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut event_loop_task)
            .await
            .is_err()
        {
            warn!("MQTT event loop did not stop after disconnect, aborting");
            event_loop_task.abort();
        }
    }

    async fn event_loop(
        mut event_loop: EventLoop,
        client: AsyncClient,
        subscriptions: SharedSubscriptions,
        connected: Arc<AtomicBool>,
    ) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                    connected.store(true, Ordering::SeqCst);
                    Self::resubscribe(&client, &subscriptions);
                }

                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let message = BusMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                        qos: publish.qos.into(),
                        retain: publish.retain,
                    };
                    Self::dispatch(&subscriptions, &message);
                }

                Ok(Event::Incoming(Incoming::Disconnect))
                | Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    info!("MQTT connection closed");
                    connected.store(false, Ordering::SeqCst);
                    break;
                }

                Ok(_) => {}

                Err(e) => {
                    connected.store(false, Ordering::SeqCst);
                    error!(error = %e, "MQTT connection error, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    fn resubscribe(client: &AsyncClient, subscriptions: &SharedSubscriptions) {
        let subscriptions = subscriptions.read().unwrap_or_else(|e| e.into_inner());
        for subscription in subscriptions.iter() {
            // Non-blocking: the request queue is drained by this very event loop
            if let Err(e) = client.try_subscribe(&subscription.filter, subscription.qos.into()) {
                error!(filter = %subscription.filter, error = %e, "Failed to re-subscribe");
            }
        }
    }

    fn dispatch(subscriptions: &SharedSubscriptions, message: &BusMessage) {
        let handlers: Vec<MessageHandler> = subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.matches(&message.topic))
            .map(|s| s.handler.clone())
            .collect();

        if handlers.is_empty() {
            debug!(topic = %message.topic, "No handler for MQTT message");
        }

        for handler in handlers {
            handler(message);
        }
    }
}

#[async_trait]
impl MessageTransport for MqttTransport {
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

        // Otherwise issued by the event loop on the next ConnAck
        if self.is_connected() {
            self.client.subscribe(filter, qos.into()).await?;
        }

        debug!(filter = %filter, qos = %qos, "Subscribed");
        Ok(())
    }

    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        topic::validate_publish_topic(&message.topic)?;
        self.client
            .publish(
                message.topic,
                message.qos.into(),
                message.retain,
                message.payload,
            )
            .await?;
        Ok(())
    }
}
