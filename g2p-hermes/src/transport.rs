//! MQTT transport adapter
//!
//! Owns the rumqttc event loop: inbound publishes are delivered on an mpsc
//! channel, outbound messages go through [`Publisher`], and connection
//! errors are retried with bounded backoff. The subscription is re-issued
//! on every (re)connect, so the rest of the service sees a reliable
//! pub/sub substrate.

use async_trait::async_trait;
use g2p_common::config::MqttConfig;
use g2p_common::{topic, Error, Result};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Inbound message from the broker.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Outgoing-publish seam.
///
/// Implemented by the MQTT client in production and by capture stubs in
/// tests, so the service core never touches rumqttc directly.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}

/// MQTT-backed publisher.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        debug!(topic, bytes = payload.len(), "Publishing message");
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

/// Connect to the broker and spawn the event-loop task.
///
/// Returns the publisher half and the stream of inbound messages. The
/// event-loop task runs until the receiver is dropped.
pub fn connect(config: &MqttConfig) -> (MqttPublisher, mpsc::Receiver<InboundMessage>) {
    let client_id = format!("g2p-hermes-{}", std::process::id());
    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(30));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }

    let (client, event_loop) = AsyncClient::new(options, 16);
    let (tx, rx) = mpsc::channel(64);

    let loop_client = client.clone();
    tokio::spawn(async move {
        run_event_loop(event_loop, loop_client, tx).await;
    });

    (MqttPublisher { client }, rx)
}

/// Drive the connection: forward publishes, resubscribe on reconnect,
/// back off on errors.
async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    tx: mpsc::Sender<InboundMessage>,
) {
    const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
    const MAX_BACKOFF: Duration = Duration::from_secs(30);

    let mut backoff = INITIAL_BACKOFF;

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker");
                backoff = INITIAL_BACKOFF;
                if let Err(error) = client.subscribe(topic::PRONOUNCE_FILTER, QoS::AtLeastOnce).await
                {
                    warn!(%error, filter = topic::PRONOUNCE_FILTER, "Subscribe failed");
                } else {
                    debug!(filter = topic::PRONOUNCE_FILTER, "Subscribed");
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "Received message"
                );
                let message = InboundMessage {
                    topic: publish.topic.clone(),
                    payload: publish.payload.to_vec(),
                };
                if tx.send(message).await.is_err() {
                    // Receiver dropped: the service is shutting down.
                    return;
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!(
                    %error,
                    retry_in_secs = backoff.as_secs(),
                    "MQTT connection error, reconnecting"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}
