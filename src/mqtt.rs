//! MQTT bridge: connection management, topics, and payload shapes.
//!
//! Every attached port publishes under `multi_serial/<slug>/`:
//!
//! - `status` (QoS 1, retained): connection state transitions
//! - `data` (QoS 0): one message per line read from the device
//!
//! With discovery enabled, a Home Assistant MQTT Discovery sensor
//! config is retained under `<prefix>/sensor/<slug>/last/config` so the
//! platform auto-creates an entity showing the last payload.

use crate::config::Settings;
use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Topic root for per-port status and data.
pub const TOPIC_PREFIX: &str = "multi_serial";

const DEFAULT_BROKER_HOST: &str = "homeassistant";
const DEFAULT_BROKER_PORT: u16 = 1883;

/// Errors surfaced by the MQTT layer.
#[derive(Debug, Error)]
pub enum MqttError {
    /// A publish could not be queued
    #[error("Failed to queue MQTT publish: {0}")]
    Publish(#[from] rumqttc::ClientError),

    /// Payload serialization failed
    #[error("Failed to serialize MQTT payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Retained per-port connection status.
#[derive(Debug, Clone, Serialize)]
pub struct StatusPayload {
    pub device: String,
    pub state: String,
    pub error: Option<String>,
    pub ts: String,
}

/// One line read from a device.
#[derive(Debug, Clone, Serialize)]
pub struct DataPayload {
    pub device: String,
    pub data: String,
    pub ts: String,
}

/// Home Assistant MQTT Discovery sensor configuration.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryConfig {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub value_template: String,
    pub json_attributes_topic: String,
    pub availability: Vec<Availability>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub topic: String,
    pub value_template: String,
}

/// Topic- and filesystem-safe identifier for a device path
/// (`/dev/ttyUSB0` -> `_dev_ttyUSB0`).
pub fn port_slug(device: &str) -> String {
    device.replace(['/', '\\'], "_")
}

/// Split a broker address into host and port.
///
/// Accepts `mqtt://host:port`, `tcp://host:port`, `host:port`, or a
/// bare host. An unparseable or missing port falls back to 1883; an
/// empty host falls back to `homeassistant`.
pub fn parse_broker(broker: &str) -> (String, u16) {
    let stripped = broker
        .strip_prefix("mqtt://")
        .or_else(|| broker.strip_prefix("tcp://"))
        .unwrap_or(broker);

    let (host, port) = match stripped.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str.parse().unwrap_or_else(|_| {
                warn!("Invalid broker port '{port_str}'; using {DEFAULT_BROKER_PORT}");
                DEFAULT_BROKER_PORT
            });
            (host, port)
        }
        None => (stripped, DEFAULT_BROKER_PORT),
    };

    let host = if host.is_empty() {
        DEFAULT_BROKER_HOST.to_string()
    } else {
        host.to_string()
    };
    (host, port)
}

/// Cloneable handle publishing to the broker.
///
/// Publishes are queued on the client and flushed by the background
/// event-loop task spawned in [`MqttPublisher::connect`].
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect to the broker configured in `settings` and spawn the
    /// event-loop task that drives the connection (including
    /// reconnects).
    pub fn connect(settings: &Settings) -> (Self, JoinHandle<()>) {
        let (host, port) = parse_broker(&settings.mqtt_broker);
        let mut options = MqttOptions::new("multi_serial_scanner", host, port);
        options.set_keep_alive(Duration::from_secs(60));
        if !settings.mqtt_username.is_empty() {
            options.set_credentials(
                settings.mqtt_username.as_str(),
                settings.mqtt_password.as_str(),
            );
        }

        let (client, mut event_loop) = AsyncClient::new(options, 64);
        let driver = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => debug!("MQTT connected"),
                    Ok(_) => {}
                    Err(err) => {
                        warn!("MQTT connection error: {err}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        (Self { client }, driver)
    }

    /// Publish a retained status transition for a device.
    pub async fn publish_status(
        &self,
        device: &str,
        state: &str,
        error: Option<String>,
    ) -> Result<(), MqttError> {
        let payload = StatusPayload {
            device: device.to_string(),
            state: state.to_string(),
            error,
            ts: Utc::now().to_rfc3339(),
        };
        let topic = format!("{TOPIC_PREFIX}/{}/status", port_slug(device));
        self.client
            .publish(topic, QoS::AtLeastOnce, true, serde_json::to_vec(&payload)?)
            .await?;
        Ok(())
    }

    /// Publish one line of device output.
    pub async fn publish_data(&self, device: &str, data: &str) -> Result<(), MqttError> {
        let payload = DataPayload {
            device: device.to_string(),
            data: data.to_string(),
            ts: Utc::now().to_rfc3339(),
        };
        let topic = format!("{TOPIC_PREFIX}/{}/data", port_slug(device));
        self.client
            .publish(topic, QoS::AtMostOnce, false, serde_json::to_vec(&payload)?)
            .await?;
        Ok(())
    }

    /// Publish the retained discovery config for a device's sensor.
    pub async fn publish_discovery(
        &self,
        device: &str,
        discovery_prefix: &str,
    ) -> Result<(), MqttError> {
        let node_id = port_slug(device);
        let config = DiscoveryConfig {
            name: format!("Serial {device} Last"),
            unique_id: format!("{TOPIC_PREFIX}_{node_id}"),
            state_topic: format!("{TOPIC_PREFIX}/{node_id}/data"),
            value_template: "{{ value_json.data }}".to_string(),
            json_attributes_topic: format!("{TOPIC_PREFIX}/{node_id}/status"),
            availability: vec![Availability {
                topic: format!("{TOPIC_PREFIX}/{node_id}/status"),
                value_template: "{{ value_json.state }}".to_string(),
            }],
        };
        let topic = format!("{discovery_prefix}/sensor/{node_id}/last/config");
        self.client
            .publish(topic, QoS::AtLeastOnce, true, serde_json::to_vec(&config)?)
            .await?;
        Ok(())
    }

    /// Disconnect from the broker.
    pub async fn disconnect(&self) {
        if let Err(err) = self.client.disconnect().await {
            warn!("MQTT disconnect failed: {err}");
        }
    }
}
