use std::time::Duration;

use anyhow::{Context, Result};
use rumqttc::{Client, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;
use crate::models::TrackMetadata;
use crate::pipeline::ArtUpdater;
use crate::sources::CatalogSource;

const CLIENT_ID: &str = "albumart-finder";
const KEEP_ALIVE: Duration = Duration::from_secs(60);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const LOG_PREVIEW: usize = 200;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload is not an object")]
    NotAnObject,
}

/// Decodes a now-playing message. Non-string field values are treated as
/// absent.
pub fn parse_payload(payload: &[u8]) -> Result<TrackMetadata, PayloadError> {
    let text = String::from_utf8_lossy(payload);
    let value: Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(PayloadError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

fn preview(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .chars()
        .take(LOG_PREVIEW)
        .collect()
}

/// Subscribes to the now-playing topic and feeds every message through
/// `updater`. Blocks for the life of the process, reconnecting on failure.
pub fn run_subscriber<S: CatalogSource>(config: &MqttConfig, updater: &ArtUpdater<S>) -> Result<()> {
    let host = config
        .host
        .clone()
        .filter(|h| !h.is_empty())
        .context("MQTT_HOST is required. Set it via environment variable or .env file.")?;

    let mut options = MqttOptions::new(CLIENT_ID, host.as_str(), config.port);
    options.set_keep_alive(KEEP_ALIVE);
    if let Some(username) = &config.username {
        options.set_credentials(username, config.password.clone().unwrap_or_default());
    }

    let (client, mut connection) = Client::new(options, 10);

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    error!("MQTT connect failed: {:?}", ack.code);
                    continue;
                }
                info!("Connected to MQTT at {}:{}", host, config.port);
                if let Err(e) = client.subscribe(config.topic.as_str(), QoS::AtMostOnce) {
                    error!("Subscribe to {} failed: {}", config.topic, e);
                    continue;
                }
                info!("Subscribed to topic: {}", config.topic);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_message(updater, &publish.topic, &publish.payload);
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}; retrying in {:?}", e, RECONNECT_DELAY);
                std::thread::sleep(RECONNECT_DELAY);
            }
        }
    }

    Ok(())
}

fn handle_message<S: CatalogSource>(updater: &ArtUpdater<S>, topic: &str, payload: &[u8]) {
    let meta = match parse_payload(payload) {
        Ok(meta) => meta,
        Err(e) => {
            warn!("Ignoring message on {}: {} ({})", topic, e, preview(payload));
            return;
        }
    };

    match updater.update_from_meta(&meta) {
        Ok(true) => debug!("Art updated from topic {}", topic),
        Ok(false) => {}
        Err(e) => error!("Error processing MQTT message: {:#}", e),
    }
}
