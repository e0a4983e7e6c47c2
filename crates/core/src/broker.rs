//! In-process topic broker.
//!
//! `BrokerClient` stands in for the external message transport: each topic is a
//! tokio broadcast channel carrying JSON [`Envelope`]s. The handle is created
//! once at startup, connected explicitly, and closed on shutdown. Closing drops
//! every channel, which ends all open [`Subscription`]s.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;

pub mod topics {
    pub const RECOMMENDATION_CREATED: &str = "recommendation.created";
    pub const USER_ACTIVITY: &str = "user.activity";
    pub const USER_PREFERENCES_UPDATED: &str = "user.preferences.updated";
    pub const USER_CREATED: &str = "user.created";
}

const MEMORY_SCHEME: &str = "memory://";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub topic: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("broker is not connected")]
    NotConnected,
    #[error("unsupported broker transport `{0}`")]
    UnsupportedTransport(String),
    #[error("could not encode event payload: {0}")]
    Encode(String),
}

/// Outbound side of the broker as seen by the recommendation service.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), BrokerError>;
}

pub struct BrokerClient {
    url: SecretString,
    capacity: usize,
    state: Mutex<BrokerState>,
}

#[derive(Default)]
struct BrokerState {
    connected: bool,
    channels: HashMap<String, broadcast::Sender<Envelope>>,
}

impl BrokerClient {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            url: config.url.clone(),
            capacity: config.channel_capacity.max(1),
            state: Mutex::new(BrokerState::default()),
        }
    }

    /// Connected in-process client, mostly for tests and one-shot tools.
    pub fn in_process(capacity: usize) -> Self {
        let client = Self {
            url: SecretString::from(format!("{MEMORY_SCHEME}local")),
            capacity: capacity.max(1),
            state: Mutex::new(BrokerState::default()),
        };
        client.lock().connected = true;
        client
    }

    pub fn connect(&self) -> Result<(), BrokerError> {
        let url = self.url.expose_secret();
        if !url.starts_with(MEMORY_SCHEME) {
            let scheme = url.split("://").next().unwrap_or_default().to_owned();
            return Err(BrokerError::UnsupportedTransport(scheme));
        }

        let mut state = self.lock();
        if !state.connected {
            state.connected = true;
            info!(event_name = "broker.connected", capacity = self.capacity, "broker connected");
        }
        Ok(())
    }

    pub fn close(&self) {
        let mut state = self.lock();
        if state.connected {
            state.connected = false;
            let topics = state.channels.len();
            state.channels.clear();
            info!(event_name = "broker.closed", topics, "broker closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        let mut state = self.lock();
        if !state.connected {
            return Err(BrokerError::NotConnected);
        }
        let receiver = self.sender(&mut state, topic).subscribe();
        debug!(event_name = "broker.subscribed", topic, "subscribed to topic");
        Ok(Subscription { topic: topic.to_owned(), receiver })
    }

    fn sender(&self, state: &mut BrokerState, topic: &str) -> broadcast::Sender<Envelope> {
        state
            .channels
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EventPublisher for BrokerClient {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), BrokerError> {
        let sender = {
            let mut state = self.lock();
            if !state.connected {
                return Err(BrokerError::NotConnected);
            }
            self.sender(&mut state, topic)
        };

        let envelope = Envelope { topic: topic.to_owned(), payload, published_at: Utc::now() };
        match sender.send(envelope) {
            Ok(receivers) => {
                debug!(event_name = "broker.published", topic, receivers, "event published");
            }
            Err(_) => {
                debug!(event_name = "broker.published", topic, receivers = 0, "no subscribers");
            }
        }
        Ok(())
    }
}

pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Envelope>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next envelope, or `None` once the broker has been closed. Lagging
    /// subscribers skip the dropped envelopes and keep going.
    pub async fn next(&mut self) -> Option<Envelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        event_name = "broker.subscriber_lagged",
                        topic = %self.topic,
                        skipped,
                        "subscriber fell behind; envelopes dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
