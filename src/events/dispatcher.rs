//! Event dispatchers.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::http::request::X_CORRELATION_ID;

/// Sink for application events.
///
/// Implementations must return quickly and swallow their own failures.
pub trait EventDispatcher: Send + Sync {
    fn dispatch_event(&self, token: &str, correlation_id: &str, topic: &str, payload: serde_json::Value);
}

/// Wire form of a dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub topic: String,
    pub correlation_id: String,
    pub emitted_at_ms: u64,
    pub payload: serde_json::Value,
}

struct Outbound {
    token: String,
    envelope: EventEnvelope,
}

/// Dispatcher that POSTs events as JSON from a background task.
#[derive(Debug, Clone)]
pub struct HttpEventDispatcher {
    tx: mpsc::Sender<Outbound>,
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbound")
            .field("topic", &self.envelope.topic)
            .finish_non_exhaustive()
    }
}

impl HttpEventDispatcher {
    /// Start the delivery task. Must be called inside a Tokio runtime.
    pub fn spawn(endpoint: Url, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let client = reqwest::Client::new();
        tokio::spawn(deliver(client, endpoint, rx));
        Self { tx }
    }
}

impl EventDispatcher for HttpEventDispatcher {
    fn dispatch_event(&self, token: &str, correlation_id: &str, topic: &str, payload: serde_json::Value) {
        let outbound = Outbound {
            token: token.to_string(),
            envelope: EventEnvelope {
                topic: topic.to_string(),
                correlation_id: correlation_id.to_string(),
                emitted_at_ms: now_ms(),
                payload,
            },
        };
        if let Err(e) = self.tx.try_send(outbound) {
            tracing::warn!(topic = %topic, error = %e, "Dropping event");
        }
    }
}

async fn deliver(client: reqwest::Client, endpoint: Url, mut rx: mpsc::Receiver<Outbound>) {
    tracing::info!(endpoint = %endpoint, "Event delivery task started");
    while let Some(outbound) = rx.recv().await {
        let mut request = client.post(endpoint.clone()).json(&outbound.envelope);
        if let Ok(value) = HeaderValue::from_str(&outbound.envelope.correlation_id) {
            request = request.header(X_CORRELATION_ID, value);
        }
        if !outbound.token.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", outbound.token)) {
                request = request.header(AUTHORIZATION, value);
            }
        }

        match request.send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    topic = %outbound.envelope.topic,
                    status = %response.status(),
                    "Event endpoint rejected event"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(topic = %outbound.envelope.topic, error = %e, "Event delivery failed");
            }
        }
    }
    tracing::info!("Event delivery task stopped");
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
