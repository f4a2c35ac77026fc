//! Test utilities shared across unit test modules.
//!
//! `MockClient` is an in-memory `RegistryClient` with scripted replies,
//! optional per-path gates, and call recording.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

use crate::sources::{Api, FetchError, Fetched, RegistryClient};

/// Scripted reply for one request key.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Successful JSON body.
    Json(Value),
    /// Non-success HTTP status.
    Status(u16),
    /// Transport failure before any response.
    Network,
}

/// In-memory transport for tests.
///
/// Unscripted requests answer 404.
#[derive(Debug, Default)]
pub struct MockClient {
    replies: Mutex<HashMap<String, MockReply>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Request key as recorded by the mock: `registry:/path` or `downloads:/path`.
pub fn mock_key(api: Api, path: &str) -> String {
    format!("{}:{path}", api.label())
}

impl MockClient {
    /// Empty mock; every request answers 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a JSON body for `path`.
    pub fn with_json(self, api: Api, path: &str, body: Value) -> Self {
        self.set_reply(api, path, MockReply::Json(body));
        self
    }

    /// Script a status failure for `path`.
    pub fn with_status(self, api: Api, path: &str, status: u16) -> Self {
        self.set_status(api, path, status);
        self
    }

    /// Script a transport failure for `path`.
    pub fn with_network_error(self, api: Api, path: &str) -> Self {
        self.set_reply(api, path, MockReply::Network);
        self
    }

    /// Sleep this long inside every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the reply for `path`.
    pub fn set_reply(&self, api: Api, path: &str, reply: MockReply) {
        self.replies.lock().unwrap().insert(mock_key(api, path), reply);
    }

    /// Replace the reply for `path` with a JSON body.
    pub fn set_json(&self, api: Api, path: &str, body: Value) {
        self.set_reply(api, path, MockReply::Json(body));
    }

    /// Replace the reply for `path` with a status failure.
    pub fn set_status(&self, api: Api, path: &str, status: u16) {
        self.set_reply(api, path, MockReply::Status(status));
    }

    /// Hold requests for `path` until the returned gate is notified.
    pub fn gate(&self, api: Api, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(mock_key(api, path), Arc::clone(&gate));
        gate
    }

    /// Keys of every request made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many requests were made for `path`.
    pub fn count(&self, api: Api, path: &str) -> usize {
        let key = mock_key(api, path);
        self.calls.lock().unwrap().iter().filter(|k| **k == key).count()
    }

    /// Highest number of requests observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl RegistryClient for MockClient {
    async fn get_json(&self, api: Api, path: &str) -> Result<Fetched<Value>, FetchError> {
        let key = mock_key(api, path);
        self.calls.lock().unwrap().push(key.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self.replies.lock().unwrap().get(&key).cloned();
        match reply {
            Some(MockReply::Json(data)) => Ok(Fetched::fresh(data)),
            Some(MockReply::Status(status)) => Err(FetchError::Status { status, url: key }),
            Some(MockReply::Network) => Err(FetchError::Network {
                url: key,
                message: "connection refused".into(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: key,
            }),
        }
    }
}
