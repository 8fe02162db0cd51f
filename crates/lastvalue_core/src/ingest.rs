//! Ingestion of bus messages into the store.
//!
//! The transport (an MQTT-style client) is not part of this crate; it hands
//! `(topic, payload)` pairs to an [`Ingestor`]. Two topic families are
//! understood:
//!
//! - `event/<device>/<service>`: the payload is stored as is
//! - `response/<device>/<service>`: the payload is a [`CommandResponse`]
//!   and only its `data` field is stored

use crate::error::{CoreError, CoreResult};
use crate::query::record_key;
use lastvalue_storage::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Subscription filter for device events.
pub const EVENT_FILTER: &str = "event/#";

/// Subscription filter for command responses.
pub const RESPONSE_FILTER: &str = "response/#";

/// Kind of an ingested topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// `event/...`
    Event,
    /// `response/...`
    Response,
}

/// A parsed `<kind>/<device>/<service>` topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic<'a> {
    /// Topic family.
    pub kind: TopicKind,
    /// Device key.
    pub device_key: &'a str,
    /// Service key.
    pub service_key: &'a str,
}

impl<'a> Topic<'a> {
    /// Parses a topic.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTopic`] unless the topic has exactly
    /// three segments and starts with `event` or `response`.
    pub fn parse(topic: &'a str) -> CoreResult<Self> {
        let parts: Vec<&'a str> = topic.split('/').collect();
        let (kind, device_key, service_key) = match parts.as_slice() {
            [kind, device_key, service_key] => (*kind, *device_key, *service_key),
            _ => return Err(CoreError::invalid_topic(topic)),
        };
        let kind = match kind {
            "event" => TopicKind::Event,
            "response" => TopicKind::Response,
            _ => return Err(CoreError::invalid_topic(topic)),
        };
        Ok(Self {
            kind,
            device_key,
            service_key,
        })
    }

    /// Store key for this topic.
    #[must_use]
    pub fn key(&self) -> String {
        record_key(self.device_key, self.service_key)
    }
}

/// Payload of a `response/...` message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Identifier of the command being answered.
    #[serde(default)]
    pub command_id: String,
    /// Response body; this is what gets stored.
    #[serde(default)]
    pub data: String,
}

/// Writes incoming messages to a shared store.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn Store>,
    debug: bool,
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("backend", &self.store.kind())
            .field("debug", &self.debug)
            .finish()
    }
}

impl Ingestor {
    /// Creates an ingestor writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            debug: false,
        }
    }

    /// Enables per-message debug logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Handles one message from either topic family.
    ///
    /// Invalid topics and response payloads are logged and returned as
    /// errors; nothing is stored for them.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTopic`], [`CoreError::InvalidResponse`]
    /// or the store's error.
    pub fn handle(&self, topic: &str, payload: &[u8]) -> CoreResult<()> {
        let parsed = Topic::parse(topic).map_err(|e| {
            tracing::warn!(topic, "consumed invalid topic");
            e
        })?;
        match parsed.kind {
            TopicKind::Event => self.store_value(&parsed.key(), payload),
            TopicKind::Response => {
                let response: CommandResponse =
                    serde_json::from_slice(payload).map_err(|source| {
                        tracing::warn!(
                            topic,
                            payload = %String::from_utf8_lossy(payload),
                            "unexpected message in response topic"
                        );
                        CoreError::InvalidResponse {
                            topic: topic.to_string(),
                            source,
                        }
                    })?;
                self.store_value(&parsed.key(), response.data.as_bytes())
            }
        }
    }

    fn store_value(&self, key: &str, value: &[u8]) -> CoreResult<()> {
        if self.debug {
            tracing::debug!(key, value = %String::from_utf8_lossy(value), "store");
        }
        self.store.set(key, value).map_err(|e| {
            tracing::error!(key, error = %e, "unable to store value");
            CoreError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastvalue_storage::{InMemoryStore, Lookup};

    fn ingestor() -> (Arc<InMemoryStore>, Ingestor) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), Ingestor::new(store).with_debug(true))
    }

    fn stored(store: &InMemoryStore, key: &str) -> Option<Vec<u8>> {
        match store.get(key).unwrap() {
            Lookup::Found(record) => Some(record.value),
            Lookup::NotFound => None,
        }
    }

    #[test]
    fn parse_event_topic() {
        let topic = Topic::parse("event/d1/s2").unwrap();
        assert_eq!(topic.kind, TopicKind::Event);
        assert_eq!(topic.device_key, "d1");
        assert_eq!(topic.service_key, "s2");
        assert_eq!(topic.key(), "d1.s2");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        for topic in ["event/d1", "event/d1/s2/x", "command/d1/s2", "", "event"] {
            assert!(
                matches!(Topic::parse(topic), Err(CoreError::InvalidTopic { .. })),
                "{topic}"
            );
        }
    }

    #[test]
    fn event_payload_stored_raw() {
        let (store, ingestor) = ingestor();
        ingestor.handle("event/d1/s7", br#"{"foo": "bar"}"#).unwrap();
        assert_eq!(stored(&store, "d1.s7").unwrap(), br#"{"foo": "bar"}"#);
    }

    #[test]
    fn empty_event_payload_is_stored() {
        let (store, ingestor) = ingestor();
        ingestor.handle("event/d1/s0", b"").unwrap();
        assert_eq!(stored(&store, "d1.s0").unwrap(), b"");
    }

    #[test]
    fn response_data_is_unwrapped() {
        let (store, ingestor) = ingestor();
        ingestor
            .handle("response/d1/cmd2", br#"{"command_id": "c1", "data": "\"42\""}"#)
            .unwrap();
        assert_eq!(stored(&store, "d1.cmd2").unwrap(), br#""42""#);
    }

    #[test]
    fn response_without_command_id() {
        let (store, ingestor) = ingestor();
        ingestor.handle("response/d1/cmd", br#"{"data": "42"}"#).unwrap();
        assert_eq!(stored(&store, "d1.cmd").unwrap(), b"42");
    }

    #[test]
    fn invalid_response_stores_nothing() {
        let (store, ingestor) = ingestor();
        let err = ingestor.handle("response/d1/cmd", b"not json").unwrap_err();
        assert!(matches!(err, CoreError::InvalidResponse { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_topic_stores_nothing() {
        let (store, ingestor) = ingestor();
        assert!(ingestor.handle("event/d1", b"42").is_err());
        assert!(store.is_empty());
    }
}
