//! The value/time pair persisted per key.
//!
//! Both engines store a [`Record`] as one JSON envelope:
//!
//! ```json
//! {"v": "<standard base64 of the raw payload>", "t": "2024-05-01T12:00:00.123456789Z"}
//! ```
//!
//! Writing value and time inside a single engine value means a reader can
//! never see a new payload paired with an old timestamp.

use crate::error::{StoreError, StoreResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value returned on the wire for a key that has no record.
pub const NULL_MARKER: &[u8] = b"null";

/// The last value seen for a key, with the time it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw payload bytes, possibly empty.
    pub value: Vec<u8>,
    /// Wall-clock time assigned by the store when the value was written.
    pub time: DateTime<Utc>,
}

impl Record {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn now(value: &[u8]) -> Self {
        Self {
            value: value.to_vec(),
            time: Utc::now(),
        }
    }

    /// Encodes the record as its persisted envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let envelope = Envelope {
            value: STANDARD.encode(&self.value),
            time: self.time,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Decodes a persisted envelope stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Envelope`] for malformed JSON and
    /// [`StoreError::CorruptRecord`] for an invalid base64 payload.
    pub fn decode(key: &str, bytes: &[u8]) -> StoreResult<Self> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        let value = STANDARD
            .decode(envelope.value.as_bytes())
            .map_err(|e| StoreError::corrupt_record(key, e.to_string()))?;
        Ok(Self {
            value,
            time: envelope.time,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "v")]
    value: String,
    #[serde(rename = "t")]
    time: DateTime<Utc>,
}

/// Outcome of a successful [`crate::Store::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// A record exists for the key.
    Found(Record),
    /// The key was never set, or its record expired.
    NotFound,
}

impl Lookup {
    /// Returns the record if one was found.
    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }

    /// Returns the write time, `None` for a missing key.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.record().map(|r| r.time)
    }

    /// Converts into the wire convention: raw bytes plus optional time.
    ///
    /// A missing key becomes [`NULL_MARKER`] with no time.
    #[must_use]
    pub fn into_wire(self) -> (Vec<u8>, Option<DateTime<Utc>>) {
        match self {
            Self::Found(record) => (record.value, Some(record.time)),
            Self::NotFound => (NULL_MARKER.to_vec(), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn envelope_layout() {
        let record = Record {
            value: b"42".to_vec(),
            time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        let encoded = String::from_utf8(record.encode().unwrap()).unwrap();
        assert_eq!(encoded, r#"{"v":"NDI=","t":"2024-05-01T12:00:00Z"}"#);
    }

    #[test]
    fn decode_offset_nanosecond_envelope() {
        let raw = br#"{"v":"eyJmb28iOjF9","t":"2022-03-04T10:11:12.123456789+01:00"}"#;
        let record = Record::decode("d1.s1", raw).unwrap();
        assert_eq!(record.value, br#"{"foo":1}"#);
        assert_eq!(record.time.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn empty_value_survives_encoding() {
        let record = Record::now(b"");
        let decoded = Record::decode("k", &record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn bad_base64_is_corrupt() {
        let raw = br#"{"v":"***","t":"2022-03-04T10:11:12Z"}"#;
        let err = Record::decode("k", raw).unwrap_err();
        assert!(matches!(err, StoreError::CorruptRecord { .. }));
    }

    #[test]
    fn malformed_json_is_envelope_error() {
        let err = Record::decode("k", b"not json").unwrap_err();
        assert!(matches!(err, StoreError::Envelope(_)));
    }

    #[test]
    fn not_found_to_wire() {
        let (value, time) = Lookup::NotFound.into_wire();
        assert_eq!(value, NULL_MARKER);
        assert!(time.is_none());
    }

    #[test]
    fn found_to_wire() {
        let record = Record::now(b"null");
        let at = record.time;
        let (value, time) = Lookup::Found(record).into_wire();
        assert_eq!(value, b"null");
        assert_eq!(time, Some(at));
    }

    proptest! {
        #[test]
        fn any_payload_survives_envelope(value in prop::collection::vec(any::<u8>(), 0..512)) {
            let record = Record::now(&value);
            let decoded = Record::decode("k", &record.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, record);
        }
    }
}
