//! Batch last-value requests.
//!
//! This is the request/response contract behind the `/last-values`
//! endpoint; the HTTP layer itself lives outside this crate. A request is
//! a JSON array of [`LastValueRequest`]s and the response is an array of
//! [`LastValueResponse`]s in the same order.

use crate::error::CoreResult;
use crate::query::LastValueSource;
use chrono::SecondsFormat;
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One lookup in a batch.
///
/// Field names are matched case-insensitively when decoding, so
/// `{"deviceId": ...}` and `{"DeviceId": ...}` are the same request.
/// Unknown fields are ignored and missing or `null` fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LastValueRequest {
    /// Device key.
    #[serde(rename = "DeviceId")]
    pub device_id: String,
    /// Service key.
    #[serde(rename = "ServiceId")]
    pub service_id: String,
    /// Path inside the payload ("" for the whole value).
    #[serde(rename = "ColumnName")]
    pub column_name: String,
}

impl<'de> Deserialize<'de> for LastValueRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RequestVisitor)
    }
}

struct RequestVisitor;

impl<'de> Visitor<'de> for RequestVisitor {
    type Value = LastValueRequest;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a last-value request object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut request = LastValueRequest::default();
        while let Some(key) = map.next_key::<String>()? {
            let field = match key.to_lowercase().as_str() {
                "deviceid" => &mut request.device_id,
                "serviceid" => &mut request.service_id,
                "columnname" => &mut request.column_name,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            if let Some(value) = map.next_value::<Option<String>>()? {
                *field = value;
            }
        }
        Ok(request)
    }
}

impl LastValueRequest {
    /// Creates a request.
    pub fn new(
        device_id: impl Into<String>,
        service_id: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            service_id: service_id.into(),
            column_name: column_name.into(),
        }
    }
}

/// Answer to one [`LastValueRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastValueResponse {
    /// RFC 3339 write time; `null` if the device/service was never seen.
    pub time: Option<String>,
    /// Value at the requested path; `null` if absent.
    pub value: Value,
}

/// Resolves batches against a [`LastValueSource`].
pub struct LastValues<'a, S: LastValueSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: LastValueSource + ?Sized> LastValues<'a, S> {
    /// Creates a resolver over `source`.
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Resolves every request in order.
    ///
    /// # Errors
    ///
    /// The first failed lookup fails the whole batch.
    pub fn resolve(&self, requests: &[LastValueRequest]) -> CoreResult<Vec<LastValueResponse>> {
        requests
            .iter()
            .map(|req| {
                let result =
                    self.source
                        .last_value(&req.device_id, &req.service_id, &req.column_name)?;
                Ok(LastValueResponse {
                    time: result
                        .time
                        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    value: result.value,
                })
            })
            .collect()
    }

    /// Decodes a JSON request body, resolves it and encodes the response.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::BadRequest`] for an undecodable body and
    /// [`BatchError::Lookup`] if any lookup fails.
    pub fn resolve_json(&self, body: &[u8]) -> Result<Vec<u8>, BatchError> {
        let requests: Vec<LastValueRequest> =
            serde_json::from_slice(body).map_err(BatchError::BadRequest)?;
        let responses = self.resolve(&requests).map_err(BatchError::Lookup)?;
        serde_json::to_vec(&responses).map_err(BatchError::Encode)
    }
}

/// Failure of a whole batch, split by the status a server should answer.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The request body is not a request array (client error).
    #[error("bad request: {0}")]
    BadRequest(serde_json::Error),
    /// A lookup failed in the store (server error).
    #[error(transparent)]
    Lookup(crate::CoreError),
    /// The response could not be encoded (server error).
    #[error("unable to encode response: {0}")]
    Encode(serde_json::Error),
}

impl BatchError {
    /// HTTP status code matching this failure.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Lookup(_) | Self::Encode(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryEngine, QueryResult};
    use crate::CoreError;
    use chrono::{TimeZone, Utc};
    use lastvalue_storage::{InMemoryStore, Record, Store, StoreError};
    use serde_json::json;
    use std::sync::Arc;

    struct FailingSource;

    impl LastValueSource for FailingSource {
        fn last_value(&self, device: &str, _: &str, _: &str) -> CoreResult<QueryResult> {
            if device == "broken" {
                return Err(StoreError::Closed.into());
            }
            Ok(QueryResult::missing())
        }
    }

    fn engine() -> QueryEngine {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let store = InMemoryStore::with_records([(
            "d1.s7".to_string(),
            Record {
                value: br#"{"foo": "bar", "batz":42}"#.to_vec(),
                time: at,
            },
        )]);
        QueryEngine::new(Arc::new(store))
    }

    #[test]
    fn request_field_names() {
        let req: LastValueRequest =
            serde_json::from_str(r#"{"DeviceId":"d1","ServiceId":"s2","ColumnName":"foo"}"#)
                .unwrap();
        assert_eq!(req, LastValueRequest::new("d1", "s2", "foo"));
    }

    #[test]
    fn request_field_names_ignore_case() {
        let req: LastValueRequest = serde_json::from_str(
            r#"{"deviceId":"d1","serviceid":"s7","COLUMNNAME":"foo","extra":[1]}"#,
        )
        .unwrap();
        assert_eq!(req, LastValueRequest::new("d1", "s7", "foo"));

        let req: LastValueRequest =
            serde_json::from_str(r#"{"DeviceId":"d1","ColumnName":null}"#).unwrap();
        assert_eq!(req, LastValueRequest::new("d1", "", ""));
    }

    #[test]
    fn request_must_be_object() {
        assert!(serde_json::from_str::<LastValueRequest>("42").is_err());
        assert!(serde_json::from_str::<LastValueRequest>(r#"{"DeviceId":1}"#).is_err());
    }

    #[test]
    fn camel_case_batch_resolves() {
        let engine = engine();
        let body = br#"[{"deviceId":"d1","serviceId":"s7","columnName":"foo"}]"#;
        let out = LastValues::new(&engine).resolve_json(body).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!([{"time": "2024-05-01T12:00:00Z", "value": "bar"}]));
    }

    #[test]
    fn resolve_in_order() {
        let engine = engine();
        let batch = LastValues::new(&engine);
        let responses = batch
            .resolve(&[
                LastValueRequest::new("d1", "s7", "foo"),
                LastValueRequest::new("unknown", "s1", ""),
                LastValueRequest::new("d1", "s7", "bar"),
            ])
            .unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].value, json!("bar"));
        assert_eq!(responses[0].time.as_deref(), Some("2024-05-01T12:00:00Z"));
        assert_eq!(responses[1], LastValueResponse::default());
        assert_eq!(responses[2].value, Value::Null);
        assert!(responses[2].time.is_some());
    }

    #[test]
    fn one_failure_fails_batch() {
        let batch = LastValues::new(&FailingSource);
        let result = batch.resolve(&[
            LastValueRequest::new("ok", "s", ""),
            LastValueRequest::new("broken", "s", ""),
        ]);
        assert!(matches!(result, Err(CoreError::Store(StoreError::Closed))));
    }

    #[test]
    fn empty_batch() {
        let engine = engine();
        assert!(LastValues::new(&engine).resolve(&[]).unwrap().is_empty());
    }

    #[test]
    fn json_round() {
        let engine = engine();
        let body = br#"[{"DeviceId":"d1","ServiceId":"s7","ColumnName":"batz"}]"#;
        let out = LastValues::new(&engine).resolve_json(body).unwrap();
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!([{"time": "2024-05-01T12:00:00Z", "value": 42}]));
    }

    #[test]
    fn json_bad_request_status() {
        let engine = engine();
        let err = LastValues::new(&engine).resolve_json(b"{").unwrap_err();
        assert_eq!(err.status(), 400);

        let err = LastValues::new(&FailingSource)
            .resolve_json(br#"[{"DeviceId":"broken"}]"#)
            .unwrap_err();
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn store_writes_visible_to_batch() {
        let store = Arc::new(InMemoryStore::new());
        store.set("d1.s2", b"42").unwrap();
        let engine = QueryEngine::new(store);
        let responses = LastValues::new(&engine)
            .resolve(&[LastValueRequest::new("d1", "s2", "")])
            .unwrap();
        assert_eq!(responses[0].value, json!(42));
    }
}
