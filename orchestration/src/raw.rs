//! Unclassified failures as they come off the wire.
//!
//! The generative service fails in many shapes: transport errors, HTTP error
//! bodies with nested `error` objects, bare strings. [`RawError`] keeps the
//! failure as an untyped JSON value so the classifier can probe it
//! structurally instead of matching on a single exception type.

use std::fmt;

use serde_json::{json, Map, Value};

/// A failure whose shape is not known in advance.
#[derive(Debug, Clone, PartialEq)]
pub struct RawError {
    payload: Value,
}

impl RawError {
    /// Wrap an arbitrary value.
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// A bare message with no structure.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            payload: Value::String(message.into()),
        }
    }

    /// A non-success HTTP response.
    ///
    /// A JSON object body is kept as-is with the status added at top level;
    /// anything else becomes the `message` field.
    pub fn http(status: u16, body: &str) -> Self {
        let mut object = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert("message".into(), Value::String(body.to_string()));
                map
            }
        };
        object.insert("status".into(), json!(status));
        Self {
            payload: Value::Object(object),
        }
    }

    /// A request that never produced an HTTP response.
    pub fn transport(err: &reqwest::Error) -> Self {
        Self {
            payload: json!({
                "name": "TransportError",
                "message": format!("network request failed (fetch error): {err}"),
                "timeout": err.is_timeout(),
                "connect": err.is_connect(),
            }),
        }
    }

    /// The underlying value.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Full text form used for marker matching and diagnostics.
    pub fn serialized(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    /// HTTP-equivalent status, probing the conventional locations in order:
    /// top-level `status`, top-level `code`, `error.code`, `response.status`.
    /// First match wins.
    pub fn status_code(&self) -> Option<u16> {
        let probes: [&[&str]; 4] = [
            &["status"],
            &["code"],
            &["error", "code"],
            &["response", "status"],
        ];
        probes
            .iter()
            .find_map(|path| lookup(&self.payload, path).and_then(as_status))
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl std::error::Error for RawError {}

impl From<String> for RawError {
    fn from(message: String) -> Self {
        Self::message(message)
    }
}

impl From<&str> for RawError {
    fn from(message: &str) -> Self {
        Self::message(message)
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

// Numeric strings count ("429" and 429 are the same status); symbolic codes
// such as "ECONNRESET" or "RESOURCE_EXHAUSTED" do not.
fn as_status(value: &Value) -> Option<u16> {
    let status = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    status.filter(|status| *status != 0)
}
