//! Envelopes: the uniform request/response unit
//!
//! An envelope pairs a payload with headers. Envelopes are never mutated in
//! place; the builder-style methods consume `self` and return a new value, so a
//! derived envelope never aliases the one it came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Envelope headers, keyed exactly as supplied by the codec or transport
pub type Headers = BTreeMap<String, Value>;

/// Header set on requests that arrived as an API-gateway proxy event
pub const API_GATEWAY_HEADER: &str = "aws-api-gateway";

// ── Payload ──────────────────────────────────────────────────────────

/// The body of an envelope
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// Raw bytes, passed through verbatim
    Bytes(Vec<u8>),
    /// A decoded JSON value
    Value(Value),
}

impl Payload {
    /// View the payload as a JSON value.
    ///
    /// Byte payloads become a string when they are valid UTF-8 and an array
    /// of byte values otherwise.
    pub fn to_value(&self) -> Value {
        match self {
            Payload::Value(value) => value.clone(),
            Payload::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Value::String(text.to_string()),
                Err(_) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            },
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            Payload::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Value(value) => Some(value),
            Payload::Bytes(_) => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

// ── Input Type ───────────────────────────────────────────────────────

/// The element type a function declares for its input
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Bytes, untouched
    Bytes,
    /// UTF-8 text
    Text,
    /// Any JSON value
    #[default]
    Json,
}

impl std::fmt::Display for InputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputType::Bytes => write!(f, "bytes"),
            InputType::Text => write!(f, "text"),
            InputType::Json => write!(f, "json"),
        }
    }
}

// ── Envelope ─────────────────────────────────────────────────────────

/// A payload together with its headers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    payload: Payload,
    #[serde(default)]
    headers: Headers,
}

impl Envelope {
    /// Create an envelope with no headers
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            headers: Headers::new(),
        }
    }

    /// Create an envelope carrying the given headers
    pub fn with_headers(payload: impl Into<Payload>, headers: Headers) -> Self {
        Self {
            payload: payload.into(),
            headers,
        }
    }

    /// Return a copy with `key` set to `value`, replacing any previous value
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Return a copy with the payload replaced and headers kept
    pub fn with_payload(self, payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            headers: self.headers,
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, key: &str) -> Option<&Value> {
        self.headers.get(key)
    }

    /// Header value as a string slice, if present and a string
    pub fn header_str(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(Value::as_str)
    }

    /// Whether the request arrived as an API-gateway proxy event
    pub fn is_api_gateway(&self) -> bool {
        matches!(self.headers.get(API_GATEWAY_HEADER), Some(Value::Bool(true)))
    }

    /// Split into payload and headers
    pub fn into_parts(self) -> (Payload, Headers) {
        (self.payload, self.headers)
    }
}

// ── Function Input ───────────────────────────────────────────────────

/// What a function stage receives: a message-shaped envelope or a bare value
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionInput {
    Message(Envelope),
    Raw(Value),
}

impl From<Envelope> for FunctionInput {
    fn from(envelope: Envelope) -> Self {
        FunctionInput::Message(envelope)
    }
}

impl From<Value> for FunctionInput {
    fn from(value: Value) -> Self {
        FunctionInput::Raw(value)
    }
}
