//! Envelope codec: bytes in, envelopes out, values back to bytes

use function_types::{Envelope, FunctionError, FunctionResult, Headers, InputType, Payload};
use serde_json::Value;

/// Converts between raw bytes and envelopes.
///
/// Implementations must be stateless so one codec can serve concurrent
/// invocations.
pub trait EnvelopeCodec: Send + Sync {
    /// Build a request envelope from raw bytes, decoding the payload as
    /// `target`. Fails without producing a partial envelope.
    fn decode(&self, bytes: &[u8], headers: Headers, target: InputType) -> FunctionResult<Envelope>;

    /// Build a request envelope from an already-parsed value
    fn decode_value(
        &self,
        value: &Value,
        headers: Headers,
        target: InputType,
    ) -> FunctionResult<Envelope>;

    /// Encode a value to bytes
    fn encode(&self, value: &Value) -> FunctionResult<Vec<u8>>;

    /// Encode a payload; byte payloads pass through verbatim
    fn encode_payload(&self, payload: &Payload) -> FunctionResult<Vec<u8>> {
        match payload {
            Payload::Bytes(bytes) => Ok(bytes.clone()),
            Payload::Value(value) => self.encode(value),
        }
    }
}

/// JSON codec backed by `serde_json`
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl EnvelopeCodec for JsonCodec {
    fn decode(&self, bytes: &[u8], headers: Headers, target: InputType) -> FunctionResult<Envelope> {
        let payload = match target {
            InputType::Bytes => Payload::Bytes(bytes.to_vec()),
            InputType::Text => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| FunctionError::PayloadDecode(format!("invalid UTF-8: {}", e)))?;
                Payload::Value(Value::String(text.to_string()))
            }
            InputType::Json => Payload::Value(
                serde_json::from_slice(bytes)
                    .map_err(|e| FunctionError::PayloadDecode(e.to_string()))?,
            ),
        };
        Ok(Envelope::with_headers(payload, headers))
    }

    fn decode_value(
        &self,
        value: &Value,
        headers: Headers,
        target: InputType,
    ) -> FunctionResult<Envelope> {
        let payload = match (target, value) {
            (InputType::Json, value) => Payload::Value(value.clone()),
            (InputType::Text, Value::String(_)) => Payload::Value(value.clone()),
            (InputType::Text, other) => Payload::Value(Value::String(other.to_string())),
            (InputType::Bytes, Value::String(text)) => Payload::Bytes(text.as_bytes().to_vec()),
            (InputType::Bytes, other) => Payload::Bytes(self.encode(other)?),
        };
        Ok(Envelope::with_headers(payload, headers))
    }

    fn encode(&self, value: &Value) -> FunctionResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| FunctionError::PayloadEncode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers() -> Headers {
        let mut headers = Headers::new();
        headers.insert("path".into(), json!("foo/bar"));
        headers
    }

    #[test]
    fn test_decode_json() {
        let env = JsonCodec
            .decode(br#"{"value":"helo"}"#, headers(), InputType::Json)
            .unwrap();
        assert_eq!(env.payload(), &Payload::Value(json!({ "value": "helo" })));
        assert_eq!(env.header_str("path"), Some("foo/bar"));
    }

    #[test]
    fn test_decode_scalars_and_lists() {
        let env = JsonCodec.decode(b"42", Headers::new(), InputType::Json).unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!(42)));

        let env = JsonCodec
            .decode(br#"[1,"two",{"three":3}]"#, Headers::new(), InputType::Json)
            .unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!([1, "two", { "three": 3 }])));
    }

    #[test]
    fn test_decode_malformed_json() {
        let result = JsonCodec.decode(b"{\"value\":", Headers::new(), InputType::Json);
        assert!(matches!(result, Err(FunctionError::PayloadDecode(_))));
    }

    #[test]
    fn test_decode_text() {
        let env = JsonCodec.decode(b"helo", Headers::new(), InputType::Text).unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!("helo")));

        let result = JsonCodec.decode(&[0xff, 0xfe], Headers::new(), InputType::Text);
        assert!(matches!(result, Err(FunctionError::PayloadDecode(_))));
    }

    #[test]
    fn test_decode_bytes_verbatim() {
        let raw = vec![0u8, 159, 146, 150];
        let env = JsonCodec.decode(&raw, Headers::new(), InputType::Bytes).unwrap();
        assert_eq!(env.payload().as_bytes(), Some(raw.as_slice()));
    }

    #[test]
    fn test_decode_value() {
        let env = JsonCodec
            .decode_value(&json!({ "a": 1 }), headers(), InputType::Json)
            .unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!({ "a": 1 })));
        assert_eq!(env.header_str("path"), Some("foo/bar"));

        let env = JsonCodec
            .decode_value(&json!({ "a": 1 }), Headers::new(), InputType::Text)
            .unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!(r#"{"a":1}"#)));

        let env = JsonCodec
            .decode_value(&json!("raw"), Headers::new(), InputType::Bytes)
            .unwrap();
        assert_eq!(env.payload().as_bytes(), Some(b"raw".as_slice()));
    }

    #[test]
    fn test_encode() {
        assert_eq!(JsonCodec.encode(&json!("hello")).unwrap(), b"\"hello\"");
        assert_eq!(JsonCodec.encode(&json!([1, 2])).unwrap(), b"[1,2]");
        assert_eq!(
            JsonCodec
                .encode_payload(&Payload::Bytes(b"raw".to_vec()))
                .unwrap(),
            b"raw"
        );
    }
}
