//! API-gateway proxy shapes at the transport boundary
//!
//! A request whose payload is a proxy event (a JSON object carrying
//! `httpMethod`) is unwrapped: its headers, method and path become envelope
//! headers and its body becomes the payload. The request is then marked with
//! [`API_GATEWAY_HEADER`] so the response is wrapped back into a proxy
//! response object. Anything else passes through the codec untouched.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use function_context::EnvelopeCodec;
use function_types::envelope::API_GATEWAY_HEADER;
use function_types::{Envelope, FunctionError, FunctionResult, Headers, InputType};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const HTTP_METHOD: &str = "httpMethod";
const PATH: &str = "path";
const HEADERS: &str = "headers";
const BODY: &str = "body";
const IS_BASE64_ENCODED: &str = "isBase64Encoded";
const STATUS_CODE: &str = "statusCode";
const DEFAULT_STATUS_CODE: u16 = 200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyResponse {
    is_base64_encoded: bool,
    status_code: u16,
    headers: BTreeMap<String, String>,
    body: String,
}

/// Build the request envelope for `payload`, seeding `headers` from the
/// transport and decoding as `target`.
pub fn generate_message(
    payload: &[u8],
    headers: Headers,
    target: InputType,
    codec: &dyn EnvelopeCodec,
) -> FunctionResult<Envelope> {
    match proxy_event(payload) {
        Some(event) => from_proxy_event(event, headers, target, codec),
        None => codec.decode(payload, headers, target),
    }
}

/// Turn `response` into transport bytes. Requests that arrived as proxy
/// events get a proxy response object; everything else gets the payload.
pub fn generate_output(
    request_headers: &Headers,
    response: Envelope,
    codec: &dyn EnvelopeCodec,
) -> FunctionResult<Vec<u8>> {
    let from_gateway = request_headers
        .get(API_GATEWAY_HEADER)
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let (payload, headers) = response.into_parts();
    let body = codec.encode_payload(&payload)?;
    if !from_gateway {
        return Ok(body);
    }

    let status_code = headers
        .get(STATUS_CODE)
        .and_then(status_code)
        .unwrap_or(DEFAULT_STATUS_CODE);

    let headers = headers
        .into_iter()
        .filter(|(key, _)| key != STATUS_CODE)
        .map(|(key, value)| (key, header_text(value)))
        .collect();

    let (body, is_base64_encoded) = match String::from_utf8(body) {
        Ok(text) => (text, false),
        Err(e) => (STANDARD.encode(e.into_bytes()), true),
    };

    let response = ProxyResponse {
        is_base64_encoded,
        status_code,
        headers,
        body,
    };
    serde_json::to_vec(&response).map_err(|e| FunctionError::PayloadEncode(e.to_string()))
}

fn proxy_event(payload: &[u8]) -> Option<Map<String, Value>> {
    let first = payload.iter().find(|b| !b.is_ascii_whitespace())?;
    if *first != b'{' {
        return None;
    }
    match serde_json::from_slice(payload) {
        Ok(Value::Object(event)) if event.contains_key(HTTP_METHOD) => Some(event),
        _ => None,
    }
}

fn from_proxy_event(
    mut event: Map<String, Value>,
    mut headers: Headers,
    target: InputType,
    codec: &dyn EnvelopeCodec,
) -> FunctionResult<Envelope> {
    if let Some(Value::Object(event_headers)) = event.remove(HEADERS) {
        headers.extend(event_headers);
    }
    for key in [HTTP_METHOD, PATH] {
        if let Some(value) = event.get(key) {
            headers.insert(key.to_string(), value.clone());
        }
    }
    headers.insert(API_GATEWAY_HEADER.to_string(), Value::Bool(true));

    let base64_body = event
        .get(IS_BASE64_ENCODED)
        .and_then(Value::as_bool)
        .unwrap_or(false);

    tracing::debug!(
        method = ?event.get(HTTP_METHOD),
        path = ?event.get(PATH),
        base64_body,
        "Unwrapping API gateway event"
    );

    match event.remove(BODY) {
        Some(Value::String(body)) if base64_body => {
            let bytes = STANDARD
                .decode(body)
                .map_err(|e| FunctionError::PayloadDecode(format!("invalid base64 body: {}", e)))?;
            codec.decode(&bytes, headers, target)
        }
        Some(Value::String(body)) => codec.decode(body.as_bytes(), headers, target),
        None | Some(Value::Null) => match target {
            InputType::Json => codec.decode_value(&Value::Null, headers, target),
            InputType::Text | InputType::Bytes => codec.decode(&[], headers, target),
        },
        Some(body) => codec.decode_value(&body, headers, target),
    }
}

fn status_code(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn header_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use function_context::JsonCodec;
    use serde_json::json;

    fn event(body: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "httpMethod": "POST",
            "path": "/uppercase",
            "headers": { "Content-Type": "application/json", "x-trace": "abc" },
            "body": body,
        }))
        .unwrap()
    }

    #[test]
    fn test_plain_payload_passes_through() {
        let env = generate_message(br#"{"value":"helo"}"#, Headers::new(), InputType::Json, &JsonCodec)
            .unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!({ "value": "helo" })));
        assert!(!env.is_api_gateway());
        assert!(env.headers().is_empty());
    }

    #[test]
    fn test_proxy_event_is_unwrapped() {
        let mut seeded = Headers::new();
        seeded.insert("x-trace".into(), json!("seed"));
        seeded.insert("region".into(), json!("eu"));

        let env = generate_message(
            &event(json!(r#"{"value":"helo"}"#)),
            seeded,
            InputType::Json,
            &JsonCodec,
        )
        .unwrap();

        assert!(env.is_api_gateway());
        assert_eq!(env.payload().as_value(), Some(&json!({ "value": "helo" })));
        assert_eq!(env.header_str("httpMethod"), Some("POST"));
        assert_eq!(env.header_str("path"), Some("/uppercase"));
        assert_eq!(env.header_str("x-trace"), Some("abc"));
        assert_eq!(env.header_str("region"), Some("eu"));
    }

    #[test]
    fn test_proxy_event_object_body_and_text_target() {
        let env = generate_message(&event(json!({ "a": 1 })), Headers::new(), InputType::Json, &JsonCodec)
            .unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!({ "a": 1 })));

        let env = generate_message(&event(json!("hello")), Headers::new(), InputType::Text, &JsonCodec)
            .unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!("hello")));
    }

    #[test]
    fn test_proxy_event_base64_body() {
        let payload = serde_json::to_vec(&json!({
            "httpMethod": "POST",
            "isBase64Encoded": true,
            "body": STANDARD.encode("hello"),
        }))
        .unwrap();
        let env = generate_message(&payload, Headers::new(), InputType::Text, &JsonCodec).unwrap();
        assert_eq!(env.payload().as_value(), Some(&json!("hello")));

        let payload = serde_json::to_vec(&json!({
            "httpMethod": "POST",
            "isBase64Encoded": true,
            "body": "%%%",
        }))
        .unwrap();
        let result = generate_message(&payload, Headers::new(), InputType::Text, &JsonCodec);
        assert!(matches!(result, Err(FunctionError::PayloadDecode(_))));
    }

    #[test]
    fn test_proxy_event_malformed_body() {
        let result = generate_message(&event(json!("{not json")), Headers::new(), InputType::Json, &JsonCodec);
        assert!(matches!(result, Err(FunctionError::PayloadDecode(_))));
    }

    #[test]
    fn test_plain_output_is_payload_bytes() {
        let response = Envelope::new(b"\"HELLO\"".to_vec()).with_header("key1", "hello1");
        let bytes = generate_output(&Headers::new(), response, &JsonCodec).unwrap();
        assert_eq!(bytes, b"\"HELLO\"");
    }

    #[test]
    fn test_proxy_output() {
        let mut request = Headers::new();
        request.insert(API_GATEWAY_HEADER.into(), json!(true));

        let response = Envelope::new(json!({ "value": "helo" }))
            .with_header("key1", "hello1")
            .with_header("count", 3)
            .with_header("statusCode", 201);
        let bytes = generate_output(&request, response, &JsonCodec).unwrap();
        let output: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(output["isBase64Encoded"], json!(false));
        assert_eq!(output["statusCode"], json!(201));
        assert_eq!(output["headers"], json!({ "key1": "hello1", "count": "3" }));
        assert_eq!(output["body"], json!(r#"{"value":"helo"}"#));
    }

    #[test]
    fn test_proxy_output_defaults() {
        let mut request = Headers::new();
        request.insert(API_GATEWAY_HEADER.into(), json!(true));

        let bytes = generate_output(&request, Envelope::new(vec![0xffu8, 0x00]), &JsonCodec).unwrap();
        let output: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(output["statusCode"], json!(200));
        assert_eq!(output["isBase64Encoded"], json!(true));
        assert_eq!(output["body"], json!(STANDARD.encode([0xffu8, 0x00])));
    }
}
