//! End-to-end invocation scenarios: bytes in, bytes out

use function_adapter::{DrainLimits, EmptySequencePolicy, FunctionInvoker};
use function_context::{FunctionProperties, FunctionRegistration, FunctionRegistry};
use function_types::{FunctionError, FunctionOutput, Headers, InputType};
use serde_json::{json, Value};

fn registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    registry
        .register(FunctionRegistration::from_fn("echo", InputType::Json, |input| {
            Ok(FunctionOutput::Envelope(input))
        }))
        .unwrap();

    registry
        .register(FunctionRegistration::from_fn("foo", InputType::Json, |input| {
            let wrapped = json!({ "foo": input.payload().to_value() });
            Ok(FunctionOutput::Envelope(input.with_payload(wrapped)))
        }))
        .unwrap();

    registry
        .register(FunctionRegistration::from_fn("single", InputType::Json, |input| {
            Ok(FunctionOutput::Value(input.payload().to_value()))
        }))
        .unwrap();

    registry
        .register(FunctionRegistration::from_fn("list", InputType::Json, |_| {
            Ok(FunctionOutput::List(vec![json!("only")]))
        }))
        .unwrap();

    registry
        .register(
            FunctionRegistration::from_fn("repeat", InputType::Json, |input| {
                let count = input.payload().to_value().as_u64().unwrap_or(0);
                Ok(FunctionOutput::stream_of(
                    (0..count).map(|i| json!(format!("item-{}", i))).collect::<Vec<_>>(),
                ))
            })
            .streaming(),
        )
        .unwrap();

    registry
        .register(
            FunctionRegistration::from_fn("broken", InputType::Json, |_| {
                Ok(FunctionOutput::try_stream_of(vec![
                    Ok(json!(1)),
                    Err(FunctionError::invocation("broken", "upstream closed")),
                ]))
            })
            .streaming(),
        )
        .unwrap();

    registry
        .register(FunctionRegistration::from_fn("flaky", InputType::Text, |input| {
            match input.payload().to_value() {
                Value::String(s) if s == "boom" => Err(FunctionError::invocation("flaky", "boom")),
                other => Ok(FunctionOutput::Value(other)),
            }
        }))
        .unwrap();

    registry
}

fn invoker(properties: FunctionProperties) -> FunctionInvoker {
    FunctionInvoker::start(&registry(), &properties, DrainLimits::default()).unwrap()
}

fn invoker_named(definition: &str) -> FunctionInvoker {
    invoker(FunctionProperties::new(definition))
}

#[tokio::test]
async fn test_single_value_is_encoded_directly() {
    let output = invoker_named("single")
        .handle_request(br#"{"value":"helo"}"#, Headers::new())
        .await
        .unwrap();
    assert_eq!(output, br#"{"value":"helo"}"#);
}

#[tokio::test]
async fn test_list_is_not_unwrapped() {
    let output = invoker_named("list")
        .handle_request(b"null", Headers::new())
        .await
        .unwrap();
    assert_eq!(output, br#"["only"]"#);
}

#[tokio::test]
async fn test_one_element_stream_is_unwrapped() {
    let output = invoker_named("repeat")
        .handle_request(b"1", Headers::new())
        .await
        .unwrap();
    assert_eq!(output, br#""item-0""#);
}

#[tokio::test]
async fn test_many_element_stream_is_ordered_list() {
    let output = invoker_named("repeat")
        .handle_request(b"3", Headers::new())
        .await
        .unwrap();
    assert_eq!(output, br#"["item-0","item-1","item-2"]"#);
}

#[tokio::test]
async fn test_empty_stream() {
    let output = invoker_named("repeat")
        .handle_request(b"0", Headers::new())
        .await
        .unwrap();
    assert_eq!(output, b"[]");

    let strict = FunctionInvoker::start(
        &registry(),
        &FunctionProperties::new("repeat"),
        DrainLimits::default().with_empty_sequence(EmptySequencePolicy::Fault),
    )
    .unwrap();
    let result = strict.handle_request(b"0", Headers::new()).await;
    assert!(matches!(result, Err(FunctionError::EmptySequence)));
}

#[tokio::test]
async fn test_drain_limit_exceeded() {
    let bounded = FunctionInvoker::start(
        &registry(),
        &FunctionProperties::new("repeat"),
        DrainLimits::default().with_max_elements(5),
    )
    .unwrap();

    assert!(bounded.handle_request(b"5", Headers::new()).await.is_ok());

    let result = bounded.handle_request(b"6", Headers::new()).await;
    assert!(matches!(
        result,
        Err(FunctionError::DrainLimitExceeded { limit: "max_elements", .. })
    ));
}

#[tokio::test]
async fn test_stream_error_fails_invocation() {
    let result = invoker_named("broken")
        .handle_request(b"null", Headers::new())
        .await;
    assert!(matches!(result, Err(FunctionError::Invocation { .. })));
}

#[tokio::test]
async fn test_malformed_payload() {
    let result = invoker_named("single")
        .handle_request(br#"{"value":"#, Headers::new())
        .await;
    assert!(matches!(result, Err(FunctionError::PayloadDecode(_))));
}

#[tokio::test]
async fn test_invoker_survives_failed_request() {
    let invoker = invoker_named("flaky");

    let result = invoker.handle_request(b"boom", Headers::new()).await;
    assert!(matches!(result, Err(FunctionError::Invocation { .. })));

    let output = invoker.handle_request(b"fine", Headers::new()).await.unwrap();
    assert_eq!(output, br#""fine""#);
}

#[tokio::test]
async fn test_enriched_headers_reach_response() {
    let invoker = invoker(FunctionProperties::new("echo").with_header_mapping("echo", "key1", "'hello1'"));
    assert!(invoker.is_enriched());

    let response = invoker
        .invoke(br#"{"value":"helo"}"#, Headers::new())
        .await
        .unwrap();

    assert_eq!(response.header_str("key1"), Some("hello1"));
    assert_eq!(
        response.payload().as_bytes(),
        Some(br#"{"value":"helo"}"#.as_slice())
    );
}

#[tokio::test]
async fn test_enriched_headers_in_proxy_response() {
    let invoker = invoker(FunctionProperties::new("echo").with_header_mapping("echo", "key1", "'hello1'"));

    let event = json!({
        "httpMethod": "POST",
        "path": "/echo",
        "headers": { "accept": "application/json" },
        "body": r#"{"value":"helo"}"#,
    });
    let output = invoker
        .handle_request(&serde_json::to_vec(&event).unwrap(), Headers::new())
        .await
        .unwrap();
    let output: Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(output["isBase64Encoded"], json!(false));
    assert_eq!(output["statusCode"], json!(200));
    assert_eq!(output["body"], json!(r#"{"value":"helo"}"#));
    assert_eq!(output["headers"]["key1"], json!("hello1"));
    assert_eq!(output["headers"]["httpMethod"], json!("POST"));
    assert_eq!(output["headers"]["accept"], json!("application/json"));
    assert_eq!(output["headers"]["aws-api-gateway"], json!("true"));
}

#[tokio::test]
async fn test_composed_definition() {
    let invoker = invoker(
        FunctionProperties::new("echo|foo").with_header_mapping("echo|foo", "key1", "'hello1'"),
    );
    assert!(invoker.function().is_composed());
    assert_eq!(invoker.function().stage_names(), vec!["echo", "foo"]);

    let response = invoker
        .invoke(br#"{"value":"helo"}"#, Headers::new())
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(response.payload().as_bytes().unwrap()).unwrap();

    assert_eq!(body, json!({ "foo": { "value": "helo" } }));
    assert_eq!(response.header_str("key1"), Some("hello1"));
}

#[tokio::test]
async fn test_split_expression_from_transport_header() {
    let invoker = invoker(
        FunctionProperties::new("echo")
            .with_header_mapping("echo", "key1", "headers.path.split('/')[0]")
            .with_header_mapping("echo", "key2", "headers.path.split('/')[2]"),
    );

    let mut metadata = Headers::new();
    metadata.insert("path".into(), json!("foo/bar/baz"));

    let response = invoker.invoke(b"{}", metadata).await.unwrap();
    assert_eq!(response.header_str("key1"), Some("foo"));
    assert_eq!(response.header_str("key2"), Some("baz"));
}

#[tokio::test]
async fn test_failed_enrichment_aborts_request() {
    let invoker = invoker(FunctionProperties::new("echo").with_header_mapping("echo", "key1", "headers.path"));

    let result = invoker.invoke(b"{}", Headers::new()).await;
    assert!(matches!(
        result,
        Err(FunctionError::ExpressionEvaluation { ref field, .. }) if field == "key1"
    ));
}

#[tokio::test]
async fn test_empty_definition_needs_single_function() {
    let result = FunctionInvoker::start(&registry(), &FunctionProperties::default(), DrainLimits::default());
    assert!(matches!(result, Err(FunctionError::FunctionNotFound(_))));

    let mut only = FunctionRegistry::new();
    only.register(FunctionRegistration::from_fn("echo", InputType::Json, |input| {
        Ok(FunctionOutput::Envelope(input))
    }))
    .unwrap();

    let invoker = FunctionInvoker::start(&only, &FunctionProperties::default(), DrainLimits::default()).unwrap();
    assert_eq!(invoker.function().definition(), "echo");
}
