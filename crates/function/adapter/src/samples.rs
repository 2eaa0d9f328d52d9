//! Functions bundled with the `function-invoker` binary

use function_context::{FunctionRegistration, FunctionRegistry};
use function_types::{FunctionError, FunctionOutput, FunctionResult, InputType, Payload};
use serde_json::Value;

/// Registry holding `echo`, `uppercase`, `split` and `words`
pub fn sample_registry() -> FunctionResult<FunctionRegistry> {
    let mut registry = FunctionRegistry::new();

    // Returns the request, headers included
    registry.register(FunctionRegistration::from_fn("echo", InputType::Json, |input| {
        Ok(FunctionOutput::Envelope(input))
    }))?;

    registry.register(FunctionRegistration::from_fn(
        "uppercase",
        InputType::Text,
        |input| Ok(Value::String(text("uppercase", input.payload())?.to_uppercase()).into()),
    ))?;

    // Comma-separated text into a list
    registry.register(FunctionRegistration::from_fn("split", InputType::Text, |input| {
        let parts = text("split", input.payload())?
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect::<Vec<_>>();
        Ok(FunctionOutput::List(parts))
    }))?;

    registry.register(
        FunctionRegistration::from_fn("words", InputType::Text, |input| {
            let words = text("words", input.payload())?
                .split_whitespace()
                .map(|word| Value::String(word.to_string()))
                .collect::<Vec<_>>();
            Ok(FunctionOutput::stream_of(words))
        })
        .streaming(),
    )?;

    Ok(registry)
}

fn text<'a>(function: &str, payload: &'a Payload) -> FunctionResult<&'a str> {
    match payload {
        Payload::Value(Value::String(s)) => Ok(s.as_str()),
        Payload::Bytes(bytes) => std::str::from_utf8(bytes)
            .map_err(|e| FunctionError::invocation(function, format!("expected text: {}", e))),
        Payload::Value(other) => Err(FunctionError::invocation(
            function,
            format!("expected text, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use function_context::DEFAULT_CONTENT_TYPE;
    use function_types::Envelope;
    use serde_json::json;

    #[test]
    fn test_sample_registry() {
        let registry = sample_registry().unwrap();
        assert_eq!(registry.names(), vec!["echo", "split", "uppercase", "words"]);
        assert!(registry.get("words").unwrap().is_output_stream());
    }

    #[tokio::test]
    async fn test_uppercase_pipeline() {
        let registry = sample_registry().unwrap();
        let function = registry.lookup("uppercase|split", DEFAULT_CONTENT_TYPE).unwrap();

        let output = function.apply(Envelope::new(json!("a, b"))).await.unwrap();
        let FunctionOutput::List(values) = output else {
            panic!("expected list, got {}", output.kind());
        };
        assert_eq!(values, vec![json!("A"), json!("B")]);
    }

    #[tokio::test]
    async fn test_non_text_fails() {
        let registry = sample_registry().unwrap();
        let function = registry.lookup("uppercase", DEFAULT_CONTENT_TYPE).unwrap();

        let result = function.apply(Envelope::new(json!(42))).await;
        assert!(matches!(result, Err(FunctionError::Invocation { .. })));
    }
}
