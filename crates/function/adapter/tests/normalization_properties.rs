//! Property tests for result normalization and header enrichment

use function_adapter::{DrainLimits, FunctionInvoker};
use function_context::{
    FunctionProperties, FunctionRegistration, FunctionRegistry, HeaderMappingRules, InputEnricher,
};
use function_types::{Envelope, FunctionOutput, Headers, InputType};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Registry whose only function streams back the elements of its array input
fn replay_invoker() -> FunctionInvoker {
    let mut registry = FunctionRegistry::new();
    registry
        .register(
            FunctionRegistration::from_fn("replay", InputType::Json, |input| {
                let values = match input.payload().to_value() {
                    Value::Array(values) => values,
                    other => vec![other],
                };
                Ok(FunctionOutput::stream_of(values))
            })
            .streaming(),
        )
        .unwrap();

    FunctionInvoker::start(&registry, &FunctionProperties::new("replay"), DrainLimits::default())
        .unwrap()
}

proptest! {
    #[test]
    fn prop_streams_normalize_by_length(values in prop::collection::vec(any::<i64>(), 0..32)) {
        let invoker = replay_invoker();
        let payload = serde_json::to_vec(&values).unwrap();

        let output = futures::executor::block_on(invoker.handle_request(&payload, Headers::new()))
            .unwrap();
        let output: Value = serde_json::from_slice(&output).unwrap();

        match values.len() {
            1 => prop_assert_eq!(output, json!(values[0])),
            _ => prop_assert_eq!(output, json!(values)),
        }
    }

    #[test]
    fn prop_enrichment_is_idempotent(
        path in "[a-z0-9/]{0,24}",
        literal in "[a-zA-Z0-9 ]{0,16}",
    ) {
        let rules = HeaderMappingRules::new()
            .with_rule("copy", "headers.path")
            .with_rule("literal", format!("'{}'", literal));
        let enricher = InputEnricher::new(&rules).unwrap();

        let envelope = Envelope::new(json!({ "value": "helo" })).with_header("path", path.clone());
        let once = enricher.enrich(&envelope).unwrap();
        let twice = enricher.enrich(&once).unwrap();

        prop_assert_eq!(once.header_str("copy"), Some(path.as_str()));
        prop_assert_eq!(once.header_str("literal"), Some(literal.as_str()));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_disjoint_enrichers_compose_to_union(
        first in prop::collection::btree_map("a_[a-z]{1,6}", "[a-z0-9]{0,8}", 1..5),
        second in prop::collection::btree_map("b_[a-z]{1,6}", "[a-z0-9]{0,8}", 1..5),
        path in "[a-z0-9/]{0,24}",
    ) {
        let rules_for = |fields: &std::collections::BTreeMap<String, String>| {
            fields.iter().fold(HeaderMappingRules::new(), |rules, (field, value)| {
                rules.with_rule(field.clone(), format!("'{}'", value))
            })
        };
        let enrich_first = InputEnricher::new(&rules_for(&first)).unwrap();
        let enrich_second = InputEnricher::new(&rules_for(&second)).unwrap();

        let envelope = Envelope::new(json!({ "value": "helo" })).with_header("path", path.clone());
        let enriched = enrich_second
            .enrich(&enrich_first.enrich(&envelope).unwrap())
            .unwrap();

        let mut expected = Headers::new();
        expected.insert("path".to_string(), json!(path));
        for (field, value) in first.iter().chain(second.iter()) {
            expected.insert(field.clone(), json!(value));
        }

        prop_assert_eq!(enriched.headers(), &expected);
        prop_assert_eq!(enriched.payload(), envelope.payload());
    }
}
