//! Input enricher: expression-based header injection
//!
//! Each rule maps a header name to an expression. Before a request reaches
//! its function, every rule of the default stage is evaluated against the
//! ORIGINAL request (roots `headers` and `payload`) and the results are
//! written as headers on a copy of the envelope. Rules never observe values
//! written by other rules in the same pass.

use function_expression::{EvaluationContext, Expression, ExpressionError};
use function_types::{Envelope, FunctionError, FunctionInput, FunctionResult};
use serde_json::Value;
use std::collections::BTreeMap;

/// Stage used for rules configured without an index
pub const DEFAULT_STAGE: &str = "0";

/// Header mapping rules, grouped by stage index
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMappingRules {
    stages: BTreeMap<String, Vec<(String, String)>>,
}

impl HeaderMappingRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule to the default stage
    pub fn with_rule(self, field: impl Into<String>, expression: impl Into<String>) -> Self {
        self.with_indexed_rule(DEFAULT_STAGE, field, expression)
    }

    /// Add a rule to a specific stage, replacing an earlier rule for the
    /// same field in that stage
    pub fn with_indexed_rule(
        mut self,
        index: impl Into<String>,
        field: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        let field = field.into();
        let expression = expression.into();
        let rules = self.stages.entry(index.into()).or_default();
        match rules.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = expression,
            None => rules.push((field, expression)),
        }
        self
    }

    /// Rules of one stage, in insertion order
    pub fn stage(&self, index: &str) -> Option<&[(String, String)]> {
        self.stages.get(index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.values().all(Vec::is_empty)
    }

    /// Total number of rules across stages
    pub fn len(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }
}

/// One rule with its expression parsed up front
#[derive(Clone, Debug)]
struct CompiledRule {
    field: String,
    source: String,
    expression: Result<Expression, ExpressionError>,
}

/// Evaluates header mapping rules against request envelopes
#[derive(Clone, Debug)]
pub struct InputEnricher {
    rules: Vec<CompiledRule>,
}

impl InputEnricher {
    /// Build an enricher for the default stage of `rules`.
    ///
    /// Fails if there are no rules, or none in the default stage. A rule that
    /// does not parse is kept and fails every enrichment that reaches it.
    pub fn new(rules: &HeaderMappingRules) -> FunctionResult<Self> {
        if rules.is_empty() {
            return Err(FunctionError::Configuration(
                "header mapping expressions must not be empty".into(),
            ));
        }

        let stage = rules
            .stage(DEFAULT_STAGE)
            .filter(|stage| !stage.is_empty())
            .ok_or_else(|| {
                FunctionError::Configuration(format!(
                    "header mapping expressions must define stage '{}'",
                    DEFAULT_STAGE
                ))
            })?;

        let rules = stage
            .iter()
            .map(|(field, source)| {
                let expression = Expression::parse(source);
                if let Err(e) = &expression {
                    tracing::warn!(field = %field, expression = %source, error = %e, "Header mapping expression does not parse");
                }
                CompiledRule {
                    field: field.clone(),
                    source: source.clone(),
                    expression,
                }
            })
            .collect();

        Ok(Self { rules })
    }

    /// Header names this enricher writes, in evaluation order
    pub fn fields(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.field.as_str()).collect()
    }

    /// Return a copy of `envelope` with every rule's result set as a header
    pub fn enrich(&self, envelope: &Envelope) -> FunctionResult<Envelope> {
        let context = EvaluationContext::new()
            .with_root(
                "headers",
                Value::Object(envelope.headers().clone().into_iter().collect()),
            )
            .with_root("payload", envelope.payload().to_value());

        let mut enriched = envelope.clone();
        for rule in &self.rules {
            let value = rule
                .expression
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|expression| expression.evaluate(&context))
                .map_err(|e| FunctionError::ExpressionEvaluation {
                    field: rule.field.clone(),
                    expression: rule.source.clone(),
                    message: e.to_string(),
                })?;

            tracing::debug!(header = %rule.field, value = %value, "Header computed from expression");
            enriched = enriched.with_header(rule.field.clone(), value);
        }

        Ok(enriched)
    }

    /// Enrich message-shaped input; anything else passes through unchanged
    pub fn enrich_input(&self, input: FunctionInput) -> FunctionResult<FunctionInput> {
        match input {
            FunctionInput::Message(envelope) => self.enrich(&envelope).map(FunctionInput::Message),
            raw @ FunctionInput::Raw(_) => Ok(raw),
        }
    }
}
