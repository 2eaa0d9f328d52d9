//! Function registry: stores functions and resolves definitions
//!
//! A definition is either a single function name or a pipeline of names
//! joined with `|` (or `,`). Resolving a pipeline yields one
//! [`FunctionReference`] that applies each stage left to right. The registry
//! is populated during startup and only read afterwards.

use crate::codec::{EnvelopeCodec, JsonCodec};
use crate::handler::FunctionRegistration;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use function_types::{
    Envelope, FunctionError, FunctionOutput, FunctionResult, Headers, InputType, Payload,
    ValueStream,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Content type used when the caller does not ask for a specific one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Characters separating stages in a composed definition
pub const SEPARATORS: [char; 2] = ['|', ','];

type Stages = Arc<[Arc<FunctionRegistration>]>;

/// Registry of invocable functions
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<FunctionRegistration>>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its name
    pub fn register(&mut self, registration: FunctionRegistration) -> FunctionResult<()> {
        let name = registration.name().to_string();

        if name.trim().is_empty() {
            return Err(FunctionError::Configuration(
                "function name must not be empty".into(),
            ));
        }
        if name.contains(SEPARATORS) {
            return Err(FunctionError::Configuration(format!(
                "function name '{}' must not contain a composition separator",
                name
            )));
        }
        if self.functions.contains_key(&name) {
            return Err(FunctionError::Configuration(format!(
                "function '{}' is already registered",
                name
            )));
        }

        tracing::info!(function = %name, input_type = %registration.input_type(), "Function registered");
        self.functions.insert(name, Arc::new(registration));
        Ok(())
    }

    /// Resolve a definition into a callable reference.
    ///
    /// An empty definition resolves to the only registered function, if
    /// there is exactly one.
    pub fn lookup(&self, definition: &str, content_type: &str) -> FunctionResult<FunctionReference> {
        let definition = definition.trim();

        if definition.is_empty() {
            return match self.functions.values().next() {
                Some(only) if self.functions.len() == 1 => Ok(FunctionReference::new(
                    only.name().to_string(),
                    content_type,
                    vec![only.clone()],
                )),
                _ => Err(FunctionError::FunctionNotFound(String::new())),
            };
        }

        let stages = definition
            .split(SEPARATORS)
            .map(str::trim)
            .map(|name| {
                self.functions
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FunctionError::FunctionNotFound(name.to_string()))
            })
            .collect::<FunctionResult<Vec<_>>>()?;

        Ok(FunctionReference::new(
            definition.to_string(),
            content_type,
            stages,
        ))
    }

    pub fn get(&self, name: &str) -> Option<&FunctionRegistration> {
        self.functions.get(name).map(Arc::as_ref)
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.functions.len()
    }
}

// ── Function Reference ───────────────────────────────────────────────

/// A resolved, possibly composed, function
#[derive(Clone)]
pub struct FunctionReference {
    definition: String,
    content_type: String,
    stages: Stages,
    codec: Arc<dyn EnvelopeCodec>,
}

impl FunctionReference {
    fn new(definition: String, content_type: &str, stages: Vec<Arc<FunctionRegistration>>) -> Self {
        Self {
            definition,
            content_type: content_type.to_string(),
            stages: stages.into(),
            codec: Arc::new(JsonCodec),
        }
    }

    /// Replace the codec that converts one stage's output into the next
    /// stage's declared input type
    pub fn with_codec(mut self, codec: Arc<dyn EnvelopeCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// The definition this reference was resolved from
    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Input type declared by the first stage
    pub fn input_type(&self) -> InputType {
        self.stages
            .first()
            .map(|stage| stage.input_type())
            .unwrap_or_default()
    }

    /// Whether any stage answers with a lazy stream
    pub fn is_output_stream(&self) -> bool {
        self.stages.iter().any(|stage| stage.is_output_stream())
    }

    pub fn is_composed(&self) -> bool {
        self.stages.len() > 1
    }

    /// Names of the stages, in application order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Apply the function (every stage, in order) to a request envelope
    pub async fn apply(&self, input: Envelope) -> FunctionResult<FunctionOutput> {
        let headers = input.headers().clone();
        run_stages(self.stages.clone(), self.codec.clone(), 0, input, headers).await
    }
}

impl std::fmt::Debug for FunctionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionReference")
            .field("definition", &self.definition)
            .field("content_type", &self.content_type)
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Run `stages[index..]`, feeding each output into the next stage.
///
/// Stages after the first receive their input converted to their declared
/// input type. A stream output switches to element-wise application of the
/// remaining stages.
fn run_stages(
    stages: Stages,
    codec: Arc<dyn EnvelopeCodec>,
    index: usize,
    input: Envelope,
    headers: Headers,
) -> BoxFuture<'static, FunctionResult<FunctionOutput>> {
    async move {
        let mut output = stages[index].invoke(input).await?;

        for next in index + 1..stages.len() {
            let target = stages[next].input_type();
            let input = match output {
                FunctionOutput::Stream(stream) => {
                    return Ok(FunctionOutput::Stream(through_stages(
                        stream, stages, codec, next, headers,
                    )));
                }
                FunctionOutput::Value(value) => {
                    codec.decode_value(&value, headers.clone(), target)?
                }
                FunctionOutput::List(values) => {
                    codec.decode_value(&Value::Array(values), headers.clone(), target)?
                }
                FunctionOutput::Envelope(envelope) => {
                    let (payload, own) = envelope.into_parts();
                    let mut merged = headers.clone();
                    merged.extend(own);
                    convert(codec.as_ref(), payload, merged, target)?
                }
            };
            output = stages[next].invoke(input).await?;
        }

        Ok(output)
    }
    .boxed()
}

/// Map every stream element through `stages[index..]` and flatten the results
fn through_stages(
    stream: ValueStream,
    stages: Stages,
    codec: Arc<dyn EnvelopeCodec>,
    index: usize,
    headers: Headers,
) -> ValueStream {
    stream
        .then(move |item| {
            let stages = stages.clone();
            let codec = codec.clone();
            let headers = headers.clone();
            async move {
                let target = stages[index].input_type();
                let input = codec.decode_value(&item?, headers.clone(), target)?;
                let output = run_stages(stages, codec, index, input, headers).await?;
                collect_values(output).await
            }
        })
        .map_ok(|values| stream::iter(values.into_iter().map(Ok::<Value, FunctionError>)))
        .try_flatten()
        .boxed()
}

/// Re-decode a payload as `target`; byte payloads go through `decode`
fn convert(
    codec: &dyn EnvelopeCodec,
    payload: Payload,
    headers: Headers,
    target: InputType,
) -> FunctionResult<Envelope> {
    match payload {
        Payload::Value(value) => codec.decode_value(&value, headers, target),
        Payload::Bytes(bytes) => codec.decode(&bytes, headers, target),
    }
}

async fn collect_values(output: FunctionOutput) -> FunctionResult<Vec<Value>> {
    match output {
        FunctionOutput::Value(value) => Ok(vec![value]),
        FunctionOutput::List(values) => Ok(values),
        FunctionOutput::Envelope(envelope) => Ok(vec![envelope.payload().to_value()]),
        FunctionOutput::Stream(stream) => stream.try_collect().await,
    }
}
