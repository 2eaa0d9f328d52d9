//! Function handlers and their registrations

use async_trait::async_trait;
use function_types::{Envelope, FunctionOutput, FunctionResult, InputType};
use std::sync::Arc;

/// A function that can be registered and invoked by name.
///
/// Handlers receive the (possibly enriched) request envelope and answer with
/// any [`FunctionOutput`] shape. Errors returned here abort the invocation.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn apply(&self, input: Envelope) -> FunctionResult<FunctionOutput>;
}

/// Adapter running a synchronous closure as a [`FunctionHandler`]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap a synchronous closure as a handler
pub fn from_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(Envelope) -> FunctionResult<FunctionOutput> + Send + Sync + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F> FunctionHandler for FnHandler<F>
where
    F: Fn(Envelope) -> FunctionResult<FunctionOutput> + Send + Sync + 'static,
{
    async fn apply(&self, input: Envelope) -> FunctionResult<FunctionOutput> {
        (self.f)(input)
    }
}

/// A handler together with the metadata the registry reports for it
#[derive(Clone)]
pub struct FunctionRegistration {
    name: String,
    input_type: InputType,
    output_stream: bool,
    handler: Arc<dyn FunctionHandler>,
}

impl FunctionRegistration {
    pub fn new(
        name: impl Into<String>,
        input_type: InputType,
        handler: impl FunctionHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input_type,
            output_stream: false,
            handler: Arc::new(handler),
        }
    }

    /// Register a synchronous closure
    pub fn from_fn<F>(name: impl Into<String>, input_type: InputType, f: F) -> Self
    where
        F: Fn(Envelope) -> FunctionResult<FunctionOutput> + Send + Sync + 'static,
    {
        Self::new(name, input_type, from_fn(f))
    }

    /// Declare that this function answers with a lazy stream
    pub fn streaming(mut self) -> Self {
        self.output_stream = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_type(&self) -> InputType {
        self.input_type
    }

    pub fn is_output_stream(&self) -> bool {
        self.output_stream
    }

    /// Invoke the handler
    pub async fn invoke(&self, input: Envelope) -> FunctionResult<FunctionOutput> {
        tracing::debug!(function = %self.name, "Invoking function");
        self.handler.apply(input).await
    }
}

impl std::fmt::Debug for FunctionRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistration")
            .field("name", &self.name)
            .field("input_type", &self.input_type)
            .field("output_stream", &self.output_stream)
            .finish_non_exhaustive()
    }
}
