//! Function results
//!
//! A function can answer with one value, an ordered list, a lazily produced
//! stream, or an envelope it built itself. [`FunctionOutput`] keeps those four
//! shapes apart so that normalization is a single exhaustive match.

use crate::{Envelope, FunctionResult};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;

/// A lazily produced sequence of values
pub type ValueStream = BoxStream<'static, FunctionResult<Value>>;

/// The raw result of invoking a function
pub enum FunctionOutput {
    /// A single value
    Value(Value),
    /// An ordered list, encoded as-is
    List(Vec<Value>),
    /// A lazy sequence that must be drained
    Stream(ValueStream),
    /// A response the function built itself
    Envelope(Envelope),
}

impl FunctionOutput {
    /// Wrap an already-materialized sequence as a stream
    pub fn stream_of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        FunctionOutput::Stream(stream::iter(values.into_iter().map(Ok)).boxed())
    }

    /// Wrap a fallible sequence as a stream
    pub fn try_stream_of<I>(items: I) -> Self
    where
        I: IntoIterator<Item = FunctionResult<Value>>,
        I::IntoIter: Send + 'static,
    {
        FunctionOutput::Stream(stream::iter(items).boxed())
    }

    /// Short name of the shape, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            FunctionOutput::Value(_) => "value",
            FunctionOutput::List(_) => "list",
            FunctionOutput::Stream(_) => "stream",
            FunctionOutput::Envelope(_) => "envelope",
        }
    }
}

impl std::fmt::Debug for FunctionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionOutput::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FunctionOutput::List(v) => f.debug_tuple("List").field(v).finish(),
            FunctionOutput::Stream(_) => f.write_str("Stream(..)"),
            FunctionOutput::Envelope(e) => f.debug_tuple("Envelope").field(e).finish(),
        }
    }
}

impl From<Value> for FunctionOutput {
    fn from(value: Value) -> Self {
        FunctionOutput::Value(value)
    }
}

impl From<Envelope> for FunctionOutput {
    fn from(envelope: Envelope) -> Self {
        FunctionOutput::Envelope(envelope)
    }
}

impl From<Vec<Value>> for FunctionOutput {
    fn from(values: Vec<Value>) -> Self {
        FunctionOutput::List(values)
    }
}
