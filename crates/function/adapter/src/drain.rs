//! Draining lazy function output
//!
//! A stream is consumed to completion before anything is encoded. Limits
//! bound how much a single invocation may buffer; hitting one fails the
//! whole invocation, as does any error yielded by the stream.

use futures::StreamExt;
use function_context::EnvelopeCodec;
use function_types::{FunctionError, FunctionResult, ValueStream};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a stream that yields nothing turns into
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySequencePolicy {
    /// Encode an empty list
    #[default]
    EmptyList,
    /// Fail the invocation
    Fault,
}

/// Bounds on stream drainage
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainLimits {
    /// Maximum number of elements
    #[serde(default)]
    pub max_elements: Option<usize>,

    /// Maximum total encoded size of the elements, in bytes
    #[serde(default)]
    pub max_bytes: Option<usize>,

    /// Result for a stream with no elements
    #[serde(default)]
    pub empty_sequence: EmptySequencePolicy,
}

impl DrainLimits {
    pub fn with_max_elements(mut self, max: usize) -> Self {
        self.max_elements = Some(max);
        self
    }

    pub fn with_max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = Some(max);
        self
    }

    pub fn with_empty_sequence(mut self, policy: EmptySequencePolicy) -> Self {
        self.empty_sequence = policy;
        self
    }
}

/// Drain `stream` and normalize what it produced.
///
/// One element is unwrapped, several become an ordered list, none follows
/// the empty-sequence policy.
pub async fn drain(
    mut stream: ValueStream,
    limits: &DrainLimits,
    codec: &dyn EnvelopeCodec,
) -> FunctionResult<Value> {
    let mut values = Vec::new();
    let mut total_bytes = 0usize;

    while let Some(item) = stream.next().await {
        let value = item?;

        if let Some(max) = limits.max_elements {
            if values.len() + 1 > max {
                return Err(FunctionError::DrainLimitExceeded {
                    limit: "max_elements",
                    observed: values.len() + 1,
                    max,
                });
            }
        }

        if let Some(max) = limits.max_bytes {
            total_bytes += codec.encode(&value)?.len();
            if total_bytes > max {
                return Err(FunctionError::DrainLimitExceeded {
                    limit: "max_bytes",
                    observed: total_bytes,
                    max,
                });
            }
        }

        tracing::debug!(index = values.len(), value = %value, "Response value");
        values.push(value);
    }

    match values.len() {
        0 => match limits.empty_sequence {
            EmptySequencePolicy::EmptyList => Ok(Value::Array(values)),
            EmptySequencePolicy::Fault => Err(FunctionError::EmptySequence),
        },
        1 => Ok(values.remove(0)),
        _ => Ok(Value::Array(values)),
    }
}
