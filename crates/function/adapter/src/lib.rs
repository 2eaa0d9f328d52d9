//! Function adapter: serve one registered function over a byte transport
//!
//! [`FunctionInvoker`] owns the whole request path:
//!
//! 1. decode the payload (unwrapping API-gateway proxy events)
//! 2. enrich headers from configured expressions
//! 3. invoke the resolved function, composed or not
//! 4. normalize the result, draining streams under [`DrainLimits`]
//! 5. encode the response, wrapping it back up for proxy requests
//!
//! ```no_run
//! use function_adapter::{samples, DrainLimits, FunctionInvoker};
//! use function_context::FunctionProperties;
//! use function_types::Headers;
//!
//! # async fn run() -> function_types::FunctionResult<()> {
//! let registry = samples::sample_registry()?;
//! let invoker = FunctionInvoker::start(
//!     &registry,
//!     &FunctionProperties::new("uppercase"),
//!     DrainLimits::default(),
//! )?;
//! let output = invoker.handle_request(b"\"hello\"", Headers::new()).await?;
//! assert_eq!(output, b"\"HELLO\"");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod drain;
pub mod gateway;
pub mod invoker;
pub mod samples;
pub mod telemetry;

pub use config::{InvokerConfig, LoggingConfig};
pub use drain::{drain, DrainLimits, EmptySequencePolicy};
pub use invoker::FunctionInvoker;
