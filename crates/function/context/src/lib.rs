//! Function context: everything needed to resolve and feed a function
//!
//! # Architecture
//!
//! - [`FunctionRegistry`]: Stores registered functions and resolves
//!   definitions (including `a|b` pipelines) into a [`FunctionReference`]
//! - [`FunctionHandler`]: The async seam every registered function implements
//! - [`EnvelopeCodec`] / [`JsonCodec`]: Turns bytes into envelopes and values
//!   back into bytes
//! - [`InputEnricher`]: Computes extra headers from expressions before a
//!   request reaches its function
//! - [`FunctionProperties`]: The configuration surface naming the function
//!   and its header mapping expressions
//!
//! The registry is built once at startup and then only read, so a
//! [`FunctionReference`] can be shared across concurrent invocations.

#![deny(unsafe_code)]

pub mod codec;
pub mod enricher;
pub mod handler;
pub mod properties;
pub mod registry;

pub use codec::{EnvelopeCodec, JsonCodec};
pub use enricher::{HeaderMappingRules, InputEnricher, DEFAULT_STAGE};
pub use handler::{from_fn, FnHandler, FunctionHandler, FunctionRegistration};
pub use properties::{FunctionConfiguration, FunctionProperties, HeaderMappingExpression};
pub use registry::{FunctionReference, FunctionRegistry, DEFAULT_CONTENT_TYPE};
