//! Core types for the function invocation adapter
//!
//! Every function invocation moves through the same small set of values:
//!
//! - [`Envelope`]: a payload plus string-keyed headers, used for both the
//!   inbound request and the outbound response
//! - [`FunctionOutput`]: the tagged union of shapes a function may return
//!   (single value, list, lazy stream, pre-built envelope)
//! - [`FunctionError`]: the error taxonomy shared by every layer
//!
//! These types carry no behavior beyond construction and inspection. Decoding,
//! enrichment and dispatch live in the `function-context` and
//! `function-adapter` crates.

#![deny(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod output;

pub use envelope::{Envelope, FunctionInput, Headers, InputType, Payload};
pub use error::{FunctionError, FunctionResult};
pub use output::{FunctionOutput, ValueStream};
