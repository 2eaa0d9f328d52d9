//! Header mapping expressions
//!
//! A deliberately small expression language used to compute header values
//! from an inbound request. Expressions are parsed once into an AST and
//! interpreted against an [`EvaluationContext`] whose roots are plain
//! `serde_json::Value`s, so evaluation errors are structured values rather
//! than reflective failures.
//!
//! # Example
//!
//! ```rust
//! use function_expression::{EvaluationContext, Expression};
//! use serde_json::json;
//!
//! let context = EvaluationContext::new()
//!     .with_root("headers", json!({ "path": "foo/bar/baz" }));
//!
//! let expr = Expression::parse("headers.path.split('/')[0]").unwrap();
//! assert_eq!(expr.evaluate(&context).unwrap(), json!("foo"));
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod parser;

pub use errors::{ExpressionError, ExpressionResult};
pub use evaluator::{display, EvaluationContext, Expression};
pub use parser::{BinaryOp, Expr, Parser, UnaryOp};
