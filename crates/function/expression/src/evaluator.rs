//! Evaluator: interprets an expression tree against an evaluation context
//!
//! The context exposes a fixed set of named root values. There is no
//! reflection: property access only reads JSON objects, and method calls
//! are limited to the string, array and object methods dispatched below.

use crate::errors::{ExpressionError, ExpressionResult};
use crate::parser::{BinaryOp, Expr, Parser, UnaryOp};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The named values an expression can start from
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluationContext {
    roots: BTreeMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root value, replacing one with the same name
    pub fn with_root(mut self, name: impl Into<String>, value: Value) -> Self {
        self.roots.insert(name.into(), value);
        self
    }

    pub fn root(&self, name: &str) -> Option<&Value> {
        self.roots.get(name)
    }
}

/// A parsed expression, ready to evaluate any number of times
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parse expression text
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        let ast = Parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against a context
    pub fn evaluate(&self, context: &EvaluationContext) -> ExpressionResult<Value> {
        eval(&self.ast, context)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn eval(expr: &Expr, ctx: &EvaluationContext) -> ExpressionResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Root(name) => ctx
            .root(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownRoot(name.clone())),
        Expr::Property {
            target,
            name,
            null_safe,
        } => {
            let target = eval(target, ctx)?;
            read_property(target, name, *null_safe)
        }
        Expr::Index { target, index } => {
            let target = eval(target, ctx)?;
            let index = eval(index, ctx)?;
            read_index(target, index)
        }
        Expr::MethodCall {
            target,
            method,
            args,
            null_safe,
        } => {
            let target = eval(target, ctx)?;
            if target.is_null() {
                return if *null_safe {
                    Ok(Value::Null)
                } else {
                    Err(ExpressionError::NullReference(format!("{}()", method)))
                };
            }
            let args = args
                .iter()
                .map(|arg| eval(arg, ctx))
                .collect::<ExpressionResult<Vec<_>>>()?;
            call_method(target, method, &args)
        }
        Expr::Unary { op, operand } => {
            let operand = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!expect_bool(&operand, "'!'")?)),
                UnaryOp::Negate => negate(operand),
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, ctx),
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            let condition = eval(condition, ctx)?;
            if expect_bool(&condition, "'?:'")? {
                eval(then_branch, ctx)
            } else {
                eval(else_branch, ctx)
            }
        }
    }
}

fn read_property(target: Value, name: &str, null_safe: bool) -> ExpressionResult<Value> {
    match target {
        Value::Object(mut map) => map
            .remove(name)
            .ok_or_else(|| ExpressionError::MissingProperty(name.to_string())),
        Value::Null if null_safe => Ok(Value::Null),
        Value::Null => Err(ExpressionError::NullReference(name.to_string())),
        other => Err(ExpressionError::TypeMismatch {
            operation: format!("property '{}'", name),
            found: type_name(&other).into(),
        }),
    }
}

fn read_index(target: Value, index: Value) -> ExpressionResult<Value> {
    match (target, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let i = position(&n, items.len())?;
            Ok(items.swap_remove(i))
        }
        (Value::String(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let i = position(&n, chars.len())?;
            Ok(Value::String(chars[i].to_string()))
        }
        (Value::Object(mut map), Value::String(key)) => map
            .remove(&key)
            .ok_or(ExpressionError::MissingProperty(key)),
        (Value::Null, _) => Err(ExpressionError::NullReference("[]".into())),
        (target, index) => Err(ExpressionError::TypeMismatch {
            operation: format!("index {}", index),
            found: type_name(&target).into(),
        }),
    }
}

fn position(n: &serde_json::Number, len: usize) -> ExpressionResult<usize> {
    let i = n.as_i64().ok_or_else(|| ExpressionError::TypeMismatch {
        operation: "index".into(),
        found: format!("number {}", n),
    })?;
    usize::try_from(i)
        .ok()
        .filter(|i| *i < len)
        .ok_or(ExpressionError::IndexOutOfBounds { index: i, len })
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext,
) -> ExpressionResult<Value> {
    // `and`/`or` stop before touching the right-hand side
    match op {
        BinaryOp::And => {
            let left = eval(left, ctx)?;
            if !expect_bool(&left, &op.to_string())? {
                return Ok(Value::Bool(false));
            }
        }
        BinaryOp::Or => {
            let left = eval(left, ctx)?;
            if expect_bool(&left, &op.to_string())? {
                return Ok(Value::Bool(true));
            }
        }
        _ => {
            let left = eval(left, ctx)?;
            let right = eval(right, ctx)?;
            return apply_binary(op, &left, &right);
        }
    }

    let right = eval(right, ctx)?;
    Ok(Value::Bool(expect_bool(&right, &op.to_string())?))
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> ExpressionResult<Value> {
    let operation = op.to_string();
    match op {
        BinaryOp::Equal => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::NotEqual => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Add if left.is_string() || right.is_string() => {
            Ok(Value::String(display(left) + &display(right)))
        }
        BinaryOp::Add => arithmetic(left, right, &operation, i64::checked_add, |a, b| a + b),
        BinaryOp::Subtract => arithmetic(left, right, &operation, i64::checked_sub, |a, b| a - b),
        BinaryOp::And => Ok(Value::Bool(
            expect_bool(left, &operation)? && expect_bool(right, &operation)?,
        )),
        BinaryOp::Or => Ok(Value::Bool(
            expect_bool(left, &operation)? || expect_bool(right, &operation)?,
        )),
    }
}

fn arithmetic(
    left: &Value,
    right: &Value,
    operation: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> ExpressionResult<Value> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        let offending = if left.is_number() { right } else { left };
        return Err(ExpressionError::TypeMismatch {
            operation: operation.to_string(),
            found: type_name(offending).into(),
        });
    };

    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        if let Some(n) = int_op(a, b) {
            return Ok(Value::from(n));
        }
    }

    let n = float_op(a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| ExpressionError::TypeMismatch {
            operation: operation.to_string(),
            found: "non-finite result".into(),
        })
}

fn negate(operand: Value) -> ExpressionResult<Value> {
    match &operand {
        Value::Number(n) => {
            if let Some(i) = n.as_i64().and_then(i64::checked_neg) {
                Ok(Value::from(i))
            } else {
                let f = -n.as_f64().unwrap_or(f64::NAN);
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| ExpressionError::TypeMismatch {
                        operation: "'-'".into(),
                        found: "non-finite result".into(),
                    })
            }
        }
        other => Err(ExpressionError::TypeMismatch {
            operation: "'-'".into(),
            found: type_name(other).into(),
        }),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn expect_bool(value: &Value, operation: &str) -> ExpressionResult<bool> {
    value.as_bool().ok_or_else(|| ExpressionError::TypeMismatch {
        operation: operation.to_string(),
        found: type_name(value).into(),
    })
}

// ── Methods ──────────────────────────────────────────────────────────

fn call_method(target: Value, method: &str, args: &[Value]) -> ExpressionResult<Value> {
    if method == "toString" {
        arity(method, args, 0, 0)?;
        return Ok(Value::String(display(&target)));
    }

    match target {
        Value::String(s) => string_method(&s, method, args),
        Value::Array(items) => array_method(&items, method, args),
        Value::Object(map) => object_method(&map, method, args),
        other => Err(ExpressionError::UnknownMethod {
            method: method.to_string(),
            target: type_name(&other).into(),
        }),
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> ExpressionResult<Value> {
    match method {
        "split" => {
            arity(method, args, 1, 1)?;
            let separator = string_arg(method, &args[0])?;
            Ok(Value::Array(
                split(s, separator).into_iter().map(Value::String).collect(),
            ))
        }
        "substring" => {
            arity(method, args, 1, 2)?;
            let chars: Vec<char> = s.chars().collect();
            let start = int_arg(method, &args[0])?;
            let end = match args.get(1) {
                Some(arg) => int_arg(method, arg)?,
                None => chars.len() as i64,
            };
            if start < 0 || end > chars.len() as i64 || start > end {
                return Err(ExpressionError::IndexOutOfBounds {
                    index: if start < 0 || start > end { start } else { end },
                    len: chars.len(),
                });
            }
            Ok(Value::String(
                chars[start as usize..end as usize].iter().collect(),
            ))
        }
        "toUpperCase" => {
            arity(method, args, 0, 0)?;
            Ok(Value::String(s.to_uppercase()))
        }
        "toLowerCase" => {
            arity(method, args, 0, 0)?;
            Ok(Value::String(s.to_lowercase()))
        }
        "trim" => {
            arity(method, args, 0, 0)?;
            Ok(Value::String(s.trim().to_string()))
        }
        "length" => {
            arity(method, args, 0, 0)?;
            Ok(Value::from(s.chars().count()))
        }
        "isEmpty" => {
            arity(method, args, 0, 0)?;
            Ok(Value::Bool(s.is_empty()))
        }
        "contains" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.contains(string_arg(method, &args[0])?)))
        }
        "startsWith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.starts_with(string_arg(method, &args[0])?)))
        }
        "endsWith" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(s.ends_with(string_arg(method, &args[0])?)))
        }
        "indexOf" => {
            arity(method, args, 1, 1)?;
            let needle = string_arg(method, &args[0])?;
            let index = s
                .find(needle)
                .map(|byte| s[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Ok(Value::from(index))
        }
        "replace" => {
            arity(method, args, 2, 2)?;
            let from = string_arg(method, &args[0])?;
            let to = string_arg(method, &args[1])?;
            Ok(Value::String(s.replace(from, to)))
        }
        "concat" => {
            arity(method, args, 1, 1)?;
            Ok(Value::String(format!("{}{}", s, display(&args[0]))))
        }
        _ => Err(ExpressionError::UnknownMethod {
            method: method.to_string(),
            target: "string".into(),
        }),
    }
}

fn array_method(items: &[Value], method: &str, args: &[Value]) -> ExpressionResult<Value> {
    match method {
        "size" => {
            arity(method, args, 0, 0)?;
            Ok(Value::from(items.len()))
        }
        "isEmpty" => {
            arity(method, args, 0, 0)?;
            Ok(Value::Bool(items.is_empty()))
        }
        "contains" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(
                items.iter().any(|item| values_equal(item, &args[0])),
            ))
        }
        _ => Err(ExpressionError::UnknownMethod {
            method: method.to_string(),
            target: "array".into(),
        }),
    }
}

fn object_method(map: &Map<String, Value>, method: &str, args: &[Value]) -> ExpressionResult<Value> {
    match method {
        "size" => {
            arity(method, args, 0, 0)?;
            Ok(Value::from(map.len()))
        }
        "isEmpty" => {
            arity(method, args, 0, 0)?;
            Ok(Value::Bool(map.is_empty()))
        }
        "containsKey" => {
            arity(method, args, 1, 1)?;
            Ok(Value::Bool(map.contains_key(string_arg(method, &args[0])?)))
        }
        "get" => {
            arity(method, args, 1, 1)?;
            let key = string_arg(method, &args[0])?;
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        _ => Err(ExpressionError::UnknownMethod {
            method: method.to_string(),
            target: "object".into(),
        }),
    }
}

/// Literal split with trailing empty strings removed.
///
/// An empty separator splits into characters. Input with no separator
/// occurrence comes back as a single element, even when empty.
fn split(s: &str, separator: &str) -> Vec<String> {
    let mut parts: Vec<String> = if separator.is_empty() {
        s.chars().map(String::from).collect()
    } else {
        s.split(separator).map(String::from).collect()
    };

    if parts.len() > 1 {
        while parts.last().is_some_and(String::is_empty) {
            parts.pop();
        }
    }
    parts
}

fn arity(method: &str, args: &[Value], min: usize, max: usize) -> ExpressionResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        return Err(ExpressionError::ArgumentCount {
            method: method.to_string(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn string_arg<'a>(method: &str, arg: &'a Value) -> ExpressionResult<&'a str> {
    arg.as_str().ok_or_else(|| ExpressionError::TypeMismatch {
        operation: format!("argument of '{}'", method),
        found: type_name(arg).into(),
    })
}

fn int_arg(method: &str, arg: &Value) -> ExpressionResult<i64> {
    arg.as_i64().ok_or_else(|| ExpressionError::TypeMismatch {
        operation: format!("argument of '{}'", method),
        found: type_name(arg).into(),
    })
}

/// Text form of a value: strings unquoted, everything else as JSON
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
