//! Parser: recursive descent parser for header mapping expressions
//!
//! Consumes tokens from the lexer and produces an [`Expr`] tree. Precedence,
//! lowest first: ternary, `or`, `and`, equality, additive, unary, postfix
//! (`.`, `?.`, `[]`, method calls), primary.

use crate::errors::{ExpressionError, ExpressionResult};
use crate::lexer::{Lexer, Token, TokenKind};
use serde_json::Value;

/// Unary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Binary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Equal,
    NotEqual,
    And,
    Or,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "'+'"),
            Self::Subtract => write!(f, "'-'"),
            Self::Equal => write!(f, "'=='"),
            Self::NotEqual => write!(f, "'!='"),
            Self::And => write!(f, "'and'"),
            Self::Or => write!(f, "'or'"),
        }
    }
}

/// Parsed expression tree
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal value
    Literal(Value),
    /// A root property of the evaluation context (`headers`, `payload`)
    Root(String),
    /// `target.name` or `target?.name`
    Property {
        target: Box<Expr>,
        name: String,
        null_safe: bool,
    },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `target.method(args)` or `target?.method(args)`
    MethodCall {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        null_safe: bool,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

/// Parser for header mapping expressions
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Parse expression text into an expression tree
    pub fn parse(input: &str) -> ExpressionResult<Expr> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self { tokens, pos: 0 };

        if parser.check(TokenKind::Eof) {
            return Err(ExpressionError::UnexpectedEof("expression".into()));
        }

        let expr = parser.parse_ternary()?;
        if !parser.check(TokenKind::Eof) {
            let tok = parser.peek();
            return Err(ExpressionError::UnexpectedToken {
                expected: TokenKind::Eof.to_string(),
                found: tok.text.clone(),
                col: tok.col,
            });
        }
        Ok(expr)
    }

    fn parse_ternary(&mut self) -> ExpressionResult<Expr> {
        let condition = self.parse_or()?;

        if self.check(TokenKind::Question) {
            self.advance();
            let then_branch = self.parse_ternary()?;
            self.expect(TokenKind::Colon)?;
            let else_branch = self.parse_ternary()?;
            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(condition)
    }

    fn parse_or(&mut self) -> ExpressionResult<Expr> {
        let mut left = self.parse_and()?;
        while self.check(TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ExpressionResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::And) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ExpressionResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Equal,
                TokenKind::NotEq => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ExpressionResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ExpressionResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Bang | TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ExpressionResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                TokenKind::Dot | TokenKind::SafeDot => {
                    let null_safe = self.peek_kind() == TokenKind::SafeDot;
                    self.advance();
                    let name = self.expect(TokenKind::Identifier)?.text.clone();

                    if self.check(TokenKind::OpenParen) {
                        let args = self.parse_arguments()?;
                        expr = Expr::MethodCall {
                            target: Box::new(expr),
                            method: name,
                            args,
                            null_safe,
                        };
                    } else {
                        expr = Expr::Property {
                            target: Box::new(expr),
                            name,
                            null_safe,
                        };
                    }
                }
                TokenKind::OpenBracket => {
                    self.advance();
                    let index = self.parse_ternary()?;
                    self.expect(TokenKind::CloseBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> ExpressionResult<Vec<Expr>> {
        self.expect(TokenKind::OpenParen)?;

        let mut args = Vec::new();
        if self.check(TokenKind::CloseParen) {
            self.advance();
            return Ok(args);
        }

        loop {
            args.push(self.parse_ternary()?);
            if self.check(TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenKind::CloseParen)?;
            break;
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> ExpressionResult<Expr> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::Literal(Value::String(tok.text)))
            }
            TokenKind::NumberLiteral => {
                self.advance();
                parse_number(&tok).map(Expr::Literal)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Root(tok.text))
            }
            TokenKind::OpenParen => {
                self.advance();
                let inner = self.parse_ternary()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            TokenKind::Eof => Err(ExpressionError::UnexpectedEof("operand".into())),
            _ => Err(ExpressionError::UnexpectedToken {
                expected: "operand".into(),
                found: tok.text,
                col: tok.col,
            }),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        // tokenize() always ends with Eof and parsing never advances past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ExpressionResult<&Token> {
        if self.check(kind.clone()) {
            self.advance();
            Ok(&self.tokens[self.pos - 1])
        } else if self.check(TokenKind::Eof) {
            Err(ExpressionError::UnexpectedEof(kind.to_string()))
        } else {
            let tok = self.peek();
            Err(ExpressionError::UnexpectedToken {
                expected: kind.to_string(),
                found: tok.text.clone(),
                col: tok.col,
            })
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn parse_number(tok: &Token) -> ExpressionResult<Value> {
    let invalid = || ExpressionError::ParseError {
        col: tok.col,
        message: format!("Invalid number: '{}'", tok.text),
    };

    if tok.text.contains('.') {
        let n: f64 = tok.text.parse().map_err(|_| invalid())?;
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .ok_or_else(invalid)
    } else {
        let n: i64 = tok.text.parse().map_err(|_| invalid())?;
        Ok(Value::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root(name: &str) -> Box<Expr> {
        Box::new(Expr::Root(name.into()))
    }

    #[test]
    fn test_parse_string_literal() {
        let expr = Parser::parse("'hello1'").unwrap();
        assert_eq!(expr, Expr::Literal(json!("hello1")));
    }

    #[test]
    fn test_parse_property_chain() {
        let expr = Parser::parse("headers.contentType").unwrap();
        assert_eq!(
            expr,
            Expr::Property {
                target: root("headers"),
                name: "contentType".into(),
                null_safe: false,
            }
        );
    }

    #[test]
    fn test_parse_split_with_index() {
        let expr = Parser::parse("headers.path.split('/')[0]").unwrap();

        let Expr::Index { target, index } = expr else {
            panic!("expected index expression");
        };
        assert_eq!(*index, Expr::Literal(json!(0)));

        let Expr::MethodCall {
            target,
            method,
            args,
            null_safe,
        } = *target
        else {
            panic!("expected method call");
        };
        assert_eq!(method, "split");
        assert_eq!(args, vec![Expr::Literal(json!("/"))]);
        assert!(!null_safe);
        assert!(matches!(*target, Expr::Property { ref name, .. } if name == "path"));
    }

    #[test]
    fn test_parse_safe_navigation() {
        let expr = Parser::parse("headers?.missing").unwrap();
        assert!(matches!(expr, Expr::Property { null_safe: true, .. }));
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let expr = Parser::parse("true or false and false").unwrap();
        let Expr::Binary { op, right, .. } = expr else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_parse_ternary() {
        let expr = Parser::parse("headers.a == 'x' ? 'yes' : 'no'").unwrap();
        let Expr::Ternary { condition, .. } = expr else {
            panic!("expected ternary");
        };
        assert!(matches!(*condition, Expr::Binary { op: BinaryOp::Equal, .. }));
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(Parser::parse("42").unwrap(), Expr::Literal(json!(42)));
        assert_eq!(Parser::parse("2.5").unwrap(), Expr::Literal(json!(2.5)));
        assert!(matches!(
            Parser::parse("-1").unwrap(),
            Expr::Unary { op: UnaryOp::Negate, .. }
        ));
    }

    #[test]
    fn test_parse_method_arguments() {
        let expr = Parser::parse("payload.replace('a', 'b')").unwrap();
        let Expr::MethodCall { args, .. } = expr else {
            panic!("expected method call");
        };
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_empty_expression() {
        assert!(matches!(
            Parser::parse("   "),
            Err(ExpressionError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_trailing_tokens() {
        let result = Parser::parse("headers.a headers.b");
        assert!(matches!(
            result,
            Err(ExpressionError::UnexpectedToken { col: 11, .. })
        ));
    }

    #[test]
    fn test_unclosed_call() {
        let result = Parser::parse("headers.path.split('/'");
        assert!(matches!(result, Err(ExpressionError::UnexpectedEof(_))));
    }

    #[test]
    fn test_dangling_dot() {
        let result = Parser::parse("headers.");
        assert!(result.is_err());
        assert!(result.unwrap_err().is_syntax());
    }
}
