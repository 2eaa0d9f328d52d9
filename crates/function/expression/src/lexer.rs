//! Lexer: tokenizes a header mapping expression
//!
//! Expressions are single-line, so tokens only track their column.
//! Handles quoted strings (either quote style, a doubled quote escapes
//! itself), numbers, identifiers, word operators (`and`, `or`, `not`)
//! and punctuation.

use crate::errors::{ExpressionError, ExpressionResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The raw text of the token (unescaped for strings)
    pub text: String,
    /// Column number (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            col,
        }
    }
}

/// Token types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    True,
    False,
    Null,
    And,
    Or,
    Not,

    // Identifiers and literals
    Identifier,
    StringLiteral,
    NumberLiteral,

    // Structural
    Dot,
    SafeDot, // ?.
    OpenBracket,
    CloseBracket,
    OpenParen,
    CloseParen,
    Comma,
    Question,
    Colon,

    // Operators
    Plus,
    Minus,
    EqEq,
    NotEq,
    Bang,

    // End of input
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Null => write!(f, "null"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::Identifier => write!(f, "identifier"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::NumberLiteral => write!(f, "number"),
            Self::Dot => write!(f, "."),
            Self::SafeDot => write!(f, "?."),
            Self::OpenBracket => write!(f, "["),
            Self::CloseBracket => write!(f, "]"),
            Self::OpenParen => write!(f, "("),
            Self::CloseParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
            Self::Question => write!(f, "?"),
            Self::Colon => write!(f, ":"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Bang => write!(f, "!"),
            Self::Eof => write!(f, "end of expression"),
        }
    }
}

/// Lexer for header mapping expressions
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    /// Create a new lexer from expression text
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> ExpressionResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", self.pos + 1));
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> ExpressionResult<Token> {
        let ch = self.input[self.pos];
        let col = self.pos + 1;

        let single = |kind: TokenKind, lexer: &mut Self| -> ExpressionResult<Token> {
            lexer.pos += 1;
            Ok(Token::new(kind, ch.to_string(), col))
        };

        match ch {
            '.' => single(TokenKind::Dot, self),
            '[' => single(TokenKind::OpenBracket, self),
            ']' => single(TokenKind::CloseBracket, self),
            '(' => single(TokenKind::OpenParen, self),
            ')' => single(TokenKind::CloseParen, self),
            ',' => single(TokenKind::Comma, self),
            ':' => single(TokenKind::Colon, self),
            '+' => single(TokenKind::Plus, self),
            '-' => single(TokenKind::Minus, self),
            '?' if self.peek_at(1) == Some('.') => {
                self.pos += 2;
                Ok(Token::new(TokenKind::SafeDot, "?.", col))
            }
            '?' => single(TokenKind::Question, self),
            '=' if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                Ok(Token::new(TokenKind::EqEq, "==", col))
            }
            '!' if self.peek_at(1) == Some('=') => {
                self.pos += 2;
                Ok(Token::new(TokenKind::NotEq, "!=", col))
            }
            '!' => single(TokenKind::Bang, self),
            '&' if self.peek_at(1) == Some('&') => {
                self.pos += 2;
                Ok(Token::new(TokenKind::And, "&&", col))
            }
            '|' if self.peek_at(1) == Some('|') => {
                self.pos += 2;
                Ok(Token::new(TokenKind::Or, "||", col))
            }
            '\'' | '"' => self.read_string_literal(ch),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_alphabetic() || c == '_' || c == '$' => self.read_identifier_or_keyword(),
            _ => Err(ExpressionError::ParseError {
                col,
                message: format!("Unexpected character: '{}'", ch),
            }),
        }
    }

    fn read_string_literal(&mut self, quote: char) -> ExpressionResult<Token> {
        let col = self.pos + 1;
        self.pos += 1; // skip opening quote

        let mut text = String::new();
        loop {
            match self.input.get(self.pos) {
                None => {
                    return Err(ExpressionError::ParseError {
                        col,
                        message: "Unterminated string literal".into(),
                    })
                }
                Some(&c) if c == quote => {
                    if self.peek_at(1) == Some(quote) {
                        text.push(quote);
                        self.pos += 2;
                    } else {
                        self.pos += 1; // skip closing quote
                        break;
                    }
                }
                Some(&c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        Ok(Token::new(TokenKind::StringLiteral, text, col))
    }

    fn read_number(&mut self) -> ExpressionResult<Token> {
        let col = self.pos + 1;
        let mut text = String::new();

        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            text.push(self.input[self.pos]);
            self.pos += 1;
        }

        // Only a dot followed by a digit belongs to the number; `0].x` and
        // `1.toString()` keep their dot.
        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.pos += 1;
            while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
                text.push(self.input[self.pos]);
                self.pos += 1;
            }
        }

        Ok(Token::new(TokenKind::NumberLiteral, text, col))
    }

    fn read_identifier_or_keyword(&mut self) -> ExpressionResult<Token> {
        let col = self.pos + 1;
        let mut text = String::new();

        while self.pos < self.input.len()
            && (self.input[self.pos].is_alphanumeric()
                || self.input[self.pos] == '_'
                || self.input[self.pos] == '$')
        {
            text.push(self.input[self.pos]);
            self.pos += 1;
        }

        let kind = match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => TokenKind::Identifier,
        };

        Ok(Token::new(kind, text, col))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}
