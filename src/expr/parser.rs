//! Expression Parser Module
//!
//! Tokenizer and single-pass evaluator for the restricted expression
//! grammar: a whitelisted function call plus relative-time arithmetic.
//! Anything outside the grammar is an error:
//!
//! ```text
//! expression := call (op duration)*
//! call       := IDENT [ '(' ')' ]
//! op         := 'plus' | 'minus' | '+' | '-'
//! duration   := INTEGER unit
//! unit       := second(s) | minute(s) | hour(s) | day(s) | week(s)
//! ```

use chrono::Duration;

use super::functions::{FunctionTable, Value};
use crate::error::{ProviderError, Result};

// == Tokens ==
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(i64),
    Plus,
    Minus,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{}'", name),
            Token::Number(n) => format!("'{}'", n),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

// == Tokenizer ==
fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_ascii_digit() => {
                let mut value: i64 = 0;
                while let Some(&d) = chars.peek() {
                    let Some(digit) = d.to_digit(10) else { break };
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit as i64))
                        .ok_or_else(|| {
                            ProviderError::Expression("number out of range".to_string())
                        })?;
                    chars.next();
                }
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&a) = chars.peek() {
                    if a.is_ascii_alphanumeric() || a == '_' {
                        ident.push(a);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(ProviderError::Expression(format!(
                    "unexpected character '{}'",
                    other
                )));
            }
        }
    }

    Ok(tokens)
}

// == Parser ==
#[derive(Debug, Clone, Copy)]
enum Op {
    Plus,
    Minus,
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    functions: &'a FunctionTable,
}

/// Parses and evaluates one expression interior against the function
/// whitelist.
pub(super) fn evaluate(input: &str, functions: &FunctionTable) -> Result<Value> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        functions,
    };
    let value = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(value)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expression := call (op duration)*
    fn parse_expression(&mut self) -> Result<Value> {
        let mut value = self.parse_call()?;

        while let Some(op) = self.peek_op() {
            self.advance();
            let duration = self.parse_duration()?;
            value = apply(value, op, duration)?;
        }

        Ok(value)
    }

    fn peek_op(&self) -> Option<Op> {
        match self.peek() {
            Some(Token::Plus) => Some(Op::Plus),
            Some(Token::Minus) => Some(Op::Minus),
            Some(Token::Ident(word)) if word == "plus" => Some(Op::Plus),
            Some(Token::Ident(word)) if word == "minus" => Some(Op::Minus),
            _ => None,
        }
    }

    // call := IDENT [ '(' ')' ]
    fn parse_call(&mut self) -> Result<Value> {
        let name = match self.advance() {
            Some(Token::Ident(name)) => name,
            Some(other) => {
                return Err(ProviderError::Expression(format!(
                    "expected a function name, found {}",
                    other.describe()
                )));
            }
            None => {
                return Err(ProviderError::Expression(
                    "expected a function name".to_string(),
                ));
            }
        };

        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            match self.advance() {
                Some(Token::RParen) => {}
                _ => {
                    return Err(ProviderError::Expression(format!(
                        "function '{}' takes no arguments",
                        name
                    )));
                }
            }
        }

        let function = self.functions.get(&name).ok_or_else(|| {
            ProviderError::Expression(format!("unknown function '{}'", name))
        })?;
        function.call()
    }

    // duration := INTEGER unit
    fn parse_duration(&mut self) -> Result<Duration> {
        let count = match self.advance() {
            Some(Token::Number(n)) => n,
            Some(other) => {
                return Err(ProviderError::Expression(format!(
                    "expected a number, found {}",
                    other.describe()
                )));
            }
            None => {
                return Err(ProviderError::Expression(
                    "expected a duration after the operator".to_string(),
                ));
            }
        };

        let unit = match self.advance() {
            Some(Token::Ident(unit)) => unit,
            _ => {
                return Err(ProviderError::Expression(
                    "expected a time unit after the number".to_string(),
                ));
            }
        };

        let seconds_per_unit: i64 = match unit.as_str() {
            "second" | "seconds" => 1,
            "minute" | "minutes" => 60,
            "hour" | "hours" => 3_600,
            "day" | "days" => 86_400,
            "week" | "weeks" => 604_800,
            other => {
                return Err(ProviderError::Expression(format!(
                    "unknown time unit '{}'",
                    other
                )));
            }
        };

        count
            .checked_mul(seconds_per_unit)
            .and_then(Duration::try_seconds)
            .ok_or_else(|| ProviderError::Expression("duration out of range".to_string()))
    }

    fn expect_end(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ProviderError::Expression(format!(
                "unexpected trailing {}",
                token.describe()
            ))),
        }
    }
}

// == Arithmetic ==
fn apply(value: Value, op: Op, duration: Duration) -> Result<Value> {
    match value {
        Value::Instant(instant) => {
            let shifted = match op {
                Op::Plus => instant.checked_add_signed(duration),
                Op::Minus => instant.checked_sub_signed(duration),
            };
            shifted
                .map(Value::Instant)
                .ok_or_else(|| ProviderError::Expression("timestamp out of range".to_string()))
        }
        Value::Text(_) => Err(ProviderError::Expression(
            "duration arithmetic requires a time value".to_string(),
        )),
    }
}
