// Constant expressions of `#if` and `#elif`
//
//  Copyright (C) 2023 The glslfront Authors
//
//  This file is part of glslfront.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Integer constant expression evaluation.
//!
//! Expressions are evaluated _after_ `defined` has been resolved and
//!   macros have been replaced,
//!     since a macro may expand into any part of an expression:
//!
//! ```glsl
//! #define A 10
//! #define B == 10
//! #if A B
//! ```
//!
//! Any identifier that survives replacement is an undefined macro and
//!   evaluates to `0`.
//!
//! Operators and their precedence follow the GLSL preprocessor,
//!   which is that of C without the ternary and comma operators.
//! Arithmetic is performed on [`i64`] and wraps on overflow.

use super::lex::{Token, TokenKind};
use std::fmt::Display;
use std::iter::Peekable;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_punct(punct: &str) -> Option<Self> {
        use BinaryOp::*;

        Some(match punct {
            "||" => LogicalOr,
            "&&" => LogicalAnd,
            "|" => BitOr,
            "^" => BitXor,
            "&" => BitAnd,
            "==" => Eq,
            "!=" => Ne,
            "<" => Lt,
            ">" => Gt,
            "<=" => Le,
            ">=" => Ge,
            "<<" => Shl,
            ">>" => Shr,
            "+" => Add,
            "-" => Sub,
            "*" => Mul,
            "/" => Div,
            "%" => Rem,
            _ => return None,
        })
    }

    fn precedence(self) -> u8 {
        use BinaryOp::*;

        match self {
            LogicalOr => 1,
            LogicalAnd => 2,
            BitOr => 3,
            BitXor => 4,
            BitAnd => 5,
            Eq | Ne => 6,
            Lt | Gt | Le | Ge => 7,
            Shl | Shr => 8,
            Add | Sub => 9,
            Mul | Div | Rem => 10,
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> Result<i64, ExprError> {
        use BinaryOp::*;

        Ok(match self {
            LogicalOr => (lhs != 0 || rhs != 0) as i64,
            LogicalAnd => (lhs != 0 && rhs != 0) as i64,
            BitOr => lhs | rhs,
            BitXor => lhs ^ rhs,
            BitAnd => lhs & rhs,
            Eq => (lhs == rhs) as i64,
            Ne => (lhs != rhs) as i64,
            Lt => (lhs < rhs) as i64,
            Gt => (lhs > rhs) as i64,
            Le => (lhs <= rhs) as i64,
            Ge => (lhs >= rhs) as i64,
            Shl => lhs.wrapping_shl(rhs as u32),
            Shr => lhs.wrapping_shr(rhs as u32),
            Add => lhs.wrapping_add(rhs),
            Sub => lhs.wrapping_sub(rhs),
            Mul => lhs.wrapping_mul(rhs),
            Div if rhs == 0 => return Err(ExprError::DivisionByZero),
            Rem if rhs == 0 => return Err(ExprError::DivisionByZero),
            Div => lhs.wrapping_div(rhs),
            Rem => lhs.wrapping_rem(rhs),
        })
    }
}

struct ExprParser<'a, I: Iterator<Item = &'a Token>> {
    input: Peekable<I>,
}

impl<'a, I: Iterator<Item = &'a Token>> ExprParser<'a, I> {
    fn parse_expr(&mut self, min_precedence: u8) -> Result<i64, ExprError> {
        let mut lhs = self.parse_unary()?;

        while let Some(op) = self.peek_binary() {
            let precedence = op.precedence();

            if precedence < min_precedence {
                break;
            }

            self.input.next();

            // All binary operators are left-associative.
            let rhs = self.parse_expr(precedence + 1)?;
            lhs = op.apply(lhs, rhs)?;
        }

        Ok(lhs)
    }

    fn peek_binary(&mut self) -> Option<BinaryOp> {
        self.input
            .peek()
            .filter(|t| t.kind == TokenKind::Punct)
            .and_then(|t| BinaryOp::from_punct(&t.text))
    }

    fn parse_unary(&mut self) -> Result<i64, ExprError> {
        let token = self.input.next().ok_or(ExprError::ExpectedExpression)?;

        match (token.kind, token.text.as_str()) {
            // Undefined macro.
            (TokenKind::Ident, _) => Ok(0),

            (TokenKind::Number, number) => parse_number(number),

            (TokenKind::Punct, "!") => Ok((self.parse_unary()? == 0) as i64),
            (TokenKind::Punct, "~") => Ok(!self.parse_unary()?),
            (TokenKind::Punct, "-") => Ok(self.parse_unary()?.wrapping_neg()),
            (TokenKind::Punct, "+") => self.parse_unary(),

            (TokenKind::Punct, "(") => {
                let inner = self.parse_expr(0)?;

                match self.input.next() {
                    Some(t) if t.is_punct(")") => Ok(inner),
                    Some(t) => Err(ExprError::Unexpected(t.text.clone())),
                    None => Err(ExprError::MissingCloseParen),
                }
            }

            (_, text) => Err(ExprError::Unexpected(text.to_string())),
        }
    }
}

/// Parse an integer literal,
///   which may be decimal,
///   octal with a leading `0`,
///   or hexadecimal with a leading `0x`,
///   optionally suffixed with `u` or `U`.
fn parse_number(number: &str) -> Result<i64, ExprError> {
    let digits = number
        .strip_suffix(|c: char| c == 'u' || c == 'U')
        .unwrap_or(number);

    let (digits, radix) = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None if digits.len() > 1 && digits.starts_with('0') => {
            (&digits[1..], 8)
        }
        None => (digits, 10),
    };

    // Values that do not fit are reinterpreted,
    //   as they would be for an unsigned literal.
    i64::from_str_radix(digits, radix)
        .or_else(|_| u64::from_str_radix(digits, radix).map(|v| v as i64))
        .map_err(|_| ExprError::BadInteger(number.to_string()))
}

/// Evaluate a fully macro-replaced integer constant expression.
///
/// Whitespace tokens are ignored.
pub fn evaluate(tokens: &[Token]) -> Result<i64, ExprError> {
    let mut parser = ExprParser {
        input: tokens.iter().filter(|t| !t.is_space()).peekable(),
    };

    let value = parser.parse_expr(0)?;

    match parser.input.next() {
        None => Ok(value),
        Some(t) => Err(ExprError::Unexpected(t.text.clone())),
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ExprError {
    /// The expression ended where an operand was required.
    ExpectedExpression,

    /// A token that cannot appear at this position.
    Unexpected(String),

    /// A number that is not a valid integer literal.
    BadInteger(String),

    MissingCloseParen,
    DivisionByZero,
}

impl Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExpectedExpression => write!(f, "expected expression"),
            Self::Unexpected(text) => {
                write!(f, "unexpected '{text}' in expression")
            }
            Self::BadInteger(text) => {
                write!(f, "invalid integer constant '{text}'")
            }
            Self::MissingCloseParen => write!(f, "missing ')'"),
            Self::DivisionByZero => write!(f, "division by 0"),
        }
    }
}

impl std::error::Error for ExprError {}
