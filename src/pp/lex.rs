// Preprocessing tokens
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

//! Comment removal,
//!   line splicing,
//!   and tokenization of logical lines.
//!
//! Preprocessing operates on one logical line at a time.
//! [`clean`] first removes comments and joins lines ending in a
//!   backslash,
//!     taking care to keep the number of lines intact so that line
//!     numbers in the output continue to correspond to the source.
//! Each resulting line is then split into [`Token`]s by [`tokenize`].
//!
//! Whitespace is retained as [`TokenKind::Space`] tokens so that lines
//!   that are not subject to macro replacement can be reproduced
//!   verbatim.

use std::fmt::Display;

/// Punctuators that span two characters.
///
/// Anything else is lexed as a single-character punctuator.
const DIGRAPHS: [&str; 19] = [
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "^^", "++", "--", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "##",
];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Ident,
    Number,
    /// A double-quoted string,
    ///   which GLSL permits only as the argument of `#include` and
    ///   `#line`.
    Str,
    Punct,
    Space,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, text: S) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn ident<S: Into<String>>(text: S) -> Self {
        Self::new(TokenKind::Ident, text)
    }

    pub fn number<S: Into<String>>(text: S) -> Self {
        Self::new(TokenKind::Number, text)
    }

    pub fn is_space(&self) -> bool {
        self.kind == TokenKind::Space
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == punct
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Remove comments and splice lines ending in a backslash.
///
/// The output has exactly as many newlines as the input:
///
///   - newlines within block comments are retained,
///       so code following a multi-line comment remains on its original
///       line; and
///   - newlines removed by splicing are re-emitted at the end of the
///       spliced logical line.
///
/// A comment is replaced by a single space so that it continues to
///   separate the tokens on either side of it.
pub fn clean(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut spliced = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' if splice_follows(&mut chars) => spliced += 1,

            '/' if chars.peek() == Some(&'/') => {
                out.push(' ');

                // A line comment may itself be continued with a backslash.
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }

                    chars.next();

                    if next == '\\' && splice_follows(&mut chars) {
                        spliced += 1;
                    }
                }
            }

            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push(' ');

                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    } else if prev == '*' && next == '/' {
                        break;
                    }

                    prev = next;
                }
            }

            '\n' => {
                out.push('\n');
                (0..spliced).for_each(|_| out.push('\n'));
                spliced = 0;
            }

            _ => out.push(c),
        }
    }

    (0..spliced).for_each(|_| out.push('\n'));

    out
}

/// If the next characters are a newline
///   (optionally preceded by a carriage return),
///   consume them and return `true`.
fn splice_follows<I: Iterator<Item = char> + Clone>(
    chars: &mut std::iter::Peekable<I>,
) -> bool {
    let mut ahead = chars.clone();

    let is_splice = match ahead.next() {
        Some('\n') => true,
        Some('\r') => ahead.next() == Some('\n'),
        _ => false,
    };

    if is_splice {
        *chars = ahead;
    }

    is_splice
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split a single logical line into tokens.
///
/// Numbers are lexed as preprocessing numbers:
///   a digit
///     (or a period followed by a digit)
///   followed by any run of identifier characters,
///     periods,
///     and signs immediately following an exponent marker.
/// This accepts every valid GLSL literal,
///   along with some invalid ones that the parser will later reject.
pub fn tokenize(line: &str) -> Vec<Token> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < line.len() {
        let c = line[i..].chars().next().unwrap_or('\0');
        let start = i;

        let kind = if crate::text::is_space(c) {
            i += line[i..]
                .find(|c| !crate::text::is_space(c))
                .unwrap_or(line.len() - i);
            TokenKind::Space
        } else if is_ident_start(c) {
            i += line[i..]
                .find(|c| !is_ident_char(c))
                .unwrap_or(line.len() - i);
            TokenKind::Ident
        } else if c.is_ascii_digit()
            || (c == '.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
        {
            i += 1;

            while let Some(&b) = bytes.get(i) {
                let prev = bytes[i - 1];

                let continues = b.is_ascii_alphanumeric()
                    || b == b'_'
                    || b == b'.'
                    || (matches!(b, b'+' | b'-')
                        && matches!(prev, b'e' | b'E'));

                if !continues {
                    break;
                }

                i += 1;
            }

            TokenKind::Number
        } else if c == '"' {
            i += 1 + line[i + 1..].find('"').map(|end| end + 1).unwrap_or(
                // Unterminated; take the remainder of the line.
                line.len() - i - 1,
            );
            TokenKind::Str
        } else {
            i += DIGRAPHS
                .iter()
                .find(|d| line[i..].starts_with(*d))
                .map(|d| d.len())
                .unwrap_or(c.len_utf8());
            TokenKind::Punct
        };

        tokens.push(Token::new(kind, &line[start..i]));
    }

    tokens
}

/// Concatenate the text of `tokens`.
pub fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Strip leading and trailing whitespace tokens.
pub fn trim(tokens: &[Token]) -> &[Token] {
    let start = tokens
        .iter()
        .position(|t| !t.is_space())
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| !t.is_space())
        .map(|i| i + 1)
        .unwrap_or(start);

    &tokens[start..end]
}

/// Render `tokens` with each run of whitespace collapsed into a single
///   space and surrounding whitespace removed.
pub fn canonical(tokens: &[Token]) -> String {
    trim(tokens)
        .iter()
        .map(|t| if t.is_space() { " " } else { t.text.as_str() })
        .collect()
}
