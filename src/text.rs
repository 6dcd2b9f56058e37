// Views over shader source text
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

//! Non-owning line views and small text utilities.
//!
//! Every operation on preprocessed text in this crate works on physical
//!   lines.
//! Rather than copying each line into its own buffer,
//!   [`Lines`] yields `&str` slices of the one buffer that holds the
//!   entire text;
//!     newlines are located with [`memchr`].
//!
//! Lines may be yielded either with their terminating newline
//!   ([`lines_inclusive`]),
//!     which allows text to be reassembled byte-for-byte by
//!     concatenation,
//!   or without it ([`lines`]).

use memchr::memchr;

/// Logical or physical line number.
///
/// This is signed because `#line` accepts whatever integer the user
///   provides,
///     and we must not fail while merely _observing_ such a directive.
pub type LineNum = i64;

/// Iterator over the physical lines of a string.
///
/// A trailing newline does not produce a final empty line,
///   but trailing text without a newline does produce a final line.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rest: &'a str,
    keep_delimiter: bool,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let (line, rest) = match memchr(b'\n', self.rest.as_bytes()) {
            Some(i) if self.keep_delimiter => {
                (&self.rest[..=i], &self.rest[i + 1..])
            }
            Some(i) => (&self.rest[..i], &self.rest[i + 1..]),
            None => (self.rest, ""),
        };

        self.rest = rest;
        Some(line)
    }
}

/// Physical lines of `text`,
///   each including its terminating `\n` (if any).
pub fn lines_inclusive(text: &str) -> Lines {
    Lines {
        rest: text,
        keep_delimiter: true,
    }
}

/// Physical lines of `text` with terminating `\n` removed.
pub fn lines(text: &str) -> Lines {
    Lines {
        rest: text,
        keep_delimiter: false,
    }
}

/// Whether `c` is whitespace in the sense of C's `isspace`.
pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Remove leading and trailing whitespace
///   (see [`is_space`]).
pub fn strip_whitespace(s: &str) -> &str {
    s.trim_matches(is_space)
}

/// Parse a leading decimal integer the way C's `atoi` does.
///
/// Leading whitespace is skipped and an optional sign is accepted;
///   parsing stops at the first non-digit.
/// If there are no digits,
///   the result is `0`.
/// Values that do not fit saturate rather than wrap.
pub fn parse_leading_int(s: &str) -> LineNum {
    let s = s.trim_start_matches(is_space);

    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0 as LineNum, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as LineNum)
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inclusive_lines_reassemble_input() {
        let text = "#version 450\n\nvoid main(){}\nlast";
        let sut = lines_inclusive(text).collect::<Vec<_>>();

        assert_eq!(
            vec!["#version 450\n", "\n", "void main(){}\n", "last"],
            sut
        );
        assert_eq!(text, sut.concat());
    }

    #[test]
    fn exclusive_lines_drop_delimiter() {
        let sut = lines("a\n\nb\n").collect::<Vec<_>>();

        // No empty line is produced for the trailing newline.
        assert_eq!(vec!["a", "", "b"], sut);
    }

    #[test]
    fn lines_of_empty_text() {
        assert_eq!(None, lines("").next());
        assert_eq!(None, lines_inclusive("").next());
    }

    #[test]
    fn strips_c_whitespace() {
        assert_eq!("#line 5", strip_whitespace(" \t#line 5\r\x0b"));
        assert_eq!("", strip_whitespace(" \n "));
    }

    #[test]
    fn leading_int_like_atoi() {
        assert_eq!(12, parse_leading_int(" 12 \"foo.glsl\""));
        assert_eq!(-3, parse_leading_int("-3"));
        assert_eq!(7, parse_leading_int("+7x"));
        assert_eq!(0, parse_leading_int("\"foo\""));
        assert_eq!(0, parse_leading_int(""));
        assert_eq!(
            LineNum::MAX,
            parse_leading_int("99999999999999999999999999")
        );
    }
}
