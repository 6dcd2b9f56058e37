// Filtering of toolchain info logs
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

//! Parsing and filtering of glslang-style info logs.
//!
//! The preprocessor,
//!   parser,
//!   and linker each produce an info log consisting of lines like
//!
//! ```text
//! ERROR: 0:12: 'foo' : undeclared identifier
//! WARNING: 0:3: '#extension' : extension not supported
//! ERROR: 1 compilation errors.  No code generated.
//! ```
//!
//! Each line is classified as a [`LogLine`] by [`LogLine::parse`] and
//!   rewritten into a [`Message`] tagged with the source unit's tag rather
//!   than the toolchain's internal string number.
//! Summaries and known noise are dropped.
//!
//! Escalation of warnings to errors is checked _before_ suppression;
//!   a suppressed warning is dropped entirely and never counted.

use super::{Diagnostics, Level, Message};
use crate::text::{self, strip_whitespace};

/// Lines that toolchains emit that provide no value to the user.
const IGNORED_LINES: [&str; 13] = [
    "Warning, version 310 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Warning, version 400 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Warning, version 410 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Warning, version 420 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Warning, version 430 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Warning, version 440 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Warning, version 450 is not yet complete; most version-specific \
     features are present, but some are missing.",
    "Linked vertex stage:",
    "Linked fragment stage:",
    "Linked tessellation control stage:",
    "Linked tessellation evaluation stage:",
    "Linked geometry stage:",
    "Linked compute stage:",
];

/// How warnings are to be treated.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct FilterConfig {
    /// Treat every warning as an error.
    pub warnings_as_errors: bool,

    /// Drop every warning.
    ///
    /// This is consulted only if [`Self::warnings_as_errors`] is not set.
    pub suppress_warnings: bool,
}

/// Classification of a single line of an info log.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogLine<'a> {
    /// Noise or a suppressed warning.
    Ignored,

    /// An error or warning located at a line of a source string.
    Located {
        level: Level,
        line: &'a str,
        text: &'a str,
    },

    /// An error or warning not associated with any location.
    Global { level: Level, text: &'a str },

    /// `N compilation errors.` or `N compilation warnings.`
    Summary,

    /// Text that we do not understand.
    Unknown(&'a str),
}

impl<'a> LogLine<'a> {
    /// Classify one line of an info log.
    pub fn parse(line: &'a str, config: FilterConfig) -> Self {
        if line.is_empty() || IGNORED_LINES.contains(&line) {
            return Self::Ignored;
        }

        let (level, rest) = if let Some(rest) = line.strip_prefix("WARNING: ")
        {
            if config.warnings_as_errors {
                (Level::Error, rest)
            } else if config.suppress_warnings {
                return Self::Ignored;
            } else {
                (Level::Warning, rest)
            }
        } else if let Some(rest) = line.strip_prefix("ERROR: ") {
            (Level::Error, rest)
        } else if is_summary(line) {
            return Self::Summary;
        } else {
            return Self::Unknown(line);
        };

        if is_summary(rest) {
            return Self::Summary;
        }

        match split_location(rest) {
            Some((line, text)) => Self::Located {
                level,
                line,
                text: strip_whitespace(text),
            },
            None => Self::Global {
                level,
                text: strip_whitespace(rest),
            },
        }
    }

    /// Render this line as a [`Message`] for the source unit `tag`.
    ///
    /// Lines that do not produce output yield [`None`].
    pub fn into_message(self, tag: &str) -> Option<Message> {
        match self {
            Self::Ignored | Self::Summary => None,

            Self::Located { level, line, text } => Some(Message::new(
                level,
                tag,
                Some(text::parse_leading_int(line)),
                text,
            )),

            Self::Global { level, text } => {
                Some(Message::new(level, tag, None, text))
            }

            Self::Unknown(text) => Some(Message::unclassified(tag, text)),
        }
    }
}

/// Whether `s` looks like `N compilation errors.` or
///   `N compilation warnings.`
fn is_summary(s: &str) -> bool {
    let rest = s.trim_start_matches(|c: char| c.is_ascii_digit());

    rest.len() < s.len()
        && (rest.starts_with(" compilation errors.")
            || rest.starts_with(" compilation warnings."))
}

/// Split `<source>:<line>: <text>` into its line number and text.
///
/// The line must consist entirely of decimal digits,
///   otherwise this is not a location and [`None`] is returned.
fn split_location(s: &str) -> Option<(&str, &str)> {
    let (_source, rest) = s.split_once(':')?;
    let (line, text) = rest.split_once(':')?;

    let is_line =
        !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit());

    is_line.then_some((line, text))
}

/// Filter the info log `log` produced while compiling the source unit
///   identified by `tag`.
///
/// Returns whether the log is free of errors,
///   together with the messages that ought to be presented to the user.
/// This is the only place where toolchain output is counted toward the
///   compilation's [`Tally`](super::Tally).
pub fn filter_log(
    tag: &str,
    config: FilterConfig,
    log: &str,
) -> (bool, Diagnostics) {
    let mut diagnostics = Diagnostics::new();

    diagnostics.extend(
        text::lines(log)
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter_map(|line| LogLine::parse(line, config).into_message(tag)),
    );

    (diagnostics.error_count() == 0, diagnostics)
}
