// Diagnostic system
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

//! Diagnostic system for error reporting.
//!
//! Diagnostics in this system come from two places:
//!
//!   - the info logs of the external toolchain
//!       (preprocessor, parser, and linker),
//!     which are parsed and rewritten by [`filter_log`]; and
//!   - errors raised by the front end itself,
//!       such as conflicting `#pragma shader_stage` directives,
//!     which implement [`Diagnostic`].
//!
//! Both produce [`Message`]s that are tagged with the identifying tag of
//!   the source unit and,
//!     where available,
//!     the _logical_ line number that a human reading the original
//!     multi-file source would expect.
//!
//! Message counts are never stored in global state;
//!   each compilation returns its own [`Tally`],
//!     and callers that want totals across compilations add them up
//!     themselves.

mod filter;
mod report;

pub use filter::{filter_log, FilterConfig, LogLine};
pub use report::{Report, Reporter, TextReporter};

use crate::text::LineNum;
use std::{
    error::Error,
    fmt::{self, Display},
    ops::AddAssign,
};

/// Diagnostic report.
///
/// This describes an error condition or other special event using a
///   series of [`Message`]s.
/// An empty description causes the reporter to fall back to rendering
///   the [`Display`] of the error itself.
pub trait Diagnostic: Error + Sized {
    /// Produce a series of [`Message`]s describing the diagnostic event.
    fn describe(&self) -> Vec<Message>;
}

/// Diagnostic severity level.
///
/// Lower levels are more severe
///   (e.g. level 1 is the worst).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[repr(u8)]
pub enum Level {
    /// An error internal to the compiler that the user cannot resolve,
    ///   but may be able to work around.
    InternalError = 1,

    /// A user-resolvable error.
    #[default]
    Error,

    /// A condition that does not prevent compilation.
    ///
    /// Warnings may be escalated into errors or suppressed entirely by
    ///   configuration;
    ///     see [`FilterConfig`].
    Warning,

    /// Useful information that supplements other messages.
    Note,
}

impl Level {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::InternalError | Self::Error)
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::InternalError => write!(f, "internal error"),
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A single rendered diagnostic line.
///
/// Messages render as `tag:line: level: text`,
///   or as `tag: level: text` when there is no line.
/// A message without a level is text that we were unable to classify;
///   it is passed through to the user as `tag: text` and is never
///   counted.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    pub level: Option<Level>,
    pub tag: String,
    pub line: Option<LineNum>,
    pub text: String,
}

impl Message {
    pub fn new<T: Into<String>, S: Into<String>>(
        level: Level,
        tag: T,
        line: Option<LineNum>,
        text: S,
    ) -> Self {
        Self {
            level: Some(level),
            tag: tag.into(),
            line,
            text: text.into(),
        }
    }

    /// An error at a logical line of the source unit identified by `tag`.
    pub fn error_at<T: Into<String>, S: Into<String>>(
        tag: T,
        line: LineNum,
        text: S,
    ) -> Self {
        Self::new(Level::Error, tag, Some(line), text)
    }

    /// Text that could not be classified.
    pub fn unclassified<T: Into<String>, S: Into<String>>(
        tag: T,
        text: S,
    ) -> Self {
        Self {
            level: None,
            tag: tag.into(),
            line: None,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level.as_ref().map(Level::is_error).unwrap_or(false)
    }

    pub fn is_warning(&self) -> bool {
        self.level == Some(Level::Warning)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;

        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }

        match self.level {
            Some(level) => write!(f, ": {level}: {}", self.text),
            None => write!(f, ": {}", self.text),
        }
    }
}

/// Count of warnings and errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Tally {
    pub warnings: usize,
    pub errors: usize,
}

impl Tally {
    pub fn is_empty(&self) -> bool {
        self.warnings == 0 && self.errors == 0
    }

    fn count(&mut self, msg: &Message) {
        if msg.is_error() {
            self.errors += 1;
        } else if msg.is_warning() {
            self.warnings += 1;
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.warnings += rhs.warnings;
        self.errors += rhs.errors;
    }
}

/// Summary suitable for display at the end of a run,
///   such as `1 warning and 2 errors generated.`
///
/// Renders nothing if the tally is empty.
impl Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn plural(n: usize) -> &'static str {
            if n > 1 {
                "s"
            } else {
                ""
            }
        }

        let Self { warnings, errors } = *self;

        match (warnings, errors) {
            (0, 0) => Ok(()),
            (w, 0) => write!(f, "{w} warning{} generated.", plural(w)),
            (0, e) => write!(f, "{e} error{} generated.", plural(e)),
            (w, e) => write!(
                f,
                "{w} warning{} and {e} error{} generated.",
                plural(w),
                plural(e),
            ),
        }
    }
}

/// Messages produced by one compilation together with their [`Tally`].
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Diagnostics {
    tally: Tally,
    messages: Vec<Message>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.tally.count(&msg);
        self.messages.push(msg);
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.tally.errors
    }
}

impl Extend<Message> for Diagnostics {
    fn extend<T: IntoIterator<Item = Message>>(&mut self, iter: T) {
        iter.into_iter().for_each(|msg| self.push(msg));
    }
}

impl Extend<Diagnostics> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostics>>(&mut self, iter: T) {
        iter.into_iter()
            .for_each(|other| self.extend(other.messages.into_iter()));
    }
}

/// Renders each message on its own line.
impl Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.messages
            .iter()
            .try_for_each(|msg| write!(f, "{msg}\n"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_with_line() {
        let sut = Message::error_at("a.vert", 3, "bad thing");

        assert_eq!("a.vert:3: error: bad thing", sut.to_string());
    }

    #[test]
    fn message_without_line() {
        let sut = Message::new(Level::Warning, "a.vert", None, "hmm");

        assert_eq!("a.vert: warning: hmm", sut.to_string());
    }

    #[test]
    fn unclassified_message() {
        let sut = Message::unclassified("a.vert", "something odd");

        assert_eq!("a.vert: something odd", sut.to_string());
        assert!(!sut.is_error());
        assert!(!sut.is_warning());
    }

    #[test]
    fn diagnostics_count_by_level() {
        let mut sut = Diagnostics::new();

        sut.extend([
            Message::error_at("t", 1, "e1"),
            Message::new(Level::InternalError, "t", None, "e2"),
            Message::new(Level::Warning, "t", Some(2), "w"),
            Message::new(Level::Note, "t", None, "n"),
            Message::unclassified("t", "u"),
        ]);

        assert_eq!(
            Tally {
                warnings: 1,
                errors: 2
            },
            sut.tally()
        );
        assert_eq!(5, sut.messages().len());
    }

    #[test]
    fn tally_summary() {
        let t = |warnings, errors| Tally { warnings, errors }.to_string();

        assert_eq!("", t(0, 0));
        assert_eq!("1 warning generated.", t(1, 0));
        assert_eq!("2 errors generated.", t(0, 2));
        assert_eq!("2 warnings and 1 error generated.", t(2, 1));
    }

    #[test]
    fn tally_accumulates() {
        let mut sut = Tally::default();

        sut += Tally {
            warnings: 1,
            errors: 2,
        };
        sut += Tally {
            warnings: 3,
            errors: 0,
        };

        assert_eq!(
            Tally {
                warnings: 4,
                errors: 2
            },
            sut
        );
    }

    #[test]
    fn diagnostics_display_one_per_line() {
        let mut sut = Diagnostics::new();
        sut.push(Message::error_at("x", 1, "a"));
        sut.push(Message::error_at("x", 2, "b"));

        assert_eq!("x:1: error: a\nx:2: error: b\n", sut.to_string());
    }
}
