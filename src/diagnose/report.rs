// Diagnostic report rendering
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

//! Rendering of diagnostic information.

// NB: `write!` together with `\n` is preferred to `writeln!` so that there
//   is only a single sequence of characters to search for while tracking
//   down newlines,
//     rather than using both.

use super::{Diagnostic, Diagnostics, Level, Message, Tally};
use std::fmt::{self, Display};

pub trait Reporter {
    /// Render diagnostic report.
    ///
    /// The provided [`Report`] implements [`Display`].
    ///
    /// Please be mindful of where this report is being rendered to
    ///   (via [`Display`]).
    /// For example,
    ///   if rendering to standard error,
    ///   it is a good idea to buffer the entire report before flushing,
    ///     otherwise the report may become interleaved with other
    ///     concurrent processes
    ///       (e.g. if the compiler is being invoked using `make -jN`).
    ///
    /// This method _does not return [`Result`]_ and should never fail.
    fn render<'d, D: Diagnostic>(&mut self, diagnostic: &'d D)
        -> Report<'d, D>;

    /// Record messages that were produced by a compilation that did
    ///   _not_ fail,
    ///     such as warnings,
    ///   so that they contribute to the totals of this reporter.
    fn record(&mut self, diagnostics: &Diagnostics);

    /// Totals of all messages rendered or recorded by this reporter.
    fn tally(&self) -> Tally;

    /// Whether any errors have been reported.
    fn has_errors(&self) -> bool {
        self.tally().errors > 0
    }

    /// Number of errors reported.
    fn error_count(&self) -> usize {
        self.tally().errors
    }
}

/// Render diagnostic reports as plain lines of text in the conventional
///   `file:line: level: message` format understood by editors and build
///   tools.
#[derive(Debug, Default)]
pub struct TextReporter {
    tally: Tally,
}

impl TextReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for TextReporter {
    fn render<'d, D: Diagnostic>(
        &mut self,
        diagnostic: &'d D,
    ) -> Report<'d, D> {
        let messages = diagnostic.describe();

        // A diagnostic with nothing to describe is still an error;
        //   it must never vanish from the totals.
        if messages.is_empty() {
            self.tally.errors += 1;
        } else {
            self.tally += messages.iter().fold(
                Tally::default(),
                |mut tally, msg| {
                    tally.count(msg);
                    tally
                },
            );
        }

        Report {
            diagnostic,
            messages,
        }
    }

    fn record(&mut self, diagnostics: &Diagnostics) {
        self.tally += diagnostics.tally();
    }

    fn tally(&self) -> Tally {
        self.tally
    }
}

#[derive(Debug)]
pub struct Report<'d, D: Diagnostic> {
    diagnostic: &'d D,
    messages: Vec<Message>,
}

impl<'d, D: Diagnostic> Report<'d, D> {
    /// Most severe level of any message in this report.
    pub fn level(&self) -> Level {
        self.messages
            .iter()
            .filter_map(|msg| msg.level)
            .min()
            .unwrap_or_default()
    }
}

impl<'d, D: Diagnostic> Display for Report<'d, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            return write!(f, "{}: {}\n", Level::Error, self.diagnostic);
        }

        self.messages
            .iter()
            .try_for_each(|msg| write!(f, "{msg}\n"))
    }
}

#[cfg(test)]
mod test;
