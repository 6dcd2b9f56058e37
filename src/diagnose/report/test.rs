// Tests for diagnostic report rendering
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

use super::*;
use std::error::Error;

#[derive(Debug)]
struct StubError(Vec<Message>);

impl Display for StubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stub failure")
    }
}

impl Error for StubError {}

impl Diagnostic for StubError {
    fn describe(&self) -> Vec<Message> {
        self.0.clone()
    }
}

#[test]
fn renders_each_message() {
    let err = StubError(vec![
        Message::error_at("a.comp", 4, "first"),
        Message::new(Level::Note, "a.comp", Some(1), "see here"),
    ]);

    let mut sut = TextReporter::new();
    let report = sut.render(&err);

    assert_eq!(
        "a.comp:4: error: first\na.comp:1: note: see here\n",
        report.to_string()
    );
    assert_eq!(Level::Error, report.level());
    assert_eq!(1, sut.error_count());
}

#[test]
fn falls_back_to_display_without_messages() {
    let err = StubError(vec![]);

    let mut sut = TextReporter::new();
    let report = sut.render(&err).to_string();

    assert_eq!("error: stub failure\n", report);
    assert!(sut.has_errors());
}

#[test]
fn internal_error_is_most_severe() {
    let err = StubError(vec![
        Message::new(Level::Warning, "t", None, "w"),
        Message::new(Level::InternalError, "t", None, "ice"),
    ]);

    let mut sut = TextReporter::new();

    assert_eq!(Level::InternalError, sut.render(&err).level());
}

#[test]
fn recorded_warnings_contribute_to_tally() {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(Message::new(Level::Warning, "t", Some(2), "w"));

    let mut sut = TextReporter::new();
    sut.record(&diagnostics);
    sut.render(&StubError(vec![Message::error_at("t", 1, "e")]));

    assert_eq!(
        Tally {
            warnings: 1,
            errors: 1
        },
        sut.tally()
    );
}
