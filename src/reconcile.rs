// Preamble reconciliation
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

//! Reconcile preprocessor output with what the source would have
//!   produced had no [`Preamble`](crate::preamble::Preamble) been
//!   injected.
//!
//! The shader is preprocessed as `preamble + source`.
//! The `#define` lines of the preamble each become an empty line,
//!   and the include-support directive that terminates the preamble is
//!   passed through verbatim ahead of the user's source:
//!
//! ```text
//!                                          (from `#define FOO 1`)
//! #extension GL_GOOGLE_include_directive : enable
//! #version 450
//! ...
//! ```
//!
//! This module rewrites that output:
//!
//!   - the empty lines generated by the macro definitions are removed;
//!   - if the source did not use `#include`,
//!       the include-support directive is removed,
//!       since it is just noise; and
//!   - otherwise the include-support directive is kept and followed by a
//!       synthesized `#line` directive that re-anchors the numbering of
//!       the main file,
//!     and the `#version` directive,
//!       which must be the first line of a shader,
//!       is relocated to the top of the output.
//!     Its original line is replaced with an empty line so that the
//!       remaining lines keep their positions.
//!
//! The relocation of `#version` is the _only_ reordering of content that
//!   this module performs.

use crate::{
    diagnose::{Diagnostic, Level, Message},
    global, text,
};
use std::fmt::Display;

/// Render a `#line` directive numbering the main file `tag`.
///
/// The include-support directive consumes one physical line ahead of the
///   user's source,
///     so the directive that follows it must cause the next line to be
///     line 1.
/// If `#line` numbers the next line,
///   that is `#line 1`;
///   otherwise it numbers itself and must be `#line 0`.
fn main_file_line_directive(tag: &str, next_line: bool) -> String {
    format!(
        "{} {} \"{}\"\n",
        global::LINE_DIRECTIVE,
        next_line as u8,
        tag
    )
}

/// Reconcile `preprocessed` output with the source that produced it.
///
/// - `tag` identifies the source unit and is used for the synthesized
///     `#line` directive;
/// - `include_support` is the exact include-support line
///     (including its newline)
///     that was injected by the preamble;
/// - `include_directives` is the number of `#include` directives that
///     were processed while preprocessing this unit; and
/// - `next_line` is whether `#line` numbers the line that follows it
///     for the effective version and profile
///     (see [`VersionProfile::line_directive_is_for_next_line`]).
///
/// The include-support line is required to appear in `preprocessed`,
///   since the caller always injects it;
///     its absence is an internal error.
///
/// [`VersionProfile::line_directive_is_for_next_line`]: crate::version::VersionProfile::line_directive_is_for_next_line
pub fn reconcile(
    preprocessed: &str,
    tag: &str,
    include_support: &str,
    include_directives: usize,
    next_line: bool,
) -> Result<String, ReconcileError> {
    let lines = text::lines_inclusive(preprocessed).collect::<Vec<_>>();
    let has_includes = include_directives > 0;

    let mut anchor = None;
    let mut version = None;

    for (i, line) in lines.iter().enumerate() {
        if *line == include_support {
            anchor = anchor.or(Some(i));
        } else if line.starts_with(global::VERSION_DIRECTIVE) {
            version = Some(i);
            break;
        }
    }

    let anchor = anchor.ok_or_else(|| ReconcileError::MissingAnchor {
        tag: tag.to_string(),
    })?;

    let mut out = String::with_capacity(preprocessed.len() + tag.len() + 16);

    // `#version` must be the first line of what is fed to the parser.
    if let (true, Some(i)) = (has_includes, version) {
        out.push_str(lines[i]);

        if !lines[i].ends_with('\n') {
            out.push('\n');
        }
    }

    // Empty lines before the anchor are artifacts of `#define`s in the
    //   preamble.
    lines[..anchor]
        .iter()
        .filter(|line| !text::strip_whitespace(line).is_empty())
        .for_each(|line| out.push_str(line));

    if has_includes {
        out.push_str(include_support);
        out.push_str(&main_file_line_directive(tag, next_line));
    }

    for (i, line) in lines.iter().enumerate().skip(anchor + 1) {
        match version {
            Some(v) if v == i && has_includes => out.push('\n'),
            _ => out.push_str(line),
        }
    }

    Ok(out)
}

/// Preprocessor output does not have the structure that the preamble
///   guarantees.
#[derive(Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// The include-support directive injected by the preamble was not
    ///   found in the preprocessed output.
    MissingAnchor { tag: String },
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAnchor { tag } => write!(
                f,
                "preprocessed output of `{tag}` is missing the \
                   include-support directive injected by the preamble",
            ),
        }
    }
}

impl std::error::Error for ReconcileError {}

impl Diagnostic for ReconcileError {
    fn describe(&self) -> Vec<Message> {
        match self {
            Self::MissingAnchor { tag } => vec![
                Message::new(
                    Level::InternalError,
                    tag.as_str(),
                    None,
                    self.to_string(),
                ),
                Message::new(
                    Level::Note,
                    tag.as_str(),
                    None,
                    "this is a bug in the compiler or in the configured \
                       preprocessor; please report it",
                ),
            ],
        }
    }
}

#[cfg(test)]
mod test;
