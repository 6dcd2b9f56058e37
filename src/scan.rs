// Stage directive scanning
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

//! Infer the shader stage from `#pragma shader_stage(<name>)`.
//!
//! A shader may declare its own stage:
//!
//! ```glsl
//! #version 450
//! #pragma shader_stage(fragment)
//!
//! void main() { /* ... */ }
//! ```
//!
//! The directive must appear before any non-preprocessor code,
//!   and every occurrence must name the same stage.
//!
//! Logical Line Numbers
//! ====================
//! Diagnostics must refer to the line numbers that a human reading the
//!   original
//!     (possibly multi-file)
//!   source would expect,
//!     not to physical lines of the preprocessed text.
//! The scanner therefore maintains a logical line counter that starts at
//!   1,
//!     advances by one for each physical line,
//!     and is reset by each `#line N` directive.
//! The value it is reset to depends on whether `#line` numbers the line
//!   that follows it
//!     (see [`VersionProfile::line_directive_is_for_next_line`]):
//!   if so,
//!     the next line is `N`;
//!   otherwise the directive itself is line `N` and so the next line is
//!     `N + 1`.
//!
//! [`VersionProfile::line_directive_is_for_next_line`]: crate::version::VersionProfile::line_directive_is_for_next_line

use crate::{
    diagnose::{Diagnostic, Message},
    global,
    stage::Stage,
    text::{self, LineNum},
};
use std::fmt::Display;

/// A `#pragma shader_stage(...)` directive.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct StageDirective<'a> {
    /// Logical line on which the directive appears.
    pub line: LineNum,

    /// Argument of the directive,
    ///   which is not necessarily a valid stage name.
    pub name: &'a str,
}

/// Result of scanning preprocessed text for stage directives.
///
/// Physical line indexes are used only to determine ordering,
///   never for display.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct StageScan<'a> {
    directives: Vec<StageDirective<'a>>,
    first_directive: Option<usize>,
    first_code: Option<usize>,
}

/// Extract the argument of a stage directive from the text following
///   `#pragma shader_stage`.
///
/// The argument is the text between the first `(` and the `)` that
///   follows it.
/// Should the parentheses be unbalanced,
///   we settle for the remaining text with any surrounding parentheses
///   removed.
fn directive_argument(rest: &str) -> &str {
    let delimited = rest.find('(').and_then(|open| {
        let inner = &rest[open + 1..];
        inner.find(')').map(|close| &inner[..close])
    });

    let arg = delimited.unwrap_or_else(|| {
        text::strip_whitespace(rest)
            .trim_matches(|c: char| c == '(' || c == ')')
    });

    text::strip_whitespace(arg)
}

impl<'a> StageScan<'a> {
    /// Scan `preprocessed` for stage directives.
    ///
    /// `next_line` is whether `#line` numbers the line that follows it
    ///   for the effective version and profile of the shader.
    pub fn scan(preprocessed: &'a str, next_line: bool) -> Self {
        let mut scan = Self::default();
        let mut logical: LineNum = 1;

        for (i, line) in text::lines(preprocessed).enumerate() {
            let line = text::strip_whitespace(line);

            if let Some(rest) = line.strip_prefix(global::PRAGMA_SHADER_STAGE)
            {
                scan.directives.push(StageDirective {
                    line: logical,
                    name: directive_argument(rest),
                });
                scan.first_directive.get_or_insert(i);
            } else if !line.is_empty() && !line.starts_with('#') {
                scan.first_code.get_or_insert(i);
            }

            logical = match line.strip_prefix(global::LINE_DIRECTIVE) {
                Some(arg) => {
                    text::parse_leading_int(arg)
                        .saturating_add((!next_line) as LineNum)
                }
                None => logical.saturating_add(1),
            };
        }

        scan
    }

    /// Every stage directive in the order encountered.
    pub fn directives(&self) -> &[StageDirective<'a>] {
        &self.directives
    }

    /// Validate the directives and determine the stage that they select.
    ///
    /// If there are no directives,
    ///   [`None`] is returned;
    ///     this is not an error,
    ///       since the stage may be determined by other means.
    /// Otherwise all violations are collected into a single error,
    ///   in which case no stage is inferred even if the first directive
    ///   names a valid stage.
    pub fn resolve(&self, tag: &str) -> Result<Option<Stage>, StageError> {
        let first = match self.directives.first() {
            Some(first) => *first,
            None => return Ok(None),
        };

        let mut violations = Vec::new();

        if let (Some(directive), Some(code)) =
            (self.first_directive, self.first_code)
        {
            if directive > code {
                violations.push(StageViolation::AfterCode { line: first.line });
            }
        }

        let stage = Stage::from_pragma_name(first.name);

        if stage.is_none() {
            violations.push(StageViolation::InvalidStage {
                line: first.line,
                name: first.name.to_string(),
            });
        }

        violations.extend(
            self.directives
                .iter()
                .skip(1)
                .filter(|other| other.name != first.name)
                .map(|other| StageViolation::Conflict {
                    line: other.line,
                    name: other.name.to_string(),
                    first_line: first.line,
                    first_name: first.name.to_string(),
                }),
        );

        if violations.is_empty() {
            Ok(stage)
        } else {
            Err(StageError {
                tag: tag.to_string(),
                violations,
            })
        }
    }
}

/// Scan `preprocessed` and infer the stage that it selects.
///
/// See [`StageScan::scan`] and [`StageScan::resolve`].
pub fn infer_stage(
    preprocessed: &str,
    tag: &str,
    next_line: bool,
) -> Result<Option<Stage>, StageError> {
    StageScan::scan(preprocessed, next_line).resolve(tag)
}

/// A problem with a `#pragma shader_stage` directive.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum StageViolation {
    /// The first directive follows non-preprocessor code.
    AfterCode { line: LineNum },

    /// The first directive names an unknown stage.
    InvalidStage { line: LineNum, name: String },

    /// A later directive names a stage different from the first.
    Conflict {
        line: LineNum,
        name: String,
        first_line: LineNum,
        first_name: String,
    },
}

impl StageViolation {
    fn line(&self) -> LineNum {
        match self {
            Self::AfterCode { line }
            | Self::InvalidStage { line, .. }
            | Self::Conflict { line, .. } => *line,
        }
    }

    /// Description of the violation for the source unit `tag`.
    ///
    /// The tag is needed because conflicts refer back to the location of
    ///   the first directive.
    fn describe(&self, tag: &str) -> String {
        match self {
            Self::AfterCode { .. } => "'#pragma': the first 'shader_stage' \
                 #pragma must appear before any non-preprocessing code"
                .to_string(),

            Self::InvalidStage { name, .. } => format!(
                "'#pragma': invalid stage for 'shader_stage' #pragma: \
                   '{name}'"
            ),

            Self::Conflict {
                name,
                first_line,
                first_name,
                ..
            } => format!(
                "'#pragma': conflicting stages for 'shader_stage' #pragma: \
                   '{name}' (was '{first_name}' at {tag}:{first_line})"
            ),
        }
    }
}

/// One or more invalid `#pragma shader_stage` directives.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StageError {
    pub tag: String,
    pub violations: Vec<StageViolation>,
}

impl Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.violations.len() {
            1 => write!(f, "invalid 'shader_stage' #pragma in {}", self.tag),
            n => write!(
                f,
                "{n} problems with 'shader_stage' #pragma in {}",
                self.tag
            ),
        }
    }
}

impl std::error::Error for StageError {}

impl Diagnostic for StageError {
    fn describe(&self) -> Vec<Message> {
        self.violations
            .iter()
            .map(|v| {
                let text = v.describe(&self.tag);
                Message::error_at(self.tag.as_str(), v.line(), text)
            })
            .collect()
    }
}

#[cfg(test)]
mod test;
