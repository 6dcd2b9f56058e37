// Language version and profile
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

//! GLSL version and profile.
//!
//! A shader declares the dialect it is written in using a directive like
//!   `#version 310 es`.
//! The version/profile pair governs more than available features:
//!   the meaning of `#line` changed at version 330
//!     (see [`VersionProfile::line_directive_is_for_next_line`]),
//!   which affects how every line number in the system is computed.
//!
//! The _effective_ version/profile of a compilation is determined by
//!   [`VersionProfile::effective`].

use crate::global;
use std::{fmt::Display, str::FromStr};

/// Language dialect selector.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Profile {
    /// No profile was specified.
    #[default]
    None,
    Core,
    Compatibility,
    Es,
}

impl Profile {
    /// Look up a profile by the keyword used in `#version`.
    ///
    /// The empty string denotes the absence of a profile.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "" => Some(Self::None),
            "core" => Some(Self::Core),
            "compatibility" => Some(Self::Compatibility),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Core => "core",
            Self::Compatibility => "compatibility",
            Self::Es => "es",
        }
    }
}

/// Versions recognized in `#version` and on the command line.
const KNOWN_VERSIONS: [u32; 17] = [
    100, 110, 120, 130, 140, 150, 300, 310, 320, 330, 400, 410, 420, 430,
    440, 450, 460,
];

/// Whether `version` is a GLSL version that we recognize.
pub fn is_known_version(version: u32) -> bool {
    KNOWN_VERSIONS.contains(&version)
}

/// A language version paired with a profile.
///
/// The pair `(0, Profile::None)` is reserved to denote the absence of a
///   declaration;
///     see [`VersionProfile::UNDECLARED`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VersionProfile {
    pub version: u32,
    pub profile: Profile,
}

impl VersionProfile {
    /// No usable version declaration was found.
    pub const UNDECLARED: Self = Self::new(0, Profile::None);

    pub const fn new(version: u32, profile: Profile) -> Self {
        Self { version, profile }
    }

    pub fn is_undeclared(&self) -> bool {
        *self == Self::UNDECLARED
    }

    /// Parse a compact version/profile string such as `450core` or
    ///   `310es`.
    ///
    /// The string must contain no whitespace.
    /// The version must be one of the known versions
    ///   (see [`is_known_version`]).
    pub fn parse_compact(s: &str) -> Option<Self> {
        let digits_end = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());

        let version = s[..digits_end].parse::<u32>().ok()?;
        let profile = Profile::from_keyword(&s[digits_end..])?;

        is_known_version(version).then_some(Self::new(version, profile))
    }

    /// Extract the version/profile declared by the first `#version`
    ///   directive in `text`.
    ///
    /// The remainder of the physical line following `#version` has its
    ///   spaces removed and is parsed using
    ///   [`VersionProfile::parse_compact`],
    ///     so `#version 310 es` yields `(310, Es)`.
    /// If there is no directive,
    ///   or if it cannot be parsed,
    ///   [`VersionProfile::UNDECLARED`] is returned;
    ///     the absence of a usable declaration is not a fault.
    pub fn from_source(text: &str) -> Self {
        let rest = match text.find(global::VERSION_DIRECTIVE) {
            Some(at) => &text[at + global::VERSION_DIRECTIVE.len()..],
            None => return Self::UNDECLARED,
        };

        let line = match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        };

        let compact = line.chars().filter(|c| *c != ' ').collect::<String>();

        Self::parse_compact(&compact).unwrap_or(Self::UNDECLARED)
    }

    /// Determine the version/profile that applies to a compilation.
    ///
    /// If `forced`,
    ///   `configured` always wins and the source is never consulted.
    /// Otherwise the declaration in `preprocessed` is used if present,
    ///   falling back to `configured`.
    pub fn effective(
        preprocessed: &str,
        configured: Self,
        forced: bool,
    ) -> Self {
        if forced {
            return configured;
        }

        match Self::from_source(preprocessed) {
            declared if declared.is_undeclared() => configured,
            declared => declared,
        }
    }

    /// Whether `#line N` sets the number of the line _following_ the
    ///   directive.
    ///
    /// For ES profiles and for versions ≥330,
    ///   the directive numbers the next line.
    /// Otherwise it numbers the line on which it appears,
    ///   so the following line is `N + 1`.
    pub fn line_directive_is_for_next_line(&self) -> bool {
        self.profile == Profile::Es
            || self.version >= global::LINE_DIRECTIVE_NEXT_LINE_VERSION
    }
}

impl Default for VersionProfile {
    fn default() -> Self {
        global::DEFAULT_VERSION_PROFILE
    }
}

impl Display for VersionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.version, self.profile.keyword())
    }
}

/// Error parsing a compact version/profile string.
#[derive(Debug, PartialEq, Eq)]
pub struct InvalidVersionProfile(pub String);

impl Display for InvalidVersionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid version/profile `{}`", self.0)
    }
}

impl std::error::Error for InvalidVersionProfile {}

impl FromStr for VersionProfile {
    type Err = InvalidVersionProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_compact(s)
            .ok_or_else(|| InvalidVersionProfile(s.to_string()))
    }
}
