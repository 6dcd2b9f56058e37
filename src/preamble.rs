// Source preamble
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

//! Synthetic text prepended to every shader.
//!
//! The preamble consists of one `#define` line for each macro that the
//!   caller defined
//!     (e.g. with `-DNAME=VALUE`),
//!   followed by [`global::INCLUDE_SUPPORT_DIRECTIVE`] to enable
//!   `#include` in the user's source.
//!
//! After preprocessing,
//!   each `#define` line becomes an empty line and the include-support
//!   directive remains;
//!     [`crate::reconcile`] is responsible for cleaning that up.

use crate::global;
use std::collections::BTreeMap;

/// Macros defined by the caller prior to compilation.
///
/// Macros are kept ordered by name so that the preamble is
///   deterministic.
/// Defining a macro that already exists replaces its definition.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct MacroDefinitions(BTreeMap<String, String>);

impl MacroDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<N: Into<String>, D: Into<String>>(
        &mut self,
        name: N,
        definition: D,
    ) {
        self.0.insert(name.into(), definition.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Serialize as `#define NAME DEFINITION` lines.
    pub fn to_directives(&self) -> String {
        self.iter()
            .map(|(name, def)| format!("#define {name} {def}\n"))
            .collect()
    }
}

impl<N: Into<String>, D: Into<String>> FromIterator<(N, D)>
    for MacroDefinitions
{
    fn from_iter<T: IntoIterator<Item = (N, D)>>(iter: T) -> Self {
        let mut defs = Self::new();
        iter.into_iter().for_each(|(n, d)| defs.define(n, d));
        defs
    }
}

/// Text prepended to a shader before preprocessing and parsing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Preamble(String);

impl Preamble {
    pub fn new(macros: &MacroDefinitions) -> Self {
        let mut text = macros.to_directives();
        text.push_str(global::INCLUDE_SUPPORT_DIRECTIVE);

        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Preamble {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_preamble_is_include_support_only() {
        let sut = Preamble::new(&MacroDefinitions::new());

        assert_eq!(global::INCLUDE_SUPPORT_DIRECTIVE, sut.as_str());
    }

    #[test]
    fn macros_precede_include_support_in_name_order() {
        let macros = [("ZED", "1"), ("ALPHA", "x + y")]
            .into_iter()
            .collect::<MacroDefinitions>();

        assert_eq!(
            "#define ALPHA x + y\n\
             #define ZED 1\n\
             #extension GL_GOOGLE_include_directive : enable\n",
            Preamble::new(&macros).as_str(),
        );
    }

    #[test]
    fn redefinition_replaces() {
        let mut sut = MacroDefinitions::new();
        sut.define("A", "1");
        sut.define("A", "2");

        assert_eq!(vec![("A", "2")], sut.iter().collect::<Vec<_>>());
    }
}
