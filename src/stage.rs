// Shader stages
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

//! Shader stages.
//!
//! The stage is the kind of compilation unit a shader represents,
//!   which governs the built-in symbols and semantics available to it.
//! A stage may be forced by the caller,
//!   selected in source by `#pragma shader_stage(<name>)`
//!     (see [`crate::scan`]),
//!   or inferred by a caller-supplied fallback,
//!     such as from a file extension
//!     (see [`Stage::from_extension`]).

use std::{fmt::Display, path::Path, str::FromStr};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Stage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Self::Vertex,
        Self::TessControl,
        Self::TessEvaluation,
        Self::Geometry,
        Self::Fragment,
        Self::Compute,
    ];

    /// Map the argument of `#pragma shader_stage(...)` to a stage.
    pub fn from_pragma_name(name: &str) -> Option<Self> {
        match name {
            "vertex" => Some(Self::Vertex),
            "tesscontrol" => Some(Self::TessControl),
            "tesseval" => Some(Self::TessEvaluation),
            "geometry" => Some(Self::Geometry),
            "fragment" => Some(Self::Fragment),
            "compute" => Some(Self::Compute),
            _ => None,
        }
    }

    /// Name used by `#pragma shader_stage(...)` and on the command line.
    pub fn pragma_name(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::TessControl => "tesscontrol",
            Self::TessEvaluation => "tesseval",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }

    /// Conventional file extension for shaders of this stage.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::TessControl => "tesc",
            Self::TessEvaluation => "tese",
            Self::Geometry => "geom",
            Self::Fragment => "frag",
            Self::Compute => "comp",
        }
    }

    /// Infer a stage from the extension of `path`.
    pub fn from_extension<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;

        Self::ALL.into_iter().find(|stage| stage.extension() == ext)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pragma_name())
    }
}

/// Unrecognized stage name.
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl Display for UnknownStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown shader stage `{}`", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_pragma_name(s).ok_or_else(|| UnknownStage(s.to_string()))
    }
}
