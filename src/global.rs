// Global constants across the entire system
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

//! System-wide static configuration.
//!
//! This module provides a system-wide configuration.
//! Subsystems should reference these values rather than defining their own
//!   and risk incompatibilities or maintenance issues as requirements
//!   change.
//!
//! By convention,
//!   import this entire module rather than individual members and reference
//!   them as `global::foo` to emphasize their nature and risk.

use crate::version::{Profile, VersionProfile};

/// Version and profile assumed when a shader declares neither and the
///   caller has not configured one.
pub const DEFAULT_VERSION_PROFILE: VersionProfile =
    VersionProfile::new(110, Profile::None);

/// Directive injected at the end of the preamble to enable `#include`.
///
/// The preprocessor emits this line verbatim in its output,
///   which is what allows the reconciler to locate the boundary between
///   the preamble and the user's source.
pub const INCLUDE_SUPPORT_DIRECTIVE: &str =
    "#extension GL_GOOGLE_include_directive : enable\n";

/// Name of the extension that enables `#include`.
pub const INCLUDE_EXTENSION: &str = "GL_GOOGLE_include_directive";

/// Directive prefix selecting the shader stage from within source.
pub const PRAGMA_SHADER_STAGE: &str = "#pragma shader_stage";

/// Line-marker directive prefix.
pub const LINE_DIRECTIVE: &str = "#line";

/// Version declaration directive prefix.
///
/// Preprocessed output is canonical,
///   so this can be compared verbatim without worrying about whitespace
///   between `#` and the directive name.
pub const VERSION_DIRECTIVE: &str = "#version";

/// Version at which `#line` begins to number the line _after_ the
///   directive rather than the directive's own line.
pub const LINE_DIRECTIVE_NEXT_LINE_VERSION: u32 = 330;

/// Maximum nesting depth of `#include` before preprocessing fails.
pub const MAX_INCLUDE_DEPTH: usize = 100;

/// Tag used for diagnostics when source is read from standard input.
pub const STDIN_TAG: &str = "<stdin>";

/// Environment variable that overrides the location of
///   `glslangValidator`.
pub const GLSLANG_VALIDATOR_ENV: &str = "GLSLFC_GLSLANG_VALIDATOR";

/// Environment variable that overrides the location of `spirv-dis`.
pub const SPIRV_DIS_ENV: &str = "GLSLFC_SPIRV_DIS";
