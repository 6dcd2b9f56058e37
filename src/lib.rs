// GLSL compiler front end
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

//! Front end of a GLSL compiler.
//!
//! This crate prepares shader source for a lower-level compiler and
//!   drives that compiler to produce a binary.
//! It does not parse GLSL itself;
//!   it instead determines everything that the parser needs to be told
//!   before parsing can begin:
//!
//!   - the macros and include support that are injected ahead of the
//!       source as a [`preamble`];
//!   - the language version and profile that govern the source
//!       ([`version`]),
//!     which determine how `#line` numbers lines;
//!   - the shader [`stage`],
//!       which may be declared in the source itself with
//!       `#pragma shader_stage(...)` ([`scan`]); and
//!   - a canonical rendition of the preprocessed source
//!       ([`reconcile`]).
//!
//! The [`driver`] sequences these steps together with the external
//!   collaborators that perform the actual work:
//!     a [`pp::Preprocessor`],
//!     a [`toolchain::Toolchain`] that parses, links, and generates code,
//!     a [`toolchain::Disassembler`],
//!     and an [`fs::Includer`] that resolves `#include` directives.
//! Concrete implementations of each are provided,
//!   but the driver depends only on their traits.
//!
//! Diagnostics from all of the above are rewritten into a single
//!   consistent format by [`diagnose`].

pub mod global;

#[macro_use]
extern crate static_assertions;

pub mod diagnose;
pub mod driver;
pub mod fs;
pub mod pp;
pub mod preamble;
pub mod reconcile;
pub mod scan;
pub mod stage;
pub mod text;
pub mod toolchain;
pub mod version;
