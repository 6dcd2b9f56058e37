// Parser, linker, and code generator collaborators
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

//! Toolchain that performs the actual compilation.
//!
//! The front end does not parse GLSL itself.
//! Once the source has been preprocessed and its stage is known,
//!   parsing,
//!   semantic validation,
//!   linking,
//!   and code generation are all delegated to a [`Toolchain`],
//!     and the optional disassembly of the resulting binary to a
//!     [`Disassembler`].
//!
//! Failures come in two flavors:
//!
//!   - a failure of the _shader_,
//!       such as a syntax error,
//!     is not an error of the toolchain;
//!       it is reported as a [`Logged`] result without output,
//!       and it is the info log that tells the user what went wrong;
//!   - a failure of the toolchain _itself_,
//!       such as a missing executable,
//!     is a [`ToolchainError`].
//!
//! A toolchain may hold resources for the duration of a compilation.
//! These are claimed with [`ToolchainSession::acquire`] and released
//!   when the session is dropped,
//!     regardless of how the compilation ended.

pub mod glslang;

pub use glslang::{GlslangValidator, SpirvDis};

use crate::{
    diagnose::{Diagnostic, Level, Message},
    fs::Includer,
    preamble::Preamble,
    stage::Stage,
    version::VersionProfile,
};
use std::{
    error::Error,
    fmt::Display,
    io,
    ops::{Deref, DerefMut},
};

/// Everything a [`Toolchain`] needs to parse a single source unit.
///
/// The source is the _original_ source provided by the caller,
///   not the output of the front end's preprocessor;
///     the toolchain performs its own preprocessing using the same
///     `preamble`.
#[derive(Debug, Clone, Copy)]
pub struct ParseRequest<'a> {
    pub tag: &'a str,
    pub source: &'a str,
    pub preamble: &'a Preamble,
    pub stage: Stage,
    pub version: VersionProfile,
    pub force_version: bool,
    pub forward_compatible: bool,
    pub debug_info: bool,
}

/// Output of a toolchain operation together with its info log.
///
/// The absence of output indicates that the operation failed;
///   the reason is in the log.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Logged<T> {
    pub output: Option<T>,
    pub log: String,
}

impl<T> Logged<T> {
    pub fn ok<S: Into<String>>(output: T, log: S) -> Self {
        Self {
            output: Some(output),
            log: log.into(),
        }
    }

    pub fn failed<S: Into<String>>(log: S) -> Self {
        Self {
            output: None,
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.output.is_some()
    }
}

/// Parser, linker, and code generator.
pub trait Toolchain {
    /// A successfully parsed compilation unit.
    type Unit;

    /// A successfully linked program.
    type Program;

    /// Claim any resources needed for a compilation.
    ///
    /// Prefer [`ToolchainSession::acquire`],
    ///   which guarantees that [`Self::release`] will be called.
    fn acquire(&mut self) -> Result<(), ToolchainError> {
        Ok(())
    }

    /// Release resources claimed by [`Self::acquire`].
    fn release(&mut self) {}

    fn parse(
        &mut self,
        request: &ParseRequest,
        includer: &mut dyn Includer,
    ) -> Result<Logged<Self::Unit>, ToolchainError>;

    fn link(
        &mut self,
        unit: Self::Unit,
    ) -> Result<Logged<Self::Program>, ToolchainError>;

    /// Produce binary words for the given `stage` of `program`.
    fn generate(
        &mut self,
        program: &Self::Program,
        stage: Stage,
    ) -> Result<Vec<u32>, ToolchainError>;
}

/// Converts binary words into human-readable text.
///
/// Any one-time initialization is the responsibility of the
///   implementation and should be deferred until first use.
pub trait Disassembler {
    fn disassemble(&mut self, words: &[u32]) -> Result<String, ToolchainError>;
}

/// A [`Toolchain`] that has been acquired for the duration of a
///   compilation.
///
/// The toolchain is released when the session is dropped.
#[derive(Debug)]
pub struct ToolchainSession<'t, T: Toolchain> {
    toolchain: &'t mut T,
}

impl<'t, T: Toolchain> ToolchainSession<'t, T> {
    pub fn acquire(toolchain: &'t mut T) -> Result<Self, ToolchainError> {
        toolchain.acquire()?;
        Ok(Self { toolchain })
    }
}

impl<'t, T: Toolchain> Deref for ToolchainSession<'t, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.toolchain
    }
}

impl<'t, T: Toolchain> DerefMut for ToolchainSession<'t, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.toolchain
    }
}

impl<'t, T: Toolchain> Drop for ToolchainSession<'t, T> {
    fn drop(&mut self) {
        self.toolchain.release();
    }
}

/// Failure of the toolchain itself,
///   as opposed to a failure of the shader being compiled.
#[derive(Debug)]
pub enum ToolchainError {
    /// A tool could not be located or started.
    Unavailable { tool: &'static str, reason: String },

    /// I/O error while communicating with a tool.
    Io(&'static str, io::Error),

    /// A tool terminated unsuccessfully without producing a usable info
    ///   log.
    Failed {
        tool: &'static str,
        status: Option<i32>,
        stderr: String,
    },

    /// A linked program did not yield binary words.
    CodeGen(String),

    /// Binary words could not be disassembled.
    Disassembly(String),
}

impl Display for ToolchainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable { tool, reason } => {
                write!(f, "{tool} is unavailable: {reason}")
            }
            Self::Io(tool, e) => write!(f, "{tool}: {e}"),
            Self::Failed {
                tool,
                status: Some(code),
                stderr,
            } => write!(f, "{tool} exited with status {code}: {stderr}"),
            Self::Failed {
                tool,
                status: None,
                stderr,
            } => write!(f, "{tool} was terminated: {stderr}"),
            Self::CodeGen(msg) => write!(f, "code generation failed: {msg}"),
            Self::Disassembly(msg) => {
                write!(f, "disassembly failed: {msg}")
            }
        }
    }
}

impl Error for ToolchainError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

impl Diagnostic for ToolchainError {
    fn describe(&self) -> Vec<Message> {
        match self {
            Self::Unavailable { tool, reason } => vec![
                Message::new(Level::InternalError, *tool, None, reason),
                Message::new(
                    Level::Note,
                    *tool,
                    None,
                    "the tool must be installed and on the PATH",
                ),
            ],

            // Fall back to rendering the `Display` of the error.
            _ => vec![],
        }
    }
}

assert_impl_all!(ToolchainError: Error, Send, Sync);

#[cfg(test)]
mod test;
