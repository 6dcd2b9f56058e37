// Light filesystem abstractions
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

//! Lightweight filesystem abstraction and `#include` resolution.
//!
//! This abstraction is intended to provide generics missing from Rust core,
//!   but makes no attempt to be comprehensive---it
//!     includes only what is needed to resolve `#include` directives.
//!
//!   - [`File`] provides a trait for operating on files;
//!   - [`Filesystem`] provides a generic way to access files by path; and
//!   - [`Includer`] resolves the target of an `#include` directive into
//!       source text.
//!
//! Counting Includes
//! =================
//! The preamble reconciler needs to know whether the source made use of
//!   `#include` at all,
//!     so an [`Includer`] counts every directive that it successfully
//!     resolves.
//! The count covers every directive resolved since the last
//!   [`Includer::reset`],
//!     including those in nested includes.

use std::fmt::Display;
use std::fs;
use std::io::{self, Read};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A file.
pub trait File: Read
where
    Self: Sized,
{
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self>;
}

impl File for fs::File {
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::open(path)
    }
}

/// A filesystem.
///
/// Opening a file (using [`open`](Filesystem::open)) proxies to `F::open`.
/// The type of files opened by this abstraction can therefore be controlled
///   via generics.
pub trait Filesystem<F: File> {
    fn open<P: AsRef<Path>>(&mut self, path: P) -> io::Result<F> {
        F::open(path)
    }

    /// Read the entire file at `path` as UTF-8 text.
    fn read_to_string<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> io::Result<String> {
        let mut text = String::new();
        self.open(path)?.read_to_string(&mut text)?;

        Ok(text)
    }
}

/// Vanilla filesystem access.
///
/// This provides access to the filesystem as one would expect.
/// The actual operations are delegated to `F`.
#[derive(Debug)]
pub struct VanillaFilesystem<F: File> {
    _file: PhantomData<F>,
}

impl<F: File> Default for VanillaFilesystem<F> {
    fn default() -> Self {
        Self {
            _file: Default::default(),
        }
    }
}

impl<F: File> Filesystem<F> for VanillaFilesystem<F> {}

/// Form of an `#include` directive.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IncludeKind {
    /// `#include "path"`,
    ///   resolved first relative to the including file.
    Relative,

    /// `#include <path>`,
    ///   resolved only against search paths.
    Standard,
}

/// Source text produced by resolving an `#include`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IncludedSource {
    /// Name of the resolved file,
    ///   used in `#line` directives and diagnostics.
    pub name: String,

    pub content: String,
}

/// Resolves the targets of `#include` directives.
pub trait Includer {
    /// Resolve `requested`,
    ///   which appeared in the source unit named `requesting` at the given
    ///   include `depth`
    ///     (the main source unit being depth 0).
    ///
    /// Each successful resolution is counted;
    ///   see [`Includer::num_include_directives`].
    fn include(
        &mut self,
        requested: &str,
        kind: IncludeKind,
        requesting: &str,
        depth: usize,
    ) -> Result<IncludedSource, IncludeError>;

    /// Number of `#include` directives successfully resolved since the
    ///   last [`Includer::reset`].
    fn num_include_directives(&self) -> usize;

    /// Prepare for a new compilation.
    fn reset(&mut self);
}

/// Includer that resolves nothing.
///
/// Useful for sources that are known to be self-contained.
#[derive(Debug, Default)]
pub struct NullIncluder;

impl Includer for NullIncluder {
    fn include(
        &mut self,
        requested: &str,
        _kind: IncludeKind,
        requesting: &str,
        _depth: usize,
    ) -> Result<IncludedSource, IncludeError> {
        Err(IncludeError::NotFound {
            requested: requested.to_string(),
            requesting: requesting.to_string(),
        })
    }

    fn num_include_directives(&self) -> usize {
        0
    }

    fn reset(&mut self) {}
}

/// Resolves `#include` directives from a [`Filesystem`].
///
/// `"relative"` includes are first resolved against the directory of the
///   including file and then against each search path in the order in
///   which they were added.
/// `<standard>` includes consult only the search paths.
/// Absolute paths are used as-is.
#[derive(Debug)]
pub struct FileIncluder<F: File = fs::File, S = VanillaFilesystem<F>>
where
    S: Filesystem<F>,
{
    fs: S,
    search_paths: Vec<PathBuf>,
    count: usize,
    _file: PhantomData<F>,
}

impl<F: File> FileIncluder<F, VanillaFilesystem<F>> {
    pub fn new() -> Self {
        Self::with_filesystem(VanillaFilesystem::default())
    }
}

impl<F: File> Default for FileIncluder<F, VanillaFilesystem<F>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: File, S: Filesystem<F>> FileIncluder<F, S> {
    pub fn with_filesystem(fs: S) -> Self {
        Self {
            fs,
            search_paths: Vec::new(),
            count: 0,
            _file: PhantomData,
        }
    }

    pub fn add_search_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.search_paths.push(path.into());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Paths to try,
    ///   in order,
    ///   when resolving `requested`.
    fn candidates(
        &self,
        requested: &str,
        kind: IncludeKind,
        requesting: &str,
    ) -> Vec<PathBuf> {
        let requested_path = Path::new(requested);

        if requested_path.is_absolute() {
            return vec![requested_path.to_path_buf()];
        }

        let relative = match kind {
            IncludeKind::Relative => Some(
                Path::new(requesting)
                    .parent()
                    .map(|dir| dir.join(requested_path))
                    .unwrap_or_else(|| requested_path.to_path_buf()),
            ),
            IncludeKind::Standard => None,
        };

        relative
            .into_iter()
            .chain(self.search_paths.iter().map(|p| p.join(requested_path)))
            .collect()
    }
}

impl<F: File, S: Filesystem<F>> Includer for FileIncluder<F, S> {
    fn include(
        &mut self,
        requested: &str,
        kind: IncludeKind,
        requesting: &str,
        depth: usize,
    ) -> Result<IncludedSource, IncludeError> {
        for path in self.candidates(requested, kind, requesting) {
            match self.fs.read_to_string(&path) {
                Ok(content) => {
                    log::debug!(
                        "resolved #include `{requested}` from `{requesting}` \
                           (depth {depth}) to {}",
                        path.display(),
                    );

                    self.count += 1;

                    return Ok(IncludedSource {
                        name: path.to_string_lossy().into_owned(),
                        content,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(IncludeError::Io(path, e)),
            }
        }

        Err(IncludeError::NotFound {
            requested: requested.to_string(),
            requesting: requesting.to_string(),
        })
    }

    fn num_include_directives(&self) -> usize {
        self.count
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

/// Failure to resolve an `#include`.
#[derive(Debug)]
pub enum IncludeError {
    /// No candidate path exists.
    NotFound {
        requested: String,
        requesting: String,
    },

    /// A candidate exists but could not be read.
    Io(PathBuf, io::Error),
}

impl Display for IncludeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { requested, .. } => {
                write!(f, "cannot find or open include file: {requested}")
            }
            Self::Io(path, e) => {
                write!(f, "failed to read {}: {e}", path.display())
            }
        }
    }
}

impl std::error::Error for IncludeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Io(_, e) => Some(e),
        }
    }
}

#[cfg(test)]
mod test;
