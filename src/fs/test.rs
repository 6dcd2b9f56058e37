// Tests for filesystem abstractions and include resolution
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
use fxhash::FxHashMap;
use std::io::Cursor;

#[derive(Debug)]
struct StubFile(Cursor<Vec<u8>>);

impl File for StubFile {
    fn open<P: AsRef<Path>>(_path: P) -> io::Result<Self> {
        Err(io::ErrorKind::NotFound.into())
    }
}

impl Read for StubFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Filesystem backed by an in-memory map of paths to contents.
#[derive(Debug, Default)]
struct StubFilesystem {
    files: FxHashMap<PathBuf, &'static str>,
    denied: Vec<PathBuf>,
}

impl StubFilesystem {
    fn with(files: &[(&str, &'static str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (PathBuf::from(path), *content))
                .collect(),
            denied: Vec::new(),
        }
    }
}

impl Filesystem<StubFile> for StubFilesystem {
    fn open<P: AsRef<Path>>(&mut self, path: P) -> io::Result<StubFile> {
        let path = path.as_ref();

        if self.denied.iter().any(|p| p == path) {
            return Err(io::ErrorKind::PermissionDenied.into());
        }

        self.files
            .get(path)
            .map(|content| StubFile(Cursor::new(content.as_bytes().to_vec())))
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }
}

fn includer(
    files: &[(&str, &'static str)],
) -> FileIncluder<StubFile, StubFilesystem> {
    FileIncluder::with_filesystem(StubFilesystem::with(files))
}

#[test]
fn relative_include_prefers_including_directory() {
    let mut sut = includer(&[
        ("shaders/common.glsl", "local"),
        ("lib/common.glsl", "library"),
    ]);
    sut.add_search_path("lib");

    assert_eq!(
        IncludedSource {
            name: "shaders/common.glsl".into(),
            content: "local".into(),
        },
        sut.include("common.glsl", IncludeKind::Relative, "shaders/a.vert", 0)
            .unwrap()
    );
}

#[test]
fn relative_include_falls_back_to_search_paths_in_order() {
    let mut sut = includer(&[
        ("second/common.glsl", "second"),
        ("third/common.glsl", "third"),
    ]);
    sut.add_search_path("first");
    sut.add_search_path("second");
    sut.add_search_path("third");

    let included = sut
        .include("common.glsl", IncludeKind::Relative, "a.vert", 0)
        .unwrap();

    assert_eq!("second", included.content);
}

#[test]
fn standard_include_ignores_including_directory() {
    let mut sut = includer(&[("shaders/common.glsl", "local")]);

    assert!(matches!(
        sut.include("common.glsl", IncludeKind::Standard, "shaders/a.vert", 0),
        Err(IncludeError::NotFound { .. })
    ));

    sut.add_search_path("shaders");

    assert!(sut
        .include("common.glsl", IncludeKind::Standard, "shaders/a.vert", 0)
        .is_ok());
}

#[test]
fn counts_successful_resolutions_until_reset() {
    let mut sut = includer(&[("a.glsl", "a"), ("b.glsl", "b")]);

    assert_eq!(0, sut.num_include_directives());

    sut.include("a.glsl", IncludeKind::Relative, "main", 0).unwrap();
    sut.include("b.glsl", IncludeKind::Relative, "a.glsl", 1).unwrap();
    let _ = sut.include("missing.glsl", IncludeKind::Relative, "main", 0);

    assert_eq!(2, sut.num_include_directives());

    sut.reset();
    assert_eq!(0, sut.num_include_directives());
}

#[test]
fn missing_include_names_file() {
    let mut sut = includer(&[]);

    let err = sut
        .include("nope.glsl", IncludeKind::Relative, "main.frag", 0)
        .unwrap_err();

    assert_eq!(
        "cannot find or open include file: nope.glsl",
        err.to_string()
    );
}

#[test]
fn unreadable_file_is_not_skipped() {
    let mut fs = StubFilesystem::with(&[("lib/x.glsl", "fallback")]);
    fs.denied.push("x.glsl".into());

    let mut sut = FileIncluder::with_filesystem(fs);
    sut.add_search_path("lib");

    assert!(matches!(
        sut.include("x.glsl", IncludeKind::Relative, "main", 0),
        Err(IncludeError::Io(path, _)) if path == Path::new("x.glsl")
    ));
    assert_eq!(0, sut.num_include_directives());
}

#[test]
fn null_includer_resolves_nothing() {
    let mut sut = NullIncluder;

    assert!(sut
        .include("a.glsl", IncludeKind::Relative, "main", 0)
        .is_err());
    assert_eq!(0, sut.num_include_directives());
}
