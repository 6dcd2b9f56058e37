// Tests for toolchain sessions
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
use crate::fs::NullIncluder;

/// Toolchain that records acquisition and release.
#[derive(Debug, Default)]
struct CountingToolchain {
    acquired: usize,
    released: usize,
    fail_acquire: bool,
}

impl Toolchain for CountingToolchain {
    type Unit = ();
    type Program = ();

    fn acquire(&mut self) -> Result<(), ToolchainError> {
        if self.fail_acquire {
            return Err(ToolchainError::Unavailable {
                tool: "counting",
                reason: "nope".into(),
            });
        }

        self.acquired += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released += 1;
    }

    fn parse(
        &mut self,
        _request: &ParseRequest,
        _includer: &mut dyn Includer,
    ) -> Result<Logged<()>, ToolchainError> {
        Ok(Logged::failed("ERROR: 0:1: 'x' : bad\n"))
    }

    fn link(&mut self, _unit: ()) -> Result<Logged<()>, ToolchainError> {
        Ok(Logged::ok((), ""))
    }

    fn generate(
        &mut self,
        _program: &(),
        _stage: Stage,
    ) -> Result<Vec<u32>, ToolchainError> {
        Ok(vec![])
    }
}

#[test]
fn session_releases_on_drop() {
    let mut toolchain = CountingToolchain::default();

    {
        let sut = ToolchainSession::acquire(&mut toolchain).unwrap();
        assert_eq!(1, sut.acquired);
        assert_eq!(0, sut.released);
    }

    assert_eq!(1, toolchain.released);
}

#[test]
fn session_releases_after_early_return() {
    fn fails(toolchain: &mut CountingToolchain) -> Result<(), String> {
        let preamble = Preamble::new(&Default::default());
        let mut sut = ToolchainSession::acquire(toolchain)
            .map_err(|e| e.to_string())?;

        let parsed = sut
            .parse(
                &ParseRequest {
                    tag: "t",
                    source: "",
                    preamble: &preamble,
                    stage: Stage::Vertex,
                    version: VersionProfile::default(),
                    force_version: false,
                    forward_compatible: false,
                    debug_info: false,
                },
                &mut NullIncluder,
            )
            .map_err(|e| e.to_string())?;

        parsed.output.ok_or(parsed.log)
    }

    let mut toolchain = CountingToolchain::default();

    assert_eq!(
        Err("ERROR: 0:1: 'x' : bad\n".to_string()),
        fails(&mut toolchain)
    );
    assert_eq!(1, toolchain.released);
}

#[test]
fn failed_acquisition_is_not_released() {
    let mut toolchain = CountingToolchain {
        fail_acquire: true,
        ..Default::default()
    };

    assert!(ToolchainSession::acquire(&mut toolchain).is_err());
    assert_eq!(0, toolchain.released);
}

#[test]
fn logged_ok_and_failed() {
    assert!(Logged::ok(1, "").is_ok());
    assert!(!Logged::<()>::failed("log").is_ok());
}

#[test]
fn unavailable_tool_describes_itself() {
    let sut = ToolchainError::Unavailable {
        tool: "spirv-dis",
        reason: "`spirv-dis` was not found on the PATH".into(),
    };

    assert_eq!(
        "spirv-dis is unavailable: `spirv-dis` was not found on the PATH",
        sut.to_string()
    );

    assert_eq!(
        vec![
            Message::new(
                Level::InternalError,
                "spirv-dis",
                None,
                "`spirv-dis` was not found on the PATH",
            ),
            Message::new(
                Level::Note,
                "spirv-dis",
                None,
                "the tool must be installed and on the PATH",
            ),
        ],
        sut.describe()
    );
}

#[test]
fn failed_tool_display() {
    assert_eq!(
        "glslangValidator exited with status 1: usage\n",
        ToolchainError::Failed {
            tool: "glslangValidator",
            status: Some(1),
            stderr: "usage\n".into(),
        }
        .to_string()
    );
}
