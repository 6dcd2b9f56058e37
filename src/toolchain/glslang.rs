// Process-backed toolchain
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

//! Toolchain backed by the reference GLSL tools.
//!
//! [`GlslangValidator`] runs `glslangValidator` once to parse and
//!   validate a shader and a second time to link it and generate
//!   SPIR-V;
//!     [`SpirvDis`] runs `spirv-dis`.
//! Neither tool is linked into this crate;
//!   each is located on the `PATH` the first time it is needed,
//!     unless its location is provided by the environment variable
//!     [`global::GLSLANG_VALIDATOR_ENV`] or [`global::SPIRV_DIS_ENV`]
//!     respectively.
//!
//! Shaders are passed on standard input,
//!   and so `glslangValidator` resolves `#include`s itself using the
//!   include directories that were configured here,
//!     not the [`Includer`] provided to [`Toolchain::parse`].

use super::{Disassembler, Logged, ParseRequest, Toolchain, ToolchainError};
use crate::{fs::Includer, global, stage::Stage, text};
use std::{
    env,
    ffi::OsString,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{self, Command, Output, Stdio},
    sync::OnceLock,
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

const GLSLANG_VALIDATOR: &str = "glslangValidator";
const SPIRV_DIS: &str = "spirv-dis";

/// Header that `glslangValidator` emits in place of a file name when
///   reading from standard input.
const STDIN_HEADER: &str = "stdin";

/// Exit codes of `glslangValidator` that indicate a problem with the
///   shader rather than with the invocation.
const EXIT_COMPILE_FAILURE: i32 = 2;
const EXIT_LINK_FAILURE: i32 = 3;

/// An external executable located lazily on first use.
#[derive(Debug)]
struct Tool {
    name: &'static str,
    env: &'static str,
    path: OnceLock<Result<PathBuf, String>>,
}

impl Tool {
    const fn new(name: &'static str, env: &'static str) -> Self {
        Self {
            name,
            env,
            path: OnceLock::new(),
        }
    }

    fn path(&self) -> Result<&Path, ToolchainError> {
        self.path
            .get_or_init(|| locate(self.name, self.env))
            .as_deref()
            .map_err(|reason| ToolchainError::Unavailable {
                tool: self.name,
                reason: reason.clone(),
            })
    }

    /// Run the tool to completion,
    ///   feeding it `input` on standard input.
    ///
    /// Input is written on its own thread while output is collected,
    ///   so that neither side can block the other on a full pipe.
    fn run(
        &self,
        args: &[OsString],
        input: &[u8],
    ) -> Result<Output, ToolchainError> {
        log::debug!("running {} {args:?}", self.name);

        let mut child = Command::new(self.path()?)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolchainError::Unavailable {
                tool: self.name,
                reason: e.to_string(),
            })?;

        let stdin = child.stdin.take();

        thread::scope(|scope| {
            // Dropping the handle closes the pipe so that the tool sees EOF.
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(input),
                None => Ok(()),
            });

            let output = child
                .wait_with_output()
                .map_err(|e| ToolchainError::Io(self.name, e))?;

            match writer.join() {
                Ok(Ok(())) => Ok(output),

                // A tool that exits without reading all of its input has
                //   reported why in its output.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                    log::debug!("{} did not read all of its input", self.name);
                    Ok(output)
                }

                Ok(Err(e)) => Err(ToolchainError::Io(self.name, e)),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    }
}

/// Find `name` using the override in the environment variable `var`,
///   falling back to a search of the `PATH`.
fn locate(name: &str, var: &str) -> Result<PathBuf, String> {
    if let Some(path) = env::var_os(var).filter(|p| !p.is_empty()) {
        log::debug!("using {name} from ${var}: {path:?}");
        return Ok(path.into());
    }

    let exe = format!("{name}{}", env::consts::EXE_SUFFIX);
    let paths = env::var_os("PATH").unwrap_or_default();

    env::split_paths(&paths)
        .map(|dir| dir.join(&exe))
        .find(|candidate| candidate.is_file())
        .inspect(|path| log::debug!("found {name} at {path:?}"))
        .ok_or_else(|| format!("`{exe}` was not found on the PATH"))
}

/// Combined standard output and standard error of a tool,
///   which `glslangValidator` uses interchangeably for its info log.
fn combined_output(output: &Output) -> String {
    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    log
}

/// Remove the file name header that precedes the info log.
fn strip_header(log: &str) -> String {
    text::lines_inclusive(log)
        .filter(|line| text::strip_whitespace(line) != STDIN_HEADER)
        .collect()
}

/// Interpret bytes written by a code generator as native-endian words.
fn decode_words(bytes: &[u8]) -> Result<Vec<u32>, ToolchainError> {
    if bytes.len() % 4 != 0 {
        return Err(ToolchainError::CodeGen(format!(
            "output of {} bytes is not a whole number of words",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn encode_words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_ne_bytes()).collect()
}

/// A shader that `glslangValidator` has accepted.
///
/// Linking re-runs the same invocation with code generation enabled.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ValidatedUnit {
    args: Vec<OsString>,
    source: String,
}

/// Parser, linker, and code generator delegating to
///   `glslangValidator`.
#[derive(Debug)]
pub struct GlslangValidator {
    tool: Tool,
    include_dirs: Vec<PathBuf>,

    /// Directory holding generated binaries for the current session.
    scratch: Option<PathBuf>,
    outputs: usize,
}

impl Default for GlslangValidator {
    fn default() -> Self {
        Self {
            tool: Tool::new(GLSLANG_VALIDATOR, global::GLSLANG_VALIDATOR_ENV),
            include_dirs: Vec::new(),
            scratch: None,
            outputs: 0,
        }
    }
}

impl GlslangValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to be searched by `#include`.
    pub fn add_include_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.include_dirs.push(dir.into());
    }

    fn parse_args(&self, request: &ParseRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--stdin".into(),
            "-S".into(),
            request.stage.extension().into(),
            "--preamble-text".into(),
            request.preamble.as_str().into(),
        ];

        args.extend(self.include_dirs.iter().map(|dir| {
            let mut arg = OsString::from("-I");
            arg.push(dir);
            arg
        }));

        if request.debug_info {
            args.push("-g".into());
        }

        args
    }

    fn scratch_dir(&mut self) -> Result<PathBuf, ToolchainError> {
        if let Some(dir) = &self.scratch {
            return Ok(dir.clone());
        }

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or_default();

        let dir =
            env::temp_dir().join(format!("glslfc-{}-{nanos}", process::id()));

        fs::create_dir_all(&dir)
            .map_err(|e| ToolchainError::Io(GLSLANG_VALIDATOR, e))?;

        self.scratch = Some(dir.clone());
        Ok(dir)
    }
}

impl Toolchain for GlslangValidator {
    type Unit = ValidatedUnit;
    type Program = Vec<u32>;

    fn acquire(&mut self) -> Result<(), ToolchainError> {
        self.tool.path().map(|_| ())
    }

    fn release(&mut self) {
        if let Some(dir) = self.scratch.take() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                log::warn!("unable to remove {}: {e}", dir.display());
            }
        }
    }

    fn parse(
        &mut self,
        request: &ParseRequest,
        _includer: &mut dyn Includer,
    ) -> Result<Logged<ValidatedUnit>, ToolchainError> {
        if request.force_version {
            log::warn!(
                "{GLSLANG_VALIDATOR} cannot force a version; \
                   using the version declared by {}",
                request.tag,
            );
        }

        let args = self.parse_args(request);
        let output = self.tool.run(&args, request.source.as_bytes())?;
        let log = strip_header(&combined_output(&output));

        match output.status.code() {
            Some(0) => Ok(Logged::ok(
                ValidatedUnit {
                    args,
                    source: request.source.to_string(),
                },
                log,
            )),
            Some(EXIT_COMPILE_FAILURE) => Ok(Logged::failed(log)),
            status => Err(ToolchainError::Failed {
                tool: GLSLANG_VALIDATOR,
                status,
                stderr: log,
            }),
        }
    }

    fn link(
        &mut self,
        unit: ValidatedUnit,
    ) -> Result<Logged<Vec<u32>>, ToolchainError> {
        self.outputs += 1;
        let out = self.scratch_dir()?.join(format!("{}.spv", self.outputs));

        let mut args = unit.args;
        args.extend(["-V".into(), "-o".into(), out.clone().into()]);

        let output = self.tool.run(&args, unit.source.as_bytes())?;
        let log = strip_header(&combined_output(&output));

        match output.status.code() {
            Some(0) => {
                let bytes = fs::read(&out)
                    .map_err(|e| ToolchainError::Io(GLSLANG_VALIDATOR, e))?;

                Ok(Logged::ok(decode_words(&bytes)?, log))
            }
            Some(EXIT_COMPILE_FAILURE | EXIT_LINK_FAILURE) => {
                Ok(Logged::failed(log))
            }
            status => Err(ToolchainError::Failed {
                tool: GLSLANG_VALIDATOR,
                status,
                stderr: log,
            }),
        }
    }

    fn generate(
        &mut self,
        program: &Vec<u32>,
        stage: Stage,
    ) -> Result<Vec<u32>, ToolchainError> {
        if program.is_empty() {
            return Err(ToolchainError::CodeGen(format!(
                "no binary was produced for the {stage} stage"
            )));
        }

        Ok(program.clone())
    }
}

/// Disassembler delegating to `spirv-dis`.
#[derive(Debug)]
pub struct SpirvDis {
    tool: Tool,
}

impl Default for SpirvDis {
    fn default() -> Self {
        Self {
            tool: Tool::new(SPIRV_DIS, global::SPIRV_DIS_ENV),
        }
    }
}

impl SpirvDis {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Disassembler for SpirvDis {
    fn disassemble(&mut self, words: &[u32]) -> Result<String, ToolchainError> {
        // `spirv-dis` reads standard input when given `-`.
        let stdin = OsString::from("-");
        let output = self.tool.run(&[stdin], &encode_words(words))?;

        if !output.status.success() {
            return Err(ToolchainError::Disassembly(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ToolchainError::Disassembly(e.to_string()))
    }
}
