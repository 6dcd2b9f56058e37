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

//! This is the GLSL compiler.
//!
//! `glslfc` compiles each input shader into a SPIR-V binary,
//!   its disassembly (`-S`),
//!   or its preprocessed source (`-E`).
//! The stage of each shader is taken from `-fshader-stage`,
//!   from a `#pragma shader_stage` directive in the shader,
//!   or from its file extension,
//!     in that order.
//!
//! Log output is controlled by `RUST_LOG`;
//!   diagnostics for the shaders themselves are always written to
//!   standard error.

extern crate glslfront;

use getopts::{Fail, Options};
use glslfront::{
    diagnose::{Diagnostic, Reporter, TextReporter},
    driver::{
        CompileError, Compiler, CompilerOptions, Mode, Output, SourceUnit,
    },
    fs::FileIncluder,
    global,
    pp::GlslPreprocessor,
    stage::{Stage, UnknownStage},
    toolchain::{GlslangValidator, SpirvDis, ToolchainError},
    version::{InvalidVersionProfile, VersionProfile},
};
use std::{
    env,
    fmt::{self, Display},
    fs,
    io::{self, BufWriter, Read, Write},
    path::PathBuf,
};

type GlslCompiler = Compiler<GlslPreprocessor, GlslangValidator, SpirvDis>;

/// Types of commands
#[derive(Debug)]
enum Command {
    Compile(Invocation),
    Usage,
}

/// Everything needed to compile the requested inputs.
#[derive(Debug)]
struct Invocation {
    inputs: Vec<String>,
    output: Option<String>,
    stage: Option<Stage>,
    include_dirs: Vec<String>,
    options: CompilerOptions,
}

/// Where to write the output for `input`,
///   or [`None`] for standard output.
fn output_path(input: &str, invocation: &Invocation) -> Option<PathBuf> {
    let mode = invocation.options.mode();

    match (invocation.output.as_deref(), mode) {
        (Some("-"), _) => None,
        (Some(output), _) => Some(output.into()),
        (None, Mode::PreprocessOnly) => None,
        (None, _) if input == "-" => None,
        (None, Mode::Binary) => Some(format!("{input}.spv").into()),
        (None, Mode::Disassembly) => Some(format!("{input}.spvasm").into()),
    }
}

/// Read `input`,
///   returning its tag and its source.
fn read_input(input: &str) -> io::Result<(String, String)> {
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;

        return Ok((global::STDIN_TAG.to_string(), source));
    }

    Ok((input.to_string(), fs::read_to_string(input)?))
}

fn write_output(output: &Output, dest: Option<PathBuf>) -> io::Result<()> {
    match dest {
        Some(path) => {
            let mut fout = BufWriter::new(fs::File::create(path)?);
            output.write_to(&mut fout)?;
            fout.flush()
        }
        None => {
            let mut stdout = io::stdout().lock();
            output.write_to(&mut stdout)?;
            stdout.flush()
        }
    }
}

/// Render a report in full before writing it so that it cannot be
///   interleaved with the output of concurrent processes
///     (e.g. if the compiler is being invoked using `make -jN`).
fn report<R: Reporter, D: Diagnostic>(reporter: &mut R, diagnostic: &D) {
    let report = reporter.render(diagnostic).to_string();
    eprint!("{report}");
}

/// Exit code for an aborted compilation.
fn exit_code(error: &CompileError) -> exitcode::ExitCode {
    match error {
        CompileError::Toolchain(ToolchainError::Unavailable { .. }) => {
            exitcode::UNAVAILABLE
        }
        CompileError::Toolchain(ToolchainError::Io(..))
        | CompileError::Io(_) => exitcode::IOERR,
        _ => exitcode::DATAERR,
    }
}

/// Compile a single input,
///   writing its output to the destination determined by
///   [`output_path`].
///
/// Nothing is written if compilation fails.
fn compile<R: Reporter>(
    compiler: &mut GlslCompiler,
    includer: &mut FileIncluder,
    reporter: &mut R,
    input: &str,
    invocation: &Invocation,
) -> Result<(), exitcode::ExitCode> {
    let (tag, source) = read_input(input).map_err(|e| {
        eprintln!("{input}: error: {e}");
        exitcode::NOINPUT
    })?;

    let fallback = |_: &str| Stage::from_extension(input);

    let outcome = compiler
        .compile(
            SourceUnit::new(&tag, &source),
            invocation.stage,
            fallback,
            includer,
        )
        .map_err(|failure| {
            report(reporter, &failure);
            exit_code(&failure.error)
        })?;

    if !outcome.diagnostics.is_empty() {
        reporter.record(&outcome.diagnostics);
        eprint!("{}", outcome.diagnostics);
    }

    let dest = output_path(input, invocation);

    write_output(&outcome.output, dest).map_err(|e| {
        eprintln!("{tag}: error: unable to write output: {e}");
        exitcode::IOERR
    })
}

/// Compile every input,
///   continuing past failures so that all diagnostics are reported.
fn run(invocation: Invocation) -> exitcode::ExitCode {
    let mut toolchain = GlslangValidator::new();
    let mut includer: FileIncluder = FileIncluder::new();

    for dir in &invocation.include_dirs {
        toolchain.add_include_dir(dir);
        includer.add_search_path(dir);
    }

    let mut compiler = Compiler::new(
        invocation.options.clone(),
        GlslPreprocessor::new(),
        toolchain,
        SpirvDis::new(),
    );

    let mut reporter = TextReporter::new();

    let status = invocation.inputs.iter().fold(exitcode::OK, |status, input| {
        match compile(
            &mut compiler,
            &mut includer,
            &mut reporter,
            input,
            &invocation,
        ) {
            Ok(()) => status,
            Err(code) => code,
        }
    });

    let tally = reporter.tally();

    if !tally.is_empty() {
        eprintln!("{tally}");
    }

    status
}

/// Entrypoint for the compiler
pub fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage =
        opts.usage(&format!("Usage: {program} [OPTIONS] INPUT..."));

    match parse_options(opts, args) {
        Ok(Command::Compile(invocation)) => {
            std::process::exit(run(invocation));
        }
        Ok(Command::Usage) => {
            println!("{usage}");
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{e}");
            println!("{usage}");
            std::process::exit(exitcode::USAGE);
        }
    }
}

/// Get 'Options'
fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("o", "output", "set output file name", "FILE");
    opts.optflag("E", "", "output preprocessed source only");
    opts.optflag("S", "", "output disassembly rather than a binary");
    opts.optflag("c", "", "compile only (default)");
    opts.optmulti("D", "", "define a macro", "NAME[=VALUE]");
    opts.optmulti("I", "", "add directory to include search path", "DIR");
    opts.optmulti(
        "f",
        "",
        "set shader stage (-fshader-stage=STAGE)",
        "shader-stage=STAGE",
    );
    opts.optopt("", "shader-stage", "set shader stage", "STAGE");
    opts.optopt(
        "",
        "std",
        "force version and profile, such as 450core or 310es",
        "VERSIONPROFILE",
    );
    opts.optflag("w", "", "suppress all warnings");
    opts.optmulti("W", "", "treat warnings as errors (-Werror)", "error");
    opts.optflag("g", "", "generate debug information");
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Option parser
fn parse_options(
    opts: Options,
    args: Vec<String>,
) -> Result<Command, UsageError> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    if matches.free.is_empty() {
        return Err(Fail::OptionMissing(String::from("INPUT")).into());
    }

    let output = matches.opt_str("o");

    if matches.free.len() > 1 && output.as_deref().is_some_and(|o| o != "-")
    {
        return Err(UsageError::OutputWithMultipleInputs);
    }

    let mut options = CompilerOptions::new();

    for define in matches.opt_strs("D") {
        match define.split_once('=') {
            Some((name, value)) => options.add_macro_definition(name, value),
            None => options.add_macro_definition(define, ""),
        };
    }

    let stage = matches
        .opt_strs("f")
        .into_iter()
        .map(|feature| match feature.strip_prefix("shader-stage=") {
            Some(stage) => Ok(stage.to_string()),
            None => Err(UsageError::UnknownFeature(feature)),
        })
        .chain(matches.opt_str("shader-stage").map(Ok))
        .last()
        .transpose()?
        .map(|stage| stage.parse::<Stage>())
        .transpose()?;

    if let Some(std) = matches.opt_str("std") {
        options.set_forced_version_profile(std.parse::<VersionProfile>()?);
    }

    for warning in matches.opt_strs("W") {
        if warning != "error" {
            return Err(UsageError::UnknownWarning(warning));
        }

        options.set_warnings_as_errors();
    }

    if matches.opt_present("w") {
        options.set_suppress_warnings();
    }

    if matches.opt_present("g") {
        options.set_generate_debug_info();
    }

    if matches.opt_present("S") {
        options.set_disassembly_mode();
    }

    if matches.opt_present("E") {
        options.set_preprocessing_only_mode();
    }

    let include_dirs = matches.opt_strs("I");
    Ok(Command::Compile(Invocation {
        inputs: matches.free,
        output,
        stage,
        include_dirs,
        options,
    }))
}

/// Invalid command line.
#[derive(Debug, PartialEq)]
enum UsageError {
    Getopts(Fail),
    Stage(UnknownStage),
    Version(InvalidVersionProfile),
    UnknownFeature(String),
    UnknownWarning(String),
    OutputWithMultipleInputs,
}

impl From<Fail> for UsageError {
    fn from(e: Fail) -> Self {
        Self::Getopts(e)
    }
}

impl From<UnknownStage> for UsageError {
    fn from(e: UnknownStage) -> Self {
        Self::Stage(e)
    }
}

impl From<InvalidVersionProfile> for UsageError {
    fn from(e: InvalidVersionProfile) -> Self {
        Self::Version(e)
    }
}

impl Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Getopts(e) => Display::fmt(e, f),
            Self::Stage(e) => Display::fmt(e, f),
            Self::Version(e) => Display::fmt(e, f),
            Self::UnknownFeature(feature) => {
                write!(f, "unknown feature: -f{feature}")
            }
            Self::UnknownWarning(warning) => {
                write!(f, "unknown warning option: -W{warning}")
            }
            Self::OutputWithMultipleInputs => {
                write!(f, "cannot specify -o with multiple inputs")
            }
        }
    }
}

impl std::error::Error for UsageError {}
