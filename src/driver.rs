// Compilation driver
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

//! Compilation of a single source unit.
//!
//! A [`Compiler`] sequences every other part of the system.
//! Each compilation moves through the following [`Phase`]s:
//!
//! ```text
//! Start -> Preprocessed -> StageResolved -> Parsed -> Linked
//!   -> CodeGenerated -> (Disassembled) -> Done
//! ```
//!
//! Preprocessing is performed only if it is needed:
//!   when the caller asked for preprocessed output,
//!   or when the stage was not provided by the caller and must be
//!     inferred from `#pragma shader_stage`.
//! If the stage still cannot be determined after scanning the
//!   preprocessed text,
//!     a fallback provided by the caller is consulted
//!     (for example,
//!       the command line infers the stage from the file extension).
//!
//! The toolchain parses the _original_ source,
//!   not the reconciled output of the preprocessor;
//!     preprocessing here exists only to discover the stage and to
//!     produce preprocessed output on request.
//!
//! Any failure aborts the compilation.
//! The resulting [`CompileFailure`] records the [`Phase`] that was last
//!   reached,
//!     along with every diagnostic produced up to that point.
//! Nothing is written to the output sink unless the compilation
//!   succeeds.

use crate::{
    diagnose::{
        filter_log, Diagnostic, Diagnostics, FilterConfig, Level, Message,
        Tally,
    },
    fs::Includer,
    global,
    pp::{PreprocessRequest, Preprocessor},
    preamble::{MacroDefinitions, Preamble},
    reconcile::{reconcile, ReconcileError},
    scan::{infer_stage, StageError},
    stage::Stage,
    toolchain::{
        Disassembler, Logged, ParseRequest, Toolchain, ToolchainError,
        ToolchainSession,
    },
    version::VersionProfile,
};
use std::{
    error::Error,
    fmt::{self, Display},
    io::{self, Write},
};

/// Kind of output produced by a successful compilation.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Mode {
    /// Binary words.
    #[default]
    Binary,

    /// Human-readable disassembly of the binary.
    Disassembly,

    /// Preprocessed source text;
    ///   no parsing or code generation takes place.
    PreprocessOnly,
}

/// Configuration shared by every compilation performed by a
///   [`Compiler`].
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct CompilerOptions {
    macros: MacroDefinitions,
    version: VersionProfile,
    force_version: bool,
    disassemble: bool,
    preprocess_only: bool,
    warnings_as_errors: bool,
    suppress_warnings: bool,
    generate_debug_info: bool,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a macro for every source unit.
    ///
    /// Redefining a macro replaces its previous definition.
    pub fn add_macro_definition<N: Into<String>, D: Into<String>>(
        &mut self,
        name: N,
        definition: D,
    ) -> &mut Self {
        self.macros.define(name, definition);
        self
    }

    /// Version and profile to assume for shaders that do not declare
    ///   their own.
    pub fn set_default_version_profile(
        &mut self,
        version: VersionProfile,
    ) -> &mut Self {
        self.version = version;
        self
    }

    /// Compile every shader with the given version and profile,
    ///   regardless of what it declares.
    pub fn set_forced_version_profile(
        &mut self,
        version: VersionProfile,
    ) -> &mut Self {
        self.version = version;
        self.force_version = true;
        self
    }

    /// Output disassembly rather than binary words.
    ///
    /// Preprocess-only mode takes precedence.
    pub fn set_disassembly_mode(&mut self) -> &mut Self {
        self.disassemble = true;
        self
    }

    pub fn set_preprocessing_only_mode(&mut self) -> &mut Self {
        self.preprocess_only = true;
        self
    }

    pub fn set_warnings_as_errors(&mut self) -> &mut Self {
        self.warnings_as_errors = true;
        self
    }

    pub fn set_suppress_warnings(&mut self) -> &mut Self {
        self.suppress_warnings = true;
        self
    }

    pub fn set_generate_debug_info(&mut self) -> &mut Self {
        self.generate_debug_info = true;
        self
    }

    pub fn macros(&self) -> &MacroDefinitions {
        &self.macros
    }

    pub fn version(&self) -> VersionProfile {
        self.version
    }

    pub fn is_version_forced(&self) -> bool {
        self.force_version
    }

    pub fn mode(&self) -> Mode {
        match (self.preprocess_only, self.disassemble) {
            (true, _) => Mode::PreprocessOnly,
            (false, true) => Mode::Disassembly,
            (false, false) => Mode::Binary,
        }
    }

    pub fn generates_debug_info(&self) -> bool {
        self.generate_debug_info
    }

    /// Filter configuration for toolchain logs.
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            warnings_as_errors: self.warnings_as_errors,
            suppress_warnings: self.suppress_warnings,
        }
    }

    /// Filter configuration for preprocessor logs.
    ///
    /// Warnings are always suppressed while preprocessing,
    ///   since the toolchain will report them again while parsing.
    fn preprocess_filter_config(&self) -> FilterConfig {
        FilterConfig {
            suppress_warnings: true,
            ..self.filter_config()
        }
    }
}

/// Progress of a compilation.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum Phase {
    Start,
    Preprocessed,
    StageResolved,
    Parsed,
    Linked,
    CodeGenerated,
    Disassembled,
    Done,
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Preprocessed => write!(f, "preprocessed"),
            Self::StageResolved => write!(f, "stage resolved"),
            Self::Parsed => write!(f, "parsed"),
            Self::Linked => write!(f, "linked"),
            Self::CodeGenerated => write!(f, "code generated"),
            Self::Disassembled => write!(f, "disassembled"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A shader to be compiled.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SourceUnit<'a> {
    /// Identifies the unit in diagnostics,
    ///   typically its file name.
    pub tag: &'a str,

    pub source: &'a str,
}

impl<'a> SourceUnit<'a> {
    pub fn new(tag: &'a str, source: &'a str) -> Self {
        Self { tag, source }
    }
}

/// Product of a successful compilation.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Output {
    Binary(Vec<u32>),
    Disassembly(String),
    Preprocessed(String),
}

impl Output {
    /// Write the output to `sink`.
    ///
    /// Binary words are written as raw bytes in native byte order;
    ///   text is written as UTF-8.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        match self {
            Self::Binary(words) => words
                .iter()
                .try_for_each(|word| sink.write_all(&word.to_ne_bytes())),
            Self::Disassembly(text) | Self::Preprocessed(text) => {
                sink.write_all(text.as_bytes())
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CompileOutcome {
    /// Stage that the unit was compiled as,
    ///   if it was compiled at all.
    pub stage: Option<Stage>,

    pub output: Output,

    /// Messages that did not prevent compilation,
    ///   such as warnings.
    pub diagnostics: Diagnostics,
}

impl CompileOutcome {
    pub fn tally(&self) -> Tally {
        self.diagnostics.tally()
    }
}

/// Bookkeeping of a compilation in progress.
#[derive(Debug)]
struct Progress<'a> {
    tag: &'a str,
    phase: Phase,
    diagnostics: Diagnostics,
}

impl<'a> Progress<'a> {
    fn new(tag: &'a str) -> Self {
        Self {
            tag,
            phase: Phase::Start,
            diagnostics: Diagnostics::new(),
        }
    }

    fn advance(&mut self, phase: Phase) {
        log::debug!("{}: {} -> {phase}", self.tag, self.phase);
        self.phase = phase;
    }

    /// Filter `log`,
    ///   retaining its messages,
    ///   and return whether it is free of errors.
    fn filter(&mut self, log: &str, config: FilterConfig) -> bool {
        let (ok, diagnostics) = filter_log(self.tag, config, log);
        self.diagnostics.extend([diagnostics]);
        ok
    }

    /// Output of a toolchain operation,
    ///   provided that both the operation and its log indicate success.
    fn accept<T>(
        &mut self,
        logged: Logged<T>,
        config: FilterConfig,
    ) -> Option<T> {
        let ok = self.filter(&logged.log, config);
        logged.output.filter(|_| ok)
    }

    fn abort(self, error: CompileError) -> CompileFailure {
        log::debug!("{}: aborted after {}: {error}", self.tag, self.phase);

        CompileFailure {
            tag: self.tag.to_string(),
            phase: self.phase,
            error,
            diagnostics: self.diagnostics,
        }
    }
}

/// Compiles source units using a [`Preprocessor`],
///   a [`Toolchain`],
///   and a [`Disassembler`].
///
/// A compiler holds no state between compilations other than its
///   configuration and its collaborators.
#[derive(Debug)]
pub struct Compiler<P, T, D> {
    options: CompilerOptions,
    preprocessor: P,
    toolchain: T,
    disassembler: D,
}

impl<P: Preprocessor, T: Toolchain, D: Disassembler> Compiler<P, T, D> {
    pub fn new(
        options: CompilerOptions,
        preprocessor: P,
        toolchain: T,
        disassembler: D,
    ) -> Self {
        Self {
            options,
            preprocessor,
            toolchain,
            disassembler,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CompilerOptions {
        &mut self.options
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn disassembler(&self) -> &D {
        &self.disassembler
    }

    /// Compile `unit`.
    ///
    /// If `stage` is [`None`],
    ///   the stage is inferred from `#pragma shader_stage`,
    ///     falling back to `fallback` if the source does not declare
    ///     one.
    /// `fallback` is given the tag of the unit.
    ///
    /// The includer is reset before preprocessing so that its count of
    ///   `#include` directives reflects this unit alone.
    pub fn compile<F>(
        &mut self,
        unit: SourceUnit,
        stage: Option<Stage>,
        fallback: F,
        includer: &mut dyn Includer,
    ) -> Result<CompileOutcome, CompileFailure>
    where
        F: FnOnce(&str) -> Option<Stage>,
    {
        let mut progress = Progress::new(unit.tag);

        match self.run(&mut progress, unit, stage, fallback, includer) {
            Ok((stage, output)) => {
                progress.advance(Phase::Done);

                Ok(CompileOutcome {
                    stage,
                    output,
                    diagnostics: progress.diagnostics,
                })
            }
            Err(e) => Err(progress.abort(e)),
        }
    }

    /// Compile `unit` as [`Self::compile`] and write its output to
    ///   `sink`.
    pub fn compile_to<F, W>(
        &mut self,
        unit: SourceUnit,
        stage: Option<Stage>,
        fallback: F,
        includer: &mut dyn Includer,
        sink: &mut W,
    ) -> Result<CompileOutcome, CompileFailure>
    where
        F: FnOnce(&str) -> Option<Stage>,
        W: Write,
    {
        let outcome = self.compile(unit, stage, fallback, includer)?;

        match outcome.output.write_to(sink) {
            Ok(()) => Ok(outcome),
            Err(e) => Err(CompileFailure {
                tag: unit.tag.to_string(),
                phase: Phase::Done,
                error: e.into(),
                diagnostics: outcome.diagnostics,
            }),
        }
    }

    fn run<F>(
        &mut self,
        progress: &mut Progress,
        unit: SourceUnit,
        forced_stage: Option<Stage>,
        fallback: F,
        includer: &mut dyn Includer,
    ) -> Result<(Option<Stage>, Output), CompileError>
    where
        F: FnOnce(&str) -> Option<Stage>,
    {
        let SourceUnit { tag, source } = unit;
        let options = &self.options;
        let preamble = Preamble::new(options.macros());
        let mut stage = forced_stage;

        includer.reset();

        if options.mode() == Mode::PreprocessOnly || stage.is_none() {
            let preprocessed = self.preprocessor.preprocess(
                &PreprocessRequest {
                    tag,
                    source,
                    preamble: &preamble,
                    version: options.version(),
                    force_version: options.is_version_forced(),
                },
                includer,
            );

            let log_ok = progress
                .filter(&preprocessed.log, options.preprocess_filter_config());

            if !(preprocessed.success && log_ok) {
                return Err(CompileError::Preprocess {
                    tag: tag.to_string(),
                });
            }

            let version = VersionProfile::effective(
                &preprocessed.text,
                options.version(),
                options.is_version_forced(),
            );
            let next_line = version.line_directive_is_for_next_line();

            log::debug!(
                "{tag}: effective version {version}; \
                   #line numbers the {} line",
                if next_line { "next" } else { "current" },
            );

            let reconciled = reconcile(
                &preprocessed.text,
                tag,
                global::INCLUDE_SUPPORT_DIRECTIVE,
                includer.num_include_directives(),
                next_line,
            )?;

            progress.advance(Phase::Preprocessed);

            if options.mode() == Mode::PreprocessOnly {
                return Ok((None, Output::Preprocessed(reconciled)));
            }

            stage = infer_stage(&reconciled, tag, next_line)?;
        }

        let stage = match stage {
            Some(stage) => stage,
            None => {
                log::debug!("{tag}: no #pragma shader_stage; using fallback");

                fallback(tag).ok_or_else(|| CompileError::UnresolvedStage {
                    tag: tag.to_string(),
                })?
            }
        };

        log::info!("{tag}: compiling as {stage} shader");
        progress.advance(Phase::StageResolved);

        let mut toolchain = ToolchainSession::acquire(&mut self.toolchain)?;

        let parsed = toolchain.parse(
            &ParseRequest {
                tag,
                source,
                preamble: &preamble,
                stage,
                version: options.version(),
                force_version: options.is_version_forced(),
                forward_compatible: false,
                debug_info: options.generates_debug_info(),
            },
            includer,
        )?;

        let parsed = progress
            .accept(parsed, options.filter_config())
            .ok_or_else(|| CompileError::Parse {
                tag: tag.to_string(),
            })?;

        progress.advance(Phase::Parsed);

        let linked = toolchain.link(parsed)?;
        let program = progress
            .accept(linked, options.filter_config())
            .ok_or_else(|| CompileError::Link {
                tag: tag.to_string(),
            })?;

        progress.advance(Phase::Linked);

        let words = toolchain.generate(&program, stage)?;
        progress.advance(Phase::CodeGenerated);

        if options.mode() == Mode::Disassembly {
            let text = self.disassembler.disassemble(&words)?;
            progress.advance(Phase::Disassembled);

            return Ok((Some(stage), Output::Disassembly(text)));
        }

        Ok((Some(stage), Output::Binary(words)))
    }
}

/// Reason for aborting a compilation.
///
/// Failures of the preprocessor,
///   parser,
///   and linker are described by the info logs of those tools,
///     which are retained in [`CompileFailure::diagnostics`].
#[derive(Debug)]
pub enum CompileError {
    Preprocess { tag: String },
    Reconcile(ReconcileError),
    Stage(StageError),

    /// Neither the source nor the fallback determined a stage.
    UnresolvedStage { tag: String },

    Parse { tag: String },
    Link { tag: String },
    Toolchain(ToolchainError),

    /// Error writing output.
    Io(io::Error),
}

impl From<ReconcileError> for CompileError {
    fn from(e: ReconcileError) -> Self {
        Self::Reconcile(e)
    }
}

impl From<StageError> for CompileError {
    fn from(e: StageError) -> Self {
        Self::Stage(e)
    }
}

impl From<ToolchainError> for CompileError {
    fn from(e: ToolchainError) -> Self {
        Self::Toolchain(e)
    }
}

impl From<io::Error> for CompileError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preprocess { tag } => write!(f, "failed to preprocess {tag}"),
            Self::Reconcile(e) => Display::fmt(e, f),
            Self::Stage(e) => Display::fmt(e, f),
            Self::UnresolvedStage { tag } => {
                write!(f, "unable to determine the shader stage of {tag}")
            }
            Self::Parse { tag } => write!(f, "failed to parse {tag}"),
            Self::Link { tag } => write!(f, "failed to link {tag}"),
            Self::Toolchain(e) => Display::fmt(e, f),
            Self::Io(e) => Display::fmt(e, f),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reconcile(e) => Some(e),
            Self::Stage(e) => Some(e),
            Self::Toolchain(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl Diagnostic for CompileError {
    fn describe(&self) -> Vec<Message> {
        match self {
            Self::Reconcile(e) => e.describe(),
            Self::Stage(e) => e.describe(),
            Self::Toolchain(e) => e.describe(),

            Self::UnresolvedStage { tag } => vec![
                Message::new(
                    Level::Error,
                    tag.as_str(),
                    None,
                    "unable to determine the shader stage",
                ),
                Message::new(
                    Level::Note,
                    tag.as_str(),
                    None,
                    "declare it with '#pragma shader_stage(<stage>)'",
                ),
            ],

            // Described by the info log of the failing tool.
            _ => vec![],
        }
    }
}

/// An aborted compilation.
#[derive(Debug)]
pub struct CompileFailure {
    pub tag: String,

    /// Last phase reached before the compilation was aborted.
    pub phase: Phase,

    pub error: CompileError,

    /// Every message produced before the compilation was aborted,
    ///   including those that caused it.
    pub diagnostics: Diagnostics,
}

impl CompileFailure {
    pub fn tally(&self) -> Tally {
        self.diagnostics.tally()
    }
}

impl Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.error, f)
    }
}

impl Error for CompileFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl Diagnostic for CompileFailure {
    fn describe(&self) -> Vec<Message> {
        let mut messages = self.diagnostics.messages().to_vec();
        messages.extend(self.error.describe());

        // A failure must always be reported as an error,
        //   even if the log of the failing tool contained none.
        if !messages.iter().any(Message::is_error) {
            messages.push(Message::new(
                Level::Error,
                self.tag.as_str(),
                None,
                self.error.to_string(),
            ));
        }

        messages
    }
}

assert_impl_all!(CompileError: Error, Send, Sync);
assert_impl_all!(CompileFailure: Error, Send, Sync);
