// GLSL preprocessor
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

//! GLSL preprocessing.
//!
//! The compiler driver is generic over any [`Preprocessor`];
//!   this module also provides [`GlslPreprocessor`],
//!   a self-contained implementation.
//!
//! Output Contract
//! ===============
//! The driver relies on the following properties of preprocessor output,
//!   which any implementation must uphold:
//!
//!   - The [`Preamble`] is preprocessed ahead of the source.
//!     Each `#define` within it produces an empty line,
//!       and the include-support directive that terminates it is emitted
//!       exactly as [`global::INCLUDE_SUPPORT_DIRECTIVE`].
//!   - Directives that are consumed produce an empty line,
//!       so that line numbers are retained.
//!   - `#version`,
//!       `#extension`,
//!       `#pragma`,
//!       and `#line` are emitted in canonical form:
//!         `#` immediately followed by the directive name,
//!         with runs of whitespace collapsed.
//!   - The contents of each resolved `#include` are surrounded by `#line`
//!       directives that re-anchor line numbering to the included file
//!       and then back to the includer.
//!
//! Diagnostics are written to an info log in the same format as that of
//!   the parser and linker,
//!     so that they can be filtered by [`crate::diagnose::filter_log`]:
//!
//! ```text
//! ERROR: shader.frag:12: '#error' : unsupported configuration
//! ERROR: 1 compilation errors.  No code generated.
//! ```

mod expr;
mod lex;
mod macros;

use crate::{
    fs::{IncludeKind, Includer},
    global,
    preamble::Preamble,
    text::{self, LineNum},
    version::{Profile, VersionProfile},
};
use lex::{Token, TokenKind};
use macros::{Builtins, Macro, MacroTable};
use std::fmt::Display;

/// Input to a [`Preprocessor`].
#[derive(Debug, Clone, Copy)]
pub struct PreprocessRequest<'a> {
    /// Name of the source unit for diagnostics and `#line` directives.
    pub tag: &'a str,

    pub source: &'a str,
    pub preamble: &'a Preamble,

    /// Version/profile to assume if the source declares none.
    ///
    /// A declaration takes effect at the first `#version` directive that
    ///   is actually processed,
    ///     which is also the first to appear in the output,
    ///   so a `#version` within a comment or an inactive group has no
    ///   effect.
    pub version: VersionProfile,

    /// Use [`Self::version`] even if the source declares otherwise.
    pub force_version: bool,
}

/// Result of preprocessing.
///
/// Preprocessing always produces text,
///   even on failure,
///   so that callers may inspect partial output.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Preprocessed {
    pub success: bool,
    pub text: String,

    /// Info log in glslang format.
    pub log: String,
}

/// Expands a source unit into preprocessed text.
///
/// See the [module-level documentation](self) for the contract that
///   implementations must uphold.
pub trait Preprocessor {
    fn preprocess(
        &mut self,
        request: &PreprocessRequest,
        includer: &mut dyn Includer,
    ) -> Preprocessed;
}

/// Built-in GLSL preprocessor.
#[derive(Debug, Default)]
pub struct GlslPreprocessor;

impl GlslPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for GlslPreprocessor {
    fn preprocess(
        &mut self,
        request: &PreprocessRequest,
        includer: &mut dyn Includer,
    ) -> Preprocessed {
        let mut run =
            Run::new(request.version, request.force_version, includer);

        // The preamble and source share a single macro namespace but
        //   are numbered independently.
        run.unit(request.tag, request.preamble.as_str(), 0, 0);
        run.unit(request.tag, request.source, 0, 0);

        run.finish()
    }
}

/// State of one `#if`/`#ifdef`/`#ifndef` group.
#[derive(Debug)]
struct Cond {
    /// Directive that opened the group.
    directive: &'static str,
    line: LineNum,

    /// Whether the enclosing group is active.
    parent_active: bool,

    /// Whether any branch of this group has been taken.
    taken: bool,

    /// Whether the current branch is active.
    active: bool,

    seen_else: bool,
}

/// Ordinary text ending within a macro invocation that continues onto
///   the lines that follow.
#[derive(Debug)]
struct Continued {
    tokens: Vec<Token>,

    /// Number of physical lines the text spans so far.
    lines: usize,

    /// Builtins of the first line.
    builtins: Builtins,
}

/// A source unit being preprocessed:
///   the preamble,
///   the source,
///   or an included file.
struct Unit<'n> {
    name: &'n str,
    depth: usize,
    file: usize,
    line: LineNum,
    conds: Vec<Cond>,

    /// Line number set by `#line` for the next line.
    renumber: Option<LineNum>,

    continued: Option<Continued>,
}

impl<'n> Unit<'n> {
    fn is_skipping(&self) -> bool {
        self.conds.last().is_some_and(|cond| !cond.active)
    }
}

/// State of a single preprocessing run.
struct Run<'i> {
    macros: MacroTable,
    includer: &'i mut dyn Includer,
    version: VersionProfile,
    force_version: bool,

    /// Whether a `#version` directive has been processed.
    version_declared: bool,

    next_line: bool,
    include_enabled: bool,
    files: usize,
    out: String,
    errors: Vec<String>,
}

impl<'i> Run<'i> {
    fn new(
        version: VersionProfile,
        force_version: bool,
        includer: &'i mut dyn Includer,
    ) -> Self {
        let mut run = Self {
            macros: MacroTable::new(),
            includer,
            version,
            force_version,
            version_declared: false,
            next_line: false,
            include_enabled: false,
            files: 0,
            out: String::new(),
            errors: Vec::new(),
        };

        run.set_version(version);
        run
    }

    /// Adopt `version` for the remainder of the run.
    fn set_version(&mut self, version: VersionProfile) {
        self.version = version;
        self.next_line = version.line_directive_is_for_next_line();

        if version.profile == Profile::Es || version.version == 100 {
            self.macros.predefine("GL_ES", "1");
        } else {
            self.macros.withdraw("GL_ES");
        }
    }

    fn finish(self) -> Preprocessed {
        let mut log = self.errors.concat();

        if !self.errors.is_empty() {
            log.push_str(&format!(
                "ERROR: {} compilation errors.  No code generated.\n",
                self.errors.len()
            ));
        }

        Preprocessed {
            success: self.errors.is_empty(),
            text: self.out,
            log,
        }
    }

    fn error<S: Display>(&mut self, unit: &Unit, directive: &str, msg: S) {
        self.errors.push(format!(
            "ERROR: {}:{}: '{directive}' : {msg}\n",
            unit.name, unit.line,
        ));
    }

    fn builtins(&self, unit: &Unit) -> Builtins {
        Builtins {
            line: unit.line,
            file: unit.file,
            version: self.version.version,
        }
    }

    fn unit(&mut self, name: &str, source: &str, depth: usize, file: usize) {
        let cleaned = lex::clean(source);

        let mut unit = Unit {
            name,
            depth,
            file,
            line: 1,
            conds: Vec::new(),
            renumber: None,
            continued: None,
        };

        for line in text::lines(&cleaned) {
            self.line(&mut unit, line);

            unit.line = match unit.renumber.take() {
                Some(line) => line,
                None => unit.line.saturating_add(1),
            };
        }

        self.flush_continued(&mut unit);

        if let Some(cond) = unit.conds.last() {
            let (directive, line) = (cond.directive, cond.line);
            unit.line = line;

            self.error(&unit, directive, "missing #endif");
        }
    }

    fn line(&mut self, unit: &mut Unit, line: &str) {
        let tokens = lex::tokenize(line);
        let solid = lex::trim(&tokens);

        match solid.split_first() {
            Some((hash, rest)) if hash.is_punct("#") => {
                self.flush_continued(unit);

                let rest = lex::trim(rest);

                match rest.split_first() {
                    None => self.out.push('\n'),
                    Some((name, args)) => {
                        self.directive(unit, name, lex::trim(args))
                    }
                }
            }

            _ if unit.is_skipping() => self.out.push('\n'),

            _ => self.text(unit, tokens),
        }
    }

    /// Replace macros in a line of ordinary text.
    ///
    /// A function-like macro invocation may span lines,
    ///   in which case the text is held until the invocation is closed
    ///   and is then emitted on its first line,
    ///     followed by an empty line for each additional line consumed.
    fn text(&mut self, unit: &mut Unit, tokens: Vec<Token>) {
        let continued = match unit.continued.take() {
            Some(mut continued) => {
                continued.tokens.push(Token::new(TokenKind::Space, " "));
                continued.tokens.extend(tokens);
                continued.lines += 1;
                continued
            }
            None => Continued {
                tokens,
                lines: 1,
                builtins: self.builtins(unit),
            },
        };

        match self.macros.expand_open(&continued.tokens, &continued.builtins) {
            Ok(Some(expanded)) => self.emit_text(&expanded, continued.lines),
            Ok(None) => unit.continued = Some(continued),
            Err(e) => {
                self.error(unit, "macro expansion", e);
                self.emit_text(&continued.tokens, continued.lines);
            }
        }
    }

    /// Emit held text now that no further lines may continue it.
    fn flush_continued(&mut self, unit: &mut Unit) {
        let continued = match unit.continued.take() {
            Some(continued) => continued,
            None => return,
        };

        match self.macros.expand(&continued.tokens, &continued.builtins) {
            Ok(expanded) => self.emit_text(&expanded, continued.lines),
            Err(e) => {
                self.error(unit, "macro expansion", e);
                self.emit_text(&continued.tokens, continued.lines);
            }
        }
    }

    fn emit_text(&mut self, tokens: &[Token], lines: usize) {
        self.out.push_str(&lex::join(tokens));
        self.out.extend(std::iter::repeat('\n').take(lines));
    }

    fn directive(&mut self, unit: &mut Unit, name: &Token, args: &[Token]) {
        #[cfg(feature = "pp-trace")]
        log::trace!(
            "{}:{}: #{} {}{}",
            unit.name,
            unit.line,
            name,
            lex::canonical(args),
            if unit.is_skipping() { " (skipped)" } else { "" },
        );

        let name = name.text.as_str();

        match name {
            "if" | "ifdef" | "ifndef" => self.open_cond(unit, name, args),
            "elif" => self.elif(unit, args),
            "else" => self.else_(unit),
            "endif" => self.endif(unit),

            _ if unit.is_skipping() => self.out.push('\n'),

            "define" => self.define(unit, args),
            "undef" => self.undef(unit, args),
            "error" => {
                self.error(unit, "#error", lex::canonical(args));
                self.out.push('\n');
            }
            "version" => self.version(unit, args),
            "extension" => self.extension(unit, args),
            "pragma" => self.passthrough("#pragma", args),
            "line" => self.line_directive(unit, args),
            "include" => self.include(unit, args),

            _ => {
                self.error(unit, &format!("#{name}"), "invalid directive");
                self.out.push('\n');
            }
        }
    }

    /// Emit `directive` followed by its canonical arguments.
    fn passthrough(&mut self, directive: &str, args: &[Token]) {
        self.out.push_str(directive);

        if !args.is_empty() {
            self.out.push(' ');
            self.out.push_str(&lex::canonical(args));
        }

        self.out.push('\n');
    }

    /// Evaluate the condition of an `#if` or `#elif`.
    ///
    /// Errors are reported and the condition is considered false.
    fn eval_cond(
        &mut self,
        unit: &Unit,
        directive: &str,
        args: &[Token],
    ) -> bool {
        let builtins = self.builtins(unit);

        let value = self
            .macros
            .resolve_defined(args)
            .and_then(|resolved| self.macros.expand(&resolved, &builtins))
            .map_err(|e| e.to_string())
            .and_then(|expanded| {
                expr::evaluate(&expanded).map_err(|e| e.to_string())
            });

        match value {
            Ok(value) => value != 0,
            Err(msg) => {
                self.error(unit, directive, msg);
                false
            }
        }
    }

    /// Name of the macro that must follow `directive`.
    fn macro_name<'t>(
        &mut self,
        unit: &Unit,
        directive: &str,
        args: &'t [Token],
    ) -> Option<&'t Token> {
        match args.first() {
            Some(name) if name.kind == TokenKind::Ident => Some(name),
            _ => {
                self.error(unit, directive, "must be followed by macro name");
                None
            }
        }
    }

    fn open_cond(&mut self, unit: &mut Unit, name: &str, args: &[Token]) {
        let (directive, parent_active) = match name {
            "ifdef" => ("#ifdef", !unit.is_skipping()),
            "ifndef" => ("#ifndef", !unit.is_skipping()),
            _ => ("#if", !unit.is_skipping()),
        };

        let active = parent_active
            && match directive {
                "#if" => self.eval_cond(unit, directive, args),
                _ => {
                    let defined = self
                        .macro_name(unit, directive, args)
                        .is_some_and(|name| self.macros.is_defined(&name.text));

                    defined == (directive == "#ifdef")
                }
            };

        unit.conds.push(Cond {
            directive,
            line: unit.line,
            parent_active,
            taken: active,
            active,
            seen_else: false,
        });

        self.out.push('\n');
    }

    fn elif(&mut self, unit: &mut Unit, args: &[Token]) {
        self.out.push('\n');

        let (evaluate, seen_else) = match unit.conds.last() {
            Some(cond) => (cond.parent_active && !cond.taken, cond.seen_else),
            None => return self.error(unit, "#elif", "#elif without #if"),
        };

        if seen_else {
            self.error(unit, "#elif", "#elif after #else");
        }

        let active = evaluate && self.eval_cond(unit, "#elif", args);

        if let Some(cond) = unit.conds.last_mut() {
            cond.active = active;
            cond.taken |= active;
        }
    }

    fn else_(&mut self, unit: &mut Unit) {
        self.out.push('\n');

        let seen_else = match unit.conds.last_mut() {
            Some(cond) => {
                cond.active = cond.parent_active && !cond.taken;
                cond.taken = true;

                std::mem::replace(&mut cond.seen_else, true)
            }
            None => return self.error(unit, "#else", "#else without #if"),
        };

        if seen_else {
            self.error(unit, "#else", "#else after #else");
        }
    }

    fn endif(&mut self, unit: &mut Unit) {
        self.out.push('\n');

        if unit.conds.pop().is_none() {
            self.error(unit, "#endif", "#endif without #if");
        }
    }

    fn define(&mut self, unit: &Unit, args: &[Token]) {
        self.out.push('\n');

        let name = match self.macro_name(unit, "#define", args) {
            Some(name) => name.text.clone(),
            None => return,
        };

        let rest = &args[1..];

        // A parameter list must immediately follow the name;
        //   `#define F (x)` is an object-like macro.
        let def = match rest.first() {
            Some(open) if open.is_punct("(") => {
                match parse_params(&rest[1..]) {
                    Some((params, body)) => {
                        Macro::function(params, lex::trim(body).to_vec())
                    }
                    None => {
                        return self.error(
                            unit,
                            "#define",
                            format!("bad macro parameter list: {name}"),
                        );
                    }
                }
            }
            _ => Macro::object(lex::trim(rest).to_vec()),
        };

        if let Err(e) = self.macros.define(&name, def) {
            self.error(unit, "#define", e);
        }
    }

    fn undef(&mut self, unit: &Unit, args: &[Token]) {
        self.out.push('\n');

        if let Some(name) = self.macro_name(unit, "#undef", args) {
            if let Err(e) = self.macros.undefine(&name.text) {
                self.error(unit, "#undef", e);
            }
        }
    }

    fn version(&mut self, unit: &Unit, args: &[Token]) {
        match args.first() {
            Some(number) if number.kind == TokenKind::Number => {
                self.passthrough(global::VERSION_DIRECTIVE, args);

                if !std::mem::replace(&mut self.version_declared, true) {
                    self.declare_version(args);
                }
            }
            _ => {
                self.error(unit, "#version", "bad version number");
                self.out.push('\n');
            }
        }
    }

    /// Adopt the version/profile of the first `#version` directive,
    ///   read the same way as [`VersionProfile::from_source`] reads it
    ///   from the output,
    ///     unless the version is forced.
    fn declare_version(&mut self, args: &[Token]) {
        let directive =
            format!("{} {}", global::VERSION_DIRECTIVE, lex::canonical(args));

        match VersionProfile::from_source(&directive) {
            _ if self.force_version => (),
            declared if declared.is_undeclared() => (),
            declared => self.set_version(declared),
        }
    }

    /// `#extension NAME : BEHAVIOR`
    fn extension(&mut self, unit: &Unit, args: &[Token]) {
        let solid = args.iter().filter(|t| !t.is_space()).collect::<Vec<_>>();

        let msg = match solid.as_slice() {
            [name, colon, behavior]
                if name.kind == TokenKind::Ident
                    && colon.is_punct(":")
                    && behavior.kind == TokenKind::Ident =>
            {
                match behavior.text.as_str() {
                    "require" | "enable" | "warn" | "disable" => {
                        if name.text == global::INCLUDE_EXTENSION {
                            self.include_enabled = behavior.text != "disable";
                        }

                        self.out.push_str(&format!(
                            "#extension {} : {}\n",
                            name.text, behavior.text
                        ));

                        return;
                    }
                    other => format!("behavior not supported: {other}"),
                }
            }
            [name, ..] if name.kind != TokenKind::Ident => {
                "extension name expected".to_string()
            }
            [] => "extension name expected".to_string(),
            [_] | [_, _] => "behavior expected".to_string(),
            _ => "extra tokens after extension behavior".to_string(),
        };

        self.error(unit, "#extension", msg);
        self.out.push('\n');
    }

    /// `#line N [FILE]`
    ///
    /// Unlike the other passthrough directives,
    ///   `#line` is subject to macro replacement.
    fn line_directive(&mut self, unit: &mut Unit, args: &[Token]) {
        let builtins = self.builtins(unit);

        let expanded = match self.macros.expand(args, &builtins) {
            Ok(expanded) => expanded,
            Err(e) => {
                self.error(unit, "#line", e);
                self.out.push('\n');
                return;
            }
        };

        match expanded.first() {
            Some(number) if number.kind == TokenKind::Number => {
                let line = text::parse_leading_int(&number.text);

                unit.renumber =
                    Some(line.saturating_add((!self.next_line) as LineNum));

                self.passthrough(global::LINE_DIRECTIVE, &expanded);
            }
            _ => {
                self.error(
                    unit,
                    "#line",
                    "must be followed by an integral literal",
                );
                self.out.push('\n');
            }
        }
    }

    /// `#include "file"` or `#include <file>`
    fn include(&mut self, unit: &Unit, args: &[Token]) {
        match self.include_target(unit, args) {
            Some((requested, kind)) => self.include_file(unit, requested, kind),
            None => self.out.push('\n'),
        }
    }

    fn include_target(
        &mut self,
        unit: &Unit,
        args: &[Token],
    ) -> Option<(String, IncludeKind)> {
        if !self.include_enabled {
            self.error(
                unit,
                "#include",
                format!(
                    "required extension not requested: {}",
                    global::INCLUDE_EXTENSION
                ),
            );
            return None;
        }

        let target = match args.split_first() {
            Some((path, _)) if path.kind == TokenKind::Str => path
                .text
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .map(|s| (s.to_string(), IncludeKind::Relative)),

            Some((open, rest)) if open.is_punct("<") => {
                rest.iter().position(|t| t.is_punct(">")).map(|close| {
                    (lex::join(&rest[..close]), IncludeKind::Standard)
                })
            }

            _ => None,
        };

        match target {
            Some((path, _)) if path.is_empty() => {
                self.error(unit, "#include", "empty include file name");
                None
            }
            Some(target) => Some(target),
            None => {
                self.error(unit, "#include", "expected include file name");
                None
            }
        }
    }

    fn include_file(
        &mut self,
        unit: &Unit,
        requested: String,
        kind: IncludeKind,
    ) {
        let depth = unit.depth + 1;

        if depth > global::MAX_INCLUDE_DEPTH {
            self.error(unit, "#include", "maximum include depth exceeded");
            self.out.push('\n');
            return;
        }

        let included =
            match self.includer.include(&requested, kind, unit.name, depth) {
                Ok(included) => included,
                Err(e) => {
                    self.error(unit, "#include", e);
                    self.out.push('\n');
                    return;
                }
            };

        self.files += 1;
        let file = self.files;

        // Number the first line of the included file 1.
        self.out.push_str(&format!(
            "{} {} \"{}\"\n",
            global::LINE_DIRECTIVE,
            self.next_line as u8,
            included.name,
        ));

        self.unit(&included.name, &included.content, depth, file);

        // Resume numbering at the line following the `#include`.
        self.out.push_str(&format!(
            "{} {} \"{}\"\n",
            global::LINE_DIRECTIVE,
            unit.line.saturating_add(self.next_line as LineNum),
            unit.name,
        ));
    }
}

/// Parse a macro parameter list following its opening parenthesis,
///   returning the parameter names and the remaining tokens.
fn parse_params(tokens: &[Token]) -> Option<(Vec<String>, &[Token])> {
    let mut params = Vec::new();
    let mut rest = lex::trim(tokens);

    if let Some((close, body)) = rest.split_first() {
        if close.is_punct(")") {
            return Some((params, body));
        }
    }

    loop {
        let (name, after) = rest.split_first()?;

        if name.kind != TokenKind::Ident || params.contains(&name.text) {
            return None;
        }

        params.push(name.text.clone());

        let after = lex::trim(after);
        let (sep, after) = after.split_first()?;

        match sep.text.as_str() {
            ")" => return Some((params, after)),
            "," => rest = lex::trim(after),
            _ => return None,
        }
    }
}

#[cfg(test)]
mod test;
