// Macro definition and replacement
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

//! Macro table and replacement.
//!
//! Replacement follows the familiar C model:
//!
//!   - an object-like macro is replaced by its body;
//!   - a function-like macro is replaced only when its name is followed by
//!       a parenthesized argument list,
//!         in which case each parameter in the body is replaced by the
//!         fully replaced argument; and
//!   - the result is rescanned for further replacement together with
//!       the tokens that follow it,
//!         so that an object-like macro may expand into the name of a
//!         function-like macro invoked by what follows;
//!       the macro being replaced is disabled until its replacement has
//!       been rescanned so that self-reference terminates.
//!
//! Within a directive,
//!   the argument list of a function-like macro must be closed on the
//!   same logical line.
//! In ordinary text it may continue onto the following lines
//!   (see [`MacroTable::expand_open`]).
//! Token pasting (`##`) and stringification are not supported;
//!   GLSL has no use for the latter.

use super::lex::{self, Token, TokenKind};
use crate::text::LineNum;
use fxhash::FxHashMap;
use std::{collections::VecDeque, fmt::Display};

/// Names that are defined by the preprocessor itself and may be neither
///   defined nor undefined by the user.
const PREDEFINED: [&str; 4] =
    ["__LINE__", "__FILE__", "__VERSION__", "GL_ES"];

pub fn is_predefined(name: &str) -> bool {
    PREDEFINED.contains(&name)
}

/// A macro definition.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Macro {
    /// Parameter names of a function-like macro,
    ///   or [`None`] for an object-like macro.
    pub params: Option<Vec<String>>,

    /// Replacement list,
    ///   without leading or trailing whitespace.
    pub body: Vec<Token>,
}

impl Macro {
    pub fn object(body: Vec<Token>) -> Self {
        Self { params: None, body }
    }

    pub fn function(params: Vec<String>, body: Vec<Token>) -> Self {
        Self {
            params: Some(params),
            body,
        }
    }

    /// Whether two definitions are equivalent,
    ///   such that redefinition is benign.
    ///
    /// Whitespace within the body is significant only in its presence,
    ///   not its amount.
    fn is_equivalent(&self, other: &Self) -> bool {
        self.params == other.params
            && lex::canonical(&self.body) == lex::canonical(&other.body)
    }
}

/// Values of the dynamic predefined macros at the point of replacement.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Builtins {
    /// Logical line being replaced (`__LINE__`).
    pub line: LineNum,

    /// Source string number (`__FILE__`).
    pub file: usize,

    /// Effective language version (`__VERSION__`).
    pub version: u32,
}

impl Builtins {
    fn replace(&self, name: &str) -> Option<Token> {
        match name {
            "__LINE__" => Some(Token::number(self.line.to_string())),
            "__FILE__" => Some(Token::number(self.file.to_string())),
            "__VERSION__" => Some(Token::number(self.version.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MacroTable {
    macros: FxHashMap<String, Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a macro that the user cannot redefine or undefine.
    pub fn predefine(&mut self, name: &str, value: &str) {
        self.macros
            .insert(name.to_string(), Macro::object(lex::tokenize(value)));
    }

    /// Remove a definition made by [`Self::predefine`].
    pub fn withdraw(&mut self, name: &str) {
        self.macros.remove(name);
    }

    pub fn define(&mut self, name: &str, def: Macro) -> Result<(), MacroError> {
        if is_predefined(name) {
            return Err(MacroError::Predefined(name.to_string()));
        }

        if def.body.iter().any(|t| t.is_punct("##")) {
            return Err(MacroError::TokenPasting(name.to_string()));
        }

        match self.macros.get(name) {
            Some(existing) if !existing.is_equivalent(&def) => {
                Err(MacroError::Redefined(name.to_string()))
            }
            _ => {
                self.macros.insert(name.to_string(), def);
                Ok(())
            }
        }
    }

    /// Remove the definition of `name`,
    ///   if any.
    pub fn undefine(&mut self, name: &str) -> Result<(), MacroError> {
        if is_predefined(name) {
            return Err(MacroError::Predefined(name.to_string()));
        }

        self.macros.remove(name);
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
            || (is_predefined(name) && name != "GL_ES")
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    /// Replace each `defined NAME` and `defined(NAME)` in `tokens` with
    ///   `1` or `0`.
    ///
    /// This must take place before macro replacement,
    ///   otherwise `NAME` would itself be replaced.
    pub fn resolve_defined(
        &self,
        tokens: &[Token],
    ) -> Result<Vec<Token>, MacroError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut iter = tokens.iter();

        while let Some(token) = iter.next() {
            if !token.is_ident("defined") {
                out.push(token.clone());
                continue;
            }

            let mut next_solid = || iter.by_ref().find(|t| !t.is_space());

            let name = match next_solid() {
                Some(t) if t.kind == TokenKind::Ident => t,
                Some(t) if t.is_punct("(") => {
                    let name = next_solid()
                        .filter(|t| t.kind == TokenKind::Ident)
                        .ok_or(MacroError::BadDefined)?;

                    match next_solid() {
                        Some(t) if t.is_punct(")") => name,
                        _ => return Err(MacroError::BadDefined),
                    }
                }
                _ => return Err(MacroError::BadDefined),
            };

            let value = self.is_defined(&name.text) as u8;
            out.push(Token::number(value.to_string()));
        }

        Ok(out)
    }

    /// Perform macro replacement on `tokens`.
    ///
    /// The tokens are complete,
    ///   as those of a directive are;
    ///     an argument list that is not closed is an error.
    pub fn expand(
        &self,
        tokens: &[Token],
        builtins: &Builtins,
    ) -> Result<Vec<Token>, MacroError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut disabled = Vec::new();

        self.rescan(pending(tokens), builtins, &mut disabled, &mut out, false)?;

        Ok(out)
    }

    /// Perform macro replacement on a line of text that may be continued
    ///   by the lines that follow it.
    ///
    /// Outside of directives,
    ///   the argument list of a function-like macro may span lines.
    /// If `tokens` ends within an invocation,
    ///   or with the name of a function-like macro that may yet be
    ///   followed by its arguments,
    ///   [`None`] is returned and the caller should try again with the
    ///   next line appended.
    pub fn expand_open(
        &self,
        tokens: &[Token],
        builtins: &Builtins,
    ) -> Result<Option<Vec<Token>>, MacroError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut disabled = Vec::new();

        let complete = self.rescan(
            pending(tokens),
            builtins,
            &mut disabled,
            &mut out,
            true,
        )?;

        Ok(complete.then_some(out))
    }

    /// Replace macros in `input`,
    ///   splicing each replacement ahead of the remaining input so that
    ///   it is rescanned together with the tokens that follow it.
    ///
    /// Returns `false` if `open_ended` and `input` ran out before an
    ///   invocation could be completed.
    fn rescan(
        &self,
        mut input: VecDeque<Pending>,
        builtins: &Builtins,
        disabled: &mut Vec<String>,
        out: &mut Vec<Token>,
        open_ended: bool,
    ) -> Result<bool, MacroError> {
        while let Some(item) = input.pop_front() {
            let token = match item {
                Pending::Token(token) => token,
                Pending::Enable(name) => {
                    let at = disabled.iter().rposition(|n| *n == name);

                    if let Some(at) = at {
                        disabled.remove(at);
                    }
                    continue;
                }
            };

            if token.kind != TokenKind::Ident {
                out.push(token);
                continue;
            }

            if let Some(value) = builtins.replace(&token.text) {
                out.push(value);
                continue;
            }

            let def = match self.macros.get(&token.text) {
                Some(def) if !disabled.contains(&token.text) => def,
                _ => {
                    out.push(token);
                    continue;
                }
            };

            let (replacement, enables) = match &def.params {
                None => (def.body.clone(), Vec::new()),

                Some(params) => match take_args(&mut input) {
                    Invocation::Args { args, enables } => {
                        let arity_ok = args.len() == params.len()
                            || (params.is_empty()
                                && args.len() == 1
                                && args[0].is_empty());

                        if !arity_ok {
                            return Err(MacroError::Arity {
                                name: token.text,
                                expected: params.len(),
                                found: args.len(),
                            });
                        }

                        let expanded = args
                            .iter()
                            .map(|arg| {
                                let mut expanded = Vec::new();
                                self.rescan(
                                    pending(arg),
                                    builtins,
                                    disabled,
                                    &mut expanded,
                                    false,
                                )
                                .map(|_| expanded)
                            })
                            .collect::<Result<Vec<_>, _>>()?;

                        (substitute(&def.body, params, &expanded), enables)
                    }

                    // A function-like macro name without arguments is not
                    //   an invocation.
                    Invocation::NotInvoked => {
                        out.push(token);
                        continue;
                    }

                    Invocation::Incomplete { .. } if open_ended => {
                        return Ok(false);
                    }
                    Invocation::Incomplete { unterminated: true } => {
                        return Err(MacroError::Unterminated(token.text));
                    }
                    Invocation::Incomplete { unterminated: false } => {
                        out.push(token);
                        continue;
                    }
                },
            };

            // Macros whose replacements ended within the argument list
            //   stay disabled until this replacement has been rescanned.
            for name in enables.into_iter().rev() {
                input.push_front(Pending::Enable(name));
            }

            input.push_front(Pending::Enable(token.text.clone()));

            for token in replacement.into_iter().rev() {
                input.push_front(Pending::Token(token));
            }

            disabled.push(token.text);
        }

        Ok(true)
    }
}

/// Input awaiting rescan.
#[derive(Debug)]
enum Pending {
    Token(Token),

    /// End of the replacement of the named macro,
    ///   after which it may be replaced again.
    Enable(String),
}

fn pending(tokens: &[Token]) -> VecDeque<Pending> {
    tokens.iter().cloned().map(Pending::Token).collect()
}

/// Result of looking for the arguments of a function-like macro.
#[derive(Debug)]
enum Invocation {
    /// Trimmed arguments,
    ///   with the names of any macros re-enabled along the way.
    Args {
        args: Vec<Vec<Token>>,
        enables: Vec<String>,
    },

    /// The name is followed by something other than `(`.
    NotInvoked,

    /// The input ended before the invocation was decided
    ///   (`unterminated: false`)
    ///   or before its argument list was closed
    ///   (`unterminated: true`).
    Incomplete { unterminated: bool },
}

/// Take the parenthesized arguments of an invocation from the front of
///   `input`.
///
/// Nothing is consumed unless the next token is `(`.
fn take_args(input: &mut VecDeque<Pending>) -> Invocation {
    let open = input.iter().position(|item| match item {
        Pending::Token(token) => !token.is_space(),
        Pending::Enable(_) => false,
    });

    let open = match open {
        Some(at) => match &input[at] {
            Pending::Token(token) if token.is_punct("(") => at,
            _ => return Invocation::NotInvoked,
        },
        None => return Invocation::Incomplete { unterminated: false },
    };

    let mut enables = Vec::new();
    let mut args = Vec::new();
    let mut arg = Vec::new();
    let mut depth = 0usize;

    for item in input.drain(..=open) {
        if let Pending::Enable(name) = item {
            enables.push(name);
        }
    }

    while let Some(item) = input.pop_front() {
        let token = match item {
            Pending::Token(token) => token,
            Pending::Enable(name) => {
                enables.push(name);
                continue;
            }
        };

        match token.text.as_str() {
            "(" if token.kind == TokenKind::Punct => depth += 1,

            ")" if token.kind == TokenKind::Punct && depth > 0 => depth -= 1,

            ")" if token.kind == TokenKind::Punct => {
                args.push(lex::trim(&arg).to_vec());
                return Invocation::Args { args, enables };
            }

            "," if token.kind == TokenKind::Punct && depth == 0 => {
                args.push(lex::trim(&arg).to_vec());
                arg.clear();
                continue;
            }

            _ => (),
        }

        arg.push(token);
    }

    Invocation::Incomplete { unterminated: true }
}

/// Replace each parameter of `body` with its corresponding argument.
fn substitute(
    body: &[Token],
    params: &[String],
    args: &[Vec<Token>],
) -> Vec<Token> {
    body.iter()
        .flat_map(|token| {
            let arg = (token.kind == TokenKind::Ident)
                .then(|| params.iter().position(|p| *p == token.text))
                .flatten()
                .and_then(|at| args.get(at));

            match arg {
                Some(arg) => arg.clone(),
                None => vec![token.clone()],
            }
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum MacroError {
    /// Attempt to define or undefine a predefined name.
    Predefined(String),

    /// A macro was redefined with a different replacement list.
    Redefined(String),

    /// The definition uses `##`.
    TokenPasting(String),

    /// The argument list of an invocation is not closed before the end
    ///   of its input.
    Unterminated(String),

    /// An invocation has the wrong number of arguments.
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    /// `defined` is not followed by a macro name.
    BadDefined,
}

impl Display for MacroError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Predefined(name) => {
                write!(f, "predefined names can't be (un)defined: {name}")
            }
            Self::Redefined(name) => write!(
                f,
                "Macro redefined; different substitutions: {name}"
            ),
            Self::TokenPasting(name) => {
                write!(f, "token pasting is not supported: {name}")
            }
            Self::Unterminated(name) => {
                write!(f, "end of line in macro substitution: {name}")
            }
            Self::Arity {
                name,
                expected,
                found,
            } => write!(
                f,
                "wrong number of arguments in macro {name}: \
                   expected {expected}, found {found}"
            ),
            Self::BadDefined => {
                write!(f, "expected identifier after 'defined'")
            }
        }
    }
}

impl std::error::Error for MacroError {}
