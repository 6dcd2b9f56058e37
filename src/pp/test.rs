// Tests for the GLSL preprocessor
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
use crate::{
    diagnose::{filter_log, FilterConfig},
    fs::{IncludeError, IncludedSource, NullIncluder},
    preamble::MacroDefinitions,
};
use fxhash::FxHashMap;

const EXT: &str = global::INCLUDE_SUPPORT_DIRECTIVE;

/// Includer serving files from memory by exact name.
#[derive(Debug, Default)]
struct MapIncluder {
    files: FxHashMap<&'static str, &'static str>,
    count: usize,
}

impl MapIncluder {
    fn with(files: &[(&'static str, &'static str)]) -> Self {
        Self {
            files: files.iter().copied().collect(),
            count: 0,
        }
    }
}

impl Includer for MapIncluder {
    fn include(
        &mut self,
        requested: &str,
        _kind: IncludeKind,
        requesting: &str,
        _depth: usize,
    ) -> Result<IncludedSource, IncludeError> {
        match self.files.get(requested) {
            Some(content) => {
                self.count += 1;

                Ok(IncludedSource {
                    name: requested.to_string(),
                    content: content.to_string(),
                })
            }
            None => Err(IncludeError::NotFound {
                requested: requested.to_string(),
                requesting: requesting.to_string(),
            }),
        }
    }

    fn num_include_directives(&self) -> usize {
        self.count
    }

    fn reset(&mut self) {
        self.count = 0;
    }
}

fn request<'a>(
    tag: &'a str,
    source: &'a str,
    preamble: &'a Preamble,
) -> PreprocessRequest<'a> {
    PreprocessRequest {
        tag,
        source,
        preamble,
        version: VersionProfile::default(),
        force_version: false,
    }
}

fn run_with(source: &str, includer: &mut dyn Includer) -> Preprocessed {
    let preamble = Preamble::new(&MacroDefinitions::new());

    GlslPreprocessor::new()
        .preprocess(&request("t", source, &preamble), includer)
}

fn run(source: &str) -> Preprocessed {
    run_with(source, &mut NullIncluder)
}

/// Output following the preamble's include-support directive.
fn body(sut: &Preprocessed) -> &str {
    sut.text.strip_prefix(EXT).unwrap_or(&sut.text)
}

#[test]
fn preamble_defines_become_blank_lines() {
    let macros = [("B", "2"), ("A", "1")]
        .into_iter()
        .collect::<MacroDefinitions>();
    let preamble = Preamble::new(&macros);
    let source = "#version 450\nint x = A + B;\n";

    let sut = GlslPreprocessor::new().preprocess(
        &request("t", source, &preamble),
        &mut NullIncluder,
    );

    assert_eq!(
        Preprocessed {
            success: true,
            text: format!("\n\n{EXT}#version 450\nint x = 1 + 2;\n"),
            log: String::new(),
        },
        sut
    );
}

#[test]
fn conditionals_blank_out_inactive_lines() {
    let sut = run("#define FOO\n\
                   #ifdef FOO\n\
                   a\n\
                   #else\n\
                   b\n\
                   #endif\n\
                   #if defined(BAR) || 0\n\
                   c\n\
                   #elif 2 > 1\n\
                   d\n\
                   #else\n\
                   e\n\
                   #endif\n");

    assert!(sut.success, "{}", sut.log);
    assert_eq!("\n\na\n\n\n\n\n\n\nd\n\n\n\n", body(&sut));
}

#[test]
fn nested_conditionals_in_inactive_group_are_not_evaluated() {
    let sut = run("#if 0\n\
                   #if 1 / 0\n\
                   x\n\
                   #endif\n\
                   #endif\n\
                   y\n");

    assert!(sut.success, "{}", sut.log);
    assert_eq!("\n\n\n\n\ny\n", body(&sut));
}

#[test]
fn ifndef_and_undef() {
    let sut = run("#define A\n\
                   #undef A\n\
                   #ifndef A\n\
                   yes\n\
                   #endif\n");

    assert_eq!("\n\n\nyes\n\n", body(&sut));
}

#[test]
fn line_macro_counts_physical_lines() {
    assert_eq!("a\n\n3\n", body(&run("a\n\n__LINE__\n")));
}

#[test]
fn line_directive_numbers_next_line_at_330() {
    let sut = run("#version 450\n#line 10\n__LINE__\n");

    assert_eq!("#version 450\n#line 10\n10\n", body(&sut));
}

#[test]
fn line_directive_numbers_own_line_before_330() {
    let sut = run("#line 10\n__LINE__\n");

    assert_eq!("#line 10\n11\n", body(&sut));
}

#[test]
fn version_macro_and_gl_es() {
    let sut = run("#version 310 es\n\
                   #ifdef GL_ES\n\
                   __VERSION__\n\
                   #endif\n");

    assert_eq!("#version 310 es\n\n310\n\n", body(&sut));

    let sut = run("#version 450\n#ifdef GL_ES\nes\n#endif\n");
    assert_eq!("#version 450\n\n\n\n", body(&sut));
}

#[test]
fn version_in_comment_is_not_a_declaration() {
    let mut includer = MapIncluder::with(&[("inc.glsl", "int x;\n")]);
    let sut = run_with(
        "// needs #version 450\n\
         #version 150\n\
         #include \"inc.glsl\"\n\
         __VERSION__\n",
        &mut includer,
    );

    assert!(sut.success, "{}", sut.log);
    assert_eq!(
        " \n\
         #version 150\n\
         #line 0 \"inc.glsl\"\n\
         int x;\n\
         #line 3 \"t\"\n\
         150\n",
        body(&sut)
    );
}

#[test]
fn first_version_directive_governs() {
    let sut = run("#version 310 es\n#version 450\n#ifdef GL_ES\nes\n#endif\n");

    assert!(body(&sut).ends_with("\nes\n\n"), "{}", sut.text);
}

#[test]
fn declared_version_withdraws_configured_gl_es() {
    let preamble = Preamble::new(&MacroDefinitions::new());
    let source = "#version 450\n#ifdef GL_ES\nes\n#endif\n";

    let sut = GlslPreprocessor::new().preprocess(
        &PreprocessRequest {
            version: VersionProfile::new(310, Profile::Es),
            ..request("t", source, &preamble)
        },
        &mut NullIncluder,
    );

    assert_eq!("#version 450\n\n\n\n", body(&sut));
}

#[test]
fn forced_version_overrides_declaration() {
    let preamble = Preamble::new(&MacroDefinitions::new());
    let source = "#version 450\n__VERSION__\n";

    let sut = GlslPreprocessor::new().preprocess(
        &PreprocessRequest {
            version: VersionProfile::new(310, Profile::Es),
            force_version: true,
            ..request("t", source, &preamble)
        },
        &mut NullIncluder,
    );

    assert_eq!("#version 450\n310\n", body(&sut));
}

#[test]
fn directives_are_canonicalized() {
    let sut = run("#  pragma   shader_stage( vertex )\n\
                   # extension GL_EXT_foo:enable\n\
                   #version   450   core\n");

    assert_eq!(
        "#pragma shader_stage( vertex )\n\
         #extension GL_EXT_foo : enable\n\
         #version 450 core\n",
        body(&sut)
    );
}

#[test]
fn comments_and_continuations_keep_line_count() {
    let sut = run("#define X 1 \\\n + 1\nint a = X; // c\n/* a\n */ b\n");

    assert_eq!("\n\nint a = 1  + 1;  \n \n b\n", body(&sut));
}

#[test]
fn function_like_macros() {
    let sut = run("#define MAX(a, b) ((a) > (b) ? (a) : (b))\n\
                   #define ID (x)\n\
                   float m = MAX(1.0, 2.0); ID\n");

    assert_eq!(
        "\n\nfloat m = ((1.0) > (2.0) ? (1.0) : (2.0)); (x)\n",
        body(&sut)
    );
}

#[test]
fn function_like_invocation_spans_lines() {
    let sut = run("#define ADD(a, b) ((a) + (b))\n\
                   float x = ADD(1.0,\n    \
                   2.0) +\n\
                   ADD(3.0, 4.0);\n\
                   __LINE__\n");

    assert!(sut.success, "{}", sut.log);
    assert_eq!(
        "\nfloat x = ((1.0) + (2.0)) +\n\n((3.0) + (4.0));\n5\n",
        body(&sut)
    );
}

#[test]
fn function_like_name_at_end_of_line_may_be_invoked_on_next() {
    let sut = run("#define F(a) [a]\nx = F\n(1);\ny = F;\n");

    assert!(sut.success, "{}", sut.log);
    assert_eq!("\nx = [1];\n\ny = F;\n", body(&sut));
}

#[test]
fn unterminated_invocation_is_reported_at_directive() {
    let sut = run("#define F(a) a\nx = F(1,\n#define G\n");

    assert!(!sut.success);
    assert!(
        sut.log.contains("end of line in macro substitution: F"),
        "{}",
        sut.log
    );

    // Line count is retained.
    assert_eq!(3, body(&sut).matches('\n').count());
}

#[test]
fn object_like_macro_may_name_function_like_macro() {
    let sut = run("#define G(x) x\n#define F G\nint y = F(1);\n");

    assert!(sut.success, "{}", sut.log);
    assert_eq!("\n\nint y = 1;\n", body(&sut));
}

#[test]
fn bad_parameter_list_is_error() {
    let sut = run("#define F(a, a) a\n");

    assert!(!sut.success);
    assert!(sut.log.contains("bad macro parameter list: F"), "{}", sut.log);
}

#[test]
fn error_directive_fails_with_glslang_log() {
    let sut = run("\n#error bad   thing\n");

    assert!(!sut.success);
    assert_eq!(
        "ERROR: t:2: '#error' : bad thing\n\
         ERROR: 1 compilation errors.  No code generated.\n",
        sut.log
    );

    // The log must be understood by the diagnostic filter.
    let (ok, diagnostics) = filter_log("t", FilterConfig::default(), &sut.log);

    assert!(!ok);
    assert_eq!(
        "t:2: error: '#error' : bad thing\n",
        diagnostics.to_string()
    );
}

#[test]
fn conditional_structure_errors() {
    let sut = run("#endif\n#else\n#if 1\n#else\n#elif 1\n");

    assert_eq!(
        "ERROR: t:1: '#endif' : #endif without #if\n\
         ERROR: t:2: '#else' : #else without #if\n\
         ERROR: t:5: '#elif' : #elif after #else\n\
         ERROR: t:3: '#if' : missing #endif\n\
         ERROR: 4 compilation errors.  No code generated.\n",
        sut.log
    );
}

#[test]
fn invalid_directive_is_error() {
    let sut = run("#frobnicate\n");

    assert!(sut.log.contains("'#frobnicate' : invalid directive"));
}

#[test]
fn include_is_anchored_with_line_directives() {
    let mut includer = MapIncluder::with(&[("inc.glsl", "float helper();\n")]);
    let sut = run_with(
        "#version 450\n#include \"inc.glsl\"\nvoid main(){}\n",
        &mut includer,
    );

    assert!(sut.success, "{}", sut.log);
    assert_eq!(
        "#version 450\n\
         #line 1 \"inc.glsl\"\n\
         float helper();\n\
         #line 3 \"t\"\n\
         void main(){}\n",
        body(&sut)
    );
    assert_eq!(1, includer.num_include_directives());
}

#[test]
fn include_numbering_before_330() {
    let mut includer = MapIncluder::with(&[("inc.glsl", "int x;\n")]);
    let sut = run_with("#include <inc.glsl>\nint y;\n", &mut includer);

    assert_eq!(
        "#line 0 \"inc.glsl\"\n\
         int x;\n\
         #line 1 \"t\"\n\
         int y;\n",
        body(&sut)
    );
}

#[test]
fn included_macros_are_visible_to_includer() {
    let mut includer = MapIncluder::with(&[("defs.glsl", "#define N 4\n")]);
    let sut = run_with("#include \"defs.glsl\"\nint a[N];\n", &mut includer);

    assert!(body(&sut).ends_with("int a[4];\n"), "{}", sut.text);
}

#[test]
fn include_errors_name_included_file() {
    let mut includer = MapIncluder::with(&[("bad.glsl", "\n#error oops\n")]);
    let sut = run_with("#include \"bad.glsl\"\n", &mut includer);

    assert!(sut.log.contains("ERROR: bad.glsl:2: '#error' : oops\n"));
}

#[test]
fn missing_include_is_error() {
    let sut = run("#include \"nope.glsl\"\n");

    assert!(!sut.success);
    assert!(
        sut.log.contains(
            "ERROR: t:1: '#include' : \
               cannot find or open include file: nope.glsl\n"
        ),
        "{}",
        sut.log
    );
}

#[test]
fn include_requires_extension() {
    let sut = run("#extension GL_GOOGLE_include_directive : disable\n\
                   #include \"a.glsl\"\n");

    assert!(sut.log.contains(
        "'#include' : required extension not requested: \
           GL_GOOGLE_include_directive"
    ));
}

#[test]
fn include_depth_is_limited() {
    let mut includer =
        MapIncluder::with(&[("self.glsl", "#include \"self.glsl\"\n")]);
    let sut = run_with("#include \"self.glsl\"\n", &mut includer);

    assert!(!sut.success);
    assert!(sut.log.contains("maximum include depth exceeded"));
    assert_eq!(global::MAX_INCLUDE_DEPTH, includer.num_include_directives());
}
