// Tests for stage directive scanning
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

fn messages(err: &StageError) -> Vec<String> {
    err.describe().iter().map(ToString::to_string).collect()
}

#[test]
fn no_directive_infers_nothing() {
    assert_eq!(
        Ok(None),
        infer_stage("#version 450\nvoid main(){}\n", "t", true)
    );
}

#[test]
fn directive_before_code_selects_stage() {
    let src = "#version 450\n\
               #extension GL_EXT_foo : enable\n\
               #pragma shader_stage(fragment)\n\
               \n\
               void main(){}\n";

    assert_eq!(Ok(Some(Stage::Fragment)), infer_stage(src, "t", true));
}

#[test]
fn argument_whitespace_is_ignored() {
    assert_eq!(
        Ok(Some(Stage::Compute)),
        infer_stage("  #pragma shader_stage(  compute )  \n", "t", false)
    );
}

#[test]
fn unbalanced_parens_still_yield_argument() {
    let sut = StageScan::scan("#pragma shader_stage(tesseval\n", false);

    assert_eq!(
        &[StageDirective {
            line: 1,
            name: "tesseval"
        }],
        sut.directives()
    );
    assert_eq!(Ok(Some(Stage::TessEvaluation)), sut.resolve("t"));
}

#[test]
fn repeated_identical_directives_are_fine() {
    let src = "#pragma shader_stage(vertex)\n#pragma shader_stage(vertex)\n";

    assert_eq!(Ok(Some(Stage::Vertex)), infer_stage(src, "t", true));
}

#[test]
fn directive_after_code_is_error() {
    let src = "#version 310 es\nvoid main(){}\n#pragma shader_stage(vertex)\n";
    let err = infer_stage(src, "a.glsl", true).unwrap_err();

    assert_eq!(vec![StageViolation::AfterCode { line: 3 }], err.violations);
    assert_eq!(
        vec!["a.glsl:3: error: '#pragma': the first 'shader_stage' #pragma \
                must appear before any non-preprocessing code"
            .to_string()],
        messages(&err),
    );
}

#[test]
fn invalid_stage_is_error() {
    let err =
        infer_stage("#pragma shader_stage(superstage)\n", "t", true)
            .unwrap_err();

    assert_eq!(
        vec!["t:1: error: '#pragma': invalid stage for 'shader_stage' \
                #pragma: 'superstage'"
            .to_string()],
        messages(&err),
    );
}

#[test]
fn conflict_names_both_locations() {
    let src = "#pragma shader_stage(vertex)\n\
               \n\
               #pragma shader_stage(fragment)\n";
    let err = infer_stage(src, "t", true).unwrap_err();

    assert_eq!(
        vec!["t:3: error: '#pragma': conflicting stages for 'shader_stage' \
                #pragma: 'fragment' (was 'vertex' at t:1)"
            .to_string()],
        messages(&err),
    );
}

// The same input numbers differently depending on whether `#line` applies
//   to the line that follows it.
#[test]
fn line_directive_resets_logical_numbering() {
    let src = "#line 10\n\
               #pragma shader_stage(vertex)\n\
               #pragma shader_stage(compute)\n";

    let conflict = |next_line| {
        infer_stage(src, "t", next_line).unwrap_err().violations
    };

    assert_eq!(
        vec![StageViolation::Conflict {
            line: 11,
            name: "compute".into(),
            first_line: 10,
            first_name: "vertex".into(),
        }],
        conflict(true),
    );

    assert_eq!(
        vec![StageViolation::Conflict {
            line: 12,
            name: "compute".into(),
            first_line: 11,
            first_name: "vertex".into(),
        }],
        conflict(false),
    );
}

#[test]
fn line_directive_with_file_is_still_renumbered() {
    let src = "#line 5 \"inc.glsl\"\n#pragma shader_stage(nope)\n";
    let err = infer_stage(src, "main", true).unwrap_err();

    assert_eq!(
        vec![StageViolation::InvalidStage {
            line: 5,
            name: "nope".into()
        }],
        err.violations
    );
}

#[test]
fn all_violations_are_reported_together() {
    let src = "int x;\n\
               #pragma shader_stage(bogus)\n\
               #pragma shader_stage(vertex)\n";
    let err = infer_stage(src, "t", true).unwrap_err();

    assert_eq!(
        vec![
            StageViolation::AfterCode { line: 2 },
            StageViolation::InvalidStage {
                line: 2,
                name: "bogus".into()
            },
            StageViolation::Conflict {
                line: 3,
                name: "vertex".into(),
                first_line: 2,
                first_name: "bogus".into(),
            },
        ],
        err.violations
    );

    assert_eq!("3 problems with 'shader_stage' #pragma in t", err.to_string());
}
