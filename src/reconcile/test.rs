// Tests for preamble reconciliation
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

const EXT: &str = global::INCLUDE_SUPPORT_DIRECTIVE;

fn preprocessed(preamble_blanks: usize, body: &str) -> String {
    format!("{}{EXT}{body}", "\n".repeat(preamble_blanks))
}

#[test]
fn no_macros_no_includes_no_version_is_verbatim() {
    let src = "void main() {\n  gl_Position = vec4(0);\n}\n";

    assert_eq!(
        Ok(src.to_string()),
        reconcile(&preprocessed(0, src), "a.vert", EXT, 0, false)
    );
}

#[test]
fn macro_artifacts_are_removed() {
    let src = "float x = 1.0;\n";

    assert_eq!(
        Ok(src.to_string()),
        reconcile(&preprocessed(3, src), "a.vert", EXT, 0, false)
    );
}

// Whitespace-only lines are just as much artifacts as empty ones.
#[test]
fn whitespace_only_artifacts_are_removed() {
    let input = format!(" \n\t\n{EXT}void main(){{}}\n");

    assert_eq!(
        Ok("void main(){}\n".to_string()),
        reconcile(&input, "t", EXT, 0, false)
    );
}

#[test]
fn non_blank_lines_before_anchor_are_kept() {
    let input = format!("\n#pragma something\n\n{EXT}void main(){{}}\n");

    assert_eq!(
        Ok("#pragma something\nvoid main(){}\n".to_string()),
        reconcile(&input, "t", EXT, 0, false)
    );
}

#[test]
fn version_stays_in_place_without_includes() {
    let src = "// leading comment line\n#version 450\nvoid main(){}\n";

    assert_eq!(
        Ok(src.to_string()),
        reconcile(&preprocessed(2, src), "a.vert", EXT, 0, true)
    );
}

#[test]
fn zero_includes_never_emit_scaffolding() {
    for src in [
        "",
        "void main(){}\n",
        "#version 310 es\nvoid main(){}\n",
        "#line 4 \"other\"\nint x;\n",
    ] {
        for next_line in [false, true] {
            let sut =
                reconcile(&preprocessed(1, src), "tag", EXT, 0, next_line)
                    .unwrap();

            assert!(!sut.contains(EXT.trim_end()), "{sut:?}");
            assert!(!sut.contains("#line 0 \"tag\""), "{sut:?}");
            assert!(!sut.contains("#line 1 \"tag\""), "{sut:?}");
        }
    }
}

#[test]
fn includes_relocate_version_and_anchor_main_file() {
    let body = "#version 450\n\
                #line 1 \"inc.glsl\"\n\
                float helper();\n\
                #line 3 \"a.vert\"\n\
                void main(){}\n";

    assert_eq!(
        Ok(format!(
            "#version 450\n\
             {EXT}\
             #line 1 \"a.vert\"\n\
             \n\
             #line 1 \"inc.glsl\"\n\
             float helper();\n\
             #line 3 \"a.vert\"\n\
             void main(){{}}\n"
        )),
        reconcile(&preprocessed(2, body), "a.vert", EXT, 1, true)
    );
}

#[test]
fn includes_with_version_put_version_first() {
    let body = "// comment\n#version 310 es\nvoid main(){}\n";

    let sut =
        reconcile(&preprocessed(1, body), "a.frag", EXT, 2, true).unwrap();

    assert_eq!(Some("#version 310 es\n"), text::lines_inclusive(&sut).next());
}

#[test]
fn includes_without_version_use_current_line_numbering() {
    let body = "#line 0 \"inc.glsl\"\n\
                int x;\n\
                #line 1 \"main\"\n\
                void main(){}\n";

    assert_eq!(
        Ok(format!(
            "{EXT}\
             #line 0 \"main\"\n\
             {body}"
        )),
        reconcile(&preprocessed(0, body), "main", EXT, 1, false)
    );
}

// A version directive on the last line without a trailing newline must
//   not be glued to the line that follows it after relocation.
#[test]
fn relocated_version_without_newline() {
    let input = format!("{EXT}#version 450");

    assert_eq!(
        Ok(format!("#version 450\n{EXT}#line 1 \"t\"\n\n")),
        reconcile(&input, "t", EXT, 1, true)
    );
}

#[test]
fn missing_anchor_is_internal_error() {
    let src = "#version 450\nvoid main(){}\n";
    let sut = reconcile(src, "x.comp", EXT, 0, true);

    assert_eq!(
        Err(ReconcileError::MissingAnchor {
            tag: "x.comp".into()
        }),
        sut
    );

    let described = sut.unwrap_err().describe();
    assert_eq!(Some(Level::InternalError), described[0].level);
}

// Only the first include-support line is the anchor;
//   a later one belongs to the user's source.
#[test]
fn only_first_anchor_is_consumed() {
    let input = format!("\n{EXT}{EXT}void main(){{}}\n");

    assert_eq!(
        Ok(format!("{EXT}void main(){{}}\n")),
        reconcile(&input, "t", EXT, 0, false)
    );
}
