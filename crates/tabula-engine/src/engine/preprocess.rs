//! Formula preprocessing.
//!
//! Before a formula can be compiled by Rhai, cell references like `A1` must be
//! transformed into builtin calls. This module handles:
//!
//! - **Preprocessing**: `A1` → `CELL(0, 0)`, `@A1` → `VALUE(0, 0)`, and
//!   references outside the sheet → `REF_ERROR()`
//! - **Numeric literals**: `7` → `7.0`, so arithmetic is always floating point
//! - **Canonical text**: references rewritten in upper-case A1 form, spacing
//!   normalized
//! - **Reserved names**: formulas may not call the reference builtins directly
//!
//! Text inside string literals is never rewritten.

use regex::Regex;
use std::sync::OnceLock;

use super::position::Position;

/// A piece of formula source, split at string literals and references.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece<'a> {
    /// Expression text outside strings, with no references in it.
    Code(&'a str),
    /// A string literal, quotes included.
    Literal(&'a str),
    /// A reference-shaped token.
    Ref(RefToken<'a>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RefToken<'a> {
    pub text: &'a str,
    /// `@A1` reads the typed value instead of a number.
    pub typed: bool,
    /// `None` when the token does not denote a position inside the sheet.
    pub position: Option<Position>,
}

impl RefToken<'_> {
    fn canonical(&self) -> String {
        let name = match self.position {
            Some(pos) => pos.to_string(),
            None => self.text.trim_start_matches('@').to_ascii_uppercase(),
        };
        if self.typed { format!("@{}", name) } else { name }
    }
}

fn ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(@?)\b([A-Za-z]+[0-9]+)\b").expect("cell reference regex must compile")
    })
}

/// Split formula source into code, string literals and references.
pub(crate) fn split_formula(formula: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let bytes = formula.as_bytes();
    let mut seg_start = 0;
    let mut in_string = false;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == b'"' && backslashes.is_multiple_of(2) {
                pieces.push(Piece::Literal(&formula[seg_start..=i]));
                in_string = false;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' {
            split_code(&formula[seg_start..i], &mut pieces);
            in_string = true;
            seg_start = i;
            backslashes = 0;
        }
        i += 1;
    }

    if seg_start < formula.len() {
        if in_string {
            pieces.push(Piece::Literal(&formula[seg_start..]));
        } else {
            split_code(&formula[seg_start..], &mut pieces);
        }
    }

    pieces
}

fn split_code<'a>(code: &'a str, pieces: &mut Vec<Piece<'a>>) {
    let mut last = 0;
    for caps in ref_re().captures_iter(code) {
        let whole = caps.get(0).expect("group 0 always matches");
        // `LOG10(x)` is a function call, not a reference.
        if code[whole.end()..].trim_start().starts_with('(') {
            continue;
        }
        if whole.start() > last {
            pieces.push(Piece::Code(&code[last..whole.start()]));
        }
        let position = Position::from_a1(&caps[2]).filter(Position::is_valid);
        pieces.push(Piece::Ref(RefToken {
            text: whole.as_str(),
            typed: !caps[1].is_empty(),
            position,
        }));
        last = whole.end();
    }
    if last < code.len() {
        pieces.push(Piece::Code(&code[last..]));
    }
}

/// Rewrite a formula into a Rhai expression.
pub fn preprocess_formula(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len() + 16);
    for piece in split_formula(formula) {
        match piece {
            Piece::Code(code) => out.push_str(&float_literals(code)),
            Piece::Literal(s) => out.push_str(s),
            Piece::Ref(token) => match token.position {
                Some(pos) if token.typed => {
                    out.push_str(&format!("VALUE({}, {})", pos.row, pos.col))
                }
                Some(pos) => out.push_str(&format!("CELL({}, {})", pos.row, pos.col)),
                None => out.push_str("REF_ERROR()"),
            },
        }
    }
    out
}

/// Normalized formula text: references in upper-case A1 form and whitespace
/// outside string literals reduced to what separates tokens.
///
/// A space survives only between two word characters (`x in y`) or two
/// operator characters (`1 - -2`); every other run is dropped, so
/// `( a1 +  2 ) * 3` and `(A1+2)*3` have the same canonical text.
pub fn canonical_formula(formula: &str) -> String {
    let pieces = split_formula(formula);
    let mut out = String::with_capacity(formula.len());
    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Code(code) => {
                let following = pieces[i + 1..].iter().find_map(Piece::first_char);
                squeeze_whitespace(code, following, &mut out);
            }
            Piece::Literal(s) => out.push_str(s),
            Piece::Ref(token) => out.push_str(&token.canonical()),
        }
    }
    out
}

impl Piece<'_> {
    /// First non-whitespace character, if the piece has one.
    fn first_char(&self) -> Option<char> {
        match self {
            Piece::Code(code) => code.trim_start().chars().next(),
            Piece::Literal(s) => s.chars().next(),
            Piece::Ref(token) => token.text.chars().next(),
        }
    }
}

fn squeeze_whitespace(code: &str, following: Option<char>, out: &mut String) {
    let mut rest = code;
    while let Some(c) = rest.chars().next() {
        if !c.is_whitespace() {
            out.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }
        rest = rest.trim_start();
        let next = rest.chars().next().or(following);
        if let (Some(prev), Some(next)) = (out.chars().next_back(), next) {
            let words = is_word_char(prev) && is_word_char(next);
            let operators = is_operator_char(prev) && is_operator_char(next);
            if words || operators {
                out.push(' ');
            }
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '@'
}

fn is_operator_char(c: char) -> bool {
    "+-*/%<>=!&|^.".contains(c)
}

/// Builtins and script hooks that only preprocessing may emit. `Fn` and `eval`
/// would reach the builtins through a string name.
const RESERVED_NAMES: [&str; 5] = ["CELL", "VALUE", "REF_ERROR", "Fn", "eval"];

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier regex must compile")
    })
}

/// The first reserved name written outside string literals, if any.
pub(crate) fn reserved_name(formula: &str) -> Option<&str> {
    split_formula(formula).into_iter().find_map(|piece| match piece {
        Piece::Code(code) => identifier_re()
            .find_iter(code)
            .map(|m| m.as_str())
            .find(|name| RESERVED_NAMES.iter().any(|reserved| reserved == name)),
        _ => None,
    })
}

/// Rewrite integer literals as float literals (`7` → `7.0`, `2e3` → `2.0e3`).
///
/// Digits that continue an identifier (`A1`, `LOG10`) or a hex/underscored
/// literal are left alone.
fn float_literals(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len() + 8);
    let mut copied = 0;
    let mut i = 0;

    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';

    while i < bytes.len() {
        let starts_number =
            bytes[i].is_ascii_digit() && (i == 0 || !(is_word(bytes[i - 1]) || bytes[i - 1] == b'.'));
        if !starts_number {
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let int_end = i;

        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            // Already a float literal; skip fraction and exponent.
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                let mut j = i + 1;
                if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                    j += 1;
                }
                if j < bytes.len() && bytes[j].is_ascii_digit() {
                    i = j;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            continue;
        }

        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            let mut j = i + 1;
            if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                out.push_str(&code[copied..int_end]);
                out.push_str(".0");
                copied = int_end;
                i = j;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                continue;
            }
        }

        if i < bytes.len() && is_word(bytes[i]) {
            // `0x1F`, `1_000`: not ours to touch.
            while i < bytes.len() && is_word(bytes[i]) {
                i += 1;
            }
            continue;
        }

        out.push_str(&code[copied..int_end]);
        out.push_str(".0");
        copied = int_end;
    }

    out.push_str(&code[copied..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preprocess_simple_refs() {
        assert_eq!(preprocess_formula("A1"), "CELL(0, 0)");
        assert_eq!(preprocess_formula("B1"), "CELL(0, 1)");
        assert_eq!(preprocess_formula("A2"), "CELL(1, 0)");
    }

    #[test]
    fn test_preprocess_typed_refs() {
        assert_eq!(preprocess_formula("@A1"), "VALUE(0, 0)");
        assert_eq!(preprocess_formula("len(@B1)"), "len(VALUE(0, 1))");
        assert_eq!(preprocess_formula("@A1 + B1"), "VALUE(0, 0) + CELL(0, 1)");
    }

    #[test]
    fn test_preprocess_rewrites_integer_literals() {
        assert_eq!(preprocess_formula("1+2"), "1.0+2.0");
        assert_eq!(preprocess_formula("A1 * 2"), "CELL(0, 0) * 2.0");
        assert_eq!(preprocess_formula("7 / 2.5"), "7.0 / 2.5");
        assert_eq!(preprocess_formula("2e-3 + 1.5e2"), "2.0e-3 + 1.5e2");
        assert_eq!(preprocess_formula("1.5e-2 * 3"), "1.5e-2 * 3.0");
        assert_eq!(preprocess_formula("0x1F"), "0x1F");
    }

    #[test]
    fn test_preprocess_leaves_strings_alone() {
        assert_eq!(
            preprocess_formula(r#""A1 is 3" + A1"#),
            r#""A1 is 3" + CELL(0, 0)"#
        );
        assert_eq!(
            preprocess_formula(r#""say \"B2\"" + B2"#),
            r#""say \"B2\"" + CELL(1, 1)"#
        );
    }

    #[test]
    fn test_preprocess_skips_function_names() {
        assert_eq!(preprocess_formula("LOG10(A1)"), "LOG10(CELL(0, 0))");
        assert_eq!(preprocess_formula("ATAN2 (B1, 1)"), "ATAN2 (CELL(0, 1), 1.0)");
    }

    #[test]
    fn test_preprocess_out_of_range_ref_becomes_ref_error() {
        assert_eq!(preprocess_formula("ZZZZ1 + 1"), "REF_ERROR() + 1.0");
        assert_eq!(preprocess_formula("A99999"), "REF_ERROR()");
        assert_eq!(preprocess_formula("A0"), "REF_ERROR()");
    }

    #[test]
    fn test_canonical_formula_uppercases_refs() {
        assert_eq!(canonical_formula("  a1 +  b2 "), "A1+B2");
        assert_eq!(canonical_formula("@c3*2"), "@C3*2");
        assert_eq!(canonical_formula(r#""a1" + a1"#), r#""a1"+A1"#);
        assert_eq!(canonical_formula("zzzz1"), "ZZZZ1");
    }

    #[test]
    fn test_canonical_formula_normalizes_spacing() {
        assert_eq!(canonical_formula("( a1 +  2 ) * 3"), "(A1+2)*3");
        assert_eq!(canonical_formula("(A1+2)*3"), "(A1+2)*3");
        assert_eq!(canonical_formula("1 - -a1"), "1- -A1");
        assert_eq!(canonical_formula("a1 < -1"), "A1< -1");
        assert_eq!(canonical_formula(r#"len( "a  b" )"#), r#"len("a  b")"#);
        assert_eq!(
            canonical_formula("if a1 > 0 { 1 } else { 2 }"),
            "if A1>0{1}else{2}"
        );
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(reserved_name("CELL(0x0, 0x1)"), Some("CELL"));
        assert_eq!(reserved_name("1 + VALUE (0, 0)"), Some("VALUE"));
        assert_eq!(reserved_name(r#"Fn("CELL").call(0, 0)"#), Some("Fn"));
        assert_eq!(reserved_name(r#"eval("A1")"#), Some("eval"));
        assert_eq!(reserved_name(r#""CELL(0, 0)" + A1"#), None);
        assert_eq!(reserved_name("MYCELL(1) + VALUES + 0xCE"), None);
    }
}
