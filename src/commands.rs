//! Line-oriented command scripts.
//!
//! ```text
//! # comment
//! set A1 =1+2
//! set B1 =A1*2
//! value B1
//! values
//! ```

use std::io::{self, BufRead, Write};
use std::sync::OnceLock;

use regex::Regex;

use tabula_core::{Position, Sheet};
use tabula_engine::engine::format_value;

use crate::error::{Result, ShellError};

fn set_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The text starts after exactly one space and may be empty.
    RE.get_or_init(|| Regex::new(r"^set\s+(\S+)(?: (.*))?$").expect("valid regex"))
}

/// Run every command in `input`. Output goes to `out`, one
/// `Error: line N: ...` message per failed command to `err`.
///
/// Returns the number of failed commands.
pub fn run_script(
    sheet: &mut Sheet,
    input: impl BufRead,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<usize> {
    let mut failures = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if let Err(e) = execute(sheet, &line, out) {
            failures += 1;
            writeln!(err, "Error: line {}: {}", index + 1, e)?;
        }
    }
    Ok(failures)
}

/// Run a single command line.
pub fn execute(sheet: &mut Sheet, line: &str, out: &mut impl Write) -> Result<()> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(());
    }

    if let Some(caps) = set_re().captures(line.trim_start()) {
        let pos = parse_position(&caps[1])?;
        let text = caps.get(2).map_or("", |m| m.as_str());
        sheet.set_cell(pos, text)?;
        return Ok(());
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    match words.as_slice() {
        ["clear", cell] => sheet.clear_cell(parse_position(cell)?)?,
        ["value", cell] => {
            let value = sheet.value(parse_position(cell)?)?;
            writeln!(out, "{}", format_value(&value))?;
        }
        ["text", cell] => writeln!(out, "{}", sheet.text(parse_position(cell)?)?)?,
        ["refs", cell] => {
            let refs = sheet
                .cell(parse_position(cell)?)?
                .map(|c| c.referenced_cells())
                .unwrap_or_default();
            let refs: Vec<String> = refs.iter().map(Position::to_string).collect();
            writeln!(out, "{}", refs.join(" "))?;
        }
        ["size"] => {
            let size = sheet.printable_size();
            writeln!(out, "{}x{}", size.rows, size.cols)?;
        }
        ["values"] => sheet.print_values(out)?,
        ["texts"] => sheet.print_texts(out)?,
        [command, ..] => {
            return Err(ShellError::Command(format!(
                "unknown command or wrong arguments: {}",
                command
            )));
        }
        [] => {}
    }
    Ok(())
}

fn parse_position(name: &str) -> Result<Position> {
    Position::from_a1(name)
        .ok_or_else(|| ShellError::Command(format!("invalid cell reference: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(script: &str) -> (String, String, usize) {
        let mut sheet = Sheet::new();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let failures = run_script(&mut sheet, script.as_bytes(), &mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
            failures,
        )
    }

    #[test]
    fn test_recompute_scenario() {
        let (out, err, failures) = run("set A1 =1+2\n\
             value A1\n\
             set B1 =A1*2\n\
             value B1\n\
             set A1 5\n\
             value B1\n");
        assert_eq!(out, "3\n6\n10\n");
        assert_eq!(err, "");
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let (out, _, failures) = run("# setup\n\n   \nset A1 hi\n  # more\ntext A1\n");
        assert_eq!(out, "hi\n");
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_set_keeps_spaces_in_text() {
        let (out, _, _) = run("set A1 hello  world\ntext A1\nset A1\ntext A1\nsize\n");
        assert_eq!(out, "hello  world\n\n1x1\n");
    }

    #[test]
    fn test_refs_and_size() {
        let (out, _, _) = run("set C2 =b1 + A1 + B1\nrefs C2\nrefs A1\nrefs D9\nsize\n");
        assert_eq!(out, "A1 B1\n\n\n2x3\n");
    }

    #[test]
    fn test_grids() {
        let (out, _, _) = run("set A1 =2*3\nset B2 '=x\nvalues\ntexts\n");
        assert_eq!(out, "6\t\n\t=x\n=2*3\t\n\t'=x\n");
    }

    #[test]
    fn test_errors_report_line_and_continue() {
        let (out, err, failures) = run("set A1 =A1\n\
             bogus\n\
             set A1 =1 +\n\
             value nope\n\
             set A1 7\n\
             value A1\n");
        assert_eq!(out, "7\n");
        assert_eq!(failures, 4);
        let lines: Vec<&str> = err.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Error: line 1: Circular dependency detected at A1");
        assert!(lines[1].starts_with("Error: line 2: unknown command"));
        assert!(lines[2].starts_with("Error: line 3: cannot parse formula"));
        assert_eq!(lines[3], "Error: line 4: invalid cell reference: nope");
    }

    #[test]
    fn test_out_of_range_position() {
        let (_, err, failures) = run("set ZZZZ1 1\n");
        assert_eq!(failures, 1);
        assert!(err.starts_with("Error: line 1: Invalid position"));
    }

    #[test]
    fn test_clear() {
        let (out, _, _) = run("set A1 1\nset B1 =A1\nclear A1\nvalue B1\nclear B1\nsize\n");
        assert_eq!(out, "0\n1x1\n");
    }
}
