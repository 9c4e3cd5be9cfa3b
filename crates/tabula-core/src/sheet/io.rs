//! Tab-separated grid output.

use std::io::{self, Write};

use tabula_engine::engine::{Position, Size, format_value};

use super::state::Sheet;

impl Sheet {
    /// Write every cell's value, one line per row of the printable area.
    pub fn print_values(&mut self, out: &mut impl Write) -> io::Result<()> {
        let size = self.size;
        write_grid(out, size, |pos| match self.id_of(pos) {
            Some(id) => format_value(&self.evaluate(id)),
            None => String::new(),
        })
    }

    /// Write every cell's text, one line per row of the printable area.
    pub fn print_texts(&self, out: &mut impl Write) -> io::Result<()> {
        write_grid(out, self.size, |pos| match self.id_of(pos) {
            Some(id) => self.slot(id).text(),
            None => String::new(),
        })
    }
}

fn write_grid(
    out: &mut impl Write,
    size: Size,
    mut render: impl FnMut(Position) -> String,
) -> io::Result<()> {
    for row in 0..size.rows {
        let line: Vec<String> = (0..size.cols)
            .map(|col| render(Position::new(row, col)))
            .collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(sheet: &mut Sheet) -> String {
        let mut out = Vec::new();
        sheet.print_values(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn texts(sheet: &Sheet) -> String {
        let mut out = Vec::new();
        sheet.print_texts(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample() -> Sheet {
        let mut sheet = Sheet::new();
        let set = |sheet: &mut Sheet, a1: &str, text: &str| {
            sheet.set_cell(Position::from_a1(a1).unwrap(), text).unwrap()
        };
        set(&mut sheet, "A1", "=1+2");
        set(&mut sheet, "B1", "'=escaped");
        set(&mut sheet, "A2", "=A1/4");
        set(&mut sheet, "C3", "=1/0");
        sheet
    }

    #[test]
    fn test_print_values() {
        let mut sheet = sample();
        assert_eq!(values(&mut sheet), "3\t=escaped\t\n0.75\t\t\n\t\t#DIV/0!\n");
    }

    #[test]
    fn test_print_texts() {
        let sheet = sample();
        assert_eq!(texts(&sheet), "=1+2\t'=escaped\t\n=A1/4\t\t\n\t\t=1/0\n");
    }

    #[test]
    fn test_empty_sheet_prints_nothing() {
        let mut sheet = Sheet::new();
        assert_eq!(values(&mut sheet), "");
        assert_eq!(texts(&sheet), "");
    }

    #[test]
    fn test_placeholder_cells_print_empty() {
        let mut sheet = Sheet::new();
        sheet.set_cell(Position::new(0, 0), "=B2 + 1").unwrap();
        assert_eq!(values(&mut sheet), "1\t\n\t\n");
        assert_eq!(texts(&sheet), "=B2+1\t\n\t\n");
    }
}
