//! Cell positions and A1 notation.
//!
//! A [`Position`] is the only way cells are addressed. It converts both ways
//! between spreadsheet-style references (e.g. "A1", "B2", "AA100") and
//! zero-indexed row/column coordinates.
//!
//! # Examples
//!
//! ```
//! use tabula_engine::engine::Position;
//!
//! let pos = Position::from_a1("B3").unwrap();
//! assert_eq!(pos.row, 2);
//! assert_eq!(pos.col, 1);
//! assert_eq!(pos.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A zero-indexed (row, col) grid address.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const MAX_ROWS: usize = 16384;
    pub const MAX_COLS: usize = 16384;

    /// Sentinel that never passes [`Position::is_valid`].
    pub const NONE: Position = Position {
        row: usize::MAX,
        col: usize::MAX,
    };

    pub const fn new(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    pub fn is_valid(&self) -> bool {
        self.row < Self::MAX_ROWS && self.col < Self::MAX_COLS
    }

    /// Parse a reference in A1 notation (e.g. "A1", "b2", "AA10").
    ///
    /// Returns `None` if the text is not shaped like a reference or the
    /// numbers overflow. The result may still lie outside the valid range;
    /// check [`Position::is_valid`] before addressing a sheet with it.
    pub fn from_a1(name: &str) -> Option<Position> {
        let caps = a1_re().captures(name)?;
        let letters = &caps["letters"];
        let numbers = &caps["numbers"];

        let mut col_acc = 0usize;
        for c in letters.to_ascii_uppercase().bytes() {
            let digit = (c - b'A') as usize + 1;
            col_acc = col_acc.checked_mul(26)?.checked_add(digit)?;
        }
        let col = col_acc.checked_sub(1)?;

        let row = numbers.parse::<usize>().ok()?.checked_sub(1)?;

        Some(Position::new(row, col))
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        let mut result = String::new();
        let mut n = col as u128 + 1;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

fn a1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Za-z]+)(?<numbers>[0-9]+)$")
            .expect("A1 reference regex must compile")
    })
}

impl std::str::FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Position::NONE {
            return f.write_str("#REF!");
        }
        write!(f, "{}{}", Position::col_to_letters(self.col), self.row + 1)
    }
}

/// Printable bounding box of a sheet: one past the largest stored row/column.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

impl Size {
    pub const fn new(rows: usize, cols: usize) -> Size {
        Size { rows, cols }
    }
}

#[cfg(test)]
mod tests {
    use super::Position;

    #[test]
    fn test_from_a1_single_letter_columns() {
        let a1 = Position::from_a1("A1").unwrap();
        assert_eq!(a1, Position::new(0, 0));

        let b1 = Position::from_a1("B1").unwrap();
        assert_eq!(b1, Position::new(0, 1));

        let z1 = Position::from_a1("Z1").unwrap();
        assert_eq!(z1, Position::new(0, 25));
    }

    #[test]
    fn test_from_a1_multi_letter_columns() {
        assert_eq!(Position::from_a1("AA1").unwrap().col, 26);
        assert_eq!(Position::from_a1("AZ1").unwrap().col, 51);
        assert_eq!(Position::from_a1("BA1").unwrap().col, 52);
    }

    #[test]
    fn test_from_a1_case_insensitive() {
        assert_eq!(Position::from_a1("a1"), Some(Position::new(0, 0)));
        assert_eq!(Position::from_a1("aA10").unwrap(), Position::new(9, 26));
    }

    #[test]
    fn test_from_a1_invalid_inputs() {
        assert!(Position::from_a1("").is_none());
        assert!(Position::from_a1("123").is_none());
        assert!(Position::from_a1("ABC").is_none());
        assert!(Position::from_a1("A0").is_none());
        assert!(Position::from_a1("1A").is_none());
        assert!(Position::from_a1("A 1").is_none());
    }

    #[test]
    fn test_from_a1_overflow_returns_none() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(Position::from_a1(&huge).is_none());
    }

    #[test]
    fn test_validity_bounds() {
        assert!(Position::new(0, 0).is_valid());
        assert!(Position::new(Position::MAX_ROWS - 1, Position::MAX_COLS - 1).is_valid());
        assert!(!Position::new(Position::MAX_ROWS, 0).is_valid());
        assert!(!Position::new(0, Position::MAX_COLS).is_valid());
        assert!(!Position::NONE.is_valid());
    }

    #[test]
    fn test_display_round_trips_through_a1() {
        for name in ["A1", "Z9", "AA10", "XFD16384"] {
            let pos = Position::from_a1(name).unwrap();
            assert_eq!(pos.to_string(), name);
        }
        assert_eq!(Position::NONE.to_string(), "#REF!");
    }

    #[test]
    fn test_ordering_is_row_major() {
        let mut positions = vec![
            Position::new(1, 0),
            Position::new(0, 5),
            Position::new(0, 1),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![Position::new(0, 1), Position::new(0, 5), Position::new(1, 0)]
        );
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = Position::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }
}
