//! The value model exposed by cells.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error token produced by formula evaluation.
///
/// These are ordinary values: they are cached, returned from reads and
/// propagated through referencing formulas. They are never raised as `Err`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FormulaError {
    /// Reference to a position outside the sheet.
    Ref,
    /// Operand of the wrong type (e.g. non-numeric text in arithmetic).
    Value,
    /// Division by zero or another non-finite arithmetic result.
    Div0,
}

impl FormulaError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormulaError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "#REF!" => Ok(FormulaError::Ref),
            "#VALUE!" => Ok(FormulaError::Value),
            "#DIV/0!" => Ok(FormulaError::Div0),
            other => Err(format!("Unknown formula error token: {}", other)),
        }
    }
}

/// Evaluated value of a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl CellValue {
    /// The value of an empty cell.
    pub fn empty() -> CellValue {
        CellValue::Text(String::new())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<FormulaError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::empty()
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<FormulaError> for CellValue {
    fn from(e: FormulaError) -> Self {
        CellValue::Error(e)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => f.write_str(&super::format_number(*n)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tokens_parse_back() {
        for err in [FormulaError::Ref, FormulaError::Value, FormulaError::Div0] {
            assert_eq!(err.to_string().parse::<FormulaError>(), Ok(err));
        }
        assert!("#NAME?".parse::<FormulaError>().is_err());
    }

    #[test]
    fn test_display_renders_each_kind() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(3.5).to_string(), "3.5");
        assert_eq!(CellValue::from("abc").to_string(), "abc");
        assert_eq!(CellValue::Error(FormulaError::Div0).to_string(), "#DIV/0!");
        assert_eq!(CellValue::empty().to_string(), "");
    }
}
