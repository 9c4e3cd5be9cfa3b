//! Error types for Tabula core.

use thiserror::Error;

use tabula_engine::engine::{FormulaParseError, Position};

/// Errors that abort a sheet operation.
///
/// Every variant leaves the sheet exactly as it was before the call.
/// Formula evaluation errors (`#DIV/0!` and friends) are values, not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaError {
    #[error("Invalid position: row {}, col {}", .0.row, .0.col)]
    InvalidPosition(Position),

    #[error("Circular dependency detected at {0}")]
    CircularDependency(Position),

    #[error(transparent)]
    FormulaParse(#[from] FormulaParseError),
}

pub type Result<T> = std::result::Result<T, TabulaError>;
