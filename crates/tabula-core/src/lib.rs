//! tabula-core - sheet model with dependency tracking and cached evaluation.

pub mod error;
pub mod sheet;

pub use error::{Result, TabulaError};
pub use sheet::{Cell, CellContent, CellId, CellMut, ESCAPE_SIGN, FORMULA_SIGN, Sheet};

pub use tabula_engine::engine::{CellValue, FormulaError, Position, Size};
