//! Formula engine API.
//!
//! This module provides everything the sheet needs to evaluate formulas:
//!
//! - [`Position`], [`Size`] - Cell addressing (A1 notation ↔ row/col indices)
//! - [`CellValue`], [`FormulaError`] - The value model cells expose
//! - [`Formula`], [`FormulaParser`], [`CellLookup`] - The evaluator seam
//! - [`RhaiFormulaParser`] - Default evaluator backed by Rhai
//! - [`extract_references`] - Positions a formula reads from
//! - [`preprocess_formula`] - Transform formulas for Rhai evaluation
//! - [`format_value`] - Format values for display

mod deps;
mod eval;
mod format;
mod formula;
mod position;
mod preprocess;
mod value;

use dashmap::DashMap;
use std::sync::Arc;

pub use deps::extract_references;
pub use eval::{
    EngineConfig, classify_error, compile_functions, create_engine, create_engine_with_config,
    dynamic_to_value, eval_formula,
};
pub use format::{format_number, format_value};
pub use formula::{CellLookup, Formula, FormulaParseError, FormulaParser, RhaiFormula, RhaiFormulaParser};
pub use position::{Position, Size};
pub use preprocess::{canonical_formula, preprocess_formula};
pub use value::{CellValue, FormulaError};

pub use rhai::{AST, Dynamic};

/// Values of the cells a formula references, published to the engine's
/// `CELL`/`VALUE` builtins for the duration of one evaluation.
/// Clones share one map.
pub type ReferenceValues = Arc<DashMap<Position, CellValue>>;
