//! The sheet: cell storage, the dependency graph and lazy evaluation.
//!
//! Cells are owned by the [`Sheet`] arena and link to each other through
//! [`CellId`] handles in both directions: `references` (what a formula reads)
//! and `dependents` (who reads this cell). Formula values are cached and
//! dropped by an invalidation sweep whenever a cell they depend on changes.

mod cell;
mod eval;
mod graph;
mod io;
mod ops;
mod state;

pub use cell::{Cell, CellContent, CellId, ESCAPE_SIGN, FORMULA_SIGN};
pub use ops::CellMut;
pub use state::Sheet;
