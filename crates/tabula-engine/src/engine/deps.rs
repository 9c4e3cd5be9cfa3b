//! Dependency extraction from formula strings.
//!
//! Finds every cell reference (`A1`, `@B2`) a formula reads from. The result
//! is what the sheet turns into reference edges, so it is deduplicated and
//! sorted row-major.
//!
//! Handles:
//! - Simple cell references: `A1`, `b2`
//! - Typed references: `@A1`
//! - Ignores references inside string literals and function names
//! - Drops references outside the sheet (those evaluate to `#REF!`)

use super::position::Position;
use super::preprocess::{Piece, split_formula};

/// Extract the positions a formula references, deduplicated and sorted.
pub fn extract_references(formula: &str) -> Vec<Position> {
    let mut refs: Vec<Position> = split_formula(formula)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Ref(token) => token.position,
            _ => None,
        })
        .collect();
    refs.sort_unstable();
    refs.dedup();
    refs
}
