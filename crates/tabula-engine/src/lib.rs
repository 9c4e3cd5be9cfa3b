//! tabula_engine - Cell addressing, value model and Rhai-backed formulas.

pub(crate) mod builtins;
pub mod engine;
