//! Rhai engine creation and result mapping.
//!
//! Creates the Rhai scripting engine with the spreadsheet builtins registered
//! and turns whatever an evaluation produces (a value or an error) into a
//! [`CellValue`]. Evaluation never fails from the caller's point of view:
//! domain errors become [`FormulaError`] values.

use rhai::{Engine, EvalAltResult};
use serde::{Deserialize, Serialize};

use super::{AST, CellValue, Dynamic, FormulaError, ReferenceValues};

/// Limits applied to every engine created for formula evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of Rhai operations per evaluation (0 = unlimited).
    pub max_operations: u64,
    /// Maximum expression nesting depth (0 = unlimited).
    pub max_expr_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_operations: 100_000,
            max_expr_depth: 64,
        }
    }
}

/// Create a Rhai engine with built-ins registered.
pub fn create_engine(values: ReferenceValues) -> Engine {
    create_engine_with_config(values, &EngineConfig::default())
}

/// Create a Rhai engine with built-ins registered and the given limits applied.
pub fn create_engine_with_config(values: ReferenceValues, config: &EngineConfig) -> Engine {
    let mut engine = Engine::new();
    engine.set_max_operations(config.max_operations);
    // Unknown names fail at compile time instead of evaluating to #VALUE!.
    engine.set_strict_variables(true);
    // Function bodies in custom scripts get the same budget as expressions.
    engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
    crate::builtins::register_builtins(&mut engine, values);
    engine
}

/// Compile custom functions (a script of `fn` definitions).
/// Returns the compiled AST, or an error message suitable for display.
pub fn compile_functions(engine: &Engine, script: &str) -> Result<AST, String> {
    engine.compile(script).map_err(|e| {
        log::debug!("custom functions failed to compile: {}", e);
        format!("Error in custom functions: {}", e)
    })
}

/// Evaluate a compiled formula, optionally merged with custom functions.
pub fn eval_formula(engine: &Engine, formula: &AST, custom_ast: Option<&AST>) -> CellValue {
    let result = match custom_ast {
        Some(functions) => {
            let merged = functions.merge(formula);
            engine.eval_ast::<Dynamic>(&merged)
        }
        None => engine.eval_ast::<Dynamic>(formula),
    };
    match result {
        Ok(value) => dynamic_to_value(value),
        Err(err) => CellValue::Error(classify_error(&err)),
    }
}

/// Map a Rhai result onto the closed value model.
pub fn dynamic_to_value(value: Dynamic) -> CellValue {
    if let Ok(n) = value.as_float() {
        return finite(n);
    }
    if let Ok(n) = value.as_int() {
        return finite(n as f64);
    }
    if let Ok(b) = value.as_bool() {
        return CellValue::Text(if b { "TRUE" } else { "FALSE" }.to_string());
    }
    if value.is_string() {
        if let Ok(s) = value.into_string() {
            return CellValue::Text(s);
        }
    }
    CellValue::Error(FormulaError::Value)
}

fn finite(n: f64) -> CellValue {
    if n.is_finite() {
        CellValue::Number(n)
    } else {
        CellValue::Error(FormulaError::Div0)
    }
}

/// Map an evaluation error onto a formula error token.
///
/// Errors raised by builtins carry their token in the payload; errors from
/// nested function calls are unwrapped first.
pub fn classify_error(err: &EvalAltResult) -> FormulaError {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => classify_error(inner),
        EvalAltResult::ErrorRuntime(payload, _) => payload
            .clone()
            .into_string()
            .ok()
            .and_then(|token| token.parse::<FormulaError>().ok())
            .unwrap_or(FormulaError::Value),
        EvalAltResult::ErrorArithmetic(message, _) if message.to_lowercase().contains("zero") => {
            FormulaError::Div0
        }
        _ => FormulaError::Value,
    }
}
