//! Built-in spreadsheet functions registered into the Rhai engine.
//!
//! Conventions:
//! - Spreadsheet-facing built-in names are ALL CAPS (e.g. `POW`, `SQRT`).
//! - `CELL`, `VALUE` and `REF_ERROR` are the targets preprocessing rewrites
//!   references into; formulas rarely call them by hand.
//! - Reference reads go through [`ReferenceValues`], the snapshot a formula
//!   fills in right before it is evaluated.

use crate::engine::{CellValue, FormulaError, Position, ReferenceValues};
use rhai::{Dynamic, Engine, EvalAltResult};

/// Raise a formula error as a Rhai runtime error.
///
/// The token is carried in the payload so evaluation can map it back.
pub(crate) fn formula_error(err: FormulaError) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(err.as_str().into(), rhai::Position::NONE).into()
}

fn position_arg(row: i64, col: i64) -> Result<Position, Box<EvalAltResult>> {
    let pos = match (usize::try_from(row), usize::try_from(col)) {
        (Ok(row), Ok(col)) => Position::new(row, col),
        _ => return Err(formula_error(FormulaError::Ref)),
    };
    if pos.is_valid() {
        Ok(pos)
    } else {
        Err(formula_error(FormulaError::Ref))
    }
}

/// Numeric reading of a referenced value.
///
/// - Absent or empty => 0
/// - Text => parsed as a number if the whole string is numeric
/// - Errors propagate
pub(crate) fn numeric_value(value: Option<&CellValue>) -> Result<f64, Box<EvalAltResult>> {
    match value {
        None => Ok(0.0),
        Some(CellValue::Number(n)) => Ok(*n),
        Some(CellValue::Text(s)) if s.is_empty() => Ok(0.0),
        Some(CellValue::Text(s)) => s
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| formula_error(FormulaError::Value)),
        Some(CellValue::Error(e)) => Err(formula_error(*e)),
    }
}

/// Typed reading of a referenced value: numbers stay numbers, text stays text.
pub(crate) fn typed_value(value: Option<&CellValue>) -> Result<Dynamic, Box<EvalAltResult>> {
    match value {
        None => Ok(Dynamic::from(String::new())),
        Some(CellValue::Number(n)) => Ok(Dynamic::from(*n)),
        Some(CellValue::Text(s)) => Ok(Dynamic::from(s.clone())),
        Some(CellValue::Error(e)) => Err(formula_error(*e)),
    }
}

/// Register all built-in functions into the Rhai engine.
pub fn register_builtins(engine: &mut Engine, values: ReferenceValues) {
    // CELL(row, col): numeric value at cell
    let cell_values = values.clone();
    engine.register_fn(
        "CELL",
        move |row: i64, col: i64| -> Result<f64, Box<EvalAltResult>> {
            let pos = position_arg(row, col)?;
            let entry = cell_values.get(&pos);
            numeric_value(entry.as_deref())
        },
    );

    // VALUE(row, col): typed value at cell (number/text) as Dynamic.
    // Empty cells => "" so things like `len(@A1)` behave intuitively.
    let typed_values = values;
    engine.register_fn(
        "VALUE",
        move |row: i64, col: i64| -> Result<Dynamic, Box<EvalAltResult>> {
            let pos = position_arg(row, col)?;
            let entry = typed_values.get(&pos);
            typed_value(entry.as_deref())
        },
    );

    // REF_ERROR(): stands in for a reference outside the sheet
    engine.register_fn("REF_ERROR", || -> Result<f64, Box<EvalAltResult>> {
        Err(formula_error(FormulaError::Ref))
    });

    // POW(base, exp): exponentiation
    // Literals are floats after preprocessing, but custom functions may pass ints.
    engine.register_fn("POW", |base: f64, exp: f64| -> f64 { base.powf(exp) });
    engine.register_fn("POW", |base: f64, exp: i64| -> f64 {
        base.powf(exp as f64)
    });
    engine.register_fn("POW", |base: i64, exp: f64| -> f64 {
        (base as f64).powf(exp)
    });
    engine.register_fn("POW", |base: i64, exp: i64| -> f64 {
        (base as f64).powf(exp as f64)
    });

    // SQRT(x): square root
    engine.register_fn("SQRT", |x: f64| -> f64 { x.sqrt() });
    engine.register_fn("SQRT", |x: i64| -> f64 { (x as f64).sqrt() });

    // ABS(x): absolute value
    engine.register_fn("ABS", |x: f64| -> f64 { x.abs() });
    engine.register_fn("ABS", |x: i64| -> f64 { (x as f64).abs() });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(values: &ReferenceValues) -> Engine {
        let mut engine = Engine::new();
        register_builtins(&mut engine, values.clone());
        engine
    }

    #[test]
    fn test_cell_reads_snapshot_values() {
        let values = ReferenceValues::default();
        values.insert(Position::new(0, 0), CellValue::Number(10.0));
        values.insert(Position::new(0, 1), CellValue::from("2.5"));

        let engine = engine_with(&values);
        let result: f64 = engine.eval("CELL(0, 0) + CELL(0, 1)").unwrap();
        assert_eq!(result, 12.5);
    }

    #[test]
    fn test_cell_treats_missing_and_empty_as_zero() {
        let values = ReferenceValues::default();
        values.insert(Position::new(0, 0), CellValue::empty());

        let engine = engine_with(&values);
        let result: f64 = engine.eval("CELL(0, 0) + CELL(5, 5)").unwrap();
        assert_eq!(result, 0.0);
    }

    #[test]
    fn test_cell_rejects_non_numeric_text() {
        let values = ReferenceValues::default();
        values.insert(Position::new(0, 0), CellValue::from("abc"));

        let engine = engine_with(&values);
        let err = engine.eval::<f64>("CELL(0, 0)").unwrap_err();
        assert!(err.to_string().contains("#VALUE!"));
    }

    #[test]
    fn test_value_returns_text() {
        let values = ReferenceValues::default();
        values.insert(Position::new(0, 0), CellValue::from("hello"));

        let engine = engine_with(&values);
        let result: i64 = engine.eval("len(VALUE(0, 0))").unwrap();
        assert_eq!(result, 5);
    }

    #[test]
    fn test_numeric_value_propagates_errors() {
        let err = numeric_value(Some(&CellValue::Error(FormulaError::Div0))).unwrap_err();
        assert!(err.to_string().contains("#DIV/0!"));
    }

    #[test]
    fn test_pow_and_sqrt() {
        let engine = engine_with(&ReferenceValues::default());
        let result: f64 = engine.eval("POW(2.0, 3.0) + SQRT(16.0) + ABS(-1.0)").unwrap();
        assert_eq!(result, 13.0);
    }
}
