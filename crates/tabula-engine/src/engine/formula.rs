//! The formula evaluator seam and its Rhai implementation.
//!
//! The sheet only knows about three traits:
//!
//! - [`FormulaParser`] turns formula source (without the leading `=`) into a
//!   [`Formula`].
//! - [`Formula`] evaluates against a read-only [`CellLookup`], renders its
//!   canonical text and reports the positions it references.
//! - [`CellLookup`] is the sheet snapshot a formula reads from.
//!
//! [`RhaiFormulaParser`] is the default implementation.

use std::sync::Arc;

use rhai::Engine;
use thiserror::Error;

use super::deps::extract_references;
use super::eval::{EngineConfig, compile_functions, create_engine_with_config, eval_formula};
use super::preprocess::{canonical_formula, preprocess_formula, reserved_name};
use super::{AST, CellValue, Position, ReferenceValues};

/// Formula source text could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse formula `{formula}`: {message}")]
pub struct FormulaParseError {
    pub formula: String,
    pub message: String,
}

/// Read-only view of cell values a formula evaluates against.
pub trait CellLookup {
    /// Current value at `pos`, or `None` if no cell is stored there.
    fn lookup(&self, pos: Position) -> Option<CellValue>;
}

/// A parsed, evaluable formula.
pub trait Formula: Send + Sync {
    /// Evaluate against `cells`. Domain errors come back as
    /// [`CellValue::Error`], never as a panic.
    fn evaluate(&self, cells: &dyn CellLookup) -> CellValue;

    /// Canonical expression text, without the leading `=`.
    fn expression(&self) -> String;

    /// Referenced positions, deduplicated and sorted.
    fn referenced_cells(&self) -> &[Position];
}

/// Parses formula source into [`Formula`] values.
pub trait FormulaParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Box<dyn Formula>, FormulaParseError>;
}

/// Formula parser backed by a shared Rhai engine.
pub struct RhaiFormulaParser {
    engine: Arc<Engine>,
    values: ReferenceValues,
    functions: Option<Arc<AST>>,
}

impl RhaiFormulaParser {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let values = ReferenceValues::default();
        let engine = create_engine_with_config(values.clone(), config);
        RhaiFormulaParser {
            engine: Arc::new(engine),
            values,
            functions: None,
        }
    }

    /// Create a parser whose formulas may call the functions defined in
    /// `script`. Returns an error message if the script does not compile.
    pub fn with_functions(config: &EngineConfig, script: &str) -> Result<Self, String> {
        let mut parser = Self::with_config(config);
        let ast = compile_functions(&parser.engine, script)?;
        parser.functions = Some(Arc::new(ast));
        Ok(parser)
    }

    pub fn has_functions(&self) -> bool {
        self.functions.is_some()
    }
}

impl Default for RhaiFormulaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaParser for RhaiFormulaParser {
    fn parse(&self, source: &str) -> Result<Box<dyn Formula>, FormulaParseError> {
        if let Some(name) = reserved_name(source) {
            return Err(FormulaParseError {
                formula: source.to_string(),
                message: format!("`{}` is reserved and cannot be used in a formula", name),
            });
        }
        let processed = preprocess_formula(source);
        let ast = self
            .engine
            .compile_expression(&processed)
            .map_err(|e| FormulaParseError {
                formula: source.to_string(),
                message: e.to_string(),
            })?;

        Ok(Box::new(RhaiFormula {
            engine: self.engine.clone(),
            values: self.values.clone(),
            functions: self.functions.clone(),
            ast,
            expression: canonical_formula(source),
            references: extract_references(source),
        }))
    }
}

/// A compiled formula sharing its parser's engine.
pub struct RhaiFormula {
    engine: Arc<Engine>,
    values: ReferenceValues,
    functions: Option<Arc<AST>>,
    ast: AST,
    expression: String,
    references: Vec<Position>,
}

impl Formula for RhaiFormula {
    fn evaluate(&self, cells: &dyn CellLookup) -> CellValue {
        for &pos in &self.references {
            match cells.lookup(pos) {
                Some(value) => {
                    self.values.insert(pos, value);
                }
                None => {
                    self.values.remove(&pos);
                }
            }
        }

        let value = eval_formula(&self.engine, &self.ast, self.functions.as_deref());

        for pos in &self.references {
            self.values.remove(pos);
        }
        value
    }

    fn expression(&self) -> String {
        self.expression.clone()
    }

    fn referenced_cells(&self) -> &[Position] {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FormulaError;
    use std::collections::HashMap;

    struct Cells(HashMap<Position, CellValue>);

    impl CellLookup for Cells {
        fn lookup(&self, pos: Position) -> Option<CellValue> {
            self.0.get(&pos).cloned()
        }
    }

    fn cells(entries: &[(&str, CellValue)]) -> Cells {
        Cells(
            entries
                .iter()
                .map(|(name, value)| (Position::from_a1(name).unwrap(), value.clone()))
                .collect(),
        )
    }

    fn eval(source: &str, cells: &Cells) -> CellValue {
        RhaiFormulaParser::new().parse(source).unwrap().evaluate(cells)
    }

    #[test]
    fn test_arithmetic_is_floating_point() {
        let empty = cells(&[]);
        assert_eq!(eval("1+2", &empty), CellValue::Number(3.0));
        assert_eq!(eval("7/2", &empty), CellValue::Number(3.5));
        assert_eq!(eval("(1 + 2) * 3 - 4 / 2", &empty), CellValue::Number(7.0));
    }

    #[test]
    fn test_references_read_lookup() {
        let sheet = cells(&[("A1", CellValue::Number(3.0)), ("B2", CellValue::from("4"))]);
        assert_eq!(eval("A1*2 + B2", &sheet), CellValue::Number(10.0));
    }

    #[test]
    fn test_absent_and_empty_cells_read_as_zero() {
        let sheet = cells(&[("A1", CellValue::empty())]);
        assert_eq!(eval("A1 + C3 + 1", &sheet), CellValue::Number(1.0));
    }

    #[test]
    fn test_division_by_zero() {
        let empty = cells(&[]);
        assert_eq!(eval("1/0", &empty), CellValue::Error(FormulaError::Div0));
        assert_eq!(eval("1/A1", &empty), CellValue::Error(FormulaError::Div0));
    }

    #[test]
    fn test_text_operand_is_value_error() {
        let sheet = cells(&[("A1", CellValue::from("abc"))]);
        assert_eq!(eval("A1 + 1", &sheet), CellValue::Error(FormulaError::Value));
    }

    #[test]
    fn test_errors_propagate_from_references() {
        let sheet = cells(&[("A1", CellValue::Error(FormulaError::Div0))]);
        assert_eq!(eval("A1 + 1", &sheet), CellValue::Error(FormulaError::Div0));
        assert_eq!(eval("len(@A1)", &sheet), CellValue::Error(FormulaError::Div0));
    }

    #[test]
    fn test_reference_outside_sheet_is_ref_error() {
        let empty = cells(&[]);
        let formula = RhaiFormulaParser::new().parse("A1 + ZZZZ1").unwrap();
        assert_eq!(formula.referenced_cells(), &[Position::new(0, 0)]);
        assert_eq!(formula.evaluate(&empty), CellValue::Error(FormulaError::Ref));
    }

    #[test]
    fn test_typed_reference_keeps_text() {
        let sheet = cells(&[("A1", CellValue::from("hello"))]);
        assert_eq!(eval("len(@A1)", &sheet), CellValue::Number(5.0));
        assert_eq!(eval(r#"@A1 + "!""#, &sheet), CellValue::from("hello!"));
    }

    #[test]
    fn test_expression_and_references() {
        let formula = RhaiFormulaParser::new().parse(" b2 + a1 + A1 ").unwrap();
        assert_eq!(formula.expression(), "B2+A1+A1");
        assert_eq!(
            formula.referenced_cells(),
            &[Position::new(0, 0), Position::new(1, 1)]
        );
    }

    #[test]
    fn test_parse_error() {
        let err = RhaiFormulaParser::new().parse("1 +").err().unwrap();
        assert_eq!(err.formula, "1 +");
        assert!(!err.message.is_empty());
        assert!(RhaiFormulaParser::new().parse("let x = 1; x").is_err());
    }

    #[test]
    fn test_reference_builtins_are_not_callable() {
        let parser = RhaiFormulaParser::new();
        for source in [
            "CELL(0x0, 0x1)",
            "1 + VALUE (0, 0)",
            "REF_ERROR()",
            r#"Fn("CELL").call(0x0, 0x1)"#,
            r#"eval("A1")"#,
        ] {
            let err = parser.parse(source).err().unwrap();
            assert!(err.message.contains("reserved"), "{}: {}", source, err.message);
        }
        let sheet = cells(&[("B1", CellValue::Number(5.0))]);
        assert_eq!(eval(r#"len("CELL(0, 1)") + B1"#, &sheet), CellValue::Number(15.0));
    }

    #[test]
    fn test_undefined_variables_are_parse_errors() {
        let parser = RhaiFormulaParser::new();
        assert!(parser.parse("foo").is_err());
        assert!(parser.parse("A1 + B").is_err());
    }

    #[test]
    fn test_snapshot_entries_are_removed_after_evaluation() {
        let parser = RhaiFormulaParser::new();
        let sheet = cells(&[("A1", CellValue::Number(1.0))]);
        parser.parse("A1").unwrap().evaluate(&sheet);
        assert!(parser.values.is_empty());
    }

    #[test]
    fn test_custom_functions_are_callable() {
        let parser =
            RhaiFormulaParser::with_functions(&EngineConfig::default(), "fn triple(x) { x * 3.0 }")
                .unwrap();
        assert!(parser.has_functions());
        let sheet = cells(&[("A1", CellValue::Number(2.0))]);
        let formula = parser.parse("triple(A1)").unwrap();
        assert_eq!(formula.evaluate(&sheet), CellValue::Number(6.0));
    }

    #[test]
    fn test_custom_functions_with_syntax_error() {
        let result = RhaiFormulaParser::with_functions(&EngineConfig::default(), "fn broken( {");
        assert!(result.is_err());
    }
}
