//! Cell content, cache and adjacency.

use std::collections::HashSet;
use std::fmt;

use tabula_engine::engine::{CellValue, Formula, FormulaParseError, FormulaParser, Position};

/// Leading character that marks formula input.
pub const FORMULA_SIGN: char = '=';
/// Leading character that marks text which must not be read as a formula.
pub const ESCAPE_SIGN: char = '\'';

/// Stable handle of a cell inside its sheet's arena.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellId(pub(crate) usize);

/// What a cell holds.
pub enum CellContent {
    Empty,
    /// Raw text as entered, escape sign included.
    Text(String),
    Formula {
        formula: Box<dyn Formula>,
        /// Last computed value; `None` once invalidated.
        cache: Option<CellValue>,
    },
}

impl CellContent {
    /// Classify user input.
    /// - Empty string -> Empty
    /// - `=` followed by anything -> Formula (parsed without the `=`)
    /// - Otherwise -> Text, including a lone `=`
    pub fn from_input(
        input: &str,
        parser: &dyn FormulaParser,
    ) -> Result<CellContent, FormulaParseError> {
        if input.is_empty() {
            return Ok(CellContent::Empty);
        }
        match input.strip_prefix(FORMULA_SIGN) {
            Some(source) if !source.is_empty() => Ok(CellContent::Formula {
                formula: parser.parse(source)?,
                cache: None,
            }),
            _ => Ok(CellContent::Text(input.to_string())),
        }
    }

    /// Positions the content reads from (empty unless it is a formula).
    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
            _ => &[],
        }
    }
}

impl fmt::Debug for CellContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellContent::Empty => f.write_str("Empty"),
            CellContent::Text(s) => f.debug_tuple("Text").field(s).finish(),
            CellContent::Formula { formula, cache } => f
                .debug_struct("Formula")
                .field("expression", &formula.expression())
                .field("cache", cache)
                .finish(),
        }
    }
}

/// A node of the sheet's dependency graph.
///
/// `references` and `dependents` are exact inverses of each other across the
/// sheet. Only [`crate::Sheet`] mutates them.
#[derive(Debug)]
pub struct Cell {
    position: Position,
    content: CellContent,
    pub(crate) references: HashSet<CellId>,
    pub(crate) dependents: HashSet<CellId>,
}

impl Cell {
    pub(crate) fn new_empty(position: Position) -> Cell {
        Cell {
            position,
            content: CellContent::Empty,
            references: HashSet::new(),
            dependents: HashSet::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.content, CellContent::Formula { .. })
    }

    /// Text as the user would edit it.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula { formula, .. } => {
                format!("{}{}", FORMULA_SIGN, formula.expression())
            }
        }
    }

    /// Value without evaluating anything.
    ///
    /// Returns `None` only for a formula whose cache has been invalidated; use
    /// [`crate::Sheet::value`] to recompute it.
    pub fn value(&self) -> Option<CellValue> {
        match &self.content {
            CellContent::Empty => Some(CellValue::empty()),
            CellContent::Text(s) => {
                let shown = s.strip_prefix(ESCAPE_SIGN).unwrap_or(s);
                Some(CellValue::Text(shown.to_string()))
            }
            CellContent::Formula { cache, .. } => cache.clone(),
        }
    }

    /// Positions this cell's formula reads from, sorted row-major.
    pub fn referenced_cells(&self) -> Vec<Position> {
        self.content.referenced_cells().to_vec()
    }

    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    pub fn dependent_count(&self) -> usize {
        self.dependents.len()
    }

    pub fn has_cached_value(&self) -> bool {
        matches!(self.content, CellContent::Formula { cache: Some(_), .. })
    }

    pub(crate) fn needs_evaluation(&self) -> bool {
        matches!(self.content, CellContent::Formula { cache: None, .. })
    }

    pub(crate) fn set_content(&mut self, content: CellContent) {
        self.content = content;
    }

    /// Drop the cached value. Returns whether there was one.
    pub(crate) fn invalidate(&mut self) -> bool {
        match &mut self.content {
            CellContent::Formula { cache, .. } => cache.take().is_some(),
            _ => false,
        }
    }

    pub(crate) fn store(&mut self, value: CellValue) {
        if let CellContent::Formula { cache, .. } = &mut self.content {
            *cache = Some(value);
        }
    }
}
