use std::collections::HashMap;

use tabula_engine::engine::{CellLookup, CellValue, FormulaParser, Position, RhaiFormulaParser, Size};

use super::cell::{Cell, CellId};
use crate::error::{Result, TabulaError};

/// A sheet of cells and the dependency graph between them.
///
/// The sheet is the only owner of cell storage. Cells live in an arena and
/// refer to each other through [`CellId`] handles; the position index maps
/// every stored position to its handle.
pub struct Sheet {
    /// Cell arena; `None` marks a free slot.
    pub(crate) cells: Vec<Option<Cell>>,
    /// Free arena slots, reused before the arena grows.
    pub(crate) free: Vec<CellId>,
    pub(crate) index: HashMap<Position, CellId>,
    /// One past the largest stored row/column.
    pub(crate) size: Size,
    pub(crate) parser: Box<dyn FormulaParser>,
}

impl Sheet {
    /// Create an empty sheet using the default Rhai formula evaluator.
    pub fn new() -> Self {
        Self::with_parser(Box::new(RhaiFormulaParser::new()))
    }

    /// Create an empty sheet that parses formulas with `parser`.
    pub fn with_parser(parser: Box<dyn FormulaParser>) -> Self {
        Sheet {
            cells: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            size: Size::default(),
            parser,
        }
    }

    /// Cell stored at `pos`, if any.
    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>> {
        check_position(pos)?;
        Ok(self.id_of(pos).map(|id| self.slot(id)))
    }

    pub fn printable_size(&self) -> Size {
        self.size
    }

    /// Number of stored cells, including empty cells kept alive by references.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Stored positions, in no particular order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.index.keys().copied()
    }

    pub(crate) fn id_of(&self, pos: Position) -> Option<CellId> {
        self.index.get(&pos).copied()
    }

    pub(crate) fn slot(&self, id: CellId) -> &Cell {
        self.cells
            .get(id.0)
            .and_then(Option::as_ref)
            .expect("cell handle must point at a live cell")
    }

    pub(crate) fn slot_mut(&mut self, id: CellId) -> &mut Cell {
        self.cells
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .expect("cell handle must point at a live cell")
    }

    /// Fetch the cell at `pos`, creating an empty one if none is stored.
    pub(crate) fn ensure_cell(&mut self, pos: Position) -> CellId {
        if let Some(id) = self.id_of(pos) {
            return id;
        }

        let cell = Cell::new_empty(pos);
        let id = match self.free.pop() {
            Some(id) => {
                self.cells[id.0] = Some(cell);
                id
            }
            None => {
                self.cells.push(Some(cell));
                CellId(self.cells.len() - 1)
            }
        };
        self.index.insert(pos, id);
        self.size.rows = self.size.rows.max(pos.row + 1);
        self.size.cols = self.size.cols.max(pos.col + 1);
        id
    }

    /// Free the storage of a cell that nothing references any more.
    pub(crate) fn release(&mut self, id: CellId) {
        let cell = self.cells[id.0]
            .take()
            .expect("released cell handle must point at a live cell");
        debug_assert!(cell.dependents.is_empty() && cell.references.is_empty());

        let pos = cell.position();
        self.index.remove(&pos);
        self.free.push(id);

        if self.size.rows == pos.row + 1 || self.size.cols == pos.col + 1 {
            self.recompute_size();
        }
    }

    fn recompute_size(&mut self) {
        self.size = self.index.keys().fold(Size::default(), |size, pos| Size {
            rows: size.rows.max(pos.row + 1),
            cols: size.cols.max(pos.col + 1),
        });
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl CellLookup for Sheet {
    fn lookup(&self, pos: Position) -> Option<CellValue> {
        self.id_of(pos).and_then(|id| self.slot(id).value())
    }
}

pub(crate) fn check_position(pos: Position) -> Result<()> {
    if pos.is_valid() {
        Ok(())
    } else {
        Err(TabulaError::InvalidPosition(pos))
    }
}
