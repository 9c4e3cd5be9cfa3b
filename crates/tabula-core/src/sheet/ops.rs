use std::collections::HashSet;

use tabula_engine::engine::{CellValue, Position};

use super::cell::{Cell, CellContent, CellId};
use super::graph::{invalidate_from, would_create_cycle};
use super::state::{Sheet, check_position};
use crate::error::{Result, TabulaError};

impl Sheet {
    /// Set cell contents from input text.
    ///
    /// Parsing and the cycle check run before anything is touched, so a
    /// failed edit leaves the sheet exactly as it was.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        check_position(pos)?;
        let content = CellContent::from_input(text, self.parser.as_ref())?;
        self.commit(pos, content)?;
        log::debug!("set {} to {:?}", pos, text);
        Ok(())
    }

    /// Mutable handle to the cell at `pos`, if one is stored.
    pub fn cell_mut(&mut self, pos: Position) -> Result<Option<CellMut<'_>>> {
        check_position(pos)?;
        Ok(self.id_of(pos).map(|id| CellMut { sheet: self, id }))
    }

    /// Clear the cell at `pos`.
    ///
    /// A cell other formulas still read from is kept as an empty cell; any
    /// other cell is removed and the printable area shrinks around it.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        check_position(pos)?;
        let Some(id) = self.id_of(pos) else {
            return Ok(());
        };

        self.apply(id, CellContent::Empty, HashSet::new());
        if self.slot(id).has_dependents() {
            log::debug!("cleared {}, kept for its dependents", pos);
        } else {
            self.release(id);
            log::debug!("removed {}", pos);
        }
        Ok(())
    }

    /// Validate and install new content at `pos`.
    fn commit(&mut self, pos: Position, content: CellContent) -> Result<CellId> {
        let references = content.referenced_cells();
        for &r in references {
            check_position(r)?;
        }
        if would_create_cycle(self, pos, references) {
            log::debug!("rejected edit of {}: circular reference", pos);
            return Err(TabulaError::CircularDependency(pos));
        }

        let references = references.to_vec();
        let id = self.ensure_cell(pos);
        let targets = references.into_iter().map(|r| self.ensure_cell(r)).collect();
        self.apply(id, content, targets);
        Ok(id)
    }

    /// Swap in new content and outgoing edges, then invalidate dependents.
    ///
    /// `targets` must already be checked for cycles.
    fn apply(&mut self, id: CellId, content: CellContent, targets: HashSet<CellId>) {
        self.detach_references(id);
        for &target in &targets {
            self.slot_mut(target).dependents.insert(id);
        }

        let cell = self.slot_mut(id);
        cell.references = targets;
        cell.set_content(content);
        invalidate_from(self, id);
    }

    fn detach_references(&mut self, id: CellId) {
        let old = std::mem::take(&mut self.slot_mut(id).references);
        for target in old {
            self.slot_mut(target).dependents.remove(&id);
        }
    }
}

/// Mutable access to a stored cell.
///
/// Every change goes through the owning [`Sheet`], so the dependency graph
/// and caches stay consistent.
pub struct CellMut<'a> {
    sheet: &'a mut Sheet,
    id: CellId,
}

impl CellMut<'_> {
    pub fn position(&self) -> Position {
        self.cell().position()
    }

    pub fn cell(&self) -> &Cell {
        self.sheet.slot(self.id)
    }

    /// Same as [`Sheet::set_cell`] at this cell's position.
    pub fn set(&mut self, text: &str) -> Result<()> {
        let pos = self.position();
        let content = CellContent::from_input(text, self.sheet.parser.as_ref())?;
        self.sheet.commit(pos, content)?;
        Ok(())
    }

    /// Reset to empty content. The cell itself stays in the sheet.
    pub fn clear(&mut self) {
        self.sheet.apply(self.id, CellContent::Empty, HashSet::new());
    }

    pub fn value(&mut self) -> CellValue {
        self.sheet.evaluate(self.id)
    }

    pub fn text(&self) -> String {
        self.cell().text()
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        self.cell().referenced_cells()
    }
}
