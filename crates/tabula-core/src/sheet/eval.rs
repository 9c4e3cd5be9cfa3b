//! Lazy formula evaluation.
//!
//! A formula is only computed when its value is read. Before a formula runs,
//! every formula it references must hold a cached value, because the
//! evaluator sees the sheet only through [`CellLookup`].
//!
//! [`CellLookup`]: tabula_engine::engine::CellLookup

use tabula_engine::engine::{CellValue, Position};

use super::cell::{CellContent, CellId};
use super::state::{Sheet, check_position};
use crate::error::Result;

impl Sheet {
    /// Value of the cell at `pos`, computing stale formulas on the way.
    /// An absent cell reads as empty text.
    pub fn value(&mut self, pos: Position) -> Result<CellValue> {
        check_position(pos)?;
        Ok(match self.id_of(pos) {
            Some(id) => self.evaluate(id),
            None => CellValue::empty(),
        })
    }

    /// Text of the cell at `pos` as the user would edit it.
    pub fn text(&self, pos: Position) -> Result<String> {
        Ok(self.cell(pos)?.map(|cell| cell.text()).unwrap_or_default())
    }

    pub(crate) fn evaluate(&mut self, id: CellId) -> CellValue {
        self.ensure_computed(id);
        self.slot(id)
            .value()
            .expect("formula cache must be filled after evaluation")
    }

    /// Fill the cache of `root` and of every stale formula it depends on,
    /// references first.
    fn ensure_computed(&mut self, root: CellId) {
        if !self.slot(root).needs_evaluation() {
            return;
        }

        // (cell, references already scheduled)
        let mut stack = vec![(root, false)];
        while let Some((id, ready)) = stack.pop() {
            if !self.slot(id).needs_evaluation() {
                continue;
            }
            if !ready {
                stack.push((id, true));
                let cell = self.slot(id);
                stack.extend(
                    cell.references
                        .iter()
                        .filter(|r| self.slot(**r).needs_evaluation())
                        .map(|&r| (r, false)),
                );
                continue;
            }

            let value = match self.slot(id).content() {
                CellContent::Formula { formula, .. } => formula.evaluate(&*self),
                _ => continue,
            };
            log::trace!("computed {} = {}", self.slot(id).position(), value);
            self.slot_mut(id).store(value);
        }
    }
}
