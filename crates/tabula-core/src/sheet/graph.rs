//! Dependency graph traversals.
//!
//! Both walks use an explicit stack so that long reference chains cannot
//! overflow the call stack.

use std::collections::HashSet;

use tabula_engine::engine::Position;

use super::cell::CellId;
use super::state::Sheet;

/// Check whether making `target` reference `provisional` would close a cycle.
///
/// Walks the existing reference graph from every provisional position. A node
/// is marked done only after all its references have been explored, so each
/// cell is expanded at most once per check.
pub(crate) fn would_create_cycle(sheet: &Sheet, target: Position, provisional: &[Position]) -> bool {
    if provisional.contains(&target) {
        return true;
    }
    // A target that does not exist yet has no dependents to reach it.
    let Some(target_id) = sheet.id_of(target) else {
        return false;
    };

    let mut done: HashSet<CellId> = HashSet::new();
    // (node, children already pushed)
    let mut stack: Vec<(CellId, bool)> = Vec::new();

    for &pos in provisional {
        let Some(start) = sheet.id_of(pos) else {
            continue;
        };
        if done.contains(&start) {
            continue;
        }
        stack.push((start, false));

        while let Some((id, expanded)) = stack.pop() {
            if id == target_id {
                return true;
            }
            if expanded {
                done.insert(id);
                continue;
            }
            if done.contains(&id) {
                continue;
            }
            stack.push((id, true));
            for &next in &sheet.slot(id).references {
                if !done.contains(&next) {
                    stack.push((next, false));
                }
            }
        }
    }
    false
}

/// Clear the cache of `start` and of every cell that transitively depends on
/// it. Returns how many caches were actually dropped.
pub(crate) fn invalidate_from(sheet: &mut Sheet, start: CellId) -> usize {
    let mut visited: HashSet<CellId> = HashSet::new();
    let mut stack = vec![start];
    let mut cleared = 0;

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let cell = sheet.slot_mut(id);
        if cell.invalidate() {
            cleared += 1;
        }
        stack.extend(cell.dependents.iter().copied().filter(|d| !visited.contains(d)));
    }

    log::trace!(
        "invalidated {} cached value(s) from {}",
        cleared,
        sheet.slot(start).position()
    );
    cleared
}
