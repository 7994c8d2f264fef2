//! Structural checks on a level's state. These should never fire; a
//! violation means a bug in the engine, not a gameplay condition.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::grid::Grid;
use crate::registry::PlayerRegistry;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invariant violation: {message}")]
pub struct InvariantViolation {
    pub message: String,
}

impl InvariantViolation {
    fn new(message: String) -> Self {
        Self { message }
    }
}

#[must_use]
pub fn check_invariants(grid: &Grid, registry: &PlayerRegistry) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let bounds = grid.bounds();

    let mut free_seen = HashSet::new();
    for cell in grid.free_cells() {
        if !free_seen.insert(*cell) {
            violations.push(InvariantViolation::new(format!(
                "cell {cell:?} listed as free more than once"
            )));
        }
        if grid.is_held(*cell) {
            violations.push(InvariantViolation::new(format!(
                "cell {cell:?} is both held and free"
            )));
        }
        if !bounds.contains(*cell) {
            violations.push(InvariantViolation::new(format!(
                "free cell {cell:?} lies outside {bounds:?}"
            )));
        }
    }
    for cell in grid.held_cells() {
        if !bounds.contains(cell) {
            violations.push(InvariantViolation::new(format!(
                "held cell {cell:?} lies outside {bounds:?}"
            )));
        }
    }
    let tracked = grid.held_count() + free_seen.len();
    if bounds.cell_count() != Some(tracked) {
        violations.push(InvariantViolation::new(format!(
            "held + free covers {tracked} cells, bounds have {:?}",
            bounds.cell_count()
        )));
    }

    let mut occupant = HashMap::new();
    for (id, player) in registry.iter() {
        if !bounds.contains(player.position) || !grid.is_held(player.position) {
            violations.push(InvariantViolation::new(format!(
                "player {id} at {:?} does not hold its cell",
                player.position
            )));
        }
        if let Some(other) = occupant.insert(player.position, id) {
            violations.push(InvariantViolation::new(format!(
                "players {other} and {id} share {:?}",
                player.position
            )));
        }
    }

    violations
}
