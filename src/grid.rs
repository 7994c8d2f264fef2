use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::error::LevelError;
use crate::rng::Rng;
use crate::types::Position;

/// Axis-aligned rectangle of cells. `width == 0` or `height == 0` is the empty box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every given position.
    pub fn enclosing(positions: impl IntoIterator<Item = Position>) -> Self {
        let mut iter = positions.into_iter();
        let Some(first) = iter.next() else {
            return Self::EMPTY;
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for pos in iter {
            min_x = min_x.min(pos.x);
            min_y = min_y.min(pos.y);
            max_x = max_x.max(pos.x);
            max_y = max_y.max(pos.y);
        }
        Self::new(
            min_x,
            min_y,
            max_x.abs_diff(min_x).saturating_add(1),
            max_y.abs_diff(min_y).saturating_add(1),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, pos: Position) -> bool {
        let dx = i64::from(pos.x) - i64::from(self.x);
        let dy = i64::from(pos.y) - i64::from(self.y);
        (0..i64::from(self.width)).contains(&dx) && (0..i64::from(self.height)).contains(&dy)
    }

    /// `None` when the area does not fit in `usize`.
    pub fn cell_count(&self) -> Option<usize> {
        usize::try_from(self.width)
            .ok()?
            .checked_mul(usize::try_from(self.height).ok()?)
    }

    pub fn fits_within(&self, max_cells: usize) -> bool {
        self.cell_count().is_some_and(|cells| cells <= max_cells)
    }

    pub fn cells(self) -> impl Iterator<Item = Position> {
        let (x0, y0) = (i64::from(self.x), i64::from(self.y));
        let height = i64::from(self.height);
        (0..i64::from(self.width)).flat_map(move |dx| {
            (0..height).map(move |dy| Position::new((x0 + dx) as i32, (y0 + dy) as i32))
        })
    }
}

/// Partition of the cells inside `bounds` into held and free.
///
/// Construction walks every cell of `bounds`, so callers size-check the box
/// first (see [`Bounds::fits_within`]). Anything outside `bounds` reports as held and can never be freed, so the
/// box edge behaves like a wall of terrain.
#[derive(Clone, Debug)]
pub struct Grid {
    bounds: Bounds,
    held: HashSet<Position>,
    free: Vec<Position>,
}

impl Grid {
    pub fn new(bounds: Bounds, obstacles: impl IntoIterator<Item = Position>) -> Self {
        let mut held = HashSet::new();
        for pos in obstacles {
            if bounds.contains(pos) {
                held.insert(pos);
            } else {
                warn!(x = pos.x, y = pos.y, "obstacle outside level bounds ignored");
            }
        }
        let free = bounds.cells().filter(|pos| !held.contains(pos)).collect();
        Self { bounds, held, free }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn is_held(&self, pos: Position) -> bool {
        !self.bounds.contains(pos) || self.held.contains(&pos)
    }

    pub fn hold(&mut self, pos: Position) {
        if !self.bounds.contains(pos) || !self.held.insert(pos) {
            return;
        }
        if let Some(idx) = self.free.iter().position(|cell| *cell == pos) {
            self.free.swap_remove(idx);
        }
    }

    pub fn unhold(&mut self, pos: Position) {
        if self.held.remove(&pos) {
            self.free.push(pos);
        }
    }

    pub fn random_free(&self, rng: &mut Rng) -> Result<Position, LevelError> {
        if self.free.is_empty() {
            return Err(LevelError::EmptyGrid);
        }
        Ok(self.free[rng.pick_index(self.free.len())])
    }

    pub fn held_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.held.iter().copied()
    }

    pub fn free_cells(&self) -> &[Position] {
        &self.free
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
