use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::combat::{self, AttackRange};
use crate::constants::{
    CASTLE_DEFAULT_HEALTH, DEFAULT_HEALTH, DEFAULT_MAX_LEVEL_CELLS, SNAPSHOT_DELIMITER,
};
use crate::error::{LayoutError, LevelError};
use crate::grid::{Bounds, Grid};
use crate::invariants::{check_invariants, InvariantViolation};
use crate::layout::Layout;
use crate::registry::PlayerRegistry;
use crate::rng::Rng;
use crate::types::{Castle, Direction, LevelSnapshot, PlayerId, PlayerView, Position};

#[derive(Clone, Debug)]
pub struct LevelOptions {
    pub default_health: u32,
    pub attack_range: AttackRange,
    pub seed: Option<u64>,
    /// Upper bound on the bounding box area accepted by [`Level::from_layout`].
    pub max_cells: usize,
}

impl Default for LevelOptions {
    fn default() -> Self {
        Self {
            default_health: DEFAULT_HEALTH,
            attack_range: AttackRange::default(),
            seed: None,
            max_cells: DEFAULT_MAX_LEVEL_CELLS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved {
        from: Position,
        to: Position,
    },
    /// Target is terrain or outside the level.
    Blocked {
        target: Position,
    },
    Attacked {
        defender: PlayerId,
        damage: u32,
        defeated: bool,
    },
}

impl MoveOutcome {
    pub fn moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

#[derive(Debug)]
struct LevelState {
    grid: Grid,
    registry: PlayerRegistry,
    rng: Rng,
    castles: Vec<Castle>,
    attack_range: AttackRange,
}

/// The authoritative world. Every public operation takes the single state
/// lock for its whole duration and never calls another locking method while
/// holding it.
#[derive(Debug)]
pub struct Level {
    state: Mutex<LevelState>,
}

impl Level {
    pub fn new(
        bounds: Bounds,
        obstacles: impl IntoIterator<Item = Position>,
        options: LevelOptions,
    ) -> Self {
        let rng = match options.seed {
            Some(seed) => Rng::new(seed),
            None => Rng::from_entropy(),
        };
        Self {
            state: Mutex::new(LevelState {
                grid: Grid::new(bounds, obstacles),
                registry: PlayerRegistry::new(options.default_health),
                rng,
                castles: Vec::new(),
                attack_range: options.attack_range,
            }),
        }
    }

    pub fn from_layout(layout: &Layout, options: LevelOptions) -> Result<Self, LayoutError> {
        let bounds = layout.checked_bounds(options.max_cells)?;
        let level = Self::new(bounds, layout.obstacles(), options);
        let placed_at = Utc::now();
        {
            let mut state = level.lock();
            state.castles = layout
                .castles()
                .map(|entity| Castle {
                    id: entity.id,
                    position: entity.position,
                    timestamp: placed_at,
                    health: CASTLE_DEFAULT_HEALTH,
                    owner: None,
                })
                .collect();
            let bounds = state.grid.bounds();
            info!(
                entities = layout.entities.len(),
                castles = state.castles.len(),
                skipped_lines = layout.warnings.len(),
                width = bounds.width,
                height = bounds.height,
                free_cells = state.grid.free_count(),
                "level loaded"
            );
        }
        Ok(level)
    }

    // Every operation commits fully or fails before writing, so the state
    // behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, LevelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn join(&self) -> Result<PlayerId, LevelError> {
        self.join_at(Utc::now())
    }

    pub fn join_at(&self, now: DateTime<Utc>) -> Result<PlayerId, LevelError> {
        let mut guard = self.lock();
        let LevelState {
            grid,
            registry,
            rng,
            ..
        } = &mut *guard;
        let id = registry.add(grid, rng, now)?;
        if let Some(player) = registry.get(id) {
            info!(
                player_id = id,
                health = player.health,
                x = player.position.x,
                y = player.position.y,
                "player joined"
            );
        }
        Ok(id)
    }

    pub fn move_player(
        &self,
        player_id: PlayerId,
        direction: Direction,
    ) -> Result<MoveOutcome, LevelError> {
        let mut guard = self.lock();
        let LevelState {
            grid,
            registry,
            rng,
            attack_range,
            ..
        } = &mut *guard;

        let player = registry
            .get(player_id)
            .ok_or(LevelError::UnknownPlayer(player_id))?;
        let from = player.position;
        let attacker_health = player.health;
        let target = from.offset(direction);

        if !grid.is_held(target) {
            registry.relocate(player_id, target, grid)?;
            debug!(player_id, ?direction, x = target.x, y = target.y, "player moved");
            return Ok(MoveOutcome::Moved { from, to: target });
        }

        let Some(defender) = registry.find_by_position(target) else {
            debug!(player_id, ?direction, "move blocked");
            return Ok(MoveOutcome::Blocked { target });
        };

        let strike = combat::resolve(rng, attacker_health, *attack_range);
        let defeated = registry.decrease_health(defender, strike.damage, grid, rng)?;
        debug!(
            attacker = player_id,
            defender,
            factor = strike.factor,
            damage = strike.damage,
            defeated,
            "attack resolved"
        );
        Ok(MoveOutcome::Attacked {
            defender,
            damage: strike.damage,
            defeated,
        })
    }

    pub fn heartbeat(&self, player_id: PlayerId) -> Result<(), LevelError> {
        self.heartbeat_at(player_id, Utc::now())
    }

    pub fn heartbeat_at(&self, player_id: PlayerId, now: DateTime<Utc>) -> Result<(), LevelError> {
        self.lock().registry.touch(player_id, now)
    }

    pub fn sweep_idle(&self, threshold: Duration) {
        self.sweep_idle_at(threshold, Utc::now());
    }

    pub fn sweep_idle_at(&self, threshold: Duration, now: DateTime<Utc>) {
        let mut guard = self.lock();
        let LevelState { grid, registry, .. } = &mut *guard;
        let removed = registry.sweep_expired(grid, now, threshold);
        if !removed.is_empty() {
            info!(
                ?removed,
                remaining = registry.len(),
                "evicted idle players"
            );
        }
    }

    /// `id:health:x:y` per player in ascending id order, joined by `;`.
    /// An empty level yields an empty string.
    pub fn snapshot(&self) -> String {
        let guard = self.lock();
        let mut out = String::new();
        for (idx, (id, player)) in guard.registry.iter().enumerate() {
            if idx > 0 {
                out.push(SNAPSHOT_DELIMITER);
            }
            let _ = write!(
                out,
                "{}:{}:{}:{}",
                id, player.health, player.position.x, player.position.y
            );
        }
        out
    }

    pub fn snapshot_view(&self) -> LevelSnapshot {
        let guard = self.lock();
        LevelSnapshot {
            players: guard.registry.views(),
            castles: guard.castles.clone(),
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<PlayerView> {
        let guard = self.lock();
        guard.registry.get(player_id).map(|player| PlayerView {
            id: player_id,
            health: player.health,
            x: player.position.x,
            y: player.position.y,
        })
    }

    pub fn player_count(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn castles(&self) -> Vec<Castle> {
        self.lock().castles.clone()
    }

    pub fn bounds(&self) -> Bounds {
        self.lock().grid.bounds()
    }

    pub fn free_cell_count(&self) -> usize {
        self.lock().grid.free_count()
    }

    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let guard = self.lock();
        check_invariants(&guard.grid, &guard.registry)
    }
}
