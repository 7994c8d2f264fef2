use crate::types::PlayerId;

pub const DEFAULT_HEALTH: u32 = 100;
pub const CASTLE_DEFAULT_HEALTH: u32 = 100;

pub const MIN_ATTACK_FACTOR: f64 = 0.75;
pub const MAX_ATTACK_FACTOR: f64 = 1.25;

pub const FIRST_PLAYER_ID: PlayerId = 1;

pub const DEFAULT_PLAYER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LEVEL_PATH: &str = "level.txt";

/// Largest bounding box, in cells, a level may cover.
pub const DEFAULT_MAX_LEVEL_CELLS: usize = 1 << 22;

pub const SNAPSHOT_DELIMITER: char = ';';
