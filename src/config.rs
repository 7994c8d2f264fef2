use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

use crate::constants::{
    DEFAULT_HEALTH, DEFAULT_LEVEL_PATH, DEFAULT_MAX_LEVEL_CELLS, DEFAULT_PLAYER_TIMEOUT_SECS,
    DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL_MS,
};
use crate::level::LevelOptions;

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Authoritative world server for the grid contest")]
pub struct Cli {
    /// Level file with `<id> <type> <x> <y>` records. Env: LEVEL_FILE.
    #[arg(long)]
    pub level: Option<PathBuf>,
    /// Env: PORT.
    #[arg(long)]
    pub port: Option<u16>,
    /// Seconds without a heartbeat before a player is evicted. Env: PLAYER_TIMEOUT_SECS.
    #[arg(long)]
    pub player_timeout: Option<u64>,
    /// Env: SWEEP_INTERVAL_MS.
    #[arg(long)]
    pub sweep_interval_ms: Option<u64>,
    /// Fixed seed for the level's random source. Env: LEVEL_SEED.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Health given to the first player. Env: DEFAULT_HEALTH.
    #[arg(long)]
    pub default_health: Option<u32>,
    /// Largest level bounding box accepted, in cells. Env: LEVEL_MAX_CELLS.
    #[arg(long)]
    pub max_cells: Option<usize>,
    /// tracing filter directive. Env: LOG_LEVEL.
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub level_path: PathBuf,
    pub port: u16,
    pub player_timeout: Duration,
    pub sweep_interval: Duration,
    pub log_level: String,
    pub json_logs: bool,
    pub level: LevelOptions,
}

impl ServerConfig {
    pub fn from_env(cli: Cli) -> Self {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Command line wins over the environment; unparsable values fall back
    /// to defaults.
    pub fn resolve(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let level_path = cli
            .level
            .or_else(|| env("LEVEL_FILE").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEVEL_PATH));
        let port = cli.port.or_else(|| parse_env(&env, "PORT")).unwrap_or(DEFAULT_PORT);
        let player_timeout_secs = cli
            .player_timeout
            .or_else(|| parse_env(&env, "PLAYER_TIMEOUT_SECS"))
            .unwrap_or(DEFAULT_PLAYER_TIMEOUT_SECS);
        let sweep_interval_ms = cli
            .sweep_interval_ms
            .or_else(|| parse_env(&env, "SWEEP_INTERVAL_MS"))
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS)
            .max(1);
        let seed = cli.seed.or_else(|| parse_env(&env, "LEVEL_SEED"));
        let default_health = cli
            .default_health
            .or_else(|| parse_env(&env, "DEFAULT_HEALTH"))
            .filter(|health| *health > 0)
            .unwrap_or(DEFAULT_HEALTH);
        let max_cells = cli
            .max_cells
            .or_else(|| parse_env(&env, "LEVEL_MAX_CELLS"))
            .filter(|cells| *cells > 0)
            .unwrap_or(DEFAULT_MAX_LEVEL_CELLS);
        let log_level = cli
            .log_level
            .or_else(|| env("LOG_LEVEL"))
            .unwrap_or_else(|| "info".to_string());

        Self {
            level_path,
            port,
            player_timeout: Duration::from_secs(player_timeout_secs),
            sweep_interval: Duration::from_millis(sweep_interval_ms),
            log_level,
            json_logs: cli.json_logs,
            level: LevelOptions {
                default_health,
                seed,
                max_cells,
                ..LevelOptions::default()
            },
        }
    }
}

fn parse_env<T: FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    env(key).and_then(|value| value.trim().parse().ok())
}
