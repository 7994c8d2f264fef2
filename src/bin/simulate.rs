use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use city_server::constants::DEFAULT_MAX_LEVEL_CELLS;
use city_server::grid::Bounds;
use city_server::telemetry::init_tracing;
use city_server::types::{Direction, Position};
use city_server::{Level, LevelError, LevelOptions, MoveOutcome};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a level with concurrent random bots")]
struct Cli {
    #[arg(long, default_value_t = 8)]
    bots: usize,
    #[arg(long, default_value_t = 500)]
    steps: usize,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 12)]
    width: u32,
    #[arg(long, default_value_t = 12)]
    height: u32,
    #[arg(long, default_value_t = 20)]
    obstacles: usize,
    /// Idle threshold for the sweeper thread, in milliseconds.
    #[arg(long, default_value_t = 50)]
    timeout_ms: u64,
    /// Chance that a bot sends a heartbeat after a move.
    #[arg(long, default_value_t = 0.9)]
    heartbeat_rate: f64,
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Default)]
struct Counters {
    joins: AtomicU64,
    join_failures: AtomicU64,
    moves: AtomicU64,
    blocked: AtomicU64,
    attacks: AtomicU64,
    defeats: AtomicU64,
    evicted_rejoins: AtomicU64,
    sweeps: AtomicU64,
    violations: AtomicU64,
    crashed_bots: AtomicU64,
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    bots: usize,
    steps: usize,
    bounds: Bounds,
    joins: u64,
    #[serde(rename = "joinFailures")]
    join_failures: u64,
    moves: u64,
    blocked: u64,
    attacks: u64,
    defeats: u64,
    #[serde(rename = "evictedRejoins")]
    evicted_rejoins: u64,
    sweeps: u64,
    #[serde(rename = "finalPlayers")]
    final_players: usize,
    violations: u64,
    #[serde(rename = "crashedBots")]
    crashed_bots: u64,
    #[serde(rename = "finalViolations")]
    final_violations: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, false);

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    let bounds = Bounds::new(0, 0, cli.width, cli.height);
    if !bounds.fits_within(DEFAULT_MAX_LEVEL_CELLS) {
        eprintln!(
            "[simulate] {}x{} exceeds the limit of {DEFAULT_MAX_LEVEL_CELLS} cells",
            cli.width, cli.height
        );
        return ExitCode::FAILURE;
    }
    let obstacles = random_obstacles(bounds, cli.obstacles, seed);
    let level = Level::new(
        bounds,
        obstacles,
        LevelOptions {
            seed: Some(seed),
            ..LevelOptions::default()
        },
    );

    let counters = Counters::default();
    let done = AtomicBool::new(false);
    let timeout = Duration::from_millis(cli.timeout_ms);

    thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                thread::sleep(timeout / 2);
                level.sweep_idle(timeout);
                counters.sweeps.fetch_add(1, Ordering::Relaxed);
                record_violations(&level, &counters);
            }
        });

        let bots: Vec<_> = (0..cli.bots)
            .map(|bot| {
                let level = &level;
                let counters = &counters;
                let cli = &cli;
                scope.spawn(move || run_bot(level, counters, cli, seed.wrapping_add(bot as u64 + 1)))
            })
            .collect();
        join_bots(bots, &counters);
        done.store(true, Ordering::Relaxed);
    });

    let final_violations: Vec<String> = level
        .check_invariants()
        .iter()
        .map(ToString::to_string)
        .collect();
    let summary = Summary {
        seed,
        bots: cli.bots,
        steps: cli.steps,
        bounds,
        joins: counters.joins.load(Ordering::Relaxed),
        join_failures: counters.join_failures.load(Ordering::Relaxed),
        moves: counters.moves.load(Ordering::Relaxed),
        blocked: counters.blocked.load(Ordering::Relaxed),
        attacks: counters.attacks.load(Ordering::Relaxed),
        defeats: counters.defeats.load(Ordering::Relaxed),
        evicted_rejoins: counters.evicted_rejoins.load(Ordering::Relaxed),
        sweeps: counters.sweeps.load(Ordering::Relaxed),
        final_players: level.player_count(),
        violations: counters.violations.load(Ordering::Relaxed),
        crashed_bots: counters.crashed_bots.load(Ordering::Relaxed),
        final_violations,
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("[simulate] failed to encode summary: {err}");
            return ExitCode::FAILURE;
        }
    }
    if summary.failed() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

impl Summary {
    fn failed(&self) -> bool {
        self.violations > 0 || self.crashed_bots > 0 || !self.final_violations.is_empty()
    }
}

/// Joins every bot, counting the ones that panicked.
fn join_bots(bots: Vec<thread::ScopedJoinHandle<'_, ()>>, counters: &Counters) {
    for bot in bots {
        if bot.join().is_err() {
            tracing::error!("bot thread panicked");
            counters.crashed_bots.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn random_obstacles(bounds: Bounds, count: usize, seed: u64) -> Vec<Position> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cells: Vec<Position> = bounds.cells().collect();
    let target = count.min(cells.len());
    let mut picked = Vec::with_capacity(target);
    while picked.len() < target {
        let idx = rng.random_range(0..cells.len());
        picked.push(cells.swap_remove(idx));
    }
    picked
}

fn run_bot(level: &Level, counters: &Counters, cli: &Cli, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut id = None;

    for _ in 0..cli.steps {
        let player_id = match id {
            Some(player_id) => player_id,
            None => match level.join() {
                Ok(player_id) => {
                    counters.joins.fetch_add(1, Ordering::Relaxed);
                    id = Some(player_id);
                    player_id
                }
                Err(_) => {
                    counters.join_failures.fetch_add(1, Ordering::Relaxed);
                    thread::yield_now();
                    continue;
                }
            },
        };

        let dir = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        match level.move_player(player_id, dir) {
            Ok(MoveOutcome::Moved { .. }) => {
                counters.moves.fetch_add(1, Ordering::Relaxed);
            }
            Ok(MoveOutcome::Blocked { .. }) => {
                counters.blocked.fetch_add(1, Ordering::Relaxed);
            }
            Ok(MoveOutcome::Attacked { defeated, .. }) => {
                counters.attacks.fetch_add(1, Ordering::Relaxed);
                if defeated {
                    counters.defeats.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(LevelError::UnknownPlayer(_)) => {
                counters.evicted_rejoins.fetch_add(1, Ordering::Relaxed);
                id = None;
                continue;
            }
            Err(LevelError::EmptyGrid) => {}
        }

        if rng.random_bool(cli.heartbeat_rate.clamp(0.0, 1.0))
            && level.heartbeat(player_id).is_err()
        {
            id = None;
        }
        thread::sleep(Duration::from_micros(200));
    }
}

fn record_violations(level: &Level, counters: &Counters) {
    let violations = level.check_invariants();
    if violations.is_empty() {
        return;
    }
    for violation in &violations {
        tracing::error!(%violation, "invariant broken during simulation");
    }
    counters
        .violations
        .fetch_add(violations.len() as u64, Ordering::Relaxed);
}
