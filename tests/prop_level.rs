//! Property tests driving a level through random operation sequences.

use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use city_server::grid::Bounds;
use city_server::layout::Layout;
use city_server::types::{Direction, PlayerId, Position};
use city_server::{Level, LevelError, LevelOptions, MoveOutcome};

#[derive(Clone, Debug)]
enum Op {
    Join,
    Move { slot: usize, dir: Direction },
    Heartbeat { slot: usize },
    Advance { secs: i64 },
    Sweep { threshold_secs: u64 },
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Right),
        Just(Direction::Down),
        Just(Direction::Left),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Join),
        6 => (0usize..8, direction()).prop_map(|(slot, dir)| Op::Move { slot, dir }),
        2 => (0usize..8).prop_map(|slot| Op::Heartbeat { slot }),
        1 => (1i64..20).prop_map(|secs| Op::Advance { secs }),
        1 => (1u64..40).prop_map(|threshold_secs| Op::Sweep { threshold_secs }),
    ]
}

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

fn obstacles(width: u32, height: u32, mask: u64) -> Vec<Position> {
    Bounds::new(0, 0, width, height)
        .cells()
        .enumerate()
        .filter(|(idx, _)| mask & (1 << (idx % 64)) != 0 && idx % 3 == 0)
        .map(|(_, pos)| pos)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_invariants_hold_after_every_operation(
        width in 1u32..6,
        height in 1u32..6,
        mask in any::<u64>(),
        seed in any::<u64>(),
        ops in prop::collection::vec(op(), 1..80),
    ) {
        let level = Level::new(
            Bounds::new(0, 0, width, height),
            obstacles(width, height, mask),
            LevelOptions { seed: Some(seed), ..LevelOptions::default() },
        );
        let mut now = start();
        let mut ids: Vec<PlayerId> = Vec::new();
        let mut last_id: PlayerId = 0;

        for op in ops {
            match op {
                Op::Join => match level.join_at(now) {
                    Ok(id) => {
                        prop_assert!(id > last_id);
                        last_id = id;
                        ids.push(id);
                    }
                    Err(err) => {
                        prop_assert_eq!(err, LevelError::EmptyGrid);
                        prop_assert_eq!(level.free_cell_count(), 0);
                    }
                },
                Op::Move { slot, dir } => {
                    if ids.is_empty() {
                        continue;
                    }
                    let id = ids[slot % ids.len()];
                    let Some(before) = level.player(id) else {
                        prop_assert_eq!(
                            level.move_player(id, dir),
                            Err(LevelError::UnknownPlayer(id))
                        );
                        continue;
                    };
                    let outcome = level.move_player(id, dir).expect("registered player");
                    let after = level.player(id).expect("mover stays registered");
                    prop_assert_eq!(after.health, before.health);
                    match outcome {
                        MoveOutcome::Moved { from, to } => {
                            prop_assert_eq!(from, Position::new(before.x, before.y));
                            prop_assert_eq!(to, Position::new(after.x, after.y));
                            prop_assert_eq!(to, from.offset(dir));
                        }
                        MoveOutcome::Blocked { .. } | MoveOutcome::Attacked { .. } => {
                            prop_assert_eq!((after.x, after.y), (before.x, before.y));
                        }
                    }
                    if let MoveOutcome::Attacked { defender, damage, .. } = outcome {
                        prop_assert_ne!(defender, id);
                        prop_assert!(level.player(defender).is_some());
                        let h = f64::from(before.health);
                        prop_assert!(f64::from(damage) >= (0.75 * h).round());
                        prop_assert!(f64::from(damage) <= (1.25 * h).round());
                    }
                }
                Op::Heartbeat { slot } => {
                    if ids.is_empty() {
                        continue;
                    }
                    let id = ids[slot % ids.len()];
                    let registered = level.player(id).is_some();
                    prop_assert_eq!(level.heartbeat_at(id, now).is_ok(), registered);
                }
                Op::Advance { secs } => {
                    now += chrono::TimeDelta::seconds(secs);
                }
                Op::Sweep { threshold_secs } => {
                    let before = level.player_count();
                    level.sweep_idle_at(Duration::from_secs(threshold_secs), now);
                    prop_assert!(level.player_count() <= before);
                }
            }

            let violations = level.check_invariants();
            prop_assert!(violations.is_empty(), "{:?}", violations);
            let bounds = level.bounds();
            let held_by_players = level.player_count();
            prop_assert!(Some(level.free_cell_count() + held_by_players) <= bounds.cell_count());
        }
    }

    #[test]
    fn prop_terrain_never_moves_anyone(
        seed in any::<u64>(),
        dir in direction(),
        steps in 1usize..20,
    ) {
        // A single free cell ringed by terrain: every move is blocked.
        let layout = Layout::parse(
            "1 tree 0 0\n2 tree 1 0\n3 tree 2 0\n4 tree 0 1\n5 tree 2 1\n6 tree 0 2\n7 tree 1 2\n8 tree 2 2",
        );
        let level = Level::from_layout(&layout, LevelOptions { seed: Some(seed), ..LevelOptions::default() })
            .expect("small level");
        let id = level.join().expect("one free cell");
        for _ in 0..steps {
            let outcome = level.move_player(id, dir).expect("registered");
            prop_assert!(!outcome.moved());
            let is_blocked = matches!(outcome, MoveOutcome::Blocked { .. });
            prop_assert!(is_blocked);
        }
        let view = level.player(id).expect("player");
        prop_assert_eq!((view.x, view.y), (1, 1));
    }

    #[test]
    fn prop_sweep_removes_exactly_the_idle(
        joins in prop::collection::vec(0i64..100, 1..8),
        now_offset in 0i64..150,
        threshold_secs in 0u64..100,
    ) {
        let level = Level::new(
            Bounds::new(0, 0, 4, 4),
            [],
            LevelOptions { seed: Some(1), ..LevelOptions::default() },
        );
        let base = start();
        let ids: Vec<(PlayerId, i64)> = joins
            .iter()
            .map(|offset| {
                let id = level.join_at(base).expect("free cell");
                level
                    .heartbeat_at(id, base + chrono::TimeDelta::seconds(*offset))
                    .expect("registered");
                (id, *offset)
            })
            .collect();

        let now = base + chrono::TimeDelta::seconds(now_offset);
        level.sweep_idle_at(Duration::from_secs(threshold_secs), now);

        for (id, offset) in ids {
            let idle = now_offset - offset;
            let should_remain = idle < threshold_secs as i64;
            prop_assert_eq!(level.player(id).is_some(), should_remain);
        }
        prop_assert_eq!(level.free_cell_count(), 16 - level.player_count());
        prop_assert!(level.check_invariants().is_empty());
    }
}

#[test]
fn two_joins_then_snapshot_lists_both() {
    let level = Level::new(
        Bounds::new(0, 0, 3, 3),
        [],
        LevelOptions {
            seed: Some(21),
            ..LevelOptions::default()
        },
    );
    let a = level.join().expect("join");
    let b = level.join().expect("join");
    let snapshot = level.snapshot();
    let entries: Vec<&str> = snapshot.split(';').collect();
    assert_eq!(entries.len(), 2);
    for (entry, id) in entries.iter().zip([a, b]) {
        let view = level.player(id).expect("joined player");
        assert_eq!(
            *entry,
            format!("{}:{}:{}:{}", id, view.health, view.x, view.y)
        );
        assert_eq!(view.health, 100);
    }
}
