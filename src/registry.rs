use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::constants::FIRST_PLAYER_ID;
use crate::error::LevelError;
use crate::grid::Grid;
use crate::rng::Rng;
use crate::types::{PlayerId, PlayerView, Position};

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub position: Position,
    pub health: u32,
    pub timestamp: DateTime<Utc>,
}

/// Owns every player record and the id allocator. Methods that place or
/// release a player take the grid so both sides change together.
#[derive(Clone, Debug)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
    last_player_id: PlayerId,
    fallback_health: u32,
}

impl PlayerRegistry {
    pub fn new(fallback_health: u32) -> Self {
        Self {
            players: BTreeMap::new(),
            last_player_id: FIRST_PLAYER_ID - 1,
            fallback_health,
        }
    }

    pub fn add(
        &mut self,
        grid: &mut Grid,
        rng: &mut Rng,
        now: DateTime<Utc>,
    ) -> Result<PlayerId, LevelError> {
        let position = grid.random_free(rng)?;
        let health = self.default_health();

        self.last_player_id += 1;
        let id = self.last_player_id;
        grid.hold(position);
        self.players.insert(
            id,
            Player {
                position,
                health,
                timestamp: now,
            },
        );
        Ok(id)
    }

    pub fn touch(&mut self, id: PlayerId, now: DateTime<Utc>) -> Result<(), LevelError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(LevelError::UnknownPlayer(id))?;
        player.timestamp = now;
        Ok(())
    }

    /// Drops every player idle for at least `idle`, releasing their cells.
    /// Returns the removed ids in ascending order.
    pub fn sweep_expired(
        &mut self,
        grid: &mut Grid,
        now: DateTime<Utc>,
        idle: Duration,
    ) -> Vec<PlayerId> {
        let threshold = TimeDelta::from_std(idle).unwrap_or(TimeDelta::MAX);
        let mut removed = Vec::new();
        self.players.retain(|id, player| {
            if now.signed_duration_since(player.timestamp) >= threshold {
                grid.unhold(player.position);
                removed.push(*id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn find_by_position(&self, pos: Position) -> Option<PlayerId> {
        self.players
            .iter()
            .find(|(_, player)| player.position == pos)
            .map(|(id, _)| *id)
    }

    /// Moves a player onto `to`. The caller has checked that `to` is free.
    pub fn relocate(
        &mut self,
        id: PlayerId,
        to: Position,
        grid: &mut Grid,
    ) -> Result<(), LevelError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(LevelError::UnknownPlayer(id))?;
        grid.hold(to);
        grid.unhold(player.position);
        player.position = to;
        Ok(())
    }

    /// Applies `amount` damage. Returns `true` when the player was defeated
    /// and respawned instead.
    pub fn decrease_health(
        &mut self,
        id: PlayerId,
        amount: u32,
        grid: &mut Grid,
        rng: &mut Rng,
    ) -> Result<bool, LevelError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(LevelError::UnknownPlayer(id))?;
        if player.health > amount {
            player.health -= amount;
            return Ok(false);
        }
        self.reset(id, grid, rng)?;
        Ok(true)
    }

    /// Respawns a defeated player. The new health is the registry mean taken
    /// while the defeated player still carries its pre-damage health.
    fn reset(&mut self, id: PlayerId, grid: &mut Grid, rng: &mut Rng) -> Result<(), LevelError> {
        let health = self.default_health();
        let player = self
            .players
            .get_mut(&id)
            .ok_or(LevelError::UnknownPlayer(id))?;

        let old = player.position;
        grid.unhold(old);
        let position = match grid.random_free(rng) {
            Ok(position) => position,
            Err(err) => {
                grid.hold(old);
                return Err(err);
            }
        };
        grid.hold(position);
        player.position = position;
        player.health = health;
        Ok(())
    }

    /// Mean health of every registered player, floored. Falls back to the
    /// configured default on an empty registry.
    pub fn default_health(&self) -> u32 {
        let (sum, count) = self
            .players
            .values()
            .fold((0u64, 0u64), |(sum, count), player| {
                (sum + u64::from(player.health), count + 1)
            });
        if count == 0 {
            return self.fallback_health;
        }
        u32::try_from(sum / count).unwrap_or(u32::MAX)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn last_player_id(&self) -> PlayerId {
        self.last_player_id
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &Player)> + '_ {
        self.players.iter().map(|(id, player)| (*id, player))
    }

    pub fn views(&self) -> Vec<PlayerView> {
        self.iter()
            .map(|(id, player)| PlayerView {
                id,
                health: player.health,
                x: player.position.x,
                y: player.position.y,
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }
}
