use chrono::{DateTime, Utc};
use serde::Serialize;

pub type PlayerId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step towards `dir`. Up decreases `y`.
    pub fn offset(self, dir: Direction) -> Self {
        match dir {
            Direction::Up => Self::new(self.x, self.y - 1),
            Direction::Right => Self::new(self.x + 1, self.y),
            Direction::Down => Self::new(self.x, self.y + 1),
            Direction::Left => Self::new(self.x - 1, self.y),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "right" => Some(Self::Right),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Tree,
    Mountain,
    Castle,
}

impl EntityKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "tree" => Some(Self::Tree),
            "mountain" => Some(Self::Mountain),
            "castle" => Some(Self::Castle),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub health: u32,
    pub x: i32,
    pub y: i32,
}

/// A fortified structure placed by the level file. Ownership never changes
/// inside the engine; the fields are carried for whoever builds capture
/// rules on top.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Castle {
    pub id: u64,
    pub position: Position,
    pub timestamp: DateTime<Utc>,
    pub health: u32,
    pub owner: Option<PlayerId>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct LevelSnapshot {
    pub players: Vec<PlayerView>,
    pub castles: Vec<Castle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_screen_coordinates() {
        let origin = Position::new(3, 3);
        assert_eq!(origin.offset(Direction::Up), Position::new(3, 2));
        assert_eq!(origin.offset(Direction::Right), Position::new(4, 3));
        assert_eq!(origin.offset(Direction::Down), Position::new(3, 4));
        assert_eq!(origin.offset(Direction::Left), Position::new(2, 3));
    }

    #[test]
    fn direction_parse_is_case_sensitive() {
        assert_eq!(Direction::parse("left"), Some(Direction::Left));
        assert_eq!(Direction::parse("Left"), None);
        assert_eq!(Direction::parse("none"), None);
    }

    #[test]
    fn entity_kind_parse_rejects_unknown_types() {
        assert_eq!(EntityKind::parse("castle"), Some(EntityKind::Castle));
        assert_eq!(EntityKind::parse("river"), None);
    }
}
