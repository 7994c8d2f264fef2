use serde::Serialize;
use serde_json::Value;

use crate::error::LevelError;
use crate::types::{Direction, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct JoinResponse {
    pub id: PlayerId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MoveResponse {
    pub moved: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Accepts `{"dir": "up"}` or a bare direction word.
pub fn parse_move_body(raw: &str) -> Option<Direction> {
    let trimmed = raw.trim();
    if let Some(dir) = Direction::parse(trimmed) {
        return Some(dir);
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let object = value.as_object()?;
    Direction::parse(object.get("dir")?.as_str()?)
}

pub fn status_for(err: &LevelError) -> u16 {
    match err {
        LevelError::UnknownPlayer(_) => 404,
        LevelError::EmptyGrid => 503,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_body_accepts_json_and_plain_words() {
        assert_eq!(parse_move_body(r#"{"dir":"up"}"#), Some(Direction::Up));
        assert_eq!(parse_move_body(" left\n"), Some(Direction::Left));
        assert_eq!(parse_move_body(r#"{"dir":"north"}"#), None);
        assert_eq!(parse_move_body(r#"{"dir":3}"#), None);
        assert_eq!(parse_move_body(""), None);
    }

    #[test]
    fn level_errors_map_to_http_statuses() {
        assert_eq!(status_for(&LevelError::UnknownPlayer(4)), 404);
        assert_eq!(status_for(&LevelError::EmptyGrid), 503);
    }
}
