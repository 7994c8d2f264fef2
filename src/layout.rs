//! Reader for level files: one `<id> <type> <x> <y>` record per line.
//!
//! Bad lines never abort a load. They are logged and collected as
//! [`LayoutWarning`]s.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::LayoutError;
use crate::grid::Bounds;
use crate::types::{EntityKind, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEntity {
    pub id: u64,
    pub kind: EntityKind,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WarningReason {
    InvalidLine,
    UnknownEntityType(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutWarning {
    pub line: usize,
    pub text: String,
    pub reason: WarningReason,
}

#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub entities: Vec<LayoutEntity>,
    pub warnings: Vec<LayoutWarning>,
}

impl Layout {
    pub fn parse(text: &str) -> Self {
        let mut layout = Layout::default();
        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Ok(entity) => layout.entities.push(entity),
                Err(reason) => {
                    match &reason {
                        WarningReason::InvalidLine => {
                            warn!(line = idx + 1, text = line, "invalid line in level file");
                        }
                        WarningReason::UnknownEntityType(kind) => {
                            warn!(
                                line = idx + 1,
                                kind = kind.as_str(),
                                "invalid entity type in level file"
                            );
                        }
                    }
                    layout.warnings.push(LayoutWarning {
                        line: idx + 1,
                        text: line.to_string(),
                        reason,
                    });
                }
            }
        }
        layout
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LayoutError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::enclosing(self.entities.iter().map(|entity| entity.position))
    }

    /// Like [`Layout::bounds`], but rejects boxes covering more than
    /// `max_cells` cells.
    pub fn checked_bounds(&self, max_cells: usize) -> Result<Bounds, LayoutError> {
        let bounds = self.bounds();
        if !bounds.fits_within(max_cells) {
            return Err(LayoutError::TooLarge {
                width: bounds.width,
                height: bounds.height,
                max_cells,
            });
        }
        Ok(bounds)
    }

    /// Every placed entity blocks its cell, castles included.
    pub fn obstacles(&self) -> impl Iterator<Item = Position> + '_ {
        self.entities.iter().map(|entity| entity.position)
    }

    pub fn castles(&self) -> impl Iterator<Item = &LayoutEntity> + '_ {
        self.entities
            .iter()
            .filter(|entity| entity.kind == EntityKind::Castle)
    }
}

fn parse_line(line: &str) -> Result<LayoutEntity, WarningReason> {
    let fields: Vec<&str> = line.split(' ').collect();
    let [id, kind, x, y] = fields.as_slice() else {
        return Err(WarningReason::InvalidLine);
    };
    let id = parse_number(id).ok_or(WarningReason::InvalidLine)?;
    let x = parse_number(x)
        .and_then(|value| i32::try_from(value).ok())
        .ok_or(WarningReason::InvalidLine)?;
    let y = parse_number(y)
        .and_then(|value| i32::try_from(value).ok())
        .ok_or(WarningReason::InvalidLine)?;
    if kind.is_empty() {
        return Err(WarningReason::InvalidLine);
    }
    let kind =
        EntityKind::parse(kind).ok_or_else(|| WarningReason::UnknownEntityType(kind.to_string()))?;
    Ok(LayoutEntity {
        id,
        kind,
        position: Position::new(x, y),
    })
}

/// `0` or a digit string without a leading zero.
fn parse_number(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_entities() {
        let layout = Layout::parse("1 tree 0 0\n2 mountain 2 1\n3 castle 1 2\n");
        assert!(layout.warnings.is_empty());
        assert_eq!(layout.entities.len(), 3);
        assert_eq!(
            layout.entities[1],
            LayoutEntity {
                id: 2,
                kind: EntityKind::Mountain,
                position: Position::new(2, 1),
            }
        );
        assert_eq!(layout.castles().count(), 1);
        assert_eq!(layout.bounds(), Bounds::new(0, 0, 3, 3));
    }

    #[test]
    fn malformed_lines_are_skipped_with_warnings() {
        let text = "1 tree 0 0\n\
                    garbage\n\
                    2 river 1 1\n\
                    3 tree 01 1\n\
                    4  tree 1 1\n\
                    5 tree -1 1\n\
                    6 tree 4 4 extra\n\
                    \n\
                    7 mountain 2 2";
        let layout = Layout::parse(text);
        assert_eq!(layout.entities.len(), 2);
        assert_eq!(layout.warnings.len(), 6);
        assert_eq!(layout.warnings[0].line, 2);
        assert_eq!(
            layout.warnings[1].reason,
            WarningReason::UnknownEntityType("river".to_string())
        );
        assert!(layout.warnings[2..]
            .iter()
            .all(|warning| warning.reason == WarningReason::InvalidLine));
    }

    #[test]
    fn coordinates_that_overflow_are_rejected() {
        let layout = Layout::parse("1 tree 4294967296 0\n2 tree 2147483648 0");
        assert!(layout.entities.is_empty());
        assert_eq!(layout.warnings.len(), 2);
    }

    #[test]
    fn bounds_are_minimal_not_anchored_at_origin() {
        let layout = Layout::parse("1 tree 5 7\n2 tree 8 9");
        assert_eq!(layout.bounds(), Bounds::new(5, 7, 4, 3));
    }

    #[test]
    fn empty_layout_has_empty_bounds() {
        let layout = Layout::parse("");
        assert!(layout.bounds().is_empty());
    }

    #[test]
    fn far_apart_entities_exceed_the_cell_limit() {
        let layout = Layout::parse("1 tree 0 0\n2 tree 2000000000 2000000000");
        assert_eq!(layout.entities.len(), 2);
        let err = layout.checked_bounds(1 << 22).expect_err("oversized level");
        assert!(matches!(
            err,
            LayoutError::TooLarge {
                width: 2_000_000_001,
                height: 2_000_000_001,
                ..
            }
        ));
        assert_eq!(
            Layout::parse("1 tree 0 0\n2 tree 3 3")
                .checked_bounds(16)
                .expect("exactly at the limit"),
            Bounds::new(0, 0, 4, 4)
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Layout::load("/nonexistent/level.txt").expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/level.txt"));
    }
}
