use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::PlayerId;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("invalid player id {0}")]
    UnknownPlayer(PlayerId),
    #[error("all positions are held")]
    EmptyGrid,
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read level file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("level bounds {width}x{height} exceed the limit of {max_cells} cells")]
    TooLarge {
        width: u32,
        height: u32,
        max_cells: usize,
    },
}
