pub mod combat;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
pub mod invariants;
pub mod layout;
pub mod level;
pub mod registry;
pub mod rng;
pub mod session;
pub mod telemetry;
pub mod types;

pub use error::{LayoutError, LevelError};
pub use level::{Level, LevelOptions, MoveOutcome};
