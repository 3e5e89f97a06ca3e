pub mod config;
pub mod kind;
pub mod params;

pub use config::Config;
pub use kind::{LabAction, PatternSource, SimulationKind};
pub use params::{IntParam, InvalidKind, LabRunQuery, RunParams, RunRequest, NUM_LIVES, TICKS, TIMEOUT_MS};
