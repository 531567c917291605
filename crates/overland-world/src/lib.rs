//! Chunk streaming, residency, and the world query surface.
#![forbid(unsafe_code)]

mod config;
mod entities;
mod grid;
mod runtime;

pub use config::{WorldConfig, load_config_from_path};
pub use entities::EntityRegistry;
pub use grid::{ChunkRequest, PlotOutcome, WorldError, WorldGrid};

pub use overland_overlay::{PlotKind, PlotStore};
