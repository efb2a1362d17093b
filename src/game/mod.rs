//! Game Logic Module
//!
//! The lane racer simulation and its host loop.
//!
//! ## Module Structure
//!
//! - `state`: Session state, car, obstacles, coins, particles
//! - `engine`: Per-frame tick and player commands
//! - `collision`: Car hits, coin pickups, spawn spacing
//! - `spawn`: Obstacle and coin spawning
//! - `particles`: Visual particle bursts
//! - `events`: Race events and the listener interface
//! - `driver`: Async frame driver

pub mod state;
pub mod engine;
pub mod collision;
pub mod spawn;
pub mod particles;
pub mod events;
pub mod driver;

// Re-export key types
pub use state::{
    GameState, RaceState, RaceOutcome, Car, Obstacle, ObstacleKind, Coin, Particle, ParticleKind,
};
pub use engine::{RaceEngine, EngineConfig, TickResult};
pub use spawn::SpawnConfig;
pub use events::{RaceEvent, RaceEventData, RaceListener, SignalLog, Signal};
pub use driver::{RaceDriver, RaceHandle, RaceCommand, RaceSnapshot, run_frames};
