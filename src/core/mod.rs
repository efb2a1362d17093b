//! Core primitives.
//!
//! Geometry and randomness shared by the simulation. Nothing here knows
//! about game state.

pub mod geometry;
pub mod rng;
pub mod hash;

// Re-export core types
pub use geometry::{Lane, Rect};
pub use rng::RaceRng;
pub use hash::{StateHash, StateHasher};
