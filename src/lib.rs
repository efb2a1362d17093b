//! # Crypto Racer
//!
//! Lane racing game engine and the reward endpoint that mints tokens for
//! finished races.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CRYPTO RACER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── geometry.rs - Rects, lanes, overlap tests               │
//! │  ├── rng.rs      - Seedable Xorshift128+ PRNG                │
//! │  └── hash.rs     - SHA-256 replay fingerprints               │
//! │                                                              │
//! │  game/           - Simulation                                │
//! │  ├── state.rs    - Session state and entities                │
//! │  ├── engine.rs   - Per-frame tick and player commands        │
//! │  ├── collision.rs- Hits, pickups, spawn spacing              │
//! │  ├── spawn.rs    - Obstacle and coin spawning                │
//! │  ├── particles.rs- Visual bursts                             │
//! │  ├── events.rs   - Race events and listener                  │
//! │  └── driver.rs   - Async frame driver                        │
//! │                                                              │
//! │  reward/         - Claims and minting                        │
//! │  network/        - WebSocket reward endpoint                 │
//! │  config.rs       - Environment configuration                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Engine Contract
//!
//! One engine owns one session and is driven by a host clock: the host
//! calls `tick(now_ms)` once per frame and keeps calling while the result
//! asks to be rearmed. Given the same seed, timestamps and commands, a
//! session replays identically.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod reward;
pub mod network;
pub mod config;

// Re-export commonly used types
pub use core::geometry::{Lane, Rect};
pub use core::rng::RaceRng;
pub use game::engine::{EngineConfig, RaceEngine, TickResult};
pub use game::events::{RaceEvent, RaceEventData, RaceListener};
pub use game::state::{GameState, RaceOutcome, RaceState};
pub use reward::{ClaimRequest, PlayerProgress, RewardService, WalletAddress};
pub use config::RacerConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default driver frame rate (Hz)
pub const FRAME_RATE: u32 = 60;

/// Highest driver frame rate (Hz); one frame per millisecond
pub const MAX_FRAME_RATE: u32 = 1000;

/// Play field width in pixels
pub const FIELD_WIDTH: f32 = 400.0;

/// Play field height in pixels
pub const FIELD_HEIGHT: f32 = 600.0;

/// Number of lanes
pub const LANE_COUNT: u8 = 4;

/// Coins per reward token
pub const COINS_PER_TOKEN: u32 = 5;
