//! Race State Definitions
//!
//! All state owned by a single play session.

use serde::{Serialize, Deserialize};

use crate::core::geometry::{centered_in_lane, Lane, Rect};
use crate::core::hash::{StateHash, StateHasher};
use crate::core::rng::RaceRng;
use crate::game::events::{RaceEvent, RaceEventData};
use crate::{FIELD_HEIGHT, FIELD_WIDTH, COINS_PER_TOKEN};

// =============================================================================
// GAME STATE
// =============================================================================

/// Session phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Before the first start
    #[default]
    Waiting,
    /// Active gameplay
    Playing,
    /// Hit an obstacle
    Crashed,
    /// Ended by the player
    Finished,
}

impl GameState {
    /// Crashed or finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameState::Crashed | GameState::Finished)
    }
}

// =============================================================================
// CAR
// =============================================================================

/// The player's car.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Current lane
    pub lane: Lane,
}

impl Car {
    /// Car width in pixels
    pub const WIDTH: f32 = 60.0;
    /// Car height in pixels
    pub const HEIGHT: f32 = 80.0;
    /// Gap between the car and the field bottom
    pub const BOTTOM_GAP: f32 = 20.0;

    /// Pixel rectangle, clamped inside the field.
    pub fn rect(&self) -> Rect {
        let x = (self.lane.center_x() - Self::WIDTH / 2.0).clamp(0.0, FIELD_WIDTH - Self::WIDTH);
        let y = FIELD_HEIGHT - Self::HEIGHT - Self::BOTTOM_GAP;
        Rect::new(x, y, Self::WIDTH, Self::HEIGHT)
    }
}

// =============================================================================
// OBSTACLES
// =============================================================================

/// Obstacle appearance. Purely cosmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// Boulder
    Rock,
    /// Road barrier
    Barrier,
    /// Traffic cone
    Cone,
}

impl ObstacleKind {
    /// All kinds, for uniform selection.
    pub const ALL: [ObstacleKind; 3] =
        [ObstacleKind::Rock, ObstacleKind::Barrier, ObstacleKind::Cone];
}

/// An obstacle scrolling down the track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Unique obstacle ID (monotonic per session)
    pub id: u32,
    /// Bounds in field pixels
    pub rect: Rect,
    /// Appearance
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// Obstacle edge length
    pub const SIZE: f32 = 50.0;
    /// Spawn height (above the visible field)
    pub const SPAWN_Y: f32 = -60.0;

    /// Create an obstacle centered in `lane` at the spawn height.
    pub fn new(id: u32, lane: Lane, kind: ObstacleKind) -> Self {
        Self {
            id,
            rect: centered_in_lane(lane, Self::SPAWN_Y, Self::SIZE, Self::SIZE),
            kind,
        }
    }

    /// Lane the obstacle occupies.
    pub fn lane(&self) -> Option<Lane> {
        Lane::containing(self.rect.x)
    }
}

// =============================================================================
// COINS
// =============================================================================

/// A collectible coin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique coin ID (monotonic per session)
    pub id: u32,
    /// Bounds in field pixels
    pub rect: Rect,
    /// Collected coins stay until they scroll off
    pub collected: bool,
}

impl Coin {
    /// Coin edge length
    pub const SIZE: f32 = 30.0;
    /// Spawn height
    pub const SPAWN_Y: f32 = -30.0;

    /// Create a coin centered in `lane` at the spawn height.
    pub fn new(id: u32, lane: Lane) -> Self {
        Self {
            id,
            rect: centered_in_lane(lane, Self::SPAWN_Y, Self::SIZE, Self::SIZE),
            collected: false,
        }
    }
}

// =============================================================================
// PARTICLES
// =============================================================================

/// Particle style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// Coin pickup sparkle
    Normal,
    /// Crash or milestone burst
    Explosion,
    /// Crash smoke, drifts upward
    Smoke,
}

/// A short-lived visual particle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Unique particle ID
    pub id: u32,
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Horizontal velocity per tick
    pub vx: f32,
    /// Vertical velocity per tick
    pub vy: f32,
    /// Remaining ticks
    pub life: i32,
    /// Style
    pub kind: ParticleKind,
    /// Diameter in pixels
    pub size: f32,
}

// =============================================================================
// RACE STATE
// =============================================================================

/// Complete state of a play session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaceState {
    /// Current phase
    pub phase: GameState,

    /// The car
    pub car: Car,

    /// Live obstacles, oldest first
    pub obstacles: Vec<Obstacle>,

    /// Live coins (including collected tombstones), oldest first
    pub coins: Vec<Coin>,

    /// Live particles, oldest first
    pub particles: Vec<Particle>,

    /// Score (time points plus coin bonuses)
    pub score: u64,

    /// Play time in milliseconds
    pub elapsed_ms: f64,

    /// Coins collected this session
    pub coins_collected: u32,

    /// Downward speed of obstacles and coins, pixels per tick
    pub obstacle_speed: f32,

    /// Difficulty steps taken
    pub combo: u32,

    /// One-shot reward latch
    pub rewards_distributed: bool,

    /// Ticks simulated this session
    pub tick: u32,

    /// Timestamp of the previous frame (None until the first tick)
    pub last_frame_ms: Option<f64>,

    next_obstacle_id: u32,
    next_coin_id: u32,
    next_particle_id: u32,

    /// Spawn and particle randomness
    #[serde(skip)]
    pub rng: RaceRng,

    /// Events generated since the last take
    #[serde(skip)]
    pending_events: Vec<RaceEvent>,
}

impl RaceState {
    /// Initial obstacle speed
    pub const BASE_SPEED: f32 = 2.0;

    /// Create a waiting session.
    pub fn new(rng: RaceRng) -> Self {
        Self {
            phase: GameState::Waiting,
            car: Car::default(),
            obstacles: Vec::new(),
            coins: Vec::new(),
            particles: Vec::new(),
            score: 0,
            elapsed_ms: 0.0,
            coins_collected: 0,
            obstacle_speed: Self::BASE_SPEED,
            combo: 0,
            rewards_distributed: false,
            tick: 0,
            last_frame_ms: None,
            next_obstacle_id: 0,
            next_coin_id: 0,
            next_particle_id: 0,
            rng,
            pending_events: Vec::new(),
        }
    }

    /// Reset counters and collections for a fresh session.
    ///
    /// The car keeps its lane and the RNG keeps its stream.
    pub fn reset(&mut self) {
        self.obstacles.clear();
        self.coins.clear();
        self.particles.clear();
        self.score = 0;
        self.elapsed_ms = 0.0;
        self.coins_collected = 0;
        self.obstacle_speed = Self::BASE_SPEED;
        self.combo = 0;
        self.rewards_distributed = false;
        self.tick = 0;
        self.last_frame_ms = None;
        self.next_obstacle_id = 0;
        self.next_coin_id = 0;
        self.next_particle_id = 0;
        self.pending_events.clear();
    }

    /// Check if the session is in play.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.phase == GameState::Playing
    }

    /// Reward tokens for the coins collected so far.
    pub fn tokens_earned(&self) -> u32 {
        tokens_for_coins(self.coins_collected)
    }

    /// Add an obstacle. Returns its ID.
    pub fn spawn_obstacle(&mut self, lane: Lane, kind: ObstacleKind) -> u32 {
        let id = self.next_obstacle_id;
        self.next_obstacle_id += 1;
        self.obstacles.push(Obstacle::new(id, lane, kind));
        id
    }

    /// Add a coin. Returns its ID.
    pub fn spawn_coin(&mut self, lane: Lane) -> u32 {
        let id = self.next_coin_id;
        self.next_coin_id += 1;
        self.coins.push(Coin::new(id, lane));
        id
    }

    /// Reserve `count` consecutive particle IDs. Returns the first.
    pub(crate) fn reserve_particle_ids(&mut self, count: u32) -> u32 {
        let first = self.next_particle_id;
        self.next_particle_id = self.next_particle_id.wrapping_add(count);
        first
    }

    /// Snapshot of the session outcome.
    pub fn outcome(&self) -> RaceOutcome {
        RaceOutcome {
            phase: self.phase,
            elapsed_ms: self.elapsed_ms.max(0.0) as u64,
            score: self.score,
            coins: self.coins_collected,
            tokens: self.tokens_earned(),
        }
    }

    /// Fingerprint of the simulated state (RNG and pending events excluded).
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_race_state();

        hasher.update_u8(self.phase as u8);
        hasher.update_u8(self.car.lane.index());
        hasher.update_u64(self.score);
        hasher.update_f64(self.elapsed_ms);
        hasher.update_u32(self.coins_collected);
        hasher.update_f32(self.obstacle_speed);
        hasher.update_u32(self.combo);
        hasher.update_u8(self.rewards_distributed as u8);
        hasher.update_u32(self.tick);

        hasher.update_u32(self.obstacles.len() as u32);
        for obstacle in &self.obstacles {
            hasher.update_u32(obstacle.id);
            hasher.update_rect(&obstacle.rect);
            hasher.update_u8(obstacle.kind as u8);
        }

        hasher.update_u32(self.coins.len() as u32);
        for coin in &self.coins {
            hasher.update_u32(coin.id);
            hasher.update_rect(&coin.rect);
            hasher.update_u8(coin.collected as u8);
        }

        hasher.update_u32(self.particles.len() as u32);
        for particle in &self.particles {
            hasher.update_u32(particle.id);
            hasher.update_f32(particle.x);
            hasher.update_f32(particle.y);
        }

        hasher.finalize()
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a race event stamped with the current tick.
    pub fn push_event(&mut self, data: RaceEventData) {
        self.pending_events.push(RaceEvent::new(self.tick, data));
    }
}

/// Outcome reported at the end of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    /// Phase at the time of the snapshot
    pub phase: GameState,
    /// Play time in whole milliseconds
    pub elapsed_ms: u64,
    /// Final score
    pub score: u64,
    /// Coins collected
    pub coins: u32,
    /// Reward tokens earned
    pub tokens: u32,
}

/// One token per five coins, rounded down.
#[inline]
pub fn tokens_for_coins(coins: u32) -> u32 {
    coins / COINS_PER_TOKEN
}
