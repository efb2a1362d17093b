//! Race Engine
//!
//! The per-frame simulation loop and the four player commands. One engine
//! owns one session; every mutation goes through `&mut self`, so the tick
//! and the commands can never interleave.

use tracing::{debug, info};

use crate::core::geometry::below_field;
use crate::core::rng::RaceRng;
use crate::game::collision::{find_crash, find_pickups};
use crate::game::events::{RaceEvent, RaceEventData, RaceListener};
use crate::game::particles::{advance_particles, emit_burst};
use crate::game::spawn::{maybe_spawn_coin, maybe_spawn_obstacle, SpawnConfig};
use crate::game::state::{GameState, ParticleKind, RaceOutcome, RaceState};
use crate::COINS_PER_TOKEN;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<RaceEvent>,
    /// Whether the host should schedule another frame
    pub rearm: bool,
    /// Session outcome, if the session ended this tick
    pub outcome: Option<RaceOutcome>,
}

/// Tuning for the simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Spawn configuration
    pub spawn: SpawnConfig,
    /// Largest frame delta applied in one tick (ms)
    pub max_frame_ms: f64,
    /// Milliseconds per time point
    pub ms_per_point: f64,
    /// Score bonus per coin
    pub coin_bonus: u64,
    /// Score interval between difficulty steps
    pub difficulty_interval: u64,
    /// Speed added per difficulty step
    pub speed_step: f32,
    /// Speed ceiling
    pub max_speed: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            spawn: SpawnConfig::default(),
            max_frame_ms: 100.0,
            ms_per_point: 16.0,
            coin_bonus: 50,
            difficulty_interval: 100,
            speed_step: 0.5,
            max_speed: 8.0,
        }
    }
}

/// Game loop engine for one player.
pub struct RaceEngine<L: RaceListener = ()> {
    state: RaceState,
    config: EngineConfig,
    listener: L,
}

impl RaceEngine<()> {
    /// Engine with default config, fresh entropy and no listener.
    pub fn headless() -> Self {
        Self::new(EngineConfig::default(), RaceRng::from_entropy(), ())
    }
}

impl<L: RaceListener> RaceEngine<L> {
    /// Create a waiting engine.
    pub fn new(config: EngineConfig, rng: RaceRng, listener: L) -> Self {
        Self {
            state: RaceState::new(rng),
            config,
            listener,
        }
    }

    /// Current session state (read-only, for rendering).
    pub fn state(&self) -> &RaceState {
        &self.state
    }

    /// Mutable session state, for hosts that script scenarios.
    pub fn state_mut(&mut self) -> &mut RaceState {
        &mut self.state
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The injected listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// The injected listener, mutably.
    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    /// Current phase.
    pub fn phase(&self) -> GameState {
        self.state.phase
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    /// Start or restart a session. No-op while playing.
    ///
    /// Returns `true` if a session started.
    pub fn start(&mut self) -> bool {
        if self.state.is_playing() {
            return false;
        }

        self.state.reset();
        self.state.phase = GameState::Playing;
        self.state.push_event(RaceEventData::RaceStarted);
        debug!(lane = self.state.car.lane.index(), "race started");
        true
    }

    /// Move one lane left. No-op unless playing.
    pub fn move_left(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        let before = self.state.car.lane;
        self.state.car.lane = before.left();
        self.state.car.lane != before
    }

    /// Move one lane right. No-op unless playing.
    pub fn move_right(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        let before = self.state.car.lane;
        self.state.car.lane = before.right();
        self.state.car.lane != before
    }

    /// End the race and dispatch rewards. No-op unless playing.
    ///
    /// Returns the outcome if this call ended the session.
    pub fn end_race(&mut self) -> Option<RaceOutcome> {
        if !self.state.is_playing() {
            return None;
        }

        self.state.phase = GameState::Finished;
        self.state.push_event(RaceEventData::Finished);
        debug!(tick = self.state.tick, "race finished by player");
        self.dispatch_rewards();
        Some(self.state.outcome())
    }

    /// Take events generated by commands since the last tick.
    pub fn take_events(&mut self) -> Vec<RaceEvent> {
        self.state.take_events()
    }

    // =========================================================================
    // TICK
    // =========================================================================

    /// Run one frame at host timestamp `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> TickResult {
        let mut result = TickResult::default();

        if !self.state.is_playing() {
            return result;
        }

        // 1. Anchor the clock on the first frame
        let Some(last) = self.state.last_frame_ms.replace(now_ms) else {
            result.rearm = true;
            result.events = self.state.take_events();
            return result;
        };

        // 2. Frame delta, clamped
        let dt = (now_ms - last).clamp(0.0, self.config.max_frame_ms);
        self.state.tick = self.state.tick.wrapping_add(1);

        // 3. Clock and time points
        self.state.elapsed_ms = (self.state.elapsed_ms + dt).max(0.0);
        let points = (dt / self.config.ms_per_point).floor() as u64;
        self.state.score = self.state.score.saturating_add(points);

        // 4. Particles
        advance_particles(&mut self.state);

        // 5. Scroll obstacles and coins
        self.scroll_entities();

        // 6-7. Spawns
        maybe_spawn_obstacle(&mut self.state, &self.config.spawn);
        maybe_spawn_coin(&mut self.state, &self.config.spawn);

        // 8. Crash check
        if let Some(obstacle_id) = find_crash(&self.state) {
            self.crash(obstacle_id);
            result.events = self.state.take_events();
            result.outcome = Some(self.state.outcome());
            return result;
        }

        // 9. Coin pickups
        self.collect_coins();

        // 10. Difficulty ramp
        self.update_difficulty();

        // 11. Rearm
        result.rearm = self.state.is_playing();
        result.events = self.state.take_events();
        result
    }

    fn scroll_entities(&mut self) {
        let speed = self.state.obstacle_speed;

        for obstacle in &mut self.state.obstacles {
            obstacle.rect.y += speed;
        }
        self.state.obstacles.retain(|o| !below_field(o.rect.y));
        self.state.obstacles.truncate(self.config.spawn.max_obstacles);

        for coin in &mut self.state.coins {
            coin.rect.y += speed;
        }
        self.state.coins.retain(|c| !below_field(c.rect.y));
    }

    fn crash(&mut self, obstacle_id: u32) {
        let (cx, cy) = self.state.car.rect().center();
        emit_burst(&mut self.state, cx, cy, 25, ParticleKind::Explosion);
        emit_burst(&mut self.state, cx, cy, 15, ParticleKind::Smoke);

        self.listener.crashed();

        self.state.phase = GameState::Crashed;
        self.state.push_event(RaceEventData::Crashed { obstacle_id });
        debug!(obstacle_id, tick = self.state.tick, "car crashed");
        self.dispatch_rewards();
    }

    fn collect_coins(&mut self) {
        for index in find_pickups(&self.state) {
            let coin = &mut self.state.coins[index];
            coin.collected = true;
            let coin_id = coin.id;
            let (coin_x, coin_y) = coin.rect.center();

            self.state.coins_collected += 1;
            self.state.score = self.state.score.saturating_add(self.config.coin_bonus);
            emit_burst(&mut self.state, coin_x, coin_y, 4, ParticleKind::Normal);

            let total_coins = self.state.coins_collected;
            self.state.push_event(RaceEventData::CoinCollected {
                coin_id,
                total_coins,
                new_score: self.state.score,
            });

            if total_coins % COINS_PER_TOKEN == 0 {
                let (cx, cy) = self.state.car.rect().center();
                emit_burst(&mut self.state, cx, cy, 15, ParticleKind::Explosion);
                self.state.push_event(RaceEventData::TokenMilestone {
                    tokens: self.state.tokens_earned(),
                });
            }

            self.listener.coin_collected();
        }
    }

    fn update_difficulty(&mut self) {
        let score = self.state.score;
        let interval = self.config.difficulty_interval;
        if score == 0 || interval == 0 || score % interval != 0 {
            return;
        }

        self.state.obstacle_speed =
            (self.state.obstacle_speed + self.config.speed_step).min(self.config.max_speed);
        self.state.combo += 1;
        self.state.push_event(RaceEventData::SpeedIncreased {
            obstacle_speed: self.state.obstacle_speed,
            combo: self.state.combo,
        });
    }

    /// Report the outcome to the listener, once per session.
    fn dispatch_rewards(&mut self) {
        if self.state.rewards_distributed {
            return;
        }
        self.state.rewards_distributed = true;

        let outcome = self.state.outcome();
        self.listener.game_complete(outcome.elapsed_ms);
        self.listener.coins_collected(outcome.coins);
        self.listener.tokens_earned(outcome.tokens);

        self.state.push_event(RaceEventData::RewardDispatched {
            elapsed_ms: outcome.elapsed_ms,
            coins: outcome.coins,
            tokens: outcome.tokens,
        });
        info!(
            phase = ?outcome.phase,
            elapsed_ms = outcome.elapsed_ms,
            coins = outcome.coins,
            tokens = outcome.tokens,
            "race rewards dispatched"
        );
    }
}
