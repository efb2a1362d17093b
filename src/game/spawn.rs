//! Obstacle and Coin Spawning
//!
//! Probabilistic per-tick spawning with lane fairness and spacing checks.
//! Rejected spawns are dropped silently; the next tick rolls again.

use tracing::trace;

use crate::core::geometry::{centered_in_lane, Lane};
use crate::game::collision::{coin_blocked, obstacle_blocked};
use crate::game::events::RaceEventData;
use crate::game::state::{Coin, Obstacle, ObstacleKind, RaceState};
use crate::{FIELD_HEIGHT, LANE_COUNT};

/// Configuration for spawning.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnConfig {
    /// Per-tick obstacle spawn probability
    pub obstacle_chance: f32,
    /// Per-tick coin spawn probability
    pub coin_chance: f32,
    /// Maximum obstacles on field at once
    pub max_obstacles: usize,
    /// Height of the band above the field bottom checked for lane fairness
    pub danger_zone: f32,
    /// Lanes that must stay clear in the danger zone for a spawn to happen
    pub min_free_lanes: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            obstacle_chance: 0.015,
            coin_chance: 0.03,
            max_obstacles: 8,
            danger_zone: 300.0,
            min_free_lanes: 2,
        }
    }
}

/// Lanes with no obstacle inside the danger zone.
pub fn free_lanes(state: &RaceState, danger_zone: f32) -> Vec<Lane> {
    let mut occupied = [false; LANE_COUNT as usize];

    for obstacle in &state.obstacles {
        let y = obstacle.rect.y;
        if y > FIELD_HEIGHT - danger_zone && y < FIELD_HEIGHT {
            if let Some(lane) = obstacle.lane() {
                occupied[lane.index() as usize] = true;
            }
        }
    }

    Lane::all().filter(|lane| !occupied[lane.index() as usize]).collect()
}

/// Roll for an obstacle spawn. Returns the new obstacle's ID if one spawned.
pub fn maybe_spawn_obstacle(state: &mut RaceState, config: &SpawnConfig) -> Option<u32> {
    if !state.rng.chance(config.obstacle_chance) {
        return None;
    }

    // Spawning at the cap would only be truncated away
    if state.obstacles.len() >= config.max_obstacles {
        return None;
    }

    let kind = *state.rng.choose(&ObstacleKind::ALL)?;

    let lanes = free_lanes(state, config.danger_zone);
    if lanes.len() < config.min_free_lanes {
        trace!(free = lanes.len(), "obstacle spawn skipped: lanes crowded");
        return None;
    }
    let lane = *state.rng.choose(&lanes)?;

    let candidate = centered_in_lane(lane, Obstacle::SPAWN_Y, Obstacle::SIZE, Obstacle::SIZE);
    if obstacle_blocked(&candidate, &state.obstacles) {
        trace!(lane = lane.index(), "obstacle spawn skipped: overlap");
        return None;
    }

    let obstacle_id = state.spawn_obstacle(lane, kind);
    state.push_event(RaceEventData::ObstacleSpawned { obstacle_id, lane, kind });
    Some(obstacle_id)
}

/// Roll for a coin spawn. Returns the new coin's ID if one spawned.
pub fn maybe_spawn_coin(state: &mut RaceState, config: &SpawnConfig) -> Option<u32> {
    if !state.rng.chance(config.coin_chance) {
        return None;
    }

    let lane = Lane::new(state.rng.next_int(LANE_COUNT as u32) as u8);

    let candidate = centered_in_lane(lane, Coin::SPAWN_Y, Coin::SIZE, Coin::SIZE);
    if coin_blocked(&candidate, &state.obstacles, &state.coins) {
        trace!(lane = lane.index(), "coin spawn skipped: overlap");
        return None;
    }

    let coin_id = state.spawn_coin(lane);
    state.push_event(RaceEventData::CoinSpawned { coin_id, lane });
    Some(coin_id)
}
