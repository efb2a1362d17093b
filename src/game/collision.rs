//! Collision Detection
//!
//! Car-vs-obstacle and car-vs-coin checks, plus the margin-padded
//! placement checks the spawner uses.

use crate::core::geometry::Rect;
use crate::game::state::{Coin, Obstacle, RaceState};

/// Horizontal clearance between a new obstacle and existing ones
pub const OBSTACLE_MARGIN_X: f32 = 30.0;
/// Vertical clearance between a new obstacle and existing ones
pub const OBSTACLE_MARGIN_Y: f32 = 40.0;
/// Clearance between a new coin and existing obstacles
pub const COIN_OBSTACLE_MARGIN: f32 = 10.0;
/// Clearance between a new coin and existing coins
pub const COIN_COIN_MARGIN: f32 = 15.0;

/// First obstacle (in storage order) touching the car.
///
/// Simultaneous hits are not distinguished: the earliest stored wins.
pub fn find_crash(state: &RaceState) -> Option<u32> {
    let car = state.car.rect();
    state
        .obstacles
        .iter()
        .find(|obstacle| car.overlaps(&obstacle.rect))
        .map(|obstacle| obstacle.id)
}

/// Indices of uncollected coins touching the car, in storage order.
pub fn find_pickups(state: &RaceState) -> Vec<usize> {
    let car = state.car.rect();
    state
        .coins
        .iter()
        .enumerate()
        .filter(|(_, coin)| !coin.collected && car.overlaps(&coin.rect))
        .map(|(index, _)| index)
        .collect()
}

/// Check if a candidate obstacle would crowd any existing obstacle.
pub fn obstacle_blocked(candidate: &Rect, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|existing| {
        candidate.overlaps_with_margin(&existing.rect, OBSTACLE_MARGIN_X, OBSTACLE_MARGIN_Y)
    })
}

/// Check if a candidate coin would crowd any obstacle or coin.
///
/// Collected coins still occupy space until they scroll off.
pub fn coin_blocked(candidate: &Rect, obstacles: &[Obstacle], coins: &[Coin]) -> bool {
    let hits_obstacle = obstacles.iter().any(|existing| {
        candidate.overlaps_with_margin(&existing.rect, COIN_OBSTACLE_MARGIN, COIN_OBSTACLE_MARGIN)
    });

    hits_obstacle
        || coins.iter().any(|existing| {
            candidate.overlaps_with_margin(&existing.rect, COIN_COIN_MARGIN, COIN_COIN_MARGIN)
        })
}
