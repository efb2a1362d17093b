//! Player Progress
//!
//! A [`RaceListener`] that accumulates lifetime stats across sessions and
//! turns each session's token total into a claim.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::events::RaceListener;
use crate::reward::claim::{ClaimRequest, GameStats};

/// Lifetime stats for one player.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProgress {
    /// Fastest completed race (ms)
    pub best_time_ms: Option<f64>,
    /// Completed races
    pub total_races: i64,
    /// Coins across all races
    pub total_coins: u64,
    /// Tokens from the latest race, until taken
    pending_tokens: Option<u32>,
}

impl PlayerProgress {
    /// Create empty progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats as sent with a claim.
    pub fn stats(&self) -> GameStats {
        GameStats {
            best_time: self.best_time_ms,
            total_races: self.total_races,
        }
    }

    /// Build a claim for `tokens`. Zero tokens produce no claim.
    pub fn claim_for(&self, tokens: u32, now_ms: i64) -> Option<ClaimRequest> {
        if tokens == 0 {
            debug!("no tokens earned, skipping claim");
            return None;
        }

        Some(ClaimRequest {
            amount: tokens as u64,
            game_stats: self.stats(),
            timestamp: now_ms,
        })
    }

    /// Take the latest race's claim, if it earned anything.
    pub fn take_claim(&mut self, now_ms: i64) -> Option<ClaimRequest> {
        let tokens = self.pending_tokens.take()?;
        self.claim_for(tokens, now_ms)
    }
}

impl RaceListener for PlayerProgress {
    fn game_complete(&mut self, elapsed_ms: u64) {
        let time = elapsed_ms as f64;
        self.best_time_ms = Some(self.best_time_ms.map_or(time, |best| best.min(time)));
        self.total_races += 1;
    }

    fn coins_collected(&mut self, coins: u32) {
        self.total_coins += coins as u64;
    }

    fn tokens_earned(&mut self, tokens: u32) {
        self.pending_tokens = Some(tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::RaceRng;
    use crate::game::engine::{EngineConfig, RaceEngine};
    use crate::game::spawn::SpawnConfig;

    #[test]
    fn test_progress_accumulates() {
        let mut progress = PlayerProgress::new();

        progress.game_complete(40_000);
        progress.coins_collected(7);
        progress.tokens_earned(1);

        progress.game_complete(25_000);
        progress.coins_collected(3);
        progress.tokens_earned(0);

        assert_eq!(progress.best_time_ms, Some(25_000.0));
        assert_eq!(progress.total_races, 2);
        assert_eq!(progress.total_coins, 10);
    }

    #[test]
    fn test_zero_tokens_no_claim() {
        let mut progress = PlayerProgress::new();
        progress.game_complete(1_000);
        progress.tokens_earned(0);

        assert!(progress.take_claim(5).is_none());
        assert!(progress.claim_for(0, 5).is_none());
    }

    #[test]
    fn test_claim_carries_updated_stats() {
        let mut progress = PlayerProgress::new();
        progress.game_complete(12_345);
        progress.coins_collected(10);
        progress.tokens_earned(2);

        let claim = progress.take_claim(99).unwrap();
        assert_eq!(claim.amount, 2);
        assert_eq!(claim.timestamp, 99);
        assert_eq!(claim.game_stats.best_time, Some(12_345.0));
        assert_eq!(claim.game_stats.total_races, 1);

        // Taken once
        assert!(progress.take_claim(100).is_none());
    }

    #[test]
    fn test_engine_feeds_progress() {
        let config = EngineConfig {
            spawn: SpawnConfig {
                obstacle_chance: 0.0,
                coin_chance: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut engine = RaceEngine::new(config, RaceRng::new(9), PlayerProgress::new());

        engine.start();
        engine.tick(0.0);
        engine.tick(80.0);
        engine.state_mut().coins_collected = 6;
        engine.end_race();

        let progress = engine.listener_mut();
        assert_eq!(progress.total_races, 1);
        assert_eq!(progress.total_coins, 6);
        assert_eq!(progress.best_time_ms, Some(80.0));
        assert_eq!(progress.take_claim(1).map(|c| c.amount), Some(1));
    }
}
