//! Race Events
//!
//! Tick-stamped events emitted by the engine, and the listener interface
//! the host injects to receive audio and reward signals.

use serde::{Serialize, Deserialize};

use crate::core::geometry::Lane;
use crate::game::state::ObstacleKind;

/// Race event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceEventData {
    /// Session started (or restarted)
    RaceStarted,

    /// Obstacle entered the field
    ObstacleSpawned {
        /// New obstacle
        obstacle_id: u32,
        /// Lane it occupies
        lane: Lane,
        /// Appearance
        kind: ObstacleKind,
    },

    /// Coin entered the field
    CoinSpawned {
        /// New coin
        coin_id: u32,
        /// Lane it occupies
        lane: Lane,
    },

    /// Car picked up a coin
    CoinCollected {
        /// Coin picked up
        coin_id: u32,
        /// Coins collected this session
        total_coins: u32,
        /// Score after the bonus
        new_score: u64,
    },

    /// Coin total reached another multiple of five
    TokenMilestone {
        /// Tokens earned so far
        tokens: u32,
    },

    /// Difficulty step
    SpeedIncreased {
        /// New scroll speed
        obstacle_speed: f32,
        /// Difficulty steps taken
        combo: u32,
    },

    /// Car hit an obstacle
    Crashed {
        /// Obstacle that was hit
        obstacle_id: u32,
    },

    /// Player ended the race
    Finished,

    /// Outcome reported to the listener (once per session)
    RewardDispatched {
        /// Play time (ms)
        elapsed_ms: u64,
        /// Coins collected
        coins: u32,
        /// Tokens earned
        tokens: u32,
    },
}

/// A race event with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceEvent {
    /// Tick when event occurred
    pub tick: u32,
    /// Event data
    pub data: RaceEventData,
}

impl RaceEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: RaceEventData) -> Self {
        Self { tick, data }
    }

    /// Check if this is a terminal event (crash or finish).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.data,
            RaceEventData::Crashed { .. } | RaceEventData::Finished
        )
    }
}

/// Receiver for the engine's synchronous signals.
///
/// The audio pair fires inside the tick that caused it. The reward triple
/// (`game_complete`, `coins_collected`, `tokens_earned`) fires together, in
/// that order, exactly once per session. Implementations must not block.
pub trait RaceListener {
    /// A coin was picked up.
    fn coin_collected(&mut self) {}

    /// The car crashed.
    fn crashed(&mut self) {}

    /// Session ended after `elapsed_ms` of play.
    fn game_complete(&mut self, _elapsed_ms: u64) {}

    /// Coins collected over the session.
    fn coins_collected(&mut self, _coins: u32) {}

    /// Reward tokens earned over the session.
    fn tokens_earned(&mut self, _tokens: u32) {}
}

/// Silent listener.
impl RaceListener for () {}

impl<L: RaceListener + ?Sized> RaceListener for Box<L> {
    fn coin_collected(&mut self) {
        (**self).coin_collected()
    }

    fn crashed(&mut self) {
        (**self).crashed()
    }

    fn game_complete(&mut self, elapsed_ms: u64) {
        (**self).game_complete(elapsed_ms)
    }

    fn coins_collected(&mut self, coins: u32) {
        (**self).coins_collected(coins)
    }

    fn tokens_earned(&mut self, tokens: u32) {
        (**self).tokens_earned(tokens)
    }
}

/// Listener that records every signal, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalLog {
    /// Signals received
    pub signals: Vec<Signal>,
}

/// One recorded listener signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// `coin_collected`
    CoinCollected,
    /// `crashed`
    Crashed,
    /// `game_complete(elapsed_ms)`
    GameComplete(u64),
    /// `coins_collected(total)`
    CoinsCollected(u32),
    /// `tokens_earned(total)`
    TokensEarned(u32),
}

impl SignalLog {
    /// Every `tokens_earned` value received.
    pub fn tokens(&self) -> Vec<u32> {
        self.signals
            .iter()
            .filter_map(|s| match s {
                Signal::TokensEarned(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// Number of times `signal` was received.
    pub fn count(&self, signal: Signal) -> usize {
        self.signals.iter().filter(|s| **s == signal).count()
    }
}

impl RaceListener for SignalLog {
    fn coin_collected(&mut self) {
        self.signals.push(Signal::CoinCollected);
    }

    fn crashed(&mut self) {
        self.signals.push(Signal::Crashed);
    }

    fn game_complete(&mut self, elapsed_ms: u64) {
        self.signals.push(Signal::GameComplete(elapsed_ms));
    }

    fn coins_collected(&mut self, coins: u32) {
        self.signals.push(Signal::CoinsCollected(coins));
    }

    fn tokens_earned(&mut self, tokens: u32) {
        self.signals.push(Signal::TokensEarned(tokens));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_events() {
        assert!(RaceEvent::new(3, RaceEventData::Crashed { obstacle_id: 1 }).is_terminal());
        assert!(RaceEvent::new(3, RaceEventData::Finished).is_terminal());
        assert!(!RaceEvent::new(3, RaceEventData::RaceStarted).is_terminal());
    }

    #[test]
    fn test_event_json_tag() {
        let event = RaceEvent::new(10, RaceEventData::TokenMilestone { tokens: 2 });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"token_milestone\""));
    }

    #[test]
    fn test_signal_log_records_in_order() {
        let mut log = SignalLog::default();
        log.game_complete(1200);
        log.coins_collected(5);
        log.tokens_earned(1);

        assert_eq!(
            log.signals,
            vec![
                Signal::GameComplete(1200),
                Signal::CoinsCollected(5),
                Signal::TokensEarned(1),
            ]
        );
        assert_eq!(log.tokens(), vec![1]);
    }

    #[test]
    fn test_boxed_listener_forwards() {
        let mut boxed: Box<SignalLog> = Box::new(SignalLog::default());
        boxed.crashed();
        assert_eq!(boxed.count(Signal::Crashed), 1);
    }
}
