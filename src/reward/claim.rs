//! Reward Claims
//!
//! Wire types for a reward claim and the freshness/sanity check a claim
//! must pass before any tokens are minted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Player statistics attached to a claim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    /// Fastest completed race (ms). `None` until a race completes.
    #[serde(default)]
    pub best_time: Option<f64>,
    /// Completed races.
    pub total_races: i64,
}

/// A reward claim submitted after a race.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Tokens requested
    pub amount: u64,
    /// Player statistics
    pub game_stats: GameStats,
    /// When the claim was made (epoch ms)
    pub timestamp: i64,
}

/// Successful claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReceipt {
    /// Always `true` for a receipt
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Transaction ID returned by the minter
    pub transaction_hash: String,
    /// Tokens minted
    pub amount: u64,
}

impl ClaimReceipt {
    /// Receipt for `amount` tokens minted in `transaction_hash`.
    pub fn minted(amount: u64, transaction_hash: String) -> Self {
        Self {
            success: true,
            message: format!("Successfully distributed {amount} tokens"),
            transaction_hash,
            amount,
        }
    }
}

/// Why a claim was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerificationError {
    /// Claim timestamp is outside the freshness window.
    #[error("game session too old ({age_ms} ms)")]
    StaleSession {
        /// Age of the claim
        age_ms: i64,
    },
    /// Negative best time or race count.
    #[error("invalid game stats")]
    InvalidStats,
}

/// Check a claim against the clock.
///
/// Timestamps in the future pass; only age beyond `window_ms` is stale.
pub fn verify_claim(
    request: &ClaimRequest,
    now_ms: i64,
    window_ms: i64,
) -> Result<(), VerificationError> {
    let age_ms = now_ms.saturating_sub(request.timestamp);
    if age_ms > window_ms {
        return Err(VerificationError::StaleSession { age_ms });
    }

    let stats = &request.game_stats;
    let negative_time = stats.best_time.is_some_and(|t| t < 0.0);
    if negative_time || stats.total_races < 0 {
        return Err(VerificationError::InvalidStats);
    }

    Ok(())
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;
    const NOW: i64 = 1_700_000_000_000;

    fn request(timestamp: i64, best_time: Option<f64>, total_races: i64) -> ClaimRequest {
        ClaimRequest {
            amount: 3,
            game_stats: GameStats { best_time, total_races },
            timestamp,
        }
    }

    #[test]
    fn test_fresh_claim_passes() {
        assert!(verify_claim(&request(NOW - 1_000, Some(42_000.0), 3), NOW, DAY_MS).is_ok());
        assert!(verify_claim(&request(NOW - DAY_MS, None, 0), NOW, DAY_MS).is_ok());
    }

    #[test]
    fn test_stale_claim_rejected() {
        let err = verify_claim(&request(NOW - DAY_MS - 1, Some(1.0), 1), NOW, DAY_MS).unwrap_err();
        assert_eq!(err, VerificationError::StaleSession { age_ms: DAY_MS + 1 });
    }

    #[test]
    fn test_future_timestamp_passes() {
        assert!(verify_claim(&request(NOW + 60_000, None, 1), NOW, DAY_MS).is_ok());
    }

    #[test]
    fn test_negative_stats_rejected() {
        assert_eq!(
            verify_claim(&request(NOW, Some(-5.0), 1), NOW, DAY_MS),
            Err(VerificationError::InvalidStats)
        );
        assert_eq!(
            verify_claim(&request(NOW, None, -1), NOW, DAY_MS),
            Err(VerificationError::InvalidStats)
        );
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"amount":2,"gameStats":{"bestTime":null,"totalRaces":4},"timestamp":1700000000000}"#;
        let parsed: ClaimRequest = serde_json::from_str(json).unwrap();

        assert_eq!(parsed, request(NOW, None, 4).with_amount(2));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }

    #[test]
    fn test_receipt_message() {
        let receipt = ClaimReceipt::minted(4, "tx-1".to_string());
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["transactionHash"], "tx-1");
        assert_eq!(json["message"], "Successfully distributed 4 tokens");
    }

    impl ClaimRequest {
        fn with_amount(mut self, amount: u64) -> Self {
            self.amount = amount;
            self
        }
    }
}
