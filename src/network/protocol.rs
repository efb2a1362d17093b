//! Protocol Messages
//!
//! Wire format for the reward endpoint. Messages are JSON, tagged by a
//! `type` field; binary frames carry the same JSON as UTF-8 bytes.

use serde::{Serialize, Deserialize};

use crate::reward::claim::{ClaimReceipt, ClaimRequest};
use crate::reward::service::RewardError;
use crate::reward::wallet::WalletAddress;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate with the server.
    Auth(AuthRequest),

    /// Claim tokens for a finished race.
    ClaimRewards(ClaimRequest),

    /// Ping for latency measurement.
    Ping {
        /// Client send time (ms)
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Session token issued by the wallet provider.
    pub token: String,
    /// Client version for compatibility check.
    #[serde(default)]
    pub client_version: String,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Tokens were minted.
    RewardClaimed(ClaimReceipt),

    /// Request failed.
    Error(ServerError),

    /// Ping response.
    Pong {
        /// Echoed client timestamp
        timestamp: u64,
        /// Server time (epoch ms)
        server_time: u64,
    },

    /// Server is shutting down.
    Shutdown {
        /// Why the server is going away
        reason: String,
    },
}

/// Authentication result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether authentication succeeded.
    pub success: bool,
    /// Wallet rewards will be minted to.
    pub wallet: Option<WalletAddress>,
    /// Server version.
    pub server_version: String,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Create an error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<&RewardError> for ServerError {
    fn from(err: &RewardError) -> Self {
        let code = match err {
            RewardError::VerificationFailed(_) => ErrorCode::VerificationFailed,
            RewardError::DistributionFailed(_) => ErrorCode::DistributionFailed,
        };
        Self::new(code, err.to_string())
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Not authenticated, or the token is unknown.
    Unauthorized,
    /// Malformed message.
    InvalidInput,
    /// Claim was stale or had invalid stats.
    VerificationFailed,
    /// Mint call failed.
    DistributionFailed,
    /// Server overloaded.
    ServerOverloaded,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Deserialize from a binary frame.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::claim::{GameStats, VerificationError};

    #[test]
    fn test_claim_message_wire_format() {
        let json = r#"{"type":"claim_rewards","amount":3,"gameStats":{"bestTime":41000.0,"totalRaces":5},"timestamp":1700000000000}"#;
        let msg = ClientMessage::from_json(json).unwrap();

        assert_eq!(
            msg,
            ClientMessage::ClaimRewards(ClaimRequest {
                amount: 3,
                game_stats: GameStats { best_time: Some(41_000.0), total_races: 5 },
                timestamp: 1_700_000_000_000,
            })
        );
    }

    #[test]
    fn test_auth_message_defaults_version() {
        let msg = ClientMessage::from_json(r#"{"type":"auth","token":"abc"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Auth(AuthRequest {
                token: "abc".to_string(),
                client_version: String::new(),
            })
        );
    }

    #[test]
    fn test_binary_frame_is_json() {
        let msg = ClientMessage::Ping { timestamp: 42 };
        let bytes = msg.to_json().unwrap().into_bytes();
        assert_eq!(ClientMessage::from_slice(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_server_error_codes() {
        let stale = RewardError::VerificationFailed(VerificationError::StaleSession { age_ms: 1 });
        let error = ServerError::from(&stale);
        assert_eq!(error.code, ErrorCode::VerificationFailed);

        let json = ServerMessage::Error(error).to_json().unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""code":"verification_failed""#));
    }

    #[test]
    fn test_reward_claimed_wire_format() {
        let msg = ServerMessage::RewardClaimed(ClaimReceipt::minted(2, "tx".to_string()));
        let json = msg.to_json().unwrap();

        assert!(json.contains(r#""type":"reward_claimed""#));
        assert!(json.contains(r#""transactionHash":"tx""#));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }
}
