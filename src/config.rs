//! Runtime Configuration
//!
//! Everything the binary reads from the environment. Unset variables fall
//! back to defaults; set-but-malformed variables are errors.

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::reward::wallet::{AddressError, WalletAddress};

/// Default mint contract
pub const DEFAULT_TOKEN_CONTRACT: &str = "0x761F52fd1a441d3df00f6371774F1dD2cbb1c5cf";
/// Default admin (minter) wallet
pub const DEFAULT_ADMIN_ADDRESS: &str = "0xEc9b0A9ac8A66B05Ce18892Eb5D82Db28125c174";
/// Avalanche Fuji testnet
pub const DEFAULT_CHAIN_ID: u64 = 43113;
/// Claims older than this are stale (24 hours)
pub const DEFAULT_VERIFICATION_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set to something unparseable.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// A variable holds a malformed wallet address.
    #[error("invalid address in {key}: {source}")]
    InvalidAddress {
        /// Variable name
        key: &'static str,
        /// Parse failure
        #[source]
        source: AddressError,
    },
}

/// Contract-write API settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThirdwebConfig {
    /// API base URL
    pub api_base_url: String,
    /// Server secret key (sent as `x-secret-key`)
    pub secret_key: String,
    /// Public client ID
    pub client_id: String,
    /// Reward token contract
    pub token_contract: WalletAddress,
    /// Target chain
    pub chain_id: u64,
    /// Wallet that signs mint calls
    pub admin_address: WalletAddress,
}

impl Default for ThirdwebConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.thirdweb.com".to_string(),
            secret_key: String::new(),
            client_id: String::new(),
            token_contract: WalletAddress::from_bytes(DEFAULT_TOKEN_CONTRACT_BYTES),
            chain_id: DEFAULT_CHAIN_ID,
            admin_address: WalletAddress::from_bytes(DEFAULT_ADMIN_BYTES),
        }
    }
}

// Byte forms of the default addresses, so `Default` cannot fail.
const DEFAULT_TOKEN_CONTRACT_BYTES: [u8; 20] = [
    0x76, 0x1f, 0x52, 0xfd, 0x1a, 0x44, 0x1d, 0x3d, 0xf0, 0x0f,
    0x63, 0x71, 0x77, 0x4f, 0x1d, 0xd2, 0xcb, 0xb1, 0xc5, 0xcf,
];
const DEFAULT_ADMIN_BYTES: [u8; 20] = [
    0xec, 0x9b, 0x0a, 0x9a, 0xc8, 0xa6, 0x6b, 0x05, 0xce, 0x18,
    0x89, 0x2e, 0xb5, 0xd8, 0x2d, 0xb2, 0x81, 0x25, 0xc1, 0x74,
];

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RacerConfig {
    /// Contract-write API settings
    pub thirdweb: ThirdwebConfig,
    /// Claim freshness window (ms)
    pub verification_window_ms: i64,
    /// Reward endpoint bind address
    pub bind_addr: SocketAddr,
    /// Driver frame rate (Hz)
    pub frame_rate: u32,
}

impl Default for RacerConfig {
    fn default() -> Self {
        Self {
            thirdweb: ThirdwebConfig::default(),
            verification_window_ms: DEFAULT_VERIFICATION_WINDOW_MS,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            frame_rate: crate::FRAME_RATE,
        }
    }
}

impl RacerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let thirdweb = ThirdwebConfig {
            api_base_url: var("THIRDWEB_API_BASE_URL").unwrap_or(defaults.thirdweb.api_base_url),
            secret_key: var("THIRDWEB_SECRET_KEY").unwrap_or_default(),
            client_id: var("THIRDWEB_CLIENT_ID").unwrap_or_default(),
            token_contract: parse_address(
                &var,
                "TOKEN_CONTRACT_ADDRESS",
                defaults.thirdweb.token_contract,
            )?,
            chain_id: parse_var(&var, "CHAIN_ID", defaults.thirdweb.chain_id)?,
            admin_address: parse_address(&var, "ADMIN_ADDRESS", defaults.thirdweb.admin_address)?,
        };

        Ok(Self {
            thirdweb,
            verification_window_ms: parse_var(
                &var,
                "GAME_VERIFICATION_WINDOW",
                defaults.verification_window_ms,
            )?,
            bind_addr: parse_var(&var, "RACER_BIND_ADDR", defaults.bind_addr)?,
            frame_rate: parse_frame_rate(&var, defaults.frame_rate)?,
        })
    }
}

fn parse_var<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

fn parse_frame_rate<F>(var: &F, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const KEY: &str = "RACER_FRAME_RATE";
    let rate = parse_var(var, KEY, default)?;
    if rate == 0 || rate > crate::MAX_FRAME_RATE {
        return Err(ConfigError::InvalidValue {
            key: KEY,
            value: rate.to_string(),
        });
    }
    Ok(rate)
}

fn parse_address<F>(
    var: &F,
    key: &'static str,
    default: WalletAddress,
) -> Result<WalletAddress, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|source| ConfigError::InvalidAddress { key, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RacerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.thirdweb.chain_id, 43113);
        assert_eq!(config.verification_window_ms, 86_400_000);
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.bind_addr.port(), 8080);
        let token: WalletAddress = DEFAULT_TOKEN_CONTRACT.parse().unwrap();
        let admin: WalletAddress = DEFAULT_ADMIN_ADDRESS.parse().unwrap();
        assert_eq!(config.thirdweb.token_contract, token);
        assert_eq!(config.thirdweb.admin_address, admin);
        assert_eq!(config, RacerConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = RacerConfig::from_lookup(lookup(&[
            ("CHAIN_ID", "43114"),
            ("GAME_VERIFICATION_WINDOW", "60000"),
            ("RACER_BIND_ADDR", "127.0.0.1:9000"),
            ("THIRDWEB_SECRET_KEY", "sk_test"),
            ("ADMIN_ADDRESS", "0x0000000000000000000000000000000000000001"),
        ]))
        .unwrap();

        assert_eq!(config.thirdweb.chain_id, 43114);
        assert_eq!(config.verification_window_ms, 60_000);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.thirdweb.secret_key, "sk_test");
        assert_eq!(
            config.thirdweb.admin_address.to_string(),
            "0x0000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = RacerConfig::from_lookup(lookup(&[("CHAIN_ID", "  ")])).unwrap();
        assert_eq!(config.thirdweb.chain_id, DEFAULT_CHAIN_ID);
    }

    #[test]
    fn test_malformed_number() {
        let err = RacerConfig::from_lookup(lookup(&[("RACER_FRAME_RATE", "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "RACER_FRAME_RATE", .. }));
    }

    #[test]
    fn test_frame_rate_bounds() {
        for raw in ["0", "1001", "2000000"] {
            let err = RacerConfig::from_lookup(lookup(&[("RACER_FRAME_RATE", raw)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { key: "RACER_FRAME_RATE", .. }));
        }

        let config = RacerConfig::from_lookup(lookup(&[("RACER_FRAME_RATE", "1000")])).unwrap();
        assert_eq!(config.frame_rate, 1000);
    }

    #[test]
    fn test_malformed_address() {
        let err =
            RacerConfig::from_lookup(lookup(&[("TOKEN_CONTRACT_ADDRESS", "0x1234")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress { key: "TOKEN_CONTRACT_ADDRESS", .. }));
    }
}
