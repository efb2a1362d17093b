//! Wallet Addresses
//!
//! EVM address parsing and the lookup from an authenticated session to the
//! player's custodial wallet.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tokio::sync::RwLock;

/// Address parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Missing `0x` prefix.
    #[error("address must start with 0x")]
    MissingPrefix,
    /// Wrong number of hex digits.
    #[error("address must have 40 hex digits, got {0}")]
    InvalidLength(usize),
    /// Non-hex characters.
    #[error("address is not valid hex")]
    InvalidHex,
}

/// A 20-byte EVM account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Abbreviated form for logs (`0x1234...abcd`).
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        if digits.len() != 40 {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.short())
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// WALLET DIRECTORY
// =============================================================================

/// Resolves an auth token to the player's wallet.
pub trait WalletDirectory: Send + Sync {
    /// Wallet for `token`, or `None` if the token is unknown.
    fn resolve(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Option<WalletAddress>> + Send;
}

/// In-memory token-to-wallet table.
#[derive(Clone, Default)]
pub struct InMemoryWalletDirectory {
    wallets: Arc<RwLock<BTreeMap<String, WalletAddress>>>,
}

impl InMemoryWalletDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` for `wallet`.
    pub async fn insert(&self, token: impl Into<String>, wallet: WalletAddress) {
        self.wallets.write().await.insert(token.into(), wallet);
    }

    /// Forget `token`.
    pub async fn revoke(&self, token: &str) -> bool {
        self.wallets.write().await.remove(token).is_some()
    }

    /// Number of registered tokens.
    pub async fn len(&self) -> usize {
        self.wallets.read().await.len()
    }
}

impl WalletDirectory for InMemoryWalletDirectory {
    fn resolve(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Option<WalletAddress>> + Send {
        let wallets = self.wallets.clone();
        let token = token.to_string();
        async move { wallets.read().await.get(&token).copied() }
    }
}
