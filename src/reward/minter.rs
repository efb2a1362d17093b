//! Token Minting
//!
//! The contract-write payload for `mintTo` and the [`TokenMinter`] seam the
//! reward service submits it through.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::ThirdwebConfig;
use crate::reward::wallet::WalletAddress;

/// ABI signature of the reward token's mint function
pub const MINT_METHOD: &str = "function mintTo(address to, uint256 amount)";

/// Token decimals
pub const TOKEN_DECIMALS: u32 = 18;

/// Mint failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MintError {
    /// The API answered without a transaction.
    #[error("no transaction id in response")]
    NoTransaction,
    /// The API rejected the call.
    #[error("mint rejected: {0}")]
    Rejected(String),
    /// The call never reached the API.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Whole tokens to base units, as a decimal string.
pub fn to_wei(amount: u64) -> String {
    (amount as u128 * 10u128.pow(TOKEN_DECIMALS)).to_string()
}

/// One contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCall {
    /// Target contract
    pub contract_address: WalletAddress,
    /// ABI signature of the called function
    pub method: String,
    /// Call arguments, as strings
    pub params: Vec<String>,
}

/// Body of a contract-write request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWriteRequest {
    /// Calls to batch
    pub calls: Vec<ContractCall>,
    /// Target chain
    pub chain_id: u64,
    /// Signing wallet
    pub from: WalletAddress,
}

impl ContractWriteRequest {
    /// `mintTo(to, amount * 10^18)` on the configured token contract.
    pub fn mint_to(config: &ThirdwebConfig, to: WalletAddress, amount: u64) -> Self {
        Self {
            calls: vec![ContractCall {
                contract_address: config.token_contract,
                method: MINT_METHOD.to_string(),
                params: vec![to.to_string(), to_wei(amount)],
            }],
            chain_id: config.chain_id,
            from: config.admin_address,
        }
    }
}

/// Response body of a contract-write request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractWriteResponse {
    /// Present when the write was accepted
    #[serde(default)]
    pub result: Option<ContractWriteResult>,
}

/// Queued transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractWriteResult {
    /// Queued transaction IDs, in call order
    #[serde(default)]
    pub transaction_ids: Vec<String>,
}

impl ContractWriteResponse {
    /// First transaction ID, if any was queued.
    pub fn transaction_id(&self) -> Result<String, MintError> {
        self.result
            .as_ref()
            .and_then(|r| r.transaction_ids.first())
            .cloned()
            .ok_or(MintError::NoTransaction)
    }
}

/// Submits mint calls.
pub trait TokenMinter: Send + Sync {
    /// Submit `request`. Returns the transaction ID.
    fn submit(
        &self,
        request: ContractWriteRequest,
    ) -> impl Future<Output = Result<String, MintError>> + Send;
}

/// Minter that records calls instead of sending them.
#[derive(Clone, Default)]
pub struct DryRunMinter {
    calls: Arc<Mutex<Vec<ContractWriteRequest>>>,
    reject_with: Option<String>,
}

impl DryRunMinter {
    /// Create a minter that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minter that rejects every call with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            calls: Arc::default(),
            reject_with: Some(reason.into()),
        }
    }

    /// Calls received so far.
    pub async fn calls(&self) -> Vec<ContractWriteRequest> {
        self.calls.lock().await.clone()
    }
}

impl TokenMinter for DryRunMinter {
    fn submit(
        &self,
        request: ContractWriteRequest,
    ) -> impl Future<Output = Result<String, MintError>> + Send {
        let calls = self.calls.clone();
        let reject_with = self.reject_with.clone();

        async move {
            let body = serde_json::to_string(&request)
                .map_err(|e| MintError::Transport(e.to_string()))?;
            calls.lock().await.push(request);

            if let Some(reason) = reject_with {
                return Err(MintError::Rejected(reason));
            }

            let response = ContractWriteResponse {
                result: Some(ContractWriteResult {
                    transaction_ids: vec![uuid::Uuid::new_v4().to_string()],
                }),
            };
            let transaction_id = response.transaction_id()?;
            info!(%transaction_id, body_len = body.len(), "dry-run mint recorded");
            Ok(transaction_id)
        }
    }
}
