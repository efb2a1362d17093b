//! Reward Service
//!
//! Verifies a claim and, if it passes, mints the tokens to the player's
//! wallet.

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{RacerConfig, ThirdwebConfig};
use crate::reward::claim::{verify_claim, ClaimReceipt, ClaimRequest, VerificationError};
use crate::reward::minter::{ContractWriteRequest, MintError, TokenMinter};
use crate::reward::wallet::WalletAddress;

/// Claim failures.
#[derive(Debug, Error)]
pub enum RewardError {
    /// Claim was stale or its stats were invalid. Nothing was minted.
    #[error("game performance verification failed: {0}")]
    VerificationFailed(#[from] VerificationError),

    /// Mint call failed.
    #[error("token distribution failed: {0}")]
    DistributionFailed(#[from] MintError),
}

/// Verifies claims and submits mints.
pub struct RewardService<M: TokenMinter> {
    minter: M,
    thirdweb: ThirdwebConfig,
    verification_window_ms: i64,
}

impl<M: TokenMinter> RewardService<M> {
    /// Create a service.
    pub fn new(minter: M, thirdweb: ThirdwebConfig, verification_window_ms: i64) -> Self {
        Self {
            minter,
            thirdweb,
            verification_window_ms,
        }
    }

    /// Create a service from the runtime config.
    pub fn from_config(minter: M, config: &RacerConfig) -> Self {
        Self::new(minter, config.thirdweb.clone(), config.verification_window_ms)
    }

    /// The underlying minter.
    pub fn minter(&self) -> &M {
        &self.minter
    }

    /// Verify `request` at `now_ms` and mint `request.amount` to `wallet`.
    pub async fn claim(
        &self,
        wallet: WalletAddress,
        request: &ClaimRequest,
        now_ms: i64,
    ) -> Result<ClaimReceipt, RewardError> {
        if let Err(e) = verify_claim(request, now_ms, self.verification_window_ms) {
            warn!(wallet = %wallet.short(), error = %e, "claim rejected");
            return Err(e.into());
        }

        let call = ContractWriteRequest::mint_to(&self.thirdweb, wallet, request.amount);
        let transaction_hash = match self.minter.submit(call).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(wallet = %wallet.short(), amount = request.amount, error = %e, "mint failed");
                return Err(e.into());
            }
        };

        info!(
            wallet = %wallet.short(),
            amount = request.amount,
            %transaction_hash,
            "tokens distributed"
        );
        Ok(ClaimReceipt::minted(request.amount, transaction_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reward::claim::GameStats;
    use crate::reward::minter::DryRunMinter;

    const NOW: i64 = 1_700_000_000_000;
    const DAY_MS: i64 = 86_400_000;

    fn wallet() -> WalletAddress {
        "0x1111111111111111111111111111111111111111".parse().unwrap()
    }

    fn service(minter: DryRunMinter) -> RewardService<DryRunMinter> {
        RewardService::new(minter, ThirdwebConfig::default(), DAY_MS)
    }

    fn claim(amount: u64, timestamp: i64) -> ClaimRequest {
        ClaimRequest {
            amount,
            game_stats: GameStats { best_time: Some(30_000.0), total_races: 2 },
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_claim_mints() {
        let service = service(DryRunMinter::new());

        let receipt = service.claim(wallet(), &claim(2, NOW - 5_000), NOW).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.amount, 2);

        let calls = service.minter().calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].calls[0].params,
            vec![wallet().to_string(), "2000000000000000000".to_string()]
        );
    }

    #[tokio::test]
    async fn test_stale_claim_issues_no_mint() {
        let service = service(DryRunMinter::new());

        let err = service
            .claim(wallet(), &claim(1, NOW - 25 * 60 * 60 * 1000), NOW)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RewardError::VerificationFailed(VerificationError::StaleSession { .. })
        ));
        assert!(service.minter().calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_stats_issue_no_mint() {
        let service = service(DryRunMinter::new());
        let mut request = claim(1, NOW);
        request.game_stats.total_races = -3;

        let err = service.claim(wallet(), &request, NOW).await.unwrap_err();
        assert!(matches!(err, RewardError::VerificationFailed(VerificationError::InvalidStats)));
        assert!(service.minter().calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_mint_failure_is_distribution_failure() {
        let service = service(DryRunMinter::rejecting("insufficient gas"));

        let err = service.claim(wallet(), &claim(1, NOW), NOW).await.unwrap_err();
        assert!(matches!(err, RewardError::DistributionFailed(MintError::Rejected(_))));
    }
}
