//! Reward Module
//!
//! Everything between a finished race and minted tokens.
//!
//! - `claim`: Claim wire types and verification
//! - `wallet`: Wallet addresses and the token-to-wallet directory
//! - `minter`: Contract-write payloads and the minter seam
//! - `thirdweb`: HTTP minter for the Thirdweb contract-write API
//! - `service`: Verify-then-mint
//! - `progress`: Lifetime stats listener that produces claims

pub mod claim;
pub mod wallet;
pub mod minter;
pub mod thirdweb;
pub mod service;
pub mod progress;

pub use claim::{ClaimRequest, ClaimReceipt, GameStats, VerificationError, verify_claim};
pub use wallet::{WalletAddress, AddressError, WalletDirectory, InMemoryWalletDirectory};
pub use minter::{TokenMinter, DryRunMinter, MintError, ContractWriteRequest};
pub use thirdweb::ThirdwebMinter;
pub use service::{RewardService, RewardError};
pub use progress::PlayerProgress;
