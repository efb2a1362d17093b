//! Network Layer
//!
//! WebSocket endpoint for reward claims. Game logic never runs here; the
//! server only verifies claims and forwards mints.

pub mod protocol;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, AuthRequest, AuthResult, ServerError, ErrorCode};
pub use server::{RewardServer, ServerConfig, RewardServerError};
