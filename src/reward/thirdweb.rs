//! Thirdweb Minter
//!
//! [`TokenMinter`] that posts contract writes to the Thirdweb API, signed
//! by the server secret key.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ThirdwebConfig;
use crate::reward::minter::{ContractWriteRequest, ContractWriteResponse, MintError, TokenMinter};

/// Path of the contract-write endpoint, relative to the API base URL
pub const CONTRACT_WRITE_PATH: &str = "/v1/contracts/write";

/// Minter backed by the Thirdweb contract-write API.
#[derive(Clone)]
pub struct ThirdwebMinter {
    client: reqwest::Client,
    endpoint: String,
    secret_key: String,
    client_id: String,
}

impl ThirdwebMinter {
    /// Create a minter for `config`.
    pub fn new(config: &ThirdwebConfig) -> Result<Self, MintError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MintError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                config.api_base_url.trim_end_matches('/'),
                CONTRACT_WRITE_PATH
            ),
            secret_key: config.secret_key.clone(),
            client_id: config.client_id.clone(),
        })
    }

    /// Full URL write requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TokenMinter for ThirdwebMinter {
    fn submit(
        &self,
        request: ContractWriteRequest,
    ) -> impl Future<Output = Result<String, MintError>> + Send {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("x-secret-key", &self.secret_key)
            .json(&request);
        if !self.client_id.is_empty() {
            builder = builder.header("x-client-id", &self.client_id);
        }

        async move {
            let response = builder
                .send()
                .await
                .map_err(|e| MintError::Transport(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| MintError::Transport(e.to_string()))?;

            if !status.is_success() {
                warn!(%status, "contract write rejected");
                return Err(MintError::Rejected(format!("{status}: {body}")));
            }

            let parsed: ContractWriteResponse = serde_json::from_str(&body)
                .map_err(|e| MintError::Rejected(format!("unreadable response: {e}")))?;
            let transaction_id = parsed.transaction_id()?;
            debug!(%transaction_id, "contract write queued");
            Ok(transaction_id)
        }
    }
}
