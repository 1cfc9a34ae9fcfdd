//! toncenter JSON-RPC client
//!
//! Balance lookups go through `getAddressInformation` on the configured
//! RPC endpoint; transfers are posted as `{recipient, amount}` to the
//! provider endpoint of the sweep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::address::short;
use super::types::{parse_balance_response, JsonRpcRequest, TransferRequest};
use super::{BalanceOracle, ChainTransferClient, TransferReceipt};
use crate::amount::Amount;
use crate::config::{ChainConfig, HttpConfig};
use crate::error::{Error, Result};

/// Header carrying the provider API key
const API_KEY_HEADER: &str = "X-API-Key";

/// TON RPC client
pub struct TonCenterClient {
    client: Client,
    rpc_endpoint: String,
    api_key: Option<String>,
    next_id: AtomicU64,
}

impl TonCenterClient {
    /// Create a new client from configuration
    pub fn new(chain: &ChainConfig, http: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(http.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc_endpoint: chain.rpc_endpoint.clone(),
            api_key: chain.api_key.clone().filter(|k| !k.is_empty()),
            next_id: AtomicU64::new(1),
        })
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(url);
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

#[async_trait]
impl BalanceOracle for TonCenterClient {
    async fn get_balance(&self, address: &str) -> Result<Amount> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::address_information(address, id);

        debug!("Querying balance of {} (rpc id {})", short(address), id);

        let response = self
            .post(&self.rpc_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("RPC request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read RPC response: {}", e)))?;

        // 4xx means the provider refused this query; retrying won't help
        if status.is_client_error() {
            return Err(Error::Format(format!("RPC HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("RPC HTTP {}: {}", status, body)));
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::Format(format!("RPC response is not JSON: {}", e)))?;

        let balance = parse_balance_response(&value)?;
        debug!("Balance of {}: {}", short(address), balance);
        Ok(balance)
    }
}

#[async_trait]
impl ChainTransferClient for TonCenterClient {
    async fn transfer(
        &self,
        provider_endpoint: &str,
        recipient: &str,
        amount: &Amount,
    ) -> Result<TransferReceipt> {
        let request = TransferRequest {
            recipient: recipient.to_string(),
            amount: amount.clone(),
        };

        debug!("Submitting transfer of {} to {}", amount, short(recipient));

        let response = self
            .post(provider_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Transfer request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read transfer response: {}", e)))?;
        debug!("Transfer response {}: {}", status, body);

        if !status.is_success() {
            return Err(Error::TransferRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(TransferReceipt {
            status: status.as_u16(),
            body,
        })
    }
}
