//! OKX REST client for withdrawals
//!
//! API Documentation: https://www.okx.com/docs-v5/en/#funding-account-rest-api-withdrawal

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::signer::{prehash, RequestSigner};
use super::types::{interpret_withdraw_body, WithdrawReceipt, WithdrawRequest};
use super::ExchangeWithdrawClient;
use crate::amount::Amount;
use crate::chain::address::short;
use crate::config::{ExchangeConfig, HttpConfig};
use crate::error::{Error, Result};

/// Withdrawal endpoint path (part of the signed prehash)
pub const WITHDRAWAL_PATH: &str = "/api/v5/asset/withdrawal";

/// API key and passphrase sent alongside each signed request
#[derive(Clone)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub passphrase: String,
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &if self.api_key.is_empty() { "(not set)" } else { "***" })
            .field("passphrase", &"***")
            .finish()
    }
}

/// OKX withdrawal client
pub struct OkxClient {
    client: Client,
    base_url: String,
    credentials: ExchangeCredentials,
    signer: Arc<dyn RequestSigner>,
    amount_decimals: u32,
    simulated: bool,
}

impl OkxClient {
    /// Create a new OKX client
    ///
    /// The configured proxy, if any, is applied to every request.
    pub fn new(
        exchange: &ExchangeConfig,
        http: &HttpConfig,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_millis(http.timeout_ms));

        if let Some(proxy) = exchange.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: exchange.base_url.trim_end_matches('/').to_string(),
            credentials: ExchangeCredentials {
                api_key: exchange.api_key.clone(),
                passphrase: exchange.passphrase.clone(),
            },
            signer,
            amount_decimals: exchange.amount_decimals,
            simulated: exchange.simulated,
        })
    }

    fn check_credentials(&self) -> Result<()> {
        if self.credentials.api_key.is_empty() {
            return Err(Error::Auth("API key not configured".to_string()));
        }
        if self.credentials.passphrase.is_empty() {
            return Err(Error::Auth("API passphrase not configured".to_string()));
        }
        Ok(())
    }
}

/// ISO-8601 timestamp with millisecond precision, as the exchange expects
fn request_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[async_trait]
impl ExchangeWithdrawClient for OkxClient {
    async fn withdraw(
        &self,
        currency: &str,
        amount: &Amount,
        to_address: &str,
        network: &str,
    ) -> Result<WithdrawReceipt> {
        self.check_credentials()?;

        let client_id = uuid::Uuid::new_v4().simple().to_string();
        let request = WithdrawRequest {
            ccy: currency.to_string(),
            amt: amount.to_decimal_string(self.amount_decimals),
            to_addr: to_address.to_string(),
            network: network.to_string(),
            client_id: Some(client_id.clone()),
        };
        let body = serde_json::to_string(&request)?;

        let timestamp = request_timestamp();
        let signature = self
            .signer
            .sign(&prehash(&timestamp, "POST", WITHDRAWAL_PATH, &body))?;

        info!(
            "Requesting withdrawal of {} {} to {} on {} (client id {})",
            request.amt,
            currency,
            short(to_address),
            network,
            client_id
        );

        let mut http_request = self
            .client
            .post(format!("{}{}", self.base_url, WITHDRAWAL_PATH))
            .header("OK-ACCESS-KEY", &self.credentials.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", &timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.credentials.passphrase)
            .header("Content-Type", "application/json");

        if self.simulated {
            http_request = http_request.header("x-simulated-trading", "1");
        }

        let response = http_request
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Withdrawal request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read withdrawal response: {}", e)))?;

        debug!("Withdrawal response {}: {}", status, body);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("Exchange returned {}: {}", status, body)));
        }

        if !status.is_success() {
            return Err(Error::ExchangeRejected {
                status: status.as_u16(),
                body,
            });
        }

        let withdrawal_id = interpret_withdraw_body(status.as_u16(), &body)?;

        Ok(WithdrawReceipt {
            status: status.as_u16(),
            withdrawal_id,
            client_id: Some(client_id),
            body,
        })
    }
}
