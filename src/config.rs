//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::amount::Amount;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Exchange account and withdrawal settings
#[derive(Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_exchange_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub passphrase: String,
    /// Proxy URL applied to exchange requests
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Withdrawal network identifier sent with each request
    #[serde(default = "default_network")]
    pub network: String,
    /// Fractional digits of the currency (TON: 9)
    #[serde(default = "default_amount_decimals")]
    pub amount_decimals: u32,
    /// Send requests to the exchange's demo trading environment
    #[serde(default)]
    pub simulated: bool,
}

// Secrets stay out of logs even if someone prints the whole config
impl std::fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &mask_secret(&self.api_key))
            .field("api_secret", &mask_secret(&self.api_secret))
            .field("passphrase", &mask_secret(&self.passphrase))
            .field("proxy", &self.proxy.as_deref().map(mask_url))
            .field("currency", &self.currency)
            .field("network", &self.network)
            .field("amount_decimals", &self.amount_decimals)
            .field("simulated", &self.simulated)
            .finish()
    }
}

/// Chain RPC provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Endpoint accepting transfer submissions (defaults to `rpc_endpoint`)
    #[serde(default)]
    pub transfer_endpoint: Option<String>,
    #[serde(default = "default_network")]
    pub network: String,
}

impl ChainConfig {
    pub fn transfer_endpoint(&self) -> &str {
        self.transfer_endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.rpc_endpoint)
    }
}

/// Wallet sweep policy, in the chain's smallest unit
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Balance always left in the wallet
    #[serde(default = "default_reserve")]
    pub reserve: Amount,
    /// Network fee deducted from the swept amount
    #[serde(default = "default_fee")]
    pub fee: Amount,
}

/// How a deposit is recognised as landed
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationRuleKind {
    /// Balance strictly above the balance seen before the withdrawal
    Delta,
    /// Any positive balance (legacy; confirms pre-funded wallets at once)
    Positive,
}

/// Deposit confirmation polling
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_rule")]
    pub rule: ConfirmationRuleKind,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
    /// 1.0 keeps the interval fixed
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// 0 = unbounded
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// 0 = no deadline
    #[serde(default)]
    pub deadline_secs: u64,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: default_exchange_url(),
            api_key: String::new(),
            api_secret: String::new(),
            passphrase: String::new(),
            proxy: None,
            currency: default_currency(),
            network: default_network(),
            amount_decimals: default_amount_decimals(),
            simulated: false,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: default_rpc_endpoint(),
            api_key: None,
            transfer_endpoint: None,
            network: default_network(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            reserve: default_reserve(),
            fee: default_fee(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            rule: default_rule(),
            poll_interval_secs: default_poll_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: default_max_attempts(),
            deadline_secs: 0,
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_exchange_url() -> String {
    "https://www.okx.com".to_string()
}

fn default_rpc_endpoint() -> String {
    "https://toncenter.com/api/v2/jsonRPC".to_string()
}

fn default_currency() -> String {
    "TON".to_string()
}

fn default_network() -> String {
    "TON".to_string()
}

fn default_amount_decimals() -> u32 {
    9
}

fn default_reserve() -> Amount {
    Amount::from(100_000_000_000_000_000u64)
}

fn default_fee() -> Amount {
    Amount::from(1_000_000u64)
}

fn default_rule() -> ConfirmationRuleKind {
    ConfirmationRuleKind::Delta
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_interval_secs() -> u64 {
    600
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_attempts() -> u32 {
    120
}

fn default_max_consecutive_errors() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix BRIDGE_)
            .add_source(config::Environment::with_prefix("BRIDGE").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_url("exchange.base_url", &self.exchange.base_url)?;
        validate_url("chain.rpc_endpoint", &self.chain.rpc_endpoint)?;
        validate_url("chain.transfer_endpoint", self.chain.transfer_endpoint())?;

        if self.exchange.currency.trim().is_empty() {
            anyhow::bail!("exchange.currency must not be empty");
        }
        if self.exchange.network.trim().is_empty() || self.chain.network.trim().is_empty() {
            anyhow::bail!("network identifiers must not be empty");
        }
        if self.exchange.amount_decimals > 30 {
            anyhow::bail!(
                "exchange.amount_decimals {} is out of range",
                self.exchange.amount_decimals
            );
        }

        let confirmation = &self.confirmation;
        if confirmation.poll_interval_secs == 0 {
            anyhow::bail!("confirmation.poll_interval_secs must be > 0");
        }
        if !(confirmation.backoff_multiplier >= 1.0) {
            anyhow::bail!(
                "confirmation.backoff_multiplier must be >= 1.0, got {}",
                confirmation.backoff_multiplier
            );
        }
        if confirmation.max_interval_secs < confirmation.poll_interval_secs {
            anyhow::bail!(
                "confirmation.max_interval_secs ({}) must be >= poll_interval_secs ({})",
                confirmation.max_interval_secs,
                confirmation.poll_interval_secs
            );
        }

        if confirmation.rule == ConfirmationRuleKind::Positive {
            tracing::warn!(
                "confirmation.rule is 'positive' - a wallet that already holds funds confirms immediately"
            );
        }
        if confirmation.max_attempts == 0 && confirmation.deadline_secs == 0 {
            tracing::warn!("Confirmation wait is unbounded (no max_attempts, no deadline)");
        }

        Ok(())
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  Exchange:
    base_url: {}
    api_key: {}
    api_secret: {}
    passphrase: {}
    proxy: {}
    currency: {} ({} decimals)
    network: {}
    simulated: {}
  Chain:
    rpc_endpoint: {}
    transfer_endpoint: {}
    api_key: {}
    network: {}
  Sweep:
    reserve: {}
    fee: {}
  Confirmation:
    rule: {:?}
    poll_interval: {}s (max {}s, x{})
    max_attempts: {}
    deadline: {}
  HTTP:
    timeout: {}ms
"#,
            self.exchange.base_url,
            mask_secret(&self.exchange.api_key),
            mask_secret(&self.exchange.api_secret),
            mask_secret(&self.exchange.passphrase),
            self.exchange
                .proxy
                .as_deref()
                .map(mask_url)
                .unwrap_or_else(|| "(none)".to_string()),
            self.exchange.currency,
            self.exchange.amount_decimals,
            self.exchange.network,
            self.exchange.simulated,
            mask_url(&self.chain.rpc_endpoint),
            mask_url(self.chain.transfer_endpoint()),
            mask_secret(self.chain.api_key.as_deref().unwrap_or_default()),
            self.chain.network,
            self.sweep.reserve,
            self.sweep.fee,
            self.confirmation.rule,
            self.confirmation.poll_interval_secs,
            self.confirmation.max_interval_secs,
            self.confirmation.backoff_multiplier,
            if self.confirmation.max_attempts == 0 {
                "unbounded".to_string()
            } else {
                self.confirmation.max_attempts.to_string()
            },
            if self.confirmation.deadline_secs == 0 {
                "none".to_string()
            } else {
                format!("{}s", self.confirmation.deadline_secs)
            },
            self.http.timeout_ms,
        )
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).with_context(|| format!("Invalid {}: {}", field, value))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must be an http(s) URL, got {}", field, value);
    }
    Ok(())
}

fn mask_secret(secret: &str) -> &'static str {
    if secret.is_empty() {
        "(not set)"
    } else {
        "***"
    }
}

/// Mask URL for display (hide credentials and API keys in query params)
fn mask_url(url: &str) -> String {
    let url = match url::Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    };
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sweep.reserve.to_string(), "100000000000000000");
        assert_eq!(config.sweep.fee.to_string(), "1000000");
        assert_eq!(config.confirmation.poll_interval_secs, 60);
        assert_eq!(config.confirmation.rule, ConfirmationRuleKind::Delta);
        assert_eq!(config.chain.transfer_endpoint(), config.chain.rpc_endpoint);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rule_deserialize() {
        let rule: ConfirmationRuleKind = serde_json::from_str(r#""positive""#).unwrap();
        assert_eq!(rule, ConfirmationRuleKind::Positive);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = toml_file();
        write!(
            file,
            r#"
[exchange]
api_key = "key"
api_secret = "secret"
passphrase = "pass"

[chain]
transfer_endpoint = "https://wallet.example/transfer"

[sweep]
reserve = "200000000000000000000"
fee = 5000

[confirmation]
rule = "positive"
poll_interval_secs = 30
max_attempts = 10
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.exchange.api_key, "key");
        assert_eq!(config.chain.transfer_endpoint(), "https://wallet.example/transfer");
        assert_eq!(config.sweep.reserve.to_string(), "200000000000000000000");
        assert_eq!(config.sweep.fee, Amount::from(5000u64));
        assert_eq!(config.confirmation.rule, ConfirmationRuleKind::Positive);
        assert_eq!(config.confirmation.poll_interval_secs, 30);
        assert_eq!(config.confirmation.max_attempts, 10);
        // Untouched sections keep defaults
        assert_eq!(config.http.timeout_ms, 10_000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.exchange.currency, "TON");
    }

    #[test]
    fn test_negative_fee_rejected() {
        let mut file = toml_file();
        write!(file, "[sweep]\nfee = \"-5\"\n").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_policy() {
        let mut config = Config::default();
        config.confirmation.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.confirmation.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.confirmation.max_interval_secs = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chain.rpc_endpoint = "ftp://toncenter.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_display_hides_secrets() {
        let mut config = Config::default();
        config.exchange.api_key = "visible-key".to_string();
        config.exchange.api_secret = "visible-secret".to_string();
        config.exchange.passphrase = "visible-pass".to_string();
        config.exchange.proxy = Some("http://user:pw@proxy.example:8080".to_string());
        config.chain.rpc_endpoint = "https://toncenter.com/api/v2/jsonRPC?api_key=abc".to_string();

        let shown = config.masked_display();
        for secret in ["visible-key", "visible-secret", "visible-pass", "pw@", "api_key=abc"] {
            assert!(!shown.contains(secret), "leaked {}", secret);
        }
        assert!(!format!("{:?}", config.exchange).contains("visible-secret"));
    }

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://api.example.com?key=secret"),
            "https://api.example.com?***"
        );
        assert_eq!(mask_url("https://api.example.com/rpc"), "https://api.example.com/rpc");
    }
}
