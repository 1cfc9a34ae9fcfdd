//! Deposit confirmation polling
//!
//! Waits for a deposit to land by re-reading the destination balance:
//!
//! ```text
//! Waiting --(rule satisfied)--> Confirmed
//! Waiting --(fatal error | attempts/deadline exhausted | cancelled)--> Failed
//! ```
//!
//! The interval starts at `poll_interval` and grows by `backoff_multiplier`
//! up to `max_interval` (a multiplier of 1.0 keeps it fixed). Transport
//! errors are transient and retried on the normal schedule; any other
//! oracle error ends the wait.

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::amount::Amount;
use crate::chain::address::short;
use crate::chain::BalanceOracle;
use crate::config::ConfirmationConfig;
use crate::error::{Error, Result};

/// When a polled balance counts as the deposit having landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationRule {
    /// Balance strictly greater than zero
    Positive,
    /// Balance strictly greater than the pre-withdrawal baseline
    Delta { baseline: Amount },
}

impl ConfirmationRule {
    pub fn is_satisfied(&self, balance: &Amount) -> bool {
        match self {
            ConfirmationRule::Positive => !balance.is_zero(),
            ConfirmationRule::Delta { baseline } => balance > baseline,
        }
    }
}

/// Polling schedule and limits
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff_multiplier: f64,
    /// `None` = unbounded
    pub max_attempts: Option<u32>,
    /// `None` = no deadline
    pub deadline: Option<Duration>,
    /// Consecutive transport errors tolerated before giving up
    pub max_consecutive_errors: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&ConfirmationConfig::default())
    }
}

impl From<&ConfirmationConfig> for PollPolicy {
    fn from(config: &ConfirmationConfig) -> Self {
        let interval = Duration::from_secs(config.poll_interval_secs);
        Self {
            interval,
            max_interval: Duration::from_secs(config.max_interval_secs).max(interval),
            backoff_multiplier: config.backoff_multiplier,
            max_attempts: (config.max_attempts > 0).then_some(config.max_attempts),
            deadline: (config.deadline_secs > 0).then(|| Duration::from_secs(config.deadline_secs)),
            max_consecutive_errors: config.max_consecutive_errors,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy with no bounds
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            backoff_multiplier: 1.0,
            max_attempts: None,
            deadline: None,
            max_consecutive_errors: 0,
        }
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.interval,
            initial_interval: self.interval,
            randomization_factor: 0.0,
            multiplier: self.backoff_multiplier.max(1.0),
            max_interval: self.max_interval.max(self.interval),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Successful end of a confirmation wait
#[derive(Debug, Clone)]
pub struct Confirmation {
    /// Balance that satisfied the rule
    pub balance: Amount,
    pub rule: ConfirmationRule,
    /// Balance queries made, including the confirming one
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Polls a [`BalanceOracle`] until a deposit is observed
pub struct DepositConfirmationPoller {
    oracle: Arc<dyn BalanceOracle>,
    policy: PollPolicy,
}

impl DepositConfirmationPoller {
    pub fn new(oracle: Arc<dyn BalanceOracle>, policy: PollPolicy) -> Self {
        Self { oracle, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Block the calling task until `address` satisfies `rule`.
    ///
    /// The token is checked before each balance query and raced against
    /// each sleep.
    pub async fn wait_for_deposit(
        &self,
        address: &str,
        rule: &ConfirmationRule,
        cancel: &CancellationToken,
    ) -> Result<Confirmation> {
        let started = Instant::now();
        let mut schedule = self.policy.schedule();
        let mut attempts: u32 = 0;
        let mut consecutive_errors: u32 = 0;

        info!(
            "Waiting for deposit at {} ({:?}, every {:?})",
            short(address),
            rule,
            self.policy.interval
        );

        loop {
            if cancel.is_cancelled() {
                info!("Confirmation wait for {} cancelled", short(address));
                return Err(Error::Cancelled);
            }

            attempts += 1;
            match self.oracle.get_balance(address).await {
                Ok(balance) => {
                    consecutive_errors = 0;
                    if rule.is_satisfied(&balance) {
                        let elapsed = started.elapsed();
                        info!(
                            "Deposit confirmed at {}: balance {} after {} checks ({:?})",
                            short(address),
                            balance,
                            attempts,
                            elapsed
                        );
                        return Ok(Confirmation {
                            balance,
                            rule: rule.clone(),
                            attempts,
                            elapsed,
                        });
                    }
                    debug!(
                        "Check {}: balance {} at {} - still waiting",
                        attempts,
                        balance,
                        short(address)
                    );
                }
                Err(e) if e.is_retryable() => {
                    consecutive_errors += 1;
                    if consecutive_errors > self.policy.max_consecutive_errors {
                        warn!(
                            "Giving up on {} after {} consecutive transport errors",
                            short(address),
                            consecutive_errors
                        );
                        return Err(e);
                    }
                    warn!(
                        "Transient balance error ({}/{}): {}",
                        consecutive_errors, self.policy.max_consecutive_errors, e
                    );
                }
                Err(e) => return Err(e),
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    return Err(Error::ConfirmationTimeout {
                        attempts,
                        elapsed: started.elapsed(),
                    });
                }
            }

            let mut delay = schedule.next_backoff().unwrap_or(self.policy.max_interval);
            if let Some(deadline) = self.policy.deadline {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    return Err(Error::ConfirmationTimeout { attempts, elapsed });
                }
                delay = delay.min(deadline - elapsed);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Confirmation wait for {} cancelled", short(address));
                    return Err(Error::Cancelled);
                }
                _ = sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::fakes::ScriptedOracle;

    const ADDR: &str = "UQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG";
    const MINUTE: Duration = Duration::from_secs(60);

    fn poller(oracle: &Arc<ScriptedOracle>, policy: PollPolicy) -> DepositConfirmationPoller {
        DepositConfirmationPoller::new(oracle.clone(), policy)
    }

    #[test]
    fn test_rules() {
        assert!(!ConfirmationRule::Positive.is_satisfied(&Amount::zero()));
        assert!(ConfirmationRule::Positive.is_satisfied(&Amount::from(1u64)));

        let delta = ConfirmationRule::Delta {
            baseline: Amount::from(100u64),
        };
        assert!(!delta.is_satisfied(&Amount::from(100u64)));
        assert!(!delta.is_satisfied(&Amount::from(99u64)));
        assert!(delta.is_satisfied(&Amount::from(101u64)));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = PollPolicy::from(&ConfirmationConfig::default());
        assert_eq!(policy.interval, MINUTE);
        assert_eq!(policy.max_attempts, Some(120));
        assert_eq!(policy.deadline, None);

        let config = ConfirmationConfig {
            max_attempts: 0,
            deadline_secs: 900,
            ..ConfirmationConfig::default()
        };
        let policy = PollPolicy::from(&config);
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.deadline, Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_schedule_fixed_and_growing() {
        let mut fixed = PollPolicy::fixed(MINUTE).schedule();
        for _ in 0..5 {
            assert_eq!(fixed.next_backoff(), Some(MINUTE));
        }

        let growing = PollPolicy {
            backoff_multiplier: 2.0,
            max_interval: Duration::from_secs(300),
            ..PollPolicy::fixed(MINUTE)
        };
        let mut schedule = growing.schedule();
        let delays: Vec<_> = (0..5).map(|_| schedule.next_backoff().unwrap()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(60),
                Duration::from_secs(120),
                Duration::from_secs(240),
                Duration::from_secs(300),
                Duration::from_secs(300),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirms_on_fourth_poll_after_three_intervals() {
        let oracle = ScriptedOracle::with_balances(&["0", "0", "0", "500000"]);
        let started = Instant::now();

        let confirmation = poller(&oracle, PollPolicy::fixed(MINUTE))
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(confirmation.attempts, 4);
        assert_eq!(confirmation.balance, Amount::from(500_000u64));
        assert_eq!(oracle.calls(), 4);
        let elapsed = started.elapsed();
        assert!(elapsed >= 3 * MINUTE, "slept only {:?}", elapsed);
        assert!(elapsed < 4 * MINUTE, "slept too long: {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delta_rule_ignores_prefunded_balance() {
        let oracle = ScriptedOracle::with_balances(&["700", "700", "1700"]);
        let rule = ConfirmationRule::Delta {
            baseline: Amount::from(700u64),
        };

        let confirmation = poller(&oracle, PollPolicy::fixed(MINUTE))
            .wait_for_deposit(ADDR, &rule, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(confirmation.attempts, 3);
        assert_eq!(confirmation.balance, Amount::from(1700u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let oracle = ScriptedOracle::new(vec![
            Err(Error::Transport("connection reset".into())),
            Err(Error::Transport("timeout".into())),
            Ok(Amount::from(10u64)),
        ]);
        let policy = PollPolicy {
            max_consecutive_errors: 2,
            ..PollPolicy::fixed(MINUTE)
        };

        let confirmation = poller(&oracle, policy)
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(confirmation.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_too_many_transport_errors_is_fatal() {
        let oracle = ScriptedOracle::new(vec![
            Err(Error::Transport("down".into())),
            Err(Error::Transport("down".into())),
            Ok(Amount::from(10u64)),
        ]);
        let policy = PollPolicy {
            max_consecutive_errors: 1,
            ..PollPolicy::fixed(MINUTE)
        };

        let err = poller(&oracle, policy)
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_format_error_is_fatal_immediately() {
        let oracle = ScriptedOracle::new(vec![
            Ok(Amount::zero()),
            Err(Error::Format("no result.balance".into())),
            Ok(Amount::from(10u64)),
        ]);
        let policy = PollPolicy {
            max_consecutive_errors: 5,
            ..PollPolicy::fixed(MINUTE)
        };

        let err = poller(&oracle, policy)
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_times_out() {
        let oracle = ScriptedOracle::repeating(Amount::zero());
        let policy = PollPolicy {
            max_attempts: Some(5),
            ..PollPolicy::fixed(MINUTE)
        };

        let err = poller(&oracle, policy)
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfirmationTimeout { attempts: 5, .. }));
        assert_eq!(oracle.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_times_out() {
        let oracle = ScriptedOracle::repeating(Amount::zero());
        let policy = PollPolicy {
            deadline: Some(Duration::from_secs(150)),
            ..PollPolicy::fixed(MINUTE)
        };
        let started = Instant::now();

        let err = poller(&oracle, policy)
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfirmationTimeout { .. }));
        // polls at 0s, 60s, 120s and a final one at the 150s deadline
        assert_eq!(oracle.calls(), 4);
        assert!(started.elapsed() >= Duration::from_secs(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let oracle = ScriptedOracle::repeating(Amount::zero());
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(90)).await;
            canceller.cancel();
        });

        let err = poller(&oracle, PollPolicy::fixed(MINUTE))
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_calls() {
        let oracle = ScriptedOracle::repeating(Amount::zero());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poller(&oracle, PollPolicy::fixed(MINUTE))
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_client_error_ends_wait_without_retry() {
        use crate::chain::TonCenterClient;
        use crate::config::{ChainConfig, HttpConfig};
        use crate::http_stub::serve_once;

        let (url, request) = serve_once(
            416,
            r#"{"ok":false,"error":"Incorrect address","code":416}"#,
        )
        .await;
        let chain = ChainConfig {
            rpc_endpoint: url,
            ..ChainConfig::default()
        };
        let client = Arc::new(TonCenterClient::new(&chain, &HttpConfig { timeout_ms: 2000 }).unwrap());

        let policy = PollPolicy {
            max_attempts: Some(5),
            max_consecutive_errors: 3,
            ..PollPolicy::fixed(Duration::from_millis(10))
        };
        let poller = DepositConfirmationPoller::new(client, policy);

        let err = poller
            .wait_for_deposit(ADDR, &ConfirmationRule::Positive, &CancellationToken::new())
            .await
            .unwrap_err();

        // a retry would hit the closed stub and surface as Transport
        assert!(matches!(err, Error::Format(_)), "got {:?}", err);
        assert!(request.await.unwrap().contains("getAddressInformation"));
    }
}
