//! In-memory collaborators for workflow tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::amount::Amount;
use crate::chain::{BalanceOracle, ChainTransferClient, TransferReceipt};
use crate::error::{Error, Result};
use crate::exchange::{ExchangeWithdrawClient, WithdrawReceipt};

/// Oracle answering from a script, then from an optional fallback balance
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Result<Amount>>>,
    fallback: Option<Amount>,
    calls: AtomicUsize,
    addresses: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Result<Amount>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            addresses: Mutex::new(Vec::new()),
        })
    }

    pub fn with_balances(balances: &[&str]) -> Arc<Self> {
        Self::new(balances.iter().map(|b| Ok(b.parse().unwrap())).collect())
    }

    pub fn repeating(balance: Amount) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(balance),
            calls: AtomicUsize::new(0),
            addresses: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn addresses(&self) -> Vec<String> {
        self.addresses.lock().unwrap().clone()
    }
}

#[async_trait]
impl BalanceOracle for ScriptedOracle {
    async fn get_balance(&self, address: &str) -> Result<Amount> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.addresses.lock().unwrap().push(address.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(balance)) => Ok(balance.clone()),
            (None, None) => Err(Error::Format("oracle script exhausted".to_string())),
        }
    }
}

/// Exchange that answers every withdrawal with a fixed HTTP status
pub struct FakeExchange {
    status: u16,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, Amount, String, String)>>,
}

impl FakeExchange {
    pub fn with_status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Amount, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeWithdrawClient for FakeExchange {
    async fn withdraw(
        &self,
        currency: &str,
        amount: &Amount,
        to_address: &str,
        network: &str,
    ) -> Result<WithdrawReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((
            currency.to_string(),
            amount.clone(),
            to_address.to_string(),
            network.to_string(),
        ));

        match self.status {
            200..=299 => Ok(WithdrawReceipt {
                status: self.status,
                withdrawal_id: Some("67485".to_string()),
                client_id: None,
                body: r#"{"code":"0","data":[{"wdId":"67485"}]}"#.to_string(),
            }),
            401 | 403 => Err(Error::Auth(format!("status {}", self.status))),
            status => Err(Error::ExchangeRejected {
                status,
                body: "rejected".to_string(),
            }),
        }
    }
}

/// Chain client recording each submission and answering with a fixed status
pub struct RecordingChain {
    status: u16,
    submissions: Mutex<Vec<(String, String, Amount)>>,
}

impl RecordingChain {
    pub fn with_status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            submissions: Mutex::new(Vec::new()),
        })
    }

    pub fn submissions(&self) -> Vec<(String, String, Amount)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainTransferClient for RecordingChain {
    async fn transfer(
        &self,
        provider_endpoint: &str,
        recipient: &str,
        amount: &Amount,
    ) -> Result<TransferReceipt> {
        self.submissions.lock().unwrap().push((
            provider_endpoint.to_string(),
            recipient.to_string(),
            amount.clone(),
        ));

        if (200..300).contains(&self.status) {
            Ok(TransferReceipt {
                status: self.status,
                body: "{}".to_string(),
            })
        } else {
            Err(Error::TransferRejected {
                status: self.status,
                body: "rejected".to_string(),
            })
        }
    }
}
