//! OKX withdrawal wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Withdrawal request body
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawRequest {
    pub ccy: String,
    /// Amount in whole currency units, e.g. "1.5"
    pub amt: String,
    #[serde(rename = "toAddr")]
    pub to_addr: String,
    pub network: String,
    #[serde(rename = "clientId", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Standard OKX response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct OkxEnvelope {
    pub code: Option<String>,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Exchange acknowledgement of a withdrawal.
///
/// Acknowledgement only: funds have not necessarily left the exchange.
#[derive(Debug, Clone)]
pub struct WithdrawReceipt {
    pub status: u16,
    /// Exchange-side withdrawal id, when the response carries one
    pub withdrawal_id: Option<String>,
    pub client_id: Option<String>,
    pub body: String,
}

/// Interpret a 2xx withdrawal response body.
///
/// The body is otherwise opaque, but OKX reports business failures with
/// HTTP 200 and a non-zero `code`; those are rejections. Returns the
/// withdrawal id if present.
pub fn interpret_withdraw_body(status: u16, body: &str) -> Result<Option<String>> {
    let envelope = match serde_json::from_str::<OkxEnvelope>(body) {
        Ok(envelope) => envelope,
        Err(_) => return Ok(None),
    };

    if let Some(code) = envelope.code.as_deref() {
        if code != "0" {
            return Err(Error::ExchangeRejected {
                status,
                body: format!("code {}: {}", code, envelope.msg),
            });
        }
    }

    Ok(envelope
        .data
        .first()
        .and_then(|d| d.get("wdId"))
        .and_then(|id| id.as_str())
        .map(str::to_string))
}
