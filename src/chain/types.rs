//! Wire types for the TON JSON-RPC provider

use serde::Serialize;
use serde_json::Value;

use crate::amount::Amount;
use crate::error::{Error, Result};

/// JSON-RPC method used for balance lookups
pub const GET_ADDRESS_INFORMATION: &str = "getAddressInformation";

/// JSON-RPC 2.0 request envelope
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub method: &'a str,
    pub params: Vec<&'a str>,
    pub id: u64,
    pub jsonrpc: &'a str,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn address_information(address: &'a str, id: u64) -> Self {
        Self {
            method: GET_ADDRESS_INFORMATION,
            params: vec![address],
            id,
            jsonrpc: "2.0",
        }
    }
}

/// Transfer submission body
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub recipient: String,
    pub amount: Amount,
}

/// Pull `result.balance` out of a `getAddressInformation` response.
///
/// Missing fields and non-integer values are format errors; a malformed
/// payload never reads as a zero balance.
pub fn parse_balance_response(body: &Value) -> Result<Amount> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Err(Error::Format(format!("provider returned error: {}", err)));
    }

    let result = body
        .get("result")
        .filter(|r| r.is_object())
        .ok_or_else(|| Error::Format("response has no `result` object".to_string()))?;

    let balance = result
        .get("balance")
        .ok_or_else(|| Error::Format("response has no `result.balance` field".to_string()))?;

    match balance {
        Value::String(s) => s
            .parse()
            .map_err(|e| Error::Format(format!("non-numeric balance {:?}: {}", s, e))),
        Value::Number(n) => match n.as_u64() {
            Some(v) => Ok(Amount::from(v)),
            None => Err(Error::Format(format!("balance is not an unsigned integer: {}", n))),
        },
        other => Err(Error::Format(format!("unexpected balance value: {}", other))),
    }
}
