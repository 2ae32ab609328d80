use log::{debug, error};
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::wallet::error::ConnectionError;

/// JSON-RPC 2.0 over HTTP, shared by the wallet bridges and chain nodes.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str) -> Result<Self, ConnectionError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ConnectionError::ProviderUnavailable(format!("invalid endpoint '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConnectionError::ProviderUnavailable(format!(
                "endpoint '{}' must be http(s)",
                url
            )));
        }

        Ok(Self {
            client: Client::new(),
            url: parsed.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ConnectionError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("📡 RPC {} #{} -> {}", method, id, self.url);

        let response = self.client.post(&self.url).json(&payload).send().await.map_err(|e| {
            error!("❌ RPC request {} failed: {}", method, e);
            ConnectionError::from(e)
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!("❌ RPC {} failed with status {}: {}", method, status, body);
            return Err(ConnectionError::NetworkFailure(format!("{} - {}", status, body)));
        }

        let body: Value = response.json().await.map_err(|e| {
            error!("❌ Failed to parse RPC response for {}: {}", method, e);
            ConnectionError::Unknown(format!("malformed RPC response: {}", e))
        })?;

        parse_rpc_body(body)
    }
}

pub(crate) fn parse_rpc_body(body: Value) -> Result<Value, ConnectionError> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = err.get("message").and_then(Value::as_str).unwrap_or("provider error");
        return Err(ConnectionError::from_rpc_code(code, message));
    }

    body.get("result")
        .cloned()
        .ok_or_else(|| ConnectionError::Unknown("RPC response without result".to_string()))
}

/// Parses a `0x`-prefixed hex quantity.
pub(crate) fn parse_hex_quantity(raw: &str) -> Option<u128> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    if digits.is_empty() {
        return Some(0);
    }
    u128::from_str_radix(digits, 16).ok()
}
