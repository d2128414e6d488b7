//! JSON-RPC 2.0 over HTTP.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use clones_core::constants::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS};
use clones_core::error::{ClonesError, Result};
use clones_core::ClonesConfig;

/// Transport configuration.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// Endpoint URL
    pub url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Interval between receipt and wallet-state polls
    pub poll_interval: Duration,
}

impl RpcConfig {
    /// Creates a configuration with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Sets the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl From<&ClonesConfig> for RpcConfig {
    fn from(config: &ClonesConfig) -> Self {
        Self {
            url: config.rpc_url.clone(),
            timeout_seconds: config.request_timeout_seconds,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client.
pub struct RpcClient {
    config: RpcConfig,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client.
    pub fn new(config: RpcConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ClonesError::HttpError(e.to_string()))?;

        Ok(Self {
            config,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Transport configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Sends one request and deserializes its `result`.
    ///
    /// A JSON `null` result deserializes into `Option::None` for optional
    /// return types (e.g. a receipt that does not exist yet).
    #[instrument(skip(self, params), fields(url = %self.config.url))]
    pub async fn request<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClonesError::ConnectionTimeout(e.to_string())
                } else {
                    ClonesError::HttpError(e.to_string())
                }
            })?;

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| ClonesError::HttpError(e.to_string()))?;

        if let Some(error) = response.error {
            warn!(method, code = error.code, message = %error.message, "RPC error");
            return Err(ClonesError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        debug!(method, id, "RPC response");
        Ok(serde_json::from_value(response.result.unwrap_or(Value::Null))?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEX CODECS
// ═══════════════════════════════════════════════════════════════════════════════

fn strip_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}

/// Parses a hex quantity such as `"0x1"`.
pub(crate) fn parse_quantity(raw: &str) -> Result<u64> {
    let digits = strip_prefix(raw);
    if digits.is_empty() {
        return Err(ClonesError::ValidationError(format!("empty quantity '{raw}'")));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ClonesError::ValidationError(format!("invalid quantity '{raw}': {e}")))
}

/// Formats a hex quantity.
pub(crate) fn quantity(value: u64) -> String {
    format!("0x{value:x}")
}

/// Formats a 256-bit hex quantity.
pub(crate) fn u256_quantity(value: U256) -> String {
    format!("0x{value:x}")
}

/// Parses hex data such as an `eth_call` result.
pub(crate) fn parse_bytes(raw: &str) -> Result<Bytes> {
    Ok(Bytes::from(hex::decode(strip_prefix(raw))?))
}

/// Formats hex data.
pub(crate) fn encode_bytes(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

pub(crate) fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw).map_err(|e| ClonesError::InvalidAddress(format!("{raw}: {e}")))
}

pub(crate) fn parse_hash(raw: &str) -> Result<B256> {
    B256::from_str(raw)
        .map_err(|e| ClonesError::ValidationError(format!("invalid transaction hash '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_quantity_codec() {
        assert_eq!(parse_quantity("0x1").unwrap(), 1);
        assert_eq!(parse_quantity("0X5").unwrap(), 5);
        assert_eq!(quantity(1), "0x1");
        assert_eq!(u256_quantity(U256::from(255)), "0xff");
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_bytes_codec() {
        let bytes = parse_bytes("0x00ff").unwrap();
        assert_eq!(bytes.as_ref(), &[0x00, 0xff]);
        assert_eq!(encode_bytes(&bytes), "0x00ff");
        assert!(parse_bytes("0x").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({ "method": "eth_chainId" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x5"
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(RpcConfig::new(server.uri())).unwrap();
        let chain: String = client.request("eth_chainId", serde_json::json!([])).await.unwrap();
        assert_eq!(parse_quantity(&chain).unwrap(), 5);
    }

    #[tokio::test]
    async fn test_request_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": 4001, "message": "User rejected the request." }
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(RpcConfig::new(server.uri())).unwrap();
        let err = client
            .request::<Value>("eth_sendTransaction", serde_json::json!([]))
            .await
            .unwrap_err();
        assert!(err.is_user_rejection());
    }

    #[tokio::test]
    async fn test_null_result_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "jsonrpc": "2.0", "id": 1, "result": null
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(RpcConfig::new(server.uri())).unwrap();
        let receipt: Option<Value> = client
            .request("eth_getTransactionReceipt", serde_json::json!(["0x00"]))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }
}
