//! Account-bound transaction submission over JSON-RPC.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

use clones_core::error::Result;
use clones_core::traits::TransactionSigner;
use clones_core::types::{CallRequest, ReceiptStatus};

use crate::transport::{encode_bytes, parse_hash, quantity, u256_quantity, RpcClient};

/// [`TransactionSigner`] that lets the wallet behind the endpoint sign.
pub struct RpcSigner {
    client: Arc<RpcClient>,
    account: Address,
    poll_interval: Duration,
}

impl RpcSigner {
    /// Creates a signer for `account`.
    pub fn new(client: Arc<RpcClient>, account: Address) -> Self {
        let poll_interval = client.config().poll_interval;
        Self {
            client,
            account,
            poll_interval,
        }
    }

    fn transaction_object(request: &CallRequest) -> Value {
        let mut tx = Map::new();
        tx.insert("from".into(), json!(request.from.to_checksum(None)));
        tx.insert("to".into(), json!(request.to.to_checksum(None)));
        tx.insert("data".into(), json!(encode_bytes(&request.data)));
        if !request.value.is_zero() {
            tx.insert("value".into(), json!(u256_quantity(request.value)));
        }
        if let Some(gas) = request.gas_limit {
            tx.insert("gas".into(), json!(quantity(gas)));
        }
        Value::Object(tx)
    }
}

#[async_trait]
impl TransactionSigner for RpcSigner {
    fn address(&self) -> Address {
        self.account
    }

    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    async fn send_transaction(&self, request: CallRequest) -> Result<B256> {
        let params = json!([Self::transaction_object(&request)]);
        let raw: String = self.client.request("eth_sendTransaction", params).await?;
        let hash = parse_hash(&raw)?;
        info!(%hash, "Transaction accepted");
        Ok(hash)
    }

    #[instrument(skip(self))]
    async fn wait_for_receipt(&self, hash: B256) -> Result<ReceiptStatus> {
        loop {
            let receipt: Option<Value> = self
                .client
                .request("eth_getTransactionReceipt", json!([hash.to_string()]))
                .await?;

            if let Some(receipt) = receipt {
                let status = receipt.get("status").and_then(Value::as_str).unwrap_or("0x0");
                debug!(%hash, status, "Receipt available");
                return Ok(if status == "0x1" {
                    ReceiptStatus::Success
                } else {
                    ReceiptStatus::Reverted
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RpcConfig;
    use alloy::primitives::{Bytes, U256};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CallRequest {
        CallRequest {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            data: Bytes::from(vec![0xde, 0xad]),
            value: U256::ZERO,
            gas_limit: None,
        }
    }

    fn signer_for(server: &MockServer) -> RpcSigner {
        let config = RpcConfig::new(server.uri()).poll_interval(Duration::from_millis(10));
        RpcSigner::new(Arc::new(RpcClient::new(config).unwrap()), Address::repeat_byte(1))
    }

    #[test]
    fn test_transaction_object_omits_defaults() {
        let tx = RpcSigner::transaction_object(&request());
        assert!(tx.get("value").is_none());
        assert!(tx.get("gas").is_none());
        assert_eq!(tx["data"], "0xdead");
    }

    #[test]
    fn test_transaction_object_value_and_gas() {
        let mut req = request();
        req.value = U256::from(300_000_000_000_000_000u64);
        req.gas_limit = Some(120_000);

        let tx = RpcSigner::transaction_object(&req);
        assert_eq!(tx["value"], "0x429d069189e0000");
        assert_eq!(tx["gas"], "0x1d4c0");
    }

    #[tokio::test]
    async fn test_send_transaction_returns_hash() {
        let server = MockServer::start().await;
        let hash = format!("0x{}", "ab".repeat(32));
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": hash
            })))
            .mount(&server)
            .await;

        let got = signer_for(&server).send_transaction(request()).await.unwrap();
        assert_eq!(got, B256::repeat_byte(0xab));
    }

    #[tokio::test]
    async fn test_wait_for_reverted_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": { "status": "0x0" }
            })))
            .mount(&server)
            .await;

        let status = signer_for(&server)
            .wait_for_receipt(B256::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(status, ReceiptStatus::Reverted);
    }

    #[tokio::test]
    async fn test_wait_polls_until_included() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": null
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": { "status": "0x1" }
            })))
            .mount(&server)
            .await;

        let status = signer_for(&server)
            .wait_for_receipt(B256::repeat_byte(1))
            .await
            .unwrap();
        assert_eq!(status, ReceiptStatus::Success);
    }
}
