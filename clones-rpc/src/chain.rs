//! Read-only chain access over JSON-RPC.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use clones_core::error::Result;
use clones_core::traits::ChainReader;

use crate::ens;
use crate::transport::{encode_bytes, parse_bytes, parse_quantity, RpcClient};

/// [`ChainReader`] backed by a JSON-RPC node.
pub struct RpcChain {
    client: Arc<RpcClient>,
    ens_registry: Address,
}

impl RpcChain {
    /// Creates a reader using the given ENS registry for reverse lookups.
    pub fn new(client: Arc<RpcClient>, ens_registry: Address) -> Self {
        Self {
            client,
            ens_registry,
        }
    }
}

#[async_trait]
impl ChainReader for RpcChain {
    async fn chain_id(&self) -> Result<u64> {
        let raw: String = self.client.request("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>> {
        ens::lookup_address(self, self.ens_registry, address).await
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let params = json!([
            { "to": to.to_checksum(None), "data": encode_bytes(&data) },
            "latest"
        ]);
        let raw: String = self.client.request("eth_call", params).await?;
        parse_bytes(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RpcConfig;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn chain_for(server: &MockServer) -> RpcChain {
        let client = RpcClient::new(RpcConfig::new(server.uri())).unwrap();
        RpcChain::new(Arc::new(client), Address::repeat_byte(0xe5))
    }

    #[tokio::test]
    async fn test_chain_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": "0x1"
            })))
            .mount(&server)
            .await;

        assert_eq!(chain_for(&server).await.chain_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_call_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "result": "0x0000000000000000000000000000000000000000000000000000000000000002"
            })))
            .mount(&server)
            .await;

        let chain = chain_for(&server).await;
        let out = chain
            .call(Address::repeat_byte(1), Bytes::from(vec![0x70, 0xa0, 0x82, 0x31]))
            .await
            .unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(out[31], 2);
    }

    #[tokio::test]
    async fn test_call_revert_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": { "code": 3, "message": "execution reverted" }
            })))
            .mount(&server)
            .await;

        let chain = chain_for(&server).await;
        assert!(chain.call(Address::ZERO, Bytes::new()).await.is_err());
    }
}
