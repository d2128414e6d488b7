//! Wallet bridge over a JSON-RPC endpoint.
//!
//! A node or signing proxy has no push channel, so lifecycle events are
//! synthesised: a background task polls `eth_accounts` and `eth_chainId`
//! and [`WalletStateTracker`] turns the differences into [`WalletEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use clones_core::error::{ClonesError, Result};
use clones_core::traits::{ChainReader, TransactionSigner, WalletConnector, WalletHandle};
use clones_core::types::WalletEvent;

use crate::chain::RpcChain;
use crate::signer::RpcSigner;
use crate::transport::{parse_address, parse_quantity, quantity, RpcClient, RpcConfig};

/// Provider code for "the provider is disconnected from all chains".
const DISCONNECTED_CODE: i64 = 4900;

const EVENT_CAPACITY: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// CONNECTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Opens [`RpcWallet`] connections to one endpoint.
pub struct RpcWalletConnector {
    config: RpcConfig,
    provider_id: String,
    ens_registry: Address,
}

impl RpcWalletConnector {
    /// Creates a connector remembered under the provider id `"injected"`.
    pub fn new(config: RpcConfig, ens_registry: Address) -> Self {
        Self {
            config,
            provider_id: "injected".into(),
            ens_registry,
        }
    }

    /// Overrides the provider id written to the provider cache.
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }
}

#[async_trait]
impl WalletConnector for RpcWalletConnector {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    #[instrument(skip(self), fields(url = %self.config.url))]
    async fn connect(&self) -> Result<Arc<dyn WalletHandle>> {
        let client = Arc::new(RpcClient::new(self.config.clone())?);

        let wallet = RpcWallet::open(client, self.ens_registry)
            .await
            .map_err(|e| ClonesError::ConnectionError(e.to_string()))?;

        info!("Wallet endpoint connected");
        Ok(Arc::new(wallet))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET
// ═══════════════════════════════════════════════════════════════════════════════

/// A connected JSON-RPC wallet.
///
/// Dropping it stops the event poller.
pub struct RpcWallet {
    client: Arc<RpcClient>,
    chain: Arc<RpcChain>,
    events: broadcast::Sender<WalletEvent>,
    poller: JoinHandle<()>,
}

impl RpcWallet {
    /// Checks the endpoint, reads its initial state and starts polling.
    pub async fn open(client: Arc<RpcClient>, ens_registry: Address) -> Result<Self> {
        let chain = Arc::new(RpcChain::new(Arc::clone(&client), ens_registry));
        let chain_id = chain.chain_id().await?;
        let accounts = fetch_accounts(&client).await?;
        debug!(chain_id, accounts = accounts.len(), "Initial wallet state");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let tracker = WalletStateTracker::new(accounts, chain_id);
        let poller = tokio::spawn(poll_loop(
            Arc::clone(&client),
            events.clone(),
            tracker,
            client.config().poll_interval,
        ));

        Ok(Self {
            client,
            chain,
            events,
            poller,
        })
    }
}

impl Drop for RpcWallet {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

#[async_trait]
impl WalletHandle for RpcWallet {
    async fn chain_id(&self) -> Result<u64> {
        self.chain.chain_id().await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        fetch_accounts(&self.client).await
    }

    fn reader(&self) -> Arc<dyn ChainReader> {
        self.chain.clone()
    }

    fn signer(&self, account: Address) -> Arc<dyn TransactionSigner> {
        Arc::new(RpcSigner::new(Arc::clone(&self.client), account))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    #[instrument(skip(self))]
    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let _: serde_json::Value = self
            .client
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": quantity(chain_id) }]),
            )
            .await?;
        Ok(())
    }
}

async fn fetch_accounts(client: &RpcClient) -> Result<Vec<Address>> {
    let raw: Vec<String> = client.request("eth_accounts", json!([])).await?;
    raw.iter().map(|a| parse_address(a)).collect()
}

async fn fetch_state(client: &RpcClient) -> Result<(Vec<Address>, u64)> {
    let raw: String = client.request("eth_chainId", json!([])).await?;
    let chain_id = parse_quantity(&raw)?;
    let accounts = fetch_accounts(client).await?;
    Ok((accounts, chain_id))
}

async fn poll_loop(
    client: Arc<RpcClient>,
    events: broadcast::Sender<WalletEvent>,
    mut tracker: WalletStateTracker,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately and the state was just read
    ticker.tick().await;

    loop {
        ticker.tick().await;
        for event in tracker.observe(fetch_state(&client).await) {
            debug!(?event, "Wallet event");
            // No subscribers is fine
            let _ = events.send(event);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE TRACKER
// ═══════════════════════════════════════════════════════════════════════════════

/// Diffs successive wallet polls into lifecycle events.
#[derive(Clone, Debug)]
pub struct WalletStateTracker {
    accounts: Vec<Address>,
    chain_id: u64,
    online: bool,
}

impl WalletStateTracker {
    /// Starts from a known-good state.
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self {
            accounts,
            chain_id,
            online: true,
        }
    }

    /// Records one poll and returns the events it implies.
    ///
    /// A failed poll emits `Disconnect` once; the next successful poll emits
    /// `Connect` followed by any account or chain change that happened while
    /// offline.
    pub fn observe(&mut self, poll: Result<(Vec<Address>, u64)>) -> Vec<WalletEvent> {
        let mut events = Vec::new();

        let (accounts, chain_id) = match poll {
            Ok(state) => state,
            Err(e) => {
                if self.online {
                    warn!(error = %e, "Wallet endpoint unreachable");
                    self.online = false;
                    events.push(WalletEvent::Disconnect {
                        code: DISCONNECTED_CODE,
                        message: e.to_string(),
                    });
                }
                return events;
            }
        };

        if !self.online {
            self.online = true;
            events.push(WalletEvent::Connect { chain_id });
        }

        if accounts != self.accounts {
            self.accounts = accounts.clone();
            events.push(WalletEvent::AccountsChanged(accounts));
        }

        if chain_id != self.chain_id {
            self.chain_id = chain_id;
            events.push(WalletEvent::ChainChanged(chain_id));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn account(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_tracker_unchanged_state_is_silent() {
        let mut tracker = WalletStateTracker::new(vec![account(1)], 1);
        assert!(tracker.observe(Ok((vec![account(1)], 1))).is_empty());
    }

    #[test]
    fn test_tracker_account_and_chain_changes() {
        let mut tracker = WalletStateTracker::new(vec![account(1)], 1);

        let events = tracker.observe(Ok((vec![account(2)], 5)));
        assert_eq!(
            events,
            vec![
                WalletEvent::AccountsChanged(vec![account(2)]),
                WalletEvent::ChainChanged(5),
            ]
        );

        let events = tracker.observe(Ok((vec![], 5)));
        assert_eq!(events, vec![WalletEvent::AccountsChanged(vec![])]);
    }

    #[test]
    fn test_tracker_disconnect_once_then_reconnect() {
        let mut tracker = WalletStateTracker::new(vec![account(1)], 1);

        let first = tracker.observe(Err(ClonesError::HttpError("down".into())));
        assert!(matches!(
            first.as_slice(),
            [WalletEvent::Disconnect { code: DISCONNECTED_CODE, .. }]
        ));
        assert!(tracker
            .observe(Err(ClonesError::HttpError("down".into())))
            .is_empty());

        let back = tracker.observe(Ok((vec![account(1)], 1)));
        assert_eq!(back, vec![WalletEvent::Connect { chain_id: 1 }]);
    }

    async fn mount_state(server: &MockServer, chain: &str, accounts: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": chain
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_accounts" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": accounts
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_connect_reads_accounts() {
        let server = MockServer::start().await;
        let owner = format!("0x{}", "11".repeat(20));
        mount_state(&server, "0x5", json!([owner])).await;

        let connector = RpcWalletConnector::new(RpcConfig::new(server.uri()), Address::ZERO);
        let handle = connector.connect().await.unwrap();

        assert_eq!(handle.chain_id().await.unwrap(), 5);
        assert_eq!(handle.accounts().await.unwrap(), vec![account(0x11)]);
        assert_eq!(handle.signer(account(0x11)).address(), account(0x11));
    }

    #[tokio::test]
    async fn test_connect_unreachable_is_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let connector = RpcWalletConnector::new(RpcConfig::new(server.uri()), Address::ZERO);
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, ClonesError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_switch_chain_request() {
        let server = MockServer::start().await;
        mount_state(&server, "0x1", json!([])).await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "wallet_switchEthereumChain",
                "params": [{ "chainId": "0x5" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let connector = RpcWalletConnector::new(RpcConfig::new(server.uri()), Address::ZERO);
        let handle = connector.connect().await.unwrap();
        handle.switch_chain(5).await.unwrap();
    }
}
