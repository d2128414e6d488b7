//! Boundary traits.
//!
//! The session, display and mint crates only talk to the outside world
//! through these interfaces, so a JSON-RPC bridge, a browser wallet or an
//! in-memory double can be swapped in.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{CallRequest, ReceiptStatus, WalletEvent};

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET
// ═══════════════════════════════════════════════════════════════════════════════

/// Entry point to an external wallet.
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Identifier remembered as "last provider used".
    fn provider_id(&self) -> &str;

    /// Opens a connection; fails if the user rejects it.
    async fn connect(&self) -> Result<Arc<dyn WalletHandle>>;
}

/// A live wallet connection.
#[async_trait]
pub trait WalletHandle: Send + Sync {
    /// Chain id the wallet is currently on.
    async fn chain_id(&self) -> Result<u64>;

    /// Accounts the wallet exposes; the first one is active.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Read-capable network handle.
    fn reader(&self) -> Arc<dyn ChainReader>;

    /// Write-capable handle for one account.
    fn signer(&self, account: Address) -> Arc<dyn TransactionSigner>;

    /// Subscribes to lifecycle events; dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;

    /// Asks the wallet to switch networks.
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN ACCESS
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only chain access.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Chain id of the network.
    async fn chain_id(&self) -> Result<u64>;

    /// Reverse ENS lookup; `None` when no primary name is set.
    async fn lookup_address(&self, address: Address) -> Result<Option<String>>;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;
}

/// Signer bound to one account.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Account that signs.
    fn address(&self) -> Address;

    /// Submits a transaction; returns once the network accepted it.
    async fn send_transaction(&self, request: CallRequest) -> Result<B256>;

    /// Waits until the transaction is included.
    async fn wait_for_receipt(&self, hash: B256) -> Result<ReceiptStatus>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Storage for the "a wallet provider was previously selected" marker.
#[async_trait]
pub trait ProviderCache: Send + Sync {
    /// Reads the marker.
    async fn load(&self) -> Result<Option<String>>;

    /// Writes the marker.
    async fn store(&self, provider_id: &str) -> Result<()>;

    /// Erases the marker.
    async fn clear(&self) -> Result<()>;
}
