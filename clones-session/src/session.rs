//! Session snapshot types.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::Address;

use clones_core::traits::{ChainReader, TransactionSigner, WalletHandle};
use clones_core::types::{ChainClass, MintEligibility};

/// Everything derived from a live wallet handle.
///
/// Exists as a whole or not at all, so a reader can never observe a handle
/// without its signer or an address without its chain.
#[derive(Clone)]
pub struct Connection {
    /// The wallet connection
    pub handle: Arc<dyn WalletHandle>,
    /// Read handle derived from the wallet
    pub reader: Arc<dyn ChainReader>,
    /// Write handle for the active account
    pub signer: Arc<dyn TransactionSigner>,
    /// Active account
    pub address: Address,
    /// Chain id reported by the wallet
    pub chain_id: u64,
    /// Classification of `chain_id`
    pub chain_class: ChainClass,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("chain_class", &self.chain_class)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the wallet session.
#[derive(Clone, Debug, Default)]
pub struct Session {
    /// Live connection, if any
    pub connection: Option<Connection>,
    /// Primary ENS name of the active account, empty when unknown
    pub ens_name: String,
    /// Mint limit for the active account on the current chain
    pub eligibility: Option<MintEligibility>,
    /// True only while a connect sequence runs
    pub is_connecting: bool,
    /// Bumped whenever a connection is established or torn down
    pub epoch: u64,
}

impl Session {
    /// Returns true when a wallet is connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Active account.
    pub fn address(&self) -> Option<Address> {
        self.connection.as_ref().map(|c| c.address)
    }

    /// Checksummed active account, or an empty string.
    pub fn address_string(&self) -> String {
        self.address()
            .map(|a| a.to_checksum(None))
            .unwrap_or_default()
    }

    /// Chain class; only meaningful while connected.
    pub fn chain_class(&self) -> Option<ChainClass> {
        self.connection.as_ref().map(|c| c.chain_class)
    }

    /// Chain id reported by the wallet.
    pub fn chain_id(&self) -> Option<u64> {
        self.connection.as_ref().map(|c| c.chain_id)
    }

    /// Read handle.
    pub fn reader(&self) -> Option<Arc<dyn ChainReader>> {
        self.connection.as_ref().map(|c| Arc::clone(&c.reader))
    }

    /// Write handle.
    pub fn signer(&self) -> Option<Arc<dyn TransactionSigner>> {
        self.connection.as_ref().map(|c| Arc::clone(&c.signer))
    }
}
