//! Domain types shared across the client crates.

use std::fmt;

use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Which configured network the wallet is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainClass {
    /// The configured production chain.
    Mainnet,
    /// The configured test chain.
    Testnet,
    /// Anything else; mainnet-gated actions stay disabled.
    Unknown,
}

impl ChainClass {
    /// Returns true for Mainnet or Testnet.
    pub fn is_known(self) -> bool {
        !matches!(self, ChainClass::Unknown)
    }

    /// Returns true only for Mainnet.
    pub fn is_mainnet(self) -> bool {
        matches!(self, ChainClass::Mainnet)
    }
}

impl fmt::Display for ChainClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChainClass::Mainnet => "mainnet",
            ChainClass::Testnet => "testnet",
            ChainClass::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle events emitted by an external wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    /// The exposed account list changed; first entry is the active account.
    AccountsChanged(Vec<Address>),
    /// The wallet switched to another chain.
    ChainChanged(u64),
    /// The wallet (re)established its connection to a chain.
    Connect {
        /// Chain id reported on connect
        chain_id: u64,
    },
    /// The wallet lost its connection.
    Disconnect {
        /// Provider error code
        code: i64,
        /// Provider error message
        message: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// A state-changing contract call handed to a signer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    /// Sending account
    pub from: Address,
    /// Contract address
    pub to: Address,
    /// ABI-encoded calldata
    pub data: Bytes,
    /// ETH attached to the call, in wei
    pub value: U256,
    /// Explicit gas limit; the wallet estimates when `None`
    pub gas_limit: Option<u64>,
}

/// Outcome reported by a transaction receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Included and executed successfully.
    Success,
    /// Included but reverted.
    Reverted,
}

/// Status of a submitted mint transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Accepted by the network, not yet included.
    Pending,
    /// Included successfully.
    Confirmed,
    /// Included and reverted, or lost.
    Failed,
}

/// One user-initiated mint transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Hash assigned when the network accepted the transaction
    pub hash: B256,
    /// Current status
    pub status: TxStatus,
    /// When the transaction was accepted
    pub submitted_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Creates a pending record for a freshly accepted transaction.
    pub fn pending(hash: B256) -> Self {
        Self {
            hash,
            status: TxStatus::Pending,
            submitted_at: Utc::now(),
        }
    }

    /// Applies the receipt outcome.
    pub fn settle(&mut self, receipt: ReceiptStatus) {
        self.status = match receipt {
            ReceiptStatus::Success => TxStatus::Confirmed,
            ReceiptStatus::Reverted => TxStatus::Failed,
        };
    }

    /// Returns true once the record is no longer pending.
    pub fn is_settled(&self) -> bool {
        self.status != TxStatus::Pending
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ELIGIBILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-transaction mint limit for the connected account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintEligibility {
    /// Maximum tokens per mint transaction
    pub max_per_transaction: u32,
    /// Whether the bonus limit applies
    pub bonus: bool,
    /// Names of the holder checks that came back positive
    pub holds: Vec<String>,
}

impl MintEligibility {
    /// The limit everyone gets.
    pub fn baseline(max_per_transaction: u32) -> Self {
        Self {
            max_per_transaction,
            bonus: false,
            holds: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_class_flags() {
        assert!(ChainClass::Mainnet.is_known());
        assert!(ChainClass::Testnet.is_known());
        assert!(!ChainClass::Unknown.is_known());
        assert!(ChainClass::Mainnet.is_mainnet());
        assert!(!ChainClass::Testnet.is_mainnet());
    }

    #[test]
    fn test_record_settle() {
        let mut record = TransactionRecord::pending(B256::repeat_byte(1));
        assert!(!record.is_settled());

        record.settle(ReceiptStatus::Reverted);
        assert_eq!(record.status, TxStatus::Failed);
        assert!(record.is_settled());
    }

    #[test]
    fn test_chain_class_serde() {
        let json = serde_json::to_string(&ChainClass::Testnet).unwrap();
        assert_eq!(json, "\"testnet\"");
    }
}
