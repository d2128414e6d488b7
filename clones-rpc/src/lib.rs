//! # Clones RPC
//!
//! JSON-RPC implementations of the wallet, chain-read and signer boundaries.
//!
//! - [`RpcClient`]: JSON-RPC 2.0 over HTTP
//! - [`RpcChain`]: `eth_chainId`, `eth_call` and reverse ENS
//! - [`RpcSigner`]: `eth_sendTransaction` plus receipt polling
//! - [`RpcWalletConnector`] / [`RpcWallet`]: a wallet bridge whose lifecycle
//!   events are synthesised by polling `eth_accounts` and `eth_chainId`
//!
//! ## Example
//!
//! ```rust,ignore
//! use clones_rpc::{RpcConfig, RpcWalletConnector};
//!
//! let connector = RpcWalletConnector::new(RpcConfig::new("http://127.0.0.1:8545"), registry);
//! let handle = connector.connect().await?;
//! let accounts = handle.accounts().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod chain;
pub mod ens;
mod signer;
mod transport;
mod wallet;

pub use chain::RpcChain;
pub use signer::RpcSigner;
pub use transport::{RpcClient, RpcConfig};
pub use wallet::{RpcWallet, RpcWalletConnector, WalletStateTracker};
