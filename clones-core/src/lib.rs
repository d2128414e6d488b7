//! # Clones Core
//!
//! Core types, errors, configuration and boundary traits for the Cool x Clones
//! mint client.
//!
//! This crate provides the foundational building blocks used by all other crates:
//!
//! - **Types**: chain classification, wallet events, transaction records, eligibility
//! - **Errors**: the connection / submission / confirmation / read taxonomy
//! - **Config**: chain ids, contract addresses and holder checks as deployment data
//! - **Traits**: the wallet, chain-read, signer and persistence boundaries
//! - **ABI**: `sol!` interfaces for every contract the client talks to
//!
//! ## Example
//!
//! ```rust
//! use clones_core::{ChainClass, ClonesConfig};
//!
//! let config = ClonesConfig::default();
//! assert_eq!(config.networks.classify(1), ChainClass::Mainnet);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod abi;
pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used items at crate root
pub use config::*;
pub use constants::*;
pub use error::{ClonesError, Result};
pub use traits::*;
pub use types::*;
