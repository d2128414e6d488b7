//! # Clones Mint
//!
//! Calls into the externally deployed mint contracts.
//!
//! - [`MintContract`]: calldata for each mint variant plus collection reads
//! - [`PriceQuote`]: the total and "towards prize" figures shown next to the
//!   quantity selector
//! - [`submit_mint`] / [`await_confirmation`]: one transaction, start to end
//! - [`MintTracker`]: one attempt at a time, tied to the session it started in
//!
//! ## Example
//!
//! ```rust,ignore
//! use clones_mint::{MintContract, MintOptions, MintTracker};
//!
//! let contract = MintContract::for_target(target, ChainClass::Testnet)?;
//! let tracker = MintTracker::new(manager.clone());
//! let hash = tracker.submit(&contract, 3, &options).await?;
//! let outcome = tracker.confirm().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod contract;
mod facade;
mod price;
mod tracker;

pub use contract::{CollectionStats, MintContract};
pub use facade::{await_confirmation, submit_mint, MintOptions};
pub use price::{mint_value, wei_to_ether, PriceQuote};
pub use tracker::{MintOutcome, MintPhase, MintTracker};
