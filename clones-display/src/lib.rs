//! # Clones Display
//!
//! Values the presentation layer shows, derived from a session snapshot.
//!
//! - [`short_address`]: `0x1234...abcd` style abbreviation
//! - [`resolve_ens`]: reverse ENS lookup with a TTL cache, Mainnet only
//! - [`EligibilityChecker`]: per-transaction mint limit from holder checks
//! - [`DisplayState`]: everything above bundled for rendering
//! - [`AutoRefresh`]: re-runs the lookups when the account or chain changes
//!
//! Lookups never fail loudly: a read that errors leaves the value at its
//! fallback and is logged.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod address;
mod eligibility;
mod ens;
mod state;

pub use address::short_address;
pub use eligibility::{check_holder, EligibilityChecker};
pub use ens::{resolve_ens, EnsCacheConfig, EnsNameCache};
pub use state::{refresh, AutoRefresh, DisplayState, NetworkNotice};
