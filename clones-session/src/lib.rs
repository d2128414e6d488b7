//! # Clones Session
//!
//! The wallet session: one connection to one wallet, its active account and
//! chain, plus the values derived from them.
//!
//! - [`Session`]: an immutable snapshot of the session
//! - [`SessionManager`]: the only writer; connect, disconnect, wallet events
//!   and auto-reconnect
//! - [`MemoryProviderCache`] / [`FileProviderCache`]: where the "last wallet
//!   provider used" marker lives between runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use clones_session::{FileProviderCache, SessionManager};
//!
//! let manager = SessionManager::new(connector, Arc::new(FileProviderCache::new(path)), networks);
//! manager.auto_reconnect().await?;
//!
//! let session = manager.snapshot();
//! println!("{} on {:?}", session.address_string(), session.chain_class());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod cache;
mod manager;
mod session;

pub use cache::{FileProviderCache, MemoryProviderCache};
pub use manager::SessionManager;
pub use session::{Connection, Session};
