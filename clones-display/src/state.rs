//! Display state built from a session snapshot.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::B256;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use clones_core::config::NetworkConfig;
use clones_core::types::ChainClass;
use clones_session::{Session, SessionManager};

use crate::address::short_address;
use crate::eligibility::EligibilityChecker;
use crate::ens::{resolve_ens, EnsNameCache};

/// Banner shown when the wallet is not on Mainnet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkNotice {
    /// Connected to a chain the site does not support
    WrongNetwork,
    /// Connected to the test network
    Testnet,
}

impl fmt::Display for NetworkNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkNotice::WrongNetwork => f.write_str("Please connect to Ethereum Mainnet"),
            NetworkNotice::Testnet => f.write_str("You are connected to the test network"),
        }
    }
}

/// What the presentation layer renders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    /// A wallet is connected
    pub connected: bool,
    /// A connect sequence is running
    pub is_connecting: bool,
    /// Checksummed account, or empty
    pub address: String,
    /// Abbreviated account, or empty
    pub short_address: String,
    /// Primary ENS name, or empty
    pub ens_name: String,
    /// ENS name if known, otherwise the abbreviated account
    pub label: String,
    /// Chain id reported by the wallet
    pub chain_id: Option<u64>,
    /// Chain classification
    pub chain_class: Option<ChainClass>,
    /// Network banner
    pub notice: Option<NetworkNotice>,
    /// Transaction URL prefix of the block explorer
    pub explorer: Option<String>,
    /// Mainnet-only mint actions are available
    pub mint_enabled: bool,
    /// Per-transaction limit, once computed
    pub max_per_transaction: Option<u32>,
    /// Allow-listed collections the account holds
    pub holds: Vec<String>,
}

impl DisplayState {
    /// Derives the display state from a snapshot.
    pub fn from_session(session: &Session, networks: &NetworkConfig) -> Self {
        let address = session.address_string();
        let short = short_address(&address);
        let label = if session.ens_name.is_empty() {
            short.clone()
        } else {
            session.ens_name.clone()
        };

        let chain_class = session.chain_class();
        let notice = match chain_class {
            Some(ChainClass::Unknown) => Some(NetworkNotice::WrongNetwork),
            Some(ChainClass::Testnet) => Some(NetworkNotice::Testnet),
            Some(ChainClass::Mainnet) | None => None,
        };

        Self {
            connected: session.is_connected(),
            is_connecting: session.is_connecting,
            address,
            short_address: short,
            ens_name: session.ens_name.clone(),
            label,
            chain_id: session.chain_id(),
            chain_class,
            notice,
            explorer: chain_class
                .and_then(|class| networks.explorer(class))
                .map(str::to_string),
            mint_enabled: chain_class.is_some_and(ChainClass::is_mainnet),
            max_per_transaction: session.eligibility.as_ref().map(|e| e.max_per_transaction),
            holds: session
                .eligibility
                .as_ref()
                .map(|e| e.holds.clone())
                .unwrap_or_default(),
        }
    }

    /// Explorer link for a transaction on the current chain.
    pub fn explorer_tx_url(&self, hash: &B256) -> Option<String> {
        self.explorer.as_ref().map(|prefix| format!("{prefix}{hash}"))
    }
}

/// Runs ENS resolution and the holder checks concurrently, then derives the
/// display state from the updated session.
///
/// Call it after connecting; [`AutoRefresh`] repeats it whenever the account
/// or chain changes.
pub async fn refresh(
    manager: &SessionManager,
    ens_cache: &EnsNameCache,
    checker: &EligibilityChecker,
) -> DisplayState {
    futures::join!(resolve_ens(manager, ens_cache), checker.refresh(manager));
    DisplayState::from_session(&manager.snapshot(), manager.networks())
}

/// Background task re-running [`refresh`] whenever the session's account or
/// chain class changes. Aborted on drop.
pub struct AutoRefresh {
    task: JoinHandle<()>,
}

impl AutoRefresh {
    /// Starts following `manager`; refreshes at once if a wallet is connected.
    pub fn spawn(
        manager: Arc<SessionManager>,
        ens_cache: Arc<EnsNameCache>,
        checker: Arc<EligibilityChecker>,
    ) -> Self {
        Self {
            task: tokio::spawn(follow_session(manager, ens_cache, checker)),
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn follow_session(
    manager: Arc<SessionManager>,
    ens_cache: Arc<EnsNameCache>,
    checker: Arc<EligibilityChecker>,
) {
    let mut changes = manager.subscribe_changes();
    let mut seen = None;
    loop {
        let key = {
            let session = changes.borrow_and_update();
            session.address().zip(session.chain_class())
        };
        if key != seen {
            seen = key;
            if key.is_some() {
                let state = refresh(&manager, &ens_cache, &checker).await;
                debug!(label = %state.label, max = ?state.max_per_transaction, "Display refreshed");
            }
        }
        if changes.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use alloy::primitives::{Address, U256};
    use alloy::sol_types::SolCall;
    use clones_core::abi::IERC721;
    use clones_core::config::{EligibilityConfig, HolderCheck};
    use clones_core::mock::{MockProviderCache, MockWallet};
    use clones_core::types::WalletEvent;
    use test_case::test_case;

    fn account(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn connected(chain_id: u64) -> (MockWallet, Arc<SessionManager>) {
        let wallet = MockWallet::with_account(account(0xab), chain_id);
        let manager = SessionManager::new(
            Arc::new(wallet.clone()),
            Arc::new(MockProviderCache::default()),
            NetworkConfig::default(),
        );
        tokio_test::block_on(manager.connect()).unwrap();
        (wallet, manager)
    }

    #[test]
    fn test_disconnected_state() {
        let state = DisplayState::from_session(&Session::default(), &NetworkConfig::default());
        assert!(!state.connected);
        assert_eq!(state.address, "");
        assert_eq!(state.short_address, "");
        assert_eq!(state.label, "");
        assert!(state.notice.is_none());
        assert!(!state.mint_enabled);
    }

    #[test_case(1, None, true, "https://etherscan.io/tx/" ; "mainnet")]
    #[test_case(5, Some(NetworkNotice::Testnet), false, "https://goerli.etherscan.io/tx/" ; "testnet")]
    fn test_known_networks(chain_id: u64, notice: Option<NetworkNotice>, enabled: bool, explorer: &str) {
        let (_wallet, manager) = connected(chain_id);
        let state = DisplayState::from_session(&manager.snapshot(), manager.networks());

        assert_eq!(state.notice, notice);
        assert_eq!(state.mint_enabled, enabled);
        assert_eq!(state.explorer.as_deref(), Some(explorer));
        assert_eq!(state.label, "0xABaB...ABaB");
    }

    #[test]
    fn test_unknown_network_warns() {
        let (_wallet, manager) = connected(137);
        let state = DisplayState::from_session(&manager.snapshot(), manager.networks());

        assert_eq!(state.notice, Some(NetworkNotice::WrongNetwork));
        assert_eq!(
            state.notice.map(|n| n.to_string()).as_deref(),
            Some("Please connect to Ethereum Mainnet")
        );
        assert!(state.explorer.is_none());
        assert!(!state.mint_enabled);
    }

    #[tokio::test]
    async fn test_refresh_fills_name_and_limit() {
        let wallet = MockWallet::with_account(account(0xab), 1);
        wallet.set_name(account(0xab), "clone.eth");
        wallet.set_word(account(0xc1), IERC721::balanceOfCall::SELECTOR, U256::from(1));
        let manager = SessionManager::new(
            Arc::new(wallet.clone()),
            Arc::new(MockProviderCache::default()),
            NetworkConfig::default(),
        );
        manager.connect().await.unwrap();

        let checker = EligibilityChecker::new(EligibilityConfig {
            mainnet_checks: vec![HolderCheck::erc721("Clone X", account(0xc1))],
            ..EligibilityConfig::default()
        });
        let state = refresh(&manager, &EnsNameCache::new(), &checker).await;

        assert_eq!(state.label, "clone.eth");
        assert_eq!(state.max_per_transaction, Some(10));
        assert_eq!(state.holds, vec!["Clone X".to_string()]);
        assert_eq!(
            state.explorer_tx_url(&B256::ZERO).unwrap(),
            format!("https://etherscan.io/tx/{}", B256::ZERO)
        );
    }

    #[tokio::test]
    async fn test_auto_refresh_follows_account_switch() {
        let wallet = MockWallet::with_account(account(0x01), 1);
        wallet.set_name(account(0x02), "second.eth");
        let manager = SessionManager::new(
            Arc::new(wallet.clone()),
            Arc::new(MockProviderCache::default()),
            NetworkConfig::default(),
        );
        manager.connect().await.unwrap();

        let _refresher = AutoRefresh::spawn(
            Arc::clone(&manager),
            Arc::new(EnsNameCache::new()),
            Arc::new(EligibilityChecker::new(EligibilityConfig::default())),
        );
        let mut changes = manager.subscribe_changes();
        tokio::time::timeout(Duration::from_secs(2), changes.wait_for(|s| s.eligibility.is_some()))
            .await
            .unwrap()
            .unwrap();

        wallet.emit(WalletEvent::AccountsChanged(vec![account(0x02)]));
        tokio::time::timeout(
            Duration::from_secs(2),
            changes.wait_for(|s| {
                s.address() == Some(account(0x02))
                    && s.ens_name == "second.eth"
                    && s.eligibility.is_some()
            }),
        )
        .await
        .unwrap()
        .unwrap();

        let state = DisplayState::from_session(&manager.snapshot(), manager.networks());
        assert_eq!(state.label, "second.eth");
        assert_eq!(state.max_per_transaction, Some(5));
    }
}
