//! The session manager.
//!
//! Owns the single [`Session`] and is its only writer. Every grouped change
//! (connect, disconnect, account switch, chain switch) is applied in one
//! `watch` update, so readers either see the old session or the new one.
//!
//! # Events
//!
//! On connect the manager subscribes to the wallet's event stream and pumps
//! it on a background task. The task holds a [`Weak`] reference and is
//! aborted when the subscription guard is dropped, which happens whenever
//! the session is reset or replaced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use alloy::primitives::Address;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use clones_core::config::NetworkConfig;
use clones_core::error::{ClonesError, Result};
use clones_core::traits::{ProviderCache, WalletConnector, WalletHandle};
use clones_core::types::{ChainClass, MintEligibility, WalletEvent};

use crate::session::{Connection, Session};

/// Background event pump; aborted on drop.
struct EventSubscription {
    task: JoinHandle<()>,
}

impl EventSubscription {
    fn spawn(manager: Weak<SessionManager>, events: broadcast::Receiver<WalletEvent>) -> Self {
        Self {
            task: tokio::spawn(pump_events(manager, events)),
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn pump_events(manager: Weak<SessionManager>, mut events: broadcast::Receiver<WalletEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.handle_event(event).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Wallet events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("Wallet event stream ended");
}

/// Owner of the wallet session.
pub struct SessionManager {
    connector: Arc<dyn WalletConnector>,
    cache: Arc<dyn ProviderCache>,
    networks: NetworkConfig,
    state: watch::Sender<Session>,
    subscription: Mutex<Option<EventSubscription>>,
    auto_reconnect_attempted: AtomicBool,
}

impl SessionManager {
    /// Creates a manager with an empty session.
    pub fn new(
        connector: Arc<dyn WalletConnector>,
        cache: Arc<dyn ProviderCache>,
        networks: NetworkConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(Session::default());
        Arc::new(Self {
            connector,
            cache,
            networks,
            state,
            subscription: Mutex::new(None),
            auto_reconnect_attempted: AtomicBool::new(false),
        })
    }

    /// Network classification in use.
    pub fn networks(&self) -> &NetworkConfig {
        &self.networks
    }

    /// Current session.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified after every session change.
    pub fn subscribe_changes(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONNECT / DISCONNECT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Marks a connect sequence as running.
    ///
    /// Returns false if one is already running; the caller must not start
    /// another.
    pub fn begin_connect(&self) -> bool {
        self.start_connect().is_some()
    }

    /// Sets `is_connecting` and returns the epoch the sequence belongs to.
    fn start_connect(&self) -> Option<u64> {
        let mut started = None;
        self.state.send_if_modified(|session| {
            if session.is_connecting {
                return false;
            }
            session.is_connecting = true;
            started = Some(session.epoch);
            true
        });
        started
    }

    /// Derives the connection from `handle` and installs it.
    ///
    /// Fails with `ConnectionError` when the wallet reports no network or no
    /// account; the session is then reset. Also fails, leaving the session
    /// untouched, if no connect sequence is running any more.
    #[instrument(skip(self, handle))]
    pub async fn complete_connect(self: &Arc<Self>, handle: Arc<dyn WalletHandle>) -> Result<()> {
        let epoch = self.state.borrow().epoch;
        self.install(handle, epoch).await
    }

    async fn install(self: &Arc<Self>, handle: Arc<dyn WalletHandle>, epoch: u64) -> Result<()> {
        let connection = match derive_connection(handle, &self.networks).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(error = %e, "Wallet connection incomplete");
                self.reset_if_current(epoch);
                return Err(e);
            }
        };

        let events = connection.handle.subscribe();
        let (address, chain_id, chain_class) =
            (connection.address, connection.chain_id, connection.chain_class);

        let mut slot = self.subscription.lock();
        let installed = self.state.send_if_modified(|session| {
            // Disconnected, or superseded by a newer connect
            if !session.is_connecting || session.epoch != epoch {
                return false;
            }
            session.connection = Some(connection);
            session.ens_name.clear();
            session.eligibility = None;
            session.is_connecting = false;
            session.epoch += 1;
            true
        });
        if !installed {
            drop(slot);
            info!(%address, "Connect cancelled, discarding wallet");
            return Err(ClonesError::ConnectionError("connection cancelled".into()));
        }

        info!(%address, chain_id, chain = %chain_class, "Wallet connected");
        let previous = slot.replace(EventSubscription::spawn(Arc::downgrade(self), events));
        drop(slot);
        drop(previous);

        Ok(())
    }

    /// Runs the whole connect sequence and remembers the provider.
    ///
    /// A [`disconnect`](Self::disconnect) while the wallet is still answering
    /// cancels the sequence with `ConnectionError`.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        let Some(epoch) = self.start_connect() else {
            return Err(ClonesError::ConnectionError(
                "a connection request is already in progress".into(),
            ));
        };
        self.run_connect(epoch).await
    }

    async fn run_connect(self: &Arc<Self>, epoch: u64) -> Result<()> {
        let handle = match self.connector.connect().await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Wallet refused the connection");
                self.reset_if_current(epoch);
                return Err(as_connection_error(e));
            }
        };

        self.install(handle, epoch).await?;

        if let Err(e) = self.cache.store(self.connector.provider_id()).await {
            warn!(error = %e, "Could not remember the wallet provider");
            return Ok(());
        }

        let current = self.state.borrow().epoch;
        if current != epoch + 1 {
            // Disconnected while the marker was written
            if let Err(e) = self.cache.clear().await {
                warn!(error = %e, "Could not clear the provider marker");
            }
        }
        Ok(())
    }

    /// Forgets the provider and resets the session.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<()> {
        self.reset();
        info!("Wallet disconnected");
        self.cache.clear().await
    }

    /// Reconnects to the remembered provider, at most once per process.
    ///
    /// Returns true if a connection was established.
    #[instrument(skip(self))]
    pub async fn auto_reconnect(self: &Arc<Self>) -> Result<bool> {
        if self.auto_reconnect_attempted.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        let connected = self.state.borrow().is_connected();
        if connected {
            return Ok(false);
        }

        match self.cache.load().await {
            Ok(Some(provider)) => debug!(%provider, "Reconnecting to remembered provider"),
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!(error = %e, "Could not read the provider marker");
                return Ok(false);
            }
        }

        let Some(epoch) = self.start_connect() else {
            debug!("Connect already in progress, skipping auto-reconnect");
            return Ok(false);
        };
        self.run_connect(epoch).await.map(|()| true)
    }

    /// Asks the wallet to switch networks, then re-derives the session.
    #[instrument(skip(self))]
    pub async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let handle = self
            .current_handle()
            .ok_or_else(|| ClonesError::ConnectionError("no wallet connected".into()))?;

        handle.switch_chain(chain_id).await?;
        self.on_chain_changed(chain_id).await;
        Ok(())
    }

    fn current_handle(&self) -> Option<Arc<dyn WalletHandle>> {
        self.state
            .borrow()
            .connection
            .as_ref()
            .map(|c| Arc::clone(&c.handle))
    }

    fn reset(&self) {
        let mut slot = self.subscription.lock();
        let subscription = slot.take();
        self.state.send_modify(|session| {
            let epoch = session.epoch + 1;
            *session = Session {
                epoch,
                ..Session::default()
            };
        });
        drop(slot);
        drop(subscription);
    }

    fn reset_if_current(&self, epoch: u64) {
        let current = self.state.borrow().epoch;
        if current == epoch {
            self.reset();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // WALLET EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Dispatches one wallet event.
    pub async fn handle_event(&self, event: WalletEvent) {
        match event {
            WalletEvent::AccountsChanged(accounts) => self.on_accounts_changed(&accounts),
            WalletEvent::ChainChanged(chain_id) => self.on_chain_changed(chain_id).await,
            WalletEvent::Connect { chain_id } => self.on_connect(chain_id),
            WalletEvent::Disconnect { code, message } => self.on_disconnect(code, &message).await,
        }
    }

    /// Switches to the first exposed account.
    ///
    /// An empty list keeps the current account.
    pub fn on_accounts_changed(&self, accounts: &[Address]) {
        let Some(&first) = accounts.first() else {
            debug!("Wallet exposed no accounts, keeping the current one");
            return;
        };

        let changed = self.state.send_if_modified(|session| {
            let Some(connection) = session.connection.as_mut() else {
                return false;
            };
            if connection.address == first {
                return false;
            }
            connection.address = first;
            connection.signer = connection.handle.signer(first);
            session.ens_name.clear();
            session.eligibility = None;
            true
        });

        if changed {
            info!(address = %first, "Active account changed");
        }
    }

    /// Re-derives the connection on the current handle.
    ///
    /// If the wallet no longer reports a network or an account the session
    /// is reset.
    pub async fn on_chain_changed(&self, chain_id: u64) {
        let (handle, epoch) = {
            let session = self.state.borrow();
            match session.connection.as_ref() {
                Some(c) => (Arc::clone(&c.handle), session.epoch),
                None => return,
            }
        };
        debug!(chain_id, "Chain changed");

        match derive_connection(handle, &self.networks).await {
            Ok(fresh) => {
                self.state.send_if_modified(|session| {
                    // A connect or disconnect happened meanwhile
                    if session.epoch != epoch {
                        return false;
                    }
                    let Some(current) = session.connection.as_mut() else {
                        return false;
                    };
                    if current.address != fresh.address {
                        session.ens_name.clear();
                    }
                    session.eligibility = None;
                    *current = fresh;
                    true
                });
            }
            Err(e) => {
                warn!(error = %e, "Wallet lost its network or account, resetting");
                let current_epoch = self.state.borrow().epoch;
                if current_epoch == epoch {
                    self.reset();
                }
            }
        }
    }

    /// Logs a wallet (re)connection.
    pub fn on_connect(&self, chain_id: u64) {
        info!(chain_id, "Wallet reports connected");
    }

    /// Forgets the provider; the session itself is kept.
    pub async fn on_disconnect(&self, code: i64, message: &str) {
        warn!(code, message, "Wallet reports disconnected");
        if let Err(e) = self.cache.clear().await {
            warn!(error = %e, "Could not clear the provider marker");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DERIVED VALUES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Stores a resolved ENS name if `for_address` is still active.
    pub fn set_ens_name(&self, for_address: Address, name: String) -> bool {
        self.state.send_if_modified(|session| {
            if session.address() != Some(for_address) || session.ens_name == name {
                return false;
            }
            session.ens_name = name;
            true
        })
    }

    /// Stores a mint eligibility if account and chain are unchanged.
    pub fn set_eligibility(
        &self,
        for_address: Address,
        chain_class: ChainClass,
        eligibility: MintEligibility,
    ) -> bool {
        self.state.send_if_modified(|session| {
            if session.address() != Some(for_address)
                || session.chain_class() != Some(chain_class)
            {
                return false;
            }
            session.eligibility = Some(eligibility);
            true
        })
    }
}

async fn derive_connection(
    handle: Arc<dyn WalletHandle>,
    networks: &NetworkConfig,
) -> Result<Connection> {
    let chain_id = handle
        .chain_id()
        .await
        .map_err(|e| ClonesError::ConnectionError(format!("wallet reported no network: {e}")))?;

    let accounts = handle
        .accounts()
        .await
        .map_err(|e| ClonesError::ConnectionError(format!("wallet reported no accounts: {e}")))?;

    let address = accounts
        .first()
        .copied()
        .ok_or_else(|| ClonesError::ConnectionError("wallet exposed no account".into()))?;

    Ok(Connection {
        reader: handle.reader(),
        signer: handle.signer(address),
        handle,
        address,
        chain_id,
        chain_class: networks.classify(chain_id),
    })
}

fn as_connection_error(error: ClonesError) -> ClonesError {
    match error {
        ClonesError::ConnectionError(_) => error,
        other => ClonesError::ConnectionError(other.to_string()),
    }
}
