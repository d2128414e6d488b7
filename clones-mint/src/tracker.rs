//! Mint attempt state machine.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──accepted──▶ Pending(hash) ──receipt──▶ Confirmed(hash)
//!   ▲                  │                          │
//!   └──── rejected ────┘◀──── reverted / lost ────┘
//! ```
//!
//! Failures return to `Idle` and keep their message in [`MintTracker::last_error`].
//! An attempt belongs to the session epoch it started in; if the wallet
//! disconnects or reconnects meanwhile, the outcome is discarded.

use std::sync::Arc;

use alloy::primitives::B256;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use clones_core::error::{ClonesError, Result};
use clones_core::traits::TransactionSigner;
use clones_core::types::{TransactionRecord, TxStatus};
use clones_session::SessionManager;

use crate::contract::MintContract;
use crate::facade::{await_confirmation, submit_mint, MintOptions};

/// Where the current attempt is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "hash", rename_all = "snake_case")]
pub enum MintPhase {
    /// Nothing in flight
    Idle,
    /// Waiting for the wallet to accept
    Submitting,
    /// Accepted, waiting for inclusion
    Pending(B256),
    /// Included successfully
    Confirmed(B256),
}

impl MintPhase {
    /// Returns true while an attempt is in flight.
    pub fn is_active(self) -> bool {
        matches!(self, MintPhase::Submitting | MintPhase::Pending(_))
    }
}

/// How a confirmed wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MintOutcome {
    /// Included successfully
    Confirmed(B256),
    /// Included and reverted
    Failed(B256),
    /// The session changed while waiting; nothing was recorded
    Abandoned(B256),
}

struct Attempt {
    signer: Arc<dyn TransactionSigner>,
    epoch: u64,
}

struct TrackerState {
    phase: MintPhase,
    record: Option<TransactionRecord>,
    last_error: Option<String>,
    attempt: Option<Attempt>,
}

/// Runs one mint attempt at a time for a session.
pub struct MintTracker {
    manager: Arc<SessionManager>,
    state: Mutex<TrackerState>,
}

impl MintTracker {
    /// Creates an idle tracker.
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            state: Mutex::new(TrackerState {
                phase: MintPhase::Idle,
                record: None,
                last_error: None,
                attempt: None,
            }),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MintPhase {
        self.state.lock().phase
    }

    /// Record of the latest accepted transaction.
    pub fn record(&self) -> Option<TransactionRecord> {
        self.state.lock().record.clone()
    }

    /// Message of the latest failed attempt.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    fn fail(&self, error: ClonesError) -> ClonesError {
        let mut state = self.state.lock();
        state.phase = MintPhase::Idle;
        state.attempt = None;
        state.last_error = Some(error.user_message());
        error
    }

    fn settle_record(&self, hash: B256, status: TxStatus) {
        if let Some(record) = self.state.lock().record.as_mut().filter(|r| r.hash == hash) {
            record.status = status;
        }
    }

    fn is_stale(&self, epoch: u64) -> bool {
        self.manager.snapshot().epoch != epoch
    }

    /// Submits a mint with the session's signer.
    ///
    /// Returns `MintInProgress` if another attempt is active.
    pub async fn submit(
        &self,
        contract: &MintContract,
        quantity: u32,
        options: &MintOptions,
    ) -> Result<B256> {
        let session = self.manager.snapshot();
        {
            let mut state = self.state.lock();
            if state.phase.is_active() {
                return Err(ClonesError::MintInProgress);
            }
            state.phase = MintPhase::Submitting;
            state.last_error = None;
        }

        let signer = session.signer();
        let hash = match submit_mint(signer.as_deref(), contract, quantity, options).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(e)),
        };

        let mut state = self.state.lock();
        if self.is_stale(session.epoch) {
            info!(%hash, "Session changed during submission, not tracking the transaction");
            state.phase = MintPhase::Idle;
            state.attempt = None;
            return Ok(hash);
        }

        state.phase = MintPhase::Pending(hash);
        state.record = Some(TransactionRecord::pending(hash));
        state.attempt = signer.map(|signer| Attempt {
            signer,
            epoch: session.epoch,
        });
        Ok(hash)
    }

    /// Waits for the pending transaction.
    ///
    /// Losing track of the transaction marks its record as failed and
    /// returns the attempt to `Idle`.
    pub async fn confirm(&self) -> Result<MintOutcome> {
        let (hash, signer, epoch) = {
            let state = self.state.lock();
            match (state.phase, state.attempt.as_ref()) {
                (MintPhase::Pending(hash), Some(attempt)) => {
                    (hash, Arc::clone(&attempt.signer), attempt.epoch)
                }
                _ => {
                    return Err(ClonesError::ValidationError(
                        "no mint transaction is pending".into(),
                    ))
                }
            }
        };

        let result = await_confirmation(signer.as_ref(), hash).await;

        if self.is_stale(epoch) {
            let mut state = self.state.lock();
            state.phase = MintPhase::Idle;
            state.attempt = None;
            info!(%hash, "Session changed while waiting, discarding outcome");
            return Ok(MintOutcome::Abandoned(hash));
        }

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                self.settle_record(hash, TxStatus::Failed);
                return Err(self.fail(e));
            }
        };

        self.settle_record(hash, status);
        let mut state = self.state.lock();
        state.attempt = None;

        match status {
            TxStatus::Confirmed => {
                state.phase = MintPhase::Confirmed(hash);
                Ok(MintOutcome::Confirmed(hash))
            }
            _ => {
                state.phase = MintPhase::Idle;
                state.last_error = Some(
                    ClonesError::ConfirmationFailure {
                        hash,
                        reason: "transaction reverted".into(),
                    }
                    .user_message(),
                );
                Ok(MintOutcome::Failed(hash))
            }
        }
    }

    /// Submits and waits.
    pub async fn mint(
        &self,
        contract: &MintContract,
        quantity: u32,
        options: &MintOptions,
    ) -> Result<MintOutcome> {
        let hash = self.submit(contract, quantity, options).await?;
        if self.phase() != MintPhase::Pending(hash) {
            return Ok(MintOutcome::Abandoned(hash));
        }
        self.confirm().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use alloy::primitives::{Address, U256};
    use clones_core::config::{MintVariant, NetworkConfig};
    use clones_core::mock::{MockProviderCache, MockWallet};
    use clones_core::types::ReceiptStatus;

    fn owner() -> Address {
        Address::repeat_byte(0x11)
    }

    fn vials() -> MintContract {
        MintContract::new(Address::repeat_byte(0x7a), MintVariant::Quantity)
    }

    async fn setup() -> (MockWallet, Arc<SessionManager>, Arc<MintTracker>) {
        let wallet = MockWallet::with_account(owner(), 5);
        let manager = SessionManager::new(
            Arc::new(wallet.clone()),
            Arc::new(MockProviderCache::default()),
            NetworkConfig::default(),
        );
        manager.connect().await.unwrap();
        let tracker = Arc::new(MintTracker::new(Arc::clone(&manager)));
        (wallet, manager, tracker)
    }

    #[tokio::test]
    async fn test_successful_mint() {
        let (_wallet, _manager, tracker) = setup().await;

        let outcome = tracker.mint(&vials(), 2, &MintOptions::default()).await.unwrap();
        let hash = B256::from(U256::from(1));

        assert_eq!(outcome, MintOutcome::Confirmed(hash));
        assert_eq!(tracker.phase(), MintPhase::Confirmed(hash));
        assert_eq!(tracker.record().unwrap().status, TxStatus::Confirmed);
        assert!(tracker.last_error().is_none());
    }

    #[tokio::test]
    async fn test_rejected_before_submit_returns_to_idle() {
        let (wallet, _manager, tracker) = setup().await;
        wallet.reject_send();

        let err = tracker.mint(&vials(), 1, &MintOptions::default()).await.unwrap_err();

        assert!(matches!(err, ClonesError::SubmissionError(_)));
        assert_eq!(tracker.phase(), MintPhase::Idle);
        assert!(tracker.record().is_none());
        assert_eq!(
            tracker.last_error().as_deref(),
            Some("User rejected the transaction")
        );
    }

    #[tokio::test]
    async fn test_reverted_mint_keeps_hash() {
        let (wallet, _manager, tracker) = setup().await;
        wallet.set_receipt(ReceiptStatus::Reverted);

        let outcome = tracker.mint(&vials(), 1, &MintOptions::default()).await.unwrap();

        assert!(matches!(outcome, MintOutcome::Failed(_)));
        assert_eq!(tracker.phase(), MintPhase::Idle);
        assert_eq!(tracker.record().unwrap().status, TxStatus::Failed);
        assert!(tracker.last_error().is_some());
    }

    #[tokio::test]
    async fn test_lost_receipt_fails_record() {
        let (wallet, _manager, tracker) = setup().await;
        wallet.fail_receipt("node went away");

        let err = tracker.mint(&vials(), 1, &MintOptions::default()).await.unwrap_err();

        assert!(matches!(err, ClonesError::ConfirmationFailure { .. }));
        assert_eq!(tracker.phase(), MintPhase::Idle);
        let record = tracker.record().unwrap();
        assert_eq!(record.hash, B256::from(U256::from(1)));
        assert_eq!(record.status, TxStatus::Failed);
        assert_eq!(tracker.last_error().as_deref(), Some("node went away"));

        // The next attempt is not blocked
        wallet.set_receipt(ReceiptStatus::Success);
        let outcome = tracker.mint(&vials(), 1, &MintOptions::default()).await.unwrap();
        assert!(matches!(outcome, MintOutcome::Confirmed(_)));
    }

    #[tokio::test]
    async fn test_second_attempt_while_pending() {
        let (wallet, _manager, tracker) = setup().await;
        wallet.hold_receipts();

        let hash = tracker.submit(&vials(), 1, &MintOptions::default()).await.unwrap();
        let waiting = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.confirm().await }
        });

        let err = tracker.submit(&vials(), 1, &MintOptions::default()).await.unwrap_err();
        assert!(matches!(err, ClonesError::MintInProgress));
        assert_eq!(tracker.phase(), MintPhase::Pending(hash));

        wallet.release_receipts();
        let outcome = tokio::time::timeout(Duration::from_secs(2), waiting)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, MintOutcome::Confirmed(hash));
        assert_eq!(wallet.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_abandons_pending_mint() {
        let (wallet, manager, tracker) = setup().await;
        wallet.hold_receipts();

        let hash = tracker.submit(&vials(), 1, &MintOptions::default()).await.unwrap();
        let waiting = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.confirm().await }
        });
        tokio::task::yield_now().await;

        manager.disconnect().await.unwrap();
        wallet.release_receipts();

        let outcome = tokio::time::timeout(Duration::from_secs(2), waiting)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, MintOutcome::Abandoned(hash));
        assert_eq!(tracker.phase(), MintPhase::Idle);
        assert_eq!(tracker.record().unwrap().status, TxStatus::Pending);
    }

    #[tokio::test]
    async fn test_mint_without_session() {
        let wallet = MockWallet::with_account(owner(), 5);
        let manager = SessionManager::new(
            Arc::new(wallet.clone()),
            Arc::new(MockProviderCache::default()),
            NetworkConfig::default(),
        );
        let tracker = MintTracker::new(manager);

        let err = tracker.mint(&vials(), 1, &MintOptions::default()).await.unwrap_err();
        assert!(matches!(err, ClonesError::ConnectionError(_)));
        assert_eq!(tracker.phase(), MintPhase::Idle);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_without_pending() {
        let (_wallet, _manager, tracker) = setup().await;
        assert!(tracker.confirm().await.is_err());
    }
}
