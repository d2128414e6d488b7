//! In-memory wallet and chain doubles.
//!
//! [`MockWallet`] implements every boundary trait at once so tests can script
//! accounts, chain id, ENS names, contract read results and transaction
//! outcomes from a single handle.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::error::{ClonesError, Result, USER_REJECTED_CODE};
use crate::traits::{ChainReader, ProviderCache, TransactionSigner, WalletConnector, WalletHandle};
use crate::types::{CallRequest, ReceiptStatus, WalletEvent};

type CallKey = (Address, [u8; 4]);

struct Inner {
    provider_id: String,
    chain_id: AtomicU64,
    accounts: Mutex<Vec<Address>>,
    reject_connect: AtomicBool,
    fail_network: AtomicBool,
    names: Mutex<HashMap<Address, String>>,
    fail_lookup: AtomicBool,
    responses: Mutex<HashMap<CallKey, std::result::Result<Bytes, String>>>,
    sent: Mutex<Vec<CallRequest>>,
    send_error: Mutex<Option<(i64, String)>>,
    receipt: Mutex<std::result::Result<ReceiptStatus, String>>,
    released: watch::Sender<bool>,
    events: broadcast::Sender<WalletEvent>,
    connects: AtomicUsize,
    calls: AtomicUsize,
    lookups: AtomicUsize,
    reject_switch: AtomicBool,
    next_hash: AtomicU64,
}

/// Scriptable wallet, chain reader and signer.
#[derive(Clone)]
pub struct MockWallet {
    inner: Arc<Inner>,
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWallet {
    /// Mainnet wallet with no accounts.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let (released, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                provider_id: "mock".into(),
                chain_id: AtomicU64::new(1),
                accounts: Mutex::new(Vec::new()),
                reject_connect: AtomicBool::new(false),
                fail_network: AtomicBool::new(false),
                names: Mutex::new(HashMap::new()),
                fail_lookup: AtomicBool::new(false),
                responses: Mutex::new(HashMap::new()),
                sent: Mutex::new(Vec::new()),
                send_error: Mutex::new(None),
                receipt: Mutex::new(Ok(ReceiptStatus::Success)),
                released,
                events,
                connects: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                lookups: AtomicUsize::new(0),
                reject_switch: AtomicBool::new(false),
                next_hash: AtomicU64::new(1),
            }),
        }
    }

    /// Wallet exposing one account on the given chain.
    pub fn with_account(account: Address, chain_id: u64) -> Self {
        let wallet = Self::new();
        wallet.set_accounts(vec![account]);
        wallet.set_chain_id(chain_id);
        wallet
    }

    // ─── scripting ──────────────────────────────────────────────────────────

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.inner.accounts.lock() = accounts;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.inner.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn reject_connect(&self, reject: bool) {
        self.inner.reject_connect.store(reject, Ordering::SeqCst);
    }

    /// Makes `chain_id()` fail, as a wallet without a network would.
    pub fn fail_network(&self, fail: bool) {
        self.inner.fail_network.store(fail, Ordering::SeqCst);
    }

    pub fn set_name(&self, address: Address, name: impl Into<String>) {
        self.inner.names.lock().insert(address, name.into());
    }

    pub fn fail_lookup(&self, fail: bool) {
        self.inner.fail_lookup.store(fail, Ordering::SeqCst);
    }

    /// Answers calls to `selector` on `to` with one ABI word.
    pub fn set_word(&self, to: Address, selector: [u8; 4], word: U256) {
        let bytes = Bytes::from(word.to_be_bytes::<32>().to_vec());
        self.inner.responses.lock().insert((to, selector), Ok(bytes));
    }

    /// Answers calls to `selector` on `to` with raw bytes.
    pub fn set_response(&self, to: Address, selector: [u8; 4], data: Bytes) {
        self.inner.responses.lock().insert((to, selector), Ok(data));
    }

    pub fn fail_call(&self, to: Address, selector: [u8; 4], message: impl Into<String>) {
        self.inner
            .responses
            .lock()
            .insert((to, selector), Err(message.into()));
    }

    /// Makes the next submissions fail with a JSON-RPC error.
    pub fn fail_send(&self, code: i64, message: impl Into<String>) {
        *self.inner.send_error.lock() = Some((code, message.into()));
    }

    /// Makes submissions fail as if the user dismissed the wallet prompt.
    pub fn reject_send(&self) {
        self.fail_send(USER_REJECTED_CODE, "User denied transaction signature");
    }

    pub fn set_receipt(&self, status: ReceiptStatus) {
        *self.inner.receipt.lock() = Ok(status);
    }

    pub fn fail_receipt(&self, message: impl Into<String>) {
        *self.inner.receipt.lock() = Err(message.into());
    }

    /// Blocks `wait_for_receipt` until [`release_receipts`](Self::release_receipts).
    pub fn hold_receipts(&self) {
        self.inner.released.send_replace(false);
    }

    pub fn release_receipts(&self) {
        self.inner.released.send_replace(true);
    }

    pub fn reject_switch(&self, reject: bool) {
        self.inner.reject_switch.store(reject, Ordering::SeqCst);
    }

    /// Delivers an event to every subscriber.
    pub fn emit(&self, event: WalletEvent) {
        let _ = self.inner.events.send(event);
    }

    // ─── inspection ─────────────────────────────────────────────────────────

    pub fn sent(&self) -> Vec<CallRequest> {
        self.inner.sent.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn lookup_count(&self) -> usize {
        self.inner.lookups.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.events.receiver_count()
    }
}

#[async_trait]
impl WalletConnector for MockWallet {
    fn provider_id(&self) -> &str {
        &self.inner.provider_id
    }

    async fn connect(&self) -> Result<Arc<dyn WalletHandle>> {
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.inner.reject_connect.load(Ordering::SeqCst) {
            return Err(ClonesError::ConnectionError("User rejected the request".into()));
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl WalletHandle for MockWallet {
    async fn chain_id(&self) -> Result<u64> {
        ChainReader::chain_id(self).await
    }

    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.inner.accounts.lock().clone())
    }

    fn reader(&self) -> Arc<dyn ChainReader> {
        Arc::new(self.clone())
    }

    fn signer(&self, account: Address) -> Arc<dyn TransactionSigner> {
        Arc::new(MockSigner {
            wallet: self.clone(),
            account,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.inner.events.subscribe()
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        if self.inner.reject_switch.load(Ordering::SeqCst) {
            return Err(ClonesError::RpcError {
                code: USER_REJECTED_CODE,
                message: "User rejected the request".into(),
            });
        }
        self.set_chain_id(chain_id);
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockWallet {
    async fn chain_id(&self) -> Result<u64> {
        if self.inner.fail_network.load(Ordering::SeqCst) {
            return Err(ClonesError::HttpError("network unreachable".into()));
        }
        Ok(self.inner.chain_id.load(Ordering::SeqCst))
    }

    async fn lookup_address(&self, address: Address) -> Result<Option<String>> {
        self.inner.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.inner.fail_lookup.load(Ordering::SeqCst) {
            return Err(ClonesError::ReadFailure("lookup failed".into()));
        }
        Ok(self.inner.names.lock().get(&address).cloned())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ClonesError::AbiError("calldata shorter than a selector".into()))?;

        match self.inner.responses.lock().get(&(to, selector)) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(message)) => Err(ClonesError::RpcError {
                code: -32000,
                message: message.clone(),
            }),
            None => Err(ClonesError::RpcError {
                code: -32000,
                message: "execution reverted".into(),
            }),
        }
    }
}

/// Signer half of [`MockWallet`].
pub struct MockSigner {
    wallet: MockWallet,
    account: Address,
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.account
    }

    async fn send_transaction(&self, request: CallRequest) -> Result<B256> {
        tokio::task::yield_now().await;
        if let Some((code, message)) = self.wallet.inner.send_error.lock().clone() {
            return Err(ClonesError::RpcError { code, message });
        }
        self.wallet.inner.sent.lock().push(request);
        let n = self.wallet.inner.next_hash.fetch_add(1, Ordering::SeqCst);
        Ok(B256::from(U256::from(n)))
    }

    async fn wait_for_receipt(&self, _hash: B256) -> Result<ReceiptStatus> {
        let mut released = self.wallet.inner.released.subscribe();
        loop {
            let open = *released.borrow_and_update();
            if open || released.changed().await.is_err() {
                break;
            }
        }
        self.wallet
            .inner
            .receipt
            .lock()
            .clone()
            .map_err(|message| ClonesError::RpcError { code: -32000, message })
    }
}

/// Provider marker held in memory, with a switch to make it fail.
#[derive(Default)]
pub struct MockProviderCache {
    value: Mutex<Option<String>>,
    fail: AtomicBool,
}

impl MockProviderCache {
    pub fn with_marker(provider_id: &str) -> Self {
        Self {
            value: Mutex::new(Some(provider_id.into())),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn peek(&self) -> Option<String> {
        self.value.lock().clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClonesError::IoError(std::io::Error::other("storage unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProviderCache for MockProviderCache {
    async fn load(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.value.lock().clone())
    }

    async fn store(&self, provider_id: &str) -> Result<()> {
        self.check()?;
        *self.value.lock() = Some(provider_id.into());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.check()?;
        *self.value.lock() = None;
        Ok(())
    }
}
