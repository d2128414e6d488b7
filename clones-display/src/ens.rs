//! Primary ENS name of the connected account.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use clones_session::SessionManager;

#[derive(Clone)]
struct CacheEntry {
    /// Empty when the address has no primary name
    name: String,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnsCacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// TTL in seconds
    pub ttl_seconds: u64,
}

impl Default for EnsCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            ttl_seconds: 600,
        }
    }
}

/// Reverse-lookup results keyed by lowercase address.
///
/// "No primary name" is cached too; failed lookups are not.
pub struct EnsNameCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: EnsCacheConfig,
}

impl Default for EnsNameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EnsNameCache {
    /// Creates a cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(EnsCacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: EnsCacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn key(address: Address) -> String {
        address.to_string().to_lowercase()
    }

    /// Cached name; `Some("")` means the address has none.
    pub fn get(&self, address: Address) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(&Self::key(address))
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.name.clone())
    }

    /// Records a lookup result.
    pub fn set(&self, address: Address, name: &str) {
        let mut entries = self.entries.write();

        if entries.len() >= self.config.max_entries {
            entries.retain(|_, entry| !entry.is_expired());
        }
        if entries.len() >= self.config.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            Self::key(address),
            CacheEntry {
                name: name.to_string(),
                inserted_at: Instant::now(),
                ttl: Duration::from_secs(self.config.ttl_seconds),
            },
        );
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Resolves the primary name of the connected account into the session.
///
/// Only runs on Mainnet, with an account and no name yet. The name is
/// written back only if the same account is still active, and is returned
/// when it was. Lookup failures leave the name empty.
#[instrument(skip_all)]
pub async fn resolve_ens(manager: &SessionManager, cache: &EnsNameCache) -> Option<String> {
    let session = manager.snapshot();
    let connection = session.connection.as_ref()?;
    if !connection.chain_class.is_mainnet() || !session.ens_name.is_empty() {
        return None;
    }
    let address = connection.address;

    let name = match cache.get(address) {
        Some(cached) => cached,
        None => match connection.reader.lookup_address(address).await {
            Ok(found) => {
                let name = found.unwrap_or_default();
                cache.set(address, &name);
                name
            }
            Err(e) => {
                debug!(%address, error = %e, "ENS lookup failed");
                return None;
            }
        },
    };

    if name.is_empty() {
        return None;
    }

    if manager.set_ens_name(address, name.clone()) {
        debug!(%address, name = %name, "ENS name resolved");
        Some(name)
    } else {
        debug!(%address, "Account changed during ENS lookup, dropping result");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use clones_core::config::NetworkConfig;
    use clones_core::mock::{MockProviderCache, MockWallet};
    use clones_core::types::WalletEvent;

    fn account(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    async fn connected(wallet: &MockWallet) -> Arc<SessionManager> {
        let manager = SessionManager::new(
            Arc::new(wallet.clone()),
            Arc::new(MockProviderCache::default()),
            NetworkConfig::default(),
        );
        manager.connect().await.unwrap();
        manager
    }

    #[test]
    fn test_cache_keys_are_case_insensitive() {
        let cache = EnsNameCache::new();
        let address: Address = "0x49CF6F5D44E70224E2E23FDCDD2C053F30ADA28B".parse().unwrap();
        cache.set(address, "clone.eth");
        assert_eq!(cache.get(address).as_deref(), Some("clone.eth"));
        assert_eq!(
            EnsNameCache::key(address),
            "0x49cf6f5d44e70224e2e23fdcdd2c053f30ada28b"
        );
    }

    #[test]
    fn test_cache_expiry_and_capacity() {
        let cache = EnsNameCache::with_config(EnsCacheConfig {
            max_entries: 2,
            ttl_seconds: 0,
        });
        cache.set(account(1), "a.eth");
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(account(1)).is_none());

        cache.set(account(2), "b.eth");
        cache.set(account(3), "c.eth");
        assert!(cache.len() <= 2);
    }

    #[tokio::test]
    async fn test_resolves_on_mainnet() {
        let wallet = MockWallet::with_account(account(1), 1);
        wallet.set_name(account(1), "clone.eth");
        let manager = connected(&wallet).await;
        let cache = EnsNameCache::new();

        assert_eq!(resolve_ens(&manager, &cache).await.as_deref(), Some("clone.eth"));
        assert_eq!(manager.snapshot().ens_name, "clone.eth");

        // Already resolved
        assert!(resolve_ens(&manager, &cache).await.is_none());
        assert_eq!(wallet.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_skipped_off_mainnet() {
        let wallet = MockWallet::with_account(account(1), 5);
        wallet.set_name(account(1), "clone.eth");
        let manager = connected(&wallet).await;

        assert!(resolve_ens(&manager, &EnsNameCache::new()).await.is_none());
        assert_eq!(wallet.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_leaves_name_empty() {
        let wallet = MockWallet::with_account(account(1), 1);
        wallet.fail_lookup(true);
        let manager = connected(&wallet).await;
        let cache = EnsNameCache::new();

        assert!(resolve_ens(&manager, &cache).await.is_none());
        assert_eq!(manager.snapshot().ens_name, "");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cached_name_skips_lookup() {
        let wallet = MockWallet::with_account(account(1), 1);
        let manager = connected(&wallet).await;
        let cache = EnsNameCache::new();
        cache.set(account(1), "cached.eth");

        assert_eq!(resolve_ens(&manager, &cache).await.as_deref(), Some("cached.eth"));
        assert_eq!(wallet.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_result_dropped() {
        let wallet = MockWallet::with_account(account(1), 1);
        wallet.set_name(account(1), "old.eth");
        let manager = connected(&wallet).await;

        let cache = EnsNameCache::new();
        let lookup = resolve_ens(&manager, &cache);
        let switch = async {
            manager
                .handle_event(WalletEvent::AccountsChanged(vec![account(2)]))
                .await;
        };
        let (name, ()) = tokio::join!(lookup, switch);

        assert!(name.is_none());
        let session = manager.snapshot();
        assert_eq!(session.address(), Some(account(2)));
        assert_eq!(session.ens_name, "");
    }
}
