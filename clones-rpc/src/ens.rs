//! ENS reverse resolution.
//!
//! Looks up the primary name of an address the way wallets do:
//!
//! 1. `resolver(namehash("<hex>.addr.reverse"))` on the registry
//! 2. `name(node)` on that resolver
//! 3. forward check: `addr(namehash(name))` must point back at the address
//!
//! A name that fails the forward check is not reported.

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolCall;
use sha3::{Digest, Keccak256};
use tracing::{debug, instrument};

use clones_core::abi::{IENSRegistry, IENSResolver};
use clones_core::error::{ClonesError, Result};
use clones_core::traits::ChainReader;

/// Computes the ENS namehash of a dotted name.
pub fn namehash(name: &str) -> B256 {
    let mut node = [0u8; 32];

    for label in name.rsplit('.') {
        if label.is_empty() {
            continue;
        }

        let label_hash = Keccak256::digest(label.as_bytes());

        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&node);
        combined[32..].copy_from_slice(&label_hash);

        node = Keccak256::digest(combined).into();
    }

    B256::from(node)
}

/// Reverse-record node for an address.
pub fn reverse_node(address: Address) -> B256 {
    namehash(&format!("{}.addr.reverse", hex::encode(address.as_slice())))
}

async fn resolver_of<R: ChainReader + ?Sized>(
    reader: &R,
    registry: Address,
    node: B256,
) -> Result<Option<Address>> {
    let data = IENSRegistry::resolverCall { node }.abi_encode();
    let out = reader.call(registry, data.into()).await?;
    let resolver = IENSRegistry::resolverCall::abi_decode_returns(&out, true)
        .map_err(|e| ClonesError::AbiError(e.to_string()))?
        .resolverAddress;

    Ok((resolver != Address::ZERO).then_some(resolver))
}

/// Returns the verified primary ENS name of `address`, if any.
#[instrument(skip(reader))]
pub async fn lookup_address<R: ChainReader + ?Sized>(
    reader: &R,
    registry: Address,
    address: Address,
) -> Result<Option<String>> {
    let node = reverse_node(address);

    let Some(reverse_resolver) = resolver_of(reader, registry, node).await? else {
        debug!(%address, "No reverse resolver");
        return Ok(None);
    };

    let data = IENSResolver::nameCall { node }.abi_encode();
    let out = reader.call(reverse_resolver, data.into()).await?;
    let name = IENSResolver::nameCall::abi_decode_returns(&out, true)
        .map_err(|e| ClonesError::AbiError(e.to_string()))?
        .ensName;

    if name.is_empty() {
        return Ok(None);
    }

    let forward = namehash(&name);
    let Some(forward_resolver) = resolver_of(reader, registry, forward).await? else {
        debug!(%address, name = %name, "Reverse record without forward resolver");
        return Ok(None);
    };

    let data = IENSResolver::addrCall { node: forward }.abi_encode();
    let out = reader.call(forward_resolver, data.into()).await?;
    let target = IENSResolver::addrCall::abi_decode_returns(&out, true)
        .map_err(|e| ClonesError::AbiError(e.to_string()))?
        .target;

    if target != address {
        debug!(%address, name = %name, %target, "Reverse record does not resolve back");
        return Ok(None);
    }

    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolValue;
    use clones_core::mock::MockWallet;

    fn registry() -> Address {
        Address::repeat_byte(0xe5)
    }

    fn resolver() -> Address {
        Address::repeat_byte(0x4e)
    }

    #[test]
    fn test_namehash_known_values() {
        assert_eq!(namehash(""), B256::ZERO);

        let expected = hex::decode(
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae",
        )
        .unwrap();
        assert_eq!(namehash("eth").as_slice(), expected.as_slice());
    }

    #[test]
    fn test_reverse_node_is_lowercase_hex() {
        let address: Address = "0x49CF6F5D44E70224E2E23FDCDD2C053F30ADA28B".parse().unwrap();
        assert_eq!(
            reverse_node(address),
            namehash("49cf6f5d44e70224e2e23fdcdd2c053f30ada28b.addr.reverse")
        );
    }

    fn script_resolver(wallet: &MockWallet, name: &str, points_to: Address) {
        // Registry returns the same resolver for every node
        wallet.set_response(
            registry(),
            IENSRegistry::resolverCall::SELECTOR,
            resolver().abi_encode().into(),
        );
        wallet.set_response(
            resolver(),
            IENSResolver::nameCall::SELECTOR,
            name.to_string().abi_encode().into(),
        );
        wallet.set_response(
            resolver(),
            IENSResolver::addrCall::SELECTOR,
            points_to.abi_encode().into(),
        );
    }

    #[test]
    fn test_lookup_verified_name() {
        let owner = Address::repeat_byte(0x01);
        let wallet = MockWallet::new();
        script_resolver(&wallet, "clone.eth", owner);

        let name = tokio_test::block_on(lookup_address(&wallet, registry(), owner)).unwrap();
        assert_eq!(name.as_deref(), Some("clone.eth"));
    }

    #[tokio::test]
    async fn test_lookup_rejects_unverified_name() {
        let owner = Address::repeat_byte(0x01);
        let wallet = MockWallet::new();
        script_resolver(&wallet, "impostor.eth", Address::repeat_byte(0x02));

        assert!(lookup_address(&wallet, registry(), owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_without_resolver() {
        let wallet = MockWallet::new();
        wallet.set_response(
            registry(),
            IENSRegistry::resolverCall::SELECTOR,
            Address::ZERO.abi_encode().into(),
        );

        let name = lookup_address(&wallet, registry(), Address::repeat_byte(1)).await.unwrap();
        assert!(name.is_none());
        assert_eq!(wallet.call_count(), 1);
    }

    #[tokio::test]
    async fn test_lookup_empty_name() {
        let owner = Address::repeat_byte(0x01);
        let wallet = MockWallet::new();
        script_resolver(&wallet, "", owner);

        assert!(lookup_address(&wallet, registry(), owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_propagates_read_errors() {
        let wallet = MockWallet::new();
        wallet.fail_call(registry(), IENSRegistry::resolverCall::SELECTOR, "rate limited");

        let err = lookup_address(&wallet, registry(), Address::repeat_byte(1)).await;
        assert!(err.is_err());
    }
}
