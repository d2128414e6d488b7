//! Submitting a mint and waiting for it.

use alloy::primitives::{B256, U256};
use tracing::{info, instrument, warn};

use clones_core::config::MintTarget;
use clones_core::error::{ClonesError, Result};
use clones_core::traits::TransactionSigner;
use clones_core::types::{CallRequest, ReceiptStatus, TxStatus};

use crate::contract::MintContract;
use crate::price::mint_value;

/// Extra parameters attached to a mint transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MintOptions {
    /// Upper bound on the quantity; `None` only requires at least one
    pub max_quantity: Option<u32>,
    /// ETH sent with the call
    pub value: U256,
    /// Explicit gas limit; the wallet estimates when absent
    pub gas_limit: Option<u64>,
}

impl MintOptions {
    /// Options for minting `quantity` of `target` at the given unit price.
    ///
    /// Unpriced targets send no value.
    pub fn for_target(target: &MintTarget, unit_price_wei: U256, quantity: u32) -> Self {
        Self {
            max_quantity: None,
            value: if target.priced {
                mint_value(unit_price_wei, quantity)
            } else {
                U256::ZERO
            },
            gas_limit: None,
        }
    }

    /// Caps the quantity.
    pub fn max_quantity(mut self, max: u32) -> Self {
        self.max_quantity = Some(max);
        self
    }

    /// Sets an explicit gas limit.
    pub fn gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(gas);
        self
    }
}

/// Sends the mint call and returns its hash once the network accepted it.
///
/// Fails with `ConnectionError` without a signer and `InvalidQuantity` for a
/// quantity outside `1..=max`, in both cases before anything is sent. Any
/// rejection by the wallet or network is a `SubmissionError`.
#[instrument(skip(signer, contract, options), fields(contract = %contract.address()))]
pub async fn submit_mint(
    signer: Option<&dyn TransactionSigner>,
    contract: &MintContract,
    quantity: u32,
    options: &MintOptions,
) -> Result<B256> {
    let signer = signer
        .ok_or_else(|| ClonesError::ConnectionError("connect a wallet before minting".into()))?;

    let max = options.max_quantity.unwrap_or(u32::MAX);
    if quantity < 1 || quantity > max {
        return Err(ClonesError::InvalidQuantity { quantity, max });
    }

    let from = signer.address();
    let request = CallRequest {
        from,
        to: contract.address(),
        data: contract.mint_calldata(from, quantity),
        value: options.value,
        gas_limit: options.gas_limit,
    };

    let hash = signer.send_transaction(request).await.map_err(|e| {
        warn!(error = %e, "Mint not submitted");
        e.into_submission()
    })?;

    info!(%hash, quantity, "Mint submitted");
    Ok(hash)
}

/// Waits for the transaction to be included.
///
/// A reverted transaction resolves to [`TxStatus::Failed`]; losing track of
/// it is a `ConfirmationFailure`.
#[instrument(skip(signer))]
pub async fn await_confirmation(signer: &dyn TransactionSigner, hash: B256) -> Result<TxStatus> {
    match signer.wait_for_receipt(hash).await {
        Ok(ReceiptStatus::Success) => {
            info!(%hash, "Mint confirmed");
            Ok(TxStatus::Confirmed)
        }
        Ok(ReceiptStatus::Reverted) => {
            warn!(%hash, "Mint reverted");
            Ok(TxStatus::Failed)
        }
        Err(e) => Err(e.into_confirmation(hash)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use clones_core::config::{ClonesConfig, MintVariant};
    use clones_core::mock::MockWallet;
    use clones_core::traits::WalletHandle;

    fn owner() -> Address {
        Address::repeat_byte(0x11)
    }

    fn vials() -> MintContract {
        MintContract::new(Address::repeat_byte(0x7a), MintVariant::Quantity)
    }

    #[tokio::test]
    async fn test_no_signer_is_connection_error() {
        let err = submit_mint(None, &vials(), 1, &MintOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClonesError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_quantity_out_of_range_sends_nothing() {
        let wallet = MockWallet::with_account(owner(), 5);
        let signer = wallet.signer(owner());
        let options = MintOptions::default().max_quantity(5);

        for quantity in [0, 6] {
            let err = submit_mint(Some(signer.as_ref()), &vials(), quantity, &options)
                .await
                .unwrap_err();
            assert!(matches!(err, ClonesError::InvalidQuantity { max: 5, .. }));
        }
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn test_submit_sends_value_and_calldata() {
        let wallet = MockWallet::with_account(owner(), 5);
        let signer = wallet.signer(owner());
        let config = ClonesConfig::default();
        let target = config.mint("vials").unwrap();
        let unit = U256::from(100_000_000_000_000_000u64);
        let options = MintOptions::for_target(target, unit, 3).gas_limit(250_000);

        let hash = submit_mint(Some(signer.as_ref()), &vials(), 3, &options)
            .await
            .unwrap();
        assert_eq!(hash, B256::from(U256::from(1)));

        let sent = wallet.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, owner());
        assert_eq!(sent[0].value, U256::from(300_000_000_000_000_000u64));
        assert_eq!(sent[0].gas_limit, Some(250_000));
        assert_eq!(sent[0].data, vials().mint_calldata(owner(), 3));
    }

    #[tokio::test]
    async fn test_unpriced_target_sends_no_value() {
        let config = ClonesConfig::default();
        let king = config.mint("king").unwrap();
        let options = MintOptions::for_target(king, U256::from(5), 1);
        assert_eq!(options.value, U256::ZERO);
    }

    #[tokio::test]
    async fn test_user_rejection_is_submission_error() {
        let wallet = MockWallet::with_account(owner(), 5);
        wallet.reject_send();
        let signer = wallet.signer(owner());

        let err = submit_mint(Some(signer.as_ref()), &vials(), 1, &MintOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClonesError::SubmissionError(_)));
        assert_eq!(err.user_message(), "User rejected the transaction");
    }

    #[tokio::test]
    async fn test_confirmation_outcomes() {
        let wallet = MockWallet::with_account(owner(), 5);
        let signer = wallet.signer(owner());
        let hash = B256::repeat_byte(9);

        assert_eq!(
            await_confirmation(signer.as_ref(), hash).await.unwrap(),
            TxStatus::Confirmed
        );

        wallet.set_receipt(ReceiptStatus::Reverted);
        assert_eq!(
            await_confirmation(signer.as_ref(), hash).await.unwrap(),
            TxStatus::Failed
        );

        wallet.fail_receipt("connection reset");
        let err = await_confirmation(signer.as_ref(), hash).await.unwrap_err();
        assert!(matches!(err, ClonesError::ConfirmationFailure { hash: h, .. } if h == hash));
    }
}
