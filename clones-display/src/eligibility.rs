//! Mint eligibility from holder checks.
//!
//! Every configured collection is queried at once; the bonus limit applies
//! if any of them reports a positive balance. A check that errors counts
//! as "holds nothing".

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use clones_core::abi::{IERC1155, IERC721};
use clones_core::config::{EligibilityConfig, HolderCheck, TokenStandard};
use clones_core::error::{ClonesError, Result};
use clones_core::traits::ChainReader;
use clones_core::types::{ChainClass, MintEligibility};
use clones_session::SessionManager;

/// Returns true if `owner` holds at least one token covered by `check`.
pub async fn check_holder(
    reader: &dyn ChainReader,
    check: &HolderCheck,
    owner: Address,
) -> Result<bool> {
    let balance = match check.standard {
        TokenStandard::Erc721 => {
            let data = IERC721::balanceOfCall { owner }.abi_encode();
            let out = reader.call(check.contract, data.into()).await?;
            IERC721::balanceOfCall::abi_decode_returns(&out, true)
                .map_err(|e| ClonesError::AbiError(e.to_string()))?
                .balance
        }
        TokenStandard::Erc1155 { token_id } => {
            let data = IERC1155::balanceOfCall {
                account: owner,
                id: U256::from(token_id),
            }
            .abi_encode();
            let out = reader.call(check.contract, data.into()).await?;
            IERC1155::balanceOfCall::abi_decode_returns(&out, true)
                .map_err(|e| ClonesError::AbiError(e.to_string()))?
                .balance
        }
    };

    Ok(balance > U256::ZERO)
}

/// Computes [`MintEligibility`] for the connected account.
#[derive(Clone, Debug)]
pub struct EligibilityChecker {
    config: EligibilityConfig,
}

impl EligibilityChecker {
    /// Creates a checker.
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    /// Runs the checks for `class` concurrently and waits for all of them.
    #[instrument(skip(self, reader))]
    pub async fn evaluate(
        &self,
        reader: &dyn ChainReader,
        owner: Address,
        class: ChainClass,
    ) -> MintEligibility {
        let checks = self.config.checks_for(class);
        let results = join_all(checks.iter().map(|check| async move {
            match check_holder(reader, check, owner).await {
                Ok(holds) => holds,
                Err(e) => {
                    warn!(collection = %check.name, error = %e, "Holder check failed");
                    false
                }
            }
        }))
        .await;

        let holds: Vec<String> = checks
            .iter()
            .zip(results)
            .filter(|(_, holds)| *holds)
            .map(|(check, _)| check.name.clone())
            .collect();

        if holds.is_empty() {
            MintEligibility::baseline(self.config.baseline)
        } else {
            MintEligibility {
                max_per_transaction: self.config.bonus,
                bonus: true,
                holds,
            }
        }
    }

    /// Evaluates the current session and stores the result.
    ///
    /// Needs an account on a known chain. The result is dropped if the
    /// account or chain changed while the checks ran.
    pub async fn refresh(&self, manager: &SessionManager) -> Option<MintEligibility> {
        let session = manager.snapshot();
        let connection = session.connection.as_ref()?;
        if !connection.chain_class.is_known() {
            return None;
        }

        let eligibility = self
            .evaluate(
                connection.reader.as_ref(),
                connection.address,
                connection.chain_class,
            )
            .await;

        if manager.set_eligibility(
            connection.address,
            connection.chain_class,
            eligibility.clone(),
        ) {
            Some(eligibility)
        } else {
            debug!("Session changed during holder checks, dropping result");
            None
        }
    }
}
