//! Mint contract bindings.

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use tracing::instrument;

use clones_core::abi::{IHonorary, IVials, IVialsById};
use clones_core::config::{HonoraryTitle, MintTarget, MintVariant};
use clones_core::error::{ClonesError, Result};
use clones_core::traits::ChainReader;
use clones_core::types::ChainClass;

/// A deployed mint contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintContract {
    address: Address,
    variant: MintVariant,
}

/// Supply and price of a collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// Unit price in wei
    pub price_wei: U256,
    /// Maximum mintable supply
    pub max_supply: U256,
    /// Already minted
    pub minted: U256,
    /// Minting is paused
    pub paused: bool,
}

impl CollectionStats {
    /// Tokens left to mint.
    pub fn remaining(&self) -> U256 {
        self.max_supply.saturating_sub(self.minted)
    }

    /// Returns true once the supply is exhausted.
    pub fn is_sold_out(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Unit price in ether.
    pub fn price_ether(&self) -> String {
        format_ether(self.price_wei)
    }
}

async fn read<C: SolCall + Send>(
    reader: &dyn ChainReader,
    to: Address,
    call: C,
) -> Result<C::Return> {
    let data = call.abi_encode();
    let out = reader
        .call(to, data.into())
        .await
        .map_err(|e| ClonesError::ReadFailure(e.to_string()))?;
    C::abi_decode_returns(&out, true).map_err(|e| ClonesError::AbiError(e.to_string()))
}

impl MintContract {
    /// Binds a contract address to its mint variant.
    pub fn new(address: Address, variant: MintVariant) -> Self {
        Self { address, variant }
    }

    /// Binds the deployment of `target` on the given chain.
    pub fn for_target(target: &MintTarget, class: ChainClass) -> Result<Self> {
        let address = target.address(class).ok_or_else(|| {
            ClonesError::ConfigError(format!("'{}' is not deployed on {class}", target.name))
        })?;
        Ok(Self::new(address, target.variant))
    }

    /// Contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Mint variant.
    pub fn variant(&self) -> MintVariant {
        self.variant
    }

    /// Calldata minting `quantity` tokens to `to`.
    ///
    /// Honorary mints always mint one token and ignore `quantity`.
    pub fn mint_calldata(&self, to: Address, quantity: u32) -> Bytes {
        let quantity = U256::from(quantity);
        let data = match self.variant {
            MintVariant::Quantity => IVials::mintCall { to, quantity }.abi_encode(),
            MintVariant::Token { id } => IVialsById::mintCall {
                to,
                id: U256::from(id),
                quantity,
            }
            .abi_encode(),
            MintVariant::Honorary {
                title: HonoraryTitle::King,
            } => IHonorary::kingMintCall { to }.abi_encode(),
            MintVariant::Honorary {
                title: HonoraryTitle::Queen,
            } => IHonorary::queenMintCall { to }.abi_encode(),
        };
        data.into()
    }

    /// Unit price in wei; honorary mints are free.
    #[instrument(skip(self, reader), fields(contract = %self.address))]
    pub async fn price(&self, reader: &dyn ChainReader) -> Result<U256> {
        match self.variant {
            MintVariant::Quantity => Ok(read(reader, self.address, IVials::priceCall {}).await?.price),
            MintVariant::Token { .. } => {
                Ok(read(reader, self.address, IVialsById::priceCall {}).await?.price)
            }
            MintVariant::Honorary { .. } => Ok(U256::ZERO),
        }
    }

    /// Reads price, supply and pause state.
    #[instrument(skip(self, reader), fields(contract = %self.address))]
    pub async fn stats(&self, reader: &dyn ChainReader) -> Result<CollectionStats> {
        match self.variant {
            MintVariant::Quantity => Ok(CollectionStats {
                price_wei: read(reader, self.address, IVials::priceCall {}).await?.price,
                max_supply: read(reader, self.address, IVials::maxSupplyCall {}).await?.supply,
                minted: read(reader, self.address, IVials::totalSupplyCall {}).await?.supply,
                paused: read(reader, self.address, IVials::pausedCall {}).await?.isPaused,
            }),
            MintVariant::Token { id } => {
                let id = U256::from(id);
                Ok(CollectionStats {
                    price_wei: read(reader, self.address, IVialsById::priceCall {}).await?.price,
                    max_supply: read(reader, self.address, IVialsById::getVialSupplyCall { id })
                        .await?
                        .supply,
                    minted: read(reader, self.address, IVialsById::vialsMintedCall { id })
                        .await?
                        .minted,
                    paused: read(reader, self.address, IVialsById::pausedCall {}).await?.isPaused,
                })
            }
            MintVariant::Honorary { .. } => Err(ClonesError::ValidationError(
                "honorary contract exposes no supply information".into(),
            )),
        }
    }
}
