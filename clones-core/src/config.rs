//! Deployment configuration.
//!
//! Chain ids, contract addresses and allow-listed collections differ between
//! deployments, so they are data here rather than literals in the logic.
//! Defaults reproduce the production site.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::*;
use crate::error::{ClonesError, Result};
use crate::types::ChainClass;

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Chain ids and explorers for the two supported networks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain id treated as Mainnet
    pub mainnet_chain_id: u64,
    /// Chain id treated as Testnet
    pub testnet_chain_id: u64,
    /// Transaction URL prefix on Mainnet
    pub mainnet_explorer: String,
    /// Transaction URL prefix on Testnet
    pub testnet_explorer: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mainnet_chain_id: DEFAULT_MAINNET_CHAIN_ID,
            testnet_chain_id: DEFAULT_TESTNET_CHAIN_ID,
            mainnet_explorer: DEFAULT_MAINNET_EXPLORER.into(),
            testnet_explorer: DEFAULT_TESTNET_EXPLORER.into(),
        }
    }
}

impl NetworkConfig {
    /// Classifies a reported chain id.
    pub fn classify(&self, chain_id: u64) -> ChainClass {
        if chain_id == self.mainnet_chain_id {
            ChainClass::Mainnet
        } else if chain_id == self.testnet_chain_id {
            ChainClass::Testnet
        } else {
            ChainClass::Unknown
        }
    }

    /// Chain id for a known class.
    pub fn chain_id(&self, class: ChainClass) -> Option<u64> {
        match class {
            ChainClass::Mainnet => Some(self.mainnet_chain_id),
            ChainClass::Testnet => Some(self.testnet_chain_id),
            ChainClass::Unknown => None,
        }
    }

    /// Explorer URL prefix for a known class.
    pub fn explorer(&self, class: ChainClass) -> Option<&str> {
        match class {
            ChainClass::Mainnet => Some(&self.mainnet_explorer),
            ChainClass::Testnet => Some(&self.testnet_explorer),
            ChainClass::Unknown => None,
        }
    }

    /// Full explorer link for a transaction.
    pub fn explorer_tx_url(&self, class: ChainClass, hash: &B256) -> Option<String> {
        self.explorer(class).map(|prefix| format!("{prefix}{hash}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOLDER CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Token standard of an allow-listed collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "lowercase")]
pub enum TokenStandard {
    /// `balanceOf(owner)`
    Erc721,
    /// `balanceOf(account, id)`
    Erc1155 {
        /// Token id to check
        token_id: u64,
    },
}

/// One read-only balance check against a fixed contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderCheck {
    /// Display name of the collection
    pub name: String,
    /// Collection contract
    pub contract: Address,
    /// How to query the balance
    #[serde(flatten)]
    pub standard: TokenStandard,
}

impl HolderCheck {
    /// ERC-721 check.
    pub fn erc721(name: impl Into<String>, contract: Address) -> Self {
        Self {
            name: name.into(),
            contract,
            standard: TokenStandard::Erc721,
        }
    }

    /// ERC-1155 check for one token id.
    pub fn erc1155(name: impl Into<String>, contract: Address, token_id: u64) -> Self {
        Self {
            name: name.into(),
            contract,
            standard: TokenStandard::Erc1155 { token_id },
        }
    }
}

/// Mint limits and the collections that unlock the bonus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    /// Limit for everybody
    pub baseline: u32,
    /// Limit for holders
    pub bonus: u32,
    /// Checks run while on Mainnet
    pub mainnet_checks: Vec<HolderCheck>,
    /// Checks run while on Testnet
    pub testnet_checks: Vec<HolderCheck>,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            baseline: BASELINE_MAX_PER_TRANSACTION,
            bonus: BONUS_MAX_PER_TRANSACTION,
            mainnet_checks: vec![
                HolderCheck::erc721("Clone X", parse_const(CLONE_X_ADDRESS)),
                HolderCheck::erc721("Cool Cats", parse_const(COOL_CATS_ADDRESS)),
            ],
            testnet_checks: vec![HolderCheck::erc721(
                "Testnet holders",
                parse_const(TESTNET_HOLDER_ADDRESS),
            )],
        }
    }
}

impl EligibilityConfig {
    /// Checks that apply on the given chain.
    pub fn checks_for(&self, class: ChainClass) -> &[HolderCheck] {
        match class {
            ChainClass::Mainnet => &self.mainnet_checks,
            ChainClass::Testnet => &self.testnet_checks,
            ChainClass::Unknown => &[],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MINT TARGETS
// ═══════════════════════════════════════════════════════════════════════════════

/// Title minted by the honorary contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HonoraryTitle {
    /// `kingMint`, token id 1
    King,
    /// `queenMint`, token id 2
    Queen,
}

impl HonoraryTitle {
    /// ERC-1155 token id holding this title.
    pub fn token_id(self) -> u64 {
        match self {
            HonoraryTitle::King => 1,
            HonoraryTitle::Queen => 2,
        }
    }
}

/// Which mint method a target exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MintVariant {
    /// `mint(to, quantity)`
    Quantity,
    /// `mint(to, id, quantity)`
    Token {
        /// Vial id
        id: u64,
    },
    /// `kingMint(to)` / `queenMint(to)`, quantity is always 1
    Honorary {
        /// Title to mint
        title: HonoraryTitle,
    },
}

impl MintVariant {
    /// Whether the caller chooses a quantity.
    pub fn takes_quantity(&self) -> bool {
        !matches!(self, MintVariant::Honorary { .. })
    }
}

/// Digits kept when formatting price quotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePrecision {
    /// Digits of the total price
    pub total_digits: usize,
    /// Digits of the "towards prize" share
    pub prize_digits: usize,
}

impl Default for PricePrecision {
    fn default() -> Self {
        Self {
            total_digits: 1,
            prize_digits: 2,
        }
    }
}

/// A mintable contract as one page of the site exposes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintTarget {
    /// Name used on the command line
    pub name: String,
    /// Deployment on Mainnet, if any
    pub mainnet: Option<Address>,
    /// Deployment on Testnet, if any
    pub testnet: Option<Address>,
    /// Mint method
    #[serde(flatten)]
    pub variant: MintVariant,
    /// Whether the mint charges `price() * quantity`
    #[serde(default)]
    pub priced: bool,
    /// Quote formatting
    #[serde(default)]
    pub precision: PricePrecision,
}

impl MintTarget {
    /// Contract address on the given chain.
    pub fn address(&self, class: ChainClass) -> Option<Address> {
        match class {
            ChainClass::Mainnet => self.mainnet,
            ChainClass::Testnet => self.testnet,
            ChainClass::Unknown => None,
        }
    }

    /// Copy of a per-id target pointed at another vial.
    pub fn with_token_id(&self, id: u64) -> Self {
        let mut target = self.clone();
        if let MintVariant::Token { .. } = target.variant {
            target.variant = MintVariant::Token { id };
        }
        target
    }
}

fn default_mints() -> Vec<MintTarget> {
    vec![
        MintTarget {
            name: "vials".into(),
            mainnet: None,
            testnet: Some(parse_const(TESTNET_VIALS_ADDRESS)),
            variant: MintVariant::Quantity,
            priced: true,
            precision: PricePrecision {
                total_digits: 1,
                prize_digits: 2,
            },
        },
        MintTarget {
            name: "vial".into(),
            mainnet: None,
            testnet: Some(parse_const(GOERLI_VIALS_ADDRESS)),
            variant: MintVariant::Token { id: 1 },
            priced: true,
            precision: PricePrecision {
                total_digits: 2,
                prize_digits: 3,
            },
        },
        MintTarget {
            name: "king".into(),
            mainnet: Some(parse_const(HONORARY_ADDRESS)),
            testnet: None,
            variant: MintVariant::Honorary {
                title: HonoraryTitle::King,
            },
            priced: false,
            precision: PricePrecision::default(),
        },
        MintTarget {
            name: "queen".into(),
            mainnet: Some(parse_const(HONORARY_ADDRESS)),
            testnet: None,
            variant: MintVariant::Honorary {
                title: HonoraryTitle::Queen,
            },
            priced: false,
            precision: PricePrecision::default(),
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOP-LEVEL CONFIG
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClonesConfig {
    /// JSON-RPC endpoint of the wallet bridge
    pub rpc_url: String,
    /// Identifier remembered as "last provider used"
    pub provider_id: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Receipt and wallet-state poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Where the provider marker is stored
    pub provider_cache_path: PathBuf,
    /// ENS registry contract
    pub ens_registry: Address,
    /// Networks
    pub networks: NetworkConfig,
    /// Mint limits
    pub eligibility: EligibilityConfig,
    /// Mintable contracts
    pub mints: Vec<MintTarget>,
}

impl Default for ClonesConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            provider_id: "injected".into(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            provider_cache_path: PathBuf::from(DEFAULT_PROVIDER_CACHE_FILE),
            ens_registry: parse_const(ENS_REGISTRY_ADDRESS),
            networks: NetworkConfig::default(),
            eligibility: EligibilityConfig::default(),
            mints: default_mints(),
        }
    }
}

impl ClonesConfig {
    /// Loads a JSON configuration file; missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClonesError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from the environment.
    ///
    /// Reads `.env` if present. `CLONES_CONFIG` names a JSON file used as the
    /// base; the other `CLONES_*` variables override individual fields.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var("CLONES_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = std::env::var("CLONES_RPC_URL") {
            config.rpc_url = url;
        }
        if let Ok(path) = std::env::var("CLONES_PROVIDER_CACHE") {
            config.provider_cache_path = PathBuf::from(path);
        }
        if let Some(id) = env_parse::<u64>("CLONES_MAINNET_CHAIN_ID")? {
            config.networks.mainnet_chain_id = id;
        }
        if let Some(id) = env_parse::<u64>("CLONES_TESTNET_CHAIN_ID")? {
            config.networks.testnet_chain_id = id;
        }
        if let Some(secs) = env_parse::<u64>("CLONES_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_seconds = secs;
        }
        if let Some(ms) = env_parse::<u64>("CLONES_POLL_INTERVAL_MS")? {
            config.poll_interval_ms = ms;
        }

        config.validate()?;
        debug!(rpc_url = %config.rpc_url, "Loaded configuration");
        Ok(config)
    }

    /// Rejects configurations the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.rpc_url)
            .map_err(|e| ClonesError::ConfigError(format!("invalid rpc_url: {e}")))?;

        if self.networks.mainnet_chain_id == self.networks.testnet_chain_id {
            return Err(ClonesError::ConfigError(
                "mainnet and testnet chain ids must differ".into(),
            ));
        }
        if self.eligibility.baseline == 0 {
            return Err(ClonesError::ConfigError("baseline limit must be at least 1".into()));
        }
        if self.eligibility.bonus < self.eligibility.baseline {
            return Err(ClonesError::ConfigError(
                "bonus limit must not be below the baseline".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClonesError::ConfigError("poll_interval_ms must be positive".into()));
        }

        let mut names: Vec<&str> = self.mints.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(ClonesError::ConfigError("mint target names must be unique".into()));
        }

        Ok(())
    }

    /// Looks up a mint target by name.
    pub fn mint(&self, name: &str) -> Result<&MintTarget> {
        self.mints
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ClonesError::ConfigError(format!("unknown mint target '{name}'")))
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ClonesError::ConfigError(format!("{key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parses one of the address constants; they are checked by unit tests.
fn parse_const(raw: &str) -> Address {
    Address::from_str(raw).unwrap_or(Address::ZERO)
}
