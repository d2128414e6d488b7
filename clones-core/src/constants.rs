//! Constants for the Cool x Clones client.
//!
//! Chain ids and contract addresses here are only the defaults baked into
//! [`ClonesConfig::default`](crate::ClonesConfig); every one of them can be
//! overridden by configuration.

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Chain id of Ethereum mainnet.
pub const DEFAULT_MAINNET_CHAIN_ID: u64 = 1;

/// Chain id of the Goerli testnet used by the vial pages.
pub const DEFAULT_TESTNET_CHAIN_ID: u64 = 5;

/// Transaction URL prefix on the mainnet explorer.
pub const DEFAULT_MAINNET_EXPLORER: &str = "https://etherscan.io/tx/";

/// Transaction URL prefix on the testnet explorer.
pub const DEFAULT_TESTNET_EXPLORER: &str = "https://goerli.etherscan.io/tx/";

/// Default JSON-RPC endpoint for the wallet bridge.
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

// ═══════════════════════════════════════════════════════════════════════════════
// ADDRESS DISPLAY
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of a `0x`-prefixed hex address string.
pub const ADDRESS_STRING_LEN: usize = 42;

/// Characters kept from the start of an address (`0x` + 4 hex digits).
pub const SHORT_ADDRESS_PREFIX_LEN: usize = 6;

/// Offset at which the kept address suffix begins.
pub const SHORT_ADDRESS_SUFFIX_OFFSET: usize = 38;

/// Separator placed between prefix and suffix.
pub const SHORT_ADDRESS_SEPARATOR: &str = "...";

/// Length of a shortened address: 6 + 3 + 4.
pub const SHORT_ADDRESS_LEN: usize = SHORT_ADDRESS_PREFIX_LEN
    + SHORT_ADDRESS_SEPARATOR.len()
    + (ADDRESS_STRING_LEN - SHORT_ADDRESS_SUFFIX_OFFSET);

// ═══════════════════════════════════════════════════════════════════════════════
// MINT LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tokens per transaction for everybody.
pub const BASELINE_MAX_PER_TRANSACTION: u32 = 5;

/// Tokens per transaction for holders of an allow-listed collection.
pub const BONUS_MAX_PER_TRANSACTION: u32 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// CONTRACTS
// ═══════════════════════════════════════════════════════════════════════════════

/// ENS registry, same address on mainnet and the public testnets.
pub const ENS_REGISTRY_ADDRESS: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// Clone X collection (bonus holder check).
pub const CLONE_X_ADDRESS: &str = "0x49cf6f5d44e70224e2e23fdcdd2c053f30ada28b";

/// Cool Cats collection (bonus holder check).
pub const COOL_CATS_ADDRESS: &str = "0x1a92f7381b9f03921564a437210bb9396471050c";

/// ERC-721 used as the testnet stand-in for the holder checks.
pub const TESTNET_HOLDER_ADDRESS: &str = "0xdc77e7bd3bfbc8e3b7f816717bc0af6515960b91";

/// Vials contract on the testnet (quantity mint page).
pub const TESTNET_VIALS_ADDRESS: &str = "0x7981cba35d6e0deeaecad4e5c0ad3685e4ecf33d";

/// Per-id vials contract on Goerli.
pub const GOERLI_VIALS_ADDRESS: &str = "0xd8be55f2e3836c7ffab21f342a3bea7228d02de8";

/// ERC-1155 honorary collection (king / queen free mints).
pub const HONORARY_ADDRESS: &str = "0x7b903229b78ff51785b11bebaf297e562ca55bcc";

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Default file name of the provider marker.
pub const DEFAULT_PROVIDER_CACHE_FILE: &str = "clones-provider.json";

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT TUNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default JSON-RPC request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default interval between receipt / wallet-state polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
