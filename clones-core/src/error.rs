//! Error types for the Cool x Clones client.
//!
//! The taxonomy follows the session lifecycle: a wallet that cannot be
//! reached, a transaction the wallet or network refused, a transaction that
//! was accepted but failed on-chain, and reads that produced no information.

use alloy::primitives::B256;
use thiserror::Error;

/// Result type alias using `ClonesError`.
pub type Result<T> = std::result::Result<T, ClonesError>;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum ClonesError {
    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The wallet handle could not be obtained or exposed no account/network.
    #[error("Wallet connection failed: {0}")]
    ConnectionError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Transaction rejected by the wallet or network before acceptance.
    #[error("Transaction was not submitted: {0}")]
    SubmissionError(String),

    /// Accepted transaction reverted or could not be confirmed.
    #[error("Transaction {hash} failed: {reason}")]
    ConfirmationFailure { hash: B256, reason: String },

    /// Requested mint quantity is out of range.
    #[error("Invalid mint quantity {quantity}: must be between 1 and {max}")]
    InvalidQuantity { quantity: u32, max: u32 },

    /// Another mint attempt is still in flight.
    #[error("A mint is already in progress")]
    MintInProgress,

    // ═══════════════════════════════════════════════════════════════════════════
    // READ ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A balance, ENS or contract state read failed.
    #[error("Read failed: {0}")]
    ReadFailure(String),

    /// Calldata could not be encoded or return data decoded.
    #[error("ABI error: {0}")]
    AbiError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// JSON-RPC error object returned by the node or wallet.
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// Connection timeout.
    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Malformed account or contract address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// JSON-RPC code wallets use when the user dismisses a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

impl ClonesError {
    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClonesError::HttpError(_)
                | ClonesError::ConnectionTimeout(_)
                | ClonesError::RpcError { .. }
                | ClonesError::ReadFailure(_)
        )
    }

    /// Returns true if this error only means "no information".
    ///
    /// Read failures in eligibility and ENS lookups are swallowed by callers.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, ClonesError::ReadFailure(_) | ClonesError::AbiError(_))
    }

    /// Returns true if the user rejected the request in their wallet.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ClonesError::RpcError { code, .. } if *code == USER_REJECTED_CODE)
    }

    /// Message suitable for showing to the user.
    ///
    /// Connection problems get a generic notice; transaction failures carry
    /// the underlying reason.
    pub fn user_message(&self) -> String {
        match self {
            ClonesError::ConnectionError(_) => "Could not connect to your wallet".into(),
            ClonesError::SubmissionError(msg) => msg.clone(),
            ClonesError::ConfirmationFailure { reason, .. } => reason.clone(),
            ClonesError::RpcError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Converts any failure before acceptance into a `SubmissionError`.
    pub fn into_submission(self) -> ClonesError {
        match self {
            ClonesError::SubmissionError(_) | ClonesError::ConnectionError(_) => self,
            ClonesError::InvalidQuantity { .. } | ClonesError::MintInProgress => self,
            other if other.is_user_rejection() => {
                ClonesError::SubmissionError("User rejected the transaction".into())
            }
            ClonesError::RpcError { message, .. } => ClonesError::SubmissionError(message),
            other => ClonesError::SubmissionError(other.to_string()),
        }
    }

    /// Converts a failure while awaiting confirmation into `ConfirmationFailure`.
    pub fn into_confirmation(self, hash: B256) -> ClonesError {
        match self {
            ClonesError::ConfirmationFailure { .. } => self,
            ClonesError::RpcError { message, .. } => ClonesError::ConfirmationFailure {
                hash,
                reason: message,
            },
            other => ClonesError::ConfirmationFailure {
                hash,
                reason: other.to_string(),
            },
        }
    }
}
