//! Error types for BRIT.
//!
//! This module provides the error hierarchy using `thiserror`. Protocol
//! errors are permanent; only transport failures are worth retrying.

use thiserror::Error;

/// Result type alias using `BritError`.
pub type Result<T> = std::result::Result<T, BritError>;

/// Main error type for all BRIT operations.
#[derive(Debug, Error)]
pub enum BritError {
    // ═══════════════════════════════════════════════════════════════════════════
    // WIRE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The decoded message carries a version this code does not understand.
    #[error("Protocol version mismatch: expected {expected}, got '{actual}'")]
    VersionMismatch {
        /// Version this code speaks
        expected: u32,
        /// Raw version row as received
        actual: String,
    },

    /// A row or field of a message could not be parsed.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Key mismatch, bad framing or failed authentication. Carries no detail.
    #[error("Decryption failed")]
    DecryptionFailure,

    /// Encryption could not be performed (bad recipient key).
    #[error("Encryption failed: {0}")]
    EncryptionFailure(String),

    /// Invalid key size or format.
    #[error("Invalid key: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Required length in bytes
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Network error, timeout or non-success HTTP status.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // POOL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An address string was rejected by the pool.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The address pool could not be read or persisted.
    #[error("Pool error: {0}")]
    PoolError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE & SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BritError {
    /// Returns true if the whole exchange may be retried with backoff.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BritError::TransportFailure(_))
    }

    /// Returns true if this error came out of the wire codec.
    pub fn is_wire_error(&self) -> bool {
        matches!(
            self,
            BritError::VersionMismatch { .. } | BritError::MalformedMessage(_)
        )
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            BritError::DecryptionFailure
                | BritError::EncryptionFailure(_)
                | BritError::InvalidKeySize { .. }
        )
    }
}
