//! Error types for the registry client.
//!
//! Everything that can go wrong while preparing, sending or interpreting a
//! registry call is collected in [`NiraError`]. Business rejections reported
//! by the registry itself travel through [`NiraError::RemoteTransaction`] and
//! are folded into the [`OperationResult`](crate::response::OperationResult)
//! a caller receives; the remaining variants describe local or transport
//! failures.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for the registry client.
pub type Result<T, E = NiraError> = std::result::Result<T, E>;

/// Main error type for the registry client.
#[derive(Error, Debug)]
pub enum NiraError {
    /// The operating system refused to hand out cryptographically secure
    /// random bytes for a nonce
    #[error("secure random source unavailable: {message}")]
    SecureRandomUnavailable { message: String },

    /// The public key needed to encrypt a replacement password could not be
    /// read from disk
    #[error("registry public key not found at '{path}'")]
    KeyNotFound { path: String },

    /// Password encryption failed, either because the key material was
    /// malformed or because the RSA operation itself was rejected
    #[error("password encryption failed: {message}")]
    Encryption { message: String },

    /// A password digest could not be derived
    #[error("digest computation failed: {message}")]
    Crypto { message: String },

    /// The registry reported a business-level error inside an otherwise
    /// well-formed response
    #[error("registry transaction failed: {message}")]
    RemoteTransaction {
        message: String,
        code: Option<String>,
    },

    /// The HTTP round trip to the registry endpoint failed
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be understood as a SOAP envelope carrying the
    /// expected payload, or the server answered with a SOAP fault
    #[error("envelope error: {message}")]
    Envelope { message: String },

    /// Client configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl NiraError {
    /// Create a new secure random failure error
    pub fn secure_random(message: impl Into<String>) -> Self {
        Self::SecureRandomUnavailable {
            message: message.into(),
        }
    }

    /// Create a new key lookup error for the given filesystem path
    pub fn key_not_found(path: impl Into<String>) -> Self {
        Self::KeyNotFound { path: path.into() }
    }

    /// Create a new encryption error
    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// Create a new digest computation error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a new remote transaction error with an optional registry error
    /// code
    pub fn remote(message: impl Into<String>, code: Option<String>) -> Self {
        Self::RemoteTransaction {
            message: message.into(),
            code,
        }
    }

    /// Create a new envelope error
    pub fn envelope(message: impl Into<String>) -> Self {
        Self::Envelope {
            message: message.into(),
        }
    }
}
