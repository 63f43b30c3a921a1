//! Unified error types for the signing engine
//!
//! Every failure in the crate flows through `SignerError` so callers get one
//! code to match on. All codes are terminal for the current signing request;
//! the engine never retries on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all engine operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl SignerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn unsupported_coin(coin: impl Into<String>) -> Self {
        let coin = coin.into();
        Self::new(ErrorCode::UnsupportedCoin, format!("Unsupported coin: {}", coin))
    }

    pub fn unsupported_script_type(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedScriptType, msg)
    }

    pub fn unrecognized_address(address: &str) -> Self {
        Self::new(
            ErrorCode::UnrecognizedAddressFormat,
            format!("Unrecognized address format: {}", address),
        )
    }

    pub fn insufficient_input_value(inputs: u64, outputs: u64) -> Self {
        Self::new(
            ErrorCode::InsufficientInputValue,
            format!("Outputs ({} sats) exceed inputs ({} sats)", outputs, inputs),
        )
    }

    pub fn malformed_signature(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedSignature, msg)
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(ErrorCode::MissingRequiredField, format!("Missing required field: {}", field))
    }

    pub fn oracle_rejected(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::OracleRejected, msg)
    }

    pub fn oracle_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::OracleTimeout, msg)
    }

    pub fn oracle_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::OracleError, msg)
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cancelled, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransaction, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for SignerError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Registry / planning errors
    UnsupportedCoin,
    UnsupportedScriptType,

    // Request validation errors
    UnrecognizedAddressFormat,
    InsufficientInputValue,
    MissingRequiredField,
    InvalidInput,
    InvalidTransaction,

    // Signature errors
    MalformedSignature,

    // Oracle errors
    OracleRejected,
    OracleTimeout,
    OracleError,
    Cancelled,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Errors that are always raised before the first oracle call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorCode::UnsupportedCoin
                | ErrorCode::UnsupportedScriptType
                | ErrorCode::UnrecognizedAddressFormat
                | ErrorCode::InsufficientInputValue
                | ErrorCode::MissingRequiredField
                | ErrorCode::InvalidInput
                | ErrorCode::InvalidTransaction
        )
    }

    pub fn is_oracle(&self) -> bool {
        matches!(
            self,
            ErrorCode::OracleRejected
                | ErrorCode::OracleTimeout
                | ErrorCode::OracleError
                | ErrorCode::Cancelled
        )
    }
}

/// Result type alias for engine operations
pub type SignerResult<T> = Result<T, SignerError>;

// Conversions from common error types

impl From<serde_json::Error> for SignerError {
    fn from(e: serde_json::Error) -> Self {
        SignerError::new(ErrorCode::InvalidInput, format!("JSON error: {}", e))
    }
}

impl From<hex::FromHexError> for SignerError {
    fn from(e: hex::FromHexError) -> Self {
        SignerError::new(ErrorCode::InvalidInput, format!("Hex error: {}", e))
    }
}

impl From<secp256k1::Error> for SignerError {
    fn from(e: secp256k1::Error) -> Self {
        SignerError::new(ErrorCode::InvalidInput, format!("Secp256k1 error: {}", e))
    }
}

impl From<bitcoin::consensus::encode::Error> for SignerError {
    fn from(e: bitcoin::consensus::encode::Error) -> Self {
        SignerError::new(ErrorCode::InvalidTransaction, format!("Consensus decode error: {}", e))
    }
}

impl From<bitcoin::bip32::Error> for SignerError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        SignerError::new(ErrorCode::OracleError, format!("BIP32 error: {}", e))
    }
}

impl From<bip39::Error> for SignerError {
    fn from(e: bip39::Error) -> Self {
        SignerError::new(ErrorCode::InvalidInput, format!("BIP39 error: {}", e))
    }
}
