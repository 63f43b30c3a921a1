//! UTXO Signer Core Library
//!
//! Account-path planning and transaction signing for Bitcoin-family coins.
//!
//! # Architecture
//!
//! This crate provides:
//! - **coins**: Per-coin network parameters (slip44, address versions, fork id)
//! - **wallet**: BIP32 path formatting, account planning and path description
//! - **address**: Address derivation and classification (base58, bech32, CashAddr)
//! - **tx**: Wire serialization and script templates
//! - **signing**: Sighash pre-images, the signing oracle contract, DER codec
//!   and the transaction assembler
//!
//! # Keys
//!
//! The engine never holds private keys. Every public key and signature comes
//! from a [`SigningOracle`]; [`NativeOracle`] is the in-process implementation
//! backed by a BIP39 seed that is zeroized on drop.
//!
//! # Example
//!
//! ```rust,ignore
//! use utxo_signer::{sign_transaction, NativeOracle, SigningConfig};
//!
//! let oracle = NativeOracle::from_mnemonic(phrase, "")?;
//! let signed = sign_transaction(&request, &oracle, &SigningConfig::default()).await?;
//! println!("txid {} fee {}", signed.txid, signed.fee);
//! ```

pub mod address;
pub mod coins;
pub mod config;
pub mod error;
pub mod signing;
pub mod tx;
pub mod types;
pub mod utils;
pub mod wallet;

// Re-export key types for convenience
pub use error::{ErrorCode, SignerError, SignerResult};
pub use types::*;

pub use address::{classify_address, derive_address, AddressCodec, AddressKind, ScriptTemplate};
pub use coins::{CoinParams, CoinRegistry};
pub use config::{PayloadHashing, SigningConfig};
pub use signing::{
    cancel_pair, sign_transaction, CancelHandle, CancelSignal, HashAlgorithm, NativeOracle,
    OracleError, OracleSignature, SigningOracle, SigningSession, SigningState,
};
pub use utils::KeyCache;
pub use wallet::{
    account_paths, address_n_to_bip32, bip32_to_address_n, describe_path, is_same_account,
    next_account_path, AccountPathPlanner, PathClassifier,
};
