//! Signing Pipeline
//!
//! This module turns an unsigned request into a signed transaction:
//! 1. Build the per-input pre-image (legacy, BIP-143 or fork-id)
//! 2. Ask a [`SigningOracle`] for a signature over its digest
//! 3. Decode and check the signature, then assemble scriptSig/witness
//!
//! The engine never holds private keys; [`NativeOracle`] is the in-process
//! key holder for software wallets and tests.

pub mod assembler;
pub mod der;
pub mod native;
pub mod oracle;
pub mod sighash;

pub use assembler::{sign_transaction, SigningSession, SigningState};
pub use der::{decode_tlv, encode_der, Signature};
pub use native::NativeOracle;
pub use oracle::{cancel_pair, CancelHandle, CancelSignal, HashAlgorithm, OracleError, OracleSignature, SigningOracle};
pub use sighash::{SighashEngine, SighashKind, SpentOutput, SIGHASH_ALL, SIGHASH_FORKID};
