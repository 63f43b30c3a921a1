//! Hash and Key Helpers
//!
//! Hash primitives shared by the address codec, sighash engine and
//! assembler.

use bitcoin::hashes::{sha256d, Hash};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::{SignerError, SignerResult};

/// Single SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Double SHA-256 (Bitcoin's `hash256`)
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// RIPEMD-160 of SHA-256
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(sha256(data));
    hasher.finalize().into()
}

/// Normalize a 33- or 65-byte secp256k1 public key to its compressed form
pub fn compress_pubkey(pubkey: &[u8]) -> SignerResult<[u8; 33]> {
    match pubkey.len() {
        33 | 65 => {
            let key = secp256k1::PublicKey::from_slice(pubkey)?;
            Ok(key.serialize())
        }
        len => Err(SignerError::invalid_input(format!(
            "Public key must be 33 or 65 bytes, got {}",
            len
        ))),
    }
}

/// Reverse a 32-byte hash between display and wire order
pub fn reversed(hash: [u8; 32]) -> [u8; 32] {
    let mut out = hash;
    out.reverse();
    out
}
