//! Bech32 witness addresses (BIP173)
//!
//! Only witness version 0 is produced or accepted.

use bech32::{u5, FromBase32, ToBase32, Variant};

use crate::error::{SignerError, SignerResult};

pub fn encode_v0(hrp: &str, program: &[u8]) -> SignerResult<String> {
    let version = u5::try_from_u8(0).map_err(|e| SignerError::internal(e.to_string()))?;
    let mut data = vec![version];
    data.extend(program.to_base32());
    bech32::encode(hrp, data, Variant::Bech32)
        .map_err(|e| SignerError::internal(format!("Bech32 encoding failed: {}", e)))
}

/// Decode a v0 witness address for `hrp`, returning the witness program
pub fn decode_v0(hrp: &str, address: &str) -> Option<Vec<u8>> {
    let (decoded_hrp, data, variant) = bech32::decode(address.trim()).ok()?;
    if decoded_hrp != hrp || variant != Variant::Bech32 {
        return None;
    }

    let (version, program) = data.split_first()?;
    if version.to_u8() != 0 {
        return None;
    }

    let program = Vec::<u8>::from_base32(program).ok()?;
    match program.len() {
        20 | 32 => Some(program),
        _ => None,
    }
}
