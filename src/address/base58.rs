//! Base58Check with a single version byte

use crate::utils::sha256d;

/// Encode `version || payload || checksum`
pub fn encode_check(version: u8, payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(payload.len() + 5);
    bytes.push(version);
    bytes.extend_from_slice(payload);
    let checksum = sha256d(&bytes);
    bytes.extend_from_slice(&checksum[..4]);
    bs58::encode(bytes).into_string()
}

/// Decode and verify the checksum, returning `(version, payload)`
pub fn decode_check(address: &str) -> Option<(u8, Vec<u8>)> {
    let decoded = bs58::decode(address.trim()).into_vec().ok()?;
    if decoded.len() < 5 {
        return None;
    }

    let (body, checksum) = decoded.split_at(decoded.len() - 4);
    if sha256d(body)[..4] != *checksum {
        return None;
    }

    let (version, payload) = body.split_first()?;
    Some((*version, payload.to_vec()))
}
