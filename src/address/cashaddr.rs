//! CashAddr encoding (Bitcoin Cash)
//!
//! `prefix:payload` where the payload is base32 over
//! `version_byte || hash` followed by a 40-bit BCH checksum that also
//! commits to the prefix.

use crate::error::{ErrorCode, SignerError};

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashAddrType {
    P2pkh,
    P2sh,
}

impl CashAddrType {
    fn type_bits(&self) -> u8 {
        match self {
            CashAddrType::P2pkh => 0,
            CashAddrType::P2sh => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CashAddrError {
    #[error("Mixed-case address")]
    MixedCase,

    #[error("Unexpected prefix: {0}")]
    InvalidPrefix(String),

    #[error("Invalid character: {0}")]
    InvalidCharacter(char),

    #[error("Payload too short")]
    TooShort,

    #[error("Checksum mismatch")]
    InvalidChecksum,

    #[error("Non-zero padding")]
    InvalidPadding,

    #[error("Unsupported hash size: {0}")]
    UnsupportedHashSize(usize),

    #[error("Unknown address type: {0}")]
    UnknownType(u8),
}

impl From<CashAddrError> for SignerError {
    fn from(e: CashAddrError) -> Self {
        SignerError::new(ErrorCode::UnrecognizedAddressFormat, format!("CashAddr: {}", e))
    }
}

/// Encode a hash as a CashAddr string
pub fn encode(prefix: &str, kind: CashAddrType, hash: &[u8]) -> Result<String, CashAddrError> {
    let size_bits = size_code(hash.len()).ok_or(CashAddrError::UnsupportedHashSize(hash.len()))?;

    let mut payload = Vec::with_capacity(hash.len() + 1);
    payload.push((kind.type_bits() << 3) | size_bits);
    payload.extend_from_slice(hash);

    let mut data = convert_bits(&payload, 8, 5, true).ok_or(CashAddrError::InvalidPadding)?;
    let checksum = checksum(prefix, &data);
    data.extend_from_slice(&checksum);

    let encoded: String = data.iter().map(|&b| CHARSET[b as usize] as char).collect();
    Ok(format!("{}:{}", prefix, encoded))
}

/// Decode a CashAddr string, with or without its prefix
pub fn decode(address: &str, expected_prefix: &str) -> Result<(CashAddrType, Vec<u8>), CashAddrError> {
    let trimmed = address.trim();
    let has_lower = trimmed.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = trimmed.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(CashAddrError::MixedCase);
    }

    let lower = trimmed.to_ascii_lowercase();
    let (prefix, body) = match lower.split_once(':') {
        Some((prefix, body)) => (prefix.to_string(), body.to_string()),
        None => (expected_prefix.to_string(), lower.clone()),
    };
    if prefix != expected_prefix {
        return Err(CashAddrError::InvalidPrefix(prefix));
    }

    let data = body
        .chars()
        .map(|c| {
            CHARSET
                .iter()
                .position(|&x| x as char == c)
                .map(|p| p as u8)
                .ok_or(CashAddrError::InvalidCharacter(c))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if data.len() <= CHECKSUM_LEN {
        return Err(CashAddrError::TooShort);
    }

    if polymod(&checksum_input(&prefix, &data)) != 0 {
        return Err(CashAddrError::InvalidChecksum);
    }

    let payload = convert_bits(&data[..data.len() - CHECKSUM_LEN], 5, 8, false)
        .ok_or(CashAddrError::InvalidPadding)?;
    let (version, hash) = payload.split_first().ok_or(CashAddrError::TooShort)?;

    let expected_len = hash_size(version & 0x07);
    if hash.len() != expected_len {
        return Err(CashAddrError::UnsupportedHashSize(hash.len()));
    }

    let kind = match version >> 3 {
        0 => CashAddrType::P2pkh,
        1 => CashAddrType::P2sh,
        other => return Err(CashAddrError::UnknownType(other)),
    };

    Ok((kind, hash.to_vec()))
}

fn size_code(len: usize) -> Option<u8> {
    match len {
        20 => Some(0),
        24 => Some(1),
        28 => Some(2),
        32 => Some(3),
        40 => Some(4),
        48 => Some(5),
        56 => Some(6),
        64 => Some(7),
        _ => None,
    }
}

fn hash_size(code: u8) -> usize {
    match code {
        0 => 20,
        1 => 24,
        2 => 28,
        3 => 32,
        4 => 40,
        5 => 48,
        6 => 56,
        _ => 64,
    }
}

/// Prefix (lower 5 bits of each char), separator zero, then payload
fn checksum_input(prefix: &str, data: &[u8]) -> Vec<u8> {
    let mut values: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    values.push(0);
    values.extend_from_slice(data);
    values
}

fn checksum(prefix: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = checksum_input(prefix, data);
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let poly = polymod(&values);

    let mut out = [0u8; CHECKSUM_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((poly >> (5 * (7 - i))) & 0x1f) as u8;
    }
    out
}

/// BCH code over GF(32); result is zero for a valid checksum
fn polymod(values: &[u8]) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98f2bc8e61,
        0x79b76d99e2,
        0xf33e5fb3c4,
        0xae2eabe2a8,
        0x1e4f43e470,
    ];

    let mut c: u64 = 1;
    for &v in values {
        let c0 = c >> 35;
        c = ((c & 0x07ffffffff) << 5) ^ (v as u64);
        for (i, &gen) in GENERATORS.iter().enumerate() {
            if (c0 >> i) & 1 != 0 {
                c ^= gen;
            }
        }
    }

    c ^ 1
}

/// Regroup bits; `None` on leftover non-zero or over-long padding when not padding
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut result = Vec::new();
    let max_value = (1u32 << to_bits) - 1;

    for &value in data {
        acc = (acc << from_bits) | (value as u32);
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            result.push(((acc >> bits) & max_value) as u8);
        }
    }

    if pad {
        if bits > 0 {
            result.push(((acc << (to_bits - bits)) & max_value) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & max_value) != 0 {
        return None;
    }

    Some(result)
}
