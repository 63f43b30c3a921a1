//! ECDSA signature DER codec
//!
//! Oracles return either raw `(r, s)` or variable-length DER; both end up as
//! a canonical pair of 32-byte integers, and the transaction carries the
//! strict DER form followed by the sighash byte.

use crate::error::{SignerError, SignerResult};

const SEQUENCE_TAG: u8 = 0x30;
const INTEGER_TAG: u8 = 0x02;

/// An ECDSA signature as two big-endian 32-byte integers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Self { r, s }
    }

    /// 64-byte `r || s`
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// Strict DER without a trailing sighash byte
    pub fn to_der(&self) -> Vec<u8> {
        let r = integer_bytes(&self.r);
        let s = integer_bytes(&self.s);

        let mut out = Vec::with_capacity(6 + r.len() + s.len());
        out.push(SEQUENCE_TAG);
        out.push((4 + r.len() + s.len()) as u8);
        out.push(INTEGER_TAG);
        out.push(r.len() as u8);
        out.extend_from_slice(&r);
        out.push(INTEGER_TAG);
        out.push(s.len() as u8);
        out.extend_from_slice(&s);
        out
    }
}

/// DER signature followed by the one-byte sighash type, as pushed in scripts
pub fn encode_der(signature: &Signature, hash_type: u8) -> Vec<u8> {
    let mut out = signature.to_der();
    out.push(hash_type);
    out
}

/// Decode a DER signature, with or without a trailing sighash byte
pub fn decode_tlv(bytes: &[u8]) -> SignerResult<Signature> {
    decode_with_hash_type(bytes).map(|(signature, _)| signature)
}

/// Decode a DER signature, returning the trailing sighash byte if present
pub fn decode_with_hash_type(bytes: &[u8]) -> SignerResult<(Signature, Option<u8>)> {
    if bytes.len() < 8 {
        return Err(SignerError::malformed_signature(format!(
            "Signature too short: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0] != SEQUENCE_TAG {
        return Err(SignerError::malformed_signature(format!(
            "Expected SEQUENCE tag 0x30, found 0x{:02x}",
            bytes[0]
        )));
    }

    let body_len = bytes[1] as usize;
    let hash_type = match bytes.len().checked_sub(2 + body_len) {
        Some(0) => None,
        Some(1) => Some(bytes[bytes.len() - 1]),
        _ => {
            return Err(SignerError::malformed_signature(format!(
                "Sequence length {} does not match signature length {}",
                body_len,
                bytes.len()
            )))
        }
    };

    let body = &bytes[2..2 + body_len];
    let (r, rest) = read_integer(body, "r")?;
    let (s, rest) = read_integer(rest, "s")?;
    if !rest.is_empty() {
        return Err(SignerError::malformed_signature(format!(
            "{} trailing bytes inside signature sequence",
            rest.len()
        )));
    }

    Ok((Signature { r, s }, hash_type))
}

/// Minimal two's-complement-safe big-endian encoding of a non-negative integer
fn integer_bytes(value: &[u8; 32]) -> Vec<u8> {
    let first_nonzero = value.iter().position(|b| *b != 0).unwrap_or(31);
    let trimmed = &value[first_nonzero..];

    let mut out = Vec::with_capacity(33);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

fn read_integer<'a>(data: &'a [u8], name: &str) -> SignerResult<([u8; 32], &'a [u8])> {
    if data.len() < 2 || data[0] != INTEGER_TAG {
        return Err(SignerError::malformed_signature(format!(
            "Expected INTEGER tag for {}",
            name
        )));
    }

    let len = data[1] as usize;
    let value = data.get(2..2 + len).ok_or_else(|| {
        SignerError::malformed_signature(format!("{} length {} overruns signature", name, len))
    })?;

    let value = match (value.len(), value.first()) {
        (0, _) => {
            return Err(SignerError::malformed_signature(format!("{} is empty", name)));
        }
        (33, Some(0x00)) => &value[1..],
        (33, _) => {
            return Err(SignerError::malformed_signature(format!(
                "33-byte {} without a leading zero",
                name
            )));
        }
        (n, _) if n > 33 => {
            return Err(SignerError::malformed_signature(format!(
                "{} is {} bytes",
                name, n
            )));
        }
        _ => value,
    };

    let mut out = [0u8; 32];
    out[32 - value.len()..].copy_from_slice(value);
    Ok((out, &data[2 + len..]))
}
