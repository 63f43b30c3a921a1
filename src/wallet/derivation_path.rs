//! BIP-32 Derivation Path Helpers
//!
//! Conversion between the textual form (`m/44'/0'/0'/0/0`) and the
//! `address_n` form (a list of u32 with the top bit marking hardened
//! components) used everywhere else in the engine.

use std::fmt::Write as _;

use crate::error::{SignerError, SignerResult};

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = 0x80000000;

pub fn harden(index: u32) -> u32 {
    index | HARDENED
}

pub fn is_hardened(index: u32) -> bool {
    index & HARDENED != 0
}

/// Index with the hardened bit cleared
pub fn unharden(index: u32) -> u32 {
    index & !HARDENED
}

/// Render an `address_n` list as a BIP-32 path string
pub fn address_n_to_bip32(address_n: &[u32]) -> String {
    address_n.iter().fold(String::from("m"), |mut out, &raw| {
        let marker = if is_hardened(raw) { "'" } else { "" };
        let _ = write!(out, "/{}{}", unharden(raw), marker);
        out
    })
}

/// Parse a BIP-32 path string into `address_n` form.
///
/// Hardened components may be marked with `'`, `h` or `H`.
pub fn bip32_to_address_n(path: &str) -> SignerResult<Vec<u32>> {
    let trimmed = path.trim();
    let rest = match trimmed.split_once('/') {
        None if trimmed.eq_ignore_ascii_case("m") => return Ok(Vec::new()),
        Some((root, rest)) if root.eq_ignore_ascii_case("m") => rest,
        _ => {
            return Err(SignerError::invalid_input(format!(
                "Derivation path '{}' must start with 'm/'",
                path
            )))
        }
    };

    rest.split('/').map(parse_index).collect()
}

fn parse_index(component: &str) -> SignerResult<u32> {
    let component = component.trim();
    let (digits, hardened) = match component.strip_suffix(['\'', 'h', 'H']) {
        Some(digits) => (digits, true),
        None => (component, false),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SignerError::invalid_input(format!(
            "Invalid path component '{}'",
            component
        )));
    }

    match digits.parse::<u32>() {
        Ok(index) if !is_hardened(index) => Ok(if hardened { harden(index) } else { index }),
        _ => Err(SignerError::invalid_input(format!(
            "Path component '{}' is out of range",
            component
        ))),
    }
}
