//! Address Codec
//!
//! Derives addresses from public keys and classifies address strings into
//! the script templates they pay to, across base58check, bech32 (witness
//! v0) and CashAddr encodings.

pub mod base58;
pub mod cashaddr;
pub mod segwit;

use crate::coins::{CoinParams, CoinRegistry};
use crate::error::{SignerError, SignerResult};
use crate::tx::script;
use crate::types::ScriptType;
use crate::utils::{compress_pubkey, hash160};

use cashaddr::CashAddrType;

/// Script template an address pays to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    CashAddrP2pkh,
    CashAddrP2sh,
}

/// A classified address: template plus the hash or witness program it commits to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    pub kind: AddressKind,
    pub hash: Vec<u8>,
}

impl ScriptTemplate {
    pub fn script_pubkey(&self) -> Vec<u8> {
        match self.kind {
            AddressKind::P2pkh | AddressKind::CashAddrP2pkh => script::p2pkh(&self.hash),
            AddressKind::P2sh | AddressKind::CashAddrP2sh => script::p2sh(&self.hash),
            AddressKind::P2wpkh | AddressKind::P2wsh => script::witness_v0(&self.hash),
        }
    }

    /// Whether an address of this template can be produced by `script_type`
    pub fn matches_script_type(&self, script_type: ScriptType) -> bool {
        use AddressKind::*;
        match script_type {
            ScriptType::P2pkh => matches!(self.kind, P2pkh | CashAddrP2pkh),
            ScriptType::P2shP2wpkh | ScriptType::P2shMultisig | ScriptType::P2shP2wshMultisig => {
                matches!(self.kind, P2sh | CashAddrP2sh)
            }
            ScriptType::P2wpkh => self.kind == P2wpkh,
            ScriptType::P2wshMultisig => self.kind == P2wsh,
        }
    }
}

/// Address operations against a coin table
#[derive(Debug, Clone, Copy)]
pub struct AddressCodec<'a> {
    registry: &'a CoinRegistry,
}

impl<'a> AddressCodec<'a> {
    pub fn new(registry: &'a CoinRegistry) -> Self {
        Self { registry }
    }

    pub fn builtin() -> AddressCodec<'static> {
        AddressCodec::new(CoinRegistry::builtin())
    }

    pub fn derive_address(&self, pubkey: &[u8], coin: &str, script_type: ScriptType) -> SignerResult<String> {
        derive_for(pubkey, self.registry.require(coin)?, script_type)
    }

    pub fn classify_address(&self, address: &str, coin: &str) -> SignerResult<ScriptTemplate> {
        classify_for(address, self.registry.require(coin)?)
    }
}

pub fn derive_address(pubkey: &[u8], coin: &str, script_type: ScriptType) -> SignerResult<String> {
    AddressCodec::builtin().derive_address(pubkey, coin, script_type)
}

pub fn classify_address(address: &str, coin: &str) -> SignerResult<ScriptTemplate> {
    AddressCodec::builtin().classify_address(address, coin)
}

/// Derive the address for a 33- or 65-byte public key
pub fn derive_for(pubkey: &[u8], coin: &CoinParams, script_type: ScriptType) -> SignerResult<String> {
    if !coin.supports_script_type(script_type) {
        return Err(SignerError::unsupported_script_type(format!(
            "{} does not support {}",
            coin.name, script_type
        )));
    }

    let pubkey_hash = hash160(&compress_pubkey(pubkey)?);

    match script_type {
        ScriptType::P2pkh => match coin.cashaddr_prefix.as_deref() {
            Some(prefix) => Ok(cashaddr::encode(prefix, CashAddrType::P2pkh, &pubkey_hash)?),
            None => Ok(base58::encode_check(coin.pub_key_hash, &pubkey_hash)),
        },
        ScriptType::P2shP2wpkh => {
            let redeem_script = script::witness_v0(&pubkey_hash);
            Ok(base58::encode_check(coin.script_hash, &hash160(&redeem_script)))
        }
        ScriptType::P2wpkh => {
            let hrp = coin.bech32_prefix.as_deref().ok_or_else(|| {
                SignerError::unsupported_script_type(format!("{} has no bech32 prefix", coin.name))
            })?;
            segwit::encode_v0(hrp, &pubkey_hash)
        }
        other => Err(SignerError::unsupported_script_type(format!(
            "Cannot derive a single-key address for {}",
            other
        ))),
    }
}

/// Classify an address for `coin`: bech32 first, then CashAddr, then
/// base58check. Anything else is an error; there is no fallback template.
pub fn classify_for(address: &str, coin: &CoinParams) -> SignerResult<ScriptTemplate> {
    let trimmed = address.trim();

    if let Some(hrp) = coin.bech32_prefix.as_deref() {
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with(&format!("{}1", hrp)) {
            if let Some(program) = segwit::decode_v0(hrp, trimmed) {
                let kind = if program.len() == 20 {
                    AddressKind::P2wpkh
                } else {
                    AddressKind::P2wsh
                };
                return Ok(ScriptTemplate { kind, hash: program });
            }
        }
    }

    if let Some(prefix) = coin.cashaddr_prefix.as_deref() {
        if let Ok((kind, hash)) = cashaddr::decode(trimmed, prefix) {
            let kind = match kind {
                CashAddrType::P2pkh => AddressKind::CashAddrP2pkh,
                CashAddrType::P2sh => AddressKind::CashAddrP2sh,
            };
            if hash.len() == 20 {
                return Ok(ScriptTemplate { kind, hash });
            }
        }
    }

    if let Some((version, payload)) = base58::decode_check(trimmed) {
        if payload.len() == 20 {
            if version == coin.pub_key_hash {
                return Ok(ScriptTemplate { kind: AddressKind::P2pkh, hash: payload });
            }
            if version == coin.script_hash {
                return Ok(ScriptTemplate { kind: AddressKind::P2sh, hash: payload });
            }
        }
    }

    Err(SignerError::unrecognized_address(trimmed).with_details(format!("coin {}", coin.name)))
}
