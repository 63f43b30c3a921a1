//! Shared types for the signing engine
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Script Types
// =============================================================================

/// Spendable script templates an account can derive and sign for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptType {
    /// Legacy pay-to-pubkey-hash (BIP44)
    #[serde(rename = "p2pkh")]
    P2pkh,
    /// Segwit wrapped in P2SH (BIP49)
    #[serde(rename = "p2sh-p2wpkh")]
    P2shP2wpkh,
    /// Native segwit v0 (BIP84)
    #[serde(rename = "p2wpkh")]
    P2wpkh,
    /// Bare P2SH multisig
    #[serde(rename = "p2sh")]
    P2shMultisig,
    /// Native segwit multisig
    #[serde(rename = "p2wsh")]
    P2wshMultisig,
    /// Segwit multisig wrapped in P2SH
    #[serde(rename = "p2sh-p2wsh")]
    P2shP2wshMultisig,
}

impl ScriptType {
    /// Single-signature script types, in account display order
    pub const SINGLE_SIG: [ScriptType; 3] =
        [ScriptType::P2pkh, ScriptType::P2shP2wpkh, ScriptType::P2wpkh];

    /// BIP44-style purpose constant, if the script type has one
    pub fn purpose(&self) -> Option<u32> {
        match self {
            ScriptType::P2pkh => Some(44),
            ScriptType::P2shP2wpkh => Some(49),
            ScriptType::P2wpkh => Some(84),
            _ => None,
        }
    }

    pub fn from_purpose(purpose: u32) -> Option<Self> {
        match purpose {
            44 => Some(ScriptType::P2pkh),
            49 => Some(ScriptType::P2shP2wpkh),
            84 => Some(ScriptType::P2wpkh),
            _ => None,
        }
    }

    pub fn is_segwit(&self) -> bool {
        matches!(
            self,
            ScriptType::P2shP2wpkh
                | ScriptType::P2wpkh
                | ScriptType::P2wshMultisig
                | ScriptType::P2shP2wshMultisig
        )
    }

    pub fn is_multisig(&self) -> bool {
        matches!(
            self,
            ScriptType::P2shMultisig | ScriptType::P2wshMultisig | ScriptType::P2shP2wshMultisig
        )
    }

    /// Label used in human-readable path descriptions
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ScriptType::P2pkh => Some("Legacy"),
            ScriptType::P2shP2wpkh => Some("Segwit"),
            ScriptType::P2wpkh => Some("Segwit Native"),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptType::P2pkh => "p2pkh",
            ScriptType::P2shP2wpkh => "p2sh-p2wpkh",
            ScriptType::P2wpkh => "p2wpkh",
            ScriptType::P2shMultisig => "p2sh",
            ScriptType::P2wshMultisig => "p2wsh",
            ScriptType::P2shP2wshMultisig => "p2sh-p2wsh",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Account Paths
// =============================================================================

/// A whole-account derivation path for one coin and script type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPath {
    pub coin: String,
    pub purpose: u32,
    pub account_index: u32,
    pub script_type: ScriptType,
    /// `[purpose', slip44', account']`
    pub address_n: Vec<u32>,
}

/// Structured, human-readable description of a derivation path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDescription {
    pub verbose: String,
    pub coin: String,
    pub is_known: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_idx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_idx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_change: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whole_account: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_prefork: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_type: Option<ScriptType>,
}

impl PathDescription {
    /// Description for a path that is not a recognized account/address path
    pub fn unknown(verbose: String, coin: &str, script_type: Option<ScriptType>) -> Self {
        Self {
            verbose,
            coin: coin.to_string(),
            is_known: false,
            account_idx: None,
            address_idx: None,
            is_change: None,
            whole_account: None,
            is_prefork: None,
            script_type,
        }
    }
}

// =============================================================================
// Signing Requests
// =============================================================================

/// One input of an unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedInput {
    /// Derivation path of the key that owns the spent output
    pub address_n: Vec<u32>,
    pub script_type: ScriptType,
    /// Previous transaction id, hex in display (big-endian) order
    pub prev_tx_id: String,
    pub vout: u32,
    /// Value of the spent output in satoshis (required for segwit and fork-id inputs)
    #[serde(default)]
    pub amount: Option<u64>,
    /// Full previous transaction (required for legacy inputs)
    #[serde(default)]
    pub raw_prev_tx_hex: Option<String>,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// One output of an unsigned transaction
///
/// Exactly one of `address`, `address_n` or `op_return_data` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedOutput {
    pub amount: u64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_n: Option<Vec<u32>>,
    #[serde(default)]
    pub script_type: Option<ScriptType>,
    #[serde(default)]
    pub is_change: bool,
    /// Hex payload for an OP_RETURN output
    #[serde(default)]
    pub op_return_data: Option<String>,
}

impl UnsignedOutput {
    pub fn to_address(address: impl Into<String>, amount: u64) -> Self {
        Self {
            amount,
            address: Some(address.into()),
            ..Default::default()
        }
    }

    pub fn change(address_n: Vec<u32>, script_type: ScriptType, amount: u64) -> Self {
        Self {
            amount,
            address_n: Some(address_n),
            script_type: Some(script_type),
            is_change: true,
            ..Default::default()
        }
    }

    pub fn op_return(data: &[u8]) -> Self {
        Self {
            amount: 0,
            op_return_data: Some(hex::encode(data)),
            ..Default::default()
        }
    }
}

/// A structured signing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub coin: String,
    pub inputs: Vec<UnsignedInput>,
    pub outputs: Vec<UnsignedOutput>,
    #[serde(default)]
    pub version: Option<i32>,
    #[serde(default)]
    pub lock_time: Option<u32>,
}

/// Result of a successful signing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// DER signatures (without sighash byte), one per input in declaration order
    pub signatures: Vec<String>,
    pub serialized_tx: String,
    /// Transaction id in display order
    pub txid: String,
    pub fee: u64,
}
