//! Signing Configuration
//!
//! Per-deployment knobs for the assembler: which hash the oracle expects,
//! how long to wait for it, and which self-checks run before a signature
//! is accepted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::SignerResult;
use crate::signing::oracle::HashAlgorithm;

/// What the engine hands the oracle for each input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadHashing {
    /// Full double SHA-256 digest; oracle signs it as-is
    Digest,
    /// Single SHA-256; oracle applies the final round itself
    SingleSha256,
}

impl PayloadHashing {
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            PayloadHashing::Digest => HashAlgorithm::None,
            PayloadHashing::SingleSha256 => HashAlgorithm::Sha256,
        }
    }
}

impl Default for PayloadHashing {
    fn default() -> Self {
        PayloadHashing::Digest
    }
}

/// Signing engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub payload_hashing: PayloadHashing,
    /// Per-coin overrides of `payload_hashing`, keyed by coin name
    pub coin_payload_hashing: HashMap<String, PayloadHashing>,
    /// Timeout for a single oracle call
    pub oracle_timeout_ms: Option<u64>,
    /// Check every oracle signature against the sighash before accepting it
    pub verify_signatures: bool,
    /// Check that a legacy input's raw previous transaction hashes to its txid
    pub verify_prev_tx_hash: bool,
    pub default_sequence: u32,
    pub default_version: i32,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            payload_hashing: PayloadHashing::Digest,
            coin_payload_hashing: HashMap::new(),
            oracle_timeout_ms: None,
            verify_signatures: true,
            verify_prev_tx_hash: true,
            default_sequence: 0xffff_ffff,
            default_version: 1,
        }
    }
}

impl SigningConfig {
    pub fn from_json(json: &str) -> SignerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Oracle payload contract for a coin
    pub fn payload_hashing_for(&self, coin: &str) -> PayloadHashing {
        self.coin_payload_hashing
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(coin))
            .map(|(_, hashing)| *hashing)
            .unwrap_or(self.payload_hashing)
    }

    pub fn oracle_timeout(&self) -> Option<Duration> {
        self.oracle_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_payload_hashing(mut self, hashing: PayloadHashing) -> Self {
        self.payload_hashing = hashing;
        self
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn without_prev_tx_hash_check(mut self) -> Self {
        self.verify_prev_tx_hash = false;
        self
    }
}
