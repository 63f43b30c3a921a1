//! Signature Pre-Image Construction
//!
//! Builds the exact bytes each input signs:
//! - Legacy: whole-transaction serialization with the spent script
//!   substituted into the signing input
//! - BIP-143: the segwit v0 digest layout, committing to the spent amount
//! - Fork-id: BIP-143 layout with the replay-protection hash type, used by
//!   fork-id coins for every input
//!
//! The BIP-143 intermediate hashes are computed once when the engine is
//! built and belong to that one transaction only.

use crate::coins::CoinParams;
use crate::error::{ErrorCode, SignerError};
use crate::tx::script::strip_code_separators;
use crate::tx::{Transaction, TxIn};
use crate::types::ScriptType;
use crate::utils::sha256d;

/// Sign all inputs and all outputs
pub const SIGHASH_ALL: u32 = 0x01;
/// Replay-protection flag for fork-id chains
pub const SIGHASH_FORKID: u32 = 0x40;

/// Error types for pre-image construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreimageError {
    #[error("Invalid input index: {0}")]
    InvalidInputIndex(usize),

    #[error("Input {0} needs the spent amount")]
    MissingAmount(usize),

    #[error("Malformed script: {0}")]
    MalformedScript(String),
}

impl From<PreimageError> for SignerError {
    fn from(e: PreimageError) -> Self {
        let code = match e {
            PreimageError::InvalidInputIndex(_) => ErrorCode::Internal,
            PreimageError::MissingAmount(_) => ErrorCode::MissingRequiredField,
            PreimageError::MalformedScript(_) => ErrorCode::InvalidTransaction,
        };
        SignerError::new(code, e.to_string())
    }
}

pub type PreimageResult<T> = Result<T, PreimageError>;

/// Serialization strategy for one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashKind {
    Legacy,
    WitnessV0,
    ForkId,
}

impl SighashKind {
    /// Fork-id coins use the fork-id layout for every input, witness or not
    pub fn select(coin: &CoinParams, script_type: ScriptType) -> Self {
        if coin.uses_fork_id_sighash() {
            SighashKind::ForkId
        } else if script_type.is_segwit() {
            SighashKind::WitnessV0
        } else {
            SighashKind::Legacy
        }
    }

    pub fn commits_to_amount(&self) -> bool {
        !matches!(self, SighashKind::Legacy)
    }
}

/// What the signing input spends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpentOutput {
    pub kind: SighashKind,
    /// Previous scriptPubKey (legacy) or BIP-143 scriptCode (P2PKH template)
    pub script_code: Vec<u8>,
    pub amount: Option<u64>,
}

/// Pre-image builder for one unsigned transaction
#[derive(Debug, Clone)]
pub struct SighashEngine {
    tx: Transaction,
    sighash_type: u32,
    hash_prevouts: [u8; 32],
    hash_sequence: [u8; 32],
    hash_outputs: [u8; 32],
}

impl SighashEngine {
    /// `tx` is the unsigned transaction; input scripts and witnesses are ignored
    pub fn new(tx: Transaction, sighash_type: u32) -> Self {
        let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
        for input in &tx.inputs {
            input.write_outpoint(&mut prevouts);
            sequences.extend_from_slice(&input.sequence.to_le_bytes());
        }

        let mut outputs = Vec::new();
        for output in &tx.outputs {
            output.write(&mut outputs);
        }

        Self {
            hash_prevouts: sha256d(&prevouts),
            hash_sequence: sha256d(&sequences),
            hash_outputs: sha256d(&outputs),
            tx,
            sighash_type,
        }
    }

    pub fn sighash_type(&self) -> u32 {
        self.sighash_type
    }

    pub fn hash_prevouts(&self) -> [u8; 32] {
        self.hash_prevouts
    }

    pub fn hash_sequence(&self) -> [u8; 32] {
        self.hash_sequence
    }

    pub fn hash_outputs(&self) -> [u8; 32] {
        self.hash_outputs
    }

    /// Pre-image bytes for input `index`
    pub fn preimage(&self, index: usize, spent: &SpentOutput) -> PreimageResult<Vec<u8>> {
        match spent.kind {
            SighashKind::Legacy => self.legacy_preimage(index, &spent.script_code),
            SighashKind::WitnessV0 | SighashKind::ForkId => {
                let amount = spent.amount.ok_or(PreimageError::MissingAmount(index))?;
                self.bip143_preimage(index, &spent.script_code, amount)
            }
        }
    }

    /// Double SHA-256 of the pre-image
    pub fn sighash(&self, index: usize, spent: &SpentOutput) -> PreimageResult<[u8; 32]> {
        Ok(sha256d(&self.preimage(index, spent)?))
    }

    fn input(&self, index: usize) -> PreimageResult<&TxIn> {
        self.tx
            .inputs
            .get(index)
            .ok_or(PreimageError::InvalidInputIndex(index))
    }

    fn legacy_preimage(&self, index: usize, prev_script: &[u8]) -> PreimageResult<Vec<u8>> {
        self.input(index)?;
        let script_code = strip_code_separators(prev_script)
            .map_err(|e| PreimageError::MalformedScript(e.message))?;

        let mut serialized = self.tx.serialize_with_scripts(|i, _| {
            if i == index {
                script_code.clone()
            } else {
                Vec::new()
            }
        });
        serialized.extend_from_slice(&self.sighash_type.to_le_bytes());
        Ok(serialized)
    }

    fn bip143_preimage(&self, index: usize, script_code: &[u8], amount: u64) -> PreimageResult<Vec<u8>> {
        let input = self.input(index)?;

        let mut serialized = Vec::with_capacity(160 + script_code.len());
        serialized.extend_from_slice(&self.tx.version.to_le_bytes());
        serialized.extend_from_slice(&self.hash_prevouts);
        serialized.extend_from_slice(&self.hash_sequence);
        input.write_outpoint(&mut serialized);
        crate::tx::write_var_bytes(script_code, &mut serialized);
        serialized.extend_from_slice(&amount.to_le_bytes());
        serialized.extend_from_slice(&input.sequence.to_le_bytes());
        serialized.extend_from_slice(&self.hash_outputs);
        serialized.extend_from_slice(&self.tx.lock_time.to_le_bytes());
        serialized.extend_from_slice(&self.sighash_type.to_le_bytes());
        Ok(serialized)
    }
}
