//! Referenced (previous) transaction parsing

use bitcoin::consensus::encode::deserialize;

use crate::error::{SignerError, SignerResult};

/// The output an input spends, as read from its raw previous transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevOutput {
    /// Txid of the raw transaction, display order hex
    pub txid: String,
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// Parse `raw_hex` and extract output `vout`
pub fn spent_output(raw_hex: &str, vout: u32) -> SignerResult<PrevOutput> {
    let bytes = hex::decode(raw_hex.trim())?;
    let tx: bitcoin::Transaction = deserialize(&bytes)?;

    let output = tx.output.get(vout as usize).ok_or_else(|| {
        SignerError::invalid_input(format!(
            "Output index {} out of range, previous transaction has {} outputs",
            vout,
            tx.output.len()
        ))
    })?;

    Ok(PrevOutput {
        txid: tx.compute_txid().to_string(),
        value: output.value.to_sat(),
        script_pubkey: output.script_pubkey.to_bytes(),
    })
}
