//! Script builders and a minimal opcode walker

use crate::error::{SignerError, SignerResult};
use crate::types::ScriptType;
use crate::utils::hash160;

pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CODESEPARATOR: u8 = 0xab;
    pub const OP_CHECKSIG: u8 = 0xac;
}

use opcodes::*;

/// Maximum OP_RETURN payload relayed by standard nodes
pub const MAX_OP_RETURN_DATA: usize = 80;

/// Append a minimal push of `data`
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(OP_PUSHDATA1);
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(OP_PUSHDATA2);
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(OP_PUSHDATA4);
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }
    script.extend_from_slice(data);
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh(pubkey_hash: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160];
    push_data(&mut script, pubkey_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh(script_hash: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_HASH160];
    push_data(&mut script, script_hash);
    script.push(OP_EQUAL);
    script
}

/// `OP_0 <program>`, for both 20-byte and 32-byte programs
pub fn witness_v0(program: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_0];
    push_data(&mut script, program);
    script
}

pub fn op_return(data: &[u8]) -> SignerResult<Vec<u8>> {
    if data.len() > MAX_OP_RETURN_DATA {
        return Err(SignerError::invalid_input(format!(
            "OP_RETURN data is {} bytes, maximum is {}",
            data.len(),
            MAX_OP_RETURN_DATA
        )));
    }
    let mut script = vec![OP_RETURN];
    push_data(&mut script, data);
    Ok(script)
}

/// scriptPubKey paying to a single key under `script_type`
pub fn script_pubkey_for_key(pubkey_hash: &[u8; 20], script_type: ScriptType) -> SignerResult<Vec<u8>> {
    match script_type {
        ScriptType::P2pkh => Ok(p2pkh(pubkey_hash)),
        ScriptType::P2shP2wpkh => Ok(p2sh(&hash160(&witness_v0(pubkey_hash)))),
        ScriptType::P2wpkh => Ok(witness_v0(pubkey_hash)),
        other => Err(SignerError::unsupported_script_type(format!(
            "{} is not a single-key script type",
            other
        ))),
    }
}

/// Copy of `script` with every OP_CODESEPARATOR removed.
///
/// Walks opcodes so that 0xab bytes inside push data are left alone.
pub fn strip_code_separators(script: &[u8]) -> SignerResult<Vec<u8>> {
    let mut out = Vec::with_capacity(script.len());
    let mut pos = 0;

    while pos < script.len() {
        let opcode = script[pos];
        let (header, data_len) = match opcode {
            0x01..=0x4b => (1, opcode as usize),
            OP_PUSHDATA1 => (2, read_len(script, pos + 1, 1)?),
            OP_PUSHDATA2 => (3, read_len(script, pos + 1, 2)?),
            OP_PUSHDATA4 => (5, read_len(script, pos + 1, 4)?),
            _ => (1, 0),
        };

        let end = pos
            .checked_add(header + data_len)
            .filter(|end| *end <= script.len())
            .ok_or_else(|| SignerError::invalid_transaction("Script push runs past end of script"))?;

        if opcode != OP_CODESEPARATOR {
            out.extend_from_slice(&script[pos..end]);
        }
        pos = end;
    }

    Ok(out)
}

fn read_len(script: &[u8], start: usize, width: usize) -> SignerResult<usize> {
    let bytes = script
        .get(start..start + width)
        .ok_or_else(|| SignerError::invalid_transaction("Truncated push length in script"))?;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(bytes);
    Ok(u32::from_le_bytes(buf) as usize)
}
