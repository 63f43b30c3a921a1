//! Wire-format transaction model
//!
//! A small owned representation of a transaction being signed. The sighash
//! engine serializes it with substituted input scripts; the assembler fills
//! in scriptSigs and witnesses and serializes the result.

use crate::utils::{reversed, sha256d};

/// Bitcoin CompactSize integer
pub fn write_var_int(value: u64, buf: &mut Vec<u8>) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

/// Length-prefixed byte string
pub fn write_var_bytes(data: &[u8], buf: &mut Vec<u8>) {
    write_var_int(data.len() as u64, buf);
    buf.extend_from_slice(data);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    /// Previous txid in wire (little-endian) order
    pub prev_txid: [u8; 32],
    pub vout: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    pub fn new(prev_txid: [u8; 32], vout: u32, sequence: u32) -> Self {
        Self {
            prev_txid,
            vout,
            script_sig: Vec::new(),
            sequence,
            witness: Vec::new(),
        }
    }

    /// 36-byte outpoint serialization
    pub fn write_outpoint(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.prev_txid);
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(&self.script_pubkey, buf);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Serialization without witness data, with input `i`'s scriptSig
    /// replaced by `script_sigs(i)`
    pub fn serialize_with_scripts<F>(&self, script_sigs: F) -> Vec<u8>
    where
        F: Fn(usize, &TxIn) -> Vec<u8>,
    {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        self.write_body(&mut buf, script_sigs);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Serialization without witness data (the txid preimage)
    pub fn serialize_legacy(&self) -> Vec<u8> {
        self.serialize_with_scripts(|_, input| input.script_sig.clone())
    }

    /// Full network serialization; BIP144 marker and flag when any input
    /// carries a witness
    pub fn serialize(&self) -> Vec<u8> {
        if !self.has_witness() {
            return self.serialize_legacy();
        }

        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(0x00); // marker
        buf.push(0x01); // flag
        self.write_body(&mut buf, |_, input| input.script_sig.clone());

        for input in &self.inputs {
            write_var_int(input.witness.len() as u64, &mut buf);
            for item in &input.witness {
                write_var_bytes(item, &mut buf);
            }
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Transaction id in display order
    pub fn txid(&self) -> [u8; 32] {
        reversed(sha256d(&self.serialize_legacy()))
    }

    fn write_body<F>(&self, buf: &mut Vec<u8>, script_sigs: F)
    where
        F: Fn(usize, &TxIn) -> Vec<u8>,
    {
        write_var_int(self.inputs.len() as u64, buf);
        for (i, input) in self.inputs.iter().enumerate() {
            input.write_outpoint(buf);
            write_var_bytes(&script_sigs(i, input), buf);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_var_int(self.outputs.len() as u64, buf);
        for output in &self.outputs {
            output.write(buf);
        }
    }
}
