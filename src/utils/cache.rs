//! Request-Scoped Public Key Cache
//!
//! Holds compressed public keys fetched from the oracle during one signing
//! request. The caller owns it and decides its lifetime; the engine keeps no
//! cache of its own between requests.

use std::collections::HashMap;

/// Compressed public keys keyed by derivation path
#[derive(Debug, Default, Clone)]
pub struct KeyCache {
    data: HashMap<Vec<u32>, [u8; 33]>,
    hits: usize,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, address_n: &[u32]) -> Option<[u8; 33]> {
        let found = self.data.get(address_n).copied();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    pub fn set(&mut self, address_n: &[u32], pubkey: [u8; 33]) {
        self.data.insert(address_n.to_vec(), pubkey);
    }

    pub fn invalidate(&mut self, address_n: &[u32]) {
        self.data.remove(address_n);
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.hits = 0;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of lookups served without an oracle round-trip
    pub fn hits(&self) -> usize {
        self.hits
    }
}
