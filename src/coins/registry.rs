use serde::{Deserialize, Serialize};

use crate::error::{SignerError, SignerResult};
use crate::signing::sighash::{SIGHASH_ALL, SIGHASH_FORKID};
use crate::types::ScriptType;
use crate::log_debug;

/// Network parameters for one coin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinParams {
    pub name: String,
    /// SLIP-0044 coin type
    pub slip44: u32,
    /// Base58 version byte for P2PKH addresses
    pub pub_key_hash: u8,
    /// Base58 version byte for P2SH addresses
    pub script_hash: u8,
    #[serde(default)]
    pub bech32_prefix: Option<String>,
    #[serde(default)]
    pub cashaddr_prefix: Option<String>,
    /// Replay-protection fork id; `Some` selects fork-id sighash for every input
    #[serde(default)]
    pub fork_id: Option<u32>,
    /// Supported script types, in account display order
    pub script_types: Vec<ScriptType>,
    /// slip44 values of ancestor chains whose paths this coin still recognizes
    #[serde(default)]
    pub prefork_slip44: Vec<u32>,
}

impl CoinParams {
    pub fn uses_fork_id_sighash(&self) -> bool {
        self.fork_id.is_some()
    }

    pub fn supports_script_type(&self, script_type: ScriptType) -> bool {
        self.script_types.contains(&script_type)
    }

    pub fn supports_segwit(&self) -> bool {
        self.script_types.iter().any(|st| st.is_segwit())
    }

    pub fn is_prefork_slip44(&self, slip44: u32) -> bool {
        self.prefork_slip44.contains(&slip44)
    }

    /// 32-bit sighash type committed to by every signature on this coin
    pub fn sighash_type(&self) -> u32 {
        match self.fork_id {
            Some(fork_id) => SIGHASH_ALL | SIGHASH_FORKID | (fork_id << 8),
            None => SIGHASH_ALL,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn coin(
    name: &str,
    slip44: u32,
    pub_key_hash: u8,
    script_hash: u8,
    bech32_prefix: Option<&str>,
    cashaddr_prefix: Option<&str>,
    fork_id: Option<u32>,
    script_types: &[ScriptType],
    prefork_slip44: &[u32],
) -> CoinParams {
    CoinParams {
        name: name.to_string(),
        slip44,
        pub_key_hash,
        script_hash,
        bech32_prefix: bech32_prefix.map(str::to_string),
        cashaddr_prefix: cashaddr_prefix.map(str::to_string),
        fork_id,
        script_types: script_types.to_vec(),
        prefork_slip44: prefork_slip44.to_vec(),
    }
}

fn builtin_coins() -> Vec<CoinParams> {
    use ScriptType::*;

    let segwit = [P2pkh, P2shP2wpkh, P2wpkh];
    let legacy = [P2pkh];

    vec![
        coin("Bitcoin", 0, 0x00, 0x05, Some("bc"), None, None, &segwit, &[]),
        coin("Testnet", 1, 0x6f, 0xc4, Some("tb"), None, None, &segwit, &[]),
        coin("BitcoinCash", 145, 0x00, 0x05, None, Some("bitcoincash"), Some(0), &legacy, &[0]),
        coin("BitcoinSV", 236, 0x00, 0x05, None, None, Some(0), &legacy, &[0, 145]),
        coin("BitcoinGold", 156, 0x26, 0x17, Some("btg"), None, Some(79), &segwit, &[0]),
        coin("Litecoin", 2, 0x30, 0x32, Some("ltc"), None, None, &segwit, &[]),
        coin("Dogecoin", 3, 0x1e, 0x16, None, None, None, &legacy, &[]),
        coin("Dash", 5, 0x4c, 0x10, None, None, None, &legacy, &[]),
        coin("DigiByte", 20, 0x1e, 0x3f, Some("dgb"), None, None, &segwit, &[]),
    ]
}

lazy_static::lazy_static! {
    static ref BUILTIN: CoinRegistry = CoinRegistry::new(builtin_coins());
}

/// Read-only table of supported coins
#[derive(Debug, Clone)]
pub struct CoinRegistry {
    coins: Vec<CoinParams>,
}

impl CoinRegistry {
    pub fn new(coins: Vec<CoinParams>) -> Self {
        Self { coins }
    }

    /// The built-in table, loaded once per process
    pub fn builtin() -> &'static CoinRegistry {
        &BUILTIN
    }

    /// Built-in table extended with rows from a JSON array of `CoinParams`.
    /// A row whose name matches a built-in coin replaces it.
    pub fn from_json(json: &str) -> SignerResult<Self> {
        let extra: Vec<CoinParams> = serde_json::from_str(json)?;
        let mut registry = Self::builtin().clone();
        for params in extra {
            registry.insert(params)?;
        }
        Ok(registry)
    }

    /// Add or replace a coin row
    pub fn insert(&mut self, params: CoinParams) -> SignerResult<()> {
        if params.name.trim().is_empty() {
            return Err(SignerError::invalid_input("Coin name must not be empty"));
        }
        if params.script_types.is_empty() {
            return Err(SignerError::invalid_input(format!(
                "Coin {} declares no script types",
                params.name
            )));
        }
        log_debug!("coins", "Registering coin", coin = params.name, slip44 = params.slip44);
        match self.position(&params.name) {
            Some(idx) => self.coins[idx] = params,
            None => self.coins.push(params),
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.coins.iter().position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive lookup by coin name
    pub fn get(&self, name: &str) -> Option<&CoinParams> {
        self.position(name).map(|idx| &self.coins[idx])
    }

    pub fn require(&self, name: &str) -> SignerResult<&CoinParams> {
        self.get(name).ok_or_else(|| SignerError::unsupported_coin(name))
    }

    pub fn by_slip44(&self, slip44: u32) -> Option<&CoinParams> {
        self.coins.iter().find(|c| c.slip44 == slip44)
    }

    pub fn coins(&self) -> impl Iterator<Item = &CoinParams> {
        self.coins.iter()
    }
}
