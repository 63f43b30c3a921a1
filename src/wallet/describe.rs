//! Derivation path classification
//!
//! Decides whether an arbitrary `address_n` list is a recognized account or
//! address path for a coin and renders a human-readable description of it.
//! Malformed paths are described as unknown; only an unsupported coin is an
//! error.

use crate::coins::{CoinParams, CoinRegistry};
use crate::error::SignerResult;
use crate::types::{PathDescription, ScriptType};
use crate::wallet::derivation_path::{address_n_to_bip32, is_hardened, unharden};

/// Classifies derivation paths against a coin table
#[derive(Debug, Clone, Copy)]
pub struct PathClassifier<'a> {
    registry: &'a CoinRegistry,
}

impl<'a> PathClassifier<'a> {
    pub fn new(registry: &'a CoinRegistry) -> Self {
        Self { registry }
    }

    pub fn builtin() -> PathClassifier<'static> {
        PathClassifier::new(CoinRegistry::builtin())
    }

    /// Describe `path` for `coin`.
    ///
    /// When `script_type` is `None` it is inferred from the purpose
    /// component; the coin must still support the inferred type.
    pub fn describe_path(
        &self,
        path: &[u32],
        coin: &str,
        script_type: Option<ScriptType>,
    ) -> SignerResult<PathDescription> {
        let params = self.registry.require(coin)?;
        Ok(describe_with(params, path, script_type))
    }
}

/// Describe a path against the built-in coin table
pub fn describe_path(
    path: &[u32],
    coin: &str,
    script_type: Option<ScriptType>,
) -> SignerResult<PathDescription> {
    PathClassifier::builtin().describe_path(path, coin, script_type)
}

/// Account-level fields shared by whole-account and address paths
struct AccountInfo {
    script_type: ScriptType,
    account_idx: u32,
    is_prefork: bool,
}

fn describe_with(
    params: &CoinParams,
    path: &[u32],
    script_type: Option<ScriptType>,
) -> PathDescription {
    let unknown = || PathDescription::unknown(address_n_to_bip32(path), &params.name, script_type);

    if path.len() != 3 && path.len() != 5 {
        return unknown();
    }

    let account = match decode_account(params, &path[..3], script_type) {
        Some(account) => account,
        None => return unknown(),
    };

    let attributes = attribute_suffix(params, &account);
    let mut description = PathDescription {
        verbose: format!("{} Account #{}{}", params.name, account.account_idx, attributes),
        coin: params.name.clone(),
        is_known: true,
        account_idx: Some(account.account_idx),
        address_idx: None,
        is_change: None,
        whole_account: Some(true),
        is_prefork: Some(account.is_prefork),
        script_type: Some(account.script_type),
    };

    if path.len() == 3 {
        return description;
    }

    let (change, address_idx) = (path[3], path[4]);
    if change > 1 || is_hardened(address_idx) {
        return unknown();
    }

    let is_change = change == 1;
    description.verbose = format!(
        "{} Account #{}, {}Address #{}{}",
        params.name,
        account.account_idx,
        if is_change { "Change " } else { "" },
        address_idx,
        attributes
    );
    description.address_idx = Some(address_idx);
    description.is_change = Some(is_change);
    description.whole_account = Some(false);
    description
}

fn decode_account(
    params: &CoinParams,
    prefix: &[u32],
    script_type: Option<ScriptType>,
) -> Option<AccountInfo> {
    if !prefix.iter().all(|c| is_hardened(*c)) {
        return None;
    }

    let purpose = unharden(prefix[0]);
    let script_type = match script_type {
        Some(st) => st,
        None => ScriptType::from_purpose(purpose)?,
    };

    // Multisig types have no purpose constant and are never recognized here
    if script_type.purpose()? != purpose || !params.supports_script_type(script_type) {
        return None;
    }

    let slip44 = unharden(prefix[1]);
    let is_prefork = if slip44 == params.slip44 {
        false
    } else if params.is_prefork_slip44(slip44) {
        true
    } else {
        return None;
    };

    Some(AccountInfo {
        script_type,
        account_idx: unharden(prefix[2]),
        is_prefork,
    })
}

fn attribute_suffix(params: &CoinParams, account: &AccountInfo) -> String {
    let mut attributes = Vec::new();
    if account.is_prefork {
        attributes.push("Prefork");
    }
    if params.script_types.len() > 1 {
        if let Some(label) = account.script_type.label() {
            attributes.push(label);
        }
    }

    if attributes.is_empty() {
        String::new()
    } else {
        format!(" ({})", attributes.join(", "))
    }
}
