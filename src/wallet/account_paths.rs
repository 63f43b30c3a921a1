//! Account path planning
//!
//! Enumerates the whole-account paths (`purpose'/slip44'/account'`) a coin
//! supports and steps from one account to the next.

use crate::coins::CoinRegistry;
use crate::error::{SignerError, SignerResult};
use crate::types::{AccountPath, ScriptType};
use crate::wallet::derivation_path::{harden, unharden, HARDENED};
use crate::wallet::describe::PathClassifier;

#[derive(Debug, Clone, Copy)]
pub struct AccountPathPlanner<'a> {
    registry: &'a CoinRegistry,
}

impl<'a> AccountPathPlanner<'a> {
    pub fn new(registry: &'a CoinRegistry) -> Self {
        Self { registry }
    }

    pub fn builtin() -> AccountPathPlanner<'static> {
        AccountPathPlanner::new(CoinRegistry::builtin())
    }

    /// One path per supported script type, in the coin's display order
    /// (legacy, wrapped segwit, native segwit). `filter` restricts the
    /// result to a single script type; an unsupported one yields an empty list.
    pub fn account_paths(
        &self,
        coin: &str,
        account_index: u32,
        filter: Option<ScriptType>,
    ) -> SignerResult<Vec<AccountPath>> {
        let params = self.registry.require(coin)?;
        if account_index >= HARDENED {
            return Err(SignerError::invalid_input(format!(
                "Account index {} out of range",
                account_index
            )));
        }

        let paths = params
            .script_types
            .iter()
            .filter(|st| filter.map_or(true, |wanted| **st == wanted))
            .filter_map(|st| {
                let purpose = st.purpose()?;
                Some(AccountPath {
                    coin: params.name.clone(),
                    purpose,
                    account_index,
                    script_type: *st,
                    address_n: vec![harden(purpose), harden(params.slip44), harden(account_index)],
                })
            })
            .collect();

        Ok(paths)
    }

    /// The same account path with the account index advanced by one.
    ///
    /// Returns `None` unless `path` is a recognized whole-account path for
    /// its own coin and script type, or when the index would overflow.
    pub fn next_account_path(&self, path: &AccountPath) -> Option<AccountPath> {
        let classifier = PathClassifier::new(self.registry);
        let current = classifier
            .describe_path(&path.address_n, &path.coin, Some(path.script_type))
            .ok()?;
        if !current.is_known || current.whole_account != Some(true) {
            return None;
        }

        let next_index = unharden(path.address_n[2]).checked_add(1)?;
        if next_index >= HARDENED {
            return None;
        }

        let mut address_n = path.address_n.clone();
        address_n[2] = harden(next_index);

        let next = classifier
            .describe_path(&address_n, &path.coin, Some(path.script_type))
            .ok()?;
        if !next.is_known {
            return None;
        }

        Some(AccountPath {
            coin: path.coin.clone(),
            purpose: path.purpose,
            account_index: next_index,
            script_type: path.script_type,
            address_n,
        })
    }
}

pub fn account_paths(
    coin: &str,
    account_index: u32,
    filter: Option<ScriptType>,
) -> SignerResult<Vec<AccountPath>> {
    AccountPathPlanner::builtin().account_paths(coin, account_index, filter)
}

pub fn next_account_path(path: &AccountPath) -> Option<AccountPath> {
    AccountPathPlanner::builtin().next_account_path(path)
}

/// Whether the given paths all belong to one signing account.
///
/// Only a single path qualifies: one signing session commits to exactly one
/// script type, so fan-in across script types is rejected.
pub fn is_same_account(paths: &[AccountPath]) -> bool {
    paths.len() == 1
}
