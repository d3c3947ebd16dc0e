//! Per-account profile metadata and cumulative earnings.

use crate::error::{VaultError, VaultResult};
use crate::transaction::{UndoLog, UndoRecord};
use crate::types::{AccountId, Amount, Profile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStore {
    profiles: BTreeMap<AccountId, Profile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile for `account`, or the empty default. Never fails.
    pub fn get(&self, account: &AccountId) -> Profile {
        self.profiles.get(account).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub(crate) fn set_profile_uri(
        &mut self,
        caller: &AccountId,
        uri: &str,
        max_len: usize,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        if uri.chars().count() > max_len {
            return Err(VaultError::InvalidInput(format!(
                "profile URI exceeds {max_len} characters"
            )));
        }
        let mut profile = self.get(caller);
        profile.profile_uri = uri.to_string();
        self.store(caller, profile, undo);
        Ok(())
    }

    /// Reward path only.
    pub(crate) fn credit_earnings(
        &mut self,
        account: &AccountId,
        amount: Amount,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        let mut profile = self.get(account);
        profile.total_tokens_earned = profile
            .total_tokens_earned
            .checked_add(amount)
            .ok_or_else(|| VaultError::Overflow(format!("earnings of {account} would overflow")))?;
        self.store(account, profile, undo);
        Ok(())
    }

    fn store(&mut self, account: &AccountId, profile: Profile, undo: &mut UndoLog) {
        let previous = self.profiles.insert(account.clone(), profile);
        undo.push(UndoRecord::Profile {
            account: account.clone(),
            previous,
        });
    }

    pub(crate) fn restore_profile(&mut self, account: AccountId, previous: Option<Profile>) {
        match previous {
            Some(profile) => {
                self.profiles.insert(account, profile);
            }
            None => {
                self.profiles.remove(&account);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_profile_reads_as_default() {
        let store = ProfileStore::new();
        let profile = store.get(&AccountId::new("nobody"));
        assert_eq!(profile.profile_uri, "");
        assert_eq!(profile.total_tokens_earned, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn uri_update_keeps_earnings() {
        let mut store = ProfileStore::new();
        let mut undo = UndoLog::default();
        let user = AccountId::new("user");

        store.credit_earnings(&user, 10, &mut undo).unwrap();
        store
            .set_profile_uri(&user, "ipfs://profile", 2048, &mut undo)
            .unwrap();

        let profile = store.get(&user);
        assert_eq!(profile.profile_uri, "ipfs://profile");
        assert_eq!(profile.total_tokens_earned, 10);
    }

    #[test]
    fn oversized_uri_is_rejected() {
        let mut store = ProfileStore::new();
        let mut undo = UndoLog::default();
        let err = store
            .set_profile_uri(&AccountId::new("user"), "abcdef", 5, &mut undo)
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn earnings_overflow_is_rejected() {
        let mut store = ProfileStore::new();
        let mut undo = UndoLog::default();
        let user = AccountId::new("user");
        store.credit_earnings(&user, Amount::MAX, &mut undo).unwrap();
        let err = store.credit_earnings(&user, 1, &mut undo).unwrap_err();
        assert!(matches!(err, VaultError::Overflow(_)));
        assert_eq!(store.get(&user).total_tokens_earned, Amount::MAX);
    }
}
