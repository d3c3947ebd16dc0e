//! Administrator capability.

use crate::error::{VaultError, VaultResult};
use crate::transaction::{UndoLog, UndoRecord};
use crate::types::AccountId;
use serde::{Deserialize, Serialize};

/// Holds the single administrator capability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    administrator: AccountId,
}

impl AccessControl {
    pub fn new(administrator: AccountId) -> Self {
        Self { administrator }
    }

    pub fn administrator(&self) -> &AccountId {
        &self.administrator
    }

    pub fn is_administrator(&self, account: &AccountId) -> bool {
        self.administrator == *account
    }

    /// Fails with `Unauthorized` unless `caller` is the administrator.
    pub fn require_administrator(&self, caller: &AccountId, action: &str) -> VaultResult<()> {
        if self.is_administrator(caller) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized(format!(
                "{caller} may not {action}: administrator capability required"
            )))
        }
    }

    /// Hand the capability to `next`. Returns the previous holder.
    pub(crate) fn transfer(
        &mut self,
        caller: &AccountId,
        next: AccountId,
        undo: &mut UndoLog,
    ) -> VaultResult<AccountId> {
        self.require_administrator(caller, "transfer the administrator capability")?;
        if next.as_str().trim().is_empty() {
            return Err(VaultError::InvalidInput(
                "administrator account must not be empty".into(),
            ));
        }
        if next == self.administrator {
            return Err(VaultError::InvalidInput(format!(
                "{next} already holds the administrator capability"
            )));
        }
        let previous = std::mem::replace(&mut self.administrator, next);
        undo.push(UndoRecord::Administrator {
            previous: previous.clone(),
        });
        Ok(previous)
    }

    pub(crate) fn restore_administrator(&mut self, previous: AccountId) {
        self.administrator = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_designated_account_is_administrator() {
        let access = AccessControl::new(AccountId::new("admin"));
        assert!(access.is_administrator(&AccountId::new("admin")));
        assert!(!access.is_administrator(&AccountId::new("user")));
        assert!(matches!(
            access.require_administrator(&AccountId::new("user"), "approve"),
            Err(VaultError::Unauthorized(_))
        ));
    }

    #[test]
    fn transfer_requires_current_administrator() {
        let mut access = AccessControl::new(AccountId::new("admin"));
        let mut undo = UndoLog::default();

        let err = access
            .transfer(&AccountId::new("user"), AccountId::new("user"), &mut undo)
            .unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
        assert_eq!(undo.len(), 0);

        let previous = access
            .transfer(&AccountId::new("admin"), AccountId::new("curator"), &mut undo)
            .unwrap();
        assert_eq!(previous, AccountId::new("admin"));
        assert!(access.is_administrator(&AccountId::new("curator")));
        assert!(!access.is_administrator(&AccountId::new("admin")));
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let mut access = AccessControl::new(AccountId::new("admin"));
        let mut undo = UndoLog::default();
        let err = access
            .transfer(&AccountId::new("admin"), AccountId::new("admin"), &mut undo)
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
    }
}
