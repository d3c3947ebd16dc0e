//! Fungible reward token ledger.

use crate::access::AccessControl;
use crate::error::{VaultError, VaultResult};
use crate::transaction::{UndoLog, UndoRecord};
use crate::types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Balance accounting with a conserved total supply.
///
/// `total_supply` equals the sum of all balances after every successful call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    name: String,
    symbol: String,
    balances: BTreeMap<AccountId, Amount>,
    total_supply: Amount,
}

impl TokenLedger {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Accounts with a non-zero balance, in account order.
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, Amount)> {
        self.balances.iter().map(|(account, amount)| (account, *amount))
    }

    /// Recompute the supply from balances and compare.
    pub fn supply_is_conserved(&self) -> bool {
        let sum: u128 = self.balances.values().map(|v| u128::from(*v)).sum();
        sum == u128::from(self.total_supply)
    }

    /// Administrator mint.
    pub(crate) fn mint(
        &mut self,
        access: &AccessControl,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        access.require_administrator(caller, "mint tokens")?;
        self.credit(to, amount, undo)
    }

    /// Privileged mint used by the system itself (genesis supply, upvote rewards).
    pub(crate) fn credit(
        &mut self,
        to: &AccountId,
        amount: Amount,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        require_positive(amount, "mint")?;
        let balance = self.balance_of(to);
        let new_balance = balance
            .checked_add(amount)
            .ok_or_else(|| VaultError::Overflow(format!("balance of {to} would overflow")))?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| VaultError::Overflow("total supply would overflow".into()))?;

        self.set_balance(to, new_balance, undo);
        self.set_total_supply(new_supply, undo);
        debug!(account = %to, amount, supply = new_supply, "tokens minted");
        Ok(())
    }

    /// Burn from `from`. Self-burn needs no privilege; burning another
    /// account's tokens requires the administrator.
    pub(crate) fn burn(
        &mut self,
        access: &AccessControl,
        caller: &AccountId,
        from: &AccountId,
        amount: Amount,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        if caller != from {
            access.require_administrator(caller, &format!("burn tokens held by {from}"))?;
        }
        require_positive(amount, "burn")?;
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(VaultError::InsufficientBalance {
                account: from.clone(),
                available: balance,
                required: amount,
            });
        }
        let new_supply = self.total_supply.checked_sub(amount).ok_or_else(|| {
            VaultError::Integrity("total supply smaller than an account balance".into())
        })?;

        self.set_balance(from, balance - amount, undo);
        self.set_total_supply(new_supply, undo);
        debug!(account = %from, amount, supply = new_supply, "tokens burned");
        Ok(())
    }

    /// Move tokens from `caller` to `to`. Supply is unchanged.
    pub(crate) fn transfer(
        &mut self,
        caller: &AccountId,
        to: &AccountId,
        amount: Amount,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        require_positive(amount, "transfer")?;
        let from_balance = self.balance_of(caller);
        if from_balance < amount {
            return Err(VaultError::InsufficientBalance {
                account: caller.clone(),
                available: from_balance,
                required: amount,
            });
        }
        if caller == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| VaultError::Overflow(format!("balance of {to} would overflow")))?;

        self.set_balance(caller, from_balance - amount, undo);
        self.set_balance(to, to_balance, undo);
        debug!(from = %caller, to = %to, amount, "tokens transferred");
        Ok(())
    }

    fn set_balance(&mut self, account: &AccountId, value: Amount, undo: &mut UndoLog) {
        let previous = if value == 0 {
            self.balances.remove(account)
        } else {
            self.balances.insert(account.clone(), value)
        };
        undo.push(UndoRecord::Balance {
            account: account.clone(),
            previous,
        });
    }

    fn set_total_supply(&mut self, value: Amount, undo: &mut UndoLog) {
        let previous = std::mem::replace(&mut self.total_supply, value);
        undo.push(UndoRecord::TotalSupply { previous });
    }

    pub(crate) fn restore_balance(&mut self, account: AccountId, previous: Option<Amount>) {
        match previous {
            Some(value) => {
                self.balances.insert(account, value);
            }
            None => {
                self.balances.remove(&account);
            }
        }
    }

    pub(crate) fn restore_total_supply(&mut self, previous: Amount) {
        self.total_supply = previous;
    }
}

fn require_positive(amount: Amount, action: &str) -> VaultResult<()> {
    if amount == 0 {
        return Err(VaultError::InvalidInput(format!(
            "{action} amount must be positive"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (TokenLedger, AccessControl, UndoLog) {
        (
            TokenLedger::new("KnowledgeVaultToken", "KVT"),
            AccessControl::new(AccountId::new("admin")),
            UndoLog::default(),
        )
    }

    #[test]
    fn mint_requires_administrator() {
        let (mut token, access, mut undo) = setup();
        let user = AccountId::new("user");

        let err = token.mint(&access, &user, &user, 100, &mut undo).unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
        assert_eq!(token.total_supply(), 0);

        token
            .mint(&access, &AccountId::new("admin"), &user, 100, &mut undo)
            .unwrap();
        assert_eq!(token.balance_of(&user), 100);
        assert_eq!(token.total_supply(), 100);
    }

    #[test]
    fn zero_amounts_are_invalid() {
        let (mut token, access, mut undo) = setup();
        let admin = AccountId::new("admin");
        assert!(matches!(
            token.mint(&access, &admin, &admin, 0, &mut undo),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(matches!(
            token.burn(&access, &admin, &admin, 0, &mut undo),
            Err(VaultError::InvalidInput(_))
        ));
    }

    #[test]
    fn self_burn_needs_no_privilege() {
        let (mut token, access, mut undo) = setup();
        let user = AccountId::new("user");
        token.credit(&user, 100, &mut undo).unwrap();

        token.burn(&access, &user, &user, 50, &mut undo).unwrap();
        assert_eq!(token.balance_of(&user), 50);
        assert_eq!(token.total_supply(), 50);
    }

    #[test]
    fn burning_another_account_requires_administrator() {
        let (mut token, access, mut undo) = setup();
        let admin = AccountId::new("admin");
        let user = AccountId::new("user");
        token.credit(&admin, 100, &mut undo).unwrap();

        let err = token.burn(&access, &user, &admin, 100, &mut undo).unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));
        assert_eq!(token.balance_of(&admin), 100);
    }

    #[test]
    fn burn_beyond_balance_fails() {
        let (mut token, access, mut undo) = setup();
        let user = AccountId::new("user");
        token.credit(&user, 10, &mut undo).unwrap();

        let err = token.burn(&access, &user, &user, 11, &mut undo).unwrap_err();
        assert!(matches!(
            err,
            VaultError::InsufficientBalance {
                available: 10,
                required: 11,
                ..
            }
        ));
    }

    #[test]
    fn overflow_leaves_ledger_untouched() {
        let (mut token, _, mut undo) = setup();
        let user = AccountId::new("user");
        token.credit(&user, Amount::MAX, &mut undo).unwrap();
        let before = token.clone();

        let err = token.credit(&AccountId::new("other"), 1, &mut undo).unwrap_err();
        assert!(matches!(err, VaultError::Overflow(_)));
        assert_eq!(token, before);
    }

    #[test]
    fn transfer_moves_without_changing_supply() {
        let (mut token, _, mut undo) = setup();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        token.credit(&alice, 30, &mut undo).unwrap();

        token.transfer(&alice, &bob, 30, &mut undo).unwrap();
        assert_eq!(token.balance_of(&alice), 0);
        assert_eq!(token.balance_of(&bob), 30);
        assert_eq!(token.total_supply(), 30);
        assert!(token.supply_is_conserved());
        assert_eq!(token.holders().count(), 1);
    }
}
