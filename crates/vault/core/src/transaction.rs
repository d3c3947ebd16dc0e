//! Unit of work spanning every component touched by one operation.
//!
//! Components never mutate without first recording how to restore the prior
//! value. A [`Transaction`] that is dropped without [`Transaction::commit`]
//! replays those records in reverse, so a failure at any step leaves the
//! ledger exactly as it was.

use crate::state::LedgerState;
use crate::types::{AccountId, Amount, Ballot, Certificate, Profile, Resource, ResourceId};
use tracing::debug;

/// Prior value of a single piece of component state.
#[derive(Clone, Debug)]
pub(crate) enum UndoRecord {
    Balance {
        account: AccountId,
        previous: Option<Amount>,
    },
    TotalSupply {
        previous: Amount,
    },
    Certificate {
        id: ResourceId,
        previous: Option<Certificate>,
    },
    Profile {
        account: AccountId,
        previous: Option<Profile>,
    },
    Resource {
        id: ResourceId,
        previous: Option<Resource>,
    },
    Ballot {
        resource: ResourceId,
        voter: AccountId,
        previous: Option<Ballot>,
    },
    NextResourceId {
        previous: ResourceId,
    },
    Administrator {
        previous: AccountId,
    },
}

/// Ordered undo records for the running operation.
#[derive(Debug, Default)]
pub(crate) struct UndoLog {
    records: Vec<UndoRecord>,
}

impl UndoLog {
    pub(crate) fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    fn rollback(&mut self, state: &mut LedgerState) {
        while let Some(record) = self.records.pop() {
            match record {
                UndoRecord::Balance { account, previous } => {
                    state.token.restore_balance(account, previous)
                }
                UndoRecord::TotalSupply { previous } => state.token.restore_total_supply(previous),
                UndoRecord::Certificate { id, previous } => {
                    state.ownership.restore_certificate(id, previous)
                }
                UndoRecord::Profile { account, previous } => {
                    state.profiles.restore_profile(account, previous)
                }
                UndoRecord::Resource { id, previous } => {
                    state.registry.restore_resource(id, previous)
                }
                UndoRecord::Ballot {
                    resource,
                    voter,
                    previous,
                } => state.registry.restore_ballot(resource, voter, previous),
                UndoRecord::NextResourceId { previous } => {
                    state.registry.restore_next_id(previous)
                }
                UndoRecord::Administrator { previous } => {
                    state.access.restore_administrator(previous)
                }
            }
        }
    }
}

/// Exclusive, all-or-nothing view over the ledger state.
pub(crate) struct Transaction<'a> {
    pub(crate) state: &'a mut LedgerState,
    pub(crate) undo: UndoLog,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(state: &'a mut LedgerState) -> Self {
        Self {
            state,
            undo: UndoLog::default(),
            committed: false,
        }
    }

    /// Current (uncommitted) state.
    pub fn state(&self) -> &LedgerState {
        &*self.state
    }

    /// Keep every mutation made so far.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let pending = self.undo.len();
            if pending > 0 {
                debug!(records = pending, "rolling back transaction");
            }
            self.undo.rollback(&mut *self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;

    fn state() -> LedgerState {
        LedgerState::genesis(&VaultConfig::for_administrator("admin")).unwrap()
    }

    #[test]
    fn dropped_transaction_restores_state() {
        let mut state = state();
        let before = state.clone();
        {
            let mut tx = Transaction::begin(&mut state);
            tx.state
                .token
                .credit(&AccountId::new("bob"), 50, &mut tx.undo)
                .unwrap();
            tx.state
                .profiles
                .credit_earnings(&AccountId::new("bob"), 50, &mut tx.undo)
                .unwrap();
            assert_eq!(tx.state().token.balance_of(&AccountId::new("bob")), 50);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn committed_transaction_keeps_state() {
        let mut state = state();
        let mut tx = Transaction::begin(&mut state);
        tx.state
            .token
            .credit(&AccountId::new("bob"), 50, &mut tx.undo)
            .unwrap();
        tx.commit();
        assert_eq!(state.token.balance_of(&AccountId::new("bob")), 50);
        assert_eq!(state.token.total_supply(), 50);
    }
}
