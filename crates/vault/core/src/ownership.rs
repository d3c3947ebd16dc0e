//! Ownership certificates, one per resource.

use crate::error::{VaultError, VaultResult};
use crate::transaction::{UndoLog, UndoRecord};
use crate::types::{AccountId, Certificate, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRegistry {
    certificates: BTreeMap<ResourceId, Certificate>,
}

impl OwnershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mint(
        &mut self,
        id: ResourceId,
        holder: &AccountId,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        if self.certificates.contains_key(&id) {
            return Err(VaultError::AlreadyExists(format!("certificate {id}")));
        }
        self.certificates.insert(
            id,
            Certificate {
                id,
                holder: holder.clone(),
                minted_to: holder.clone(),
            },
        );
        undo.push(UndoRecord::Certificate { id, previous: None });
        Ok(())
    }

    pub fn holder_of(&self, id: ResourceId) -> VaultResult<&AccountId> {
        self.certificate(id).map(|c| &c.holder)
    }

    pub fn certificate(&self, id: ResourceId) -> VaultResult<&Certificate> {
        self.certificates
            .get(&id)
            .ok_or_else(|| VaultError::certificate_not_found(id))
    }

    /// Number of certificates currently held by `account`.
    pub fn certificates_held(&self, account: &AccountId) -> usize {
        self.certificates
            .values()
            .filter(|c| c.holder == *account)
            .count()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Hand a certificate to `to`. Only the current holder may do this.
    pub(crate) fn transfer(
        &mut self,
        caller: &AccountId,
        id: ResourceId,
        to: &AccountId,
        undo: &mut UndoLog,
    ) -> VaultResult<AccountId> {
        if to.as_str().trim().is_empty() {
            return Err(VaultError::InvalidInput("recipient must not be empty".into()));
        }
        let certificate = self
            .certificates
            .get_mut(&id)
            .ok_or_else(|| VaultError::certificate_not_found(id))?;
        if certificate.holder != *caller {
            return Err(VaultError::Unauthorized(format!(
                "{caller} does not hold certificate {id}"
            )));
        }
        let previous = certificate.clone();
        certificate.holder = to.clone();
        undo.push(UndoRecord::Certificate {
            id,
            previous: Some(previous.clone()),
        });
        Ok(previous.holder)
    }

    pub(crate) fn restore_certificate(&mut self, id: ResourceId, previous: Option<Certificate>) {
        match previous {
            Some(certificate) => {
                self.certificates.insert(id, certificate);
            }
            None => {
                self.certificates.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_rejects_reused_identifier() {
        let mut registry = OwnershipRegistry::new();
        let mut undo = UndoLog::default();
        let alice = AccountId::new("alice");

        registry.mint(ResourceId(1), &alice, &mut undo).unwrap();
        let err = registry
            .mint(ResourceId(1), &AccountId::new("bob"), &mut undo)
            .unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists(_)));
        assert_eq!(registry.holder_of(ResourceId(1)).unwrap(), &alice);
    }

    #[test]
    fn unminted_certificate_is_not_found() {
        let registry = OwnershipRegistry::new();
        assert!(matches!(
            registry.holder_of(ResourceId(7)),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn only_holder_may_transfer() {
        let mut registry = OwnershipRegistry::new();
        let mut undo = UndoLog::default();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        registry.mint(ResourceId(1), &alice, &mut undo).unwrap();

        let err = registry
            .transfer(&bob, ResourceId(1), &bob, &mut undo)
            .unwrap_err();
        assert!(matches!(err, VaultError::Unauthorized(_)));

        registry
            .transfer(&alice, ResourceId(1), &bob, &mut undo)
            .unwrap();
        let certificate = registry.certificate(ResourceId(1)).unwrap();
        assert_eq!(certificate.holder, bob);
        assert_eq!(certificate.minted_to, alice);
        assert_eq!(registry.certificates_held(&bob), 1);
        assert_eq!(registry.certificates_held(&alice), 0);
    }
}
