use crate::access::AccessControl;
use crate::config::VaultConfig;
use crate::error::VaultResult;
use crate::ownership::OwnershipRegistry;
use crate::profile::ProfileStore;
use crate::registry::ResourceRegistry;
use crate::token::TokenLedger;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Every component's committed state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub access: AccessControl,
    pub token: TokenLedger,
    pub ownership: OwnershipRegistry,
    pub profiles: ProfileStore,
    pub registry: ResourceRegistry,
}

impl LedgerState {
    /// Fresh state: the configured administrator holds the initial supply.
    pub fn genesis(config: &VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        let mut state = Self {
            access: AccessControl::new(config.administrator.clone()),
            token: TokenLedger::new(&config.token.name, &config.token.symbol),
            ownership: OwnershipRegistry::new(),
            profiles: ProfileStore::new(),
            registry: ResourceRegistry::new(),
        };

        if config.token.initial_supply > 0 {
            let mut tx = Transaction::begin(&mut state);
            tx.state
                .token
                .credit(&config.administrator, config.token.initial_supply, &mut tx.undo)?;
            tx.commit();
        }
        Ok(state)
    }

    /// blake3 over the canonical JSON encoding. Map-backed components keep
    /// their keys ordered, so equal states always hash equally.
    pub fn digest(&self) -> VaultResult<String> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}
