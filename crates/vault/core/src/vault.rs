use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::journal::{Journal, JournalEntry, VaultEvent};
use crate::operation::{Operation, OperationRequest, Receipt};
use crate::state::LedgerState;
use crate::storage::{JournalView, SnapshotRef, StateStore, StorageConfig, SNAPSHOT_FORMAT_VERSION};
use crate::transaction::Transaction;
use crate::types::{
    AccountId, Amount, Ballot, Category, Certificate, Profile, Resource, ResourceDraft,
    ResourceId, VoteDirection,
};
use tracing::{debug, info, warn};

/// The composition root.
///
/// Every mutating call takes `&mut self`, runs inside one [`Transaction`],
/// appends exactly one journal entry and persists a snapshot before it
/// commits. Any failure on that path restores all components.
pub struct Vault {
    state: LedgerState,
    journal: Journal,
    store: Box<dyn StateStore>,
    config: VaultConfig,
}

impl Vault {
    /// In-memory vault.
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        Self::open(config, StorageConfig::Memory.open())
    }

    pub fn with_storage(config: VaultConfig, storage: StorageConfig) -> VaultResult<Self> {
        Self::open(config, storage.open())
    }

    /// Hydrate from `store` when it holds a snapshot, otherwise start from genesis.
    pub fn open(config: VaultConfig, store: Box<dyn StateStore>) -> VaultResult<Self> {
        config.validate()?;

        let (state, journal) = match store.load()? {
            Some(snapshot) => {
                let journal = Journal::from_entries(snapshot.journal)?;
                let state = snapshot.state;
                if !state.token.supply_is_conserved() {
                    return Err(VaultError::Integrity(
                        "persisted balances do not sum to total supply".into(),
                    ));
                }
                check_state_matches_journal(&state, &journal, &config)?;
                if !state.access.is_administrator(&config.administrator) {
                    warn!(
                        configured = %config.administrator,
                        persisted = %state.access.administrator(),
                        "configured administrator differs from persisted capability holder"
                    );
                }
                info!(
                    backend = store.label(),
                    entries = journal.len(),
                    resources = state.registry.len(),
                    "vault hydrated from snapshot"
                );
                (state, journal)
            }
            None => {
                let state = LedgerState::genesis(&config)?;
                info!(
                    backend = store.label(),
                    administrator = %config.administrator,
                    initial_supply = config.token.initial_supply,
                    "vault initialized at genesis"
                );
                (state, Journal::new())
            }
        };

        Ok(Self {
            state,
            journal,
            store,
            config,
        })
    }

    // ------------------------------------------------------------------
    // Resource registry
    // ------------------------------------------------------------------

    pub fn submit(&mut self, caller: &AccountId, draft: ResourceDraft) -> VaultResult<ResourceId> {
        self.apply(caller, "submit", |tx, config| {
            let category = draft.category;
            let id = tx
                .state
                .registry
                .create(caller, draft, &config.limits, &mut tx.undo)?;
            tx.state.ownership.mint(id, caller, &mut tx.undo)?;
            Ok((
                id,
                VaultEvent::ResourceSubmitted {
                    resource_id: id,
                    contributor: caller.clone(),
                    category,
                },
            ))
        })
        .map(|(id, _)| id)
    }

    pub fn approve(
        &mut self,
        caller: &AccountId,
        resource_id: ResourceId,
        approved: bool,
    ) -> VaultResult<()> {
        self.apply(caller, "approve", |tx, _| {
            tx.state.registry.set_approved(
                &tx.state.access,
                caller,
                resource_id,
                approved,
                &mut tx.undo,
            )?;
            Ok((
                (),
                VaultEvent::ResourceApproved {
                    resource_id,
                    approved,
                },
            ))
        })
        .map(|_| ())
    }

    /// Tally a vote. An upvote mints the configured reward to the contributor
    /// and credits their earnings in the same transaction.
    pub fn vote(
        &mut self,
        caller: &AccountId,
        resource_id: ResourceId,
        is_upvote: bool,
    ) -> VaultResult<()> {
        self.apply(caller, "vote", |tx, config| {
            let direction = VoteDirection::from_upvote(is_upvote);
            let contributor = tx.state.registry.record_vote(
                caller,
                resource_id,
                direction,
                &config.voting,
                &mut tx.undo,
            )?;

            if direction.is_upvote() {
                let reward = config.rewards.per_upvote;
                tx.state.token.credit(&contributor, reward, &mut tx.undo)?;
                tx.state
                    .profiles
                    .credit_earnings(&contributor, reward, &mut tx.undo)?;
                debug!(%contributor, reward, resource = %resource_id, "upvote reward distributed");
            }

            Ok((
                (),
                VaultEvent::ResourceVoted {
                    resource_id,
                    voter: caller.clone(),
                    upvote: is_upvote,
                },
            ))
        })
        .map(|_| ())
    }

    pub fn resource(&self, resource_id: ResourceId) -> VaultResult<&Resource> {
        self.state.registry.get(resource_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.state.registry.iter()
    }

    pub fn approved_resources(&self) -> impl Iterator<Item = &Resource> {
        self.state.registry.approved()
    }

    pub fn resources_by_category(&self, category: Category) -> impl Iterator<Item = &Resource> {
        self.state.registry.by_category(category)
    }

    pub fn resources_by_contributor<'a>(
        &'a self,
        contributor: &'a AccountId,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.state.registry.by_contributor(contributor)
    }

    pub fn resource_count(&self) -> usize {
        self.state.registry.len()
    }

    pub fn ballot(&self, resource_id: ResourceId, voter: &AccountId) -> Option<Ballot> {
        self.state.registry.ballot(resource_id, voter)
    }

    // ------------------------------------------------------------------
    // Token ledger
    // ------------------------------------------------------------------

    pub fn mint(&mut self, caller: &AccountId, to: &AccountId, amount: Amount) -> VaultResult<()> {
        self.apply(caller, "mint", |tx, _| {
            require_account(to, "recipient")?;
            tx.state
                .token
                .mint(&tx.state.access, caller, to, amount, &mut tx.undo)?;
            Ok((
                (),
                VaultEvent::TokensMinted {
                    to: to.clone(),
                    amount,
                },
            ))
        })
        .map(|_| ())
    }

    pub fn burn(&mut self, caller: &AccountId, from: &AccountId, amount: Amount) -> VaultResult<()> {
        self.apply(caller, "burn", |tx, _| {
            tx.state
                .token
                .burn(&tx.state.access, caller, from, amount, &mut tx.undo)?;
            Ok((
                (),
                VaultEvent::TokensBurned {
                    from: from.clone(),
                    amount,
                    burned_by: caller.clone(),
                },
            ))
        })
        .map(|_| ())
    }

    pub fn transfer(&mut self, caller: &AccountId, to: &AccountId, amount: Amount) -> VaultResult<()> {
        self.apply(caller, "transfer", |tx, _| {
            require_account(to, "recipient")?;
            tx.state.token.transfer(caller, to, amount, &mut tx.undo)?;
            Ok((
                (),
                VaultEvent::TokensTransferred {
                    from: caller.clone(),
                    to: to.clone(),
                    amount,
                },
            ))
        })
        .map(|_| ())
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.state.token.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.state.token.total_supply()
    }

    pub fn token_name(&self) -> &str {
        self.state.token.name()
    }

    pub fn token_symbol(&self) -> &str {
        self.state.token.symbol()
    }

    // ------------------------------------------------------------------
    // Ownership certificates
    // ------------------------------------------------------------------

    pub fn transfer_certificate(
        &mut self,
        caller: &AccountId,
        certificate_id: ResourceId,
        to: &AccountId,
    ) -> VaultResult<()> {
        self.apply(caller, "transfer_certificate", |tx, _| {
            let from = tx
                .state
                .ownership
                .transfer(caller, certificate_id, to, &mut tx.undo)?;
            Ok((
                (),
                VaultEvent::CertificateTransferred {
                    certificate_id,
                    from,
                    to: to.clone(),
                },
            ))
        })
        .map(|_| ())
    }

    pub fn holder_of(&self, certificate_id: ResourceId) -> VaultResult<&AccountId> {
        self.state.ownership.holder_of(certificate_id)
    }

    pub fn certificate(&self, certificate_id: ResourceId) -> VaultResult<&Certificate> {
        self.state.ownership.certificate(certificate_id)
    }

    pub fn certificates_held(&self, account: &AccountId) -> usize {
        self.state.ownership.certificates_held(account)
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    pub fn set_profile_uri(&mut self, caller: &AccountId, uri: &str) -> VaultResult<()> {
        self.apply(caller, "set_profile_uri", |tx, config| {
            tx.state.profiles.set_profile_uri(
                caller,
                uri,
                config.limits.max_profile_uri_len,
                &mut tx.undo,
            )?;
            Ok((
                (),
                VaultEvent::ProfileUpdated {
                    account: caller.clone(),
                    profile_uri: uri.to_string(),
                },
            ))
        })
        .map(|_| ())
    }

    /// Never fails; unknown accounts read as the empty profile.
    pub fn profile(&self, account: &AccountId) -> Profile {
        self.state.profiles.get(account)
    }

    // ------------------------------------------------------------------
    // Access control
    // ------------------------------------------------------------------

    pub fn is_administrator(&self, account: &AccountId) -> bool {
        self.state.access.is_administrator(account)
    }

    pub fn administrator(&self) -> &AccountId {
        self.state.access.administrator()
    }

    pub fn transfer_administrator(
        &mut self,
        caller: &AccountId,
        new_administrator: &AccountId,
    ) -> VaultResult<()> {
        self.apply(caller, "transfer_administrator", |tx, _| {
            let previous =
                tx.state
                    .access
                    .transfer(caller, new_administrator.clone(), &mut tx.undo)?;
            Ok((
                (),
                VaultEvent::AdministratorTransferred {
                    previous,
                    current: new_administrator.clone(),
                },
            ))
        })
        .map(|_| ())
    }

    // ------------------------------------------------------------------
    // Serialized surface
    // ------------------------------------------------------------------

    /// Apply a decoded request and return the receipt of its journal entry.
    pub fn execute(&mut self, request: OperationRequest) -> VaultResult<Receipt> {
        let OperationRequest { caller, operation } = request;
        let resource_id = match operation {
            Operation::Submit {
                title,
                url,
                description,
                tags,
                category,
            } => {
                let category: Category = category.parse().map_err(|err| {
                    warn!(operation = "submit", %caller, error = %err, "operation rejected");
                    err
                })?;
                let draft = ResourceDraft {
                    title,
                    url,
                    description,
                    tags,
                    category,
                };
                Some(self.submit(&caller, draft)?)
            }
            Operation::Approve {
                resource_id,
                approved,
            } => {
                self.approve(&caller, resource_id, approved)?;
                None
            }
            Operation::Vote {
                resource_id,
                upvote,
            } => {
                self.vote(&caller, resource_id, upvote)?;
                None
            }
            Operation::Mint { to, amount } => {
                self.mint(&caller, &to, amount)?;
                None
            }
            Operation::Burn { from, amount } => {
                self.burn(&caller, &from, amount)?;
                None
            }
            Operation::Transfer { to, amount } => {
                self.transfer(&caller, &to, amount)?;
                None
            }
            Operation::SetProfileUri { uri } => {
                self.set_profile_uri(&caller, &uri)?;
                None
            }
            Operation::TransferCertificate { certificate_id, to } => {
                self.transfer_certificate(&caller, certificate_id, &to)?;
                None
            }
            Operation::TransferAdministrator { new_administrator } => {
                self.transfer_administrator(&caller, &new_administrator)?;
                None
            }
        };

        let entry = self
            .journal
            .last()
            .ok_or_else(|| VaultError::Integrity("committed operation left no journal entry".into()))?;
        Ok(Receipt::from_entry(entry, resource_id))
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn storage_label(&self) -> &'static str {
        self.store.label()
    }

    /// Journal hash chain intact, the tip vouching for the live state, and
    /// supply conserved.
    pub fn verify(&self) -> bool {
        self.journal.verify_chain()
            && self.state.token.supply_is_conserved()
            && check_state_matches_journal(&self.state, &self.journal, &self.config).is_ok()
    }

    fn apply<T, F>(
        &mut self,
        caller: &AccountId,
        operation: &'static str,
        f: F,
    ) -> VaultResult<(T, JournalEntry)>
    where
        F: FnOnce(&mut Transaction<'_>, &VaultConfig) -> VaultResult<(T, VaultEvent)>,
    {
        let mut tx = Transaction::begin(&mut self.state);

        let (value, event) = match f(&mut tx, &self.config) {
            Ok(outcome) => outcome,
            Err(err) => return Err(rejected(operation, caller, err)),
        };

        let entry = match tx
            .state()
            .digest()
            .and_then(|state_hash| self.journal.build_entry(caller, event, state_hash))
        {
            Ok(entry) => entry,
            Err(err) => return Err(rejected(operation, caller, err)),
        };

        let snapshot = SnapshotRef {
            format_version: SNAPSHOT_FORMAT_VERSION,
            state: tx.state(),
            journal: JournalView {
                committed: self.journal.entries(),
                pending: Some(&entry),
            },
        };
        if let Err(err) = self.store.persist(&snapshot) {
            return Err(rejected(operation, caller, err));
        }

        self.journal.commit_entry(entry.clone())?;
        tx.commit();

        info!(
            operation,
            %caller,
            index = entry.index,
            event = entry.event.name(),
            "operation committed"
        );
        Ok((value, entry))
    }
}

/// The journal tip records the digest of the state it produced. A journal
/// with no entries can only sit next to the genesis state.
fn check_state_matches_journal(
    state: &LedgerState,
    journal: &Journal,
    config: &VaultConfig,
) -> VaultResult<()> {
    let matches = match journal.last() {
        Some(tip) => state.digest()? == tip.state_hash,
        None => *state == LedgerState::genesis(config)?,
    };
    if !matches {
        return Err(VaultError::Integrity(
            "ledger state does not match the state recorded by the journal".into(),
        ));
    }
    Ok(())
}

fn rejected(operation: &'static str, caller: &AccountId, err: VaultError) -> VaultError {
    warn!(operation, %caller, kind = %err.kind(), error = %err, "operation rejected");
    err
}

fn require_account(account: &AccountId, role: &str) -> VaultResult<()> {
    if account.as_str().trim().is_empty() {
        return Err(VaultError::InvalidInput(format!("{role} account must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessControl;
    use crate::storage::Snapshot;
    use crate::transaction::UndoLog;

    fn account(id: &str) -> AccountId {
        AccountId::new(id)
    }

    fn vault() -> Vault {
        Vault::new(VaultConfig::for_administrator("admin")).unwrap()
    }

    fn ebook() -> ResourceDraft {
        ResourceDraft::new(
            "Sample eBook",
            "https://example.com/ebook",
            "This is a test eBook resource.",
            Category::Ebook,
        )
        .with_tags(["test", "ebook"])
    }

    /// Store whose persist always fails.
    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn label(&self) -> &'static str {
            "broken"
        }

        fn load(&self) -> VaultResult<Option<Snapshot>> {
            Ok(None)
        }

        fn persist(&mut self, _snapshot: &SnapshotRef<'_>) -> VaultResult<()> {
            Err(VaultError::Storage("disk full".into()))
        }
    }

    #[test]
    fn submit_creates_unapproved_resource_and_certificate() {
        let mut vault = vault();
        let user = account("user");

        let id = vault.submit(&user, ebook()).unwrap();
        assert_eq!(id, ResourceId(1));

        let resource = vault.resource(id).unwrap();
        assert!(!resource.approved);
        assert_eq!((resource.upvotes, resource.downvotes), (0, 0));
        assert_eq!(resource.contributor, user);
        assert_eq!(resource.tags, vec!["test".to_string(), "ebook".to_string()]);
        assert_eq!(vault.holder_of(id).unwrap(), &user);
        assert_eq!(vault.journal().len(), 1);
    }

    #[test]
    fn failed_submit_emits_nothing() {
        let mut vault = vault();
        let mut draft = ebook();
        draft.url.clear();

        let err = vault.submit(&account("user"), draft).unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)));
        assert!(vault.journal().is_empty());
        assert_eq!(vault.resource_count(), 0);
        assert_eq!(vault.state().registry.next_id(), ResourceId(1));
    }

    #[test]
    fn downvote_carries_no_reward() {
        let mut vault = vault();
        let user = account("user");
        let id = vault.submit(&user, ebook()).unwrap();
        vault.approve(&account("admin"), id, true).unwrap();

        vault.vote(&account("other"), id, false).unwrap();
        let resource = vault.resource(id).unwrap();
        assert_eq!((resource.upvotes, resource.downvotes), (0, 1));
        assert_eq!(vault.balance_of(&user), 0);
        assert_eq!(vault.profile(&user).total_tokens_earned, 0);
    }

    #[test]
    fn reward_overflow_rolls_back_vote() {
        let mut vault = vault();
        let admin = account("admin");
        let user = account("user");
        let id = vault.submit(&user, ebook()).unwrap();
        vault.approve(&admin, id, true).unwrap();
        vault.mint(&admin, &user, Amount::MAX).unwrap();
        let entries_before = vault.journal().len();

        let err = vault.vote(&account("other"), id, true).unwrap_err();
        assert!(matches!(err, VaultError::Overflow(_)));

        let resource = vault.resource(id).unwrap();
        assert_eq!(resource.upvotes, 0);
        assert_eq!(vault.ballot(id, &account("other")), None);
        assert_eq!(vault.balance_of(&user), Amount::MAX);
        assert_eq!(vault.profile(&user).total_tokens_earned, 0);
        assert_eq!(vault.journal().len(), entries_before);
    }

    #[test]
    fn storage_failure_rolls_back_everything() {
        let mut vault =
            Vault::open(VaultConfig::for_administrator("admin"), Box::new(BrokenStore)).unwrap();
        let before = vault.state().clone();

        let err = vault.submit(&account("user"), ebook()).unwrap_err();
        assert!(matches!(err, VaultError::Storage(_)));
        assert_eq!(vault.state(), &before);
        assert!(vault.journal().is_empty());
        assert!(vault.holder_of(ResourceId(1)).is_err());
    }

    #[test]
    fn verify_flags_state_drifting_from_journal() {
        let mut vault = vault();
        let id = vault.submit(&account("user"), ebook()).unwrap();
        assert!(vault.verify());

        vault.state.registry.set_approved(
            &AccessControl::new(account("admin")),
            &account("admin"),
            id,
            true,
            &mut UndoLog::default(),
        )
        .unwrap();
        assert!(vault.journal().verify_chain());
        assert!(!vault.verify());
    }

    #[test]
    fn administrator_transfer_moves_capability() {
        let mut vault = vault();
        let admin = account("admin");
        let curator = account("curator");
        let id = vault.submit(&account("user"), ebook()).unwrap();

        vault.transfer_administrator(&admin, &curator).unwrap();
        assert!(vault.is_administrator(&curator));
        assert!(matches!(
            vault.approve(&admin, id, true),
            Err(VaultError::Unauthorized(_))
        ));
        vault.approve(&curator, id, true).unwrap();
        assert!(vault.resource(id).unwrap().approved);
    }

    #[test]
    fn execute_rejects_unknown_category() {
        let mut vault = vault();
        let err = vault
            .execute(OperationRequest::new(
                "user",
                Operation::Submit {
                    title: "t".into(),
                    url: "u".into(),
                    description: "d".into(),
                    tags: vec![],
                    category: "MAGAZINE".into(),
                },
            ))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
        assert!(vault.journal().is_empty());
    }

    #[test]
    fn execute_returns_receipt_for_entry() {
        let mut vault = vault();
        let receipt = vault
            .execute(OperationRequest::new(
                "user",
                Operation::Submit {
                    title: "Test Podcast".into(),
                    url: "https://example.com/podcast".into(),
                    description: "This is a test podcast.".into(),
                    tags: vec!["test".into(), "podcast".into()],
                    category: "2".into(),
                },
            ))
            .unwrap();

        assert_eq!(receipt.index, 0);
        assert_eq!(receipt.resource_id, Some(ResourceId(1)));
        assert_eq!(
            receipt.entry_hash,
            vault.journal().entries()[0].entry_hash
        );
        assert_eq!(vault.resource(ResourceId(1)).unwrap().category, Category::Podcast);
        assert!(vault.verify());
    }
}
