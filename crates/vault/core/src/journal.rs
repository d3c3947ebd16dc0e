//! Append-only notification journal with hash-chain proofs.

use crate::error::{VaultError, VaultResult};
use crate::types::{AccountId, Amount, Category, ResourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State change notification. Exactly one per successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    ResourceSubmitted {
        resource_id: ResourceId,
        contributor: AccountId,
        category: Category,
    },
    ResourceApproved {
        resource_id: ResourceId,
        approved: bool,
    },
    ResourceVoted {
        resource_id: ResourceId,
        voter: AccountId,
        upvote: bool,
    },
    TokensMinted {
        to: AccountId,
        amount: Amount,
    },
    TokensBurned {
        from: AccountId,
        amount: Amount,
        burned_by: AccountId,
    },
    TokensTransferred {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    ProfileUpdated {
        account: AccountId,
        profile_uri: String,
    },
    CertificateTransferred {
        certificate_id: ResourceId,
        from: AccountId,
        to: AccountId,
    },
    AdministratorTransferred {
        previous: AccountId,
        current: AccountId,
    },
}

impl VaultEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResourceSubmitted { .. } => "resource_submitted",
            Self::ResourceApproved { .. } => "resource_approved",
            Self::ResourceVoted { .. } => "resource_voted",
            Self::TokensMinted { .. } => "tokens_minted",
            Self::TokensBurned { .. } => "tokens_burned",
            Self::TokensTransferred { .. } => "tokens_transferred",
            Self::ProfileUpdated { .. } => "profile_updated",
            Self::CertificateTransferred { .. } => "certificate_transferred",
            Self::AdministratorTransferred { .. } => "administrator_transferred",
        }
    }
}

/// One committed operation.
///
/// `state_hash` is the digest of the ledger state right after the operation,
/// so the tip of the chain also vouches for the persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: String,
    pub index: u64,
    pub caller: AccountId,
    pub timestamp: DateTime<Utc>,
    pub event: VaultEvent,
    pub state_hash: String,
    pub previous_hash: Option<String>,
    pub entry_hash: String,
}

impl JournalEntry {
    fn expected_hash(&self) -> VaultResult<String> {
        hash_entry(HashMaterial {
            index: self.index,
            caller: &self.caller,
            timestamp: self.timestamp,
            event: &self.event,
            state_hash: &self.state_hash,
            previous_hash: self.previous_hash.as_deref(),
        })
    }
}

/// Ordered record of committed operations.
///
/// Entries are immutable once pushed. The vault builds an entry against the
/// current tip, persists it alongside the state, and only then commits it.
#[derive(Debug, Default, Clone)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt entries read back from storage. Any break in numbering or linkage
    /// is an `Integrity` error.
    pub fn from_entries(entries: Vec<JournalEntry>) -> VaultResult<Self> {
        let mut tip: Option<&str> = None;
        for (position, entry) in entries.iter().enumerate() {
            check_link(entry, position as u64, tip)?;
            tip = Some(entry.entry_hash.as_str());
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.last()
    }

    /// Entries whose event concerns `resource_id`.
    pub fn for_resource(&self, resource_id: ResourceId) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().filter(move |entry| match &entry.event {
            VaultEvent::ResourceSubmitted { resource_id: id, .. }
            | VaultEvent::ResourceApproved { resource_id: id, .. }
            | VaultEvent::ResourceVoted { resource_id: id, .. } => *id == resource_id,
            VaultEvent::CertificateTransferred { certificate_id, .. } => {
                *certificate_id == resource_id
            }
            _ => false,
        })
    }

    pub fn verify_chain(&self) -> bool {
        let mut tip: Option<&str> = None;
        self.entries.iter().enumerate().all(|(position, entry)| {
            let linked = check_link(entry, position as u64, tip).is_ok();
            tip = Some(entry.entry_hash.as_str());
            linked
        })
    }

    /// Prepare the entry that would follow the current tip. Nothing is
    /// appended until [`Journal::commit_entry`].
    pub fn build_entry(
        &self,
        caller: &AccountId,
        event: VaultEvent,
        state_hash: String,
    ) -> VaultResult<JournalEntry> {
        let index = self.entries.len() as u64;
        let timestamp = Utc::now();
        let previous_hash = self.last().map(|tip| tip.entry_hash.clone());
        let entry_hash = hash_entry(HashMaterial {
            index,
            caller,
            timestamp,
            event: &event,
            state_hash: &state_hash,
            previous_hash: previous_hash.as_deref(),
        })?;

        Ok(JournalEntry {
            entry_id: Uuid::new_v4().to_string(),
            index,
            caller: caller.clone(),
            timestamp,
            event,
            state_hash,
            previous_hash,
            entry_hash,
        })
    }

    /// Append an entry built by [`Journal::build_entry`]. It must still
    /// extend the current tip.
    pub fn commit_entry(&mut self, entry: JournalEntry) -> VaultResult<()> {
        let tip = self.last().map(|tip| tip.entry_hash.as_str());
        check_link(&entry, self.entries.len() as u64, tip)?;
        self.entries.push(entry);
        Ok(())
    }
}

fn check_link(entry: &JournalEntry, position: u64, tip: Option<&str>) -> VaultResult<()> {
    if entry.index != position {
        return Err(VaultError::Integrity(format!(
            "journal slot {position} holds entry numbered {}",
            entry.index
        )));
    }
    if entry.previous_hash.as_deref() != tip {
        return Err(VaultError::Integrity(format!(
            "journal entry {position} does not extend the preceding entry"
        )));
    }
    if entry.expected_hash()? != entry.entry_hash {
        return Err(VaultError::Integrity(format!(
            "journal entry {position} content does not match its hash"
        )));
    }
    Ok(())
}

#[derive(Serialize)]
struct HashMaterial<'a> {
    index: u64,
    caller: &'a AccountId,
    timestamp: DateTime<Utc>,
    event: &'a VaultEvent,
    state_hash: &'a str,
    previous_hash: Option<&'a str>,
}

fn hash_entry(material: HashMaterial<'_>) -> VaultResult<String> {
    let bytes = serde_json::to_vec(&material)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
