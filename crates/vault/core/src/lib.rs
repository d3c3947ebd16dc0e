//! Knowledge Vault core ledger.
//!
//! This crate keeps a curated registry of learning resources, the reward token
//! paid out for upvotes, one ownership certificate per resource and contributor
//! profiles. Every state change is atomic, journaled and persisted before it commits.

#![deny(unsafe_code)]

pub mod access;
pub mod config;
pub mod error;
pub mod journal;
pub mod operation;
pub mod ownership;
pub mod profile;
pub mod registry;
pub mod state;
pub mod storage;
pub mod token;
mod transaction;
pub mod types;
pub mod vault;

pub use access::AccessControl;
pub use config::{ResourceLimits, RewardConfig, TokenConfig, VaultConfig, VotingPolicy};
pub use error::{ErrorKind, VaultError, VaultResult};
pub use journal::{Journal, JournalEntry, VaultEvent};
pub use operation::{Operation, OperationRequest, Receipt};
pub use ownership::OwnershipRegistry;
pub use profile::ProfileStore;
pub use registry::ResourceRegistry;
pub use state::LedgerState;
pub use storage::{FileStore, MemoryStore, Snapshot, StateStore, StorageConfig};
pub use token::TokenLedger;
pub use types::{
    AccountId, Amount, Ballot, Category, Certificate, Profile, Resource, ResourceDraft,
    ResourceId, VoteDirection,
};
pub use vault::Vault;
