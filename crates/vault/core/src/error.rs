use crate::types::{AccountId, Amount, ResourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors surfaced by vault operations.
///
/// A failed operation leaves every component exactly as it was before the call.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("resource {0} is not approved")]
    NotApproved(ResourceId),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("insufficient balance: {account} holds {available}, {required} required")]
    InsufficientBalance {
        account: AccountId,
        available: Amount,
        required: Amount,
    },

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NotApproved(_) => ErrorKind::NotApproved,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Overflow(_) => ErrorKind::Overflow,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Integrity(_) => ErrorKind::Integrity,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn resource_not_found(id: ResourceId) -> Self {
        Self::NotFound(format!("resource {id}"))
    }

    pub(crate) fn certificate_not_found(id: ResourceId) -> Self {
        Self::NotFound(format!("certificate {id}"))
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("serialization: {err}"))
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Stable, serializable error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    NotApproved,
    AlreadyExists,
    InvalidInput,
    InsufficientBalance,
    Overflow,
    Storage,
    Integrity,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::NotApproved => "not_approved",
            Self::AlreadyExists => "already_exists",
            Self::InvalidInput => "invalid_input",
            Self::InsufficientBalance => "insufficient_balance",
            Self::Overflow => "overflow",
            Self::Storage => "storage",
            Self::Integrity => "integrity",
            Self::Config => "config",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_display() {
        let err = VaultError::InsufficientBalance {
            account: AccountId::new("alice"),
            available: 5,
            required: 10,
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert!(err.to_string().contains("alice holds 5"));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotApproved).unwrap();
        assert_eq!(json, "\"not_approved\"");
        assert_eq!(ErrorKind::NotApproved.as_str(), "not_approved");
    }
}
