//! Serialized operation surface used by delivery layers.

use crate::journal::{JournalEntry, VaultEvent};
use crate::types::{AccountId, Amount, ResourceId};
use serde::{Deserialize, Serialize};

/// One state-changing operation.
///
/// `Submit` carries the category as text so an unrecognized value is rejected
/// by the vault as invalid input rather than by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Submit {
        title: String,
        url: String,
        description: String,
        #[serde(default)]
        tags: Vec<String>,
        category: String,
    },
    Approve {
        resource_id: ResourceId,
        approved: bool,
    },
    Vote {
        resource_id: ResourceId,
        upvote: bool,
    },
    Mint {
        to: AccountId,
        amount: Amount,
    },
    Burn {
        from: AccountId,
        amount: Amount,
    },
    Transfer {
        to: AccountId,
        amount: Amount,
    },
    SetProfileUri {
        uri: String,
    },
    TransferCertificate {
        certificate_id: ResourceId,
        to: AccountId,
    },
    TransferAdministrator {
        new_administrator: AccountId,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Submit { .. } => "submit",
            Self::Approve { .. } => "approve",
            Self::Vote { .. } => "vote",
            Self::Mint { .. } => "mint",
            Self::Burn { .. } => "burn",
            Self::Transfer { .. } => "transfer",
            Self::SetProfileUri { .. } => "set_profile_uri",
            Self::TransferCertificate { .. } => "transfer_certificate",
            Self::TransferAdministrator { .. } => "transfer_administrator",
        }
    }
}

/// An operation together with the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub caller: AccountId,
    #[serde(flatten)]
    pub operation: Operation,
}

impl OperationRequest {
    pub fn new(caller: impl Into<String>, operation: Operation) -> Self {
        Self {
            caller: AccountId::new(caller),
            operation,
        }
    }
}

/// Proof that an operation committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub index: u64,
    pub entry_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<ResourceId>,
    pub event: VaultEvent,
}

impl Receipt {
    pub(crate) fn from_entry(entry: &JournalEntry, resource_id: Option<ResourceId>) -> Self {
        Self {
            index: entry.index,
            entry_hash: entry.entry_hash.clone(),
            resource_id,
            event: entry.event.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_decodes_from_flat_json() {
        let request: OperationRequest = serde_json::from_str(
            r#"{"caller":"user","op":"submit","title":"Sample eBook","url":"https://example.com/ebook","description":"d","tags":["test"],"category":"EBOOK"}"#,
        )
        .unwrap();
        assert_eq!(request.caller, AccountId::new("user"));
        assert_eq!(request.operation.name(), "submit");
    }

    #[test]
    fn vote_request_encodes_tag() {
        let request = OperationRequest::new(
            "other",
            Operation::Vote {
                resource_id: ResourceId(1),
                upvote: true,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["op"], "vote");
        assert_eq!(json["resource_id"], 1);
        assert_eq!(json["caller"], "other");
    }
}
