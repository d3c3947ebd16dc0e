//! Line-delimited JSON front end for the Knowledge Vault ledger.

use serde::Serialize;
use std::path::PathBuf;
use vault_core::{
    AccountId, ErrorKind, OperationRequest, Receipt, StorageConfig, Vault, VaultConfig, VaultError,
};

/// Resolved node settings: the ledger config plus where snapshots live.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub vault: VaultConfig,
    pub storage: StorageConfig,
}

impl NodeConfig {
    /// Layer command-line overrides over the config file (or defaults when absent).
    pub fn resolve(
        config_path: Option<&PathBuf>,
        state_path: Option<PathBuf>,
        administrator: Option<String>,
        initial_supply: Option<u64>,
    ) -> Result<Self, VaultError> {
        let mut vault = match config_path {
            Some(path) => VaultConfig::load(path)?,
            None => VaultConfig::default(),
        };
        if let Some(administrator) = administrator {
            vault.administrator = AccountId::new(administrator);
        }
        if let Some(initial_supply) = initial_supply {
            vault.token.initial_supply = initial_supply;
        }
        vault.validate()?;

        let storage = match state_path {
            Some(path) => StorageConfig::file(path),
            None => StorageConfig::Memory,
        };
        Ok(Self { vault, storage })
    }

    pub fn open(self) -> Result<Vault, VaultError> {
        Vault::with_storage(self.vault, self.storage)
    }
}

/// One output line.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok {
        receipt: Receipt,
    },
    Rejected {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    fn rejected(err: &VaultError) -> Self {
        Self::Rejected {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Decode and apply one request line. Blank lines yield `None`.
pub fn process_line(vault: &mut Vault, line: &str) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: OperationRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "malformed request line");
            return Some(Response::rejected(&VaultError::InvalidInput(format!(
                "malformed request: {err}"
            ))));
        }
    };

    Some(match vault.execute(request) {
        Ok(receipt) => Response::Ok { receipt },
        Err(err) => Response::rejected(&err),
    })
}

/// Ledger overview printed by `--query`.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub administrator: AccountId,
    pub token_name: String,
    pub token_symbol: String,
    pub total_supply: u64,
    pub resources: usize,
    pub approved_resources: usize,
    pub journal_entries: usize,
    pub storage: &'static str,
    pub verified: bool,
}

impl Summary {
    pub fn of(vault: &Vault) -> Self {
        Self {
            administrator: vault.administrator().clone(),
            token_name: vault.token_name().to_string(),
            token_symbol: vault.token_symbol().to_string(),
            total_supply: vault.total_supply(),
            resources: vault.resource_count(),
            approved_resources: vault.approved_resources().count(),
            journal_entries: vault.journal().len(),
            storage: vault.storage_label(),
            verified: vault.verify(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> Vault {
        Vault::new(VaultConfig::for_administrator("admin")).unwrap()
    }

    fn to_json(response: Option<Response>) -> serde_json::Value {
        serde_json::to_value(response.expect("response")).unwrap()
    }

    #[test]
    fn committed_request_reports_receipt() {
        let mut vault = vault();
        let json = to_json(process_line(
            &mut vault,
            r#"{"caller":"user","op":"submit","title":"Test Article","url":"https://example.com/a","description":"d","category":"ARTICLE"}"#,
        ));

        assert_eq!(json["status"], "ok");
        assert_eq!(json["receipt"]["index"], 0);
        assert_eq!(json["receipt"]["resource_id"], 1);
        assert_eq!(json["receipt"]["event"]["event"], "resource_submitted");
    }

    #[test]
    fn rejection_carries_error_kind() {
        let mut vault = vault();
        let json = to_json(process_line(
            &mut vault,
            r#"{"caller":"user","op":"mint","to":"user","amount":5}"#,
        ));

        assert_eq!(json["status"], "rejected");
        assert_eq!(json["kind"], "unauthorized");
        assert_eq!(vault.total_supply(), 0);
    }

    #[test]
    fn malformed_line_is_invalid_input() {
        let mut vault = vault();
        let json = to_json(process_line(&mut vault, "{\"caller\":"));
        assert_eq!(json["kind"], "invalid_input");
        assert!(process_line(&mut vault, "   ").is_none());
    }

    #[test]
    fn overrides_win_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("vault.toml");
        std::fs::write(
            &config_path,
            "administrator = \"file-admin\"\n[token]\ninitial_supply = 5\n",
        )
        .unwrap();

        let node = NodeConfig::resolve(
            Some(&config_path),
            Some(dir.path().join("state.json")),
            Some("cli-admin".into()),
            None,
        )
        .unwrap();
        assert_eq!(node.vault.administrator, AccountId::new("cli-admin"));
        assert_eq!(node.vault.token.initial_supply, 5);
        assert_eq!(node.storage.label(), "file");

        let vault = node.open().unwrap();
        let summary = Summary::of(&vault);
        assert_eq!(summary.total_supply, 5);
        assert!(summary.verified);
    }
}
