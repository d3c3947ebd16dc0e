//! Vault configuration.

use crate::error::{VaultError, VaultResult};
use crate::types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete vault configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Account holding the administrator capability at construction.
    pub administrator: AccountId,
    pub token: TokenConfig,
    pub rewards: RewardConfig,
    pub limits: ResourceLimits,
    pub voting: VotingPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            administrator: AccountId::new("admin"),
            token: TokenConfig::default(),
            rewards: RewardConfig::default(),
            limits: ResourceLimits::default(),
            voting: VotingPolicy::default(),
        }
    }
}

impl VaultConfig {
    pub fn for_administrator(administrator: impl Into<String>) -> Self {
        Self {
            administrator: AccountId::new(administrator),
            ..Self::default()
        }
    }

    pub fn with_initial_supply(mut self, initial_supply: Amount) -> Self {
        self.token.initial_supply = initial_supply;
        self
    }

    pub fn with_voting(mut self, voting: VotingPolicy) -> Self {
        self.voting = voting;
        self
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VaultError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> VaultResult<Self> {
        let config: VaultConfig =
            toml::from_str(contents).map_err(|e| VaultError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.administrator.as_str().trim().is_empty() {
            return Err(VaultError::Config("administrator must not be empty".into()));
        }
        if self.token.name.is_empty() || self.token.symbol.is_empty() {
            return Err(VaultError::Config("token name and symbol are required".into()));
        }
        if self.rewards.per_upvote == 0 {
            return Err(VaultError::Config("rewards.per_upvote must be positive".into()));
        }
        self.limits.validate()
    }
}

/// Fungible reward token parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    /// Minted to the administrator at construction.
    pub initial_supply: Amount,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "KnowledgeVaultToken".to_string(),
            symbol: "KVT".to_string(),
            initial_supply: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub per_upvote: Amount,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { per_upvote: 10 }
    }
}

/// Bounds on free-text resource fields, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub max_title_len: usize,
    pub max_url_len: usize,
    pub max_description_len: usize,
    pub max_tags: usize,
    pub max_tag_len: usize,
    pub max_profile_uri_len: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_title_len: 256,
            max_url_len: 2048,
            max_description_len: 4096,
            max_tags: 16,
            max_tag_len: 64,
            max_profile_uri_len: 2048,
        }
    }
}

impl ResourceLimits {
    fn validate(&self) -> VaultResult<()> {
        let bounds = [
            ("max_title_len", self.max_title_len),
            ("max_url_len", self.max_url_len),
            ("max_description_len", self.max_description_len),
            ("max_tag_len", self.max_tag_len),
            ("max_profile_uri_len", self.max_profile_uri_len),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(VaultError::Config(format!("limits.{name} must be positive")));
            }
        }
        Ok(())
    }
}

/// Voting rules left open by the observed behavior.
///
/// Defaults match what the reference deployment does: no duplicate-vote guard
/// and no self-vote guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingPolicy {
    /// When false a second vote by the same account on the same resource is
    /// rejected with `AlreadyExists`.
    pub allow_repeat_votes: bool,
    /// When false the contributor may not vote on their own resource.
    pub allow_self_votes: bool,
}

impl Default for VotingPolicy {
    fn default() -> Self {
        Self {
            allow_repeat_votes: true,
            allow_self_votes: true,
        }
    }
}

impl VotingPolicy {
    pub fn strict() -> Self {
        Self {
            allow_repeat_votes: false,
            allow_self_votes: false,
        }
    }
}
