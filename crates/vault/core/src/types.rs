use crate::error::VaultError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token amounts, in the smallest indivisible unit.
pub type Amount = u64;

/// Opaque account identifier supplied by the delivery/identity layer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Resource identifier. Certificates share the same identifier space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl ResourceId {
    pub const FIRST: ResourceId = ResourceId(1);

    pub fn get(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(&self) -> Result<ResourceId, VaultError> {
        self.0
            .checked_add(1)
            .map(ResourceId)
            .ok_or_else(|| VaultError::Overflow("resource identifier space exhausted".into()))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource category. Numeric codes follow declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Ebook,
    Video,
    Podcast,
    Article,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Ebook,
        Category::Video,
        Category::Podcast,
        Category::Article,
    ];

    pub fn code(&self) -> u8 {
        match self {
            Self::Ebook => 0,
            Self::Video => 1,
            Self::Podcast => 2,
            Self::Article => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ebook => "EBOOK",
            Self::Video => "VIDEO",
            Self::Podcast => "PODCAST",
            Self::Article => "ARTICLE",
        }
    }
}

impl TryFrom<u8> for Category {
    type Error = VaultError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or_else(|| VaultError::InvalidInput(format!("unknown category code {code}")))
    }
}

impl FromStr for Category {
    type Err = VaultError;

    /// Accepts the category name (any case) or its numeric code.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::try_from(code);
        }
        Self::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| VaultError::InvalidInput(format!("unknown category '{value}'")))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted reference to external content.
///
/// Everything except `approved`, `upvotes` and `downvotes` is fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: Category,
    pub contributor: AccountId,
    pub upvotes: u64,
    pub downvotes: u64,
    pub approved: bool,
}

/// Input for a resource submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDraft {
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Category,
}

impl ResourceDraft {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
            tags: Vec::new(),
            category,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn from_upvote(is_upvote: bool) -> Self {
        if is_upvote {
            Self::Up
        } else {
            Self::Down
        }
    }

    pub fn is_upvote(&self) -> bool {
        matches!(self, Self::Up)
    }
}

/// Per (resource, voter) record of votes cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub last_direction: VoteDirection,
    pub votes_cast: u64,
}

/// Per-account profile metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub profile_uri: String,
    pub total_tokens_earned: Amount,
}

/// Ownership certificate for a resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: ResourceId,
    pub holder: AccountId,
    pub minted_to: AccountId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_names_and_codes() {
        assert_eq!("EBOOK".parse::<Category>().unwrap(), Category::Ebook);
        assert_eq!("podcast".parse::<Category>().unwrap(), Category::Podcast);
        assert_eq!("3".parse::<Category>().unwrap(), Category::Article);
        assert_eq!(Category::try_from(1).unwrap(), Category::Video);
    }

    #[test]
    fn category_rejects_unknown_values() {
        assert!("MAGAZINE".parse::<Category>().is_err());
        assert!("4".parse::<Category>().is_err());
        assert!(Category::try_from(200).is_err());
    }

    #[test]
    fn category_codes_follow_declaration_order() {
        for (index, category) in Category::ALL.iter().enumerate() {
            assert_eq!(usize::from(category.code()), index);
        }
    }

    #[test]
    fn resource_id_exhaustion_overflows() {
        assert!(ResourceId(u64::MAX).next().is_err());
        assert_eq!(ResourceId::FIRST.next().unwrap(), ResourceId(2));
    }
}
