//! Resource records, approval flags and vote tallies.

use crate::access::AccessControl;
use crate::config::{ResourceLimits, VotingPolicy};
use crate::error::{VaultError, VaultResult};
use crate::transaction::{UndoLog, UndoRecord};
use crate::types::{
    AccountId, Ballot, Category, Resource, ResourceDraft, ResourceId, VoteDirection,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRegistry {
    resources: BTreeMap<ResourceId, Resource>,
    ballots: BTreeMap<ResourceId, BTreeMap<AccountId, Ballot>>,
    next_id: ResourceId,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self {
            resources: BTreeMap::new(),
            ballots: BTreeMap::new(),
            next_id: ResourceId::FIRST,
        }
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ResourceId) -> VaultResult<&Resource> {
        self.resources
            .get(&id)
            .ok_or_else(|| VaultError::resource_not_found(id))
    }

    /// All resources in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn approved(&self) -> impl Iterator<Item = &Resource> {
        self.iter().filter(|r| r.approved)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Resource> {
        self.iter().filter(move |r| r.category == category)
    }

    pub fn by_contributor<'a>(
        &'a self,
        contributor: &'a AccountId,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.iter().filter(move |r| r.contributor == *contributor)
    }

    pub fn ballot(&self, id: ResourceId, voter: &AccountId) -> Option<Ballot> {
        self.ballots.get(&id).and_then(|b| b.get(voter)).copied()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Identifier the next submission will receive.
    pub fn next_id(&self) -> ResourceId {
        self.next_id
    }

    pub(crate) fn create(
        &mut self,
        contributor: &AccountId,
        draft: ResourceDraft,
        limits: &ResourceLimits,
        undo: &mut UndoLog,
    ) -> VaultResult<ResourceId> {
        validate_draft(&draft, limits)?;
        let id = self.next_id;
        if self.resources.contains_key(&id) {
            return Err(VaultError::AlreadyExists(format!("resource {id}")));
        }
        let following = id.next()?;

        let resource = Resource {
            id,
            title: draft.title,
            url: draft.url,
            description: draft.description,
            tags: draft.tags,
            category: draft.category,
            contributor: contributor.clone(),
            upvotes: 0,
            downvotes: 0,
            approved: false,
        };
        self.resources.insert(id, resource);
        undo.push(UndoRecord::Resource { id, previous: None });
        self.next_id = following;
        undo.push(UndoRecord::NextResourceId { previous: id });
        Ok(id)
    }

    pub(crate) fn set_approved(
        &mut self,
        access: &AccessControl,
        caller: &AccountId,
        id: ResourceId,
        approved: bool,
        undo: &mut UndoLog,
    ) -> VaultResult<()> {
        access.require_administrator(caller, "change resource approval")?;
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or_else(|| VaultError::resource_not_found(id))?;
        let previous = resource.clone();
        resource.approved = approved;
        undo.push(UndoRecord::Resource {
            id,
            previous: Some(previous),
        });
        Ok(())
    }

    /// Tally one vote. Returns the contributor to reward.
    pub(crate) fn record_vote(
        &mut self,
        voter: &AccountId,
        id: ResourceId,
        direction: VoteDirection,
        policy: &VotingPolicy,
        undo: &mut UndoLog,
    ) -> VaultResult<AccountId> {
        let previous_ballot = self.ballot(id, voter);
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or_else(|| VaultError::resource_not_found(id))?;
        if !resource.approved {
            return Err(VaultError::NotApproved(id));
        }
        if !policy.allow_self_votes && resource.contributor == *voter {
            return Err(VaultError::Unauthorized(format!(
                "{voter} may not vote on their own resource {id}"
            )));
        }
        if !policy.allow_repeat_votes && previous_ballot.is_some() {
            return Err(VaultError::AlreadyExists(format!(
                "vote by {voter} on resource {id}"
            )));
        }

        let previous = resource.clone();
        let counter = match direction {
            VoteDirection::Up => &mut resource.upvotes,
            VoteDirection::Down => &mut resource.downvotes,
        };
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| VaultError::Overflow(format!("vote counter of resource {id}")))?;
        let contributor = resource.contributor.clone();
        undo.push(UndoRecord::Resource {
            id,
            previous: Some(previous),
        });

        let votes_cast = previous_ballot
            .map(|b| b.votes_cast.saturating_add(1))
            .unwrap_or(1);
        self.ballots.entry(id).or_default().insert(
            voter.clone(),
            Ballot {
                last_direction: direction,
                votes_cast,
            },
        );
        undo.push(UndoRecord::Ballot {
            resource: id,
            voter: voter.clone(),
            previous: previous_ballot,
        });

        Ok(contributor)
    }

    pub(crate) fn restore_resource(&mut self, id: ResourceId, previous: Option<Resource>) {
        match previous {
            Some(resource) => {
                self.resources.insert(id, resource);
            }
            None => {
                self.resources.remove(&id);
            }
        }
    }

    pub(crate) fn restore_ballot(
        &mut self,
        id: ResourceId,
        voter: AccountId,
        previous: Option<Ballot>,
    ) {
        match previous {
            Some(ballot) => {
                self.ballots.entry(id).or_default().insert(voter, ballot);
            }
            None => {
                if let Some(ballots) = self.ballots.get_mut(&id) {
                    ballots.remove(&voter);
                    if ballots.is_empty() {
                        self.ballots.remove(&id);
                    }
                }
            }
        }
    }

    pub(crate) fn restore_next_id(&mut self, previous: ResourceId) {
        self.next_id = previous;
    }
}

fn validate_draft(draft: &ResourceDraft, limits: &ResourceLimits) -> VaultResult<()> {
    require_text("title", &draft.title, limits.max_title_len)?;
    require_text("url", &draft.url, limits.max_url_len)?;
    require_text("description", &draft.description, limits.max_description_len)?;

    if draft.tags.len() > limits.max_tags {
        return Err(VaultError::InvalidInput(format!(
            "at most {} tags allowed, got {}",
            limits.max_tags,
            draft.tags.len()
        )));
    }
    for tag in &draft.tags {
        require_text("tag", tag, limits.max_tag_len)?;
    }
    Ok(())
}

fn require_text(field: &str, value: &str, max_len: usize) -> VaultResult<()> {
    if value.trim().is_empty() {
        return Err(VaultError::InvalidInput(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(VaultError::InvalidInput(format!(
            "{field} exceeds {max_len} characters"
        )));
    }
    Ok(())
}
