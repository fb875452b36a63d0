//! Durable membership relationships.
//!
//! A `MembershipRecord` is the durable fact that a user belongs to a project.
//! It is necessary but not sufficient for routed delivery: the router checks
//! the live subscribed flag, not this collection. The backing collection is
//! owned by the wider application, so it sits behind a store trait here.

use parking_lot::RwLock;
use quadro_core::{ProjectId, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A (user, project) membership pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    /// The member.
    pub user_id: UserId,
    /// The project they belong to.
    pub project_id: ProjectId,
}

impl MembershipRecord {
    /// Build a record from its keys.
    #[must_use]
    pub fn new(user_id: impl Into<UserId>, project_id: impl Into<ProjectId>) -> Self {
        Self {
            user_id: user_id.into(),
            project_id: project_id.into(),
        }
    }
}

/// Backing collection for membership records.
///
/// Implementations decide durability; the service layer only assumes set
/// semantics over (`userId`, `projectId`) pairs.
#[cfg_attr(test, mockall::automock)]
pub trait MembershipStore: Send + Sync {
    /// Append a record. Returns false when the exact pair already exists.
    fn insert(&self, record: MembershipRecord) -> bool;

    /// Remove every record matching the pair, returning how many went away.
    fn remove(&self, user_id: UserId, project_id: ProjectId) -> usize;

    /// All records for a project.
    fn for_project(&self, project_id: ProjectId) -> Vec<MembershipRecord>;

    /// All records for a user.
    fn for_user(&self, user_id: UserId) -> Vec<MembershipRecord>;

    /// Whether the exact pair exists.
    fn contains(&self, user_id: UserId, project_id: ProjectId) -> bool;
}

/// Vec-backed store for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    records: RwLock<Vec<MembershipRecord>>,
}

impl InMemoryMembershipStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipStore for InMemoryMembershipStore {
    fn insert(&self, record: MembershipRecord) -> bool {
        let mut records = self.records.write();
        if records.contains(&record) {
            return false;
        }
        records.push(record);
        true
    }

    fn remove(&self, user_id: UserId, project_id: ProjectId) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| !(r.user_id == user_id && r.project_id == project_id));
        before - records.len()
    }

    fn for_project(&self, project_id: ProjectId) -> Vec<MembershipRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect()
    }

    fn for_user(&self, user_id: UserId) -> Vec<MembershipRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    fn contains(&self, user_id: UserId, project_id: ProjectId) -> bool {
        self.records
            .read()
            .iter()
            .any(|r| r.user_id == user_id && r.project_id == project_id)
    }
}

/// Relationship operations over the membership collection.
pub struct MembershipService {
    store: Arc<dyn MembershipStore>,
}

impl MembershipService {
    /// Wrap a backing store.
    #[must_use]
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self { store }
    }

    /// Record that a user is a member of a project.
    ///
    /// No-op returning false when the pair already exists, preserving
    /// (`userId`, `projectId`) uniqueness.
    pub fn add_user_as_member_of_project(
        &self,
        user_id: impl Into<UserId>,
        project_id: impl Into<ProjectId>,
    ) -> bool {
        let (user_id, project_id) = (user_id.into(), project_id.into());
        if self.store.contains(user_id, project_id) {
            return false;
        }
        let added = self.store.insert(MembershipRecord::new(user_id, project_id));
        if added {
            debug!(%user_id, %project_id, "membership recorded");
        }
        added
    }

    /// Delete every record tying the user to the project.
    pub fn remove_user_from_members_of_project(
        &self,
        user_id: impl Into<UserId>,
        project_id: impl Into<ProjectId>,
    ) -> usize {
        let (user_id, project_id) = (user_id.into(), project_id.into());
        let removed = self.store.remove(user_id, project_id);
        if removed > 0 {
            debug!(%user_id, %project_id, removed, "membership removed");
        }
        removed
    }

    /// Records of everyone belonging to the project.
    #[must_use]
    pub fn members_of_project(&self, project_id: impl Into<ProjectId>) -> Vec<MembershipRecord> {
        self.store.for_project(project_id.into())
    }

    /// Records of every project the user belongs to.
    #[must_use]
    pub fn projects_of_user(&self, user_id: impl Into<UserId>) -> Vec<MembershipRecord> {
        self.store.for_user(user_id.into())
    }

    /// Whether the user belongs to the project.
    #[must_use]
    pub fn is_user_member_of_project(
        &self,
        user_id: impl Into<UserId>,
        project_id: impl Into<ProjectId>,
    ) -> bool {
        self.store.contains(user_id.into(), project_id.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
