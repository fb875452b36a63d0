//! In-memory project registry and participant lifecycle.

use crate::errors::DirectoryError;
use crate::membership::MembershipService;
use crate::project::{Participant, Project};
use dashmap::DashMap;
use quadro_core::{ProjectId, UserDto, UserId};
use quadro_session::TokenService;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result of enrolling a user into a project.
pub struct AddParticipantOutcome {
    /// Whether a new participant was created.
    pub created: bool,
    /// The minted participation token; only present when `created`.
    pub participation_token: Option<String>,
}

/// Registry of live projects, keyed by project ID.
///
/// Projects are created lazily the first time a participant is enrolled and
/// live for the process lifetime. Lookups never create.
pub struct ProjectDirectory {
    projects: DashMap<ProjectId, Arc<Project>>,
    tokens: Arc<TokenService>,
    membership: Arc<MembershipService>,
}

impl ProjectDirectory {
    /// Build a directory around the token and membership services.
    #[must_use]
    pub fn new(tokens: Arc<TokenService>, membership: Arc<MembershipService>) -> Self {
        Self {
            projects: DashMap::new(),
            tokens,
            membership,
        }
    }

    /// Look up a live project. Never creates.
    #[must_use]
    pub fn project(&self, project_id: ProjectId) -> Option<Arc<Project>> {
        self.projects.get(&project_id).map(|p| p.clone())
    }

    /// Enroll a user as a participant of a project.
    ///
    /// Creates the project on first contact. If the user is already enrolled
    /// this is a no-op: `created == false`, no token, nothing mutated.
    /// Otherwise a participation token binding (user, project) is minted, an
    /// unsubscribed participant is appended, and the durable membership
    /// record is written.
    #[instrument(skip(self, user), fields(user_id = %user.user_id, %project_id))]
    pub fn add_participant(
        &self,
        user: UserDto,
        project_id: ProjectId,
    ) -> Result<AddParticipantOutcome, DirectoryError> {
        let project = self
            .projects
            .entry(project_id)
            .or_insert_with(|| Arc::new(Project::new(project_id)))
            .clone();

        let user_id = user.user_id;
        if project.participant(user_id).is_some() {
            debug!("participant already enrolled");
            return Ok(AddParticipantOutcome {
                created: false,
                participation_token: None,
            });
        }

        let token = self.tokens.issue_participation(user_id, project_id)?;
        if !project.enroll(Arc::new(Participant::new(user, token.clone()))) {
            // Lost a race with a concurrent enrollment of the same user.
            return Ok(AddParticipantOutcome {
                created: false,
                participation_token: None,
            });
        }

        let _ = self.membership.add_user_as_member_of_project(user_id, project_id);
        debug!("participant enrolled");
        Ok(AddParticipantOutcome {
            created: true,
            participation_token: Some(token),
        })
    }

    /// Remove a participant, revoking their token and deleting the durable
    /// membership record.
    ///
    /// Returns the removed participant with the subscribed flag as it was,
    /// so callers can settle any live subscription accounting. Absent
    /// participants and unknown projects are a no-op returning `None`.
    #[instrument(skip(self))]
    pub fn remove_participant(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Option<Arc<Participant>> {
        let project = self.project(project_id)?;
        let removed = project.remove(user_id)?;

        self.tokens.revoke(removed.participation_token());
        let _ = self
            .membership
            .remove_user_from_members_of_project(user_id, project_id);
        debug!(was_subscribed = removed.is_subscribed(), "participant removed");
        Some(removed)
    }

    /// Find a participant of a project. Linear scan through the member list.
    #[must_use]
    pub fn participant(&self, project_id: ProjectId, user_id: UserId) -> Option<Arc<Participant>> {
        self.project(project_id)?.participant(user_id)
    }

    /// Sweep a departing connection out of the subscription state.
    ///
    /// Every participant whose stored token equals the departing socket token
    /// is flipped back to unsubscribed. Returns the affected projects so the
    /// gateway can drop the matching room entries. Membership records and
    /// tokens are untouched; a reconnecting client just subscribes again.
    pub fn mark_disconnected(&self, socket_token: &str) -> Vec<ProjectId> {
        let mut affected = Vec::new();
        for entry in &self.projects {
            if let Some(participant) = entry.value().participant_by_token(socket_token) {
                if participant.is_subscribed() {
                    participant.set_subscribed(false);
                    affected.push(*entry.key());
                }
            }
        }
        if !affected.is_empty() {
            debug!(projects = affected.len(), "connection swept from subscriptions");
        }
        affected
    }

    /// Number of live projects.
    #[must_use]
    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    /// Total subscribed participants across all projects.
    #[must_use]
    pub fn subscribed_count(&self) -> usize {
        self.projects
            .iter()
            .map(|entry| {
                entry
                    .value()
                    .participants()
                    .iter()
                    .filter(|p| p.is_subscribed())
                    .count()
            })
            .sum()
    }

    /// The membership service backing this directory.
    #[must_use]
    pub fn membership(&self) -> &Arc<MembershipService> {
        &self.membership
    }

    /// The token service backing this directory.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
