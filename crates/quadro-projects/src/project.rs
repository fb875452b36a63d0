//! Project aggregate and its participants.

use parking_lot::RwLock;
use quadro_core::{ProjectId, UserDto, UserId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A user enrolled in a project's realtime session.
///
/// Holds the participation token minted at enrollment and the live
/// subscription flag. The flag starts false and flips only through the
/// subscription protocol and the disconnect sweep; the token never changes
/// for the lifetime of the enrollment.
#[derive(Debug)]
pub struct Participant {
    user: UserDto,
    participation_token: String,
    subscribed: AtomicBool,
}

impl Participant {
    pub(crate) fn new(user: UserDto, participation_token: String) -> Self {
        Self {
            user,
            participation_token,
            subscribed: AtomicBool::new(false),
        }
    }

    /// The enrolled user.
    #[must_use]
    pub fn user(&self) -> &UserDto {
        &self.user
    }

    /// Key of the enrolled user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.user_id
    }

    /// The participation token minted at enrollment.
    #[must_use]
    pub fn participation_token(&self) -> &str {
        &self.participation_token
    }

    /// Whether a live connection has subscribed this participant.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    /// Flip the subscription flag.
    ///
    /// Called by the subscription protocol and the disconnect sweep only.
    pub fn set_subscribed(&self, subscribed: bool) {
        self.subscribed.store(subscribed, Ordering::SeqCst);
    }
}

/// A live project: its ID and the ordered participant list.
///
/// Content (cards, phases) lives in the persistence layer; the realtime
/// registry only needs the routing state.
#[derive(Debug)]
pub struct Project {
    project_id: ProjectId,
    members: RwLock<Vec<Arc<Participant>>>,
}

impl Project {
    pub(crate) fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            members: RwLock::new(Vec::new()),
        }
    }

    /// The project key.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Find a participant by user. Linear scan; member lists stay small.
    #[must_use]
    pub fn participant(&self, user_id: UserId) -> Option<Arc<Participant>> {
        self.members
            .read()
            .iter()
            .find(|m| m.user_id() == user_id)
            .cloned()
    }

    /// Find a participant by their participation token.
    #[must_use]
    pub fn participant_by_token(&self, token: &str) -> Option<Arc<Participant>> {
        self.members
            .read()
            .iter()
            .find(|m| m.participation_token() == token)
            .cloned()
    }

    /// Whether some subscribed participant's token matches the presented
    /// socket token. This is the router's authorization check.
    #[must_use]
    pub fn has_subscribed_holder(&self, socket_token: &str) -> bool {
        self.members
            .read()
            .iter()
            .any(|m| m.is_subscribed() && m.participation_token() == socket_token)
    }

    /// Number of enrolled participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.members.read().len()
    }

    /// Snapshot of the participant list, in enrollment order.
    #[must_use]
    pub fn participants(&self) -> Vec<Arc<Participant>> {
        self.members.read().clone()
    }

    /// Append unless a participant with the same user already exists.
    /// Returns whether the participant was added.
    pub(crate) fn enroll(&self, participant: Arc<Participant>) -> bool {
        let mut members = self.members.write();
        if members.iter().any(|m| m.user_id() == participant.user_id()) {
            return false;
        }
        members.push(participant);
        true
    }

    /// Remove a participant by user, returning it if present.
    pub(crate) fn remove(&self, user_id: UserId) -> Option<Arc<Participant>> {
        let mut members = self.members.write();
        let index = members.iter().position(|m| m.user_id() == user_id)?;
        Some(members.remove(index))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(user_id: i64, token: &str) -> Arc<Participant> {
        Arc::new(Participant::new(
            UserDto::new(user_id, format!("user-{user_id}")),
            token.to_owned(),
        ))
    }

    #[test]
    fn participants_start_unsubscribed() {
        let p = participant(7, "tok-7");
        assert!(!p.is_subscribed());
    }

    #[test]
    fn subscription_flag_flips() {
        let p = participant(7, "tok-7");
        p.set_subscribed(true);
        assert!(p.is_subscribed());
        p.set_subscribed(false);
        assert!(!p.is_subscribed());
    }

    #[test]
    fn enroll_rejects_duplicate_user() {
        let project = Project::new(ProjectId::new(42));
        assert!(project.enroll(participant(7, "tok-a")));
        assert!(!project.enroll(participant(7, "tok-b")));
        assert_eq!(project.participant_count(), 1);
    }

    #[test]
    fn participant_lookup_by_user() {
        let project = Project::new(ProjectId::new(42));
        let _ = project.enroll(participant(7, "tok-7"));
        let _ = project.enroll(participant(8, "tok-8"));

        let found = project.participant(UserId::new(8)).unwrap();
        assert_eq!(found.participation_token(), "tok-8");
        assert!(project.participant(UserId::new(9)).is_none());
    }

    #[test]
    fn participant_lookup_by_token() {
        let project = Project::new(ProjectId::new(42));
        let _ = project.enroll(participant(7, "tok-7"));

        assert!(project.participant_by_token("tok-7").is_some());
        assert!(project.participant_by_token("tok-x").is_none());
    }

    #[test]
    fn subscribed_holder_requires_both_flag_and_token_match() {
        let project = Project::new(ProjectId::new(42));
        let p = participant(7, "tok-7");
        let _ = project.enroll(p.clone());

        // Enrolled but never subscribed.
        assert!(!project.has_subscribed_holder("tok-7"));

        p.set_subscribed(true);
        assert!(project.has_subscribed_holder("tok-7"));
        // Subscribed, but the presented token belongs to no one.
        assert!(!project.has_subscribed_holder("tok-x"));
    }

    #[test]
    fn remove_returns_the_participant() {
        let project = Project::new(ProjectId::new(42));
        let _ = project.enroll(participant(7, "tok-7"));

        let removed = project.remove(UserId::new(7)).unwrap();
        assert_eq!(removed.user_id(), UserId::new(7));
        assert_eq!(project.participant_count(), 0);
        assert!(project.remove(UserId::new(7)).is_none());
    }

    #[test]
    fn participants_snapshot_keeps_enrollment_order() {
        let project = Project::new(ProjectId::new(42));
        let _ = project.enroll(participant(7, "tok-7"));
        let _ = project.enroll(participant(8, "tok-8"));

        let snapshot = project.participants();
        let ids: Vec<i64> = snapshot.iter().map(|p| p.user_id().value()).collect();
        assert_eq!(ids, vec![7, 8]);
    }
}
