//! Event-dispatch error taxonomy.
//!
//! Everything here is non-fatal: the router converts these into an
//! `error {message}` signal sent only to the initiating connection. The
//! messages are the exact strings the web client matches on.

use thiserror::Error;

/// Failure raised while authorizing or running a registered event handler.
#[derive(Debug, Error)]
pub enum EventError {
    /// The event payload carries no usable `projectId`.
    #[error("event payload missing projectId")]
    MissingProjectId,

    /// No live project with the requested id.
    #[error("project not found")]
    ProjectNotFound,

    /// The connection holds no subscribed participant in the project.
    #[error("connection is not a subscribed project member")]
    NotProjectMember,

    /// The socket token resolves to no participant of the project.
    #[error("user not found in project")]
    UserNotFound,

    /// A feature handler failed; its message is forwarded as-is.
    #[error("{message}")]
    Handler {
        /// Client-visible description from the handler.
        message: String,
    },
}

impl EventError {
    /// Build a handler failure with a client-visible message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Message carried by the `error` signal.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingProjectId => r#""projectId" não informado."#.to_owned(),
            Self::ProjectNotFound => "Projeto não encontrado.".to_owned(),
            Self::NotProjectMember => "Você não é membro deste projeto.".to_owned(),
            Self::UserNotFound => "Usuário não encontrado.".to_owned(),
            Self::Handler { message } => message.clone(),
        }
    }

    /// Stable label for the error counter.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::MissingProjectId => "missing_project_id",
            Self::ProjectNotFound => "project_not_found",
            Self::NotProjectMember => "not_project_member",
            Self::UserNotFound => "user_not_found",
            Self::Handler { .. } => "handler",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_match_the_web_client() {
        assert_eq!(
            EventError::MissingProjectId.client_message(),
            r#""projectId" não informado."#
        );
        assert_eq!(
            EventError::ProjectNotFound.client_message(),
            "Projeto não encontrado."
        );
        assert_eq!(
            EventError::NotProjectMember.client_message(),
            "Você não é membro deste projeto."
        );
        assert_eq!(
            EventError::UserNotFound.client_message(),
            "Usuário não encontrado."
        );
    }

    #[test]
    fn handler_errors_forward_their_own_message() {
        let err = EventError::handler(r#""message" não informado."#);
        assert_eq!(err.client_message(), r#""message" não informado."#);
        assert_eq!(err.metric_label(), "handler");
    }

    #[test]
    fn metric_labels_are_snake_case() {
        let errors = [
            EventError::MissingProjectId,
            EventError::ProjectNotFound,
            EventError::NotProjectMember,
            EventError::UserNotFound,
            EventError::handler("x"),
        ];
        for err in errors {
            assert!(
                err.metric_label()
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '_')
            );
        }
    }
}
