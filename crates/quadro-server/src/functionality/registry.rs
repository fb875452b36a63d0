//! Event registry and guarded dispatch.
//!
//! Feature modules never see raw socket events. They register named handlers
//! here and the dispatch path enforces, for every guarded registration, that
//! the payload names a live project and that the requesting connection holds
//! a subscribed participant's token — before the handler runs, with no await
//! between the check and the invocation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use quadro_projects::Project;
use serde_json::Value;
use tracing::warn;

use super::context::EventContext;
use super::errors::EventError;
use super::types::project_id_field;
use crate::metrics::{EVENT_DISPATCH_DURATION_SECONDS, EVENT_ERRORS_TOTAL, EVENTS_DISPATCHED_TOTAL};
use crate::websocket::connection::ClientConnection;

/// A guarded handler: runs only for subscribed members of a live project.
#[async_trait]
pub trait ProjectHandler: Send + Sync {
    /// Execute with the resolved project and the authorized connection.
    async fn handle(
        &self,
        project: Arc<Project>,
        conn: &Arc<ClientConnection>,
        data: Value,
        ctx: &EventContext,
    ) -> Result<(), EventError>;
}

/// An authenticateless handler: invoked directly, no project checks.
///
/// Reserved for bootstrap events like the subscription handshake, which must
/// run before any subscription state exists.
#[async_trait]
pub trait OpenHandler: Send + Sync {
    /// Execute with the raw payload.
    async fn handle(
        &self,
        conn: &Arc<ClientConnection>,
        data: Value,
        ctx: &EventContext,
    ) -> Result<(), EventError>;
}

/// A registered entry point.
pub enum Registration {
    /// Wrapped by the membership/subscription guard chain.
    Guarded(Arc<dyn ProjectHandler>),
    /// Invoked directly.
    Open(Arc<dyn OpenHandler>),
}

/// Outcome of dispatching one client event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The handler ran and succeeded.
    Completed,
    /// No handler is registered under this name; the frame is dropped.
    UnknownEvent,
    /// Authorization failed or the handler returned an error.
    Rejected(EventError),
}

/// Registry mapping event names to handlers.
///
/// Populated once at startup through [`crate::functionality::handlers::register_all`];
/// dispatch is by name lookup only.
pub struct EventRegistry {
    handlers: HashMap<String, Registration>,
}

impl EventRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a guarded handler. Re-registering a name replaces the
    /// previous entry.
    pub fn register_guarded(&mut self, event: &str, handler: impl ProjectHandler + 'static) {
        if self
            .handlers
            .insert(event.to_owned(), Registration::Guarded(Arc::new(handler)))
            .is_some()
        {
            warn!(event, "event handler replaced");
        }
    }

    /// Register an authenticateless handler. Re-registering a name replaces
    /// the previous entry.
    pub fn register_open(&mut self, event: &str, handler: impl OpenHandler + 'static) {
        if self
            .handlers
            .insert(event.to_owned(), Registration::Open(Arc::new(handler)))
            .is_some()
        {
            warn!(event, "event handler replaced");
        }
    }

    /// Whether an event name is registered.
    #[must_use]
    pub fn has_event(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// All registered event names (sorted).
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Dispatch a client event.
    ///
    /// For guarded registrations the checks run strictly before the handler:
    /// a rejection leaves the registry, the project, and the rooms untouched.
    pub async fn dispatch(
        &self,
        event: &str,
        conn: &Arc<ClientConnection>,
        data: Value,
        ctx: &EventContext,
    ) -> DispatchOutcome {
        let Some(registration) = self.handlers.get(event) else {
            return DispatchOutcome::UnknownEvent;
        };
        counter!(EVENTS_DISPATCHED_TOTAL, "event" => event.to_owned()).increment(1);

        let start = Instant::now();
        let result = match registration {
            Registration::Open(handler) => handler.handle(conn, data, ctx).await,
            Registration::Guarded(handler) => match authorize(&data, conn, ctx) {
                Ok(project) => handler.handle(project, conn, data, ctx).await,
                Err(err) => Err(err),
            },
        };

        let duration = start.elapsed();
        histogram!(EVENT_DISPATCH_DURATION_SECONDS, "event" => event.to_owned())
            .record(duration.as_secs_f64());
        if duration.as_secs() >= 5 {
            warn!(event, duration_secs = duration.as_secs_f64(), "slow event dispatch");
        }

        match result {
            Ok(()) => DispatchOutcome::Completed,
            Err(err) => {
                counter!(
                    EVENT_ERRORS_TOTAL,
                    "event" => event.to_owned(),
                    "error" => err.metric_label()
                )
                .increment(1);
                DispatchOutcome::Rejected(err)
            }
        }
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The guard chain applied before every guarded handler.
///
/// Ordering matters: payload shape, then project existence, then the
/// subscribed-holder check. A durable membership record is not consulted
/// here — only a live subscribed participant whose stored token equals the
/// connection's socket token authorizes the event.
fn authorize(
    data: &Value,
    conn: &Arc<ClientConnection>,
    ctx: &EventContext,
) -> Result<Arc<Project>, EventError> {
    let project_id = project_id_field(data).ok_or(EventError::MissingProjectId)?;
    let project = ctx
        .directory
        .project(project_id)
        .ok_or(EventError::ProjectNotFound)?;
    if !project.has_subscribed_holder(conn.context().socket_token()) {
        return Err(EventError::NotProjectMember);
    }
    Ok(project)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
