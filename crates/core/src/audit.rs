//! Metadata-only audit signals.
//!
//! An audit signal records *that* a decision happened, never *what* the
//! protected content was. [`AuditEvent`] has no field that could carry
//! clinical content or token material; everything it holds is an opaque
//! identifier, an enum, or a timestamp. Keeping the type closed this way is
//! the PHI guarantee: a sink cannot leak what the event cannot hold.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// What kind of decision or transition the event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AuditKind {
    /// An access-gate decision (allow or internal error only; ordinary
    /// denials are intentionally not audited).
    AccessDecision,
    /// A patient session context was established.
    SessionEstablished,
    /// Session establishment failed closed.
    SessionRejected,
    /// A signed clinical note was read through the guarded read path.
    NoteRead,
}

/// Outcome recorded with the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AuditOutcome {
    Allowed,
    Denied,
    /// An unanticipated internal condition. Audited precisely because it is
    /// worth investigating, unlike ordinary denials.
    Error,
}

/// A single structured, PHI-free decision record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub outcome: AuditOutcome,
    pub occurred_at: DateTime<Utc>,
    pub decision_id: Option<String>,
    pub tenant_id: Option<String>,
    pub actor_type: Option<String>,
    pub actor_id: Option<String>,
    pub patient_id: Option<String>,
    pub note_id: Option<String>,
    pub correlation_id: Option<String>,
    pub purpose: Option<String>,
}

impl AuditEvent {
    /// A bare event of the given kind and outcome; callers fill in the
    /// identifiers they hold.
    pub fn new(kind: AuditKind, outcome: AuditOutcome, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            outcome,
            occurred_at,
            decision_id: None,
            tenant_id: None,
            actor_type: None,
            actor_id: None,
            patient_id: None,
            note_id: None,
            correlation_id: None,
            purpose: None,
        }
    }
}

/// Sink accepting structured audit records.
///
/// Emission is infallible from the caller's point of view: a sink that loses
/// an event must handle that internally rather than fail the decision that
/// produced it.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Production sink logging structured `tracing` events at `info`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::info!(
            kind = ?event.kind,
            outcome = ?event.outcome,
            occurred_at = %event.occurred_at.to_rfc3339(),
            decision_id = event.decision_id.as_deref().unwrap_or("-"),
            tenant_id = event.tenant_id.as_deref().unwrap_or("-"),
            actor_type = event.actor_type.as_deref().unwrap_or("-"),
            actor_id = event.actor_id.as_deref().unwrap_or("-"),
            patient_id = event.patient_id.as_deref().unwrap_or("-"),
            note_id = event.note_id.as_deref().unwrap_or("-"),
            correlation_id = event.correlation_id.as_deref().unwrap_or("-"),
            purpose = event.purpose.as_deref().unwrap_or("-"),
            "audit"
        );
    }
}

/// Recording sink for tests and embedders that need to assert on emissions.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far, in order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .expect("MemoryAuditSink mutex poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .expect("MemoryAuditSink mutex poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events
            .lock()
            .expect("MemoryAuditSink mutex poisoned")
            .push(event);
    }
}
