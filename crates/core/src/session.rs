//! Patient session context establishment.
//!
//! Credential verification happens upstream; by the time this module runs,
//! the auth token is assumed verified. Establishment turns those
//! pre-verified inputs into a bounded-lifetime [`PatientSessionContext`],
//! failing closed if any mandatory input is empty.
//!
//! Session *identity* is deterministic: the id is a UUIDv5 digest of
//! `(tenant_id, patient_id)` under a fixed namespace, so repeated
//! establishment for the same patient yields the same session id. The
//! timestamps are time-of-call; only the identity is idempotent.

use crate::audit::{AuditEvent, AuditKind, AuditOutcome, AuditSink};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::constants::SESSION_ID_NAMESPACE;
use crate::error::SessionError;
use crate::gate::{ActorIdentity, ActorType, ConsentProof, RawActorIdentity, RawGateRequest};
use chrono::{DateTime, Utc};
use recordgate_types::{ActorId, PatientId, TenantId};
use std::sync::Arc;
use uuid::Uuid;

/// Lifetime window of a session. `expires_at` is strictly after
/// `issued_at`; construction enforces it because the TTL in
/// [`CoreConfig`] is validated strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionMetadata {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_verified_at: DateTime<Utc>,
}

/// A bounded-lifetime patient session context.
///
/// Sessions expire passively; there is no explicit destroy operation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatientSessionContext {
    pub session_id: Uuid,
    pub actor: ActorIdentity,
    pub metadata: SessionMetadata,
    pub consent_proof: Option<ConsentProof>,
}

impl PatientSessionContext {
    /// Whether the session is still inside its lifetime window.
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.metadata.issued_at && instant < self.metadata.expires_at
    }
}

/// Raw establishment inputs, as received from the boundary.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EstablishSessionInput {
    /// Already verified upstream; never stored, never logged.
    pub auth_token: String,
    pub tenant_id: String,
    pub patient_id: String,
    pub consent_proof: Option<ConsentProof>,
}

/// Builds patient session contexts from pre-verified credentials.
pub struct SessionContextEstablisher {
    cfg: Arc<CoreConfig>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl SessionContextEstablisher {
    pub fn new(cfg: Arc<CoreConfig>, clock: Arc<dyn Clock>, audit: Arc<dyn AuditSink>) -> Self {
        Self { cfg, clock, audit }
    }

    /// Establish a patient session context.
    ///
    /// Fails closed with [`SessionError::MissingMandatoryFields`] if any of
    /// the auth token, tenant id, or patient id is empty — no partial
    /// context is ever constructed. A metadata-only audit signal is emitted
    /// on both the success and the failure path; it records the actor type,
    /// tenant, and outcome, never token contents.
    pub fn establish(
        &self,
        input: EstablishSessionInput,
    ) -> Result<PatientSessionContext, SessionError> {
        let now = self.clock.now();

        let result = self.build(&input, now);
        match &result {
            Ok(session) => {
                let mut event =
                    AuditEvent::new(AuditKind::SessionEstablished, AuditOutcome::Allowed, now);
                event.tenant_id = Some(session.actor.tenant_id.as_str().to_owned());
                event.actor_type = Some(ActorType::Patient.as_str().to_owned());
                event.decision_id = Some(session.session_id.simple().to_string());
                self.audit.emit(event);
            }
            Err(error) => {
                tracing::debug!(error = %error, "session establishment failed closed");
                let mut event =
                    AuditEvent::new(AuditKind::SessionRejected, AuditOutcome::Denied, now);
                event.tenant_id = non_blank(&input.tenant_id).map(str::to_owned);
                event.actor_type = Some(ActorType::Patient.as_str().to_owned());
                self.audit.emit(event);
            }
        }
        result
    }

    fn build(
        &self,
        input: &EstablishSessionInput,
        now: DateTime<Utc>,
    ) -> Result<PatientSessionContext, SessionError> {
        if non_blank(&input.auth_token).is_none()
            || non_blank(&input.tenant_id).is_none()
            || non_blank(&input.patient_id).is_none()
        {
            return Err(SessionError::MissingMandatoryFields);
        }

        let tenant_id = TenantId::parse(&input.tenant_id)?;
        let patient_id = PatientId::parse(&input.patient_id)?;
        let actor_id = ActorId::parse(&input.patient_id)?;

        let session_id = derive_session_id(&tenant_id, &patient_id);

        Ok(PatientSessionContext {
            session_id,
            actor: ActorIdentity {
                id: actor_id,
                actor_type: ActorType::Patient,
                tenant_id,
                role: None,
            },
            metadata: SessionMetadata {
                issued_at: now,
                expires_at: now + self.cfg.session_ttl(),
                last_verified_at: now,
            },
            consent_proof: input.consent_proof.clone(),
        })
    }
}

/// Deterministic session identity for `(tenant, patient)`.
pub fn derive_session_id(tenant_id: &TenantId, patient_id: &PatientId) -> Uuid {
    let name = format!("{}/{}", tenant_id, patient_id);
    Uuid::new_v5(&SESSION_ID_NAMESPACE, name.as_bytes())
}

/// Projects a session context into a gate request: the wiring seam between
/// session establishment and the access-decision gate.
///
/// Defaults the actor role to `"patient"` and the purpose to
/// `PatientRequest` unless overridden.
pub fn gate_request_from_session(
    session: &PatientSessionContext,
    purpose: Option<crate::gate::AccessPurpose>,
) -> RawGateRequest {
    let purpose = purpose.unwrap_or(crate::gate::AccessPurpose::PatientRequest);
    RawGateRequest {
        actor: Some(RawActorIdentity {
            id: Some(session.actor.id.as_str().to_owned()),
            actor_type: Some(session.actor.actor_type.as_str().to_owned()),
            tenant_id: Some(session.actor.tenant_id.as_str().to_owned()),
            role: Some(
                session
                    .actor
                    .role
                    .clone()
                    .unwrap_or_else(|| "patient".to_owned()),
            ),
        }),
        tenant_id: Some(session.actor.tenant_id.as_str().to_owned()),
        target_patient_id: Some(session.actor.id.as_str().to_owned()),
        purpose: Some(purpose.as_str().to_owned()),
        consent_proof: session.consent_proof.clone(),
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
