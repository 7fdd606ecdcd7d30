//! The access-decision gate.
//!
//! [`AccessDecisionGate::evaluate`] is a pure, synchronous, total decision
//! function: given one immutable request it returns `Allow` or
//! `Deny(reason)`, and it never panics across its boundary — any internal
//! failure is reclassified as `Deny(InternalError)`.
//!
//! The checks are ordered and short-circuiting; the first failing check
//! wins. Any missing, malformed, or ambiguous input denies (fail-closed).
//!
//! Audit behaviour is intentionally asymmetric: the `Allow` branch and the
//! internal-error branch emit one audit signal each, ordinary denials do
//! not. Callers that need a full trail of denials must log at the boundary.

use crate::audit::{AuditEvent, AuditKind, AuditOutcome, AuditSink};
use crate::clock::{Clock, IdSource};
use crate::error::GateError;
use chrono::{DateTime, Utc};
use recordgate_types::{ActorId, PatientId, TenantId};
use std::str::FromStr;
use std::sync::Arc;

/// The kind of identity attempting an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ActorType {
    Patient,
    Representative,
    Clinician,
    Service,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::Patient => "Patient",
            ActorType::Representative => "Representative",
            ActorType::Clinician => "Clinician",
            ActorType::Service => "Service",
        }
    }
}

impl FromStr for ActorType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(ActorType::Patient),
            "representative" => Ok(ActorType::Representative),
            "clinician" => Ok(ActorType::Clinician),
            "service" => Ok(ActorType::Service),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ActorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumerated reason for touching patient data.
///
/// A consent check requires the same purpose on both sides: the request and
/// the consent proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AccessPurpose {
    Treatment,
    Payment,
    Operations,
    Research,
    Marketing,
    Emergency,
    PatientRequest,
}

impl AccessPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPurpose::Treatment => "Treatment",
            AccessPurpose::Payment => "Payment",
            AccessPurpose::Operations => "Operations",
            AccessPurpose::Research => "Research",
            AccessPurpose::Marketing => "Marketing",
            AccessPurpose::Emergency => "Emergency",
            AccessPurpose::PatientRequest => "PatientRequest",
        }
    }
}

impl FromStr for AccessPurpose {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Treatment" => Ok(AccessPurpose::Treatment),
            "Payment" => Ok(AccessPurpose::Payment),
            "Operations" => Ok(AccessPurpose::Operations),
            "Research" => Ok(AccessPurpose::Research),
            "Marketing" => Ok(AccessPurpose::Marketing),
            "Emergency" => Ok(AccessPurpose::Emergency),
            "PatientRequest" => Ok(AccessPurpose::PatientRequest),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for AccessPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time-bounded, purpose-bound assertion that a non-owning actor may
/// access a patient's data.
///
/// The gate checks *structural* validity only: patient match, purpose match,
/// not expired. Cryptographic verification of `signature` is an upstream
/// collaborator's job and the value is treated as opaque here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConsentProof {
    pub signature: String,
    pub valid_until: DateTime<Utc>,
    pub patient_id: PatientId,
    pub purpose: AccessPurpose,
}

/// Unvalidated actor fields as the boundary received them.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RawActorIdentity {
    pub id: Option<String>,
    pub actor_type: Option<String>,
    pub tenant_id: Option<String>,
    pub role: Option<String>,
}

/// One immutable gate request, constructed once per decision at the
/// boundary.
///
/// Fields are optional because *presence* is the gate's first check; a
/// boundary that pre-validated everything would make the fail-closed
/// behaviour untestable.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RawGateRequest {
    pub actor: Option<RawActorIdentity>,
    pub tenant_id: Option<String>,
    pub target_patient_id: Option<String>,
    pub purpose: Option<String>,
    pub consent_proof: Option<ConsentProof>,
}

/// A validated actor identity.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActorIdentity {
    pub id: ActorId,
    pub actor_type: ActorType,
    pub tenant_id: TenantId,
    pub role: Option<String>,
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DenyReason {
    /// Actor, tenant, target patient, or purpose absent.
    MissingIdentity,
    /// Actor fields (or a supplied identifier) present but malformed.
    IdentityInvalid,
    /// The actor's tenant differs from the request tenant. Unconditional;
    /// no actor type bypasses this.
    TenantMismatch,
    /// A patient actor may only ever access their own identifier; also
    /// raised when a consent proof names a different patient.
    PatientMismatch,
    /// A non-owning actor supplied no consent proof.
    ConsentMissing,
    /// The consent proof has expired.
    ConsentInvalid,
    /// The purpose is unknown, or the proof's purpose differs from the
    /// request's.
    InvalidPurpose,
    /// Reserved for callers that detect mutually contradictory request
    /// state; the gate itself resolves a contradiction to the first
    /// failing ordered check instead.
    AmbiguousState,
    /// An unanticipated internal condition. The only denial that is
    /// audited.
    InternalError,
}

/// PHI-free metadata attached to every decision.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DecisionMetadata {
    /// Present on audited decisions (allow and internal error).
    pub decision_id: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub actor_type: Option<ActorType>,
    pub actor_id: Option<String>,
    pub tenant_id: Option<String>,
    pub target_patient_id: Option<String>,
    pub purpose: Option<AccessPurpose>,
}

/// The gate's verdict: a tagged union, computed and audited but never
/// stored as an entity.
#[derive(Debug, Clone, serde::Serialize)]
pub enum GateDecision {
    Allow {
        justification: String,
        metadata: DecisionMetadata,
    },
    Deny {
        reason: DenyReason,
        metadata: DecisionMetadata,
    },
}

impl GateDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, GateDecision::Allow { .. })
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            GateDecision::Allow { .. } => None,
            GateDecision::Deny { reason, .. } => Some(*reason),
        }
    }

    pub fn metadata(&self) -> &DecisionMetadata {
        match self {
            GateDecision::Allow { metadata, .. } | GateDecision::Deny { metadata, .. } => metadata,
        }
    }
}

/// The deterministic authorisation gate.
///
/// Holds no shared mutable state; the clock and identifier source are
/// injected so decisions are reproducible.
pub struct AccessDecisionGate {
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    audit: Arc<dyn AuditSink>,
}

impl AccessDecisionGate {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdSource>, audit: Arc<dyn AuditSink>) -> Self {
        Self { clock, ids, audit }
    }

    /// Evaluate one request. Total: never panics to the caller, never
    /// performs I/O beyond the optional audit emission.
    pub fn evaluate(&self, request: &RawGateRequest) -> GateDecision {
        let now = self.clock.now();
        match self.check(request, now) {
            Ok(decision) => {
                match &decision {
                    GateDecision::Allow { metadata, .. } => {
                        self.audit.emit(allow_audit_event(metadata, now));
                    }
                    GateDecision::Deny { reason, .. } => {
                        // Ordinary denials are telemetry, not audit.
                        tracing::debug!(reason = ?reason, "gate denied request");
                    }
                }
                decision
            }
            Err(error) => {
                tracing::error!(error = %error, "gate evaluation failed internally");
                let metadata = base_metadata(request, now);
                let mut event =
                    AuditEvent::new(AuditKind::AccessDecision, AuditOutcome::Error, now);
                event.tenant_id = metadata.tenant_id.clone();
                event.actor_type = metadata.actor_type.map(|t| t.as_str().to_owned());
                event.actor_id = metadata.actor_id.clone();
                event.patient_id = metadata.target_patient_id.clone();
                event.purpose = metadata.purpose.map(|p| p.as_str().to_owned());
                self.audit.emit(event);
                GateDecision::Deny {
                    reason: DenyReason::InternalError,
                    metadata,
                }
            }
        }
    }

    /// The fallible inner evaluation. A returned `Err` means the gate
    /// itself broke, not that the request was denied.
    fn check(
        &self,
        request: &RawGateRequest,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, GateError> {
        let deny = |reason: DenyReason| {
            Ok(GateDecision::Deny {
                reason,
                metadata: base_metadata(request, now),
            })
        };

        // 1. Presence.
        let Some(actor) = request.actor.as_ref() else {
            return deny(DenyReason::MissingIdentity);
        };
        let Some(tenant_raw) = non_blank(request.tenant_id.as_deref()) else {
            return deny(DenyReason::MissingIdentity);
        };
        let Some(target_raw) = non_blank(request.target_patient_id.as_deref()) else {
            return deny(DenyReason::MissingIdentity);
        };
        let Some(purpose_raw) = non_blank(request.purpose.as_deref()) else {
            return deny(DenyReason::MissingIdentity);
        };

        // 2. Identity validity.
        let Some(actor_id_raw) = non_blank(actor.id.as_deref()) else {
            return deny(DenyReason::IdentityInvalid);
        };
        let Ok(actor_id) = ActorId::parse(actor_id_raw) else {
            return deny(DenyReason::IdentityInvalid);
        };
        let Some(actor_type) = actor
            .actor_type
            .as_deref()
            .and_then(|s| ActorType::from_str(s).ok())
        else {
            return deny(DenyReason::IdentityInvalid);
        };
        let Some(actor_tenant) = actor
            .tenant_id
            .as_deref()
            .and_then(|s| TenantId::parse(s).ok())
        else {
            return deny(DenyReason::IdentityInvalid);
        };

        // Request-level identifiers present but malformed are invalid, not
        // missing.
        let Ok(tenant) = TenantId::parse(tenant_raw) else {
            return deny(DenyReason::IdentityInvalid);
        };
        let Ok(target) = PatientId::parse(target_raw) else {
            return deny(DenyReason::IdentityInvalid);
        };
        // 3. Tenant isolation. Unconditional for every actor type, and it
        // outranks purpose handling: a cross-tenant request denies as a
        // tenant mismatch even when the purpose string is unrecognised.
        if actor_tenant != tenant {
            return deny(DenyReason::TenantMismatch);
        }

        // 4. Self-scope: a patient actor only reaches their own identifier.
        if actor_type == ActorType::Patient && actor_id.as_str() != target.as_str() {
            return deny(DenyReason::PatientMismatch);
        }

        // 5. Purpose.
        let Ok(purpose) = AccessPurpose::from_str(purpose_raw) else {
            return deny(DenyReason::InvalidPurpose);
        };

        // 6. Consent: mandatory for every actor that is not the patient
        // accessing their own data.
        if actor_type != ActorType::Patient {
            let Some(proof) = request.consent_proof.as_ref() else {
                return deny(DenyReason::ConsentMissing);
            };
            if proof.patient_id != target {
                return deny(DenyReason::PatientMismatch);
            }
            if proof.purpose != purpose {
                return deny(DenyReason::InvalidPurpose);
            }
            if proof.valid_until < now {
                return deny(DenyReason::ConsentInvalid);
            }
        }

        // 7. Allow.
        let decision_id = self.ids.next_id()?;
        let justification = if actor_type == ActorType::Patient {
            "patient accessing their own record".to_owned()
        } else {
            format!(
                "{} holds valid consent for purpose {}",
                actor_type, purpose
            )
        };

        Ok(GateDecision::Allow {
            justification,
            metadata: DecisionMetadata {
                decision_id: Some(decision_id),
                decided_at: Some(now),
                actor_type: Some(actor_type),
                actor_id: Some(actor_id.as_str().to_owned()),
                tenant_id: Some(tenant.as_str().to_owned()),
                target_patient_id: Some(target.as_str().to_owned()),
                purpose: Some(purpose),
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Best-effort metadata for denials: whatever identifiers were legible,
/// never clinical content.
fn base_metadata(request: &RawGateRequest, now: DateTime<Utc>) -> DecisionMetadata {
    let actor = request.actor.as_ref();
    DecisionMetadata {
        decision_id: None,
        decided_at: Some(now),
        actor_type: actor
            .and_then(|a| a.actor_type.as_deref())
            .and_then(|s| ActorType::from_str(s).ok()),
        actor_id: actor.and_then(|a| non_blank(a.id.as_deref())).map(str::to_owned),
        tenant_id: non_blank(request.tenant_id.as_deref()).map(str::to_owned),
        target_patient_id: non_blank(request.target_patient_id.as_deref()).map(str::to_owned),
        purpose: request
            .purpose
            .as_deref()
            .and_then(|s| AccessPurpose::from_str(s).ok()),
    }
}

fn allow_audit_event(metadata: &DecisionMetadata, now: DateTime<Utc>) -> AuditEvent {
    let mut event = AuditEvent::new(AuditKind::AccessDecision, AuditOutcome::Allowed, now);
    event.decision_id = metadata.decision_id.clone();
    event.tenant_id = metadata.tenant_id.clone();
    event.actor_type = metadata.actor_type.map(|t| t.as_str().to_owned());
    event.actor_id = metadata.actor_id.clone();
    event.patient_id = metadata.target_patient_id.clone();
    event.purpose = metadata.purpose.map(|p| p.as_str().to_owned());
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::clock::testing::{FailingIdSource, FixedClock, SequentialIdSource};
    use chrono::{Duration, TimeZone};

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn gate_with_sink() -> (AccessDecisionGate, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let gate = AccessDecisionGate::new(
            Arc::new(FixedClock::at(test_now())),
            Arc::new(SequentialIdSource::default()),
            sink.clone(),
        );
        (gate, sink)
    }

    fn patient_actor(id: &str, tenant: &str) -> RawActorIdentity {
        RawActorIdentity {
            id: Some(id.into()),
            actor_type: Some("Patient".into()),
            tenant_id: Some(tenant.into()),
            role: Some("patient".into()),
        }
    }

    fn clinician_actor(id: &str, tenant: &str) -> RawActorIdentity {
        RawActorIdentity {
            id: Some(id.into()),
            actor_type: Some("Clinician".into()),
            tenant_id: Some(tenant.into()),
            role: None,
        }
    }

    fn valid_proof(patient: &str, purpose: AccessPurpose) -> ConsentProof {
        ConsentProof {
            signature: "opaque-signature".into(),
            valid_until: test_now() + Duration::days(7),
            patient_id: PatientId::parse(patient).expect("patient id should be valid"),
            purpose,
        }
    }

    fn self_access_request() -> RawGateRequest {
        RawGateRequest {
            actor: Some(patient_actor("patient-456", "tenant-123")),
            tenant_id: Some("tenant-123".into()),
            target_patient_id: Some("patient-456".into()),
            purpose: Some("PatientRequest".into()),
            consent_proof: None,
        }
    }

    #[test]
    fn patient_accessing_own_record_is_allowed() {
        let (gate, _sink) = gate_with_sink();
        let decision = gate.evaluate(&self_access_request());
        assert!(decision.is_allow(), "self access should be allowed");
        let metadata = decision.metadata();
        assert_eq!(metadata.decision_id.as_deref(), Some("id-1"));
        assert_eq!(metadata.tenant_id.as_deref(), Some("tenant-123"));
        assert_eq!(metadata.purpose, Some(AccessPurpose::PatientRequest));
    }

    #[test]
    fn patient_accessing_another_patient_is_denied_patient_mismatch() {
        let (gate, _sink) = gate_with_sink();
        let mut request = self_access_request();
        request.target_patient_id = Some("other-patient".into());
        let decision = gate.evaluate(&request);
        assert_eq!(decision.deny_reason(), Some(DenyReason::PatientMismatch));
    }

    #[test]
    fn missing_fields_deny_missing_identity() {
        let (gate, _sink) = gate_with_sink();

        let mut no_actor = self_access_request();
        no_actor.actor = None;
        assert_eq!(
            gate.evaluate(&no_actor).deny_reason(),
            Some(DenyReason::MissingIdentity)
        );

        let mut no_tenant = self_access_request();
        no_tenant.tenant_id = None;
        assert_eq!(
            gate.evaluate(&no_tenant).deny_reason(),
            Some(DenyReason::MissingIdentity)
        );

        let mut blank_target = self_access_request();
        blank_target.target_patient_id = Some("   ".into());
        assert_eq!(
            gate.evaluate(&blank_target).deny_reason(),
            Some(DenyReason::MissingIdentity)
        );

        let mut no_purpose = self_access_request();
        no_purpose.purpose = None;
        assert_eq!(
            gate.evaluate(&no_purpose).deny_reason(),
            Some(DenyReason::MissingIdentity)
        );
    }

    #[test]
    fn malformed_actor_fields_deny_identity_invalid() {
        let (gate, _sink) = gate_with_sink();

        let mut no_actor_id = self_access_request();
        no_actor_id.actor.as_mut().unwrap().id = None;
        assert_eq!(
            gate.evaluate(&no_actor_id).deny_reason(),
            Some(DenyReason::IdentityInvalid)
        );

        let mut bad_type = self_access_request();
        bad_type.actor.as_mut().unwrap().actor_type = Some("wizard".into());
        assert_eq!(
            gate.evaluate(&bad_type).deny_reason(),
            Some(DenyReason::IdentityInvalid)
        );

        let mut bad_actor_tenant = self_access_request();
        bad_actor_tenant.actor.as_mut().unwrap().tenant_id = Some("bad tenant".into());
        assert_eq!(
            gate.evaluate(&bad_actor_tenant).deny_reason(),
            Some(DenyReason::IdentityInvalid)
        );
    }

    #[test]
    fn unknown_purpose_denies_invalid_purpose() {
        let (gate, _sink) = gate_with_sink();
        let mut request = self_access_request();
        request.purpose = Some("Gossip".into());
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::InvalidPurpose)
        );
    }

    #[test]
    fn tenant_mismatch_is_unconditional_for_every_actor_type() {
        let (gate, _sink) = gate_with_sink();

        for actor_type in ["Patient", "Representative", "Clinician", "Service"] {
            let request = RawGateRequest {
                actor: Some(RawActorIdentity {
                    id: Some("actor-1".into()),
                    actor_type: Some(actor_type.into()),
                    tenant_id: Some("tenant-a".into()),
                    role: None,
                }),
                tenant_id: Some("tenant-b".into()),
                target_patient_id: Some("actor-1".into()),
                purpose: Some("Treatment".into()),
                consent_proof: Some(valid_proof("actor-1", AccessPurpose::Treatment)),
            };
            assert_eq!(
                gate.evaluate(&request).deny_reason(),
                Some(DenyReason::TenantMismatch),
                "{actor_type} must not bypass tenant isolation"
            );
        }
    }

    #[test]
    fn tenant_mismatch_wins_over_later_checks() {
        // Ordered short-circuiting: a cross-tenant patient also mismatching
        // the target still reports TenantMismatch, not PatientMismatch.
        let (gate, _sink) = gate_with_sink();
        let request = RawGateRequest {
            actor: Some(patient_actor("patient-1", "tenant-a")),
            tenant_id: Some("tenant-b".into()),
            target_patient_id: Some("patient-2".into()),
            purpose: Some("PatientRequest".into()),
            consent_proof: None,
        };
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::TenantMismatch)
        );
    }

    #[test]
    fn tenant_mismatch_wins_over_unknown_purpose() {
        // Purpose resolution happens after tenant isolation, so a
        // cross-tenant request with an unrecognised purpose string still
        // reports the mismatch.
        let (gate, _sink) = gate_with_sink();
        let request = RawGateRequest {
            actor: Some(clinician_actor("clin-1", "tenant-a")),
            tenant_id: Some("tenant-b".into()),
            target_patient_id: Some("patient-1".into()),
            purpose: Some("Gossip".into()),
            consent_proof: None,
        };
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::TenantMismatch)
        );
    }

    fn clinician_request(proof: Option<ConsentProof>) -> RawGateRequest {
        RawGateRequest {
            actor: Some(clinician_actor("clinician-1", "tenant-1")),
            tenant_id: Some("tenant-1".into()),
            target_patient_id: Some("pat-123".into()),
            purpose: Some("Treatment".into()),
            consent_proof: proof,
        }
    }

    #[test]
    fn clinician_without_consent_is_denied_consent_missing() {
        let (gate, _sink) = gate_with_sink();
        assert_eq!(
            gate.evaluate(&clinician_request(None)).deny_reason(),
            Some(DenyReason::ConsentMissing)
        );
    }

    #[test]
    fn clinician_with_valid_consent_is_allowed() {
        let (gate, _sink) = gate_with_sink();
        let request = clinician_request(Some(valid_proof("pat-123", AccessPurpose::Treatment)));
        let decision = gate.evaluate(&request);
        assert!(decision.is_allow(), "valid consent should allow access");
    }

    #[test]
    fn consent_for_wrong_patient_denies_patient_mismatch() {
        let (gate, _sink) = gate_with_sink();
        let request = clinician_request(Some(valid_proof("pat-999", AccessPurpose::Treatment)));
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::PatientMismatch)
        );
    }

    #[test]
    fn consent_for_wrong_purpose_denies_invalid_purpose() {
        let (gate, _sink) = gate_with_sink();
        let request = clinician_request(Some(valid_proof("pat-123", AccessPurpose::Research)));
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::InvalidPurpose)
        );
    }

    #[test]
    fn expired_consent_denies_consent_invalid() {
        let (gate, _sink) = gate_with_sink();
        let mut proof = valid_proof("pat-123", AccessPurpose::Treatment);
        proof.valid_until = test_now() - Duration::seconds(1);
        let request = clinician_request(Some(proof));
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::ConsentInvalid)
        );
    }

    #[test]
    fn consent_expiring_exactly_now_is_still_valid() {
        let (gate, _sink) = gate_with_sink();
        let mut proof = valid_proof("pat-123", AccessPurpose::Treatment);
        proof.valid_until = test_now();
        let request = clinician_request(Some(proof));
        assert!(gate.evaluate(&request).is_allow());
    }

    #[test]
    fn allow_emits_exactly_one_audit_event() {
        let (gate, sink) = gate_with_sink();
        let decision = gate.evaluate(&self_access_request());
        assert!(decision.is_allow());

        let events = sink.events();
        assert_eq!(events.len(), 1, "allow must emit exactly one event");
        assert_eq!(events[0].kind, AuditKind::AccessDecision);
        assert_eq!(events[0].outcome, AuditOutcome::Allowed);
        assert_eq!(events[0].decision_id.as_deref(), Some("id-1"));
        assert_eq!(events[0].tenant_id.as_deref(), Some("tenant-123"));
    }

    #[test]
    fn ordinary_denials_emit_no_audit_event() {
        let (gate, sink) = gate_with_sink();
        let mut request = self_access_request();
        request.tenant_id = Some("tenant-other".into());
        assert_eq!(
            gate.evaluate(&request).deny_reason(),
            Some(DenyReason::TenantMismatch)
        );
        assert!(sink.is_empty(), "ordinary denials are not audited");
    }

    #[test]
    fn internal_error_denies_and_emits_audit_event() {
        let sink = Arc::new(MemoryAuditSink::new());
        let gate = AccessDecisionGate::new(
            Arc::new(FixedClock::at(test_now())),
            Arc::new(FailingIdSource),
            sink.clone(),
        );

        let decision = gate.evaluate(&self_access_request());
        assert_eq!(decision.deny_reason(), Some(DenyReason::InternalError));

        let events = sink.events();
        assert_eq!(events.len(), 1, "internal errors are audited");
        assert_eq!(events[0].outcome, AuditOutcome::Error);
    }

    #[test]
    fn decision_ids_come_from_the_injected_source() {
        let (gate, _sink) = gate_with_sink();
        let first = gate.evaluate(&self_access_request());
        let second = gate.evaluate(&self_access_request());
        assert_eq!(first.metadata().decision_id.as_deref(), Some("id-1"));
        assert_eq!(second.metadata().decision_id.as_deref(), Some("id-2"));
    }
}
