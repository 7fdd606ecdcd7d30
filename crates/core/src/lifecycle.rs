//! The clinical record lifecycle service.
//!
//! [`ClinicalRecordLifecycle`] owns the four mutating operations on a note
//! (`start_draft`, `finalize_note`, `sign_note`, `lock_note`) and the
//! guarded read path (`read_note`). Mutations are compare-and-set against
//! the repository so concurrent writers resolve to exactly one winner; the
//! read path runs a fixed-order chain of checks and aborts on the first
//! failure without producing any partial response.

use crate::audit::{AuditEvent, AuditKind, AuditOutcome, AuditSink};
use crate::clock::{Clock, IdSource};
use crate::config::CoreConfig;
use crate::context::{AuthContext, CapabilityState, ReadRequestContext};
use crate::error::{CoreResult, LifecycleError, ReadDenied, RepositoryError};
use crate::note::{ClinicalNote, NoteDraft, NoteStatus, SignatureMetadata};
use crate::repository::{NoteChange, NoteRepository};
use chrono::{DateTime, Utc};
use recordgate_types::{ActorId, CorrelationId, NoteId, TenantId};
use std::sync::Arc;

pub struct ClinicalRecordLifecycle<R: NoteRepository> {
    cfg: Arc<CoreConfig>,
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    audit: Arc<dyn AuditSink>,
}

impl<R: NoteRepository> ClinicalRecordLifecycle<R> {
    pub fn new(
        cfg: Arc<CoreConfig>,
        repo: Arc<R>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            cfg,
            repo,
            clock,
            ids,
            audit,
        }
    }

    /// Create a new draft note owned by the authenticated tenant.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidInput`] for blank content or a
    /// caller without an author identity, [`LifecycleError::IdSource`] if no
    /// note id could be generated, and [`LifecycleError::Repository`] for
    /// persistence failures.
    pub fn start_draft(&self, auth: &AuthContext, draft: NoteDraft) -> CoreResult<ClinicalNote> {
        if draft.content.trim().is_empty() {
            return Err(LifecycleError::InvalidInput(
                "note content cannot be empty".into(),
            ));
        }
        let author_id = auth
            .clinician_id
            .clone()
            .ok_or_else(|| LifecycleError::InvalidInput("author identity required".into()))?;

        let id = NoteId::parse(&self.ids.next_id()?)
            .map_err(|e| LifecycleError::InvalidInput(format!("generated note id invalid: {e}")))?;
        let now = self.clock.now();

        let note = ClinicalNote {
            id,
            tenant_id: auth.tenant_id.clone(),
            encounter_id: draft.encounter_id,
            patient_id: draft.patient_id,
            author_id,
            content: draft.content,
            status: NoteStatus::Draft,
            signature: None,
            created_at: now,
            updated_at: now,
        };

        self.repo
            .insert(note.clone())
            .map_err(LifecycleError::Repository)?;

        tracing::info!(
            note_id = %note.id,
            tenant_id = %note.tenant_id,
            patient_id = %note.patient_id,
            "draft note created"
        );
        Ok(note)
    }

    /// `Draft → Finalized`.
    pub fn finalize_note(&self, auth: &AuthContext, note_id: &NoteId) -> CoreResult<ClinicalNote> {
        self.transition(auth, note_id, NoteStatus::Finalized, None)
    }

    /// `Finalized → Signed`, recording the authenticated clinician as the
    /// signer.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MissingSigner`] when the caller has no
    /// clinician identity to attribute the signature to.
    pub fn sign_note(&self, auth: &AuthContext, note_id: &NoteId) -> CoreResult<ClinicalNote> {
        let signer_id = auth.clinician_id.clone().ok_or(LifecycleError::MissingSigner)?;
        let signature = SignatureMetadata {
            signer_id,
            signed_at: self.clock.now(),
        };
        self.transition(auth, note_id, NoteStatus::Signed, Some(signature))
    }

    /// Administrative lock, legal from any non-terminal status.
    pub fn lock_note(&self, auth: &AuthContext, note_id: &NoteId) -> CoreResult<ClinicalNote> {
        self.transition(auth, note_id, NoteStatus::Locked, None)
    }

    fn transition(
        &self,
        auth: &AuthContext,
        note_id: &NoteId,
        target: NoteStatus,
        signature: Option<SignatureMetadata>,
    ) -> CoreResult<ClinicalNote> {
        let note = self
            .repo
            .get(&auth.tenant_id, note_id)
            .map_err(|e| match e {
                RepositoryError::NotFound => LifecycleError::NotFound,
                other => LifecycleError::Repository(other),
            })?;

        if note.tenant_id != auth.tenant_id {
            return Err(LifecycleError::TenantMismatch);
        }
        if !note.status.may_become(target) {
            return Err(LifecycleError::InvalidTransition {
                from: note.status,
                to: target,
            });
        }

        let change = NoteChange {
            status: target,
            signature,
            updated_at: self.clock.now(),
        };
        let updated = self
            .repo
            .transition(&auth.tenant_id, note_id, note.status, change)
            .map_err(|e| match e {
                RepositoryError::NotFound => LifecycleError::NotFound,
                // The loser of a concurrent race sees the same error as a
                // caller who requested an illegal transition outright.
                RepositoryError::StatusConflict { actual } => LifecycleError::InvalidTransition {
                    from: actual,
                    to: target,
                },
                other => LifecycleError::Repository(other),
            })?;

        tracing::info!(
            note_id = %updated.id,
            tenant_id = %updated.tenant_id,
            status = %updated.status,
            "note status transitioned"
        );
        Ok(updated)
    }

    /// Guarded read of a signed note.
    ///
    /// The checks run in a fixed order and the first failure aborts the
    /// whole read: tenant context, auth context, authorisation timestamp
    /// shape, staleness, future skew, capability, existence, tenant
    /// ownership, readable status, signature integrity. Exactly one
    /// `NoteRead` audit signal is emitted on success and none on failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ReadDenied`] reason for the first failing check. A
    /// malformed or unknown note id is reported as [`ReadDenied::NotFound`]
    /// so callers cannot probe the id space.
    pub fn read_note(
        &self,
        ctx: &ReadRequestContext,
        note_id: &str,
    ) -> Result<ClinicalNote, ReadDenied> {
        let now = self.clock.now();

        let tenant_id = non_blank(ctx.tenant_id.as_deref())
            .and_then(|raw| TenantId::parse(raw).ok())
            .ok_or(ReadDenied::TenantContext)?;

        let clinician_id = non_blank(ctx.clinician_id.as_deref())
            .and_then(|raw| ActorId::parse(raw).ok())
            .ok_or(ReadDenied::AuthContext)?;
        let correlation_id = non_blank(ctx.correlation_id.as_deref())
            .and_then(|raw| CorrelationId::parse(raw).ok())
            .ok_or(ReadDenied::AuthContext)?;

        let raw_authorized_at =
            non_blank(ctx.authorized_at.as_deref()).ok_or(ReadDenied::AuthContext)?;
        let authorized_at = DateTime::parse_from_rfc3339(raw_authorized_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ReadDenied::MalformedTimestamp)?;

        if now - authorized_at > self.cfg.authorized_at_max_age() {
            return Err(ReadDenied::AuthorizationTooOld);
        }
        if authorized_at - now > self.cfg.clock_skew_tolerance() {
            return Err(ReadDenied::AuthorizationInFuture);
        }

        match ctx.capabilities.state(self.cfg.read_capability()) {
            CapabilityState::Granted => {}
            CapabilityState::Absent => return Err(ReadDenied::CapabilityMissing),
            CapabilityState::Revoked => return Err(ReadDenied::CapabilityRevoked),
        }

        // A malformed id can't name any stored note.
        let note_id = NoteId::parse(note_id).map_err(|_| ReadDenied::NotFound)?;
        let note = self.repo.get(&tenant_id, &note_id).map_err(|e| match e {
            RepositoryError::NotFound => ReadDenied::NotFound,
            other => ReadDenied::Persistence(other),
        })?;

        if note.tenant_id != tenant_id {
            return Err(ReadDenied::CrossTenant);
        }
        if note.status != NoteStatus::Signed {
            return Err(ReadDenied::InvalidState {
                status: note.status,
            });
        }
        if !note.has_consistent_signature() {
            return Err(ReadDenied::MissingSignature);
        }

        let mut event = AuditEvent::new(AuditKind::NoteRead, AuditOutcome::Allowed, now);
        event.tenant_id = Some(tenant_id.to_string());
        event.actor_id = Some(clinician_id.to_string());
        event.patient_id = Some(note.patient_id.to_string());
        event.note_id = Some(note.id.to_string());
        event.correlation_id = Some(correlation_id.to_string());
        self.audit.emit(event);

        Ok(note)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
