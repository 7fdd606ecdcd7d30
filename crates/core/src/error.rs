//! Error taxonomy for the RecordGate core.
//!
//! Each component resolves its failures locally and converts them into a
//! structured error from this module; nothing propagates as a panic to the
//! caller. The boundary layer collapses every variant into a generic
//! `success: false` body, so these types exist for internal audit and
//! telemetry, never for wire responses.

use crate::note::NoteStatus;
use recordgate_types::IdentityError;

/// Internal failures inside [`AccessDecisionGate`](crate::gate::AccessDecisionGate).
///
/// These never escape the gate: `evaluate` reclassifies any `GateError` as
/// `Deny(InternalError)` and emits an audit signal for it.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The injected decision-id source could not produce an identifier.
    #[error("decision id source unavailable: {0}")]
    IdSource(#[from] IdSourceError),
}

/// Failure of an injected identifier source.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct IdSourceError(pub String);

/// Failures establishing a patient session context.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// One of auth token, tenant id, or patient id was empty. The
    /// establisher performs no partial construction in this case.
    #[error("auth token, tenant id and patient id are mandatory")]
    MissingMandatoryFields,
    /// A mandatory field was present but not a valid identifier.
    #[error("invalid session identifier: {0}")]
    Identity(#[from] IdentityError),
}

/// Failures of the mutating lifecycle operations (`start_draft`,
/// `finalize_note`, `sign_note`, `lock_note`).
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The authenticated tenant does not match the tenant being operated on.
    #[error("tenant mismatch")]
    TenantMismatch,
    #[error("note not found")]
    NotFound,
    /// The note is not in the status the operation requires. Also returned
    /// to the loser of a concurrent transition race.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: NoteStatus, to: NoteStatus },
    /// `sign_note` requires a clinician identity to record as the signer.
    #[error("signer identity missing")]
    MissingSigner,
    /// The injected note-id source could not produce an identifier.
    #[error("id source unavailable: {0}")]
    IdSource(#[from] IdSourceError),
    #[error("persistence failure: {0}")]
    Repository(RepositoryError),
}

/// Reasons the guarded read path aborts.
///
/// The chain is ordered; the first failing check wins and no partial
/// response is produced. None of these reasons reach the wire: the boundary
/// maps them all to a generic denial.
#[derive(Debug, thiserror::Error)]
pub enum ReadDenied {
    /// Tenant context absent or not a well-formed identifier.
    #[error("tenant context missing or malformed")]
    TenantContext,
    /// The located note belongs to a different tenant than the requester.
    #[error("cross-tenant access attempt")]
    CrossTenant,
    /// Clinician id, authorised-at, or correlation id absent or malformed.
    #[error("auth context missing or malformed")]
    AuthContext,
    /// The authorised-at value was present but not parseable as RFC 3339.
    #[error("authorisation timestamp is malformed")]
    MalformedTimestamp,
    /// The authorisation predates the configured validity window.
    #[error("authorisation is too old")]
    AuthorizationTooOld,
    /// The authorisation claims a future instant beyond skew tolerance.
    #[error("authorisation timestamp is in the future")]
    AuthorizationInFuture,
    #[error("required capability missing")]
    CapabilityMissing,
    #[error("required capability revoked")]
    CapabilityRevoked,
    #[error("note not found")]
    NotFound,
    /// The note exists but is not `Signed`.
    #[error("note is not readable in status {status}")]
    InvalidState { status: NoteStatus },
    /// A `Signed` note without signature metadata is an integrity failure.
    #[error("signed note is missing signature metadata")]
    MissingSignature,
    /// Timeout, connection failure, or resource exhaustion in the
    /// persistence layer. Surfaces as a generic system error.
    #[error("persistence failure: {0}")]
    Persistence(#[source] RepositoryError),
}

impl ReadDenied {
    /// Whether this abort represents a system fault rather than a denial.
    pub fn is_system_failure(&self) -> bool {
        matches!(self, ReadDenied::Persistence(_))
    }
}

/// Failures of the abstract per-tenant note repository.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("note not found")]
    NotFound,
    /// A compare-and-set transition found the note in a different status
    /// than expected. The loser of a concurrent write observes this.
    #[error("note status changed concurrently (current: {actual})")]
    StatusConflict { actual: NoteStatus },
    #[error("persistence operation timed out")]
    Timeout,
    #[error("persistence connection failed")]
    ConnectionFailure,
    #[error("persistence resources exhausted")]
    ResourceExhausted,
}

/// Invalid startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type CoreResult<T> = std::result::Result<T, LifecycleError>;
