//! Core decision and record-lifecycle logic for RecordGate.
//!
//! This crate holds the tenant- and patient-scoped building blocks of the
//! platform: the access decision gate, the patient session establisher, the
//! clinical note lifecycle with its guarded read path, and the metadata-only
//! audit signals they emit. Everything here is transport-agnostic; the HTTP
//! boundary lives in the API crates and collapses these types into generic
//! wire responses.
//!
//! Time and identifier generation are injected capabilities ([`Clock`],
//! [`IdSource`]), so every decision in this crate is reproducible under
//! test.

pub mod audit;
pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod gate;
pub mod lifecycle;
pub mod note;
pub mod repository;
pub mod session;

pub use audit::{AuditEvent, AuditKind, AuditOutcome, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use clock::{Clock, IdSource, SystemClock, UuidIdSource};
pub use config::{duration_secs_from_env_value, CoreConfig};
pub use context::{AuthContext, CapabilitySet, CapabilityState, ReadRequestContext};
pub use error::{
    ConfigError, CoreResult, GateError, IdSourceError, LifecycleError, ReadDenied, RepositoryError,
    SessionError,
};
pub use gate::{
    AccessDecisionGate, AccessPurpose, ActorIdentity, ActorType, ConsentProof, DecisionMetadata,
    DenyReason, GateDecision, RawActorIdentity, RawGateRequest,
};
pub use lifecycle::ClinicalRecordLifecycle;
pub use note::{ClinicalNote, NoteDraft, NoteStatus, SignatureMetadata};
pub use repository::{InMemoryNoteRepository, NoteChange, NoteRepository};
pub use session::{
    derive_session_id, gate_request_from_session, EstablishSessionInput, PatientSessionContext,
    SessionContextEstablisher, SessionMetadata,
};
