//! Wire request and response bodies shared by the HTTP surface.
//!
//! Success bodies follow a `{ success: true, data: ... }` shape with a
//! concrete payload type per endpoint. Failure bodies are always
//! [`ErrorRes`] with one of two fixed generic messages; the reason a
//! request was denied never reaches the wire.

use chrono::{DateTime, Utc};
use recordgate_core::{ClinicalNote, GateDecision, PatientSessionContext};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Generic failure body. Carries no denial reason.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorRes {
    pub success: bool,
    pub error: String,
}

impl ErrorRes {
    /// Body for every client-attributable failure (denied, conflicting,
    /// unauthenticated, absent).
    pub fn denied() -> Self {
        Self {
            success: false,
            error: "request could not be completed".into(),
        }
    }

    /// Body for system faults.
    pub fn internal() -> Self {
        Self {
            success: false,
            error: "internal error".into(),
        }
    }
}

/// Request body for establishing a patient session.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EstablishSessionReq {
    pub auth_token: String,
    pub tenant_id: String,
    pub patient_id: String,
}

/// Established-session payload. The auth token is never echoed back.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    pub session_id: String,
    pub tenant_id: String,
    pub patient_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Response body for an established patient session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EstablishSessionRes {
    pub success: bool,
    pub data: SessionView,
}

impl From<&PatientSessionContext> for EstablishSessionRes {
    fn from(session: &PatientSessionContext) -> Self {
        Self {
            success: true,
            data: SessionView {
                session_id: session.session_id.to_string(),
                tenant_id: session.actor.tenant_id.to_string(),
                patient_id: session.actor.id.to_string(),
                issued_at: session.metadata.issued_at,
                expires_at: session.metadata.expires_at,
            },
        }
    }
}

/// Verdict payload for a direct access-decision evaluation. Denial
/// reasons stay internal; only the boolean and the audit correlation id
/// go out.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GateVerdict {
    pub allowed: bool,
    pub decision_id: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// Response body for a gate evaluation. The evaluation itself always
/// succeeds; `data.allowed` carries the verdict.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GateDecisionRes {
    pub success: bool,
    pub data: GateVerdict,
}

impl From<&GateDecision> for GateDecisionRes {
    fn from(decision: &GateDecision) -> Self {
        Self {
            success: true,
            data: GateVerdict {
                allowed: decision.is_allow(),
                decision_id: decision.metadata().decision_id.clone(),
                decided_at: decision.metadata().decided_at,
            },
        }
    }
}

/// Request body for creating a draft note.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateNoteReq {
    pub encounter_id: String,
    pub patient_id: String,
    pub content: String,
}

/// Metadata-only note payload, returned by the mutating operations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NoteActionView {
    pub note_id: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Response body for the mutating note operations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NoteActionRes {
    pub success: bool,
    pub data: NoteActionView,
}

impl From<&ClinicalNote> for NoteActionRes {
    fn from(note: &ClinicalNote) -> Self {
        Self {
            success: true,
            data: NoteActionView {
                note_id: note.id.to_string(),
                status: note.status.to_string(),
                updated_at: note.updated_at,
            },
        }
    }
}

/// Full note payload, produced only by the guarded read path.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NoteView {
    pub note_id: String,
    pub encounter_id: String,
    pub patient_id: String,
    pub author_id: String,
    pub content: String,
    pub status: String,
    pub signed_by: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response body for the guarded read.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadNoteRes {
    pub success: bool,
    pub data: NoteView,
}

impl From<&ClinicalNote> for ReadNoteRes {
    fn from(note: &ClinicalNote) -> Self {
        Self {
            success: true,
            data: NoteView {
                note_id: note.id.to_string(),
                encounter_id: note.encounter_id.to_string(),
                patient_id: note.patient_id.to_string(),
                author_id: note.author_id.to_string(),
                content: note.content.clone(),
                status: note.status.to_string(),
                signed_by: note.signature.as_ref().map(|s| s.signer_id.to_string()),
                signed_at: note.signature.as_ref().map(|s| s.signed_at),
                created_at: note.created_at,
                updated_at: note.updated_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use recordgate_core::{ClinicalNote, NoteStatus, SignatureMetadata};
    use recordgate_types::{ActorId, EncounterId, NoteId, PatientId, TenantId};
    use utoipa::OpenApi;

    #[test]
    fn error_bodies_are_generic() {
        let denied = serde_json::to_value(ErrorRes::denied()).expect("serialises");
        assert_eq!(denied["success"], false);
        assert_eq!(denied["error"], "request could not be completed");

        let internal = serde_json::to_value(ErrorRes::internal()).expect("serialises");
        assert_eq!(internal["success"], false);
        assert_eq!(internal["error"], "internal error");
    }

    #[test]
    fn read_response_nests_the_note_under_data() {
        let note = ClinicalNote {
            id: NoteId::parse("note-1").unwrap(),
            tenant_id: TenantId::parse("tenant-1").unwrap(),
            encounter_id: EncounterId::parse("enc-1").unwrap(),
            patient_id: PatientId::parse("pat-123").unwrap(),
            author_id: ActorId::parse("clinician-1").unwrap(),
            content: "findings".into(),
            status: NoteStatus::Signed,
            signature: Some(SignatureMetadata {
                signer_id: ActorId::parse("clinician-1").unwrap(),
                signed_at: Utc::now(),
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let body = serde_json::to_value(ReadNoteRes::from(&note)).expect("serialises");
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "Signed");
        assert_eq!(body["data"]["signed_by"], "clinician-1");
        // The tenant partition is addressing, not payload.
        assert!(body["data"].get("tenant_id").is_none());
    }

    #[test]
    fn timestamps_document_as_strings_not_schema_refs() {
        #[derive(utoipa::OpenApi)]
        #[openapi(components(schemas(NoteView, SessionView, ReadNoteRes)))]
        struct Doc;

        let doc = serde_json::to_value(Doc::openapi()).expect("serialises");
        let rendered = doc.to_string();
        assert!(!rendered.contains("#/components/schemas/DateTime"));

        let signed_at = &doc["components"]["schemas"]["NoteView"]["properties"]["signed_at"];
        assert_eq!(signed_at["type"], "string");
    }
}
