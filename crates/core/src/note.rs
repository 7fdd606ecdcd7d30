//! The clinical note and its closed status machine.
//!
//! `NoteStatus` is a closed tagged union rather than a free-form string so
//! every transition function can exhaustively match valid predecessor
//! states; "signed a draft" is unrepresentable.

use chrono::{DateTime, Utc};
use recordgate_types::{ActorId, EncounterId, NoteId, PatientId, TenantId};

/// Lifecycle status of a clinical note.
///
/// Transitions are monotonic forward: `Draft → Finalized → Signed`, with
/// `Locked` reachable from any other state as an administrative terminal.
/// No transition ever reverts status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NoteStatus {
    Draft,
    Finalized,
    Signed,
    Locked,
}

impl NoteStatus {
    /// Whether the forward transition `self → next` is legal.
    pub fn may_become(self, next: NoteStatus) -> bool {
        matches!(
            (self, next),
            (NoteStatus::Draft, NoteStatus::Finalized)
                | (NoteStatus::Finalized, NoteStatus::Signed)
                | (NoteStatus::Draft, NoteStatus::Locked)
                | (NoteStatus::Finalized, NoteStatus::Locked)
                | (NoteStatus::Signed, NoteStatus::Locked)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, NoteStatus::Locked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Draft => "Draft",
            NoteStatus::Finalized => "Finalized",
            NoteStatus::Signed => "Signed",
            NoteStatus::Locked => "Locked",
        }
    }
}

impl std::fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature metadata attached when a note is signed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SignatureMetadata {
    pub signer_id: ActorId,
    pub signed_at: DateTime<Utc>,
}

/// A clinical note, owned exclusively by its tenant partition.
///
/// `tenant_id` is immutable after creation; nothing in this crate exposes a
/// way to change it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClinicalNote {
    pub id: NoteId,
    pub tenant_id: TenantId,
    pub encounter_id: EncounterId,
    pub patient_id: PatientId,
    pub author_id: ActorId,
    pub content: String,
    pub status: NoteStatus,
    pub signature: Option<SignatureMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicalNote {
    /// A `Signed` note must carry signature metadata; anything else is an
    /// integrity failure.
    pub fn has_consistent_signature(&self) -> bool {
        match self.status {
            NoteStatus::Signed => self.signature.is_some(),
            _ => true,
        }
    }
}

/// Creation payload for a new draft note.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NoteDraft {
    pub encounter_id: EncounterId,
    pub patient_id: PatientId,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authoring_transitions_are_forward_only() {
        assert!(NoteStatus::Draft.may_become(NoteStatus::Finalized));
        assert!(NoteStatus::Finalized.may_become(NoteStatus::Signed));

        assert!(!NoteStatus::Draft.may_become(NoteStatus::Signed));
        assert!(!NoteStatus::Finalized.may_become(NoteStatus::Draft));
        assert!(!NoteStatus::Signed.may_become(NoteStatus::Draft));
        assert!(!NoteStatus::Signed.may_become(NoteStatus::Finalized));
        assert!(!NoteStatus::Signed.may_become(NoteStatus::Signed));
    }

    #[test]
    fn lock_is_reachable_from_every_state_and_terminal() {
        assert!(NoteStatus::Draft.may_become(NoteStatus::Locked));
        assert!(NoteStatus::Finalized.may_become(NoteStatus::Locked));
        assert!(NoteStatus::Signed.may_become(NoteStatus::Locked));

        assert!(NoteStatus::Locked.is_terminal());
        for next in [
            NoteStatus::Draft,
            NoteStatus::Finalized,
            NoteStatus::Signed,
            NoteStatus::Locked,
        ] {
            assert!(
                !NoteStatus::Locked.may_become(next),
                "Locked must not transition to {next}"
            );
        }
    }

    #[test]
    fn signature_consistency_requires_metadata_on_signed_notes() {
        let note = ClinicalNote {
            id: NoteId::parse("note-1").unwrap(),
            tenant_id: TenantId::parse("tenant-1").unwrap(),
            encounter_id: EncounterId::parse("enc-1").unwrap(),
            patient_id: PatientId::parse("pat-123").unwrap(),
            author_id: ActorId::parse("clinician-1").unwrap(),
            content: "findings".into(),
            status: NoteStatus::Signed,
            signature: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!note.has_consistent_signature());

        let signed = ClinicalNote {
            signature: Some(SignatureMetadata {
                signer_id: ActorId::parse("clinician-1").unwrap(),
                signed_at: Utc::now(),
            }),
            ..note.clone()
        };
        assert!(signed.has_consistent_signature());

        let draft = ClinicalNote {
            status: NoteStatus::Draft,
            ..note
        };
        assert!(draft.has_consistent_signature());
    }
}
