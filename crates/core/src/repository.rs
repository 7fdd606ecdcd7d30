//! The abstract per-tenant note repository and its in-memory implementation.
//!
//! The repository is the only shared mutable resource in the core. The
//! contract is deliberately narrow:
//!
//! - storage is partitioned per tenant; there is no cross-tenant iteration
//! - `transition` is a compare-and-set on the note's status, serialised per
//!   note, so two concurrent writers cannot both succeed
//! - readers never observe a half-written transition: they see the
//!   pre-transition or the post-transition note, nothing in between
//!
//! Retries belong to the collaborator that owns the real storage engine; a
//! timed-out call surfaces as an error here, not a retry.

use crate::error::RepositoryError;
use crate::note::{ClinicalNote, NoteStatus, SignatureMetadata};
use chrono::{DateTime, Utc};
use recordgate_types::{NoteId, TenantId};
use std::collections::HashMap;
use std::sync::RwLock;

#[cfg(test)]
use std::sync::{LazyLock, Mutex};

/// The status-and-signature change applied by a compare-and-set
/// transition.
#[derive(Debug, Clone)]
pub struct NoteChange {
    pub status: NoteStatus,
    pub signature: Option<SignatureMetadata>,
    pub updated_at: DateTime<Utc>,
}

/// Abstract persistence contract for clinical notes, keyed by note id and
/// filtered by tenant.
pub trait NoteRepository: Send + Sync {
    /// Store a new note in its tenant partition.
    fn insert(&self, note: ClinicalNote) -> Result<(), RepositoryError>;

    /// Fetch a note from the given tenant's partition. A note that exists
    /// in another tenant is invisible here.
    fn get(&self, tenant_id: &TenantId, note_id: &NoteId) -> Result<ClinicalNote, RepositoryError>;

    /// Atomically apply `change` to the note, but only if its current
    /// status equals `expected`. The loser of a concurrent race observes
    /// [`RepositoryError::StatusConflict`] carrying the actual status.
    fn transition(
        &self,
        tenant_id: &TenantId,
        note_id: &NoteId,
        expected: NoteStatus,
        change: NoteChange,
    ) -> Result<ClinicalNote, RepositoryError>;
}

#[cfg(test)]
static FORCE_FAILURE_FOR_THREADS: LazyLock<Mutex<HashMap<std::thread::ThreadId, RepositoryError>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Force the next in-memory repository operation on the current thread to
/// fail with `error`. Lets tests exercise the persistence-failure paths
/// without a real storage engine.
#[cfg(test)]
pub(crate) fn force_repository_failure_for_current_thread(error: RepositoryError) {
    let mut guard = FORCE_FAILURE_FOR_THREADS
        .lock()
        .expect("FORCE_FAILURE_FOR_THREADS mutex poisoned");
    guard.insert(std::thread::current().id(), error);
}

fn take_forced_failure() -> Option<RepositoryError> {
    #[cfg(test)]
    {
        let mut guard = FORCE_FAILURE_FOR_THREADS
            .lock()
            .expect("FORCE_FAILURE_FOR_THREADS mutex poisoned");
        return guard.remove(&std::thread::current().id());
    }

    #[cfg(not(test))]
    None
}

/// In-memory repository: one map of notes per tenant under a single
/// `RwLock`. Writers take the write lock, so per-note transitions are
/// serialised; readers take the read lock and clone, so they never see a
/// partial update.
#[derive(Debug, Default)]
pub struct InMemoryNoteRepository {
    partitions: RwLock<HashMap<TenantId, HashMap<NoteId, ClinicalNote>>>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoteRepository for InMemoryNoteRepository {
    fn insert(&self, note: ClinicalNote) -> Result<(), RepositoryError> {
        if let Some(forced) = take_forced_failure() {
            return Err(forced);
        }

        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| RepositoryError::ConnectionFailure)?;
        partitions
            .entry(note.tenant_id.clone())
            .or_default()
            .insert(note.id.clone(), note);
        Ok(())
    }

    fn get(&self, tenant_id: &TenantId, note_id: &NoteId) -> Result<ClinicalNote, RepositoryError> {
        if let Some(forced) = take_forced_failure() {
            return Err(forced);
        }

        let partitions = self
            .partitions
            .read()
            .map_err(|_| RepositoryError::ConnectionFailure)?;
        partitions
            .get(tenant_id)
            .and_then(|partition| partition.get(note_id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    fn transition(
        &self,
        tenant_id: &TenantId,
        note_id: &NoteId,
        expected: NoteStatus,
        change: NoteChange,
    ) -> Result<ClinicalNote, RepositoryError> {
        if let Some(forced) = take_forced_failure() {
            return Err(forced);
        }

        let mut partitions = self
            .partitions
            .write()
            .map_err(|_| RepositoryError::ConnectionFailure)?;
        let note = partitions
            .get_mut(tenant_id)
            .and_then(|partition| partition.get_mut(note_id))
            .ok_or(RepositoryError::NotFound)?;

        if note.status != expected {
            return Err(RepositoryError::StatusConflict {
                actual: note.status,
            });
        }

        note.status = change.status;
        if change.signature.is_some() {
            note.signature = change.signature;
        }
        note.updated_at = change.updated_at;

        Ok(note.clone())
    }
}
