//! Constants used throughout the RecordGate core crate.
//!
//! This module contains capability names, default temporal tolerances, and
//! fixed namespaces to ensure consistency across the codebase and make
//! maintenance easier.

use uuid::Uuid;

/// Capability required by the guarded clinical-note read path.
pub const READ_NOTE_CAPABILITY: &str = "can_read_clinical_note";

/// Default patient session lifetime, in seconds (one hour).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

/// Default maximum age of an `authorized_at` assertion, in seconds.
///
/// Compliance-sensitive; conservative by default and tunable via
/// [`CoreConfig`](crate::config::CoreConfig).
pub const DEFAULT_AUTHORIZED_AT_MAX_AGE_SECS: i64 = 15 * 60;

/// Default tolerated forward clock skew for `authorized_at`, in seconds.
pub const DEFAULT_CLOCK_SKEW_TOLERANCE_SECS: i64 = 5 * 60;

/// Fixed namespace for deterministic patient session identifiers.
///
/// Session ids are UUIDv5 digests of `"{tenant}/{patient}"` under this
/// namespace, so identical inputs always derive the same session identity.
pub const SESSION_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6b1d_29a4_83f0_4c5e_9d2a_41c7_c0de_5afe);
