//! Injected time and identifier sources.
//!
//! Decision logic never reads the ambient system clock or an ambient random
//! source directly. Both are capabilities passed into the services that need
//! them, so every temporal check and every generated identifier is
//! controllable and reproducible in tests.

use crate::error::IdSourceError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of opaque identifiers (decision ids, note ids).
///
/// Fallible: an exhausted or unavailable randomness source is reported as an
/// error rather than silently substituting a fallback literal, so callers can
/// reclassify it as their internal-error path.
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> Result<String, IdSourceError>;
}

/// Production id source generating canonical (32 lowercase hex) UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&self) -> Result<String, IdSourceError> {
        Ok(Uuid::new_v4().simple().to_string())
    }
}
