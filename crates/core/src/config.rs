//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process
//! startup and then passed into core services as `Arc<CoreConfig>`. The
//! intent is to avoid reading process-wide environment variables during
//! request handling, which can lead to inconsistent behaviour in
//! multi-threaded runtimes and test harnesses.

use crate::constants::{
    DEFAULT_AUTHORIZED_AT_MAX_AGE_SECS, DEFAULT_CLOCK_SKEW_TOLERANCE_SECS,
    DEFAULT_SESSION_TTL_SECS, READ_NOTE_CAPABILITY,
};
use crate::error::ConfigError;
use chrono::Duration;

/// Core configuration resolved at startup.
///
/// The temporal tolerances here are compliance-sensitive parameters: they
/// bound how stale or skewed an authorisation may be before the read guard
/// rejects it, and how long a patient session context lives.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    session_ttl: Duration,
    authorized_at_max_age: Duration,
    clock_skew_tolerance: Duration,
    read_capability: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// All durations must be strictly positive and the read capability name
    /// must be non-empty.
    pub fn new(
        session_ttl: Duration,
        authorized_at_max_age: Duration,
        clock_skew_tolerance: Duration,
        read_capability: String,
    ) -> Result<Self, ConfigError> {
        if session_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid(
                "session_ttl must be strictly positive".into(),
            ));
        }
        if authorized_at_max_age <= Duration::zero() {
            return Err(ConfigError::Invalid(
                "authorized_at_max_age must be strictly positive".into(),
            ));
        }
        if clock_skew_tolerance <= Duration::zero() {
            return Err(ConfigError::Invalid(
                "clock_skew_tolerance must be strictly positive".into(),
            ));
        }
        if read_capability.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "read_capability cannot be empty".into(),
            ));
        }

        Ok(Self {
            session_ttl,
            authorized_at_max_age,
            clock_skew_tolerance,
            read_capability,
        })
    }

    /// Conservative defaults: 1 h session TTL, 15 min authorisation age,
    /// 5 min forward skew, `can_read_clinical_note`.
    pub fn with_defaults() -> Self {
        Self {
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            authorized_at_max_age: Duration::seconds(DEFAULT_AUTHORIZED_AT_MAX_AGE_SECS),
            clock_skew_tolerance: Duration::seconds(DEFAULT_CLOCK_SKEW_TOLERANCE_SECS),
            read_capability: READ_NOTE_CAPABILITY.to_owned(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn authorized_at_max_age(&self) -> Duration {
        self.authorized_at_max_age
    }

    pub fn clock_skew_tolerance(&self) -> Duration {
        self.clock_skew_tolerance
    }

    pub fn read_capability(&self) -> &str {
        &self.read_capability
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse a duration (in whole seconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default_secs`. The
/// caller owns reading the environment; this function never does.
pub fn duration_secs_from_env_value(
    value: Option<String>,
    default_secs: i64,
) -> Result<Duration, ConfigError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let secs = match value {
        Some(v) => v
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid(format!("invalid duration seconds: {e}")))?,
        None => default_secs,
    };

    if secs <= 0 {
        return Err(ConfigError::Invalid(
            "duration seconds must be strictly positive".into(),
        ));
    }

    Ok(Duration::seconds(secs))
}
