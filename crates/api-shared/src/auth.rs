//! Header-based caller authentication, usable by any HTTP surface.
//!
//! The raw header values are collected by the transport and handed here as
//! [`RawCallerHeaders`]. For mutating routes, [`authenticate`] validates
//! them into a core [`AuthContext`]; the guarded read path instead takes
//! the raw [`ReadRequestContext`] projection so the core can run its own
//! ordered checks.

use chrono::{DateTime, Utc};
use recordgate_core::{AuthContext, CapabilitySet, ReadRequestContext};
use recordgate_types::{ActorId, CorrelationId, TenantId};

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const CLINICIAN_HEADER: &str = "x-clinician-id";
pub const AUTHORIZED_AT_HEADER: &str = "x-authorized-at";
pub const CORRELATION_HEADER: &str = "x-correlation-id";
/// Comma-separated capability tokens; a `name:revoked` token marks the
/// capability revoked.
pub const CAPABILITIES_HEADER: &str = "x-capabilities";

/// Caller headers exactly as received, before any validation.
#[derive(Debug, Clone, Default)]
pub struct RawCallerHeaders {
    pub tenant_id: Option<String>,
    pub clinician_id: Option<String>,
    pub authorized_at: Option<String>,
    pub correlation_id: Option<String>,
    pub capabilities: Option<String>,
}

impl RawCallerHeaders {
    /// Project the raw headers into the unvalidated context consumed by
    /// the guarded read path. Capability tokens are parsed here, once.
    pub fn read_context(&self) -> ReadRequestContext {
        ReadRequestContext {
            tenant_id: self.tenant_id.clone(),
            clinician_id: self.clinician_id.clone(),
            authorized_at: self.authorized_at.clone(),
            correlation_id: self.correlation_id.clone(),
            capabilities: CapabilitySet::from_tokens(
                self.capabilities.as_deref().unwrap_or("").split(','),
            ),
        }
    }
}

/// Why header authentication failed. Never serialised to the wire; the
/// caller always receives a generic unauthenticated body.
#[derive(Debug, thiserror::Error)]
pub enum AuthFailure {
    #[error("tenant header missing or malformed")]
    Tenant,
    #[error("clinician header malformed")]
    Clinician,
    #[error("authorised-at header missing or malformed")]
    AuthorizedAt,
    #[error("correlation header malformed")]
    Correlation,
}

/// Validate the caller headers for a mutating route.
///
/// The tenant and authorisation timestamp are mandatory; the clinician and
/// correlation ids are optional but must be well-formed when present.
/// Freshness of the timestamp is not judged here.
#[allow(clippy::result_large_err)]
pub fn authenticate(raw: &RawCallerHeaders) -> Result<AuthContext, AuthFailure> {
    let tenant_id = require(raw.tenant_id.as_deref())
        .and_then(|v| TenantId::parse(v).ok())
        .ok_or(AuthFailure::Tenant)?;

    let clinician_id = match require(raw.clinician_id.as_deref()) {
        Some(v) => Some(ActorId::parse(v).map_err(|_| AuthFailure::Clinician)?),
        None => None,
    };

    let authorized_at = require(raw.authorized_at.as_deref())
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or(AuthFailure::AuthorizedAt)?;

    let correlation_id = match require(raw.correlation_id.as_deref()) {
        Some(v) => Some(CorrelationId::parse(v).map_err(|_| AuthFailure::Correlation)?),
        None => None,
    };

    let capabilities =
        CapabilitySet::from_tokens(raw.capabilities.as_deref().unwrap_or("").split(','));

    Ok(AuthContext {
        tenant_id,
        clinician_id,
        authorized_at,
        correlation_id,
        capabilities,
    })
}

fn require(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
