//! Caller context for record operations.
//!
//! The boundary hands the core two shapes: an unvalidated
//! [`ReadRequestContext`] carrying whatever the transport supplied, and a
//! validated [`AuthContext`] produced once the raw material has passed the
//! read guard. Capabilities travel as a typed [`CapabilitySet`] inside the
//! core; the legacy `name:revoked` wire suffix is parsed exactly once, at
//! [`CapabilitySet::from_tokens`], and never consulted again.

use recordgate_types::{ActorId, CorrelationId, TenantId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Tri-state lookup result for a named capability.
///
/// A revoked capability is not the same as an absent one: the read guard
/// reports them as distinct denial reasons to its audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityState {
    Absent,
    Granted,
    Revoked,
}

/// Set of named capabilities with per-entry revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    entries: HashMap<String, bool>,
}

/// Wire suffix marking a revoked capability token. Parsed only at the
/// boundary, inside [`CapabilitySet::from_tokens`].
const REVOKED_SUFFIX: &str = ":revoked";

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a capability, clearing any earlier revocation of it.
    pub fn grant(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), false);
    }

    /// Revoke a capability. Revocation wins over a grant in the same set.
    pub fn revoke(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), true);
    }

    /// Parse wire tokens into a typed set. A token ending in `:revoked`
    /// marks that capability revoked; blank tokens are discarded. When the
    /// same capability appears both plain and revoked, revoked wins.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for token in tokens {
            let token = token.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            if let Some(name) = token.strip_suffix(REVOKED_SUFFIX) {
                let name = name.trim();
                if !name.is_empty() {
                    set.revoke(name);
                }
            } else if !set.entries.get(token).copied().unwrap_or(false) {
                set.grant(token);
            }
        }
        set
    }

    pub fn state(&self, name: &str) -> CapabilityState {
        match self.entries.get(name) {
            None => CapabilityState::Absent,
            Some(false) => CapabilityState::Granted,
            Some(true) => CapabilityState::Revoked,
        }
    }

    /// True only for a capability that is present and not revoked.
    pub fn allows(&self, name: &str) -> bool {
        self.state(name) == CapabilityState::Granted
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unvalidated context for a guarded read, exactly as the transport
/// supplied it. Every field may be missing or malformed; the read guard
/// decides, in a fixed order, which defect denies the request.
#[derive(Debug, Clone, Default)]
pub struct ReadRequestContext {
    pub tenant_id: Option<String>,
    pub clinician_id: Option<String>,
    /// RFC 3339 timestamp of when the caller's authorisation was issued.
    pub authorized_at: Option<String>,
    pub correlation_id: Option<String>,
    pub capabilities: CapabilitySet,
}

/// Validated caller context for mutating record operations. Built at the
/// boundary after header authentication succeeds.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub tenant_id: TenantId,
    /// Absent for callers that authenticated without a clinician identity;
    /// signing requires it.
    pub clinician_id: Option<ActorId>,
    pub authorized_at: DateTime<Utc>,
    pub correlation_id: Option<CorrelationId>,
    pub capabilities: CapabilitySet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_capability_allows() {
        let mut caps = CapabilitySet::new();
        caps.grant("can_read_clinical_note");
        assert!(caps.allows("can_read_clinical_note"));
        assert_eq!(
            caps.state("can_read_clinical_note"),
            CapabilityState::Granted
        );
    }

    #[test]
    fn absent_and_revoked_are_distinct_states() {
        let mut caps = CapabilitySet::new();
        caps.revoke("can_read_clinical_note");
        assert_eq!(caps.state("missing"), CapabilityState::Absent);
        assert_eq!(
            caps.state("can_read_clinical_note"),
            CapabilityState::Revoked
        );
        assert!(!caps.allows("can_read_clinical_note"));
    }

    #[test]
    fn wire_tokens_parse_revoked_suffix_once() {
        let caps = CapabilitySet::from_tokens([
            "can_read_clinical_note",
            "can_amend_clinical_note:revoked",
        ]);
        assert!(caps.allows("can_read_clinical_note"));
        assert_eq!(
            caps.state("can_amend_clinical_note"),
            CapabilityState::Revoked
        );
        // The suffixed spelling is a wire artefact, not a capability name.
        assert_eq!(
            caps.state("can_amend_clinical_note:revoked"),
            CapabilityState::Absent
        );
    }

    #[test]
    fn revocation_wins_over_grant_regardless_of_token_order() {
        let caps = CapabilitySet::from_tokens(["cap-a:revoked", "cap-a"]);
        assert_eq!(caps.state("cap-a"), CapabilityState::Revoked);

        let caps = CapabilitySet::from_tokens(["cap-a", "cap-a:revoked"]);
        assert_eq!(caps.state("cap-a"), CapabilityState::Revoked);
    }

    #[test]
    fn blank_tokens_are_discarded() {
        let caps = CapabilitySet::from_tokens(["", "   ", ":revoked"]);
        assert!(caps.is_empty());
    }

    #[test]
    fn tokens_are_trimmed_before_parsing() {
        let caps = CapabilitySet::from_tokens(["  can_read_clinical_note  "]);
        assert!(caps.allows("can_read_clinical_note"));
    }
}
