//! Validated identifier types shared across RecordGate crates.
//!
//! Every identifier that crosses the boundary (tenant, patient, actor, note,
//! encounter, correlation) is wrapped in a newtype that guarantees its content
//! once constructed:
//!
//! - non-empty after trimming
//! - bounded length
//! - a conservative ASCII character set (alphanumeric plus `.`, `-`, `_`)
//!
//! Identifiers are opaque: nothing in this crate interprets their content.
//! Constructing one from untrusted input goes through [`parse`](TenantId::parse)
//! so malformed values are rejected at the edge, before any decision logic
//! sees them.

/// Maximum accepted length for any identifier, in bytes.
///
/// Bounded to avoid pathological inputs reaching storage keys or log fields.
pub const MAX_ID_LEN: usize = 128;

/// Errors that can occur when constructing validated identifiers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The input was empty or contained only whitespace.
    #[error("identifier cannot be empty")]
    Empty,
    /// The input exceeded [`MAX_ID_LEN`] bytes.
    #[error("identifier exceeds maximum length of {MAX_ID_LEN} characters")]
    TooLong,
    /// The input contained characters outside the allowed set.
    #[error("identifier contains invalid characters (only alphanumeric, '.', '-', '_' allowed)")]
    InvalidCharacters,
}

fn validate_identifier(input: &str) -> Result<&str, IdentityError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::Empty);
    }
    if trimmed.len() > MAX_ID_LEN {
        return Err(IdentityError::TooLong);
    }
    let ok = trimmed
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
    if !ok {
        return Err(IdentityError::InvalidCharacters);
    }
    Ok(trimmed)
}

macro_rules! identifier_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Parses an identifier from untrusted input.
            ///
            /// The input is trimmed of surrounding whitespace. Returns an
            /// [`IdentityError`] if the trimmed value is empty, too long, or
            /// contains characters outside the allowed set.
            pub fn parse(input: impl AsRef<str>) -> Result<Self, IdentityError> {
                validate_identifier(input.as_ref()).map(|s| Self(s.to_owned()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $name::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

identifier_type! {
    /// An isolated customer/organisation partition.
    ///
    /// No data or decision may cross tenant boundaries; comparing two
    /// `TenantId`s is the tenant-isolation check.
    TenantId
}

identifier_type! {
    /// The subject of a health record.
    PatientId
}

identifier_type! {
    /// The identity attempting an operation (patient, representative,
    /// clinician, or service).
    ActorId
}

identifier_type! {
    /// A clinical note identifier, unique within its tenant partition.
    NoteId
}

identifier_type! {
    /// The clinical encounter a note belongs to.
    EncounterId
}

identifier_type! {
    /// An opaque identifier linking a request to its audit trail.
    ///
    /// Not itself sensitive; safe to log.
    CorrelationId
}
