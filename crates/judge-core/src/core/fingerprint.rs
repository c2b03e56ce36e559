// judge-core/src/core/fingerprint.rs
// ============================================================================
// Module: Fingerprint
// Description: Opaque content-addressed handle for cases, checkers,
//              interactors, and submissions.
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// The reserved fingerprint designating the in-process byte comparator.
///
/// An empty `checker_fingerprint` on a [`crate::JudgeRequest`] resolves to
/// this identifier rather than to a Fingerprint Store lookup.
pub const DEFAULT_CHECKER_FINGERPRINT: &str = "defaultspj";

/// Opaque printable identifier used as the sole handle by which cases,
/// checkers, interactors, and submissions are referenced across process
/// boundaries.
///
/// Fingerprints double as directory-name components in the reference
/// Fingerprint Store, so the constructor rejects values that would escape
/// a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Builds a fingerprint from a printable identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Empty`] for an empty string, and
    /// [`FingerprintError::PathHostile`] for a value containing a path
    /// separator, a NUL byte, or a `..` component.
    pub fn new(value: impl Into<String>) -> Result<Self, FingerprintError> {
        let value = value.into();
        if value.is_empty() {
            return Err(FingerprintError::Empty);
        }
        if value.contains('/') || value.contains('\0') || value == ".." || value == "." {
            return Err(FingerprintError::PathHostile(value));
        }
        Ok(Self(value))
    }

    /// Returns the reserved fingerprint for the default byte comparator.
    #[must_use]
    pub fn default_checker() -> Self {
        // Constructed from a compile-time-known-safe literal.
        #[expect(clippy::unwrap_used, reason = "DEFAULT_CHECKER_FINGERPRINT is a valid literal")]
        Self::new(DEFAULT_CHECKER_FINGERPRINT).unwrap()
    }

    /// Returns true if this is the reserved default-comparator fingerprint.
    #[must_use]
    pub fn is_default_checker(&self) -> bool {
        self.0 == DEFAULT_CHECKER_FINGERPRINT
    }

    /// Returns the fingerprint's printable representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors constructing a [`Fingerprint`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// The fingerprint string was empty.
    #[error("fingerprint must not be empty")]
    Empty,
    /// The fingerprint string cannot safely be used as a single path
    /// segment.
    #[error("fingerprint {0:?} is not a valid path segment")]
    PathHostile(String),
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_docs_in_private_items,
    reason = "test assertions use panic-based helpers for clarity"
)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert_eq!(Fingerprint::new(""), Err(FingerprintError::Empty));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(Fingerprint::new("a/b").is_err());
        assert!(Fingerprint::new("..").is_err());
        assert!(Fingerprint::new(".").is_err());
    }

    #[test]
    fn accepts_plain_identifier() {
        let fp = Fingerprint::new("abc123").expect("valid fingerprint");
        assert_eq!(fp.as_str(), "abc123");
    }

    #[test]
    fn default_checker_round_trips() {
        assert!(Fingerprint::default_checker().is_default_checker());
    }
}
