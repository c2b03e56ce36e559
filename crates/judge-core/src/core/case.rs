// judge-core/src/core/case.rs
// ============================================================================
// Module: Case, CheckerRef, InteractorRef
// Description: Read-only handles resolved from the Fingerprint Store,
//              borrowed for the lifetime of one judging run.
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use super::fingerprint::Fingerprint;

/// One test case, resolved lazily from its [`Fingerprint`] by a
/// [`crate::CaseStore`] lookup.
///
/// Read-only and borrowed: the Orchestrator never writes through a `Case`,
/// and its paths must already exist by the time the runner touches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    fingerprint: Fingerprint,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Case {
    /// Builds a case from its fingerprint and the resolved on-disk paths
    /// of its input and expected-output files.
    #[must_use]
    pub const fn new(fingerprint: Fingerprint, input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            fingerprint,
            input_path,
            output_path,
        }
    }

    /// Returns the case's fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the resolved input file path.
    #[must_use]
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Returns the resolved expected-output file path.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// A resolved checker (special judge) artifact.
///
/// An empty `checker_fingerprint` on a [`crate::JudgeRequest`] resolves to
/// [`Fingerprint::default_checker`] rather than to a real
/// [`crate::CaseStore`] lookup, in which case `artifact_path` and `lang`
/// are meaningless and [`CheckerRef::is_default`] is the only field a
/// caller should consult.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerRef {
    fingerprint: Fingerprint,
    artifact_path: Option<PathBuf>,
    lang: Option<String>,
}

impl CheckerRef {
    /// Builds a reference to a compiled, store-resolved checker.
    #[must_use]
    pub const fn compiled(fingerprint: Fingerprint, artifact_path: PathBuf, lang: String) -> Self {
        Self {
            fingerprint,
            artifact_path: Some(artifact_path),
            lang: Some(lang),
        }
    }

    /// Builds the reserved reference to the in-process byte comparator.
    #[must_use]
    pub fn default_comparator() -> Self {
        Self {
            fingerprint: Fingerprint::default_checker(),
            artifact_path: None,
            lang: None,
        }
    }

    /// Returns true if this reference designates the default comparator
    /// rather than a compiled checker artifact.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.artifact_path.is_none()
    }

    /// Returns the checker's fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the resolved artifact path, absent for the default
    /// comparator.
    #[must_use]
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// Returns the checker's language tag, absent for the default
    /// comparator.
    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }
}

/// A resolved interactor artifact, selecting interactive judging mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractorRef {
    fingerprint: Fingerprint,
    artifact_path: PathBuf,
    lang: String,
}

impl InteractorRef {
    /// Builds a reference to a compiled, store-resolved interactor.
    #[must_use]
    pub const fn new(fingerprint: Fingerprint, artifact_path: PathBuf, lang: String) -> Self {
        Self {
            fingerprint,
            artifact_path,
            lang,
        }
    }

    /// Returns the interactor's fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Returns the resolved artifact path.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Returns the interactor's language tag.
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }
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
    fn default_comparator_has_no_artifact() {
        let checker = CheckerRef::default_comparator();
        assert!(checker.is_default());
        assert!(checker.artifact_path().is_none());
        assert!(checker.fingerprint().is_default_checker());
    }

    #[test]
    fn compiled_checker_carries_artifact_and_lang() {
        let fp = Fingerprint::new("chk1").expect("valid");
        let checker = CheckerRef::compiled(fp, PathBuf::from("/store/chk1/bin"), "cpp17".into());
        assert!(!checker.is_default());
        assert_eq!(checker.lang(), Some("cpp17"));
    }
}
