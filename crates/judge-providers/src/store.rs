// judge-providers/src/store.rs
// ============================================================================
// Module: Fingerprint Store
// Description: Resolves fingerprints to on-disk case, checker, and
//              interactor blobs laid out as a flat directory keyed by
//              fingerprint.
// Purpose: The reference implementation of judge-core's CaseStore
//          contract (§4.6 / §6).
// Dependencies: cap-std, judge-core
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use judge_core::Case;
use judge_core::CaseStore;
use judge_core::CheckerRef;
use judge_core::Fingerprint;
use judge_core::InteractorRef;
use judge_core::StoreError;

/// Name of the input file within a case's fingerprint directory.
const INPUT_FILE: &str = "input";
/// Name of the expected-output file within a case's fingerprint
/// directory.
const OUTPUT_FILE: &str = "output";
/// Name of the compiled-artifact file within a checker's or
/// interactor's fingerprint directory.
const ARTIFACT_FILE: &str = "artifact";
/// Name of the one-line language-tag descriptor file alongside
/// `ARTIFACT_FILE`.
const LANG_FILE: &str = "lang";

/// A read-only [`CaseStore`] backed by a flat directory of fingerprint
/// subdirectories, one per case, checker, or interactor blob.
///
/// Each blob's subdirectory is named after its fingerprint; cases carry
/// `input`/`output` files, checkers and interactors carry an `artifact`
/// file plus a one-line `lang` descriptor. The root is opened once via
/// `cap_std` so every subsequent lookup is confined beneath it regardless
/// of what a malformed fingerprint string might otherwise resolve to —
/// though [`Fingerprint::new`] already rejects path-hostile values before
/// one ever reaches here.
pub struct FlatDirectoryCaseStore {
    root: Dir,
    root_path: PathBuf,
}

impl FlatDirectoryCaseStore {
    /// Opens a store rooted at `root_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `root_path` does not exist or is not
    /// a directory.
    pub fn open(root_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root_path = root_path.into();
        let root = Dir::open_ambient_dir(&root_path, ambient_authority()).map_err(StoreError::Io)?;
        Ok(Self { root, root_path })
    }

    /// Opens the fingerprint's subdirectory, translating a missing
    /// directory into [`StoreError::NotFound`].
    fn open_blob(&self, fingerprint: &Fingerprint) -> Result<Dir, StoreError> {
        self.root.open_dir(fingerprint.as_str()).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(fingerprint.clone())
            } else {
                StoreError::Io(err)
            }
        })
    }

    /// Reads a required text descriptor (e.g. `lang`) from within a
    /// blob's subdirectory, trimmed of surrounding whitespace.
    fn read_descriptor(blob: &Dir, name: &str, fingerprint: &Fingerprint) -> Result<String, StoreError> {
        let contents = blob
            .read_to_string(name)
            .map_err(|err| Self::malformed_or_io(err, fingerprint, name))?;
        Ok(contents.trim().to_string())
    }

    /// Confirms a required file exists within a blob's subdirectory,
    /// returning its path relative to the store root.
    fn require_file(&self, fingerprint: &Fingerprint, name: &str) -> Result<PathBuf, StoreError> {
        let blob = self.open_blob(fingerprint)?;
        if !blob.exists(name) {
            return Err(StoreError::Malformed(fingerprint.clone(), format!("missing {name} file")));
        }
        Ok(self.root_path.join(fingerprint.as_str()).join(name))
    }

    /// Translates a missing-file error reading `name` into
    /// [`StoreError::Malformed`]; anything else passes through as
    /// [`StoreError::Io`].
    fn malformed_or_io(err: std::io::Error, fingerprint: &Fingerprint, name: &str) -> StoreError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StoreError::Malformed(fingerprint.clone(), format!("missing {name} file"))
        } else {
            StoreError::Io(err)
        }
    }
}

impl CaseStore for FlatDirectoryCaseStore {
    fn resolve_case(&self, fingerprint: &Fingerprint) -> Result<Case, StoreError> {
        let input_path = self.require_file(fingerprint, INPUT_FILE)?;
        let output_path = self.require_file(fingerprint, OUTPUT_FILE)?;
        Ok(Case::new(fingerprint.clone(), input_path, output_path))
    }

    fn resolve_checker(&self, fingerprint: &Fingerprint) -> Result<CheckerRef, StoreError> {
        if fingerprint.is_default_checker() {
            return Ok(CheckerRef::default_comparator());
        }
        let blob = self.open_blob(fingerprint)?;
        let lang = Self::read_descriptor(&blob, LANG_FILE, fingerprint)?;
        let artifact_path = self.require_file(fingerprint, ARTIFACT_FILE)?;
        Ok(CheckerRef::compiled(fingerprint.clone(), artifact_path, lang))
    }

    fn resolve_interactor(&self, fingerprint: &Fingerprint) -> Result<InteractorRef, StoreError> {
        let blob = self.open_blob(fingerprint)?;
        let lang = Self::read_descriptor(&blob, LANG_FILE, fingerprint)?;
        let artifact_path = self.require_file(fingerprint, ARTIFACT_FILE)?;
        Ok(InteractorRef::new(fingerprint.clone(), artifact_path, lang))
    }
}

/// Writes a case blob into `root`, for tests and store seeding.
#[cfg(test)]
fn write_case_blob(root: &Path, fingerprint: &str, input: &str, output: &str) {
    let dir = root.join(fingerprint);
    std::fs::create_dir_all(&dir).expect("create blob dir");
    std::fs::write(dir.join(INPUT_FILE), input).expect("write input");
    std::fs::write(dir.join(OUTPUT_FILE), output).expect("write output");
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
    fn resolves_case_input_and_output_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_case_blob(dir.path(), "case1", "3 4\n", "7\n");
        let store = FlatDirectoryCaseStore::open(dir.path()).expect("opens");
        let fp = Fingerprint::new("case1").expect("valid");
        let case = store.resolve_case(&fp).expect("resolves");
        assert_eq!(std::fs::read_to_string(case.input_path()).expect("read"), "3 4\n");
        assert_eq!(std::fs::read_to_string(case.output_path()).expect("read"), "7\n");
    }

    #[test]
    fn missing_fingerprint_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FlatDirectoryCaseStore::open(dir.path()).expect("opens");
        let fp = Fingerprint::new("ghost").expect("valid");
        assert!(matches!(store.resolve_case(&fp), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn missing_output_file_is_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob = dir.path().join("half");
        std::fs::create_dir_all(&blob).expect("create blob dir");
        std::fs::write(blob.join(INPUT_FILE), "x").expect("write input");
        let store = FlatDirectoryCaseStore::open(dir.path()).expect("opens");
        let fp = Fingerprint::new("half").expect("valid");
        assert!(matches!(store.resolve_case(&fp), Err(StoreError::Malformed(_, _))));
    }

    #[test]
    fn empty_checker_fingerprint_resolves_to_default_comparator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FlatDirectoryCaseStore::open(dir.path()).expect("opens");
        let checker = store.resolve_checker(&Fingerprint::default_checker()).expect("resolves");
        assert!(checker.is_default());
    }

    #[test]
    fn resolves_compiled_checker_with_lang_descriptor() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blob = dir.path().join("chk1");
        std::fs::create_dir_all(&blob).expect("create blob dir");
        std::fs::write(blob.join(ARTIFACT_FILE), []).expect("write artifact");
        std::fs::write(blob.join(LANG_FILE), "cpp17\n").expect("write lang");
        let store = FlatDirectoryCaseStore::open(dir.path()).expect("opens");
        let fp = Fingerprint::new("chk1").expect("valid");
        let checker = store.resolve_checker(&fp).expect("resolves");
        assert!(!checker.is_default());
        assert_eq!(checker.lang(), Some("cpp17"));
    }
}
