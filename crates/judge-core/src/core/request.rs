// judge-core/src/core/request.rs
// ============================================================================
// Module: JudgeRequest
// Description: Validated inputs to one Judge Orchestrator invocation.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use super::fingerprint::Fingerprint;
use super::group::GroupId;

/// A directed group dependency edge as received on the wire: `(dependent,
/// prerequisite)`, i.e. "group `dependent` requires group `prerequisite`
/// to pass".
pub type RawGroupEdge = (i64, i64);

/// Inputs to one [`crate::Orchestrator::judge`] invocation.
///
/// Construction is the only validation point: `group_list`, when present,
/// must have the same length as `case_list` (enforced by
/// [`JudgeRequest::new`], not by the orchestrator itself).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Submission identifier; doubles as the progress cache key and the
    /// `report_<fp>` prefix.
    pub sub_fingerprint: Fingerprint,
    /// Submission source bytes.
    pub sub_code: Vec<u8>,
    /// Submission language tag, interpreted by the Submission Builder.
    pub sub_lang: String,
    /// Ordered sequence of case fingerprints.
    pub case_list: Vec<Fingerprint>,
    /// Per-case wall time limit, in milliseconds.
    pub max_time_ms: u64,
    /// Per-case memory limit, in kilobytes.
    pub max_memory_kb: u64,
    /// Checker fingerprint; empty resolves to the default comparator.
    #[serde(default)]
    pub checker_fingerprint: Option<Fingerprint>,
    /// Interactor fingerprint; presence selects interactive mode.
    #[serde(default)]
    pub interactor_fingerprint: Option<Fingerprint>,
    /// When false, judging halts early on first failure for ungrouped
    /// submissions and skips dependency closures for grouped ones. When
    /// true, every case runs regardless of prior failures.
    pub run_until_complete: bool,
    /// Group id of each case, aligned 1:1 with `case_list`. Absent means
    /// the submission is judged without groups.
    #[serde(default)]
    pub group_list: Option<Vec<GroupId>>,
    /// Declared group dependency edges: `(dependent, prerequisite)`.
    /// Absent and empty are both treated as "no dependencies".
    #[serde(default)]
    pub group_dependencies: Option<Vec<RawGroupEdge>>,
}

/// Error constructing a [`JudgeRequest`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum JudgeRequestError {
    /// `group_list` was present but its length did not match `case_list`.
    #[error("group_list has {group_len} entries but case_list has {case_len}")]
    GroupListLengthMismatch {
        /// Length of `group_list`.
        group_len: usize,
        /// Length of `case_list`.
        case_len: usize,
    },
}

impl JudgeRequest {
    /// Builds a request, validating that `group_list` (if present) aligns
    /// with `case_list`.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeRequestError::GroupListLengthMismatch`] if the two
    /// sequences' lengths disagree.
    #[expect(clippy::too_many_arguments, reason = "mirrors the flat orchestrator entry contract in §4.1")]
    pub fn new(
        sub_fingerprint: Fingerprint,
        sub_code: Vec<u8>,
        sub_lang: String,
        case_list: Vec<Fingerprint>,
        max_time_ms: u64,
        max_memory_kb: u64,
        checker_fingerprint: Option<Fingerprint>,
        interactor_fingerprint: Option<Fingerprint>,
        run_until_complete: bool,
        group_list: Option<Vec<GroupId>>,
        group_dependencies: Option<Vec<RawGroupEdge>>,
    ) -> Result<Self, JudgeRequestError> {
        if let Some(groups) = &group_list {
            if groups.len() != case_list.len() {
                return Err(JudgeRequestError::GroupListLengthMismatch {
                    group_len: groups.len(),
                    case_len: case_list.len(),
                });
            }
        }
        Ok(Self {
            sub_fingerprint,
            sub_code,
            sub_lang,
            case_list,
            max_time_ms,
            max_memory_kb,
            checker_fingerprint,
            interactor_fingerprint,
            run_until_complete,
            group_list,
            group_dependencies,
        })
    }

    /// Returns the effective checker fingerprint, resolving an absent or
    /// empty value to the default comparator.
    #[must_use]
    pub fn effective_checker_fingerprint(&self) -> Fingerprint {
        self.checker_fingerprint.clone().unwrap_or_else(Fingerprint::default_checker)
    }

    /// Returns true if this request selects interactive judging mode.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        self.interactor_fingerprint.is_some()
    }

    /// Returns the compile time budget, per §4.1:
    /// `max(max_time_ms * 5, 15_000)` milliseconds.
    #[must_use]
    pub fn compile_budget_ms(&self) -> u64 {
        self.max_time_ms.saturating_mul(5).max(15_000)
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

    fn fp(value: &str) -> Fingerprint {
        Fingerprint::new(value).expect("valid fingerprint")
    }

    #[test]
    fn rejects_mismatched_group_list_length() {
        let result = JudgeRequest::new(
            fp("sub1"),
            b"int main(){}".to_vec(),
            "cpp17".to_string(),
            vec![fp("c1"), fp("c2")],
            1000,
            262_144,
            None,
            None,
            false,
            Some(vec![GroupId::new(1)]),
            None,
        );
        assert!(matches!(result, Err(JudgeRequestError::GroupListLengthMismatch { group_len: 1, case_len: 2 })));
    }

    #[test]
    fn empty_checker_fingerprint_resolves_to_default() {
        let request = JudgeRequest::new(
            fp("sub1"),
            Vec::new(),
            "cpp17".to_string(),
            Vec::new(),
            1000,
            262_144,
            None,
            None,
            false,
            None,
            None,
        )
        .expect("valid request");
        assert!(request.effective_checker_fingerprint().is_default_checker());
    }

    #[test]
    fn compile_budget_floors_at_fifteen_seconds() {
        let request = JudgeRequest::new(
            fp("sub1"),
            Vec::new(),
            "cpp17".to_string(),
            Vec::new(),
            1000,
            262_144,
            None,
            None,
            false,
            None,
            None,
        )
        .expect("valid request");
        assert_eq!(request.compile_budget_ms(), 15_000);
    }

    #[test]
    fn compile_budget_scales_with_max_time() {
        let request = JudgeRequest::new(
            fp("sub1"),
            Vec::new(),
            "cpp17".to_string(),
            Vec::new(),
            5_000,
            262_144,
            None,
            None,
            false,
            None,
            None,
        )
        .expect("valid request");
        assert_eq!(request.compile_budget_ms(), 25_000);
    }
}
