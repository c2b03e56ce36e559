// judge-core/src/core/snapshot.rs
// ============================================================================
// Module: ProgressSnapshot
// Description: The judging state published to the progress cache, at
//              `sub_fingerprint` and reconstructed incrementally.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use super::result::CaseResult;
use super::verdict::Verdict;

/// Top-level snapshot status, distinguishing an in-progress or terminal
/// judging run from a catastrophic orchestrator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    /// Judging accepted the request and is in progress, or has reached a
    /// terminal verdict.
    Received,
    /// An uncaught orchestrator error replaced the snapshot; `message`
    /// carries a bounded traceback.
    Reject,
}

/// The judging state published to the progress cache at key
/// `sub_fingerprint`.
///
/// `detail` is append-only within a single run and its indices align 1:1
/// with the request's `case_list`; every intermediate snapshot's `detail`
/// is a prefix of the final snapshot's `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// `"received"` while judging or on terminal success; `"reject"` on
    /// catastrophic orchestrator failure.
    pub status: SnapshotStatus,
    /// Absent when `status = reject`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub verdict: Option<Verdict>,
    /// Absent when `status = reject`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<Vec<CaseResult>>,
    /// Maximum elapsed time across executed cases, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<u64>,
    /// Maximum peak memory across executed cases, in kilobytes.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub memory: Option<u64>,
    /// Compile diagnostic, or a bounded traceback when rejected.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl ProgressSnapshot {
    /// Builds the initial `"received"` / `JUDGING` snapshot with an empty
    /// `detail` sequence, published before any case has run.
    #[must_use]
    pub fn judging() -> Self {
        Self {
            status: SnapshotStatus::Received,
            verdict: Some(Verdict::Judging),
            detail: Some(Vec::new()),
            time: None,
            memory: None,
            message: None,
        }
    }

    /// Builds the `"reject"` snapshot for a catastrophic orchestrator
    /// failure, carrying a bounded traceback.
    #[must_use]
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            status: SnapshotStatus::Reject,
            verdict: None,
            detail: None,
            time: None,
            memory: None,
            message: Some(message.into()),
        }
    }

    /// Returns true if `self.detail` is a prefix of `other.detail` (both
    /// present), the monotonic-cache invariant from §8.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        match (&self.detail, &other.detail) {
            (Some(mine), Some(theirs)) => mine.len() <= theirs.len() && mine.as_slice() == &theirs[..mine.len()],
            (None, None) => true,
            _ => false,
        }
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
    use super::super::group::GroupId;
    use super::super::result::CaseVerdict;

    #[test]
    fn judging_snapshot_has_empty_detail() {
        let snapshot = ProgressSnapshot::judging();
        assert_eq!(snapshot.status, SnapshotStatus::Received);
        assert_eq!(snapshot.verdict, Some(Verdict::Judging));
        assert_eq!(snapshot.detail, Some(Vec::new()));
    }

    #[test]
    fn reject_snapshot_omits_verdict_and_detail_keys() {
        let snapshot = ProgressSnapshot::reject("boom");
        let json = serde_json::to_value(&snapshot).expect("serializes");
        assert!(json.get("verdict").is_none());
        assert!(json.get("detail").is_none());
        assert_eq!(json["status"], serde_json::json!("reject"));
    }

    #[test]
    fn prefix_check_detects_growth() {
        let early = ProgressSnapshot {
            status: SnapshotStatus::Received,
            verdict: Some(Verdict::Judging),
            detail: Some(vec![CaseResult::skipped(GroupId::new(1))]),
            time: None,
            memory: None,
            message: None,
        };
        let mut later = early.clone();
        later.detail.as_mut().expect("has detail").push(CaseResult {
            verdict: CaseVerdict::Judged(Verdict::Accepted),
            time: Some(5),
            memory: Some(10),
            message: None,
            group: None,
        });
        assert!(early.is_prefix_of(&later));
        assert!(!later.is_prefix_of(&early));
    }
}
