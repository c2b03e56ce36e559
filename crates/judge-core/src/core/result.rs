// judge-core/src/core/result.rs
// ============================================================================
// Module: CaseResult
// Description: Per-case outcome record published as part of a snapshot's
//              `detail` sequence.
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;

use super::group::GroupId;
use super::verdict::Verdict;

/// Sentinel wire value designating "skipped due to group dependency".
///
/// Deliberately outside [`Verdict`]'s positive wire-value space so a
/// consumer can never confuse a skip with a judged verdict.
pub const SKIPPED_VERDICT: i32 = -3;

/// A case's judged verdict, or the distinguished "not judged" skip state.
///
/// Skipped cases are never aggregated into `sum_verdict` — see
/// [`crate::Orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseVerdict {
    /// The case ran and was judged.
    Judged(Verdict),
    /// The case was skipped because its group's dependency closure
    /// already failed.
    Skipped,
}

impl CaseVerdict {
    /// Returns the wire integer value: the verdict's own value, or
    /// [`SKIPPED_VERDICT`].
    #[must_use]
    pub const fn wire_value(self) -> i32 {
        match self {
            Self::Judged(verdict) => verdict.wire_value(),
            Self::Skipped => SKIPPED_VERDICT,
        }
    }

    /// Returns the judged verdict, or `None` if skipped.
    #[must_use]
    pub const fn judged(self) -> Option<Verdict> {
        match self {
            Self::Judged(verdict) => Some(verdict),
            Self::Skipped => None,
        }
    }
}

impl Serialize for CaseVerdict {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.wire_value())
    }
}

impl<'de> Deserialize<'de> for CaseVerdict {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        if value == SKIPPED_VERDICT {
            return Ok(Self::Skipped);
        }
        Verdict::from_wire_value(value).map(Self::Judged).ok_or_else(|| {
            D::Error::custom(format!("unknown case verdict wire value: {value}"))
        })
    }
}

/// Per-case outcome, as recorded in a [`crate::ProgressSnapshot`]'s
/// `detail` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseResult {
    /// The case's judged verdict, or the skip sentinel.
    pub verdict: CaseVerdict,
    /// Elapsed wall time in milliseconds, present iff observed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<u64>,
    /// Peak memory in kilobytes, present iff observed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub memory: Option<u64>,
    /// Checker diagnostic or infrastructure-error detail, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// The case's group id, present iff the submission was judged with
    /// groups.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub group: Option<GroupId>,
}

impl CaseResult {
    /// Builds a skip placeholder for a case in a skipped group.
    #[must_use]
    pub const fn skipped(group: GroupId) -> Self {
        Self {
            verdict: CaseVerdict::Skipped,
            time: None,
            memory: None,
            message: None,
            group: Some(group),
        }
    }

    /// Returns true if this case's verdict is [`Verdict::Accepted`].
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, CaseVerdict::Judged(verdict) if verdict.is_accepted())
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
    fn skipped_serializes_to_sentinel() {
        let result = CaseResult::skipped(GroupId::new(2));
        let json = serde_json::to_value(&result).expect("serializes");
        assert_eq!(json["verdict"], serde_json::json!(-3));
        assert_eq!(json["group"], serde_json::json!(2));
        assert!(json.get("time").is_none());
    }

    #[test]
    fn accepted_without_group_omits_group_key() {
        let result = CaseResult {
            verdict: CaseVerdict::Judged(Verdict::Accepted),
            time: Some(12),
            memory: Some(256),
            message: None,
            group: None,
        };
        let json = serde_json::to_value(&result).expect("serializes");
        assert!(json.get("group").is_none());
        assert!(json.get("message").is_none());
        assert_eq!(json["time"], serde_json::json!(12));
    }

    #[test]
    fn zero_time_is_preserved_not_discarded() {
        // Regression for the "presence, not truthiness" rule (§9).
        let result = CaseResult {
            verdict: CaseVerdict::Judged(Verdict::Accepted),
            time: Some(0),
            memory: Some(0),
            message: None,
            group: None,
        };
        let json = serde_json::to_value(&result).expect("serializes");
        assert_eq!(json["time"], serde_json::json!(0));
        assert_eq!(json["memory"], serde_json::json!(0));
    }
}
