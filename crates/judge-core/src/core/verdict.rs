// judge-core/src/core/verdict.rs
// ============================================================================
// Module: Verdict
// Description: Closed verdict enumeration with a stable wire integer value.
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;

/// Closed verdict enumeration.
///
/// Ordering (`Ord`) exists only for stable display purposes; aggregation
/// never uses it — `sum_verdict` is computed by first-failure-wins over
/// submission order, never by comparing verdicts (see
/// [`crate::Orchestrator`]).
///
/// Each variant carries a stable integer value used on the wire; the
/// symbolic name is never serialized (see [`Verdict::wire_value`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verdict {
    /// Judging is still in progress.
    Judging,
    /// All cases passed.
    Accepted,
    /// A case's output did not match the expected output.
    WrongAnswer,
    /// A case exceeded the wall-time limit.
    TimeLimitExceeded,
    /// A case exceeded the memory limit.
    MemoryLimitExceeded,
    /// A case terminated abnormally (nonzero exit or signal).
    RuntimeError,
    /// The submission failed to compile.
    CompileError,
    /// A case produced no output for longer than the idleness limit.
    IdlenessLimitExceeded,
    /// A case-level infrastructure error prevented judgement.
    JudgementFailed,
}

impl Verdict {
    /// Returns the stable wire integer value for this verdict.
    ///
    /// These values mirror the reference `ejudge` implementation's
    /// `Verdict` enum so that existing polling clients are unaffected by
    /// a change of judging backend.
    #[must_use]
    pub const fn wire_value(self) -> i32 {
        match self {
            Self::Judging => 0,
            Self::Accepted => 1,
            Self::WrongAnswer => 2,
            Self::TimeLimitExceeded => 3,
            Self::MemoryLimitExceeded => 4,
            Self::RuntimeError => 5,
            Self::CompileError => 6,
            Self::IdlenessLimitExceeded => 7,
            Self::JudgementFailed => 8,
        }
    }

    /// Parses a verdict back from its wire integer value.
    #[must_use]
    pub const fn from_wire_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Judging),
            1 => Some(Self::Accepted),
            2 => Some(Self::WrongAnswer),
            3 => Some(Self::TimeLimitExceeded),
            4 => Some(Self::MemoryLimitExceeded),
            5 => Some(Self::RuntimeError),
            6 => Some(Self::CompileError),
            7 => Some(Self::IdlenessLimitExceeded),
            8 => Some(Self::JudgementFailed),
            _ => None,
        }
    }

    /// Returns true if this verdict represents a fully accepted case.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Judging => "JUDGING",
            Self::Accepted => "ACCEPTED",
            Self::WrongAnswer => "WRONG_ANSWER",
            Self::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Self::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::CompileError => "COMPILE_ERROR",
            Self::IdlenessLimitExceeded => "IDLENESS_LIMIT_EXCEEDED",
            Self::JudgementFailed => "JUDGEMENT_FAILED",
        };
        f.write_str(label)
    }
}

impl Serialize for Verdict {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.wire_value())
    }
}

impl<'de> Deserialize<'de> for Verdict {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i32::deserialize(deserializer)?;
        Self::from_wire_value(value)
            .ok_or_else(|| D::Error::custom(format!("unknown verdict wire value: {value}")))
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
    fn wire_value_round_trips_every_variant() {
        let all = [
            Verdict::Judging,
            Verdict::Accepted,
            Verdict::WrongAnswer,
            Verdict::TimeLimitExceeded,
            Verdict::MemoryLimitExceeded,
            Verdict::RuntimeError,
            Verdict::CompileError,
            Verdict::IdlenessLimitExceeded,
            Verdict::JudgementFailed,
        ];
        for verdict in all {
            let roundtrip = Verdict::from_wire_value(verdict.wire_value());
            assert_eq!(roundtrip, Some(verdict));
        }
    }

    #[test]
    fn serializes_as_integer_not_name() {
        let json = serde_json::to_string(&Verdict::WrongAnswer).expect("serializes");
        assert_eq!(json, "2");
    }

    #[test]
    fn unknown_wire_value_fails_to_deserialize() {
        let result: Result<Verdict, _> = serde_json::from_str("99");
        assert!(result.is_err());
    }
}
