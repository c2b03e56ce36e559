// judge-core/src/core/group.rs
// ============================================================================
// Module: Group identifiers and the resolved dependency table
// Description: The data types produced by the Group Dependency Resolver
//              and consumed by the Judge Orchestrator's skip policy.
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Deserialize;
use serde::Serialize;

/// A test-case group identifier.
///
/// Groups need not be contiguous; this is a thin newtype purely to avoid
/// confusing a group id with a case index or a fingerprint in call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(i64);

impl GroupId {
    /// Builds a group id from its raw integer value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed group dependency edge: `dependent` requires `prerequisite`
/// to pass. Failure in `prerequisite` skips `dependent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDependencyEdge {
    /// The group that depends on `prerequisite`.
    pub dependent: GroupId,
    /// The group whose failure forces `dependent` to be skipped.
    pub prerequisite: GroupId,
}

/// Mapping from a group id `g` to the set of groups (including `g`
/// itself, when `g` is a prerequisite of anything) that must be skipped
/// whenever any case in `g` fails.
///
/// Built once per submission by [`crate::GroupDependencyResolver`] from
/// the declared edge list; see §4.3 of the design for the algorithm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDependencyTable {
    reachable: HashMap<GroupId, HashSet<GroupId>>,
}

impl GroupDependencyTable {
    /// Builds a table directly from its resolved reachable-set mapping.
    #[must_use]
    pub const fn from_reachable(reachable: HashMap<GroupId, HashSet<GroupId>>) -> Self {
        Self {
            reachable,
        }
    }

    /// Returns the empty table (no declared edges).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the set of groups that must be skipped when `group` fails,
    /// defaulting to `{group}` itself when the table has no entry for it
    /// (a group that only ever appears as a dependent, never as a
    /// prerequisite).
    #[must_use]
    pub fn skip_set(&self, group: GroupId) -> HashSet<GroupId> {
        self.reachable.get(&group).cloned().unwrap_or_else(|| {
            let mut fallback = HashSet::with_capacity(1);
            fallback.insert(group);
            fallback
        })
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reachable.is_empty()
    }

    /// Returns the edge list this table would imply, for round-trip
    /// idempotence tests (invariant 4 in §8): a pair `(dependent,
    /// prerequisite)` for every prerequisite-to-dependent relationship
    /// encoded by the reachable sets, excluding self-edges.
    #[must_use]
    pub fn to_edges(&self) -> Vec<GroupDependencyEdge> {
        let mut edges = Vec::new();
        for (&prerequisite, dependents) in &self.reachable {
            for &dependent in dependents {
                if dependent != prerequisite {
                    edges.push(GroupDependencyEdge {
                        dependent,
                        prerequisite,
                    });
                }
            }
        }
        edges
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
    fn empty_table_defaults_every_group_to_itself() {
        let table = GroupDependencyTable::empty();
        let skip = table.skip_set(GroupId::new(7));
        assert_eq!(skip, HashSet::from([GroupId::new(7)]));
    }
}
