// judge-core/src/runtime/group_resolver.rs
// ============================================================================
// Module: Group Dependency Resolver
// Description: Pure function over a declared edge list, producing the
//              per-group transitive skip closure.
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;

use crate::core::GroupDependencyTable;
use crate::core::GroupId;
use crate::core::RawGroupEdge;

/// Resolves declared group dependency edges into a
/// [`GroupDependencyTable`].
///
/// Stateless; every call is independent. Grounded directly in the
/// reference `trace_group_dependencies` routine: build a forward
/// adjacency from prerequisite to its immediate dependents, then depth-
/// first from every prerequisite to compute its reachable set.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupDependencyResolver;

impl GroupDependencyResolver {
    /// Builds a new resolver. Stateless; provided for call-site symmetry
    /// with the other runtime components.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves `edges` (each `(dependent, prerequisite)`, meaning
    /// "failure in `prerequisite` skips `dependent`") into a table
    /// mapping each prerequisite to the full set of groups — including
    /// itself — reachable from it.
    ///
    /// `None` and `Some(&[])` both yield the empty table. Duplicate
    /// edges are idempotent; self-loops and cycles are tolerated and
    /// produce mutually-including reachable sets, never an infinite
    /// loop, because the visited set is checked before recursing.
    #[must_use]
    pub fn resolve(&self, edges: Option<&[RawGroupEdge]>) -> GroupDependencyTable {
        let Some(edges) = edges else {
            return GroupDependencyTable::empty();
        };
        if edges.is_empty() {
            return GroupDependencyTable::empty();
        }

        let mut forward: HashMap<GroupId, HashSet<GroupId>> = HashMap::new();
        for &(dependent, prerequisite) in edges {
            let dependent = GroupId::new(dependent);
            let prerequisite = GroupId::new(prerequisite);
            forward.entry(prerequisite).or_default().insert(dependent);
        }

        let mut reachable: HashMap<GroupId, HashSet<GroupId>> = HashMap::new();
        for &prerequisite in forward.keys() {
            let mut visited = HashSet::new();
            Self::depth_first(prerequisite, &forward, &mut visited);
            reachable.insert(prerequisite, visited);
        }

        GroupDependencyTable::from_reachable(reachable)
    }

    /// Visits every group reachable from `group` via `forward`, recording
    /// each into `visited`. A group already in `visited` is not
    /// revisited, which bounds this to one pass per edge even over a
    /// cycle.
    fn depth_first(group: GroupId, forward: &HashMap<GroupId, HashSet<GroupId>>, visited: &mut HashSet<GroupId>) {
        if !visited.insert(group) {
            return;
        }
        if let Some(dependents) = forward.get(&group) {
            for &next in dependents {
                Self::depth_first(next, forward, visited);
            }
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

    #[test]
    fn null_edges_yield_empty_table() {
        let table = GroupDependencyResolver::new().resolve(None);
        assert!(table.is_empty());
    }

    #[test]
    fn empty_edges_yield_empty_table() {
        let table = GroupDependencyResolver::new().resolve(Some(&[]));
        assert!(table.is_empty());
    }

    #[test]
    fn transitive_chain_is_fully_reachable() {
        // (2,1): group 2 requires group 1. (3,2): group 3 requires group 2.
        // (3,1): group 3 requires group 1, directly too.
        let table = GroupDependencyResolver::new().resolve(Some(&[(2, 1), (3, 2), (3, 1)]));
        let skip_from_1 = table.skip_set(GroupId::new(1));
        assert!(skip_from_1.contains(&GroupId::new(1)));
        assert!(skip_from_1.contains(&GroupId::new(2)));
        assert!(skip_from_1.contains(&GroupId::new(3)));
    }

    #[test]
    fn dependent_only_group_is_not_a_table_key() {
        let table = GroupDependencyResolver::new().resolve(Some(&[(2, 1)]));
        // Group 2 only ever appears as a dependent; it defaults to {2} at
        // the orchestrator level via GroupDependencyTable::skip_set,
        // rather than being a key here.
        assert_eq!(table.skip_set(GroupId::new(2)), std::collections::HashSet::from([GroupId::new(2)]));
    }

    #[test]
    fn cycles_produce_mutually_including_sets() {
        let table = GroupDependencyResolver::new().resolve(Some(&[(1, 2), (2, 1)]));
        let from_1 = table.skip_set(GroupId::new(1));
        let from_2 = table.skip_set(GroupId::new(2));
        assert!(from_1.contains(&GroupId::new(1)) && from_1.contains(&GroupId::new(2)));
        assert_eq!(from_1, from_2);
    }

    #[test]
    fn duplicate_edges_are_idempotent() {
        let once = GroupDependencyResolver::new().resolve(Some(&[(2, 1)]));
        let twice = GroupDependencyResolver::new().resolve(Some(&[(2, 1), (2, 1)]));
        assert_eq!(once.skip_set(GroupId::new(1)), twice.skip_set(GroupId::new(1)));
    }

    #[test]
    fn self_loop_is_tolerated() {
        let table = GroupDependencyResolver::new().resolve(Some(&[(1, 1)]));
        assert!(table.skip_set(GroupId::new(1)).contains(&GroupId::new(1)));
    }

    #[test]
    fn resolver_is_idempotent_over_its_own_output_edges() {
        let first = GroupDependencyResolver::new().resolve(Some(&[(2, 1), (3, 2)]));
        let edges: Vec<RawGroupEdge> = first.to_edges().iter().map(|edge| (edge.dependent.value(), edge.prerequisite.value())).collect();
        let second = GroupDependencyResolver::new().resolve(Some(&edges));
        assert_eq!(first.skip_set(GroupId::new(1)), second.skip_set(GroupId::new(1)));
    }

    proptest::proptest! {
        /// Invariant 4 (§8): resolving arbitrary edge lists, converting the
        /// result back to edges, and resolving again yields the same table
        /// — the round-trip every group's skip set is built from.
        #[test]
        fn resolve_is_idempotent_over_arbitrary_edges(
            edges in proptest::collection::vec((-8_i64..8, -8_i64..8), 0..24)
        ) {
            let first = GroupDependencyResolver::new().resolve(Some(&edges));
            let round_tripped: Vec<RawGroupEdge> = first.to_edges().iter().map(|edge| (edge.dependent.value(), edge.prerequisite.value())).collect();
            let second = GroupDependencyResolver::new().resolve(Some(&round_tripped));

            for group in edges.iter().flat_map(|&(a, b)| [GroupId::new(a), GroupId::new(b)]) {
                proptest::prop_assert_eq!(first.skip_set(group), second.skip_set(group));
            }
        }
    }
}
