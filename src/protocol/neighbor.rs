use std::collections::BTreeSet;
use crate::{Cost, NodeId, INFINITY};

/// Nodes reachable from the owner over a direct link of finite cost.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborSet {
    members: BTreeSet<NodeId>,
}

impl NeighborSet {
    /// Scans the owner's link costs for finite entries, excluding itself.
    pub fn discover(owner: NodeId, size: usize, link_cost: impl Fn(NodeId) -> Cost) -> Self {
        let members = (0..size)
            .filter(|&other| other != owner && link_cost(other) != INFINITY)
            .collect();
        Self { members }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    /// Brings `node` in or out of the set. Returns true if membership changed.
    pub fn set_adjacent(&mut self, node: NodeId, adjacent: bool) -> bool {
        if adjacent {
            self.members.insert(node)
        } else {
            self.members.remove(&node)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::CostMatrix;
    use crate::protocol::LinkCostOracle;

    #[test]
    fn discovery_keeps_finite_links_only() {
        let mut matrix = CostMatrix::new(4);
        matrix.set_link(0, 1, 3);
        matrix.set_link(0, 3, 7);
        matrix.set_link(1, 2, 1);

        let neighbors = NeighborSet::discover(0, 4, |other| matrix.direct_link_cost(0, other));
        assert_eq!(neighbors.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!neighbors.contains(0));
        assert!(!neighbors.contains(2));
    }

    #[test]
    fn set_adjacent_reports_membership_changes() {
        let mut neighbors = NeighborSet::default();
        assert!(neighbors.set_adjacent(2, true));
        assert!(!neighbors.set_adjacent(2, true));
        assert!(neighbors.set_adjacent(2, false));
        assert!(!neighbors.set_adjacent(2, false));
        assert!(neighbors.is_empty());
    }
}
