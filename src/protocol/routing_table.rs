use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use crate::{format_cost, Cost, NodeId, INFINITY};

/// Costs from one node to every node of the network, indexed by destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceVector(Vec<Cost>);

impl DistanceVector {
    pub fn unreachable(size: usize) -> Self {
        Self(vec![INFINITY; size])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set(&mut self, destination: NodeId, cost: Cost) {
        self.0[destination] = cost;
    }

    pub fn iter(&self) -> impl Iterator<Item = Cost> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Cost] {
        &self.0
    }

    /// True if any entry of `self` is strictly lower than in `other`.
    pub fn improves_on(&self, other: &DistanceVector) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(new, old)| new < old)
    }
}

impl From<Vec<Cost>> for DistanceVector {
    fn from(costs: Vec<Cost>) -> Self {
        Self(costs)
    }
}

impl Index<NodeId> for DistanceVector {
    type Output = Cost;

    fn index(&self, destination: NodeId) -> &Cost {
        &self.0[destination]
    }
}

impl fmt::Display for DistanceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let costs: Vec<String> = self.0.iter().map(|c| format_cost(*c)).collect();
        write!(f, "[{}]", costs.join(", "))
    }
}

/// Best known cost to a destination together with the next hop it departs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub cost: Cost,
    pub next_hop: Option<NodeId>,
}

impl Route {
    pub const UNREACHABLE: Route = Route { cost: INFINITY, next_hop: None };

    pub fn via(cost: Cost, next_hop: NodeId) -> Self {
        if cost == INFINITY {
            Self::UNREACHABLE
        } else {
            Self { cost, next_hop: Some(next_hop) }
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.cost != INFINITY
    }
}

/// Per-destination next hop of the owning node's current best paths.
pub type PredecessorSet = Vec<Option<NodeId>>;

/// N x N distance table held by one node.
///
/// Row `owner` is the node's own best-known vector; every other row is the
/// last advertisement received verbatim from that node. Own costs and
/// predecessors are only ever written together through [`RoutingTable::set_route`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingTable {
    owner: NodeId,
    rows: Vec<DistanceVector>,
    predecessors: PredecessorSet,
}

impl RoutingTable {
    pub fn new(owner: NodeId, size: usize) -> Self {
        Self {
            owner,
            rows: vec![DistanceVector::unreachable(size); size],
            predecessors: vec![None; size],
        }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn own_row(&self) -> &DistanceVector {
        &self.rows[self.owner]
    }

    pub fn row(&self, node: NodeId) -> &DistanceVector {
        &self.rows[node]
    }

    pub fn predecessors(&self) -> &PredecessorSet {
        &self.predecessors
    }

    pub fn predecessor(&self, destination: NodeId) -> Option<NodeId> {
        self.predecessors.get(destination).copied().flatten()
    }

    pub fn route(&self, destination: NodeId) -> Route {
        Route {
            cost: self.own_row()[destination],
            next_hop: self.predecessor(destination),
        }
    }

    pub fn set_route(&mut self, destination: NodeId, route: Route) {
        self.rows[self.owner].set(destination, route.cost);
        self.predecessors[destination] = route.next_hop;
    }

    /// Replaces a neighbor's row wholesale. Returns true if the new row
    /// improves on the stored one for at least one destination.
    pub fn replace_row(&mut self, node: NodeId, vector: DistanceVector) -> bool {
        debug_assert_ne!(node, self.owner, "own row is only written through set_route");
        let improved = vector.improves_on(&self.rows[node]);
        self.rows[node] = vector;
        improved
    }

    /// Forgets everything learned from `node`.
    pub fn reset_row(&mut self, node: NodeId) {
        self.rows[node] = DistanceVector::unreachable(self.size());
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        write!(f, "{:>5}", format!(" D{}|", self.owner))?;
        for column in 0..size {
            write!(f, "    {}", column)?;
        }
        writeln!(f)?;
        writeln!(f, "----+{}", "-----".repeat(size))?;
        for (node, row) in self.rows.iter().enumerate() {
            write!(f, "{:4}|", node)?;
            for cost in row.iter() {
                write!(f, "{:>5}", format_cost(cost))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
