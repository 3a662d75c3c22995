use std::cmp::Ordering;
use std::collections::BinaryHeap;
use crate::network::CostMatrix;
use crate::{add_cost, Cost, NodeId, INFINITY};

#[derive(Debug)]
struct State {
    cost: Cost,
    node: NodeId,
}

impl Eq for State {}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.cost.cmp(&self.cost)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest-path costs from `source` to every node, indexed by destination.
/// Unreachable destinations get [`INFINITY`].
pub fn calculate_shortest_paths(topology: &CostMatrix, source: NodeId) -> Vec<Cost> {
    let mut distances = vec![INFINITY; topology.size()];
    let mut heap = BinaryHeap::new();

    distances[source] = 0;
    heap.push(State { cost: 0, node: source });

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've already found a better path
        if cost > distances[node] {
            continue;
        }

        for (neighbor, link_cost) in topology.get_neighbors(node) {
            let new_cost = add_cost(cost, link_cost);
            if new_cost < distances[neighbor] {
                distances[neighbor] = new_cost;
                heap.push(State { cost: new_cost, node: neighbor });
            }
        }
    }

    distances
}

/// Cost matrix of the true shortest paths between every pair of nodes.
pub fn all_pairs_costs(topology: &CostMatrix) -> Vec<Vec<Cost>> {
    (0..topology.size())
        .map(|source| calculate_shortest_paths(topology, source))
        .collect()
}
