use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use thiserror::Error;
use crate::protocol::LinkCostOracle;
use crate::{Cost, NodeId, INFINITY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("network must have at least one node")]
    Empty,
    #[error("row {row} has {len} entries, expected {size}")]
    NotSquare { row: usize, len: usize, size: usize },
    #[error("cost from node {node} to itself must be 0")]
    NonZeroDiagonal { node: NodeId },
    #[error("link {a} <-> {b} has different costs in each direction")]
    Asymmetric { a: NodeId, b: NodeId },
    #[error("shortest path {from} -> {to} costs {cost}, not below max_cost {max_cost}")]
    BeyondMaxCost { from: NodeId, to: NodeId, cost: Cost, max_cost: Cost },
}

/// Global link-cost matrix. Links are symmetric; [`INFINITY`] means no link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrix {
    costs: Vec<Vec<Cost>>,
}

impl CostMatrix {
    /// A network of `size` isolated nodes.
    pub fn new(size: usize) -> Self {
        let costs = (0..size)
            .map(|row| (0..size).map(|col| if row == col { 0 } else { INFINITY }).collect())
            .collect();
        Self { costs }
    }

    pub fn from_rows(costs: Vec<Vec<Cost>>) -> Result<Self, TopologyError> {
        let size = costs.len();
        if size == 0 {
            return Err(TopologyError::Empty);
        }
        for (row, values) in costs.iter().enumerate() {
            if values.len() != size {
                return Err(TopologyError::NotSquare { row, len: values.len(), size });
            }
            if values[row] != 0 {
                return Err(TopologyError::NonZeroDiagonal { node: row });
            }
        }
        for a in 0..size {
            for b in (a + 1)..size {
                if costs[a][b] != costs[b][a] {
                    return Err(TopologyError::Asymmetric { a, b });
                }
            }
        }
        Ok(Self { costs })
    }

    pub fn size(&self) -> usize {
        self.costs.len()
    }

    pub fn cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.costs[from][to]
    }

    /// Sets the cost of the link `a <-> b` in both directions.
    pub fn set_link(&mut self, a: NodeId, b: NodeId, cost: Cost) {
        self.costs[a][b] = cost;
        self.costs[b][a] = cost;
    }

    pub fn get_neighbors(&self, node: NodeId) -> Vec<(NodeId, Cost)> {
        self.costs[node]
            .iter()
            .enumerate()
            .filter(|&(other, &cost)| other != node && cost != INFINITY)
            .map(|(other, &cost)| (other, cost))
            .collect()
    }
}

impl LinkCostOracle for CostMatrix {
    fn direct_link_cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.cost(from, to)
    }
}

/// Cost matrix shared between a driver and its agents.
///
/// Agents only see it through [`LinkCostOracle`]; the driver is the only writer.
#[derive(Debug, Clone)]
pub struct SharedTopology {
    inner: Arc<RwLock<CostMatrix>>,
}

impl SharedTopology {
    pub fn new(matrix: CostMatrix) -> Self {
        Self { inner: Arc::new(RwLock::new(matrix)) }
    }

    fn read(&self) -> RwLockReadGuard<'_, CostMatrix> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn size(&self) -> usize {
        self.read().size()
    }

    pub fn set_link(&self, a: NodeId, b: NodeId, cost: Cost) {
        let mut matrix = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        matrix.set_link(a, b, cost);
    }

    /// Copy of the current matrix.
    pub fn matrix(&self) -> CostMatrix {
        self.read().clone()
    }
}

impl LinkCostOracle for SharedTopology {
    fn direct_link_cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.read().cost(from, to)
    }
}
