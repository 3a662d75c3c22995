pub mod actor;
pub mod simulator;
pub mod topology;

pub use actor::*;
pub use simulator::*;
pub use topology::*;

use thiserror::Error;
use crate::algorithms::all_pairs_costs;
use crate::protocol::{AgentConfig, DistanceVector, LoopPolicy, ProtocolError};
use crate::{NodeId, INFINITY};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error("network still busy after {delivered} deliveries")]
    EventBudgetExhausted { delivered: usize },
    #[error("network did not settle within {0:?}")]
    Timeout(std::time::Duration),
    #[error("agent {node} faulted: {source}")]
    AgentFault { node: NodeId, source: ProtocolError },
    #[error("agent {node} is no longer running")]
    AgentStopped { node: NodeId },
    #[error("failed to encode advertisement for agent {node}: {source}")]
    Encode { node: NodeId, source: serde_json::Error },
}

/// Rejects a topology whose finite shortest-path costs reach the poison
/// reverse cutoff. Relaxation has no cutoff and accepts any topology.
pub fn check_max_cost(topology: &CostMatrix, config: &AgentConfig) -> Result<(), TopologyError> {
    if config.policy != LoopPolicy::PoisonReverse {
        return Ok(());
    }
    for (from, costs) in all_pairs_costs(topology).iter().enumerate() {
        for (to, &cost) in costs.iter().enumerate() {
            if cost != INFINITY && cost >= config.max_cost {
                return Err(TopologyError::BeyondMaxCost {
                    from,
                    to,
                    cost,
                    max_cost: config.max_cost,
                });
            }
        }
    }
    Ok(())
}

/// True if every node's vector equals the centralized shortest-path costs.
pub fn matches_reference(topology: &CostMatrix, vectors: &[DistanceVector]) -> bool {
    let reference = all_pairs_costs(topology);
    vectors.len() == reference.len()
        && vectors
            .iter()
            .zip(reference.iter())
            .all(|(vector, expected)| vector.as_slice() == expected.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(first: u32, second: u32) -> CostMatrix {
        let mut matrix = CostMatrix::new(3);
        matrix.set_link(0, 1, first);
        matrix.set_link(1, 2, second);
        matrix
    }

    #[test]
    fn max_cost_check_looks_at_path_sums() {
        let config = AgentConfig { policy: LoopPolicy::PoisonReverse, max_cost: 32 };
        assert_eq!(check_max_cost(&line(15, 16), &config), Ok(()));
        assert_eq!(
            check_max_cost(&line(16, 16), &config),
            Err(TopologyError::BeyondMaxCost { from: 0, to: 2, cost: 32, max_cost: 32 })
        );
    }

    #[test]
    fn relaxation_has_no_ceiling() {
        let config = AgentConfig { policy: LoopPolicy::Relaxation, max_cost: 32 };
        assert_eq!(check_max_cost(&line(600, 600), &config), Ok(()));
    }

    #[test]
    fn disconnected_nodes_pass_the_ceiling() {
        let mut matrix = CostMatrix::new(3);
        matrix.set_link(0, 1, 3);
        assert_eq!(check_max_cost(&matrix, &AgentConfig::default()), Ok(()));
    }

    #[test]
    fn encode_errors_name_the_target_agent() {
        let source = serde_json::from_str::<u32>("x").unwrap_err();
        let err = SimulationError::Encode { node: 2, source };
        assert!(err.to_string().starts_with("failed to encode advertisement for agent 2"));
    }
}
