pub mod agent;
pub mod error;
pub mod messages;
pub mod neighbor;
pub mod routing_table;

pub use agent::*;
pub use error::*;
pub use messages::*;
pub use neighbor::*;
pub use routing_table::*;

use serde::{Deserialize, Serialize};
use crate::{Cost, NodeId};

/// Default "infinity" cutoff under [`LoopPolicy::PoisonReverse`]: any path
/// cost at or above it is unreachable.
pub const DEFAULT_MAX_COST: Cost = 32;

/// Read-only view of the link costs. Agents must read costs through this and nothing else.
pub trait LinkCostOracle {
    /// Current cost of the direct link `from -> to`, or [`crate::INFINITY`] if there is none.
    fn direct_link_cost(&self, from: NodeId, to: NodeId) -> Cost;
}

/// Carries advertisements between agents.
///
/// Implementations must deliver every accepted packet to the agent named by
/// `packet.destination` and document their ordering guarantees.
pub trait Transport {
    fn deliver(&self, packet: Advertisement);
}

/// How an agent guards against routing loops and count-to-infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LoopPolicy {
    /// Plain monotonic relaxation with no cutoff. Cost increases are only
    /// picked up by the endpoints of the changed link; other nodes may keep
    /// stale routes.
    Relaxation,
    /// Poison reverse towards the next hop, re-deriving a route when its next
    /// hop reports it worse, and the `max_cost` cutoff.
    #[default]
    PoisonReverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub policy: LoopPolicy,
    pub max_cost: Cost,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            policy: LoopPolicy::default(),
            max_cost: DEFAULT_MAX_COST,
        }
    }
}

impl AgentConfig {
    pub fn with_policy(policy: LoopPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    /// Applies the `max_cost` cutoff. Only poison reverse has one.
    pub fn bound(&self, cost: Cost) -> Cost {
        match self.policy {
            LoopPolicy::PoisonReverse if cost >= self.max_cost => crate::INFINITY,
            _ => cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INFINITY;

    #[test]
    fn cutoff_applies_to_poison_reverse_only() {
        let poison = AgentConfig { policy: LoopPolicy::PoisonReverse, max_cost: 32 };
        assert_eq!(poison.bound(31), 31);
        assert_eq!(poison.bound(32), INFINITY);

        let relaxation = AgentConfig { policy: LoopPolicy::Relaxation, max_cost: 32 };
        assert_eq!(relaxation.bound(32), 32);
        assert_eq!(relaxation.bound(2000), 2000);
    }
}
