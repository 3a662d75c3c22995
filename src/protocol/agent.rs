use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use crate::{add_cost, format_cost, Cost, NodeId, INFINITY};
use super::{
    Advertisement, AgentConfig, DistanceVector, LinkCostOracle, LoopPolicy, NeighborSet,
    PredecessorSet, ProtocolError, Route, RoutingTable, Transport,
};

/// Owned copy of an agent's state, for drivers that cannot borrow the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: NodeId,
    pub vector: DistanceVector,
    pub predecessors: PredecessorSet,
    pub table: String,
}

/// Distance-vector routing agent for a single node.
///
/// The agent exclusively owns its [`RoutingTable`]. It reads link costs only
/// through its [`LinkCostOracle`] and talks to other agents only through its
/// [`Transport`]. Each handler runs to completion, broadcasts included.
pub struct RoutingAgent<O, T> {
    id: NodeId,
    table: RoutingTable,
    neighbors: NeighborSet,
    oracle: O,
    transport: T,
    config: AgentConfig,
}

impl<O: LinkCostOracle, T: Transport> RoutingAgent<O, T> {
    /// Seeds the own row from the direct link costs and advertises it to every neighbor.
    pub fn new(
        id: NodeId,
        size: usize,
        oracle: O,
        transport: T,
        config: AgentConfig,
    ) -> Result<Self, ProtocolError> {
        if id >= size {
            return Err(ProtocolError::UnknownNode { node: id, size });
        }

        let neighbors = NeighborSet::discover(id, size, |other| {
            config.bound(oracle.direct_link_cost(id, other))
        });
        if neighbors.is_empty() {
            warn!("Node {} starts with no neighbors", id);
        }
        let mut agent = Self {
            id,
            table: RoutingTable::new(id, size),
            neighbors,
            oracle,
            transport,
            config,
        };

        for destination in 0..size {
            let route = if destination == id {
                Route { cost: 0, next_hop: None }
            } else {
                Route::via(agent.link_cost(destination), destination)
            };
            agent.table.set_route(destination, route);
        }

        info!(
            "Node {} up with neighbors {:?}, vector {}",
            id,
            agent.neighbors.iter().collect::<Vec<_>>(),
            agent.distance_vector()
        );
        agent.broadcast();

        Ok(agent)
    }

    /// Handles an advertisement delivered by the transport.
    ///
    /// A packet addressed to another node is a transport fault: it is rejected
    /// before any state is touched.
    pub fn update(&mut self, packet: &Advertisement) -> Result<(), ProtocolError> {
        if packet.destination != self.id {
            return Err(ProtocolError::Misaddressed {
                node: self.id,
                from: packet.source,
                destination: packet.destination,
            });
        }
        let size = self.table.size();
        if packet.source >= size {
            return Err(ProtocolError::UnknownNode { node: packet.source, size });
        }
        if packet.vector.len() != size {
            return Err(ProtocolError::VectorLength {
                from: packet.source,
                got: packet.vector.len(),
                expected: size,
            });
        }

        let sender = packet.source;
        if sender == self.id || !self.neighbors.contains(sender) {
            debug!("Node {} ignoring advertisement from non-adjacent node {}", self.id, sender);
            return Ok(());
        }

        let sender_improved = self.table.replace_row(sender, packet.vector.clone());
        debug!("Node {} stored vector {} from {}", self.id, packet.vector, sender);

        let mut changed = false;
        for destination in (0..size).filter(|&d| d != self.id) {
            let current = self.table.route(destination);
            let candidate = self.candidate(sender, destination);

            let next = if candidate.cost < current.cost {
                candidate
            } else if self.config.policy == LoopPolicy::PoisonReverse
                && current.next_hop == Some(sender)
                && candidate.cost != current.cost
            {
                // our next hop now reports this path as worse
                self.best_route(destination)
            } else {
                continue;
            };

            if next != current {
                debug!(
                    "Node {}: route to {} {} via {:?} -> {} via {:?}",
                    self.id,
                    destination,
                    format_cost(current.cost),
                    current.next_hop,
                    format_cost(next.cost),
                    next.next_hop
                );
                self.table.set_route(destination, next);
                changed = true;
            }
        }

        if changed || sender_improved {
            self.broadcast();
        }

        Ok(())
    }

    /// Handles a change of the direct link to `neighbor`.
    ///
    /// The oracle is the source of truth for the new cost; `new_cost` is only
    /// cross-checked against it. Every destination is re-derived from all known
    /// neighbor rows, so routes may get more expensive here.
    pub fn link_cost_change(&mut self, neighbor: NodeId, new_cost: Cost) -> Result<(), ProtocolError> {
        let size = self.table.size();
        if neighbor >= size {
            return Err(ProtocolError::UnknownNode { node: neighbor, size });
        }
        if neighbor == self.id {
            return Err(ProtocolError::SelfLink { node: self.id });
        }

        let observed = self.link_cost(neighbor);
        if observed != self.config.bound(new_cost) {
            warn!(
                "Node {}: link to {} announced at {} but oracle reports {}",
                self.id,
                neighbor,
                format_cost(new_cost),
                format_cost(observed)
            );
        }

        let adjacent = observed != INFINITY;
        let membership_changed = self.neighbors.set_adjacent(neighbor, adjacent);
        if membership_changed {
            if adjacent {
                info!("Node {}: link to {} is up", self.id, neighbor);
            } else {
                info!("Node {}: link to {} is down", self.id, neighbor);
                self.table.reset_row(neighbor);
            }
        }

        let mut changed = false;
        for destination in (0..size).filter(|&d| d != self.id) {
            let current = self.table.route(destination);
            let best = self.best_route(destination);
            if best != current {
                self.table.set_route(destination, best);
                changed = true;
            }
        }

        if changed || membership_changed {
            info!(
                "Node {}: link to {} now {}, vector {}",
                self.id,
                neighbor,
                format_cost(observed),
                self.distance_vector()
            );
            self.broadcast();
        } else {
            debug!("Node {}: link change to {} left routes unchanged", self.id, neighbor);
        }

        Ok(())
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn distance_vector(&self) -> &DistanceVector {
        self.table.own_row()
    }

    pub fn predecessor(&self, destination: NodeId) -> Option<NodeId> {
        self.table.predecessor(destination)
    }

    pub fn neighbors(&self) -> &NeighborSet {
        &self.neighbors
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            vector: self.distance_vector().clone(),
            predecessors: self.table.predecessors().clone(),
            table: self.table.to_string(),
        }
    }

    pub fn print_distance_table(&self) {
        print!("{}", self.table);
    }

    fn link_cost(&self, other: NodeId) -> Cost {
        self.config.bound(self.oracle.direct_link_cost(self.id, other))
    }

    /// Route to `destination` leaving through neighbor `hop`, priced with the
    /// current direct cost to `hop`.
    fn candidate(&self, hop: NodeId, destination: NodeId) -> Route {
        let link = self.link_cost(hop);
        let cost = if hop == destination {
            link
        } else {
            add_cost(link, self.table.row(hop)[destination])
        };
        Route::via(self.config.bound(cost), hop)
    }

    /// Minimum over every neighbor's row. Ties keep the current next hop.
    fn best_route(&self, destination: NodeId) -> Route {
        let mut best = Route::UNREACHABLE;
        for hop in self.neighbors.iter() {
            let candidate = self.candidate(hop, destination);
            if candidate.cost < best.cost {
                best = candidate;
            }
        }

        if let Some(hop) = self.table.predecessor(destination) {
            if best.is_reachable()
                && self.neighbors.contains(hop)
                && self.candidate(hop, destination).cost == best.cost
            {
                return Route::via(best.cost, hop);
            }
        }
        best
    }

    fn broadcast(&self) {
        let own = self.table.own_row();
        for neighbor in self.neighbors.iter() {
            let mut vector = own.clone();
            if self.config.policy == LoopPolicy::PoisonReverse {
                for destination in 0..vector.len() {
                    if destination != neighbor && self.table.predecessor(destination) == Some(neighbor) {
                        vector.set(destination, INFINITY);
                    }
                }
            }
            self.transport.deliver(Advertisement::new(self.id, neighbor, vector));
        }
    }
}
