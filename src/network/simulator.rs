use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use crate::protocol::{
    Advertisement, AgentConfig, AgentSnapshot, DistanceVector, ProtocolError, RoutingAgent, Transport,
};
use crate::{format_cost, Cost, NodeId, INFINITY};
use super::{check_max_cost, matches_reference, CostMatrix, SharedTopology, SimulationError, TopologyError};

pub const DEFAULT_MAX_EVENTS: usize = 100_000;

/// Single global FIFO queue of advertisements in flight.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    queue: Rc<RefCell<VecDeque<Advertisement>>>,
}

impl Mailbox {
    pub fn pop(&self) -> Option<Advertisement> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn drain(&self) -> Vec<Advertisement> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

impl Transport for Mailbox {
    fn deliver(&self, packet: Advertisement) {
        self.queue.borrow_mut().push_back(packet);
    }
}

/// Scripted change of the link `a <-> b`, applied once `after` advertisements
/// have been delivered (or earlier, if the network goes quiet first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChange {
    #[serde(default)]
    pub after: usize,
    pub a: NodeId,
    pub b: NodeId,
    /// `None` takes the link down.
    pub cost: Option<Cost>,
}

impl LinkChange {
    pub fn cost(&self) -> Cost {
        self.cost.unwrap_or(INFINITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationReport {
    pub delivered: usize,
    pub link_changes: usize,
}

/// Deterministic single-threaded driver.
///
/// Advertisements are delivered one at a time in global FIFO order, each
/// exactly once. A handler and every broadcast it triggers complete before
/// the next delivery.
pub struct Simulator {
    topology: SharedTopology,
    mailbox: Mailbox,
    agents: Vec<RoutingAgent<SharedTopology, Mailbox>>,
    config: AgentConfig,
    delivered: usize,
    max_events: usize,
}

impl Simulator {
    pub fn new(matrix: CostMatrix, config: AgentConfig) -> Result<Self, SimulationError> {
        let size = matrix.size();
        if size == 0 {
            return Err(TopologyError::Empty.into());
        }
        check_max_cost(&matrix, &config)?;

        let topology = SharedTopology::new(matrix);
        let mailbox = Mailbox::default();
        let agents = (0..size)
            .map(|id| RoutingAgent::new(id, size, topology.clone(), mailbox.clone(), config))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Simulator started: {} nodes, {} advertisements queued", size, mailbox.len());

        Ok(Self {
            topology,
            mailbox,
            agents,
            config,
            delivered: 0,
            max_events: DEFAULT_MAX_EVENTS,
        })
    }

    /// Caps the number of deliveries a single [`Simulator::run`] may make.
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn size(&self) -> usize {
        self.agents.len()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    pub fn topology(&self) -> &SharedTopology {
        &self.topology
    }

    pub fn agent(&self, id: NodeId) -> Option<&RoutingAgent<SharedTopology, Mailbox>> {
        self.agents.get(id)
    }

    pub fn agents(&self) -> &[RoutingAgent<SharedTopology, Mailbox>] {
        &self.agents
    }

    pub fn distance_vectors(&self) -> Vec<DistanceVector> {
        self.agents.iter().map(|agent| agent.distance_vector().clone()).collect()
    }

    pub fn snapshots(&self) -> Vec<AgentSnapshot> {
        self.agents.iter().map(|agent| agent.snapshot()).collect()
    }

    /// Delivers the oldest queued advertisement. Returns false if none was queued.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        let Some(packet) = self.mailbox.pop() else {
            return Ok(false);
        };
        let size = self.agents.len();
        let agent = self
            .agents
            .get_mut(packet.destination)
            .ok_or(ProtocolError::UnknownNode { node: packet.destination, size })?;
        agent.update(&packet)?;
        self.delivered += 1;
        Ok(true)
    }

    /// Delivers until no advertisement is left. Returns how many were delivered.
    pub fn run(&mut self) -> Result<usize, SimulationError> {
        let start = self.delivered;
        while !self.mailbox.is_empty() {
            if self.delivered - start >= self.max_events {
                return Err(SimulationError::EventBudgetExhausted {
                    delivered: self.delivered - start,
                });
            }
            self.step()?;
        }
        debug!("Network quiet after {} deliveries", self.delivered - start);
        Ok(self.delivered - start)
    }

    /// Sets the link `a <-> b` to `cost` and notifies both endpoints.
    ///
    /// A change that would push a shortest path to the cutoff is refused and
    /// leaves the topology untouched.
    pub fn change_link(&mut self, a: NodeId, b: NodeId, cost: Cost) -> Result<(), SimulationError> {
        let size = self.agents.len();
        for node in [a, b] {
            if node >= size {
                return Err(ProtocolError::UnknownNode { node, size }.into());
            }
        }
        if a == b {
            return Err(ProtocolError::SelfLink { node: a }.into());
        }
        let mut next = self.topology.matrix();
        next.set_link(a, b, cost);
        check_max_cost(&next, &self.config)?;

        info!("Link {} <-> {} changes to {}", a, b, format_cost(cost));
        self.topology.set_link(a, b, cost);
        self.agents[a].link_cost_change(b, cost)?;
        self.agents[b].link_cost_change(a, cost)?;
        Ok(())
    }

    /// Runs to quiescence, applying `changes` in order of their `after` counts.
    pub fn run_script(&mut self, changes: &[LinkChange]) -> Result<SimulationReport, SimulationError> {
        let mut changes = changes.to_vec();
        changes.sort_by_key(|change| change.after);

        let start = self.delivered;
        for change in &changes {
            while self.delivered - start < change.after && self.step()? {}
            self.change_link(change.a, change.b, change.cost())?;
        }
        self.run()?;

        Ok(SimulationReport {
            delivered: self.delivered - start,
            link_changes: changes.len(),
        })
    }

    /// Path from `source` to `destination` obtained by following each node's
    /// next hop. `None` if some node has no route or the hops loop.
    pub fn route(&self, source: NodeId, destination: NodeId) -> Option<Vec<NodeId>> {
        let mut path = vec![source];
        let mut current = source;
        while current != destination {
            let next = self.agents.get(current)?.predecessor(destination)?;
            if path.contains(&next) {
                return None;
            }
            path.push(next);
            current = next;
        }
        Some(path)
    }

    pub fn matches_reference(&self) -> bool {
        matches_reference(&self.topology.matrix(), &self.distance_vectors())
    }
}
