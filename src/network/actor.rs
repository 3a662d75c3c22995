use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use crate::protocol::{Advertisement, AgentConfig, AgentSnapshot, ProtocolError, RoutingAgent, Transport};
use crate::{format_cost, Cost, NodeId};
use super::{check_max_cost, CostMatrix, SharedTopology, SimulationError, TopologyError};

enum Envelope {
    Advertisement(Vec<u8>),
    LinkChange { neighbor: NodeId, cost: Cost },
    Snapshot(oneshot::Sender<AgentSnapshot>),
    Shutdown,
}

/// Counts messages that may still change some agent's state.
#[derive(Clone, Default)]
struct InFlight {
    count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl InFlight {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_one();
        }
    }

    async fn wait_idle(&self) {
        while self.count.load(Ordering::Acquire) != 0 {
            self.idle.notified().await;
        }
    }
}

/// Sends advertisements as JSON bytes over per-agent unbounded channels.
///
/// Delivery is exactly once and FIFO per sender/receiver pair; there is no
/// ordering across different senders.
#[derive(Clone)]
pub struct ChannelTransport {
    peers: Arc<Vec<mpsc::UnboundedSender<Envelope>>>,
    in_flight: InFlight,
}

impl Transport for ChannelTransport {
    fn deliver(&self, packet: Advertisement) {
        let Some(peer) = self.peers.get(packet.destination) else {
            error!("No agent {} to deliver advertisement from {}", packet.destination, packet.source);
            return;
        };
        match packet.serialize() {
            Ok(bytes) => {
                self.in_flight.begin();
                if peer.send(Envelope::Advertisement(bytes)).is_err() {
                    warn!("Agent {} is gone, dropping advertisement from {}", packet.destination, packet.source);
                    self.in_flight.finish();
                }
            }
            Err(e) => error!("Failed to encode advertisement for {}: {}", packet.destination, e),
        }
    }
}

type Faults = Arc<Mutex<Vec<(NodeId, ProtocolError)>>>;

/// Runs every agent as its own tokio task.
///
/// Each task owns its agent and handles one message at a time, so no agent
/// state is ever shared.
pub struct ActorNetwork {
    topology: SharedTopology,
    config: AgentConfig,
    peers: Arc<Vec<mpsc::UnboundedSender<Envelope>>>,
    in_flight: InFlight,
    faults: Faults,
    handles: Vec<JoinHandle<()>>,
}

impl ActorNetwork {
    /// Builds the agents and spawns their tasks. Must be called inside a tokio runtime.
    pub fn start(matrix: CostMatrix, config: AgentConfig) -> Result<Self, SimulationError> {
        let size = matrix.size();
        if size == 0 {
            return Err(TopologyError::Empty.into());
        }
        check_max_cost(&matrix, &config)?;

        let topology = SharedTopology::new(matrix);
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel()).unzip();
        let peers = Arc::new(senders);
        let in_flight = InFlight::default();
        let transport = ChannelTransport {
            peers: peers.clone(),
            in_flight: in_flight.clone(),
        };

        // bootstrap broadcasts queue up in the inboxes until the tasks start
        let agents = (0..size)
            .map(|id| RoutingAgent::new(id, size, topology.clone(), transport.clone(), config))
            .collect::<Result<Vec<_>, _>>()?;

        let faults: Faults = Arc::new(Mutex::new(Vec::new()));
        let handles = agents
            .into_iter()
            .zip(receivers)
            .map(|(agent, inbox)| {
                tokio::spawn(run_agent(agent, inbox, in_flight.clone(), faults.clone()))
            })
            .collect();

        info!("Actor network started with {} agents", size);

        Ok(Self {
            topology,
            config,
            peers,
            in_flight,
            faults,
            handles,
        })
    }

    pub fn size(&self) -> usize {
        self.peers.len()
    }

    pub fn topology(&self) -> &SharedTopology {
        &self.topology
    }

    /// Hands `packet` to agent `to`, whatever its destination field says.
    pub fn notify_advertisement(&self, to: NodeId, packet: Advertisement) -> Result<(), SimulationError> {
        let bytes = packet
            .serialize()
            .map_err(|source| SimulationError::Encode { node: to, source })?;
        self.send(to, Envelope::Advertisement(bytes))
    }

    /// Sets the link `a <-> b` to `cost` and notifies both endpoints. Refused,
    /// with the topology untouched, if a shortest path would reach the cutoff.
    pub fn change_link(&self, a: NodeId, b: NodeId, cost: Cost) -> Result<(), SimulationError> {
        let size = self.size();
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
        self.send(a, Envelope::LinkChange { neighbor: b, cost })?;
        self.send(b, Envelope::LinkChange { neighbor: a, cost })
    }

    /// Waits until no message is in flight, then reports the first agent fault
    /// raised since the last call, if any. Reported faults are cleared.
    pub async fn settle(&self) -> Result<(), SimulationError> {
        self.in_flight.wait_idle().await;
        let faults = std::mem::take(&mut *self.faults.lock().await);
        if faults.len() > 1 {
            warn!("{} agent faults since the last settle, reporting the first", faults.len());
        }
        match faults.into_iter().next() {
            Some((node, source)) => Err(SimulationError::AgentFault { node, source }),
            None => Ok(()),
        }
    }

    pub async fn settle_within(&self, limit: Duration) -> Result<(), SimulationError> {
        tokio::time::timeout(limit, self.settle())
            .await
            .map_err(|_| SimulationError::Timeout(limit))?
    }

    pub async fn snapshots(&self) -> Result<Vec<AgentSnapshot>, SimulationError> {
        let mut snapshots = Vec::with_capacity(self.size());
        for node in 0..self.size() {
            let (reply, response) = oneshot::channel();
            self.peers[node]
                .send(Envelope::Snapshot(reply))
                .map_err(|_| SimulationError::AgentStopped { node })?;
            snapshots.push(response.await.map_err(|_| SimulationError::AgentStopped { node })?);
        }
        Ok(snapshots)
    }

    pub async fn shutdown(self) {
        for peer in self.peers.iter() {
            let _ = peer.send(Envelope::Shutdown);
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Agent task ended abnormally: {}", e);
            }
        }
        info!("Actor network stopped");
    }

    fn send(&self, node: NodeId, envelope: Envelope) -> Result<(), SimulationError> {
        let peer = self.peers.get(node).ok_or(ProtocolError::UnknownNode {
            node,
            size: self.size(),
        })?;
        self.in_flight.begin();
        if peer.send(envelope).is_err() {
            self.in_flight.finish();
            return Err(SimulationError::AgentStopped { node });
        }
        Ok(())
    }
}

async fn run_agent(
    mut agent: RoutingAgent<SharedTopology, ChannelTransport>,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    in_flight: InFlight,
    faults: Faults,
) {
    while let Some(envelope) = inbox.recv().await {
        let result = match envelope {
            Envelope::Advertisement(bytes) => match Advertisement::deserialize(&bytes) {
                Ok(packet) => agent.update(&packet),
                Err(e) => {
                    error!("Agent {} failed to decode advertisement: {}", agent.id(), e);
                    Ok(())
                }
            },
            Envelope::LinkChange { neighbor, cost } => agent.link_cost_change(neighbor, cost),
            Envelope::Snapshot(reply) => {
                let _ = reply.send(agent.snapshot());
                continue;
            }
            Envelope::Shutdown => break,
        };

        if let Err(fault) = result {
            error!("Agent {} rejected message: {}", agent.id(), fault);
            faults.lock().await.push((agent.id(), fault));
        }
        in_flight.finish();
    }
    debug!("Agent {} stopped", agent.id());
}
