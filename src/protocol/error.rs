use thiserror::Error;
use crate::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The transport handed a node a packet addressed to someone else.
    #[error("node {node} received an advertisement from {from} addressed to node {destination}")]
    Misaddressed {
        node: NodeId,
        from: NodeId,
        destination: NodeId,
    },
    #[error("node {node} is outside the network (size {size})")]
    UnknownNode { node: NodeId, size: usize },
    #[error("advertisement from {from} carries {got} entries, expected {expected}")]
    VectorLength {
        from: NodeId,
        got: usize,
        expected: usize,
    },
    #[error("node {node} cannot have a link to itself")]
    SelfLink { node: NodeId },
}
