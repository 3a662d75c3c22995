use serde::{Deserialize, Serialize};
use crate::NodeId;
use super::DistanceVector;

/// A node's full distance vector, sent to exactly one neighbor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    pub source: NodeId,
    pub destination: NodeId,
    pub vector: DistanceVector,
}

impl Advertisement {
    pub fn new(source: NodeId, destination: NodeId, vector: DistanceVector) -> Self {
        Self { source, destination, vector }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
