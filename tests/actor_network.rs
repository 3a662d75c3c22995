//! The same protocol run with one tokio task per node.

use std::time::Duration;

use dvsim::network::{ActorNetwork, CostMatrix, SimulationError};
use dvsim::network::TopologyError;
use dvsim::protocol::{Advertisement, AgentConfig, DistanceVector, LoopPolicy, ProtocolError};
use dvsim::INFINITY;

const LIMIT: Duration = Duration::from_secs(10);

fn triangle() -> CostMatrix {
    let mut matrix = CostMatrix::new(3);
    matrix.set_link(0, 1, 1);
    matrix.set_link(1, 2, 1);
    matrix.set_link(0, 2, 4);
    matrix
}

#[tokio::test]
async fn actors_converge_and_follow_a_cost_increase() {
    let network = ActorNetwork::start(triangle(), AgentConfig::default()).unwrap();
    network.settle_within(LIMIT).await.unwrap();

    let snapshots = network.snapshots().await.unwrap();
    assert_eq!(snapshots[0].vector, DistanceVector::from(vec![0, 1, 2]));
    assert_eq!(snapshots[0].predecessors[2], Some(1));

    network.change_link(0, 1, 10).unwrap();
    network.settle_within(LIMIT).await.unwrap();

    let snapshots = network.snapshots().await.unwrap();
    assert_eq!(snapshots[0].vector, DistanceVector::from(vec![0, 5, 4]));
    assert_eq!(snapshots[1].vector, DistanceVector::from(vec![5, 0, 1]));
    assert_eq!(snapshots[2].vector, DistanceVector::from(vec![4, 1, 0]));
    assert_eq!(snapshots[0].predecessors[1], Some(2));

    network.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn actors_recover_from_a_link_failure() {
    let mut matrix = CostMatrix::new(4);
    matrix.set_link(0, 1, 1);
    matrix.set_link(1, 2, 1);
    matrix.set_link(1, 3, 1);
    matrix.set_link(2, 3, 1);
    let network = ActorNetwork::start(matrix, AgentConfig::default()).unwrap();
    network.settle_within(LIMIT).await.unwrap();

    network.change_link(0, 1, INFINITY).unwrap();
    network.settle_within(LIMIT).await.unwrap();

    let snapshots = network.snapshots().await.unwrap();
    for snapshot in &snapshots[1..] {
        assert_eq!(snapshot.vector[0], INFINITY, "node {} still reaches 0", snapshot.id);
        assert_eq!(snapshot.predecessors[0], None);
    }

    network.shutdown().await;
}

#[tokio::test]
async fn misaddressed_advertisement_is_reported_and_ignored() {
    let network = ActorNetwork::start(triangle(), AgentConfig::default()).unwrap();
    network.settle_within(LIMIT).await.unwrap();
    let before = network.snapshots().await.unwrap();

    let stray = Advertisement::new(1, 2, vec![0, 0, 0].into());
    network.notify_advertisement(0, stray).unwrap();

    let err = network.settle_within(LIMIT).await.unwrap_err();
    assert!(matches!(
        err,
        SimulationError::AgentFault {
            node: 0,
            source: ProtocolError::Misaddressed { node: 0, from: 1, destination: 2 },
        }
    ));
    assert_eq!(network.snapshots().await.unwrap(), before);

    // the fault was reported once; a healthy network settles cleanly again
    network.settle_within(LIMIT).await.unwrap();
    network.change_link(0, 1, 10).unwrap();
    network.settle_within(LIMIT).await.unwrap();
    let snapshots = network.snapshots().await.unwrap();
    assert_eq!(snapshots[0].vector, DistanceVector::from(vec![0, 5, 4]));

    network.shutdown().await;
}

#[tokio::test]
async fn cutoff_is_checked_at_start_and_on_link_changes() {
    let mut matrix = CostMatrix::new(3);
    matrix.set_link(0, 1, 600);
    matrix.set_link(1, 2, 600);
    let err = ActorNetwork::start(matrix.clone(), AgentConfig::default()).err().unwrap();
    assert!(matches!(err, SimulationError::Topology(TopologyError::BeyondMaxCost { .. })));

    let network = ActorNetwork::start(matrix, AgentConfig::with_policy(LoopPolicy::Relaxation)).unwrap();
    network.settle_within(LIMIT).await.unwrap();
    let snapshots = network.snapshots().await.unwrap();
    assert_eq!(snapshots[0].vector, DistanceVector::from(vec![0, 600, 1200]));
    network.shutdown().await;

    let network = ActorNetwork::start(triangle(), AgentConfig::default()).unwrap();
    network.settle_within(LIMIT).await.unwrap();
    network.change_link(0, 2, 40).unwrap();
    network.settle_within(LIMIT).await.unwrap();
    assert!(matches!(
        network.change_link(1, 2, 40),
        Err(SimulationError::Topology(TopologyError::BeyondMaxCost { cost: 40, .. }))
    ));
    assert_eq!(network.topology().matrix().cost(1, 2), 1);
    network.settle_within(LIMIT).await.unwrap();
    network.shutdown().await;
}
