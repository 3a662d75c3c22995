pub mod dijkstra;

pub use dijkstra::*;
