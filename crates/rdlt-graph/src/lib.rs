//! Directed multigraph primitives for RDLT and Petri-net analysis.

pub mod cycles;
pub mod digraph;

pub use cycles::{simple_cycles, strongly_connected_components};
pub use digraph::{DiGraph, EdgeId, EdgeRecord, NodeId};
