//! Graph representation and algorithms module

pub mod algorithms;
pub mod builder;
pub mod connectome;

pub use builder::{assemble, GraphBuilder, Overlay, ThresholdedGraph};
pub use connectome::{ConnectomeGraph, EdgeAttr, NodeAttr};
