//! Heap-snapshot grids built on the `pagetree` engine.
//!
//! The engine knows nothing about heaps. This crate supplies the pieces a heap profiler front end
//! needs on top of it:
//!
//! - [`HeapNode`]: the node kinds (objects reached through references, class buckets and their
//!   instances, dominator tree nodes, diff buckets)
//! - [`SnapshotBackend`]: the seam to wherever the snapshot is parsed and indexed
//! - [`SnapshotGrid`]: the summary, diff, dominators and containment views
//! - [`MemorySnapshot`]: a small in-memory backend, handy for tests and demos
//!
//! Like the engine, this crate is framework-agnostic and renders nothing.
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod backend;
mod comparator;
mod grid;
mod item;
mod memory;
mod variant;

#[cfg(test)]
mod tests;

pub use backend::{ALL_OBJECTS, HeapProvider, SnapshotBackend};
pub use comparator::{bucket_comparator, node_comparator};
pub use grid::{GridKind, SnapshotGrid};
pub use item::{
    Aggregate, AggregateForDiff, DiffForClass, EdgeType, HeapItem, NO_DISTANCE, NodeType,
    SnapshotEdge, SnapshotNode,
};
pub use memory::MemorySnapshot;
pub use variant::{
    ChildHash, ConstructorNode, DiffNode, DominatorNode, HeapEnv, HeapNode, InstanceNode,
    ObjectNode, SortColumn, SortOrder,
};
