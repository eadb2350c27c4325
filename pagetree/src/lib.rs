//! A headless engine for browsing huge, externally stored, sortable collections as a lazily paged
//! tree.
//!
//! For heap-snapshot grids (object graphs, class buckets, dominators, diffs), see the
//! `pagetree-heap` crate.
//!
//! The collection behind every node lives outside the process (or at least outside the tree) and
//! is reached through a [`Provider`] that answers position-range queries. The engine focuses on
//! the bookkeeping needed to never hold more than what was asked for:
//! - merging fetched windows into a gap-aware list of children and placeholders ([`RangeIndex`])
//! - re-sorting a node without losing expanded subtrees ([`GridNode::sort`])
//! - presenting two collections as one position space ([`DiffProvider`])
//! - resolving an item identity to a materialized child ([`GridNode::reveal`])
//!
//! It is UI-agnostic. A TUI/GUI layer is expected to provide:
//! - a [`NodeVariant`] describing its node kinds
//! - a [`GridView`] receiving structural notifications
//! - an executor for the `?Send` futures returned by node operations
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod diff;
mod error;
mod grid;
mod key;
mod memory;
mod node;
mod options;
mod provider;
mod range;
mod types;
mod variant;


pub use diff::{DiffItem, DiffProvider};
pub use error::ProviderError;
pub use grid::{GridContext, GridView, SortingScope};
pub use memory::{MemoryProvider, SortableItem};
pub use node::GridNode;
pub use options::{GridOptions, RetryPolicy};
pub use provider::{BoxProvider, Provider};
pub use range::{ChildChange, Entry, Placeholder, RangeIndex};
pub use types::{ComparatorConfig, ItemsRange, NodeId, Range};
pub use variant::NodeVariant;

#[doc(hidden)]
pub use key::ContentHash;
