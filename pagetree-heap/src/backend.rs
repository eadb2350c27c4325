use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use async_trait::async_trait;
use pagetree::{BoxProvider, ProviderError};

use crate::{Aggregate, AggregateForDiff, DiffForClass, HeapItem};

pub type HeapProvider = BoxProvider<HeapItem, u64>;

/// Aggregation key covering every object of a snapshot.
pub const ALL_OBJECTS: &str = "allObjects";

/// One loaded heap snapshot, usually living in a worker.
///
/// Provider factories are synchronous: they hand out a handle whose queries are answered
/// asynchronously. Everything else is a one-shot request.
#[async_trait(?Send)]
pub trait SnapshotBackend {
    fn uid(&self) -> &str;

    fn root_node_index(&self) -> usize;

    /// Outgoing references of the object at `node_index`.
    fn create_edges_provider(
        &self,
        node_index: usize,
        show_hidden: bool,
    ) -> Result<HeapProvider, ProviderError>;

    /// Incoming references of the object at `node_index`; each edge's node is the retainer.
    fn create_retaining_edges_provider(
        &self,
        node_index: usize,
        show_hidden: bool,
    ) -> Result<HeapProvider, ProviderError>;

    fn create_nodes_provider_for_class(
        &self,
        class_name: &str,
        aggregates_key: &str,
    ) -> Result<HeapProvider, ProviderError>;

    /// Objects immediately dominated by the object at `node_index`.
    fn create_nodes_provider_for_dominator(
        &self,
        node_index: usize,
    ) -> Result<HeapProvider, ProviderError>;

    /// Objects of `class_name` that are not in the base snapshot. Requires a previous
    /// [`SnapshotBackend::calculate_snapshot_diff`] against `base_uid`.
    fn create_added_nodes_provider(
        &self,
        base_uid: &str,
        class_name: &str,
    ) -> Result<HeapProvider, ProviderError>;

    fn create_deleted_nodes_provider(
        &self,
        node_indexes: &[usize],
    ) -> Result<HeapProvider, ProviderError>;

    async fn aggregates(
        &self,
        aggregates_key: &str,
    ) -> Result<BTreeMap<String, Aggregate>, ProviderError>;

    async fn aggregates_for_diff(&self) -> Result<BTreeMap<String, AggregateForDiff>, ProviderError>;

    async fn calculate_snapshot_diff(
        &self,
        base_uid: &str,
        base_aggregates: BTreeMap<String, AggregateForDiff>,
    ) -> Result<BTreeMap<String, DiffForClass>, ProviderError>;

    /// Ids along the dominator chain, from the object itself up to (excluding) the root. `None`
    /// when the object is unknown.
    async fn dominator_ids_for_node(&self, id: u64) -> Result<Option<Vec<u64>>, ProviderError>;

    async fn node_class_name(&self, id: u64) -> Result<Option<String>, ProviderError>;
}
