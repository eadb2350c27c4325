use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;

use async_trait::async_trait;
use pagetree::{MemoryProvider, ProviderError};

use crate::{
    ALL_OBJECTS, Aggregate, AggregateForDiff, DiffForClass, EdgeType, HeapItem, HeapProvider,
    NO_DISTANCE, NodeType, SnapshotBackend, SnapshotEdge, SnapshotNode,
};

#[derive(Clone, Debug)]
struct EdgeRecord {
    name: String,
    edge_type: EdgeType,
    to: usize,
}

/// A [`SnapshotBackend`] over an object graph held in memory.
///
/// Build the graph with [`MemorySnapshot::add_node`] / [`MemorySnapshot::add_edge`], then call
/// [`MemorySnapshot::finish`] to compute distances, default dominators and retained sizes.
#[derive(Debug)]
pub struct MemorySnapshot {
    uid: String,
    nodes: Vec<SnapshotNode>,
    edges: Vec<Vec<EdgeRecord>>,
    dominators: Vec<Option<usize>>,
    root: usize,
    added_by_base: RefCell<BTreeMap<String, BTreeMap<String, Vec<usize>>>>,
}

impl MemorySnapshot {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            dominators: Vec::new(),
            root: 0,
            added_by_base: RefCell::new(BTreeMap::new()),
        }
    }

    /// Adds an object and returns its node index. The first object added is the root unless
    /// [`MemorySnapshot::set_root`] says otherwise.
    pub fn add_node(
        &mut self,
        id: u64,
        node_type: NodeType,
        name: impl Into<String>,
        self_size: u64,
    ) -> usize {
        let node_index = self.nodes.len();
        self.nodes.push(SnapshotNode {
            id,
            name: name.into(),
            node_type,
            distance: NO_DISTANCE,
            self_size,
            retained_size: self_size,
            node_index,
            can_be_queried: node_type != NodeType::Hidden,
            detached_dom_tree_node: false,
            is_added_not_removed: None,
        });
        self.edges.push(Vec::new());
        self.dominators.push(None);
        node_index
    }

    pub fn add_edge(
        &mut self,
        from: usize,
        edge_type: EdgeType,
        name: impl Into<String>,
        to: usize,
    ) {
        let count = self.nodes.len();
        let edges = self.edges.get_mut(from).filter(|_| to < count);
        let Some(edges) = edges else {
            hwarn!(from, to, count, "MemorySnapshot::add_edge: unknown node index, ignored");
            return;
        };
        edges.push(EdgeRecord {
            name: name.into(),
            edge_type,
            to,
        });
    }

    pub fn set_root(&mut self, node_index: usize) {
        if node_index >= self.nodes.len() {
            hwarn!(node_index, "MemorySnapshot::set_root: unknown node index, ignored");
            return;
        }
        self.root = node_index;
    }

    /// Overrides the immediate dominator of `node_index`. Objects without one are dominated by
    /// the root.
    pub fn set_dominator(&mut self, node_index: usize, dominator: usize) {
        let count = self.nodes.len();
        let slot = self.dominators.get_mut(node_index).filter(|_| dominator < count);
        let Some(slot) = slot else {
            hwarn!(
                node_index,
                dominator,
                count,
                "MemorySnapshot::set_dominator: unknown node index, ignored"
            );
            return;
        };
        *slot = Some(dominator);
    }

    /// Computes distances (over strong references), default dominators and retained sizes.
    pub fn finish(mut self) -> Self {
        let count = self.nodes.len();
        if count == 0 {
            return self;
        }

        let mut queue = VecDeque::new();
        self.nodes[self.root].distance = 0;
        queue.push_back(self.root);
        while let Some(index) = queue.pop_front() {
            let next = self.nodes[index].distance.saturating_add(1);
            for edge in &self.edges[index] {
                if edge.edge_type == EdgeType::Weak || self.nodes[edge.to].distance != NO_DISTANCE {
                    continue;
                }
                self.nodes[edge.to].distance = next;
                queue.push_back(edge.to);
            }
        }

        let mut reachable: Vec<usize> = (0..count)
            .filter(|&index| index != self.root && self.nodes[index].distance != NO_DISTANCE)
            .collect();
        for &index in &reachable {
            self.dominators[index].get_or_insert(self.root);
        }
        self.dominators[self.root] = None;

        for node in &mut self.nodes {
            node.retained_size = node.self_size;
        }
        reachable.sort_by_key(|&index| core::cmp::Reverse(self.nodes[index].distance));
        for index in reachable {
            if let Some(dominator) = self.dominators[index] {
                let retained = self.nodes[index].retained_size;
                self.nodes[dominator].retained_size += retained;
            }
        }
        self
    }

    pub fn node(&self, node_index: usize) -> Option<&SnapshotNode> {
        self.nodes.get(node_index)
    }

    pub fn node_index_by_id(&self, id: u64) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    fn checked_node(&self, node_index: usize) -> Result<&SnapshotNode, ProviderError> {
        self.nodes
            .get(node_index)
            .ok_or_else(|| ProviderError::unavailable(format!("unknown node index {node_index}")))
    }

    fn provider(items: Vec<HeapItem>) -> HeapProvider {
        Box::new(MemoryProvider::new(items))
    }

    /// Objects selected by an aggregation key: everything, or ids in `(min, max]` for a
    /// `"min..max"` key.
    fn in_key(key: &str, id: u64) -> bool {
        if key == ALL_OBJECTS {
            return true;
        }
        let Some((min, max)) = key.split_once("..") else {
            return true;
        };
        match (min.parse::<u64>(), max.parse::<u64>()) {
            (Ok(min), Ok(max)) => id > min && id <= max,
            _ => true,
        }
    }

    fn objects(&self) -> impl Iterator<Item = &SnapshotNode> + '_ {
        let root = self.root;
        self.nodes.iter().filter(move |node| node.node_index != root)
    }
}

#[async_trait(?Send)]
impl SnapshotBackend for MemorySnapshot {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn root_node_index(&self) -> usize {
        self.root
    }

    fn create_edges_provider(
        &self,
        node_index: usize,
        show_hidden: bool,
    ) -> Result<HeapProvider, ProviderError> {
        self.checked_node(node_index)?;
        let items = self.edges[node_index]
            .iter()
            .filter(|edge| show_hidden || edge.edge_type != EdgeType::Hidden)
            .map(|edge| {
                HeapItem::Edge(SnapshotEdge {
                    name: edge.name.clone(),
                    edge_type: edge.edge_type,
                    node: self.nodes[edge.to].clone(),
                })
            })
            .collect();
        Ok(Self::provider(items))
    }

    fn create_retaining_edges_provider(
        &self,
        node_index: usize,
        show_hidden: bool,
    ) -> Result<HeapProvider, ProviderError> {
        self.checked_node(node_index)?;
        let mut items = Vec::new();
        for (from, edges) in self.edges.iter().enumerate() {
            for edge in edges {
                if edge.to != node_index || (!show_hidden && edge.edge_type == EdgeType::Hidden) {
                    continue;
                }
                items.push(HeapItem::Edge(SnapshotEdge {
                    name: edge.name.clone(),
                    edge_type: edge.edge_type,
                    node: self.nodes[from].clone(),
                }));
            }
        }
        Ok(Self::provider(items))
    }

    fn create_nodes_provider_for_class(
        &self,
        class_name: &str,
        aggregates_key: &str,
    ) -> Result<HeapProvider, ProviderError> {
        let items = self
            .objects()
            .filter(|node| node.class_name() == class_name && Self::in_key(aggregates_key, node.id))
            .map(|node| HeapItem::Node(node.clone()))
            .collect();
        Ok(Self::provider(items))
    }

    fn create_nodes_provider_for_dominator(
        &self,
        node_index: usize,
    ) -> Result<HeapProvider, ProviderError> {
        self.checked_node(node_index)?;
        let items = self
            .nodes
            .iter()
            .filter(|node| self.dominators[node.node_index] == Some(node_index))
            .map(|node| HeapItem::Node(node.clone()))
            .collect();
        Ok(Self::provider(items))
    }

    fn create_added_nodes_provider(
        &self,
        base_uid: &str,
        class_name: &str,
    ) -> Result<HeapProvider, ProviderError> {
        let diffs = self.added_by_base.borrow();
        let Some(by_class) = diffs.get(base_uid) else {
            return Err(ProviderError::unavailable(format!(
                "no diff was calculated against snapshot {base_uid}"
            )));
        };
        let items = by_class
            .get(class_name)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.nodes.get(index))
            .map(|node| HeapItem::Node(node.clone()))
            .collect();
        Ok(Self::provider(items))
    }

    fn create_deleted_nodes_provider(
        &self,
        node_indexes: &[usize],
    ) -> Result<HeapProvider, ProviderError> {
        let items = node_indexes
            .iter()
            .map(|&index| self.checked_node(index).map(|node| HeapItem::Node(node.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::provider(items))
    }

    async fn aggregates(
        &self,
        aggregates_key: &str,
    ) -> Result<BTreeMap<String, Aggregate>, ProviderError> {
        let mut aggregates: BTreeMap<String, Aggregate> = BTreeMap::new();
        for node in self.objects().filter(|node| Self::in_key(aggregates_key, node.id)) {
            let aggregate = aggregates
                .entry(node.class_name().into_owned())
                .or_insert_with(|| Aggregate {
                    distance: NO_DISTANCE,
                    ..Aggregate::default()
                });
            aggregate.count += 1;
            aggregate.distance = aggregate.distance.min(node.distance);
            aggregate.self_size += node.self_size;
            aggregate.max_ret = aggregate.max_ret.max(node.retained_size);
        }
        Ok(aggregates)
    }

    async fn aggregates_for_diff(&self) -> Result<BTreeMap<String, AggregateForDiff>, ProviderError> {
        let mut aggregates: BTreeMap<String, AggregateForDiff> = BTreeMap::new();
        for node in self.objects() {
            let aggregate = aggregates.entry(node.class_name().into_owned()).or_default();
            aggregate.indexes.push(node.node_index);
            aggregate.ids.push(node.id);
            aggregate.self_sizes.push(node.self_size);
        }
        Ok(aggregates)
    }

    async fn calculate_snapshot_diff(
        &self,
        base_uid: &str,
        base_aggregates: BTreeMap<String, AggregateForDiff>,
    ) -> Result<BTreeMap<String, DiffForClass>, ProviderError> {
        let current = self.aggregates_for_diff().await?;
        let classes: BTreeSet<&String> = current.keys().chain(base_aggregates.keys()).collect();
        let empty = AggregateForDiff::default();

        let mut diffs = BTreeMap::new();
        let mut added_indexes = BTreeMap::new();
        for class in classes {
            let base = base_aggregates.get(class).unwrap_or(&empty);
            let now = current.get(class).unwrap_or(&empty);
            let base_ids: BTreeSet<u64> = base.ids.iter().copied().collect();
            let now_ids: BTreeSet<u64> = now.ids.iter().copied().collect();

            let mut diff = DiffForClass::default();
            let mut added = Vec::new();
            for (i, id) in now.ids.iter().enumerate() {
                if !base_ids.contains(id) {
                    diff.added_count += 1;
                    diff.added_size += now.self_sizes[i];
                    added.push(now.indexes[i]);
                }
            }
            for (i, id) in base.ids.iter().enumerate() {
                if !now_ids.contains(id) {
                    diff.removed_count += 1;
                    diff.removed_size += base.self_sizes[i];
                    diff.deleted_indexes.push(base.indexes[i]);
                }
            }
            if diff.added_count == 0 && diff.removed_count == 0 {
                continue;
            }
            diff.count_delta = diff.added_count as i64 - diff.removed_count as i64;
            diff.size_delta = diff.added_size as i64 - diff.removed_size as i64;
            added_indexes.insert(class.clone(), added);
            diffs.insert(class.clone(), diff);
        }

        self.added_by_base
            .borrow_mut()
            .insert(base_uid.to_string(), added_indexes);
        Ok(diffs)
    }

    async fn dominator_ids_for_node(&self, id: u64) -> Result<Option<Vec<u64>>, ProviderError> {
        let Some(mut index) = self.node_index_by_id(id) else {
            return Ok(None);
        };
        let mut ids = Vec::new();
        while index != self.root {
            ids.push(self.nodes[index].id);
            match self.dominators[index] {
                Some(dominator) => index = dominator,
                None => return Ok(None),
            }
        }
        Ok(Some(ids))
    }

    async fn node_class_name(&self, id: u64) -> Result<Option<String>, ProviderError> {
        Ok(self
            .node_index_by_id(id)
            .map(|index| self.nodes[index].class_name().into_owned()))
    }
}
