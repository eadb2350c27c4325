use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use pagetree::{ComparatorConfig, DiffProvider, NodeVariant, ProviderError};

use crate::comparator::node_comparator;
use crate::{
    Aggregate, DiffForClass, EdgeType, HeapItem, HeapProvider, SnapshotBackend,
    SnapshotNode,
};

/// Columns the heap grids can be sorted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortColumn {
    Object,
    Distance,
    Count,
    ShallowSize,
    RetainedSize,
    AddedCount,
    RemovedCount,
    CountDelta,
    AddedSize,
    RemovedSize,
    SizeDelta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortOrder {
    pub column: SortColumn,
    pub ascending: bool,
}

impl SortOrder {
    pub fn new(column: SortColumn, ascending: bool) -> Self {
        Self { column, ascending }
    }
}

/// Backends and view settings shared by every node of a heap grid.
pub struct HeapEnv {
    snapshot: Rc<dyn SnapshotBackend>,
    base_snapshot: Option<Rc<dyn SnapshotBackend>>,
    show_hidden: bool,
    show_retaining_edges: bool,
    sort: SortOrder,
}

impl HeapEnv {
    pub fn new(snapshot: Rc<dyn SnapshotBackend>) -> Self {
        Self {
            snapshot,
            base_snapshot: None,
            show_hidden: false,
            show_retaining_edges: false,
            sort: SortOrder::new(SortColumn::RetainedSize, false),
        }
    }

    pub fn with_base_snapshot(mut self, base: Rc<dyn SnapshotBackend>) -> Self {
        self.base_snapshot = Some(base);
        self
    }

    /// Includes hidden (engine-internal) references in object views.
    pub fn with_show_hidden(mut self, show_hidden: bool) -> Self {
        self.show_hidden = show_hidden;
        self
    }

    /// Object nodes list their retainers instead of the objects they reference.
    pub fn with_show_retaining_edges(mut self, show_retaining_edges: bool) -> Self {
        self.show_retaining_edges = show_retaining_edges;
        self
    }

    pub fn with_sort_order(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn snapshot(&self) -> &Rc<dyn SnapshotBackend> {
        &self.snapshot
    }

    pub fn base_snapshot(&self) -> Option<&Rc<dyn SnapshotBackend>> {
        self.base_snapshot.as_ref()
    }

    pub fn set_base_snapshot(&mut self, base: Option<Rc<dyn SnapshotBackend>>) {
        self.base_snapshot = base;
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    pub fn show_retaining_edges(&self) -> bool {
        self.show_retaining_edges
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort_order(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    fn required_base(&self) -> Result<&Rc<dyn SnapshotBackend>, ProviderError> {
        self.base_snapshot
            .as_ref()
            .ok_or_else(|| ProviderError::unavailable("no base snapshot selected"))
    }
}

impl core::fmt::Debug for HeapEnv {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeapEnv")
            .field("snapshot", &self.snapshot.uid())
            .field("base_snapshot", &self.base_snapshot.as_ref().map(|base| base.uid()))
            .field("show_hidden", &self.show_hidden)
            .field("show_retaining_edges", &self.show_retaining_edges)
            .field("sort", &self.sort)
            .finish()
    }
}

/// An object reached through a reference (or, in retainer views, a retainer of its parent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNode {
    pub edge_name: Option<String>,
    /// `None` for the root of a containment view.
    pub edge_type: Option<EdgeType>,
    pub node: SnapshotNode,
    /// Edges of this object are read from the base snapshot of a diff.
    pub from_base_snapshot: bool,
    /// Snapshot ids of the objects on the path from the grid root, the root itself excluded.
    pub ancestors: Vec<u64>,
    /// The object already appears among its ancestors.
    pub cycled: bool,
}

impl ObjectNode {
    /// Root of a containment view over the object at `node`.
    pub fn root(node: SnapshotNode) -> Self {
        Self {
            edge_name: None,
            edge_type: None,
            node,
            from_base_snapshot: false,
            ancestors: Vec::new(),
            cycled: false,
        }
    }

    fn from_item(item: HeapItem, from_base_snapshot: bool, ancestors: Vec<u64>) -> Self {
        let (edge_name, edge_type, node) = match item {
            HeapItem::Edge(edge) => (Some(edge.name), Some(edge.edge_type), edge.node),
            HeapItem::Node(node) => (None, None, node),
        };
        let cycled = ancestors.contains(&node.id);
        Self {
            edge_name,
            edge_type,
            node,
            from_base_snapshot,
            ancestors,
            cycled,
        }
    }

    fn child_ancestors(&self) -> Vec<u64> {
        let mut ancestors = self.ancestors.clone();
        if self.edge_type.is_some() {
            ancestors.push(self.node.id);
        }
        ancestors
    }
}

/// One object listed under a class bucket or a diff bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstanceNode {
    pub node: SnapshotNode,
    /// The object only exists in the base snapshot.
    pub is_deleted: bool,
}

/// A class bucket of the summary grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructorNode {
    pub class_name: String,
    pub aggregates_key: String,
    pub aggregate: Aggregate,
}

/// An object of the dominator tree; children are the objects it immediately dominates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DominatorNode {
    pub node: SnapshotNode,
}

/// A class bucket of the diff grid; children are added objects followed by removed ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffNode {
    pub class_name: String,
    pub diff: DiffForClass,
}

/// Every kind of node shown by the heap grids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapNode {
    Object(ObjectNode),
    Instance(InstanceNode),
    Constructor(ConstructorNode),
    Dominator(DominatorNode),
    Diff(DiffNode),
}

impl HeapNode {
    /// The snapshot object behind the node; `None` for buckets.
    pub fn snapshot_node(&self) -> Option<&SnapshotNode> {
        match self {
            Self::Object(object) => Some(&object.node),
            Self::Instance(instance) => Some(&instance.node),
            Self::Dominator(dominator) => Some(&dominator.node),
            Self::Constructor(_) | Self::Diff(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Object(ObjectNode { node, .. })
            | Self::Instance(InstanceNode { node, .. })
            | Self::Dominator(DominatorNode { node }) => &node.name,
            Self::Constructor(constructor) => &constructor.class_name,
            Self::Diff(diff) => &diff.class_name,
        }
    }
}

/// Position-independent identity of a child node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildHash {
    Edge {
        retainer: Option<u64>,
        edge_type: Option<EdgeType>,
        name: Option<String>,
    },
    Node(u64),
}

fn edge_hash(env: &HeapEnv, node_id: u64, edge_type: Option<EdgeType>, name: Option<&str>) -> ChildHash {
    ChildHash::Edge {
        retainer: env.show_retaining_edges().then_some(node_id),
        edge_type,
        name: name.map(String::from),
    }
}

fn item_edge_type(item: &HeapItem) -> Option<EdgeType> {
    match item {
        HeapItem::Edge(edge) => Some(edge.edge_type),
        HeapItem::Node(_) => None,
    }
}

impl NodeVariant for HeapNode {
    type Item = HeapItem;
    type Id = u64;
    type Hash = ChildHash;
    type Env = HeapEnv;

    fn create_provider(&self, env: &HeapEnv) -> Result<HeapProvider, ProviderError> {
        hdebug!(node = self.name(), "HeapNode: create provider");
        match self {
            Self::Object(object) => {
                let snapshot = if object.from_base_snapshot {
                    env.required_base()?
                } else {
                    env.snapshot()
                };
                if env.show_retaining_edges() {
                    snapshot.create_retaining_edges_provider(object.node.node_index, env.show_hidden())
                } else {
                    snapshot.create_edges_provider(object.node.node_index, env.show_hidden())
                }
            }
            Self::Instance(instance) => {
                let snapshot = if instance.is_deleted {
                    env.required_base()?
                } else {
                    env.snapshot()
                };
                snapshot.create_edges_provider(instance.node.node_index, env.show_hidden())
            }
            Self::Constructor(constructor) => env
                .snapshot()
                .create_nodes_provider_for_class(&constructor.class_name, &constructor.aggregates_key),
            Self::Dominator(dominator) => env
                .snapshot()
                .create_nodes_provider_for_dominator(dominator.node.node_index),
            Self::Diff(diff) => {
                let base = env.required_base()?;
                let added = env
                    .snapshot()
                    .create_added_nodes_provider(base.uid(), &diff.class_name)?;
                let deleted = base.create_deleted_nodes_provider(&diff.diff.deleted_indexes)?;
                Ok(Box::new(DiffProvider::new(
                    added,
                    deleted,
                    diff.diff.added_count,
                    diff.diff.removed_count,
                )))
            }
        }
    }

    fn create_child(&self, _env: &HeapEnv, item: HeapItem) -> Self {
        match self {
            Self::Object(object) => Self::Object(ObjectNode::from_item(
                item,
                object.from_base_snapshot,
                object.child_ancestors(),
            )),
            Self::Instance(instance) => {
                let ancestors = alloc::vec![instance.node.id];
                Self::Object(ObjectNode::from_item(item, instance.is_deleted, ancestors))
            }
            Self::Constructor(_) => Self::Instance(InstanceNode {
                node: item.node().clone(),
                is_deleted: false,
            }),
            Self::Diff(_) => {
                let node = item.node().clone();
                let is_deleted = !node.is_added_not_removed.unwrap_or(true);
                Self::Instance(InstanceNode { node, is_deleted })
            }
            Self::Dominator(_) => Self::Dominator(DominatorNode {
                node: item.node().clone(),
            }),
        }
    }

    fn child_hash_for_item(&self, env: &HeapEnv, item: &HeapItem) -> ChildHash {
        match self {
            Self::Object(_) | Self::Instance(_) => {
                edge_hash(env, item.node().id, item_edge_type(item), item.edge_name())
            }
            Self::Constructor(_) | Self::Diff(_) | Self::Dominator(_) => {
                ChildHash::Node(item.node().id)
            }
        }
    }

    fn child_hash_for_node(&self, env: &HeapEnv, child: &HeapNode) -> ChildHash {
        match (self, child) {
            (Self::Object(_) | Self::Instance(_), Self::Object(object)) => edge_hash(
                env,
                object.node.id,
                object.edge_type,
                object.edge_name.as_deref(),
            ),
            (_, child) => match child.snapshot_node() {
                Some(node) => ChildHash::Node(node.id),
                None => ChildHash::Edge {
                    retainer: None,
                    edge_type: None,
                    name: Some(String::from(child.name())),
                },
            },
        }
    }

    fn comparator(&self, env: &HeapEnv) -> ComparatorConfig {
        node_comparator(self, env.sort_order())
    }

    fn initially_has_children(&self) -> bool {
        match self {
            Self::Object(object) => !object.cycled,
            Self::Constructor(constructor) => constructor.aggregate.count > 0,
            Self::Diff(diff) => diff.diff.added_count + diff.diff.removed_count > 0,
            Self::Instance(_) | Self::Dominator(_) => true,
        }
    }
}
