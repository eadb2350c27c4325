use alloc::borrow::Cow;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

use pagetree::{DiffItem, SortableItem};

/// Snapshot object types, as reported by the heap profiler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    #[default]
    Hidden,
    Array,
    String,
    Object,
    Code,
    Closure,
    RegExp,
    Number,
    Native,
    Synthetic,
    ConcatenatedString,
    SlicedString,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Array => "array",
            Self::String => "string",
            Self::Object => "object",
            Self::Code => "code",
            Self::Closure => "closure",
            Self::RegExp => "regexp",
            Self::Number => "number",
            Self::Native => "native",
            Self::Synthetic => "synthetic",
            Self::ConcatenatedString => "concatenated string",
            Self::SlicedString => "sliced string",
        }
    }
}

/// Reference kinds between snapshot objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeType {
    Context,
    Element,
    Property,
    Internal,
    Hidden,
    Shortcut,
    Weak,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Element => "element",
            Self::Property => "property",
            Self::Internal => "internal",
            Self::Hidden => "hidden",
            Self::Shortcut => "shortcut",
            Self::Weak => "weak",
        }
    }
}

/// Distance of objects that are not reachable from the root.
pub const NO_DISTANCE: u32 = u32::MAX;

/// One object of a heap snapshot, as served to the grids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotNode {
    pub id: u64,
    pub name: String,
    pub node_type: NodeType,
    pub distance: u32,
    pub self_size: u64,
    pub retained_size: u64,
    /// Backend-side index, used to ask for edges, retainers or dominated objects.
    pub node_index: usize,
    pub can_be_queried: bool,
    pub detached_dom_tree_node: bool,
    /// Set on items served by a diff provider.
    pub is_added_not_removed: Option<bool>,
}

impl SnapshotNode {
    /// Name of the class bucket this object is aggregated into.
    pub fn class_name(&self) -> Cow<'_, str> {
        match self.node_type {
            NodeType::Hidden => Cow::Borrowed("(system)"),
            NodeType::Object | NodeType::Native => Cow::Borrowed(&self.name),
            NodeType::Code => Cow::Borrowed("(compiled code)"),
            other => Cow::Owned(format!("({})", other.as_str())),
        }
    }
}

/// A reference from (or, for retainer views, to) a snapshot object.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotEdge {
    pub name: String,
    pub edge_type: EdgeType,
    /// The object at the other end of the reference.
    pub node: SnapshotNode,
}

/// What heap providers serve: objects (class buckets, dominated objects, diffs) or edges
/// (containment and retainer views).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeapItem {
    Node(SnapshotNode),
    Edge(SnapshotEdge),
}

impl HeapItem {
    pub fn node(&self) -> &SnapshotNode {
        match self {
            Self::Node(node) => node,
            Self::Edge(edge) => &edge.node,
        }
    }

    fn node_mut(&mut self) -> &mut SnapshotNode {
        match self {
            Self::Node(node) => node,
            Self::Edge(edge) => &mut edge.node,
        }
    }

    pub fn edge_name(&self) -> Option<&str> {
        match self {
            Self::Node(_) => None,
            Self::Edge(edge) => Some(&edge.name),
        }
    }
}

/// Element edges are named by index and order numerically; named edges come first.
fn compare_edge_names(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl SortableItem for HeapItem {
    type Id = u64;

    fn item_id(&self) -> u64 {
        self.node().id
    }

    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        let (a, b) = (self.node(), other.node());
        match field {
            "id" => a.id.cmp(&b.id),
            "selfSize" => a.self_size.cmp(&b.self_size),
            "retainedSize" => a.retained_size.cmp(&b.retained_size),
            "distance" => a.distance.cmp(&b.distance),
            "name" | "_name" => a.name.cmp(&b.name),
            "!edgeName" => match (self.edge_name(), other.edge_name()) {
                (Some(a), Some(b)) => compare_edge_names(a, b),
                _ => a.name.cmp(&b.name),
            },
            _ => Ordering::Equal,
        }
    }
}

impl DiffItem for HeapItem {
    fn set_added_not_removed(&mut self, added: bool) {
        self.node_mut().is_added_not_removed = Some(added);
    }
}

/// Per-class totals shown by the summary grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aggregate {
    pub count: usize,
    /// Smallest distance of any instance.
    pub distance: u32,
    pub self_size: u64,
    /// Largest retained size of any instance.
    pub max_ret: u64,
}

/// What a base snapshot shares with the current one to compute a per-class diff.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateForDiff {
    pub indexes: Vec<usize>,
    pub ids: Vec<u64>,
    pub self_sizes: Vec<u64>,
}

/// Per-class difference between a base snapshot and the current one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffForClass {
    pub added_count: usize,
    pub removed_count: usize,
    pub count_delta: i64,
    pub added_size: u64,
    pub removed_size: u64,
    pub size_delta: i64,
    /// Node indexes, in the base snapshot, of the removed objects.
    pub deleted_indexes: Vec<usize>,
}
