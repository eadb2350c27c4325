use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use pagetree::{GridContext, GridNode, GridOptions, GridView, ProviderError};

use crate::comparator::{bucket_comparator, compare_bucket_field};
use crate::{
    ALL_OBJECTS, ConstructorNode, DiffNode, DominatorNode, HeapEnv, HeapNode, ObjectNode,
    SnapshotBackend, SnapshotNode, SortColumn, SortOrder,
};

/// The heap views a [`SnapshotGrid`] can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GridKind {
    /// One class bucket per constructor, listing its instances.
    Summary,
    /// One bucket per class that changed against a base snapshot.
    Diff,
    /// The dominator tree, starting at the snapshot root.
    Dominators,
    /// References between objects, starting at the snapshot root.
    Containment,
}

impl GridKind {
    pub fn default_populate_count(self) -> usize {
        match self {
            Self::Summary | Self::Containment => 100,
            Self::Diff => 50,
            Self::Dominators => 25,
        }
    }

    pub fn default_sort_order(self) -> SortOrder {
        match self {
            Self::Diff => SortOrder::new(SortColumn::AddedSize, false),
            Self::Summary | Self::Dominators | Self::Containment => {
                SortOrder::new(SortColumn::RetainedSize, false)
            }
        }
    }

    fn is_tree(self) -> bool {
        matches!(self, Self::Dominators | Self::Containment)
    }
}

/// A top-level heap grid: the bucket list of a summary or diff view, or the root of a dominator
/// or containment tree.
///
/// The grid owns its nodes and the [`GridContext`] they share. Tree grids hold their root as the
/// only top-level node.
#[derive(Debug)]
pub struct SnapshotGrid {
    kind: GridKind,
    ctx: GridContext<HeapEnv>,
    nodes: Vec<GridNode<HeapNode>>,
    last_sort: Option<SortOrder>,
}

impl SnapshotGrid {
    /// Creates an empty grid. The environment's sort order is reset to the kind's default.
    pub fn new(kind: GridKind, env: HeapEnv) -> Self {
        let env = env.with_sort_order(kind.default_sort_order());
        let options = GridOptions::new(kind.default_populate_count());
        Self {
            kind,
            ctx: GridContext::new(env, options),
            nodes: Vec::new(),
            last_sort: None,
        }
    }

    pub fn with_options(mut self, options: GridOptions) -> Self {
        self.ctx.set_options(options);
        self
    }

    pub fn with_view(self, view: Rc<dyn GridView>) -> Self {
        let Self {
            kind,
            ctx,
            nodes,
            last_sort,
        } = self;
        Self {
            kind,
            ctx: ctx.with_view(view),
            nodes,
            last_sort,
        }
    }

    pub fn kind(&self) -> GridKind {
        self.kind
    }

    pub fn context(&self) -> &GridContext<HeapEnv> {
        &self.ctx
    }

    pub fn env(&self) -> &HeapEnv {
        self.ctx.env()
    }

    pub fn nodes(&self) -> &[GridNode<HeapNode>] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [GridNode<HeapNode>] {
        &mut self.nodes
    }

    /// Context and nodes at once, for driving node operations from outside.
    pub fn split_mut(&mut self) -> (&GridContext<HeapEnv>, &mut [GridNode<HeapNode>]) {
        (&self.ctx, &mut self.nodes)
    }

    /// Root of a dominator or containment grid.
    pub fn root(&self) -> Option<&GridNode<HeapNode>> {
        self.kind.is_tree().then(|| self.nodes.first()).flatten()
    }

    /// The class bucket (summary) or diff bucket named `class_name`.
    pub fn bucket(&self, class_name: &str) -> Option<&GridNode<HeapNode>> {
        self.nodes
            .iter()
            .find(|node| is_bucket_for(node.variant(), class_name))
    }

    pub fn bucket_mut(&mut self, class_name: &str) -> Option<&mut GridNode<HeapNode>> {
        self.nodes
            .iter_mut()
            .find(|node| is_bucket_for(node.variant(), class_name))
    }

    /// Drops every node and builds the grid again from the backends.
    pub async fn populate(&mut self) -> Result<(), ProviderError> {
        self.dispose();
        self.last_sort = None;
        hdebug!(kind = ?self.kind, "SnapshotGrid: populate");
        match self.kind {
            GridKind::Summary => {
                let aggregates = self.ctx.env().snapshot().aggregates(ALL_OBJECTS).await?;
                for (class_name, aggregate) in aggregates {
                    let variant = HeapNode::Constructor(ConstructorNode {
                        class_name,
                        aggregates_key: String::from(ALL_OBJECTS),
                        aggregate,
                    });
                    self.nodes.push(GridNode::new(&self.ctx, variant));
                }
                self.sorting_changed().await
            }
            GridKind::Diff => self.populate_diff().await,
            GridKind::Dominators | GridKind::Containment => {
                let root = SnapshotNode {
                    node_index: self.ctx.env().snapshot().root_node_index(),
                    ..SnapshotNode::default()
                };
                let variant = match self.kind {
                    GridKind::Dominators => HeapNode::Dominator(DominatorNode { node: root }),
                    _ => HeapNode::Object(ObjectNode::root(root)),
                };
                self.nodes.push(GridNode::new(&self.ctx, variant));
                self.last_sort = Some(self.ctx.env().sort_order());
                match self.nodes.first_mut() {
                    Some(root) => root.expand(&self.ctx).await,
                    None => Ok(()),
                }
            }
        }
    }

    async fn populate_diff(&mut self) -> Result<(), ProviderError> {
        let env = self.ctx.env();
        let snapshot = Rc::clone(env.snapshot());
        let base = match env.base_snapshot() {
            Some(base) if base.uid() != snapshot.uid() => Rc::clone(base),
            _ => {
                hdebug!("SnapshotGrid: nothing to compare against");
                drop(self.ctx.enter_sorting());
                return Ok(());
            }
        };
        let base_aggregates = base.aggregates_for_diff().await?;
        let diffs = snapshot
            .calculate_snapshot_diff(base.uid(), base_aggregates)
            .await?;
        for (class_name, diff) in diffs {
            let variant = HeapNode::Diff(DiffNode { class_name, diff });
            self.nodes.push(GridNode::new(&self.ctx, variant));
        }
        self.sorting_changed().await
    }

    /// Selects another base snapshot and rebuilds the grid.
    pub async fn set_base_snapshot(
        &mut self,
        base: Option<Rc<dyn SnapshotBackend>>,
    ) -> Result<(), ProviderError> {
        self.ctx.env_mut().set_base_snapshot(base);
        self.populate().await
    }

    pub async fn sort_by(&mut self, column: SortColumn, ascending: bool) -> Result<(), ProviderError> {
        self.ctx
            .env_mut()
            .set_sort_order(SortOrder::new(column, ascending));
        self.sorting_changed().await
    }

    /// Re-sorts the grid under the environment's sort order. Repeating the last applied order does
    /// nothing.
    ///
    /// Buckets are reordered locally and every expanded bucket is resorted with its subtree; the
    /// whole pass runs inside one sorting scope.
    pub async fn sorting_changed(&mut self) -> Result<(), ProviderError> {
        let order = self.ctx.env().sort_order();
        if self.last_sort == Some(order) {
            return Ok(());
        }
        self.last_sort = Some(order);
        let _scope = self.ctx.enter_sorting();

        if self.kind.is_tree() {
            return match self.nodes.first_mut() {
                Some(root) => root.sort(&self.ctx).await,
                None => Ok(()),
            };
        }

        let config = bucket_comparator(order);
        self.nodes
            .sort_by(|a, b| config.compare_by(a.variant(), b.variant(), compare_bucket_field));
        let mut first_error = None;
        for node in self.nodes.iter_mut().filter(|node| node.is_expanded()) {
            if let Err(err) = node.sort(&self.ctx).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Reveals the object with snapshot id `id` and returns its node.
    ///
    /// The summary grid reveals it inside its class bucket. The dominators grid expands the
    /// dominator chain one level at a time. Other grids return `Ok(None)`, as do objects the
    /// backend does not know.
    pub async fn highlight_object(
        &mut self,
        id: u64,
    ) -> Result<Option<&mut GridNode<HeapNode>>, ProviderError> {
        let snapshot = Rc::clone(self.ctx.env().snapshot());
        match self.kind {
            GridKind::Summary => {
                let Some(class_name) = snapshot.node_class_name(id).await? else {
                    return Ok(None);
                };
                let Some(bucket) = self
                    .nodes
                    .iter_mut()
                    .find(|node| is_bucket_for(node.variant(), &class_name))
                else {
                    hwarn!(id, class_name = %class_name, "SnapshotGrid: no bucket for class");
                    return Ok(None);
                };
                bucket.reveal(&self.ctx, &id).await
            }
            GridKind::Dominators => {
                let Some(mut path) = snapshot.dominator_ids_for_node(id).await? else {
                    return Ok(None);
                };
                let Some(mut current) = self.nodes.first_mut() else {
                    return Ok(None);
                };
                while let Some(next) = path.pop() {
                    match current.reveal(&self.ctx, &next).await? {
                        Some(child) => current = child,
                        None => return Ok(None),
                    }
                }
                Ok(Some(current))
            }
            GridKind::Diff | GridKind::Containment => Ok(None),
        }
    }

    /// Disposes every node. The grid stays usable; [`SnapshotGrid::populate`] rebuilds it.
    pub fn dispose(&mut self) {
        for node in &mut self.nodes {
            node.dispose();
        }
        self.nodes.clear();
    }
}

fn is_bucket_for(variant: &HeapNode, class_name: &str) -> bool {
    match variant {
        HeapNode::Constructor(node) => node.class_name == class_name,
        HeapNode::Diff(node) => node.class_name == class_name,
        _ => false,
    }
}
