use alloc::rc::Rc;
use core::cell::Cell;

use crate::{ChildChange, GridOptions, NodeId};

/// Receives structural notifications from the nodes of a grid.
///
/// Every method has an empty default so views only implement what they render. Notifications are
/// only sent between merge steps, never while a node's ranges and children disagree.
pub trait GridView {
    fn child_inserted(&self, _parent: NodeId, _index: usize) {}

    fn child_removed(&self, _parent: NodeId, _index: usize) {}

    /// The placeholder at `index` changed its bounds or failure state.
    fn child_updated(&self, _parent: NodeId, _index: usize) {}

    fn populate_complete(&self, _node: NodeId) {}

    fn update_visible_nodes(&self) {}

    /// Sent once when the outermost sorting scope is released.
    fn sorting_complete(&self) {}
}

/// State shared by all nodes of one grid: settings, the view, node ids and the sorting scope
/// depth.
pub struct GridContext<E> {
    env: E,
    options: GridOptions,
    view: Option<Rc<dyn GridView>>,
    next_node_id: Cell<u64>,
    sorting_depth: Cell<usize>,
    visible_update_pending: Cell<bool>,
}

impl<E> GridContext<E> {
    pub fn new(env: E, options: GridOptions) -> Self {
        Self {
            env,
            options,
            view: None,
            next_node_id: Cell::new(0),
            sorting_depth: Cell::new(0),
            visible_update_pending: Cell::new(false),
        }
    }

    pub fn with_view(mut self, view: Rc<dyn GridView>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: GridOptions) {
        self.options = options;
    }

    pub(crate) fn allocate_id(&self) -> NodeId {
        let id = self.next_node_id.get();
        self.next_node_id.set(id + 1);
        NodeId(id)
    }

    pub fn is_sorting(&self) -> bool {
        self.sorting_depth.get() > 0
    }

    /// Enters a sorting scope. While any scope is alive, per-child notifications are suppressed
    /// and visible-node updates are deferred until the outermost scope is dropped.
    pub fn enter_sorting(&self) -> SortingScope<'_, E> {
        let depth = self.sorting_depth.get();
        self.sorting_depth.set(depth.saturating_add(1));
        pdebug!(depth = depth + 1, "GridContext: enter sorting");
        SortingScope { ctx: self }
    }

    pub(crate) fn child_changed(&self, parent: NodeId, change: ChildChange) {
        if self.is_sorting() {
            return;
        }
        let Some(view) = &self.view else {
            return;
        };
        match change {
            ChildChange::Inserted(index) => view.child_inserted(parent, index),
            ChildChange::Removed(index) => view.child_removed(parent, index),
            ChildChange::Updated(index) => view.child_updated(parent, index),
        }
    }

    pub(crate) fn populate_complete(&self, node: NodeId) {
        if let Some(view) = &self.view {
            view.populate_complete(node);
        }
    }

    pub(crate) fn update_visible_nodes(&self) {
        if self.is_sorting() {
            self.visible_update_pending.set(true);
            return;
        }
        if let Some(view) = &self.view {
            view.update_visible_nodes();
        }
    }

    fn leave_sorting(&self) {
        let depth = self.sorting_depth.get();
        debug_assert!(depth > 0, "sorting_depth underflow");
        let next = depth.saturating_sub(1);
        self.sorting_depth.set(next);
        pdebug!(depth = next, "GridContext: leave sorting");
        if next > 0 {
            return;
        }
        let Some(view) = &self.view else {
            self.visible_update_pending.set(false);
            return;
        };
        if self.visible_update_pending.replace(false) {
            view.update_visible_nodes();
        }
        view.sorting_complete();
    }
}

impl<E: core::fmt::Debug> core::fmt::Debug for GridContext<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridContext")
            .field("env", &self.env)
            .field("options", &self.options)
            .field("has_view", &self.view.is_some())
            .field("sorting_depth", &self.sorting_depth.get())
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`GridContext::enter_sorting`]; leaves the scope on drop.
#[must_use = "the sorting scope ends when the guard is dropped"]
pub struct SortingScope<'a, E> {
    ctx: &'a GridContext<E>,
}

impl<E> Drop for SortingScope<'_, E> {
    fn drop(&mut self) {
        self.ctx.leave_sorting();
    }
}
