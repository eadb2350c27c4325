use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;

use crate::key::SavedChildren;
use crate::{
    BoxProvider, ChildChange, Entry, GridContext, ItemsRange, NodeId, NodeVariant, Placeholder,
    ProviderError, RangeIndex,
};

/// A tree node that materializes a bounded, position-ordered view of its provider's collection.
///
/// Children are fetched in windows of [`crate::GridOptions::populate_count`] items and merged
/// into a list of real children and [`Placeholder`]s, one placeholder per span that has not been
/// fetched. All operations take `&mut self`, so a node never has more than one provider request
/// in flight.
pub struct GridNode<V: NodeVariant> {
    id: NodeId,
    variant: V,
    provider: Option<BoxProvider<V::Item, V::Id>>,
    ranges: RangeIndex,
    children: Vec<Entry<GridNode<V>>>,
    instance_count: usize,
    saved_children: SavedChildren<V::Hash, GridNode<V>>,
    has_children: bool,
    expanded: bool,
    populated: bool,
    disposed: bool,
}

impl<V: NodeVariant> GridNode<V> {
    pub fn new(ctx: &GridContext<V::Env>, variant: V) -> Self {
        let has_children = variant.initially_has_children();
        Self {
            id: ctx.allocate_id(),
            variant,
            provider: None,
            ranges: RangeIndex::new(),
            children: Vec::new(),
            instance_count: 0,
            saved_children: SavedChildren::default(),
            has_children,
            expanded: false,
            populated: false,
            disposed: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn variant(&self) -> &V {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut V {
        &mut self.variant
    }

    pub fn ranges(&self) -> &RangeIndex {
        &self.ranges
    }

    pub fn children(&self) -> &[Entry<GridNode<V>>] {
        &self.children
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &GridNode<V>> + '_ {
        self.children.iter().filter_map(Entry::as_child)
    }

    pub fn child_nodes_mut(&mut self) -> impl Iterator<Item = &mut GridNode<V>> + '_ {
        self.children.iter_mut().filter_map(Entry::as_child_mut)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> + '_ {
        self.children.iter().filter_map(Entry::as_placeholder)
    }

    /// Number of items fetched since the last resort. After a resort whose fetch failed, the
    /// number it was asked to fetch.
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    pub fn saved_children_len(&self) -> usize {
        self.saved_children.len()
    }

    pub fn has_children(&self) -> bool {
        self.has_children
    }

    pub fn set_has_children(&mut self, has_children: bool) {
        self.has_children = has_children;
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The materialized child at `position`, if any.
    pub fn child_for_position(&self, position: usize) -> Option<&GridNode<V>> {
        let index = self.ranges.child_index(position)?;
        self.children.get(index).and_then(Entry::as_child)
    }

    pub fn child_for_position_mut(&mut self, position: usize) -> Option<&mut GridNode<V>> {
        let index = self.ranges.child_index(position)?;
        self.children.get_mut(index).and_then(Entry::as_child_mut)
    }

    /// The entry covering `position`: a child, or the placeholder spanning the position.
    pub fn entry_for_position(&self, position: usize) -> Option<&Entry<GridNode<V>>> {
        self.children.get(self.ranges.entry_index(position)?)
    }

    fn provider(
        &mut self,
        env: &V::Env,
    ) -> Result<&mut BoxProvider<V::Item, V::Id>, ProviderError> {
        match &mut self.provider {
            Some(provider) => Ok(provider),
            slot @ None => {
                pdebug!(node = self.id.0, "GridNode: creating provider");
                let provider = self.variant.create_provider(env)?;
                Ok(slot.insert(provider))
            }
        }
    }

    async fn sort_provider(&mut self, ctx: &GridContext<V::Env>) -> Result<(), ProviderError> {
        let comparator = self.variant.comparator(ctx.env());
        ptrace!(
            node = self.id.0,
            field1 = &*comparator.field_name1,
            field2 = &*comparator.field_name2,
            "GridNode: sort_and_rewind"
        );
        self.provider(ctx.env())?.sort_and_rewind(&comparator).await
    }

    async fn fetch_window(
        &mut self,
        ctx: &GridContext<V::Env>,
        start: usize,
        end: usize,
    ) -> Result<ItemsRange<V::Item>, ProviderError> {
        let attempts = ctx.options().retry.attempts();
        let provider = self.provider(ctx.env())?;
        let mut attempt = 1;
        loop {
            ptrace!(start, end, attempt, "GridNode: serialize_items_range");
            match provider.serialize_items_range(start, end).await {
                Ok(window) => return Ok(window),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    pdebug!(start, end, attempt, error = %err, "GridNode: retrying window");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn merge_window(&mut self, ctx: &GridContext<V::Env>, window: ItemsRange<V::Item>) {
        let Self {
            id,
            variant,
            ranges,
            children,
            saved_children,
            instance_count,
            ..
        } = self;
        let env = ctx.env();
        let covered = ranges.covered_len();
        let mut changes = Vec::new();
        ranges.merge(
            children,
            window,
            |item| {
                let hash = variant.child_hash_for_item(env, &item);
                match saved_children.remove(&hash) {
                    Some(saved) => saved,
                    None => GridNode::new(ctx, variant.create_child(env, item)),
                }
            },
            &mut |change: ChildChange| changes.push(change),
        );
        *instance_count += ranges.covered_len().saturating_sub(covered);
        for change in changes {
            ctx.child_changed(*id, change);
        }
    }

    /// Flags the first unfetched span of `[from, to)` as failed, or inserts a failed placeholder
    /// when nothing is materialized yet.
    fn mark_failed(&mut self, ctx: &GridContext<V::Env>, from: usize, to: usize) {
        if self.ranges.is_empty() {
            while self.children.pop().is_some() {
                ctx.child_changed(self.id, ChildChange::Removed(self.children.len()));
            }
            self.children
                .push(Entry::Placeholder(Placeholder::failed(from, to.max(from + 1))));
            ctx.child_changed(self.id, ChildChange::Inserted(0));
        } else {
            let position = self
                .ranges
                .ranges()
                .iter()
                .find(|r| r.contains(from))
                .map_or(from, |r| r.to);
            let index = self.ranges.entry_index(position);
            if let Some(placeholder) = index
                .and_then(|index| self.children.get_mut(index))
                .and_then(Entry::as_placeholder_mut)
            {
                placeholder.failed = true;
                if let Some(index) = index {
                    ctx.child_changed(self.id, ChildChange::Updated(index));
                }
            }
        }
        if self.expanded {
            ctx.update_visible_nodes();
        }
    }

    /// Fetches and merges `[from, to)` window by window. `to = None` requests one page.
    ///
    /// The request is clamped to the collection length once the first window arrives. A disposed
    /// provider ends the request quietly; any other failure flags the unfetched span as failed and
    /// is returned.
    pub async fn populate_children(
        &mut self,
        ctx: &GridContext<V::Env>,
        from: usize,
        to: Option<usize>,
    ) -> Result<(), ProviderError> {
        if self.disposed {
            return Ok(());
        }
        let page = ctx.options().populate_count.max(1);
        let max_windows = ctx.options().max_windows_per_request;
        let mut to = to.unwrap_or(from + page);
        let mut next = from;
        let mut windows = 0;
        while next < to {
            if max_windows.is_some_and(|max| windows >= max) {
                pdebug!(
                    node = self.id.0,
                    next,
                    to,
                    windows,
                    "GridNode: window limit reached"
                );
                break;
            }
            let end = next.saturating_add(page).min(to);
            let window = match self.fetch_window(ctx, next, end).await {
                Ok(window) => window,
                Err(ProviderError::Disposed) => {
                    pdebug!(node = self.id.0, "GridNode: provider disposed, dropping window");
                    return Ok(());
                }
                Err(err) => {
                    self.mark_failed(ctx, next, to);
                    return Err(err);
                }
            };
            windows += 1;
            to = to.min(window.total_length);
            let window_end = window.end_position;
            self.merge_window(ctx, window);
            if window_end <= next {
                break;
            }
            next = window_end;
        }

        if self.expanded {
            ctx.update_visible_nodes();
        }
        ctx.populate_complete(self.id);
        Ok(())
    }

    /// Sorts the provider with the node's comparator and fetches the first page. Does nothing once
    /// the node is populated.
    pub async fn populate(&mut self, ctx: &GridContext<V::Env>) -> Result<(), ProviderError> {
        if self.populated || self.disposed {
            return Ok(());
        }
        self.populated = true;
        let result = match self.sort_provider(ctx).await {
            Ok(()) => self.populate_children(ctx, 0, None).await,
            Err(ProviderError::Disposed) => Ok(()),
            Err(err) => {
                self.mark_failed(ctx, 0, ctx.options().populate_count);
                Err(err)
            }
        };
        if result.is_err() && self.ranges.is_empty() {
            self.populated = false;
        }
        result
    }

    pub async fn expand(&mut self, ctx: &GridContext<V::Env>) -> Result<(), ProviderError> {
        if !self.has_children || self.disposed {
            return Ok(());
        }
        self.expanded = true;
        self.populate(ctx).await
    }

    /// Marks the node expanded and sorts its provider without fetching anything.
    pub async fn expand_without_populate(
        &mut self,
        ctx: &GridContext<V::Env>,
    ) -> Result<(), ProviderError> {
        if self.disposed {
            return Ok(());
        }
        self.populated = true;
        self.expanded = true;
        self.sort_provider(ctx).await
    }

    /// Collapses the node. Fetched children are kept for the next expansion.
    pub fn collapse(&mut self, ctx: &GridContext<V::Env>) {
        if !self.expanded {
            return;
        }
        self.expanded = false;
        ctx.update_visible_nodes();
    }

    /// Asks the provider whether there is anything to expand.
    pub async fn update_has_children(
        &mut self,
        ctx: &GridContext<V::Env>,
    ) -> Result<(), ProviderError> {
        if self.disposed {
            return Ok(());
        }
        match self.provider(ctx.env())?.is_empty().await {
            Ok(is_empty) => {
                self.has_children = !is_empty;
                Ok(())
            }
            Err(ProviderError::Disposed) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Fetches the span of the placeholder at `index`: `count` more items, or all of it when
    /// `count` is `None`. Also used to retry a failed placeholder.
    pub async fn show_more(
        &mut self,
        ctx: &GridContext<V::Env>,
        index: usize,
        count: Option<usize>,
    ) -> Result<(), ProviderError> {
        let Some(&placeholder) = self.children.get(index).and_then(Entry::as_placeholder) else {
            pwarn!(
                node = self.id.0,
                index,
                "GridNode::show_more: no placeholder at index"
            );
            debug_assert!(
                self.children.get(index).is_some_and(Entry::is_placeholder),
                "GridNode::show_more: no placeholder at index {index}"
            );
            return Ok(());
        };
        let to = count.map_or(placeholder.to, |count| {
            placeholder.from.saturating_add(count).min(placeholder.to)
        });
        self.populate_children(ctx, placeholder.from, Some(to)).await
    }

    /// Moves expanded children into `saved_children` and disposes the rest. Entries saved by an
    /// earlier resort stay until a child with the same hash replaces them.
    fn save_children(&mut self, ctx: &GridContext<V::Env>) {
        let env = ctx.env();
        for entry in mem::take(&mut self.children) {
            let Entry::Child(mut child) = entry else {
                continue;
            };
            if !child.expanded {
                child.dispose();
                continue;
            }
            let hash = self.variant.child_hash_for_node(env, &child.variant);
            if let Some(mut replaced) = self.saved_children.insert(hash, child) {
                replaced.dispose();
            }
        }
    }

    /// Re-sorts the children under the node's current comparator, keeping expanded children
    /// (matched by content hash) together with everything they already fetched.
    ///
    /// The first `instance_count` positions are fetched again, then every expanded child is
    /// resorted the same way. The whole cascade runs inside one sorting scope.
    ///
    /// If the provider cannot be sorted, nothing changes. If the fetch fails, the span is left as
    /// a failed placeholder and the expanded children stay saved until it is fetched.
    pub async fn sort(&mut self, ctx: &GridContext<V::Env>) -> Result<(), ProviderError> {
        if self.disposed {
            return Ok(());
        }
        let _scope = ctx.enter_sorting();
        if !self.populated {
            return Ok(());
        }
        ptrace!(node = self.id.0, count = self.instance_count, "GridNode: sort");
        match self.sort_provider(ctx).await {
            Ok(()) => {}
            Err(ProviderError::Disposed) => return Ok(()),
            Err(err) => return Err(err),
        }

        self.save_children(ctx);
        self.ranges.clear();
        let count = mem::take(&mut self.instance_count);
        if let Err(err) = self
            .populate_children(ctx, 0, (count > 0).then_some(count))
            .await
        {
            // The next resort or a retry of the failed placeholder fetches the same span.
            self.instance_count = self.instance_count.max(count);
            return Err(err);
        }

        let mut first_error = None;
        for child in self.child_nodes_mut() {
            if !child.expanded {
                continue;
            }
            if let Err(err) = Box::pin(child.sort(ctx)).await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Expands the node and makes sure the child identified by `id` is materialized.
    ///
    /// Returns `Ok(None)` after collapsing the node when the provider does not know `id`.
    /// On failure the node is collapsed too and the error is returned.
    pub async fn reveal(
        &mut self,
        ctx: &GridContext<V::Env>,
        id: &V::Id,
    ) -> Result<Option<&mut GridNode<V>>, ProviderError> {
        if self.disposed {
            return Ok(None);
        }
        self.has_children = true;
        let position = match self.reveal_position(ctx, id).await {
            Ok(Some(position)) => position,
            Ok(None) => {
                pdebug!(node = self.id.0, "GridNode::reveal: not found");
                self.abandon_reveal(ctx);
                return Ok(None);
            }
            Err(ProviderError::Disposed) => return Ok(None),
            Err(err) => {
                self.abandon_reveal(ctx);
                return Err(err);
            }
        };

        let index = self.ranges.child_index(position);
        if index.is_none() {
            pwarn!(
                node = self.id.0,
                position,
                "GridNode::reveal: position is not materialized after populate"
            );
            debug_assert!(
                index.is_some(),
                "GridNode::reveal: position {position} is not materialized after populate"
            );
        }
        Ok(index
            .and_then(|index| self.children.get_mut(index))
            .and_then(Entry::as_child_mut))
    }

    async fn reveal_position(
        &mut self,
        ctx: &GridContext<V::Env>,
        id: &V::Id,
    ) -> Result<Option<usize>, ProviderError> {
        self.expand_without_populate(ctx).await?;
        let Some(position) = self.provider(ctx.env())?.node_position(id).await? else {
            return Ok(None);
        };
        ptrace!(node = self.id.0, position, "GridNode::reveal: position");
        if self.ranges.child_index(position).is_none() {
            self.populate_children(ctx, position, None).await?;
        }
        Ok(Some(position))
    }

    fn abandon_reveal(&mut self, ctx: &GridContext<V::Env>) {
        if self.ranges.is_empty() {
            self.populated = false;
        }
        self.collapse(ctx);
    }

    /// Disposes the provider and every descendant, including saved children. Later operations
    /// on this node do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.expanded = false;
        if let Some(mut provider) = self.provider.take() {
            provider.dispose();
        }
        for child in self.child_nodes_mut() {
            child.dispose();
        }
        for child in self.saved_children.values_mut() {
            child.dispose();
        }
        self.saved_children.clear();
        self.children.clear();
        self.ranges.clear();
    }
}

impl<V: NodeVariant + core::fmt::Debug> core::fmt::Debug for GridNode<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GridNode")
            .field("id", &self.id)
            .field("variant", &self.variant)
            .field("ranges", &self.ranges)
            .field("children", &self.children)
            .field("instance_count", &self.instance_count)
            .field("expanded", &self.expanded)
            .field("populated", &self.populated)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
