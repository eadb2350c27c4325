use crate::{BoxProvider, ComparatorConfig, ContentHash, ProviderError};

/// The domain-specific half of a [`crate::GridNode`].
///
/// A variant decides which provider backs a node, how a fetched item becomes a child, and how
/// children are recognized again after a resort. The fetch-merge, resort and reveal algorithms are
/// shared by every variant.
pub trait NodeVariant: Sized {
    type Item;
    /// Identity accepted by [`crate::Provider::node_position`].
    type Id;
    /// Position-independent identity of a child, used to keep expanded children across a resort.
    type Hash: ContentHash;
    /// Grid-wide settings and backend handles passed to every call.
    type Env;

    /// Creates the provider listing this node's children. Called lazily, once per provider
    /// lifetime.
    fn create_provider(
        &self,
        env: &Self::Env,
    ) -> Result<BoxProvider<Self::Item, Self::Id>, ProviderError>;

    fn create_child(&self, env: &Self::Env, item: Self::Item) -> Self;

    fn child_hash_for_item(&self, env: &Self::Env, item: &Self::Item) -> Self::Hash;

    fn child_hash_for_node(&self, env: &Self::Env, child: &Self) -> Self::Hash;

    /// Ordering of this node's children under the grid's current sort settings.
    fn comparator(&self, env: &Self::Env) -> ComparatorConfig;

    /// Whether a freshly created node shows an expander before its provider was asked.
    fn initially_has_children(&self) -> bool {
        true
    }
}
