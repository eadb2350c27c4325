use alloc::boxed::Box;

use async_trait::async_trait;

use crate::{ComparatorConfig, ItemsRange, ProviderError};

/// A paged, sortable view over one ordered collection that lives outside the tree (a worker, a
/// database, a remote process, ...).
///
/// The engine never holds the whole collection. It asks for bounded windows by position and
/// keeps at most one request per node in flight: every node operation takes `&mut self`, so the
/// next window is only requested once the previous answer has been merged.
///
/// Providers are single-threaded handles (`?Send` futures), matching the cooperative model of the
/// grid that owns them.
#[async_trait(?Send)]
pub trait Provider {
    type Item;
    type Id;

    /// Releases backend resources. Calls made afterwards should fail with
    /// [`ProviderError::Disposed`].
    fn dispose(&mut self);

    async fn is_empty(&self) -> Result<bool, ProviderError>;

    /// Position of the item identified by `id` under the current ordering, or `None` when the
    /// collection does not contain it.
    async fn node_position(&self, id: &Self::Id) -> Result<Option<usize>, ProviderError>;

    /// Returns the items at positions `[start, end)`.
    ///
    /// The answer may be shorter than requested when `end` runs past the end of the collection.
    async fn serialize_items_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<ItemsRange<Self::Item>, ProviderError>;

    /// Re-sorts the collection and resets the provider-side cursor.
    async fn sort_and_rewind(&mut self, comparator: &ComparatorConfig) -> Result<(), ProviderError>;
}

pub type BoxProvider<T, I> = Box<dyn Provider<Item = T, Id = I>>;
