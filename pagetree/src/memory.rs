use alloc::boxed::Box;
use alloc::vec::Vec;
use core::cmp::Ordering;

use async_trait::async_trait;

use crate::{ComparatorConfig, ItemsRange, Provider, ProviderError};

/// An item that can be ordered by named fields and identified by a stable id.
pub trait SortableItem {
    type Id: PartialEq;

    fn item_id(&self) -> Self::Id;

    /// Compares one named field. Unknown fields compare as equal.
    fn compare_field(&self, other: &Self, field: &str) -> Ordering;
}

/// A [`Provider`] over an in-memory vector.
///
/// Useful for small collections, adapters that already hold their data, and tests.
#[derive(Clone, Debug)]
pub struct MemoryProvider<T> {
    items: Vec<T>,
    disposed: bool,
}

impl<T> MemoryProvider<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            disposed: false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.disposed {
            return Err(ProviderError::Disposed);
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl<T: SortableItem + Clone> Provider for MemoryProvider<T> {
    type Item = T;
    type Id = T::Id;

    fn dispose(&mut self) {
        self.disposed = true;
        self.items.clear();
    }

    async fn is_empty(&self) -> Result<bool, ProviderError> {
        self.check()?;
        Ok(self.items.is_empty())
    }

    async fn node_position(&self, id: &T::Id) -> Result<Option<usize>, ProviderError> {
        self.check()?;
        Ok(self.items.iter().position(|item| item.item_id() == *id))
    }

    async fn serialize_items_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<ItemsRange<T>, ProviderError> {
        self.check()?;
        let total = self.items.len();
        let start = start.min(total);
        let end = end.clamp(start, total);
        Ok(ItemsRange::new(
            start,
            end,
            total,
            self.items[start..end].to_vec(),
        ))
    }

    async fn sort_and_rewind(&mut self, comparator: &ComparatorConfig) -> Result<(), ProviderError> {
        self.check()?;
        self.items.sort_by(|a, b| comparator.compare(a, b));
        Ok(())
    }
}
