use alloc::boxed::Box;

use async_trait::async_trait;

use crate::{BoxProvider, ComparatorConfig, ItemsRange, Provider, ProviderError};

/// An item that can remember which side of a diff it came from.
pub trait DiffItem {
    fn set_added_not_removed(&mut self, added: bool);
}

/// Presents an "added" and a "removed" provider as one ordered sequence.
///
/// Positions `[0, added_count)` address the added side, positions
/// `[added_count, added_count + removed_count)` address the removed side. Both sides are sorted
/// with the same comparator but independently, so there is no global ordering across the seam.
pub struct DiffProvider<T, I> {
    added: BoxProvider<T, I>,
    removed: BoxProvider<T, I>,
    added_count: usize,
    removed_count: usize,
}

impl<T, I> DiffProvider<T, I> {
    pub fn new(
        added: BoxProvider<T, I>,
        removed: BoxProvider<T, I>,
        added_count: usize,
        removed_count: usize,
    ) -> Self {
        Self {
            added,
            removed,
            added_count,
            removed_count,
        }
    }

    pub fn added_count(&self) -> usize {
        self.added_count
    }

    pub fn removed_count(&self) -> usize {
        self.removed_count
    }

    pub fn total_length(&self) -> usize {
        self.added_count + self.removed_count
    }
}

impl<T, I> core::fmt::Debug for DiffProvider<T, I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DiffProvider")
            .field("added_count", &self.added_count)
            .field("removed_count", &self.removed_count)
            .finish_non_exhaustive()
    }
}

fn tag<T: DiffItem>(window: &mut ItemsRange<T>, added: bool) {
    for item in &mut window.items {
        item.set_added_not_removed(added);
    }
}

#[async_trait(?Send)]
impl<T: DiffItem, I> Provider for DiffProvider<T, I> {
    type Item = T;
    type Id = I;

    fn dispose(&mut self) {
        self.added.dispose();
        self.removed.dispose();
    }

    async fn is_empty(&self) -> Result<bool, ProviderError> {
        Ok(false)
    }

    async fn node_position(&self, _id: &I) -> Result<Option<usize>, ProviderError> {
        pwarn!("DiffProvider: node_position has no meaning across two sorted sides");
        Err(ProviderError::Unsupported("node_position"))
    }

    async fn serialize_items_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<ItemsRange<T>, ProviderError> {
        let added_count = self.added_count;
        let total = self.total_length();
        ptrace!(start, end, added_count, total, "DiffProvider::serialize_items_range");

        if start >= added_count {
            let mut removed = self
                .removed
                .serialize_items_range(start - added_count, end.saturating_sub(added_count))
                .await?;
            tag(&mut removed, false);
            removed.start_position += added_count;
            removed.end_position += added_count;
            removed.total_length = total;
            return Ok(removed);
        }

        let mut window = self.added.serialize_items_range(start, end).await?;
        tag(&mut window, true);
        if end > added_count {
            if window.end_position != added_count {
                pwarn!(
                    end_position = window.end_position,
                    added_count,
                    "DiffProvider: added side is shorter than its declared count"
                );
                debug_assert_eq!(
                    window.end_position, added_count,
                    "DiffProvider: added side is shorter than its declared count"
                );
            }
            let mut removed = self
                .removed
                .serialize_items_range(0, end - added_count)
                .await?;
            tag(&mut removed, false);
            window.items.append(&mut removed.items);
            window.end_position = added_count + removed.end_position;
        }
        window.total_length = total;
        Ok(window)
    }

    async fn sort_and_rewind(&mut self, comparator: &ComparatorConfig) -> Result<(), ProviderError> {
        self.added.sort_and_rewind(comparator).await?;
        self.removed.sort_and_rewind(comparator).await
    }
}
