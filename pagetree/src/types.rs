use alloc::borrow::Cow;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::SortableItem;

/// A half-open interval `[from, to)` of provider positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub from: usize,
    pub to: usize, // exclusive
}

impl Range {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, position: usize) -> bool {
        self.from <= position && position < self.to
    }
}

/// One window of items answered by a [`crate::Provider`].
///
/// `items[i]` sits at position `start_position + i`. A provider may answer with fewer items than
/// requested when the request runs past `total_length`; `end_position` always reflects what was
/// actually returned.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemsRange<T> {
    pub start_position: usize,
    pub end_position: usize, // exclusive
    pub total_length: usize,
    pub items: Vec<T>,
}

impl<T> ItemsRange<T> {
    pub fn new(start_position: usize, end_position: usize, total_length: usize, items: Vec<T>) -> Self {
        Self {
            start_position,
            end_position,
            total_length,
            items,
        }
    }

    /// An empty window anchored at `position`.
    pub fn empty(position: usize, total_length: usize) -> Self {
        Self::new(position, position, total_length, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn range(&self) -> Range {
        Range::new(self.start_position, self.end_position)
    }
}

/// A two-field composite sort key: primary field and direction, then secondary field and
/// direction.
///
/// Field names are interpreted by the provider (see [`SortableItem::compare_field`]).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparatorConfig {
    pub field_name1: Cow<'static, str>,
    pub ascending1: bool,
    pub field_name2: Cow<'static, str>,
    pub ascending2: bool,
}

impl ComparatorConfig {
    pub fn new(
        field_name1: impl Into<Cow<'static, str>>,
        ascending1: bool,
        field_name2: impl Into<Cow<'static, str>>,
        ascending2: bool,
    ) -> Self {
        Self {
            field_name1: field_name1.into(),
            ascending1,
            field_name2: field_name2.into(),
            ascending2,
        }
    }

    pub fn compare<T: SortableItem>(&self, a: &T, b: &T) -> Ordering {
        self.compare_by(a, b, T::compare_field)
    }

    /// Like [`ComparatorConfig::compare`], with `compare_field` standing in for
    /// [`SortableItem::compare_field`]. Lets values that are not provider items share the key.
    pub fn compare_by<T: ?Sized>(
        &self,
        a: &T,
        b: &T,
        mut compare_field: impl FnMut(&T, &T, &str) -> Ordering,
    ) -> Ordering {
        let primary = directed(compare_field(a, b, &self.field_name1), self.ascending1);
        if primary != Ordering::Equal {
            return primary;
        }
        directed(compare_field(a, b, &self.field_name2), self.ascending2)
    }
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending { ordering } else { ordering.reverse() }
}

/// Identity of a [`crate::GridNode`] within its grid, used in view notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);
