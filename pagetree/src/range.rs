use alloc::vec::Vec;

use crate::{ItemsRange, Range};

/// A stand-in for a span of positions that has not been fetched yet.
///
/// `failed` is set when the last attempt to fetch (part of) this span errored; the span can be
/// retried with [`crate::GridNode::show_more`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placeholder {
    pub from: usize,
    pub to: usize, // exclusive
    pub failed: bool,
}

impl Placeholder {
    pub fn new(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            failed: false,
        }
    }

    pub fn failed(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            failed: true,
        }
    }

    pub fn len(&self) -> usize {
        self.to.saturating_sub(self.from)
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn range(&self) -> Range {
        Range::new(self.from, self.to)
    }
}

/// One materialized slot of a node's children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry<C> {
    Child(C),
    Placeholder(Placeholder),
}

impl<C> Entry<C> {
    pub fn as_child(&self) -> Option<&C> {
        match self {
            Self::Child(child) => Some(child),
            Self::Placeholder(_) => None,
        }
    }

    pub fn as_child_mut(&mut self) -> Option<&mut C> {
        match self {
            Self::Child(child) => Some(child),
            Self::Placeholder(_) => None,
        }
    }

    pub fn as_placeholder(&self) -> Option<&Placeholder> {
        match self {
            Self::Child(_) => None,
            Self::Placeholder(placeholder) => Some(placeholder),
        }
    }

    pub fn as_placeholder_mut(&mut self) -> Option<&mut Placeholder> {
        match self {
            Self::Child(_) => None,
            Self::Placeholder(placeholder) => Some(placeholder),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Number of positions this entry stands for.
    pub fn span(&self) -> usize {
        match self {
            Self::Child(_) => 1,
            Self::Placeholder(placeholder) => placeholder.len(),
        }
    }
}

/// A structural change to a children list, reported by [`RangeIndex::merge`] in the order it
/// was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildChange {
    Inserted(usize),
    Removed(usize),
    /// The placeholder at this index changed its bounds.
    Updated(usize),
}

/// Tracks which position intervals of a node's children are materialized.
///
/// The index and the children list it describes are kept in lockstep by [`RangeIndex::merge`]:
/// ranges are sorted, never overlap and never touch, and every uncovered gap (leading, between two
/// ranges, trailing) is represented by exactly one [`Placeholder`] in the children list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeIndex {
    ranges: Vec<Range>,
    total_length: usize,
}

impl RangeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Total length reported by the most recent merged window.
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of positions that are materialized.
    pub fn covered_len(&self) -> usize {
        self.ranges.iter().map(Range::len).sum()
    }

    /// Whether `[from, to)` is fully materialized.
    pub fn covers(&self, from: usize, to: usize) -> bool {
        from >= to || self.ranges.iter().any(|r| r.from <= from && to <= r.to)
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.total_length = 0;
    }

    /// Index of the children entry covering `position`: the child itself when the position is
    /// materialized, otherwise the placeholder spanning it.
    pub fn entry_index(&self, position: usize) -> Option<usize> {
        let mut index = 0;
        let mut covered_to = 0;
        for r in &self.ranges {
            if r.from > covered_to {
                if position < r.from {
                    return Some(index);
                }
                index += 1;
            }
            if position < r.to {
                return Some(index + position - r.from);
            }
            index += r.len();
            covered_to = r.to;
        }
        (position < self.total_length && covered_to < self.total_length).then_some(index)
    }

    /// Index of the materialized child at `position`, or `None` when the position is not covered
    /// by any range.
    pub fn child_index(&self, position: usize) -> Option<usize> {
        let mut index = usize::from(self.ranges.first().is_some_and(|r| r.from > 0));
        for r in &self.ranges {
            if r.contains(position) {
                return Some(index + position - r.from);
            }
            index += r.len() + usize::from(r.to < self.total_length);
        }
        None
    }

    /// Merges one fetched window into `children`, creating a child for every item that is not
    /// materialized yet and reshaping placeholders around it.
    ///
    /// Items at positions that are already covered are dropped, so merging the same window twice
    /// leaves `children` unchanged. Every structural change is reported to `on_change` right after
    /// it is applied.
    ///
    /// Returns the children index right after the window's last position. A malformed window
    /// (inconsistent bounds, or a total length that disagrees with earlier windows) is a contract
    /// violation: it is reported and ignored.
    pub fn merge<C, T>(
        &mut self,
        children: &mut Vec<Entry<C>>,
        window: ItemsRange<T>,
        mut make_child: impl FnMut(T) -> C,
        on_change: &mut dyn FnMut(ChildChange),
    ) -> usize {
        let ItemsRange {
            start_position: start,
            end_position: end,
            total_length: total,
            items,
        } = window;

        if start > end || end > total || items.len() != end - start {
            pwarn!(
                start,
                end,
                total,
                items = items.len(),
                "RangeIndex::merge: malformed window"
            );
            debug_assert!(
                start <= end && end <= total && items.len() == end - start,
                "RangeIndex::merge: malformed window (start={start}, end={end}, total={total}, items={})",
                items.len()
            );
            return children.len();
        }

        if self.ranges.is_empty() {
            // Anything left over is a placeholder from a failed first fetch.
            while children.pop().is_some() {
                on_change(ChildChange::Removed(children.len()));
            }
            self.total_length = total;
            if start == end {
                if total > 0 {
                    children.push(Entry::Placeholder(Placeholder::new(0, total)));
                    on_change(ChildChange::Inserted(0));
                }
                return children.len();
            }
            if start > 0 {
                children.push(Entry::Placeholder(Placeholder::new(0, start)));
                on_change(ChildChange::Inserted(0));
            }
            for item in items {
                children.push(Entry::Child(make_child(item)));
                on_change(ChildChange::Inserted(children.len() - 1));
            }
            let insertion = children.len();
            if end < total {
                children.push(Entry::Placeholder(Placeholder::new(end, total)));
                on_change(ChildChange::Inserted(insertion));
            }
            self.ranges.push(Range::new(start, end));
            ptrace!(start, end, total, "RangeIndex::merge: first window");
            return insertion;
        }

        if total != self.total_length {
            pwarn!(
                total,
                expected = self.total_length,
                "RangeIndex::merge: total length changed between windows"
            );
            debug_assert_eq!(
                total, self.total_length,
                "RangeIndex::merge: total length changed between windows"
            );
            return children.len();
        }
        if start == end {
            return self.entry_index(start).unwrap_or(children.len());
        }

        // Locate the first range reaching `start`, counting entries on the way.
        let mut insertion = 0;
        let mut covered_to = 0;
        let mut range_index = 0;
        let mut found = None;
        while let Some(&r) = self.ranges.get(range_index) {
            if r.from > covered_to {
                insertion += 1;
            }
            if r.to >= start {
                found = Some(r);
                break;
            }
            insertion += r.len();
            covered_to = r.to;
            range_index += 1;
        }

        match found {
            Some(r) if start >= r.from => insertion += start - r.from,
            _ => {
                if found.is_none() {
                    insertion += 1; // trailing placeholder
                }
                let placeholder_index = insertion - 1;
                let at_placeholder = children
                    .get(placeholder_index)
                    .is_some_and(Entry::is_placeholder);
                let Some(placeholder) = children
                    .get_mut(placeholder_index)
                    .and_then(Entry::as_placeholder_mut)
                else {
                    pwarn!(
                        index = placeholder_index,
                        "RangeIndex::merge: expected a placeholder before the window"
                    );
                    debug_assert!(
                        at_placeholder,
                        "RangeIndex::merge: expected a placeholder before the window (index={placeholder_index})"
                    );
                    return children.len();
                };
                if placeholder.from < start {
                    let gap_end = placeholder.to;
                    placeholder.to = start;
                    on_change(ChildChange::Updated(placeholder_index));
                    children.insert(insertion, Entry::Placeholder(Placeholder::new(start, gap_end)));
                    on_change(ChildChange::Inserted(insertion));
                } else {
                    insertion = placeholder_index;
                }
                self.ranges.insert(range_index, Range::new(start, start));
            }
        }

        let mut items = items.into_iter();
        let mut position = start;
        while self.ranges[range_index].to < end {
            let range_to = self.ranges[range_index].to;
            if position < range_to {
                let known = range_to - position;
                items.by_ref().take(known).for_each(drop);
                insertion += known;
                position = range_to;
            }
            let at_placeholder = children.get(insertion).is_some_and(Entry::is_placeholder);
            if !at_placeholder {
                pwarn!(
                    index = insertion,
                    position,
                    "RangeIndex::merge: expected a placeholder after a range"
                );
                debug_assert!(
                    at_placeholder,
                    "RangeIndex::merge: expected a placeholder after a range (index={insertion}, position={position})"
                );
                return insertion;
            }

            let next_from = self
                .ranges
                .get(range_index + 1)
                .map_or(total, |next| next.from);
            let new_end = next_from.min(end);
            for item in items.by_ref().take(new_end - position) {
                children.insert(insertion, Entry::Child(make_child(item)));
                on_change(ChildChange::Inserted(insertion));
                insertion += 1;
            }
            position = new_end;

            if new_end == next_from {
                children.remove(insertion);
                on_change(ChildChange::Removed(insertion));
                if range_index + 1 < self.ranges.len() {
                    let next = self.ranges.remove(range_index + 1);
                    self.ranges[range_index].to = next.to;
                } else {
                    self.ranges[range_index].to = total;
                }
            } else {
                self.ranges[range_index].to = new_end;
                if let Some(placeholder) = children[insertion].as_placeholder_mut() {
                    placeholder.from = new_end;
                    placeholder.failed = false;
                }
                on_change(ChildChange::Updated(insertion));
            }
        }
        insertion += end - position;

        ptrace!(
            start,
            end,
            total,
            ranges = self.ranges.len(),
            "RangeIndex::merge"
        );
        insertion
    }
}
