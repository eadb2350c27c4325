use core::cmp::Ordering;

use pagetree::ComparatorConfig;

use crate::{HeapNode, SortColumn, SortOrder};

fn config(field1: &'static str, asc1: bool, field2: &'static str, asc2: bool) -> ComparatorConfig {
    ComparatorConfig::new(field1, asc1, field2, asc2)
}

/// How the children of `node` are ordered for the grid's sort column.
///
/// Columns a node kind does not display fall back to that kind's default order.
pub fn node_comparator(node: &HeapNode, order: SortOrder) -> ComparatorConfig {
    let asc = order.ascending;
    match node {
        HeapNode::Object(_) => match order.column {
            SortColumn::Object => config("!edgeName", asc, "retainedSize", false),
            SortColumn::ShallowSize => config("selfSize", asc, "!edgeName", true),
            SortColumn::RetainedSize => config("retainedSize", asc, "!edgeName", true),
            SortColumn::Distance => config("distance", asc, "_name", true),
            _ => config("!edgeName", true, "retainedSize", false),
        },
        HeapNode::Instance(_) => match order.column {
            SortColumn::Object => config("!edgeName", asc, "retainedSize", false),
            SortColumn::Distance => config("distance", asc, "retainedSize", false),
            SortColumn::AddedSize | SortColumn::RemovedSize | SortColumn::ShallowSize => {
                config("selfSize", asc, "!edgeName", true)
            }
            SortColumn::RetainedSize => config("retainedSize", asc, "!edgeName", true),
            _ => config("!edgeName", true, "retainedSize", false),
        },
        HeapNode::Constructor(_) => match order.column {
            SortColumn::Object => config("id", asc, "retainedSize", false),
            SortColumn::Distance => config("distance", asc, "retainedSize", false),
            SortColumn::ShallowSize => config("selfSize", asc, "id", true),
            SortColumn::RetainedSize => config("retainedSize", asc, "id", true),
            _ => config("id", true, "retainedSize", false),
        },
        HeapNode::Diff(_) => match order.column {
            SortColumn::Object => config("id", asc, "selfSize", false),
            _ => config("selfSize", asc, "id", true),
        },
        HeapNode::Dominator(_) => match order.column {
            SortColumn::ShallowSize => config("selfSize", asc, "id", true),
            SortColumn::RetainedSize => config("retainedSize", asc, "id", true),
            _ => config("id", asc, "retainedSize", false),
        },
    }
}

/// Ordering of the class buckets at the top of the summary and diff grids.
pub fn bucket_comparator(order: SortOrder) -> ComparatorConfig {
    let asc = order.ascending;
    match order.column {
        SortColumn::Object => config("_name", asc, "_count", false),
        SortColumn::Distance => config("_distance", asc, "_retainedSize", true),
        SortColumn::Count => config("_count", asc, "_name", true),
        SortColumn::ShallowSize => config("_shallowSize", asc, "_name", true),
        SortColumn::RetainedSize => config("_retainedSize", asc, "_name", true),
        SortColumn::AddedCount => config("_addedCount", asc, "_name", true),
        SortColumn::RemovedCount => config("_removedCount", asc, "_name", true),
        SortColumn::CountDelta => config("_countDelta", asc, "_name", true),
        SortColumn::AddedSize => config("_addedSize", asc, "_name", true),
        SortColumn::RemovedSize => config("_removedSize", asc, "_name", true),
        SortColumn::SizeDelta => config("_sizeDelta", asc, "_name", true),
    }
}

pub(crate) fn compare_bucket_field(a: &HeapNode, b: &HeapNode, field: &str) -> Ordering {
    if field == "_name" {
        return a.name().cmp(b.name());
    }
    match (a, b) {
        (HeapNode::Constructor(a), HeapNode::Constructor(b)) => {
            let (a, b) = (&a.aggregate, &b.aggregate);
            match field {
                "_count" => a.count.cmp(&b.count),
                "_distance" => a.distance.cmp(&b.distance),
                "_shallowSize" => a.self_size.cmp(&b.self_size),
                "_retainedSize" => a.max_ret.cmp(&b.max_ret),
                _ => Ordering::Equal,
            }
        }
        (HeapNode::Diff(a), HeapNode::Diff(b)) => {
            let (a, b) = (&a.diff, &b.diff);
            match field {
                "_addedCount" => a.added_count.cmp(&b.added_count),
                "_removedCount" => a.removed_count.cmp(&b.removed_count),
                "_countDelta" => a.count_delta.cmp(&b.count_delta),
                "_addedSize" => a.added_size.cmp(&b.added_size),
                "_removedSize" => a.removed_size.cmp(&b.removed_size),
                "_sizeDelta" => a.size_delta.cmp(&b.size_delta),
                _ => Ordering::Equal,
            }
        }
        _ => Ordering::Equal,
    }
}
