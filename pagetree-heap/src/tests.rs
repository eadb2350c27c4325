use crate::*;

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;
use core::cmp::Ordering;

use futures::executor::block_on;
use pagetree::{
    ComparatorConfig, GridNode, GridOptions, GridView, NodeVariant, Provider, ProviderError,
    SortableItem,
};

const ROOT: u64 = 1;
const WINDOW: u64 = 3;
const DOCUMENT: u64 = 5;
const ITEM_A: u64 = 7;
const ITEM_B: u64 = 9;
const ITEM_C: u64 = 11;
const TITLE: u64 = 13;
const MAP: u64 = 15;
const OLD_ITEM: u64 = 21;

/// root -> Window -> {document, first -> next -> next -> back (cycle), title, map (hidden)}.
///
/// Window dominates its direct children; the item chain dominates itself.
fn sample_snapshot(uid: &str) -> MemorySnapshot {
    let mut snapshot = MemorySnapshot::new(uid);
    let root = snapshot.add_node(ROOT, NodeType::Synthetic, "(root)", 0);
    let window = snapshot.add_node(WINDOW, NodeType::Object, "Window", 50);
    let document = snapshot.add_node(DOCUMENT, NodeType::Object, "Document", 30);
    let a = snapshot.add_node(ITEM_A, NodeType::Object, "Item", 10);
    let b = snapshot.add_node(ITEM_B, NodeType::Object, "Item", 20);
    let c = snapshot.add_node(ITEM_C, NodeType::Object, "Item", 30);
    let title = snapshot.add_node(TITLE, NodeType::String, "hello", 8);
    let map = snapshot.add_node(MAP, NodeType::Hidden, "system / Map", 4);

    snapshot.add_edge(root, EdgeType::Element, "1", window);
    snapshot.add_edge(window, EdgeType::Property, "document", document);
    snapshot.add_edge(window, EdgeType::Property, "first", a);
    snapshot.add_edge(window, EdgeType::Property, "title", title);
    snapshot.add_edge(window, EdgeType::Hidden, "map", map);
    snapshot.add_edge(a, EdgeType::Property, "next", b);
    snapshot.add_edge(b, EdgeType::Property, "next", c);
    snapshot.add_edge(c, EdgeType::Property, "back", a);
    snapshot.add_edge(document, EdgeType::Weak, "weak", c);

    for child in [document, a, title, map] {
        snapshot.set_dominator(child, window);
    }
    snapshot.set_dominator(b, a);
    snapshot.set_dominator(c, b);
    snapshot.finish()
}

/// An older snapshot: Window and the first item survive, another item went away.
fn base_snapshot() -> MemorySnapshot {
    let mut snapshot = MemorySnapshot::new("base");
    let root = snapshot.add_node(ROOT, NodeType::Synthetic, "(root)", 0);
    let window = snapshot.add_node(WINDOW, NodeType::Object, "Window", 50);
    let a = snapshot.add_node(ITEM_A, NodeType::Object, "Item", 10);
    let old = snapshot.add_node(OLD_ITEM, NodeType::Object, "Item", 40);
    snapshot.add_edge(root, EdgeType::Element, "1", window);
    snapshot.add_edge(window, EdgeType::Property, "first", a);
    snapshot.add_edge(window, EdgeType::Property, "old", old);
    snapshot.add_edge(old, EdgeType::Property, "owner", window);
    snapshot.finish()
}

#[derive(Default)]
struct CountingView {
    sorting_complete: Cell<usize>,
    visible_updates: Cell<usize>,
}

impl GridView for CountingView {
    fn update_visible_nodes(&self) {
        self.visible_updates.set(self.visible_updates.get() + 1);
    }

    fn sorting_complete(&self) {
        self.sorting_complete.set(self.sorting_complete.get() + 1);
    }
}

fn populated(kind: GridKind, env: HeapEnv) -> SnapshotGrid {
    let mut grid = SnapshotGrid::new(kind, env);
    block_on(grid.populate()).unwrap();
    grid
}

fn env() -> HeapEnv {
    HeapEnv::new(Rc::new(sample_snapshot("current")))
}

fn object_id(node: &GridNode<HeapNode>) -> Option<u64> {
    node.variant().snapshot_node().map(|node| node.id)
}

fn names<'a>(nodes: impl Iterator<Item = &'a GridNode<HeapNode>>) -> Vec<String> {
    nodes.map(|node| node.variant().name().to_string()).collect()
}

fn edge_names(node: &GridNode<HeapNode>) -> Vec<String> {
    node.child_nodes()
        .map(|child| match child.variant() {
            HeapNode::Object(object) => object.edge_name.clone().unwrap_or_default(),
            other => other.name().to_string(),
        })
        .collect()
}

fn edge_item(name: &str) -> HeapItem {
    HeapItem::Edge(SnapshotEdge {
        name: name.to_string(),
        edge_type: EdgeType::Element,
        node: SnapshotNode::default(),
    })
}

#[test]
fn memory_snapshot_skips_weak_references_for_distances() {
    let snapshot = sample_snapshot("s");
    let distance = |id| {
        let index = snapshot.node_index_by_id(id).unwrap();
        snapshot.node(index).unwrap().distance
    };

    assert_eq!(distance(ROOT), 0);
    assert_eq!(distance(WINDOW), 1);
    assert_eq!(distance(DOCUMENT), 2);
    assert_eq!(distance(ITEM_B), 3);
    // Document holds the last item weakly only.
    assert_eq!(distance(ITEM_C), 4);
}

#[test]
fn memory_snapshot_accumulates_retained_sizes_along_dominators() {
    let snapshot = sample_snapshot("s");
    let retained = |id| {
        let index = snapshot.node_index_by_id(id).unwrap();
        snapshot.node(index).unwrap().retained_size
    };

    assert_eq!(retained(ITEM_C), 30);
    assert_eq!(retained(ITEM_B), 50);
    assert_eq!(retained(ITEM_A), 60);
    assert_eq!(retained(DOCUMENT), 30);
    assert_eq!(retained(WINDOW), 152);
    assert_eq!(retained(ROOT), 152);
}

#[test]
fn memory_snapshot_ignores_unknown_node_indexes() {
    let mut snapshot = MemorySnapshot::new("s");
    let root = snapshot.add_node(ROOT, NodeType::Synthetic, "(root)", 0);
    let window = snapshot.add_node(WINDOW, NodeType::Object, "Window", 50);
    snapshot.add_edge(root, EdgeType::Element, "1", window);
    snapshot.add_edge(root, EdgeType::Element, "2", 99);
    snapshot.add_edge(99, EdgeType::Element, "3", window);
    snapshot.set_dominator(99, root);
    snapshot.set_dominator(window, 99);
    snapshot.set_root(99);

    let snapshot = snapshot.finish();

    assert_eq!(snapshot.node(root).unwrap().distance, 0);
    assert_eq!(snapshot.node(window).unwrap().distance, 1);
    assert_eq!(snapshot.node(root).unwrap().retained_size, 50);
    let retainers = block_on(snapshot.dominator_ids_for_node(WINDOW)).unwrap();
    assert_eq!(retainers, Some(vec![WINDOW]));
}

#[test]
fn dominator_chain_runs_up_to_the_root() {
    let snapshot = sample_snapshot("s");

    let chain = block_on(snapshot.dominator_ids_for_node(ITEM_C)).unwrap();
    assert_eq!(chain, Some(vec![ITEM_C, ITEM_B, ITEM_A, WINDOW]));

    assert_eq!(block_on(snapshot.dominator_ids_for_node(ROOT)).unwrap(), Some(vec![]));
    assert_eq!(block_on(snapshot.dominator_ids_for_node(404)).unwrap(), None);
}

#[test]
fn class_names_follow_node_types() {
    let snapshot = sample_snapshot("s");
    let class = |id| block_on(snapshot.node_class_name(id)).unwrap();

    assert_eq!(class(ITEM_A).as_deref(), Some("Item"));
    assert_eq!(class(TITLE).as_deref(), Some("(string)"));
    assert_eq!(class(MAP).as_deref(), Some("(system)"));
    assert_eq!(class(404), None);

    let code = SnapshotNode {
        node_type: NodeType::Code,
        name: "foo".to_string(),
        ..SnapshotNode::default()
    };
    assert_eq!(code.class_name(), "(compiled code)");
}

#[test]
fn aggregates_group_objects_by_class() {
    let snapshot = sample_snapshot("s");

    let aggregates = block_on(snapshot.aggregates(ALL_OBJECTS)).unwrap();

    assert!(!aggregates.contains_key("(synthetic)"));
    assert_eq!(
        aggregates["Item"],
        Aggregate {
            count: 3,
            distance: 2,
            self_size: 60,
            max_ret: 60,
        }
    );
    assert_eq!(aggregates["Window"].count, 1);

    let ranged = block_on(snapshot.aggregates("7..9")).unwrap();
    assert_eq!(ranged.len(), 1);
    assert_eq!(ranged["Item"].count, 1);
}

#[test]
fn element_edges_sort_numerically_after_named_ones() {
    let mut items = vec![edge_item("10"), edge_item("2"), edge_item("name"), edge_item("1")];

    items.sort_by(|a, b| a.compare_field(b, "!edgeName"));

    let names: Vec<_> = items.iter().filter_map(HeapItem::edge_name).collect();
    assert_eq!(names, ["name", "1", "2", "10"]);
    assert_eq!(
        edge_item("a").compare_field(&edge_item("a"), "unknown"),
        Ordering::Equal
    );
}

#[test]
fn retaining_edges_list_retainers() {
    let snapshot = sample_snapshot("s");
    let c = snapshot.node_index_by_id(ITEM_C).unwrap();

    let strong = snapshot.create_retaining_edges_provider(c, false).unwrap();
    let window = block_on(strong.serialize_items_range(0, 10)).unwrap();

    let retainers: Vec<_> = window
        .items
        .iter()
        .map(|item| (item.edge_name().unwrap_or_default(), item.node().id))
        .collect();
    assert_eq!(retainers, [("weak", DOCUMENT), ("next", ITEM_B)]);
}

#[test]
fn summary_lists_buckets_by_retained_size() {
    let grid = populated(GridKind::Summary, env());

    assert_eq!(
        names(grid.nodes().iter()),
        ["Window", "Item", "Document", "(string)", "(system)"]
    );
    assert!(grid.nodes().iter().all(|node| !node.is_expanded()));
    assert_eq!(grid.context().options().populate_count, 100);
}

#[test]
fn repeated_sort_requests_are_ignored() {
    let view = Rc::new(CountingView::default());
    let mut grid = SnapshotGrid::new(GridKind::Summary, env()).with_view(view.clone());
    block_on(grid.populate()).unwrap();
    assert_eq!(view.sorting_complete.get(), 1);

    block_on(grid.sort_by(SortColumn::RetainedSize, false)).unwrap();
    assert_eq!(view.sorting_complete.get(), 1);

    block_on(grid.sort_by(SortColumn::Object, true)).unwrap();
    assert_eq!(view.sorting_complete.get(), 2);
    assert_eq!(
        names(grid.nodes().iter()),
        ["(string)", "(system)", "Document", "Item", "Window"]
    );
}

#[test]
fn summary_resort_keeps_expanded_instances() {
    let mut grid = populated(GridKind::Summary, env());
    let (ctx, nodes) = grid.split_mut();
    let bucket = nodes
        .iter_mut()
        .find(|node| node.variant().name() == "Item")
        .unwrap();
    block_on(bucket.expand(ctx)).unwrap();
    let ids: Vec<_> = bucket.child_nodes().filter_map(object_id).collect();
    assert_eq!(ids, [ITEM_A, ITEM_B, ITEM_C]);

    let instance = bucket
        .child_nodes_mut()
        .find(|node| object_id(node) == Some(ITEM_B))
        .unwrap();
    block_on(instance.expand(ctx)).unwrap();
    let instance_id = instance.id();
    assert_eq!(edge_names(instance), ["next"]);

    block_on(grid.sort_by(SortColumn::ShallowSize, false)).unwrap();

    let bucket = grid.bucket("Item").unwrap();
    let ids: Vec<_> = bucket.child_nodes().filter_map(object_id).collect();
    assert_eq!(ids, [ITEM_C, ITEM_B, ITEM_A]);
    let instance = bucket.child_for_position(1).unwrap();
    assert_eq!(instance.id(), instance_id);
    assert!(instance.is_expanded());
    assert_eq!(edge_names(instance), ["next"]);
}

#[test]
fn summary_highlight_reveals_the_instance_in_its_bucket() {
    let mut grid = SnapshotGrid::new(GridKind::Summary, env()).with_options(GridOptions::new(1));
    block_on(grid.populate()).unwrap();

    let revealed = block_on(grid.highlight_object(ITEM_C)).unwrap();
    assert_eq!(revealed.map(|node| object_id(node)), Some(Some(ITEM_C)));

    let bucket = grid.bucket("Item").unwrap();
    assert!(bucket.is_expanded());
    assert_eq!(bucket.children().len(), 2);
    assert_eq!(bucket.placeholders().count(), 1);

    assert!(block_on(grid.highlight_object(404)).unwrap().is_none());
}

#[test]
fn dominators_highlight_expands_the_chain() {
    let mut grid = populated(GridKind::Dominators, env());
    assert_eq!(grid.context().options().populate_count, 25);
    let root = grid.root().unwrap();
    assert!(root.is_expanded());
    assert_eq!(root.child_nodes().filter_map(object_id).collect::<Vec<_>>(), [WINDOW]);

    let revealed = block_on(grid.highlight_object(ITEM_C)).unwrap();
    assert_eq!(revealed.map(|node| object_id(node)), Some(Some(ITEM_C)));

    let mut node = grid.root().unwrap();
    for id in [WINDOW, ITEM_A, ITEM_B] {
        node = node.child_nodes().find(|child| object_id(child) == Some(id)).unwrap();
        assert!(node.is_expanded());
    }
}

#[test]
fn containment_hides_hidden_edges_unless_asked() {
    for (show_hidden, expected) in [
        (false, vec!["first", "document", "title"]),
        (true, vec!["first", "document", "title", "map"]),
    ] {
        let mut grid = populated(GridKind::Containment, env().with_show_hidden(show_hidden));
        let (ctx, nodes) = grid.split_mut();
        let window = nodes[0].child_nodes_mut().next().unwrap();
        block_on(window.expand(ctx)).unwrap();

        assert_eq!(edge_names(window), expected);
    }
}

#[test]
fn containment_marks_cycles_without_children() {
    let mut grid = populated(GridKind::Containment, env());
    let (ctx, nodes) = grid.split_mut();
    let mut node = nodes[0].child_nodes_mut().next().unwrap();
    for edge in ["first", "next", "next"] {
        block_on(node.expand(ctx)).unwrap();
        node = node
            .child_nodes_mut()
            .find(|child| match child.variant() {
                HeapNode::Object(object) => object.edge_name.as_deref() == Some(edge),
                _ => false,
            })
            .unwrap();
    }
    block_on(node.expand(ctx)).unwrap();

    let back = node.child_nodes().next().unwrap();
    assert_eq!(object_id(back), Some(ITEM_A));
    assert!(!back.has_children());
    let HeapNode::Object(object) = back.variant() else {
        panic!("expected an object node");
    };
    assert!(object.cycled);
    assert_eq!(object.ancestors, [WINDOW, ITEM_A, ITEM_B, ITEM_C]);
}

#[test]
fn diff_grid_lists_changed_classes() {
    let env = env().with_base_snapshot(Rc::new(base_snapshot()));
    let mut grid = populated(GridKind::Diff, env);
    assert_eq!(grid.context().options().populate_count, 50);

    assert_eq!(
        names(grid.nodes().iter()),
        ["Item", "Document", "(string)", "(system)"]
    );
    let HeapNode::Diff(item) = grid.nodes()[0].variant() else {
        panic!("expected a diff bucket");
    };
    assert_eq!(item.diff.added_count, 2);
    assert_eq!(item.diff.removed_count, 1);
    assert_eq!(item.diff.count_delta, 1);
    assert_eq!(item.diff.size_delta, 10);

    let (ctx, nodes) = grid.split_mut();
    block_on(nodes[0].expand(ctx)).unwrap();
    let instances: Vec<_> = nodes[0]
        .child_nodes()
        .map(|node| match node.variant() {
            HeapNode::Instance(instance) => (instance.node.id, instance.is_deleted),
            _ => panic!("expected an instance"),
        })
        .collect();
    assert_eq!(instances, [(ITEM_C, false), (ITEM_B, false), (OLD_ITEM, true)]);

    let removed = nodes[0].child_for_position_mut(2).unwrap();
    block_on(removed.expand(ctx)).unwrap();
    let owner = removed.child_nodes().next().unwrap();
    let HeapNode::Object(object) = owner.variant() else {
        panic!("expected an object node");
    };
    assert!(object.from_base_snapshot);
    assert_eq!(object.node.id, WINDOW);
}

#[test]
fn diff_against_the_same_snapshot_is_empty() {
    let snapshot: Rc<dyn SnapshotBackend> = Rc::new(sample_snapshot("same"));
    let view = Rc::new(CountingView::default());
    let env = HeapEnv::new(snapshot.clone()).with_base_snapshot(snapshot);
    let mut grid = SnapshotGrid::new(GridKind::Diff, env).with_view(view.clone());

    block_on(grid.populate()).unwrap();

    assert!(grid.nodes().is_empty());
    assert_eq!(view.sorting_complete.get(), 1);
    assert_eq!(view.visible_updates.get(), 0);
}

#[test]
fn selecting_a_base_snapshot_repopulates_the_diff() {
    let mut grid = populated(GridKind::Diff, env());
    assert!(grid.nodes().is_empty());

    block_on(grid.set_base_snapshot(Some(Rc::new(base_snapshot())))).unwrap();

    assert_eq!(grid.nodes().len(), 4);
    assert!(grid.bucket("Window").is_none());
}

#[test]
fn diff_bucket_needs_a_base_snapshot() {
    let node = HeapNode::Diff(DiffNode {
        class_name: "Item".to_string(),
        diff: DiffForClass::default(),
    });

    let result = node.create_provider(&env());

    assert!(matches!(result, Err(ProviderError::Unavailable(_))));
}

#[test]
fn object_child_hashes_include_the_retainer_in_retainer_views() {
    let root = HeapNode::Object(ObjectNode::root(SnapshotNode::default()));
    let item = HeapItem::Edge(SnapshotEdge {
        name: "next".to_string(),
        edge_type: EdgeType::Property,
        node: SnapshotNode {
            id: ITEM_B,
            ..SnapshotNode::default()
        },
    });

    let plain = root.child_hash_for_item(&env(), &item);
    let retaining = root.child_hash_for_item(&env().with_show_retaining_edges(true), &item);

    assert_eq!(
        plain,
        ChildHash::Edge {
            retainer: None,
            edge_type: Some(EdgeType::Property),
            name: Some("next".to_string()),
        }
    );
    assert_ne!(plain, retaining);
    let child = root.create_child(&env(), item);
    assert_eq!(root.child_hash_for_node(&env(), &child), plain);
}

#[test]
fn comparator_tables_fall_back_per_node_kind() {
    let order = SortOrder::new(SortColumn::ShallowSize, true);
    let constructor = HeapNode::Constructor(ConstructorNode {
        class_name: "Item".to_string(),
        aggregates_key: ALL_OBJECTS.to_string(),
        aggregate: Aggregate::default(),
    });
    let diff = HeapNode::Diff(DiffNode {
        class_name: "Item".to_string(),
        diff: DiffForClass::default(),
    });

    assert_eq!(
        node_comparator(&constructor, order),
        ComparatorConfig::new("selfSize", true, "id", true)
    );
    assert_eq!(
        node_comparator(&constructor, SortOrder::new(SortColumn::SizeDelta, false)),
        ComparatorConfig::new("id", true, "retainedSize", false)
    );
    assert_eq!(
        node_comparator(&diff, SortOrder::new(SortColumn::CountDelta, false)),
        ComparatorConfig::new("selfSize", false, "id", true)
    );
    assert_eq!(
        bucket_comparator(SortOrder::new(SortColumn::Distance, true)),
        ComparatorConfig::new("_distance", true, "_retainedSize", true)
    );
    assert!(!constructor.initially_has_children());
}

#[test]
fn disposed_grid_can_be_populated_again() {
    let mut grid = populated(GridKind::Summary, env());
    let (ctx, nodes) = grid.split_mut();
    block_on(nodes[0].expand(ctx)).unwrap();

    grid.dispose();
    assert!(grid.nodes().is_empty());

    block_on(grid.populate()).unwrap();
    assert_eq!(grid.nodes().len(), 5);
}
