// Example: summary, dominators and diff grids over two small in-memory snapshots.
use std::rc::Rc;

use futures::executor::block_on;
use pagetree::{GridNode, ProviderError};
use pagetree_heap::{
    EdgeType, GridKind, HeapEnv, HeapNode, MemorySnapshot, NodeType, SnapshotBackend,
    SnapshotGrid, SortColumn,
};

/// A window holding a linked list of `len` items, each 16 bytes.
fn snapshot(uid: &str, len: u64) -> MemorySnapshot {
    let mut s = MemorySnapshot::new(uid);
    let root = s.add_node(1, NodeType::Synthetic, "(root)", 0);
    let window = s.add_node(2, NodeType::Object, "Window", 64);
    s.add_edge(root, EdgeType::Element, "1", window);
    let mut previous = window;
    for i in 0..len {
        let item = s.add_node(100 + i, NodeType::Object, "Item", 16);
        let name = if previous == window { "head" } else { "next" };
        s.add_edge(previous, EdgeType::Property, name, item);
        s.set_dominator(item, previous);
        previous = item;
    }
    s.finish()
}

fn print(grid: &SnapshotGrid) {
    fn walk(node: &GridNode<HeapNode>, depth: usize) {
        let size = node
            .variant()
            .snapshot_node()
            .map(|n| format!(" retained={}", n.retained_size))
            .unwrap_or_default();
        println!("{:indent$}{}{size}", "", node.variant().name(), indent = depth * 2);
        if node.is_expanded() {
            for child in node.child_nodes() {
                walk(child, depth + 1);
            }
            for p in node.placeholders() {
                println!("{:indent$}... {} more", "", p.len(), indent = depth * 2 + 2);
            }
        }
    }
    println!("== {:?}", grid.kind());
    for node in grid.nodes() {
        walk(node, 0);
    }
}

fn main() -> Result<(), ProviderError> {
    let base: Rc<dyn SnapshotBackend> = Rc::new(snapshot("before", 3));
    let current: Rc<dyn SnapshotBackend> = Rc::new(snapshot("after", 8));

    let mut summary = SnapshotGrid::new(GridKind::Summary, HeapEnv::new(current.clone()));
    block_on(summary.populate())?;
    block_on(summary.highlight_object(105))?;
    print(&summary);

    block_on(summary.sort_by(SortColumn::Object, true))?;
    print(&summary);

    let mut dominators = SnapshotGrid::new(GridKind::Dominators, HeapEnv::new(current.clone()));
    block_on(dominators.populate())?;
    block_on(dominators.highlight_object(103))?;
    print(&dominators);

    let env = HeapEnv::new(current).with_base_snapshot(base);
    let mut diff = SnapshotGrid::new(GridKind::Diff, env);
    block_on(diff.populate())?;
    let (ctx, nodes) = diff.split_mut();
    for node in nodes.iter_mut() {
        block_on(node.expand(ctx))?;
    }
    print(&diff);
    Ok(())
}
