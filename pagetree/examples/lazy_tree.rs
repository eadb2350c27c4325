// Example: a lazily paged tree over an in-memory "backend", with a resort that keeps an
// expanded subtree.
use std::rc::Rc;

use futures::executor::block_on;
use pagetree::{
    BoxProvider, ComparatorConfig, GridContext, GridNode, GridOptions, GridView, MemoryProvider,
    NodeId, NodeVariant, ProviderError, SortableItem,
};

#[derive(Clone, Debug)]
struct Number(u64);

impl SortableItem for Number {
    type Id = u64;

    fn item_id(&self) -> u64 {
        self.0
    }

    fn compare_field(&self, other: &Self, field: &str) -> std::cmp::Ordering {
        match field {
            "value" => self.0.cmp(&other.0),
            "digits" => self.0.count_ones().cmp(&other.0.count_ones()),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

/// Settings shared by the whole tree.
struct Env {
    fan_out: u64,
    comparator: ComparatorConfig,
}

/// Node `n` has children `n * fan_out + 1 ..= n * fan_out + fan_out`.
#[derive(Debug)]
struct NumberNode(u64);

impl NodeVariant for NumberNode {
    type Item = Number;
    type Id = u64;
    type Hash = u64;
    type Env = Env;

    fn create_provider(&self, env: &Env) -> Result<BoxProvider<Number, u64>, ProviderError> {
        let first = self.0 * env.fan_out + 1;
        let items = (first..first + env.fan_out).map(Number).collect();
        Ok(Box::new(MemoryProvider::new(items)))
    }

    fn create_child(&self, _env: &Env, item: Number) -> Self {
        Self(item.0)
    }

    fn child_hash_for_item(&self, _env: &Env, item: &Number) -> u64 {
        item.0
    }

    fn child_hash_for_node(&self, _env: &Env, child: &Self) -> u64 {
        child.0
    }

    fn comparator(&self, env: &Env) -> ComparatorConfig {
        env.comparator.clone()
    }
}

struct PrintView;

impl GridView for PrintView {
    fn populate_complete(&self, node: NodeId) {
        println!("  populated node #{}", node.0);
    }

    fn sorting_complete(&self) {
        println!("  sorting complete");
    }
}

fn describe(node: &GridNode<NumberNode>) -> String {
    let shown: Vec<String> = node
        .child_nodes()
        .take(8)
        .map(|child| child.variant().0.to_string())
        .collect();
    format!(
        "{} children materialized ({} placeholders): {} ...",
        node.ranges().covered_len(),
        node.placeholders().count(),
        shown.join(", ")
    )
}

fn main() -> Result<(), ProviderError> {
    let env = Env {
        fan_out: 1_000,
        comparator: ComparatorConfig::new("value", true, "value", true),
    };
    let mut ctx = GridContext::new(env, GridOptions::new(20)).with_view(Rc::new(PrintView));
    let mut root = GridNode::new(&ctx, NumberNode(0));

    block_on(root.expand(&ctx))?;
    println!("after expand: {}", describe(&root));

    block_on(root.show_more(&ctx, root.children().len() - 1, Some(30)))?;
    println!("after show_more: {}", describe(&root));

    if let Some(child) = block_on(root.reveal(&ctx, &511))? {
        block_on(child.expand(&ctx))?;
        println!("revealed 511: {}", describe(child));
    }

    ctx.env_mut().comparator = ComparatorConfig::new("digits", false, "value", true);
    block_on(root.sort(&ctx))?;
    println!("after resort: {}", describe(&root));
    if let Some(kept) = root.child_nodes().find(|child| child.variant().0 == 511) {
        println!("511 is still expanded: {}", kept.is_expanded());
    }

    root.dispose();
    Ok(())
}
