// Example: merging out-of-order windows into a gap-aware child list.
use pagetree::{ChildChange, Entry, ItemsRange, RangeIndex};

fn show(children: &[Entry<usize>]) {
    let line: Vec<String> = children
        .iter()
        .map(|entry| match entry {
            Entry::Child(position) => position.to_string(),
            Entry::Placeholder(p) => format!("[{}..{})", p.from, p.to),
        })
        .collect();
    println!("{}", line.join(" "));
}

fn main() {
    let total = 40;
    let mut index = RangeIndex::new();
    let mut children = Vec::new();

    for (start, end) in [(10, 14), (0, 3), (12, 20), (3, 10)] {
        let window = ItemsRange::new(start, end, total, (start..end).collect());
        let next = index.merge(&mut children, window, |item| item, &mut |change: ChildChange| {
            println!("  {change:?}");
        });
        println!("merged [{start}, {end}) -> next index {next}, ranges {:?}", index.ranges());
        show(&children);
    }
}
