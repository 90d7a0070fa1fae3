use std::collections::HashSet;

use crate::tree::{ConfTree, NodeId};

/// Lines of an order-sensitive section that must be removed and re-added.
///
/// Devices append new entries at the end of such a section. Walking the
/// target order with a cursor into the current positions, the longest
/// target prefix already in the same relative order stays in place. The
/// first out-of-order entry, and every existing entry after it or after a
/// new one, is marked as moved.
pub fn moved_lines(a: &ConfTree, a_id: NodeId, b: &ConfTree, b_id: NodeId) -> HashSet<String> {
    let mut moved = HashSet::new();
    let mut cursor = 0;
    let mut broken = false;

    for b_child in b.children(b_id) {
        let line = b.line(b_child);
        let Some(position) = a.child_position(a_id, line) else {
            broken = true;
            continue;
        };
        if broken || position < cursor {
            moved.insert(line.to_string());
            broken = true;
        } else {
            cursor = position + 1;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::moved_lines;
    use crate::parser::parse;
    use crate::vendor::Vendor;

    fn moved(current: &str, target: &str) -> Vec<String> {
        let a = parse(Vendor::Huawei, current);
        let b = parse(Vendor::Huawei, target);
        let moved = moved_lines(&a, a.root(), &b, b.root());
        let mut lines: Vec<String> = moved.into_iter().collect();
        lines.sort();
        lines
    }

    #[test]
    fn keeps_longest_ordered_prefix() {
        assert_eq!(moved("a\nb\nc\nd\n", "b\nd\nc\n"), vec!["c"]);
        assert_eq!(moved("a\nb\nc\n", "a\nb\nc\n"), Vec::<String>::new());
    }

    #[test]
    fn existing_lines_after_a_new_one_move() {
        assert_eq!(moved("a\nb\nc\n", "a\nx\nb\nc\n"), vec!["b", "c"]);
        assert_eq!(moved("a\nb\n", "a\nb\nx\n"), Vec::<String>::new());
    }
}
