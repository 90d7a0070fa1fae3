use crate::tree::{ConfTree, NodeId};
use crate::vendor::Dialect;

/// Render `tree` the way the device prints its running configuration.
///
/// Nested lines are indented by the vendor's indent unit and every
/// top-level block is followed by the vendor separator. An empty tree
/// renders as an empty string.
pub fn render_config(tree: &ConfTree, masked: bool) -> String {
    let dialect = tree.vendor().dialect();
    let mut lines = Vec::new();
    for top in tree.children(tree.root()) {
        push_block(tree, top, 0, dialect, masked, &mut lines);
        lines.push(dialect.separator.to_string());
    }
    lines.join("\n")
}

fn push_block(
    tree: &ConfTree,
    id: NodeId,
    level: usize,
    dialect: &Dialect,
    masked: bool,
    lines: &mut Vec<String>,
) {
    let line = tree.line(id);
    let text = if masked {
        dialect.mask(line)
    } else {
        line.to_string()
    };
    lines.push(format!("{}{}", " ".repeat(level * dialect.indent), text));
    for child in tree.children(id) {
        push_block(tree, child, level + 1, dialect, masked, lines);
    }
}
