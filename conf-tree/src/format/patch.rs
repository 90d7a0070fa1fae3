use crate::tree::{ConfTree, NodeId};
use crate::vendor::Dialect;

/// Render `tree` as a sequence of commands that can be pasted into the device.
///
/// Lines are unindented. After a node with children, or one that opens a
/// device view on its own, the vendor exit token is emitted. Nothing inside
/// a flat section (one closed by its own keywords) gets an exit token.
pub fn render_patch(tree: &ConfTree, masked: bool) -> String {
    let dialect = tree.vendor().dialect();
    let mut lines = Vec::new();
    for top in tree.children(tree.root()) {
        push_commands(tree, top, dialect, masked, false, &mut lines);
    }
    lines.join("\n")
}

fn push_commands(
    tree: &ConfTree,
    id: NodeId,
    dialect: &Dialect,
    masked: bool,
    in_flat: bool,
    lines: &mut Vec<String>,
) {
    let line = tree.line(id);
    lines.push(if masked {
        dialect.mask(line)
    } else {
        line.to_string()
    });

    let path = tree.path_string(id);
    let flat = in_flat || dialect.is_flat_section(&path);
    for child in tree.children(id) {
        push_commands(tree, child, dialect, masked, flat, lines);
    }
    if !flat && (tree.has_children(id) || dialect.opens_view(&path)) {
        lines.push(dialect.exit.to_string());
    }
}
