use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;

use crate::format;
use crate::vendor::Vendor;

/// Separator between section lines in a node's path string.
pub const PATH_SEPARATOR: &str = " / ";

/// Handle to a node inside a [`ConfTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    line: String,
    tags: Vec<String>,
    parent: Option<NodeId>,
    children: IndexMap<String, NodeId>,
}

impl NodeData {
    fn new(line: String, parent: Option<NodeId>) -> Self {
        Self {
            line,
            tags: Vec::new(),
            parent,
            children: IndexMap::new(),
        }
    }
}

/// A parsed device configuration.
///
/// Nodes live in an arena owned by the tree; the root is an empty line
/// with no tags. Children are keyed by their line, unique per parent, and
/// keep insertion order.
#[derive(Debug, Clone)]
pub struct ConfTree {
    vendor: Vendor,
    nodes: Vec<NodeData>,
}

impl ConfTree {
    /// Create an empty tree for `vendor`.
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            nodes: vec![NodeData::new(String::new(), None)],
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Id of the root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrowing cursor over `id`.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn line(&self, id: NodeId) -> &str {
        &self.nodes[id.0].line
    }

    pub fn tags(&self, id: NodeId) -> &[String] {
        &self.nodes[id.0].tags
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of `id` in insertion order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.values().copied()
    }

    /// Snapshot of the children of `id`, for callers that mutate while iterating.
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Child of `id` whose line is exactly `line`.
    pub fn child(&self, id: NodeId, line: &str) -> Option<NodeId> {
        self.nodes[id.0].children.get(line).copied()
    }

    /// Position of the child keyed by `line` among its siblings.
    pub fn child_position(&self, id: NodeId, line: &str) -> Option<usize> {
        self.nodes[id.0].children.get_index_of(line)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id.0].children.len()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    /// Number of ancestors below the root (top-level nodes have depth 1).
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Lines from the first level below the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.line(current));
            current = parent;
        }
        path.reverse();
        path
    }

    /// Path joined with `" / "`; empty for the root.
    pub fn path_string(&self, id: NodeId) -> String {
        self.path(id).join(PATH_SEPARATOR)
    }

    /// Insert a child under `parent`, or return the existing child with the same line.
    ///
    /// Surrounding whitespace is stripped from `line`.
    pub fn add_child(&mut self, parent: NodeId, line: &str) -> NodeId {
        self.insert_child(parent, line).0
    }

    /// Like [`ConfTree::add_child`], also reporting whether a node was created.
    pub fn insert_child(&mut self, parent: NodeId, line: &str) -> (NodeId, bool) {
        let line = line.trim();
        if let Some(existing) = self.child(parent, line) {
            return (existing, false);
        }
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(NodeData::new(line.to_string(), Some(parent)));
        self.nodes[parent.0].children.insert(line.to_string(), id);
        (id, true)
    }

    /// Replace the tags of `id`, dropping duplicates while keeping order.
    pub fn set_tags(&mut self, id: NodeId, tags: impl IntoIterator<Item = String>) {
        let node = &mut self.nodes[id.0];
        node.tags.clear();
        for tag in tags {
            if !node.tags.contains(&tag) {
                node.tags.push(tag);
            }
        }
    }

    /// Append `tag` to `id` unless already present.
    pub fn add_tag(&mut self, id: NodeId, tag: &str) {
        let tags = &mut self.nodes[id.0].tags;
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }

    /// Detach the child of `parent` keyed by `line`.
    ///
    /// The detached node keeps its arena slot, so ids taken before the
    /// removal stay valid.
    pub fn remove_child(&mut self, parent: NodeId, line: &str) -> Option<NodeId> {
        let removed = self.nodes[parent.0].children.shift_remove(line)?;
        self.nodes[removed.0].parent = None;
        Some(removed)
    }

    /// Change the line of a child in place, keeping its position.
    ///
    /// When `new_line` already exists under `parent` the renamed child is
    /// dropped in favour of the existing one. Returns the surviving id.
    pub fn rename_child(&mut self, parent: NodeId, line: &str, new_line: &str) -> Option<NodeId> {
        let new_line = new_line.trim();
        let id = self.child(parent, line)?;
        if line == new_line {
            return Some(id);
        }
        if let Some(existing) = self.child(parent, new_line) {
            self.remove_child(parent, line);
            return Some(existing);
        }
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        self.nodes[parent.0].children = children
            .into_iter()
            .map(|(key, child)| {
                if child == id {
                    (new_line.to_string(), child)
                } else {
                    (key, child)
                }
            })
            .collect();
        self.nodes[id.0].line = new_line.to_string();
        Some(id)
    }

    /// Move the child keyed by `line` after all of its siblings.
    pub fn move_child_to_end(&mut self, parent: NodeId, line: &str) {
        let children = &mut self.nodes[parent.0].children;
        if let Some(index) = children.get_index_of(line) {
            let last = children.len() - 1;
            children.move_index(index, last);
        }
    }

    /// Reorder the children of `parent` to follow `order`.
    ///
    /// Ids that are not children of `parent` are ignored; children missing
    /// from `order` keep their relative order after the listed ones.
    pub fn set_children_order(&mut self, parent: NodeId, order: &[NodeId]) {
        let mut remaining = std::mem::take(&mut self.nodes[parent.0].children);
        let mut reordered = IndexMap::with_capacity(remaining.len());
        for id in order {
            let line = self.nodes[id.0].line.as_str();
            if remaining.get(line) == Some(id) {
                if let Some(child) = remaining.shift_remove(line) {
                    reordered.insert(line.to_string(), child);
                }
            }
        }
        reordered.extend(remaining);
        self.nodes[parent.0].children = reordered;
    }

    /// Copy `src_id` from `src` and its whole subtree under `parent`.
    ///
    /// Lines that already exist under `parent` are merged; tags are added
    /// to the existing ones.
    pub fn copy_subtree(&mut self, parent: NodeId, src: &ConfTree, src_id: NodeId) -> NodeId {
        let id = self.add_child(parent, src.line(src_id));
        for tag in src.tags(src_id) {
            self.add_tag(id, tag);
        }
        for child in src.children(src_id) {
            self.copy_subtree(id, src, child);
        }
        id
    }

    /// Copy only the line and tags of `src_id` under `parent`.
    pub fn copy_node(&mut self, parent: NodeId, src: &ConfTree, src_id: NodeId) -> NodeId {
        let id = self.add_child(parent, src.line(src_id));
        for tag in src.tags(src_id) {
            self.add_tag(id, tag);
        }
        id
    }

    /// Structural equality of two subtrees: lines, tags and children in order.
    pub fn subtree_eq(&self, id: NodeId, other: &ConfTree, other_id: NodeId) -> bool {
        nodes_equal(self, id, other, other_id, true)
    }

    /// Like [`ConfTree::subtree_eq`] but ignoring tags.
    pub fn same_config(&self, id: NodeId, other: &ConfTree, other_id: NodeId) -> bool {
        nodes_equal(self, id, other, other_id, false)
    }

    /// Config text view: indented, with a separator after each top-level block.
    pub fn config(&self) -> String {
        format::render_config(self, false)
    }

    /// [`ConfTree::config`] with secrets masked.
    pub fn masked_config(&self) -> String {
        format::render_config(self, true)
    }

    /// Patch view: unindented commands with explicit section exits.
    pub fn patch(&self) -> String {
        format::render_patch(self, false)
    }

    /// [`ConfTree::patch`] with secrets masked.
    pub fn masked_patch(&self) -> String {
        format::render_patch(self, true)
    }
}

fn nodes_equal(a: &ConfTree, a_id: NodeId, b: &ConfTree, b_id: NodeId, with_tags: bool) -> bool {
    if a.line(a_id) != b.line(b_id) || a.child_count(a_id) != b.child_count(b_id) {
        return false;
    }
    if with_tags && a.tags(a_id) != b.tags(b_id) {
        return false;
    }
    a.children(a_id)
        .zip(b.children(b_id))
        .all(|(left, right)| nodes_equal(a, left, b, right, with_tags))
}

impl PartialEq for ConfTree {
    fn eq(&self, other: &Self) -> bool {
        self.vendor == other.vendor && self.subtree_eq(self.root(), other, other.root())
    }
}

impl Eq for ConfTree {}

impl Display for ConfTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.config())
    }
}

/// Read-only view of one node and its position in the tree.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a ConfTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn line(&self) -> &'a str {
        self.tree.line(self.id)
    }

    pub fn tags(&self) -> &'a [String] {
        self.tree.tags(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        tree.parent(self.id).map(|id| tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id).map(move |id| tree.node(id))
    }

    pub fn child(&self, line: &str) -> Option<NodeRef<'a>> {
        self.tree.child(self.id, line).map(|id| self.tree.node(id))
    }

    pub fn path_string(&self) -> String {
        self.tree.path_string(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::ConfTree;
    use crate::vendor::Vendor;
    use pretty_assertions::assert_eq;

    fn sample() -> ConfTree {
        let mut tree = ConfTree::new(Vendor::Huawei);
        let root = tree.root();
        let lan = tree.add_child(root, "ip vpn-instance LAN");
        let af = tree.add_child(lan, " ipv4-family");
        tree.add_child(af, "  vpn-target 123:123 export-extcommunity evpn");
        tree.add_child(lan, " vxlan vni 123");
        tree
    }

    #[test]
    fn add_child_trims_and_deduplicates() {
        let mut tree = sample();
        let root = tree.root();
        let first = tree.child(root, "ip vpn-instance LAN").expect("lan");
        let again = tree.add_child(root, "  ip vpn-instance LAN  ");
        assert_eq!(first, again);
        assert_eq!(tree.child_count(root), 1);
    }

    #[test]
    fn path_string_joins_ancestors() {
        let tree = sample();
        let root = tree.root();
        let lan = tree.child(root, "ip vpn-instance LAN").expect("lan");
        let af = tree.child(lan, "ipv4-family").expect("af");
        let target = tree
            .child(af, "vpn-target 123:123 export-extcommunity evpn")
            .expect("target");

        assert_eq!(tree.path_string(root), "");
        assert_eq!(
            tree.path_string(target),
            "ip vpn-instance LAN / ipv4-family / vpn-target 123:123 export-extcommunity evpn"
        );
        assert_eq!(tree.depth(target), 3);
        assert_eq!(tree.node(target).parent().map(|p| p.line()), Some("ipv4-family"));
    }

    #[test]
    fn rename_keeps_position() {
        let mut tree = ConfTree::new(Vendor::Huawei);
        let root = tree.root();
        tree.add_child(root, "a");
        tree.add_child(root, "b");
        tree.add_child(root, "c");
        tree.rename_child(root, "b", "x");

        let lines: Vec<_> = tree.node(root).children().map(|n| n.line()).collect();
        assert_eq!(lines, vec!["a", "x", "c"]);
        assert!(tree.child(root, "b").is_none());
    }

    #[test]
    fn reorders_children() {
        let mut tree = ConfTree::new(Vendor::Arista);
        let root = tree.root();
        let a = tree.add_child(root, "a");
        tree.add_child(root, "b");
        let c = tree.add_child(root, "c");

        tree.move_child_to_end(root, "a");
        let lines: Vec<_> = tree.node(root).children().map(|n| n.line()).collect();
        assert_eq!(lines, vec!["b", "c", "a"]);

        tree.set_children_order(root, &[c, a]);
        let lines: Vec<_> = tree.node(root).children().map(|n| n.line()).collect();
        assert_eq!(lines, vec!["c", "a", "b"]);
    }

    #[test]
    fn equality_is_structural() {
        let left = sample();
        let mut right = sample();
        assert_eq!(left, right);

        let root = right.root();
        let lan = right.child(root, "ip vpn-instance LAN").expect("lan");
        right.add_tag(lan, "vpn");
        assert_ne!(left, right);
        assert!(left.same_config(left.root(), &right, root));

        let left_lan = left.child(left.root(), "ip vpn-instance LAN").expect("lan");
        let mut other_vendor = ConfTree::new(Vendor::Arista);
        let other_root = other_vendor.root();
        other_vendor.copy_subtree(other_root, &left, left_lan);
        assert_ne!(left, other_vendor);
    }

    #[test]
    fn remove_child_detaches_subtree() {
        let mut tree = sample();
        let root = tree.root();
        assert!(tree.remove_child(root, "ip vpn-instance LAN").is_some());
        assert!(tree.is_empty());
        assert!(tree.remove_child(root, "missing").is_none());
    }

    #[test]
    fn removed_ids_stay_readable() {
        let mut tree = ConfTree::new(Vendor::Huawei);
        let root = tree.root();
        let intf = tree.add_child(root, "interface GE0/0/1");
        let last = tree.add_child(intf, "undo port hybrid pvid vlan 102");

        assert_eq!(tree.remove_child(intf, "undo port hybrid pvid vlan 102"), Some(last));
        assert_eq!(tree.line(last), "undo port hybrid pvid vlan 102");
        assert_eq!(tree.parent(last), None);
        assert!(!tree.has_children(intf));
    }
}
