use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::{ConfTree, NodeId};
use crate::vendor::Vendor;

/// Nested mapping form of a node: `{"line", "tags", "children"}`.
///
/// All three keys are required when deserializing. Children are keyed by
/// their line and keep their order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDict {
    pub line: String,
    pub tags: Vec<String>,
    pub children: IndexMap<String, NodeDict>,
}

/// Errors returned when rebuilding a tree from its mapping form.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// A child's mapping key differs from its `line` value.
    #[error("child key {key:?} under {path:?} does not match its line {line:?}")]
    KeyMismatch {
        path: String,
        key: String,
        line: String,
    },
    /// Input JSON was malformed or missed a required key.
    #[error("failed to decode config tree JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convert `tree` into its nested mapping form.
pub fn to_dict(tree: &ConfTree) -> NodeDict {
    node_to_dict(tree, tree.root())
}

fn node_to_dict(tree: &ConfTree, id: NodeId) -> NodeDict {
    NodeDict {
        line: tree.line(id).to_string(),
        tags: tree.tags(id).to_vec(),
        children: tree
            .children(id)
            .map(|child| (tree.line(child).to_string(), node_to_dict(tree, child)))
            .collect(),
    }
}

/// Rebuild a tree for `vendor` from its mapping form.
///
/// The root entry's own line and tags are ignored; the root of a tree is
/// always empty.
pub fn from_dict(vendor: Vendor, dict: &NodeDict) -> Result<ConfTree, SerializeError> {
    let mut tree = ConfTree::new(vendor);
    let root = tree.root();
    insert_children(&mut tree, root, dict)?;
    Ok(tree)
}

fn insert_children(
    tree: &mut ConfTree,
    parent: NodeId,
    dict: &NodeDict,
) -> Result<(), SerializeError> {
    for (key, child) in &dict.children {
        if key != &child.line {
            return Err(SerializeError::KeyMismatch {
                path: tree.path_string(parent),
                key: key.clone(),
                line: child.line.clone(),
            });
        }
        let id = tree.add_child(parent, &child.line);
        tree.set_tags(id, child.tags.iter().cloned());
        insert_children(tree, id, child)?;
    }
    Ok(())
}

/// Serialize `tree` to a JSON string of its mapping form.
pub fn to_json(tree: &ConfTree) -> String {
    serde_json::to_string_pretty(&to_dict(tree)).unwrap_or_else(|_| "{}".to_string())
}

/// Parse the JSON mapping form back into a tree for `vendor`.
pub fn from_json(vendor: Vendor, json: &str) -> Result<ConfTree, SerializeError> {
    let dict: NodeDict = serde_json::from_str(json)?;
    from_dict(vendor, &dict)
}
