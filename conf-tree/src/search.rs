//! Filtering a tree by line pattern and tags.

use log::debug;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::tree::{ConfTree, NodeId};

/// How `include_tags` is combined with a node's tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    /// At least one of the tags.
    #[default]
    Or,
    /// Every tag.
    And,
}

/// Filters for [`search`]. Unset filters accept every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchQuery {
    /// Regex searched for anywhere in a node's line.
    pub string: Option<String>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub include_mode: IncludeMode,
    /// Copy the whole subtree of a match instead of only matching descendants.
    pub include_children: bool,
}

impl SearchQuery {
    /// Query for lines matching `pattern`.
    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            string: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// Query for nodes carrying `tags`, combined with `mode`.
    pub fn tagged(tags: impl IntoIterator<Item = impl Into<String>>, mode: IncludeMode) -> Self {
        Self {
            include_tags: tags.into_iter().map(Into::into).collect(),
            include_mode: mode,
            ..Self::default()
        }
    }

    fn is_unfiltered(&self) -> bool {
        self.string.is_none() && self.include_tags.is_empty() && self.exclude_tags.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Copy of `tree` holding only matching nodes and their ancestors.
///
/// Ancestors of a match keep their own tags. A query with no filters
/// yields an empty tree.
pub fn search(tree: &ConfTree, query: &SearchQuery) -> Result<ConfTree, SearchError> {
    let mut out = ConfTree::new(tree.vendor());
    if query.is_unfiltered() {
        return Ok(out);
    }

    let pattern = query
        .string
        .as_deref()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| SearchError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .transpose()?;
    let filter = Filter { query, pattern };

    let out_root = out.root();
    filter.collect(tree, tree.root(), &mut out, out_root);
    debug!(
        "search kept {} of {} top-level entries",
        out.child_count(out_root),
        tree.child_count(tree.root())
    );
    Ok(out)
}

struct Filter<'q> {
    query: &'q SearchQuery,
    pattern: Option<Regex>,
}

impl Filter<'_> {
    fn collect(&self, tree: &ConfTree, id: NodeId, out: &mut ConfTree, out_id: NodeId) {
        for child in tree.children(id) {
            if self.is_match(tree, child) {
                if self.query.include_children {
                    out.copy_subtree(out_id, tree, child);
                } else {
                    let copy = out.copy_node(out_id, tree, child);
                    self.collect(tree, child, out, copy);
                }
                continue;
            }

            if !tree.has_children(child) {
                continue;
            }
            let (context, created) = out.insert_child(out_id, tree.line(child));
            if created {
                out.set_tags(context, tree.tags(child).iter().cloned());
            }
            self.collect(tree, child, out, context);
            if created && !out.has_children(context) {
                out.remove_child(out_id, tree.line(child));
            }
        }
    }

    fn is_match(&self, tree: &ConfTree, id: NodeId) -> bool {
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(tree.line(id)) {
                return false;
            }
        }

        let tags = tree.tags(id);
        let has = |tag: &String| tags.contains(tag);
        let included = match self.query.include_mode {
            _ if self.query.include_tags.is_empty() => true,
            IncludeMode::Or => self.query.include_tags.iter().any(has),
            IncludeMode::And => self.query.include_tags.iter().all(has),
        };
        included && !self.query.exclude_tags.iter().any(has)
    }
}
