use std::collections::HashSet;

use log::debug;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::diff::ordered::moved_lines;
use crate::postproc::{default_rules, PostProcRule};
use crate::tree::{ConfTree, NodeId};
use crate::vendor::{Dialect, Vendor};

/// Tag carried by every negated line in a diff.
pub const CLEAR_TAG: &str = "clear";

/// Configures diff behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffOptions {
    /// Rules applied to the raw diff, in order. `None` selects the vendor defaults.
    pub post_proc_rules: Option<Vec<PostProcRule>>,
    /// Patterns over section path strings whose children are order-sensitive.
    /// The root's path string is empty, so `.*` also orders top-level lines.
    pub ordered_sections: Vec<String>,
    /// Patterns over section path strings that are replaced whole when they differ.
    pub no_diff_sections: Vec<String>,
    /// Move top-level negations after every other top-level entry.
    pub reorder_root: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            post_proc_rules: None,
            ordered_sections: Vec::new(),
            no_diff_sections: Vec::new(),
            reorder_root: true,
        }
    }
}

/// Errors returned by [`diff_with_options`].
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("a and b should be instances of the same vendor (a: {a}, b: {b})")]
    VendorMismatch { a: Vendor, b: Vendor },
    #[error("invalid section pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Diff the current config `a` against the target `b` with default options.
pub fn diff(a: &ConfTree, b: &ConfTree) -> Result<ConfTree, DiffError> {
    diff_with_options(a, b, &DiffOptions::default())
}

/// Diff the current config `a` against the target `b`.
///
/// The result holds the commands that turn `a` into `b`: context lines
/// shared by both, target lines copied verbatim and negations of lines
/// only present in `a`.
pub fn diff_with_options(
    a: &ConfTree,
    b: &ConfTree,
    opts: &DiffOptions,
) -> Result<ConfTree, DiffError> {
    if a.vendor() != b.vendor() {
        return Err(DiffError::VendorMismatch {
            a: a.vendor(),
            b: b.vendor(),
        });
    }

    let mut differ = Differ {
        a,
        b,
        dialect: a.vendor().dialect(),
        ordered: compile_patterns(&opts.ordered_sections)?,
        no_diff: compile_patterns(&opts.no_diff_sections)?,
        out: ConfTree::new(a.vendor()),
        root_negations: Vec::new(),
    };

    let root = a.root();
    differ.removals(root, b.root(), root);
    differ.additions(root, b.root(), root);

    let Differ {
        mut out,
        root_negations,
        ..
    } = differ;
    if opts.reorder_root {
        for line in &root_negations {
            out.move_child_to_end(out.root(), line);
        }
    }

    let rules = match &opts.post_proc_rules {
        Some(rules) => rules.clone(),
        None => default_rules(a.vendor()),
    };
    for rule in &rules {
        rule.apply(&mut out);
    }

    debug!(
        "{} diff: {} top-level entries, {} top-level negations, {} post-processing rules",
        a.vendor(),
        out.child_count(out.root()),
        root_negations.len(),
        rules.len()
    );
    Ok(out)
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, DiffError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| DiffError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

struct Differ<'a> {
    a: &'a ConfTree,
    b: &'a ConfTree,
    dialect: &'static Dialect,
    ordered: Vec<Regex>,
    no_diff: Vec<Regex>,
    out: ConfTree,
    root_negations: Vec<String>,
}

impl Differ<'_> {
    fn is_ordered(&self, path: &str) -> bool {
        self.ordered.iter().any(|re| re.is_match(path))
    }

    fn is_no_diff(&self, path: &str) -> bool {
        self.no_diff.iter().any(|re| re.is_match(path))
    }

    fn moved(&self, a_id: NodeId, b_id: NodeId) -> HashSet<String> {
        if self.is_ordered(&self.a.path_string(a_id)) {
            moved_lines(self.a, a_id, self.b, b_id)
        } else {
            HashSet::new()
        }
    }

    /// Walk `a_id` in current order, negating lines the target drops or moves.
    fn removals(&mut self, a_id: NodeId, b_id: NodeId, out_id: NodeId) {
        let moved = self.moved(a_id, b_id);
        let (a, b) = (self.a, self.b);

        for a_child in a.children(a_id) {
            let line = a.line(a_child);
            match b.child(b_id, line) {
                Some(_) if moved.contains(line) => self.negate(a_child, out_id),
                None => self.negate(a_child, out_id),
                Some(_) if self.is_no_diff(&a.path_string(a_child)) => {}
                Some(b_child) => {
                    let (context, created) = self.out.insert_child(out_id, line);
                    if created {
                        self.out.set_tags(context, a.tags(a_child).iter().cloned());
                    }
                    self.removals(a_child, b_child, context);
                    if created && !self.out.has_children(context) {
                        self.out.remove_child(out_id, line);
                    }
                }
            }
        }
    }

    /// Walk `b_id` in target order, copying lines the current config lacks.
    fn additions(&mut self, a_id: NodeId, b_id: NodeId, out_id: NodeId) {
        let moved = self.moved(a_id, b_id);
        let (a, b) = (self.a, self.b);

        for b_child in b.children(b_id) {
            let line = b.line(b_child);
            match a.child(a_id, line) {
                Some(_) if moved.contains(line) => {
                    self.out.copy_subtree(out_id, b, b_child);
                }
                None => {
                    self.out.copy_subtree(out_id, b, b_child);
                }
                Some(a_child) if self.is_no_diff(&b.path_string(b_child)) => {
                    if !a.same_config(a_child, b, b_child) {
                        self.out.copy_subtree(out_id, b, b_child);
                    }
                }
                Some(a_child) => {
                    let (context, created) = self.out.insert_child(out_id, line);
                    if created {
                        self.out.set_tags(context, b.tags(b_child).iter().cloned());
                    }
                    self.additions(a_child, b_child, context);
                    if created && !self.out.has_children(context) {
                        self.out.remove_child(out_id, line);
                    }
                }
            }
        }
    }

    fn negate(&mut self, a_child: NodeId, out_id: NodeId) {
        let line = self.dialect.negate(self.a.line(a_child));
        let id = self.out.add_child(out_id, &line);
        for tag in self.a.tags(a_child) {
            self.out.add_tag(id, tag);
        }
        self.out.add_tag(id, CLEAR_TAG);
        if out_id == self.out.root() {
            self.root_negations.push(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{diff, diff_with_options, DiffError, DiffOptions, CLEAR_TAG};
    use crate::parser::parse;
    use crate::vendor::Vendor;
    use pretty_assertions::assert_eq;

    fn raw() -> DiffOptions {
        DiffOptions {
            post_proc_rules: Some(Vec::new()),
            ..DiffOptions::default()
        }
    }

    #[test]
    fn identical_trees_have_empty_diff() {
        let tree = parse(Vendor::Cisco, "interface Gi1\n shutdown\nhostname r1\n");
        let result = diff(&tree, &tree).expect("diff");
        assert!(result.is_empty());
        assert_eq!(result.config(), "");
    }

    #[test]
    fn removals_precede_additions_inside_a_section() {
        let a = parse(Vendor::Cisco, "interface Gi1\n description old\n mtu 1500\n");
        let b = parse(Vendor::Cisco, "interface Gi1\n description new\n mtu 1500\n");
        let result = diff_with_options(&a, &b, &raw()).expect("diff");
        assert_eq!(
            result.config(),
            "interface Gi1\n no description old\n description new\n!"
        );
    }

    #[test]
    fn negations_are_tagged_clear() {
        let a = parse(Vendor::Cisco, "ip routing\n");
        let b = parse(Vendor::Cisco, "");
        let result = diff(&a, &b).expect("diff");
        let root = result.node(result.root());
        let negation = root.child("no ip routing").expect("negation");
        assert_eq!(negation.tags(), [CLEAR_TAG]);
    }

    #[test]
    fn negating_a_negative_line_restores_the_positive() {
        let a = parse(Vendor::Arista, "no ip routing\n");
        let b = parse(Vendor::Arista, "");
        assert_eq!(diff(&a, &b).expect("diff").config(), "ip routing\n!");
    }

    #[test]
    fn rejects_invalid_section_patterns() {
        let tree = parse(Vendor::Huawei, "sysname x\n");
        let opts = DiffOptions {
            ordered_sections: vec!["(".to_string()],
            ..DiffOptions::default()
        };
        let err = diff_with_options(&tree, &tree, &opts).expect_err("bad pattern");
        assert!(matches!(err, DiffError::InvalidPattern { .. }));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: DiffOptions = toml::from_str(
            r#"
ordered_sections = ['^aaa group server tacacs\+']
post_proc_rules = ["huawei-interface"]
"#,
        )
        .expect("options");
        assert!(opts.reorder_root);
        assert!(opts.no_diff_sections.is_empty());
        let names: Vec<_> = opts
            .post_proc_rules
            .unwrap_or_default()
            .iter()
            .map(|rule| rule.name())
            .collect();
        assert_eq!(names, vec!["huawei-interface"]);
    }
}
