use log::{debug, trace};
use thiserror::Error;

use crate::tagging::{TaggingRules, TaggingRulesDict};
use crate::tree::{ConfTree, NodeId};
use crate::vendor::{ExitScope, Vendor};

/// Errors that can occur while reading configuration text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input bytes were not valid UTF-8.
    #[error("unsupported configuration input: {0}")]
    UnsupportedInput(#[from] std::str::Utf8Error),
}

/// Builds [`ConfTree`]s from vendor configuration text.
#[derive(Debug, Clone)]
pub struct Parser {
    vendor: Vendor,
    tagging: TaggingRules,
}

impl Parser {
    /// Parser for `vendor` without tagging rules.
    pub fn new(vendor: Vendor) -> Self {
        Self {
            vendor,
            tagging: TaggingRules::default(),
        }
    }

    /// Tag nodes with `rules` as they are inserted.
    pub fn with_tagging_rules(mut self, rules: TaggingRules) -> Self {
        self.tagging = rules;
        self
    }

    /// Use the rules `dict` holds for this parser's vendor, if any.
    pub fn with_rules_dict(self, dict: &TaggingRulesDict) -> Self {
        match dict.get(self.vendor) {
            Some(rules) => self.with_tagging_rules(rules.clone()),
            None => self,
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn tagging_rules(&self) -> &TaggingRules {
        &self.tagging
    }

    /// Parse configuration text into a tree.
    ///
    /// Nesting follows indentation. Blank lines, comments and device
    /// banners are skipped, explicit section terminators close sections,
    /// and repeated lines under the same parent are merged.
    pub fn parse(&self, config: &str) -> ConfTree {
        let dialect = self.vendor.dialect();
        let mut tree = ConfTree::new(self.vendor);
        let mut stack: Vec<(usize, NodeId)> = Vec::new();
        let mut skipped = 0usize;

        for raw in config.lines() {
            let line = raw.trim_end();
            let text = line.trim_start();
            if text.is_empty() {
                continue;
            }
            let indent = line.len() - text.len();
            if dialect.is_comment(text) || (indent == 0 && dialect.is_noise(text)) {
                trace!("skipping {text:?}");
                skipped += 1;
                continue;
            }

            while stack.last().is_some_and(|(level, _)| *level >= indent) {
                stack.pop();
            }
            if let Some(scope) = dialect.exit_scope(text) {
                if scope == ExitScope::Enclosing {
                    stack.pop();
                }
                continue;
            }

            let parent = stack.last().map_or(tree.root(), |(_, id)| *id);
            let (id, created) = tree.insert_child(parent, text);
            if created {
                self.tag(&mut tree, id, parent);
            }
            stack.push((indent, id));
        }

        debug!(
            "parsed {} config: {} top-level sections, {} lines skipped",
            self.vendor,
            tree.child_count(tree.root()),
            skipped
        );
        tree
    }

    /// Parse raw bytes, rejecting input that is not UTF-8.
    pub fn parse_bytes(&self, config: &[u8]) -> Result<ConfTree, ParseError> {
        let text = std::str::from_utf8(config)?;
        Ok(self.parse(text))
    }

    fn tag(&self, tree: &mut ConfTree, id: NodeId, parent: NodeId) {
        if self.tagging.is_empty() {
            return;
        }
        let tags = match self.tagging.tags_for(&tree.path_string(id)) {
            Some(tags) => tags,
            None => tree.tags(parent).to_vec(),
        };
        tree.set_tags(id, tags);
    }
}

/// Parse `config` for `vendor` without tagging.
pub fn parse(vendor: Vendor, config: &str) -> ConfTree {
    Parser::new(vendor).parse(config)
}

#[cfg(test)]
mod tests {
    use super::{parse, ParseError, Parser};
    use crate::tagging::{TaggingRule, TaggingRules};
    use crate::vendor::Vendor;
    use pretty_assertions::assert_eq;

    #[test]
    fn nests_by_indentation_and_merges_duplicates() {
        let tree = parse(
            Vendor::Huawei,
            "#\nsysname core-1\n#\ninterface 10GE1/0/1\n description uplink\n#\ninterface 10GE1/0/1\n mtu 9000\n#\nreturn\n",
        );
        assert_eq!(
            tree.config(),
            "sysname core-1\n#\ninterface 10GE1/0/1\n description uplink\n mtu 9000\n#"
        );
    }

    #[test]
    fn under_indented_lines_close_sections() {
        let tree = parse(
            Vendor::Arista,
            "router bgp 65000\n      neighbor 10.0.0.1 remote-as 65001\n   router-id 1.1.1.1\nhostname leaf\n",
        );
        assert_eq!(
            tree.config(),
            "router bgp 65000\n   neighbor 10.0.0.1 remote-as 65001\n   router-id 1.1.1.1\n!\nhostname leaf\n!"
        );
    }

    #[test]
    fn exit_markers_close_sections() {
        let tree = parse(
            Vendor::Cisco,
            "Building configuration...\n\
             router bgp 65000\n\
             \x20address-family ipv4 vrf A\n\
             \x20 redistribute connected\n\
             \x20exit-address-family\n\
             \x20neighbor 10.0.0.1 remote-as 65001\n\
             !\n\
             end\n",
        );
        assert_eq!(
            tree.patch(),
            "router bgp 65000\naddress-family ipv4 vrf A\nredistribute connected\nexit\n\
             neighbor 10.0.0.1 remote-as 65001\nexit"
        );
    }

    #[test]
    fn tags_are_inherited_when_no_rule_matches() {
        let rules = TaggingRules::new(vec![TaggingRule::new(r"^interface (\S+)$", ["interface"])])
            .expect("rules");
        let parser = Parser::new(Vendor::Huawei).with_tagging_rules(rules);
        let tree =
            parser.parse("interface gi0/0/0\n ip address 1.1.1.1 255.255.255.0\nsysname x\n");

        let root = tree.node(tree.root());
        let intf = root.child("interface gi0/0/0").expect("interface");
        let addr = intf.child("ip address 1.1.1.1 255.255.255.0").expect("address");
        assert_eq!(intf.tags(), ["interface", "gi0/0/0"]);
        assert_eq!(addr.tags(), intf.tags());
        assert!(root.child("sysname x").expect("sysname").tags().is_empty());
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = Parser::new(Vendor::Cisco)
            .parse_bytes(&[0x68, 0xff, 0x0a])
            .expect_err("invalid utf-8");
        assert!(matches!(err, ParseError::UnsupportedInput(_)));
    }
}
