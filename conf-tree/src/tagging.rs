//! Regex-driven node annotation.
//!
//! A rule matches a node's path string (`"section / sub-section / line"`).
//! A matching node receives the rule's tags followed by every capture
//! group; a node no rule matches inherits the tags of its parent.

use std::collections::HashMap;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vendor::{UnknownVendor, Vendor};

/// One tagging rule as written in a rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggingRule {
    pub regex: String,
    pub tags: Vec<String>,
}

impl TaggingRule {
    pub fn new(
        regex: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            regex: regex.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Errors returned while loading tagging rules.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("invalid tagging pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("failed to parse tagging rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse tagging rules JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Vendor(#[from] UnknownVendor),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    tags: Vec<String>,
}

/// An ordered, compiled list of tagging rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<TaggingRule>")]
pub struct TaggingRules {
    source: Vec<TaggingRule>,
    compiled: Vec<CompiledRule>,
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rule: Vec<TaggingRule>,
}

impl TaggingRules {
    /// Compile `rules`, failing on the first invalid pattern.
    pub fn new(rules: Vec<TaggingRule>) -> Result<Self, TaggingError> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let regex =
                    Regex::new(&rule.regex).map_err(|source| TaggingError::InvalidPattern {
                        pattern: rule.regex.clone(),
                        source,
                    })?;
                Ok(CompiledRule {
                    regex,
                    tags: rule.tags.clone(),
                })
            })
            .collect::<Result<Vec<_>, TaggingError>>()?;
        Ok(Self {
            source: rules,
            compiled,
        })
    }

    /// Load rules from TOML `[[rule]]` tables with `regex` and `tags` keys.
    pub fn from_toml_str(raw: &str) -> Result<Self, TaggingError> {
        let file: RulesFile = toml::from_str(raw)?;
        Self::new(file.rule)
    }

    /// Load rules from a JSON array of `{"regex": ..., "tags": [...]}` objects.
    pub fn from_json_str(raw: &str) -> Result<Self, TaggingError> {
        let rules: Vec<TaggingRule> = serde_json::from_str(raw)?;
        Self::new(rules)
    }

    /// The rules as written.
    pub fn rules(&self) -> &[TaggingRule] {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Tags for a node at `path`, or `None` when no rule matches.
    pub fn tags_for(&self, path: &str) -> Option<Vec<String>> {
        let mut tags: Vec<String> = Vec::new();
        let mut matched = false;
        for rule in &self.compiled {
            let Some(caps) = rule.regex.captures(path) else {
                continue;
            };
            matched = true;
            let expanded = rule.tags.iter().map(|tag| expand_groups(tag, &caps));
            let groups = caps
                .iter()
                .skip(1)
                .flatten()
                .map(|group| group.as_str().to_string());
            for tag in expanded.chain(groups) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
        matched.then_some(tags)
    }
}

impl TryFrom<Vec<TaggingRule>> for TaggingRules {
    type Error = TaggingError;

    fn try_from(rules: Vec<TaggingRule>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}

/// Replace `\1`..`\9` in `template` with the matching capture group.
fn expand_groups(template: &str, caps: &Captures<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(index) = chars.peek().and_then(|next| next.to_digit(10)) {
                chars.next();
                if let Some(group) = caps.get(index as usize) {
                    out.push_str(group.as_str());
                }
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Tagging rule lists keyed by vendor.
#[derive(Debug, Clone, Default)]
pub struct TaggingRulesDict {
    rules: HashMap<Vendor, TaggingRules>,
}

impl TaggingRulesDict {
    /// Compile one rule list per vendor.
    pub fn new(rules: HashMap<Vendor, Vec<TaggingRule>>) -> Result<Self, TaggingError> {
        let rules = rules
            .into_iter()
            .map(|(vendor, list)| Ok((vendor, TaggingRules::new(list)?)))
            .collect::<Result<HashMap<_, _>, TaggingError>>()?;
        Ok(Self { rules })
    }

    /// Load from TOML where each vendor is an array of tables (`[[huawei]]`).
    pub fn from_toml_str(raw: &str) -> Result<Self, TaggingError> {
        let by_name: HashMap<String, Vec<TaggingRule>> = toml::from_str(raw)?;
        Self::from_named(by_name)
    }

    /// Load from a JSON object keyed by vendor name.
    pub fn from_json_str(raw: &str) -> Result<Self, TaggingError> {
        let by_name: HashMap<String, Vec<TaggingRule>> = serde_json::from_str(raw)?;
        Self::from_named(by_name)
    }

    fn from_named(by_name: HashMap<String, Vec<TaggingRule>>) -> Result<Self, TaggingError> {
        let rules = by_name
            .into_iter()
            .map(|(name, list)| Ok((name.parse::<Vendor>()?, list)))
            .collect::<Result<HashMap<_, _>, TaggingError>>()?;
        Self::new(rules)
    }

    /// Rules for `vendor`, if any were loaded.
    pub fn get(&self, vendor: Vendor) -> Option<&TaggingRules> {
        self.rules.get(&vendor)
    }
}

#[cfg(test)]
mod tests {
    use super::{TaggingError, TaggingRule, TaggingRules, TaggingRulesDict};
    use crate::vendor::Vendor;
    use pretty_assertions::assert_eq;

    fn rules() -> TaggingRules {
        TaggingRules::new(vec![
            TaggingRule::new(r"^ip vpn-instance (\S+)$", ["vpn"]),
            TaggingRule::new(
                r"^ip vpn-instance (\S+) .* route-distinguisher (\S+)",
                ["rd"],
            ),
            TaggingRule::new(r"^interface (\S+)$", ["interface", r"if-\1"]),
        ])
        .expect("valid rules")
    }

    #[test]
    fn capture_groups_follow_rule_tags() {
        let rules = rules();
        assert_eq!(
            rules.tags_for("ip vpn-instance LAN"),
            Some(vec!["vpn".to_string(), "LAN".to_string()])
        );
        assert_eq!(
            rules.tags_for("ip vpn-instance LAN / ipv4-family / route-distinguisher 1.1.1.1:1"),
            Some(vec![
                "rd".to_string(),
                "LAN".to_string(),
                "1.1.1.1:1".to_string()
            ])
        );
        assert_eq!(rules.tags_for("ip vpn-instance LAN / ipv4-family"), None);
    }

    #[test]
    fn backreferences_expand_in_tags() {
        assert_eq!(
            rules().tags_for("interface gi0/0/1"),
            Some(vec![
                "interface".to_string(),
                "if-gi0/0/1".to_string(),
                "gi0/0/1".to_string()
            ])
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = TaggingRules::new(vec![TaggingRule::new("^interface (", ["x"])])
            .expect_err("unbalanced group");
        assert!(matches!(err, TaggingError::InvalidPattern { .. }));
    }

    #[test]
    fn loads_rules_from_toml_and_json() {
        let toml_rules = TaggingRules::from_toml_str(
            r#"
[[rule]]
regex = '^router bgp \d+$'
tags = ["bgp"]
"#,
        )
        .expect("toml rules");
        assert_eq!(toml_rules.len(), 1);
        assert_eq!(toml_rules.tags_for("router bgp 65000"), Some(vec!["bgp".to_string()]));

        let json_rules =
            TaggingRules::from_json_str(r#"[{"regex": "^hostname", "tags": ["mgmt"]}]"#)
                .expect("json rules");
        assert_eq!(json_rules.rules()[0].tags, vec!["mgmt"]);
    }

    #[test]
    fn dict_selects_rules_by_vendor() {
        let dict = TaggingRulesDict::from_json_str(
            r#"{"Huawei": [{"regex": "^sysname", "tags": ["mgmt"]}]}"#,
        )
        .expect("dict");
        assert!(dict.get(Vendor::Huawei).is_some());
        assert!(dict.get(Vendor::Cisco).is_none());

        let err = TaggingRulesDict::from_toml_str("[[juniper]]\nregex = 'x'\ntags = []\n")
            .expect_err("unknown vendor");
        assert_eq!(err.to_string(), "unknown vendor juniper");
    }
}
