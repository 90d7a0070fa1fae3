use serde::Deserialize;
use thiserror::Error;

use crate::diff::{diff_with_options, DiffError, DiffOptions};
use crate::format::{self, NodeDict, SerializeError};
use crate::parser::Parser;
use crate::search::{self, SearchError, SearchQuery};
use crate::tagging::{TaggingError, TaggingRule, TaggingRules};
use crate::tree::ConfTree;
use crate::vendor::Vendor;

/// Errors returned when loading an environment file.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("failed to parse environment TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Tagging(#[from] TaggingError),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvFile {
    vendor: Vendor,
    #[serde(default)]
    diff: DiffOptions,
    #[serde(default)]
    tagging: Vec<TaggingRule>,
}

/// One vendor's parser, tagging rules and diff options bundled together.
#[derive(Debug, Clone)]
pub struct ConfTreeEnv {
    parser: Parser,
    diff_options: DiffOptions,
}

impl ConfTreeEnv {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            parser: Parser::new(vendor),
            diff_options: DiffOptions::default(),
        }
    }

    pub fn with_tagging_rules(mut self, rules: TaggingRules) -> Self {
        self.parser = self.parser.with_tagging_rules(rules);
        self
    }

    pub fn with_diff_options(mut self, options: DiffOptions) -> Self {
        self.diff_options = options;
        self
    }

    /// Load from TOML with a `vendor` key, an optional `[diff]` table and
    /// optional `[[tagging]]` rules.
    pub fn from_toml_str(raw: &str) -> Result<Self, EnvError> {
        let file: EnvFile = toml::from_str(raw)?;
        let rules = TaggingRules::new(file.tagging)?;
        Ok(Self::new(file.vendor)
            .with_tagging_rules(rules)
            .with_diff_options(file.diff))
    }

    pub fn vendor(&self) -> Vendor {
        self.parser.vendor()
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn diff_options(&self) -> &DiffOptions {
        &self.diff_options
    }

    pub fn parse(&self, config: &str) -> ConfTree {
        self.parser.parse(config)
    }

    /// Diff `current` against `target` with this environment's options.
    pub fn diff(&self, current: &ConfTree, target: &ConfTree) -> Result<ConfTree, DiffError> {
        diff_with_options(current, target, &self.diff_options)
    }

    pub fn search(&self, tree: &ConfTree, query: &SearchQuery) -> Result<ConfTree, SearchError> {
        search::search(tree, query)
    }

    pub fn to_dict(&self, tree: &ConfTree) -> NodeDict {
        format::to_dict(tree)
    }

    /// Rebuild a tree of this environment's vendor.
    pub fn from_dict(&self, dict: &NodeDict) -> Result<ConfTree, SerializeError> {
        format::from_dict(self.vendor(), dict)
    }
}
