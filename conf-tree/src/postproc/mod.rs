//! Vendor post-processing of raw diffs.
//!
//! A rule rewrites a diff tree in place so the patch matches what the device
//! actually accepts. Rules check the tree vendor themselves and leave trees
//! of other vendors untouched.

pub mod huawei;

use std::fmt;

use thiserror::Error;

use crate::tree::ConfTree;
use crate::vendor::Vendor;

/// A named rewrite applied to a diff tree.
#[derive(Clone, Copy)]
pub struct PostProcRule {
    name: &'static str,
    apply: fn(&mut ConfTree),
}

/// Returned when a rule name is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown post-processing rule {0}")]
pub struct UnknownRule(pub String);

impl PostProcRule {
    pub const fn new(name: &'static str, apply: fn(&mut ConfTree)) -> Self {
        Self { name, apply }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, tree: &mut ConfTree) {
        (self.apply)(tree);
    }

    /// Look up a built-in rule by name.
    pub fn by_name(name: &str) -> Result<Self, UnknownRule> {
        BUILTIN
            .iter()
            .find(|rule| rule.name == name)
            .copied()
            .ok_or_else(|| UnknownRule(name.to_string()))
    }
}

impl fmt::Debug for PostProcRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PostProcRule").field(&self.name).finish()
    }
}

impl PartialEq for PostProcRule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PostProcRule {}

impl TryFrom<String> for PostProcRule {
    type Error = UnknownRule;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::by_name(&name)
    }
}

impl<'de> serde::Deserialize<'de> for PostProcRule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::try_from(name).map_err(serde::de::Error::custom)
    }
}

pub const HUAWEI_INTERFACE: PostProcRule = PostProcRule::new("huawei-interface", huawei::interface);
pub const HUAWEI_ROUTE_POLICY: PostProcRule =
    PostProcRule::new("huawei-route-policy", huawei::route_policy);
pub const HUAWEI_PREFIX_LIST: PostProcRule =
    PostProcRule::new("huawei-prefix-list", huawei::prefix_list);
pub const HUAWEI_LOCAL_USER: PostProcRule =
    PostProcRule::new("huawei-local-user", huawei::local_user);
pub const HUAWEI_SHARED_KEY: PostProcRule =
    PostProcRule::new("huawei-shared-key", huawei::shared_key);
pub const HUAWEI_BGP: PostProcRule = PostProcRule::new("huawei-bgp", huawei::bgp);

const BUILTIN: &[PostProcRule] = &[
    HUAWEI_INTERFACE,
    HUAWEI_ROUTE_POLICY,
    HUAWEI_PREFIX_LIST,
    HUAWEI_LOCAL_USER,
    HUAWEI_SHARED_KEY,
    HUAWEI_BGP,
];

/// Every built-in rule.
pub fn builtin_rules() -> &'static [PostProcRule] {
    BUILTIN
}

/// Rules applied when the caller does not choose any.
pub fn default_rules(vendor: Vendor) -> Vec<PostProcRule> {
    match vendor {
        Vendor::Huawei => BUILTIN.to_vec(),
        Vendor::Cisco | Vendor::Arista => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{default_rules, PostProcRule, HUAWEI_BGP};
    use crate::vendor::Vendor;

    #[test]
    fn rules_resolve_by_name() {
        assert_eq!(PostProcRule::by_name("huawei-bgp"), Ok(HUAWEI_BGP));
        let err = PostProcRule::by_name("juniper-bgp").expect_err("unknown");
        assert_eq!(err.to_string(), "unknown post-processing rule juniper-bgp");
    }

    #[test]
    fn only_huawei_has_default_rules() {
        assert_eq!(default_rules(Vendor::Huawei).len(), 6);
        assert!(default_rules(Vendor::Arista).is_empty());
        assert!(default_rules(Vendor::Cisco).is_empty());
    }

    #[test]
    fn rules_deserialize_from_names() {
        let rules: Vec<PostProcRule> =
            serde_json::from_str(r#"["huawei-interface", "huawei-route-policy"]"#).expect("rules");
        let names: Vec<_> = rules.iter().map(PostProcRule::name).collect();
        assert_eq!(names, vec!["huawei-interface", "huawei-route-policy"]);
        assert!(serde_json::from_str::<Vec<PostProcRule>>(r#"["nope"]"#).is_err());
    }
}
