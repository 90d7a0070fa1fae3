use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Replacement text for secrets in masked output.
pub const MASK: &str = "<hidden>";

/// Network operating system family a tree was parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Vendor {
    Cisco,
    Arista,
    Huawei,
}

/// Returned when a vendor name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown vendor {0}")]
pub struct UnknownVendor(pub String);

impl Vendor {
    /// Every supported vendor.
    pub const ALL: [Vendor; 3] = [Vendor::Cisco, Vendor::Arista, Vendor::Huawei];

    /// Lowercase name used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Vendor::Cisco => "cisco",
            Vendor::Arista => "arista",
            Vendor::Huawei => "huawei",
        }
    }

    /// Syntax rules for this vendor.
    pub fn dialect(self) -> &'static Dialect {
        match self {
            Vendor::Cisco => &CISCO,
            Vendor::Arista => &ARISTA,
            Vendor::Huawei => &HUAWEI,
        }
    }
}

impl Display for Vendor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = UnknownVendor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vendor::ALL
            .into_iter()
            .find(|vendor| vendor.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVendor(s.to_string()))
    }
}

impl TryFrom<String> for Vendor {
    type Error = UnknownVendor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Vendor> for String {
    fn from(vendor: Vendor) -> Self {
        vendor.as_str().to_string()
    }
}

/// How an explicit section terminator affects the open sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitScope {
    /// Closes the section opened at the marker's own indentation (`exit-address-family`).
    Own,
    /// Closes the section enclosing the marker (`exit`, `quit`).
    Enclosing,
}

/// Vendor syntax table: indentation, negation, section terminators and
/// the patterns that drive masking and patch rendering.
#[derive(Debug)]
pub struct Dialect {
    /// Spaces per nesting level when rendering config text.
    pub indent: usize,
    /// Keyword that negates a command.
    pub negation: &'static str,
    /// Line emitted after every top-level block in config text.
    pub separator: &'static str,
    /// Token that leaves a configuration view in a patch.
    pub exit: &'static str,
    comment_prefixes: &'static [&'static str],
    noise: Vec<Regex>,
    exit_markers: Vec<(Regex, ExitScope)>,
    masks: Vec<Regex>,
    views: Vec<Regex>,
    flat_sections: Vec<Regex>,
}

impl Dialect {
    /// True for lines that carry no configuration (comments, separators).
    pub fn is_comment(&self, line: &str) -> bool {
        let line = line.trim_start();
        self.comment_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix))
    }

    /// True for unindented banner/footer lines the device prints around its config.
    pub fn is_noise(&self, line: &str) -> bool {
        self.noise.iter().any(|re| re.is_match(line))
    }

    pub(crate) fn exit_scope(&self, line: &str) -> Option<ExitScope> {
        self.exit_markers
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, scope)| *scope)
    }

    /// True when `line` is an explicit section terminator.
    pub fn is_exit_marker(&self, line: &str) -> bool {
        self.exit_scope(line).is_some()
    }

    /// Negate a command: prefix the negation keyword, or strip it when present.
    pub fn negate(&self, line: &str) -> String {
        match line
            .strip_prefix(self.negation)
            .and_then(|rest| rest.strip_prefix(' '))
        {
            Some(positive) => positive.trim_start().to_string(),
            None => format!("{} {}", self.negation, line),
        }
    }

    /// True when `line` starts with the negation keyword.
    pub fn is_negation(&self, line: &str) -> bool {
        line.strip_prefix(self.negation)
            .is_some_and(|rest| rest.starts_with(' '))
    }

    /// Replace every secret in `line` with [`MASK`].
    pub fn mask(&self, line: &str) -> String {
        let mut masked = line.to_string();
        for pattern in &self.masks {
            masked = mask_secrets(pattern, &masked);
        }
        masked
    }

    /// True when the node at `path` enters a device view even without children.
    pub fn opens_view(&self, path: &str) -> bool {
        self.views.iter().any(|re| re.is_match(path))
    }

    /// True when the section at `path` is closed by its own keywords.
    pub fn is_flat_section(&self, path: &str) -> bool {
        self.flat_sections.iter().any(|re| re.is_match(path))
    }
}

fn mask_secrets(pattern: &Regex, line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    for caps in pattern.captures_iter(line) {
        if let Some(secret) = caps.name("secret") {
            out.push_str(&line[last..secret.start()]);
            out.push_str(MASK);
            last = secret.end();
        }
    }
    out.push_str(&line[last..]);
    out
}

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .filter_map(|source| Regex::new(source).ok())
        .collect()
}

const CISCO_NOISE: &[&str] = &[
    r"^end$",
    r"^Building configuration",
    r"^Current configuration",
];
const CISCO_MASKS: &[&str] = &[
    r"\b(?:password|secret)(?: [0-9])? (?P<secret>\S+)$",
    r"\bkey [0-9] (?P<secret>\S+)$",
    r"\bkey-string(?: [0-9])? (?P<secret>\S+)$",
];
const ARISTA_MASKS: &[&str] = &[
    r"\b(?:key|md5)(?: (?:0|7|8a))? (?P<secret>\S+)$",
    r"\b(?:password|secret)(?: (?:0|5|7|sha512))? (?P<secret>\S+)$",
];
const IOS_VIEWS: &[&str] = &[
    r"^interface \S+$",
    r"^route-map \S+ (?:permit|deny) \d+$",
    r"^vlan \d+$",
    r"^router bgp \d+$",
    r"^router \S+ \S+$",
    r"^management \S+$",
    r"^line \S+(?: \d+)*$",
    r"^(?:ip|ipv6) access-list \S+$",
    r"^policy-map \S+$",
    r"^class-map \S+$",
];

const HUAWEI_NOISE: &[&str] = &[r"^return$"];
const HUAWEI_MASKS: &[&str] = &[r"\b(?:cipher|irreversible-cipher) (?P<secret>\S+)"];
const HUAWEI_VIEWS: &[&str] = &[
    r"^interface \S+(?: mode \S+)?$",
    r"^ip vpn-instance \S+$",
    r"^bgp \d+$",
    r"^aaa$",
    r"^aaa / (?:authentication|authorization|accounting)-scheme \S+$",
    r"^aaa / domain \S+$",
    r"^route-policy \S+ (?:permit|deny) node \d+$",
    r"^hwtacacs-server template \S+$",
    r"^radius-server template \S+$",
    r"^user-interface [^/]+$",
];
const HUAWEI_FLAT: &[&str] = &[r"^xpl "];

static CISCO: LazyLock<Dialect> = LazyLock::new(|| Dialect {
    indent: 1,
    negation: "no",
    separator: "!",
    exit: "exit",
    comment_prefixes: &["!"],
    noise: compile(CISCO_NOISE),
    exit_markers: exit_markers(&[
        (r"^exit$", ExitScope::Enclosing),
        (r"^exit-\S+$", ExitScope::Own),
    ]),
    masks: compile(CISCO_MASKS),
    views: compile(IOS_VIEWS),
    flat_sections: Vec::new(),
});

static ARISTA: LazyLock<Dialect> = LazyLock::new(|| Dialect {
    indent: 3,
    negation: "no",
    separator: "!",
    exit: "exit",
    comment_prefixes: &["!"],
    noise: compile(&[r"^end$"]),
    exit_markers: exit_markers(&[(r"^exit$", ExitScope::Enclosing)]),
    masks: compile(ARISTA_MASKS),
    views: compile(IOS_VIEWS),
    flat_sections: Vec::new(),
});

static HUAWEI: LazyLock<Dialect> = LazyLock::new(|| Dialect {
    indent: 1,
    negation: "undo",
    separator: "#",
    exit: "quit",
    comment_prefixes: &["#", "!"],
    noise: compile(HUAWEI_NOISE),
    exit_markers: exit_markers(&[(r"^quit$", ExitScope::Enclosing)]),
    masks: compile(HUAWEI_MASKS),
    views: compile(HUAWEI_VIEWS),
    flat_sections: compile(HUAWEI_FLAT),
});

fn exit_markers(sources: &[(&str, ExitScope)]) -> Vec<(Regex, ExitScope)> {
    sources
        .iter()
        .filter_map(|(source, scope)| Regex::new(source).ok().map(|re| (re, *scope)))
        .collect()
}
