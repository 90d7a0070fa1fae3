//! Network device configurations as ordered, tagged trees.
//!
//! Configuration text is parsed into a [`ConfTree`] per [`Vendor`] dialect,
//! optionally annotated by regex [`TaggingRules`]. Two trees of the same
//! vendor can be diffed into a patch tree, filtered with [`search`], and
//! converted to and from a nested mapping.

pub mod diff;
pub mod env;
pub mod format;
pub mod parser;
pub mod postproc;
pub mod search;
pub mod tagging;
pub mod tree;
pub mod vendor;

pub use diff::{diff, diff_with_options, DiffError, DiffOptions};
pub use env::{ConfTreeEnv, EnvError};
pub use format::{from_dict, from_json, to_dict, to_json, NodeDict, SerializeError};
pub use parser::{parse, ParseError, Parser};
pub use postproc::{PostProcRule, UnknownRule};
pub use search::{search, IncludeMode, SearchError, SearchQuery};
pub use tagging::{TaggingError, TaggingRule, TaggingRules, TaggingRulesDict};
pub use tree::{ConfTree, NodeId, NodeRef};
pub use vendor::{Dialect, UnknownVendor, Vendor};
