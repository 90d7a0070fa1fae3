//! Renderers for config trees: device text views and the nested mapping form.

pub mod config;
pub mod dict;
pub mod patch;

pub use config::render_config;
pub use dict::{from_dict, from_json, to_dict, to_json, NodeDict, SerializeError};
pub use patch::render_patch;
