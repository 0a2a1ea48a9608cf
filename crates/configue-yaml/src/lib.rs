//! # configue-yaml
//!
//! YAML parsing with source location tracking for configue.
//!
//! This crate turns YAML (and therefore JSON) text into a [`RawNode`] tree:
//! scalars keep their original text and quoting style, every node keeps its
//! tag and a [`SourceInfo`] pointing back into the source. Nothing is
//! interpreted beyond the YAML core schema; constructing values out of the
//! tree is the job of the `configue` crate.
//!
//! ## Design
//!
//! Children are reference counted (`Rc<RawNode>`) so that lazy converters can
//! hold on to a subtree without borrowing the whole document. Anchors and
//! aliases share the same `Rc`.
//!
//! ## Example
//!
//! ```rust
//! use configue_yaml::parse;
//!
//! let content = r#"
//! title: My Document
//! port: 8080
//! "#;
//!
//! let root = parse(content).unwrap();
//! let port = root.get("port").unwrap();
//! assert_eq!(port.as_scalar().unwrap().text, "8080");
//! assert_eq!(port.source_info.line, 3);
//! ```

mod error;
mod json;
mod parser;
mod raw_node;
mod scalar;
mod source_info;

pub use error::{Error, Result};
pub use json::from_json;
pub use parser::{parse, parse_file};
pub use raw_node::{CORE_TAG_HANDLE, RawEntry, RawNode, RawNodeKind, RawTag};
pub use scalar::{Scalar, ScalarStyle, resolve_plain_scalar};
pub use source_info::SourceInfo;

// Re-exported so downstream crates can match on resolved scalars without
// depending on yaml-rust2 directly.
pub use yaml_rust2::Yaml;
