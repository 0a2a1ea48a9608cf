//! YAML tags understood by the loader.
//!
//! ## Tags
//!
//! | Tag | Node | Result |
//! |---|---|---|
//! | `!cfg a.b` | scalar | value at load path `a.b` of the same document |
//! | `!ext pkg.NAME` | scalar | registered symbol, not invoked |
//! | `!path rel/file` | scalar | path joined to the document directory, `~` expanded |
//! | `!import file.yml` | scalar | root of another document |
//! | `!import:a.b file.yml` | scalar | load path `a.b` of another document |
//! | `!list a,b,c` | scalar | list of strings |
//! | `!tuple [..]` | sequence | tuple instead of list |
//! | `!!str` | scalar | the text, untyped |
//!
//! Tag payloads go through environment interpolation first. Unknown local
//! tags produce a warning and the node converts as if untagged.

use crate::dispatch::Converter;
use crate::error::{ConfigueError, Result};
use crate::lazy::Sequence;
use crate::reference::{self, PathExpression, WalkMode};
use crate::value::Value;
use configue_yaml::{RawNode, RawTag};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, warn};

/// A recognized configuration tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfigTag {
    Cfg,
    Ext,
    Path,
    Import { sub_path: Option<String> },
    List,
    Tuple,
    Str,
}

impl ConfigTag {
    fn name(&self) -> String {
        match self {
            ConfigTag::Cfg => "!cfg".into(),
            ConfigTag::Ext => "!ext".into(),
            ConfigTag::Path => "!path".into(),
            ConfigTag::Import { sub_path: None } => "!import".into(),
            ConfigTag::Import {
                sub_path: Some(sub_path),
            } => format!("!import:{sub_path}"),
            ConfigTag::List => "!list".into(),
            ConfigTag::Tuple => "!tuple".into(),
            ConfigTag::Str => "!!str".into(),
        }
    }
}

/// Parse a YAML tag into a configuration tag.
///
/// Core-schema tags other than `!!str` are left to the YAML typing rules and
/// return `None`, as do unknown local tags (with a warning).
pub(crate) fn parse_tag(tag: &RawTag) -> Option<ConfigTag> {
    if tag.is_core() {
        return (tag.suffix == "str").then_some(ConfigTag::Str);
    }
    if !tag.is_local() {
        debug!(tag = %tag.display_name(), "ignoring tag with unknown handle");
        return None;
    }

    match tag.suffix.as_str() {
        "cfg" => Some(ConfigTag::Cfg),
        "ext" => Some(ConfigTag::Ext),
        "path" => Some(ConfigTag::Path),
        "list" => Some(ConfigTag::List),
        "tuple" => Some(ConfigTag::Tuple),
        "import" => Some(ConfigTag::Import { sub_path: None }),
        suffix if suffix.starts_with("import:") => Some(ConfigTag::Import {
            sub_path: Some(suffix["import:".len()..].to_string()),
        }),
        unknown => {
            // Check for common typos and provide suggestions
            let suggestion = match unknown {
                "config" | "ref" | "conf" => Some("cfg"),
                "external" | "extern" => Some("ext"),
                "file" | "filepath" | "dir" => Some("path"),
                "include" | "load" | "imports" => Some("import"),
                "split" | "array" | "csv" => Some("list"),
                "tup" | "pair" => Some("tuple"),
                _ => None,
            };
            match suggestion {
                Some(suggestion) => warn!(
                    tag = %tag.display_name(),
                    location = %tag.source_info,
                    "Unknown tag, did you mean '!{suggestion}'?"
                ),
                None => warn!(
                    tag = %tag.display_name(),
                    location = %tag.source_info,
                    "Unknown tag"
                ),
            }
            None
        }
    }
}

/// Convert a node carrying a configuration tag.
pub(crate) fn apply(
    converter: &Rc<Converter>,
    node: &Rc<RawNode>,
    tag: ConfigTag,
) -> Result<Value> {
    let name = tag.name();
    let invalid = |reason: &str| ConfigueError::InvalidTag {
        tag: name.clone(),
        reason: reason.to_string(),
        location: Some(node.source_info.clone()),
    };

    match tag {
        ConfigTag::Tuple => Err(invalid("expects a sequence")),
        ConfigTag::Str => Err(invalid("expects a scalar value")),
        ConfigTag::Cfg => {
            let path = converter
                .tag_payload(node, &name)?
                .ok_or_else(|| invalid("expects a load path"))?;
            let root = converter.root()?;
            reference::walk(root, &PathExpression::from(path.as_str()), WalkMode::Raw)
        }
        ConfigTag::Ext => {
            let path = converter
                .tag_payload(node, &name)?
                .ok_or_else(|| invalid("expects a symbol path"))?;
            converter
                .registry()
                .resolve_at(&path, Some(&node.source_info))
        }
        ConfigTag::Path => Ok(match converter.tag_payload(node, &name)? {
            Some(path) => Value::String(
                resolve_path(converter, &path)
                    .to_string_lossy()
                    .into_owned(),
            ),
            None => Value::Null,
        }),
        ConfigTag::Import { sub_path } => {
            let path = converter
                .tag_payload(node, &name)?
                .ok_or_else(|| invalid("expects a file path"))?;
            let file = resolve_path(converter, &path);
            let sub_path = PathExpression::from(sub_path.as_deref().unwrap_or(""));
            debug!(file = %file.display(), %sub_path, "importing document");
            converter.loader()?.load_file(&file, &sub_path)
        }
        ConfigTag::List => Ok(Value::List(match converter.tag_payload(node, &name)? {
            Some(text) => Sequence::from_values(text.split(',').map(Value::from)),
            None => Sequence::from_values([]),
        })),
    }
}

/// Expand `~` and make relative paths relative to the document directory.
fn resolve_path(converter: &Converter, raw: &str) -> PathBuf {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            let rest = rest.trim_start_matches(['/', '\\']);
            match dirs::home_dir() {
                Some(home) if rest.is_empty() => home,
                Some(home) => home.join(rest),
                None => PathBuf::from(raw),
            }
        }
        _ => PathBuf::from(raw),
    };

    match converter.directory() {
        Some(directory) if expanded.is_relative() => directory.join(expanded),
        _ => expanded,
    }
}
