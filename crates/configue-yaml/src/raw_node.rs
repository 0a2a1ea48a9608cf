//! Raw YAML node tree with source location tracking.

use crate::{Scalar, SourceInfo};
use std::rc::Rc;

/// A YAML node as written in the source, before any configue conversion.
///
/// Scalars keep their original text and quoting style so that the converter
/// can decide how to interpret them (environment interpolation only
/// re-resolves plain scalars, for instance). Children are reference counted
/// so that lazy containers can hold a subtree independently of the document.
///
/// ## Example
///
/// ```rust
/// use configue_yaml::{parse, RawNodeKind};
///
/// let root = parse("servers: [a, b]").unwrap();
/// let servers = root.get("servers").unwrap();
/// assert!(matches!(servers.kind, RawNodeKind::Sequence(ref items) if items.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    /// The node contents.
    pub kind: RawNodeKind,

    /// Source location for this node.
    pub source_info: SourceInfo,

    /// Explicit YAML tag (`!path`, `!!str`, ...), if any.
    pub tag: Option<RawTag>,
}

/// Contents of a [`RawNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawNodeKind {
    Scalar(Scalar),
    Sequence(Vec<Rc<RawNode>>),
    Mapping(Vec<RawEntry>),
}

/// A key-value pair in a YAML mapping.
///
/// Entries keep document order. Duplicate keys are kept as written; the
/// converter decides which one wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub key: Rc<RawNode>,
    pub value: Rc<RawNode>,
}

/// An explicit YAML tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    /// Tag handle: `"!"` for local tags, `"tag:yaml.org,2002:"` for `!!` tags.
    pub handle: String,

    /// Tag suffix, e.g. `"path"` for `!path` or `"import:db"` for `!import:db`.
    pub suffix: String,

    /// Location of the tagged node.
    pub source_info: SourceInfo,
}

/// Handle yaml-rust2 reports for `!!` (core schema) tags.
pub const CORE_TAG_HANDLE: &str = "tag:yaml.org,2002:";

impl RawTag {
    /// `true` for single-bang local tags such as `!path`.
    pub fn is_local(&self) -> bool {
        self.handle == "!"
    }

    /// `true` for core-schema tags such as `!!str`.
    pub fn is_core(&self) -> bool {
        self.handle == CORE_TAG_HANDLE || self.handle == "!!"
    }

    /// The tag as it would be written in the document.
    pub fn display_name(&self) -> String {
        if self.is_core() {
            format!("!!{}", self.suffix)
        } else {
            format!("{}{}", self.handle, self.suffix)
        }
    }
}

impl RawNode {
    pub fn new(kind: RawNodeKind, source_info: SourceInfo) -> Self {
        Self {
            kind,
            source_info,
            tag: None,
        }
    }

    pub fn scalar(scalar: Scalar, source_info: SourceInfo) -> Self {
        Self::new(RawNodeKind::Scalar(scalar), source_info)
    }

    pub fn with_tag(mut self, tag: Option<RawTag>) -> Self {
        self.tag = tag;
        self
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, RawNodeKind::Scalar(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, RawNodeKind::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, RawNodeKind::Mapping(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            RawNodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Rc<RawNode>]> {
        match &self.kind {
            RawNodeKind::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[RawEntry]> {
        match &self.kind {
            RawNodeKind::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Get a mapping value by key, comparing against the key's source text.
    ///
    /// When a key appears more than once the last occurrence wins, matching
    /// how the converter builds mappings.
    pub fn get(&self, key: &str) -> Option<&Rc<RawNode>> {
        self.as_mapping()?
            .iter()
            .rev()
            .find(|entry| entry.key.as_scalar().is_some_and(|k| k.text == key))
            .map(|entry| &entry.value)
    }

    /// Number of children (0 for scalars).
    pub fn len(&self) -> usize {
        match &self.kind {
            RawNodeKind::Scalar(_) => 0,
            RawNodeKind::Sequence(items) => items.len(),
            RawNodeKind::Mapping(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
