//! Node conversion and object construction.
//!
//! The [`Converter`] turns one raw node into a [`Value`]:
//!
//! - scalars go through environment interpolation, then YAML core-schema
//!   typing, then `cfg://` / `ext://` reference resolution;
//! - sequences and mappings become lazy containers whose children are
//!   converted on first access;
//! - a mapping holding the construct marker `"()"` is handed to the
//!   registered callable with the other entries as named arguments.
//!
//! A converter is created per document. It shares the registry and
//! environment of its loader and knows the document location, which
//! relative paths resolve against.

use crate::callable::Arguments;
use crate::env::Environment;
use crate::error::{ConfigueError, Result};
use crate::lazy::{Mapping, Sequence, Slot};
use crate::loader::LoaderInner;
use crate::reference::{self, PathExpression, WalkMode};
use crate::registry::Registry;
use crate::tag::{self, ConfigTag};
use crate::value::Value;
use configue_yaml::{RawEntry, RawNode, RawNodeKind, Scalar, Yaml};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, error, warn};

/// Key that turns a mapping into a constructor call.
pub const CONSTRUCTOR_KEY: &str = "()";

/// Escaped form of [`CONSTRUCTOR_KEY`]; renamed to `"()"` in the output.
pub const ESCAPED_CONSTRUCTOR_KEY: &str = "\\()";

// Re-parsed substitutions may themselves contain variables; past this depth
// the text is kept as is.
const MAX_INTERPOLATION_DEPTH: u32 = 8;

static SCHEME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+)://(.*)$").expect("valid regex"));

pub(crate) struct Converter {
    registry: Rc<Registry>,
    environment: Rc<Environment>,
    file: Option<PathBuf>,
    root: OnceCell<Weak<Slot>>,
    loader: Weak<LoaderInner>,
    interpolation_depth: Cell<u32>,
    // One slot per raw node, so that aliases of an anchor share its value.
    slots: RefCell<HashMap<*const RawNode, Weak<Slot>>>,
}

impl Converter {
    pub(crate) fn new(
        registry: Rc<Registry>,
        environment: Rc<Environment>,
        file: Option<PathBuf>,
        loader: Weak<LoaderInner>,
    ) -> Self {
        Self {
            registry,
            environment,
            file,
            root: OnceCell::new(),
            loader,
            interpolation_depth: Cell::new(0),
            slots: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn set_root(&self, root: &Rc<Slot>) {
        // A converter belongs to exactly one document; the first root wins.
        let _ = self.root.set(Rc::downgrade(root));
    }

    /// Root slot of the document, for `cfg://` and `!cfg`.
    pub(crate) fn root(&self) -> Result<Rc<Slot>> {
        self.root
            .get()
            .and_then(Weak::upgrade)
            .ok_or(ConfigueError::DocumentReleased)
    }

    pub(crate) fn loader(&self) -> Result<Rc<LoaderInner>> {
        self.loader.upgrade().ok_or(ConfigueError::DocumentReleased)
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Directory relative paths in this document are resolved against.
    pub(crate) fn directory(&self) -> Option<&Path> {
        self.file.as_deref().and_then(Path::parent)
    }

    /// Convert a node. `arguments` is the argument container prepared for a
    /// construct node, if a path walk already created it.
    pub(crate) fn convert(
        self: &Rc<Self>,
        node: &Rc<RawNode>,
        arguments: Option<Mapping>,
    ) -> Result<Value> {
        let tag = node.tag.as_ref().and_then(tag::parse_tag);

        match (tag, &node.kind) {
            (Some(ConfigTag::Tuple), RawNodeKind::Sequence(items)) => {
                Ok(Value::Tuple(self.sequence(node, items)))
            }
            (Some(ConfigTag::Str), RawNodeKind::Scalar(scalar)) => {
                Ok(Value::String(self.interpolate_text(&scalar.text)))
            }
            (Some(tag), _) => tag::apply(self, node, tag),
            (None, RawNodeKind::Scalar(scalar)) => self.convert_scalar(node, scalar),
            (None, RawNodeKind::Sequence(items)) => Ok(Value::List(self.sequence(node, items))),
            (None, RawNodeKind::Mapping(entries)) => {
                match arguments.or_else(|| self.construct_arguments(node)) {
                    Some(arguments) => self.construct(node, arguments),
                    None => Ok(Value::Mapping(self.mapping(node, entries, true))),
                }
            }
        }
    }

    /// The argument container of a construct node, or `None` for any other
    /// node. Nothing is converted.
    pub(crate) fn construct_arguments(self: &Rc<Self>, node: &Rc<RawNode>) -> Option<Mapping> {
        let entries = node.as_mapping()?;
        node.get(CONSTRUCTOR_KEY)?;
        let arguments: Vec<RawEntry> = entries
            .iter()
            .filter(|entry| !is_key(entry, CONSTRUCTOR_KEY))
            .cloned()
            .collect();
        Some(self.mapping(node, &arguments, false))
    }

    fn construct(self: &Rc<Self>, node: &Rc<RawNode>, arguments: Mapping) -> Result<Value> {
        let location = Some(node.source_info.clone());
        let marker = node
            .get(CONSTRUCTOR_KEY)
            .ok_or_else(|| ConfigueError::InvalidConstructPath {
                found: "nothing",
                location: location.clone(),
            })?;

        let path = match self.convert(marker, None)? {
            Value::String(path) => path,
            other => {
                return Err(ConfigueError::InvalidConstructPath {
                    found: other.kind_name(),
                    location,
                });
            }
        };

        let callable = match self.registry.resolve_at(&path, location.as_ref())? {
            Value::Callable(callable) => callable,
            other => {
                return Err(ConfigueError::NotCallable {
                    path,
                    kind: other.kind_name(),
                    location,
                });
            }
        };

        let values = arguments.materialize()?;
        debug!(constructor = %path, arguments = values.len(), "constructing object");

        let arguments = Arguments::new(path.clone(), values, location.clone());
        callable.call(&arguments).map_err(|source| {
            error!(constructor = %path, error = %source, "Could not instantiate object");
            ConfigueError::Constructor {
                path,
                location,
                source,
            }
        })
    }

    fn convert_scalar(self: &Rc<Self>, node: &Rc<RawNode>, scalar: &Scalar) -> Result<Value> {
        if let Some(replaced) = self.environment.interpolate(&scalar.text) {
            if scalar.style.is_plain() {
                return self.reparse(node, &replaced);
            }
            return self.string_value(node, self.interpolate_text(&replaced));
        }

        match scalar.resolve() {
            Yaml::String(text) => self.string_value(node, text),
            typed => Ok(typed_scalar(typed, &scalar.text)),
        }
    }

    /// Re-read a substituted plain scalar as YAML so that `${PORT-8080}`
    /// becomes an integer and `${MISSING}` becomes null.
    fn reparse(self: &Rc<Self>, node: &Rc<RawNode>, text: &str) -> Result<Value> {
        let depth = self.interpolation_depth.get();
        if depth >= MAX_INTERPOLATION_DEPTH {
            warn!(depth, text, "Stopping environment interpolation");
            return self.string_value(node, text.to_string());
        }

        let reparsed = match configue_yaml::parse(text) {
            Ok(reparsed) => reparsed,
            Err(err) => {
                debug!(text, error = %err, "substituted value is not valid YAML, keeping it as text");
                return self.string_value(node, text.to_string());
            }
        };

        // Scalars keep pointing at the original node for error locations.
        let reparsed = match &reparsed.kind {
            RawNodeKind::Scalar(scalar) => Rc::new(
                RawNode::scalar(scalar.clone(), node.source_info.clone())
                    .with_tag(reparsed.tag.clone()),
            ),
            _ => reparsed,
        };

        self.interpolation_depth.set(depth + 1);
        let result = self.convert(&reparsed, None);
        self.interpolation_depth.set(depth);
        result
    }

    /// Interpolate until the text stops changing, without re-typing.
    pub(crate) fn interpolate_text(&self, text: &str) -> String {
        let mut current = text.to_string();
        for _ in 0..MAX_INTERPOLATION_DEPTH {
            match self.environment.interpolate(&current) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// The text carried by a tagged scalar, after interpolation. `None` when
    /// a plain payload is empty or null, before or after substitution.
    pub(crate) fn tag_payload(&self, node: &RawNode, tag_name: &str) -> Result<Option<String>> {
        let Some(scalar) = node.as_scalar() else {
            return Err(ConfigueError::InvalidTag {
                tag: tag_name.to_string(),
                reason: "expects a scalar value".into(),
                location: Some(node.source_info.clone()),
            });
        };

        let text = match self.environment.interpolate(&scalar.text) {
            Some(replaced) => self.interpolate_text(&replaced),
            None => scalar.text.clone(),
        };
        if scalar.style.is_plain() && configue_yaml::resolve_plain_scalar(&text).is_null() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    /// Strings naming `cfg://` or `ext://` resolve to what they point at.
    fn string_value(self: &Rc<Self>, node: &RawNode, text: String) -> Result<Value> {
        let Some(caps) = SCHEME_PATTERN.captures(&text) else {
            return Ok(Value::String(text));
        };

        match &caps[1] {
            "cfg" => {
                let path = PathExpression::parse_reference(&caps[2])?;
                debug!(reference = %text, "resolving cfg reference");
                reference::walk(self.root()?, &path, WalkMode::Reference)
            }
            "ext" => self
                .registry
                .resolve_at(&caps[2], Some(&node.source_info)),
            _ => Ok(Value::String(text)),
        }
    }

    /// The slot converting `node`, shared by every position the node
    /// appears at.
    fn slot(self: &Rc<Self>, node: &Rc<RawNode>) -> Rc<Slot> {
        let mut slots = self.slots.borrow_mut();
        let key = Rc::as_ptr(node);
        if let Some(slot) = slots.get(&key).and_then(Weak::upgrade) {
            return slot;
        }
        let slot = Rc::new(Slot::pending(Rc::clone(node), Rc::clone(self)));
        slots.insert(key, Rc::downgrade(&slot));
        slot
    }

    fn sequence(self: &Rc<Self>, node: &RawNode, items: &[Rc<RawNode>]) -> Sequence {
        let slots = items.iter().map(|item| self.slot(item)).collect();
        Sequence::from_slots(slots, Some(node.source_info.clone()))
    }

    fn mapping(self: &Rc<Self>, node: &RawNode, entries: &[RawEntry], unescape: bool) -> Mapping {
        let mut slots = IndexMap::with_capacity(entries.len());
        for entry in entries {
            let Some(key) = entry.key.as_scalar() else {
                warn!(location = %entry.key.source_info, "Skipping non-scalar mapping key");
                continue;
            };
            let key = if unescape && key.text == ESCAPED_CONSTRUCTOR_KEY {
                CONSTRUCTOR_KEY.to_string()
            } else {
                key.text.clone()
            };
            slots.insert(key, self.slot(&entry.value));
        }
        Mapping::from_slots(slots, Some(node.source_info.clone()))
    }
}

fn is_key(entry: &RawEntry, key: &str) -> bool {
    entry.key.as_scalar().is_some_and(|k| k.text == key)
}

fn typed_scalar(yaml: Yaml, text: &str) -> Value {
    match yaml {
        Yaml::Null => Value::Null,
        Yaml::Boolean(b) => Value::Bool(b),
        Yaml::Integer(i) => Value::Int(i),
        Yaml::Real(real) => match real.parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::String(text.to_string()),
        },
        Yaml::String(s) => Value::String(s),
        _ => Value::String(text.to_string()),
    }
}
