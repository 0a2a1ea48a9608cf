//! A loaded configuration document.

use crate::dispatch::Converter;
use crate::error::{ConfigueError, Result};
use crate::lazy::Slot;
use crate::reference::{self, PathExpression, WalkMode};
use crate::value::Value;
use configue_yaml::RawNode;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// One parsed document and the cache of everything converted from it.
///
/// Values obtained from a document share its cache: loading the same path
/// twice, or reaching the same node through a `cfg://` reference, yields the
/// same containers and instances. Lazy values that still need the document
/// (for a `cfg://` lookup they have not performed yet) report
/// [`ConfigueError::DocumentReleased`] once the document is dropped.
pub struct Document {
    file: Option<PathBuf>,
    root: Rc<Slot>,
    // The root slot drops its handle once converted.
    _converter: Rc<Converter>,
}

impl Document {
    pub(crate) fn new(node: Rc<RawNode>, file: Option<PathBuf>, converter: Converter) -> Self {
        let converter = Rc::new(converter);
        let root = Rc::new(Slot::pending(node, Rc::clone(&converter)));
        converter.set_root(&root);
        Self {
            file,
            root,
            _converter: converter,
        }
    }

    /// The file this document was read from, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Convert the whole document.
    pub fn root(&self) -> Result<Value> {
        self.root.force()
    }

    /// Load the value at a path.
    ///
    /// The path is either a dotted string (`"server.ports.0"`) or a list of
    /// segments, which may themselves contain dots. Objects along the way are
    /// not constructed: the walk goes through their arguments.
    ///
    /// # Errors
    ///
    /// [`ConfigueError::SubPathNotFound`] when a segment does not exist, or
    /// any error raised while converting the target value.
    pub fn load(&self, path: impl Into<PathExpression>) -> Result<Value> {
        let path = path.into();
        debug!(file = ?self.file, %path, "loading path");
        reference::walk(Rc::clone(&self.root), &path, WalkMode::Raw)
    }

    /// Resolve a full `cfg://…` reference against this document.
    pub fn resolve(&self, reference: &str) -> Result<Value> {
        let Some(expression) = reference.strip_prefix("cfg://") else {
            return Err(ConfigueError::malformed(
                reference,
                "expected a cfg:// reference",
            ));
        };
        let path = PathExpression::parse_reference(expression)?;
        reference::walk(Rc::clone(&self.root), &path, WalkMode::Reference)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("file", &self.file)
            .field("root", &self.root)
            .finish()
    }
}
