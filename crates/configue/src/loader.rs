//! Entry points: the root loader and the one-shot [`load`] function.

use crate::dispatch::Converter;
use crate::document::Document;
use crate::env::Environment;
use crate::error::{ConfigueError, Result};
use crate::logging;
use crate::reference::PathExpression;
use crate::registry::Registry;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Options for [`load`].
///
/// ```rust
/// use configue::{Environment, LoadOptions, Registry};
///
/// let options = LoadOptions::new()
///     .registry(Registry::new())
///     .environment(Environment::empty().with_var("PORT", "8080"))
///     .logging_config_path("logging");
/// ```
#[derive(Debug, Default)]
pub struct LoadOptions {
    registry: Registry,
    environment: Environment,
    logging_config_path: Option<PathExpression>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols available to construct markers and `ext://` references.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Source of `${NAME}` substitutions. Defaults to the process environment.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Path of a logging section applied before the requested value is
    /// loaded.
    pub fn logging_config_path(mut self, path: impl Into<PathExpression>) -> Self {
        self.logging_config_path = Some(path.into());
        self
    }
}

/// Load the value at `path` in `file`, fully resolved.
///
/// Every lazy container reachable from the returned value is converted before
/// returning, so the value does not depend on the loader any more.
///
/// # Errors
///
/// Any [`ConfigueError`]: I/O and parse errors for the file or its imports,
/// unknown paths, unresolvable constructors, cycles, and constructor
/// failures.
pub fn load(
    file: impl AsRef<Path>,
    path: impl Into<PathExpression>,
    options: LoadOptions,
) -> Result<Value> {
    let loader = Loader::with_options(options.registry, options.environment);
    let document = loader.document(file.as_ref())?;

    if let Some(logging_path) = &options.logging_config_path {
        logging::configure(&document.load(logging_path.clone())?)?;
    }

    let value = document.load(path)?;
    value.resolve_deep()?;
    Ok(value)
}

pub(crate) struct LoaderInner {
    registry: Rc<Registry>,
    environment: Rc<Environment>,
    documents: RefCell<HashMap<PathBuf, Rc<Document>>>,
}

impl LoaderInner {
    /// Parse `file`, or return the already loaded document for it.
    pub(crate) fn document(self: &Rc<Self>, file: &Path) -> Result<Rc<Document>> {
        let key = file.canonicalize().map_err(|source| ConfigueError::Io {
            path: file.to_path_buf(),
            source,
        })?;

        if let Some(document) = self.documents.borrow().get(&key) {
            return Ok(Rc::clone(document));
        }

        let content = std::fs::read_to_string(&key).map_err(|source| ConfigueError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let node = configue_yaml::parse_file(&content, &file.to_string_lossy())?;
        debug!(file = %key.display(), "loaded document");

        let document = Rc::new(Document::new(
            node,
            Some(key.clone()),
            self.converter(Some(key.clone())),
        ));
        self.documents.borrow_mut().insert(key, Rc::clone(&document));
        Ok(document)
    }

    pub(crate) fn load_file(self: &Rc<Self>, file: &Path, path: &PathExpression) -> Result<Value> {
        self.document(file)?.load(path.clone())
    }

    fn converter(self: &Rc<Self>, file: Option<PathBuf>) -> Converter {
        Converter::new(
            Rc::clone(&self.registry),
            Rc::clone(&self.environment),
            file,
            Rc::downgrade(self),
        )
    }
}

/// The root loader: owns every document read during a load.
///
/// Documents are keyed by canonical path, so a file imported from several
/// places is parsed once and its objects are shared.
///
/// ```rust
/// use configue::Loader;
///
/// let loader = Loader::new();
/// let document = loader.document_from_str("servers: [a, b]\nfirst: cfg://servers[0]").unwrap();
/// assert_eq!(document.load("first").unwrap().as_str(), Some("a"));
/// ```
#[derive(Clone)]
pub struct Loader {
    inner: Rc<LoaderInner>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// A loader with an empty registry and the process environment.
    pub fn new() -> Self {
        Self::with_options(Registry::new(), Environment::process())
    }

    pub fn with_options(registry: Registry, environment: Environment) -> Self {
        Self {
            inner: Rc::new(LoaderInner {
                registry: Rc::new(registry),
                environment: Rc::new(environment),
                documents: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Read and parse `file`, or return the document already loaded for it.
    pub fn document(&self, file: impl AsRef<Path>) -> Result<Rc<Document>> {
        self.inner.document(file.as_ref())
    }

    /// Load the value at `path` in `file`. Lazy containers stay lazy.
    pub fn load_file(
        &self,
        file: impl AsRef<Path>,
        path: impl Into<PathExpression>,
    ) -> Result<Value> {
        self.inner.load_file(file.as_ref(), &path.into())
    }

    /// Parse a document from text. It is not cached; relative `!path` and
    /// `!import` tags resolve against the working directory.
    pub fn document_from_str(&self, content: &str) -> Result<Rc<Document>> {
        let node = configue_yaml::parse(content)?;
        Ok(Rc::new(Document::new(node, None, self.inner.converter(None))))
    }

    /// Build a document from an in-memory JSON value.
    pub fn document_from_json(&self, value: &serde_json::Value) -> Rc<Document> {
        let node = configue_yaml::from_json(value);
        Rc::new(Document::new(node, None, self.inner.converter(None)))
    }

    /// Number of files loaded so far, imports included.
    pub fn document_count(&self) -> usize {
        self.inner.documents.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_from_json_is_lazy_and_converted() {
        let loader = Loader::with_options(Registry::new(), Environment::empty());
        let document = loader.document_from_json(&json!({
            "a": "cfg://b.c",
            "b": {"c": [1, 2]},
            "quoted": "123"
        }));

        let a = document.load("a").unwrap();
        let c = document.load("b.c").unwrap();
        assert!(a.ptr_eq(&c));
        assert_eq!(document.load("quoted").unwrap().as_str(), Some("123"));
        assert_eq!(document.load("b.c.1").unwrap().as_i64(), Some(2));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = Loader::new();
        let err = loader.document("does/not/exist.yml").unwrap_err();
        assert!(matches!(err, ConfigueError::Io { .. }));
        assert_eq!(loader.document_count(), 0);
    }

    #[test]
    fn test_resolve_requires_cfg_scheme() {
        let loader = Loader::new();
        let document = loader.document_from_str("a: 1").unwrap();
        assert_eq!(document.resolve("cfg://a").unwrap().as_i64(), Some(1));
        assert!(matches!(
            document.resolve("a"),
            Err(ConfigueError::MalformedReference { .. })
        ));
    }
}
