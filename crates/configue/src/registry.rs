//! Symbol registry for construct markers and `ext://` references.

use crate::callable::{Arguments, Callable};
use crate::error::{BoxError, ConfigueError, Result};
use crate::value::Value;
use configue_yaml::SourceInfo;
use std::collections::HashMap;
use tracing::trace;

/// Host-supplied table of dotted symbol paths.
///
/// A construct marker such as `"()": app.db.Pool.from_url` is resolved by
/// looking up the longest registered prefix (`app.db.Pool`), then reading
/// the remaining segments (`from_url`) as members of what was found.
///
/// ```rust
/// use configue::{Registry, Value};
///
/// let mut registry = Registry::new();
/// registry.constructor("app.Greeting", |args| {
///     let name: String = args.required("name")?;
///     Ok(Value::String(format!("hello {name}")))
/// });
/// registry.insert("app.VERSION", 3_i64);
///
/// assert!(registry.resolve("app.Greeting").is_ok());
/// assert_eq!(registry.get("app.VERSION").and_then(Value::as_i64), Some(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    symbols: HashMap<String, Value>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register any value under a dotted path.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.symbols.insert(path.into(), value.into());
        self
    }

    /// Register a constructor function under a dotted path.
    pub fn constructor<F>(&mut self, path: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&Arguments) -> std::result::Result<Value, BoxError> + 'static,
    {
        let path = path.into();
        let callable = Callable::new(path.clone(), function);
        self.symbols.insert(path, Value::Callable(callable));
        self
    }

    /// Exact lookup, without prefix shortening.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.symbols.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.symbols.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Resolve a dotted path to a value.
    ///
    /// # Errors
    ///
    /// [`ConfigueError::ConstructorNotFound`] when no prefix of the path is
    /// registered or a trailing member does not exist.
    pub fn resolve(&self, path: &str) -> Result<Value> {
        self.resolve_at(path, None)
    }

    pub(crate) fn resolve_at(&self, path: &str, location: Option<&SourceInfo>) -> Result<Value> {
        let not_found = || ConfigueError::ConstructorNotFound {
            path: path.to_string(),
            location: location.cloned(),
        };

        let segments: Vec<&str> = path.split('.').collect();
        let mut split = segments.len();
        let found = loop {
            if split == 0 {
                return Err(not_found());
            }
            let prefix = segments[..split].join(".");
            if let Some(value) = self.symbols.get(&prefix) {
                trace!(%prefix, remaining = segments.len() - split, "resolved symbol prefix");
                break value.clone();
            }
            split -= 1;
        };

        let mut current = found;
        for member in &segments[split..] {
            current = match current.attribute(member)? {
                Some(value) => value,
                None => return Err(not_found()),
            };
        }
        Ok(current)
    }
}
