//! Constructor callables and the arguments they receive.

use crate::error::{BoxError, ConfigueError};
use crate::lazy::{Mapping, Sequence};
use crate::value::{Object, Value};
use configue_yaml::SourceInfo;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

type CallableFn = dyn Fn(&Arguments) -> Result<Value, BoxError>;

/// Something that can be named by a construct marker or an `ext://`
/// reference: a type constructor, a factory function, or a namespace of
/// static members that also happens to be invocable.
///
/// ```rust
/// use configue::{Callable, Value};
///
/// let make_port = Callable::new("net.port", |args| {
///     let value: i64 = args.required("value")?;
///     Ok(Value::Int(value))
/// })
/// .with_member("DEFAULT", Value::Int(8080));
///
/// assert_eq!(make_port.member("DEFAULT").and_then(Value::as_i64), Some(8080));
/// ```
#[derive(Clone)]
pub struct Callable {
    name: Rc<str>,
    function: Rc<CallableFn>,
    members: Rc<IndexMap<String, Value>>,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, BoxError> + 'static,
    {
        Self {
            name: Rc::from(name.into()),
            function: Rc::new(function),
            members: Rc::new(IndexMap::new()),
        }
    }

    /// Attach a static member, reachable as `path.to.Callable.NAME`.
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Rc::make_mut(&mut self.members).insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<&Value> {
        self.members.get(name)
    }

    pub fn call(&self, arguments: &Arguments) -> Result<Value, BoxError> {
        (self.function)(arguments)
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.function, &other.function)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Named arguments handed to a constructor.
///
/// Every value is already converted; nested containers stay lazy.
#[derive(Debug, Clone)]
pub struct Arguments {
    path: String,
    values: IndexMap<String, Value>,
    location: Option<SourceInfo>,
}

/// A constructor argument is missing or has the wrong shape.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("{constructor}: missing required argument {name:?}")]
    Missing { constructor: String, name: String },

    #[error("{constructor}: argument {name:?} should be a {expected}, found a {found}")]
    WrongType {
        constructor: String,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{constructor}: could not convert argument {name:?}: {source}")]
    Conversion {
        constructor: String,
        name: String,
        #[source]
        source: ConfigueError,
    },
}

impl Arguments {
    pub fn new(
        path: impl Into<String>,
        values: IndexMap<String, Value>,
        location: Option<SourceInfo>,
    ) -> Self {
        Self {
            path: path.into(),
            values,
            location,
        }
    }

    /// Dotted path of the constructor being called.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Location of the construct mapping.
    pub fn location(&self) -> Option<&SourceInfo> {
        self.location.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Typed access to a required argument.
    pub fn required<T: FromValue>(&self, name: &str) -> Result<T, ArgumentError> {
        match self.values.get(name) {
            Some(value) => self.convert(name, value),
            None => Err(ArgumentError::Missing {
                constructor: self.path.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Typed access to an optional argument; absent and `null` are `None`.
    pub fn optional<T: FromValue>(&self, name: &str) -> Result<Option<T>, ArgumentError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => self.convert(name, value).map(Some),
        }
    }

    fn convert<T: FromValue>(&self, name: &str, value: &Value) -> Result<T, ArgumentError> {
        match T::from_value(value) {
            Ok(Some(converted)) => Ok(converted),
            Ok(None) => Err(ArgumentError::WrongType {
                constructor: self.path.clone(),
                name: name.to_string(),
                expected: T::expected(),
                found: value.kind_name(),
            }),
            Err(source) => Err(ArgumentError::Conversion {
                constructor: self.path.clone(),
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Conversion from a configuration [`Value`] into a Rust type.
///
/// `Ok(None)` means the value has the wrong kind; `Err` means forcing a lazy
/// value failed.
pub trait FromValue: Sized {
    /// Kind name used in error messages.
    fn expected() -> &'static str;

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError>;
}

impl FromValue for Value {
    fn expected() -> &'static str {
        "value"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(Some(value.clone()))
    }
}

impl FromValue for String {
    fn expected() -> &'static str {
        "string"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.as_str().map(str::to_string))
    }
}

impl FromValue for i64 {
    fn expected() -> &'static str {
        "int"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.as_i64())
    }
}

impl FromValue for f64 {
    fn expected() -> &'static str {
        "float"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.as_f64())
    }
}

impl FromValue for bool {
    fn expected() -> &'static str {
        "bool"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.as_bool())
    }
}

impl FromValue for Mapping {
    fn expected() -> &'static str {
        "mapping"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.as_mapping().cloned())
    }
}

impl FromValue for Sequence {
    fn expected() -> &'static str {
        "list"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.as_sequence().cloned())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn expected() -> &'static str {
        "list"
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        let Some(sequence) = value.as_sequence() else {
            return Ok(None);
        };
        let mut items = Vec::with_capacity(sequence.len());
        for item in sequence.iter() {
            match T::from_value(&item?)? {
                Some(converted) => items.push(converted),
                None => return Ok(None),
            }
        }
        Ok(Some(items))
    }
}

impl<T: Object> FromValue for Rc<T> {
    fn expected() -> &'static str {
        std::any::type_name::<T>()
    }

    fn from_value(value: &Value) -> Result<Option<Self>, ConfigueError> {
        Ok(value.downcast::<T>())
    }
}
