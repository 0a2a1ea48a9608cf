//! Converted configuration values.
//!
//! A [`Value`] is what a configuration node becomes once converted. Scalars
//! are plain data; collections are lazy containers ([`Mapping`],
//! [`Sequence`]) that convert their children on first access; constructed
//! objects are [`Instance`]s shared by reference count, so two references to
//! the same configuration node hand out the same object.

use crate::callable::Callable;
use crate::error::{ConfigueError, Result};
use crate::lazy::{Mapping, Sequence};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// A converted configuration value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Sequence),
    Tuple(Sequence),
    Mapping(Mapping),
    Instance(Instance),
    Callable(Callable),
}

/// Behaviour shared by every object a constructor can return.
///
/// The default implementation exposes no attributes, so a plain
/// `impl Object for MyType {}` is enough for types that are never the target
/// of a `cfg://` attribute lookup.
pub trait Object: Any + fmt::Debug {
    /// Look up a named attribute, as used by `cfg://obj.attr` and by load
    /// paths that continue past a constructed object.
    fn attribute(&self, _name: &str) -> Option<Value> {
        None
    }

    /// JSON rendering used by [`Value::to_json`]. Defaults to the type name.
    fn to_json(&self) -> Option<serde_json::Value> {
        None
    }
}

/// A constructed object.
///
/// Cloning an `Instance` clones the handle, not the object.
#[derive(Clone)]
pub struct Instance {
    object: Rc<dyn Object>,
    any: Rc<dyn Any>,
    type_name: &'static str,
}

impl Instance {
    pub fn new<T: Object>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    pub fn from_rc<T: Object>(value: Rc<T>) -> Self {
        let object: Rc<dyn Object> = value.clone();
        Self {
            object,
            any: value,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Get a typed handle to the object, sharing ownership.
    pub fn downcast<T: Object>(&self) -> Option<Rc<T>> {
        self.any.clone().downcast::<T>().ok()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.any.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.object.attribute(name)
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.any, &other.any)
    }

    fn to_json(&self) -> serde_json::Value {
        self.object
            .to_json()
            .unwrap_or_else(|| serde_json::Value::String(format!("<{}>", self.type_name)))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.object).finish()
    }
}

impl Value {
    /// Short name of the value kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Mapping(_) => "mapping",
            Value::Instance(_) => "instance",
            Value::Callable(_) => "callable",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Lists and tuples.
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::List(s) | Value::Tuple(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast an instance value to a concrete object type.
    pub fn downcast<T: Object>(&self) -> Option<Rc<T>> {
        self.as_instance().and_then(Instance::downcast)
    }

    /// Identity comparison.
    ///
    /// Containers, instances and callables compare by allocation; scalars
    /// have no identity and never compare equal here.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Mapping(a), Value::Mapping(b)) => a.ptr_eq(b),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Named member lookup: mapping keys, object attributes and callable
    /// members. `Ok(None)` when the value has no such member.
    pub fn attribute(&self, name: &str) -> Result<Option<Value>> {
        match self {
            Value::Mapping(mapping) => mapping.get_opt(name),
            Value::Instance(instance) => Ok(instance.attribute(name)),
            Value::Callable(callable) => Ok(callable.member(name).cloned()),
            _ => Ok(None),
        }
    }

    /// Convert to JSON, forcing every lazy value on the way.
    ///
    /// Instances render through [`Object::to_json`], callables as
    /// `"<callable path>"`, non-finite floats as strings. A container that
    /// contains itself is a [`ConfigueError::Recursion`].
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut visiting = HashSet::new();
        self.to_json_inner(&mut visiting)
    }

    fn to_json_inner(&self, visiting: &mut HashSet<usize>) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or_else(|| Json::String(f.to_string()), Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::List(seq) | Value::Tuple(seq) => {
                let id = seq.address();
                if !visiting.insert(id) {
                    return Err(ConfigueError::Recursion {
                        location: seq.source_info().cloned(),
                    });
                }
                let mut items = Vec::with_capacity(seq.len());
                for item in seq.iter() {
                    items.push(item?.to_json_inner(visiting)?);
                }
                visiting.remove(&id);
                Json::Array(items)
            }
            Value::Mapping(mapping) => {
                let id = mapping.address();
                if !visiting.insert(id) {
                    return Err(ConfigueError::Recursion {
                        location: mapping.source_info().cloned(),
                    });
                }
                let mut object = serde_json::Map::new();
                for entry in mapping.iter() {
                    let (key, value) = entry?;
                    object.insert(key.to_string(), value.to_json_inner(visiting)?);
                }
                visiting.remove(&id);
                Json::Object(object)
            }
            Value::Instance(instance) => instance.to_json(),
            Value::Callable(callable) => Json::String(format!("<callable {}>", callable.name())),
        })
    }

    /// Force every lazy value reachable from this one.
    ///
    /// After this returns successfully the value no longer needs the
    /// document it was loaded from.
    pub fn resolve_deep(&self) -> Result<()> {
        let mut visited = HashSet::new();
        self.resolve_deep_inner(&mut visited)
    }

    fn resolve_deep_inner(&self, visited: &mut HashSet<usize>) -> Result<()> {
        match self {
            Value::List(seq) | Value::Tuple(seq) => {
                if visited.insert(seq.address()) {
                    for item in seq.iter() {
                        item?.resolve_deep_inner(visited)?;
                    }
                }
            }
            Value::Mapping(mapping) => {
                if visited.insert(mapping.address()) {
                    for entry in mapping.iter() {
                        entry?.1.resolve_deep_inner(visited)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Value::Mapping(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Value::Instance(value)
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Value::Callable(value)
    }
}
