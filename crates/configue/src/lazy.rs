//! Lazy converting containers.
//!
//! Every mapping value and sequence item lives in a [`Slot`] that starts out
//! holding the raw node and converts it on first access. The converted value
//! is cached, so the same position always hands out the same value: two
//! references to one constructed object observe a single instance.
//!
//! Slot states:
//!
//! ```text
//! Unconverted ──force──▶ Converting ──ok──▶ Converted
//!       ▲                     │
//!       └──────── error ──────┘
//! ```
//!
//! A slot that is asked for its value while `Converting` reports a
//! [`ConfigueError::Recursion`]. Construct nodes additionally carry their
//! argument container from the moment they are first touched, so a path walk
//! can reach sibling arguments of an object that is still being built.

use crate::dispatch::Converter;
use crate::error::{ConfigueError, Result};
use crate::value::Value;
use configue_yaml::{RawNode, SourceInfo};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Raw node waiting for conversion.
#[derive(Clone)]
pub(crate) struct Pending {
    pub(crate) node: Rc<RawNode>,
    pub(crate) converter: Rc<Converter>,
}

enum SlotState {
    Unconverted {
        pending: Pending,
        arguments: Option<Mapping>,
    },
    Converting {
        pending: Pending,
        arguments: Option<Mapping>,
    },
    Converted(Value),
}

/// A single lazily converted position.
pub(crate) struct Slot {
    state: RefCell<SlotState>,
}

/// Result of stepping into a slot during a path walk.
pub(crate) enum Descent {
    /// The slot's converted value.
    Value(Value),
    /// The argument container of a construct node that is not built yet
    /// (or is being built right now).
    Arguments(Mapping),
}

impl Slot {
    pub(crate) fn pending(node: Rc<RawNode>, converter: Rc<Converter>) -> Self {
        Self {
            state: RefCell::new(SlotState::Unconverted {
                pending: Pending { node, converter },
                arguments: None,
            }),
        }
    }

    pub(crate) fn converted(value: Value) -> Self {
        Self {
            state: RefCell::new(SlotState::Converted(value)),
        }
    }

    /// Convert the slot if needed and return its value.
    pub(crate) fn force(&self) -> Result<Value> {
        let (pending, arguments) = {
            let mut state = self.state.borrow_mut();
            let (pending, arguments) = match &*state {
                SlotState::Converted(value) => return Ok(value.clone()),
                SlotState::Converting { pending, .. } => {
                    return Err(ConfigueError::Recursion {
                        location: Some(pending.node.source_info.clone()),
                    });
                }
                SlotState::Unconverted { pending, arguments } => {
                    let arguments = arguments
                        .clone()
                        .or_else(|| pending.converter.construct_arguments(&pending.node));
                    (pending.clone(), arguments)
                }
            };
            *state = SlotState::Converting {
                pending: pending.clone(),
                arguments: arguments.clone(),
            };
            (pending, arguments)
        };

        // The borrow is released here: conversion may walk back into other
        // slots, including this one.
        let result = pending
            .converter
            .convert(&pending.node, arguments.clone());

        *self.state.borrow_mut() = match &result {
            Ok(value) => SlotState::Converted(value.clone()),
            Err(_) => SlotState::Unconverted { pending, arguments },
        };
        result
    }

    /// Step into the slot as an intermediate segment of a path walk.
    ///
    /// Construct nodes are not built: their argument container is returned
    /// instead, and remembered so that the eventual construction reuses the
    /// very same argument slots.
    pub(crate) fn descend(&self) -> Result<Descent> {
        {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                SlotState::Converted(value) => return Ok(Descent::Value(value.clone())),
                SlotState::Converting {
                    arguments: Some(arguments),
                    ..
                } => return Ok(Descent::Arguments(arguments.clone())),
                SlotState::Converting { pending, .. } => {
                    return Err(ConfigueError::Recursion {
                        location: Some(pending.node.source_info.clone()),
                    });
                }
                SlotState::Unconverted { pending, arguments } => {
                    if arguments.is_none() {
                        *arguments = pending.converter.construct_arguments(&pending.node);
                    }
                    if let Some(arguments) = arguments {
                        return Ok(Descent::Arguments(arguments.clone()));
                    }
                }
            }
        }
        self.force().map(Descent::Value)
    }

    pub(crate) fn is_converting(&self) -> bool {
        matches!(&*self.state.borrow(), SlotState::Converting { .. })
    }

    /// Step into the slot as an intermediate segment of a `cfg://`
    /// reference: the value is converted, unless the slot is a construct
    /// currently being built, in which case its arguments are returned.
    pub(crate) fn enter(&self) -> Result<Descent> {
        if let SlotState::Converting {
            arguments: Some(arguments),
            ..
        } = &*self.state.borrow()
        {
            return Ok(Descent::Arguments(arguments.clone()));
        }
        self.force().map(Descent::Value)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => match &*state {
                SlotState::Unconverted { .. } => f.write_str("<unconverted>"),
                SlotState::Converting { .. } => f.write_str("<converting>"),
                SlotState::Converted(value) => write!(f, "<{}>", value.kind_name()),
            },
            Err(_) => f.write_str("<busy>"),
        }
    }
}

struct MappingInner {
    entries: IndexMap<String, Rc<Slot>>,
    source_info: Option<SourceInfo>,
}

/// A lazily converted, insertion-ordered mapping with string keys.
///
/// Cloning a `Mapping` clones the handle; both handles share the same cache.
#[derive(Clone)]
pub struct Mapping {
    inner: Rc<MappingInner>,
}

impl Mapping {
    pub(crate) fn from_slots(
        entries: IndexMap<String, Rc<Slot>>,
        source_info: Option<SourceInfo>,
    ) -> Self {
        Self {
            inner: Rc::new(MappingInner {
                entries,
                source_info,
            }),
        }
    }

    /// Build a mapping of already converted values.
    pub fn from_values<K, I>(values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let entries = values
            .into_iter()
            .map(|(key, value)| (key.into(), Rc::new(Slot::converted(value))))
            .collect();
        Self::from_slots(entries, None)
    }

    /// Get the converted value at `key`.
    ///
    /// # Errors
    ///
    /// [`ConfigueError::SubPathNotFound`] if the key does not exist, or any
    /// error raised while converting the value.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.get_opt(key)?.ok_or_else(|| {
            ConfigueError::sub_path_not_found(key, "no such key", self.source_info())
        })
    }

    pub fn get_opt(&self, key: &str) -> Result<Option<Value>> {
        self.inner
            .entries
            .get(key)
            .map(|slot| slot.force())
            .transpose()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Keys in document order. Does not convert anything.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.entries.keys().map(String::as_str)
    }

    /// Entries in document order, converting each value as it is reached.
    pub fn iter(&self) -> impl Iterator<Item = Result<(&str, Value)>> {
        self.inner
            .entries
            .iter()
            .map(|(key, slot)| slot.force().map(|value| (key.as_str(), value)))
    }

    /// Convert every value (one level deep) into an ordered map.
    pub fn materialize(&self) -> Result<IndexMap<String, Value>> {
        self.iter()
            .map(|entry| entry.map(|(key, value)| (key.to_string(), value)))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Mapping) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Location of the mapping in its document, if it came from one.
    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.inner.source_info.as_ref()
    }

    pub(crate) fn slot(&self, key: &str) -> Option<Rc<Slot>> {
        self.inner.entries.get(key).cloned()
    }

    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.entries.iter()).finish()
    }
}

struct SequenceInner {
    items: Vec<Rc<Slot>>,
    source_info: Option<SourceInfo>,
}

/// A lazily converted sequence, used for both lists and tuples.
#[derive(Clone)]
pub struct Sequence {
    inner: Rc<SequenceInner>,
}

impl Sequence {
    pub(crate) fn from_slots(items: Vec<Rc<Slot>>, source_info: Option<SourceInfo>) -> Self {
        Self {
            inner: Rc::new(SequenceInner { items, source_info }),
        }
    }

    pub fn from_values<I: IntoIterator<Item = Value>>(values: I) -> Self {
        let items = values
            .into_iter()
            .map(|value| Rc::new(Slot::converted(value)))
            .collect();
        Self::from_slots(items, None)
    }

    /// Get the converted item at `index`.
    ///
    /// # Errors
    ///
    /// [`ConfigueError::SubPathNotFound`] if the index is out of range, or any
    /// error raised while converting the item.
    pub fn get(&self, index: usize) -> Result<Value> {
        match self.inner.items.get(index) {
            Some(slot) => slot.force(),
            None => Err(ConfigueError::sub_path_not_found(
                index.to_string(),
                format!("index out of range for a sequence of {} items", self.len()),
                self.source_info(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        self.inner.items.iter().map(|slot| slot.force())
    }

    pub fn materialize(&self) -> Result<Vec<Value>> {
        self.iter().collect()
    }

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.inner.source_info.as_ref()
    }

    pub(crate) fn slot(&self, index: usize) -> Option<Rc<Slot>> {
        self.inner.items.get(index).cloned()
    }

    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.iter()).finish()
    }
}
