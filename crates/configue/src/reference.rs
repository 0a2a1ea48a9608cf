//! Path expressions and the walk that resolves them.
//!
//! Two spellings lead to the same [`PathExpression`]:
//!
//! - load paths, `"server.ports.0"` or a list of segments (which may
//!   themselves contain dots), used by [`Document::load`](crate::Document::load)
//!   and the `!cfg` tag;
//! - `cfg://` references, `server.ports[0]` or `servers[main].host`.
//!
//! Load paths walk the document without building the objects they pass
//! through: a construct mapping on the way is entered through its argument
//! container. A segment that names no argument is read as an attribute of
//! the built object instead. References behave like attribute access on live values: each
//! intermediate step is converted first, except for an object that is being
//! constructed right now, whose arguments are reachable so that siblings can
//! refer to each other.

use crate::error::{ConfigueError, Result};
use crate::lazy::{Descent, Mapping, Slot};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::rc::Rc;

static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)\s*").expect("valid regex"));
static DOT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.\s*(\w+)\s*").expect("valid regex"));
static INDEX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*(\w+)\s*\]\s*").expect("valid regex"));

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A mapping key, a sequence index spelled in digits, or an attribute.
    Name(String),
    /// A bracketed integer index.
    Index(usize),
}

/// An ordered list of path segments. The empty path designates the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathExpression {
    segments: Vec<Segment>,
}

impl PathExpression {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Parse the body of a `cfg://` reference.
    ///
    /// The grammar is a leading identifier followed by any number of
    /// `.identifier` or `[literal]` steps; a literal made only of digits is
    /// an index.
    ///
    /// ```rust
    /// use configue::{PathExpression, Segment};
    ///
    /// let path = PathExpression::parse_reference("servers[0].host").unwrap();
    /// assert_eq!(
    ///     path.segments(),
    ///     &[
    ///         Segment::Name("servers".into()),
    ///         Segment::Index(0),
    ///         Segment::Name("host".into()),
    ///     ]
    /// );
    /// assert!(PathExpression::parse_reference("servers.").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// [`ConfigueError::MalformedReference`] if the text does not follow the
    /// grammar, including the empty reference and a trailing dot.
    pub fn parse_reference(reference: &str) -> Result<Self> {
        let Some(first) = WORD_PATTERN.captures(reference) else {
            return Err(ConfigueError::malformed(
                reference,
                "expected an identifier at the start",
            ));
        };
        let mut segments = vec![Segment::Name(first[1].to_string())];
        let mut rest = &reference[first[0].len()..];

        while !rest.is_empty() {
            if let Some(step) = DOT_PATTERN.captures(rest) {
                segments.push(Segment::Name(step[1].to_string()));
                rest = &rest[step[0].len()..];
            } else if let Some(step) = INDEX_PATTERN.captures(rest) {
                let literal = &step[1];
                segments.push(match parse_index(literal) {
                    Some(index) => Segment::Index(index),
                    None => Segment::Name(literal.to_string()),
                });
                rest = &rest[step[0].len()..];
            } else {
                return Err(ConfigueError::malformed(
                    reference,
                    format!("unexpected {rest:?}"),
                ));
            }
        }

        Ok(Self { segments })
    }
}

fn parse_index(text: &str) -> Option<usize> {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

/// Dotted load path; empty segments are skipped, so `""` is the root.
impl From<&str> for PathExpression {
    fn from(path: &str) -> Self {
        Self {
            segments: path
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(|segment| Segment::Name(segment.to_string()))
                .collect(),
        }
    }
}

impl From<String> for PathExpression {
    fn from(path: String) -> Self {
        Self::from(path.as_str())
    }
}

impl From<&String> for PathExpression {
    fn from(path: &String) -> Self {
        Self::from(path.as_str())
    }
}

/// Pre-split load path; segments are taken verbatim and may contain dots.
impl From<&[&str]> for PathExpression {
    fn from(segments: &[&str]) -> Self {
        Self {
            segments: segments
                .iter()
                .filter(|segment| !segment.is_empty())
                .map(|segment| Segment::Name((*segment).to_string()))
                .collect(),
        }
    }
}

impl<const N: usize> From<[&str; N]> for PathExpression {
    fn from(segments: [&str; N]) -> Self {
        Self::from(&segments[..])
    }
}

impl From<Vec<String>> for PathExpression {
    fn from(segments: Vec<String>) -> Self {
        Self {
            segments: segments
                .into_iter()
                .filter(|segment| !segment.is_empty())
                .map(Segment::Name)
                .collect(),
        }
    }
}

impl From<Vec<Segment>> for PathExpression {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Name(name) if i == 0 => write!(f, "{name}")?,
                Segment::Name(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// How intermediate steps treat the slots they pass through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WalkMode {
    /// Load paths: construct mappings are entered through their arguments.
    Raw,
    /// `cfg://` references: values are converted, except objects currently
    /// under construction.
    Reference,
}

enum Cursor {
    Slot(Rc<Slot>),
    Value(Value),
}

/// Walk `path` from `root` and return the converted value at the end.
pub(crate) fn walk(root: Rc<Slot>, path: &PathExpression, mode: WalkMode) -> Result<Value> {
    let mut cursor = Cursor::Slot(root);

    for (depth, segment) in path.segments.iter().enumerate() {
        let current = match cursor {
            Cursor::Slot(slot) => {
                let descent = match mode {
                    WalkMode::Raw => slot.descend()?,
                    WalkMode::Reference => slot.enter()?,
                };
                match descent {
                    Descent::Value(value) => value,
                    // A member of the built object rather than an argument.
                    Descent::Arguments(arguments)
                        if mode == WalkMode::Raw
                            && !slot.is_converting()
                            && !has_entry(&arguments, segment) =>
                    {
                        slot.force()?
                    }
                    Descent::Arguments(arguments) => Value::Mapping(arguments),
                }
            }
            Cursor::Value(value) => value,
        };
        cursor = step(&current, segment, || {
            PathExpression::new(path.segments[..=depth].to_vec()).to_string()
        })?;
    }

    match cursor {
        Cursor::Slot(slot) => slot.force(),
        Cursor::Value(value) => Ok(value),
    }
}

fn has_entry(mapping: &Mapping, segment: &Segment) -> bool {
    match segment {
        Segment::Name(key) => mapping.contains_key(key),
        Segment::Index(index) => mapping.contains_key(&index.to_string()),
    }
}

fn step(current: &Value, segment: &Segment, path: impl Fn() -> String) -> Result<Cursor> {
    match (current, segment) {
        (Value::Mapping(mapping), Segment::Name(key)) => mapping
            .slot(key)
            .map(Cursor::Slot)
            .ok_or_else(|| {
                ConfigueError::sub_path_not_found(
                    path(),
                    format!("no key {key:?}"),
                    mapping.source_info(),
                )
            }),
        (Value::Mapping(mapping), Segment::Index(index)) => mapping
            .slot(&index.to_string())
            .map(Cursor::Slot)
            .ok_or_else(|| {
                ConfigueError::sub_path_not_found(
                    path(),
                    format!("no key {index:?}"),
                    mapping.source_info(),
                )
            }),
        (Value::List(sequence) | Value::Tuple(sequence), _) => {
            let index = match segment {
                Segment::Index(index) => *index,
                Segment::Name(name) => parse_index(name).ok_or_else(|| {
                    ConfigueError::sub_path_not_found(
                        path(),
                        format!("{name:?} is not a sequence index"),
                        sequence.source_info(),
                    )
                })?,
            };
            sequence.slot(index).map(Cursor::Slot).ok_or_else(|| {
                ConfigueError::sub_path_not_found(
                    path(),
                    format!(
                        "index {index} out of range for a sequence of {} items",
                        sequence.len()
                    ),
                    sequence.source_info(),
                )
            })
        }
        (Value::Instance(_) | Value::Callable(_), Segment::Name(name)) => current
            .attribute(name)?
            .map(Cursor::Value)
            .ok_or_else(|| {
                ConfigueError::sub_path_not_found(
                    path(),
                    format!("{} has no attribute {name:?}", current.kind_name()),
                    None,
                )
            }),
        (other, _) => Err(ConfigueError::sub_path_not_found(
            path(),
            format!("cannot step into a {}", other.kind_name()),
            None,
        )),
    }
}
