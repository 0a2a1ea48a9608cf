//! YAML parser that builds RawNode trees.

use crate::{Error, RawEntry, RawNode, RawNodeKind, RawTag, Result, Scalar, SourceInfo};
use std::collections::HashMap;
use std::rc::Rc;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::Marker;

/// Parse YAML from a string, producing a RawNode tree.
///
/// This parses a single YAML document. If the input contains multiple documents,
/// only the first one will be parsed. An empty input yields a null scalar.
///
/// # Example
///
/// ```rust
/// use configue_yaml::parse;
///
/// let root = parse("title: My Document").unwrap();
/// assert!(root.is_mapping());
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid or if parsing fails.
pub fn parse(content: &str) -> Result<Rc<RawNode>> {
    parse_impl(content, None)
}

/// Parse YAML from a string with an associated filename.
///
/// The filename is included in source location information for better
/// error reporting.
///
/// # Example
///
/// ```rust
/// use configue_yaml::parse_file;
///
/// let root = parse_file("title: My Document", "config.yaml").unwrap();
/// assert_eq!(root.source_info.file, Some("config.yaml".into()));
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid or if parsing fails.
pub fn parse_file(content: &str, filename: &str) -> Result<Rc<RawNode>> {
    parse_impl(content, Some(filename))
}

fn parse_impl(content: &str, filename: Option<&str>) -> Result<Rc<RawNode>> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = YamlBuilder::new(filename);

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(|e| Error::from(e).with_file(filename))?;

    builder.result()
}

/// Builder that implements MarkedEventReceiver to construct RawNode trees.
struct YamlBuilder {
    /// Optional filename for source info
    filename: Option<String>,

    /// Stack of nodes being constructed
    stack: Vec<BuildNode>,

    /// Completed anchored nodes, by yaml-rust2 anchor id
    anchors: HashMap<usize, Rc<RawNode>>,

    /// The completed root node
    root: Option<Rc<RawNode>>,

    /// First structural error; events after it are ignored
    error: Option<Error>,
}

/// A node being constructed during parsing.
enum BuildNode {
    Sequence {
        start_marker: Marker,
        anchor_id: usize,
        tag: Option<Tag>,
        items: Vec<Rc<RawNode>>,
    },

    Mapping {
        start_marker: Marker,
        anchor_id: usize,
        tag: Option<Tag>,
        entries: Vec<RawEntry>,
        pending_key: Option<Rc<RawNode>>,
    },
}

impl YamlBuilder {
    fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(|s| s.to_string()),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn result(self) -> Result<Rc<RawNode>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if !self.stack.is_empty() {
            return Err(Error::InvalidStructure {
                message: "unterminated collection".into(),
                location: None,
            });
        }
        // An empty document is a null value.
        Ok(self.root.unwrap_or_else(|| {
            let source_info = self.filename.as_ref().map_or_else(SourceInfo::default, |file| {
                SourceInfo::default().with_file(file.clone())
            });
            Rc::new(RawNode::scalar(Scalar::plain(""), source_info))
        }))
    }

    fn fail(&mut self, message: &str, marker: &Marker) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure {
                message: message.into(),
                location: Some(self.make_source_info(marker, 0)),
            });
        }
    }

    fn push_complete(&mut self, node: Rc<RawNode>) {
        match self.stack.last_mut() {
            // This is the root
            None => self.root = Some(node),
            Some(BuildNode::Sequence { items, .. }) => items.push(node),
            Some(BuildNode::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => entries.push(RawEntry { key, value: node }),
                None => *pending_key = Some(node),
            },
        }
    }

    fn register_anchor(&mut self, anchor_id: usize, node: &Rc<RawNode>) {
        // yaml-rust2 numbers anchors from 1; 0 means "no anchor".
        if anchor_id > 0 {
            self.anchors.insert(anchor_id, Rc::clone(node));
        }
    }

    fn make_source_info(&self, marker: &Marker, len: usize) -> SourceInfo {
        let mut info = SourceInfo::from_marker(marker, len);
        if let Some(ref filename) = self.filename {
            info = info.with_file(filename.clone());
        }
        info
    }

    fn make_tag(&self, tag: Option<Tag>, source_info: &SourceInfo) -> Option<RawTag> {
        tag.map(|tag| RawTag {
            handle: tag.handle,
            suffix: tag.suffix,
            source_info: source_info.clone(),
        })
    }

    fn finish_collection(&mut self, end_marker: &Marker) {
        let node = match self.stack.pop() {
            Some(BuildNode::Sequence {
                start_marker,
                anchor_id,
                tag,
                items,
            }) => {
                let len = end_marker.index().saturating_sub(start_marker.index());
                let source_info = self.make_source_info(&start_marker, len);
                let tag = self.make_tag(tag, &source_info);
                let node = Rc::new(
                    RawNode::new(RawNodeKind::Sequence(items), source_info).with_tag(tag),
                );
                self.register_anchor(anchor_id, &node);
                node
            }
            Some(BuildNode::Mapping {
                start_marker,
                anchor_id,
                tag,
                entries,
                pending_key,
            }) => {
                if pending_key.is_some() {
                    self.fail("mapping key without value", end_marker);
                    return;
                }
                let len = end_marker.index().saturating_sub(start_marker.index());
                let source_info = self.make_source_info(&start_marker, len);
                let tag = self.make_tag(tag, &source_info);
                let node = Rc::new(
                    RawNode::new(RawNodeKind::Mapping(entries), source_info).with_tag(tag),
                );
                self.register_anchor(anchor_id, &node);
                node
            }
            None => {
                self.fail("collection end without start", end_marker);
                return;
            }
        };
        self.push_complete(node);
    }
}

impl MarkedEventReceiver for YamlBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor_id, tag) => {
                let source_info = self.make_source_info(&marker, value.len());
                let tag = self.make_tag(tag, &source_info);
                let node = Rc::new(
                    RawNode::scalar(Scalar::new(value, style.into()), source_info).with_tag(tag),
                );
                self.register_anchor(anchor_id, &node);
                self.push_complete(node);
            }

            Event::SequenceStart(anchor_id, tag) => {
                self.stack.push(BuildNode::Sequence {
                    start_marker: marker,
                    anchor_id,
                    tag,
                    items: Vec::new(),
                });
            }

            Event::MappingStart(anchor_id, tag) => {
                self.stack.push(BuildNode::Mapping {
                    start_marker: marker,
                    anchor_id,
                    tag,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }

            Event::SequenceEnd | Event::MappingEnd => self.finish_collection(&marker),

            // Aliases reuse the anchored subtree; each use is converted on
            // its own, so no value identity is implied.
            Event::Alias(anchor_id) => match self.anchors.get(&anchor_id).cloned() {
                Some(node) => self.push_complete(node),
                None => self.fail("alias to unknown anchor", &marker),
            },
        }
    }
}
