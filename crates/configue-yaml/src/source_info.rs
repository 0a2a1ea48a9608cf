//! Source location information for YAML nodes.

use std::fmt;

/// Source location information for a YAML node.
///
/// Tracks the position of a YAML element in the original source text so that
/// conversion errors can point back at the offending node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Optional filename or source identifier
    pub file: Option<String>,

    /// Byte offset from start of source (0-based)
    pub offset: usize,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based, in characters not bytes)
    pub col: usize,

    /// Length in bytes
    pub len: usize,
}

impl SourceInfo {
    /// Create a new SourceInfo with all fields specified.
    pub fn new(file: Option<String>, offset: usize, line: usize, col: usize, len: usize) -> Self {
        Self {
            file,
            offset,
            line,
            col,
            len,
        }
    }

    /// Create a SourceInfo from a yaml-rust2::Marker.
    ///
    /// The marker provides the starting position. Length must be computed
    /// separately based on the content.
    pub fn from_marker(marker: &yaml_rust2::scanner::Marker, len: usize) -> Self {
        Self {
            file: None,
            offset: marker.index(),
            line: marker.line(), // yaml-rust2 lines are already 1-based
            col: marker.col() + 1,
            len,
        }
    }

    /// Create a SourceInfo spanning from start to end markers.
    pub fn from_span(
        start: &yaml_rust2::scanner::Marker,
        end: &yaml_rust2::scanner::Marker,
    ) -> Self {
        Self::from_marker(start, end.index().saturating_sub(start.index()))
    }

    /// Set the filename for this source location.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Get the end offset (exclusive) of this location.
    pub fn end_offset(&self) -> usize {
        self.offset + self.len
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            file: None,
            offset: 0,
            line: 1,
            col: 1,
            len: 0,
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "in \"{}\", ", file)?;
        }
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_info_creation() {
        let info = SourceInfo::new(Some("test.yaml".into()), 10, 2, 5, 8);
        assert_eq!(info.file, Some("test.yaml".into()));
        assert_eq!(info.offset, 10);
        assert_eq!(info.line, 2);
        assert_eq!(info.col, 5);
        assert_eq!(info.len, 8);
        assert_eq!(info.end_offset(), 18);
    }

    #[test]
    fn test_with_file() {
        let info = SourceInfo::default().with_file("test.yaml");
        assert_eq!(info.file, Some("test.yaml".into()));
    }

    #[test]
    fn test_display() {
        let info = SourceInfo::new(None, 0, 3, 4, 1);
        assert_eq!(info.to_string(), "line 3, column 4");
        assert_eq!(
            info.with_file("conf.yml").to_string(),
            "in \"conf.yml\", line 3, column 4"
        );
    }
}
