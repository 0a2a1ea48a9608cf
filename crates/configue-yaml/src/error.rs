//! Error types for YAML parsing with source locations.

use crate::SourceInfo;
use thiserror::Error;

/// Result type alias for configue-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during YAML parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error reported by the scanner.
    #[error("Parse error: {message}{}", describe(.location))]
    ParseError {
        message: String,
        location: Option<SourceInfo>,
    },

    /// Event stream did not form a valid tree (unbalanced start/end events,
    /// alias to an unknown anchor, ...).
    #[error("Invalid YAML structure: {message}{}", describe(.location))]
    InvalidStructure {
        message: String,
        location: Option<SourceInfo>,
    },
}

impl Error {
    /// Attach a filename to the location of a scanner error.
    pub(crate) fn with_file(self, filename: Option<&str>) -> Self {
        match (self, filename) {
            (
                Error::ParseError {
                    message,
                    location: Some(location),
                },
                Some(file),
            ) => Error::ParseError {
                message,
                location: Some(location.with_file(file)),
            },
            (error, _) => error,
        }
    }
}

fn describe(location: &Option<SourceInfo>) -> String {
    match location {
        Some(location) => format!(" ({location})"),
        None => String::new(),
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        let marker = err.marker();
        Error::ParseError {
            message: err.info().to_string(),
            location: Some(SourceInfo::from_marker(marker, 0)),
        }
    }
}
