//! Error types for configuration loading.

use configue_yaml::SourceInfo;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for configue operations.
pub type Result<T> = std::result::Result<T, ConfigueError>;

/// Error type returned by constructor callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while loading or converting a configuration.
#[derive(Debug, Error)]
pub enum ConfigueError {
    /// A `cfg://` expression or load path could not be parsed.
    #[error("Malformed reference {reference:?}: {reason}")]
    MalformedReference { reference: String, reason: String },

    /// A key or index along a path does not exist.
    #[error("Sub path {path:?} not found: {reason}{}", describe(.location))]
    SubPathNotFound {
        path: String,
        reason: String,
        location: Option<SourceInfo>,
    },

    /// No registered symbol matches any prefix of a constructor path, or a
    /// trailing member does not exist.
    #[error("Could not resolve {path:?}{}", describe(.location))]
    ConstructorNotFound {
        path: String,
        location: Option<SourceInfo>,
    },

    /// The construct marker resolved to something that cannot be invoked.
    #[error("Expected a callable for {path:?} but found a {kind}{}", describe(.location))]
    NotCallable {
        path: String,
        kind: &'static str,
        location: Option<SourceInfo>,
    },

    /// A node was re-entered while it was being converted.
    #[error("Cyclic reference: node is already being converted{}", describe(.location))]
    Recursion { location: Option<SourceInfo> },

    /// A constructor callable rejected its arguments.
    #[error("Constructor {path:?} failed{}: {source}", describe(.location))]
    Constructor {
        path: String,
        location: Option<SourceInfo>,
        #[source]
        source: BoxError,
    },

    /// The construct marker value is not a string.
    #[error("Construct marker must be a dotted path string, found a {found}{}", describe(.location))]
    InvalidConstructPath {
        found: &'static str,
        location: Option<SourceInfo>,
    },

    /// A configuration tag was used on a node it does not apply to.
    #[error("Invalid use of tag {tag}: {reason}{}", describe(.location))]
    InvalidTag {
        tag: String,
        reason: String,
        location: Option<SourceInfo>,
    },

    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] configue_yaml::Error),

    /// A lazy value needed its document after the loader was dropped.
    #[error("The document backing this value is no longer loaded")]
    DocumentReleased,

    /// The logging configuration could not be applied.
    #[error("Invalid logging configuration: {message}")]
    Logging { message: String },
}

impl ConfigueError {
    /// Source location of the node that caused the error, if known.
    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            ConfigueError::SubPathNotFound { location, .. }
            | ConfigueError::ConstructorNotFound { location, .. }
            | ConfigueError::NotCallable { location, .. }
            | ConfigueError::Recursion { location }
            | ConfigueError::Constructor { location, .. }
            | ConfigueError::InvalidConstructPath { location, .. }
            | ConfigueError::InvalidTag { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// The error a constructor callable returned, if this is a
    /// [`ConfigueError::Constructor`] wrapping an `E`.
    pub fn constructor_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            ConfigueError::Constructor { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    pub(crate) fn sub_path_not_found(
        path: impl Into<String>,
        reason: impl Into<String>,
        location: Option<&SourceInfo>,
    ) -> Self {
        ConfigueError::SubPathNotFound {
            path: path.into(),
            reason: reason.into(),
            location: location.cloned(),
        }
    }

    pub(crate) fn malformed(reference: &str, reason: impl Into<String>) -> Self {
        ConfigueError::MalformedReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

fn describe(location: &Option<SourceInfo>) -> String {
    match location {
        Some(location) => format!(" ({location})"),
        None => String::new(),
    }
}
