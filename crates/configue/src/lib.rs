//! Declarative configuration for YAML and JSON files.
//!
//! A configuration file describes a graph of values and objects. Objects are
//! built from mappings carrying the construct marker `"()"`, values can
//! refer to each other through `cfg://` references, and every conversion
//! happens lazily, the first time a value is read.
//!
//! # Key Features
//!
//! - **Construct marker**: `{"()": "pkg.Type", arg: 1}` calls the constructor
//!   registered as `pkg.Type` with the named argument `arg`
//! - **Identity sharing**: every node converts at most once, so two
//!   references to the same node see the same object
//! - **References**: `cfg://a.b[0]` points into the same document,
//!   `ext://pkg.NAME` at a registered symbol
//! - **Tags**: `!cfg`, `!ext`, `!path`, `!import`, `!list`, `!tuple`
//! - **Environment**: `${NAME}` and `${NAME-default}` in any scalar
//! - **Cycle detection**: a node that needs itself fails with
//!   [`ConfigueError::Recursion`]
//!
//! # Example
//!
//! ```rust
//! use configue::{Instance, Loader, Object, Registry, Environment};
//!
//! #[derive(Debug)]
//! struct Server {
//!     port: i64,
//! }
//!
//! impl Object for Server {}
//!
//! let mut registry = Registry::new();
//! registry.constructor("app.Server", |args| {
//!     Ok(Instance::new(Server { port: args.required("port")? }).into())
//! });
//!
//! let loader = Loader::with_options(registry, Environment::empty());
//! let document = loader
//!     .document_from_str(
//!         r#"
//! server:
//!   (): app.Server
//!   port: 8080
//! primary: cfg://server
//! "#,
//!     )
//!     .unwrap();
//!
//! let server = document.load("server").unwrap();
//! let primary = document.load("primary").unwrap();
//! assert!(server.ptr_eq(&primary));
//! assert_eq!(server.downcast::<Server>().unwrap().port, 8080);
//! ```

mod callable;
mod dispatch;
mod document;
mod env;
mod error;
mod lazy;
mod loader;
mod logging;
mod reference;
mod registry;
mod tag;
mod value;

pub use callable::{ArgumentError, Arguments, Callable, FromValue};
pub use dispatch::{CONSTRUCTOR_KEY, ESCAPED_CONSTRUCTOR_KEY};
pub use document::Document;
pub use env::Environment;
pub use error::{BoxError, ConfigueError, Result};
pub use lazy::{Mapping, Sequence};
pub use loader::{LoadOptions, Loader, load};
pub use logging::{LogFormat, LoggingConfig};
pub use reference::{PathExpression, Segment};
pub use registry::Registry;
pub use value::{Instance, Object, Value};

// Re-export for convenience
pub use configue_yaml::SourceInfo;
