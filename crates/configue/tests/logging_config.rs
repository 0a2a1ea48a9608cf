//! The logging hook installs a process-wide subscriber, so it gets a test
//! binary of its own.

use configue::{Environment, LoadOptions, Registry, load};
use std::path::Path;
use tracing::Level;

#[test]
fn test_logging_config() {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test-fixtures")
        .join("test_file_2.yml");
    let mut registry = Registry::new();
    registry.insert("test.CONSTANT", "constant");

    let result = load(
        fixture,
        "const",
        LoadOptions::new()
            .registry(registry)
            .environment(Environment::empty())
            .logging_config_path("logging_config"),
    )
    .unwrap();
    assert_eq!(result.as_str(), Some("constant"));

    assert!(tracing::enabled!(target: "configue::loader", Level::DEBUG));
    assert!(!tracing::enabled!(target: "configue::loader", Level::TRACE));
}
