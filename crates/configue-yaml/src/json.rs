//! Build RawNode trees from already-parsed JSON values.

use crate::{RawEntry, RawNode, RawNodeKind, Scalar, ScalarStyle, SourceInfo};
use serde_json::Value;
use std::rc::Rc;

/// Convert a JSON value into a RawNode tree.
///
/// JSON strings become double-quoted scalars so they are never re-typed;
/// numbers, booleans and null become plain scalars that resolve back to the
/// same value. Nodes carry a default [`SourceInfo`] since there is no source
/// text to point at.
pub fn from_json(value: &Value) -> Rc<RawNode> {
    let source_info = SourceInfo::default();
    let kind = match value {
        Value::Null => RawNodeKind::Scalar(Scalar::plain("null")),
        Value::Bool(b) => RawNodeKind::Scalar(Scalar::plain(b.to_string())),
        Value::Number(n) => RawNodeKind::Scalar(Scalar::plain(n.to_string())),
        Value::String(s) => RawNodeKind::Scalar(Scalar::new(s.clone(), ScalarStyle::DoubleQuoted)),
        Value::Array(items) => RawNodeKind::Sequence(items.iter().map(from_json).collect()),
        Value::Object(map) => RawNodeKind::Mapping(
            map.iter()
                .map(|(key, value)| RawEntry {
                    key: Rc::new(RawNode::scalar(
                        Scalar::new(key.clone(), ScalarStyle::DoubleQuoted),
                        SourceInfo::default(),
                    )),
                    value: from_json(value),
                })
                .collect(),
        ),
    };
    Rc::new(RawNode::new(kind, source_info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yaml_rust2::Yaml;

    #[test]
    fn test_from_json_types() {
        let root = from_json(&json!({
            "name": "123",
            "port": 8080,
            "ratio": 0.5,
            "debug": true,
            "extra": null,
            "hosts": ["a", "b"]
        }));

        let resolve = |key: &str| root.get(key).unwrap().as_scalar().unwrap().resolve();
        assert_eq!(resolve("name"), Yaml::String("123".into()));
        assert_eq!(resolve("port"), Yaml::Integer(8080));
        assert_eq!(resolve("ratio"), Yaml::Real("0.5".into()));
        assert_eq!(resolve("debug"), Yaml::Boolean(true));
        assert_eq!(resolve("extra"), Yaml::Null);
        assert_eq!(root.get("hosts").unwrap().len(), 2);
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let root = from_json(&json!({"zeta": 1, "alpha": 2, "mid": 3}));

        let keys: Vec<&str> = root
            .as_mapping()
            .unwrap()
            .iter()
            .map(|entry| entry.key.as_scalar().unwrap().text.as_str())
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }
}
