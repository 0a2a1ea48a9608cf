//! Integration tests for configue using test fixtures.

use configue::{
    ArgumentError, Callable, ConfigueError, Environment, Instance, LoadOptions, Loader, Mapping,
    Object, Registry, Value, load,
};
use serde_json::json;
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug)]
struct MyObject {
    my_key: Value,
    my_other_key: Option<Value>,
}

impl Object for MyObject {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "my_key" => Some(self.my_key.clone()),
            "my_other_key" => Some(self.my_other_key.clone().unwrap_or(Value::Null)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Counted {
    label: String,
}

impl Object for Counted {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "label" => Some(Value::from(self.label.as_str())),
            "upper" => Some(Value::from(self.label.to_uppercase())),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("port {0} out of range")]
struct PortOutOfRange(i64);

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

/// Registry with the symbols the fixtures refer to. Every `test.Counter`
/// construction bumps `counter`.
fn registry(counter: &Rc<Cell<usize>>) -> Registry {
    let mut registry = Registry::new();

    registry.constructor("test.MyObject", |args| {
        Ok(Instance::new(MyObject {
            my_key: args.required("my_key")?,
            my_other_key: args.optional("my_other_key")?,
        })
        .into())
    });

    let count = Rc::clone(counter);
    registry.constructor("test.Counter", move |args| {
        count.set(count.get() + 1);
        Ok(Instance::new(Counted {
            label: args.required("label")?,
        })
        .into())
    });

    registry.constructor("test.Port", |args| {
        let port: i64 = args.required("port")?;
        if port > 65535 {
            return Err(PortOutOfRange(port).into());
        }
        Ok(Value::Int(port))
    });

    registry.insert("test.CONSTANT", "constant");
    registry.insert(
        "test.Color",
        Mapping::from_values([("RED", Value::from("red")), ("BLUE", Value::from("blue"))]),
    );
    registry.insert(
        "test.Static",
        Callable::new("test.Static", |_| Ok(Value::Null)).with_member(
            "get_static_value",
            Callable::new("test.Static.get_static_value", |_| Ok(Value::from("foo"))),
        ),
    );
    registry
}

fn options(environment: Environment) -> LoadOptions {
    LoadOptions::new()
        .registry(registry(&Rc::new(Cell::new(0))))
        .environment(environment)
}

fn loader(counter: &Rc<Cell<usize>>) -> Loader {
    Loader::with_options(registry(counter), Environment::empty())
}

fn get(value: &Value, key: &str) -> Value {
    value.as_mapping().unwrap().get(key).unwrap()
}

#[test]
fn test_load_file_shares_object_instances() {
    let result = load(
        fixture_path("test_file_1.yml"),
        "key1",
        options(Environment::empty()),
    )
    .unwrap();
    let subkey4 = get(&result, "subkey4");

    let subkey1 = get(&result, "subkey1");
    assert!(subkey1.as_mapping().is_some());
    assert!(subkey1.ptr_eq(&get(&subkey4, "subkey5")));
    assert!(subkey1.ptr_eq(&get(&subkey4, "subkey6")));

    let subkey2 = get(&result, "subkey2");
    assert!(subkey2.ptr_eq(&get(&subkey4, "subkey7")));
    assert!(subkey2.ptr_eq(&get(&subkey4, "subkey8")));
    let object = subkey2.downcast::<MyObject>().unwrap();
    assert_eq!(object.my_key.as_str(), Some("my_value"));
    assert!(object.my_other_key.as_ref().unwrap().ptr_eq(&subkey1));

    let subkey3 = get(&result, "subkey3");
    assert!(matches!(subkey3, Value::List(_)));
    assert!(subkey3.ptr_eq(&get(&subkey4, "subkey9")));
    assert!(subkey3.ptr_eq(&get(&subkey4, "subkey10")));
}

#[test]
fn test_load_deep_path() {
    let result = load(
        fixture_path("test_file_1.yml"),
        "key1.subkey3.1",
        options(Environment::empty()),
    )
    .unwrap();
    assert_eq!(result.as_str(), Some("item2"));
}

#[test]
fn test_load_list_path() {
    let result = load(
        fixture_path("test_file_1.yml"),
        ["key1", "sub.key.5"],
        options(Environment::empty()),
    )
    .unwrap();
    assert_eq!(result.as_str(), Some("final_value"));
}

#[test]
fn test_load_without_path() {
    let result = load(
        fixture_path("test_file_1.yml"),
        "",
        options(Environment::empty()),
    )
    .unwrap();
    let keys: Vec<&str> = result.as_mapping().unwrap().keys().collect();
    assert_eq!(keys, vec!["key1", "key2", "env"]);
}

#[test]
fn test_load_with_env_vars() {
    let load_env = |environment: Environment| {
        load(fixture_path("test_file_1.yml"), "env", options(environment))
            .unwrap()
            .to_json()
            .unwrap()
    };

    assert_eq!(
        load_env(Environment::empty()),
        json!({
            "env_key1": null,
            "env_key2": null,
            "env_key3": "",
            "env_key4": null,
            "env_key5": "default-value",
            "env_key6": 123,
            "env_key7": "123",
            "env_key8": "prepost",
            "env_key9": null,
            "env_key10": null,
        })
    );

    assert_eq!(
        load_env(Environment::empty().with_var("ENV_VAR", "my_value")),
        json!({
            "env_key1": "my_value",
            "env_key2": "my_value",
            "env_key3": "my_value",
            "env_key4": "my_value",
            "env_key5": "my_value",
            "env_key6": "my_value",
            "env_key7": "my_value",
            "env_key8": "premy_valuepost",
            "env_key9": "my_value",
            "env_key10": "my_value",
        })
    );

    assert_eq!(
        load_env(Environment::empty().with_var("ENV_VAR", "321")),
        json!({
            "env_key1": 321,
            "env_key2": 321,
            "env_key3": "321",
            "env_key4": 321,
            "env_key5": 321,
            "env_key6": 321,
            "env_key7": "321",
            "env_key8": "pre321post",
            "env_key9": 321,
            "env_key10": 321,
        })
    );
}

#[test]
fn test_load_with_imports() {
    let result = load(
        fixture_path("test_file_2.yml"),
        "key1",
        options(Environment::empty().with_var("ENV_VAR", "test_file_1")),
    )
    .unwrap();

    let value1 = get(&result, "value1");
    assert!(value1.ptr_eq(&get(&result, "value2")));
    assert!(value1.ptr_eq(&get(&result, "value3")));

    let subkey1 = get(&get(&value1, "key1"), "subkey1");
    assert_eq!(get(&subkey1, "other_key").as_str(), Some("other_value"));

    let value4 = get(&result, "value4");
    assert_eq!(get(&value4, "other_key").as_str(), Some("other_value"));
    assert!(value4.ptr_eq(&subkey1));
}

#[test]
fn test_load_with_invalid_class_fails() {
    let err = load(
        fixture_path("test_file_2.yml"),
        "invalid_class",
        options(Environment::empty()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigueError::NotCallable { kind: "string", .. }));
}

#[test]
fn test_load_invalid_subpath_fails() {
    for path in [
        "key1.subkey1.other_key.unknown_key",
        "key1.subkey1.unknown_key",
        "key1.subkey3.3",
        "key1.subkey3.unknown_key",
    ] {
        let err = load(
            fixture_path("test_file_1.yml"),
            path,
            options(Environment::empty()),
        )
        .unwrap_err();
        assert!(
            matches!(err, ConfigueError::SubPathNotFound { .. }),
            "{path}: {err}"
        );
    }
}

#[test]
fn test_load_invalid_import_fails() {
    let err = load(
        fixture_path("test_file_2.yml"),
        "invalid_import",
        options(Environment::empty()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigueError::SubPathNotFound { .. }));
}

#[test]
fn test_load_external_value() {
    let result = load(
        fixture_path("test_file_2.yml"),
        "const",
        options(Environment::empty()),
    )
    .unwrap();
    assert_eq!(result.as_str(), Some("constant"));
}

#[test]
fn test_paths() {
    let result = load(
        fixture_path("test_file_2.yml"),
        "paths",
        options(Environment::empty()),
    )
    .unwrap();
    let home = dirs::home_dir().unwrap();
    let fixtures = fixture_path("").canonicalize().unwrap();

    assert!(get(&result, "path").is_null());
    assert_eq!(get(&result, "path2").as_str(), home.to_str());
    assert!(get(&result, "path3").is_null());
    assert_eq!(
        get(&result, "relative").as_str(),
        fixtures.join("data/file.txt").to_str()
    );
    assert_eq!(
        get(&result, "home_file").as_str(),
        home.join("file.txt").to_str()
    );
}

#[test]
fn test_construction_happens_at_most_once() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("test_file_1.yml")).unwrap();

    // Load paths walk through constructor arguments without building.
    let label = document.load("key2.counted.label").unwrap();
    assert_eq!(label.as_str(), Some("counted"));
    assert_eq!(counter.get(), 0);

    let first = document.load("key2.first").unwrap();
    let second = document.load("key2.second").unwrap();
    let counted = document.load("key2.counted").unwrap();
    assert!(first.ptr_eq(&second));
    assert!(first.ptr_eq(&counted));
    assert_eq!(counter.get(), 1);

    let label = document.load("key2.counted.label").unwrap();
    assert_eq!(label.as_str(), Some("counted"));
    assert_eq!(counted.downcast::<Counted>().unwrap().label, "counted");
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_load_path_reads_attributes_of_built_objects() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader
        .document_from_str("obj:\n  (): test.Counter\n  label: l\n")
        .unwrap();

    // Arguments are read without building the object.
    assert_eq!(document.load("obj.label").unwrap().as_str(), Some("l"));
    assert_eq!(counter.get(), 0);

    // `upper` only exists on the built object.
    assert_eq!(document.load("obj.upper").unwrap().as_str(), Some("L"));
    assert_eq!(counter.get(), 1);
    assert_eq!(document.load("obj.upper").unwrap().as_str(), Some("L"));
    assert_eq!(counter.get(), 1);

    let err = document.load("obj.unknown").unwrap_err();
    assert!(matches!(err, ConfigueError::SubPathNotFound { .. }), "{err}");
}

#[test]
fn test_load_path_result_does_not_depend_on_load_order() {
    let source = "obj:\n  (): test.Counter\n  label: l\nref: cfg://obj.upper\n";

    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let fresh = loader.document_from_str(source).unwrap();
    let direct = fresh.load("obj.upper").unwrap();

    let built = loader.document_from_str(source).unwrap();
    assert_eq!(built.load("ref").unwrap().as_str(), Some("L"));
    let after_build = built.load("obj.upper").unwrap();

    assert_eq!(direct.as_str(), after_build.as_str());
    assert_eq!(counter.get(), 2);
}

#[test]
fn test_aliases_share_the_anchored_object() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader
        .document_from_str(
            "a: &x {(): test.Counter, label: l}\nb: *x\nitems: [*x, *x]\nplain: &p {k: v}\ncopy: *p\n",
        )
        .unwrap();

    let a = document.load("a").unwrap();
    let b = document.load("b").unwrap();
    assert!(a.ptr_eq(&b));
    assert!(a.ptr_eq(&document.load("items.0").unwrap()));
    assert!(a.ptr_eq(&document.load("items.1").unwrap()));
    assert_eq!(counter.get(), 1);

    let plain = document.load("plain").unwrap();
    assert!(plain.ptr_eq(&document.load("copy").unwrap()));
}

#[test]
fn test_escaped_marker_is_not_constructed() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("test_file_1.yml")).unwrap();

    let escaped = document.load("key2.escaped").unwrap();
    let mapping = escaped.as_mapping().unwrap();
    assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["()", "my_key"]);
    assert_eq!(mapping.get("()").unwrap().as_str(), Some("test.MyObject"));
    assert_eq!(mapping.get("my_key").unwrap().as_str(), Some("not_built"));
}

#[test]
fn test_static_member_and_namespace_lookup() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("test_file_1.yml")).unwrap();

    assert_eq!(document.load("key2.static").unwrap().as_str(), Some("foo"));
    assert_eq!(document.load("key2.color").unwrap().as_str(), Some("red"));
}

#[test]
fn test_reference_forms() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("references.yml")).unwrap();

    let forms = document.load("forms").unwrap();
    assert_eq!(get(&forms, "by_index").as_str(), Some("first"));
    assert_eq!(get(&forms, "by_bracket_key").as_str(), Some("value"));
    assert_eq!(get(&forms, "by_dot_key").as_str(), Some("value"));
    assert_eq!(get(&forms, "by_digit_key").as_str(), Some("zero"));

    assert_eq!(
        document.resolve("cfg://list[1]").unwrap().as_str(),
        Some("second")
    );

    for path in ["malformed.empty", "malformed.trailing_dot"] {
        let err = document.load(path).unwrap_err();
        assert!(
            matches!(err, ConfigueError::MalformedReference { .. }),
            "{path}: {err}"
        );
    }
    for path in ["missing.key", "missing.index"] {
        let err = document.load(path).unwrap_err();
        assert!(
            matches!(err, ConfigueError::SubPathNotFound { .. }),
            "{path}: {err}"
        );
    }
}

#[test]
fn test_tuple_and_list_tags() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("references.yml")).unwrap();

    let tuple = document.load("tuple").unwrap();
    assert!(matches!(tuple, Value::Tuple(_)));
    assert_eq!(tuple.to_json().unwrap(), json!([1, "two", 3.0]));

    let list = document.load("plain_list").unwrap();
    assert!(matches!(list, Value::List(_)));
    assert_eq!(list.to_json().unwrap(), json!([1, "two", 3.0]));

    let csv = document.load("csv").unwrap();
    assert_eq!(csv.to_json().unwrap(), json!(["a", "b", "c"]));
    assert_eq!(document.load("empty_csv").unwrap().to_json().unwrap(), json!([]));

    assert_eq!(document.load("quoted_number").unwrap().as_str(), Some("12"));
}

#[test]
fn test_cycles_are_rejected() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("references.yml")).unwrap();

    let err = document.load("cycle.a.b").unwrap_err();
    assert!(matches!(err, ConfigueError::Recursion { .. }));
    // The failed conversion is not cached: a second attempt fails the same way.
    let err = document.load("cycle.a.c").unwrap_err();
    assert!(matches!(err, ConfigueError::Recursion { .. }));

    let err = document.load("self_cycle").unwrap_err();
    assert!(matches!(err, ConfigueError::Recursion { .. }));

    let err = load(
        fixture_path("references.yml"),
        "cycle",
        options(Environment::empty()),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigueError::Recursion { .. }));
}

#[test]
fn test_sibling_argument_and_attribute_references() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(fixture_path("references.yml")).unwrap();

    let sibling = document.load("sibling").unwrap();
    let sibling = sibling.downcast::<MyObject>().unwrap();
    assert_eq!(sibling.my_key.as_str(), Some("shared"));
    assert_eq!(
        sibling.my_other_key.as_ref().and_then(Value::as_str),
        Some("shared")
    );

    let read = document.load("attribute.read").unwrap();
    assert_eq!(read.as_str(), Some("inner"));
    let target = document.load("attribute.target").unwrap();
    assert!(target.downcast::<MyObject>().is_some());
}

#[test]
fn test_load_from_json() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document_from_json(&json!({
        "my_object": {
            "()": "test.MyObject",
            "my_key": "my_value",
            "my_other_key": {
                "()": "test.MyObject",
                "my_key": "my_sub_value",
            },
        },
        "my_other_object": "cfg://my_object",
        "escaped": {
            "\\()": "test.MyObject",
            "my_key": "my_value",
        },
        "constant": "ext://test.CONSTANT",
        "my_list": ["my_first_value", {"my_sub_list_key": "my_sub_list_value"}],
    }));

    let object = document.load("my_object").unwrap();
    assert!(object.ptr_eq(&document.load("my_other_object").unwrap()));
    let object = object.downcast::<MyObject>().unwrap();
    assert_eq!(object.my_key.as_str(), Some("my_value"));
    let nested = object.my_other_key.as_ref().unwrap();
    assert_eq!(
        nested.downcast::<MyObject>().unwrap().my_key.as_str(),
        Some("my_sub_value")
    );

    let escaped = document.load("escaped").unwrap();
    assert_eq!(get(&escaped, "()").as_str(), Some("test.MyObject"));
    assert_eq!(
        document.load("constant").unwrap().as_str(),
        Some("constant")
    );
    assert_eq!(
        document.load("my_list").unwrap().to_json().unwrap(),
        json!(["my_first_value", {"my_sub_list_key": "my_sub_list_value"}])
    );
}

#[test]
fn test_constructor_errors_keep_their_source() {
    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader
        .document_from_str("port: {(): test.Port, port: 70000}\nmissing: {(): test.Port}")
        .unwrap();

    let err = document.load("port").unwrap_err();
    assert!(matches!(
        err.constructor_error::<PortOutOfRange>(),
        Some(PortOutOfRange(70000))
    ));
    insta::assert_snapshot!(err.to_string(), @r#"Constructor "test.Port" failed (line 1, column 7): port 70000 out of range"#);

    let err = document.load("missing").unwrap_err();
    assert!(matches!(
        err.constructor_error::<ArgumentError>(),
        Some(ArgumentError::Missing { .. })
    ));
}

#[test]
fn test_sub_path_error_message() {
    let loader = Loader::with_options(Registry::new(), Environment::empty());
    let document = loader
        .document_from_str("dict: {key: value}\nmissing: cfg://dict.unknown")
        .unwrap();

    let err = document.load("missing").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @r#"Sub path "dict.unknown" not found: no key "unknown" (line 1, column 7)"#);
}

#[test]
fn test_imports_share_documents() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(
        dir.path().join("main.yml"),
        "child: !import sub/child.yml\nshared: !import shared.yml\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("sub/child.yml"),
        "shared: !import ../shared.yml\npath: !path data.txt\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("shared.yml"),
        "object:\n  (): test.Counter\n  label: shared\n",
    )
    .unwrap();

    let counter = Rc::new(Cell::new(0));
    let loader = loader(&counter);
    let document = loader.document(dir.path().join("main.yml")).unwrap();

    let through_child = document.load("child.shared.object").unwrap();
    let direct = document.load("shared.object").unwrap();
    assert!(through_child.ptr_eq(&direct));
    assert_eq!(counter.get(), 1);
    assert_eq!(loader.document_count(), 3);

    let root = dir.path().canonicalize().unwrap();
    assert_eq!(
        document.load("child.path").unwrap().as_str(),
        root.join("sub").join("data.txt").to_str()
    );
}

#[test]
fn test_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.yml"), "a: [1, 2\n").unwrap();
    fs::write(dir.path().join("main.yml"), "other: !import missing.yml\n").unwrap();

    let loader = Loader::with_options(Registry::new(), Environment::empty());
    let err = loader.document(dir.path().join("broken.yml")).unwrap_err();
    assert!(matches!(err, ConfigueError::Parse(_)));

    let document = loader.document(dir.path().join("main.yml")).unwrap();
    let err = document.load("other").unwrap_err();
    assert!(matches!(err, ConfigueError::Io { .. }));
}

#[test]
fn test_values_outliving_their_document() {
    let value = {
        let loader = Loader::with_options(Registry::new(), Environment::empty());
        let document = loader.document_from_str("a: cfg://b\nb: 1\nc: plain").unwrap();
        document.load("").unwrap()
    };
    let mapping = value.as_mapping().unwrap();
    assert_eq!(mapping.get("c").unwrap().as_str(), Some("plain"));
    assert!(matches!(
        mapping.get("a"),
        Err(ConfigueError::DocumentReleased)
    ));
}
