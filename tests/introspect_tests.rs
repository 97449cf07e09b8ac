// tests/introspect_tests.rs

use std::collections::BTreeSet;

use prune_lang::introspect::{BASE_VIEW, FULL_VIEW, Introspector};
use prune_lang::{
    Config, Describe, Engine, Error, IntrospectionError, PropertySchema, Record, TypeSchema, Value, to_json,
};

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn account() -> TypeSchema {
    TypeSchema::new("Account")
        .property(PropertySchema::new("id"))
        .property(PropertySchema::new("login").renamed("username"))
        .property(PropertySchema::new("email").in_view("private"))
        .property(PropertySchema::new("hash").in_view("admin"))
        .property(PropertySchema::new("notes").in_view("private").in_view("admin"))
}

fn introspector(config: Config) -> Introspector {
    let mut introspector = Introspector::new(&config);
    introspector.register(account());
    introspector
}

// ============================================================================
// View Tables
// ============================================================================

#[test]
fn test_base_view_holds_unviewed_properties() {
    let table = introspector(Config::default()).introspect("Account").unwrap();
    assert_eq!(table.properties_in_view(BASE_VIEW), set(&["id", "username"]));
}

#[test]
fn test_views_inherit_base() {
    let table = introspector(Config::default()).introspect("Account").unwrap();

    assert_eq!(table.properties_in_view("private"), set(&["email", "id", "notes", "username"]));
    assert_eq!(table.properties_in_view("admin"), set(&["hash", "id", "notes", "username"]));
}

#[test]
fn test_views_without_inheritance() {
    let config = Config {
        include_base_in_views: false,
        ..Config::default()
    };
    let table = introspector(config).introspect("Account").unwrap();

    assert_eq!(table.properties_in_view("private"), set(&["email", "notes"]));
    assert_eq!(table.properties_in_view(BASE_VIEW), set(&["id", "username"]));
}

#[test]
fn test_detail_view_with_and_without_base() {
    for (include_base, detail) in [(true, set(&["a", "b"])), (false, set(&["b"]))] {
        let config = Config {
            include_base_in_views: include_base,
            ..Config::default()
        };
        let mut introspector = Introspector::new(&config);
        introspector.register(
            TypeSchema::new("T")
                .property(PropertySchema::new("a"))
                .property(PropertySchema::new("b").in_view("detail")),
        );

        let table = introspector.introspect("T").unwrap();
        assert_eq!(table.properties_in_view("detail"), detail, "include_base = {}", include_base);
        assert_eq!(table.properties_in_view(FULL_VIEW), set(&["a", "b"]));
    }
}

#[test]
fn test_undeclared_full_view_is_everything() {
    let table = introspector(Config::default()).introspect("Account").unwrap();

    assert!(!table.has_view(FULL_VIEW));
    assert_eq!(
        table.properties_in_view(FULL_VIEW),
        set(&["email", "hash", "id", "notes", "username"])
    );
}

#[test]
fn test_declared_full_view_always_absorbs_base() {
    let config = Config {
        include_base_in_views: false,
        ..Config::default()
    };
    let mut introspector = Introspector::new(&config);
    introspector.register(
        TypeSchema::new("T")
            .property(PropertySchema::new("a"))
            .property(PropertySchema::new("b").in_view(FULL_VIEW))
            .property(PropertySchema::new("c").in_view("other")),
    );

    let table = introspector.introspect("T").unwrap();
    assert_eq!(table.properties_in_view(FULL_VIEW), set(&["a", "b"]));
}

#[test]
fn test_unknown_view_is_empty() {
    let table = introspector(Config::default()).introspect("Account").unwrap();
    assert!(table.properties_in_view("nope").is_empty());
}

#[test]
fn test_renamed_properties_map_to_declared_names() {
    let table = introspector(Config::default()).introspect("Account").unwrap();

    assert_eq!(table.declared_name("username"), Some("login"));
    assert_eq!(table.declared_name("login"), None);
}

#[test]
fn test_view_names() {
    let table = introspector(Config::default()).introspect("Account").unwrap();
    let mut names: Vec<&str> = table.view_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["admin", "base", "private"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_type() {
    let err = introspector(Config::default()).introspect("Ghost").unwrap_err();
    assert_eq!(
        err,
        IntrospectionError::UnknownType {
            type_name: "Ghost".into()
        }
    );
    assert_eq!(err.type_name(), "Ghost");
}

#[test]
fn test_duplicate_external_name() {
    let mut introspector = Introspector::new(&Config::default());
    introspector.register(
        TypeSchema::new("T")
            .property(PropertySchema::new("name"))
            .property(PropertySchema::new("title").renamed("name")),
    );

    let err = introspector.introspect("T").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot introspect type 'T': properties 'name' and 'title' are both exposed as 'name'"
    );
}

#[test]
fn test_empty_property_name() {
    let mut introspector = Introspector::new(&Config::default());
    introspector.register(
        TypeSchema::new("T")
            .property(PropertySchema::new("a"))
            .property(PropertySchema::new("")),
    );

    assert!(matches!(
        introspector.introspect("T"),
        Err(IntrospectionError::EmptyPropertyName { index: 1, .. })
    ));
}

#[test]
fn test_failures_are_not_cached() {
    let introspector = introspector(Config::default());
    assert!(introspector.introspect("Ghost").is_err());
    assert!(introspector.introspect("Ghost").is_err());
    assert_eq!(introspector.cache_stats().size, 0);
}

// ============================================================================
// Describe
// ============================================================================

struct Order;

impl Describe for Order {
    fn schema() -> TypeSchema {
        TypeSchema::new("Order")
            .property(PropertySchema::new("id"))
            .property(PropertySchema::new("total").in_view("detail"))
            .property(PropertySchema::new("customer").unwrapped())
    }
}

struct Customer;

impl Describe for Customer {
    fn schema() -> TypeSchema {
        TypeSchema::new("Customer")
            .property(PropertySchema::new("customer_name").renamed("customerName"))
            .property(PropertySchema::new("phone").in_view("detail"))
    }
}

fn order() -> Value {
    Record::new("Order")
        .with("id", 9)
        .with("total", 12.5)
        .with("customer", Record::new("Customer").with("customer_name", "Ada").with("phone", "555"))
        .into()
}

fn engine() -> Engine {
    Engine::builder()
        .describe::<Order>()
        .describe::<Customer>()
        .build()
        .unwrap()
}

#[test]
fn test_describe_registers_type() {
    let mut introspector = Introspector::new(&Config::default());
    introspector.register_type::<Order>();

    assert!(introspector.is_registered("Order"));
    let table = introspector.introspect("Order").unwrap();
    assert!(table.is_unwrapped("customer"));
}

// ============================================================================
// Projection of Records
// ============================================================================

#[test]
fn test_records_project_with_base_view() {
    assert_eq!(to_json(&engine().apply(&order(), "*").unwrap()), r#"{"customerName":"Ada","id":9}"#);
}

#[test]
fn test_projection_in_named_view() {
    let engine = engine();
    let tree = engine.compile("*").unwrap();
    let result = engine.project(&order(), &tree, "detail").unwrap();

    assert_eq!(
        to_json(&result),
        r#"{"customerName":"Ada","id":9,"phone":"555","total":12.5}"#
    );
}

#[test]
fn test_view_selector() {
    assert_eq!(
        to_json(&engine().apply(&order(), "id,detail").unwrap()),
        r#"{"customerName":"Ada","id":9,"phone":"555","total":12.5}"#
    );
}

#[test]
fn test_negation_beats_view_selector() {
    assert_eq!(
        to_json(&engine().apply(&order(), "id,detail,-total").unwrap()),
        r#"{"customerName":"Ada","id":9,"phone":"555"}"#
    );
}

#[test]
fn test_full_view_selector() {
    assert_eq!(
        to_json(&engine().apply(&order(), "full").unwrap()),
        r#"{"customerName":"Ada","id":9,"phone":"555","total":12.5}"#
    );
}

#[test]
fn test_renamed_property_selected_by_external_name() {
    assert_eq!(
        to_json(&engine().apply(&order(), "customerName").unwrap()),
        r#"{"customerName":"Ada"}"#
    );
    assert_eq!(to_json(&engine().apply(&order(), "customer_name").unwrap()), "{}");
}

#[test]
fn test_records_nested_in_objects() {
    let mut doc = std::collections::BTreeMap::new();
    doc.insert("order".to_string(), order());
    doc.insert("page".to_string(), Value::Integer(1));

    assert_eq!(
        to_json(&engine().apply(&Value::Object(doc), "order{id}").unwrap()),
        r#"{"order":{"id":9}}"#
    );
}

#[test]
fn test_whole_record_uses_base_view() {
    let mut doc = std::collections::BTreeMap::new();
    doc.insert("order".to_string(), order());

    assert_eq!(
        to_json(&engine().apply(&Value::Object(doc), "order").unwrap()),
        r#"{"order":{"customerName":"Ada","id":9}}"#
    );
}

#[test]
fn test_empty_block_on_record_keeps_no_fields() {
    let mut doc = std::collections::BTreeMap::new();
    doc.insert("order".to_string(), order());
    doc.insert("page".to_string(), Value::Integer(1));

    assert_eq!(
        to_json(&engine().apply(&Value::Object(doc), "order{},page").unwrap()),
        r#"{"order":{},"page":1}"#
    );
}

#[test]
fn test_unknown_record_type_is_an_error_when_strict() {
    let record: Value = Record::new("Ghost").with("a", 1).into();
    let err = engine().apply(&record, "a").unwrap_err();
    assert!(matches!(err, Error::Eval(prune_lang::EvalError::Introspection(_))));
}

#[test]
fn test_unknown_record_type_is_an_object_when_lenient() {
    let config = Config {
        strict: false,
        ..Config::default()
    };
    let engine = Engine::builder().config(config).build().unwrap();
    let record: Value = Record::new("Ghost").with("a", 1).with("b", 2).into();

    assert_eq!(to_json(&engine.apply(&record, "a").unwrap()), r#"{"a":1}"#);
}
