// tests/registry_tests.rs

use prune_lang::ast::{Arg, FunctionCall, ParseContext};
use prune_lang::registry::{Candidate, OverloadSet, bind_arguments};
use prune_lang::{
    CoreFunctions, Engine, FunctionDefinition, FunctionError, FunctionModule, FunctionRegistry, ParamType,
    ParameterShape, RegistrationStrategy, UnresolvedFunctionError, Value,
};

fn call(name: &str, args: Vec<Arg>) -> FunctionCall {
    FunctionCall::new(name, args, ParseContext::new(1, 1))
}

fn tagged(name: &str, input: ParamType, args: Vec<ParamType>, tag: &'static str) -> FunctionDefinition {
    FunctionDefinition::new(name, ParameterShape::new(input, args), move |_, _| Ok(Value::from(tag)))
}

fn run(registry: &FunctionRegistry, name: &str, input: Value, args: Vec<Value>) -> Value {
    let call = call(name, args.iter().cloned().map(Arg::Literal).collect());
    registry
        .resolve(&call, &input, &args)
        .unwrap()
        .invoke(&input, &args)
        .unwrap()
}

// ============================================================================
// Overload Resolution
// ============================================================================

#[test]
fn test_single_definition() {
    let mut registry = FunctionRegistry::new();
    registry.register([tagged("f", ParamType::String, vec![], "string")]);

    assert!(matches!(registry.overloads("f"), Some(OverloadSet::Single(_))));
    assert_eq!(run(&registry, "f", Value::from("x"), vec![]), Value::from("string"));
}

#[test]
fn test_overloads_accumulate_under_one_name() {
    let mut registry = FunctionRegistry::new();
    registry.register([
        tagged("f", ParamType::String, vec![], "string"),
        tagged("f", ParamType::Array, vec![], "array"),
    ]);

    let set = registry.overloads("f").unwrap();
    assert!(matches!(set, OverloadSet::Many(_)));
    assert_eq!(set.definitions().len(), 2);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_most_specific_overload_wins() {
    let mut registry = FunctionRegistry::new();
    registry.register([
        tagged("f", ParamType::Any, vec![], "any"),
        tagged("f", ParamType::Number, vec![], "number"),
        tagged("f", ParamType::Integer, vec![], "integer"),
    ]);

    assert_eq!(run(&registry, "f", Value::Integer(1), vec![]), Value::from("integer"));
    assert_eq!(run(&registry, "f", Value::Float(1.5), vec![]), Value::from("number"));
    assert_eq!(run(&registry, "f", Value::from("x"), vec![]), Value::from("any"));
}

#[test]
fn test_argument_types_count_towards_specificity() {
    let mut registry = FunctionRegistry::new();
    registry.register([
        tagged("f", ParamType::Any, vec![ParamType::Any], "loose"),
        tagged("f", ParamType::Any, vec![ParamType::String], "string arg"),
    ]);

    assert_eq!(
        run(&registry, "f", Value::Null, vec![Value::from("a")]),
        Value::from("string arg")
    );
    assert_eq!(run(&registry, "f", Value::Null, vec![Value::Integer(1)]), Value::from("loose"));
}

#[test]
fn test_equal_specificity_first_registered_wins() {
    let mut registry = FunctionRegistry::new();
    registry.register([
        tagged("f", ParamType::String, vec![ParamType::Any], "first"),
        tagged("f", ParamType::Any, vec![ParamType::String], "second"),
    ]);

    assert_eq!(run(&registry, "f", Value::from("x"), vec![Value::from("y")]), Value::from("first"));
}

#[test]
fn test_arity_selects_overload() {
    let mut registry = FunctionRegistry::new();
    registry.register([
        tagged("f", ParamType::Any, vec![], "none"),
        tagged("f", ParamType::Any, vec![ParamType::Any], "one"),
    ]);

    assert_eq!(run(&registry, "f", Value::Null, vec![]), Value::from("none"));
    assert_eq!(run(&registry, "f", Value::Null, vec![Value::Null]), Value::from("one"));
}

#[test]
fn test_object_parameter_accepts_records() {
    assert_eq!(ParamType::Object.specificity(&prune_lang::Record::new("T").into()), Some(3));
    assert_eq!(ParamType::Number.specificity(&Value::Integer(1)), Some(2));
    assert_eq!(ParamType::Integer.specificity(&Value::Float(1.0)), None);
}

#[test]
fn test_shape_display() {
    let shape = ParameterShape::new(ParamType::String, vec![ParamType::Integer, ParamType::Any]);
    assert_eq!(shape.to_string(), "string(integer, any)");
    assert_eq!(shape.arity(), 2);
}

// ============================================================================
// Resolution Errors
// ============================================================================

#[test]
fn test_unknown_name() {
    let registry = FunctionRegistry::new();
    let err = registry
        .resolve(&call("nope", vec![]), &Value::Null, &[])
        .unwrap_err();

    assert_eq!(
        err,
        UnresolvedFunctionError::UnknownName {
            name: "nope".into(),
            context: ParseContext::new(1, 1)
        }
    );
    assert_eq!(err.to_string(), "Unknown function 'nope' at line 1, column 1");
}

#[test]
fn test_no_matching_overload_reports_signature() {
    let mut registry = FunctionRegistry::new();
    registry.register([tagged("f", ParamType::String, vec![], "string")]);

    let args = [Value::Integer(3)];
    let err = registry
        .resolve(&call("f", vec![Arg::Literal(Value::Integer(3))]), &Value::Boolean(true), &args)
        .unwrap_err();

    assert_eq!(err.to_string(), "No overload of 'f' accepts boolean(integer) at line 1, column 1");
}

#[test]
fn test_bind_arguments() {
    let mut variables = prune_lang::Variables::new();
    variables.insert("sep".into(), Value::from("-"));

    let bound = bind_arguments(
        &call("join", vec![Arg::Variable("sep".into()), Arg::Literal(Value::Integer(1))]),
        Some(&variables),
    )
    .unwrap();
    assert_eq!(bound, vec![Value::from("-"), Value::Integer(1)]);
}

#[test]
fn test_bind_unbound_variable() {
    let err = bind_arguments(&call("join", vec![Arg::Variable("sep".into())]), None).unwrap_err();
    assert!(matches!(
        err,
        UnresolvedFunctionError::UnboundVariable { ref name, ref variable, .. } if name == "join" && variable == "sep"
    ));
}

// ============================================================================
// Modules and Strategies
// ============================================================================

struct TextModule;

impl FunctionModule for TextModule {
    fn name(&self) -> &str {
        "text"
    }

    fn candidates(&self) -> Vec<Candidate> {
        vec![
            Candidate::new(FunctionDefinition::new(
                "shout",
                ParameterShape::new(ParamType::String, vec![]),
                |input, _| match input {
                    Value::String(s) => Ok(Value::String(format!("{}!", s.to_uppercase()))),
                    other => Err(FunctionError::mismatch("string", other)),
                },
            ))
            .alias("yell")
            .exported(),
            Candidate::new(tagged("helper", ParamType::Any, vec![], "helper")),
            Candidate::new(tagged("internal", ParamType::Any, vec![], "internal"))
                .exported()
                .ignored(),
        ]
    }
}

#[test]
fn test_auto_strategy_skips_ignored() {
    let mut registry = FunctionRegistry::new();
    let registered = registry.register_module(&TextModule, RegistrationStrategy::Auto);

    assert_eq!(registered, 2);
    assert_eq!(registry.names(), vec!["helper", "shout", "yell"]);
}

#[test]
fn test_explicit_strategy_takes_exported_and_skips_ignored() {
    let mut registry = FunctionRegistry::new();
    let registered = registry.register_module(&TextModule, RegistrationStrategy::Explicit);

    assert_eq!(registered, 1);
    assert_eq!(registry.names(), vec!["shout", "yell"]);
}

#[test]
fn test_alias_resolves_to_same_function() {
    let mut registry = FunctionRegistry::new();
    registry.register_module(&TextModule, RegistrationStrategy::Auto);

    assert_eq!(run(&registry, "yell", Value::from("hi"), vec![]), Value::from("HI!"));
    assert_eq!(run(&registry, "shout", Value::from("hi"), vec![]), Value::from("HI!"));
}

#[test]
fn test_strategy_from_str() {
    assert_eq!("AUTO".parse::<RegistrationStrategy>().unwrap(), RegistrationStrategy::Auto);
    assert_eq!(" explicit ".parse::<RegistrationStrategy>().unwrap(), RegistrationStrategy::Explicit);
    assert!("manual".parse::<RegistrationStrategy>().is_err());
    assert_eq!(RegistrationStrategy::default(), RegistrationStrategy::Auto);
}

#[test]
fn test_core_functions_are_registered() {
    let mut registry = FunctionRegistry::new();
    registry.register_module(&CoreFunctions, RegistrationStrategy::Explicit);

    for name in ["reverse", "upper", "length", "size", "join", "default", "keys"] {
        assert!(registry.contains(name), "missing {}", name);
    }
}

#[test]
fn test_custom_module_through_engine() {
    let engine = Engine::builder()
        .module(TextModule, RegistrationStrategy::Explicit)
        .build()
        .unwrap();

    let mut doc = std::collections::BTreeMap::new();
    doc.insert("name".to_string(), Value::from("ada"));

    let result = engine.apply(&Value::Object(doc), "name.yell()").unwrap();
    assert_eq!(prune_lang::to_json(&result), r#"{"name":"ADA!"}"#);
}

#[test]
fn test_engine_without_core_functions() {
    let engine = Engine::builder().without_core_functions().build().unwrap();
    assert!(engine.registry().is_empty());
    assert!(engine.apply(&Value::from("x"), "a.upper()").is_ok());
}

#[test]
fn test_definitions_extend_core_overloads() {
    let engine = Engine::builder()
        .functions([tagged("reverse", ParamType::Boolean, vec![], "flipped")])
        .build()
        .unwrap();

    let mut doc = std::collections::BTreeMap::new();
    doc.insert("ok".to_string(), Value::Boolean(true));
    doc.insert("name".to_string(), Value::from("ab"));

    let result = engine.apply(&Value::Object(doc), "ok.reverse(),name.reverse()").unwrap();
    assert_eq!(prune_lang::to_json(&result), r#"{"name":"ba","ok":"flipped"}"#);
}
