//! Run prune filters against JSON input

use super::{CliError, json_to_value, value_to_json};
use crate::{Config, Engine, RequestContext, compile};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The filter to apply
    pub filter: String,
    /// JSON input string
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// View used for records; defaults to the base view
    pub view: Option<String>,
    /// `name=value` variable bindings
    pub vars: Vec<String>,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Filter applied successfully with JSON output
    Success(serde_json::Value),
}

/// Split `name=value`. The value is read as JSON when it parses, otherwise
/// it is taken as a string.
fn parse_variable(binding: &str) -> Result<(String, crate::Value), CliError> {
    let (name, raw) = binding
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| CliError::InvalidVariable(binding.to_string()))?;

    let value = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => json_to_value(json),
        Err(_) => crate::Value::String(raw.to_string()),
    };

    Ok((name.trim().to_string(), value))
}

/// Execute a prune check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        compile(&options.filter)?;
        return Ok(CheckResult::SyntaxValid);
    }

    let mut ctx = RequestContext::new();
    for binding in &options.vars {
        let (name, value) = parse_variable(binding)?;
        ctx.set_variable(name, value);
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let json_value: serde_json::Value = serde_json::from_str(json_str)?;
    let input_value = json_to_value(json_value);

    let mut config = Config::default();
    if let Some(view) = &options.view {
        config.default_view = view.clone();
    }
    let engine = Engine::builder().config(config).build()?;

    let tree = engine.compile(&options.filter)?;
    let result = engine.project_in(&input_value, &tree, &engine.config().default_view, &ctx)?;

    Ok(CheckResult::Success(value_to_json(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_projects_input() {
        let options = CheckOptions {
            filter: "id,name[upper()]".into(),
            input: Some(r#"{"id": 1, "name": "ada", "token": "x"}"#.into()),
            ..Default::default()
        };

        match execute_check(&options).unwrap() {
            CheckResult::Success(output) => assert_eq!(output, json!({"id": 1, "name": "ADA"})),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_variables_bind_names() {
        let options = CheckOptions {
            filter: "@field".into(),
            input: Some(r#"{"a": 1, "b": 2}"#.into()),
            vars: vec!["field=b".into()],
            ..Default::default()
        };

        match execute_check(&options).unwrap() {
            CheckResult::Success(output) => assert_eq!(output, json!({"b": 2})),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_bad_variable_binding() {
        assert!(matches!(parse_variable("novalue"), Err(CliError::InvalidVariable(_))));
        assert!(matches!(parse_variable("=1"), Err(CliError::InvalidVariable(_))));
    }
}
