use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use thiserror::Error;
use tracing::{trace, warn};

use crate::{
    ast::{FilterTree, FunctionCall, Name, ParseContext},
    context::Variables,
    frontier::{Frontier, Next, Resolution},
    introspect::{BASE_VIEW, FULL_VIEW, IntrospectionError, Introspector, ViewTable},
    registry::{FunctionError, FunctionRegistry, UnresolvedFunctionError, bind_arguments},
    value::{Record, Value},
};

/// Errors raised while projecting a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A function call has no matching registry entry
    #[error(transparent)]
    Unresolved(#[from] UnresolvedFunctionError),

    /// A function ran and failed
    #[error("Function '{name}' failed at {context}: {source}")]
    Function {
        name: String,
        context: ParseContext,
        #[source]
        source: FunctionError,
    },

    /// A record's type could not be introspected
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),
}

/// One field offered to a frontier
struct Candidate<'v> {
    name: String,
    value: &'v Value,
    /// Named by a view selector such as `detail` in `id,detail`
    by_view: bool,
}

/// Walks a value in lock-step with a compiled filter.
///
/// The evaluator borrows everything it needs and holds no state of its own,
/// so one value can be projected by many evaluators at once.
pub struct Evaluator<'e> {
    registry: &'e FunctionRegistry,
    introspector: &'e Introspector,
    variables: Option<&'e Variables>,
    strict: bool,
}

impl<'e> Evaluator<'e> {
    pub fn new(registry: &'e FunctionRegistry, introspector: &'e Introspector) -> Self {
        Evaluator {
            registry,
            introspector,
            variables: None,
            strict: true,
        }
    }

    /// Bindings for `@name` patterns and arguments
    pub fn with_variables(mut self, variables: &'e Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    /// In lenient mode unresolved calls leave values unchanged and records of
    /// unknown types project as plain objects. Both log a warning.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Project `value` through every stage of `tree`, records using `view`.
    ///
    /// Each stage projects the output of the one before it.
    pub fn project(&self, value: &Value, tree: &FilterTree, view: &str) -> Result<Value, EvalError> {
        let mut output: Option<Value> = None;

        for stage in 0..tree.stage_count() {
            let frontier = Frontier::new(tree.stage(stage));
            let input = output.as_ref().unwrap_or(value);
            output = Some(self.project_value(input, &frontier, view)?);
        }

        match output {
            Some(projected) => Ok(projected),
            None => self.whole(value),
        }
    }

    /// Copy `value` unfiltered, turning records into objects with their base
    /// view
    pub fn whole(&self, value: &Value) -> Result<Value, EvalError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.whole(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = BTreeMap::new();
                for (key, field) in map {
                    out.insert(key.clone(), self.whole(field)?);
                }
                Ok(Value::Object(out))
            }
            Value::Record(record) => {
                let mut out = BTreeMap::new();
                for candidate in self.record_candidates(record, BASE_VIEW, None)? {
                    out.insert(candidate.name, self.whole(candidate.value)?);
                }
                Ok(Value::Object(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn project_value(&self, value: &Value, frontier: &Frontier<'_>, view: &str) -> Result<Value, EvalError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.project_value(item, frontier, view))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let candidates = map.iter().map(|(key, field)| Candidate {
                    name: key.clone(),
                    value: field,
                    by_view: false,
                });
                self.project_fields(candidates, frontier, view)
            }
            Value::Record(record) => {
                let candidates = self.record_candidates(record, view, Some(frontier))?;
                self.project_fields(candidates, frontier, view)
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn project_fields<'v>(
        &self,
        candidates: impl IntoIterator<Item = Candidate<'v>>,
        frontier: &Frontier<'_>,
        view: &str,
    ) -> Result<Value, EvalError> {
        let mut out = BTreeMap::new();

        for candidate in candidates {
            let (node, next) = match frontier.resolve(&candidate.name, self.variables) {
                Resolution::Included(selection) => (Some(selection.node), frontier.next(selection.node)),
                Resolution::Unmatched if candidate.by_view => (None, Next::Whole),
                _ => {
                    trace!(field = %candidate.name, "excluded");
                    continue;
                }
            };

            let mut projected = match next {
                Next::Stop => shell(candidate.value),
                Next::Whole => self.whole(candidate.value)?,
                Next::Descend(child) => self.project_value(candidate.value, &child, view)?,
            };
            let mut key = candidate.name;

            if let Some(node) = node {
                for call in node.value_functions() {
                    projected = self.call(call, projected)?;
                }
                for call in node.key_functions() {
                    key = self.call_key(call, key)?;
                }
            }

            out.insert(key, projected);
        }

        Ok(Value::Object(out))
    }

    /// View table of a record's type. `None` in lenient mode when the type
    /// has no schema.
    fn table(&self, record: &Record) -> Result<Option<Arc<ViewTable>>, EvalError> {
        match self.introspector.introspect(&record.type_name) {
            Ok(table) => Ok(Some(table)),
            Err(IntrospectionError::UnknownType { type_name }) if !self.strict => {
                warn!(type_name = %type_name, "no schema registered, projecting record as a plain object");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fields of `record` visible under `view`, keyed by external name, with
    /// unwrapped properties replaced by their own fields
    fn record_candidates<'v>(
        &self,
        record: &'v Record,
        view: &str,
        frontier: Option<&Frontier<'_>>,
    ) -> Result<Vec<Candidate<'v>>, EvalError> {
        let Some(table) = self.table(record)? else {
            return Ok(record
                .fields
                .iter()
                .map(|(name, value)| Candidate {
                    name: name.clone(),
                    value,
                    by_view: false,
                })
                .collect());
        };

        let visible = table.properties_in_view(view);
        let mut by_view = BTreeSet::new();

        for node in frontier.map(Frontier::explicit).unwrap_or_default() {
            if let Name::Exact(name) = node.name()
                && !node.is_negated()
                && (table.has_view(name) || name == FULL_VIEW)
            {
                by_view.extend(table.properties_in_view(name));
            }
        }

        let mut candidates = Vec::new();

        for external in visible.union(&by_view) {
            let Some(value) = table
                .declared_name(external)
                .and_then(|declared| record.fields.get(declared))
            else {
                continue;
            };
            let from_view = !visible.contains(external);

            if !table.is_unwrapped(external) {
                candidates.push(Candidate {
                    name: external.clone(),
                    value,
                    by_view: by_view.contains(external),
                });
                continue;
            }

            match value {
                Value::Record(inner) => {
                    for mut spliced in self.record_candidates(inner, view, frontier)? {
                        spliced.by_view |= from_view;
                        candidates.push(spliced);
                    }
                }
                Value::Object(map) => candidates.extend(map.iter().map(|(name, value)| Candidate {
                    name: name.clone(),
                    value,
                    by_view: from_view,
                })),
                _ => trace!(property = %external, "unwrapped property has no fields"),
            }
        }

        Ok(candidates)
    }

    fn call(&self, call: &FunctionCall, input: Value) -> Result<Value, EvalError> {
        let args = match bind_arguments(call, self.variables) {
            Ok(args) => args,
            Err(e) => return self.unresolved(e, input),
        };

        let definition = match self.registry.resolve(call, &input, &args) {
            Ok(definition) => definition,
            Err(e) => return self.unresolved(e, input),
        };

        definition
            .invoke(&input, &args)
            .map_err(|source| EvalError::Function {
                name: call.name.clone(),
                context: call.context,
                source,
            })
    }

    /// Run a key function. It must return a string.
    fn call_key(&self, call: &FunctionCall, key: String) -> Result<String, EvalError> {
        match self.call(call, Value::String(key))? {
            Value::String(renamed) => Ok(renamed),
            other => Err(EvalError::Function {
                name: call.name.clone(),
                context: call.context,
                source: FunctionError::mismatch("string", &other),
            }),
        }
    }

    fn unresolved(&self, error: UnresolvedFunctionError, input: Value) -> Result<Value, EvalError> {
        if self.strict {
            return Err(error.into());
        }
        warn!(function = error.name(), at = %error.context(), "skipping unresolved function");
        Ok(input)
    }
}

/// A field selected with an empty block (`owner{}`): objects and records
/// keep none of their fields, arrays keep their length
fn shell(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Record(_) => Value::Object(BTreeMap::new()),
        Value::Array(items) => Value::Array(items.iter().map(shell).collect()),
        scalar => scalar.clone(),
    }
}
