//! Function registry: name to overload set, with call-time resolution.
//!
//! Filters only name functions. A call is resolved each time it runs by
//! looking up the overloads registered under its name and picking the one
//! whose parameter shape fits the input and the arguments best.
//!
//! Functions reach the registry two ways:
//!
//! - [`FunctionRegistry::register`] takes ready-made definitions.
//! - [`FunctionRegistry::register_module`] takes a [`FunctionModule`] that
//!   declares candidates, and a [`RegistrationStrategy`] that decides which
//!   of them are registered.

use std::{collections::HashMap, fmt, slice, str::FromStr, sync::Arc};

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{Arg, FunctionCall, ParseContext},
    config::ConfigurationError,
    context::Variables,
    value::Value,
};

/// A function call that has no registered implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnresolvedFunctionError {
    #[error("Unknown function '{name}' at {context}")]
    UnknownName { name: String, context: ParseContext },

    #[error("No overload of '{name}' accepts {signature} at {context}")]
    NoMatchingOverload {
        name: String,
        signature: String,
        context: ParseContext,
    },

    #[error("Unbound variable '@{variable}' in call to '{name}' at {context}")]
    UnboundVariable {
        name: String,
        variable: String,
        context: ParseContext,
    },
}

impl UnresolvedFunctionError {
    /// Name of the function that failed to resolve
    pub fn name(&self) -> &str {
        match self {
            UnresolvedFunctionError::UnknownName { name, .. }
            | UnresolvedFunctionError::NoMatchingOverload { name, .. }
            | UnresolvedFunctionError::UnboundVariable { name, .. } => name,
        }
    }

    /// Where the call appears in the filter
    pub fn context(&self) -> ParseContext {
        match self {
            UnresolvedFunctionError::UnknownName { context, .. }
            | UnresolvedFunctionError::NoMatchingOverload { context, .. }
            | UnresolvedFunctionError::UnboundVariable { context, .. } => *context,
        }
    }
}

/// Failure inside a function body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0}")]
    Invalid(String),
}

impl FunctionError {
    pub fn mismatch(expected: &'static str, actual: &Value) -> Self {
        FunctionError::TypeMismatch {
            expected,
            actual: actual.type_name(),
        }
    }
}

/// Type accepted at one parameter position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Any,
    Null,
    Boolean,
    Integer,
    /// Integers and floats
    Number,
    String,
    Array,
    /// Objects and records
    Object,
}

impl ParamType {
    /// How closely `value` fits: 3 for the exact type, 2 for an integer
    /// passed as a number, 1 for `Any`, `None` when it does not fit.
    pub fn specificity(self, value: &Value) -> Option<u32> {
        use ParamType as P;

        match (self, value) {
            (P::Any, _) => Some(1),
            (P::Number, Value::Integer(_)) => Some(2),
            (P::Number, Value::Float(_))
            | (P::Null, Value::Null)
            | (P::Boolean, Value::Boolean(_))
            | (P::Integer, Value::Integer(_))
            | (P::String, Value::String(_))
            | (P::Array, Value::Array(_))
            | (P::Object, Value::Object(_) | Value::Record(_)) => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Any => "any",
            ParamType::Null => "null",
            ParamType::Boolean => "boolean",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// The input type plus the types of the explicit arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterShape {
    pub input: ParamType,
    pub args: Vec<ParamType>,
}

impl ParameterShape {
    pub fn new(input: ParamType, args: Vec<ParamType>) -> Self {
        ParameterShape { input, args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Summed specificity over the input and every argument, or `None` when
    /// the arity differs or any position does not fit
    pub fn specificity(&self, input: &Value, args: &[Value]) -> Option<u32> {
        if args.len() != self.args.len() {
            return None;
        }

        let mut total = self.input.specificity(input)?;
        for (param, arg) in self.args.iter().zip(args) {
            total += param.specificity(arg)?;
        }
        Some(total)
    }
}

impl fmt::Display for ParameterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.input, args.join(", "))
    }
}

pub type Invoke = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// One overload of a named function
#[derive(Clone)]
pub struct FunctionDefinition {
    name: String,
    shape: ParameterShape,
    invoke: Invoke,
}

impl FunctionDefinition {
    pub fn new<F>(name: impl Into<String>, shape: ParameterShape, invoke: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        FunctionDefinition {
            name: name.into(),
            shape,
            invoke: Arc::new(invoke),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &ParameterShape {
        &self.shape
    }

    pub fn invoke(&self, input: &Value, args: &[Value]) -> Result<Value, FunctionError> {
        (self.invoke)(input, args)
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

/// Every overload registered under one name
#[derive(Debug, Clone)]
pub enum OverloadSet {
    Single(FunctionDefinition),
    Many(Vec<FunctionDefinition>),
}

impl OverloadSet {
    fn push(self, definition: FunctionDefinition) -> Self {
        match self {
            OverloadSet::Single(first) => OverloadSet::Many(vec![first, definition]),
            OverloadSet::Many(mut all) => {
                all.push(definition);
                OverloadSet::Many(all)
            }
        }
    }

    /// Overloads in registration order
    pub fn definitions(&self) -> &[FunctionDefinition] {
        match self {
            OverloadSet::Single(definition) => slice::from_ref(definition),
            OverloadSet::Many(definitions) => definitions,
        }
    }

    /// The most specific overload accepting `input` and `args`. Ties go to
    /// the first registered.
    pub fn resolve(&self, input: &Value, args: &[Value]) -> Option<&FunctionDefinition> {
        match self {
            OverloadSet::Single(definition) => definition
                .shape
                .specificity(input, args)
                .map(|_| definition),
            OverloadSet::Many(definitions) => {
                let mut best: Option<(u32, &FunctionDefinition)> = None;
                for definition in definitions {
                    if let Some(score) = definition.shape.specificity(input, args)
                        && best.is_none_or(|(top, _)| score > top)
                    {
                        best = Some((score, definition));
                    }
                }
                best.map(|(_, definition)| definition)
            }
        }
    }
}

/// Which candidates of a [`FunctionModule`] are registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationStrategy {
    /// Every candidate not marked ignored
    #[default]
    Auto,
    /// Only candidates marked exported and not ignored
    Explicit,
}

impl FromStr for RegistrationStrategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(RegistrationStrategy::Auto),
            "explicit" => Ok(RegistrationStrategy::Explicit),
            _ => Err(ConfigurationError::UnknownStrategy(s.to_string())),
        }
    }
}

/// A function offered by a module for registration
#[derive(Debug, Clone)]
pub struct Candidate {
    pub definition: FunctionDefinition,
    pub aliases: Vec<String>,
    pub exported: bool,
    pub ignored: bool,
}

impl Candidate {
    pub fn new(definition: FunctionDefinition) -> Self {
        Candidate {
            definition,
            aliases: Vec::new(),
            exported: false,
            ignored: false,
        }
    }

    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    fn is_registered_by(&self, strategy: RegistrationStrategy) -> bool {
        match strategy {
            RegistrationStrategy::Auto => !self.ignored,
            RegistrationStrategy::Explicit => self.exported && !self.ignored,
        }
    }
}

/// A declared list of candidate functions
pub trait FunctionModule {
    fn name(&self) -> &str;

    fn candidates(&self) -> Vec<Candidate>;
}

/// Bind a call's arguments, reading `@variables` from `variables`
pub fn bind_arguments(
    call: &FunctionCall,
    variables: Option<&Variables>,
) -> Result<Vec<Value>, UnresolvedFunctionError> {
    call.args
        .iter()
        .map(|arg| match arg {
            Arg::Literal(value) => Ok(value.clone()),
            Arg::Variable(variable) => variables
                .and_then(|vars| vars.get(variable))
                .cloned()
                .ok_or_else(|| UnresolvedFunctionError::UnboundVariable {
                    name: call.name.clone(),
                    variable: variable.clone(),
                    context: call.context,
                }),
        })
        .collect()
}

/// Registered functions by name.
///
/// Built before first use and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, OverloadSet>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add definitions under their own names
    pub fn register<I>(&mut self, definitions: I)
    where
        I: IntoIterator<Item = FunctionDefinition>,
    {
        for definition in definitions {
            let name = definition.name.clone();
            self.insert(name, definition);
        }
    }

    /// Add the candidates of `module` that `strategy` selects. Returns the
    /// number of candidates registered.
    pub fn register_module(&mut self, module: &dyn FunctionModule, strategy: RegistrationStrategy) -> usize {
        let mut registered = 0;

        for candidate in module.candidates() {
            if !candidate.is_registered_by(strategy) {
                continue;
            }

            for alias in &candidate.aliases {
                self.insert(alias.clone(), candidate.definition.clone());
            }
            let name = candidate.definition.name.clone();
            self.insert(name, candidate.definition);
            registered += 1;
        }

        debug!(
            module = module.name(),
            ?strategy,
            registered,
            "registered function module"
        );
        registered
    }

    fn insert(&mut self, name: String, definition: FunctionDefinition) {
        let set = match self.functions.remove(&name) {
            Some(existing) => existing.push(definition),
            None => OverloadSet::Single(definition),
        };
        self.functions.insert(name, set);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn overloads(&self, name: &str) -> Option<&OverloadSet> {
        self.functions.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Pick the overload of `call` for `input` and already-bound `args`
    pub fn resolve(
        &self,
        call: &FunctionCall,
        input: &Value,
        args: &[Value],
    ) -> Result<&FunctionDefinition, UnresolvedFunctionError> {
        let set = self
            .functions
            .get(&call.name)
            .ok_or_else(|| UnresolvedFunctionError::UnknownName {
                name: call.name.clone(),
                context: call.context,
            })?;

        set.resolve(input, args)
            .ok_or_else(|| UnresolvedFunctionError::NoMatchingOverload {
                name: call.name.clone(),
                signature: signature(input, args),
                context: call.context,
            })
    }
}

fn signature(input: &Value, args: &[Value]) -> String {
    let args: Vec<&str> = args.iter().map(Value::type_name).collect();
    format!("{}({})", input.type_name(), args.join(", "))
}
