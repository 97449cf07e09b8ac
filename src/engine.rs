//! The [`Engine`] facade: compile, cache and project in one place.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::FilterTree,
    cache::{Cache, CacheStats},
    config::{Config, ConfigurationError},
    context::{FilterSource, RequestContext, Variables},
    evaluator::{EvalError, Evaluator},
    functions::CoreFunctions,
    introspect::{Describe, IntrospectionError, Introspector, TypeSchema},
    parser::{self, ParseError},
    registry::{FunctionDefinition, FunctionModule, FunctionRegistry, RegistrationStrategy, UnresolvedFunctionError},
    value::Value,
};

/// Any error the engine can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error(transparent)]
    Unresolved(#[from] UnresolvedFunctionError),
}

/// Builds an [`Engine`].
///
/// Functions and schemas are fixed once the engine is built.
pub struct EngineBuilder {
    config: Config,
    definitions: Vec<FunctionDefinition>,
    modules: Vec<(Box<dyn FunctionModule>, RegistrationStrategy)>,
    core_functions: bool,
    schemas: Vec<TypeSchema>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        EngineBuilder {
            config: Config::default(),
            definitions: Vec::new(),
            modules: Vec::new(),
            core_functions: true,
            schemas: Vec::new(),
        }
    }
}

impl EngineBuilder {
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Register ready-made definitions
    pub fn functions(mut self, definitions: impl IntoIterator<Item = FunctionDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Register the candidates of a module that `strategy` selects
    pub fn module(mut self, module: impl FunctionModule + 'static, strategy: RegistrationStrategy) -> Self {
        self.modules.push((Box::new(module), strategy));
        self
    }

    /// Leave out the built-in [`CoreFunctions`]
    pub fn without_core_functions(mut self) -> Self {
        self.core_functions = false;
        self
    }

    pub fn schema(mut self, schema: TypeSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn describe<T: Describe>(self) -> Self {
        self.schema(T::schema())
    }

    /// Build the engine. Every registered schema is introspected up front, so
    /// a malformed schema fails here rather than mid-projection.
    pub fn build(self) -> Result<Engine, Error> {
        if self.config.default_view.trim().is_empty() {
            return Err(ConfigurationError::EmptyDefaultView.into());
        }

        let mut registry = FunctionRegistry::new();
        if self.core_functions {
            registry.register_module(&CoreFunctions, RegistrationStrategy::Auto);
        }
        for (module, strategy) in &self.modules {
            registry.register_module(module.as_ref(), *strategy);
        }
        registry.register(self.definitions);

        let mut introspector = Introspector::new(&self.config);
        let type_names: Vec<String> = self.schemas.iter().map(|s| s.type_name.clone()).collect();
        for schema in self.schemas {
            introspector.register(schema);
        }
        for type_name in &type_names {
            introspector.introspect(type_name)?;
        }

        debug!(
            functions = registry.len(),
            types = type_names.len(),
            node_cache = %self.config.node_cache,
            introspector_cache = %self.config.introspector_cache,
            "built engine"
        );

        Ok(Engine {
            filters: Cache::new("filters", self.config.node_cache.clone()),
            config: self.config,
            registry,
            introspector,
        })
    }
}

/// Compiles filters and projects values through them.
///
/// An engine is read-only after [`EngineBuilder::build`] apart from its
/// caches, and can be shared between threads.
///
/// # Examples
///
/// ```
/// use prune_lang::{Engine, Value};
/// use std::collections::BTreeMap;
///
/// let engine = Engine::builder().build().unwrap();
///
/// let mut doc = BTreeMap::new();
/// doc.insert("id".to_string(), Value::Integer(1));
/// doc.insert("name".to_string(), Value::from("abc"));
/// doc.insert("secret".to_string(), Value::from("x"));
///
/// let result = engine.apply(&Value::Object(doc), "id,name[reverse()]").unwrap();
/// assert_eq!(prune_lang::to_json(&result), r#"{"id":1,"name":"cba"}"#);
/// ```
pub struct Engine {
    config: Config,
    registry: FunctionRegistry,
    introspector: Introspector,
    filters: Cache<String, FilterTree>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn introspector(&self) -> &Introspector {
        &self.introspector
    }

    /// Compile `filter`, reusing the tree compiled earlier for the same text
    pub fn compile(&self, filter: &str) -> Result<Arc<FilterTree>, ParseError> {
        self.filters
            .get_or_try_insert_with(filter.to_string(), || parser::compile(filter))
    }

    fn evaluator<'e>(&'e self, variables: Option<&'e Variables>) -> Evaluator<'e> {
        let evaluator = Evaluator::new(&self.registry, &self.introspector).strict(self.config.strict);
        match variables {
            Some(variables) => evaluator.with_variables(variables),
            None => evaluator,
        }
    }

    /// Project `value` through `tree`, records using `view`
    pub fn project(&self, value: &Value, tree: &FilterTree, view: &str) -> Result<Value, EvalError> {
        self.evaluator(None).project(value, tree, view)
    }

    /// Like [`Engine::project`], resolving `@variables` from `ctx`
    pub fn project_in(
        &self,
        value: &Value,
        tree: &FilterTree,
        view: &str,
        ctx: &RequestContext,
    ) -> Result<Value, EvalError> {
        self.evaluator(Some(ctx.variables())).project(value, tree, view)
    }

    /// Compile `filter` and project `value` with the default view
    pub fn apply(&self, value: &Value, filter: &str) -> Result<Value, Error> {
        let tree = self.compile(filter)?;
        Ok(self.project(value, &tree, &self.config.default_view)?)
    }

    /// Resolve the filter for `type_key` through the request, then project.
    ///
    /// No filter, or a plain `**`, returns the value unfiltered with records
    /// turned into objects.
    pub fn apply_in(
        &self,
        value: &Value,
        type_key: &str,
        source: &dyn FilterSource,
        ctx: &mut RequestContext,
    ) -> Result<Value, Error> {
        let Some(filter) = ctx.resolve_filter(type_key, source, None) else {
            return Ok(self.evaluator(None).whole(value)?);
        };

        let tree = self.compile(&filter)?;
        if tree.is_include_all() {
            return Ok(self.evaluator(None).whole(value)?);
        }

        Ok(self.project_in(value, &tree, &self.config.default_view, ctx)?)
    }

    pub fn filter_cache_stats(&self) -> CacheStats {
        self.filters.stats()
    }

    pub fn introspector_cache_stats(&self) -> CacheStats {
        self.introspector.cache_stats()
    }
}
