//! Per-request state passed explicitly into projection.
//!
//! A [`RequestContext`] lives for one logical request. It carries the
//! variables that `@name` patterns and arguments resolve against, and a cache
//! of filter text already resolved for each consuming type. Nothing here is
//! global or thread-local. Dropping the context discards the cache.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::value::Value;

/// Variable bindings for `@name` references
pub type Variables = BTreeMap<String, Value>;

/// Supplies the filter text for a consuming type, e.g. from a query string.
pub trait FilterSource {
    fn filter_for(&self, type_key: &str) -> Option<String>;
}

impl<F> FilterSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn filter_for(&self, type_key: &str) -> Option<String> {
        self(type_key)
    }
}

/// The same filter for every type
#[derive(Debug, Clone)]
pub struct StaticFilter(pub String);

impl FilterSource for StaticFilter {
    fn filter_for(&self, _type_key: &str) -> Option<String> {
        Some(self.0.clone())
    }
}

#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    variables: Variables,
    resolved: HashMap<String, Option<String>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Resolve the filter for `type_key`, asking `source` only once per request.
    ///
    /// `default` is used when the source has nothing for the type.
    pub fn resolve_filter(
        &mut self,
        type_key: &str,
        source: &dyn FilterSource,
        default: Option<&str>,
    ) -> Option<String> {
        if let Some(filter) = self.resolved.get(type_key) {
            return filter.clone();
        }

        let filter = source
            .filter_for(type_key)
            .or_else(|| default.map(str::to_string));
        trace!(type_key, filter = ?filter, "resolved request filter");

        self.resolved.insert(type_key.to_string(), filter.clone());
        filter
    }

    /// Forget resolved filters, keeping variables
    pub fn clear_resolved(&mut self) {
        self.resolved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_source_is_consulted_once_per_type() {
        let calls = Cell::new(0);
        let source = |key: &str| {
            calls.set(calls.get() + 1);
            (key == "User").then(|| "id,name".to_string())
        };

        let mut ctx = RequestContext::new();
        assert_eq!(ctx.resolve_filter("User", &source, None), Some("id,name".into()));
        assert_eq!(ctx.resolve_filter("User", &source, None), Some("id,name".into()));
        assert_eq!(ctx.resolve_filter("Order", &source, Some("id")), Some("id".into()));
        assert_eq!(ctx.resolve_filter("Order", &source, Some("id")), Some("id".into()));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_contexts_do_not_share_resolutions() {
        let mut first = RequestContext::new();
        first.resolve_filter("User", &StaticFilter("id".into()), None);

        let mut second = RequestContext::new();
        let resolved = second.resolve_filter("User", &StaticFilter("name".into()), None);
        assert_eq!(resolved, Some("name".into()));
    }
}
