//! Type introspection: which properties a record type exposes under each view.
//!
//! Types describe themselves with a [`TypeSchema`], either through the
//! [`Describe`] trait or by registering a schema for a type name. The
//! [`Introspector`] turns a schema into a frozen [`ViewTable`] once per type
//! and caches it.
//!
//! View rules:
//!
//! - A property that declares no view belongs to [`BASE_VIEW`] (unless
//!   `add_unviewed_to_base` is off).
//! - With `include_base_in_views` on, every declared view also contains the
//!   base properties.
//! - [`FULL_VIEW`] always contains the base properties. When no property
//!   declares it, it holds every property.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use thiserror::Error;
use tracing::debug;

use crate::{
    cache::{Cache, CacheStats},
    config::Config,
};

pub const BASE_VIEW: &str = "base";
pub const FULL_VIEW: &str = "full";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    #[error("Cannot introspect type '{type_name}': no schema registered")]
    UnknownType { type_name: String },

    #[error(
        "Cannot introspect type '{type_name}': properties '{first}' and '{second}' are both exposed as '{external}'"
    )]
    DuplicateProperty {
        type_name: String,
        external: String,
        first: String,
        second: String,
    },

    #[error("Cannot introspect type '{type_name}': property {index} has an empty name")]
    EmptyPropertyName { type_name: String, index: usize },
}

impl IntrospectionError {
    pub fn type_name(&self) -> &str {
        match self {
            IntrospectionError::UnknownType { type_name }
            | IntrospectionError::DuplicateProperty { type_name, .. }
            | IntrospectionError::EmptyPropertyName { type_name, .. } => type_name,
        }
    }
}

/// Description of one property of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySchema {
    /// Declared name, the key in [`Record::fields`](crate::value::Record)
    pub name: String,

    /// External name, overriding the declared one
    pub rename: Option<String>,

    /// Views the property belongs to
    pub views: Vec<String>,

    /// Whether the property's own fields are flattened into the parent
    pub unwrapped: bool,
}

impl PropertySchema {
    pub fn new(name: impl Into<String>) -> Self {
        PropertySchema {
            name: name.into(),
            rename: None,
            views: Vec::new(),
            unwrapped: false,
        }
    }

    pub fn renamed(mut self, external: impl Into<String>) -> Self {
        self.rename = Some(external.into());
        self
    }

    pub fn in_view(mut self, view: impl Into<String>) -> Self {
        self.views.push(view.into());
        self
    }

    pub fn unwrapped(mut self) -> Self {
        self.unwrapped = true;
        self
    }

    pub fn external_name(&self) -> &str {
        match &self.rename {
            Some(rename) if !rename.is_empty() => rename,
            _ => &self.name,
        }
    }
}

/// Description of a record type's properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSchema {
    pub type_name: String,
    pub properties: Vec<PropertySchema>,
}

impl TypeSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        TypeSchema {
            type_name: type_name.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: PropertySchema) -> Self {
        self.properties.push(property);
        self
    }
}

/// Implemented by types that can describe their own properties.
///
/// # Examples
///
/// ```
/// use prune_lang::introspect::{Describe, PropertySchema, TypeSchema};
///
/// struct User;
///
/// impl Describe for User {
///     fn schema() -> TypeSchema {
///         TypeSchema::new("User")
///             .property(PropertySchema::new("id"))
///             .property(PropertySchema::new("email").in_view("private"))
///     }
/// }
/// ```
pub trait Describe {
    fn schema() -> TypeSchema;
}

/// Frozen view layout of one type. Names are external property names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTable {
    type_name: String,
    views: HashMap<String, BTreeSet<String>>,
    unwrapped: BTreeSet<String>,
    declared: BTreeMap<String, String>,
}

impl ViewTable {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// A declared view, as stored
    pub fn view(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.views.get(name)
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn view_names(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    /// Properties visible under `view`. An undeclared full view is every
    /// property; any other undeclared view is empty.
    pub fn properties_in_view(&self, view: &str) -> BTreeSet<String> {
        match self.views.get(view) {
            Some(names) => names.clone(),
            None if view == FULL_VIEW => self.declared.keys().cloned().collect(),
            None => BTreeSet::new(),
        }
    }

    pub fn is_unwrapped(&self, external: &str) -> bool {
        self.unwrapped.contains(external)
    }

    pub fn unwrapped(&self) -> &BTreeSet<String> {
        &self.unwrapped
    }

    /// Declared name of an external property name
    pub fn declared_name(&self, external: &str) -> Option<&str> {
        self.declared.get(external).map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }
}

pub struct Introspector {
    schemas: HashMap<String, TypeSchema>,
    cache: Cache<String, ViewTable>,
    include_base_in_views: bool,
    add_unviewed_to_base: bool,
}

impl Introspector {
    pub fn new(config: &Config) -> Self {
        Introspector {
            schemas: HashMap::new(),
            cache: Cache::new("introspector", config.introspector_cache.clone()),
            include_base_in_views: config.include_base_in_views,
            add_unviewed_to_base: config.add_unviewed_to_base,
        }
    }

    /// Register (or replace) the schema of a type
    pub fn register(&mut self, schema: TypeSchema) {
        self.cache.invalidate(&schema.type_name);
        self.schemas.insert(schema.type_name.clone(), schema);
    }

    pub fn register_type<T: Describe>(&mut self) {
        self.register(T::schema());
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.schemas.contains_key(type_name)
    }

    /// View table of `type_name`, built on first use and cached
    pub fn introspect(&self, type_name: &str) -> Result<Arc<ViewTable>, IntrospectionError> {
        self.cache
            .get_or_try_insert_with(type_name.to_string(), || {
                let schema = self.schemas.get(type_name).ok_or_else(|| {
                    IntrospectionError::UnknownType {
                        type_name: type_name.to_string(),
                    }
                })?;
                self.build(schema)
            })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn build(&self, schema: &TypeSchema) -> Result<ViewTable, IntrospectionError> {
        let mut views: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut unwrapped = BTreeSet::new();
        let mut declared = BTreeMap::new();

        for (index, property) in schema.properties.iter().enumerate() {
            if property.name.is_empty() {
                return Err(IntrospectionError::EmptyPropertyName {
                    type_name: schema.type_name.clone(),
                    index,
                });
            }

            let external = property.external_name().to_string();

            if let Some(first) = declared.get(&external) {
                return Err(IntrospectionError::DuplicateProperty {
                    type_name: schema.type_name.clone(),
                    external,
                    first: String::clone(first),
                    second: property.name.clone(),
                });
            }
            declared.insert(external.clone(), property.name.clone());

            if property.unwrapped {
                unwrapped.insert(external.clone());
            }

            if property.views.is_empty() {
                if self.add_unviewed_to_base {
                    views
                        .entry(BASE_VIEW.to_string())
                        .or_default()
                        .insert(external.clone());
                }
            } else {
                for view in &property.views {
                    views.entry(view.clone()).or_default().insert(external.clone());
                }
            }
        }

        self.expand(&mut views);

        debug!(
            type_name = %schema.type_name,
            views = views.len(),
            properties = declared.len(),
            "built view table"
        );

        Ok(ViewTable {
            type_name: schema.type_name.clone(),
            views,
            unwrapped,
            declared,
        })
    }

    /// Copy base properties into the other views
    fn expand(&self, views: &mut HashMap<String, BTreeSet<String>>) {
        let base = views.get(BASE_VIEW).cloned().unwrap_or_default();

        if !self.include_base_in_views {
            if let Some(full) = views.get_mut(FULL_VIEW) {
                full.extend(base);
            }
            return;
        }

        for (name, properties) in views.iter_mut() {
            if name != BASE_VIEW {
                properties.extend(base.iter().cloned());
            }
        }
    }
}
