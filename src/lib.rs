//! # prune-lang
//!
//! A field-selection language for projecting nested values. A filter such as
//! `id,name[upper()],owner{email}` decides which fields of a value survive,
//! how deep the projection descends, and which keys and values are rewritten
//! on the way out.
//!
//! ```
//! use prune_lang::{Engine, Record, Value};
//! use prune_lang::introspect::{PropertySchema, TypeSchema};
//!
//! let engine = Engine::builder()
//!     .schema(
//!         TypeSchema::new("User")
//!             .property(PropertySchema::new("id"))
//!             .property(PropertySchema::new("email").in_view("private")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let user: Value = Record::new("User").with("id", 1).with("email", "a@b.c").into();
//!
//! let public = engine.apply(&user, "*").unwrap();
//! assert_eq!(prune_lang::to_json(&public), r#"{"id":1}"#);
//!
//! let private = engine.apply(&user, "*,private").unwrap();
//! assert_eq!(prune_lang::to_json(&private), r#"{"email":"a@b.c","id":1}"#);
//! ```
pub mod ast;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod evaluator;
pub mod frontier;
pub mod functions;
pub mod introspect;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod registry;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{FilterNode, FilterTree, FunctionCall, Name, ParseContext, Token};
pub use config::{CacheSpec, Config, ConfigurationError};
pub use context::{FilterSource, RequestContext, StaticFilter, Variables};
pub use engine::{Engine, EngineBuilder, Error};
pub use evaluator::{EvalError, Evaluator};
pub use functions::CoreFunctions;
pub use introspect::{Describe, IntrospectionError, PropertySchema, TypeSchema, ViewTable};
pub use lexer::{LexError, Lexer};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, compile};
pub use registry::{
    FunctionDefinition, FunctionError, FunctionModule, FunctionRegistry, ParamType, ParameterShape,
    RegistrationStrategy, UnresolvedFunctionError,
};
pub use value::{Record, Value};
