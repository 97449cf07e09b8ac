//! # Prune Filter Language - Abstract Syntax Tree
//!
//! This module defines the parsed form of a filter expression: a forest of
//! selector nodes, one per field-selector level, that the evaluator walks in
//! lock-step with a value.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[name]** - Name patterns and their match scores
//! - **[node]** - Filter nodes, the compiled tree, and parse positions
//! - **[call]** - Function calls attached to nodes
//!
//! ## Quick Start
//!
//! ```text
//! id,name.upper(),owner{email,-password}
//! ```
//!
//! This filter keeps `id`, keeps `name` with its value upper-cased, and keeps
//! `owner` with only its `email` field.
//!
//! ## Core Concepts
//!
//! ### Selectors
//!
//! - `name` - keep the field and everything beneath it
//! - `name{a,b}` - keep the field, and only `a` and `b` beneath it
//! - `name{}` - keep the field but none of its fields
//! - `-name` - drop the field
//! - `a.b` - shorthand for `a{b}`
//!
//! ### Patterns
//!
//! - `*` - any field at this level
//! - `**` - any field at any depth; `**{1,3}` limits the depth
//! - `na*e` - glob
//! - `~user_.+~i` - regex, optionally case-insensitive
//! - `@field` - field named by a request variable
//!
//! ### Functions
//!
//! - `name.upper()` or `name[upper()]` - transform the value
//! - `name:upper()` - transform the emitted key
//!
//! ### Stages
//!
//! ```text
//! id,name | **,name.reverse()
//! ```
//!
//! Each `|` starts a pass that runs over the output of the previous one.
pub mod call;
pub mod name;
pub mod node;
pub mod tokens;

pub use call::{Arg, FunctionCall};
pub use name::{ANY_DEEP_SCORE, ANY_SHALLOW_SCORE, EXACT_SCORE, NO_MATCH, Name, REGEX_BASE_SCORE};
pub use node::{FilterNode, FilterTree, ParseContext};
pub use tokens::{Spanned, Token};
