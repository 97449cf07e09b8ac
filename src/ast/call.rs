use crate::{ast::ParseContext, value::Value};

/// Function argument as written in the filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// "-"
    /// 3
    /// true
    /// ```
    Literal(Value),

    /// Variable reference (`@name`), bound at evaluation time
    Variable(String),
}

/// A call to a registered function, attached to a filter node.
///
/// The call is only a name and arguments. It is resolved against the
/// function registry each time it runs, so registries can be swapped
/// without reparsing.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Function name
    pub name: String,

    /// Arguments following the implicit input
    pub args: Vec<Arg>,

    /// Where the call appears in the filter
    pub context: ParseContext,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<Arg>, context: ParseContext) -> Self {
        FunctionCall {
            name: name.into(),
            args,
            context,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}
