use crate::ast::ParseContext;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Names
    /// Field name, function name, or keyword-like word
    ///
    /// Starts with a letter, `_` or `$`, followed by letters, digits, `_`, `$` or `-`.
    ///
    /// # Examples
    /// ```text
    /// id
    /// first-name
    /// _links
    /// ```
    Identifier(String),

    /// Quoted name or string argument
    ///
    /// # Examples
    /// ```text
    /// "display name"
    /// 'x'
    /// ```
    Quoted(String),

    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 0
    /// 42
    /// ```
    Integer(i64),

    /// Floating point literal
    ///
    /// # Examples
    /// ```text
    /// 1.5
    /// ```
    Float(f64),

    /// Shallow wildcard, any name at the current level
    ///
    /// # Examples
    /// ```text
    /// *
    /// owner{*}
    /// ```
    Star,

    /// Deep wildcard, any name at any depth
    ///
    /// # Examples
    /// ```text
    /// **
    /// **{1,3}
    /// ```
    DoubleStar,

    /// Name pattern containing `*` somewhere other than on its own
    ///
    /// # Examples
    /// ```text
    /// na*e
    /// *Id
    /// ```
    Glob(String),

    /// Regular expression name, fully matched against field names
    ///
    /// # Examples
    /// ```text
    /// ~^user_.+~
    /// ~ID~i
    /// ```
    Regex {
        pattern: String,
        case_insensitive: bool,
    },

    /// Variable reference, resolved from the request context
    ///
    /// # Examples
    /// ```text
    /// @field
    /// name.prefix(@tag)
    /// ```
    Variable(String),

    // Operators
    /// Negation prefix
    ///
    /// # Examples
    /// ```text
    /// -secret
    /// ```
    Minus,

    /// Key-function prefix
    ///
    /// # Examples
    /// ```text
    /// name:upper()
    /// ```
    Colon,

    /// Stage separator
    ///
    /// # Examples
    /// ```text
    /// id,name | **,name.upper()
    /// ```
    Pipe,

    // Delimiters
    /// Selector and argument separator
    Comma,

    /// Path separator or value-function prefix
    Dot,

    /// Left parenthesis for function arguments
    LParen,

    /// Right parenthesis
    RParen,

    /// Left bracket for value functions
    LBracket,

    /// Right bracket
    RBracket,

    /// Left brace for nested selectors or depth bounds
    LBrace,

    /// Right brace
    RBrace,

    /// End of input
    Eof,
}

/// A token with the position it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub context: ParseContext,
}
