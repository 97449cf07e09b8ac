use regex::Regex;

use crate::context::Variables;

/// Score returned when a name does not match.
pub const NO_MATCH: i32 = -1;

/// Score of an exact match. Nothing outranks it.
pub const EXACT_SCORE: i32 = i32::MAX;

/// Base score of a regex or glob match, raised by its literal characters.
pub const REGEX_BASE_SCORE: i32 = 3;

/// Score of `*`.
pub const ANY_SHALLOW_SCORE: i32 = 2;

/// Score of `**`, the fallback of last resort.
pub const ANY_DEEP_SCORE: i32 = 1;

/// Name pattern of a filter node.
///
/// Each variant scores a candidate field name: [`NO_MATCH`] when it does not
/// apply, [`EXACT_SCORE`] for an exact match, and a lower positive score for
/// pattern matches, so the most specific sibling wins.
#[derive(Debug, Clone)]
pub enum Name {
    /// Literal field name
    ///
    /// # Example
    /// ```text
    /// id
    /// ```
    Exact(String),

    /// `*`, any name at the current level
    AnyShallow,

    /// `**`, any name at any depth
    AnyDeep,

    /// `@name`, a field name supplied by the request context
    Variable(String),

    /// A regex (`~pattern~`) or glob (`na*e`) fully matched against names
    Regex {
        raw: String,
        regex: Regex,
        literal_len: usize,
    },
}

impl Name {
    /// Compile a regex name. The pattern must match the whole field name.
    pub fn regex(pattern: &str, case_insensitive: bool) -> Result<Name, regex::Error> {
        let flags = if case_insensitive { "(?i)" } else { "" };
        let regex = Regex::new(&format!("^{}(?:{})$", flags, pattern))?;
        let literal_len = pattern.chars().filter(|c| c.is_alphanumeric()).count();
        let raw = format!("~{}~{}", pattern, if case_insensitive { "i" } else { "" });

        Ok(Name::Regex {
            raw,
            regex,
            literal_len,
        })
    }

    /// Compile a glob name where `*` matches any run of characters.
    pub fn glob(glob: &str) -> Result<Name, regex::Error> {
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))?;
        let literal_len = glob.chars().filter(|c| *c != '*').count();

        Ok(Name::Regex {
            raw: glob.to_string(),
            regex,
            literal_len,
        })
    }

    /// Source text of the pattern
    pub fn raw(&self) -> &str {
        match self {
            Name::Exact(name) => name,
            Name::AnyShallow => "*",
            Name::AnyDeep => "**",
            Name::Variable(name) => name,
            Name::Regex { raw, .. } => raw,
        }
    }

    /// Score `candidate` against this pattern.
    ///
    /// Variables resolve through `variables`. Without a binding they act
    /// like `*`.
    pub fn score(&self, candidate: &str, variables: Option<&Variables>) -> i32 {
        match self {
            Name::Exact(name) if name == candidate => EXACT_SCORE,
            Name::Exact(_) => NO_MATCH,
            Name::AnyShallow => ANY_SHALLOW_SCORE,
            Name::AnyDeep => ANY_DEEP_SCORE,
            Name::Variable(var) => match variables.and_then(|vars| vars.get(var)) {
                Some(bound) if bound.as_string() == candidate => EXACT_SCORE,
                Some(_) => NO_MATCH,
                None => ANY_SHALLOW_SCORE,
            },
            Name::Regex {
                regex, literal_len, ..
            } => {
                if regex.is_match(candidate) {
                    let bonus = i32::try_from(*literal_len).unwrap_or(i32::MAX);
                    REGEX_BASE_SCORE.saturating_add(bonus).min(EXACT_SCORE - 1)
                } else {
                    NO_MATCH
                }
            }
        }
    }

    pub fn is_any_deep(&self) -> bool {
        matches!(self, Name::AnyDeep)
    }

    pub fn is_any_shallow(&self) -> bool {
        matches!(self, Name::AnyShallow)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Name::Variable(_))
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        use Name::*;
        match (self, other) {
            (Exact(a), Exact(b)) => a == b,
            (AnyShallow, AnyShallow) | (AnyDeep, AnyDeep) => true,
            (Variable(a), Variable(b)) => a == b,
            (Regex { raw: a, .. }, Regex { raw: b, .. }) => a == b,
            _ => false,
        }
    }
}
