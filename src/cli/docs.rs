//! Documentation content for the prune CLI

use std::str::FromStr;

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Syntax,
    Wildcards,
    Functions,
    Views,
    Stages,
}

impl FromStr for DocCategory {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "syntax" => Ok(Self::Syntax),
            "wildcards" | "wildcard" | "patterns" => Ok(Self::Wildcards),
            "functions" | "function" | "fns" => Ok(Self::Functions),
            "views" | "view" => Ok(Self::Views),
            "stages" | "stage" | "pipes" => Ok(Self::Stages),
            _ => Err(CliError::UnknownCategory(s.to_string())),
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"PRUNE DOCUMENTATION

Prune is a field-selection language. A filter names the fields of a JSON
document to keep, how deep to descend into them, and how to rewrite their
keys and values on the way out.

DOCUMENTATION CATEGORIES

  syntax            Selectors, nesting, negation, and dotted paths
  wildcards         *, **, depth bounds, globs, regexes, and variables
  functions         Key and value functions and the built-in library
  views             Named property groups of typed records
  stages            Sequential filter passes separated by |

QUICK REFERENCE

  id,name           Keep id and name
  owner{email}      Keep owner, and only its email
  owner{}           Keep owner but none of its fields
  -secret           Keep everything except secret
  a.b               Same as a{b}
  **{1,3}           Any field one or two levels down
  name.upper()      Transform a value
  name:upper()      Transform a key
  id | **           Run a second pass over the output

Run 'prune doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    Ok(match name.parse::<DocCategory>()? {
        DocCategory::Syntax => SYNTAX_DOC,
        DocCategory::Wildcards => WILDCARDS_DOC,
        DocCategory::Functions => FUNCTIONS_DOC,
        DocCategory::Views => VIEWS_DOC,
        DocCategory::Stages => STAGES_DOC,
    })
}

const SYNTAX_DOC: &str = r#"SYNTAX - Selectors and Nesting

FIELD SELECTION
  id,name
    Keep the named fields. Everything else is dropped. A kept field keeps
    everything beneath it.

    Example:
      Input:  {"id": 1, "name": "Ada", "token": "x"}
      Filter: id,name
      Output: {"id": 1, "name": "Ada"}

NESTED SELECTION
  owner{email,name}
    Keep owner, and within it only email and name.

    Example:
      Input:  {"owner": {"email": "a@b.c", "name": "Ada", "hash": "..."}}
      Filter: owner{email}
      Output: {"owner": {"email": "a@b.c"}}

  owner{}
    Keep owner but descend no further. An object becomes {}, a list of
    objects a list of {}, and a scalar is kept as it is.

    Example:
      Input:  {"owner": {"email": "a@b.c"}, "id": 1}
      Filter: owner{}
      Output: {"owner": {}}

DOTTED PATHS
  owner.email
    Shorthand for owner{email}. Sibling paths with the same head merge:
    owner.email,owner.name is owner{email,name}.

NEGATION
  -token
    Drop token. A block containing only negated selectors keeps everything
    else, so -token alone means "all fields but token".

    Example:
      Input:  {"id": 1, "token": "x"}
      Filter: -token
      Output: {"id": 1}

  Constraints:
    - The most specific matching selector decides: {id,-*} keeps id
    - Equally specific selectors: the first one written wins

NAMES
  Plain names use letters, digits, _, $ and -. Quote anything else:
    "display name",'x.y'
"#;

const WILDCARDS_DOC: &str = r#"WILDCARDS - Patterns and Depth

ANY FIELD
  *
    Any field at this level.

  **
    Any field at any depth. An empty filter means **.

DEPTH BOUNDS
  **{min,max}
    Any field from min levels below the declaration, up to but not
    including max. **{n} and **{n,} only set the minimum.

    Example:
      Input:  {"v": {"x": 1, "y": {"p": {"q": 1}}}, "w": 1}
      Filter: v{x},**{1,3}
      Output: {"v": {"x": 1, "y": {"p": {}}}}

GLOBS
  na*e, *Id
    * inside a name matches any run of characters.

REGEXES
  ~user_.+~
  ~ID~i
    Full-match regular expression; the trailing i ignores case.

VARIABLES
  @field
    The field named by the request variable 'field'. Unbound variables act
    like *.

    Example:
      prune check '@f' --var f=name --input '{"id": 1, "name": "Ada"}'
      => {"name": "Ada"}

PRECEDENCE
  exact name > glob or regex (longer literal text first) > * > **
"#;

const FUNCTIONS_DOC: &str = r#"FUNCTIONS - Rewriting Keys and Values

VALUE FUNCTIONS
  name.upper()
  name[upper()]
  name[trim().upper()]
    Run after the field's own projection, left to right.

KEY FUNCTIONS
  name:upper()
    Rewrite the emitted key. Key functions must return a string.

ARGUMENTS
  "text"  'text'  42  -1  2.5  true  false  null  @variable

STRING FUNCTIONS
  reverse()             Reverse characters
  upper() / lower()     Change case
  trim()                Strip surrounding whitespace
  split(sep)            Split into an array
  substring(start)      Characters from start
  substring(start,end)  Characters in [start, end)
  replace(from,to)      Replace every occurrence
  matches(regex)        true when the regex matches anywhere
  prefix(text)          Prepend text
  suffix(text)          Append text

COLLECTION FUNCTIONS
  length() / size()     Length of a string, array or object
  reverse()             Reverse an array
  first() / last()      First or last element, or null
  sort()                Sort ascending
  unique()              Drop duplicates
  flatten()             Flatten one level
  join(sep)             Join elements into a string
  keys() / values()     Keys or values of an object

NULLS
  default(value)        Replace null with value

  Constraints:
    - An unknown function is an error, reported with its position
    - The overload is chosen by the types of the input and arguments
"#;

const VIEWS_DOC: &str = r#"VIEWS - Property Groups of Typed Records

Typed records declare which of their properties belong to which views.

BASE VIEW
  Properties that declare no view belong to 'base'. Records are projected
  with the base view unless another view is requested:

    prune check '*' --view detail

INHERITANCE
  Other views also contain the base properties. The 'full' view always
  does, and when no property declares 'full' it contains every property.

SELECTING A VIEW
  id,detail
    A selector naming a view adds that view's properties to the record.

UNWRAPPED PROPERTIES
  A property marked unwrapped contributes its own fields to its parent
  instead of appearing as a nested object.
"#;

const STAGES_DOC: &str = r#"STAGES - Sequential Passes

  stage | stage | ...
    Each stage runs over the output of the previous one.

    Example:
      Input:  {"id": 1, "name": "abc", "token": "x"}
      Filter: id,name | **,name.reverse()
      Output: {"id": 1, "name": "cba"}

  An empty stage means **, so 'id |' is the same as 'id'.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_aliases() {
        assert_eq!("Wildcard".parse::<DocCategory>().unwrap(), DocCategory::Wildcards);
        assert!(get_doc_category("operators").is_err());
    }
}
