use std::fmt;

use crate::ast::{FunctionCall, Name};

/// Line and column of a token, both starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ParseContext {
    pub line: usize,
    pub column: usize,
}

impl ParseContext {
    pub fn new(line: usize, column: usize) -> Self {
        ParseContext { line, column }
    }
}

impl fmt::Display for ParseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// One selector of a parsed filter.
///
/// Nodes are built by the parser and never change afterwards. The `with_*`
/// methods return modified copies.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub(crate) context: ParseContext,
    pub(crate) name: Name,
    pub(crate) children: Vec<FilterNode>,
    pub(crate) stage: usize,
    pub(crate) key_functions: Vec<FunctionCall>,
    pub(crate) value_functions: Vec<FunctionCall>,
    pub(crate) negated: bool,
    pub(crate) nested: bool,
    pub(crate) empty_nested: bool,
    pub(crate) recursive: bool,
    pub(crate) min_depth: Option<usize>,
    pub(crate) max_depth: Option<usize>,
}

impl FilterNode {
    /// A bare node with no children, functions or modifiers
    pub fn named(name: Name, context: ParseContext) -> Self {
        let recursive = name.is_any_deep();
        FilterNode {
            context,
            name,
            children: Vec::new(),
            stage: 0,
            key_functions: Vec::new(),
            value_functions: Vec::new(),
            negated: false,
            nested: false,
            empty_nested: false,
            recursive,
            min_depth: None,
            max_depth: None,
        }
    }

    pub fn context(&self) -> ParseContext {
        self.context
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn children(&self) -> &[FilterNode] {
        &self.children
    }

    pub fn stage(&self) -> usize {
        self.stage
    }

    pub fn key_functions(&self) -> &[FunctionCall] {
        &self.key_functions
    }

    pub fn value_functions(&self) -> &[FunctionCall] {
        &self.value_functions
    }

    /// Started with `-`
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Immediately followed by a `{...}` block.
    ///
    /// In `id,foo{bar}` the `foo` node has a nested spec, `bar` does not.
    pub fn has_nested_spec(&self) -> bool {
        self.nested
    }

    /// Written with an explicit empty block, such as `owner{}`
    pub fn is_empty_nested(&self) -> bool {
        self.empty_nested
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn min_depth(&self) -> Option<usize> {
        self.min_depth
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn is_any_deep(&self) -> bool {
        self.name.is_any_deep()
    }

    pub fn is_any_shallow(&self) -> bool {
        self.name.is_any_shallow()
    }

    /// Whether a recursive node still matches `depth` levels below where it
    /// was declared. Bounds are `[min_depth, max_depth)`.
    pub fn is_recursive_at_depth(&self, depth: usize) -> bool {
        if !self.recursive {
            return false;
        }

        if self.min_depth.is_some_and(|min| depth < min) {
            return false;
        }

        if self.max_depth.is_some_and(|max| depth >= max) {
            return false;
        }

        true
    }

    /// Whether the node can match at `depth` or anywhere deeper
    pub fn reaches_depth(&self, depth: usize) -> bool {
        self.recursive && self.max_depth.is_none_or(|max| depth < max)
    }

    pub fn has_functions(&self) -> bool {
        !self.key_functions.is_empty() || !self.value_functions.is_empty()
    }

    pub fn with_name(&self, name: Name) -> Self {
        FilterNode {
            name,
            ..self.clone()
        }
    }

    pub fn with_children(&self, children: Vec<FilterNode>) -> Self {
        FilterNode {
            children,
            ..self.clone()
        }
    }

    /// Copy with this node and all its descendants moved to `stage`
    pub fn with_stage(&self, stage: usize) -> Self {
        FilterNode {
            stage,
            children: self.children.iter().map(|c| c.with_stage(stage)).collect(),
            ..self.clone()
        }
    }
}

/// A compiled filter: the top-level selectors of every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTree {
    source: String,
    nodes: Vec<FilterNode>,
    stage_count: usize,
}

impl FilterTree {
    pub fn new(source: impl Into<String>, nodes: Vec<FilterNode>) -> Self {
        let stage_count = nodes.iter().map(|n| n.stage + 1).max().unwrap_or(0);
        FilterTree {
            source: source.into(),
            nodes,
            stage_count,
        }
    }

    /// Filter text the tree was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level nodes of all stages, in declaration order
    pub fn nodes(&self) -> &[FilterNode] {
        &self.nodes
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Top-level nodes of one stage
    pub fn stage(&self, stage: usize) -> Vec<&FilterNode> {
        self.nodes.iter().filter(|n| n.stage == stage).collect()
    }

    /// Whether the tree is just `**` with nothing attached, which selects everything unchanged
    pub fn is_include_all(&self) -> bool {
        matches!(self.nodes.as_slice(), [node]
            if node.is_any_deep()
                && !node.negated
                && node.min_depth.is_none()
                && node.max_depth.is_none()
                && !node.nested
                && !node.has_functions())
    }
}
