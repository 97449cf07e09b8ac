//! Frontier resolution.
//!
//! A frontier is the set of filter nodes that can select the fields of one
//! value. It contains the explicit sibling nodes of one block plus the `**`
//! nodes inherited from enclosing blocks, each paired with how many levels
//! below its declaration the frontier sits.
//!
//! ```text
//! v{x},**{1,3}
//!
//! level 0   explicit [v{x}, **{1,3}]     inherited []
//! level 1   explicit [x]                 inherited [(**{1,3}, 1)]
//! level 2   explicit []                  inherited [(**{1,3}, 2)]
//! level 3   explicit []                  inherited []
//! ```

use tracing::trace;

use crate::{
    ast::{FilterNode, NO_MATCH},
    context::Variables,
};

#[derive(Debug, Clone, Default)]
pub struct Frontier<'a> {
    explicit: Vec<&'a FilterNode>,
    /// Nearest ancestor first
    inherited: Vec<(&'a FilterNode, usize)>,
}

/// The node that included a field
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub node: &'a FilterNode,
    pub score: i32,
    /// Whether the node came from an enclosing block
    pub inherited: bool,
}

/// Outcome of matching one field name against a frontier
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Included(Selection<'a>),
    /// The best match was a negated node
    Excluded(&'a FilterNode),
    /// No node matched
    Unmatched,
}

impl Resolution<'_> {
    pub fn is_included(&self) -> bool {
        matches!(self, Resolution::Included(_))
    }
}

/// How to continue below an included field
#[derive(Debug, Clone)]
pub enum Next<'a> {
    /// Emit the value with none of its fields (`owner{}`)
    Stop,
    /// Emit the whole subtree unfiltered
    Whole,
    /// Project the value with another frontier
    Descend(Frontier<'a>),
}

impl<'a> Frontier<'a> {
    /// Top-level frontier over `nodes`
    pub fn new(nodes: impl IntoIterator<Item = &'a FilterNode>) -> Self {
        Frontier {
            explicit: nodes.into_iter().collect(),
            inherited: Vec::new(),
        }
    }

    pub fn explicit(&self) -> &[&'a FilterNode] {
        &self.explicit
    }

    pub fn inherited(&self) -> &[(&'a FilterNode, usize)] {
        &self.inherited
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.inherited.is_empty()
    }

    /// Match `name` against the frontier.
    ///
    /// Explicit nodes are scored and the highest score wins, the first
    /// declared on ties. An explicit `**` only takes part when it matches at
    /// depth 0. When no explicit node matches, the nearest inherited `**`
    /// still within its depth bounds selects the field.
    pub fn resolve(&self, name: &str, variables: Option<&Variables>) -> Resolution<'a> {
        let mut best: Option<(&'a FilterNode, i32)> = None;

        for &node in &self.explicit {
            if node.is_recursive() && !node.is_recursive_at_depth(0) {
                continue;
            }

            let score = node.name().score(name, variables);
            if score > NO_MATCH && best.is_none_or(|(_, top)| score > top) {
                best = Some((node, score));
            }
        }

        if let Some((node, score)) = best {
            trace!(field = name, selector = node.name().raw(), score, negated = node.is_negated(), "matched");
            return if node.is_negated() {
                Resolution::Excluded(node)
            } else {
                Resolution::Included(Selection {
                    node,
                    score,
                    inherited: false,
                })
            };
        }

        for &(node, depth) in &self.inherited {
            if !node.is_recursive_at_depth(depth) {
                continue;
            }

            let score = node.name().score(name, variables);
            if score > NO_MATCH {
                trace!(field = name, depth, "matched inherited **");
                return if node.is_negated() {
                    Resolution::Excluded(node)
                } else {
                    Resolution::Included(Selection {
                        node,
                        score,
                        inherited: true,
                    })
                };
            }
        }

        Resolution::Unmatched
    }

    /// Recursive nodes carried one level down, nearest first
    fn passed_down(&self) -> Vec<(&'a FilterNode, usize)> {
        let explicit = self
            .explicit
            .iter()
            .filter(|node| node.is_recursive())
            .map(|&node| (node, 0));

        explicit
            .chain(self.inherited.iter().copied())
            .filter_map(|(node, depth)| {
                let depth = depth + 1;
                node.reaches_depth(depth).then_some((node, depth))
            })
            .collect()
    }

    /// The continuation below a field included by `node`
    pub fn next(&self, node: &'a FilterNode) -> Next<'a> {
        if node.is_empty_nested() {
            return Next::Stop;
        }

        if node.has_nested_spec() {
            return Next::Descend(Frontier {
                explicit: node.children().iter().collect(),
                inherited: self.passed_down(),
            });
        }

        if node.is_recursive() {
            return Next::Descend(Frontier {
                explicit: Vec::new(),
                inherited: self.passed_down(),
            });
        }

        Next::Whole
    }
}
