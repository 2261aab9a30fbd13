//! Chooses which part of an extended family is drawn around a root.

use crate::error::{FamilyError, Result};
use crate::graph::{FamilyGraph, NodeId};
use crate::ir::Side;
use std::collections::BTreeSet;
use std::fmt;

pub type VisibleSet = BTreeSet<NodeId>;

/// How many generations the walk may descend from an ancestor's union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descent {
    Levels(u32),
    Unbounded,
}

impl Descent {
    fn exhausted(self) -> bool {
        matches!(self, Descent::Levels(0))
    }

    fn step(self) -> Self {
        match self {
            Descent::Levels(levels) => Descent::Levels(levels.saturating_sub(1)),
            Descent::Unbounded => Descent::Unbounded,
        }
    }
}

/// Detail policy. Level 1 shows ancestors and their siblings, level 2 adds
/// first cousins and nieces/nephews, and so on; the root's own descendants
/// are always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityPolicy {
    pub descent: Descent,
    /// Draws the whole graph regardless of `descent`.
    pub show_everyone: bool,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::levels(2)
    }
}

impl VisibilityPolicy {
    pub fn levels(levels: u32) -> Self {
        Self {
            descent: Descent::Levels(levels),
            show_everyone: false,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            descent: Descent::Unbounded,
            show_everyone: false,
        }
    }

    pub fn everyone() -> Self {
        Self {
            descent: Descent::Unbounded,
            show_everyone: true,
        }
    }

    /// Compact token used in navigation state: `1`, `2`, ..., `inf`, `all`.
    pub fn from_token(token: &str) -> Result<Self> {
        match token.trim() {
            "all" => Ok(Self::everyone()),
            "inf" => Ok(Self::unbounded()),
            other => other
                .parse::<u32>()
                .map(Self::levels)
                .map_err(|_| FamilyError::InvalidDetail(token.to_string())),
        }
    }

    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VisibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.show_everyone {
            return f.write_str("all");
        }
        match self.descent {
            Descent::Levels(levels) => write!(f, "{levels}"),
            Descent::Unbounded => f.write_str("inf"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PathState {
    ascend: bool,
    remaining: Descent,
    /// Set on the root and everything strictly below it.
    descendant_branch: bool,
}

/// Computes the nodes to draw for `root`. The graph must already be
/// validated as a tree; the walk never re-enters the node it came from.
pub fn compute_visible(graph: &FamilyGraph, root: NodeId, policy: VisibilityPolicy) -> VisibleSet {
    if policy.show_everyone {
        return graph.ids().collect();
    }

    let mut visible = VisibleSet::new();
    let start = PathState {
        ascend: true,
        remaining: policy.descent,
        descendant_branch: true,
    };
    let mut pending: Vec<(NodeId, Option<NodeId>, PathState)> = vec![(root, None, start)];

    while let Some((node, from, state)) = pending.pop() {
        visible.insert(node);
        let mut enqueue = |next: NodeId, next_state: PathState| {
            if Some(next) != from {
                pending.push((next, Some(node), next_state));
            }
        };

        if let Some(union) = graph.union(node) {
            for side in [Side::Left, Side::Right] {
                enqueue(
                    union.member(side),
                    PathState {
                        descendant_branch: false,
                        ..state
                    },
                );
            }
            if !state.descendant_branch && state.remaining.exhausted() {
                continue;
            }
            for &child in &union.children {
                enqueue(
                    child,
                    PathState {
                        ascend: false,
                        remaining: state.remaining.step(),
                        descendant_branch: state.descendant_branch,
                    },
                );
            }
        } else {
            if state.ascend {
                if let Some(parents) = graph.union_above(node) {
                    enqueue(
                        parents,
                        PathState {
                            descendant_branch: false,
                            ..state
                        },
                    );
                }
            }
            for union in graph.spouse_unions(node) {
                enqueue(
                    union,
                    PathState {
                        ascend: false,
                        ..state
                    },
                );
            }
        }
    }

    log::debug!(
        "{} of {} nodes visible from `{}` at detail {}",
        visible.len(),
        graph.len(),
        graph.display_name(root),
        policy
    );
    visible
}

/// Names of the visible nodes, sorted.
pub fn visible_names(graph: &FamilyGraph, visible: &VisibleSet) -> BTreeSet<String> {
    visible.iter().map(|id| graph.name(*id).to_string()).collect()
}
