//! A prefix tree over query segments, used to collapse many failing
//! tests into the fewest covering wildcards.
//!
//! One tree is built per tag-variant. Every result of the variant is
//! inserted, passing or not: passing leaves are the denominators that
//! keep a lone failure from swallowing its siblings.

use crate::query::{Query, Separator};
use crate::result::Status;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct QueryTree {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<(String, Separator), Node>,
    statuses: Vec<Status>,
    // The query as originally inserted, kept so an uncollapsed leaf is
    // emitted in its source form.
    leaf_query: Option<Query>,
}

/// The deepest query that still covers every failure beneath it, for one
/// tag-variant, together with the failing statuses it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootNode {
    pub query: Query,
    pub statuses: BTreeSet<Status>,
}

// Outcome of reducing one subtree. A subtree that collapsed (or was a
// single result to begin with) is a candidate leaf its parent may fold
// into its own roll-up; a subtree that stayed expanded has already
// committed its root nodes.
enum Reduced {
    Leaf {
        failing: bool,
        query: Query,
        statuses: BTreeSet<Status>,
    },
    Expanded(Vec<RootNode>),
}

impl QueryTree {
    pub fn new() -> QueryTree {
        QueryTree::default()
    }

    pub fn insert(&mut self, query: &Query, status: Status) {
        let mut node = &mut self.root;
        for (sep, text) in query.raw_segments() {
            // The trailing empty segment of a canonical test id is part
            // of the terminal node, not a level of its own.
            if text.is_empty() {
                continue;
            }
            node = node.children.entry((text.to_string(), sep)).or_default();
        }
        node.statuses.push(status);
        if node.leaf_query.is_none() {
            node.leaf_query = Some(query.clone());
        }
    }

    /// Apply the roll-up policy bottom-up and return the root nodes.
    ///
    /// Children of one parent collapse into the parent wildcard iff every
    /// child has itself reduced to a leaf and either more than half of
    /// them fail or more than ten of them fail. The virtual root never
    /// collapses, so a whole-tree failure stops at the first real segment.
    pub fn roots(&self, is_failing: impl Fn(Status) -> bool + Copy) -> Vec<RootNode> {
        let mut path = Vec::new();
        match self.root.reduce(&mut path, true, is_failing) {
            Reduced::Leaf {
                failing,
                query,
                statuses,
            } => {
                if failing {
                    vec![RootNode { query, statuses }]
                } else {
                    Vec::new()
                }
            }
            Reduced::Expanded(roots) => roots,
        }
    }
}

impl Node {
    fn reduce(
        &self,
        path: &mut Vec<(Separator, String)>,
        is_root: bool,
        is_failing: impl Fn(Status) -> bool + Copy,
    ) -> Reduced {
        let own_statuses: BTreeSet<Status> = self
            .statuses
            .iter()
            .copied()
            .filter(|s| is_failing(*s))
            .collect();

        if self.children.is_empty() {
            let query = self
                .leaf_query
                .clone()
                .unwrap_or_else(|| Query::from_path(path, Separator::Colon));
            return Reduced::Leaf {
                failing: !own_statuses.is_empty(),
                query,
                statuses: own_statuses,
            };
        }

        let mut reduced = Vec::with_capacity(self.children.len());
        for ((text, sep), child) in &self.children {
            path.push((*sep, text.clone()));
            reduced.push(child.reduce(path, false, is_failing));
            path.pop();
        }
        // Results recorded at this interior node itself join the roll-up
        // count as one more leaf.
        if !self.statuses.is_empty() {
            if let Some(query) = &self.leaf_query {
                reduced.push(Reduced::Leaf {
                    failing: !own_statuses.is_empty(),
                    query: query.clone(),
                    statuses: own_statuses.clone(),
                });
            }
        }

        let all_leaves = reduced
            .iter()
            .all(|r| matches!(r, Reduced::Leaf { .. }));
        let total = reduced.len();
        let failing = reduced
            .iter()
            .filter(|r| matches!(r, Reduced::Leaf { failing: true, .. }))
            .count();

        // A subtree that kept distinct roots pins all of its ancestors
        // expanded: only single results and fully collapsed children may
        // fold into the parent. Without this, any failure under an only
        // child would cascade the collapse to the top of the tree.
        if !is_root && all_leaves && (2 * failing > total || failing > 10) {
            let mut statuses = BTreeSet::new();
            for r in &reduced {
                if let Reduced::Leaf {
                    statuses: child_statuses,
                    ..
                } = r
                {
                    statuses.extend(child_statuses.iter().copied());
                }
            }
            let sep = self
                .children
                .keys()
                .next()
                .map(|(_, sep)| *sep)
                .unwrap_or(Separator::Colon);
            return Reduced::Leaf {
                failing: true,
                query: Query::from_path(path, sep),
                statuses,
            };
        }

        let mut out = Vec::new();
        for r in reduced {
            match r {
                Reduced::Leaf {
                    failing: true,
                    query,
                    statuses,
                } => out.push(RootNode { query, statuses }),
                Reduced::Leaf { failing: false, .. } => {}
                Reduced::Expanded(roots) => out.extend(roots),
            }
        }
        Reduced::Expanded(out)
    }
}
