//! AND-join dependency graph with per-node pending counters.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::manifest::{Join, LoadNode};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GraphError {
    /// A join was declared twice.
    DuplicateJoin(LoadNode),
    /// A join with nothing to wait for would never be triggered.
    EmptyJoin(LoadNode),
    /// A join waits on itself, directly or through other joins.
    Cycle(LoadNode),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::DuplicateJoin(n) => write!(f, "join {n} declared twice"),
            GraphError::EmptyJoin(n) => write!(f, "join {n} has no antecedents"),
            GraphError::Cycle(n) => write!(f, "join {n} depends on itself"),
        }
    }
}

impl std::error::Error for GraphError {}

#[derive(Debug, Clone)]
pub struct JoinGraph {
    /// Antecedents still outstanding per join.
    pending: BTreeMap<LoadNode, usize>,
    /// Joins waiting on each node.
    dependents: BTreeMap<LoadNode, Vec<LoadNode>>,
    completed: BTreeSet<LoadNode>,
}

impl JoinGraph {
    pub fn new(joins: &[Join]) -> Result<Self, GraphError> {
        let mut pending = BTreeMap::new();
        let mut dependents: BTreeMap<LoadNode, Vec<LoadNode>> = BTreeMap::new();

        for join in joins {
            if join.after.is_empty() {
                return Err(GraphError::EmptyJoin(join.node));
            }
            let unique: BTreeSet<LoadNode> = join.after.iter().copied().collect();
            if pending.insert(join.node, unique.len()).is_some() {
                return Err(GraphError::DuplicateJoin(join.node));
            }
            for antecedent in unique {
                dependents.entry(antecedent).or_default().push(join.node);
            }
        }

        let graph = Self {
            pending,
            dependents,
            completed: BTreeSet::new(),
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    fn check_acyclic(&self) -> Result<(), GraphError> {
        // Kahn's algorithm over the join nodes only; leaves have no antecedents.
        let mut remaining = self.pending.clone();
        let mut ready: Vec<LoadNode> = self
            .dependents
            .keys()
            .filter(|n| !self.pending.contains_key(n))
            .copied()
            .collect();

        while let Some(node) = ready.pop() {
            for dep in self.dependents.get(&node).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dep) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(*dep);
                    }
                }
            }
        }

        match remaining.into_iter().find(|(_, c)| *c > 0) {
            Some((node, _)) => Err(GraphError::Cycle(node)),
            None => Ok(()),
        }
    }

    /// Marks `node` done and returns the joins that became ready, in declaration order
    /// of their dependency on `node`. Completing a node twice fires nothing.
    pub fn complete(&mut self, node: LoadNode) -> Vec<LoadNode> {
        if !self.completed.insert(node) {
            log::warn!("{node} completed twice; ignoring");
            return Vec::new();
        }

        let mut fired = Vec::new();
        for dep in self.dependents.get(&node).into_iter().flatten() {
            if let Some(count) = self.pending.get_mut(dep) {
                *count -= 1;
                if *count == 0 {
                    fired.push(*dep);
                }
            }
        }
        fired
    }

    pub fn is_complete(&self, node: LoadNode) -> bool {
        self.completed.contains(&node)
    }

    /// Outstanding antecedents of a join, or `None` for a leaf.
    pub fn pending(&self, join: LoadNode) -> Option<usize> {
        self.pending.get(&join).copied()
    }

    pub fn is_join(&self, node: LoadNode) -> bool {
        self.pending.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::PassFamily;
    use crate::geometry::MeshKind;
    use crate::gfx::ShaderStage;

    const VS: LoadNode = LoadNode::Shader(PassFamily::Underwater, ShaderStage::Vertex);
    const PS: LoadNode = LoadNode::Shader(PassFamily::Underwater, ShaderStage::Pixel);
    const QUAD: LoadNode = LoadNode::Mesh(MeshKind::FullScreenQuad);

    fn small() -> JoinGraph {
        JoinGraph::new(&[
            Join { node: QUAD, after: vec![VS, PS] },
            Join { node: LoadNode::Ready, after: vec![QUAD] },
        ])
        .unwrap()
    }

    #[test]
    fn join_fires_only_after_every_antecedent() {
        let mut g = small();
        assert_eq!(g.pending(QUAD), Some(2));

        assert!(g.complete(PS).is_empty());
        assert_eq!(g.pending(QUAD), Some(1));
        assert_eq!(g.complete(VS), vec![QUAD]);
        assert_eq!(g.complete(QUAD), vec![LoadNode::Ready]);
    }

    #[test]
    fn repeated_completion_fires_nothing() {
        let mut g = small();
        g.complete(VS);
        assert!(g.complete(VS).is_empty());
        assert_eq!(g.pending(QUAD), Some(1));
    }

    #[test]
    fn duplicate_antecedents_count_once() {
        let mut g = JoinGraph::new(&[Join { node: QUAD, after: vec![VS, VS] }]).unwrap();
        assert_eq!(g.complete(VS), vec![QUAD]);
    }

    #[test]
    fn malformed_graphs_are_rejected() {
        assert_eq!(
            JoinGraph::new(&[Join { node: QUAD, after: vec![] }]).unwrap_err(),
            GraphError::EmptyJoin(QUAD)
        );
        assert!(matches!(
            JoinGraph::new(&[
                Join { node: QUAD, after: vec![LoadNode::Ready] },
                Join { node: LoadNode::Ready, after: vec![QUAD] },
            ]),
            Err(GraphError::Cycle(_))
        ));
        assert_eq!(
            JoinGraph::new(&[
                Join { node: QUAD, after: vec![VS] },
                Join { node: QUAD, after: vec![PS] },
            ])
            .unwrap_err(),
            GraphError::DuplicateJoin(QUAD)
        );
    }
}
