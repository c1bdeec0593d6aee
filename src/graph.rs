// Copyright (c) 2022 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! The dependency graph: a single arena of package nodes plus a synthetic
//! `ALL` root, addressed by index rather than by owning pointers so that
//! parent/child edges never need reference counting.

use std::collections::HashMap;
use std::time::Instant;

use crate::edge::Edge;
use crate::error::GraphError;

/// Name of the synthetic root node that every otherwise-parentless package is
/// attached to.
pub const ROOT_NAME: &str = "ALL";

/// An index into `Graph::nodes`. Stable for the lifetime of the graph: nodes
/// are never removed once added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A node's position in its monotonic lifecycle. Never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Pending,
    Ready,
    Processing,
    Done,
}

/// A package (or the synthetic root).
pub struct Node {
    pub name: String,
    pub version: String,
    pub status: Status,
    pub priority: u32,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,

    /// Raw parent-name strings from the edge file. Consumed by `Graph::link`
    /// and empty afterward.
    parent_names: Vec<String>,

    /// Which worker slot is building this node, if any. Only meaningful
    /// while `status == Processing`.
    pub pool_slot: Option<usize>,

    /// Wall-clock duration of the build attempt. Zero if skipped via stamp.
    pub elapsed: std::time::Duration,

    /// Set if the executor's child process returned non-zero or failed to
    /// spawn.
    pub build_failed: bool,

    /// Captured when the node transitions to `Processing`.
    pub timer_start: Option<Instant>,
}

impl Node {
    fn new(name: String, version: String, parent_names: Vec<String>) -> Node {
        let status = if name == ROOT_NAME {
            Status::Done
        } else {
            Status::Pending
        };

        Node {
            name,
            version,
            status,
            priority: 0,
            parents: Vec::new(),
            children: Vec::new(),
            parent_names,
            pool_slot: None,
            elapsed: std::time::Duration::default(),
            build_failed: false,
            timer_start: None,
        }
    }

    /// The on-disk directory name used by the stamp probe:
    /// `<name>` or `<name>-<version>` if a version is recorded.
    pub fn build_dir_name(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}-{}", self.name, self.version)
        }
    }
}

/// The dependency graph. Pure data: no mutexes, no pool, no I/O. Everything
/// that needs to be mutated concurrently while the scheduler is running
/// lives in `scheduler::Scheduler` instead (see DESIGN.md).
pub struct Graph {
    nodes: Vec<Node>,
    by_name: HashMap<String, NodeId>,

    /// Node indices sorted by ascending priority, stable so that ties
    /// preserve insertion order. Populated by `priority::assign`; empty
    /// until then.
    pub order: Vec<NodeId>,
}

impl Graph {
    /// Builds a graph from parsed edge records.
    ///
    /// Dedup rule: the first record to use a given name wins; later records
    /// with the same name are silently ignored. This matches the reference
    /// implementation.
    pub fn build(edges: &[Edge]) -> Result<Graph, GraphError> {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        let mut by_name = HashMap::with_capacity(edges.len() + 1);

        let root = Node::new(ROOT_NAME.to_string(), String::new(), Vec::new());
        by_name.insert(root.name.clone(), NodeId(0));
        nodes.push(root);

        for edge in edges {
            if by_name.contains_key(&edge.name) {
                log::trace!("duplicate package name {:?}, keeping first definition", edge.name);
                continue;
            }

            let id = NodeId(nodes.len());
            nodes.push(Node::new(
                edge.name.clone(),
                edge.version.clone(),
                edge.parents.clone(),
            ));
            by_name.insert(edge.name.clone(), id);
        }

        if nodes.is_empty() || nodes[0].name != ROOT_NAME {
            return Err(GraphError::NoRoot);
        }

        let mut graph = Graph {
            nodes,
            by_name,
            order: Vec::new(),
        };

        graph.link();

        log::debug!("built graph with {} nodes", graph.len());

        Ok(graph)
    }

    /// Two-pass linking: children look up their declared parents by name
    /// (orphans attach to the root), then parents record those children as
    /// their own neighbors.
    fn link(&mut self) {
        let root = NodeId::ROOT;

        // Pass 1: children -> parents.
        for id in 0..self.nodes.len() {
            let id = NodeId(id);
            if id == root {
                continue;
            }

            let parent_names = std::mem::take(&mut self.nodes[id.0].parent_names);

            let mut parent_ids = Vec::new();
            for name in &parent_names {
                if let Some(&parent_id) = self.by_name.get(name) {
                    if !parent_ids.contains(&parent_id) {
                        parent_ids.push(parent_id);
                    }
                }
                // Missing parent names reference packages outside the
                // graph and are silently dropped; they are not errors.
            }

            if parent_ids.is_empty() {
                parent_ids.push(root);
            }

            self.nodes[id.0].parents = parent_ids;
        }

        // Pass 2: parents -> children.
        for id in 0..self.nodes.len() {
            let id = NodeId(id);
            let parents = self.nodes[id.0].parents.clone();
            for parent in parents {
                let siblings = &mut self.nodes[parent.0].children;
                if !siblings.contains(&id) {
                    siblings.push(id);
                }
            }
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Iterates over every node's id in insertion order (root first).
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(name: &str, version: &str, parents: &[&str]) -> Edge {
        Edge {
            name: name.to_string(),
            version: version.to_string(),
            parents: parents.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn root_is_first_and_done() {
        let edges = vec![edge("A", "", &[])];
        let graph = Graph::build(&edges).unwrap();
        assert_eq!(graph.node(NodeId::ROOT).name, ROOT_NAME);
        assert_eq!(graph.node(NodeId::ROOT).status, Status::Done);
    }

    #[test]
    fn orphans_attach_to_root() {
        let edges = vec![edge("A", "", &[])];
        let graph = Graph::build(&edges).unwrap();
        let a = graph.node_id("A").unwrap();
        assert_eq!(graph.node(a).parents, vec![NodeId::ROOT]);
        assert!(graph.node(NodeId::ROOT).children.contains(&a));
    }

    #[test]
    fn linear_chain_links_both_directions() {
        let edges = vec![edge("A", "", &[]), edge("B", "", &["A"]), edge("C", "", &["B"])];
        let graph = Graph::build(&edges).unwrap();

        let a = graph.node_id("A").unwrap();
        let b = graph.node_id("B").unwrap();
        let c = graph.node_id("C").unwrap();

        assert_eq!(graph.node(b).parents, vec![a]);
        assert_eq!(graph.node(c).parents, vec![b]);
        assert!(graph.node(a).children.contains(&b));
        assert!(graph.node(b).children.contains(&c));
    }

    #[test]
    fn missing_parent_names_are_dropped_not_errors() {
        let edges = vec![edge("A", "", &["nonexistent"])];
        let graph = Graph::build(&edges).unwrap();
        let a = graph.node_id("A").unwrap();
        // "nonexistent" doesn't exist, so A has no resolved parents and
        // falls back to the root.
        assert_eq!(graph.node(a).parents, vec![NodeId::ROOT]);
    }

    #[test]
    fn duplicate_names_first_wins() {
        let edges = vec![edge("A", "1.0", &[]), edge("A", "2.0", &["A"])];
        let graph = Graph::build(&edges).unwrap();
        assert_eq!(graph.len(), 2); // root + A, not root + A + A
        let a = graph.node_id("A").unwrap();
        assert_eq!(graph.node(a).version, "1.0");
    }

    #[test]
    fn duplicate_parent_names_collapse() {
        let edges = vec![edge("A", "", &[]), edge("B", "", &["A", "A"])];
        let graph = Graph::build(&edges).unwrap();
        let b = graph.node_id("B").unwrap();
        assert_eq!(graph.node(b).parents.len(), 1);
    }
}
