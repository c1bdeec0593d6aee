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

//! Assigns each node a build priority (topological level) and promotes
//! nodes whose parents are already ready to `Status::Ready`.
//!
//! The reference implementation walked this recursively, re-entering a node
//! every time one of its parents was visited again. That's fine in C with a
//! deep call stack, but a worklist is the idiomatic way to do the same
//! re-entry-tolerant fixpoint in Rust without risking stack growth on a
//! graph with thousands of packages.

use std::collections::VecDeque;

use crate::error::PriorityError;
use crate::graph::{Graph, NodeId, Status};

/// Assigns priorities and readiness, then sorts `graph.order` by ascending
/// priority (stable, so ties keep insertion order).
pub fn assign(
    graph: &mut Graph,
    designated_priority_package: Option<&str>,
) -> Result<(), PriorityError> {
    if graph.is_empty() {
        return Err(PriorityError::NoRoot);
    }

    let root = NodeId::ROOT;

    let mut worklist: VecDeque<NodeId> = VecDeque::new();
    worklist.push_back(root);

    while let Some(parent) = worklist.pop_front() {
        let children = graph.node(parent).children.clone();

        for child in children {
            let all_parents_ready = graph
                .node(child)
                .parents
                .iter()
                .all(|&p| graph.node(p).status >= Status::Ready);

            if all_parents_ready {
                let max_parent_priority = graph
                    .node(child)
                    .parents
                    .iter()
                    .map(|&p| graph.node(p).priority)
                    .max()
                    .unwrap_or(0);

                let node = graph.node_mut(child);
                node.priority = node.priority.max(max_parent_priority + 1);

                if node.status == Status::Pending {
                    node.status = Status::Ready;
                }

                log::trace!("{} assigned priority {}", node.name, node.priority);

                // Re-entry is safe: priorities only grow and status only
                // advances, so revisiting a node through another parent
                // either raises its priority or is a no-op.
                worklist.push_back(child);
            }
        }
    }

    apply_tie_break(graph, designated_priority_package);

    graph.order = graph.ids().collect();
    graph.order.sort_by_key(|&id| graph.node(id).priority);

    Ok(())
}

/// If `designated` names a node in the graph and some other node shares its
/// priority, every other node at or above that level is bumped by one. A
/// no-op if `designated` is `None` or absent from the graph.
fn apply_tie_break(graph: &mut Graph, designated: Option<&str>) {
    let designated_id = match designated.and_then(|name| graph.node_id(name)) {
        Some(id) => id,
        None => return,
    };

    let level = graph.node(designated_id).priority;

    let shares_level = graph
        .ids()
        .any(|id| id != designated_id && graph.node(id).priority == level);

    if !shares_level {
        return;
    }

    log::debug!(
        "{:?} ties designated package at priority {}, bumping competitors",
        designated,
        level
    );

    for id in graph.ids().collect::<Vec<_>>() {
        if id == designated_id {
            continue;
        }

        if graph.node(id).priority >= level {
            graph.node_mut(id).priority += 1;
        }
    }
}
