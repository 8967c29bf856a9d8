// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Root-to-node paths.
//!
//! A [`Trail`] addresses one occurrence of a node in the scene graph: the
//! sequence of nodes from a root down to the node, plus the sibling index of
//! each step. Because nodes may be shared between parents, the same node can
//! be the last element of several trails.
//!
//! Trails are plain values. Recursive traversals mutate one trail in place
//! with [`add_descendant`](Trail::add_descendant) /
//! [`remove_descendant`](Trail::remove_descendant) and clone it only where
//! the walk branches into something that keeps the trail.

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::node::{NodeId, NodeTree};

/// An ordered path of nodes from a root to a target node.
///
/// `indices[i]` is the position of `nodes[i + 1]` in the child list of
/// `nodes[i]`. Equality compares the node sequence only.
#[derive(Clone, Debug, Default)]
pub struct Trail {
    nodes: Vec<NodeId>,
    indices: Vec<usize>,
}

impl Trail {
    /// Creates an empty trail.
    ///
    /// The empty trail belongs to a mirror's synthetic root instance and is
    /// a prefix of every other trail.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Creates a trail holding just `root`.
    #[must_use]
    pub fn from_root(root: NodeId) -> Self {
        let mut nodes = Vec::with_capacity(4);
        nodes.push(root);
        Self {
            nodes,
            indices: Vec::new(),
        }
    }

    /// Extends the trail by one level: `node` is child number `index` of the
    /// current last node.
    ///
    /// # Panics
    ///
    /// Panics if the trail is empty.
    pub fn add_descendant(&mut self, node: NodeId, index: usize) {
        assert!(!self.nodes.is_empty(), "cannot descend from an empty trail");
        self.nodes.push(node);
        self.indices.push(index);
    }

    /// Removes the last level of the trail.
    ///
    /// # Panics
    ///
    /// Panics if the trail holds fewer than two nodes.
    pub fn remove_descendant(&mut self) {
        assert!(self.nodes.len() > 1, "cannot remove the root of a trail");
        self.nodes.pop();
        self.indices.pop();
    }

    /// Returns the nodes of the trail, root first.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Returns the sibling index of each step below the root.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Returns the first node, if any.
    #[must_use]
    pub fn root_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Returns the last node, if any.
    #[must_use]
    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Returns the number of nodes in the trail.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the trail holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Overwrites the stored sibling index of step `depth`.
    pub(crate) fn set_index(&mut self, depth: usize, index: usize) {
        self.indices[depth] = index;
    }

    /// Refreshes every sibling index from the live tree.
    ///
    /// Returns `false` (leaving the trail untouched) if some step is no
    /// longer a parent/child edge.
    pub fn reindex(&mut self, tree: &NodeTree) -> bool {
        let mut fresh = Vec::with_capacity(self.indices.len());
        for pair in self.nodes.windows(2) {
            match tree.child_index(pair[0], pair[1]) {
                Some(i) => fresh.push(i),
                None => return false,
            }
        }
        self.indices = fresh;
        true
    }

    /// Returns whether `other` is a prefix of this trail.
    ///
    /// With `allow_equal` the trails may be equal; otherwise `self` must be
    /// strictly longer.
    #[must_use]
    pub fn is_extension_of(&self, other: &Self, allow_equal: bool) -> bool {
        let longer = if allow_equal {
            self.nodes.len() >= other.nodes.len()
        } else {
            self.nodes.len() > other.nodes.len()
        };
        longer && self.nodes[..other.nodes.len()] == other.nodes[..]
    }

    /// Compares two trails in paint order (depth-first pre-order) using the
    /// stored sibling indices.
    ///
    /// A trail sorts before all of its extensions.
    ///
    /// # Panics
    ///
    /// Panics if the trails do not share the same root.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        self.compare_with(other, |depth, _, _| {
            (self.indices[depth - 1], other.indices[depth - 1])
        })
    }

    /// Like [`compare`](Self::compare), but reads sibling positions at the
    /// point of divergence from the live tree, falling back to the stored
    /// indices for edges that no longer exist.
    ///
    /// # Panics
    ///
    /// Panics if the trails do not share the same root.
    #[must_use]
    pub fn compare_live(&self, other: &Self, tree: &NodeTree) -> Ordering {
        self.compare_with(other, |depth, parent, (a, b)| {
            let ia = tree
                .child_index(parent, a)
                .unwrap_or(self.indices[depth - 1]);
            let ib = tree
                .child_index(parent, b)
                .unwrap_or(other.indices[depth - 1]);
            (ia, ib)
        })
    }

    fn compare_with(
        &self,
        other: &Self,
        positions: impl Fn(usize, NodeId, (NodeId, NodeId)) -> (usize, usize),
    ) -> Ordering {
        assert!(
            self.root_node() == other.root_node(),
            "cannot compare trails with different roots: {:?} vs {:?}",
            self.root_node(),
            other.root_node()
        );
        let common = self.nodes.len().min(other.nodes.len());
        for depth in 1..common {
            let (a, b) = (self.nodes[depth], other.nodes[depth]);
            if a != b {
                let (ia, ib) = positions(depth, self.nodes[depth - 1], (a, b));
                return ia.cmp(&ib);
            }
        }
        self.nodes.len().cmp(&other.nodes.len())
    }
}

impl PartialEq for Trail {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl Eq for Trail {}
