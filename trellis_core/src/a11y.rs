// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The accessible mirror.
//!
//! An [`AccessibleMirror`] projects the nodes carrying an
//! [`AccessibleContent`] into their own instance tree, reusing the same
//! reconciliation as rendering. Nodes without a description are transparent:
//! described descendants attach to the nearest described ancestor.
//!
//! Roles and labels are read from the node tree on demand; only gaining or
//! losing a description changes the mirror's structure.

use alloc::vec::Vec;

use crate::instance::{AccessibleRelevance, InstanceHooks, InstanceId, InstanceTree};
use crate::node::{AccessibleContent, NodeId, NodeTree, TreeChanges};

/// Structural changes of one [`AccessibleMirror::sync`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessibleUpdate {
    /// Instances created, parents before children.
    pub added: Vec<InstanceId>,
    /// Instances disposed, children before parents.
    pub removed: Vec<InstanceId>,
}

impl AccessibleUpdate {
    /// Returns whether the accessible structure is unchanged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl InstanceHooks<AccessibleRelevance> for AccessibleUpdate {
    fn instance_added(
        &mut self,
        _tree: &NodeTree,
        _instances: &InstanceTree<AccessibleRelevance>,
        id: InstanceId,
    ) {
        self.added.push(id);
    }

    fn instance_disposing(
        &mut self,
        _tree: &NodeTree,
        _instances: &InstanceTree<AccessibleRelevance>,
        id: InstanceId,
    ) {
        self.removed.push(id);
    }
}

/// One described instance in pre-order.
#[derive(Clone, Copy, Debug)]
pub struct AccessibleEntry<'a> {
    /// The instance.
    pub instance: InstanceId,
    /// Its node.
    pub node: NodeId,
    /// Nesting depth below the mirror root, starting at 0.
    pub depth: usize,
    /// The node's description.
    pub content: &'a AccessibleContent,
}

/// Instance tree of the described nodes below one root.
#[derive(Debug)]
pub struct AccessibleMirror {
    mirror: InstanceTree<AccessibleRelevance>,
}

impl AccessibleMirror {
    /// Creates a mirror of the subtree at `root`. The first
    /// [`sync`](Self::sync) builds it.
    ///
    /// # Panics
    ///
    /// Panics if `root` is stale.
    pub fn new(tree: &mut NodeTree, root: NodeId) -> Self {
        Self {
            mirror: InstanceTree::new(tree, root),
        }
    }

    /// Returns the underlying instance tree.
    #[must_use]
    pub fn instances(&self) -> &InstanceTree<AccessibleRelevance> {
        &self.mirror
    }

    /// Reconciles the mirror with `changes` and reports what was created
    /// and disposed.
    ///
    /// # Panics
    ///
    /// Panics if the mirror's root node was destroyed.
    pub fn sync(&mut self, tree: &mut NodeTree, changes: &TreeChanges) -> AccessibleUpdate {
        let mut update = AccessibleUpdate::default();
        self.mirror.sync(tree, changes, &mut update);
        update
    }

    /// Returns the description of an instance, if it is live.
    #[must_use]
    pub fn content<'a>(&self, tree: &'a NodeTree, id: InstanceId) -> Option<&'a AccessibleContent> {
        if self.mirror.is_disposed(id) {
            return None;
        }
        self.mirror.node(id).and_then(|n| tree.accessible(n))
    }

    /// Lists the described instances in pre-order.
    #[must_use]
    pub fn entries<'a>(&self, tree: &'a NodeTree) -> Vec<AccessibleEntry<'a>> {
        let mut out = Vec::with_capacity(self.mirror.len().saturating_sub(1));
        let mut stack: Vec<(InstanceId, usize)> = Vec::new();
        let top: Vec<InstanceId> = self.mirror.children(self.mirror.root()).collect();
        stack.extend(top.into_iter().rev().map(|c| (c, 0)));
        while let Some((id, depth)) = stack.pop() {
            if let Some(node) = self.mirror.node(id) {
                if let Some(content) = tree.accessible(node) {
                    out.push(AccessibleEntry {
                        instance: id,
                        node,
                        depth,
                        content,
                    });
                }
            }
            let children: Vec<InstanceId> = self.mirror.children(id).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        out
    }

    /// Checks the mirror against the node tree.
    ///
    /// # Panics
    ///
    /// Panics if the structure diverged, or if an instance's node lost its
    /// description without the mirror noticing.
    pub fn audit(&self, tree: &NodeTree) {
        self.mirror.audit(tree);
        let mut stack: Vec<InstanceId> = self.mirror.children(self.mirror.root()).collect();
        while let Some(id) = stack.pop() {
            let node = self.mirror.node(id);
            assert!(
                node.is_some_and(|n| tree.accessible(n).is_some()),
                "accessible instance {id:?} has no description"
            );
            stack.extend(self.mirror.children(id));
        }
    }
}
