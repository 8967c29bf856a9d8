// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Consistency checks comparing a mirror against a fresh derivation.

use alloc::vec::Vec;

use super::id::InstanceState;
use super::relevance::Relevance;
use super::tree::InstanceTree;
use crate::node::{INVALID, NodeId, NodeTree};
use crate::trail::Trail;

/// One entry of the expected nested order of a mirror.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpectedInstance {
    /// Trail of the relevant node.
    pub trail: Trail,
    /// Relevant descendants attaching to this entry, in paint order.
    pub children: Vec<Self>,
}

impl<R: Relevance> InstanceTree<R> {
    /// Derives, from scratch, the children the root instance must have.
    #[must_use]
    pub fn expected_order(&self, tree: &NodeTree) -> Vec<ExpectedInstance> {
        let mut out = Vec::new();
        let mut trail = Trail::from_root(self.root_node);
        expected_into::<R>(tree, self.root_node, &mut trail, &mut out);
        out
    }

    /// Checks the mirror against an expected nested order.
    ///
    /// # Panics
    ///
    /// Panics on any difference in child count, trail, parent link, or
    /// lifecycle state. A mismatch means incremental reconciliation diverged
    /// from the node tree.
    pub fn audit_root(&self, expected: &[ExpectedInstance]) {
        self.audit_children(self.root, expected);
    }

    /// Derives the expected order from `tree` and audits against it, also
    /// checking that every instance is registered on its node.
    ///
    /// # Panics
    ///
    /// See [`audit_root`](Self::audit_root).
    pub fn audit(&self, tree: &NodeTree) {
        self.audit_root(&self.expected_order(tree));
        let mut stack = alloc::vec![self.root];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.node[idx as usize] {
                let id = self.handle(idx);
                assert!(
                    self.instances_of(tree, node).any(|i| i == id),
                    "instance {id:?} is not registered on {node:?}"
                );
            }
            stack.extend_from_slice(&self.children[idx as usize]);
        }
    }

    fn audit_children(&self, idx: u32, expected: &[ExpectedInstance]) {
        let actual = &self.children[idx as usize];
        assert!(
            actual.len() == expected.len(),
            "instance #{} has {} children, expected {}",
            self.serial[idx as usize],
            actual.len(),
            expected.len()
        );
        for (&c, e) in actual.iter().zip(expected) {
            let i = c as usize;
            assert!(
                self.state[i] == InstanceState::Active,
                "disposed instance {c} still linked under #{}",
                self.serial[idx as usize]
            );
            assert!(
                self.parent[i] == idx && self.parent[i] != INVALID,
                "instance #{} has a broken parent link",
                self.serial[i]
            );
            assert!(
                self.trail[i] == e.trail,
                "instance #{} has trail {:?}, expected {:?}",
                self.serial[i],
                self.trail[i].nodes(),
                e.trail.nodes()
            );
            self.audit_children(c, &e.children);
        }
    }
}

fn expected_into<R: Relevance>(
    tree: &NodeTree,
    node: NodeId,
    trail: &mut Trail,
    out: &mut Vec<ExpectedInstance>,
) {
    if R::is_relevant(tree, node) {
        let mut entry = ExpectedInstance {
            trail: trail.clone(),
            children: Vec::new(),
        };
        expected_children::<R>(tree, node, trail, &mut entry.children);
        out.push(entry);
    } else {
        expected_children::<R>(tree, node, trail, out);
    }
}

fn expected_children<R: Relevance>(
    tree: &NodeTree,
    node: NodeId,
    trail: &mut Trail,
    out: &mut Vec<ExpectedInstance>,
) {
    for (i, child) in tree.children(node).enumerate() {
        trail.add_descendant(child, i);
        expected_into::<R>(tree, child, trail, out);
        trail.remove_descendant();
    }
}
