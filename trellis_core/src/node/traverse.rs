// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use alloc::vec::Vec;

use super::id::NodeId;
use super::store::NodeTree;

/// An iterator over the ordered children of a node.
///
/// Created by [`NodeTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a NodeTree,
    slots: core::slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a NodeTree, slots: &'a [u32]) -> Self {
        Self {
            tree,
            slots: slots.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let &idx = self.slots.next()?;
        Some(NodeId {
            idx,
            generation: self.tree.generation[idx as usize],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

impl NodeTree {
    /// Returns every live node reachable from `root` in reverse post-order.
    ///
    /// In a DAG this lists each node after all of its ancestors that are
    /// reachable from `root`, which is the order structural reconciliation
    /// needs.
    #[must_use]
    pub fn topological_order(&self, root: NodeId) -> Vec<u32> {
        self.validate(root);
        let mut visited = alloc::vec![false; self.len as usize];
        let mut post = Vec::new();
        // (node, next child position)
        let mut stack = alloc::vec![(root.idx, 0_usize)];
        visited[root.idx as usize] = true;
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(&child) = self.children[node as usize].get(top.1) {
                top.1 += 1;
                if !core::mem::replace(&mut visited[child as usize], true) {
                    stack.push((child, 0));
                }
            } else {
                post.push(node);
                stack.pop();
            }
        }
        post.reverse();
        post
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topological_order_puts_shared_node_after_all_parents() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let a = tree.create_node();
        let b = tree.create_node();
        let shared = tree.create_node();
        tree.add_child(root, a);
        tree.add_child(root, shared);
        tree.add_child(root, b);
        tree.add_child(b, shared);
        tree.add_child(a, b);

        let order = tree.topological_order(root);
        let pos = |n: NodeId| order.iter().position(|&x| x == n.idx);
        assert_eq!(order.len(), 4);
        assert_eq!(pos(root), Some(0));
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(shared));
    }

    #[test]
    fn children_iterator_is_exact() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let a = tree.create_node();
        tree.add_child(root, a);
        let kids = tree.children(root);
        assert_eq!(kids.len(), 1);
    }
}
