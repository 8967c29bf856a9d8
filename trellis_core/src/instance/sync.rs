// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental reconciliation of a mirror from drained tree changes.
//!
//! Structural changes arrive as parents whose child list changed. For each
//! such parent `P` (visited ancestors-first) and each trail `T` reaching it,
//! the anchor is the deepest instance whose trail is a prefix of `T`. The
//! anchor's children that extend `T` form contiguous groups, one per child
//! node of `P`. Groups whose node left `P` are disposed; groups that are now
//! out of order are disposed and re-added; untouched groups keep their
//! instances and only have their stored sibling index refreshed; new child
//! nodes are added with [`add_subtree`](InstanceTree::add_subtree).
//!
//! Relevance changes rebuild the node's subtree at every trail.

use alloc::vec::Vec;

use super::relevance::Relevance;
use super::tree::{InstanceHooks, InstanceTree};
use crate::node::{NodeId, NodeTree, TreeChanges};
use crate::trail::Trail;

/// Counts of instance churn produced by one [`InstanceTree::sync`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Instances created.
    pub created: usize,
    /// Instances disposed.
    pub disposed: usize,
}

impl<R: Relevance> InstanceTree<R> {
    /// Brings the mirror up to date with `changes`.
    ///
    /// The first call builds the whole mirror from the root node and ignores
    /// `changes`.
    ///
    /// # Panics
    ///
    /// Panics if the mirror's root node has been destroyed.
    pub fn sync<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        changes: &TreeChanges,
        hooks: &mut H,
    ) -> SyncStats {
        assert!(
            tree.is_alive(self.root_node),
            "mirror root node {:?} was destroyed",
            self.root_node
        );
        let before_serial = self.next_serial();
        let before_active = self.len();

        if !self.built {
            self.built = true;
            let root = self.root();
            let mut trail = Trail::from_root(self.root_node);
            self.add_subtree(tree, root, &mut trail, hooks);
        } else {
            if !changes.topology.is_empty() {
                let mut changed = alloc::vec![false; tree.len as usize];
                for &idx in &changes.topology {
                    if let Some(flag) = changed.get_mut(idx as usize) {
                        *flag = true;
                    }
                }
                for idx in tree.topological_order(self.root_node) {
                    if changed[idx as usize] {
                        if let Some(parent) = tree.id_at(idx) {
                            self.reconcile_children(tree, parent, hooks);
                        }
                    }
                }
            }
            for &idx in R::refreshed(changes) {
                if let Some(node) = tree.id_at(idx) {
                    for trail in tree.trails_to(self.root_node, node) {
                        if !self.built_since(&trail, before_serial) {
                            self.refresh(tree, trail, hooks);
                        }
                    }
                }
            }
        }

        let created = usize::try_from(self.next_serial() - before_serial).unwrap_or(usize::MAX);
        SyncStats {
            created,
            disposed: (before_active + created).saturating_sub(self.len()),
        }
    }

    /// Rebuilds the mirror below the node at `trail`.
    pub(crate) fn refresh<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        mut trail: Trail,
        hooks: &mut H,
    ) {
        let anchor = self.handle(self.find_anchor(&trail, false));
        self.remove_subtree(tree, anchor, &trail, hooks);
        self.add_subtree(tree, anchor, &mut trail, hooks);
    }

    /// Returns whether the instance at exactly `trail` was created with a
    /// serial of at least `serial`, and so reflects the current node state.
    fn built_since(&self, trail: &Trail, serial: u64) -> bool {
        let at = self.find_anchor(trail, true);
        at != self.root
            && self.trail[at as usize].len() == trail.len()
            && self.serial[at as usize] >= serial
    }

    /// Reconciles the instances below `parent` with its current child list.
    fn reconcile_children<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        parent: NodeId,
        hooks: &mut H,
    ) {
        for mut trail in tree.trails_to(self.root_node, parent) {
            let anchor = self.find_anchor(&trail, true);
            let depth = trail.len();

            // Contiguous runs of anchor children, keyed by the child of
            // `parent` they descend from.
            let mut groups: Vec<(NodeId, Vec<u32>)> = Vec::new();
            for &c in &self.children[anchor as usize] {
                let t = &self.trail[c as usize];
                if !t.is_extension_of(&trail, false) {
                    continue;
                }
                let key = t.nodes()[depth];
                match groups.last_mut() {
                    Some((k, members)) if *k == key => members.push(c),
                    _ => groups.push((key, alloc::vec![c])),
                }
            }

            let mut kept: Vec<NodeId> = Vec::new();
            let mut last_index = None;
            for (key, members) in groups {
                let index = tree.child_index(parent, key);
                let in_order = match (index, last_index) {
                    (Some(i), Some(l)) => i > l,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if in_order && !kept.contains(&key) {
                    let Some(i) = index else { continue };
                    last_index = Some(i);
                    kept.push(key);
                    for m in members {
                        self.set_trail_index(m, depth - 1, i);
                    }
                } else {
                    for &m in members.iter().rev() {
                        self.dispose_at(tree, m, hooks);
                    }
                }
            }

            let mut i = 0;
            while let Some(&c) = tree.children[parent.idx as usize].get(i) {
                let child = NodeId {
                    idx: c,
                    generation: tree.generation[c as usize],
                };
                if !kept.contains(&child) {
                    trail.add_descendant(child, i);
                    let anchor = self.handle(anchor);
                    self.add_subtree(tree, anchor, &mut trail, hooks);
                    trail.remove_descendant();
                }
                i += 1;
            }
        }
    }

    /// Returns the deepest instance whose trail is a prefix of `trail`
    /// (equal allowed when `allow_equal`).
    pub(crate) fn find_anchor(&self, trail: &Trail, allow_equal: bool) -> u32 {
        let mut current = self.root;
        loop {
            let next = self.children[current as usize]
                .iter()
                .copied()
                .find(|&c| trail.is_extension_of(&self.trail[c as usize], allow_equal));
            match next {
                Some(c) => current = c,
                None => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::{Rect, Shape};

    use super::*;
    use crate::instance::{InstanceId, RenderRelevance};
    use crate::node::{NodeContent, NodeFlags, ShapeContent};

    fn shape() -> NodeContent {
        NodeContent::Shape(ShapeContent {
            path: Rect::new(0.0, 0.0, 1.0, 1.0).to_path(0.1),
            fill: None,
            stroke: None,
        })
    }

    fn leaf(tree: &mut NodeTree) -> NodeId {
        let n = tree.create_node();
        tree.set_content(n, Some(shape()));
        n
    }

    fn nodes_of(mirror: &InstanceTree<RenderRelevance>, id: InstanceId) -> Vec<NodeId> {
        mirror
            .children(id)
            .filter_map(|c| mirror.node(c))
            .collect()
    }

    fn step(tree: &mut NodeTree, mirror: &mut InstanceTree<RenderRelevance>) -> SyncStats {
        let changes = tree.evaluate();
        let stats = mirror.sync(tree, &changes, &mut ());
        mirror.audit(tree);
        stats
    }

    #[test]
    fn first_sync_builds_everything() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let a = leaf(&mut tree);
        let b = leaf(&mut tree);
        tree.add_child(root, a);
        tree.add_child(root, b);
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        let stats = step(&mut tree, &mut mirror);
        assert_eq!(stats.created, 2);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![a, b]);
    }

    #[test]
    fn insertion_keeps_existing_instances() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let a = leaf(&mut tree);
        let c = leaf(&mut tree);
        tree.add_child(root, a);
        tree.add_child(root, c);
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        step(&mut tree, &mut mirror);
        let before: Vec<_> = mirror.children(mirror.root()).collect();

        let b = leaf(&mut tree);
        tree.insert_child(root, 1, b);
        let stats = step(&mut tree, &mut mirror);
        assert_eq!(stats, SyncStats { created: 1, disposed: 0 });

        let after: Vec<_> = mirror.children(mirror.root()).collect();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[2], before[1]);
        assert_eq!(mirror.trail(after[2]).indices(), &[2]);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![a, b, c]);
    }

    #[test]
    fn reorder_readds_out_of_order_groups() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let a = leaf(&mut tree);
        let b = leaf(&mut tree);
        let c = leaf(&mut tree);
        for n in [a, b, c] {
            tree.add_child(root, n);
        }
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        step(&mut tree, &mut mirror);

        tree.move_child(root, c, 0);
        let stats = step(&mut tree, &mut mirror);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![c, a, b]);
        assert!(stats.created <= 2);
    }

    #[test]
    fn transparent_container_children_attach_to_anchor() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let group = tree.create_node();
        let a = leaf(&mut tree);
        let z = leaf(&mut tree);
        tree.add_child(root, group);
        tree.add_child(root, z);
        tree.add_child(group, a);
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        step(&mut tree, &mut mirror);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![a, z]);

        let b = leaf(&mut tree);
        tree.add_child(group, b);
        step(&mut tree, &mut mirror);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![a, b, z]);

        tree.remove_child(root, group);
        step(&mut tree, &mut mirror);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![z]);
    }

    #[test]
    fn relevance_flip_rebuilds_subtree() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let group = tree.create_node();
        let a = leaf(&mut tree);
        tree.add_child(root, group);
        tree.add_child(group, a);
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        step(&mut tree, &mut mirror);

        tree.set_flags(group, NodeFlags::LAYER_SPLIT);
        step(&mut tree, &mut mirror);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![group]);
        let g = mirror.children(mirror.root()).next().unwrap();
        assert_eq!(nodes_of(&mirror, g), vec![a]);

        tree.set_flags(group, NodeFlags::empty());
        step(&mut tree, &mut mirror);
        assert_eq!(nodes_of(&mirror, mirror.root()), vec![a]);
    }

    #[test]
    fn shared_node_gets_one_instance_per_trail() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let p1 = tree.create_node();
        let p2 = tree.create_node();
        let shared = leaf(&mut tree);
        tree.add_child(root, p1);
        tree.add_child(root, p2);
        tree.add_child(p1, shared);
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        step(&mut tree, &mut mirror);
        assert_eq!(mirror.instances_of(&tree, shared).count(), 1);

        tree.add_child(p2, shared);
        step(&mut tree, &mut mirror);
        assert_eq!(mirror.instances_of(&tree, shared).count(), 2);

        tree.remove_child(p1, shared);
        step(&mut tree, &mut mirror);
        let inst: Vec<_> = mirror.instances_of(&tree, shared).collect();
        assert_eq!(inst.len(), 1);
        assert_eq!(mirror.trail(inst[0]).nodes(), &[root, p2, shared]);
    }

    #[test]
    fn destroyed_node_instances_are_disposed() {
        let mut tree = NodeTree::new();
        let root = tree.create_node();
        let a = leaf(&mut tree);
        tree.add_child(root, a);
        let mut mirror = InstanceTree::<RenderRelevance>::new(&mut tree, root);
        step(&mut tree, &mut mirror);
        let inst = mirror.children(mirror.root()).next().unwrap();

        tree.destroy_node(a);
        let stats = step(&mut tree, &mut mirror);
        assert_eq!(stats.disposed, 1);
        assert!(mirror.is_disposed(inst));
    }
}
