// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instance arena and the subtree add/remove primitives.

use alloc::vec::Vec;
use core::marker::PhantomData;

use super::id::{InstanceId, InstanceState};
use super::relevance::Relevance;
use crate::node::{INVALID, InstanceRef, MirrorId, NodeId, NodeTree};
use crate::trail::Trail;

/// Callbacks run synchronously while an [`InstanceTree`] mutates.
///
/// All methods default to no-ops.
///
/// # Mid-callback state
///
/// - In [`instance_added`](Self::instance_added) the new instance is already
///   linked into its parent's child list at its paint-order position and
///   registered on its node. Its relevant descendants do not exist yet; they
///   are added (each with its own callback) after this call returns.
/// - In [`instance_disposing`](Self::instance_disposing) every child of the
///   instance has already been disposed, but the instance itself is still
///   active, still registered on its node, and still in its parent's child
///   list. Siblings that the same removal will dispose next may still be
///   present.
pub trait InstanceHooks<R: Relevance> {
    /// Called after an instance is created and linked.
    fn instance_added(&mut self, tree: &NodeTree, instances: &InstanceTree<R>, id: InstanceId) {
        _ = (tree, instances, id);
    }

    /// Called before an instance is unlinked and returned to the free list.
    fn instance_disposing(&mut self, tree: &NodeTree, instances: &InstanceTree<R>, id: InstanceId) {
        _ = (tree, instances, id);
    }
}

impl<R: Relevance> InstanceHooks<R> for () {}

/// A mirror of the relevant part of a [`NodeTree`].
///
/// The mirror owns a synthetic root instance (no node, empty trail). Every
/// other instance corresponds to one trail from the mirror's root node whose
/// last node satisfies `R`. Children are kept in paint order.
///
/// Instances live in struct-of-arrays slots recycled through a free list;
/// serial numbers are allocated by the mirror and never reused.
#[derive(Debug)]
pub struct InstanceTree<R: Relevance> {
    pub(crate) mirror: MirrorId,
    pub(crate) root_node: NodeId,
    pub(crate) root: u32,
    pub(crate) built: bool,

    // -- Per-slot data --
    pub(crate) node: Vec<Option<NodeId>>,
    pub(crate) trail: Vec<Trail>,
    pub(crate) parent: Vec<u32>,
    pub(crate) children: Vec<Vec<u32>>,
    pub(crate) serial: Vec<u64>,
    pub(crate) state: Vec<InstanceState>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    next_serial: u64,
    active: usize,

    _relevance: PhantomData<R>,
}

impl<R: Relevance> InstanceTree<R> {
    /// Creates a mirror of the subtree rooted at `root_node`.
    ///
    /// The mirror starts with only its synthetic root instance; the first
    /// [`sync`](Self::sync) builds the rest.
    pub fn new(tree: &mut NodeTree, root_node: NodeId) -> Self {
        tree.validate(root_node);
        let mirror = tree.register_mirror();
        Self {
            mirror,
            root_node,
            root: 0,
            built: false,
            node: alloc::vec![None],
            trail: alloc::vec![Trail::new()],
            parent: alloc::vec![INVALID],
            children: alloc::vec![Vec::new()],
            serial: alloc::vec![0],
            state: alloc::vec![InstanceState::Active],
            generation: alloc::vec![0],
            free_list: Vec::new(),
            next_serial: 1,
            active: 1,
            _relevance: PhantomData,
        }
    }

    /// Returns this mirror's identifier on the node tree.
    #[must_use]
    pub fn mirror(&self) -> MirrorId {
        self.mirror
    }

    /// Returns the node this mirror is rooted at.
    #[must_use]
    pub fn root_node(&self) -> NodeId {
        self.root_node
    }

    /// Returns the synthetic root instance.
    #[must_use]
    pub fn root(&self) -> InstanceId {
        self.handle(self.root)
    }

    /// Returns the number of active instances, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active
    }

    /// Returns the serial the next created instance will receive.
    #[must_use]
    pub fn next_serial(&self) -> u64 {
        self.next_serial
    }

    /// Returns whether only the root instance exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active == 1
    }

    /// Returns the node displayed by an instance (`None` for the root).
    #[must_use]
    pub fn node(&self, id: InstanceId) -> Option<NodeId> {
        self.validate(id);
        self.node[id.idx as usize]
    }

    /// Returns the trail of an instance.
    #[must_use]
    pub fn trail(&self, id: InstanceId) -> &Trail {
        self.validate(id);
        &self.trail[id.idx as usize]
    }

    /// Returns the parent instance (`None` for the root).
    #[must_use]
    pub fn parent(&self, id: InstanceId) -> Option<InstanceId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.handle(p))
    }

    /// Returns the ordered child instances.
    pub fn children(&self, id: InstanceId) -> impl ExactSizeIterator<Item = InstanceId> + '_ {
        self.validate(id);
        self.children[id.idx as usize]
            .iter()
            .map(|&c| self.handle(c))
    }

    /// Returns the serial number of an instance.
    #[must_use]
    pub fn serial(&self, id: InstanceId) -> u64 {
        self.validate(id);
        self.serial[id.idx as usize]
    }

    /// Returns whether the handle no longer refers to an active instance.
    #[must_use]
    pub fn is_disposed(&self, id: InstanceId) -> bool {
        id.idx as usize >= self.generation.len()
            || self.generation[id.idx as usize] != id.generation
            || self.state[id.idx as usize] == InstanceState::Disposed
    }

    /// Returns the current handle for slot `idx`, or `None` if the slot is
    /// free.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> Option<InstanceId> {
        (self.state.get(idx as usize) == Some(&InstanceState::Active)).then(|| self.handle(idx))
    }

    /// Returns the instances of `node` in this mirror.
    pub fn instances_of<'a>(
        &'a self,
        tree: &'a NodeTree,
        node: NodeId,
    ) -> impl Iterator<Item = InstanceId> + 'a {
        tree.instances(node)
            .iter()
            .filter(move |r| r.mirror == self.mirror)
            .map(|r| r.instance)
    }

    /// Mirrors the subtree at `trail` below `parent`.
    ///
    /// If the trail's last node is relevant, an instance is created for it
    /// (at its paint-order position among `parent`'s children) before
    /// descending, and its relevant descendants attach to it; otherwise they
    /// attach to `parent`. `trail` is used as scratch space and is restored
    /// before returning.
    ///
    /// # Panics
    ///
    /// Panics if `trail` is empty or `parent` is stale.
    pub fn add_subtree<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        parent: InstanceId,
        trail: &mut Trail,
        hooks: &mut H,
    ) {
        self.validate(parent);
        let Some(node) = trail.last_node() else {
            panic!("add_subtree needs a non-empty trail");
        };
        self.add_subtree_at(tree, parent.idx, node, trail, hooks);
    }

    fn add_subtree_at<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        parent: u32,
        node: NodeId,
        trail: &mut Trail,
        hooks: &mut H,
    ) {
        let mut anchor = parent;
        if R::is_relevant(tree, node) {
            let id = self.create(tree, parent, node, trail.clone());
            hooks.instance_added(tree, self, id);
            anchor = id.idx;
        }
        let slot = node.idx as usize;
        let mut i = 0;
        while let Some(&c) = tree.children[slot].get(i) {
            let child = NodeId {
                idx: c,
                generation: tree.generation[c as usize],
            };
            trail.add_descendant(child, i);
            self.add_subtree_at(tree, anchor, child, trail, hooks);
            trail.remove_descendant();
            i += 1;
        }
    }

    /// Disposes every child of `parent` whose trail extends (or equals)
    /// `trail`.
    ///
    /// Children are scanned in reverse so removals do not shift entries
    /// still to be visited.
    pub fn remove_subtree<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        parent: InstanceId,
        trail: &Trail,
        hooks: &mut H,
    ) {
        self.validate(parent);
        let p = parent.idx as usize;
        let mut i = self.children[p].len();
        while i > 0 {
            i -= 1;
            let Some(&c) = self.children[p].get(i) else {
                continue;
            };
            if self.trail[c as usize].is_extension_of(trail, true) {
                self.dispose_at(tree, c, hooks);
            }
        }
    }

    /// Disposes an instance and, first, all of its descendants.
    ///
    /// The instance is unlinked from its parent, unregistered from its node,
    /// and its slot is returned to the free list.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale (including double disposal) or refers
    /// to the root instance.
    pub fn dispose<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        id: InstanceId,
        hooks: &mut H,
    ) {
        self.validate(id);
        assert!(id.idx != self.root, "cannot dispose the root instance");
        self.dispose_at(tree, id.idx, hooks);
    }

    pub(crate) fn dispose_at<H: InstanceHooks<R>>(
        &mut self,
        tree: &mut NodeTree,
        idx: u32,
        hooks: &mut H,
    ) {
        let i = idx as usize;
        assert!(
            self.state[i] == InstanceState::Active,
            "instance {idx} disposed twice"
        );
        while let Some(&c) = self.children[i].last() {
            self.dispose_at(tree, c, hooks);
        }

        let id = self.handle(idx);
        hooks.instance_disposing(tree, self, id);

        let p = self.parent[i];
        if p != INVALID {
            self.children[p as usize].retain(|&c| c != idx);
        }
        if let Some(node) = self.node[i].take() {
            tree.remove_instance(
                node,
                InstanceRef {
                    mirror: self.mirror,
                    instance: id,
                },
            );
        }
        self.trail[i] = Trail::new();
        self.parent[i] = INVALID;
        self.state[i] = InstanceState::Disposed;
        self.generation[i] += 1;
        self.free_list.push(idx);
        self.active -= 1;
    }

    /// Allocates an instance for `node` at `trail` and links it under
    /// `parent` at its paint-order position.
    fn create(&mut self, tree: &mut NodeTree, parent: u32, node: NodeId, trail: Trail) -> InstanceId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            assert!(
                self.state[i] == InstanceState::Disposed,
                "re-initialising instance {idx} that was not disposed"
            );
            debug_assert!(
                self.children[i].is_empty() && self.node[i].is_none(),
                "pooled instance {idx} still holds references"
            );
            self.node[i] = Some(node);
            self.trail[i] = trail;
            self.parent[i] = parent;
            self.serial[i] = self.next_serial;
            self.state[i] = InstanceState::Active;
            idx
        } else {
            let idx = u32::try_from(self.node.len()).unwrap_or(INVALID);
            assert!(idx != INVALID, "instance arena exhausted");
            self.node.push(Some(node));
            self.trail.push(trail);
            self.parent.push(parent);
            self.children.push(Vec::new());
            self.serial.push(self.next_serial);
            self.state.push(InstanceState::Active);
            self.generation.push(0);
            idx
        };
        self.next_serial += 1;
        self.active += 1;

        let pos = {
            let new_trail = &self.trail[idx as usize];
            self.children[parent as usize].partition_point(|&c| {
                self.trail[c as usize].compare_live(new_trail, tree) == core::cmp::Ordering::Less
            })
        };
        self.children[parent as usize].insert(pos, idx);

        let id = self.handle(idx);
        tree.add_instance(
            node,
            InstanceRef {
                mirror: self.mirror,
                instance: id,
            },
        );
        id
    }

    /// Rewrites the stored sibling index at `depth` for an instance and all
    /// of its descendants.
    pub(crate) fn set_trail_index(&mut self, idx: u32, depth: usize, index: usize) {
        let mut stack = alloc::vec![idx];
        while let Some(i) = stack.pop() {
            self.trail[i as usize].set_index(depth, index);
            stack.extend_from_slice(&self.children[i as usize]);
        }
    }

    pub(crate) fn handle(&self, idx: u32) -> InstanceId {
        InstanceId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: InstanceId) {
        assert!(
            !self.is_disposed(id),
            "stale InstanceId: {id:?} (current gen: {})",
            self.generation.get(id.idx as usize).copied().unwrap_or(u32::MAX)
        );
    }
}
