// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-instance paint state: drawables, listeners and resolved properties.

use alloc::vec::Vec;

use kurbo::Affine;

use crate::backend::{BackendError, Placement, SurfaceBackend, SurfaceId};
use crate::block::{BlockId, BlockKey, BlockStore};
use crate::drawable::{
    DirtyAttrs, DrawableId, DrawableKind, DrawablePool, HasTransform, PaintFrame, Paintable,
};
use crate::instance::{InstanceHooks, InstanceId, InstanceTree, RenderRelevance};
use crate::node::{INVALID, NodeFlags, NodeId, NodeTree};
use crate::renderer::{Renderer, Renderers};
use crate::stitch::ChangeInterval;
#[cfg(feature = "trace-rich")]
use crate::trace::{DrawableChange, DrawableEvent};

/// Side table entry for one instance slot.
#[derive(Clone, Debug)]
pub(crate) struct InstanceSlot {
    pub(crate) drawable: Option<DrawableId>,
    pub(crate) transform_root: Option<InstanceId>,
    pub(crate) filter_root: Option<InstanceId>,
    /// Deeper of the two roots.
    pub(crate) anchor: Option<InstanceId>,
    /// Transform from node space to the anchor's surface.
    pub(crate) relative: Affine,
    /// Opacity below the filter root.
    pub(crate) opacity: f64,
    pub(crate) hidden: bool,
    /// Outstanding relative-transform precompute requests.
    pub(crate) precompute: u32,
    pub(crate) transform_listeners: Vec<DrawableId>,
    pub(crate) paint_listeners: Vec<DrawableId>,
    /// Drawables whose block is placed relative to this instance.
    pub(crate) anchored: Vec<DrawableId>,
}

impl Default for InstanceSlot {
    fn default() -> Self {
        Self {
            drawable: None,
            transform_root: None,
            filter_root: None,
            anchor: None,
            relative: Affine::IDENTITY,
            opacity: 1.0,
            hidden: false,
            precompute: 0,
            transform_listeners: Vec::new(),
            paint_listeners: Vec::new(),
            anchored: Vec::new(),
        }
    }
}

/// Owns the drawables and blocks of a display and reacts to mirror churn.
#[derive(Debug)]
pub(crate) struct Painter {
    pub(crate) enabled: Renderers,
    pub(crate) preference: Vec<Renderer>,
    pub(crate) keep_elements: bool,
    pub(crate) pool: DrawablePool,
    pub(crate) blocks: BlockStore,
    pub(crate) pending: Vec<ChangeInterval>,
    pub(crate) slots: Vec<InstanceSlot>,
    pub(crate) drawables_created: usize,
    pub(crate) drawables_disposed: usize,
    #[cfg(feature = "trace-rich")]
    pub(crate) log: Vec<DrawableChange>,
}

impl Painter {
    pub(crate) fn new(enabled: Renderers, preference: Vec<Renderer>, keep_elements: bool) -> Self {
        Self {
            enabled,
            preference,
            keep_elements,
            pool: DrawablePool::new(),
            blocks: BlockStore::new(),
            pending: Vec::new(),
            slots: alloc::vec![InstanceSlot::default()],
            drawables_created: 0,
            drawables_disposed: 0,
            #[cfg(feature = "trace-rich")]
            log: Vec::new(),
        }
    }

    pub(crate) fn slot(&self, id: InstanceId) -> Option<&InstanceSlot> {
        self.slots.get(id.idx as usize)
    }

    // --- drawable lifecycle -------------------------------------------------

    /// Creates the drawable of `id` if its node has content and an enabled
    /// renderer, links it into the paint order and records the interval.
    fn attach(&mut self, tree: &NodeTree, instances: &InstanceTree<RenderRelevance>, id: InstanceId) {
        let Some(node) = instances.node(id) else {
            return;
        };
        let Some(content) = tree.content(node) else {
            return;
        };
        let Some(renderer) = Renderer::select(tree.renderers(node), self.enabled, &self.preference)
        else {
            return;
        };
        let i = id.idx as usize;
        let key = BlockKey {
            renderer,
            transform_root: self.slots[i].transform_root,
            filter_root: self.slots[i].filter_root,
        };
        let d = self
            .pool
            .allocate(DrawableKind::from(content.kind()), key, id, node);

        let prev = self.previous_drawable(instances, id.idx);
        self.pool.link_after(prev, d);
        let next = self.pool.get(d).next();
        self.pending.push(ChangeInterval::new(prev, next));

        // Listener registration and the precompute request.
        let anchor = deeper(instances, key.transform_root, key.filter_root);
        let (relative, opacity, hidden) = resolve(tree, instances, id, anchor, key.filter_root);
        let slot = &mut self.slots[i];
        slot.drawable = Some(d);
        slot.anchor = anchor;
        slot.relative = relative;
        slot.opacity = opacity;
        slot.hidden = hidden;
        slot.precompute += 1;
        slot.transform_listeners.push(d);
        slot.paint_listeners.push(d);
        if let Some(a) = anchor {
            self.slots[a.idx as usize].anchored.push(d);
        }

        self.drawables_created += 1;
        #[cfg(feature = "trace-rich")]
        self.log.push(DrawableChange {
            drawable: d,
            instance: Some(id),
            renderer,
            event: DrawableEvent::Created,
        });
    }

    /// Disposes the drawable of instance slot `idx`, if any.
    fn detach(&mut self, idx: u32) {
        let i = idx as usize;
        let Some(d) = self.slots[i].drawable.take() else {
            return;
        };
        let (prev, next) = self.pool.unlink(d);
        for iv in &mut self.pending {
            iv.replace_boundary(d, prev, next);
        }
        self.pending.push(ChangeInterval::new(prev, next));
        if let Some(b) = self.pool.get(d).block() {
            self.blocks.remove_drawable(&mut self.pool, b, d);
        }

        let slot = &mut self.slots[i];
        slot.transform_listeners.retain(|&l| l != d);
        slot.paint_listeners.retain(|&l| l != d);
        slot.precompute = slot.precompute.saturating_sub(1);
        if let Some(a) = slot.anchor.take() {
            self.slots[a.idx as usize].anchored.retain(|&l| l != d);
        }

        #[cfg(feature = "trace-rich")]
        self.log.push(DrawableChange {
            drawable: d,
            instance: self.pool.get(d).instance(),
            renderer: self.pool.get(d).renderer(),
            event: DrawableEvent::Disposed,
        });
        self.pool.dispose(d, self.keep_elements);
        self.drawables_disposed += 1;
    }

    /// Finds the nearest drawable before instance slot `idx` in pre-order.
    fn previous_drawable(
        &self,
        instances: &InstanceTree<RenderRelevance>,
        idx: u32,
    ) -> Option<DrawableId> {
        let mut cur = idx;
        loop {
            let parent = instances.parent[cur as usize];
            if parent == INVALID {
                return None;
            }
            let siblings = &instances.children[parent as usize];
            let pos = siblings.iter().position(|&c| c == cur)?;
            for &s in siblings[..pos].iter().rev() {
                if let Some(d) = self.last_drawable_in(instances, s) {
                    return Some(d);
                }
            }
            if let Some(d) = self.slots[parent as usize].drawable {
                return Some(d);
            }
            cur = parent;
        }
    }

    fn last_drawable_in(
        &self,
        instances: &InstanceTree<RenderRelevance>,
        idx: u32,
    ) -> Option<DrawableId> {
        instances.children[idx as usize]
            .iter()
            .rev()
            .find_map(|&c| self.last_drawable_in(instances, c))
            .or(self.slots[idx as usize].drawable)
    }

    // --- channel routing ----------------------------------------------------

    /// Marks `attrs` on the paint listeners of every instance of `nodes`.
    pub(crate) fn route_paint(
        &mut self,
        tree: &NodeTree,
        instances: &InstanceTree<RenderRelevance>,
        nodes: &[u32],
        attrs: DirtyAttrs,
    ) {
        for &n in nodes {
            let Some(node) = tree.id_at(n) else {
                continue;
            };
            for inst in instances.instances_of(tree, node) {
                let Some(slot) = self.slots.get(inst.idx as usize) else {
                    continue;
                };
                for &d in &slot.paint_listeners {
                    let drawable = self.pool.get_mut(d);
                    drawable.mark_dirty(attrs);
                    if let Some(b) = drawable.block() {
                        self.blocks.queue(b);
                    }
                }
            }
        }
    }

    /// Replaces the drawables of every instance of `nodes`.
    ///
    /// Instances with a serial of at least `fresh_from` were created from
    /// the current node state and are skipped.
    pub(crate) fn replace_drawables(
        &mut self,
        tree: &NodeTree,
        instances: &InstanceTree<RenderRelevance>,
        nodes: &[u32],
        fresh_from: u64,
    ) {
        for &n in nodes {
            let Some(node) = tree.id_at(n) else {
                continue;
            };
            let affected: Vec<InstanceId> = instances
                .instances_of(tree, node)
                .filter(|&i| instances.serial(i) < fresh_from)
                .collect();
            for inst in affected {
                self.detach(inst.idx);
                self.attach(tree, instances, inst);
            }
        }
    }

    /// Re-resolves precomputed instances of `nodes` and notifies listeners
    /// of whatever changed. Anchors mark their blocks' placement.
    pub(crate) fn resolve_nodes(
        &mut self,
        tree: &NodeTree,
        instances: &InstanceTree<RenderRelevance>,
        nodes: &[u32],
    ) {
        for &n in nodes {
            let Some(node) = tree.id_at(n) else {
                continue;
            };
            for inst in instances.instances_of(tree, node) {
                let i = inst.idx as usize;
                if i >= self.slots.len() {
                    continue;
                }
                if self.slots[i].precompute > 0 {
                    let slot = &self.slots[i];
                    let (relative, opacity, hidden) =
                        resolve(tree, instances, inst, slot.anchor, slot.filter_root);
                    let mut attrs = DirtyAttrs::empty();
                    if relative != slot.relative {
                        attrs |= DirtyAttrs::TRANSFORM;
                    }
                    if opacity != slot.opacity {
                        attrs |= DirtyAttrs::OPACITY;
                    }
                    if hidden != slot.hidden {
                        attrs |= DirtyAttrs::VISIBILITY;
                    }
                    let slot = &mut self.slots[i];
                    slot.relative = relative;
                    slot.opacity = opacity;
                    slot.hidden = hidden;
                    if !attrs.is_empty() {
                        let rest = attrs.difference(DirtyAttrs::TRANSFORM);
                        for &d in &slot.transform_listeners {
                            let drawable = self.pool.get_mut(d);
                            if attrs.contains(DirtyAttrs::TRANSFORM) {
                                drawable.mark_dirty_transform();
                            }
                            if !rest.is_empty() {
                                drawable.mark_dirty(rest);
                            }
                            if let Some(b) = drawable.block() {
                                self.blocks.queue(b);
                            }
                        }
                    }
                }
                for &d in &self.slots[i].anchored {
                    if let Some(b) = self.pool.get(d).block() {
                        self.blocks.mark_placement(b);
                    }
                }
            }
        }
    }

    // --- backend walk -------------------------------------------------------

    /// Computes where the surface of a block with `key` goes.
    pub(crate) fn placement(
        tree: &NodeTree,
        instances: &InstanceTree<RenderRelevance>,
        key: &BlockKey,
    ) -> Placement {
        let anchor = deeper(instances, key.transform_root, key.filter_root);
        let transform = anchor.map_or(Affine::IDENTITY, |a| {
            instances
                .trail(a)
                .nodes()
                .iter()
                .fold(Affine::IDENTITY, |acc, &n| acc * tree.transform(n))
        });
        let opacity = key.filter_root.map_or(1.0, |f| {
            instances
                .trail(f)
                .nodes()
                .iter()
                .map(|&n| tree.opacity(n))
                .product()
        });
        Placement { transform, opacity }
    }

    /// Brings one block's surface up to date. Returns the number of
    /// drawables painted.
    pub(crate) fn update_block(
        &mut self,
        tree: &NodeTree,
        instances: &InstanceTree<RenderRelevance>,
        backend: &mut dyn SurfaceBackend,
        b: BlockId,
    ) -> Result<usize, BackendError> {
        let block = self.blocks.get(b);
        let renderer = block.renderer();
        let key = block.key();
        let surface = match block.surface() {
            Some(s) => s,
            None => {
                let s = backend.create_surface(renderer)?;
                self.blocks.get_mut(b).set_surface(s);
                self.blocks.mark_order_dirty();
                s
            }
        };

        if self.blocks.get(b).dirty_placement() {
            let placement = Self::placement(tree, instances, &key);
            if self.blocks.get(b).placement() != Some(placement) {
                backend.place_surface(surface, &placement)?;
            }
            self.blocks.get_mut(b).set_placement(placement);
        }

        let members = self.blocks.get(b).members().to_vec();
        let mut painted = 0;
        if renderer.is_retained() {
            for &d in &members {
                if self.paint_member(tree, backend, surface, d, false)? {
                    painted += 1;
                }
            }
            if self.blocks.get(b).dirty_group_order() {
                let elements: Vec<_> = members
                    .iter()
                    .filter_map(|&d| self.pool.get(d).element())
                    .collect();
                backend.order_elements(surface, &elements)?;
                self.blocks.get_mut(b).clear_group_order();
            }
        } else {
            let repaint = self.blocks.get(b).full_repaint()
                || members.iter().any(|&d| self.pool.get(d).is_dirty());
            if repaint {
                backend.clear_surface(surface)?;
                for &d in &members {
                    if self.paint_member(tree, backend, surface, d, true)? {
                        painted += 1;
                    }
                }
                self.blocks.get_mut(b).clear_full_repaint();
            }
        }
        Ok(painted)
    }

    fn paint_member(
        &mut self,
        tree: &NodeTree,
        backend: &mut dyn SurfaceBackend,
        surface: SurfaceId,
        d: DrawableId,
        full: bool,
    ) -> Result<bool, BackendError> {
        let drawable = self.pool.get(d);
        let (Some(inst), Some(node)) = (drawable.instance(), drawable.node()) else {
            return Ok(false);
        };
        let Some(content) = tree.content(node) else {
            return Ok(false);
        };
        let Some(slot) = self.slots.get(inst.idx as usize) else {
            return Ok(false);
        };
        let frame = PaintFrame {
            surface,
            content,
            transform: slot.relative,
            opacity: slot.opacity,
            visible: !slot.hidden,
            full,
        };
        let painted = self.pool.get_mut(d).update(backend, &frame)?;
        #[cfg(feature = "trace-rich")]
        if painted {
            self.log.push(DrawableChange {
                drawable: d,
                instance: Some(inst),
                renderer: self.pool.get(d).renderer(),
                event: DrawableEvent::Painted,
            });
        }
        Ok(painted)
    }

    // --- audit --------------------------------------------------------------

    /// Checks drawable uniqueness and that the paint order is the pre-order
    /// of instances with drawables.
    ///
    /// # Panics
    ///
    /// Panics on any inconsistency.
    pub(crate) fn audit(&self, tree: &NodeTree, instances: &InstanceTree<RenderRelevance>) {
        let mut expected = Vec::with_capacity(self.pool.live());
        let mut stack = alloc::vec![instances.root];
        while let Some(idx) = stack.pop() {
            let inst = instances.handle(idx);
            let slot = &self.slots[idx as usize];
            let wants = instances.node(inst).is_some_and(|node| {
                tree.content(node).is_some()
                    && Renderer::select(tree.renderers(node), self.enabled, &self.preference)
                        .is_some()
            });
            assert_eq!(
                slot.drawable.is_some(),
                wants,
                "instance #{idx} drawable presence is wrong"
            );
            if let Some(d) = slot.drawable {
                let drawable = self.pool.get(d);
                assert_eq!(drawable.instance(), Some(inst), "{d:?} owned by another instance");
                assert_eq!(drawable.node(), instances.node(inst), "{d:?} draws the wrong node");
                expected.push(d);
            }
            stack.extend(instances.children[idx as usize].iter().rev());
        }
        assert_eq!(
            self.pool.live(),
            expected.len(),
            "pool holds drawables without an instance"
        );
        let order: Vec<_> = self.pool.paint_order().collect();
        assert_eq!(order, expected, "paint order differs from instance pre-order");
    }
}

impl InstanceHooks<RenderRelevance> for Painter {
    fn instance_added(
        &mut self,
        tree: &NodeTree,
        instances: &InstanceTree<RenderRelevance>,
        id: InstanceId,
    ) {
        let i = id.idx as usize;
        if self.slots.len() <= i {
            self.slots.resize_with(i + 1, InstanceSlot::default);
        }
        let inherited = instances
            .parent(id)
            .map(|p| {
                let s = &self.slots[p.idx as usize];
                (s.transform_root, s.filter_root)
            })
            .unwrap_or_default();
        let flags = instances.node(id).map_or(NodeFlags::empty(), |n| tree.flags(n));
        self.slots[i] = InstanceSlot {
            transform_root: if flags.contains(NodeFlags::LAYER_SPLIT) {
                Some(id)
            } else {
                inherited.0
            },
            filter_root: if flags.contains(NodeFlags::ISOLATE) {
                Some(id)
            } else {
                inherited.1
            },
            ..InstanceSlot::default()
        };
        self.attach(tree, instances, id);
    }

    fn instance_disposing(
        &mut self,
        _tree: &NodeTree,
        _instances: &InstanceTree<RenderRelevance>,
        id: InstanceId,
    ) {
        self.detach(id.idx);
        let slot = &mut self.slots[id.idx as usize];
        debug_assert!(
            slot.anchored.is_empty(),
            "instance #{} disposed while anchoring drawables",
            id.idx
        );
        *slot = InstanceSlot::default();
    }
}

/// Returns the deeper of two ancestor-or-self roots on the same path.
fn deeper(
    instances: &InstanceTree<RenderRelevance>,
    a: Option<InstanceId>,
    b: Option<InstanceId>,
) -> Option<InstanceId> {
    match (a, b) {
        (Some(a), Some(b)) => {
            if instances.trail(a).len() >= instances.trail(b).len() {
                Some(a)
            } else {
                Some(b)
            }
        }
        (a, b) => a.or(b),
    }
}

/// Computes the relative transform, relative opacity and effective
/// visibility of `id`.
fn resolve(
    tree: &NodeTree,
    instances: &InstanceTree<RenderRelevance>,
    id: InstanceId,
    anchor: Option<InstanceId>,
    filter_root: Option<InstanceId>,
) -> (Affine, f64, bool) {
    let nodes: &[NodeId] = instances.trail(id).nodes();
    let from = anchor.map_or(0, |a| instances.trail(a).len());
    let relative = nodes[from.min(nodes.len())..]
        .iter()
        .fold(Affine::IDENTITY, |acc, &n| acc * tree.transform(n));
    let from = filter_root.map_or(0, |f| instances.trail(f).len());
    let opacity = nodes[from.min(nodes.len())..]
        .iter()
        .map(|&n| tree.opacity(n))
        .product();
    let hidden = nodes
        .iter()
        .any(|&n| tree.flags(n).contains(NodeFlags::HIDDEN));
    (relative, opacity, hidden)
}
