// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::{Affine, BezPath, Size};
use peniko::Brush;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::content::{AccessibleContent, Font, ImageSource, NodeContent, StrokeStyle};
use super::id::{MirrorId, NodeId};
use super::traverse::Children;
use crate::dirty;
use crate::instance::InstanceId;
use crate::renderer::Renderers;
use crate::trail::Trail;

bitflags! {
    /// Per-node boolean flags.
    ///
    /// [`HIDDEN`](Self::HIDDEN) suppresses the node and its whole subtree.
    /// [`LAYER_SPLIT`](Self::LAYER_SPLIT) makes the node a transform root and
    /// [`ISOLATE`](Self::ISOLATE) makes it a filter (group opacity) root.
    /// Either of the last two forces drawables below the node into their own
    /// blocks.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node and its subtree are not painted.
        const HIDDEN      = 0b0001;
        /// The node roots its own coordinate frame.
        const LAYER_SPLIT = 0b0010;
        /// The node roots its own opacity group.
        const ISOLATE     = 0b0100;
    }
}

/// A back-reference from a node to one instance displaying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceRef {
    /// The mirror owning the instance.
    pub mirror: MirrorId,
    /// The instance within that mirror.
    pub instance: InstanceId,
}

/// Struct-of-arrays storage for a scene graph.
///
/// Nodes are addressed by [`NodeId`] handles. Each node occupies a slot in
/// parallel arrays; destroyed nodes are recycled via a free list, and
/// generation counters prevent stale handle access.
///
/// Children are ordered. A node may be the child of several parents (DAG
/// sharing), in which case it is displayed once per [`Trail`] reaching it.
#[derive(Debug)]
pub struct NodeTree {
    // -- Topology --
    pub(crate) parents: Vec<Vec<u32>>,
    pub(crate) children: Vec<Vec<u32>>,

    // -- Local properties --
    pub(crate) local_transform: Vec<Affine>,
    pub(crate) opacity: Vec<f64>,
    pub(crate) flags: Vec<NodeFlags>,
    pub(crate) content: Vec<Option<NodeContent>>,
    pub(crate) renderers: Vec<Renderers>,
    pub(crate) accessible: Vec<Option<AccessibleContent>>,

    // -- Observers --
    pub(crate) instances: Vec<Vec<InstanceRef>>,
    next_mirror: u32,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parents: Vec::new(),
            children: Vec::new(),
            local_transform: Vec::new(),
            opacity: Vec::new(),
            flags: Vec::new(),
            content: Vec::new(),
            renderers: Vec::new(),
            accessible: Vec::new(),
            instances: Vec::new(),
            next_mirror: 0,
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new node and returns its handle.
    ///
    /// The node starts as an empty container: identity transform, full
    /// opacity, no flags, no content, the default renderer mask, and no
    /// parent.
    pub fn create_node(&mut self) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parents[i].clear();
            self.children[i].clear();
            self.local_transform[i] = Affine::IDENTITY;
            self.opacity[i] = 1.0;
            self.flags[i] = NodeFlags::empty();
            self.content[i] = None;
            self.renderers[i] = Renderers::default();
            self.accessible[i] = None;
            self.instances[i].clear();
            self.live[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parents.push(Vec::new());
            self.children.push(Vec::new());
            self.local_transform.push(Affine::IDENTITY);
            self.opacity.push(1.0);
            self.flags.push(NodeFlags::empty());
            self.content.push(None);
            self.renderers.push(Renderers::default());
            self.accessible.push(None);
            self.instances.push(Vec::new());
            self.generation.push(0);
            self.live.push(true);
            idx
        };

        self.pending_added.push(idx);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, detaching it from every parent and freeing its slot.
    ///
    /// Instance back-references are dropped; mirrors dispose the matching
    /// instances on their next sync because every former parent is marked
    /// with a topology change.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.children[idx as usize].is_empty(),
            "cannot destroy node with children"
        );

        let parents = core::mem::take(&mut self.parents[idx as usize]);
        for p in parents {
            self.children[p as usize].retain(|&c| c != idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }

        self.dirty.remove_key(idx);
        self.instances[idx as usize].clear();
        self.content[idx as usize] = None;
        self.accessible[idx as usize] = None;

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.live[idx as usize] = false;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.live[id.idx as usize]
    }

    // -- Topology API --

    /// Inserts `child` into `parent`'s child list at `index`.
    ///
    /// Marks inherited channels for `child`'s subtree and a topology change
    /// on `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `index` is past the end of the child
    /// list, `child` is already a child of `parent`, or the insertion would
    /// create a cycle.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            index <= self.children[p as usize].len(),
            "child index {index} out of range (len {})",
            self.children[p as usize].len()
        );
        assert!(
            !self.children[p as usize].contains(&c),
            "node is already a child of this parent"
        );
        assert!(
            !self.reaches(c, p),
            "inserting {child:?} under {parent:?} would create a cycle"
        );

        self.children[p as usize].insert(index, c);
        self.parents[c as usize].push(p);

        // Child depends on parent for inherited channels.
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// See [`insert_child`](Self::insert_child).
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        let index = self.children[parent.idx as usize].len();
        self.insert_child(parent, index, child);
    }

    /// Removes `child` from `parent`'s child list.
    ///
    /// `child` stays attached to any other parents it has.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` is not a child of
    /// `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        let pos = self.children[p as usize]
            .iter()
            .position(|&x| x == c);
        let Some(pos) = pos else {
            panic!("{child:?} is not a child of {parent:?}");
        };

        self.children[p as usize].remove(pos);
        self.parents[c as usize].retain(|&x| x != p);

        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Moves `child` to position `index` within `parent`'s child list.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `child` is not a child of `parent`,
    /// or `index` is out of range.
    pub fn move_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx as usize;
        let Some(pos) = self.children[p].iter().position(|&x| x == child.idx) else {
            panic!("{child:?} is not a child of {parent:?}");
        };
        assert!(
            index < self.children[p].len(),
            "child index {index} out of range (len {})",
            self.children[p].len()
        );
        let c = self.children[p].remove(pos);
        self.children[p].insert(index, c);
        self.dirty.mark(parent.idx, dirty::TOPOLOGY);
    }

    /// Returns the parents of a node, in attachment order.
    #[must_use]
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        self.parents[id.idx as usize]
            .iter()
            .map(|&p| self.handle(p))
            .collect()
    }

    /// Returns an iterator over the ordered children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, &self.children[id.idx as usize])
    }

    /// Returns the number of children of a node.
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> usize {
        self.validate(id);
        self.children[id.idx as usize].len()
    }

    /// Returns the position of `child` in `parent`'s child list, if it is
    /// one of its children.
    ///
    /// Stale handles yield `None` rather than panicking, so this can be used
    /// to test whether a remembered edge still exists.
    #[must_use]
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return None;
        }
        self.children[parent.idx as usize]
            .iter()
            .position(|&c| c == child.idx)
    }

    /// Returns every trail from `root` to `node`, in paint order.
    ///
    /// A node shared by several parents is reachable through several trails.
    /// Returns an empty list when `node` is not a descendant of (or equal to)
    /// `root`.
    #[must_use]
    pub fn trails_to(&self, root: NodeId, node: NodeId) -> Vec<Trail> {
        self.validate(root);
        self.validate(node);
        let mut out = Vec::new();
        let mut suffix = Vec::new();
        self.collect_trails(root.idx, node.idx, &mut suffix, &mut out);
        out.sort_by(Trail::compare);
        out
    }

    /// Registers a new mirror and returns its identifier.
    pub fn register_mirror(&mut self) -> MirrorId {
        let id = MirrorId(self.next_mirror);
        self.next_mirror += 1;
        id
    }

    /// Records that `instance` displays `node`.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn add_instance(&mut self, node: NodeId, instance: InstanceRef) {
        self.validate(node);
        debug_assert!(
            !self.instances[node.idx as usize].contains(&instance),
            "instance registered twice on {node:?}"
        );
        self.instances[node.idx as usize].push(instance);
    }

    /// Drops the back-reference from `node` to `instance`.
    ///
    /// A destroyed node has already dropped all of its back-references, so a
    /// stale handle is a no-op here.
    pub fn remove_instance(&mut self, node: NodeId, instance: InstanceRef) {
        if !self.is_alive(node) {
            return;
        }
        self.instances[node.idx as usize].retain(|r| *r != instance);
    }

    /// Returns the instances currently displaying a node.
    #[must_use]
    pub fn instances(&self, id: NodeId) -> &[InstanceRef] {
        self.validate(id);
        &self.instances[id.idx as usize]
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the local transform of a node.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Affine {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the local opacity of a node.
    #[must_use]
    pub fn opacity(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Returns the flags of a node.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the paintable content of a node.
    #[must_use]
    pub fn content(&self, id: NodeId) -> Option<&NodeContent> {
        self.validate(id);
        self.content[id.idx as usize].as_ref()
    }

    /// Returns the renderer mask of a node.
    #[must_use]
    pub fn renderers(&self, id: NodeId) -> Renderers {
        self.validate(id);
        self.renderers[id.idx as usize]
    }

    /// Returns the accessible description of a node.
    #[must_use]
    pub fn accessible(&self, id: NodeId) -> Option<&AccessibleContent> {
        self.validate(id);
        self.accessible[id.idx as usize].as_ref()
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the local transform of a node.
    ///
    /// Marks the TRANSFORM channel dirty with eager propagation to descendants.
    pub fn set_transform(&mut self, id: NodeId, transform: Affine) {
        self.validate(id);
        self.local_transform[id.idx as usize] = transform;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the local opacity of a node.
    ///
    /// Marks the OPACITY channel dirty with eager propagation to descendants.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f64) {
        self.validate(id);
        self.opacity[id.idx as usize] = opacity;
        self.dirty.mark_with(id.idx, dirty::OPACITY, &EagerPolicy);
    }

    /// Sets the flags of a node.
    ///
    /// A hidden-flag change marks TRANSFORM (propagating); a split or isolate
    /// change marks RELEVANCE.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.validate(id);
        let changed = self.flags[id.idx as usize] ^ flags;
        self.flags[id.idx as usize] = flags;
        if changed.contains(NodeFlags::HIDDEN) {
            self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
        }
        if changed.intersects(NodeFlags::LAYER_SPLIT | NodeFlags::ISOLATE) {
            self.dirty.mark(id.idx, dirty::RELEVANCE);
        }
    }

    /// Shows or hides a node and its subtree.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        let mut flags = self.flags(id);
        flags.set(NodeFlags::HIDDEN, hidden);
        self.set_flags(id, flags);
    }

    /// Replaces the paintable content of a node.
    ///
    /// Gaining or losing content marks RELEVANCE; switching to a different
    /// content kind marks KIND; otherwise every attribute channel of the
    /// content kind is marked.
    pub fn set_content(&mut self, id: NodeId, content: Option<NodeContent>) {
        self.validate(id);
        let idx = id.idx;
        let old = self.content[idx as usize].as_ref().map(NodeContent::kind);
        let new = content.as_ref().map(NodeContent::kind);
        self.content[idx as usize] = content;
        match (old, new) {
            (None, None) => {}
            (Some(a), Some(b)) if a == b => self.mark_all_attributes(idx),
            (Some(_), Some(_)) => self.dirty.mark(idx, dirty::KIND),
            _ => self.dirty.mark(idx, dirty::RELEVANCE),
        }
    }

    /// Sets the outline of a shape node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no shape content.
    pub fn set_path(&mut self, id: NodeId, path: BezPath) {
        self.validate(id);
        match &mut self.content[id.idx as usize] {
            Some(NodeContent::Shape(shape)) => shape.path = path,
            _ => panic!("{id:?} has no shape content"),
        }
        self.dirty.mark(id.idx, dirty::SHAPE);
    }

    /// Sets the fill brush of a shape or text node.
    ///
    /// # Panics
    ///
    /// Panics if the node has neither shape nor text content.
    pub fn set_fill(&mut self, id: NodeId, fill: Option<Brush>) {
        self.validate(id);
        match &mut self.content[id.idx as usize] {
            Some(NodeContent::Shape(shape)) => shape.fill = fill,
            Some(NodeContent::Text(text)) => text.fill = fill,
            _ => panic!("{id:?} has no fillable content"),
        }
        self.dirty.mark(id.idx, dirty::FILL);
    }

    /// Sets the stroke of a shape node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no shape content.
    pub fn set_stroke(&mut self, id: NodeId, stroke: Option<StrokeStyle>) {
        self.validate(id);
        match &mut self.content[id.idx as usize] {
            Some(NodeContent::Shape(shape)) => shape.stroke = stroke,
            _ => panic!("{id:?} has no shape content"),
        }
        self.dirty.mark(id.idx, dirty::STROKE);
    }

    /// Sets the string of a text node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no text content.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<alloc::string::String>) {
        self.validate(id);
        match &mut self.content[id.idx as usize] {
            Some(NodeContent::Text(t)) => t.text = text.into(),
            _ => panic!("{id:?} has no text content"),
        }
        self.dirty.mark(id.idx, dirty::TEXT);
    }

    /// Sets the font of a text node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no text content.
    pub fn set_font(&mut self, id: NodeId, font: Font) {
        self.validate(id);
        match &mut self.content[id.idx as usize] {
            Some(NodeContent::Text(t)) => t.font = font,
            _ => panic!("{id:?} has no text content"),
        }
        self.dirty.mark(id.idx, dirty::FONT);
    }

    /// Sets the source and size of an image node.
    ///
    /// # Panics
    ///
    /// Panics if the node has no image content.
    pub fn set_image(&mut self, id: NodeId, source: ImageSource, size: Size) {
        self.validate(id);
        match &mut self.content[id.idx as usize] {
            Some(NodeContent::Image(image)) => {
                image.source = source;
                image.size = size;
            }
            _ => panic!("{id:?} has no image content"),
        }
        self.dirty.mark(id.idx, dirty::IMAGE);
    }

    /// Sets which renderers may draw this node.
    ///
    /// Marks KIND so displays replace the node's drawables.
    pub fn set_renderers(&mut self, id: NodeId, renderers: Renderers) {
        self.validate(id);
        if self.renderers[id.idx as usize] != renderers {
            self.renderers[id.idx as usize] = renderers;
            self.dirty.mark(id.idx, dirty::KIND);
        }
    }

    /// Sets the accessible description of a node.
    ///
    /// Marks ACCESSIBLE when the node gains or loses its description.
    pub fn set_accessible(&mut self, id: NodeId, accessible: Option<AccessibleContent>) {
        self.validate(id);
        let toggled = self.accessible[id.idx as usize].is_some() != accessible.is_some();
        self.accessible[id.idx as usize] = accessible;
        if toggled {
            self.dirty.mark(id.idx, dirty::ACCESSIBLE);
        }
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `TreeChanges` and trails)
    // rather than `NodeId` handles, skipping generation validation.

    /// Returns the current handle for slot `idx`, or `None` if it is free.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> Option<NodeId> {
        (idx < self.len && self.live[idx as usize]).then(|| self.handle(idx))
    }

    /// Returns the content at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn content_at(&self, idx: u32) -> Option<&NodeContent> {
        self.check_slot(idx);
        self.content[idx as usize].as_ref()
    }

    /// Returns the flags at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn flags_at(&self, idx: u32) -> NodeFlags {
        self.check_slot(idx);
        self.flags[idx as usize]
    }

    /// Returns the local transform at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn transform_at(&self, idx: u32) -> Affine {
        self.check_slot(idx);
        self.local_transform[idx as usize]
    }

    /// Returns the local opacity at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn opacity_at(&self, idx: u32) -> f64 {
        self.check_slot(idx);
        self.opacity[idx as usize]
    }

    /// Returns the renderer mask at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn renderers_at(&self, idx: u32) -> Renderers {
        self.check_slot(idx);
        self.renderers[idx as usize]
    }

    /// Returns the accessible description at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn accessible_at(&self, idx: u32) -> Option<&AccessibleContent> {
        self.check_slot(idx);
        self.accessible[idx as usize].as_ref()
    }

    /// Returns the instance back-references at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn instances_at(&self, idx: u32) -> &[InstanceRef] {
        self.check_slot(idx);
        &self.instances[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_slot(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns whether `to` is `from` or one of its descendants.
    fn reaches(&self, from: u32, to: u32) -> bool {
        let mut stack = alloc::vec![from];
        let mut seen = alloc::vec![false; self.len as usize];
        while let Some(n) = stack.pop() {
            if n == to {
                return true;
            }
            if core::mem::replace(&mut seen[n as usize], true) {
                continue;
            }
            stack.extend_from_slice(&self.children[n as usize]);
        }
        false
    }

    /// Walks parent links upward from `idx`, emitting one trail per path that
    /// reaches `root`. `suffix` holds `(node, index in parent)` pairs below
    /// the current position.
    fn collect_trails(
        &self,
        root: u32,
        idx: u32,
        suffix: &mut Vec<(u32, usize)>,
        out: &mut Vec<Trail>,
    ) {
        if idx == root {
            let mut trail = Trail::from_root(self.handle(root));
            for &(node, index) in suffix.iter().rev() {
                trail.add_descendant(self.handle(node), index);
            }
            out.push(trail);
            return;
        }
        for &p in &self.parents[idx as usize] {
            let Some(index) = self.children[p as usize].iter().position(|&c| c == idx) else {
                continue;
            };
            suffix.push((idx, index));
            self.collect_trails(root, p, suffix, out);
            suffix.pop();
        }
    }

    /// Marks the subtree rooted at `idx` dirty for inherited channels.
    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }

    fn mark_all_attributes(&mut self, idx: u32) {
        let channels: &[_] = match &self.content[idx as usize] {
            Some(NodeContent::Shape(_)) => &[dirty::SHAPE, dirty::FILL, dirty::STROKE],
            Some(NodeContent::Text(_)) => &[dirty::TEXT, dirty::FONT, dirty::FILL],
            Some(NodeContent::Image(_)) => &[dirty::IMAGE],
            None => &[],
        };
        for &ch in channels {
            self.dirty.mark(idx, ch);
        }
    }
}
