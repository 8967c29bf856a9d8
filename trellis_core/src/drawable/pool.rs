// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable arena with free-list reuse and the global paint-order list.

use alloc::vec::Vec;

use super::{DirtyAttrs, Drawable, DrawableId, DrawableKind, DrawableState, Paintable, Poolable};
use crate::backend::ElementId;
use crate::block::BlockKey;
use crate::instance::InstanceId;
use crate::node::NodeId;

/// Owns every drawable of a display.
///
/// Slots are recycled through a free list; a handle from before a slot was
/// recycled is stale and panics on access. Besides storage, the pool keeps
/// live drawables in a doubly-linked *paint order* list threaded through
/// [`Drawable::prev`] and [`Drawable::next`].
#[derive(Debug, Default)]
pub struct DrawablePool {
    slots: Vec<Drawable>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    first: Option<DrawableId>,
    last: Option<DrawableId>,
    linked: usize,
    live: usize,
    released: Vec<ElementId>,
}

impl DrawablePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live drawables.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Returns the number of drawables waiting in the free list.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.free_list.len()
    }

    /// Returns the number of slots, live or pooled.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of drawables in the paint-order list.
    #[must_use]
    pub fn linked(&self) -> usize {
        self.linked
    }

    /// Returns whether `id` refers to a live drawable.
    #[must_use]
    pub fn is_live(&self, id: DrawableId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].state != DrawableState::Disposed
    }

    /// Hands out a drawable bound to `instance`, fully dirty.
    ///
    /// A recycled slot keeps its backend element when it was disposed with
    /// `keep_element` and the renderer matches; otherwise the stale element
    /// is queued for release.
    ///
    /// # Panics
    ///
    /// Panics if a free-list slot was not disposed.
    pub fn allocate(
        &mut self,
        kind: DrawableKind,
        key: BlockKey,
        instance: InstanceId,
        node: NodeId,
    ) -> DrawableId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            assert!(
                slot.is_pooled(),
                "re-initialising drawable #{idx} that was not disposed"
            );
            if slot.renderer != key.renderer {
                if let Some(element) = slot.element.take() {
                    self.released.push(element);
                }
            }
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Drawable::vacant(key.renderer));
            self.generation.push(0);
            idx
        };

        let element = self.slots[idx as usize].element;
        let slot = &mut self.slots[idx as usize];
        *slot = Drawable::vacant(key.renderer);
        slot.element = element;
        slot.kind = kind;
        slot.key = Some(key);
        slot.instance = Some(instance);
        slot.node = Some(node);
        slot.state = DrawableState::Initialized;
        slot.mark_dirty(
            kind.content_attrs()
                | DirtyAttrs::TRANSFORM
                | DirtyAttrs::OPACITY
                | DirtyAttrs::VISIBILITY,
        );

        self.live += 1;
        DrawableId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns a drawable to the pool.
    ///
    /// The drawable must already be unlinked from the paint order. Its
    /// element is queued for release unless `keep_element` is set, in which
    /// case it waits in the slot for the next allocation with the same
    /// renderer.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or still linked.
    pub fn dispose(&mut self, id: DrawableId, keep_element: bool) {
        self.validate(id);
        assert!(!self.is_linked(id), "dispose of linked {id:?}");
        let slot = &mut self.slots[id.idx as usize];
        if !keep_element {
            if let Some(element) = slot.element.take() {
                self.released.push(element);
            }
        }
        slot.state = DrawableState::Disposed;
        slot.key = None;
        slot.instance = None;
        slot.node = None;
        slot.block = None;
        slot.dirty = false;
        slot.attrs = DirtyAttrs::empty();
        self.generation[id.idx as usize] = self.generation[id.idx as usize].wrapping_add(1);
        self.free_list.push(id.idx);
        self.live -= 1;
    }

    /// Returns and clears the elements waiting for release.
    pub fn take_released(&mut self) -> Vec<ElementId> {
        core::mem::take(&mut self.released)
    }

    /// Returns a live drawable.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn get(&self, id: DrawableId) -> &Drawable {
        self.validate(id);
        &self.slots[id.idx as usize]
    }

    /// Returns a live drawable mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn get_mut(&mut self, id: DrawableId) -> &mut Drawable {
        self.validate(id);
        &mut self.slots[id.idx as usize]
    }

    #[cfg(test)]
    pub(super) fn slot_mut(&mut self, idx: u32) -> &mut Drawable {
        &mut self.slots[idx as usize]
    }

    // --- paint order --------------------------------------------------------

    /// Returns the first drawable in paint order.
    #[must_use]
    pub fn first(&self) -> Option<DrawableId> {
        self.first
    }

    /// Returns the last drawable in paint order.
    #[must_use]
    pub fn last(&self) -> Option<DrawableId> {
        self.last
    }

    /// Returns whether `id` is in the paint-order list.
    #[must_use]
    pub fn is_linked(&self, id: DrawableId) -> bool {
        let d = &self.slots[id.idx as usize];
        d.prev.is_some() || d.next.is_some() || self.first == Some(id)
    }

    /// Inserts `id` after `prev`, or at the front when `prev` is `None`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `id` is already linked.
    pub fn link_after(&mut self, prev: Option<DrawableId>, id: DrawableId) {
        self.validate(id);
        assert!(!self.is_linked(id), "{id:?} is already linked");
        let next = match prev {
            Some(p) => {
                self.validate(p);
                self.slots[p.idx as usize].next
            }
            None => self.first,
        };
        {
            let d = &mut self.slots[id.idx as usize];
            d.prev = prev;
            d.next = next;
        }
        match prev {
            Some(p) => self.slots[p.idx as usize].next = Some(id),
            None => self.first = Some(id),
        }
        match next {
            Some(n) => self.slots[n.idx as usize].prev = Some(id),
            None => self.last = Some(id),
        }
        self.linked += 1;
    }

    /// Removes `id` from the paint order, returning its former neighbours.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or not linked.
    pub fn unlink(&mut self, id: DrawableId) -> (Option<DrawableId>, Option<DrawableId>) {
        self.validate(id);
        assert!(self.is_linked(id), "{id:?} is not linked");
        let (prev, next) = {
            let d = &mut self.slots[id.idx as usize];
            (d.prev.take(), d.next.take())
        };
        match prev {
            Some(p) => self.slots[p.idx as usize].next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => self.slots[n.idx as usize].prev = prev,
            None => self.last = prev,
        }
        self.linked -= 1;
        (prev, next)
    }

    /// Iterates the paint-order list front to back.
    #[must_use]
    pub fn paint_order(&self) -> PaintOrder<'_> {
        PaintOrder {
            pool: self,
            cursor: self.first,
        }
    }

    fn validate(&self, id: DrawableId) {
        assert!(
            (id.idx as usize) < self.slots.len()
                && self.generation[id.idx as usize] == id.generation,
            "stale {id:?}"
        );
    }
}

/// Iterator over the paint-order list.
#[derive(Clone, Debug)]
pub struct PaintOrder<'a> {
    pool: &'a DrawablePool,
    cursor: Option<DrawableId>,
}

impl Iterator for PaintOrder<'_> {
    type Item = DrawableId;

    fn next(&mut self) -> Option<DrawableId> {
        let id = self.cursor?;
        self.cursor = self.pool.slots[id.idx as usize].next;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::renderer::Renderer;

    fn key(renderer: Renderer) -> BlockKey {
        BlockKey {
            renderer,
            transform_root: None,
            filter_root: None,
        }
    }

    fn inst(idx: u32) -> InstanceId {
        InstanceId { idx, generation: 0 }
    }

    fn node(idx: u32) -> NodeId {
        NodeId { idx, generation: 0 }
    }

    fn alloc(pool: &mut DrawablePool, renderer: Renderer) -> DrawableId {
        let n = u32::try_from(pool.live()).unwrap();
        pool.allocate(DrawableKind::Shape, key(renderer), inst(n), node(n))
    }

    #[test]
    fn paint_order_links() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Svg);
        let b = alloc(&mut pool, Renderer::Svg);
        let c = alloc(&mut pool, Renderer::Svg);
        pool.link_after(None, a);
        pool.link_after(Some(a), c);
        pool.link_after(Some(a), b);
        assert_eq!(pool.paint_order().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(pool.unlink(b), (Some(a), Some(c)));
        assert_eq!(pool.paint_order().collect::<Vec<_>>(), vec![a, c]);
        pool.unlink(a);
        pool.unlink(c);
        assert_eq!(pool.first(), None, "list should be empty");
        assert_eq!(pool.last(), None, "list should be empty");
        assert_eq!(pool.linked(), 0);
    }

    #[test]
    fn recycled_slot_is_fully_reinitialised() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Canvas);
        pool.get_mut(a).set_block(Some(crate::block::BlockId {
            idx: 3,
            generation: 0,
        }));
        pool.dispose(a, false);
        assert!(!pool.is_live(a));
        assert!(pool.slot_mut(a.idx).is_pooled());
        assert_eq!(pool.pooled(), 1);

        let b = pool.allocate(DrawableKind::Text, key(Renderer::Canvas), inst(7), node(7));
        assert_eq!(b.idx, a.idx, "slot should be recycled");
        assert_ne!(b, a, "generation should differ");
        let d = pool.get(b);
        assert_eq!(d.block(), None);
        assert_eq!(d.kind(), DrawableKind::Text);
        assert_eq!(d.instance(), Some(inst(7)));
        assert!(d.dirty_attrs().contains(DirtyAttrs::TEXT | DirtyAttrs::TRANSFORM));
        assert_eq!(d.state(), DrawableState::Dirty);
    }

    #[test]
    fn kept_element_survives_same_renderer_reuse() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Svg);
        pool.get_mut(a).element = Some(ElementId(9));
        pool.dispose(a, true);
        assert!(pool.take_released().is_empty());
        let b = alloc(&mut pool, Renderer::Svg);
        assert_eq!(pool.get(b).element(), Some(ElementId(9)));
    }

    #[test]
    fn kept_element_is_released_on_renderer_change() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Svg);
        pool.get_mut(a).element = Some(ElementId(4));
        pool.dispose(a, true);
        let b = alloc(&mut pool, Renderer::Canvas);
        assert_eq!(pool.get(b).element(), None);
        assert_eq!(pool.take_released(), vec![ElementId(4)]);
    }

    #[test]
    fn dispose_releases_element_by_default() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Dom);
        pool.get_mut(a).element = Some(ElementId(1));
        pool.dispose(a, false);
        assert_eq!(pool.take_released(), vec![ElementId(1)]);
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn stale_handle_panics() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Svg);
        pool.dispose(a, false);
        let _ = pool.get(a);
    }

    #[test]
    #[should_panic(expected = "dispose of linked")]
    fn dispose_requires_unlink() {
        let mut pool = DrawablePool::new();
        let a = alloc(&mut pool, Renderer::Svg);
        pool.link_after(None, a);
        pool.dispose(a, false);
    }
}
