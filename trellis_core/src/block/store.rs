// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block arena, block order and the per-frame update queue.

use alloc::vec::Vec;

use super::{Block, BlockId, BlockKey};
use crate::backend::SurfaceId;
use crate::drawable::{DrawableId, DrawablePool};

/// Owns every block of a display, in block (stacking) order.
///
/// Membership is kept symmetric with [`Drawable::block`]: every mutation
/// goes through the store, which updates both sides.
///
/// [`Drawable::block`]: crate::drawable::Drawable::block
#[derive(Debug, Default)]
pub struct BlockStore {
    slots: Vec<Block>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    order: Vec<BlockId>,
    order_dirty: bool,
    queue: Vec<BlockId>,
    released: Vec<SurfaceId>,
    live: usize,
}

impl BlockStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn live(&self) -> usize {
        self.live
    }

    /// Returns the blocks in stacking order, bottom first.
    #[must_use]
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }

    /// Returns the position of `id` in block order.
    #[must_use]
    pub fn position(&self, id: BlockId) -> Option<usize> {
        self.order.iter().position(|&b| b == id)
    }

    /// Returns whether `id` refers to a live block.
    #[must_use]
    pub fn is_live(&self, id: BlockId) -> bool {
        (id.idx as usize) < self.slots.len()
            && self.generation[id.idx as usize] == id.generation
            && self.slots[id.idx as usize].live
    }

    /// Returns a live block.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn get(&self, id: BlockId) -> &Block {
        self.validate(id);
        &self.slots[id.idx as usize]
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> &mut Block {
        self.validate(id);
        &mut self.slots[id.idx as usize]
    }

    /// Creates an empty block at `position` in block order and queues it.
    ///
    /// # Panics
    ///
    /// Panics if `position` is past the end of the order.
    pub fn create(&mut self, key: BlockKey, position: usize) -> BlockId {
        assert!(
            position <= self.order.len(),
            "block position {position} out of range 0..={}",
            self.order.len()
        );
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Block::new(key);
            idx
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Block::new(key));
            self.generation.push(0);
            idx
        };
        let id = BlockId {
            idx,
            generation: self.generation[idx as usize],
        };
        self.order.insert(position, id);
        self.order_dirty = true;
        self.live += 1;
        self.queue(id);
        id
    }

    /// Destroys an empty block, queueing its surface for release.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale or the block still has members.
    pub fn dispose(&mut self, id: BlockId) {
        self.validate(id);
        let block = &mut self.slots[id.idx as usize];
        assert!(
            block.members.is_empty(),
            "dispose of non-empty {id:?} with {} members",
            block.members.len()
        );
        if let Some(surface) = block.surface.take() {
            self.released.push(surface);
        }
        block.live = false;
        block.queued = false;
        block.placement = None;
        self.order.retain(|&b| b != id);
        self.order_dirty = true;
        self.generation[id.idx as usize] = self.generation[id.idx as usize].wrapping_add(1);
        self.free_list.push(id.idx);
        self.live -= 1;
    }

    /// Returns whether `block` can take a drawable with `key`.
    ///
    /// Keys must match, and a block of an exclusive renderer only accepts
    /// while empty.
    #[must_use]
    pub fn accepts(&self, block: BlockId, key: &BlockKey) -> bool {
        let b = self.get(block);
        b.key == *key && (!key.renderer.is_exclusive() || b.members.is_empty())
    }

    /// Inserts `drawable` after `after`, or at the front when `after` is
    /// `None`.
    ///
    /// # Panics
    ///
    /// Panics if `after` is not a member or `drawable` already has a block.
    pub fn add_drawable(
        &mut self,
        pool: &mut DrawablePool,
        block: BlockId,
        after: Option<DrawableId>,
        drawable: DrawableId,
    ) {
        self.validate(block);
        assert!(
            pool.get(drawable).block().is_none(),
            "{drawable:?} already belongs to a block"
        );
        let b = &mut self.slots[block.idx as usize];
        let at = match after {
            Some(a) => {
                let pos = b.members.iter().position(|&m| m == a);
                assert!(pos.is_some(), "{a:?} is not a member of {block:?}");
                pos.map_or(0, |p| p + 1)
            }
            None => 0,
        };
        b.members.insert(at, drawable);
        pool.get_mut(drawable).set_block(Some(block));
        self.membership_changed(block);
    }

    /// Appends `drawable` to the end of `block`.
    pub fn push_drawable(&mut self, pool: &mut DrawablePool, block: BlockId, drawable: DrawableId) {
        let after = self.get(block).members.last().copied();
        self.add_drawable(pool, block, after, drawable);
    }

    /// Removes `drawable` from `block`.
    ///
    /// # Panics
    ///
    /// Panics if `drawable` is not a member.
    pub fn remove_drawable(
        &mut self,
        pool: &mut DrawablePool,
        block: BlockId,
        drawable: DrawableId,
    ) {
        self.validate(block);
        let b = &mut self.slots[block.idx as usize];
        let pos = b.members.iter().position(|&m| m == drawable);
        let Some(pos) = pos else {
            panic!("{drawable:?} is not a member of {block:?}");
        };
        b.members.remove(pos);
        if pool.is_live(drawable) {
            pool.get_mut(drawable).set_block(None);
        }
        self.membership_changed(block);
    }

    /// Detaches every member from `position` on and returns them in order.
    pub fn split_off(
        &mut self,
        pool: &mut DrawablePool,
        block: BlockId,
        position: usize,
    ) -> Vec<DrawableId> {
        self.validate(block);
        let tail = self.slots[block.idx as usize].members.split_off(position);
        for &d in &tail {
            pool.get_mut(d).set_block(None);
        }
        if !tail.is_empty() {
            self.membership_changed(block);
        }
        tail
    }

    /// Replaces the members of `block` wholesale.
    ///
    /// Marks membership changed only if the sequence differs.
    pub fn set_members(
        &mut self,
        pool: &mut DrawablePool,
        block: BlockId,
        members: Vec<DrawableId>,
    ) {
        self.validate(block);
        if self.slots[block.idx as usize].members == members {
            return;
        }
        for &d in &members {
            pool.get_mut(d).set_block(Some(block));
        }
        self.slots[block.idx as usize].members = members;
        self.membership_changed(block);
    }

    /// Forgets the member list without touching the drawables, which must
    /// already belong to other blocks.
    pub(crate) fn drop_members(&mut self, block: BlockId) {
        self.get_mut(block).members.clear();
    }

    /// Re-keys a reused block. A different anchor means a new placement.
    pub fn set_key(&mut self, block: BlockId, key: BlockKey) {
        let b = self.get_mut(block);
        if b.key == key {
            return;
        }
        debug_assert_eq!(
            b.key.renderer, key.renderer,
            "blocks are reused within a renderer only"
        );
        b.key = key;
        b.dirty_placement = true;
        b.full_repaint = true;
        self.queue(block);
    }

    /// Moves `block` to `position` in block order.
    pub fn move_to(&mut self, block: BlockId, position: usize) {
        let Some(from) = self.position(block) else {
            return;
        };
        if from == position {
            return;
        }
        self.order.remove(from);
        self.order.insert(position.min(self.order.len()), block);
        self.order_dirty = true;
    }

    /// Requests a placement write for `block`.
    pub fn mark_placement(&mut self, block: BlockId) {
        self.get_mut(block).dirty_placement = true;
        self.queue(block);
    }

    /// Requests a full repaint of an immediate-mode `block`.
    pub fn mark_full_repaint(&mut self, block: BlockId) {
        self.get_mut(block).full_repaint = true;
        self.queue(block);
    }

    /// Puts `block` on the update queue once.
    pub fn queue(&mut self, block: BlockId) {
        let b = self.get_mut(block);
        if !b.queued {
            b.queued = true;
            self.queue.push(block);
        }
    }

    /// Returns the number of queue entries, including ones added mid-walk.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns the queue entry at `index`.
    #[must_use]
    pub fn queued(&self, index: usize) -> Option<BlockId> {
        self.queue.get(index).copied()
    }

    pub(crate) fn dequeue(&mut self, block: BlockId) {
        if self.is_live(block) {
            self.slots[block.idx as usize].queued = false;
        }
    }

    /// Empties the queue, keeping `retry` queued for the next frame.
    pub fn finish_queue(&mut self, retry: &[BlockId]) {
        self.queue.clear();
        for &b in retry {
            if self.is_live(b) {
                self.slots[b.idx as usize].queued = false;
                self.queue(b);
            }
        }
    }

    /// Returns and clears the block-order dirty flag.
    pub fn take_order_dirty(&mut self) -> bool {
        core::mem::take(&mut self.order_dirty)
    }

    /// Flags the block order for rewriting.
    pub fn mark_order_dirty(&mut self) {
        self.order_dirty = true;
    }

    /// Returns and clears the surfaces waiting for release.
    pub fn take_released(&mut self) -> Vec<SurfaceId> {
        core::mem::take(&mut self.released)
    }

    /// Checks block coverage and contiguity against the paint order.
    ///
    /// # Panics
    ///
    /// Panics if the concatenated members differ from the paint order, a
    /// member's back-reference or key disagrees with its block, a block is
    /// empty, or an exclusive block holds more than one drawable.
    pub fn audit(&self, pool: &DrawablePool) {
        let mut flattened = Vec::with_capacity(pool.linked());
        for &id in &self.order {
            assert!(self.is_live(id), "block order contains dead {id:?}");
            let b = &self.slots[id.idx as usize];
            assert!(!b.members.is_empty(), "{id:?} is empty");
            if b.key.renderer.is_exclusive() {
                assert!(
                    b.members.len() == 1,
                    "exclusive {id:?} holds {} drawables",
                    b.members.len()
                );
            }
            for &m in &b.members {
                let d = pool.get(m);
                assert_eq!(d.block(), Some(id), "{m:?} points at the wrong block");
                assert_eq!(d.key(), Some(b.key), "{m:?} key differs from {id:?}");
                flattened.push(m);
            }
        }
        let order: Vec<_> = pool.paint_order().collect();
        assert_eq!(
            flattened, order,
            "block members do not cover the paint order"
        );
    }

    fn membership_changed(&mut self, block: BlockId) {
        let b = &mut self.slots[block.idx as usize];
        if b.key.renderer.is_retained() {
            b.dirty_group_order = true;
        } else {
            b.full_repaint = true;
        }
        self.queue(block);
    }

    fn validate(&self, id: BlockId) {
        assert!(self.is_live(id), "stale {id:?}");
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::backend::Placement;
    use crate::drawable::DrawableKind;
    use crate::instance::InstanceId;
    use crate::node::NodeId;
    use crate::renderer::Renderer;

    fn key(renderer: Renderer) -> BlockKey {
        BlockKey {
            renderer,
            transform_root: None,
            filter_root: None,
        }
    }

    fn drawable(pool: &mut DrawablePool, prev: Option<DrawableId>, r: Renderer) -> DrawableId {
        let n = u32::try_from(pool.live()).unwrap();
        let id = pool.allocate(
            DrawableKind::Shape,
            key(r),
            InstanceId { idx: n + 1, generation: 0 },
            NodeId { idx: n, generation: 0 },
        );
        pool.link_after(prev, id);
        id
    }

    #[test]
    fn recycled_block_slots_start_clean() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let mut previous: Option<BlockId> = None;
        for round in 0..8 {
            let b = blocks.create(key(Renderer::Svg), 0);
            let block = blocks.get(b);
            assert!(block.members().is_empty(), "round {round}: members reset");
            assert_eq!(block.surface(), None, "round {round}: surface reset");
            assert_eq!(block.placement(), None, "round {round}");
            assert!(!block.dirty_group_order(), "round {round}: group order reset");
            assert!(block.dirty_placement(), "round {round}");
            assert!(block.full_repaint(), "round {round}");
            if let Some(p) = previous {
                assert_eq!(b.idx, p.idx, "round {round}: slot reused");
                assert!(b.generation > p.generation, "round {round}");
                assert!(!blocks.is_live(p), "old handle is stale");
            }

            let d = drawable(&mut pool, None, Renderer::Svg);
            blocks.push_drawable(&mut pool, b, d);
            blocks.get_mut(b).set_surface(SurfaceId(round));
            blocks.get_mut(b).set_placement(Placement::default());
            pool.unlink(d);
            blocks.remove_drawable(&mut pool, b, d);
            pool.dispose(d, false);
            blocks.dispose(b);
            previous = Some(b);
        }
        assert_eq!(blocks.slots.len(), 1, "one slot serves every round");
        assert_eq!(blocks.live(), 0);
        assert_eq!(blocks.take_released().len(), 8, "every surface released");
    }

    #[test]
    fn middle_insertion_keeps_contiguity() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let a = drawable(&mut pool, None, Renderer::Svg);
        let c = drawable(&mut pool, Some(a), Renderer::Svg);
        let b0 = blocks.create(key(Renderer::Svg), 0);
        blocks.push_drawable(&mut pool, b0, a);
        blocks.push_drawable(&mut pool, b0, c);
        blocks.audit(&pool);

        let b = drawable(&mut pool, Some(a), Renderer::Svg);
        blocks.add_drawable(&mut pool, b0, Some(a), b);
        assert_eq!(blocks.get(b0).members(), &[a, b, c]);
        assert!(blocks.get(b0).dirty_group_order());
        blocks.audit(&pool);
    }

    #[test]
    fn immediate_membership_change_requests_full_repaint() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let a = drawable(&mut pool, None, Renderer::Canvas);
        let b0 = blocks.create(key(Renderer::Canvas), 0);
        blocks.push_drawable(&mut pool, b0, a);
        blocks.get_mut(b0).clear_full_repaint();
        pool.unlink(a);
        blocks.remove_drawable(&mut pool, b0, a);
        assert!(blocks.get(b0).full_repaint());
        assert!(!blocks.get(b0).dirty_group_order());
    }

    #[test]
    fn exclusive_blocks_take_one_drawable() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let a = drawable(&mut pool, None, Renderer::Dom);
        let b0 = blocks.create(key(Renderer::Dom), 0);
        assert!(blocks.accepts(b0, &key(Renderer::Dom)));
        blocks.push_drawable(&mut pool, b0, a);
        assert!(!blocks.accepts(b0, &key(Renderer::Dom)));
        assert!(!blocks.accepts(b0, &key(Renderer::Svg)));
    }

    #[test]
    fn dispose_releases_surface_and_order() {
        let mut blocks = BlockStore::new();
        let b0 = blocks.create(key(Renderer::Svg), 0);
        let b1 = blocks.create(key(Renderer::Canvas), 1);
        blocks.get_mut(b0).set_surface(SurfaceId(5));
        blocks.take_order_dirty();
        blocks.dispose(b0);
        assert_eq!(blocks.order(), &[b1]);
        assert_eq!(blocks.take_released(), vec![SurfaceId(5)]);
        assert!(blocks.take_order_dirty());
        assert!(!blocks.is_live(b0));

        let b2 = blocks.create(key(Renderer::Svg), 0);
        assert_eq!(b2.idx, b0.idx, "slot should be recycled");
        assert_eq!(blocks.get(b2).surface(), None);
    }

    #[test]
    fn queue_deduplicates_and_retries() {
        let mut blocks = BlockStore::new();
        let b0 = blocks.create(key(Renderer::Svg), 0);
        blocks.queue(b0);
        assert_eq!(blocks.queue_len(), 1);
        blocks.finish_queue(&[b0]);
        assert_eq!(blocks.queued(0), Some(b0));
        assert!(blocks.get(b0).is_queued());
    }

    #[test]
    fn split_off_detaches_tail() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let a = drawable(&mut pool, None, Renderer::Svg);
        let b = drawable(&mut pool, Some(a), Renderer::Svg);
        let b0 = blocks.create(key(Renderer::Svg), 0);
        blocks.push_drawable(&mut pool, b0, a);
        blocks.push_drawable(&mut pool, b0, b);
        assert_eq!(blocks.split_off(&mut pool, b0, 1), vec![b]);
        assert_eq!(pool.get(b).block(), None);
        assert_eq!(blocks.get(b0).members(), &[a]);
    }

    #[test]
    #[should_panic(expected = "block members do not cover the paint order")]
    fn audit_detects_uncovered_drawable() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let a = drawable(&mut pool, None, Renderer::Svg);
        let _b = drawable(&mut pool, Some(a), Renderer::Svg);
        let b0 = blocks.create(key(Renderer::Svg), 0);
        blocks.push_drawable(&mut pool, b0, a);
        blocks.audit(&pool);
    }

    #[test]
    #[should_panic(expected = "dispose of non-empty")]
    fn dispose_requires_empty() {
        let mut pool = DrawablePool::new();
        let mut blocks = BlockStore::new();
        let a = drawable(&mut pool, None, Renderer::Svg);
        let b0 = blocks.create(key(Renderer::Svg), 0);
        blocks.push_drawable(&mut pool, b0, a);
        blocks.dispose(b0);
    }
}
