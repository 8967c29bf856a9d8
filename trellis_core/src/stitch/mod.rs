// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block reconciliation after paint-order changes.
//!
//! Creating or disposing drawables records [`ChangeInterval`]s: pairs of
//! stable boundary drawables around a region whose block assignment may be
//! stale. Once per frame [`stitch`] normalises the pending intervals (the
//! paint list is indexed once; intervals are sorted and overlapping or
//! adjacent ones merged) and repairs blocks inside each one. Blocks outside
//! every interval are never touched.
//!
//! Two policies are available:
//!
//! - [`StitchPolicy::Greedy`] scans each interval once, extending the
//!   current block while the next drawable is compatible and opening a new
//!   block exactly at an incompatibility. When a block is opened inside the
//!   boundary block, that block's tail is split off so the head keeps its
//!   surface. A compatible trailing block is glued onto the leading one.
//! - [`StitchPolicy::Rebuild`] widens each interval to whole boundary
//!   blocks and regroups the span into maximal compatible runs, reusing the
//!   span's old blocks (and their surfaces) by renderer.

mod greedy;
mod interval;
mod rebuild;

pub use interval::ChangeInterval;

use crate::block::{BlockKey, BlockStore};
use crate::drawable::{DrawableId, DrawablePool};

/// How [`stitch`] regroups a changed span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StitchPolicy {
    /// Single forward scan; minimal block churn.
    #[default]
    Greedy,
    /// Regroup whole boundary blocks into maximal runs.
    Rebuild,
}

/// Counters for one [`stitch`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StitchStats {
    /// Intervals handed in.
    pub intervals_in: usize,
    /// Disjoint spans after normalisation.
    pub spans: usize,
    /// Blocks created.
    pub blocks_created: usize,
    /// Blocks disposed, including ones emptied by drawable disposal.
    pub blocks_disposed: usize,
    /// Drawables assigned to a different block.
    pub drawables_moved: usize,
}

/// Repairs block assignment inside `intervals`.
///
/// With `audit` set, block coverage and contiguity are verified afterwards.
///
/// # Panics
///
/// Panics if an interval boundary is not in the paint order, or if the
/// audit fails.
pub fn stitch(
    policy: StitchPolicy,
    intervals: &[ChangeInterval],
    pool: &mut DrawablePool,
    blocks: &mut BlockStore,
    audit: bool,
) -> StitchStats {
    let mut stats = StitchStats {
        intervals_in: intervals.len(),
        ..StitchStats::default()
    };
    if !intervals.is_empty() {
        let index = interval::PaintIndex::new(pool);
        let spans = interval::normalise(intervals, &index, pool);
        stats.spans = spans.len();
        match policy {
            StitchPolicy::Greedy => {
                for span in spans {
                    greedy::stitch_span(span, &index, pool, blocks, &mut stats);
                }
            }
            StitchPolicy::Rebuild => {
                rebuild::stitch_spans(&spans, &index, pool, blocks, &mut stats);
            }
        }
    }
    stats.blocks_disposed += dispose_empty(blocks);
    if audit {
        blocks.audit(pool);
    }
    stats
}

fn dispose_empty(blocks: &mut BlockStore) -> usize {
    let empty: alloc::vec::Vec<_> = blocks
        .order()
        .iter()
        .copied()
        .filter(|&b| blocks.get(b).members().is_empty())
        .collect();
    for &b in &empty {
        blocks.dispose(b);
    }
    empty.len()
}

fn key_of(pool: &DrawablePool, drawable: DrawableId) -> BlockKey {
    match pool.get(drawable).key() {
        Some(key) => key,
        None => panic!("{drawable:?} in paint order has no block key"),
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;
    use crate::backend::SurfaceId;
    use crate::block::BlockId;
    use crate::drawable::DrawableKind;
    use crate::instance::InstanceId;
    use crate::node::NodeId;
    use crate::renderer::Renderer;

    const POLICIES: [StitchPolicy; 2] = [StitchPolicy::Greedy, StitchPolicy::Rebuild];

    #[derive(Default)]
    struct Fixture {
        pool: DrawablePool,
        blocks: BlockStore,
        pending: Vec<ChangeInterval>,
        serial: u32,
    }

    impl Fixture {
        fn insert(&mut self, prev: Option<DrawableId>, renderer: Renderer) -> DrawableId {
            self.serial += 1;
            let id = self.pool.allocate(
                DrawableKind::Shape,
                BlockKey {
                    renderer,
                    transform_root: None,
                    filter_root: None,
                },
                InstanceId {
                    idx: self.serial,
                    generation: 0,
                },
                NodeId {
                    idx: self.serial,
                    generation: 0,
                },
            );
            self.pool.link_after(prev, id);
            let next = self.pool.get(id).next();
            self.pending.push(ChangeInterval::new(prev, next));
            id
        }

        fn remove(&mut self, id: DrawableId) {
            let (prev, next) = self.pool.unlink(id);
            for iv in &mut self.pending {
                iv.replace_boundary(id, prev, next);
            }
            self.pending.push(ChangeInterval::new(prev, next));
            if let Some(b) = self.pool.get(id).block() {
                self.blocks.remove_drawable(&mut self.pool, b, id);
            }
            self.pool.dispose(id, false);
        }

        fn stitch(&mut self, policy: StitchPolicy) -> StitchStats {
            let pending = core::mem::take(&mut self.pending);
            stitch(policy, &pending, &mut self.pool, &mut self.blocks, true)
        }

        fn layout(&self) -> Vec<Vec<DrawableId>> {
            self.blocks
                .order()
                .iter()
                .map(|&b| self.blocks.get(b).members().to_vec())
                .collect()
        }

        fn snapshot(&self) -> Vec<(BlockId, Option<SurfaceId>, Vec<DrawableId>)> {
            self.blocks
                .order()
                .iter()
                .map(|&b| {
                    let block = self.blocks.get(b);
                    (b, block.surface(), block.members().to_vec())
                })
                .collect()
        }

        fn block_of(&self, d: DrawableId) -> BlockId {
            self.pool.get(d).block().unwrap()
        }
    }

    #[test]
    fn initial_stitch_groups_runs() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Svg);
            let b = f.insert(Some(a), Renderer::Svg);
            let c = f.insert(Some(b), Renderer::Canvas);
            let d = f.insert(Some(c), Renderer::Svg);
            let stats = f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a, b], vec![c], vec![d]], "{policy:?}");
            assert_eq!(stats.blocks_created, 3, "{policy:?}");
            assert_eq!(stats.spans, 1, "{policy:?}");
        }
    }

    #[test]
    fn incompatible_insert_splits_and_head_keeps_surface() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Svg);
            let c = f.insert(Some(a), Renderer::Svg);
            f.stitch(policy);
            let head = f.block_of(a);
            f.blocks.get_mut(head).set_surface(SurfaceId(1));

            let b = f.insert(Some(a), Renderer::Canvas);
            let stats = f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a], vec![b], vec![c]], "{policy:?}");
            assert_eq!(f.block_of(a), head, "{policy:?}: head block should survive");
            assert_eq!(f.blocks.get(head).surface(), Some(SurfaceId(1)), "{policy:?}");
            assert_ne!(f.block_of(c), head, "{policy:?}: tail should move");
            assert_eq!(stats.blocks_created, 2, "{policy:?}");
            assert_eq!(stats.blocks_disposed, 0, "{policy:?}");
        }
    }

    #[test]
    fn compatible_insert_stays_in_block() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Canvas);
            let c = f.insert(Some(a), Renderer::Canvas);
            f.stitch(policy);
            let block = f.block_of(a);

            let b = f.insert(Some(a), Renderer::Canvas);
            let stats = f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a, b, c]], "{policy:?}");
            assert_eq!(f.block_of(b), block, "{policy:?}");
            assert_eq!(stats.blocks_created, 0, "{policy:?}");
        }
    }

    #[test]
    fn removal_glues_neighbours() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Svg);
            let b = f.insert(Some(a), Renderer::Canvas);
            let c = f.insert(Some(b), Renderer::Svg);
            f.stitch(policy);
            let head = f.block_of(a);

            f.remove(b);
            let stats = f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a, c]], "{policy:?}");
            assert_eq!(f.block_of(c), head, "{policy:?}");
            assert_eq!(stats.blocks_disposed, 2, "{policy:?}");
        }
    }

    #[test]
    fn insertion_at_front() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let b = f.insert(None, Renderer::Svg);
            f.stitch(policy);
            let a = f.insert(None, Renderer::Canvas);
            f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a], vec![b]], "{policy:?}");
        }
    }

    #[test]
    fn exclusive_renderer_gets_singleton_blocks() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Dom);
            let b = f.insert(Some(a), Renderer::Dom);
            let c = f.insert(Some(b), Renderer::Dom);
            f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a], vec![b], vec![c]], "{policy:?}");
        }
    }

    #[test]
    fn untouched_blocks_are_left_alone() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Svg);
            let b = f.insert(Some(a), Renderer::Canvas);
            let c = f.insert(Some(b), Renderer::Svg);
            let d = f.insert(Some(c), Renderer::Canvas);
            f.stitch(policy);
            let ids: Vec<BlockId> = f.blocks.order().to_vec();
            for (n, &block) in (1..).zip(&ids) {
                let blk = f.blocks.get_mut(block);
                blk.set_surface(SurfaceId(n));
                blk.clear_group_order();
                blk.clear_full_repaint();
            }
            let before = f.snapshot();

            let e = f.insert(Some(d), Renderer::Canvas);
            let stats = f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![a], vec![b], vec![c], vec![d, e]], "{policy:?}");
            assert_eq!(f.snapshot()[..3], before[..3], "{policy:?}");
            assert_eq!(f.block_of(e), ids[3], "{policy:?}: last block extended");
            assert_eq!(f.blocks.get(ids[3]).surface(), Some(SurfaceId(4)), "{policy:?}");
            for &block in &ids[..3] {
                let untouched = f.blocks.get(block);
                assert!(!untouched.dirty_group_order(), "{policy:?}");
                assert!(!untouched.full_repaint(), "{policy:?}");
            }
            assert_eq!(stats.blocks_created, 0, "{policy:?}");
            assert_eq!(stats.blocks_disposed, 0, "{policy:?}");
        }
    }

    #[test]
    fn compatible_insert_in_front_joins_next_block() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let x = f.insert(None, Renderer::Svg);
            let y = f.insert(Some(x), Renderer::Svg);
            let z = f.insert(Some(y), Renderer::Canvas);
            f.stitch(policy);
            let head = f.block_of(x);
            let last = f.block_of(z);
            f.blocks.get_mut(head).set_surface(SurfaceId(1));
            f.blocks.get_mut(last).set_surface(SurfaceId(2));

            let n = f.insert(None, Renderer::Svg);
            let stats = f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![n, x, y], vec![z]], "{policy:?}");
            assert_eq!(f.block_of(n), head, "{policy:?}: existing block absorbs it");
            assert_eq!(f.blocks.get(head).surface(), Some(SurfaceId(1)), "{policy:?}");
            assert_eq!(f.blocks.order(), [head, last], "{policy:?}");
            assert_eq!(stats.blocks_created, 0, "{policy:?}");
            assert_eq!(stats.blocks_disposed, 0, "{policy:?}");
            assert!(f.blocks.take_released().is_empty(), "{policy:?}");
        }
    }

    #[test]
    fn glue_after_new_block_keeps_following_surface() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Canvas);
            let x = f.insert(Some(a), Renderer::Svg);
            f.stitch(policy);
            let canvas = f.block_of(a);
            let svg = f.block_of(x);
            f.blocks.get_mut(svg).set_surface(SurfaceId(7));

            // Replacing the canvas drawable by an svg one leaves no block
            // before the change, so only the following block can survive.
            f.remove(a);
            let n = f.insert(None, Renderer::Svg);
            f.stitch(policy);
            assert_eq!(f.layout(), vec![vec![n, x]], "{policy:?}");
            assert_eq!(f.block_of(n), svg, "{policy:?}");
            assert_eq!(f.blocks.get(svg).surface(), Some(SurfaceId(7)), "{policy:?}");
            assert!(!f.blocks.is_live(canvas), "{policy:?}");
        }
    }

    #[test]
    fn removing_everything_disposes_all_blocks() {
        for policy in POLICIES {
            let mut f = Fixture::default();
            let a = f.insert(None, Renderer::Svg);
            let b = f.insert(Some(a), Renderer::Canvas);
            f.stitch(policy);
            f.remove(a);
            f.remove(b);
            f.stitch(policy);
            assert!(f.layout().is_empty(), "{policy:?}");
            assert_eq!(f.blocks.live(), 0, "{policy:?}");
        }
    }
}
