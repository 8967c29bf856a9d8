// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single forward scan over one span.

use alloc::vec::Vec;

use super::interval::{PaintIndex, Span};
use super::{StitchStats, key_of};
use crate::block::BlockStore;
use crate::drawable::DrawablePool;

pub(super) fn stitch_span(
    span: Span,
    index: &PaintIndex,
    pool: &mut DrawablePool,
    blocks: &mut BlockStore,
    stats: &mut StitchStats,
) {
    let before = span.start.checked_sub(1).map(|p| index.order[p]);
    let after = index.order.get(span.end).copied();
    let interior = &index.order[span.start..span.end];

    for &d in interior {
        if let Some(b) = pool.get(d).block() {
            blocks.remove_drawable(pool, b, d);
        }
    }

    let block_before = before.and_then(|d| pool.get(d).block());
    let mut current = block_before;
    let mut cursor = before;
    let mut tail = Vec::new();

    for &d in interior {
        let key = key_of(pool, d);
        match current {
            Some(b) if blocks.accepts(b, &key) => {
                blocks.add_drawable(pool, b, cursor, d);
            }
            _ => {
                if let Some(b) = current.filter(|&b| Some(b) == block_before) {
                    // First block opened inside the boundary block.
                    let split_at = cursor
                        .and_then(|c| blocks.get(b).members().iter().position(|&m| m == c))
                        .map_or(0, |p| p + 1);
                    tail = blocks.split_off(pool, b, split_at);
                }
                let position = current
                    .and_then(|b| blocks.position(b))
                    .map_or(0, |p| p + 1);
                let opened = blocks.create(key, position);
                stats.blocks_created += 1;
                blocks.push_drawable(pool, opened, d);
                current = Some(opened);
            }
        }
        cursor = Some(d);
        stats.drawables_moved += 1;
    }

    if !tail.is_empty() {
        let tail_key = key_of(pool, tail[0]);
        let target = match current {
            Some(b) if Some(b) != block_before && blocks.accepts(b, &tail_key) => b,
            _ => {
                let position = current
                    .and_then(|b| blocks.position(b))
                    .map_or(0, |p| p + 1);
                stats.blocks_created += 1;
                blocks.create(tail_key, position)
            }
        };
        for d in tail {
            blocks.push_drawable(pool, target, d);
            stats.drawables_moved += 1;
        }
        current = Some(target);
    }

    let (Some(current), Some(after)) = (current, after) else {
        return;
    };
    let Some(block_after) = pool.get(after).block() else {
        return;
    };
    let key = blocks.get(current).key();
    if block_after == current
        || blocks.get(block_after).key() != key
        || key.renderer.is_exclusive()
    {
        return;
    }
    if Some(current) == block_before {
        let moved = blocks.split_off(pool, block_after, 0);
        for d in moved {
            blocks.push_drawable(pool, current, d);
            stats.drawables_moved += 1;
        }
        blocks.dispose(block_after);
        stats.blocks_disposed += 1;
    } else {
        // `current` was opened by this pass; fold it into the surviving
        // block after the span so that block keeps its surface.
        let moved = blocks.split_off(pool, current, 0);
        let mut prev = None;
        for d in moved {
            blocks.add_drawable(pool, block_after, prev, d);
            prev = Some(d);
            stats.drawables_moved += 1;
        }
        blocks.dispose(current);
        stats.blocks_created -= 1;
    }
}
