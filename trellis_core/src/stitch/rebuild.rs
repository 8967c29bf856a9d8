// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Regrouping of whole boundary blocks.

use alloc::vec;
use alloc::vec::Vec;

use super::interval::{PaintIndex, Span, merge};
use super::{StitchStats, key_of};
use crate::block::{BlockId, BlockStore};
use crate::drawable::{DrawableId, DrawablePool};

pub(super) fn stitch_spans(
    spans: &[Span],
    index: &PaintIndex,
    pool: &mut DrawablePool,
    blocks: &mut BlockStore,
    stats: &mut StitchStats,
) {
    let mut wide: Vec<Span> = spans
        .iter()
        .map(|&s| expand(s, index, pool, blocks))
        .collect();
    merge(&mut wide);
    for span in wide {
        regroup(span, index, pool, blocks, stats);
    }
}

/// Grows `span` to the first member of the block before it and the last
/// member of the block after it.
fn expand(span: Span, index: &PaintIndex, pool: &DrawablePool, blocks: &BlockStore) -> Span {
    let start = match span.start.checked_sub(1) {
        Some(p) => pool
            .get(index.order[p])
            .block()
            .and_then(|b| blocks.get(b).members().first().copied())
            .map_or(p, |first| index.position(first).min(p)),
        None => 0,
    };
    let end = match index.order.get(span.end) {
        Some(&after) => pool
            .get(after)
            .block()
            .and_then(|b| blocks.get(b).members().last().copied())
            .map_or(span.end + 1, |last| index.position(last).max(span.end) + 1),
        None => index.len(),
    };
    Span { start, end }
}

fn regroup(
    span: Span,
    index: &PaintIndex,
    pool: &mut DrawablePool,
    blocks: &mut BlockStore,
    stats: &mut StitchStats,
) {
    let drawables = &index.order[span.start..span.end];
    let prior: Vec<Option<BlockId>> = drawables.iter().map(|&d| pool.get(d).block()).collect();
    let mut old: Vec<BlockId> = Vec::new();
    for b in prior.iter().flatten() {
        if !old.contains(b) {
            old.push(*b);
        }
    }

    let base = old
        .iter()
        .filter_map(|&b| blocks.position(b))
        .min()
        .unwrap_or_else(|| {
            span.start
                .checked_sub(1)
                .and_then(|p| pool.get(index.order[p]).block())
                .and_then(|b| blocks.position(b))
                .map_or(0, |p| p + 1)
        });

    let mut used = vec![false; old.len()];
    let mut run_start = 0;
    let mut slot = 0;
    while run_start < drawables.len() {
        let key = key_of(pool, drawables[run_start]);
        let mut run_end = run_start + 1;
        if !key.renderer.is_exclusive() {
            while run_end < drawables.len() && key_of(pool, drawables[run_end]) == key {
                run_end += 1;
            }
        }
        let run: Vec<DrawableId> = drawables[run_start..run_end].to_vec();

        let reuse = (0..old.len())
            .find(|&j| !used[j] && blocks.get(old[j]).key() == key)
            .or_else(|| {
                (0..old.len())
                    .find(|&j| !used[j] && blocks.get(old[j]).renderer() == key.renderer)
            });
        let target = if let Some(j) = reuse {
            used[j] = true;
            blocks.set_key(old[j], key);
            blocks.move_to(old[j], base + slot);
            old[j]
        } else {
            stats.blocks_created += 1;
            blocks.create(key, base + slot)
        };
        stats.drawables_moved += run
            .iter()
            .zip(&prior[run_start..run_end])
            .filter(|(_, p)| **p != Some(target))
            .count();
        blocks.set_members(pool, target, run);

        run_start = run_end;
        slot += 1;
    }

    for (j, b) in old.into_iter().enumerate() {
        if !used[j] {
            blocks.drop_members(b);
            blocks.dispose(b);
            stats.blocks_disposed += 1;
        }
    }
}
