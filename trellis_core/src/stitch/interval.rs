// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change intervals and their normalisation against the paint order.

use alloc::vec::Vec;

use crate::drawable::{DrawableId, DrawablePool};

/// A paint-order region whose block assignment may be stale.
///
/// `before` and `after` are the drawables bounding the region; `None`
/// stands for the start or end of the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangeInterval {
    /// Last drawable before the region.
    pub before: Option<DrawableId>,
    /// First drawable after the region.
    pub after: Option<DrawableId>,
}

impl ChangeInterval {
    /// Creates an interval between two boundaries.
    #[must_use]
    pub const fn new(before: Option<DrawableId>, after: Option<DrawableId>) -> Self {
        Self { before, after }
    }

    /// Rewrites boundaries that point at a drawable leaving the paint order.
    ///
    /// `prev` and `next` are the departing drawable's neighbours.
    pub fn replace_boundary(
        &mut self,
        leaving: DrawableId,
        prev: Option<DrawableId>,
        next: Option<DrawableId>,
    ) {
        if self.before == Some(leaving) {
            self.before = prev;
        }
        if self.after == Some(leaving) {
            self.after = next;
        }
    }
}

/// The paint order flattened once per stitch.
#[derive(Debug)]
pub(crate) struct PaintIndex {
    pub(crate) order: Vec<DrawableId>,
    position: Vec<usize>,
}

impl PaintIndex {
    pub(crate) fn new(pool: &DrawablePool) -> Self {
        let order: Vec<_> = pool.paint_order().collect();
        let mut position = alloc::vec![usize::MAX; pool.capacity()];
        for (i, d) in order.iter().enumerate() {
            position[d.idx as usize] = i;
        }
        Self { order, position }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn position(&self, id: DrawableId) -> usize {
        let pos = self.position[id.idx as usize];
        debug_assert!(
            pos != usize::MAX && self.order[pos] == id,
            "{id:?} is not in the paint order"
        );
        pos
    }
}

/// Half-open range `[start, end)` of paint positions whose assignment is
/// recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

/// Converts intervals to sorted, disjoint spans.
///
/// Each interval's interior grows over unassigned neighbours so both
/// boundaries are stable drawables with a block. Overlapping or adjacent
/// spans are merged.
pub(crate) fn normalise(
    intervals: &[ChangeInterval],
    index: &PaintIndex,
    pool: &DrawablePool,
) -> Vec<Span> {
    let assigned = |pos: usize| pool.get(index.order[pos]).block().is_some();
    let mut spans: Vec<Span> = intervals
        .iter()
        .map(|iv| {
            let mut start = iv.before.map_or(0, |b| index.position(b) + 1);
            let mut end = iv.after.map_or(index.len(), |a| index.position(a));
            debug_assert!(start <= end, "interval boundaries out of order: {iv:?}");
            while start > 0 && !assigned(start - 1) {
                start -= 1;
            }
            while end < index.len() && !assigned(end) {
                end += 1;
            }
            Span { start, end }
        })
        .collect();
    merge(&mut spans);
    spans
}

/// Sorts `spans` and merges overlapping or touching neighbours in place.
pub(crate) fn merge(spans: &mut Vec<Span>) {
    spans.sort_by_key(|s| (s.start, s.end));
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for s in spans.drain(..) {
        match merged.last_mut() {
            Some(last) if s.start <= last.end => last.end = last.end.max(s.end),
            _ => merged.push(s),
        }
    }
    *spans = merged;
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    #[test]
    fn merge_joins_overlapping_and_adjacent() {
        let mut spans = vec![span(5, 6), span(0, 2), span(2, 3), span(8, 9), span(1, 1)];
        merge(&mut spans);
        assert_eq!(spans, vec![span(0, 3), span(5, 6), span(8, 9)]);
    }

    #[test]
    fn merge_keeps_separated_spans() {
        let mut spans = vec![span(0, 1), span(2, 3)];
        merge(&mut spans);
        assert_eq!(spans.len(), 2, "a gap of one position must not merge");
    }

    #[test]
    fn replace_boundary_follows_neighbours() {
        let d = |idx| DrawableId { idx, generation: 0 };
        let mut iv = ChangeInterval::new(Some(d(1)), Some(d(2)));
        iv.replace_boundary(d(1), Some(d(0)), Some(d(2)));
        assert_eq!(iv, ChangeInterval::new(Some(d(0)), Some(d(2))));
        iv.replace_boundary(d(2), Some(d(0)), None);
        assert_eq!(iv, ChangeInterval::new(Some(d(0)), None));
    }
}
