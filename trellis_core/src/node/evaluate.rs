// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame evaluation and change tracking.
//!
//! Evaluation drains every dirty channel exactly once and reports the
//! affected raw slot indices in a [`TreeChanges`]. Unlike a strict tree, a
//! node shared by several parents has no single world transform, so
//! inherited properties are resolved per instance by the consumers of the
//! changes (see [`Display::update`](crate::display::Display::update)).
//!
//! - **TRANSFORM** / **OPACITY** drain with `affected()`, so every
//!   descendant of a marked node is reported through every path.
//! - The paint attribute channels, **RELEVANCE**, **ACCESSIBLE**, **KIND**,
//!   and **TOPOLOGY** report only the marked nodes.
//!
//! [`TreeChanges`] uses raw slot indices (`u32`). Indices of nodes destroyed
//! before the drain may appear in the lists; consumers check liveness with
//! [`NodeTree::id_at`].

use alloc::vec::Vec;

use understory_dirty::Channel;

use super::store::NodeTree;
use crate::dirty;

/// The set of changes produced by a single [`NodeTree::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct TreeChanges {
    /// Nodes whose inherited transform or visibility may have changed.
    pub transforms: Vec<u32>,
    /// Nodes whose inherited opacity may have changed.
    pub opacities: Vec<u32>,
    /// Shape nodes whose outline changed.
    pub shapes: Vec<u32>,
    /// Nodes whose fill changed.
    pub fills: Vec<u32>,
    /// Nodes whose stroke changed.
    pub strokes: Vec<u32>,
    /// Text nodes whose string changed.
    pub texts: Vec<u32>,
    /// Text nodes whose font changed.
    pub fonts: Vec<u32>,
    /// Image nodes whose source or size changed.
    pub images: Vec<u32>,
    /// Nodes whose child list changed.
    pub topology: Vec<u32>,
    /// Nodes whose render relevance inputs changed.
    pub relevance: Vec<u32>,
    /// Nodes that gained or lost an accessible description.
    pub accessible: Vec<u32>,
    /// Nodes whose drawables must be replaced.
    pub kinds: Vec<u32>,
    /// Nodes created since the last evaluate.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last evaluate.
    pub removed: Vec<u32>,
}

impl TreeChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.opacities.clear();
        self.shapes.clear();
        self.fills.clear();
        self.strokes.clear();
        self.texts.clear();
        self.fonts.clear();
        self.images.clear();
        self.topology.clear();
        self.relevance.clear();
        self.accessible.clear();
        self.kinds.clear();
        self.added.clear();
        self.removed.clear();
    }

    /// Returns whether no change was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.opacities.is_empty()
            && self.shapes.is_empty()
            && self.fills.is_empty()
            && self.strokes.is_empty()
            && self.texts.is_empty()
            && self.fonts.is_empty()
            && self.images.is_empty()
            && self.topology.is_empty()
            && self.relevance.is_empty()
            && self.accessible.is_empty()
            && self.kinds.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

impl NodeTree {
    /// Drains all dirty channels and returns the set of changes.
    pub fn evaluate(&mut self) -> TreeChanges {
        let mut changes = TreeChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer.
    pub fn evaluate_into(&mut self, changes: &mut TreeChanges) {
        changes.clear();

        changes.transforms = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes.opacities = self
            .dirty
            .drain(dirty::OPACITY)
            .affected()
            .deterministic()
            .run()
            .collect();

        changes.shapes = self.drain_local(dirty::SHAPE);
        changes.fills = self.drain_local(dirty::FILL);
        changes.strokes = self.drain_local(dirty::STROKE);
        changes.texts = self.drain_local(dirty::TEXT);
        changes.fonts = self.drain_local(dirty::FONT);
        changes.images = self.drain_local(dirty::IMAGE);
        changes.topology = self.drain_local(dirty::TOPOLOGY);
        changes.relevance = self.drain_local(dirty::RELEVANCE);
        changes.accessible = self.drain_local(dirty::ACCESSIBLE);
        changes.kinds = self.drain_local(dirty::KIND);

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    fn drain_local(&mut self, channel: Channel) -> Vec<u32> {
        self.dirty.drain(channel).deterministic().run().collect()
    }
}
