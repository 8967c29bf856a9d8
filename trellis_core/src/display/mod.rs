// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The display: render mirror, drawables and blocks driven once per frame.
//!
//! A [`Display`] renders the subtree of one root node. It owns a render
//! [`InstanceTree`], a drawable pool, a block store and the pending change
//! intervals; nothing is shared between displays.
//!
//! ```text
//!   NodeTree::evaluate() ──► TreeChanges ──► Display::update()
//!                                              │
//!       ┌──────────────────────────────────────┘
//!       ▼
//!   1. mirror sync ──► drawables created / disposed ──► change intervals
//!   2. route paint channels to drawables, replace drawables on KIND
//!   3. resolve transform / opacity / visibility of precomputed instances
//!   4. stitch intervals into blocks
//!   5. walk the block queue: surface, placement, members, element order
//!   6. release elements and surfaces
//!   7. audits (optional)
//! ```
//!
//! Drawable creation and disposal happen synchronously inside mirror
//! mutation through [`InstanceHooks`](crate::instance::InstanceHooks).

mod painter;
mod update;

use alloc::vec;
use alloc::vec::Vec;

use painter::Painter;

use crate::backend::BackendError;
use crate::block::{BlockId, BlockStore};
use crate::drawable::{DrawableId, DrawablePool};
use crate::instance::{InstanceId, InstanceTree, RenderRelevance};
use crate::node::{NodeId, NodeTree};
use crate::renderer::{Renderer, Renderers};
use crate::stitch::{StitchPolicy, StitchStats};

/// Display-wide switches.
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    /// Renderers the backend provides.
    pub renderers: Renderers,
    /// Renderer choice order when a node allows several.
    pub preference: Vec<Renderer>,
    /// Keep the detached element of a disposed drawable for reuse.
    pub keep_pooled_elements: bool,
    /// How changed spans are regrouped into blocks.
    pub stitch_policy: StitchPolicy,
    /// Run mirror, block and drawable audits after every update.
    pub audit: bool,
    /// Tick source for trace timestamps.
    pub clock: Option<fn() -> u64>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            renderers: Renderers::all(),
            preference: vec![Renderer::Svg, Renderer::Canvas, Renderer::Dom, Renderer::WebGl],
            keep_pooled_elements: false,
            stitch_policy: StitchPolicy::Greedy,
            audit: cfg!(debug_assertions),
            clock: None,
        }
    }
}

/// Outcome of one [`Display::update`].
#[derive(Clone, Debug, Default)]
pub struct FrameReport {
    /// Frame counter of this update.
    pub frame_index: u64,
    /// Instances created by the mirror sync.
    pub instances_created: usize,
    /// Instances disposed by the mirror sync.
    pub instances_disposed: usize,
    /// Drawables allocated.
    pub drawables_created: usize,
    /// Drawables disposed.
    pub drawables_disposed: usize,
    /// Stitcher counters.
    pub stitch: StitchStats,
    /// Blocks whose backend update ran to completion.
    pub blocks_updated: usize,
    /// Drawables written to the backend.
    pub painted: usize,
    /// Blocks whose update failed. They keep their dirty state and are
    /// retried next frame.
    pub failed_blocks: Vec<(BlockId, BackendError)>,
    /// Surface ordering and release calls that failed.
    pub backend_errors: Vec<BackendError>,
}

/// Renders a node subtree through a [`SurfaceBackend`](crate::backend::SurfaceBackend).
#[derive(Debug)]
pub struct Display {
    config: DisplayConfig,
    mirror: InstanceTree<RenderRelevance>,
    painter: Painter,
    frame_index: u64,
}

impl Display {
    /// Creates a display of the subtree at `root`.
    ///
    /// Nothing is built until the first [`update`](Self::update).
    ///
    /// # Panics
    ///
    /// Panics if `root` is stale.
    pub fn new(tree: &mut NodeTree, root: NodeId, config: DisplayConfig) -> Self {
        let mirror = InstanceTree::new(tree, root);
        let painter = Painter::new(
            config.renderers,
            config.preference.clone(),
            config.keep_pooled_elements,
        );
        Self {
            config,
            mirror,
            painter,
            frame_index: 0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Switches the stitch policy for subsequent updates.
    pub fn set_stitch_policy(&mut self, policy: StitchPolicy) {
        self.config.stitch_policy = policy;
    }

    /// Returns the render mirror.
    #[must_use]
    pub fn mirror(&self) -> &InstanceTree<RenderRelevance> {
        &self.mirror
    }

    /// Returns the drawable pool.
    #[must_use]
    pub fn drawables(&self) -> &DrawablePool {
        &self.painter.pool
    }

    /// Returns the block store.
    #[must_use]
    pub fn blocks(&self) -> &BlockStore {
        &self.painter.blocks
    }

    /// Returns the drawable of an instance, if it has one.
    #[must_use]
    pub fn drawable_of(&self, instance: InstanceId) -> Option<DrawableId> {
        if self.mirror.is_disposed(instance) {
            return None;
        }
        self.painter.slot(instance).and_then(|s| s.drawable)
    }

    /// Returns the drawables displaying `node`, one per trail.
    #[must_use]
    pub fn drawables_of(&self, tree: &NodeTree, node: NodeId) -> Vec<DrawableId> {
        self.mirror
            .instances_of(tree, node)
            .filter_map(|i| self.drawable_of(i))
            .collect()
    }

    /// Returns the number of completed updates.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns the number of change intervals waiting for the next stitch.
    #[must_use]
    pub fn pending_intervals(&self) -> usize {
        self.painter.pending.len()
    }

    /// Runs every consistency audit.
    ///
    /// # Panics
    ///
    /// Panics if the mirror diverges from the node tree, a drawable is
    /// missing, duplicated or out of paint order, or blocks do not cover the
    /// paint order contiguously.
    pub fn audit(&self, tree: &NodeTree) {
        self.mirror.audit(tree);
        self.painter.audit(tree, &self.mirror);
        self.painter.blocks.audit(&self.painter.pool);
    }
}
