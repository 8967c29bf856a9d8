// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocks: contiguous same-backend runs of drawables.
//!
//! A [`Block`] is realised as exactly one backend surface. Its members are a
//! contiguous slice of the global paint order, and concatenating the
//! members of every block in block order reproduces that paint order.
//!
//! Drawables are grouped by [`BlockKey`]: the renderer plus the nearest
//! transform root and filter root instances above the drawable. The deeper
//! of the two roots is the block's *anchor*; the surface is placed with the
//! anchor's world transform so members only carry transforms relative to
//! it.
//!
//! Retained renderers (SVG, DOM) reorder their elements once per update
//! after a membership change. Immediate renderers (Canvas, WebGL) clear and
//! repaint the whole surface when any member is dirty. DOM blocks hold
//! exactly one drawable.

mod store;

use alloc::vec::Vec;
use core::fmt;

pub use store::BlockStore;

use crate::backend::{Placement, SurfaceId};
use crate::drawable::DrawableId;
use crate::instance::InstanceId;
use crate::renderer::Renderer;

/// Grouping key of a drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockKey {
    /// Renderer of the drawable.
    pub renderer: Renderer,
    /// Nearest ancestor-or-self instance whose node splits layers.
    pub transform_root: Option<InstanceId>,
    /// Nearest ancestor-or-self instance whose node isolates a group.
    pub filter_root: Option<InstanceId>,
}

/// A handle to a block in a [`BlockStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl BlockId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({}@gen{})", self.idx, self.generation)
    }
}

/// One backend surface and the drawables painted into it.
#[derive(Debug)]
pub struct Block {
    key: BlockKey,
    members: Vec<DrawableId>,
    surface: Option<SurfaceId>,
    placement: Option<Placement>,
    dirty_group_order: bool,
    dirty_placement: bool,
    full_repaint: bool,
    queued: bool,
    live: bool,
}

impl Block {
    fn new(key: BlockKey) -> Self {
        Self {
            key,
            members: Vec::new(),
            surface: None,
            placement: None,
            dirty_group_order: false,
            dirty_placement: true,
            full_repaint: true,
            queued: false,
            live: true,
        }
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> Renderer {
        self.key.renderer
    }

    /// Returns the grouping key.
    #[must_use]
    pub fn key(&self) -> BlockKey {
        self.key
    }

    /// Returns the members in paint order.
    #[must_use]
    pub fn members(&self) -> &[DrawableId] {
        &self.members
    }

    /// Returns the backend surface, once created.
    #[must_use]
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    /// Returns the placement last written to the surface.
    #[must_use]
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// Returns whether the element order must be rewritten.
    #[must_use]
    pub fn dirty_group_order(&self) -> bool {
        self.dirty_group_order
    }

    /// Returns whether the surface placement must be rewritten.
    #[must_use]
    pub fn dirty_placement(&self) -> bool {
        self.dirty_placement
    }

    /// Returns whether an immediate surface must be repainted in full.
    #[must_use]
    pub fn full_repaint(&self) -> bool {
        self.full_repaint
    }

    /// Returns whether the block waits in the update queue.
    #[must_use]
    pub fn is_queued(&self) -> bool {
        self.queued
    }

    pub(crate) fn set_surface(&mut self, surface: SurfaceId) {
        self.surface = Some(surface);
    }

    pub(crate) fn set_placement(&mut self, placement: Placement) {
        self.placement = Some(placement);
        self.dirty_placement = false;
    }

    pub(crate) fn clear_group_order(&mut self) {
        self.dirty_group_order = false;
    }

    pub(crate) fn clear_full_repaint(&mut self) {
        self.full_repaint = false;
    }
}
