// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-renderer paint state of one instance.
//!
//! A [`Drawable`] belongs to exactly one instance and one renderer. It
//! accumulates dirty attributes between frames and writes them to the
//! backend in a single [`update`](Paintable::update). Drawables live in a
//! [`DrawablePool`]; the pool is the only way to obtain one, and a slot
//! handed out again is fully reinitialised.
//!
//! # Lifecycle
//!
//! ```text
//!   Uninitialized ──► Initialized ──► Dirty ◄──► Clean
//!                                       │          │
//!                                       └────┬─────┘
//!                                            ▼
//!                                        Disposed ──► (pool) ──► Initialized
//! ```
//!
//! Behaviour is split into small capability traits instead of a type
//! hierarchy: [`Paintable`] (dirty bits and update), [`HasTransform`]
//! (transform invalidation), and [`Poolable`] (pool bookkeeping). Content
//! variants are the data tag [`DrawableKind`].

mod dirty;
mod pool;

use core::fmt;

use kurbo::Affine;

pub use dirty::DirtyAttrs;
pub use pool::{DrawablePool, PaintOrder};

use crate::backend::{BackendError, ElementId, PaintCommand, SurfaceBackend, SurfaceId};
use crate::block::{BlockId, BlockKey};
use crate::instance::InstanceId;
use crate::node::{ContentKind, NodeContent, NodeId};
use crate::renderer::Renderer;

/// A handle to a drawable in a [`DrawablePool`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl DrawableId {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DrawableId({}@gen{})", self.idx, self.generation)
    }
}

/// Lifecycle state of a drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawableState {
    /// Freshly allocated slot, not yet bound to an instance.
    Uninitialized,
    /// Bound to an instance, nothing marked yet.
    Initialized,
    /// Has attribute changes waiting for [`Paintable::update`].
    Dirty,
    /// Backend state matches the drawable.
    Clean,
    /// Returned to the pool.
    Disposed,
}

/// Which content variant a drawable paints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawableKind {
    /// Vector shape.
    Shape,
    /// Text run.
    Text,
    /// Raster image.
    Image,
}

impl From<ContentKind> for DrawableKind {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Shape => Self::Shape,
            ContentKind::Text => Self::Text,
            ContentKind::Image => Self::Image,
        }
    }
}

impl DrawableKind {
    /// Attributes that describe this kind's content.
    #[must_use]
    pub const fn content_attrs(self) -> DirtyAttrs {
        match self {
            Self::Shape => DirtyAttrs::SHAPE.union(DirtyAttrs::FILL).union(DirtyAttrs::STROKE),
            Self::Text => DirtyAttrs::TEXT.union(DirtyAttrs::FONT).union(DirtyAttrs::FILL),
            Self::Image => DirtyAttrs::IMAGE,
        }
    }
}

/// Inputs for one [`Paintable::update`].
#[derive(Clone, Copy, Debug)]
pub struct PaintFrame<'a> {
    /// Surface of the drawable's block.
    pub surface: SurfaceId,
    /// Current content of the drawable's node.
    pub content: &'a NodeContent,
    /// Transform from node space to surface space.
    pub transform: Affine,
    /// Opacity relative to the surface.
    pub opacity: f64,
    /// Effective visibility.
    pub visible: bool,
    /// Repaint every attribute regardless of dirty bits.
    pub full: bool,
}

/// Dirty tracking and painting.
pub trait Paintable {
    /// Records changed attributes. Marks on a disposed drawable are dropped.
    fn mark_dirty(&mut self, attrs: DirtyAttrs);

    /// Returns the attributes changed since the last update.
    fn dirty_attrs(&self) -> DirtyAttrs;

    /// Returns whether an update is pending.
    fn is_dirty(&self) -> bool;

    /// Writes pending attributes to the backend and clears all dirty state.
    ///
    /// Returns `Ok(false)` without touching the backend when nothing is
    /// pending. On error the dirty state is kept, so nothing accumulated is
    /// lost.
    fn update(
        &mut self,
        backend: &mut dyn SurfaceBackend,
        frame: &PaintFrame<'_>,
    ) -> Result<bool, BackendError>;
}

/// Transform invalidation.
pub trait HasTransform {
    /// Records that the transform relative to the block changed.
    fn mark_dirty_transform(&mut self);

    /// Returns whether a transform write is pending.
    fn transform_dirty(&self) -> bool;
}

/// Pool bookkeeping.
pub trait Poolable {
    /// Returns whether the object sits in its pool's free list.
    fn is_pooled(&self) -> bool;
}

/// Backend paint state for one instance under one renderer.
///
/// Only [`DrawablePool::allocate`] can create drawables.
#[derive(Debug)]
pub struct Drawable {
    state: DrawableState,
    renderer: Renderer,
    kind: DrawableKind,
    key: Option<BlockKey>,
    instance: Option<InstanceId>,
    node: Option<NodeId>,
    block: Option<BlockId>,
    prev: Option<DrawableId>,
    next: Option<DrawableId>,
    dirty: bool,
    attrs: DirtyAttrs,
    element: Option<ElementId>,
}

impl Drawable {
    const fn vacant(renderer: Renderer) -> Self {
        Self {
            state: DrawableState::Uninitialized,
            renderer,
            kind: DrawableKind::Shape,
            key: None,
            instance: None,
            node: None,
            block: None,
            prev: None,
            next: None,
            dirty: false,
            attrs: DirtyAttrs::empty(),
            element: None,
        }
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> DrawableState {
        self.state
    }

    /// Returns the renderer.
    #[must_use]
    pub fn renderer(&self) -> Renderer {
        self.renderer
    }

    /// Returns the content kind.
    #[must_use]
    pub fn kind(&self) -> DrawableKind {
        self.kind
    }

    /// Returns the block grouping key (`None` once disposed).
    #[must_use]
    pub fn key(&self) -> Option<BlockKey> {
        self.key
    }

    /// Returns the owning instance (`None` once disposed).
    #[must_use]
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// Returns the node being drawn (`None` once disposed).
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Returns the containing block, if assigned.
    #[must_use]
    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    /// Returns the backend element, if any.
    #[must_use]
    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// Returns the previous drawable in paint order.
    #[must_use]
    pub fn prev(&self) -> Option<DrawableId> {
        self.prev
    }

    /// Returns the next drawable in paint order.
    #[must_use]
    pub fn next(&self) -> Option<DrawableId> {
        self.next
    }

    pub(crate) fn set_block(&mut self, block: Option<BlockId>) {
        self.block = block;
    }

    /// Marks the shape outline dirty.
    pub fn mark_dirty_shape(&mut self) {
        self.mark_dirty(DirtyAttrs::SHAPE);
    }

    /// Marks the fill dirty.
    pub fn mark_dirty_fill(&mut self) {
        self.mark_dirty(DirtyAttrs::FILL);
    }

    /// Marks the stroke dirty.
    pub fn mark_dirty_stroke(&mut self) {
        self.mark_dirty(DirtyAttrs::STROKE);
    }

    /// Marks the text dirty.
    pub fn mark_dirty_text(&mut self) {
        self.mark_dirty(DirtyAttrs::TEXT);
    }

    /// Marks the font dirty.
    pub fn mark_dirty_font(&mut self) {
        self.mark_dirty(DirtyAttrs::FONT);
    }

    /// Marks the image dirty.
    pub fn mark_dirty_image(&mut self) {
        self.mark_dirty(DirtyAttrs::IMAGE);
    }

    /// Marks the opacity dirty.
    pub fn mark_dirty_opacity(&mut self) {
        self.mark_dirty(DirtyAttrs::OPACITY);
    }

    /// Marks the visibility dirty.
    pub fn mark_dirty_visibility(&mut self) {
        self.mark_dirty(DirtyAttrs::VISIBILITY);
    }
}

impl Paintable for Drawable {
    fn mark_dirty(&mut self, attrs: DirtyAttrs) {
        if matches!(
            self.state,
            DrawableState::Disposed | DrawableState::Uninitialized
        ) {
            return;
        }
        self.dirty = true;
        self.attrs |= attrs;
        self.state = DrawableState::Dirty;
    }

    fn dirty_attrs(&self) -> DirtyAttrs {
        self.attrs
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn update(
        &mut self,
        backend: &mut dyn SurfaceBackend,
        frame: &PaintFrame<'_>,
    ) -> Result<bool, BackendError> {
        assert!(
            self.state != DrawableState::Disposed,
            "update on disposed drawable"
        );
        if !self.dirty && !frame.full {
            return Ok(false);
        }
        if self.renderer.is_retained() && self.element.is_none() {
            self.element = Some(backend.create_element(self.renderer)?);
        }
        let dirty = if frame.full {
            DirtyAttrs::all()
        } else {
            self.attrs
        };
        backend.paint(
            frame.surface,
            &PaintCommand {
                renderer: self.renderer,
                element: self.element,
                content: frame.content,
                dirty,
                transform: frame.transform,
                opacity: frame.opacity,
                visible: frame.visible,
            },
        )?;
        self.dirty = false;
        self.attrs = DirtyAttrs::empty();
        self.state = DrawableState::Clean;
        Ok(true)
    }
}

impl HasTransform for Drawable {
    fn mark_dirty_transform(&mut self) {
        self.mark_dirty(DirtyAttrs::TRANSFORM);
    }

    fn transform_dirty(&self) -> bool {
        self.attrs.contains(DirtyAttrs::TRANSFORM)
    }
}

impl Poolable for Drawable {
    fn is_pooled(&self) -> bool {
        self.state == DrawableState::Disposed
    }
}
