// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for surface integrations.
//!
//! Trellis splits platform-specific work into *backend* crates. A backend
//! owns physical resources of two kinds:
//!
//! - **Surfaces**: one per block. A canvas element, an SVG root, or a DOM
//!   container. Surfaces are stacked in block order with
//!   [`order_surfaces`](SurfaceBackend::order_surfaces) and positioned with
//!   [`place_surface`](SurfaceBackend::place_surface).
//! - **Elements**: one per drawable of a retained renderer (SVG, DOM). The
//!   elements of a block are (re)attached in member order with
//!   [`order_elements`](SurfaceBackend::order_elements). Immediate
//!   renderers (Canvas, WebGL) have no elements; their blocks are cleared
//!   and repainted as a whole.
//!
//! # Crate boundaries
//!
//! `trellis_core` owns the scene graph, mirrors, drawables, blocks, and this
//! contract module. Backend crates depend on `trellis_core` and provide the
//! platform glue. [`RecordingBackend`] is a headless implementation for
//! tests and tooling.
//!
//! # Errors
//!
//! Every call may fail with a [`BackendError`]. The display aborts the
//! failing block's update for the frame, reports it, and keeps its dirty
//! state so the next frame retries the work; other blocks are unaffected.

mod recording;

use alloc::string::String;

use kurbo::Affine;

use crate::drawable::DirtyAttrs;
use crate::node::NodeContent;
use crate::renderer::Renderer;

pub use recording::{BackendCall, RecordingBackend};

/// Opaque handle to a backend surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Opaque handle to a backend element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// Errors reported by a [`SurfaceBackend`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The surface handle is unknown or was destroyed.
    #[error("invalid surface {0:?}")]
    InvalidSurface(SurfaceId),
    /// The element handle is unknown or was released.
    #[error("invalid element {0:?}")]
    InvalidElement(ElementId),
    /// The backend cannot realise this renderer.
    #[error("renderer {0:?} is not supported by this backend")]
    Unsupported(Renderer),
    /// A platform call failed.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Where and how a block's surface is composited.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Transform from surface space to display space.
    pub transform: Affine,
    /// Group opacity applied to the whole surface.
    pub opacity: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            opacity: 1.0,
        }
    }
}

/// One drawable's paint request.
///
/// `dirty` names the attributes that changed since the drawable was last
/// painted; backends that keep retained elements only need to rewrite those.
/// Immediate renderers receive [`DirtyAttrs::all`] because their surface
/// was cleared.
#[derive(Clone, Copy, Debug)]
pub struct PaintCommand<'a> {
    /// Renderer of the drawable.
    pub renderer: Renderer,
    /// The drawable's element (retained renderers only).
    pub element: Option<ElementId>,
    /// Current content of the drawable's node.
    pub content: &'a NodeContent,
    /// Attributes to (re)write.
    pub dirty: DirtyAttrs,
    /// Transform from node space to surface space.
    pub transform: Affine,
    /// Opacity relative to the surface.
    pub opacity: f64,
    /// Whether the drawable is visible.
    pub visible: bool,
}

/// A physical rendering backend.
pub trait SurfaceBackend {
    /// Creates a surface for blocks of `renderer`.
    fn create_surface(&mut self, renderer: Renderer) -> Result<SurfaceId, BackendError>;

    /// Detaches and destroys a surface.
    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError>;

    /// Stacks surfaces bottom to top in the given order.
    fn order_surfaces(&mut self, surfaces: &[SurfaceId]) -> Result<(), BackendError>;

    /// Positions a surface.
    fn place_surface(&mut self, surface: SurfaceId, placement: &Placement)
    -> Result<(), BackendError>;

    /// Creates a detached element for a retained renderer.
    fn create_element(&mut self, renderer: Renderer) -> Result<ElementId, BackendError>;

    /// Releases an element that is no longer attached anywhere.
    fn release_element(&mut self, element: ElementId) -> Result<(), BackendError>;

    /// Makes `elements` the exact children of `surface`, in order.
    ///
    /// An element still attached to another surface moves here, and that
    /// surface no longer counts it as a child. Former children missing from
    /// `elements` are detached.
    fn order_elements(
        &mut self,
        surface: SurfaceId,
        elements: &[ElementId],
    ) -> Result<(), BackendError>;

    /// Clears an immediate-mode surface before a full repaint.
    fn clear_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError>;

    /// Paints (or rewrites the element of) one drawable.
    fn paint(&mut self, surface: SurfaceId, command: &PaintCommand<'_>) -> Result<(), BackendError>;
}
