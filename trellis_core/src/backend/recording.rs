// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless backend that records every call.

use alloc::vec::Vec;

use super::{BackendError, ElementId, PaintCommand, Placement, SurfaceBackend, SurfaceId};
use crate::drawable::DirtyAttrs;
use crate::node::ContentKind;
use crate::renderer::Renderer;

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// [`SurfaceBackend::create_surface`].
    CreateSurface(SurfaceId, Renderer),
    /// [`SurfaceBackend::destroy_surface`].
    DestroySurface(SurfaceId),
    /// [`SurfaceBackend::order_surfaces`].
    OrderSurfaces(Vec<SurfaceId>),
    /// [`SurfaceBackend::place_surface`].
    PlaceSurface(SurfaceId, Placement),
    /// [`SurfaceBackend::create_element`].
    CreateElement(ElementId, Renderer),
    /// [`SurfaceBackend::release_element`].
    ReleaseElement(ElementId),
    /// [`SurfaceBackend::order_elements`].
    OrderElements(SurfaceId, Vec<ElementId>),
    /// [`SurfaceBackend::clear_surface`].
    ClearSurface(SurfaceId),
    /// [`SurfaceBackend::paint`].
    Paint {
        /// Target surface.
        surface: SurfaceId,
        /// Element painted, if retained.
        element: Option<ElementId>,
        /// Content kind painted.
        kind: ContentKind,
        /// Attributes written.
        dirty: DirtyAttrs,
        /// Visibility written.
        visible: bool,
    },
}

/// A [`SurfaceBackend`] that allocates sequential handles and logs calls.
///
/// Element ownership follows retained-mode attachment: an element is the
/// child of at most one surface, the one that listed it last in
/// [`order_elements`](SurfaceBackend::order_elements).
///
/// Failures can be injected per surface with
/// [`fail_surface`](Self::fail_surface), or for every surface creation with
/// [`fail_creation`](Self::fail_creation).
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// Every call, in order.
    pub calls: Vec<BackendCall>,
    live_surfaces: Vec<SurfaceId>,
    live_elements: Vec<ElementId>,
    children: Vec<(SurfaceId, Vec<ElementId>)>,
    next_surface: u32,
    next_element: u32,
    failing: Vec<SurfaceId>,
    fail_creation: bool,
}

impl RecordingBackend {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call touching `surface` fail.
    pub fn fail_surface(&mut self, surface: SurfaceId) {
        self.failing.push(surface);
    }

    /// Makes surface creation fail (or succeed again).
    pub fn fail_creation(&mut self, fail: bool) {
        self.fail_creation = fail;
    }

    /// Clears injected failures.
    pub fn heal(&mut self) {
        self.failing.clear();
        self.fail_creation = false;
    }

    /// Returns the surfaces currently alive.
    #[must_use]
    pub fn live_surfaces(&self) -> &[SurfaceId] {
        &self.live_surfaces
    }

    /// Returns the elements currently alive.
    #[must_use]
    pub fn live_elements(&self) -> &[ElementId] {
        &self.live_elements
    }

    /// Returns the elements attached to `surface`, in order.
    #[must_use]
    pub fn children(&self, surface: SurfaceId) -> &[ElementId] {
        self.children
            .iter()
            .find(|(s, _)| *s == surface)
            .map(|(_, c)| c.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the surface `element` is attached to.
    #[must_use]
    pub fn owner(&self, element: ElementId) -> Option<SurfaceId> {
        self.children
            .iter()
            .find(|(_, c)| c.contains(&element))
            .map(|(s, _)| *s)
    }

    /// Returns and clears the call log.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        core::mem::take(&mut self.calls)
    }

    /// Counts recorded paint calls.
    #[must_use]
    pub fn paint_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Paint { .. }))
            .count()
    }

    fn check(&self, surface: SurfaceId) -> Result<(), BackendError> {
        if self.failing.contains(&surface) || !self.live_surfaces.contains(&surface) {
            Err(BackendError::InvalidSurface(surface))
        } else {
            Ok(())
        }
    }
}

impl SurfaceBackend for RecordingBackend {
    fn create_surface(&mut self, renderer: Renderer) -> Result<SurfaceId, BackendError> {
        if self.fail_creation {
            return Err(BackendError::Unsupported(renderer));
        }
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.live_surfaces.push(id);
        self.calls.push(BackendCall::CreateSurface(id, renderer));
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        self.check(surface)?;
        self.live_surfaces.retain(|&s| s != surface);
        self.children.retain(|(s, _)| *s != surface);
        self.calls.push(BackendCall::DestroySurface(surface));
        Ok(())
    }

    fn order_surfaces(&mut self, surfaces: &[SurfaceId]) -> Result<(), BackendError> {
        for &s in surfaces {
            self.check(s)?;
        }
        self.calls.push(BackendCall::OrderSurfaces(surfaces.to_vec()));
        Ok(())
    }

    fn place_surface(
        &mut self,
        surface: SurfaceId,
        placement: &Placement,
    ) -> Result<(), BackendError> {
        self.check(surface)?;
        self.calls
            .push(BackendCall::PlaceSurface(surface, *placement));
        Ok(())
    }

    fn create_element(&mut self, renderer: Renderer) -> Result<ElementId, BackendError> {
        let id = ElementId(self.next_element);
        self.next_element += 1;
        self.live_elements.push(id);
        self.calls.push(BackendCall::CreateElement(id, renderer));
        Ok(id)
    }

    fn release_element(&mut self, element: ElementId) -> Result<(), BackendError> {
        if !self.live_elements.contains(&element) {
            return Err(BackendError::InvalidElement(element));
        }
        self.live_elements.retain(|&e| e != element);
        for (_, c) in &mut self.children {
            c.retain(|&e| e != element);
        }
        self.calls.push(BackendCall::ReleaseElement(element));
        Ok(())
    }

    fn order_elements(
        &mut self,
        surface: SurfaceId,
        elements: &[ElementId],
    ) -> Result<(), BackendError> {
        self.check(surface)?;
        if let Some(&e) = elements.iter().find(|&&e| !self.live_elements.contains(&e)) {
            return Err(BackendError::InvalidElement(e));
        }
        for (s, c) in &mut self.children {
            if *s != surface {
                c.retain(|e| !elements.contains(e));
            }
        }
        match self.children.iter_mut().find(|(s, _)| *s == surface) {
            Some((_, c)) => *c = elements.to_vec(),
            None => self.children.push((surface, elements.to_vec())),
        }
        self.calls
            .push(BackendCall::OrderElements(surface, elements.to_vec()));
        Ok(())
    }

    fn clear_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        self.check(surface)?;
        self.calls.push(BackendCall::ClearSurface(surface));
        Ok(())
    }

    fn paint(&mut self, surface: SurfaceId, command: &PaintCommand<'_>) -> Result<(), BackendError> {
        self.check(surface)?;
        self.calls.push(BackendCall::Paint {
            surface,
            element: command.element,
            kind: command.content.kind(),
            dirty: command.dirty,
            visible: command.visible,
        });
        Ok(())
    }
}
