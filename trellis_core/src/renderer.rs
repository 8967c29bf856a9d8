// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderer identities and selection masks.
//!
//! Every node carries a [`Renderers`] mask naming the backends able to draw
//! its content. A display combines that mask with its own enabled mask and a
//! preference order to pick exactly one [`Renderer`] per renderable
//! instance.

use bitflags::bitflags;

bitflags! {
    /// A set of renderers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Renderers: u8 {
        /// Immediate-mode 2D canvas.
        const CANVAS = 0b0001;
        /// Retained SVG elements.
        const SVG    = 0b0010;
        /// Retained HTML elements, one per block.
        const DOM    = 0b0100;
        /// Immediate-mode WebGL.
        const WEBGL  = 0b1000;
    }
}

impl Default for Renderers {
    fn default() -> Self {
        Self::CANVAS | Self::SVG
    }
}

/// A single renderer backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Renderer {
    /// See [`Renderers::CANVAS`].
    Canvas,
    /// See [`Renderers::SVG`].
    Svg,
    /// See [`Renderers::DOM`].
    Dom,
    /// See [`Renderers::WEBGL`].
    WebGl,
}

impl Renderer {
    /// All renderers in declaration order.
    pub const ALL: [Self; 4] = [Self::Canvas, Self::Svg, Self::Dom, Self::WebGl];

    /// Returns a dense index in `0..4`.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Canvas => 0,
            Self::Svg => 1,
            Self::Dom => 2,
            Self::WebGl => 3,
        }
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Canvas),
            1 => Some(Self::Svg),
            2 => Some(Self::Dom),
            3 => Some(Self::WebGl),
            _ => None,
        }
    }

    /// Returns the single-bit mask for this renderer.
    #[must_use]
    pub const fn mask(self) -> Renderers {
        match self {
            Self::Canvas => Renderers::CANVAS,
            Self::Svg => Renderers::SVG,
            Self::Dom => Renderers::DOM,
            Self::WebGl => Renderers::WEBGL,
        }
    }

    /// Whether drawables keep a persistent backend element.
    ///
    /// Retained renderers reorder elements when block membership changes;
    /// immediate renderers repaint the whole surface instead.
    #[must_use]
    pub const fn is_retained(self) -> bool {
        matches!(self, Self::Svg | Self::Dom)
    }

    /// Whether a block of this renderer holds exactly one drawable.
    #[must_use]
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::Dom)
    }

    /// Picks the first renderer in `preference` allowed by both masks.
    #[must_use]
    pub fn select(node: Renderers, enabled: Renderers, preference: &[Self]) -> Option<Self> {
        let allowed = node & enabled;
        preference
            .iter()
            .copied()
            .find(|r| allowed.contains(r.mask()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_follows_preference() {
        let pref = [Renderer::Svg, Renderer::Canvas];
        assert_eq!(
            Renderer::select(Renderers::all(), Renderers::all(), &pref),
            Some(Renderer::Svg)
        );
        assert_eq!(
            Renderer::select(Renderers::CANVAS, Renderers::all(), &pref),
            Some(Renderer::Canvas)
        );
    }

    #[test]
    fn select_respects_enabled_mask() {
        let pref = [Renderer::Svg, Renderer::Canvas];
        assert_eq!(
            Renderer::select(Renderers::all(), Renderers::CANVAS, &pref),
            Some(Renderer::Canvas)
        );
        assert_eq!(
            Renderer::select(Renderers::DOM, Renderers::CANVAS, &pref),
            None
        );
    }

    #[test]
    fn index_round_trips() {
        for r in Renderer::ALL {
            assert_eq!(Renderer::from_index(r.index() as u8), Some(r));
        }
        assert_eq!(Renderer::from_index(9), None);
    }
}
