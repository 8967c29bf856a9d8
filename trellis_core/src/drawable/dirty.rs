// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute-level dirty bits.

use bitflags::bitflags;

bitflags! {
    /// Attributes of a drawable that changed since its last paint.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyAttrs: u16 {
        /// Shape outline.
        const SHAPE      = 1 << 0;
        /// Fill brush.
        const FILL       = 1 << 1;
        /// Stroke brush or width.
        const STROKE     = 1 << 2;
        /// Text string.
        const TEXT       = 1 << 3;
        /// Font.
        const FONT       = 1 << 4;
        /// Image source or size.
        const IMAGE      = 1 << 5;
        /// Transform relative to the block.
        const TRANSFORM  = 1 << 6;
        /// Opacity relative to the block.
        const OPACITY    = 1 << 7;
        /// Effective visibility.
        const VISIBILITY = 1 << 8;
    }
}
