// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paintable node content.
//!
//! Content is plain data: geometry comes from `kurbo`, brushes from
//! `peniko`. A node with `Some(NodeContent)` is renderable; `None` marks a
//! pure container.

use alloc::string::String;

use kurbo::{BezPath, Size};
use peniko::Brush;

/// Stroke parameters for a shape.
#[derive(Clone, Debug)]
pub struct StrokeStyle {
    /// Brush used for the stroke.
    pub brush: Brush,
    /// Line width in local units.
    pub width: f64,
}

/// A font description.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    /// Font family name (CSS syntax).
    pub family: String,
    /// Font size in local units.
    pub size: f64,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: String::from("sans-serif"),
            size: 12.0,
        }
    }
}

/// An opaque reference to image data registered with a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageSource(pub u32);

/// Vector shape content.
#[derive(Clone, Debug, Default)]
pub struct ShapeContent {
    /// Outline in local coordinates.
    pub path: BezPath,
    /// Fill brush, if filled.
    pub fill: Option<Brush>,
    /// Stroke, if stroked.
    pub stroke: Option<StrokeStyle>,
}

/// Text content.
#[derive(Clone, Debug, Default)]
pub struct TextContent {
    /// The string to draw.
    pub text: String,
    /// Font used for layout.
    pub font: Font,
    /// Fill brush, if filled.
    pub fill: Option<Brush>,
}

/// Raster image content.
#[derive(Clone, Debug)]
pub struct ImageContent {
    /// Image data handle.
    pub source: ImageSource,
    /// Display size in local units.
    pub size: Size,
}

/// Paintable content of a node.
#[derive(Clone, Debug)]
pub enum NodeContent {
    /// A vector shape.
    Shape(ShapeContent),
    /// A run of text.
    Text(TextContent),
    /// A raster image.
    Image(ImageContent),
}

impl NodeContent {
    /// Returns the kind tag of this content.
    #[must_use]
    pub const fn kind(&self) -> ContentKind {
        match self {
            Self::Shape(_) => ContentKind::Shape,
            Self::Text(_) => ContentKind::Text,
            Self::Image(_) => ContentKind::Image,
        }
    }
}

/// The kind of a node's content, without its data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// See [`NodeContent::Shape`].
    Shape,
    /// See [`NodeContent::Text`].
    Text,
    /// See [`NodeContent::Image`].
    Image,
}

/// Accessible description of a node.
///
/// Nodes carrying this are relevant to the accessible mirror.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessibleContent {
    /// Semantic role (for example `"button"`).
    pub role: String,
    /// Human-readable label.
    pub label: String,
}
