// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph data model.
//!
//! A *node* is a vertex in a retained 2D scene graph. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: an ordered child list and a set of parents. Sharing a node
//!   between several parents is allowed (the graph is a DAG); the node is
//!   then displayed once per [`Trail`](crate::trail::Trail) reaching it.
//! - **Local properties** set by the caller: transform, opacity,
//!   [`flags`](NodeFlags), paintable [`content`](NodeContent), a
//!   [`Renderers`](crate::renderer::Renderers) mask, and an optional
//!   [`accessible`](AccessibleContent) description.
//! - Back-references to every instance displaying it
//!   ([`InstanceRef`]).
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Dirty tracking
//!
//! Mutations never touch instances or drawables directly. They only mark
//! the corresponding dirty channel (see [`dirty`](crate::dirty)), and
//! [`NodeTree::evaluate`] drains all channels once per frame into a
//! [`TreeChanges`].

mod content;
mod evaluate;
mod id;
mod store;
mod traverse;

pub use content::{
    AccessibleContent, ContentKind, Font, ImageContent, ImageSource, NodeContent, ShapeContent,
    StrokeStyle, TextContent,
};
pub use evaluate::TreeChanges;
pub use id::{INVALID, MirrorId, NodeId};
pub use store::{InstanceRef, NodeFlags, NodeTree};
pub use traverse::Children;
