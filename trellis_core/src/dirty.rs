// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Trellis uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! record node mutations between frames. Each channel represents an
//! independent category of change, and every category is drained exactly
//! once per frame by [`NodeTree::evaluate`](crate::node::NodeTree::evaluate).
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`TRANSFORM`] and [`OPACITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and have dependency
//!   edges from every child to every one of its parents. Marking a node
//!   marks all of its descendants through every path, because relative
//!   transforms, opacities, and visibility are inherited. Hidden-flag
//!   changes are routed through [`TRANSFORM`].
//!
//! - **Paint attributes**: [`SHAPE`], [`FILL`], [`STROKE`], [`TEXT`],
//!   [`FONT`], and [`IMAGE`] are local. Only the mutated node is reported,
//!   and each maps to exactly one drawable `mark_dirty_*` entry point.
//!
//! - **Structural**: [`TOPOLOGY`] marks the *parent* whose child list
//!   changed. [`RELEVANCE`] and [`ACCESSIBLE`] mark a node whose
//!   participation in the render or accessible mirror may have flipped.
//!   [`KIND`] marks a node whose drawables must be replaced (content kind
//!   or renderer mask changed).

use understory_dirty::Channel;

/// Local transform or hidden flag changed; propagates to descendants.
pub const TRANSFORM: Channel = Channel::new(0);

/// Opacity changed; propagates to descendants.
pub const OPACITY: Channel = Channel::new(1);

/// Shape outline changed.
pub const SHAPE: Channel = Channel::new(2);

/// Fill brush changed.
pub const FILL: Channel = Channel::new(3);

/// Stroke changed.
pub const STROKE: Channel = Channel::new(4);

/// Text string changed.
pub const TEXT: Channel = Channel::new(5);

/// Font changed.
pub const FONT: Channel = Channel::new(6);

/// Image source or size changed.
pub const IMAGE: Channel = Channel::new(7);

/// Child list of the marked node changed.
pub const TOPOLOGY: Channel = Channel::new(8);

/// Render relevance inputs changed (content presence, split/isolate flags).
pub const RELEVANCE: Channel = Channel::new(9);

/// Accessible content presence changed.
pub const ACCESSIBLE: Channel = Channel::new(10);

/// Content kind or renderer mask changed; drawables must be replaced.
pub const KIND: Channel = Channel::new(11);
