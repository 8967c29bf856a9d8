// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph, instance mirrors, drawables and block stitching for
//! retained-mode 2D rendering.
//!
//! `trellis_core` keeps a mutable node tree and renders it incrementally to
//! backend surfaces. It is `no_std` compatible (with `alloc`) and stores
//! nodes, instances, drawables and blocks in arenas addressed by
//! generational handles.
//!
//! # Architecture
//!
//! ```text
//!   NodeTree setters ──► dirty channels
//!                            │
//!                            ▼
//!   NodeTree::evaluate() ──► TreeChanges ──┬──► Display::update() ──► SurfaceBackend
//!                                          │
//!                                          └──► AccessibleMirror::sync()
//! ```
//!
//! **[`node`]**: Struct-of-arrays node tree. A node may have several
//! parents; every root-to-node path is a [`Trail`](trail::Trail). Setters
//! mark dirty channels; [`NodeTree::evaluate`](node::NodeTree::evaluate)
//! drains them.
//!
//! **[`dirty`]**: Channel assignments on top of `understory_dirty`.
//! TRANSFORM (which also carries visibility) and OPACITY propagate to
//! descendants; the rest are local.
//!
//! **[`instance`]**: The relevance mirror: an instance per displayed trail,
//! generic over the predicate choosing which nodes get one.
//!
//! **[`drawable`]**: Pooled backend paint state, one per renderable
//! instance, with per-attribute dirty bits.
//!
//! **[`block`]**: Contiguous runs of compatible drawables sharing one
//! backend surface.
//!
//! **[`stitch`]**: Repairs block assignment inside paint-order change
//! intervals.
//!
//! **[`display`]**: Drives the above once per frame.
//!
//! **[`a11y`]**: The accessible mirror.
//!
//! **[`backend`]**: The [`SurfaceBackend`](backend::SurfaceBackend) trait
//! and a recording implementation for tests.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! update instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-drawable
//!   change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod a11y;
pub mod backend;
pub mod block;
pub mod dirty;
pub mod display;
pub mod drawable;
pub mod instance;
pub mod node;
pub mod renderer;
pub mod stitch;
pub mod trace;
pub mod trail;
