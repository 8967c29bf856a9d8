// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for trellis.
//!
//! This crate realises trellis blocks with browser APIs:
//!
//! - [`WebBackend`]: a [`SurfaceBackend`] with Canvas, SVG and DOM surfaces
//!   inside a container element
//! - [`now`]: a `performance.now()` tick source for trace timestamps
//!
//! Canvas surfaces cache their 2D context state and only write properties
//! that changed. SVG and DOM surfaces keep one retained element per
//! drawable and rewrite only the attributes a paint marks dirty. A kept
//! element reused in another block moves to that block's surface.

#![no_std]

extern crate alloc;

mod attach;
mod canvas;
mod clock;
mod css;
mod surface;

pub use clock::now;
pub use surface::WebBackend;
pub use trellis_core::backend::SurfaceBackend;
