// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace clock backed by `performance.now()`.

use wasm_bindgen::prelude::*;

// Direct global binding instead of `web_sys::Window` methods, so the clock
// needs no Window/Performance lookups per call.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    fn performance_now() -> f64;
}

/// Returns microseconds since page load.
///
/// Suitable as [`DisplayConfig::clock`](trellis_core::display::DisplayConfig::clock);
/// pass `1.0` as ticks per microsecond when exporting traces.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "performance.now() returns small positive f64; µs fits in u64"
)]
pub fn now() -> u64 {
    (performance_now() * 1000.0) as u64
}
