// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas 2D context state cache.
//!
//! Setting context properties crosses the JS boundary and, for styles,
//! reparses a CSS string. [`CanvasState`] remembers the last value written
//! for each property so a paint only touches the ones that differ.

use alloc::string::String;

/// Last-written values of the 2D context properties trellis uses.
///
/// Every method returns whether the context must be updated, recording
/// the new value when it does.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CanvasState {
    fill_style: Option<String>,
    stroke_style: Option<String>,
    line_width: Option<f64>,
    global_alpha: Option<f64>,
    transform: Option<[f64; 6]>,
    font: Option<String>,
}

fn replace_str(slot: &mut Option<String>, value: &str) -> bool {
    if slot.as_deref() == Some(value) {
        return false;
    }
    *slot = Some(String::from(value));
    true
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

impl CanvasState {
    pub(crate) fn fill_style(&mut self, style: &str) -> bool {
        replace_str(&mut self.fill_style, style)
    }

    pub(crate) fn stroke_style(&mut self, style: &str) -> bool {
        replace_str(&mut self.stroke_style, style)
    }

    pub(crate) fn line_width(&mut self, width: f64) -> bool {
        replace(&mut self.line_width, width)
    }

    pub(crate) fn global_alpha(&mut self, alpha: f64) -> bool {
        replace(&mut self.global_alpha, alpha)
    }

    pub(crate) fn transform(&mut self, coeffs: [f64; 6]) -> bool {
        replace(&mut self.transform, coeffs)
    }

    pub(crate) fn font(&mut self, font: &str) -> bool {
        replace_str(&mut self.font, font)
    }
}
