// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! String encodings shared by the SVG, DOM and Canvas paths.

use alloc::format;
use alloc::string::String;
use core::fmt::Write as _;

use kurbo::{Affine, BezPath, PathEl};
use peniko::Brush;
use trellis_core::node::Font;

/// Formats an affine transform as a CSS/SVG `matrix()` value.
pub(crate) fn css_matrix(xf: Affine) -> String {
    let [a, b, c, d, e, f] = xf.as_coeffs();
    format!("matrix({a},{b},{c},{d},{e},{f})")
}

/// Formats a brush as a CSS color.
///
/// Only solid brushes have a CSS color; gradients and image brushes yield
/// `None` and are left unpainted.
pub(crate) fn brush_css(brush: &Brush) -> Option<String> {
    match brush {
        Brush::Solid(color) => {
            let c = color.to_rgba8();
            let alpha = f64::from(c.a) / 255.0;
            Some(format!("rgba({},{},{},{alpha})", c.r, c.g, c.b))
        }
        _ => None,
    }
}

/// Formats a font as a CSS `font` shorthand.
pub(crate) fn font_css(font: &Font) -> String {
    format!("{}px {}", font.size, font.family)
}

/// Encodes a path as SVG path data, also accepted by `Path2D`.
pub(crate) fn svg_path_data(path: &BezPath) -> String {
    let mut out = String::new();
    for el in path.elements() {
        // Writing to a String cannot fail.
        let _ = match *el {
            PathEl::MoveTo(p) => write!(out, "M{},{}", p.x, p.y),
            PathEl::LineTo(p) => write!(out, "L{},{}", p.x, p.y),
            PathEl::QuadTo(p1, p2) => write!(out, "Q{},{} {},{}", p1.x, p1.y, p2.x, p2.y),
            PathEl::CurveTo(p1, p2, p3) => write!(
                out,
                "C{},{} {},{} {},{}",
                p1.x, p1.y, p2.x, p2.y, p3.x, p3.y
            ),
            PathEl::ClosePath => write!(out, "Z"),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Rect, Shape};
    use peniko::Color;

    #[test]
    fn matrix_lists_coefficients_in_css_order() {
        let xf = Affine::translate((10.0, 20.0)) * Affine::scale(2.0);
        assert_eq!(css_matrix(xf), "matrix(2,0,0,2,10,20)", "a b c d e f");
        assert_eq!(css_matrix(Affine::IDENTITY), "matrix(1,0,0,1,0,0)", "identity");
    }

    #[test]
    fn solid_brush_is_rgba() {
        let brush = Brush::Solid(Color::from_rgba8(255, 0, 0, 255));
        assert_eq!(brush_css(&brush).as_deref(), Some("rgba(255,0,0,1)"), "opaque red");
        let clear = Brush::Solid(Color::from_rgba8(0, 0, 0, 0));
        assert_eq!(brush_css(&clear).as_deref(), Some("rgba(0,0,0,0)"), "transparent");
    }

    #[test]
    fn font_is_size_then_family() {
        let font = Font {
            family: String::from("serif"),
            size: 14.5,
        };
        assert_eq!(font_css(&font), "14.5px serif", "shorthand order");
    }

    #[test]
    fn rect_path_data() {
        let path = Rect::new(0.0, 0.0, 10.0, 5.0).to_path(0.1);
        assert_eq!(
            svg_path_data(&path),
            "M0,0L10,0L10,5L0,5Z",
            "rect outline"
        );
    }

    #[test]
    fn curves_use_absolute_commands() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.quad_to((1.0, 2.0), (3.0, 4.0));
        path.curve_to((5.0, 6.0), (7.0, 8.0), (9.0, 10.0));
        assert_eq!(
            svg_path_data(&path),
            "M0,0Q1,2 3,4C5,6 7,8 9,10",
            "quad then cubic"
        );
    }
}
