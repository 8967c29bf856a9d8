// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser surfaces and elements.
//!
//! [`WebBackend`] realises trellis blocks as absolutely positioned children
//! of a container element:
//!
//! - Canvas blocks get a `<canvas>` painted through a cached 2D context.
//! - SVG blocks get an `<svg>` root; each drawable is a `<g>` holding one
//!   `<path>`, `<text>` or `<image>`.
//! - DOM blocks get a `<div>`; each drawable is a positioned `<div>` holding
//!   an inline `<svg>`, a `<span>` or an `<img>`.
//!
//! WebGL is not provided and reports [`BackendError::Unsupported`].

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::Size;
use trellis_core::backend::{
    BackendError, ElementId, PaintCommand, Placement, SurfaceBackend, SurfaceId,
};
use trellis_core::drawable::DirtyAttrs;
use trellis_core::node::{ContentKind, ImageContent, ImageSource, NodeContent, ShapeContent};
use trellis_core::renderer::Renderer;
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, Path2d, SvgElement,
};

use crate::attach::Attachments;
use crate::canvas::CanvasState;
use crate::css::{brush_css, css_matrix, font_css, svg_path_data};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

fn platform(err: JsValue) -> BackendError {
    BackendError::Platform(format!("{err:?}"))
}

fn cast_error(what: &str) -> BackendError {
    BackendError::Platform(format!("element is not a {what}"))
}

/// Sets an inline style property on an HTML or SVG element.
fn set_style(el: &Element, property: &str, value: &str) -> Result<(), BackendError> {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        html.style().set_property(property, value).map_err(platform)
    } else if let Some(svg) = el.dyn_ref::<SvgElement>() {
        svg.style().set_property(property, value).map_err(platform)
    } else {
        Err(cast_error("styled element"))
    }
}

fn set_attr(el: &Element, name: &str, value: &str) -> Result<(), BackendError> {
    el.set_attribute(name, value).map_err(platform)
}

/// Positions an element at the container origin with a top-left transform
/// origin.
fn absolute(el: &Element) -> Result<(), BackendError> {
    set_style(el, "position", "absolute")?;
    set_style(el, "left", "0")?;
    set_style(el, "top", "0")?;
    set_style(el, "transform-origin", "0 0")
}

enum SurfaceKind {
    Canvas {
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
        state: CanvasState,
    },
    Svg {
        root: Element,
    },
    Dom {
        root: HtmlElement,
    },
}

struct WebSurface {
    kind: SurfaceKind,
}

impl WebSurface {
    fn root(&self) -> &Element {
        match &self.kind {
            SurfaceKind::Canvas { canvas, .. } => canvas.unchecked_ref(),
            SurfaceKind::Svg { root } => root,
            SurfaceKind::Dom { root } => root.unchecked_ref(),
        }
    }
}

/// The child of a drawable's element that carries its content.
struct Content {
    kind: ContentKind,
    /// Attached to the drawable's element.
    outer: Element,
    /// Receives the content attributes. Same as `outer` except for DOM
    /// shapes, where it is the `<path>` inside an inline `<svg>`.
    inner: Element,
}

struct WebElement {
    renderer: Renderer,
    node: Element,
    content: Option<Content>,
}

struct WebImage {
    url: String,
    element: HtmlImageElement,
}

/// A [`SurfaceBackend`] drawing into a browser container element.
pub struct WebBackend {
    document: Document,
    container: HtmlElement,
    size: Size,
    surfaces: Vec<Option<WebSurface>>,
    elements: Vec<Option<WebElement>>,
    images: Vec<WebImage>,
    attachments: Attachments,
}

impl core::fmt::Debug for WebBackend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebBackend")
            .field("container", &"HtmlElement")
            .field("size", &self.size)
            .field("surfaces", &self.surfaces.iter().flatten().count())
            .field("elements", &self.elements.iter().flatten().count())
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

impl WebBackend {
    /// Creates a backend whose surfaces are `size` CSS pixels children of
    /// `container`.
    ///
    /// The container should establish a containing block (for example
    /// `position: relative`).
    ///
    /// # Errors
    ///
    /// Fails if the container is not attached to a document.
    pub fn new(container: HtmlElement, size: Size) -> Result<Self, BackendError> {
        let document = container
            .owner_document()
            .ok_or_else(|| BackendError::Platform(String::from("container has no document")))?;
        Ok(Self {
            document,
            container,
            size,
            surfaces: Vec::new(),
            elements: Vec::new(),
            images: Vec::new(),
            attachments: Attachments::default(),
        })
    }

    /// Returns the container element.
    #[must_use]
    pub fn container(&self) -> &HtmlElement {
        &self.container
    }

    /// Returns the root element of a surface, if it is live.
    #[must_use]
    pub fn surface_element(&self, surface: SurfaceId) -> Option<&Element> {
        self.surfaces
            .get(surface.0 as usize)
            .and_then(Option::as_ref)
            .map(WebSurface::root)
    }

    /// Loads an image from `url` and returns the handle image content
    /// refers to.
    ///
    /// # Errors
    ///
    /// Fails if the `<img>` element cannot be created.
    pub fn register_image(&mut self, url: &str) -> Result<ImageSource, BackendError> {
        let element: HtmlImageElement = self
            .document
            .create_element("img")
            .map_err(platform)?
            .dyn_into()
            .map_err(|_| cast_error("HtmlImageElement"))?;
        element.set_src(url);
        let id = u32::try_from(self.images.len())
            .map_err(|_| BackendError::Platform(String::from("too many images")))?;
        self.images.push(WebImage {
            url: url.to_string(),
            element,
        });
        Ok(ImageSource(id))
    }

    fn surface_mut(&mut self, surface: SurfaceId) -> Result<&mut WebSurface, BackendError> {
        self.surfaces
            .get_mut(surface.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(BackendError::InvalidSurface(surface))
    }

    fn image(&self, source: ImageSource) -> Result<&WebImage, BackendError> {
        self.images
            .get(source.0 as usize)
            .ok_or_else(|| BackendError::Platform(format!("unregistered image {source:?}")))
    }

    fn create_svg(&self, name: &str) -> Result<Element, BackendError> {
        self.document
            .create_element_ns(Some(SVG_NS), name)
            .map_err(platform)
    }

    fn create_html(&self, name: &str) -> Result<HtmlElement, BackendError> {
        self.document
            .create_element(name)
            .map_err(platform)?
            .dyn_into()
            .map_err(|_| cast_error("HtmlElement"))
    }

    fn new_surface(&self, renderer: Renderer) -> Result<SurfaceKind, BackendError> {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "viewport sizes are small positive values"
        )]
        let (width, height) = (
            self.size.width.ceil().max(0.0) as u32,
            self.size.height.ceil().max(0.0) as u32,
        );
        match renderer {
            Renderer::Canvas => {
                let canvas: HtmlCanvasElement = self
                    .create_html("canvas")?
                    .dyn_into()
                    .map_err(|_| cast_error("HtmlCanvasElement"))?;
                canvas.set_width(width);
                canvas.set_height(height);
                let ctx: CanvasRenderingContext2d = canvas
                    .get_context("2d")
                    .map_err(platform)?
                    .ok_or_else(|| BackendError::Platform(String::from("no 2d context")))?
                    .dyn_into()
                    .map_err(|_| cast_error("CanvasRenderingContext2d"))?;
                Ok(SurfaceKind::Canvas {
                    canvas,
                    ctx,
                    state: CanvasState::default(),
                })
            }
            Renderer::Svg => {
                let root = self.create_svg("svg")?;
                set_attr(&root, "width", &width.to_string())?;
                set_attr(&root, "height", &height.to_string())?;
                set_style(&root, "overflow", "visible")?;
                Ok(SurfaceKind::Svg { root })
            }
            Renderer::Dom => Ok(SurfaceKind::Dom {
                root: self.create_html("div")?,
            }),
            Renderer::WebGl => Err(BackendError::Unsupported(renderer)),
        }
    }

    /// Creates the content child of an element for `kind`.
    fn new_content(&self, renderer: Renderer, kind: ContentKind) -> Result<Content, BackendError> {
        let (outer, inner) = match (renderer, kind) {
            (Renderer::Svg, ContentKind::Shape) => {
                let el = self.create_svg("path")?;
                (el.clone(), el)
            }
            (Renderer::Svg, ContentKind::Text) => {
                let el = self.create_svg("text")?;
                (el.clone(), el)
            }
            (Renderer::Svg, ContentKind::Image) => {
                let el = self.create_svg("image")?;
                (el.clone(), el)
            }
            (_, ContentKind::Shape) => {
                let svg = self.create_svg("svg")?;
                set_style(&svg, "overflow", "visible")?;
                set_attr(&svg, "width", "1")?;
                set_attr(&svg, "height", "1")?;
                let path = self.create_svg("path")?;
                svg.append_child(&path).map_err(platform)?;
                (svg, path)
            }
            (_, ContentKind::Text) => {
                let span: Element = self.create_html("span")?.into();
                set_style(&span, "white-space", "pre")?;
                (span.clone(), span)
            }
            (_, ContentKind::Image) => {
                let img: Element = self.create_html("img")?.into();
                (img.clone(), img)
            }
        };
        Ok(Content { kind, outer, inner })
    }

    fn paint_retained(
        &mut self,
        element: ElementId,
        command: &PaintCommand<'_>,
    ) -> Result<(), BackendError> {
        let kind = command.content.kind();
        let (renderer, stale) = {
            let el = self.element(element)?;
            (el.renderer, el.content.as_ref().is_none_or(|c| c.kind != kind))
        };
        let mut dirty = command.dirty;
        if stale {
            let content = self.new_content(renderer, kind)?;
            let el = self.element_mut(element)?;
            if let Some(old) = el.content.take() {
                old.outer.remove();
            }
            el.node.append_child(&content.outer).map_err(platform)?;
            el.content = Some(content);
            dirty = DirtyAttrs::all();
        }

        let el = self.element(element)?;
        let Some(content) = &el.content else {
            return Ok(());
        };
        let svg = renderer == Renderer::Svg;
        if dirty.contains(DirtyAttrs::TRANSFORM) {
            let matrix = css_matrix(command.transform);
            if svg {
                set_attr(&el.node, "transform", &matrix)?;
            } else {
                set_style(&el.node, "transform", &matrix)?;
            }
        }
        if dirty.contains(DirtyAttrs::OPACITY) {
            set_attr_or_style(&el.node, svg, "opacity", &command.opacity.to_string())?;
        }
        if dirty.contains(DirtyAttrs::VISIBILITY) {
            let display = match (command.visible, svg) {
                (false, _) => "none",
                (true, true) => "inline",
                (true, false) => "block",
            };
            set_attr_or_style(&el.node, svg, "display", display)?;
        }

        match command.content {
            NodeContent::Shape(shape) => write_shape(&content.inner, shape, dirty),
            NodeContent::Text(text) => {
                if dirty.contains(DirtyAttrs::TEXT) {
                    content.inner.set_text_content(Some(&text.text));
                }
                if dirty.contains(DirtyAttrs::FONT) {
                    if svg {
                        set_attr(&content.inner, "font-family", &text.font.family)?;
                        set_attr(&content.inner, "font-size", &text.font.size.to_string())?;
                    } else {
                        set_style(&content.inner, "font", &font_css(&text.font))?;
                    }
                }
                if dirty.contains(DirtyAttrs::FILL) {
                    let color = text.fill.as_ref().and_then(brush_css);
                    if svg {
                        set_attr(&content.inner, "fill", color.as_deref().unwrap_or("none"))?;
                    } else {
                        set_style(
                            &content.inner,
                            "color",
                            color.as_deref().unwrap_or("transparent"),
                        )?;
                    }
                }
                Ok(())
            }
            NodeContent::Image(image) => {
                if dirty.contains(DirtyAttrs::IMAGE) {
                    let url = &self.image(image.source)?.url;
                    write_image(&content.inner, svg, image, url)?;
                }
                Ok(())
            }
        }
    }

    fn element(&self, element: ElementId) -> Result<&WebElement, BackendError> {
        self.elements
            .get(element.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(BackendError::InvalidElement(element))
    }

    fn element_mut(&mut self, element: ElementId) -> Result<&mut WebElement, BackendError> {
        self.elements
            .get_mut(element.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(BackendError::InvalidElement(element))
    }
}

fn set_attr_or_style(el: &Element, svg: bool, name: &str, value: &str) -> Result<(), BackendError> {
    if svg {
        set_attr(el, name, value)
    } else {
        set_style(el, name, value)
    }
}

fn write_shape(path: &Element, shape: &ShapeContent, dirty: DirtyAttrs) -> Result<(), BackendError> {
    if dirty.contains(DirtyAttrs::SHAPE) {
        set_attr(path, "d", &svg_path_data(&shape.path))?;
    }
    if dirty.contains(DirtyAttrs::FILL) {
        let fill = shape.fill.as_ref().and_then(brush_css);
        set_attr(path, "fill", fill.as_deref().unwrap_or("none"))?;
    }
    if dirty.contains(DirtyAttrs::STROKE) {
        match shape
            .stroke
            .as_ref()
            .and_then(|s| brush_css(&s.brush).map(|c| (c, s.width)))
        {
            Some((color, width)) => {
                set_attr(path, "stroke", &color)?;
                set_attr(path, "stroke-width", &width.to_string())?;
            }
            None => set_attr(path, "stroke", "none")?,
        }
    }
    Ok(())
}

fn write_image(el: &Element, svg: bool, image: &ImageContent, url: &str) -> Result<(), BackendError> {
    set_attr(el, if svg { "href" } else { "src" }, url)?;
    set_attr(el, "width", &image.size.width.to_string())?;
    set_attr(el, "height", &image.size.height.to_string())
}

fn paint_canvas(
    ctx: &CanvasRenderingContext2d,
    state: &mut CanvasState,
    command: &PaintCommand<'_>,
    image: Option<&HtmlImageElement>,
) -> Result<(), BackendError> {
    if !command.visible {
        return Ok(());
    }
    if state.global_alpha(command.opacity) {
        ctx.set_global_alpha(command.opacity);
    }
    let [a, b, c, d, e, f] = command.transform.as_coeffs();
    if state.transform([a, b, c, d, e, f]) {
        ctx.set_transform(a, b, c, d, e, f).map_err(platform)?;
    }
    match command.content {
        NodeContent::Shape(shape) => {
            let path = Path2d::new_with_path_string(&svg_path_data(&shape.path)).map_err(platform)?;
            if let Some(style) = shape.fill.as_ref().and_then(brush_css) {
                if state.fill_style(&style) {
                    ctx.set_fill_style_str(&style);
                }
                ctx.fill_with_path_2d(&path);
            }
            if let Some(stroke) = &shape.stroke {
                if let Some(style) = brush_css(&stroke.brush) {
                    if state.stroke_style(&style) {
                        ctx.set_stroke_style_str(&style);
                    }
                    if state.line_width(stroke.width) {
                        ctx.set_line_width(stroke.width);
                    }
                    ctx.stroke_with_path(&path);
                }
            }
        }
        NodeContent::Text(text) => {
            let font = font_css(&text.font);
            if state.font(&font) {
                ctx.set_font(&font);
            }
            if let Some(style) = text.fill.as_ref().and_then(brush_css) {
                if state.fill_style(&style) {
                    ctx.set_fill_style_str(&style);
                }
                ctx.fill_text(&text.text, 0.0, 0.0).map_err(platform)?;
            }
        }
        NodeContent::Image(content) => {
            if let Some(image) = image {
                ctx.draw_image_with_html_image_element_and_dw_and_dh(
                    image,
                    0.0,
                    0.0,
                    content.size.width,
                    content.size.height,
                )
                .map_err(platform)?;
            }
        }
    }
    Ok(())
}

/// Stores `value` in the first free slot and returns its index.
fn insert<T>(slots: &mut Vec<Option<T>>, value: T) -> Result<u32, BackendError> {
    let idx = match slots.iter().position(Option::is_none) {
        Some(idx) => {
            slots[idx] = Some(value);
            idx
        }
        None => {
            slots.push(Some(value));
            slots.len() - 1
        }
    };
    u32::try_from(idx).map_err(|_| BackendError::Platform(String::from("handle space exhausted")))
}

impl SurfaceBackend for WebBackend {
    fn create_surface(&mut self, renderer: Renderer) -> Result<SurfaceId, BackendError> {
        let kind = self.new_surface(renderer)?;
        let surface = WebSurface { kind };
        absolute(surface.root())?;
        self.container
            .append_child(surface.root())
            .map_err(platform)?;
        insert(&mut self.surfaces, surface).map(SurfaceId)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        self.surface_mut(surface)?;
        if let Some(s) = self.surfaces[surface.0 as usize].take() {
            s.root().remove();
        }
        self.attachments.destroy_surface(surface);
        Ok(())
    }

    fn order_surfaces(&mut self, surfaces: &[SurfaceId]) -> Result<(), BackendError> {
        for &id in surfaces {
            let root = self
                .surface_element(id)
                .ok_or(BackendError::InvalidSurface(id))?;
            // Re-appending an attached child moves it to the end.
            self.container.append_child(root).map_err(platform)?;
        }
        Ok(())
    }

    fn place_surface(
        &mut self,
        surface: SurfaceId,
        placement: &Placement,
    ) -> Result<(), BackendError> {
        let root = self
            .surface_element(surface)
            .ok_or(BackendError::InvalidSurface(surface))?;
        set_style(root, "transform", &css_matrix(placement.transform))?;
        set_style(root, "opacity", &placement.opacity.to_string())
    }

    fn create_element(&mut self, renderer: Renderer) -> Result<ElementId, BackendError> {
        let node: Element = match renderer {
            Renderer::Svg => self.create_svg("g")?,
            Renderer::Dom => {
                let div: Element = self.create_html("div")?.into();
                absolute(&div)?;
                div
            }
            Renderer::Canvas | Renderer::WebGl => return Err(BackendError::Unsupported(renderer)),
        };
        let element = WebElement {
            renderer,
            node,
            content: None,
        };
        insert(&mut self.elements, element).map(ElementId)
    }

    fn release_element(&mut self, element: ElementId) -> Result<(), BackendError> {
        self.element(element)?;
        if let Some(el) = self.elements[element.0 as usize].take() {
            el.node.remove();
        }
        self.attachments.release_element(element);
        Ok(())
    }

    fn order_elements(
        &mut self,
        surface: SurfaceId,
        elements: &[ElementId],
    ) -> Result<(), BackendError> {
        self.surface_mut(surface)?;
        for &e in elements {
            self.element(e)?;
        }
        for e in self.attachments.order(surface, elements) {
            if let Ok(el) = self.element(e) {
                el.node.remove();
            }
        }
        let root = self
            .surface_element(surface)
            .ok_or(BackendError::InvalidSurface(surface))?;
        for &e in elements {
            let el = self.element(e)?;
            root.append_child(&el.node).map_err(platform)?;
        }
        Ok(())
    }

    fn clear_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        let size = self.size;
        if let SurfaceKind::Canvas { ctx, state, .. } = &mut self.surface_mut(surface)?.kind {
            if state.transform([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]) {
                ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
                    .map_err(platform)?;
            }
            ctx.clear_rect(0.0, 0.0, size.width, size.height);
        }
        Ok(())
    }

    fn paint(&mut self, surface: SurfaceId, command: &PaintCommand<'_>) -> Result<(), BackendError> {
        let image = match command.content {
            NodeContent::Image(content) if command.renderer == Renderer::Canvas => {
                Some(self.image(content.source)?.element.clone())
            }
            _ => None,
        };
        if !matches!(self.surface_mut(surface)?.kind, SurfaceKind::Canvas { .. }) {
            let element = command.element.ok_or_else(|| {
                BackendError::Platform(String::from("retained paint without element"))
            })?;
            return self.paint_retained(element, command);
        }
        match &mut self.surface_mut(surface)?.kind {
            SurfaceKind::Canvas { ctx, state, .. } => {
                paint_canvas(ctx, state, command, image.as_ref())
            }
            SurfaceKind::Svg { .. } | SurfaceKind::Dom { .. } => Ok(()),
        }
    }
}
