//! Plain geometry and color types passed to drawing primitives
//!
//! These are data carriers only. The numeric representation chosen for a point
//! or rectangle (`i32` or `f32`) selects which native primitive a drawing call
//! forwards to, through the sealed [`Coordinate`] trait. No conversion between
//! the two representations ever happens at runtime.

use serde::{Deserialize, Serialize};

use crate::platform::{Platform, RendererId, TextureId};

/// 2D point in integer or floating-point pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point<T> {
    /// Horizontal coordinate
    pub x: T,
    /// Vertical coordinate
    pub y: T,
}

impl<T> Point<T> {
    /// Create a point
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with its origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect<T> {
    /// Left edge
    pub x: T,
    /// Top edge
    pub y: T,
    /// Width
    pub w: T,
    /// Height
    pub h: T,
}

impl<T: Copy> Rect<T> {
    /// Create a rectangle from origin and extent
    pub const fn new(x: T, y: T, w: T, h: T) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle from an origin point and a size point
    pub const fn from_points(origin: Point<T>, size: Point<T>) -> Self {
        Self { x: origin.x, y: origin.y, w: size.x, h: size.y }
    }

    /// Top-left corner
    pub const fn origin(&self) -> Point<T> {
        Point { x: self.x, y: self.y }
    }

    /// Extent as a point
    pub const fn size(&self) -> Point<T> {
        Point { x: self.w, y: self.h }
    }
}

/// RGBA color, 8 bits per channel
///
/// The layout matches the byte order used by pixel read-back and surface
/// buffers, so slices of colors can be viewed as raw bytes with `bytemuck`.
#[repr(C)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque black, the default draw color of a fresh renderer
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// View a color slice as packed R, G, B, A bytes
    pub fn as_bytes(colors: &[Self]) -> &[u8] {
        bytemuck::cast_slice(colors)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
}

/// Numeric representation of drawing geometry
///
/// Implemented for `i32` (integer pixel primitives) and `f32` (the `_f`
/// primitives). Each method forwards to exactly one native primitive and
/// returns its raw status code; translating the status into an error is the
/// caller's job.
pub trait Coordinate: Copy + PartialOrd + std::fmt::Debug + sealed::Sealed {
    /// Forward to the point primitive for this representation
    fn draw_point(platform: &dyn Platform, renderer: RendererId, point: Point<Self>) -> i32;

    /// Forward to the line primitive for this representation
    fn draw_line(
        platform: &dyn Platform,
        renderer: RendererId,
        begin: Point<Self>,
        end: Point<Self>,
    ) -> i32;

    /// Forward to the single-rectangle fill primitive
    fn fill_rect(platform: &dyn Platform, renderer: RendererId, rect: Option<&Rect<Self>>) -> i32;

    /// Forward to the batched rectangle fill primitive
    fn fill_rects(platform: &dyn Platform, renderer: RendererId, rects: &[Rect<Self>]) -> i32;

    /// Forward to the texture copy primitive; the source region is always integral
    fn copy(
        platform: &dyn Platform,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<Self>>,
    ) -> i32;
}

impl Coordinate for i32 {
    fn draw_point(platform: &dyn Platform, renderer: RendererId, point: Point<Self>) -> i32 {
        platform.draw_point(renderer, point.x, point.y)
    }

    fn draw_line(
        platform: &dyn Platform,
        renderer: RendererId,
        begin: Point<Self>,
        end: Point<Self>,
    ) -> i32 {
        platform.draw_line(renderer, begin.x, begin.y, end.x, end.y)
    }

    fn fill_rect(platform: &dyn Platform, renderer: RendererId, rect: Option<&Rect<Self>>) -> i32 {
        platform.fill_rect(renderer, rect)
    }

    fn fill_rects(platform: &dyn Platform, renderer: RendererId, rects: &[Rect<Self>]) -> i32 {
        platform.fill_rects(renderer, rects)
    }

    fn copy(
        platform: &dyn Platform,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<Self>>,
    ) -> i32 {
        platform.render_copy(renderer, texture, source, destination)
    }
}

impl Coordinate for f32 {
    fn draw_point(platform: &dyn Platform, renderer: RendererId, point: Point<Self>) -> i32 {
        platform.draw_point_f(renderer, point.x, point.y)
    }

    fn draw_line(
        platform: &dyn Platform,
        renderer: RendererId,
        begin: Point<Self>,
        end: Point<Self>,
    ) -> i32 {
        platform.draw_line_f(renderer, begin.x, begin.y, end.x, end.y)
    }

    fn fill_rect(platform: &dyn Platform, renderer: RendererId, rect: Option<&Rect<Self>>) -> i32 {
        platform.fill_rect_f(renderer, rect)
    }

    fn fill_rects(platform: &dyn Platform, renderer: RendererId, rects: &[Rect<Self>]) -> i32 {
        platform.fill_rects_f(renderer, rects)
    }

    fn copy(
        platform: &dyn Platform,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<Self>>,
    ) -> i32 {
        platform.render_copy_f(renderer, texture, source, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_bytes_are_rgba_ordered() {
        let colors = [Color::rgba(1, 2, 3, 4), Color::rgb(5, 6, 7)];
        assert_eq!(Color::as_bytes(&colors), &[1, 2, 3, 4, 5, 6, 7, 255]);
    }

    #[test]
    fn test_rect_from_points() {
        let rect = Rect::from_points(Point::new(2, 3), Point::new(10, 20));
        assert_eq!(rect, Rect::new(2, 3, 10, 20));
        assert_eq!(rect.origin(), Point::new(2, 3));
        assert_eq!(rect.size(), Point::new(10, 20));
    }
}
