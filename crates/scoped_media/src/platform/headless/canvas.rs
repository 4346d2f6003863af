//! Software pixel buffer and rasterization for the headless platform

use crate::geometry::{Color, Rect};
use crate::renderer::BlendMode;

/// Row-major RGBA pixel buffer
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Canvas {
    width: i32,
    height: i32,
    pixels: Vec<Color>,
}

impl Canvas {
    pub(crate) fn new(width: i32, height: i32, fill: Color) -> Self {
        let count = pixel_count(width, height);
        Self { width, height, pixels: vec![fill; count] }
    }

    pub(crate) fn from_pixels(width: i32, height: i32, pixels: Vec<Color>) -> Option<Self> {
        (width >= 0 && height >= 0 && pixels.len() == pixel_count(width, height))
            .then_some(Self { width, height, pixels })
    }

    pub(crate) const fn width(&self) -> i32 {
        self.width
    }

    pub(crate) const fn height(&self) -> i32 {
        self.height
    }

    pub(crate) const fn bounds(&self) -> Rect<i32> {
        Rect { x: 0, y: 0, w: self.width, h: self.height }
    }

    pub(crate) fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        usize::try_from(y * self.width + x).ok()
    }

    /// Force every pixel opaque, for formats without alpha
    pub(crate) fn drop_alpha(&mut self) {
        for pixel in &mut self.pixels {
            pixel.a = 255;
        }
    }

    /// Combine `color` into one pixel if it lies inside `clip`
    pub(crate) fn plot(&mut self, x: i32, y: i32, color: Color, mode: BlendMode, clip: &Rect<i32>) {
        if !contains(clip, x, y) {
            return;
        }
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = blend(color, self.pixels[index], mode);
        }
    }

    /// Combine `color` into every pixel of `rect` inside `clip`
    pub(crate) fn fill(&mut self, rect: &Rect<i32>, color: Color, mode: BlendMode, clip: &Rect<i32>) {
        let Some(area) = intersect(rect, clip).and_then(|area| intersect(&area, &self.bounds())) else {
            return;
        };
        for y in area.y..area.y + area.h {
            for x in area.x..area.x + area.w {
                if let Some(index) = self.index(x, y) {
                    self.pixels[index] = blend(color, self.pixels[index], mode);
                }
            }
        }
    }

    /// Bresenham line including both end points, clipped to `clip` first
    pub(crate) fn line(&mut self, from: (i32, i32), to: (i32, i32), color: Color, mode: BlendMode, clip: &Rect<i32>) {
        let Some(visible) = intersect(clip, &self.bounds()) else {
            return;
        };
        let widen = |(x, y): (i32, i32)| (i64::from(x), i64::from(y));
        let Some(((mut x, mut y), to)) = clip_line(&visible, widen(from), widen(to)) else {
            return;
        };
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let step_x = if x < to.0 { 1 } else { -1 };
        let step_y = if y < to.1 { 1 } else { -1 };
        let mut error = dx + dy;

        loop {
            if let (Ok(px), Ok(py)) = (i32::try_from(x), i32::try_from(y)) {
                self.plot(px, py, color, mode, &visible);
            }
            if x == to.0 && y == to.1 {
                break;
            }
            let doubled = 2 * error;
            if doubled >= dy {
                error += dy;
                x += step_x;
            }
            if doubled <= dx {
                error += dx;
                y += step_y;
            }
        }
    }

    /// Copy of the pixels inside `rect`, or `None` if it leaves the buffer
    pub(crate) fn region(&self, rect: &Rect<i32>) -> Option<Vec<Color>> {
        if rect.w < 0 || rect.h < 0 {
            return None;
        }
        if rect.w == 0 || rect.h == 0 {
            return Some(Vec::new());
        }
        if intersect(rect, &self.bounds()) != Some(*rect) {
            return None;
        }
        let mut out = Vec::with_capacity(pixel_count(rect.w, rect.h));
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                out.push(self.pixels[self.index(x, y)?]);
            }
        }
        Some(out)
    }

    /// Overwrite the pixels inside `rect`; false if the region or data do not fit
    pub(crate) fn write_region(&mut self, rect: &Rect<i32>, data: &[Color]) -> bool {
        if intersect(rect, &self.bounds()) != Some(*rect) || data.len() != pixel_count(rect.w, rect.h) {
            return false;
        }
        let mut source = data.iter();
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                if let (Some(index), Some(pixel)) = (self.index(x, y), source.next()) {
                    self.pixels[index] = *pixel;
                }
            }
        }
        true
    }

    /// Nearest-neighbour scaled copy of a `source_width` x `source_height` block
    pub(crate) fn blit_scaled(
        &mut self,
        source: &[Color],
        source_width: i32,
        source_height: i32,
        destination: &Rect<i32>,
        mode: BlendMode,
        clip: &Rect<i32>,
    ) {
        if source_width <= 0 || source_height <= 0 || destination.w <= 0 || destination.h <= 0 {
            return;
        }
        let Some(area) = intersect(destination, clip).and_then(|area| intersect(&area, &self.bounds())) else {
            return;
        };

        for y in area.y..area.y + area.h {
            let source_y = offset(y, destination.y) * i64::from(source_height) / i64::from(destination.h);
            for x in area.x..area.x + area.w {
                let source_x = offset(x, destination.x) * i64::from(source_width) / i64::from(destination.w);
                let Ok(source_index) = usize::try_from(source_y * i64::from(source_width) + source_x) else {
                    continue;
                };
                if let (Some(index), Some(pixel)) = (self.index(x, y), source.get(source_index)) {
                    self.pixels[index] = blend(*pixel, self.pixels[index], mode);
                }
            }
        }
    }
}

pub(crate) fn pixel_count(width: i32, height: i32) -> usize {
    usize::try_from(width).unwrap_or(0) * usize::try_from(height).unwrap_or(0)
}

/// Exclusive end of a span, widened so large extents cannot overflow
fn end(start: i32, length: i32) -> i64 {
    i64::from(start) + i64::from(length)
}

fn offset(value: i32, origin: i32) -> i64 {
    i64::from(value) - i64::from(origin)
}

fn contains(rect: &Rect<i32>, x: i32, y: i32) -> bool {
    x >= rect.x && y >= rect.y && i64::from(x) < end(rect.x, rect.w) && i64::from(y) < end(rect.y, rect.h)
}

/// Overlap of two rectangles, `None` when empty
pub(crate) fn intersect(a: &Rect<i32>, b: &Rect<i32>) -> Option<Rect<i32>> {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = end(a.x, a.w).min(end(b.x, b.w));
    let bottom = end(a.y, a.h).min(end(b.y, b.h));
    let w = right - i64::from(left);
    let h = bottom - i64::from(top);
    (w > 0 && h > 0).then(|| Rect {
        x: left,
        y: top,
        w: i32::try_from(w).unwrap_or(i32::MAX),
        h: i32::try_from(h).unwrap_or(i32::MAX),
    })
}

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

type Segment = ((i64, i64), (i64, i64));

/// Cohen-Sutherland clip of a segment to the pixels of `rect`
fn clip_line(rect: &Rect<i32>, from: (i64, i64), to: (i64, i64)) -> Option<Segment> {
    let (left, top) = (i64::from(rect.x), i64::from(rect.y));
    let (right, bottom) = (end(rect.x, rect.w) - 1, end(rect.y, rect.h) - 1);
    let outcode = |(x, y): (i64, i64)| {
        let horizontal = if x < left { LEFT } else if x > right { RIGHT } else { 0 };
        let vertical = if y < top { TOP } else if y > bottom { BOTTOM } else { 0 };
        horizontal | vertical
    };

    let (mut a, mut b) = (from, to);
    let (mut code_a, mut code_b) = (outcode(a), outcode(b));
    // Each pass moves one end point onto an edge; rounding can need a few extra.
    for _ in 0..8 {
        if code_a | code_b == 0 {
            return Some((a, b));
        }
        if code_a & code_b != 0 {
            return None;
        }
        let code = if code_a == 0 { code_b } else { code_a };
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let point = if code & TOP != 0 {
            (a.0 + along(dx, top - a.1, dy), top)
        } else if code & BOTTOM != 0 {
            (a.0 + along(dx, bottom - a.1, dy), bottom)
        } else if code & RIGHT != 0 {
            (right, a.1 + along(dy, right - a.0, dx))
        } else {
            (left, a.1 + along(dy, left - a.0, dx))
        };
        if code == code_a {
            a = point;
            code_a = outcode(a);
        } else {
            b = point;
            code_b = outcode(b);
        }
    }
    None
}

/// `delta * part / whole` without intermediate overflow
fn along(delta: i64, part: i64, whole: i64) -> i64 {
    if whole == 0 {
        return 0;
    }
    let scaled = i128::from(delta) * i128::from(part) / i128::from(whole);
    i64::try_from(scaled).unwrap_or(0)
}

fn scale(channel: u8, factor: u8) -> u8 {
    let product = (u32::from(channel) * u32::from(factor) + 127) / 255;
    u8::try_from(product).unwrap_or(u8::MAX)
}

fn saturating(sum: u32) -> u8 {
    u8::try_from(sum.min(255)).unwrap_or(u8::MAX)
}

/// Combine `source` over `destination`
pub(crate) fn blend(source: Color, destination: Color, mode: BlendMode) -> Color {
    let inverse = 255 - source.a;
    match mode {
        BlendMode::None => source,
        BlendMode::Blend => Color {
            r: saturating(u32::from(scale(source.r, source.a)) + u32::from(scale(destination.r, inverse))),
            g: saturating(u32::from(scale(source.g, source.a)) + u32::from(scale(destination.g, inverse))),
            b: saturating(u32::from(scale(source.b, source.a)) + u32::from(scale(destination.b, inverse))),
            a: saturating(u32::from(source.a) + u32::from(scale(destination.a, inverse))),
        },
        BlendMode::Add => Color {
            r: saturating(u32::from(scale(source.r, source.a)) + u32::from(destination.r)),
            g: saturating(u32::from(scale(source.g, source.a)) + u32::from(destination.g)),
            b: saturating(u32::from(scale(source.b, source.a)) + u32::from(destination.b)),
            a: destination.a,
        },
        BlendMode::Mod => Color {
            r: scale(source.r, destination.r),
            g: scale(source.g, destination.g),
            b: scale(source.b, destination.b),
            a: destination.a,
        },
        BlendMode::Mul => Color {
            r: saturating(u32::from(scale(source.r, destination.r)) + u32::from(scale(destination.r, inverse))),
            g: saturating(u32::from(scale(source.g, destination.g)) + u32::from(scale(destination.g, inverse))),
            b: saturating(u32::from(scale(source.b, destination.b)) + u32::from(scale(destination.b, inverse))),
            a: destination.a,
        },
    }
}
