//! 2D renderers bound to a window
//!
//! [`Renderer`] borrows its owned handle for each call and forwards to the
//! native drawing primitives. Drawing calls are generic over
//! [`Coordinate`](crate::geometry::Coordinate): passing `i32` geometry reaches
//! the integer primitives, passing `f32` geometry reaches the `_f` primitives.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{self, MediaError, MediaResult};
use crate::geometry::{Color, Coordinate, Point, Rect};
use crate::handle::RendererHandle;
use crate::platform::{RendererId, TextureId};
use crate::surface::Surface;
use crate::texture::{self, PixelFormat, Texture, TextureAccess, TextureProperties};
use crate::window::Window;

bitflags! {
    /// Renderer capability requests
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RendererFlags: u32 {
        /// Software fallback
        const SOFTWARE = 0x0000_0001;
        /// Hardware acceleration
        const ACCELERATED = 0x0000_0002;
        /// Present synchronized with refresh rate
        const PRESENT_VSYNC = 0x0000_0004;
        /// Supports rendering to texture
        const TARGET_TEXTURE = 0x0000_0008;
    }
}

impl Default for RendererFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Renderer creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Driver index, `-1` for the first one supporting `flags`
    pub index: i32,
    /// Requested capabilities
    pub flags: RendererFlags,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self { index: -1, flags: RendererFlags::empty() }
    }
}

impl Config for RendererConfig {}

/// How drawing combines with existing pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    /// Overwrite destination
    None,
    /// Alpha blending
    Blend,
    /// Additive blending
    Add,
    /// Color modulation
    Mod,
    /// Color multiplication
    Mul,
}

impl BlendMode {
    /// Native blend mode value
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::None => 0x0,
            Self::Blend => 0x1,
            Self::Add => 0x2,
            Self::Mod => 0x4,
            Self::Mul => 0x8,
        }
    }

    /// Parse a native blend mode value
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x0 => Some(Self::None),
            0x1 => Some(Self::Blend),
            0x2 => Some(Self::Add),
            0x4 => Some(Self::Mod),
            0x8 => Some(Self::Mul),
            _ => None,
        }
    }
}

/// Create a renderer for `window`
pub fn make_renderer(window: &Window, index: i32, flags: RendererFlags) -> MediaResult<RendererHandle> {
    let handle = window.handle();
    let (platform, raw_window) = handle.borrow();
    let raw = platform.create_renderer(raw_window, index, flags.bits());
    let raw = error::non_null(platform, raw, MediaError::RendererCreation)?;
    log::debug!("Created renderer (index {index}, {flags:?})");
    Ok(RendererHandle::from_raw(handle.runtime(), raw))
}

/// Create a renderer for `window` from a configuration struct
pub fn make_renderer_from_config(window: &Window, config: &RendererConfig) -> MediaResult<RendererHandle> {
    make_renderer(window, config.index, config.flags)
}

/// Renderer accessor
///
/// # Panics
/// All methods panic if the wrapped handle is empty.
#[derive(Debug, Default)]
pub struct Renderer {
    handle: RendererHandle,
}

impl Renderer {
    /// Create a renderer for `window`
    pub fn new(window: &Window, index: i32, flags: RendererFlags) -> MediaResult<Self> {
        make_renderer(window, index, flags).map(Self::from_handle)
    }

    /// Create a renderer for `window` from a configuration struct
    pub fn from_config(window: &Window, config: &RendererConfig) -> MediaResult<Self> {
        make_renderer_from_config(window, config).map(Self::from_handle)
    }

    /// Wrap an owned handle
    pub const fn from_handle(handle: RendererHandle) -> Self {
        Self { handle }
    }

    /// The owned handle
    pub const fn handle(&self) -> &RendererHandle {
        &self.handle
    }

    /// Mutable access to the owned handle
    pub fn handle_mut(&mut self) -> &mut RendererHandle {
        &mut self.handle
    }

    /// Unwrap into the owned handle
    pub fn into_handle(self) -> RendererHandle {
        self.handle
    }

    /// Raw reference for borrowing
    pub fn raw(&self) -> Option<RendererId> {
        self.handle.as_raw()
    }

    /// Size of the default render target
    pub fn output_size(&self) -> MediaResult<(i32, i32)> {
        let (platform, raw) = self.handle.borrow();
        let size = platform.renderer_output_size(raw);
        error::non_null(platform, size, MediaError::render("query output size"))
    }

    /// Scale applied to drawing coordinates
    pub fn set_scale(&self, scale_x: f32, scale_y: f32) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_render_scale(raw, scale_x, scale_y);
        error::status(platform, code, MediaError::render("set scale")).map(drop)
    }

    /// Current coordinate scale
    pub fn scale(&self) -> MediaResult<(f32, f32)> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.render_scale(raw), MediaError::render("query scale"))
    }

    /// Blend mode used by point, line and fill primitives
    pub fn set_draw_blend_mode(&self, mode: BlendMode) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_draw_blend_mode(raw, mode.to_raw());
        error::status(platform, code, MediaError::render("set draw blend mode")).map(drop)
    }

    /// Current draw blend mode
    pub fn draw_blend_mode(&self) -> MediaResult<BlendMode> {
        let (platform, raw) = self.handle.borrow();
        let mode = error::non_null(
            platform,
            platform.draw_blend_mode(raw),
            MediaError::render("query draw blend mode"),
        )?;
        BlendMode::from_raw(mode).ok_or_else(|| MediaError::Render {
            operation: "query draw blend mode",
            message: format!("unrecognized blend mode {mode:#x}"),
        })
    }

    /// Restrict drawing to `rect`; coordinates become relative to its origin
    pub fn set_viewport(&self, rect: &Rect<i32>) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_viewport(raw, Some(rect));
        error::status(platform, code, MediaError::render("set viewport")).map(drop)
    }

    /// Draw to the whole target again
    pub fn reset_viewport(&self) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_viewport(raw, None);
        error::status(platform, code, MediaError::render("reset viewport")).map(drop)
    }

    /// Current drawing area
    pub fn viewport(&self) -> MediaResult<Rect<i32>> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.viewport(raw), MediaError::render("query viewport"))
    }

    /// Redirect drawing into `texture`, or back to the window with `None`
    ///
    /// The texture must have been created with [`TextureAccess::Target`].
    pub fn set_render_target(&self, texture: Option<&Texture>) -> MediaResult<()> {
        let target = texture
            .map(|texture| self.texture_id(texture, MediaError::render("set render target")))
            .transpose()?;
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_render_target(raw, target);
        error::status(platform, code, MediaError::render("set render target")).map(drop)
    }

    /// Raw reference of the current target texture; `None` for the window
    ///
    /// Ownership of the texture is not shared; the raw id is for comparison.
    pub fn render_target(&self) -> Option<TextureId> {
        let (platform, raw) = self.handle.borrow();
        platform.render_target(raw)
    }

    /// Color used by clear, point, line and fill primitives
    pub fn set_draw_color(&self, color: Color) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_draw_color(raw, color);
        error::status(platform, code, MediaError::render("set draw color")).map(drop)
    }

    /// Current draw color
    pub fn draw_color(&self) -> MediaResult<Color> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.draw_color(raw), MediaError::render("query draw color"))
    }

    /// Fill the whole target with the draw color
    pub fn clear(&self) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        error::status(platform, platform.render_clear(raw), MediaError::render("clear")).map(drop)
    }

    /// Show everything drawn since the last present
    pub fn present(&self) {
        let (platform, raw) = self.handle.borrow();
        platform.render_present(raw);
    }

    /// Draw a single point
    pub fn draw_point<T: Coordinate>(&self, point: Point<T>) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = T::draw_point(platform, raw, point);
        error::status(platform, code, MediaError::render("draw point")).map(drop)
    }

    /// Draw a line segment including both end points
    pub fn draw_line<T: Coordinate>(&self, begin: Point<T>, end: Point<T>) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = T::draw_line(platform, raw, begin, end);
        error::status(platform, code, MediaError::render("draw line")).map(drop)
    }

    /// Fill a rectangle with the draw color
    pub fn fill_rect<T: Coordinate>(&self, rect: &Rect<T>) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = T::fill_rect(platform, raw, Some(rect));
        error::status(platform, code, MediaError::render("fill rectangle")).map(drop)
    }

    /// Fill several rectangles with the draw color
    pub fn fill_rects<T: Coordinate>(&self, rects: &[Rect<T>]) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = T::fill_rects(platform, raw, rects);
        error::status(platform, code, MediaError::render("fill rectangles")).map(drop)
    }

    /// Copy `source` of `texture` into `destination`, scaling to fit
    pub fn copy<T: Coordinate>(
        &self,
        texture: &Texture,
        source: &Rect<i32>,
        destination: &Rect<T>,
    ) -> MediaResult<()> {
        let raw_texture = self.texture_id(texture, MediaError::render("copy texture"))?;
        let (platform, raw) = self.handle.borrow();
        let code = T::copy(platform, raw, raw_texture, Some(source), Some(destination));
        error::status(platform, code, MediaError::render("copy texture")).map(drop)
    }

    /// Copy the whole texture over the whole viewport
    pub fn copy_all(&self, texture: &Texture) -> MediaResult<()> {
        let raw_texture = self.texture_id(texture, MediaError::render("copy texture"))?;
        let (platform, raw) = self.handle.borrow();
        let code = platform.render_copy(raw, raw_texture, None, None);
        error::status(platform, code, MediaError::render("copy texture")).map(drop)
    }

    fn texture_id(&self, texture: &Texture, fail: impl FnOnce(String) -> MediaError) -> MediaResult<TextureId> {
        error::sibling(&self.handle, texture.handle(), "Texture was not created with this renderer", fail)
    }

    /// Read back pixels of the current target; `None` reads the viewport
    pub fn read_pixels(&self, rect: Option<Rect<i32>>) -> MediaResult<Vec<Color>> {
        let (platform, raw) = self.handle.borrow();
        let pixels = platform.read_pixels(raw, rect.as_ref());
        error::non_null(platform, pixels, MediaError::render("read pixels"))
    }

    /// Create a blank texture owned by this renderer
    pub fn create_texture(
        &self,
        format: PixelFormat,
        access: TextureAccess,
        width: i32,
        height: i32,
    ) -> MediaResult<Texture> {
        texture::make_texture(self, format, access, width, height).map(Texture::from_handle)
    }

    /// Create a blank texture from a properties struct
    pub fn create_texture_with_properties(&self, properties: &TextureProperties) -> MediaResult<Texture> {
        texture::make_texture_with_properties(self, properties).map(Texture::from_handle)
    }

    /// Create a static texture holding a copy of `surface`
    pub fn create_texture_from_surface(&self, surface: &Surface) -> MediaResult<Texture> {
        texture::make_texture_from_surface(self, surface).map(Texture::from_handle)
    }
}
