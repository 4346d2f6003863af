//! Native library boundary
//!
//! [`Platform`] is the C-shaped surface of the wrapped multimedia library. It
//! reports failure through sentinels instead of `Result`, and through a single
//! last-error slot instead of per-call error values. Everything above this
//! module (handles, factories, accessors) exists to turn that convention into
//! owned resources and typed errors.
//!
//! # Sentinel conventions
//!
//! | return type      | failure sentinel |
//! |------------------|------------------|
//! | `Option<RawId>`  | `None` (null)    |
//! | `i32` status     | negative         |
//! | `usize` count    | `0`              |
//! | `i64` offset     | `-1`             |
//! | `u32` event type | `u32::MAX`       |
//!
//! On every failure the implementation stores a message that
//! [`Platform::last_error`] returns until the next failure overwrites it.
//!
//! # Thread Safety
//! Implementations are driven from a single thread. Methods take `&self` and
//! use interior mutability so that callbacks (event filters, watches) may run
//! while the platform is in use.

pub mod headless;

use std::path::Path;

use crate::events::{Event, EventFilter};
use crate::geometry::{Color, Rect};

pub use headless::{EventInjector, HeadlessPlatform, HeadlessProbe, ResourceClass};

slotmap::new_key_type! {
    /// Raw window reference
    pub struct WindowId;
    /// Raw renderer reference
    pub struct RendererId;
    /// Raw texture reference
    pub struct TextureId;
    /// Raw surface reference
    pub struct SurfaceId;
    /// Raw byte-stream reference
    pub struct StreamId;
}

/// Texture attributes as reported by the native query primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureQuery {
    /// Raw pixel format value
    pub format: u32,
    /// Raw access mode value
    pub access: i32,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

/// Surface attributes as reported by the native query primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceInfo {
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
    /// Raw pixel format value
    pub format: u32,
}

/// C-shaped native multimedia library
///
/// See the module documentation for the failure conventions every method
/// follows. Destroy primitives never fail observably; releasing an unknown id
/// only records an error message.
pub trait Platform {
    // --- Lifecycle and error state ---

    /// Initialize subsystems; negative on failure
    fn init(&self, flags: u32) -> i32;
    /// Shut down every subsystem
    fn quit(&self);
    /// Subset of `flags` that is currently initialized
    fn was_init(&self, flags: u32) -> u32;
    /// Message describing the most recent failure
    fn last_error(&self) -> String;
    /// Overwrite the last-error slot
    fn set_error(&self, message: &str);
    /// Clear the last-error slot
    fn clear_error(&self);

    // --- Windows ---

    /// Create a window; `None` on failure
    fn create_window(
        &self,
        title: &str,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        flags: u32,
    ) -> Option<WindowId>;
    /// Destroy a window
    fn destroy_window(&self, window: WindowId);
    /// Numeric id carried by events targeting this window; `0` on failure
    fn window_numeric_id(&self, window: WindowId) -> u32;
    /// Client area size
    fn window_size(&self, window: WindowId) -> Option<(i32, i32)>;
    /// Resize the client area
    fn set_window_size(&self, window: WindowId, width: i32, height: i32) -> i32;
    /// Raw window flag bits; `0` for an unknown window
    fn window_flags(&self, window: WindowId) -> u32;
    /// Window title
    fn window_title(&self, window: WindowId) -> Option<String>;
    /// Change the window title
    fn set_window_title(&self, window: WindowId, title: &str) -> i32;
    /// Make the window visible
    fn show_window(&self, window: WindowId) -> i32;
    /// Hide the window
    fn hide_window(&self, window: WindowId) -> i32;

    // --- Renderers ---

    /// Create a renderer bound to a window; `None` on failure
    fn create_renderer(&self, window: WindowId, index: i32, flags: u32) -> Option<RendererId>;
    /// Destroy a renderer
    fn destroy_renderer(&self, renderer: RendererId);
    /// Size of the renderer's default target
    fn renderer_output_size(&self, renderer: RendererId) -> Option<(i32, i32)>;
    /// Set the coordinate scale
    fn set_render_scale(&self, renderer: RendererId, scale_x: f32, scale_y: f32) -> i32;
    /// Current coordinate scale
    fn render_scale(&self, renderer: RendererId) -> Option<(f32, f32)>;
    /// Set the blend mode used by drawing primitives
    fn set_draw_blend_mode(&self, renderer: RendererId, mode: u32) -> i32;
    /// Current draw blend mode
    fn draw_blend_mode(&self, renderer: RendererId) -> Option<u32>;
    /// Set the drawing area; `None` selects the whole target
    fn set_viewport(&self, renderer: RendererId, rect: Option<&Rect<i32>>) -> i32;
    /// Current drawing area
    fn viewport(&self, renderer: RendererId) -> Option<Rect<i32>>;
    /// Redirect drawing into a texture; `None` selects the default target
    fn set_render_target(&self, renderer: RendererId, texture: Option<TextureId>) -> i32;
    /// Current render target; `None` is the default target
    fn render_target(&self, renderer: RendererId) -> Option<TextureId>;
    /// Set the color used by clear, point, line and fill primitives
    fn set_draw_color(&self, renderer: RendererId, color: Color) -> i32;
    /// Current draw color
    fn draw_color(&self, renderer: RendererId) -> Option<Color>;
    /// Fill the current target with the draw color, ignoring the viewport
    fn render_clear(&self, renderer: RendererId) -> i32;
    /// Make the back buffer visible; cannot fail
    fn render_present(&self, renderer: RendererId);
    /// Draw a single point
    fn draw_point(&self, renderer: RendererId, x: i32, y: i32) -> i32;
    /// Draw a single point at float coordinates
    fn draw_point_f(&self, renderer: RendererId, x: f32, y: f32) -> i32;
    /// Draw a line segment
    fn draw_line(&self, renderer: RendererId, x1: i32, y1: i32, x2: i32, y2: i32) -> i32;
    /// Draw a line segment at float coordinates
    fn draw_line_f(&self, renderer: RendererId, x1: f32, y1: f32, x2: f32, y2: f32) -> i32;
    /// Fill a rectangle; `None` fills the viewport
    fn fill_rect(&self, renderer: RendererId, rect: Option<&Rect<i32>>) -> i32;
    /// Fill a float rectangle; `None` fills the viewport
    fn fill_rect_f(&self, renderer: RendererId, rect: Option<&Rect<f32>>) -> i32;
    /// Fill several rectangles
    fn fill_rects(&self, renderer: RendererId, rects: &[Rect<i32>]) -> i32;
    /// Fill several float rectangles
    fn fill_rects_f(&self, renderer: RendererId, rects: &[Rect<f32>]) -> i32;
    /// Copy a texture region to the target
    fn render_copy(
        &self,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<i32>>,
    ) -> i32;
    /// Copy a texture region to a float destination on the target
    fn render_copy_f(
        &self,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<f32>>,
    ) -> i32;
    /// Read back pixels of the current target
    fn read_pixels(&self, renderer: RendererId, rect: Option<&Rect<i32>>) -> Option<Vec<Color>>;

    // --- Textures ---

    /// Create a blank texture owned by a renderer
    fn create_texture(
        &self,
        renderer: RendererId,
        format: u32,
        access: i32,
        width: i32,
        height: i32,
    ) -> Option<TextureId>;
    /// Create a static texture holding a copy of a surface
    fn create_texture_from_surface(&self, renderer: RendererId, surface: SurfaceId) -> Option<TextureId>;
    /// Destroy a texture
    fn destroy_texture(&self, texture: TextureId);
    /// Query texture attributes
    fn query_texture(&self, texture: TextureId) -> Option<TextureQuery>;
    /// Replace texture pixels in a region; `None` is the whole texture
    fn update_texture(&self, texture: TextureId, rect: Option<&Rect<i32>>, pixels: &[Color]) -> i32;

    // --- Surfaces ---

    /// Create a zero-filled surface
    fn create_surface(&self, width: i32, height: i32, format: u32) -> Option<SurfaceId>;
    /// Create a surface holding a copy of `pixels`
    fn create_surface_from(
        &self,
        width: i32,
        height: i32,
        format: u32,
        pixels: &[Color],
    ) -> Option<SurfaceId>;
    /// Decode a bitmap file
    fn load_bmp(&self, path: &Path) -> Option<SurfaceId>;
    /// Encode a surface as a bitmap file
    fn save_bmp(&self, surface: SurfaceId, path: &Path) -> i32;
    /// Free a surface
    fn free_surface(&self, surface: SurfaceId);
    /// Create a converted copy of a surface
    fn convert_surface(&self, surface: SurfaceId, format: u32, flags: u32) -> Option<SurfaceId>;
    /// Query surface attributes
    fn surface_info(&self, surface: SurfaceId) -> Option<SurfaceInfo>;
    /// Copy of the surface pixels, row-major
    fn surface_pixels(&self, surface: SurfaceId) -> Option<Vec<Color>>;
    /// Fill a surface region with a color; `None` is the whole surface
    fn fill_surface_rect(&self, surface: SurfaceId, rect: Option<&Rect<i32>>, color: Color) -> i32;

    // --- Byte streams ---

    /// Open a file stream with a C `fopen`-style mode
    fn stream_from_file(&self, path: &Path, mode: &str) -> Option<StreamId>;
    /// Open a read/write stream over an in-memory buffer
    fn stream_from_memory(&self, data: Vec<u8>) -> Option<StreamId>;
    /// Close a stream, flushing pending writes
    fn stream_close(&self, stream: StreamId) -> i32;
    /// Read up to `maxnum` objects of `size` bytes; `0` on error or end of stream
    fn stream_read(&self, stream: StreamId, buffer: &mut [u8], size: usize, maxnum: usize) -> usize;
    /// Write `num` objects of `size` bytes; returns the number written
    fn stream_write(&self, stream: StreamId, data: &[u8], size: usize, num: usize) -> usize;
    /// Seek; returns the new offset or `-1`
    fn stream_seek(&self, stream: StreamId, offset: i64, whence: i32) -> i64;
    /// Total stream size or `-1`
    fn stream_size(&self, stream: StreamId) -> i64;

    // --- Events ---

    /// Gather pending input into the event queue
    fn pump_events(&self);
    /// Pop the next event without blocking
    fn poll_event(&self) -> Option<Event>;
    /// Wait for an event; `timeout_ms < 0` waits forever.
    ///
    /// Returns `1` with `event` filled, `0` on timeout, negative on failure.
    fn wait_event_timeout(&self, event: &mut Option<Event>, timeout_ms: i32) -> i32;
    /// Append an event; `1` queued, `0` dropped by the filter, negative on failure
    fn push_event(&self, event: Event) -> i32;
    /// Reserve `count` user event types; returns the first or `u32::MAX`
    fn register_events(&self, count: i32) -> u32;
    /// Drop queued events whose type lies in `min..=max`
    fn flush_events(&self, min: u32, max: u32);
    /// Install or remove the event filter
    fn set_event_filter(&self, filter: Option<EventFilter>);
    /// Whether an event filter is installed
    fn has_event_filter(&self) -> bool;
    /// Add a watch callback that sees every queued event; returns its id
    fn add_event_watch(&self, watch: EventFilter) -> u64;
    /// Remove a watch callback
    fn del_event_watch(&self, id: u64);

    // --- Image extension ---

    /// Initialize image format support; returns the formats now available
    fn image_init(&self, flags: u32) -> u32;
    /// Unload image format support
    fn image_quit(&self);
    /// Decode any supported image file
    fn image_load(&self, path: &Path) -> Option<SurfaceId>;
    /// Rasterize an SVG document read from a stream at the given size
    fn image_load_sized_svg(&self, source: StreamId, width: i32, height: i32) -> Option<SurfaceId>;
}
