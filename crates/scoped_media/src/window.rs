//! Windows: configuration, factories and the borrowing accessor

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::context::Context;
use crate::error::{self, MediaError, MediaResult};
use crate::handle::WindowHandle;
use crate::platform::WindowId;

bitflags! {
    /// Window creation and state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WindowFlags: u32 {
        /// Fullscreen window
        const FULLSCREEN = 0x0000_0001;
        /// Usable with an OpenGL context
        const OPENGL = 0x0000_0002;
        /// Visible
        const SHOWN = 0x0000_0004;
        /// Not visible
        const HIDDEN = 0x0000_0008;
        /// No decorations
        const BORDERLESS = 0x0000_0010;
        /// Resizable by the user
        const RESIZABLE = 0x0000_0020;
        /// Minimized
        const MINIMIZED = 0x0000_0040;
        /// Maximized
        const MAXIMIZED = 0x0000_0080;
        /// Has input focus
        const INPUT_FOCUS = 0x0000_0200;
        /// Usable with Vulkan
        const VULKAN = 0x1000_0000;
    }
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Let the window manager choose the position
pub const WINDOW_POS_UNDEFINED: i32 = 0x1FFF_0000;
/// Center the window on the display
pub const WINDOW_POS_CENTERED: i32 = 0x2FFF_0000;

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Horizontal position or one of the `WINDOW_POS_*` markers
    pub x_position: i32,
    /// Vertical position or one of the `WINDOW_POS_*` markers
    pub y_position: i32,
    /// Client area width in pixels
    pub width: i32,
    /// Client area height in pixels
    pub height: i32,
    /// Creation flags
    pub flags: WindowFlags,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "scoped_media".to_string(),
            x_position: WINDOW_POS_UNDEFINED,
            y_position: WINDOW_POS_UNDEFINED,
            width: 640,
            height: 480,
            flags: WindowFlags::empty(),
        }
    }
}

impl Config for WindowConfig {}

/// Create a window from discrete parameters
pub fn make_window(
    context: &Context,
    title: &str,
    x_position: i32,
    y_position: i32,
    width: i32,
    height: i32,
    flags: WindowFlags,
) -> MediaResult<WindowHandle> {
    let platform = context.platform();
    let raw = platform.create_window(title, x_position, y_position, width, height, flags.bits());
    let raw = error::non_null(platform, raw, MediaError::WindowCreation)?;
    log::debug!("Created window '{title}' {width}x{height}");
    Ok(WindowHandle::adopt(context, raw))
}

/// Create a window from a configuration struct
pub fn make_window_from_config(context: &Context, config: &WindowConfig) -> MediaResult<WindowHandle> {
    make_window(
        context,
        &config.title,
        config.x_position,
        config.y_position,
        config.width,
        config.height,
        config.flags,
    )
}

/// Window accessor
///
/// Every method borrows the owned handle for one native call.
///
/// # Panics
/// All methods panic if the wrapped handle is empty.
#[derive(Debug, Default)]
pub struct Window {
    handle: WindowHandle,
}

impl Window {
    /// Create a window from discrete parameters
    pub fn new(
        context: &Context,
        title: &str,
        x_position: i32,
        y_position: i32,
        width: i32,
        height: i32,
        flags: WindowFlags,
    ) -> MediaResult<Self> {
        make_window(context, title, x_position, y_position, width, height, flags).map(Self::from_handle)
    }

    /// Create a window from a configuration struct
    pub fn from_config(context: &Context, config: &WindowConfig) -> MediaResult<Self> {
        make_window_from_config(context, config).map(Self::from_handle)
    }

    /// Wrap an owned handle
    pub const fn from_handle(handle: WindowHandle) -> Self {
        Self { handle }
    }

    /// The owned handle
    pub const fn handle(&self) -> &WindowHandle {
        &self.handle
    }

    /// Mutable access to the owned handle, e.g. to close it early
    pub fn handle_mut(&mut self) -> &mut WindowHandle {
        &mut self.handle
    }

    /// Unwrap into the owned handle
    pub fn into_handle(self) -> WindowHandle {
        self.handle
    }

    /// Raw reference for borrowing
    pub fn raw(&self) -> Option<WindowId> {
        self.handle.as_raw()
    }

    /// Numeric id used by events targeting this window
    pub fn id(&self) -> u32 {
        let (platform, raw) = self.handle.borrow();
        platform.window_numeric_id(raw)
    }

    /// Client area size as `(width, height)`
    pub fn size(&self) -> MediaResult<(i32, i32)> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.window_size(raw), MediaError::render("query window size"))
    }

    /// Client area width
    pub fn width(&self) -> MediaResult<i32> {
        self.size().map(|(width, _)| width)
    }

    /// Client area height
    pub fn height(&self) -> MediaResult<i32> {
        self.size().map(|(_, height)| height)
    }

    /// Resize the client area
    pub fn set_size(&self, width: i32, height: i32) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_window_size(raw, width, height);
        error::status(platform, code, MediaError::render("set window size")).map(drop)
    }

    /// Current window flags
    pub fn flags(&self) -> WindowFlags {
        let (platform, raw) = self.handle.borrow();
        WindowFlags::from_bits_truncate(platform.window_flags(raw))
    }

    /// Whether the window is visible
    pub fn shown(&self) -> bool {
        self.flags().contains(WindowFlags::SHOWN)
    }

    /// Whether the window is hidden
    pub fn hidden(&self) -> bool {
        self.flags().contains(WindowFlags::HIDDEN)
    }

    /// Make the window visible
    pub fn show(&self) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        error::status(platform, platform.show_window(raw), MediaError::render("show window")).map(drop)
    }

    /// Hide the window
    pub fn hide(&self) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        error::status(platform, platform.hide_window(raw), MediaError::render("hide window")).map(drop)
    }

    /// Title bar text
    pub fn title(&self) -> MediaResult<String> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.window_title(raw), MediaError::render("query window title"))
    }

    /// Change the title bar text
    pub fn set_title(&self, title: &str) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.set_window_title(raw, title);
        error::status(platform, code, MediaError::render("set window title")).map(drop)
    }
}
