//! Textures: pixel formats, factories and the borrowing accessor

use crate::error::{self, MediaError, MediaResult};
use crate::geometry::{Color, Point, Rect};
use crate::handle::TextureHandle;
use crate::platform::TextureId;
use crate::renderer::Renderer;
use crate::surface::Surface;

/// Pixel layout of textures and surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// 32-bit, R in the most significant byte
    Rgba8888,
    /// 32-bit, A in the most significant byte
    Argb8888,
    /// 32-bit, A in the most significant byte, B last
    Abgr8888,
    /// 32-bit, B in the most significant byte
    Bgra8888,
    /// 24-bit color padded to 32 bits
    Rgb888,
}

impl PixelFormat {
    /// Byte-order RGBA on little-endian targets
    pub const RGBA32: Self = Self::Abgr8888;

    /// Native format value
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Rgba8888 => 0x1646_2004,
            Self::Argb8888 => 0x1636_2004,
            Self::Abgr8888 => 0x1676_2004,
            Self::Bgra8888 => 0x1686_2004,
            Self::Rgb888 => 0x1616_1804,
        }
    }

    /// Parse a native format value
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x1646_2004 => Some(Self::Rgba8888),
            0x1636_2004 => Some(Self::Argb8888),
            0x1676_2004 => Some(Self::Abgr8888),
            0x1686_2004 => Some(Self::Bgra8888),
            0x1616_1804 => Some(Self::Rgb888),
            _ => None,
        }
    }

    /// Whether pixels of this format carry alpha
    pub const fn has_alpha(self) -> bool {
        !matches!(self, Self::Rgb888)
    }
}

/// How a texture may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TextureAccess {
    /// Changes rarely
    Static,
    /// Changes frequently
    Streaming,
    /// Can be used as a render target
    Target,
}

impl TextureAccess {
    /// Native access value
    pub const fn to_raw(self) -> i32 {
        match self {
            Self::Static => 0,
            Self::Streaming => 1,
            Self::Target => 2,
        }
    }

    /// Parse a native access value
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Static),
            1 => Some(Self::Streaming),
            2 => Some(Self::Target),
            _ => None,
        }
    }
}

/// Texture creation parameters, also returned by [`Texture::properties`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureProperties {
    /// Pixel layout
    pub format: PixelFormat,
    /// Intended use
    pub access: TextureAccess,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl TextureProperties {
    /// Replace width and height from a size point
    pub fn set_size(&mut self, size: Point<i32>) {
        self.width = size.x;
        self.height = size.y;
    }
}

/// Create a blank texture owned by `renderer`
pub fn make_texture(
    renderer: &Renderer,
    format: PixelFormat,
    access: TextureAccess,
    width: i32,
    height: i32,
) -> MediaResult<TextureHandle> {
    let handle = renderer.handle();
    let (platform, raw_renderer) = handle.borrow();
    let raw = platform.create_texture(raw_renderer, format.to_raw(), access.to_raw(), width, height);
    let raw = error::non_null(platform, raw, MediaError::TextureCreation)?;
    log::debug!("Created {access:?} texture {width}x{height} ({format:?})");
    Ok(TextureHandle::from_raw(handle.runtime(), raw))
}

/// Create a blank texture from a properties struct
pub fn make_texture_with_properties(
    renderer: &Renderer,
    properties: &TextureProperties,
) -> MediaResult<TextureHandle> {
    make_texture(
        renderer,
        properties.format,
        properties.access,
        properties.width,
        properties.height,
    )
}

/// Create a static texture holding a copy of `surface`
///
/// The surface stays owned by the caller.
pub fn make_texture_from_surface(renderer: &Renderer, surface: &Surface) -> MediaResult<TextureHandle> {
    let handle = renderer.handle();
    let raw_surface = error::sibling(
        handle,
        surface.handle(),
        "Surface belongs to another context",
        MediaError::TextureFromSurface,
    )?;
    let (platform, raw_renderer) = handle.borrow();
    let raw = platform.create_texture_from_surface(raw_renderer, raw_surface);
    let raw = error::non_null(platform, raw, MediaError::TextureFromSurface)?;
    Ok(TextureHandle::from_raw(handle.runtime(), raw))
}

/// Texture accessor
///
/// # Panics
/// All methods panic if the wrapped handle is empty.
#[derive(Debug, Default)]
pub struct Texture {
    handle: TextureHandle,
}

impl Texture {
    /// Wrap an owned handle
    pub const fn from_handle(handle: TextureHandle) -> Self {
        Self { handle }
    }

    /// The owned handle
    pub const fn handle(&self) -> &TextureHandle {
        &self.handle
    }

    /// Mutable access to the owned handle
    pub fn handle_mut(&mut self) -> &mut TextureHandle {
        &mut self.handle
    }

    /// Unwrap into the owned handle
    pub fn into_handle(self) -> TextureHandle {
        self.handle
    }

    /// Raw reference for borrowing
    pub fn raw(&self) -> Option<TextureId> {
        self.handle.as_raw()
    }

    /// Format, access and size in one query
    pub fn properties(&self) -> MediaResult<TextureProperties> {
        let (platform, raw) = self.handle.borrow();
        let query = error::non_null(platform, platform.query_texture(raw), MediaError::render("query texture"))?;
        let format = PixelFormat::from_raw(query.format);
        let access = TextureAccess::from_raw(query.access);
        match (format, access) {
            (Some(format), Some(access)) => Ok(TextureProperties {
                format,
                access,
                width: query.width,
                height: query.height,
            }),
            _ => Err(MediaError::Render {
                operation: "query texture",
                message: format!("unrecognized format {:#x} or access {}", query.format, query.access),
            }),
        }
    }

    /// Pixel layout
    pub fn format(&self) -> MediaResult<PixelFormat> {
        self.properties().map(|properties| properties.format)
    }

    /// Intended use
    pub fn access(&self) -> MediaResult<TextureAccess> {
        self.properties().map(|properties| properties.access)
    }

    /// Width in pixels
    pub fn width(&self) -> MediaResult<i32> {
        self.properties().map(|properties| properties.width)
    }

    /// Height in pixels
    pub fn height(&self) -> MediaResult<i32> {
        self.properties().map(|properties| properties.height)
    }

    /// Size as a point
    pub fn size(&self) -> MediaResult<Point<i32>> {
        self.properties()
            .map(|properties| Point::new(properties.width, properties.height))
    }

    /// Replace the pixels of `rect` (or the whole texture) with `pixels`, row-major
    pub fn update(&self, rect: Option<Rect<i32>>, pixels: &[Color]) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.update_texture(raw, rect.as_ref(), pixels);
        error::status(platform, code, MediaError::render("update texture")).map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, InitFlags};
    use crate::renderer::RendererFlags;
    use crate::window::{Window, WindowFlags};

    fn renderer(context: &Context) -> (Window, Renderer) {
        let window = Window::new(context, "tex", 0, 0, 16, 16, WindowFlags::HIDDEN).expect("window");
        let renderer = Renderer::new(&window, -1, RendererFlags::empty()).expect("renderer");
        (window, renderer)
    }

    #[test]
    fn test_properties_round_trip() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let (_window, renderer) = renderer(&context);
        let mut requested = TextureProperties {
            format: PixelFormat::Argb8888,
            access: TextureAccess::Streaming,
            width: 0,
            height: 0,
        };
        requested.set_size(Point::new(32, 8));

        let texture = renderer.create_texture_with_properties(&requested).expect("texture");
        assert_eq!(texture.properties(), Ok(requested));
        assert_eq!(texture.size(), Ok(Point::new(32, 8)));
        assert_eq!(texture.format(), Ok(PixelFormat::Argb8888));
        assert_eq!(texture.access(), Ok(TextureAccess::Streaming));
    }

    #[test]
    fn test_zero_size_fails_with_texture_error() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let (_window, renderer) = renderer(&context);

        let error = make_texture(&renderer, PixelFormat::Rgba8888, TextureAccess::Static, 0, 4)
            .expect_err("zero width");
        assert!(matches!(error, MediaError::TextureCreation(_)));
        assert_eq!(error.message(), "Texture dimensions can't be 0");
    }

    #[test]
    fn test_update_wrong_length_fails() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let (_window, renderer) = renderer(&context);
        let texture = renderer
            .create_texture(PixelFormat::Rgba8888, TextureAccess::Streaming, 2, 2)
            .expect("texture");

        texture.update(None, &[Color::WHITE; 4]).expect("full update");
        assert!(texture.update(Some(Rect::new(0, 0, 2, 2)), &[Color::WHITE; 3]).is_err());
    }

    #[test]
    fn test_unknown_raw_values_are_rejected() {
        assert_eq!(PixelFormat::from_raw(0x1646_2004), Some(PixelFormat::Rgba8888));
        assert_eq!(PixelFormat::from_raw(0), None);
        assert_eq!(TextureAccess::from_raw(7), None);
        assert!(!PixelFormat::Rgb888.has_alpha());
    }
}
