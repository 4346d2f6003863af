//! CPU-side pixel surfaces

use std::path::Path;

use crate::context::Context;
use crate::error::{self, MediaError, MediaResult};
use crate::geometry::{Color, Point, Rect};
use crate::handle::SurfaceHandle;
use crate::platform::{SurfaceId, SurfaceInfo};
use crate::texture::PixelFormat;

/// Decode a bitmap file into a new surface
pub fn load_bmp<P: AsRef<Path>>(context: &Context, path: P) -> MediaResult<SurfaceHandle> {
    let path = path.as_ref();
    let platform = context.platform();
    let raw = error::non_null(platform, platform.load_bmp(path), MediaError::SurfaceLoad)?;
    log::debug!("Loaded bitmap {}", path.display());
    Ok(SurfaceHandle::adopt(context, raw))
}

/// Allocate a zero-filled surface
pub fn make_surface(context: &Context, width: i32, height: i32, format: PixelFormat) -> MediaResult<SurfaceHandle> {
    let platform = context.platform();
    let raw = platform.create_surface(width, height, format.to_raw());
    let raw = error::non_null(platform, raw, MediaError::SurfaceCreation)?;
    Ok(SurfaceHandle::adopt(context, raw))
}

/// Allocate a surface holding a copy of `pixels`, row-major
pub fn make_surface_from_pixels(
    context: &Context,
    width: i32,
    height: i32,
    format: PixelFormat,
    pixels: &[Color],
) -> MediaResult<SurfaceHandle> {
    let platform = context.platform();
    let raw = platform.create_surface_from(width, height, format.to_raw(), pixels);
    let raw = error::non_null(platform, raw, MediaError::SurfaceCreation)?;
    Ok(SurfaceHandle::adopt(context, raw))
}

/// Convert `surface` to another pixel format
///
/// Takes ownership of the source: it is released when this call returns,
/// whether or not the conversion succeeded.
pub fn convert_surface(surface: SurfaceHandle, format: PixelFormat, flags: u32) -> MediaResult<SurfaceHandle> {
    let (platform, raw) = surface.borrow();
    let converted = platform.convert_surface(raw, format.to_raw(), flags);
    let converted = error::non_null(platform, converted, MediaError::SurfaceConversion)?;
    Ok(SurfaceHandle::from_raw(surface.runtime(), converted))
}

/// Surface accessor
///
/// # Panics
/// All methods panic if the wrapped handle is empty.
#[derive(Debug, Default)]
pub struct Surface {
    handle: SurfaceHandle,
}

impl Surface {
    /// Decode a bitmap file
    pub fn load_bmp<P: AsRef<Path>>(context: &Context, path: P) -> MediaResult<Self> {
        load_bmp(context, path).map(Self::from_handle)
    }

    /// Allocate a zero-filled surface
    pub fn new(context: &Context, width: i32, height: i32, format: PixelFormat) -> MediaResult<Self> {
        make_surface(context, width, height, format).map(Self::from_handle)
    }

    /// Allocate a surface holding a copy of `pixels`
    pub fn from_pixels(
        context: &Context,
        width: i32,
        height: i32,
        format: PixelFormat,
        pixels: &[Color],
    ) -> MediaResult<Self> {
        make_surface_from_pixels(context, width, height, format, pixels).map(Self::from_handle)
    }

    /// Wrap an owned handle
    pub const fn from_handle(handle: SurfaceHandle) -> Self {
        Self { handle }
    }

    /// The owned handle
    pub const fn handle(&self) -> &SurfaceHandle {
        &self.handle
    }

    /// Mutable access to the owned handle
    pub fn handle_mut(&mut self) -> &mut SurfaceHandle {
        &mut self.handle
    }

    /// Unwrap into the owned handle
    pub fn into_handle(self) -> SurfaceHandle {
        self.handle
    }

    /// Raw reference for borrowing
    pub fn raw(&self) -> Option<SurfaceId> {
        self.handle.as_raw()
    }

    fn info(&self) -> MediaResult<SurfaceInfo> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.surface_info(raw), MediaError::render("query surface"))
    }

    /// Width in pixels
    pub fn width(&self) -> MediaResult<i32> {
        self.info().map(|info| info.width)
    }

    /// Height in pixels
    pub fn height(&self) -> MediaResult<i32> {
        self.info().map(|info| info.height)
    }

    /// Size as a point
    pub fn size(&self) -> MediaResult<Point<i32>> {
        self.info().map(|info| Point::new(info.width, info.height))
    }

    /// Pixel layout
    pub fn format(&self) -> MediaResult<PixelFormat> {
        let info = self.info()?;
        PixelFormat::from_raw(info.format).ok_or_else(|| MediaError::Render {
            operation: "query surface",
            message: format!("unrecognized format {:#x}", info.format),
        })
    }

    /// Copy of the pixel data, row-major
    pub fn pixels(&self) -> MediaResult<Vec<Color>> {
        let (platform, raw) = self.handle.borrow();
        error::non_null(platform, platform.surface_pixels(raw), MediaError::render("read surface"))
    }

    /// Fill `rect` (or the whole surface) with `color`
    pub fn fill_rect(&self, rect: Option<Rect<i32>>, color: Color) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.fill_surface_rect(raw, rect.as_ref(), color);
        error::status(platform, code, MediaError::render("fill surface")).map(drop)
    }

    /// Encode as a bitmap file
    pub fn save_bmp<P: AsRef<Path>>(&self, path: P) -> MediaResult<()> {
        let (platform, raw) = self.handle.borrow();
        let code = platform.save_bmp(raw, path.as_ref());
        error::status(platform, code, MediaError::render("save bitmap")).map(drop)
    }

    /// Convert to another pixel format, consuming this surface
    pub fn convert(self, format: PixelFormat) -> MediaResult<Self> {
        convert_surface(self.handle, format, 0).map(Self::from_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InitFlags;
    use crate::platform::{HeadlessPlatform, ResourceClass};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("scoped_media_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_missing_bitmap_fails_with_message() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let error = load_bmp(&context, "/definitely/not/here.bmp").expect_err("missing file");
        assert!(matches!(error, MediaError::SurfaceLoad(_)));
        assert!(!error.message().is_empty());
        assert_eq!(error.message(), context.last_error());
    }

    #[test]
    fn test_save_and_reload_bitmap() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let surface = Surface::new(&context, 3, 2, PixelFormat::Rgba8888).expect("surface");
        surface.fill_rect(None, Color::rgb(10, 20, 30)).expect("fill");
        surface
            .fill_rect(Some(Rect::new(2, 1, 1, 1)), Color::rgb(200, 100, 50))
            .expect("fill");

        let path = temp_path("reload.bmp");
        surface.save_bmp(&path).expect("save");
        let loaded = Surface::load_bmp(&context, &path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.size(), Ok(Point::new(3, 2)));
        let pixels = loaded.pixels().expect("pixels");
        assert_eq!(pixels[0], Color::rgb(10, 20, 30));
        assert_eq!(pixels[5], Color::rgb(200, 100, 50));
    }

    #[test]
    fn test_conversion_releases_source() {
        let platform = HeadlessPlatform::new();
        let probe = platform.probe();
        let context = Context::init(platform, InitFlags::VIDEO).expect("init");

        let pixels = [Color::rgba(1, 2, 3, 4); 4];
        let surface = Surface::from_pixels(&context, 2, 2, PixelFormat::Rgba8888, &pixels).expect("surface");
        let converted = surface.convert(PixelFormat::Rgb888).expect("convert");

        assert_eq!(probe.released(ResourceClass::Surface), 1);
        assert_eq!(converted.format(), Ok(PixelFormat::Rgb888));
        assert_eq!(converted.pixels().expect("pixels")[0], Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_failed_conversion_still_releases_source() {
        let platform = HeadlessPlatform::new();
        let probe = platform.probe();
        let context = Context::init(platform, InitFlags::VIDEO).expect("init");
        let surface = make_surface(&context, 2, 2, PixelFormat::Rgba8888).expect("surface");

        let error = convert_surface(surface, PixelFormat::Rgba8888, 0xFF).expect_err("bad flags");
        assert!(matches!(error, MediaError::SurfaceConversion(_)));
        assert_eq!(probe.released(ResourceClass::Surface), 1);
        assert_eq!(probe.live(ResourceClass::Surface), 0);
    }

    #[test]
    fn test_fill_far_outside_leaves_pixels() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let surface = Surface::new(&context, 2, 2, PixelFormat::Rgba8888).expect("surface");
        let before = surface.pixels().expect("pixels");

        surface.fill_rect(Some(Rect::new(i32::MAX - 1, 0, 10, 10)), Color::WHITE).expect("fill");
        surface.fill_rect(Some(Rect::new(i32::MIN, i32::MIN, 5, 5)), Color::WHITE).expect("fill");
        assert_eq!(surface.pixels(), Ok(before));
    }

    #[test]
    fn test_pixel_count_mismatch_fails() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let error = Surface::from_pixels(&context, 2, 2, PixelFormat::Rgba8888, &[Color::BLACK; 3])
            .expect_err("short buffer");
        assert!(matches!(error, MediaError::SurfaceCreation(_)));
    }
}
