//! Image-format extension: raster decoding and SVG rasterization into surfaces

use std::path::Path;
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::context::{Context, Runtime};
use crate::error::{self, MediaError, MediaResult};
use crate::geometry::Point;
use crate::handle::SurfaceHandle;
use crate::stream::{self, Stream};

bitflags! {
    /// Image formats to load support for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ImageInitFlags: u32 {
        /// JPEG
        const JPG = 0x0000_0001;
        /// PNG
        const PNG = 0x0000_0002;
        /// TIFF
        const TIF = 0x0000_0004;
        /// WebP
        const WEBP = 0x0000_0008;
        /// JPEG XL
        const JXL = 0x0000_0010;
        /// AVIF
        const AVIF = 0x0000_0020;
    }
}

/// Initialized image-format support; unloads it when dropped
pub struct ImageContext {
    runtime: Rc<Runtime>,
    formats: ImageInitFlags,
}

impl ImageContext {
    /// Formats that were successfully initialized
    pub const fn formats(&self) -> ImageInitFlags {
        self.formats
    }
}

impl Drop for ImageContext {
    fn drop(&mut self) {
        log::debug!("Unloading image formats {:?}", self.formats);
        self.runtime.platform().image_quit();
    }
}

impl std::fmt::Debug for ImageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageContext").field("formats", &self.formats).finish()
    }
}

/// Load support for the requested formats
///
/// Fails only when none of the requested formats could be initialized; check
/// [`ImageContext::formats`] for partial support.
pub fn init(context: &Context, flags: ImageInitFlags) -> MediaResult<ImageContext> {
    let platform = context.platform();
    let initialized = platform.image_init(flags.bits());
    if initialized & flags.bits() == 0 {
        return Err(MediaError::ImageInitialization(platform.last_error()));
    }

    let formats = ImageInitFlags::from_bits_truncate(initialized) & flags;
    if formats != flags {
        log::warn!("Image formats {:?} unavailable", flags - formats);
    }
    Ok(ImageContext {
        runtime: Rc::clone(context.runtime()),
        formats,
    })
}

/// Decode any supported raster image file into a surface
pub fn load_image<P: AsRef<Path>>(context: &Context, path: P) -> MediaResult<SurfaceHandle> {
    let path = path.as_ref();
    let platform = context.platform();
    let raw = error::non_null(platform, platform.image_load(path), MediaError::SurfaceLoad)?;
    log::debug!("Loaded image {}", path.display());
    Ok(SurfaceHandle::adopt(context, raw))
}

/// Rasterize an SVG document from a stream at `width` x `height`
///
/// A non-positive dimension is derived from the document's aspect ratio; both
/// non-positive keeps the document's own size.
pub fn load_sized_svg_rw(source: &Stream, width: i32, height: i32) -> MediaResult<SurfaceHandle> {
    let handle = source.handle();
    let (platform, raw_stream) = handle.borrow();
    let raw = platform.image_load_sized_svg(raw_stream, width, height);
    let raw = error::non_null(platform, raw, MediaError::VectorImageLoad)?;
    Ok(SurfaceHandle::from_raw(handle.runtime(), raw))
}

/// Rasterize an SVG file at `width` x `height`
///
/// The file is read through a temporary stream that is closed before this
/// function returns.
pub fn load_sized_svg<P: AsRef<Path>>(
    context: &Context,
    path: P,
    width: i32,
    height: i32,
) -> MediaResult<SurfaceHandle> {
    let source = Stream::from_handle(stream::rw_from_file(context, path, "r")?);
    load_sized_svg_rw(&source, width, height)
}

/// Rasterize an SVG file at the size given by a point
pub fn load_sized_svg_at<P: AsRef<Path>>(context: &Context, path: P, size: Point<i32>) -> MediaResult<SurfaceHandle> {
    load_sized_svg(context, path, size.x, size.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InitFlags;
    use crate::geometry::Color;
    use crate::platform::{HeadlessPlatform, ResourceClass};
    use crate::surface::Surface;

    const SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10">
  <rect x="0" y="0" width="10" height="10" fill="#ff0000"/>
</svg>"##;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("scoped_media_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_init_partial_support_succeeds() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let images = init(&context, ImageInitFlags::PNG | ImageInitFlags::AVIF).expect("png available");
        assert_eq!(images.formats(), ImageInitFlags::PNG);
    }

    #[test]
    fn test_init_without_any_support_fails() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let error = init(&context, ImageInitFlags::AVIF | ImageInitFlags::JXL).expect_err("unsupported");
        assert!(matches!(error, MediaError::ImageInitialization(_)));
        assert!(!error.message().is_empty());
    }

    #[test]
    fn test_sized_svg_from_memory_stream() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let source = Stream::from_memory(&context, SQUARE_SVG.as_bytes().to_vec()).expect("stream");

        let surface = Surface::from_handle(load_sized_svg_rw(&source, 20, 0).expect("svg"));
        assert_eq!(surface.size(), Ok(Point::new(20, 20)));
        assert_eq!(surface.pixels().expect("pixels")[210], Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_sized_svg_from_file_closes_temporary_stream() {
        let platform = HeadlessPlatform::new();
        let probe = platform.probe();
        let context = Context::init(platform, InitFlags::VIDEO).expect("init");
        let path = temp_path("square.svg");
        std::fs::write(&path, SQUARE_SVG).expect("write svg");

        let surface = load_sized_svg_at(&context, &path, Point::new(4, 8)).expect("svg");
        std::fs::remove_file(&path).ok();

        assert_eq!(Surface::from_handle(surface).size(), Ok(Point::new(4, 8)));
        assert_eq!(probe.created(ResourceClass::Stream), 1);
        assert_eq!(probe.live(ResourceClass::Stream), 0);
    }

    #[test]
    fn test_invalid_svg_fails_and_closes_stream() {
        let platform = HeadlessPlatform::new();
        let probe = platform.probe();
        let context = Context::init(platform, InitFlags::VIDEO).expect("init");
        let path = temp_path("broken.svg");
        std::fs::write(&path, "not an svg").expect("write");

        let error = load_sized_svg(&context, &path, 8, 8).expect_err("broken");
        std::fs::remove_file(&path).ok();

        assert!(matches!(error, MediaError::VectorImageLoad(_)));
        assert_eq!(probe.live(ResourceClass::Stream), 0);
    }

    #[test]
    fn test_missing_svg_reports_stream_open() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let error = load_sized_svg(&context, "/missing/icon.svg", 8, 8).expect_err("missing");
        assert!(matches!(error, MediaError::StreamOpen(_)));
    }

    #[test]
    fn test_load_png_image() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let path = temp_path("tiny.png");
        ::image::RgbaImage::from_pixel(3, 3, ::image::Rgba([0, 255, 0, 255]))
            .save(&path)
            .expect("write png");

        let surface = Surface::from_handle(load_image(&context, &path).expect("png"));
        std::fs::remove_file(&path).ok();
        assert_eq!(surface.size(), Ok(Point::new(3, 3)));
        assert_eq!(surface.pixels().expect("pixels")[4], Color::rgb(0, 255, 0));
    }

    #[test]
    fn test_load_garbage_fails() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let path = temp_path("garbage.png");
        std::fs::write(&path, b"garbage").expect("write");
        let error = load_image(&context, &path).expect_err("garbage");
        std::fs::remove_file(&path).ok();
        assert!(matches!(error, MediaError::SurfaceLoad(_)));
    }
}
