//! Image decoding and encoding for the headless platform
//!
//! Raster formats go through the `image` crate; SVG documents are parsed with
//! `usvg` and rasterized with `resvg` onto a `tiny-skia` pixmap.

use std::path::Path;

use ::image::{ImageFormat, RgbaImage};
use resvg::{tiny_skia, usvg};

use super::canvas::Canvas;
use crate::geometry::Color;

fn canvas_from_image(image: &::image::DynamicImage) -> Result<Canvas, String> {
    let rgba = image.to_rgba8();
    let width = i32::try_from(rgba.width()).map_err(|_| "Image too wide".to_string())?;
    let height = i32::try_from(rgba.height()).map_err(|_| "Image too tall".to_string())?;
    let pixels: Vec<Color> = bytemuck::cast_slice(rgba.as_raw()).to_vec();
    Canvas::from_pixels(width, height, pixels).ok_or_else(|| "Corrupt image data".to_string())
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|error| format!("Couldn't open {}: {error}", path.display()))
}

/// Decode a BMP file
pub(crate) fn decode_bmp(path: &Path) -> Result<Canvas, String> {
    let data = read_file(path)?;
    let image = ::image::load_from_memory_with_format(&data, ImageFormat::Bmp)
        .map_err(|error| format!("File is not a Windows BMP file: {error}"))?;
    canvas_from_image(&image)
}

/// Decode any raster format the `image` crate recognizes
pub(crate) fn decode_image(path: &Path) -> Result<Canvas, String> {
    let data = read_file(path)?;
    let image = ::image::load_from_memory(&data).map_err(|error| format!("Unsupported image format: {error}"))?;
    canvas_from_image(&image)
}

/// Encode as a 32-bit BMP file
pub(crate) fn encode_bmp(canvas: &Canvas, path: &Path) -> Result<(), String> {
    let width = u32::try_from(canvas.width()).map_err(|_| "Invalid surface width".to_string())?;
    let height = u32::try_from(canvas.height()).map_err(|_| "Invalid surface height".to_string())?;
    let bytes = bytemuck::cast_slice::<Color, u8>(canvas.pixels()).to_vec();
    let image = RgbaImage::from_raw(width, height, bytes).ok_or_else(|| "Corrupt surface data".to_string())?;
    image
        .save_with_format(path, ImageFormat::Bmp)
        .map_err(|error| format!("Couldn't write {}: {error}", path.display()))
}

/// Output size for a document of `natural` size asked to render at `requested`
///
/// Non-positive requested dimensions follow the document's aspect ratio.
fn output_size(natural: (f32, f32), requested: (i32, i32)) -> (u32, u32) {
    let (natural_width, natural_height) = natural;
    let (width, height) = match requested {
        (width, height) if width > 0 && height > 0 => (width as f32, height as f32),
        (width, _) if width > 0 => (width as f32, width as f32 * natural_height / natural_width),
        (_, height) if height > 0 => (height as f32 * natural_width / natural_height, height as f32),
        _ => (natural_width, natural_height),
    };
    (width.round().max(1.0) as u32, height.round().max(1.0) as u32)
}

/// Rasterize an SVG document
pub(crate) fn rasterize_svg(data: &[u8], width: i32, height: i32) -> Result<Canvas, String> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|error| format!("Couldn't parse SVG image: {error}"))?;
    let natural = tree.size();
    let (out_width, out_height) = output_size((natural.width(), natural.height()), (width, height));

    let mut pixmap = tiny_skia::Pixmap::new(out_width, out_height)
        .ok_or_else(|| format!("Couldn't allocate {out_width}x{out_height} image"))?;
    let transform = tiny_skia::Transform::from_scale(
        out_width as f32 / natural.width(),
        out_height as f32 / natural.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let pixels = pixmap
        .pixels()
        .iter()
        .map(|pixel| {
            let color = pixel.demultiply();
            Color::rgba(color.red(), color.green(), color.blue(), color.alpha())
        })
        .collect();
    let width = i32::try_from(out_width).map_err(|_| "SVG output too wide".to_string())?;
    let height = i32::try_from(out_height).map_err(|_| "SVG output too tall".to_string())?;
    Canvas::from_pixels(width, height, pixels).ok_or_else(|| "Corrupt SVG raster".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_keeps_aspect_ratio() {
        assert_eq!(output_size((10.0, 20.0), (5, 0)), (5, 10));
        assert_eq!(output_size((10.0, 20.0), (0, 40)), (20, 40));
        assert_eq!(output_size((10.0, 20.0), (0, 0)), (10, 20));
        assert_eq!(output_size((10.0, 20.0), (3, 3)), (3, 3));
    }

    #[test]
    fn test_rasterize_half_filled_document() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="2">
  <rect x="0" y="0" width="2" height="2" fill="#0000ff"/>
</svg>"##;
        let canvas = rasterize_svg(svg, 0, 0).expect("svg");
        assert_eq!((canvas.width(), canvas.height()), (4, 2));
        assert_eq!(canvas.pixels()[0], Color::rgb(0, 0, 255));
        assert_eq!(canvas.pixels()[3].a, 0);
    }

    #[test]
    fn test_rasterize_rejects_garbage() {
        assert!(rasterize_svg(b"<html>", 4, 4).is_err());
    }
}
