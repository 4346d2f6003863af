//! Sketch demo application
//!
//! Draws a small scene through the headless backend: integer and float
//! primitives, a texture built from a surface, an optional SVG icon and a
//! pointer trail fed by a simulated input thread. The last frame is written to
//! a bitmap when the input thread sends `Quit`.
//!
//! Usage: `sketch_demo [config.ron | config.toml]`

mod config;

use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use scoped_media::config::ConfigError;
use scoped_media::image;
use scoped_media::logging;
use scoped_media::platform::{EventInjector, HeadlessPlatform};
use scoped_media::prelude::*;

use crate::config::SketchConfig;

/// Errors that end the demo
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// A native call failed
    #[error(transparent)]
    Media(#[from] MediaError),
    /// The settings file could not be read
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The input thread panicked
    #[error("input thread panicked")]
    InputThread,
}

const TRAIL_COLOR: Color = Color::rgb(250, 210, 90);
const TILE_COLORS: [Color; 4] = [
    Color::rgb(220, 60, 60),
    Color::rgb(60, 200, 90),
    Color::rgb(70, 110, 230),
    Color::WHITE,
];

pub struct SketchApp {
    // Drop order: textures before the renderer, the renderer before the window.
    icon: Option<Texture>,
    tiles: Texture,
    renderer: Renderer,
    window: Window,
    pump: EventPump,
    context: Context,
    config: SketchConfig,
    trail: Vec<Point<i32>>,
    frames: u32,
}

impl SketchApp {
    pub fn new(context: Context, config: SketchConfig) -> Result<Self, AppError> {
        log::info!("Creating sketch window...");
        let window = Window::from_config(&context, &config.window)?;
        let renderer = Renderer::from_config(&window, &config.renderer)?;
        log::info!("Renderer created ({:?})", renderer.output_size()?);

        let surface = Surface::from_pixels(&context, 2, 2, PixelFormat::Rgba8888, &TILE_COLORS)?;
        let tiles = renderer.create_texture_from_surface(&surface)?;

        let icon = match &config.svg_path {
            Some(path) => Some(Self::load_icon(&context, &renderer, path)?),
            None => None,
        };

        Ok(Self {
            icon,
            tiles,
            renderer,
            window,
            pump: context.event_pump(),
            context,
            config,
            trail: Vec::new(),
            frames: 0,
        })
    }

    fn load_icon(context: &Context, renderer: &Renderer, path: &Path) -> Result<Texture, AppError> {
        log::info!("Rasterizing {}", path.display());
        let _formats = image::init(context, image::ImageInitFlags::PNG)?;
        let surface = Surface::from_handle(image::load_sized_svg(context, path, 48, 0)?);
        Ok(renderer.create_texture_from_surface(&surface)?)
    }

    /// Handle events until `Quit`, redrawing whenever the queue goes idle
    pub fn run(&mut self) -> Result<(), AppError> {
        loop {
            match self.pump.wait_timeout(Duration::from_millis(16))? {
                Some(Event::Quit { timestamp }) => {
                    log::info!("Quit requested at {timestamp} ms");
                    break;
                }
                Some(Event::MouseMotion { x, y, .. }) => self.trail.push(Point::new(x, y)),
                Some(Event::Window { event: WindowEvent::Resized(width, height), .. }) => {
                    log::debug!("Window resized to {width}x{height}");
                }
                Some(other) => log::trace!("Ignoring {other:?}"),
                None => self.draw_frame()?,
            }
        }
        self.draw_frame()?;
        log::info!("Presented {} frames", self.frames);
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<(), AppError> {
        let renderer = &self.renderer;
        let (width, height) = self.window.size()?;

        renderer.set_draw_blend_mode(BlendMode::None)?;
        renderer.set_draw_color(self.config.background)?;
        renderer.clear()?;

        // Integer geometry: a border and a checker of tiles
        renderer.set_draw_color(Color::rgb(90, 90, 110))?;
        renderer.draw_line(Point::new(0, 0), Point::new(width - 1, 0))?;
        renderer.draw_line(Point::new(0, height - 1), Point::new(width - 1, height - 1))?;
        renderer.copy(&self.tiles, &Rect::new(0, 0, 2, 2), &Rect::new(16, 16, 64, 64))?;

        // Float geometry: a translucent panel at sub-pixel offsets
        renderer.set_draw_blend_mode(BlendMode::Blend)?;
        renderer.set_draw_color(Color::rgba(255, 255, 255, 96))?;
        renderer.fill_rect(&Rect::new(96.5_f32, 24.25, 120.0, 40.5))?;
        renderer.fill_rects(&[
            Rect::new(96.5_f32, 72.0, 56.0, 8.0),
            Rect::new(160.5_f32, 72.0, 56.0, 8.0),
        ])?;

        if let Some(icon) = &self.icon {
            let size = icon.size()?;
            let destination = Rect::new(width - size.x - 8, 8, size.x, size.y);
            renderer.copy(icon, &Rect::new(0, 0, size.x, size.y), &destination)?;
        }

        renderer.set_draw_blend_mode(BlendMode::None)?;
        renderer.set_draw_color(TRAIL_COLOR)?;
        for pair in self.trail.windows(2) {
            renderer.draw_line(pair[0], pair[1])?;
        }
        for point in &self.trail {
            renderer.draw_point(Point::new(point.x as f32 + 0.5, point.y as f32 + 0.5))?;
        }

        renderer.present();
        self.frames += 1;
        Ok(())
    }

    /// Write the current frame to the configured bitmap path
    pub fn save_frame(&self) -> Result<(), AppError> {
        let (width, height) = self.renderer.output_size()?;
        let pixels = self.renderer.read_pixels(None)?;
        let frame = Surface::from_pixels(&self.context, width, height, PixelFormat::Rgba8888, &pixels)?;
        frame.save_bmp(&self.config.output)?;
        log::info!("Saved {}x{} frame to {}", width, height, self.config.output.display());
        Ok(())
    }
}

/// Simulated OS input: a pointer sweep followed by a quit request
fn spawn_input(injector: EventInjector, window_id: u32, quit_after: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        let steps: i32 = 12;
        for step in 0..steps {
            injector.inject(Event::MouseMotion {
                timestamp: 0,
                window_id,
                x: 24 + step * 20,
                y: 200 - step * 8,
            });
            thread::sleep(quit_after / (steps as u32 * 2));
        }
        thread::sleep(quit_after / 2);
        injector.inject(Event::Quit { timestamp: 0 });
    })
}

fn load_config() -> Result<SketchConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading settings from {path}");
            SketchConfig::load_from_file(path)
        }
        None => Ok(SketchConfig::default()),
    }
}

fn run() -> Result<(), AppError> {
    let config = load_config()?;
    let quit_after = Duration::from_millis(config.quit_after_ms);

    let platform = HeadlessPlatform::new();
    let injector = platform.injector();
    let context = Context::init(platform, InitFlags::VIDEO)?;

    let mut app = SketchApp::new(context, config)?;
    let input = spawn_input(injector, app.window.id(), quit_after);
    app.run()?;
    input.join().map_err(|_| AppError::InputThread)?;
    app.save_frame()
}

fn main() {
    logging::init();
    log::info!("Starting sketch demo...");

    if let Err(error) = run() {
        log::error!("Sketch demo failed: {error}");
        std::process::exit(1);
    }
    log::info!("Sketch demo finished");
}
