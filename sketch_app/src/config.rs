//! Sketch demo settings, loadable from RON or TOML

use std::path::PathBuf;

use scoped_media::config::Config;
use scoped_media::geometry::Color;
use scoped_media::renderer::RendererConfig;
use scoped_media::window::{WindowConfig, WindowFlags, WINDOW_POS_CENTERED};
use serde::{Deserialize, Serialize};

/// Everything the demo needs to draw and save one scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    /// Window to draw into
    pub window: WindowConfig,
    /// Renderer driver selection
    pub renderer: RendererConfig,
    /// Clear color of every frame
    pub background: Color,
    /// Optional SVG icon drawn in the top-right corner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_path: Option<PathBuf>,
    /// Where the last frame is written as a bitmap
    pub output: PathBuf,
    /// Delay before the input thread asks the demo to quit
    pub quit_after_ms: u64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig {
                title: "Scoped Media - Sketch Demo".to_string(),
                x_position: WINDOW_POS_CENTERED,
                y_position: WINDOW_POS_CENTERED,
                width: 320,
                height: 240,
                flags: WindowFlags::RESIZABLE,
            },
            renderer: RendererConfig::default(),
            background: Color::rgb(24, 26, 32),
            svg_path: None,
            output: PathBuf::from("sketch_frame.bmp"),
            quit_after_ms: 250,
        }
    }
}

impl Config for SketchConfig {}
