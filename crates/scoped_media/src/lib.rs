//! # Scoped Media
//!
//! Owned handles and typed errors over a C-shaped multimedia library.
//!
//! The native library hands out raw references that must be released with a
//! matching destroy call, and reports failure through sentinel return values
//! plus a global "last error" message. This crate turns both conventions into
//! ordinary Rust:
//!
//! - **Owned handles**: [`Owned`] releases its resource exactly once, on drop,
//!   on [`Owned::close`] or when overwritten.
//! - **Typed errors**: every factory returns [`MediaResult`], and the error
//!   carries the native message captured at the moment of failure.
//! - **Accessors**: [`Window`], [`Renderer`], [`Texture`], [`Surface`] and
//!   [`Stream`] borrow their handle for each call.
//! - **Headless backend**: [`HeadlessPlatform`] implements the native surface
//!   in software, so everything runs without a display.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scoped_media::prelude::*;
//!
//! fn main() -> Result<(), MediaError> {
//!     let context = Context::headless(InitFlags::VIDEO)?;
//!     let window = Window::new(&context, "demo", 0, 0, 320, 240, WindowFlags::empty())?;
//!     let renderer = Renderer::new(&window, -1, RendererFlags::empty())?;
//!
//!     renderer.set_draw_color(Color::rgb(200, 40, 40))?;
//!     renderer.fill_rect(&Rect::new(10, 10, 100, 50))?;
//!     renderer.fill_rect(&Rect::new(120.5_f32, 10.0, 50.0, 50.0))?;
//!     renderer.present();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod geometry;
pub mod handle;
pub mod image;
pub mod logging;
pub mod platform;
pub mod renderer;
pub mod stream;
pub mod surface;
pub mod texture;
pub mod window;

#[cfg(test)]
mod tests;

pub use context::{Context, InitFlags};
pub use error::{MediaError, MediaResult};
pub use handle::{Owned, RendererHandle, ResourceKind, StreamHandle, SurfaceHandle, TextureHandle, WindowHandle};
pub use platform::{HeadlessPlatform, Platform};
pub use renderer::Renderer;
pub use stream::Stream;
pub use surface::Surface;
pub use texture::Texture;
pub use window::Window;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::Config,
        context::{Context, InitFlags},
        error::{MediaError, MediaResult},
        events::{Event, EventPump, EventType, WindowEvent},
        geometry::{Color, Point, Rect},
        handle::{RendererHandle, StreamHandle, SurfaceHandle, TextureHandle, WindowHandle},
        renderer::{BlendMode, Renderer, RendererConfig, RendererFlags},
        stream::{SeekWhence, Stream},
        surface::Surface,
        texture::{PixelFormat, Texture, TextureAccess, TextureProperties},
        window::{Window, WindowConfig, WindowFlags},
    };
}
