//! Failure taxonomy and the sentinel-to-error translation helpers
//!
//! The native library reports failures through a return sentinel plus a single
//! global last-error slot. The helpers in this module are the only place that
//! slot is read: each one checks a primitive's return value and, on failure,
//! snapshots [`Platform::last_error`] before anything else can call into the
//! library and overwrite it.

use std::rc::Rc;

use thiserror::Error;

use crate::handle::{Owned, ResourceKind};
use crate::platform::Platform;

/// Errors raised by the handle layer, one variant per failure origin
///
/// Every variant carries the native last-error text captured at the moment the
/// failing primitive returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Subsystem initialization failed
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Image format support could not be initialized
    #[error("image initialization failed: {0}")]
    ImageInitialization(String),

    /// Window creation failed
    #[error("window creation failed: {0}")]
    WindowCreation(String),

    /// Renderer creation failed
    #[error("renderer creation failed: {0}")]
    RendererCreation(String),

    /// Texture creation from raw parameters failed
    #[error("texture creation failed: {0}")]
    TextureCreation(String),

    /// Texture creation from a surface failed
    #[error("texture creation from surface failed: {0}")]
    TextureFromSurface(String),

    /// Bitmap or general image decoding failed
    #[error("surface load failed: {0}")]
    SurfaceLoad(String),

    /// Blank surface allocation failed
    #[error("surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Surface format conversion failed
    #[error("surface conversion failed: {0}")]
    SurfaceConversion(String),

    /// Vector image rasterization failed
    #[error("vector image load failed: {0}")]
    VectorImageLoad(String),

    /// Stream could not be opened
    #[error("stream open failed: {0}")]
    StreamOpen(String),

    /// Stream read returned no objects
    #[error("stream read failed: {0}")]
    StreamRead(String),

    /// Stream write was short
    #[error("stream write failed: {0}")]
    StreamWrite(String),

    /// Stream seek, tell or size query failed
    #[error("stream seek failed: {0}")]
    StreamSeek(String),

    /// Custom event type registration failed
    #[error("event registration failed: {0}")]
    EventRegistration(String),

    /// Event could not be queued
    #[error("event push failed: {0}")]
    EventPush(String),

    /// Blocking event wait failed
    #[error("event wait failed: {0}")]
    EventWait(String),

    /// A draw or query primitive failed
    #[error("{operation} failed: {message}")]
    Render {
        /// Name of the failing operation
        operation: &'static str,
        /// Captured last-error text
        message: String,
    },
}

impl MediaError {
    /// The native last-error text captured when this error was raised
    pub fn message(&self) -> &str {
        match self {
            Self::Initialization(message)
            | Self::ImageInitialization(message)
            | Self::WindowCreation(message)
            | Self::RendererCreation(message)
            | Self::TextureCreation(message)
            | Self::TextureFromSurface(message)
            | Self::SurfaceLoad(message)
            | Self::SurfaceCreation(message)
            | Self::SurfaceConversion(message)
            | Self::VectorImageLoad(message)
            | Self::StreamOpen(message)
            | Self::StreamRead(message)
            | Self::StreamWrite(message)
            | Self::StreamSeek(message)
            | Self::EventRegistration(message)
            | Self::EventPush(message)
            | Self::EventWait(message)
            | Self::Render { message, .. } => message,
        }
    }

    /// Build a constructor for the draw/query catch-all
    pub(crate) fn render(operation: &'static str) -> impl FnOnce(String) -> Self {
        move |message| Self::Render { operation, message }
    }
}

/// Result type for handle layer operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Snapshot the last-error slot into an error value
///
/// Must be the first thing that runs after a primitive reports failure.
fn capture(platform: &dyn Platform, fail: impl FnOnce(String) -> MediaError) -> MediaError {
    let error = fail(platform.last_error());
    log::debug!("native call failed: {error}");
    error
}

/// Raw reference of `other` for a call on `owner`'s platform
///
/// Fails with `message` as the last error when `other` belongs to a different
/// context.
pub(crate) fn sibling<K: ResourceKind, L: ResourceKind>(
    owner: &Owned<K>,
    other: &Owned<L>,
    message: &str,
    fail: impl FnOnce(String) -> MediaError,
) -> MediaResult<L::Raw> {
    let (platform, _) = owner.borrow();
    let (_, raw) = other.borrow();
    if Rc::ptr_eq(owner.runtime(), other.runtime()) {
        Ok(raw)
    } else {
        platform.set_error(message);
        Err(capture(platform, fail))
    }
}

/// Translate a null-sentinel result
pub(crate) fn non_null<T>(
    platform: &dyn Platform,
    raw: Option<T>,
    fail: impl FnOnce(String) -> MediaError,
) -> MediaResult<T> {
    match raw {
        Some(raw) => Ok(raw),
        None => Err(capture(platform, fail)),
    }
}

/// Translate a negative-sentinel status code
pub(crate) fn status(
    platform: &dyn Platform,
    code: i32,
    fail: impl FnOnce(String) -> MediaError,
) -> MediaResult<i32> {
    if code < 0 {
        Err(capture(platform, fail))
    } else {
        Ok(code)
    }
}

/// Translate a `u32::MAX` sentinel
pub(crate) fn non_max(
    platform: &dyn Platform,
    value: u32,
    fail: impl FnOnce(String) -> MediaError,
) -> MediaResult<u32> {
    if value == u32::MAX {
        Err(capture(platform, fail))
    } else {
        Ok(value)
    }
}

/// Translate a `-1` offset sentinel
pub(crate) fn non_negative_offset(
    platform: &dyn Platform,
    offset: i64,
    fail: impl FnOnce(String) -> MediaError,
) -> MediaResult<i64> {
    if offset == -1 {
        Err(capture(platform, fail))
    } else {
        Ok(offset)
    }
}

/// Translate a zero-count sentinel
pub(crate) fn non_zero(
    platform: &dyn Platform,
    count: usize,
    fail: impl FnOnce(String) -> MediaError,
) -> MediaResult<usize> {
    if count == 0 {
        Err(capture(platform, fail))
    } else {
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessPlatform;

    #[test]
    fn test_non_null_captures_last_error() {
        let platform = HeadlessPlatform::new();
        platform.set_error("Out of memory");

        let result: MediaResult<u32> = non_null(&platform, None, MediaError::WindowCreation);
        assert_eq!(result, Err(MediaError::WindowCreation("Out of memory".to_string())));
    }

    #[test]
    fn test_success_leaves_error_untouched() {
        let platform = HeadlessPlatform::new();
        platform.set_error("stale");

        assert_eq!(non_null(&platform, Some(7), MediaError::WindowCreation), Ok(7));
        assert_eq!(status(&platform, 0, MediaError::render("clear")), Ok(0));
        assert_eq!(platform.last_error(), "stale");
    }

    #[test]
    fn test_sentinels() {
        let platform = HeadlessPlatform::new();
        platform.set_error("boom");

        assert!(status(&platform, -1, MediaError::render("clear")).is_err());
        assert!(non_max(&platform, u32::MAX, MediaError::EventRegistration).is_err());
        assert_eq!(non_max(&platform, 0x8000, MediaError::EventRegistration), Ok(0x8000));
        assert!(non_negative_offset(&platform, -1, MediaError::StreamSeek).is_err());
        assert_eq!(non_negative_offset(&platform, 0, MediaError::StreamSeek), Ok(0));
        assert!(non_zero(&platform, 0, MediaError::StreamRead).is_err());
    }

    #[test]
    fn test_render_catch_all_message() {
        let error = MediaError::render("set viewport")("Invalid renderer".to_string());
        assert_eq!(error.message(), "Invalid renderer");
        assert_eq!(error.to_string(), "set viewport failed: Invalid renderer");
    }
}
