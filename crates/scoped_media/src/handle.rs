//! Scope-bound ownership of native resources
//!
//! [`Owned<K>`] holds exactly one raw reference allocated by the native library
//! and calls the release primitive of its [`ResourceKind`] exactly once: on
//! [`Owned::close`] or when the handle is dropped, whichever comes first.
//!
//! # Ownership rules
//! - Handles are move-only. There is no `Clone`, because the native library
//!   does not reference-count its resources.
//! - A handle is either empty (default or moved-from) or owns a live resource.
//! - Closing an empty handle is a no-op, so release can never run twice.
//! - Assigning over a handle drops the old value first, releasing its resource.
//!
//! Each kind has its own raw id type, so a window id cannot be handed to the
//! texture release primitive.

use std::fmt;
use std::rc::Rc;

use crate::context::{Context, Runtime};
use crate::platform::{Platform, RendererId, StreamId, SurfaceId, TextureId, WindowId};

/// A class of native resource with a paired create/destroy primitive
pub trait ResourceKind {
    /// Raw reference type handed out by the create primitive
    type Raw: Copy + Eq + fmt::Debug;

    /// Human-readable kind name used in logs and panics
    const NAME: &'static str;

    /// Call the matching destroy primitive
    fn release(platform: &dyn Platform, raw: Self::Raw);
}

/// Window resources
#[derive(Debug)]
pub enum WindowKind {}

/// Renderer resources
#[derive(Debug)]
pub enum RendererKind {}

/// Texture resources
#[derive(Debug)]
pub enum TextureKind {}

/// Surface resources
#[derive(Debug)]
pub enum SurfaceKind {}

/// Byte-stream resources
#[derive(Debug)]
pub enum StreamKind {}

impl ResourceKind for WindowKind {
    type Raw = WindowId;
    const NAME: &'static str = "window";

    fn release(platform: &dyn Platform, raw: Self::Raw) {
        platform.destroy_window(raw);
    }
}

impl ResourceKind for RendererKind {
    type Raw = RendererId;
    const NAME: &'static str = "renderer";

    fn release(platform: &dyn Platform, raw: Self::Raw) {
        platform.destroy_renderer(raw);
    }
}

impl ResourceKind for TextureKind {
    type Raw = TextureId;
    const NAME: &'static str = "texture";

    fn release(platform: &dyn Platform, raw: Self::Raw) {
        platform.destroy_texture(raw);
    }
}

impl ResourceKind for SurfaceKind {
    type Raw = SurfaceId;
    const NAME: &'static str = "surface";

    fn release(platform: &dyn Platform, raw: Self::Raw) {
        platform.free_surface(raw);
    }
}

impl ResourceKind for StreamKind {
    type Raw = StreamId;
    const NAME: &'static str = "stream";

    fn release(platform: &dyn Platform, raw: Self::Raw) {
        // Close reports flush failures, but release has no caller to tell.
        if platform.stream_close(raw) < 0 {
            log::warn!("Stream close reported: {}", platform.last_error());
        }
    }
}

/// Owned window reference
pub type WindowHandle = Owned<WindowKind>;
/// Owned renderer reference
pub type RendererHandle = Owned<RendererKind>;
/// Owned texture reference
pub type TextureHandle = Owned<TextureKind>;
/// Owned surface reference
pub type SurfaceHandle = Owned<SurfaceKind>;
/// Owned byte-stream reference
pub type StreamHandle = Owned<StreamKind>;

struct Held<K: ResourceKind> {
    raw: K::Raw,
    runtime: Rc<Runtime>,
}

/// Exclusive owner of one native resource
pub struct Owned<K: ResourceKind> {
    held: Option<Held<K>>,
}

impl<K: ResourceKind> Owned<K> {
    /// An empty handle that owns nothing
    pub const fn empty() -> Self {
        Self { held: None }
    }

    pub(crate) fn from_raw(runtime: &Rc<Runtime>, raw: K::Raw) -> Self {
        log::trace!("Acquired {} {:?}", K::NAME, raw);
        Self {
            held: Some(Held { raw, runtime: Rc::clone(runtime) }),
        }
    }

    /// Take ownership of a raw reference previously obtained from `context`
    ///
    /// The handle will release `raw` exactly once. The caller must not release
    /// it separately.
    pub fn adopt(context: &Context, raw: K::Raw) -> Self {
        Self::from_raw(context.runtime(), raw)
    }

    /// Whether this handle owns nothing
    pub const fn is_empty(&self) -> bool {
        self.held.is_none()
    }

    /// Raw reference for borrowing; `None` when empty
    pub fn as_raw(&self) -> Option<K::Raw> {
        self.held.as_ref().map(|held| held.raw)
    }

    /// Release the resource now; a no-op when empty
    pub fn close(&mut self) {
        if let Some(held) = self.held.take() {
            log::trace!("Releasing {} {:?}", K::NAME, held.raw);
            K::release(held.runtime.platform(), held.raw);
        }
    }

    /// Move ownership out, leaving this handle empty
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self { held: self.held.take() }
    }

    /// Give up ownership without releasing
    ///
    /// The returned reference is no longer released by anyone; pass it back to
    /// [`Owned::adopt`] to restore scoped ownership.
    #[must_use]
    pub fn into_raw(mut self) -> Option<K::Raw> {
        self.held.take().map(|held| held.raw)
    }

    /// Borrow the platform and raw reference for one native call
    ///
    /// # Panics
    /// Panics when the handle is empty. Using a closed or moved-from handle is
    /// a caller bug, not a recoverable error.
    pub(crate) fn borrow(&self) -> (&dyn Platform, K::Raw) {
        match &self.held {
            Some(held) => (held.runtime.platform(), held.raw),
            None => panic!("{} handle used while empty", K::NAME),
        }
    }

    /// Borrow the shared runtime, for factories deriving new resources
    ///
    /// # Panics
    /// Panics when the handle is empty.
    pub(crate) fn runtime(&self) -> &Rc<Runtime> {
        match &self.held {
            Some(held) => &held.runtime,
            None => panic!("{} handle used while empty", K::NAME),
        }
    }
}

impl<K: ResourceKind> Default for Owned<K> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: ResourceKind> Drop for Owned<K> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<K: ResourceKind> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&K::NAME).field(&self.as_raw()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InitFlags;
    use crate::platform::{HeadlessPlatform, HeadlessProbe, ResourceClass};

    fn stream_context() -> (Context, HeadlessProbe) {
        let platform = HeadlessPlatform::new();
        let probe = platform.probe();
        let context = Context::init(platform, InitFlags::EVENTS).expect("init");
        (context, probe)
    }

    fn memory_stream(context: &Context) -> StreamHandle {
        let raw = context
            .platform()
            .stream_from_memory(b"abc".to_vec())
            .expect("memory stream");
        StreamHandle::adopt(context, raw)
    }

    #[test]
    fn test_drop_releases_once() {
        let (context, probe) = stream_context();
        {
            let handle = memory_stream(&context);
            assert!(!handle.is_empty());
            assert_eq!(probe.live(ResourceClass::Stream), 1);
        }
        assert_eq!(probe.released(ResourceClass::Stream), 1);
        assert_eq!(probe.invalid_releases(), 0);
    }

    #[test]
    fn test_close_then_drop_is_single_release() {
        let (context, probe) = stream_context();
        let mut handle = memory_stream(&context);

        handle.close();
        assert!(handle.is_empty());
        handle.close();
        drop(handle);

        assert_eq!(probe.released(ResourceClass::Stream), 1);
        assert_eq!(probe.invalid_releases(), 0);
    }

    #[test]
    fn test_take_moves_ownership() {
        let (context, probe) = stream_context();
        let mut source = memory_stream(&context);
        let raw = source.as_raw();

        let target = source.take();
        assert!(source.is_empty());
        assert_eq!(target.as_raw(), raw);

        drop(source);
        assert_eq!(probe.released(ResourceClass::Stream), 0);
        drop(target);
        assert_eq!(probe.released(ResourceClass::Stream), 1);
    }

    #[test]
    fn test_assignment_releases_previous_resource() {
        let (context, probe) = stream_context();
        let mut handle = memory_stream(&context);
        let replacement = memory_stream(&context);
        let replacement_raw = replacement.as_raw();
        assert_ne!(handle.as_raw(), replacement_raw);

        handle = replacement;
        assert_eq!(probe.released(ResourceClass::Stream), 1);
        assert_eq!(handle.as_raw(), replacement_raw);
    }

    #[test]
    fn test_into_raw_and_adopt() {
        let (context, probe) = stream_context();
        let handle = memory_stream(&context);

        let raw = handle.into_raw().expect("owned");
        assert_eq!(probe.released(ResourceClass::Stream), 0);

        drop(StreamHandle::adopt(&context, raw));
        assert_eq!(probe.released(ResourceClass::Stream), 1);
    }

    #[test]
    fn test_empty_handle() {
        let mut handle = WindowHandle::default();
        assert!(handle.is_empty());
        assert_eq!(handle.as_raw(), None);
        handle.close();
    }

    #[test]
    #[should_panic(expected = "window handle used while empty")]
    fn test_borrowing_empty_handle_panics() {
        let handle = WindowHandle::empty();
        let _ = handle.borrow();
    }
}
