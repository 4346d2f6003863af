//! Pure-software implementation of [`Platform`]
//!
//! `HeadlessPlatform` behaves like the native library with a dummy video
//! driver: windows are bookkeeping records, renderers rasterize into RGBA
//! framebuffers, surfaces and textures are plain pixel buffers and the event
//! queue is fed by the library itself or by an [`EventInjector`] from any
//! thread. It follows the same sentinel and last-error conventions as a native
//! backend, so everything layered on top runs unchanged against it.
//!
//! A [`HeadlessProbe`] obtained before the platform is moved into a
//! [`Context`](crate::Context) observes resource creation and release counts.

mod canvas;
mod codec;
mod events;
mod stream;

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use slotmap::SlotMap;

use self::canvas::{intersect, Canvas};
use self::events::{Callbacks, EventQueue};
use self::stream::StreamRecord;
use super::{Platform, RendererId, StreamId, SurfaceId, SurfaceInfo, TextureId, TextureQuery, WindowId};
use crate::context::InitFlags;
use crate::events::{Event, EventFilter, WindowEvent};
use crate::geometry::{Color, Rect};
use crate::image::ImageInitFlags;
use crate::renderer::{BlendMode, RendererFlags};
use crate::texture::{PixelFormat, TextureAccess};
use crate::window::{WindowFlags, WINDOW_POS_CENTERED, WINDOW_POS_UNDEFINED};

pub use self::events::EventInjector;

/// Largest window or texture edge accepted
const MAX_DIMENSION: i32 = 16_384;
/// Desktop size used to resolve centered window positions
const DESKTOP_SIZE: (i32, i32) = (1920, 1080);

/// Kinds of native resources counted by [`HeadlessProbe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Windows
    Window,
    /// Renderers
    Renderer,
    /// Textures
    Texture,
    /// Surfaces
    Surface,
    /// Byte streams
    Stream,
}

impl ResourceClass {
    const COUNT: usize = 5;

    const fn index(self) -> usize {
        match self {
            Self::Window => 0,
            Self::Renderer => 1,
            Self::Texture => 2,
            Self::Surface => 3,
            Self::Stream => 4,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    created: [usize; ResourceClass::COUNT],
    released: [usize; ResourceClass::COUNT],
    invalid_releases: usize,
    quit_calls: usize,
    presents: usize,
}

/// Read-only view of a [`HeadlessPlatform`]'s resource accounting
#[derive(Debug, Clone, Default)]
pub struct HeadlessProbe {
    counters: Rc<RefCell<Counters>>,
}

impl HeadlessProbe {
    /// Resources of `class` created so far
    pub fn created(&self, class: ResourceClass) -> usize {
        self.counters.borrow().created[class.index()]
    }

    /// Resources of `class` released so far
    pub fn released(&self, class: ResourceClass) -> usize {
        self.counters.borrow().released[class.index()]
    }

    /// Resources of `class` currently alive
    pub fn live(&self, class: ResourceClass) -> usize {
        self.created(class) - self.released(class)
    }

    /// Release calls that named an unknown or already released resource
    pub fn invalid_releases(&self) -> usize {
        self.counters.borrow().invalid_releases
    }

    /// Times the library was shut down
    pub fn quit_calls(&self) -> usize {
        self.counters.borrow().quit_calls
    }

    /// Frames presented across all renderers
    pub fn presents(&self) -> usize {
        self.counters.borrow().presents
    }

    fn record_created(&self, class: ResourceClass) {
        self.counters.borrow_mut().created[class.index()] += 1;
    }

    fn record_released(&self, class: ResourceClass) {
        self.counters.borrow_mut().released[class.index()] += 1;
    }

    fn record_invalid_release(&self) {
        self.counters.borrow_mut().invalid_releases += 1;
    }
}

#[derive(Debug)]
struct WindowRecord {
    numeric_id: u32,
    title: String,
    position: (i32, i32),
    size: (i32, i32),
    flags: WindowFlags,
    renderer: Option<RendererId>,
}

#[derive(Debug)]
struct RendererRecord {
    window: Option<WindowId>,
    draw_color: Color,
    blend_mode: BlendMode,
    viewport: Option<Rect<i32>>,
    scale: (f32, f32),
    target: Option<TextureId>,
    framebuffer: Canvas,
    front: Canvas,
}

#[derive(Debug)]
struct TextureRecord {
    renderer: RendererId,
    format: PixelFormat,
    access: TextureAccess,
    canvas: Canvas,
}

impl TextureRecord {
    const fn blend_mode(&self) -> BlendMode {
        if self.format.has_alpha() {
            BlendMode::Blend
        } else {
            BlendMode::None
        }
    }
}

#[derive(Debug)]
struct SurfaceRecord {
    format: PixelFormat,
    canvas: Canvas,
}

#[derive(Debug)]
struct State {
    subsystems: InitFlags,
    image_formats: ImageInitFlags,
    next_window_id: u32,
    windows: SlotMap<WindowId, WindowRecord>,
    renderers: SlotMap<RendererId, RendererRecord>,
    textures: SlotMap<TextureId, TextureRecord>,
    surfaces: SlotMap<SurfaceId, SurfaceRecord>,
    streams: SlotMap<StreamId, StreamRecord>,
    queue: EventQueue,
}

/// Per-draw parameters resolved from a renderer and its current target
struct DrawState {
    color: Color,
    blend_mode: BlendMode,
    origin: (i32, i32),
    clip: Rect<i32>,
    scale: (f32, f32),
}

impl DrawState {
    fn point(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (self.origin.0 as f32 + x * self.scale.0).floor() as i32,
            (self.origin.1 as f32 + y * self.scale.1).floor() as i32,
        )
    }

    /// Device-space rectangle with edges clamped just outside the clip
    fn rect(&self, rect: &Rect<f32>) -> Rect<i32> {
        let edge = |origin: i32, value: f32, scale: f32, low: i32, length: i32| {
            let limit = f64::from(low) + f64::from(length) + 1.0;
            let position = (f64::from(origin) + f64::from(value) * f64::from(scale)).round();
            position.clamp(f64::from(low) - 1.0, limit) as i32
        };
        let clip = &self.clip;
        let left = edge(self.origin.0, rect.x, self.scale.0, clip.x, clip.w);
        let top = edge(self.origin.1, rect.y, self.scale.1, clip.y, clip.h);
        let right = edge(self.origin.0, rect.x + rect.w, self.scale.0, clip.x, clip.w);
        let bottom = edge(self.origin.1, rect.y + rect.h, self.scale.1, clip.y, clip.h);
        Rect { x: left, y: top, w: right - left, h: bottom - top }
    }
}

fn to_f32(rect: &Rect<i32>) -> Rect<f32> {
    Rect {
        x: rect.x as f32,
        y: rect.y as f32,
        w: rect.w as f32,
        h: rect.h as f32,
    }
}

/// Name of the first subsystem in `flags` this platform cannot provide
fn unavailable_subsystem(flags: InitFlags) -> Option<&'static str> {
    [
        (InitFlags::AUDIO, "Audio"),
        (InitFlags::JOYSTICK, "Joystick"),
        (InitFlags::HAPTIC, "Haptic"),
        (InitFlags::GAME_CONTROLLER, "Game controller"),
        (InitFlags::SENSOR, "Sensor"),
    ]
    .into_iter()
    .find(|(flag, _)| flags.intersects(*flag))
    .map(|(_, name)| name)
}

fn resolve_position(position: i32, span: i32, desktop: i32) -> i32 {
    match position {
        WINDOW_POS_UNDEFINED => 0,
        WINDOW_POS_CENTERED => (desktop - span) / 2,
        other => other,
    }
}

/// Software stand-in for the native multimedia library
pub struct HeadlessPlatform {
    state: RefCell<State>,
    callbacks: RefCell<Callbacks>,
    error: RefCell<String>,
    dispatching: Cell<bool>,
    injector: EventInjector,
    probe: HeadlessProbe,
    started: Instant,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HeadlessPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HeadlessPlatform")
            .field("subsystems", &state.subsystems)
            .field("windows", &state.windows.len())
            .field("renderers", &state.renderers.len())
            .field("textures", &state.textures.len())
            .field("surfaces", &state.surfaces.len())
            .field("streams", &state.streams.len())
            .finish()
    }
}

impl HeadlessPlatform {
    /// Fresh, uninitialized platform
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State {
                subsystems: InitFlags::empty(),
                image_formats: ImageInitFlags::empty(),
                next_window_id: 1,
                windows: SlotMap::with_key(),
                renderers: SlotMap::with_key(),
                textures: SlotMap::with_key(),
                surfaces: SlotMap::with_key(),
                streams: SlotMap::with_key(),
                queue: EventQueue::default(),
            }),
            callbacks: RefCell::new(Callbacks::default()),
            error: RefCell::new(String::new()),
            dispatching: Cell::new(false),
            injector: EventInjector::default(),
            probe: HeadlessProbe::default(),
            started: Instant::now(),
        }
    }

    /// Counter view that stays valid after the platform is moved
    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }

    /// Sender for simulated OS input; may be moved to other threads
    pub fn injector(&self) -> EventInjector {
        self.injector.clone()
    }

    /// Desktop position of a window after resolving centered and undefined
    /// placements
    pub fn window_position(&self, window: WindowId) -> Option<(i32, i32)> {
        self.state.borrow().windows.get(window).map(|record| record.position)
    }

    /// Pixels shown by the last present of `renderer`
    pub fn presented_frame(&self, renderer: RendererId) -> Option<Vec<Color>> {
        self.state
            .borrow()
            .renderers
            .get(renderer)
            .map(|record| record.front.pixels().to_vec())
    }

    fn fail(&self, message: impl Into<String>) {
        *self.error.borrow_mut() = message.into();
    }

    /// Store the error of a failed operation and return `None`
    fn check<T>(&self, result: Result<T, String>) -> Option<T> {
        result.map_err(|message| self.fail(message)).ok()
    }

    /// Map a unit result to a status code
    fn code(&self, result: Result<(), String>) -> i32 {
        self.check(result).map_or(-1, |()| 0)
    }

    fn timestamp(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_millis()).unwrap_or(u32::MAX)
    }

    fn events_active(&self) -> bool {
        self.state.borrow().subsystems.contains(InitFlags::EVENTS)
    }

    /// Filter, watch and queue one event: 1 queued, 0 filtered, -1 failed
    fn enqueue(&self, mut event: Event) -> i32 {
        event.set_timestamp(self.timestamp());

        let filter = self.callbacks.borrow_mut().filter.take();
        if let Some(mut filter) = filter {
            let accepted = filter(&event);
            let mut callbacks = self.callbacks.borrow_mut();
            if callbacks.filter.is_none() {
                callbacks.filter = Some(filter);
            }
            if !accepted {
                return 0;
            }
        }

        if !self.dispatching.replace(true) {
            let mut watches = std::mem::take(&mut self.callbacks.borrow_mut().watches);
            for (id, watch) in &mut watches {
                if !self.callbacks.borrow().removed.contains(id) {
                    watch(&event);
                }
            }
            let mut callbacks = self.callbacks.borrow_mut();
            let removed = std::mem::take(&mut callbacks.removed);
            watches.retain(|(id, _)| !removed.contains(id));
            watches.append(&mut callbacks.watches);
            callbacks.watches = watches;
            self.dispatching.set(false);
        }

        let pushed = self.state.borrow_mut().queue.push(event);
        self.check(pushed).map_or(-1, |()| 1)
    }

    fn window_event(&self, window_id: u32, event: WindowEvent) {
        if self.events_active() {
            self.enqueue(Event::Window { timestamp: 0, window_id, event });
        }
    }

    fn with_window<T>(&self, window: WindowId, f: impl FnOnce(&mut WindowRecord) -> Result<T, String>) -> Option<T> {
        let result = self
            .state
            .borrow_mut()
            .windows
            .get_mut(window)
            .ok_or_else(|| "Invalid window".to_string())
            .and_then(f);
        self.check(result)
    }

    fn with_renderer<T>(
        &self,
        renderer: RendererId,
        f: impl FnOnce(&mut RendererRecord) -> Result<T, String>,
    ) -> Option<T> {
        let result = self
            .state
            .borrow_mut()
            .renderers
            .get_mut(renderer)
            .ok_or_else(|| "Invalid renderer".to_string())
            .and_then(f);
        self.check(result)
    }

    fn with_surface<T>(&self, surface: SurfaceId, f: impl FnOnce(&mut SurfaceRecord) -> Result<T, String>) -> Option<T> {
        let result = self
            .state
            .borrow_mut()
            .surfaces
            .get_mut(surface)
            .ok_or_else(|| "Invalid surface".to_string())
            .and_then(f);
        self.check(result)
    }

    fn with_stream<T>(&self, stream: StreamId, f: impl FnOnce(&mut StreamRecord) -> Result<T, String>) -> Option<T> {
        let result = self
            .state
            .borrow_mut()
            .streams
            .get_mut(stream)
            .ok_or_else(|| "Invalid stream".to_string())
            .and_then(f);
        self.check(result)
    }

    /// Run a raster operation against the renderer's current target
    fn draw(&self, renderer: RendererId, f: impl FnOnce(&mut Canvas, &DrawState)) -> i32 {
        self.draw_with(renderer, |canvas, state| {
            f(canvas, state);
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn draw_with<T>(
        &self,
        renderer: RendererId,
        f: impl FnOnce(&mut Canvas, &DrawState) -> Result<T, String>,
    ) -> Option<T> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let Some(record) = state.renderers.get_mut(renderer) else {
            self.fail("Invalid renderer");
            return None;
        };
        let (target, viewport, color, blend_mode, scale) =
            (record.target, record.viewport, record.draw_color, record.blend_mode, record.scale);

        let canvas = match target {
            Some(texture) => match state.textures.get_mut(texture) {
                Some(texture) => &mut texture.canvas,
                None => {
                    self.fail("Invalid texture");
                    return None;
                }
            },
            None => &mut record.framebuffer,
        };

        let viewport = viewport.unwrap_or_else(|| canvas.bounds());
        let draw_state = DrawState {
            color,
            blend_mode,
            origin: (viewport.x, viewport.y),
            clip: intersect(&viewport, &canvas.bounds()).unwrap_or_default(),
            scale,
        };
        self.check(f(canvas, &draw_state))
    }

    fn fill_rects_scaled(&self, renderer: RendererId, rects: &[Rect<f32>]) -> i32 {
        self.draw(renderer, |canvas, state| {
            for rect in rects {
                canvas.fill(&state.rect(rect), state.color, state.blend_mode, &state.clip);
            }
        })
    }

    fn copy_scaled(
        &self,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<f32>>,
    ) -> i32 {
        let prepared = {
            let state = self.state.borrow();
            match state.textures.get(texture) {
                None => Err("Invalid texture".to_string()),
                Some(record) if record.renderer != renderer => {
                    Err("Texture was not created with this renderer".to_string())
                }
                Some(record) => {
                    let bounds = record.canvas.bounds();
                    let area = source.map_or(Some(bounds), |source| intersect(source, &bounds));
                    let pixels = area.and_then(|area| record.canvas.region(&area).map(|pixels| (area, pixels)));
                    Ok((pixels, record.blend_mode()))
                }
            }
        };
        let Some((pixels, mode)) = self.check(prepared) else {
            return -1;
        };
        let Some((area, pixels)) = pixels else {
            return 0;
        };

        self.draw(renderer, |canvas, state| {
            let target = destination.map_or(state.clip, |destination| state.rect(destination));
            canvas.blit_scaled(&pixels, area.w, area.h, &target, mode, &state.clip);
        })
    }

    fn insert_surface(&self, format: PixelFormat, canvas: Canvas) -> SurfaceId {
        let id = self.state.borrow_mut().surfaces.insert(SurfaceRecord { format, canvas });
        self.probe.record_created(ResourceClass::Surface);
        id
    }

    fn release<K: slotmap::Key, V>(
        &self,
        table: impl FnOnce(&mut State) -> &mut SlotMap<K, V>,
        id: K,
        class: ResourceClass,
    ) -> Option<V> {
        let removed = table(&mut *self.state.borrow_mut()).remove(id);
        match removed {
            Some(record) => {
                self.probe.record_released(class);
                Some(record)
            }
            None => {
                self.fail(format!("Invalid {class:?} handle"));
                self.probe.record_invalid_release();
                None
            }
        }
    }
}

fn parse_format(format: u32) -> Result<PixelFormat, String> {
    PixelFormat::from_raw(format).ok_or_else(|| "Unknown pixel format".to_string())
}

fn check_surface_size(width: i32, height: i32) -> Result<(), String> {
    if width < 0 {
        return Err("Parameter 'width' is invalid".to_string());
    }
    if height < 0 {
        return Err("Parameter 'height' is invalid".to_string());
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err("Out of memory".to_string());
    }
    Ok(())
}

impl Platform for HeadlessPlatform {
    fn init(&self, flags: u32) -> i32 {
        let mut requested = InitFlags::from_bits_truncate(flags);
        if let Some(name) = unavailable_subsystem(requested) {
            self.fail(format!("{name} subsystem isn't available in headless mode"));
            return -1;
        }
        if requested.contains(InitFlags::VIDEO) {
            requested |= InitFlags::EVENTS;
        }
        self.state.borrow_mut().subsystems |= requested;
        0
    }

    fn quit(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.subsystems = InitFlags::empty();
            state.image_formats = ImageInitFlags::empty();
            state.queue.clear();
        }
        self.injector.drain();
        self.probe.counters.borrow_mut().quit_calls += 1;
    }

    fn was_init(&self, flags: u32) -> u32 {
        self.state.borrow().subsystems.bits() & flags
    }

    fn last_error(&self) -> String {
        self.error.borrow().clone()
    }

    fn set_error(&self, message: &str) {
        self.fail(message);
    }

    fn clear_error(&self) {
        self.error.borrow_mut().clear();
    }

    fn create_window(&self, title: &str, x: i32, y: i32, width: i32, height: i32, flags: u32) -> Option<WindowId> {
        let mut flags = WindowFlags::from_bits_truncate(flags);
        let created = {
            let mut state = self.state.borrow_mut();
            if !state.subsystems.contains(InitFlags::VIDEO) {
                Err("Video subsystem has not been initialized".to_string())
            } else if width < 0 || height < 0 {
                Err("Window of negative size requested".to_string())
            } else if width > MAX_DIMENSION || height > MAX_DIMENSION {
                Err("Window is too large".to_string())
            } else {
                if !flags.contains(WindowFlags::HIDDEN) {
                    flags |= WindowFlags::SHOWN;
                }
                let numeric_id = state.next_window_id;
                state.next_window_id += 1;
                let id = state.windows.insert(WindowRecord {
                    numeric_id,
                    title: title.to_string(),
                    position: (
                        resolve_position(x, width, DESKTOP_SIZE.0),
                        resolve_position(y, height, DESKTOP_SIZE.1),
                    ),
                    size: (width, height),
                    flags,
                    renderer: None,
                });
                Ok((id, numeric_id))
            }
        };

        let (id, numeric_id) = self.check(created)?;
        self.probe.record_created(ResourceClass::Window);
        if flags.contains(WindowFlags::SHOWN) {
            self.window_event(numeric_id, WindowEvent::Shown);
        }
        Some(id)
    }

    fn destroy_window(&self, window: WindowId) {
        if let Some(record) = self.release(|state| &mut state.windows, window, ResourceClass::Window) {
            if let Some(renderer) = record.renderer {
                if let Some(renderer) = self.state.borrow_mut().renderers.get_mut(renderer) {
                    renderer.window = None;
                }
            }
        }
    }

    fn window_numeric_id(&self, window: WindowId) -> u32 {
        self.with_window(window, |record| Ok(record.numeric_id)).unwrap_or(0)
    }

    fn window_size(&self, window: WindowId) -> Option<(i32, i32)> {
        self.with_window(window, |record| Ok(record.size))
    }

    fn set_window_size(&self, window: WindowId, width: i32, height: i32) -> i32 {
        if width <= 0 || height <= 0 {
            self.fail(if width <= 0 { "Parameter 'w' is invalid" } else { "Parameter 'h' is invalid" });
            return -1;
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            self.fail("Window is too large");
            return -1;
        }
        let resized = self.with_window(window, |record| {
            record.size = (width, height);
            Ok((record.numeric_id, record.renderer))
        });
        let Some((numeric_id, renderer)) = resized else {
            return -1;
        };
        if let Some(renderer) = renderer {
            if let Some(renderer) = self.state.borrow_mut().renderers.get_mut(renderer) {
                renderer.framebuffer = Canvas::new(width, height, Color::BLACK);
                renderer.front = Canvas::new(width, height, Color::BLACK);
            }
        }
        self.window_event(numeric_id, WindowEvent::Resized(width, height));
        0
    }

    fn window_flags(&self, window: WindowId) -> u32 {
        self.with_window(window, |record| Ok(record.flags.bits())).unwrap_or(0)
    }

    fn window_title(&self, window: WindowId) -> Option<String> {
        self.with_window(window, |record| Ok(record.title.clone()))
    }

    fn set_window_title(&self, window: WindowId, title: &str) -> i32 {
        self.with_window(window, |record| {
            record.title = title.to_string();
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn show_window(&self, window: WindowId) -> i32 {
        let changed = self.with_window(window, |record| {
            let was_shown = record.flags.contains(WindowFlags::SHOWN);
            record.flags.remove(WindowFlags::HIDDEN);
            record.flags.insert(WindowFlags::SHOWN);
            Ok((!was_shown).then_some(record.numeric_id))
        });
        match changed {
            Some(Some(numeric_id)) => {
                self.window_event(numeric_id, WindowEvent::Shown);
                0
            }
            Some(None) => 0,
            None => -1,
        }
    }

    fn hide_window(&self, window: WindowId) -> i32 {
        let changed = self.with_window(window, |record| {
            let was_shown = record.flags.contains(WindowFlags::SHOWN);
            record.flags.remove(WindowFlags::SHOWN);
            record.flags.insert(WindowFlags::HIDDEN);
            Ok(was_shown.then_some(record.numeric_id))
        });
        match changed {
            Some(Some(numeric_id)) => {
                self.window_event(numeric_id, WindowEvent::Hidden);
                0
            }
            Some(None) => 0,
            None => -1,
        }
    }

    fn create_renderer(&self, window: WindowId, index: i32, flags: u32) -> Option<RendererId> {
        let flags = RendererFlags::from_bits_truncate(flags);
        let created = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            match state.windows.get_mut(window) {
                None => Err("Invalid window".to_string()),
                Some(_) if !(-1..=0).contains(&index) => {
                    Err("index must be -1 or in the range of 0 - 0".to_string())
                }
                Some(_) if flags.contains(RendererFlags::ACCELERATED) => {
                    Err("Couldn't find matching render driver".to_string())
                }
                Some(record) if record.renderer.is_some() => {
                    Err("Renderer already associated with window".to_string())
                }
                Some(record) => {
                    let (width, height) = record.size;
                    let id = state.renderers.insert(RendererRecord {
                        window: Some(window),
                        draw_color: Color::BLACK,
                        blend_mode: BlendMode::None,
                        viewport: None,
                        scale: (1.0, 1.0),
                        target: None,
                        framebuffer: Canvas::new(width, height, Color::BLACK),
                        front: Canvas::new(width, height, Color::BLACK),
                    });
                    record.renderer = Some(id);
                    Ok(id)
                }
            }
        };
        let id = self.check(created)?;
        self.probe.record_created(ResourceClass::Renderer);
        Some(id)
    }

    fn destroy_renderer(&self, renderer: RendererId) {
        if let Some(record) = self.release(|state| &mut state.renderers, renderer, ResourceClass::Renderer) {
            if let Some(window) = record.window {
                if let Some(window) = self.state.borrow_mut().windows.get_mut(window) {
                    window.renderer = None;
                }
            }
        }
    }

    fn renderer_output_size(&self, renderer: RendererId) -> Option<(i32, i32)> {
        self.with_renderer(renderer, |record| Ok((record.framebuffer.width(), record.framebuffer.height())))
    }

    fn set_render_scale(&self, renderer: RendererId, scale_x: f32, scale_y: f32) -> i32 {
        if !(scale_x.is_finite() && scale_x > 0.0 && scale_y.is_finite() && scale_y > 0.0) {
            self.fail("Renderer scale must be positive");
            return -1;
        }
        self.with_renderer(renderer, |record| {
            record.scale = (scale_x, scale_y);
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn render_scale(&self, renderer: RendererId) -> Option<(f32, f32)> {
        self.with_renderer(renderer, |record| Ok(record.scale))
    }

    fn set_draw_blend_mode(&self, renderer: RendererId, mode: u32) -> i32 {
        let Some(mode) = BlendMode::from_raw(mode) else {
            self.fail("Unsupported blend mode");
            return -1;
        };
        self.with_renderer(renderer, |record| {
            record.blend_mode = mode;
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn draw_blend_mode(&self, renderer: RendererId) -> Option<u32> {
        self.with_renderer(renderer, |record| Ok(record.blend_mode.to_raw()))
    }

    fn set_viewport(&self, renderer: RendererId, rect: Option<&Rect<i32>>) -> i32 {
        if rect.is_some_and(|rect| rect.w < 0 || rect.h < 0) {
            self.fail("Parameter 'rect' is invalid");
            return -1;
        }
        self.with_renderer(renderer, |record| {
            record.viewport = rect.copied();
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn viewport(&self, renderer: RendererId) -> Option<Rect<i32>> {
        self.draw_with(renderer, |canvas, _| Ok(canvas.bounds())).and_then(|bounds| {
            self.with_renderer(renderer, |record| Ok(record.viewport.unwrap_or(bounds)))
        })
    }

    fn set_render_target(&self, renderer: RendererId, texture: Option<TextureId>) -> i32 {
        let result = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let valid = match texture {
                None => Ok(()),
                Some(texture) => match state.textures.get(texture) {
                    None => Err("Invalid texture".to_string()),
                    Some(record) if record.renderer != renderer => {
                        Err("Texture was not created with this renderer".to_string())
                    }
                    Some(record) if record.access != TextureAccess::Target => {
                        Err("Texture not created with target access".to_string())
                    }
                    Some(_) => Ok(()),
                },
            };
            valid.and_then(|()| match state.renderers.get_mut(renderer) {
                None => Err("Invalid renderer".to_string()),
                Some(record) => {
                    record.target = texture;
                    record.viewport = None;
                    Ok(())
                }
            })
        };
        self.code(result)
    }

    fn render_target(&self, renderer: RendererId) -> Option<TextureId> {
        self.state.borrow().renderers.get(renderer).and_then(|record| record.target)
    }

    fn set_draw_color(&self, renderer: RendererId, color: Color) -> i32 {
        self.with_renderer(renderer, |record| {
            record.draw_color = color;
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn draw_color(&self, renderer: RendererId) -> Option<Color> {
        self.with_renderer(renderer, |record| Ok(record.draw_color))
    }

    fn render_clear(&self, renderer: RendererId) -> i32 {
        self.draw(renderer, |canvas, state| {
            let bounds = canvas.bounds();
            canvas.fill(&bounds, state.color, BlendMode::None, &bounds);
        })
    }

    fn render_present(&self, renderer: RendererId) {
        let presented = self.with_renderer(renderer, |record| {
            record.front = record.framebuffer.clone();
            Ok(())
        });
        if presented.is_some() {
            self.probe.counters.borrow_mut().presents += 1;
        }
    }

    fn draw_point(&self, renderer: RendererId, x: i32, y: i32) -> i32 {
        self.draw_point_f(renderer, x as f32, y as f32)
    }

    fn draw_point_f(&self, renderer: RendererId, x: f32, y: f32) -> i32 {
        self.draw(renderer, |canvas, state| {
            let (x, y) = state.point(x, y);
            canvas.plot(x, y, state.color, state.blend_mode, &state.clip);
        })
    }

    fn draw_line(&self, renderer: RendererId, x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
        self.draw_line_f(renderer, x1 as f32, y1 as f32, x2 as f32, y2 as f32)
    }

    fn draw_line_f(&self, renderer: RendererId, x1: f32, y1: f32, x2: f32, y2: f32) -> i32 {
        self.draw(renderer, |canvas, state| {
            let from = state.point(x1, y1);
            let to = state.point(x2, y2);
            canvas.line(from, to, state.color, state.blend_mode, &state.clip);
        })
    }

    fn fill_rect(&self, renderer: RendererId, rect: Option<&Rect<i32>>) -> i32 {
        match rect {
            Some(rect) => self.fill_rects_scaled(renderer, &[to_f32(rect)]),
            None => self.draw(renderer, |canvas, state| {
                canvas.fill(&state.clip, state.color, state.blend_mode, &state.clip);
            }),
        }
    }

    fn fill_rect_f(&self, renderer: RendererId, rect: Option<&Rect<f32>>) -> i32 {
        match rect {
            Some(rect) => self.fill_rects_scaled(renderer, std::slice::from_ref(rect)),
            None => self.fill_rect(renderer, None),
        }
    }

    fn fill_rects(&self, renderer: RendererId, rects: &[Rect<i32>]) -> i32 {
        let rects: Vec<_> = rects.iter().map(to_f32).collect();
        self.fill_rects_scaled(renderer, &rects)
    }

    fn fill_rects_f(&self, renderer: RendererId, rects: &[Rect<f32>]) -> i32 {
        self.fill_rects_scaled(renderer, rects)
    }

    fn render_copy(
        &self,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<i32>>,
    ) -> i32 {
        let destination = destination.map(to_f32);
        self.copy_scaled(renderer, texture, source, destination.as_ref())
    }

    fn render_copy_f(
        &self,
        renderer: RendererId,
        texture: TextureId,
        source: Option<&Rect<i32>>,
        destination: Option<&Rect<f32>>,
    ) -> i32 {
        self.copy_scaled(renderer, texture, source, destination)
    }

    fn read_pixels(&self, renderer: RendererId, rect: Option<&Rect<i32>>) -> Option<Vec<Color>> {
        self.draw_with(renderer, |canvas, state| {
            let area = match rect {
                Some(rect) => {
                    let shifted = Rect {
                        x: rect.x.saturating_add(state.origin.0),
                        y: rect.y.saturating_add(state.origin.1),
                        ..*rect
                    };
                    intersect(&shifted, &state.clip).ok_or_else(|| "Read rectangle is empty".to_string())?
                }
                None => state.clip,
            };
            canvas
                .region(&area)
                .ok_or_else(|| "Read rectangle is outside the target".to_string())
        })
    }

    fn create_texture(&self, renderer: RendererId, format: u32, access: i32, width: i32, height: i32) -> Option<TextureId> {
        let created = (|| {
            let format = parse_format(format)?;
            let access = TextureAccess::from_raw(access).ok_or_else(|| "Invalid texture access".to_string())?;
            if width <= 0 || height <= 0 {
                return Err("Texture dimensions can't be 0".to_string());
            }
            if width > MAX_DIMENSION || height > MAX_DIMENSION {
                return Err(format!("Texture dimensions are limited to {MAX_DIMENSION}x{MAX_DIMENSION}"));
            }
            let mut state = self.state.borrow_mut();
            if !state.renderers.contains_key(renderer) {
                return Err("Invalid renderer".to_string());
            }
            Ok(state.textures.insert(TextureRecord {
                renderer,
                format,
                access,
                canvas: Canvas::new(width, height, Color::TRANSPARENT),
            }))
        })();
        let id = self.check(created)?;
        self.probe.record_created(ResourceClass::Texture);
        Some(id)
    }

    fn create_texture_from_surface(&self, renderer: RendererId, surface: SurfaceId) -> Option<TextureId> {
        let created = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            match (state.renderers.contains_key(renderer), state.surfaces.get(surface)) {
                (false, _) => Err("Invalid renderer".to_string()),
                (_, None) => Err("Invalid surface".to_string()),
                (true, Some(record)) if record.canvas.width() == 0 || record.canvas.height() == 0 => {
                    Err("Texture dimensions can't be 0".to_string())
                }
                (true, Some(record)) => Ok(state.textures.insert(TextureRecord {
                    renderer,
                    format: record.format,
                    access: TextureAccess::Static,
                    canvas: record.canvas.clone(),
                })),
            }
        };
        let id = self.check(created)?;
        self.probe.record_created(ResourceClass::Texture);
        Some(id)
    }

    fn destroy_texture(&self, texture: TextureId) {
        if self.release(|state| &mut state.textures, texture, ResourceClass::Texture).is_some() {
            for renderer in self.state.borrow_mut().renderers.values_mut() {
                if renderer.target == Some(texture) {
                    renderer.target = None;
                    renderer.viewport = None;
                }
            }
        }
    }

    fn query_texture(&self, texture: TextureId) -> Option<TextureQuery> {
        let result = self
            .state
            .borrow()
            .textures
            .get(texture)
            .map(|record| TextureQuery {
                format: record.format.to_raw(),
                access: record.access.to_raw(),
                width: record.canvas.width(),
                height: record.canvas.height(),
            })
            .ok_or_else(|| "Invalid texture".to_string());
        self.check(result)
    }

    fn update_texture(&self, texture: TextureId, rect: Option<&Rect<i32>>, pixels: &[Color]) -> i32 {
        let result = match self.state.borrow_mut().textures.get_mut(texture) {
            None => Err("Invalid texture".to_string()),
            Some(record) => {
                let area = rect.copied().unwrap_or_else(|| record.canvas.bounds());
                if record.canvas.write_region(&area, pixels) {
                    if !record.format.has_alpha() {
                        record.canvas.drop_alpha();
                    }
                    Ok(())
                } else {
                    Err("Parameter 'pixels' is invalid".to_string())
                }
            }
        };
        self.code(result)
    }

    fn create_surface(&self, width: i32, height: i32, format: u32) -> Option<SurfaceId> {
        let canvas = (|| {
            let format = parse_format(format)?;
            check_surface_size(width, height)?;
            Ok((format, Canvas::new(width, height, Color::TRANSPARENT)))
        })();
        let (format, canvas) = self.check(canvas)?;
        Some(self.insert_surface(format, canvas))
    }

    fn create_surface_from(&self, width: i32, height: i32, format: u32, pixels: &[Color]) -> Option<SurfaceId> {
        let canvas = (|| {
            let format = parse_format(format)?;
            check_surface_size(width, height)?;
            let mut canvas = Canvas::from_pixels(width, height, pixels.to_vec()).ok_or_else(|| {
                format!("Parameter 'pixels' is invalid: expected {} pixels, got {}", width * height, pixels.len())
            })?;
            if !format.has_alpha() {
                canvas.drop_alpha();
            }
            Ok((format, canvas))
        })();
        let (format, canvas) = self.check(canvas)?;
        Some(self.insert_surface(format, canvas))
    }

    fn load_bmp(&self, path: &Path) -> Option<SurfaceId> {
        let canvas = self.check(codec::decode_bmp(path))?;
        Some(self.insert_surface(PixelFormat::RGBA32, canvas))
    }

    fn save_bmp(&self, surface: SurfaceId, path: &Path) -> i32 {
        self.with_surface(surface, |record| codec::encode_bmp(&record.canvas, path))
            .map_or(-1, |()| 0)
    }

    fn free_surface(&self, surface: SurfaceId) {
        self.release(|state| &mut state.surfaces, surface, ResourceClass::Surface);
    }

    fn convert_surface(&self, surface: SurfaceId, format: u32, flags: u32) -> Option<SurfaceId> {
        if flags != 0 {
            self.fail("Parameter 'flags' is invalid");
            return None;
        }
        let format = self.check(parse_format(format))?;
        let mut canvas = self.with_surface(surface, |record| Ok(record.canvas.clone()))?;
        if !format.has_alpha() {
            canvas.drop_alpha();
        }
        Some(self.insert_surface(format, canvas))
    }

    fn surface_info(&self, surface: SurfaceId) -> Option<SurfaceInfo> {
        self.with_surface(surface, |record| {
            Ok(SurfaceInfo {
                width: record.canvas.width(),
                height: record.canvas.height(),
                format: record.format.to_raw(),
            })
        })
    }

    fn surface_pixels(&self, surface: SurfaceId) -> Option<Vec<Color>> {
        self.with_surface(surface, |record| Ok(record.canvas.pixels().to_vec()))
    }

    fn fill_surface_rect(&self, surface: SurfaceId, rect: Option<&Rect<i32>>, color: Color) -> i32 {
        self.with_surface(surface, |record| {
            let bounds = record.canvas.bounds();
            let area = rect.copied().unwrap_or(bounds);
            let color = if record.format.has_alpha() { color } else { Color { a: 255, ..color } };
            record.canvas.fill(&area, color, BlendMode::None, &bounds);
            Ok(())
        })
        .map_or(-1, |()| 0)
    }

    fn stream_from_file(&self, path: &Path, mode: &str) -> Option<StreamId> {
        let record = self.check(StreamRecord::open(path, mode))?;
        let id = self.state.borrow_mut().streams.insert(record);
        self.probe.record_created(ResourceClass::Stream);
        Some(id)
    }

    fn stream_from_memory(&self, data: Vec<u8>) -> Option<StreamId> {
        let id = self.state.borrow_mut().streams.insert(StreamRecord::memory(data));
        self.probe.record_created(ResourceClass::Stream);
        Some(id)
    }

    fn stream_close(&self, stream: StreamId) -> i32 {
        match self.release(|state| &mut state.streams, stream, ResourceClass::Stream) {
            Some(record) => self.code(record.close()),
            None => -1,
        }
    }

    fn stream_read(&self, stream: StreamId, buffer: &mut [u8], size: usize, maxnum: usize) -> usize {
        self.with_stream(stream, |record| record.read(buffer, size, maxnum))
            .unwrap_or(0)
    }

    fn stream_write(&self, stream: StreamId, data: &[u8], size: usize, num: usize) -> usize {
        self.with_stream(stream, |record| record.write(data, size, num))
            .unwrap_or(0)
    }

    fn stream_seek(&self, stream: StreamId, offset: i64, whence: i32) -> i64 {
        self.with_stream(stream, |record| record.seek(offset, whence))
            .unwrap_or(-1)
    }

    fn stream_size(&self, stream: StreamId) -> i64 {
        self.with_stream(stream, |record| record.size()).unwrap_or(-1)
    }

    fn pump_events(&self) {
        let injected = self.injector.drain();
        if !self.events_active() {
            return;
        }
        for event in injected {
            self.enqueue(event);
        }
    }

    fn poll_event(&self) -> Option<Event> {
        self.pump_events();
        self.state.borrow_mut().queue.pop()
    }

    fn wait_event_timeout(&self, event: &mut Option<Event>, timeout_ms: i32) -> i32 {
        if !self.events_active() {
            self.fail("The event system has not been initialized");
            return -1;
        }
        let deadline = u64::try_from(timeout_ms)
            .ok()
            .map(|millis| Instant::now() + Duration::from_millis(millis));

        loop {
            if let Some(next) = self.poll_event() {
                *event = Some(next);
                return 1;
            }
            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => return 0,
                },
                None => None,
            };
            self.injector.wait(remaining);
        }
    }

    fn push_event(&self, event: Event) -> i32 {
        if !self.events_active() {
            self.fail("The event system has not been initialized");
            return -1;
        }
        self.enqueue(event)
    }

    fn register_events(&self, count: i32) -> u32 {
        let registered = self.state.borrow_mut().queue.register(count);
        self.check(registered).unwrap_or(u32::MAX)
    }

    fn flush_events(&self, min: u32, max: u32) {
        self.pump_events();
        self.state.borrow_mut().queue.flush(min, max);
    }

    fn set_event_filter(&self, filter: Option<EventFilter>) {
        self.callbacks.borrow_mut().filter = filter;
    }

    fn has_event_filter(&self) -> bool {
        self.callbacks.borrow().filter.is_some()
    }

    fn add_event_watch(&self, watch: EventFilter) -> u64 {
        let mut callbacks = self.callbacks.borrow_mut();
        callbacks.next_watch += 1;
        let id = callbacks.next_watch;
        callbacks.watches.push((id, watch));
        id
    }

    fn del_event_watch(&self, id: u64) {
        let mut callbacks = self.callbacks.borrow_mut();
        callbacks.watches.retain(|(watch, _)| *watch != id);
        if self.dispatching.get() {
            callbacks.removed.push(id);
        }
    }

    fn image_init(&self, flags: u32) -> u32 {
        let requested = ImageInitFlags::from_bits_truncate(flags);
        let supported = ImageInitFlags::PNG | ImageInitFlags::JPG;
        let unsupported = requested - supported;
        if !unsupported.is_empty() {
            self.fail(format!("Image formats {unsupported:?} are not supported"));
        }
        let mut state = self.state.borrow_mut();
        state.image_formats |= requested & supported;
        state.image_formats.bits()
    }

    fn image_quit(&self) {
        self.state.borrow_mut().image_formats = ImageInitFlags::empty();
    }

    fn image_load(&self, path: &Path) -> Option<SurfaceId> {
        let canvas = self.check(codec::decode_image(path))?;
        Some(self.insert_surface(PixelFormat::RGBA32, canvas))
    }

    fn image_load_sized_svg(&self, source: StreamId, width: i32, height: i32) -> Option<SurfaceId> {
        let data = self.with_stream(source, StreamRecord::read_to_end)?;
        let canvas = self.check(codec::rasterize_svg(&data, width, height))?;
        Some(self.insert_surface(PixelFormat::RGBA32, canvas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> HeadlessPlatform {
        let platform = HeadlessPlatform::new();
        assert_eq!(platform.init(InitFlags::VIDEO.bits()), 0);
        platform
    }

    #[test]
    fn test_unavailable_subsystem_names_it() {
        let platform = HeadlessPlatform::new();
        assert_eq!(platform.init(InitFlags::SENSOR.bits()), -1);
        assert!(platform.last_error().starts_with("Sensor"));
        assert_eq!(platform.was_init(InitFlags::EVERYTHING.bits()), 0);
    }

    #[test]
    fn test_centered_window_position() {
        let platform = video();
        let window = platform
            .create_window("c", WINDOW_POS_CENTERED, WINDOW_POS_UNDEFINED, 20, 10, 0)
            .expect("window");
        assert_eq!(platform.window_position(window), Some((950, 0)));
    }

    #[test]
    fn test_double_release_is_counted() {
        let platform = video();
        let probe = platform.probe();
        let surface = platform.create_surface(1, 1, PixelFormat::Rgba8888.to_raw()).expect("surface");

        platform.free_surface(surface);
        platform.free_surface(surface);
        assert_eq!(probe.released(ResourceClass::Surface), 1);
        assert_eq!(probe.invalid_releases(), 1);
        assert!(!platform.last_error().is_empty());
    }

    #[test]
    fn test_destroying_window_detaches_renderer() {
        let platform = video();
        let window = platform.create_window("w", 0, 0, 4, 4, WindowFlags::HIDDEN.bits()).expect("window");
        let renderer = platform.create_renderer(window, -1, 0).expect("renderer");

        platform.destroy_window(window);
        assert_eq!(platform.render_clear(renderer), 0);
        platform.destroy_renderer(renderer);
        assert_eq!(platform.probe().invalid_releases(), 0);
    }

    #[test]
    fn test_destroyed_target_resets_renderer() {
        let platform = video();
        let window = platform.create_window("w", 0, 0, 4, 4, WindowFlags::HIDDEN.bits()).expect("window");
        let renderer = platform.create_renderer(window, -1, 0).expect("renderer");
        let texture = platform
            .create_texture(renderer, PixelFormat::Rgba8888.to_raw(), TextureAccess::Target.to_raw(), 2, 2)
            .expect("texture");

        assert_eq!(platform.set_render_target(renderer, Some(texture)), 0);
        assert_eq!(platform.viewport(renderer), Some(Rect::new(0, 0, 2, 2)));
        platform.destroy_texture(texture);
        assert_eq!(platform.render_target(renderer), None);
        assert_eq!(platform.viewport(renderer), Some(Rect::new(0, 0, 4, 4)));
    }

    #[test]
    fn test_present_snapshots_framebuffer() {
        let platform = video();
        let window = platform.create_window("w", 0, 0, 2, 1, WindowFlags::HIDDEN.bits()).expect("window");
        let renderer = platform.create_renderer(window, -1, 0).expect("renderer");

        platform.set_draw_color(renderer, Color::WHITE);
        platform.render_clear(renderer);
        assert_eq!(platform.presented_frame(renderer), Some(vec![Color::BLACK; 2]));
        platform.render_present(renderer);
        assert_eq!(platform.presented_frame(renderer), Some(vec![Color::WHITE; 2]));
    }

    #[test]
    fn test_copy_from_foreign_renderer_fails() {
        let platform = video();
        let first = platform.create_window("a", 0, 0, 4, 4, WindowFlags::HIDDEN.bits()).expect("window");
        let second = platform.create_window("b", 0, 0, 4, 4, WindowFlags::HIDDEN.bits()).expect("window");
        let owner = platform.create_renderer(first, -1, 0).expect("renderer");
        let other = platform.create_renderer(second, -1, 0).expect("renderer");
        let texture = platform
            .create_texture(owner, PixelFormat::Rgba8888.to_raw(), TextureAccess::Static.to_raw(), 1, 1)
            .expect("texture");

        assert_eq!(platform.render_copy(other, texture, None, None), -1);
        assert_eq!(platform.last_error(), "Texture was not created with this renderer");
    }

    #[test]
    fn test_filter_may_replace_itself() {
        let platform = HeadlessPlatform::new();
        platform.init(InitFlags::EVENTS.bits());
        platform.set_event_filter(Some(Box::new(|_| false)));

        assert_eq!(platform.push_event(Event::Quit { timestamp: 0 }), 0);
        assert!(platform.has_event_filter());
        platform.set_event_filter(None);
        assert_eq!(platform.push_event(Event::Quit { timestamp: 0 }), 1);
    }

    #[test]
    fn test_injected_events_dropped_without_event_subsystem() {
        let platform = HeadlessPlatform::new();
        let injector = platform.injector();
        injector.inject(Event::Quit { timestamp: 0 });

        assert_eq!(platform.poll_event(), None);
        platform.init(InitFlags::EVENTS.bits());
        assert_eq!(platform.poll_event(), None);
    }

    #[test]
    fn test_push_stamps_time() {
        let platform = HeadlessPlatform::new();
        platform.init(InitFlags::EVENTS.bits());
        std::thread::sleep(Duration::from_millis(5));
        platform.push_event(Event::Quit { timestamp: 0 });

        let event = platform.poll_event().expect("event");
        assert!(event.timestamp() >= 5);
    }

    #[test]
    fn test_quit_resets_subsystems() {
        let platform = video();
        platform.push_event(Event::Quit { timestamp: 0 });
        platform.quit();

        assert_eq!(platform.was_init(InitFlags::EVERYTHING.bits()), 0);
        assert_eq!(platform.push_event(Event::Quit { timestamp: 0 }), -1);
        assert_eq!(platform.probe().quit_calls(), 1);
    }
}
