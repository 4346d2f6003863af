//! End-to-end scenarios across handles, factories, accessors and events

use std::time::{Duration, Instant};

use crate::context::{Context, InitFlags};
use crate::error::MediaError;
use crate::events::{Event, EventType};
use crate::geometry::{Color, Point, Rect};
use crate::handle::{SurfaceHandle, TextureHandle};
use crate::logging;
use crate::platform::{HeadlessPlatform, HeadlessProbe, ResourceClass};
use crate::renderer::{self, Renderer, RendererConfig, RendererFlags};
use crate::stream;
use crate::surface::{self, Surface};
use crate::texture::{self, PixelFormat, Texture, TextureAccess, TextureProperties};
use crate::window::{self, Window, WindowConfig, WindowFlags};

const CLASSES: [ResourceClass; 5] = [
    ResourceClass::Window,
    ResourceClass::Renderer,
    ResourceClass::Texture,
    ResourceClass::Surface,
    ResourceClass::Stream,
];

fn probed(flags: InitFlags) -> (Context, HeadlessProbe) {
    logging::init_for_tests();
    let platform = HeadlessPlatform::new();
    let probe = platform.probe();
    (Context::init(platform, flags).expect("init"), probe)
}

fn hidden_window(context: &Context, width: i32, height: i32) -> Window {
    Window::new(context, "scenario", 0, 0, width, height, WindowFlags::HIDDEN).expect("window")
}

#[test]
fn test_every_kind_released_exactly_once() {
    let (context, probe) = probed(InitFlags::VIDEO);
    {
        let window = hidden_window(&context, 16, 16);
        let renderer = Renderer::new(&window, -1, RendererFlags::empty()).expect("renderer");
        let surface = Surface::new(&context, 4, 4, PixelFormat::Rgba8888).expect("surface");
        let _texture = renderer.create_texture_from_surface(&surface).expect("texture");
        let mut source = stream::Stream::from_memory(&context, vec![1, 2, 3]).expect("stream");

        source.close();
        source.close();
        for class in CLASSES {
            assert_eq!(probe.created(class), 1, "{class:?}");
        }
    }

    for class in CLASSES {
        assert_eq!(probe.released(class), 1, "{class:?}");
        assert_eq!(probe.live(class), 0, "{class:?}");
    }
    assert_eq!(probe.invalid_releases(), 0);
}

#[test]
fn test_factory_failures_capture_last_error() {
    let (context, probe) = probed(InitFlags::VIDEO);
    let window = hidden_window(&context, 8, 8);
    let renderer = Renderer::new(&window, -1, RendererFlags::empty()).expect("renderer");

    let captured = |error: MediaError| {
        assert!(!error.message().is_empty(), "{error:?}");
        assert_eq!(error.message(), context.last_error(), "{error:?}");
    };

    captured(window::make_window(&context, "big", 0, 0, 20_000, 20, WindowFlags::empty()).expect_err("window"));
    captured(renderer::make_renderer(&window, -1, RendererFlags::empty()).expect_err("renderer"));
    captured(
        texture::make_texture(&renderer, PixelFormat::Rgba8888, TextureAccess::Static, 0, 0).expect_err("texture"),
    );
    captured(surface::make_surface(&context, -4, 4, PixelFormat::Rgba8888).expect_err("surface"));
    captured(surface::load_bmp(&context, "/missing.bmp").expect_err("bitmap"));
    captured(stream::rw_from_file(&context, "/missing.bin", "rb").expect_err("stream"));

    assert_eq!(probe.created(ResourceClass::Window), 1);
    assert_eq!(probe.created(ResourceClass::Renderer), 1);
    assert_eq!(probe.created(ResourceClass::Texture), 0);
    assert_eq!(probe.created(ResourceClass::Surface), 0);
    assert_eq!(probe.created(ResourceClass::Stream), 0);
}

#[test]
fn test_error_snapshot_survives_later_failures() {
    let (context, _probe) = probed(InitFlags::VIDEO);

    let first = surface::load_bmp(&context, "/first/missing.bmp").expect_err("first");
    let snapshot = first.message().to_string();
    let _second = stream::rw_from_file(&context, "/second/missing.bin", "q").expect_err("second");

    assert_eq!(first.message(), snapshot);
    assert_ne!(context.last_error(), snapshot);
}

#[test]
fn test_moved_handle_releases_once() {
    let (context, probe) = probed(InitFlags::VIDEO);
    let mut original: SurfaceHandle = surface::make_surface(&context, 2, 2, PixelFormat::Rgba8888).expect("surface");
    let raw = original.as_raw();

    let moved = original.take();
    assert!(original.is_empty());
    assert_eq!(moved.as_raw(), raw);

    drop(original);
    assert_eq!(probe.released(ResourceClass::Surface), 0);
    let accessor = Surface::from_handle(moved);
    drop(accessor);
    assert_eq!(probe.released(ResourceClass::Surface), 1);
    assert_eq!(probe.invalid_releases(), 0);
}

#[test]
fn test_poll_and_short_wait_are_bounded() {
    let (context, _probe) = probed(InitFlags::EVENTS);
    let pump = context.event_pump();
    pump.flush_all();

    let start = Instant::now();
    assert_eq!(pump.poll(), None);
    assert_eq!(pump.wait_timeout(Duration::ZERO).expect("zero wait"), None);
    assert_eq!(pump.wait_timeout(Duration::from_millis(5)).expect("short wait"), None);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_config_structs_round_trip_to_queried_properties() {
    let (context, _probe) = probed(InitFlags::VIDEO);
    let window_config = WindowConfig {
        title: "round trip".to_string(),
        width: 640,
        height: 360,
        flags: WindowFlags::HIDDEN,
        ..WindowConfig::default()
    };
    let window = Window::from_config(&context, &window_config).expect("window");
    assert_eq!(window.size(), Ok((640, 360)));
    assert_eq!(window.title().as_deref(), Ok("round trip"));

    let renderer = Renderer::from_config(&window, &RendererConfig::default()).expect("renderer");
    let properties = TextureProperties {
        format: PixelFormat::Bgra8888,
        access: TextureAccess::Target,
        width: 48,
        height: 24,
    };
    let handle: TextureHandle = texture::make_texture_with_properties(&renderer, &properties).expect("texture");
    let texture = Texture::from_handle(handle);
    assert_eq!(texture.properties(), Ok(properties));
}

#[test]
fn test_window_800_by_600() {
    let (context, _probe) = probed(InitFlags::VIDEO);
    let window = Window::new(&context, "scenario", 0, 0, 800, 600, WindowFlags::empty()).expect("window");
    assert_eq!(window.size(), Ok((800, 600)));
}

#[test]
fn test_missing_bitmap_is_surface_load_error() {
    let (context, _probe) = probed(InitFlags::VIDEO);
    match Surface::load_bmp(&context, "does/not/exist.bmp") {
        Err(MediaError::SurfaceLoad(message)) => assert!(!message.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_fill_with_default_draw_color() {
    let (context, _probe) = probed(InitFlags::VIDEO);
    let window = hidden_window(&context, 4, 4);
    let renderer = Renderer::new(&window, -1, RendererFlags::empty()).expect("renderer");

    // Paint the target white without touching the draw color
    let white = Surface::from_pixels(&context, 1, 1, PixelFormat::Rgba8888, &[Color::WHITE]).expect("surface");
    renderer.copy_all(&renderer.create_texture_from_surface(&white).expect("texture")).expect("copy");

    renderer.fill_rect(&Rect::new(0, 0, 2, 2)).expect("fill");
    renderer.fill_rect(&Rect::new(2.0_f32, 2.0, 2.0, 2.0)).expect("float fill");
    renderer.present();

    assert_eq!(renderer.draw_color(), Ok(Color::BLACK));
    let frame = renderer.read_pixels(None).expect("read");
    for (index, pixel) in frame.iter().enumerate() {
        let (x, y) = (index % 4, index / 4);
        let filled = (x < 2 && y < 2) || (x >= 2 && y >= 2);
        let expected = if filled { Color::BLACK } else { Color::WHITE };
        assert_eq!(*pixel, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn test_surface_to_texture_to_screen() {
    let (context, _probe) = probed(InitFlags::VIDEO);
    let window = hidden_window(&context, 6, 6);
    let renderer = Renderer::new(&window, -1, RendererFlags::empty()).expect("renderer");

    let pixels = [Color::rgb(255, 0, 0), Color::rgb(0, 255, 0), Color::rgb(0, 0, 255), Color::WHITE];
    let surface = Surface::from_pixels(&context, 2, 2, PixelFormat::Rgb888, &pixels).expect("surface");
    let texture = renderer.create_texture_from_surface(&surface).expect("texture");
    drop(surface);

    renderer.copy_all(&texture).expect("copy");
    let frame = renderer.read_pixels(None).expect("read");
    assert_eq!(frame.len(), 36);
    assert_eq!(frame[0], Color::rgb(255, 0, 0));
    assert_eq!(frame[5], Color::rgb(0, 255, 0));
    assert_eq!(frame[35], Color::WHITE);
}

#[test]
fn test_window_and_custom_events_queue_in_order() {
    let (context, _probe) = probed(InitFlags::VIDEO);
    let pump = context.event_pump();
    let custom = pump.register(1).expect("register");

    let window = Window::new(&context, "events", 0, 0, 4, 4, WindowFlags::empty()).expect("window");
    window.set_size(8, 8).expect("resize");
    pump.push(Event::user(custom, 3, -1)).expect("push");

    let types: Vec<EventType> = pump.poll_iter().map(|event| event.event_type()).collect();
    assert_eq!(types, vec![EventType::WINDOW, EventType::WINDOW, custom]);
}

#[test]
fn test_handles_keep_library_alive() {
    let (context, probe) = probed(InitFlags::VIDEO);
    let surface = Surface::new(&context, 1, 1, PixelFormat::Rgba8888).expect("surface");

    drop(context);
    assert_eq!(probe.quit_calls(), 0);
    assert_eq!(surface.size(), Ok(Point::new(1, 1)));

    drop(surface);
    assert_eq!(probe.released(ResourceClass::Surface), 1);
    assert_eq!(probe.quit_calls(), 1);
}
