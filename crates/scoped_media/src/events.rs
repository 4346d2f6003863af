//! Event queue access
//!
//! The native library keeps one global event queue. [`EventPump`] is a thin
//! accessor over it: polling never blocks, waiting blocks the calling thread,
//! and a timed wait returns the event it actually received or `None` once the
//! timeout elapses.

use std::rc::Rc;
use std::time::Duration;

use crate::context::Runtime;
use crate::error::{self, MediaError, MediaResult};

/// Numeric event type, as used by flush ranges and custom registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventType(pub u32);

impl EventType {
    /// Lower bound of the event type space
    pub const FIRST: Self = Self(0);
    /// Application quit request
    pub const QUIT: Self = Self(0x100);
    /// Window state change
    pub const WINDOW: Self = Self(0x200);
    /// Key pressed
    pub const KEY_DOWN: Self = Self(0x300);
    /// Key released
    pub const KEY_UP: Self = Self(0x301);
    /// Mouse moved
    pub const MOUSE_MOTION: Self = Self(0x400);
    /// Mouse button pressed
    pub const MOUSE_BUTTON_DOWN: Self = Self(0x401);
    /// Mouse button released
    pub const MOUSE_BUTTON_UP: Self = Self(0x402);
    /// First type available to [`EventPump::register`]
    pub const USER: Self = Self(0x8000);
    /// Upper bound of the event type space
    pub const LAST: Self = Self(0xFFFF);

    /// Offset into a block of registered types
    #[must_use]
    pub const fn offset(self, index: u32) -> Self {
        Self(self.0 + index)
    }
}

/// Window state changes carried by [`Event::Window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Window became visible
    Shown,
    /// Window was hidden
    Hidden,
    /// Window moved to a new position
    Moved(i32, i32),
    /// Client area resized
    Resized(i32, i32),
    /// Window gained keyboard focus
    FocusGained,
    /// Window lost keyboard focus
    FocusLost,
    /// Close requested by the window manager
    Close,
}

/// Event delivered through the native queue
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Application quit request
    Quit {
        /// Milliseconds since initialization
        timestamp: u32,
    },
    /// Window state change
    Window {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Numeric id of the affected window
        window_id: u32,
        /// What changed
        event: WindowEvent,
    },
    /// Key pressed
    KeyDown {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Window with keyboard focus
        window_id: u32,
        /// Virtual key code
        keycode: i32,
        /// Auto-repeat
        repeat: bool,
    },
    /// Key released
    KeyUp {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Window with keyboard focus
        window_id: u32,
        /// Virtual key code
        keycode: i32,
    },
    /// Mouse moved
    MouseMotion {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Window with mouse focus
        window_id: u32,
        /// Cursor x
        x: i32,
        /// Cursor y
        y: i32,
    },
    /// Mouse button pressed
    MouseButtonDown {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Window with mouse focus
        window_id: u32,
        /// Button index, 1 = left
        button: u8,
        /// Cursor x
        x: i32,
        /// Cursor y
        y: i32,
    },
    /// Mouse button released
    MouseButtonUp {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Window with mouse focus
        window_id: u32,
        /// Button index, 1 = left
        button: u8,
        /// Cursor x
        x: i32,
        /// Cursor y
        y: i32,
    },
    /// Application-defined event of a registered type
    User {
        /// Milliseconds since initialization
        timestamp: u32,
        /// Registered type
        type_id: EventType,
        /// Associated window, 0 for none
        window_id: u32,
        /// Application code
        code: i32,
        /// Application payload
        data: i64,
    },
}

impl Event {
    /// Build a custom event of a registered type
    pub const fn user(type_id: EventType, code: i32, data: i64) -> Self {
        Self::User { timestamp: 0, type_id, window_id: 0, code, data }
    }

    /// Numeric type of this event
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Quit { .. } => EventType::QUIT,
            Self::Window { .. } => EventType::WINDOW,
            Self::KeyDown { .. } => EventType::KEY_DOWN,
            Self::KeyUp { .. } => EventType::KEY_UP,
            Self::MouseMotion { .. } => EventType::MOUSE_MOTION,
            Self::MouseButtonDown { .. } => EventType::MOUSE_BUTTON_DOWN,
            Self::MouseButtonUp { .. } => EventType::MOUSE_BUTTON_UP,
            Self::User { type_id, .. } => *type_id,
        }
    }

    /// Milliseconds since initialization when the event was queued
    pub const fn timestamp(&self) -> u32 {
        match self {
            Self::Quit { timestamp }
            | Self::Window { timestamp, .. }
            | Self::KeyDown { timestamp, .. }
            | Self::KeyUp { timestamp, .. }
            | Self::MouseMotion { timestamp, .. }
            | Self::MouseButtonDown { timestamp, .. }
            | Self::MouseButtonUp { timestamp, .. }
            | Self::User { timestamp, .. } => *timestamp,
        }
    }

    /// Stamp the event; done by the queue when the event is pushed
    pub fn set_timestamp(&mut self, value: u32) {
        match self {
            Self::Quit { timestamp }
            | Self::Window { timestamp, .. }
            | Self::KeyDown { timestamp, .. }
            | Self::KeyUp { timestamp, .. }
            | Self::MouseMotion { timestamp, .. }
            | Self::MouseButtonDown { timestamp, .. }
            | Self::MouseButtonUp { timestamp, .. }
            | Self::User { timestamp, .. } => *timestamp = value,
        }
    }
}

/// Filter or watch callback; a filter returning `false` drops the event
pub type EventFilter = Box<dyn FnMut(&Event) -> bool>;

/// Identifies an installed watch callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Accessor for the native event queue
pub struct EventPump {
    runtime: Rc<Runtime>,
}

impl EventPump {
    pub(crate) const fn new(runtime: Rc<Runtime>) -> Self {
        Self { runtime }
    }

    /// Gather pending input into the queue
    pub fn pump(&self) {
        self.runtime.platform().pump_events();
    }

    /// Next queued event, without blocking
    pub fn poll(&self) -> Option<Event> {
        self.runtime.platform().poll_event()
    }

    /// Drain every currently queued event
    pub fn poll_iter(&self) -> impl Iterator<Item = Event> + '_ {
        std::iter::from_fn(move || self.poll())
    }

    /// Block until an event is available
    pub fn wait(&self) -> MediaResult<Event> {
        let platform = self.runtime.platform();
        let mut event = None;
        let code = platform.wait_event_timeout(&mut event, -1);
        error::status(platform, code, MediaError::EventWait)?;
        match event {
            Some(event) => Ok(event),
            None => Err(MediaError::EventWait(platform.last_error())),
        }
    }

    /// Block until an event is available or `timeout` elapses
    ///
    /// Returns `Ok(None)` on timeout. Timeouts beyond `i32::MAX` milliseconds
    /// are clamped.
    pub fn wait_timeout(&self, timeout: Duration) -> MediaResult<Option<Event>> {
        let platform = self.runtime.platform();
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let mut event = None;
        let code = platform.wait_event_timeout(&mut event, millis);
        error::status(platform, code, MediaError::EventWait)?;
        Ok(event)
    }

    /// Append an event to the queue
    ///
    /// Returns `Ok(false)` when the installed filter dropped the event.
    pub fn push(&self, event: Event) -> MediaResult<bool> {
        let platform = self.runtime.platform();
        let code = platform.push_event(event);
        error::status(platform, code, MediaError::EventPush).map(|code| code == 1)
    }

    /// Reserve `count` consecutive custom event types, returning the first
    pub fn register(&self, count: i32) -> MediaResult<EventType> {
        let platform = self.runtime.platform();
        let first = platform.register_events(count);
        error::non_max(platform, first, MediaError::EventRegistration).map(EventType)
    }

    /// Drop queued events with a type in `min..=max`
    pub fn flush(&self, min: EventType, max: EventType) {
        self.runtime.platform().flush_events(min.0, max.0);
    }

    /// Drop every queued event
    pub fn flush_all(&self) {
        self.flush(EventType::FIRST, EventType::LAST);
    }

    /// Install a filter that sees each event before it is queued
    pub fn set_filter<F>(&self, filter: F)
    where
        F: FnMut(&Event) -> bool + 'static,
    {
        self.runtime.platform().set_event_filter(Some(Box::new(filter)));
    }

    /// Remove the installed filter
    pub fn clear_filter(&self) {
        self.runtime.platform().set_event_filter(None);
    }

    /// Whether a filter is installed
    pub fn has_filter(&self) -> bool {
        self.runtime.platform().has_event_filter()
    }

    /// Add a callback that observes every event accepted into the queue
    pub fn add_watch<F>(&self, mut watch: F) -> WatchId
    where
        F: FnMut(&Event) + 'static,
    {
        let id = self.runtime.platform().add_event_watch(Box::new(move |event| {
            watch(event);
            true
        }));
        WatchId(id)
    }

    /// Remove a watch callback
    pub fn remove_watch(&self, id: WatchId) {
        self.runtime.platform().del_event_watch(id.0);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Instant;

    use super::*;
    use crate::context::{Context, InitFlags};
    use crate::platform::HeadlessPlatform;

    fn events_context() -> Context {
        Context::headless(InitFlags::EVENTS).expect("init")
    }

    #[test]
    fn test_poll_empty_queue_returns_none() {
        let context = events_context();
        let pump = context.event_pump();
        let start = Instant::now();
        assert_eq!(pump.poll(), None);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_wait_timeout_elapses_without_event() {
        let context = events_context();
        let pump = context.event_pump();
        let start = Instant::now();

        let event = pump.wait_timeout(Duration::from_millis(20)).expect("wait");
        assert_eq!(event, None);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(15));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_wait_timeout_returns_received_event() {
        let context = events_context();
        let pump = context.event_pump();
        let custom = pump.register(1).expect("register");
        pump.push(Event::user(custom, 7, 42)).expect("push");

        match pump.wait_timeout(Duration::from_millis(100)).expect("wait") {
            Some(Event::User { type_id, code, data, .. }) => {
                assert_eq!(type_id, custom);
                assert_eq!(code, 7);
                assert_eq!(data, 42);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wait_blocks_until_injected_event() {
        let platform = HeadlessPlatform::new();
        let injector = platform.injector();
        let context = Context::init(platform, InitFlags::EVENTS).expect("init");
        let pump = context.event_pump();

        let sender = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            injector.inject(Event::Quit { timestamp: 0 });
        });

        let event = pump.wait().expect("wait");
        assert_eq!(event.event_type(), EventType::QUIT);
        sender.join().expect("injector thread");
    }

    #[test]
    fn test_wait_without_event_subsystem_fails() {
        let context = Context::headless(InitFlags::TIMER).expect("init");
        let error = context.event_pump().wait().expect_err("events not initialized");
        assert!(matches!(error, MediaError::EventWait(_)));
        assert!(!error.message().is_empty());
    }

    #[test]
    fn test_register_reserves_consecutive_blocks() {
        let context = events_context();
        let pump = context.event_pump();

        let first = pump.register(3).expect("register");
        let second = pump.register(1).expect("register");
        assert_eq!(first, EventType::USER);
        assert_eq!(second, first.offset(3));
    }

    #[test]
    fn test_register_invalid_count_fails() {
        let context = events_context();
        let error = context.event_pump().register(0).expect_err("zero count");
        assert!(matches!(error, MediaError::EventRegistration(_)));
        assert_eq!(error.message(), context.last_error());
    }

    #[test]
    fn test_register_exhaustion_fails() {
        let context = events_context();
        let pump = context.event_pump();
        pump.register(0x7FFF).expect("whole range");
        assert!(matches!(pump.register(1), Err(MediaError::EventRegistration(_))));
    }

    #[test]
    fn test_filter_drops_events() {
        let context = events_context();
        let pump = context.event_pump();
        let custom = pump.register(2).expect("register");
        let rejected = custom.offset(1);

        pump.set_filter(move |event| event.event_type() != rejected);
        assert!(pump.has_filter());

        assert!(pump.push(Event::user(custom, 0, 0)).expect("push"));
        assert!(!pump.push(Event::user(rejected, 0, 0)).expect("push"));

        let queued: Vec<_> = pump.poll_iter().map(|event| event.event_type()).collect();
        assert_eq!(queued, vec![custom]);

        pump.clear_filter();
        assert!(!pump.has_filter());
    }

    #[test]
    fn test_watch_observes_accepted_events() {
        let context = events_context();
        let pump = context.event_pump();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        let watch = pump.add_watch(move |event| sink.borrow_mut().push(event.event_type()));

        pump.push(Event::Quit { timestamp: 0 }).expect("push");
        pump.remove_watch(watch);
        pump.push(Event::Quit { timestamp: 0 }).expect("push");

        assert_eq!(*seen.borrow(), vec![EventType::QUIT]);
    }

    #[test]
    fn test_watch_can_remove_itself_and_others() {
        let context = events_context();
        let pump = context.event_pump();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let pending: Rc<RefCell<Vec<WatchId>>> = Rc::new(RefCell::new(Vec::new()));

        let remover = context.event_pump();
        let (log, doomed) = (Rc::clone(&calls), Rc::clone(&pending));
        let first = pump.add_watch(move |_| {
            log.borrow_mut().push("first");
            for id in doomed.borrow_mut().drain(..) {
                remover.remove_watch(id);
            }
        });
        let log = Rc::clone(&calls);
        let second = pump.add_watch(move |_| log.borrow_mut().push("second"));
        pending.borrow_mut().extend([first, second]);

        pump.push(Event::Quit { timestamp: 0 }).expect("push");
        pump.push(Event::Quit { timestamp: 0 }).expect("push");

        assert_eq!(*calls.borrow(), vec!["first"]);
        assert_eq!(pump.poll_iter().count(), 2);
    }

    #[test]
    fn test_flush_range() {
        let context = events_context();
        let pump = context.event_pump();
        let custom = pump.register(1).expect("register");

        pump.push(Event::Quit { timestamp: 0 }).expect("push");
        pump.push(Event::user(custom, 1, 0)).expect("push");
        pump.flush(EventType::USER, EventType::LAST);

        assert_eq!(pump.poll().map(|event| event.event_type()), Some(EventType::QUIT));
        assert_eq!(pump.poll(), None);

        pump.push(Event::Quit { timestamp: 0 }).expect("push");
        pump.flush_all();
        assert_eq!(pump.poll(), None);
    }
}
