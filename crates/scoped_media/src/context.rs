//! Library initialization and the shared runtime every handle points back to

use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{self, MediaError, MediaResult};
use crate::events::EventPump;
use crate::platform::{HeadlessPlatform, Platform};

bitflags! {
    /// Subsystems to bring up in [`Context::init`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InitFlags: u32 {
        /// Timer subsystem
        const TIMER = 0x0000_0001;
        /// Audio subsystem
        const AUDIO = 0x0000_0010;
        /// Video subsystem; implies events
        const VIDEO = 0x0000_0020;
        /// Joystick subsystem; implies events
        const JOYSTICK = 0x0000_0200;
        /// Haptic feedback subsystem
        const HAPTIC = 0x0000_1000;
        /// Game controller subsystem; implies joystick
        const GAME_CONTROLLER = 0x0000_2000;
        /// Event queue
        const EVENTS = 0x0000_4000;
        /// Sensor subsystem
        const SENSOR = 0x0000_8000;
        /// Compatibility flag, ignored
        const NO_PARACHUTE = 0x0010_0000;
        /// Every subsystem
        const EVERYTHING = Self::TIMER.bits()
            | Self::AUDIO.bits()
            | Self::VIDEO.bits()
            | Self::JOYSTICK.bits()
            | Self::HAPTIC.bits()
            | Self::GAME_CONTROLLER.bits()
            | Self::EVENTS.bits()
            | Self::SENSOR.bits()
            | Self::NO_PARACHUTE.bits();
    }
}

/// Initialized library instance shared by every handle
///
/// Dropping the last reference shuts the library down, so `quit` can never run
/// while a resource it allocated is still owned.
pub(crate) struct Runtime {
    platform: Box<dyn Platform>,
}

impl Runtime {
    pub(crate) fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        log::debug!("Shutting down native library");
        self.platform.quit();
    }
}

/// Entry point: an initialized native library
///
/// Cloning a context is cheap and shares the same runtime. The context and
/// every handle derived from it are `!Send`: the native library may only be
/// driven from the thread that initialized it.
#[derive(Clone)]
pub struct Context {
    runtime: Rc<Runtime>,
}

impl Context {
    /// Initialize `platform` with the requested subsystems
    pub fn init<P: Platform + 'static>(platform: P, flags: InitFlags) -> MediaResult<Self> {
        let code = platform.init(flags.bits());
        error::status(&platform, code, MediaError::Initialization)?;

        log::info!("Native library initialized with {flags:?}");
        Ok(Self {
            runtime: Rc::new(Runtime { platform: Box::new(platform) }),
        })
    }

    /// Initialize the software headless platform
    pub fn headless(flags: InitFlags) -> MediaResult<Self> {
        Self::init(HeadlessPlatform::new(), flags)
    }

    /// Borrow the underlying platform
    pub fn platform(&self) -> &dyn Platform {
        self.runtime.platform()
    }

    /// Subsystems among `flags` that are currently initialized
    pub fn was_init(&self, flags: InitFlags) -> InitFlags {
        InitFlags::from_bits_truncate(self.platform().was_init(flags.bits()))
    }

    /// Current native last-error text
    pub fn last_error(&self) -> String {
        self.platform().last_error()
    }

    /// Clear the native last-error slot
    pub fn clear_error(&self) {
        self.platform().clear_error();
    }

    /// Access the global event queue
    pub fn event_pump(&self) -> EventPump {
        EventPump::new(Rc::clone(&self.runtime))
    }

    pub(crate) fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("handles", &Rc::strong_count(&self.runtime))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessProbe;

    #[test]
    fn test_init_reports_subsystems() {
        let context = Context::headless(InitFlags::VIDEO).expect("init");
        let active = context.was_init(InitFlags::VIDEO | InitFlags::EVENTS | InitFlags::TIMER);
        assert_eq!(active, InitFlags::VIDEO | InitFlags::EVENTS);
    }

    #[test]
    fn test_unavailable_subsystem_fails_with_message() {
        let error = Context::headless(InitFlags::HAPTIC).expect_err("haptic is unavailable");
        assert!(matches!(error, MediaError::Initialization(_)));
        assert!(error.message().contains("Haptic"));
    }

    #[test]
    fn test_quit_runs_once_after_last_clone() {
        let platform = HeadlessPlatform::new();
        let probe: HeadlessProbe = platform.probe();
        let context = Context::init(platform, InitFlags::EVENTS).expect("init");
        let clone = context.clone();

        drop(context);
        assert_eq!(probe.quit_calls(), 0);
        drop(clone);
        assert_eq!(probe.quit_calls(), 1);
    }
}
