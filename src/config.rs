//! Construction parameters for [`InputManager`](crate::InputManager).

use crate::keycode::Key;
use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Default number of events that may wait in the queue before input is dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Input manager configuration.
///
/// # Example
///
/// ```
/// use quasimode::{InputConfig, Key};
/// use std::time::Duration;
///
/// let config = InputConfig::new(Key::Capital, "icons/tray.ico")
///     .with_tick_interval(Duration::from_millis(20))
///     .with_mouse_events(true);
/// assert_eq!(config.quasimode_key, Key::Capital);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputConfig {
    /// Initial binding of the start slot.
    pub quasimode_key: Key,
    /// Icon handed to the shell that renders the tray.
    pub tray_icon_path: PathBuf,
    /// Period of `on_tick`.
    pub tick_interval: Duration,
    /// Queue bound for hook and timer events.
    pub queue_capacity: usize,
    /// Whether mouse events are delivered from the start.
    pub mouse_events: bool,
    /// Start in modal rather than quasimodal behaviour.
    pub modal: bool,
}

impl InputConfig {
    pub fn new(quasimode_key: Key, tray_icon_path: impl Into<PathBuf>) -> Self {
        Self {
            quasimode_key,
            tray_icon_path: tray_icon_path.into(),
            ..Self::default()
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_mouse_events(mut self, enabled: bool) -> Self {
        self.mouse_events = enabled;
        self
    }

    pub fn with_modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            quasimode_key: Key::Capital,
            tray_icon_path: PathBuf::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mouse_events: false,
            modal: false,
        }
    }
}
