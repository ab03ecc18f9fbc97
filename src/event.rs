//! Event types that flow from the hook, timer and tray sources into the loop.

use crate::keycode::Key;
use crate::keymap::QuasimodeSlot;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `event_type` value of a key-up notification.
pub const EVENT_KEY_UP: u32 = 0;
/// `event_type` value of a key-down notification.
pub const EVENT_KEY_DOWN: u32 = 1;
/// `event_type` value of a quasimode boundary notification.
pub const EVENT_KEY_QUASIMODE: u32 = 2;

/// Direction of a physical key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyEventType {
    /// The key went down (or auto-repeated).
    KeyDown,
    /// The key was released.
    KeyUp,
}

/// A normalized keyboard event produced by the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyEvent {
    event_type: KeyEventType,
    code: u32,
    is_quasimode_key: bool,
}

impl KeyEvent {
    /// Create a key event. `is_quasimode_key` records whether `code` was the
    /// bound quasimode code when the hook saw it.
    pub fn new(event_type: KeyEventType, code: u32, is_quasimode_key: bool) -> Self {
        Self {
            event_type,
            code,
            is_quasimode_key,
        }
    }

    /// Shorthand for a key-down event.
    pub fn down(code: u32) -> Self {
        Self::new(KeyEventType::KeyDown, code, false)
    }

    /// Shorthand for a key-up event.
    pub fn up(code: u32) -> Self {
        Self::new(KeyEventType::KeyUp, code, false)
    }

    pub fn event_type(&self) -> KeyEventType {
        self.event_type
    }

    /// Virtual-key code of the key.
    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn is_quasimode_key(&self) -> bool {
        self.is_quasimode_key
    }

    pub fn is_down(&self) -> bool {
        self.event_type == KeyEventType::KeyDown
    }
}

/// A normalized mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MouseEvent {
    /// The cursor moved to an absolute screen position.
    Move { x: i32, y: i32 },
    /// Any button press/release or wheel rotation. Which one is not disclosed.
    ButtonOrWheel,
}

/// Timer firing, carrying the time since the previous delivered tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimerEvent {
    pub elapsed_ms: u64,
}

/// Selection of a tray menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrayEvent {
    pub menu_id: i32,
}

/// What the host's `on_keypress` receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Keypress {
    /// The quasimode was entered.
    QuasimodeStart,
    /// The quasimode was left. Emitted exactly once per activation.
    QuasimodeEnd,
    /// A key went down while the quasimode was active.
    Down(u32),
    /// A key was released while the quasimode was active.
    Up(u32),
}

impl Keypress {
    /// Numeric event type (`EVENT_KEY_*`).
    pub fn event_type(&self) -> u32 {
        match self {
            Keypress::QuasimodeStart | Keypress::QuasimodeEnd => EVENT_KEY_QUASIMODE,
            Keypress::Down(_) => EVENT_KEY_DOWN,
            Keypress::Up(_) => EVENT_KEY_UP,
        }
    }

    /// Key code for `Down`/`Up`, or the quasimode slot id for boundaries.
    pub fn code(&self) -> u32 {
        match self {
            Keypress::QuasimodeStart => QuasimodeSlot::Start.id(),
            Keypress::QuasimodeEnd => QuasimodeSlot::End.id(),
            Keypress::Down(code) | Keypress::Up(code) => *code,
        }
    }

    pub(crate) fn from_key(event: &KeyEvent) -> Self {
        match event.event_type() {
            KeyEventType::KeyDown => Keypress::Down(event.code()),
            KeyEventType::KeyUp => Keypress::Up(event.code()),
        }
    }
}

/// Requests marshalled onto the loop thread from handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Apply a caps lock state through the backend.
    CapsLock(bool),
    /// Mouse events were toggled; let the backend attach or detach its hook.
    MouseCapture(bool),
    /// Leave the quasimode without a key transition.
    ExitQuasimode,
    /// Keymap write from a thread other than the loop's.
    Rebind(QuasimodeSlot, Key),
}

/// Everything the loop's queue can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick(TimerEvent),
    Tray(TrayEvent),
    ExitRequested,
    Control(Control),
    /// No-op used to unblock the loop after `stop()`.
    Wake,
}
