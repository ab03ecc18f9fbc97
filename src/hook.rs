//! Hook bridge: the seam between OS input interception and the loop.
//!
//! A [`HookBackend`] installs the global interceptors and calls into the
//! [`HookSink`] it was given for every native notification. The sink
//! normalizes the notification, posts it to the loop's queue without
//! blocking, and tells the backend whether the event should reach the rest of
//! the desktop.

use crate::channel::EventSender;
use crate::error::{Error, Result};
use crate::event::{Event, KeyEvent, KeyEventType, MouseEvent};
use crate::state::HookGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// What the hook should do with the native event after queuing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookDecision {
    /// Let the event continue to other applications.
    Pass,
    /// Consume the event.
    Swallow,
}

/// Receives native notifications from a backend.
///
/// Every method is allocation-free and never blocks: it only reads atomics
/// and posts into the queue, dropping the event if the queue is full.
#[derive(Debug, Clone)]
pub struct HookSink {
    sender: EventSender,
    gate: Arc<HookGate>,
}

impl HookSink {
    pub(crate) fn new(sender: EventSender, gate: Arc<HookGate>) -> Self {
        Self { sender, gate }
    }

    fn post(&self, event: Event) {
        if !self.sender.post_input(event) {
            self.gate.record_drop();
        }
    }

    /// A key went down or up. `code` is a virtual-key code.
    pub fn key(&self, event_type: KeyEventType, code: u32) -> HookDecision {
        let gate = &self.gate;
        let is_quasimode_key = code == gate.quasimode_code();
        self.post(Event::Key(KeyEvent::new(event_type, code, is_quasimode_key)));

        // Release of the key that opened the current hold, even if the
        // binding changed since.
        let held = gate.held_code();
        if event_type == KeyEventType::KeyUp && held != 0 && held == code {
            gate.set_held_code(0);
            return HookDecision::Swallow;
        }

        if is_quasimode_key {
            if event_type == KeyEventType::KeyDown && !gate.modal() {
                gate.set_held_code(code);
            }
            return HookDecision::Swallow;
        }

        if gate.swallowing() {
            HookDecision::Swallow
        } else {
            HookDecision::Pass
        }
    }

    /// The cursor moved. Moves are never swallowed.
    pub fn mouse_move(&self, x: i32, y: i32) -> HookDecision {
        if self.gate.mouse_enabled() {
            self.post(Event::Mouse(MouseEvent::Move { x, y }));
        }
        HookDecision::Pass
    }

    /// A mouse button changed state or the wheel rotated.
    pub fn mouse_button(&self) -> HookDecision {
        if !self.gate.mouse_enabled() {
            return HookDecision::Pass;
        }
        self.post(Event::Mouse(MouseEvent::ButtonOrWheel));
        if self.gate.swallowing() {
            HookDecision::Swallow
        } else {
            HookDecision::Pass
        }
    }

    /// Whether mouse notifications are wanted at all.
    pub fn mouse_enabled(&self) -> bool {
        self.gate.mouse_enabled()
    }
}

/// OS-specific interception installed for the duration of `run()`.
///
/// All methods are called on the loop thread.
pub trait HookBackend: Send {
    /// Install the keyboard interceptor (and the mouse one when
    /// `sink.mouse_enabled()`). A failure aborts `run()`.
    fn install(&mut self, sink: HookSink) -> Result<()>;

    /// Remove every interceptor. Must be idempotent.
    fn uninstall(&mut self);

    /// Mouse events were toggled while running.
    fn set_mouse_capture(&mut self, _enabled: bool) -> Result<()> {
        Ok(())
    }

    /// Current caps lock state.
    fn caps_lock(&self) -> Result<bool> {
        Err(Error::NotSupported("caps lock control".into()))
    }

    /// Turn caps lock on or off.
    fn set_caps_lock(&mut self, _enabled: bool) -> Result<()> {
        Err(Error::NotSupported("caps lock control".into()))
    }

    /// Whether returning [`HookDecision::Swallow`] actually consumes input.
    fn can_swallow(&self) -> bool {
        true
    }
}

/// State shared between [`SyntheticHooks`] and its [`HookInjector`].
#[derive(Debug, Default)]
struct SyntheticState {
    sink: Mutex<Option<HookSink>>,
    caps_lock: AtomicBool,
    mouse_capture: AtomicBool,
    install_error: Mutex<Option<String>>,
}

/// In-process backend driven by a [`HookInjector`] instead of the OS.
///
/// Events injected while installed take exactly the path native hook
/// notifications take, including the pass/swallow decision.
#[derive(Debug)]
pub struct SyntheticHooks {
    state: Arc<SyntheticState>,
}

/// Feeds synthetic input into an installed [`SyntheticHooks`].
#[derive(Debug, Clone)]
pub struct HookInjector {
    state: Arc<SyntheticState>,
}

impl SyntheticHooks {
    pub fn new() -> (Self, HookInjector) {
        let state = Arc::new(SyntheticState::default());
        (
            Self {
                state: state.clone(),
            },
            HookInjector { state },
        )
    }

    /// A backend whose `install` fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        let (hooks, _) = Self::new();
        if let Ok(mut err) = hooks.state.install_error.lock() {
            *err = Some(reason.to_owned());
        }
        hooks
    }
}

impl HookBackend for SyntheticHooks {
    fn install(&mut self, sink: HookSink) -> Result<()> {
        let error = self
            .state
            .install_error
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))?
            .clone();
        if let Some(reason) = error {
            return Err(Error::HookStartFailed(reason));
        }

        self.state
            .mouse_capture
            .store(sink.mouse_enabled(), Ordering::SeqCst);
        *self
            .state
            .sink
            .lock()
            .map_err(|_| Error::ThreadError("mutex poisoned".into()))? = Some(sink);
        Ok(())
    }

    fn uninstall(&mut self) {
        if let Ok(mut sink) = self.state.sink.lock() {
            sink.take();
        }
        self.state.mouse_capture.store(false, Ordering::SeqCst);
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> Result<()> {
        self.state.mouse_capture.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn caps_lock(&self) -> Result<bool> {
        Ok(self.state.caps_lock.load(Ordering::SeqCst))
    }

    fn set_caps_lock(&mut self, enabled: bool) -> Result<()> {
        self.state.caps_lock.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}

impl HookInjector {
    fn sink(&self) -> Option<HookSink> {
        self.state.sink.lock().ok().and_then(|s| s.clone())
    }

    /// Whether the backend is currently installed.
    pub fn is_installed(&self) -> bool {
        self.sink().is_some()
    }

    /// Inject a key transition. `None` if the backend is not installed.
    pub fn key(&self, event_type: KeyEventType, code: u32) -> Option<HookDecision> {
        self.sink().map(|sink| sink.key(event_type, code))
    }

    pub fn key_down(&self, code: u32) -> Option<HookDecision> {
        self.key(KeyEventType::KeyDown, code)
    }

    pub fn key_up(&self, code: u32) -> Option<HookDecision> {
        self.key(KeyEventType::KeyUp, code)
    }

    /// Press and release `code`.
    pub fn tap(&self, code: u32) {
        self.key_down(code);
        self.key_up(code);
    }

    pub fn mouse_move(&self, x: i32, y: i32) -> Option<HookDecision> {
        self.sink().map(|sink| sink.mouse_move(x, y))
    }

    pub fn mouse_button(&self) -> Option<HookDecision> {
        self.sink().map(|sink| sink.mouse_button())
    }

    /// Caps lock state as last set through the backend.
    pub fn caps_lock(&self) -> bool {
        self.state.caps_lock.load(Ordering::SeqCst)
    }

    /// Preset the caps lock state the backend reports.
    pub fn set_caps_lock(&self, enabled: bool) {
        self.state.caps_lock.store(enabled, Ordering::SeqCst);
    }

    /// Whether the backend currently has its mouse interceptor attached.
    pub fn mouse_capture(&self) -> bool {
        self.state.mouse_capture.load(Ordering::SeqCst)
    }
}
