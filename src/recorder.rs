//! Callback recording and replay.
//!
//! [`CallbackRecorder`] wraps an [`InputHandler`], timestamps every callback
//! the loop delivers and forwards it unchanged. The resulting [`Recording`]
//! can be saved as JSON and later replayed into any handler, which is handy
//! for exercising host logic without real input.
//!
//! # Example
//!
//! ```no_run
//! use quasimode::recorder::{CallbackRecorder, Recording};
//! use quasimode::{InputConfig, InputHandler, InputManager};
//!
//! struct Host;
//! impl InputHandler for Host {}
//!
//! let mut manager = InputManager::new(InputConfig::default());
//! let mut recorder = CallbackRecorder::new(Host);
//! manager.run(&mut recorder).unwrap();
//!
//! let (_, recording) = recorder.into_parts();
//! recording.save("session.json").unwrap();
//!
//! let recording = Recording::load("session.json").unwrap();
//! recording.replay(&mut Host);
//! ```

use crate::InputHandler;
use crate::error::{Error, Result};
use crate::event::Keypress;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

/// One delivered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "callback", rename_all = "snake_case")]
pub enum Callback {
    Init,
    Keypress { keypress: Keypress },
    SomeKey,
    SomeMouseButton,
    MouseMove { x: i32, y: i32 },
    Tick { ms_passed: u64 },
    TrayMenuItem { menu_id: i32 },
    ExitRequested,
}

impl Callback {
    /// Invoke the matching method on `handler`.
    pub fn deliver<H: InputHandler + ?Sized>(self, handler: &mut H) {
        match self {
            Callback::Init => handler.on_init(),
            Callback::Keypress { keypress } => handler.on_keypress(keypress),
            Callback::SomeKey => handler.on_some_key(),
            Callback::SomeMouseButton => handler.on_some_mouse_button(),
            Callback::MouseMove { x, y } => handler.on_mouse_move(x, y),
            Callback::Tick { ms_passed } => handler.on_tick(ms_passed),
            Callback::TrayMenuItem { menu_id } => handler.on_tray_menu_item(menu_id),
            Callback::ExitRequested => handler.on_exit_requested(),
        }
    }
}

/// A callback with its time relative to the start of recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCallback {
    pub elapsed: Duration,
    pub callback: Callback,
}

/// Ordered callbacks captured from one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub callbacks: Vec<RecordedCallback>,
    pub created_at: SystemTime,
    pub description: Option<String>,
}

impl Recording {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            created_at: SystemTime::now(),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Time of the last recorded callback.
    pub fn duration(&self) -> Duration {
        self.callbacks
            .last()
            .map_or(Duration::ZERO, |c| c.elapsed)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Other(format!("failed to serialize recording: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| Error::Other(format!("failed to write recording file: {e}")))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Other(format!("failed to read recording file: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Other(format!("failed to deserialize recording: {e}")))
    }

    /// Deliver every recorded callback to `handler`, in order, without delays.
    pub fn replay<H: InputHandler + ?Sized>(&self, handler: &mut H) {
        for recorded in &self.callbacks {
            recorded.callback.deliver(handler);
        }
    }
}

impl Default for Recording {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler adapter that records callbacks before forwarding them.
pub struct CallbackRecorder<H> {
    inner: H,
    started: Instant,
    record_ticks: bool,
    recording: Recording,
}

impl<H: InputHandler> CallbackRecorder<H> {
    /// Record everything except ticks.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            started: Instant::now(),
            record_ticks: false,
            recording: Recording::new(),
        }
    }

    /// Also record `on_tick`, which fires every tick interval.
    pub fn with_ticks(mut self, record_ticks: bool) -> Self {
        self.record_ticks = record_ticks;
        self
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut H {
        &mut self.inner
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn into_parts(self) -> (H, Recording) {
        (self.inner, self.recording)
    }

    fn record(&mut self, callback: Callback) {
        if matches!(callback, Callback::Tick { .. }) && !self.record_ticks {
            return;
        }
        self.recording.callbacks.push(RecordedCallback {
            elapsed: self.started.elapsed(),
            callback,
        });
    }

    fn pass(&mut self, callback: Callback) {
        self.record(callback);
        callback.deliver(&mut self.inner);
    }
}

impl<H: InputHandler> InputHandler for CallbackRecorder<H> {
    fn on_init(&mut self) {
        self.started = Instant::now();
        self.pass(Callback::Init);
    }

    fn on_keypress(&mut self, keypress: Keypress) {
        self.pass(Callback::Keypress { keypress });
    }

    fn on_some_key(&mut self) {
        self.pass(Callback::SomeKey);
    }

    fn on_some_mouse_button(&mut self) {
        self.pass(Callback::SomeMouseButton);
    }

    fn on_mouse_move(&mut self, x: i32, y: i32) {
        self.pass(Callback::MouseMove { x, y });
    }

    fn on_tick(&mut self, ms_passed: u64) {
        self.pass(Callback::Tick { ms_passed });
    }

    fn on_tray_menu_item(&mut self, menu_id: i32) {
        self.pass(Callback::TrayMenuItem { menu_id });
    }

    fn on_exit_requested(&mut self) {
        self.pass(Callback::ExitRequested);
    }
}
