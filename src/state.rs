//! Lock-free state shared between the loop, its handles and the hook callback.
//!
//! Nothing in here may block: the hook side reads these atomics from inside
//! the OS input pipeline and `stop()` writes them from arbitrary threads.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};

/// Lifecycle of one `InputManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoopState {
    /// Constructed, `run()` not yet called.
    Created = 0,
    /// `run()` is executing.
    Running = 1,
    /// `stop()` was called; the loop exits at its next queue-processing point.
    StopRequested = 2,
    /// `run()` has returned. Terminal.
    Stopped = 3,
}

impl LoopState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LoopState::Created,
            1 => LoopState::Running,
            2 => LoopState::StopRequested,
            _ => LoopState::Stopped,
        }
    }
}

/// Atomic cell holding a [`LoopState`].
#[derive(Debug)]
pub struct AtomicLoopState(AtomicU8);

impl AtomicLoopState {
    pub fn new(state: LoopState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub fn load(&self) -> LoopState {
        LoopState::from_u8(self.0.load(Ordering::SeqCst))
    }

    #[inline]
    pub fn store(&self, state: LoopState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Move from `from` to `to`. On failure returns the state actually held.
    pub fn transition(&self, from: LoopState, to: LoopState) -> Result<(), LoopState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(LoopState::from_u8)
    }
}

/// What the hook reads to decide whether to pass or swallow an event.
#[derive(Debug)]
pub struct HookGate {
    quasimode_code: AtomicU32,
    mouse_enabled: AtomicBool,
    modal: AtomicBool,
    /// Quasimode key currently held on the hook side, 0 when none.
    held_code: AtomicU32,
    /// Published by the loop while a modal activation is open.
    modal_active: AtomicBool,
    dropped: AtomicU64,
}

impl HookGate {
    pub fn new(quasimode_code: u32, mouse_enabled: bool, modal: bool) -> Self {
        Self {
            quasimode_code: AtomicU32::new(quasimode_code),
            mouse_enabled: AtomicBool::new(mouse_enabled),
            modal: AtomicBool::new(modal),
            held_code: AtomicU32::new(0),
            modal_active: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn quasimode_code(&self) -> u32 {
        self.quasimode_code.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn set_quasimode_code(&self, code: u32) {
        self.quasimode_code.store(code, Ordering::SeqCst);
    }

    #[inline]
    pub fn mouse_enabled(&self) -> bool {
        self.mouse_enabled.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    #[inline]
    pub fn set_mouse_enabled(&self, enabled: bool) -> bool {
        self.mouse_enabled.swap(enabled, Ordering::SeqCst)
    }

    #[inline]
    pub fn modal(&self) -> bool {
        self.modal.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn set_modal(&self, modal: bool) {
        self.modal.store(modal, Ordering::SeqCst);
    }

    #[inline]
    pub fn held_code(&self) -> u32 {
        self.held_code.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn set_held_code(&self, code: u32) {
        self.held_code.store(code, Ordering::SeqCst);
    }

    #[inline]
    pub fn set_modal_active(&self, active: bool) {
        self.modal_active.store(active, Ordering::SeqCst);
    }

    /// Whether ordinary input is currently being withheld from the desktop.
    #[inline]
    pub fn swallowing(&self) -> bool {
        self.held_code() != 0 || self.modal_active.load(Ordering::SeqCst)
    }

    /// Count an event that could not be queued.
    #[inline]
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the number of dropped events since the last call.
    #[inline]
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }

    /// Reset the per-run flags.
    pub fn reset(&self) {
        self.held_code.store(0, Ordering::SeqCst);
        self.modal_active.store(false, Ordering::SeqCst);
        self.dropped.store(0, Ordering::Relaxed);
    }
}
