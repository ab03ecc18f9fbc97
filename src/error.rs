//! Error types for the input manager.

use thiserror::Error;

/// Result type alias for quasimode operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the input loop.
#[derive(Debug, Error)]
pub enum Error {
    /// `run()` was called while the loop is already running.
    #[error("input loop is already running")]
    AlreadyRunning,

    /// `run()` was called after the loop has stopped. Stopped is terminal.
    #[error("input loop has already stopped")]
    AlreadyStopped,

    /// The OS refused to install a global input hook.
    #[error("failed to start hook: {0}")]
    HookStartFailed(String),

    /// The tick timer could not be armed.
    #[error("failed to arm tick timer: {0}")]
    TimerFailed(String),

    /// A keycode outside the supported set was passed to a setter.
    #[error("unsupported keycode: {0:#04x}")]
    InvalidKeycode(u32),

    /// A quasimode slot identifier outside the known set.
    #[error("unknown quasimode slot: {0}")]
    InvalidSlot(u32),

    /// Platform-specific error.
    #[error("platform error: {0}")]
    Platform(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),

    /// The requested feature is not supported on this platform.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
