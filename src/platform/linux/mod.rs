//! Linux implementation.
//!
//! The `x11` feature enables a listen-only XRecord backend. Without it there
//! is no native backend and `run()` fails with [`Error::NotSupported`](crate::Error::NotSupported).

#[cfg(feature = "x11")]
mod keycodes;
#[cfg(feature = "x11")]
mod x11;

#[cfg(feature = "x11")]
pub use x11::X11Hooks;

use crate::hook::HookBackend;

#[cfg(feature = "x11")]
pub(crate) fn native_backend() -> Box<dyn HookBackend> {
    Box::new(X11Hooks::new())
}

#[cfg(not(feature = "x11"))]
pub(crate) fn native_backend() -> Box<dyn HookBackend> {
    Box::new(super::Unsupported("no Linux backend enabled; enable the 'x11' feature"))
}
