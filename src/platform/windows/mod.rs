//! Windows implementation using low-level hooks.

mod caps;
mod hooks;

pub use hooks::WindowsHooks;

use crate::hook::HookBackend;

pub(crate) fn native_backend() -> Box<dyn HookBackend> {
    Box::new(WindowsHooks::new())
}
