//! Platform-specific hook backends.

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub(crate) use self::windows::native_backend;
#[cfg(target_os = "windows")]
pub use self::windows::WindowsHooks;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use linux::native_backend;
#[cfg(all(target_os = "linux", feature = "x11"))]
pub use linux::X11Hooks;

use crate::error::{Error, Result};
use crate::hook::{HookBackend, HookSink};

/// Backend for platforms without global hooks. Installing it always fails.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(
    any(target_os = "windows", all(target_os = "linux", feature = "x11")),
    allow(dead_code)
)]
pub(crate) struct Unsupported(pub(crate) &'static str);

impl HookBackend for Unsupported {
    fn install(&mut self, _sink: HookSink) -> Result<()> {
        Err(Error::NotSupported(self.0.into()))
    }

    fn uninstall(&mut self) {}
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub(crate) fn native_backend() -> Box<dyn HookBackend> {
    Box::new(Unsupported("global input hooks are not implemented on this platform"))
}
