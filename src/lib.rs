//! # quasimode
//!
//! Input core for keyboard-driven launchers: global keyboard and mouse hooks,
//! quasimode detection and a single-threaded callback loop.
//!
//! A *quasimode* is a mode that lasts only while a key is held, like Shift.
//! Holding the quasimode key (Caps Lock by default) enters it and releasing
//! the key leaves it. While it is active, keystrokes are withheld from other
//! applications and delivered to the host with their codes. Outside it the
//! host only learns that *some* key was pressed.
//!
//! ## Features
//!
//! - Global keyboard hook, plus a mouse hook that can be toggled at runtime
//! - Quasimodal (hold) or modal (toggle) activation, rebindable at runtime
//! - Every callback delivered on the thread that called [`InputManager::run`],
//!   in the order the underlying events happened
//! - Thread-safe [`InputHandle`] for stopping the loop and changing settings
//! - Periodic `on_tick`, tray menu model, caps lock control
//!
//! ## Quick Start
//!
//! ```no_run
//! use quasimode::{InputConfig, InputHandle, InputHandler, InputManager, Keypress};
//!
//! struct Launcher {
//!     handle: InputHandle,
//!     typed: String,
//! }
//!
//! impl InputHandler for Launcher {
//!     fn on_keypress(&mut self, keypress: Keypress) {
//!         match keypress {
//!             Keypress::QuasimodeStart => self.typed.clear(),
//!             Keypress::Down(code) => {
//!                 if let Some(c) = char::from_u32(code).filter(char::is_ascii_alphanumeric) {
//!                     self.typed.push(c);
//!                 }
//!             }
//!             Keypress::QuasimodeEnd => println!("command: {}", self.typed),
//!             Keypress::Up(_) => {}
//!         }
//!     }
//!
//!     fn on_exit_requested(&mut self) {
//!         self.handle.stop();
//!     }
//! }
//!
//! let mut manager = InputManager::new(InputConfig::default());
//! let mut launcher = Launcher {
//!     handle: manager.handle(),
//!     typed: String::new(),
//! };
//! manager.run(&mut launcher).expect("input loop failed");
//! ```
//!
//! ## Platform Support
//!
//! - **Windows**: low-level hooks (`WH_KEYBOARD_LL`, `WH_MOUSE_LL`); input can
//!   be swallowed.
//! - **Linux/X11** (`x11` feature): XRecord, listen-only. Keys still reach the
//!   focused window.
//! - Elsewhere `run()` fails with [`Error::NotSupported`]. The
//!   [`SyntheticHooks`] backend works everywhere and is meant for tests.

pub mod config;
pub mod error;
pub mod event;
pub mod hook;
pub mod keycode;
pub mod keymap;
pub mod manager;
pub mod quasimode;
#[cfg(feature = "recorder")]
pub mod recorder;
pub mod state;
pub mod tray;

mod channel;
mod platform;
mod timer;

// Re-exports
pub use config::InputConfig;
pub use error::{Error, Result};
pub use event::{
    EVENT_KEY_DOWN, EVENT_KEY_QUASIMODE, EVENT_KEY_UP, KeyEvent, KeyEventType, Keypress,
    MouseEvent, TimerEvent, TrayEvent,
};
pub use hook::{HookBackend, HookDecision, HookInjector, HookSink, SyntheticHooks};
pub use keycode::Key;
pub use keymap::{KeycodeTable, QuasimodeSlot};
pub use manager::{InputHandle, InputHandler, InputManager};
#[cfg(all(target_os = "linux", feature = "x11"))]
pub use platform::X11Hooks;
#[cfg(target_os = "windows")]
pub use platform::WindowsHooks;
pub use quasimode::{QuasimodeStateMachine, Transition};
pub use state::LoopState;
pub use tray::{TrayMenu, TrayMenuEntry};
#[cfg(feature = "recorder")]
pub use recorder::{CallbackRecorder, Recording};
