//! Low-level keyboard and mouse hooks via SetWindowsHookEx.
//!
//! The hooks live on a dedicated thread with its own message pump. Windows
//! invokes low-level hook procedures on the installing thread, so the sink and
//! hook handles are thread-locals there and the procedures never take a lock.

use super::caps;
use crate::error::{Error, Result};
use crate::event::KeyEventType;
use crate::hook::{HookBackend, HookDecision, HookSink};
use std::cell::{Cell, RefCell};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, GetMessageW, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, LLKHF_INJECTED, MSG,
    MSLLHOOKSTRUCT, PM_NOREMOVE, PeekMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_APP, WM_KEYDOWN, WM_KEYUP,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEHWHEEL, WM_MOUSEMOVE,
    WM_MOUSEWHEEL, WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
    WM_XBUTTONDOWN, WM_XBUTTONUP,
};

/// Thread message asking the hook thread to attach (wParam 1) or detach
/// (wParam 0) the mouse hook.
const WM_SET_MOUSE_CAPTURE: u32 = WM_APP + 1;

thread_local! {
    static SINK: RefCell<Option<HookSink>> = const { RefCell::new(None) };
    static KEYBOARD_HOOK: Cell<Option<HHOOK>> = const { Cell::new(None) };
    static MOUSE_HOOK: Cell<Option<HHOOK>> = const { Cell::new(None) };
}

struct HookThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

/// Global hooks backed by `WH_KEYBOARD_LL` and `WH_MOUSE_LL`.
#[derive(Default)]
pub struct WindowsHooks {
    thread: Option<HookThread>,
}

impl WindowsHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn post(&self, msg: u32, wparam: usize) -> Result<()> {
        let Some(thread) = &self.thread else {
            return Ok(());
        };
        unsafe { PostThreadMessageW(thread.thread_id, msg, WPARAM(wparam), LPARAM(0)) }
            .map_err(|e| Error::Platform(format!("PostThreadMessageW failed: {e}")))
    }
}

impl HookBackend for WindowsHooks {
    fn install(&mut self, sink: HookSink) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("quasimode-hook".into())
            .spawn(move || hook_thread(sink, ready_tx))
            .map_err(|e| Error::ThreadError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                self.thread = Some(HookThread { thread_id, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::HookStartFailed("hook thread exited during setup".into()))
            }
        }
    }

    fn uninstall(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let posted =
            unsafe { PostThreadMessageW(thread.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
        if let Err(e) = posted {
            log::warn!("cannot signal hook thread: {e}");
            return;
        }
        if thread.handle.join().is_err() {
            log::warn!("hook thread panicked");
        }
    }

    fn set_mouse_capture(&mut self, enabled: bool) -> Result<()> {
        self.post(WM_SET_MOUSE_CAPTURE, usize::from(enabled))
    }

    fn caps_lock(&self) -> Result<bool> {
        Ok(caps::caps_lock_on())
    }

    fn set_caps_lock(&mut self, enabled: bool) -> Result<()> {
        caps::set_caps_lock(enabled)
    }
}

impl Drop for WindowsHooks {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn hook_thread(sink: HookSink, ready: Sender<Result<u32>>) {
    // Create the thread's message queue before anyone posts to it.
    let mut msg = MSG::default();
    unsafe {
        let _ = PeekMessageW(&mut msg, None, WM_APP, WM_APP, PM_NOREMOVE);
    }

    let capture_mouse = sink.mouse_enabled();
    SINK.with(|s| *s.borrow_mut() = Some(sink));

    let keyboard = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), None, 0) }
    {
        Ok(hook) => hook,
        Err(e) => {
            SINK.with(|s| s.borrow_mut().take());
            let _ = ready.send(Err(Error::HookStartFailed(format!(
                "failed to set keyboard hook: {e}"
            ))));
            return;
        }
    };
    KEYBOARD_HOOK.with(|h| h.set(Some(keyboard)));

    if capture_mouse && let Err(e) = attach_mouse() {
        release_hooks();
        let _ = ready.send(Err(e));
        return;
    }

    let _ = ready.send(Ok(unsafe { GetCurrentThreadId() }));
    log::debug!("hook thread running");

    loop {
        let ret = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        // 0 is WM_QUIT, -1 is an error.
        if ret.0 <= 0 {
            break;
        }
        if msg.message == WM_SET_MOUSE_CAPTURE {
            if msg.wParam.0 != 0 {
                if let Err(e) = attach_mouse() {
                    log::warn!("{e}");
                }
            } else {
                detach_mouse();
            }
        }
    }

    release_hooks();
    log::debug!("hook thread exited");
}

fn attach_mouse() -> Result<()> {
    if MOUSE_HOOK.with(Cell::get).is_some() {
        return Ok(());
    }
    let hook = unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_proc), None, 0) }
        .map_err(|e| Error::HookStartFailed(format!("failed to set mouse hook: {e}")))?;
    MOUSE_HOOK.with(|h| h.set(Some(hook)));
    Ok(())
}

fn detach_mouse() {
    if let Some(hook) = MOUSE_HOOK.with(Cell::take) {
        let _ = unsafe { UnhookWindowsHookEx(hook) };
    }
}

fn release_hooks() {
    detach_mouse();
    if let Some(hook) = KEYBOARD_HOOK.with(Cell::take) {
        let _ = unsafe { UnhookWindowsHookEx(hook) };
    }
    SINK.with(|s| s.borrow_mut().take());
}

fn with_sink(f: impl FnOnce(&HookSink) -> HookDecision) -> HookDecision {
    SINK.with(|s| match s.try_borrow() {
        Ok(sink) => sink.as_ref().map_or(HookDecision::Pass, f),
        Err(_) => HookDecision::Pass,
    })
}

fn finish(
    hook: Option<HHOOK>,
    decision: HookDecision,
    code: i32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match decision {
        HookDecision::Swallow => LRESULT(1),
        HookDecision::Pass => unsafe { CallNextHookEx(hook, code, wparam, lparam) },
    }
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let hook = KEYBOARD_HOOK.with(Cell::get);
    if code != HC_ACTION as i32 {
        return unsafe { CallNextHookEx(hook, code, wparam, lparam) };
    }

    let kb = unsafe { *(lparam.0 as *const KBDLLHOOKSTRUCT) };
    // Our own caps lock toggles must not feed back into the loop.
    if (kb.flags & LLKHF_INJECTED).0 != 0 && kb.dwExtraInfo == caps::INJECTED_MARKER {
        return unsafe { CallNextHookEx(hook, code, wparam, lparam) };
    }

    let event_type = match wparam.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyEventType::KeyDown,
        WM_KEYUP | WM_SYSKEYUP => KeyEventType::KeyUp,
        _ => return unsafe { CallNextHookEx(hook, code, wparam, lparam) },
    };

    let decision = with_sink(|sink| sink.key(event_type, kb.vkCode));
    finish(hook, decision, code, wparam, lparam)
}

unsafe extern "system" fn mouse_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    let hook = MOUSE_HOOK.with(Cell::get);
    if code != HC_ACTION as i32 {
        return unsafe { CallNextHookEx(hook, code, wparam, lparam) };
    }

    let decision = match wparam.0 as u32 {
        WM_MOUSEMOVE => {
            let mouse = unsafe { *(lparam.0 as *const MSLLHOOKSTRUCT) };
            with_sink(|sink| sink.mouse_move(mouse.pt.x, mouse.pt.y))
        }
        WM_LBUTTONDOWN | WM_LBUTTONUP | WM_RBUTTONDOWN | WM_RBUTTONUP | WM_MBUTTONDOWN
        | WM_MBUTTONUP | WM_XBUTTONDOWN | WM_XBUTTONUP | WM_MOUSEWHEEL | WM_MOUSEHWHEEL => {
            with_sink(HookSink::mouse_button)
        }
        _ => HookDecision::Pass,
    };
    finish(hook, decision, code, wparam, lparam)
}
