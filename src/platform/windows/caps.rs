//! Caps lock state through GetKeyState and SendInput.

use crate::error::{Error, Result};
use std::mem::size_of;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyState, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP,
    SendInput, VK_CAPITAL,
};

/// `dwExtraInfo` stamped on the keystrokes we inject, so the hook can skip them.
pub(super) const INJECTED_MARKER: usize = 0x5153_4D44;

/// Whether caps lock is currently toggled on.
pub(super) fn caps_lock_on() -> bool {
    let state = unsafe { GetKeyState(i32::from(VK_CAPITAL.0)) };
    state & 1 != 0
}

fn caps_input(flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VK_CAPITAL,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: INJECTED_MARKER,
            },
        },
    }
}

/// Press and release caps lock if its toggle state differs from `enabled`.
pub(super) fn set_caps_lock(enabled: bool) -> Result<()> {
    if caps_lock_on() == enabled {
        return Ok(());
    }

    let inputs = [
        caps_input(KEYBD_EVENT_FLAGS(0)),
        caps_input(KEYEVENTF_KEYUP),
    ];
    let sent = unsafe { SendInput(&inputs, size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(Error::Platform("SendInput failed for caps lock".into()));
    }
    Ok(())
}
