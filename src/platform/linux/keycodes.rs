//! X11 keycode to virtual-key translation (evdev layout, offset by 8).

use crate::keycode::Key;

/// Translate an X11 keycode. `None` for keys without a virtual-key equivalent.
pub fn keycode_to_key(code: u32) -> Option<Key> {
    let key = match code {
        9 => Key::Escape,
        10 => Key::Num1,
        11 => Key::Num2,
        12 => Key::Num3,
        13 => Key::Num4,
        14 => Key::Num5,
        15 => Key::Num6,
        16 => Key::Num7,
        17 => Key::Num8,
        18 => Key::Num9,
        19 => Key::Num0,
        20 => Key::OemMinus,
        21 => Key::OemPlus,
        22 => Key::Back,
        23 => Key::Tab,
        24 => Key::Q,
        25 => Key::W,
        26 => Key::E,
        27 => Key::R,
        28 => Key::T,
        29 => Key::Y,
        30 => Key::U,
        31 => Key::I,
        32 => Key::O,
        33 => Key::P,
        34 => Key::Oem4,
        35 => Key::Oem6,
        36 => Key::Return,
        37 => Key::LControl,
        38 => Key::A,
        39 => Key::S,
        40 => Key::D,
        41 => Key::F,
        42 => Key::G,
        43 => Key::H,
        44 => Key::J,
        45 => Key::K,
        46 => Key::L,
        47 => Key::Oem1,
        48 => Key::Oem7,
        49 => Key::Oem3,
        50 => Key::LShift,
        51 => Key::Oem5,
        52 => Key::Z,
        53 => Key::X,
        54 => Key::C,
        55 => Key::V,
        56 => Key::B,
        57 => Key::N,
        58 => Key::M,
        59 => Key::OemComma,
        60 => Key::OemPeriod,
        61 => Key::Oem2,
        62 => Key::RShift,
        64 => Key::LMenu,
        65 => Key::Space,
        66 => Key::Capital,
        67 => Key::F1,
        68 => Key::F2,
        69 => Key::F3,
        70 => Key::F4,
        71 => Key::F5,
        72 => Key::F6,
        73 => Key::F7,
        74 => Key::F8,
        75 => Key::F9,
        76 => Key::F10,
        77 => Key::NumLock,
        78 => Key::Scroll,
        95 => Key::F11,
        96 => Key::F12,
        104 => Key::Return,
        105 => Key::RControl,
        107 => Key::Snapshot,
        108 => Key::RMenu,
        110 => Key::Home,
        111 => Key::Up,
        112 => Key::Prior,
        113 => Key::Left,
        114 => Key::Right,
        115 => Key::End,
        116 => Key::Down,
        117 => Key::Next,
        118 => Key::Insert,
        119 => Key::Delete,
        127 => Key::Pause,
        133 => Key::LWin,
        134 => Key::RWin,
        135 => Key::Apps,
        191..=202 => return Key::from_code(Key::F13.code() + (code - 191)),
        _ => return None,
    };
    Some(key)
}
