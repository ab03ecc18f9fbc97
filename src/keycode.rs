//! Physical key codes understood by the input manager.
//!
//! Codes are Windows virtual-key values. Backends on other platforms translate
//! their native codes into this space so hosts only ever see one set of codes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Supported physical keys.
///
/// The discriminant of every variant is its virtual-key code, so
/// `Key::Capital as u32 == 0x14`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Key {
    Back = 0x08,
    Tab = 0x09,
    Return = 0x0D,
    Pause = 0x13,
    Capital = 0x14,
    Escape = 0x1B,
    Space = 0x20,
    Prior = 0x21,
    Next = 0x22,
    End = 0x23,
    Home = 0x24,
    Left = 0x25,
    Up = 0x26,
    Right = 0x27,
    Down = 0x28,
    Snapshot = 0x2C,
    Insert = 0x2D,
    Delete = 0x2E,

    Num0 = 0x30,
    Num1 = 0x31,
    Num2 = 0x32,
    Num3 = 0x33,
    Num4 = 0x34,
    Num5 = 0x35,
    Num6 = 0x36,
    Num7 = 0x37,
    Num8 = 0x38,
    Num9 = 0x39,

    A = 0x41,
    B = 0x42,
    C = 0x43,
    D = 0x44,
    E = 0x45,
    F = 0x46,
    G = 0x47,
    H = 0x48,
    I = 0x49,
    J = 0x4A,
    K = 0x4B,
    L = 0x4C,
    M = 0x4D,
    N = 0x4E,
    O = 0x4F,
    P = 0x50,
    Q = 0x51,
    R = 0x52,
    S = 0x53,
    T = 0x54,
    U = 0x55,
    V = 0x56,
    W = 0x57,
    X = 0x58,
    Y = 0x59,
    Z = 0x5A,

    LWin = 0x5B,
    RWin = 0x5C,
    Apps = 0x5D,

    F1 = 0x70,
    F2 = 0x71,
    F3 = 0x72,
    F4 = 0x73,
    F5 = 0x74,
    F6 = 0x75,
    F7 = 0x76,
    F8 = 0x77,
    F9 = 0x78,
    F10 = 0x79,
    F11 = 0x7A,
    F12 = 0x7B,
    F13 = 0x7C,
    F14 = 0x7D,
    F15 = 0x7E,
    F16 = 0x7F,
    F17 = 0x80,
    F18 = 0x81,
    F19 = 0x82,
    F20 = 0x83,
    F21 = 0x84,
    F22 = 0x85,
    F23 = 0x86,
    F24 = 0x87,

    NumLock = 0x90,
    Scroll = 0x91,

    LShift = 0xA0,
    RShift = 0xA1,
    LControl = 0xA2,
    RControl = 0xA3,
    LMenu = 0xA4,
    RMenu = 0xA5,

    Oem1 = 0xBA,      // ; :
    OemPlus = 0xBB,   // = +
    OemComma = 0xBC,  // , <
    OemMinus = 0xBD,  // - _
    OemPeriod = 0xBE, // . >
    Oem2 = 0xBF,      // / ?
    Oem3 = 0xC0,      // ` ~
    Oem4 = 0xDB,      // [ {
    Oem5 = 0xDC,      // \ |
    Oem6 = 0xDD,      // ] }
    Oem7 = 0xDE,      // ' "
}

const ALL_KEYS: &[Key] = &[
    Key::Back,
    Key::Tab,
    Key::Return,
    Key::Pause,
    Key::Capital,
    Key::Escape,
    Key::Space,
    Key::Prior,
    Key::Next,
    Key::End,
    Key::Home,
    Key::Left,
    Key::Up,
    Key::Right,
    Key::Down,
    Key::Snapshot,
    Key::Insert,
    Key::Delete,
    Key::Num0,
    Key::Num1,
    Key::Num2,
    Key::Num3,
    Key::Num4,
    Key::Num5,
    Key::Num6,
    Key::Num7,
    Key::Num8,
    Key::Num9,
    Key::A,
    Key::B,
    Key::C,
    Key::D,
    Key::E,
    Key::F,
    Key::G,
    Key::H,
    Key::I,
    Key::J,
    Key::K,
    Key::L,
    Key::M,
    Key::N,
    Key::O,
    Key::P,
    Key::Q,
    Key::R,
    Key::S,
    Key::T,
    Key::U,
    Key::V,
    Key::W,
    Key::X,
    Key::Y,
    Key::Z,
    Key::LWin,
    Key::RWin,
    Key::Apps,
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
    Key::F13,
    Key::F14,
    Key::F15,
    Key::F16,
    Key::F17,
    Key::F18,
    Key::F19,
    Key::F20,
    Key::F21,
    Key::F22,
    Key::F23,
    Key::F24,
    Key::NumLock,
    Key::Scroll,
    Key::LShift,
    Key::RShift,
    Key::LControl,
    Key::RControl,
    Key::LMenu,
    Key::RMenu,
    Key::Oem1,
    Key::OemPlus,
    Key::OemComma,
    Key::OemMinus,
    Key::OemPeriod,
    Key::Oem2,
    Key::Oem3,
    Key::Oem4,
    Key::Oem5,
    Key::Oem6,
    Key::Oem7,
];

impl Key {
    /// The virtual-key code of this key.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Look up a key by virtual-key code. Returns `None` for unsupported codes.
    pub fn from_code(code: u32) -> Option<Key> {
        ALL_KEYS.iter().copied().find(|k| k.code() == code)
    }

    /// All supported keys, in code order.
    pub fn all() -> &'static [Key] {
        ALL_KEYS
    }

    /// Check if this is a modifier key.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LShift
                | Key::RShift
                | Key::LControl
                | Key::RControl
                | Key::LMenu
                | Key::RMenu
                | Key::LWin
                | Key::RWin
        )
    }
}

impl TryFrom<u32> for Key {
    type Error = crate::error::Error;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Key::from_code(code).ok_or(crate::error::Error::InvalidKeycode(code))
    }
}
