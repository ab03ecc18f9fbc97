//! Mapping from quasimode slots to physical keys.

use crate::error::{Error, Result};
use crate::keycode::Key;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Logical quasimode key slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QuasimodeSlot {
    /// Key that enters the quasimode (and exits it on release).
    Start,
    /// Key that ends a modal activation.
    End,
    /// Key that cancels a modal activation.
    Cancel,
}

impl QuasimodeSlot {
    /// Numeric slot identifier (`KEYCODE_QUASIMODE_*`).
    pub fn id(self) -> u32 {
        match self {
            QuasimodeSlot::Start => 0,
            QuasimodeSlot::End => 1,
            QuasimodeSlot::Cancel => 2,
        }
    }

    fn index(self) -> usize {
        self.id() as usize
    }
}

impl TryFrom<u32> for QuasimodeSlot {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        match id {
            0 => Ok(QuasimodeSlot::Start),
            1 => Ok(QuasimodeSlot::End),
            2 => Ok(QuasimodeSlot::Cancel),
            other => Err(Error::InvalidSlot(other)),
        }
    }
}

/// One physical key per quasimode slot. Reassignment replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeycodeTable {
    keys: [Key; 3],
}

impl KeycodeTable {
    /// Create a table with `start` bound to the start slot, Return to end and
    /// Escape to cancel.
    pub fn new(start: Key) -> Self {
        Self {
            keys: [start, Key::Return, Key::Escape],
        }
    }

    pub fn get(&self, slot: QuasimodeSlot) -> Key {
        self.keys[slot.index()]
    }

    pub fn set(&mut self, slot: QuasimodeSlot, key: Key) {
        self.keys[slot.index()] = key;
    }

    /// Validate a raw code and bind it. The table is unchanged on error.
    pub fn set_code(&mut self, slot: QuasimodeSlot, code: u32) -> Result<()> {
        let key = Key::try_from(code)?;
        self.set(slot, key);
        Ok(())
    }

    /// Code of the key that enters the quasimode.
    #[inline]
    pub fn start_code(&self) -> u32 {
        self.get(QuasimodeSlot::Start).code()
    }

    /// Whether `code` ends a modal activation (End or Cancel slot).
    pub fn is_modal_exit_code(&self, code: u32) -> bool {
        self.get(QuasimodeSlot::End).code() == code || self.get(QuasimodeSlot::Cancel).code() == code
    }
}

impl Default for KeycodeTable {
    fn default() -> Self {
        Self::new(Key::Capital)
    }
}
