//! Quasimode detection.
//!
//! The quasimode is entered by pressing the key bound to
//! [`QuasimodeSlot::Start`](crate::keymap::QuasimodeSlot::Start) and, in the
//! default quasimodal behaviour, left by releasing that same key. While it is
//! active every key transition is forwarded with its code. Outside it, keys are
//! only reported as having happened.
//!
//! The machine is owned by the loop thread and is never touched from the hook.
//! Entry follows the hook's view of the binding
//! ([`KeyEvent::is_quasimode_key`]), so a rebinding that lands while a press
//! is still queued cannot make the two sides disagree.

use crate::event::KeyEvent;
use crate::keymap::KeycodeTable;

/// Outcome of feeding one key event to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> active.
    Enter,
    /// Key inside an activation; forwarded with its code.
    Continue(KeyEvent),
    /// Active -> idle. `via` is the key that ended a modal activation, if it
    /// was not the entry key; it is forwarded before the exit notification.
    Exit { via: Option<KeyEvent> },
    /// Key outside the quasimode. Its code must not reach the host.
    Ordinary,
    /// Part of a modal toggle gesture (release or auto-repeat); not reported.
    Absorbed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Activation {
    /// Start code at the moment of entry. Rebinding later does not change it.
    code: u32,
    modal: bool,
}

/// Tracks whether the quasimode is active.
#[derive(Debug, Default)]
pub struct QuasimodeStateMachine {
    active: Option<Activation>,
    /// Key from a modal toggle that is still physically held.
    held: Option<u32>,
}

impl QuasimodeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Code that entered the current activation.
    pub fn active_code(&self) -> Option<u32> {
        self.active.map(|a| a.code)
    }

    /// Whether the current activation is modal.
    pub fn is_modal_activation(&self) -> bool {
        self.active.is_some_and(|a| a.modal)
    }

    /// Classify one key event. `modal` only matters for a new activation and
    /// `keymap` only for the End and Cancel keys of a modal one.
    pub fn process(&mut self, event: &KeyEvent, keymap: &KeycodeTable, modal: bool) -> Transition {
        match self.active {
            None => self.process_idle(event, modal),
            Some(activation) if activation.modal => self.process_modal(activation, event, keymap),
            Some(activation) => self.process_quasimodal(activation, event),
        }
    }

    /// Leave the quasimode without a key transition. Returns `None` if idle.
    pub fn force_exit(&mut self) -> Option<Transition> {
        self.active.take().map(|_| Transition::Exit { via: None })
    }

    fn absorb_held(&mut self, event: &KeyEvent) -> bool {
        if self.held != Some(event.code()) {
            return false;
        }
        if !event.is_down() {
            self.held = None;
        }
        true
    }

    fn process_idle(&mut self, event: &KeyEvent, modal: bool) -> Transition {
        if self.absorb_held(event) {
            return Transition::Absorbed;
        }

        if event.is_down() && event.is_quasimode_key() {
            self.active = Some(Activation {
                code: event.code(),
                modal,
            });
            if modal {
                self.held = Some(event.code());
            }
            return Transition::Enter;
        }

        Transition::Ordinary
    }

    fn process_quasimodal(&mut self, activation: Activation, event: &KeyEvent) -> Transition {
        if !event.is_down() && event.code() == activation.code {
            self.active = None;
            return Transition::Exit { via: None };
        }
        Transition::Continue(*event)
    }

    fn process_modal(
        &mut self,
        activation: Activation,
        event: &KeyEvent,
        keymap: &KeycodeTable,
    ) -> Transition {
        if self.absorb_held(event) {
            return Transition::Absorbed;
        }

        let code = event.code();
        if event.is_down() && (code == activation.code || keymap.is_modal_exit_code(code)) {
            self.active = None;
            self.held = Some(code);
            let via = (code != activation.code).then_some(*event);
            return Transition::Exit { via };
        }

        Transition::Continue(*event)
    }
}
