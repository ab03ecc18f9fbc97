//! The input manager: event loop, callback dispatch and thread-safe handle.

use crate::channel::{EventQueue, EventSender, event_queue};
use crate::config::InputConfig;
use crate::error::{Error, Result};
use crate::event::{Control, Event, Keypress, MouseEvent};
use crate::hook::{HookBackend, HookSink};
use crate::keycode::Key;
use crate::keymap::{KeycodeTable, QuasimodeSlot};
use crate::platform;
use crate::quasimode::{QuasimodeStateMachine, Transition};
use crate::state::{AtomicLoopState, HookGate, LoopState};
use crate::timer::TickTimer;
use crate::tray::{TrayMenu, TrayMenuEntry};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Callbacks invoked on the thread that called [`InputManager::run`].
///
/// Every method defaults to doing nothing, so a host only implements what it
/// cares about. Callbacks run one at a time, in the order the underlying
/// events happened.
pub trait InputHandler {
    /// The loop is about to start processing events. Hooks are installed.
    fn on_init(&mut self) {}

    /// A quasimode boundary or a key transition inside the quasimode.
    fn on_keypress(&mut self, _keypress: Keypress) {}

    /// A key transition outside the quasimode. The key is not disclosed.
    fn on_some_key(&mut self) {}

    /// A mouse button or wheel event, while mouse events are enabled.
    fn on_some_mouse_button(&mut self) {}

    /// The cursor moved, while mouse events are enabled.
    fn on_mouse_move(&mut self, _x: i32, _y: i32) {}

    /// Roughly `tick_interval` elapsed. `ms_passed` is the real elapsed time.
    fn on_tick(&mut self, _ms_passed: u64) {}

    /// A tray menu item was chosen.
    fn on_tray_menu_item(&mut self, _menu_id: i32) {}

    /// Something asked the application to quit. The loop keeps running until
    /// `stop()` is called.
    fn on_exit_requested(&mut self) {}
}

#[derive(Debug)]
struct Shared {
    state: AtomicLoopState,
    gate: Arc<HookGate>,
    keymap: RwLock<KeycodeTable>,
    tray: Mutex<TrayMenu>,
    loop_thread: Mutex<Option<ThreadId>>,
    sender: EventSender,
}

impl Shared {
    fn keymap(&self) -> KeycodeTable {
        *self.keymap.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write one keymap slot. The hook's Start code is set by the caller.
    fn rebind(&self, slot: QuasimodeSlot, key: Key) {
        self.keymap
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(slot, key);
        log::debug!("quasimode slot {slot:?} bound to {:#04x}", key.code());
    }

    fn request_stop(&self) {
        if self
            .state
            .transition(LoopState::Running, LoopState::StopRequested)
            .is_ok()
        {
            self.sender.post(Event::Wake);
        }
    }
}

/// Cloneable, thread-safe control surface of an [`InputManager`].
///
/// Handles stay valid after the manager stops; operations on a stopped
/// manager are accepted and have no effect on callbacks.
#[derive(Debug, Clone)]
pub struct InputHandle {
    shared: Arc<Shared>,
}

impl InputHandle {
    /// Ask the loop to exit. Safe from any thread, including from inside a
    /// callback. No callback starts after the loop observes the request.
    /// Does nothing unless the loop is running.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Current lifecycle state of the loop.
    pub fn state(&self) -> LoopState {
        self.shared.state.load()
    }

    /// Whether `run()` is executing and no stop has been requested.
    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    /// Whether the caller is the thread currently inside `run()`.
    pub fn is_loop_thread(&self) -> bool {
        self.shared
            .loop_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|id| id == thread::current().id())
    }

    /// Start or stop delivering mouse events. Events already queued are still
    /// delivered; later ones follow the new setting.
    pub fn enable_mouse_events(&self, enabled: bool) {
        let previous = self.shared.gate.set_mouse_enabled(enabled);
        if previous != enabled {
            log::debug!("mouse events {}", if enabled { "enabled" } else { "disabled" });
            self.shared
                .sender
                .post(Event::Control(Control::MouseCapture(enabled)));
        }
    }

    /// Whether mouse events are currently delivered.
    pub fn mouse_events_enabled(&self) -> bool {
        self.shared.gate.mouse_enabled()
    }

    /// Keycode currently bound to `slot`.
    pub fn get_quasimode_keycode(&self, slot: QuasimodeSlot) -> u32 {
        self.shared.keymap().get(slot).code()
    }

    /// Rebind `slot`. An unsupported code leaves the binding unchanged. An
    /// activation already in progress still ends on the key that started it.
    ///
    /// The hook sees a new Start key at once. While the loop runs, a call
    /// from any other thread is queued and the keymap changes when the loop
    /// reaches it, in order with the input around it.
    pub fn set_quasimode_keycode(&self, slot: QuasimodeSlot, code: u32) -> Result<()> {
        let key = Key::try_from(code)?;
        if slot == QuasimodeSlot::Start {
            self.shared.gate.set_quasimode_code(code);
        }
        if self.is_running() && !self.is_loop_thread() {
            self.shared
                .sender
                .post(Event::Control(Control::Rebind(slot, key)));
        } else {
            self.shared.rebind(slot, key);
        }
        Ok(())
    }

    /// Choose modal (`true`) or quasimodal behaviour for the next activation.
    pub fn set_modality(&self, modal: bool) {
        self.shared.gate.set_modal(modal);
    }

    /// Whether the next activation will be modal.
    pub fn is_modal(&self) -> bool {
        self.shared.gate.modal()
    }

    /// Force caps lock on or off. The state found before the first change is
    /// restored when the loop exits.
    pub fn set_caps_lock_mode(&self, enabled: bool) {
        self.shared
            .sender
            .post(Event::Control(Control::CapsLock(enabled)));
    }

    /// Append a tray menu entry. `"-"` appends a separator.
    pub fn add_tray_menu_item(&self, title: &str, id: i32) {
        self.shared
            .tray
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_item(title, id);
    }

    /// Snapshot of the tray menu in insertion order.
    pub fn tray_entries(&self) -> Vec<TrayMenuEntry> {
        self.shared
            .tray
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    /// Report that the user chose the tray item `id`. Returns `false` for
    /// separators and unknown ids, which produce no callback.
    pub fn select_tray_item(&self, id: i32) -> bool {
        let selected = self
            .shared
            .tray
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .select(id);
        self.post_selection(selected)
    }

    /// Report that the user chose the entry at `index` in the menu.
    pub fn select_tray_index(&self, index: usize) -> bool {
        let selected = self
            .shared
            .tray
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .select_index(index);
        self.post_selection(selected)
    }

    fn post_selection(&self, selected: Option<crate::event::TrayEvent>) -> bool {
        match selected {
            Some(event) => self.shared.sender.post(Event::Tray(event)),
            None => false,
        }
    }

    /// Deliver `on_exit_requested` on the loop thread.
    pub fn request_exit(&self) {
        self.shared.sender.post(Event::ExitRequested);
    }

    /// Leave the quasimode as if its key had been released. Does nothing if
    /// the quasimode is not active when the request is processed.
    pub fn exit_quasimode(&self) {
        self.shared
            .sender
            .post(Event::Control(Control::ExitQuasimode));
    }
}

/// Owns the OS hooks, the tick timer and the event queue for one `run()`.
///
/// # Example
///
/// ```no_run
/// use quasimode::{InputConfig, InputHandler, InputManager, Keypress};
///
/// struct Printer;
///
/// impl InputHandler for Printer {
///     fn on_keypress(&mut self, keypress: Keypress) {
///         println!("{keypress:?}");
///     }
/// }
///
/// let mut manager = InputManager::new(InputConfig::default());
/// manager.run(&mut Printer).expect("input loop failed");
/// ```
pub struct InputManager {
    handle: InputHandle,
    queue: EventQueue,
    backend: Box<dyn HookBackend>,
    timer: TickTimer,
    tray_icon_path: PathBuf,
}

impl InputManager {
    /// Create a manager using this platform's native hooks.
    pub fn new(config: InputConfig) -> Self {
        Self::from_parts(config, platform::native_backend())
    }

    /// Create a manager on top of a specific hook backend.
    pub fn with_backend<B: HookBackend + 'static>(config: InputConfig, backend: B) -> Self {
        Self::from_parts(config, Box::new(backend))
    }

    fn from_parts(config: InputConfig, backend: Box<dyn HookBackend>) -> Self {
        let keymap = KeycodeTable::new(config.quasimode_key);
        let (sender, queue) = event_queue(config.queue_capacity);
        let shared = Shared {
            state: AtomicLoopState::new(LoopState::Created),
            gate: Arc::new(HookGate::new(
                keymap.start_code(),
                config.mouse_events,
                config.modal,
            )),
            keymap: RwLock::new(keymap),
            tray: Mutex::new(TrayMenu::new()),
            loop_thread: Mutex::new(None),
            sender,
        };

        Self {
            handle: InputHandle {
                shared: Arc::new(shared),
            },
            queue,
            backend,
            timer: TickTimer::new(config.tick_interval),
            tray_icon_path: config.tray_icon_path,
        }
    }

    /// A handle for controlling the manager from callbacks or other threads.
    pub fn handle(&self) -> InputHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> LoopState {
        self.handle.state()
    }

    pub fn tray_icon_path(&self) -> &Path {
        &self.tray_icon_path
    }

    pub fn tick_interval(&self) -> Duration {
        self.timer.interval()
    }

    pub fn tray_entries(&self) -> Vec<TrayMenuEntry> {
        self.handle.tray_entries()
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn enable_mouse_events(&self, enabled: bool) {
        self.handle.enable_mouse_events(enabled);
    }

    pub fn get_quasimode_keycode(&self, slot: QuasimodeSlot) -> u32 {
        self.handle.get_quasimode_keycode(slot)
    }

    pub fn set_quasimode_keycode(&self, slot: QuasimodeSlot, code: u32) -> Result<()> {
        self.handle.set_quasimode_keycode(slot, code)
    }

    pub fn set_modality(&self, modal: bool) {
        self.handle.set_modality(modal);
    }

    pub fn set_caps_lock_mode(&self, enabled: bool) {
        self.handle.set_caps_lock_mode(enabled);
    }

    pub fn add_tray_menu_item(&self, title: &str, id: i32) {
        self.handle.add_tray_menu_item(title, id);
    }

    /// Install the hooks and process events until `stop()`.
    ///
    /// Blocks the calling thread, which becomes the thread every callback
    /// runs on. Hooks, the timer and any caps lock override are released on
    /// every exit path. A manager runs at most once.
    pub fn run<H: InputHandler + ?Sized>(&mut self, handler: &mut H) -> Result<()> {
        let shared = self.handle.shared.clone();
        match shared
            .state
            .transition(LoopState::Created, LoopState::Running)
        {
            Ok(()) => {}
            Err(LoopState::Running | LoopState::StopRequested) => {
                return Err(Error::AlreadyRunning);
            }
            Err(_) => return Err(Error::AlreadyStopped),
        }

        log::info!("input loop starting");
        let guard = RunGuard::enter(&shared);
        let result = self.pump(handler, &shared);
        self.apply_pending_rebinds(&shared);
        drop(guard);

        match &result {
            Ok(()) => log::info!("input loop stopped"),
            Err(e) => log::info!("input loop aborted: {e}"),
        }
        result
    }

    fn pump<H: InputHandler + ?Sized>(&mut self, handler: &mut H, shared: &Shared) -> Result<()> {
        let Self {
            queue,
            backend,
            timer,
            ..
        } = self;
        let mut session = Session::start(&mut **backend, timer, shared)?;

        handler.on_init();

        let mut machine = QuasimodeStateMachine::new();
        while shared.state.load() == LoopState::Running {
            let Some(event) = queue.recv() else {
                break;
            };
            if shared.state.load() != LoopState::Running {
                break;
            }

            let dropped = shared.gate.take_dropped();
            if dropped > 0 {
                log::warn!(
                    "event queue full, dropped {dropped} input events ({} still pending)",
                    queue.pending()
                );
            }

            dispatch(handler, event, &mut machine, &mut session, shared);
        }
        Ok(())
    }
}

impl InputManager {
    /// Keymap writes queued from other threads that the loop never reached.
    fn apply_pending_rebinds(&self, shared: &Shared) {
        while let Some(event) = self.queue.try_recv() {
            if let Event::Control(Control::Rebind(slot, key)) = event {
                shared.rebind(slot, key);
            }
        }
    }
}

/// Marks the calling thread as the loop thread for the duration of `run()`.
/// Dropping it, including while a callback panic unwinds, leaves the manager
/// `Stopped`.
struct RunGuard<'a> {
    shared: &'a Shared,
}

impl<'a> RunGuard<'a> {
    fn enter(shared: &'a Shared) -> Self {
        *shared
            .loop_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
        shared.gate.reset();
        RunGuard { shared }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.shared.state.store(LoopState::Stopped);
        *self
            .shared
            .loop_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Drop for InputManager {
    fn drop(&mut self) {
        self.timer.unregister();
        self.backend.uninstall();
    }
}

/// Resources held for the duration of one `run()`. Dropping it releases them.
struct Session<'a> {
    backend: &'a mut dyn HookBackend,
    timer: &'a mut TickTimer,
    /// Caps lock state found before the first override.
    saved_caps_lock: Option<bool>,
}

impl<'a> Session<'a> {
    fn start(
        backend: &'a mut dyn HookBackend,
        timer: &'a mut TickTimer,
        shared: &Shared,
    ) -> Result<Self> {
        let mut session = Session {
            backend,
            timer,
            saved_caps_lock: None,
        };

        let sink = HookSink::new(shared.sender.clone(), shared.gate.clone());
        session.backend.install(sink)?;
        log::debug!("input hooks installed");
        if !session.backend.can_swallow() {
            log::warn!("input hooks are listen-only; quasimode keys will reach other applications");
        }

        if let Err(e) = session.timer.register(shared.sender.clone()) {
            log::warn!("{e}; continuing without ticks");
        }
        Ok(session)
    }

    fn set_caps_lock(&mut self, enabled: bool) {
        if self.saved_caps_lock.is_none() {
            match self.backend.caps_lock() {
                Ok(current) => self.saved_caps_lock = Some(current),
                Err(e) => {
                    log::warn!("cannot read caps lock: {e}");
                    return;
                }
            }
        }
        if let Err(e) = self.backend.set_caps_lock(enabled) {
            log::warn!("cannot set caps lock: {e}");
        }
    }

    fn set_mouse_capture(&mut self, enabled: bool) {
        if let Err(e) = self.backend.set_mouse_capture(enabled) {
            log::warn!("cannot toggle mouse hook: {e}");
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.timer.unregister();
        if let Some(original) = self.saved_caps_lock.take()
            && let Err(e) = self.backend.set_caps_lock(original)
        {
            log::warn!("cannot restore caps lock: {e}");
        }
        self.backend.uninstall();
        log::debug!("input hooks removed");
    }
}

fn dispatch<H: InputHandler + ?Sized>(
    handler: &mut H,
    event: Event,
    machine: &mut QuasimodeStateMachine,
    session: &mut Session<'_>,
    shared: &Shared,
) {
    match event {
        Event::Key(key) => {
            let transition = machine.process(&key, &shared.keymap(), shared.gate.modal());
            shared.gate.set_modal_active(machine.is_modal_activation());
            deliver(handler, transition);

            #[cfg(feature = "test-quit-key")]
            if matches!(transition, Transition::Continue(k)
                if k.is_down() && k.code() == crate::keycode::Key::Q.code())
            {
                log::info!("quit key pressed");
                shared.request_stop();
            }
        }
        Event::Mouse(MouseEvent::Move { x, y }) => handler.on_mouse_move(x, y),
        Event::Mouse(MouseEvent::ButtonOrWheel) => handler.on_some_mouse_button(),
        Event::Tick(tick) => handler.on_tick(tick.elapsed_ms),
        Event::Tray(tray) => handler.on_tray_menu_item(tray.menu_id),
        Event::ExitRequested => handler.on_exit_requested(),
        Event::Control(Control::CapsLock(enabled)) => session.set_caps_lock(enabled),
        Event::Control(Control::MouseCapture(enabled)) => session.set_mouse_capture(enabled),
        Event::Control(Control::Rebind(slot, key)) => shared.rebind(slot, key),
        Event::Control(Control::ExitQuasimode) => {
            if let Some(transition) = machine.force_exit() {
                shared.gate.set_modal_active(false);
                deliver(handler, transition);
            }
        }
        Event::Wake => {}
    }
}

fn deliver<H: InputHandler + ?Sized>(handler: &mut H, transition: Transition) {
    match transition {
        Transition::Enter => handler.on_keypress(Keypress::QuasimodeStart),
        Transition::Continue(key) => handler.on_keypress(Keypress::from_key(&key)),
        Transition::Exit { via } => {
            if let Some(key) = via {
                handler.on_keypress(Keypress::from_key(&key));
            }
            handler.on_keypress(Keypress::QuasimodeEnd);
        }
        Transition::Ordinary => handler.on_some_key(),
        Transition::Absorbed => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::{HookDecision, HookInjector, SyntheticHooks};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::mpsc;
    use std::time::Instant;

    const CAPS: u32 = 0x14;
    const RETURN: u32 = 0x0D;
    const INSERT: u32 = 0x2D;
    const A: u32 = 0x41;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Init,
        Keypress(Keypress),
        SomeKey,
        MouseButton,
        MouseMove(i32, i32),
        Tray(i32),
        ExitRequested,
    }

    type Script = Box<dyn FnOnce(&InputHandle, &HookInjector)>;

    /// Runs `script` from `on_init`, records every callback and stops on the
    /// first exit request.
    struct Spy {
        handle: InputHandle,
        injector: HookInjector,
        script: Option<Script>,
        calls: Vec<Call>,
        caps_lock_at_exit: Option<bool>,
    }

    impl InputHandler for Spy {
        fn on_init(&mut self) {
            self.calls.push(Call::Init);
            if let Some(script) = self.script.take() {
                script(&self.handle, &self.injector);
            }
        }

        fn on_keypress(&mut self, keypress: Keypress) {
            self.calls.push(Call::Keypress(keypress));
        }

        fn on_some_key(&mut self) {
            self.calls.push(Call::SomeKey);
        }

        fn on_some_mouse_button(&mut self) {
            self.calls.push(Call::MouseButton);
        }

        fn on_mouse_move(&mut self, x: i32, y: i32) {
            self.calls.push(Call::MouseMove(x, y));
        }

        fn on_tray_menu_item(&mut self, menu_id: i32) {
            self.calls.push(Call::Tray(menu_id));
        }

        fn on_exit_requested(&mut self) {
            self.calls.push(Call::ExitRequested);
            self.caps_lock_at_exit = Some(self.injector.caps_lock());
            self.handle.stop();
        }
    }

    fn quiet_config() -> InputConfig {
        InputConfig::default().with_tick_interval(Duration::from_secs(3600))
    }

    fn manager(config: InputConfig) -> (InputManager, HookInjector) {
        let (hooks, injector) = SyntheticHooks::new();
        (InputManager::with_backend(config, hooks), injector)
    }

    fn run_script(
        manager: &mut InputManager,
        injector: &HookInjector,
        script: impl FnOnce(&InputHandle, &HookInjector) + 'static,
    ) -> Spy {
        let mut spy = Spy {
            handle: manager.handle(),
            injector: injector.clone(),
            script: Some(Box::new(script)),
            calls: Vec::new(),
            caps_lock_at_exit: None,
        };
        manager.run(&mut spy).unwrap();
        spy
    }

    fn keypress(k: Keypress) -> Call {
        Call::Keypress(k)
    }

    #[test]
    fn test_quasimode_sequence() {
        let (mut manager, injector) = manager(quiet_config());
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            inj.key_down(CAPS);
            inj.tap(A);
            inj.key_up(CAPS);
            inj.tap(A);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(A)),
                keypress(Keypress::Up(A)),
                keypress(Keypress::QuasimodeEnd),
                Call::SomeKey,
                Call::SomeKey,
                Call::ExitRequested,
            ]
        );
        assert_eq!(manager.state(), LoopState::Stopped);
        assert!(!injector.is_installed());
    }

    #[test]
    fn test_swallow_decisions_while_running() {
        let (mut manager, injector) = manager(quiet_config());
        run_script(&mut manager, &injector, |handle, inj| {
            assert_eq!(inj.key_down(A), Some(HookDecision::Pass));
            assert_eq!(inj.key_down(CAPS), Some(HookDecision::Swallow));
            assert_eq!(inj.key_down(A), Some(HookDecision::Swallow));
            assert_eq!(inj.key_up(CAPS), Some(HookDecision::Swallow));
            assert_eq!(inj.key_up(A), Some(HookDecision::Pass));
            handle.request_exit();
        });
    }

    #[test]
    fn test_auto_repeat_of_quasimode_key_continues() {
        let (mut manager, injector) = manager(quiet_config());
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            inj.key_down(CAPS);
            inj.key_down(CAPS);
            inj.key_up(CAPS);
            handle.request_exit();
        });

        let starts = spy
            .calls
            .iter()
            .filter(|c| **c == keypress(Keypress::QuasimodeStart))
            .count();
        let ends = spy
            .calls
            .iter()
            .filter(|c| **c == keypress(Keypress::QuasimodeEnd))
            .count();
        assert_eq!((starts, ends), (1, 1));
        assert!(spy.calls.contains(&keypress(Keypress::Down(CAPS))));
    }

    #[test]
    fn test_modal_activation() {
        let (mut manager, injector) = manager(quiet_config().with_modal(true));
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            inj.tap(CAPS);
            inj.tap(A);
            inj.tap(RETURN);
            inj.tap(A);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(A)),
                keypress(Keypress::Up(A)),
                keypress(Keypress::Down(RETURN)),
                keypress(Keypress::QuasimodeEnd),
                Call::SomeKey,
                Call::SomeKey,
                Call::ExitRequested,
            ]
        );
    }

    #[test]
    fn test_exit_quasimode_on_request() {
        let (mut manager, injector) = manager(quiet_config());
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            handle.exit_quasimode();
            inj.key_down(CAPS);
            inj.key_down(A);
            handle.exit_quasimode();
            inj.key_up(A);
            inj.key_up(CAPS);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(A)),
                keypress(Keypress::QuasimodeEnd),
                Call::SomeKey,
                Call::SomeKey,
                Call::ExitRequested,
            ]
        );
    }

    #[test]
    fn test_rebinding_start_key() {
        let (mut manager, injector) = manager(quiet_config());
        assert_eq!(manager.get_quasimode_keycode(QuasimodeSlot::Start), CAPS);

        let spy = run_script(&mut manager, &injector, |handle, inj| {
            handle
                .set_quasimode_keycode(QuasimodeSlot::Start, INSERT)
                .unwrap();
            assert!(matches!(
                handle.set_quasimode_keycode(QuasimodeSlot::Start, 0x07),
                Err(Error::InvalidKeycode(0x07))
            ));
            assert_eq!(handle.get_quasimode_keycode(QuasimodeSlot::Start), INSERT);

            assert_eq!(inj.key_down(INSERT), Some(HookDecision::Swallow));
            inj.tap(CAPS);
            inj.key_up(INSERT);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(CAPS)),
                keypress(Keypress::Up(CAPS)),
                keypress(Keypress::QuasimodeEnd),
                Call::ExitRequested,
            ]
        );
    }

    #[test]
    fn test_rebinding_while_start_press_queued() {
        let (mut manager, injector) = manager(quiet_config());
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            assert_eq!(inj.key_down(CAPS), Some(HookDecision::Swallow));
            handle
                .set_quasimode_keycode(QuasimodeSlot::Start, INSERT)
                .unwrap();
            // The press above was taken under the old binding, so the
            // activation it opened owns these keys and its release.
            assert_eq!(inj.key_down(A), Some(HookDecision::Swallow));
            assert_eq!(inj.key_up(A), Some(HookDecision::Swallow));
            assert_eq!(inj.key_up(CAPS), Some(HookDecision::Swallow));

            inj.tap(INSERT);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(A)),
                keypress(Keypress::Up(A)),
                keypress(Keypress::QuasimodeEnd),
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::QuasimodeEnd),
                Call::ExitRequested,
            ]
        );
        assert_eq!(manager.get_quasimode_keycode(QuasimodeSlot::Start), INSERT);
    }

    #[test]
    fn test_rebinding_from_other_thread_is_queued() {
        let delete = Key::Delete.code();
        let (mut manager, injector) = manager(quiet_config().with_modal(true));
        let spy = run_script(&mut manager, &injector, move |handle, inj| {
            let remote = handle.clone();
            thread::spawn(move || remote.set_quasimode_keycode(QuasimodeSlot::End, delete))
                .join()
                .unwrap()
                .unwrap();
            // The loop is busy in this callback and has not applied it yet.
            assert_eq!(handle.get_quasimode_keycode(QuasimodeSlot::End), RETURN);

            inj.tap(CAPS);
            inj.tap(delete);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(delete)),
                keypress(Keypress::QuasimodeEnd),
                Call::ExitRequested,
            ]
        );
        assert_eq!(manager.get_quasimode_keycode(QuasimodeSlot::End), delete);
    }

    struct StopAfterRemoteRebind {
        handle: InputHandle,
    }

    impl InputHandler for StopAfterRemoteRebind {
        fn on_init(&mut self) {
            let remote = self.handle.clone();
            thread::spawn(move || remote.set_quasimode_keycode(QuasimodeSlot::Start, INSERT))
                .join()
                .unwrap()
                .unwrap();
            self.handle.stop();
        }
    }

    #[test]
    fn test_queued_rebinding_survives_stop() {
        let (mut manager, _injector) = manager(quiet_config());
        let mut handler = StopAfterRemoteRebind {
            handle: manager.handle(),
        };
        manager.run(&mut handler).unwrap();
        assert_eq!(manager.get_quasimode_keycode(QuasimodeSlot::Start), INSERT);
    }

    #[test]
    fn test_end_and_cancel_slots_rebindable() {
        let (manager, _injector) = manager(quiet_config());
        assert_eq!(manager.get_quasimode_keycode(QuasimodeSlot::End), RETURN);
        assert_eq!(
            manager.get_quasimode_keycode(QuasimodeSlot::Cancel),
            Key::Escape.code()
        );

        manager
            .set_quasimode_keycode(QuasimodeSlot::Cancel, Key::Delete.code())
            .unwrap();
        assert_eq!(
            manager.get_quasimode_keycode(QuasimodeSlot::Cancel),
            Key::Delete.code()
        );
        assert_eq!(manager.get_quasimode_keycode(QuasimodeSlot::Start), CAPS);
    }

    #[test]
    fn test_mouse_events_follow_toggle() {
        let (mut manager, injector) = manager(quiet_config());
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            assert_eq!(inj.mouse_move(1, 1), Some(HookDecision::Pass));
            inj.mouse_button();
            handle.enable_mouse_events(true);
            inj.mouse_move(5, 6);
            inj.mouse_button();
            handle.enable_mouse_events(false);
            inj.mouse_move(7, 7);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                Call::MouseMove(5, 6),
                Call::MouseButton,
                Call::ExitRequested,
            ]
        );
    }

    #[test]
    fn test_mouse_capture_reaches_backend() {
        let (mut manager, injector) = manager(quiet_config().with_mouse_events(true));
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            assert!(inj.mouse_capture());
            handle.enable_mouse_events(false);
            handle.request_exit();
        });
        assert_eq!(spy.calls.last(), Some(&Call::ExitRequested));
        assert!(!injector.mouse_capture());
    }

    #[test]
    fn test_tray_selection() {
        let (mut manager, injector) = manager(quiet_config());
        manager.add_tray_menu_item("About", 1);
        manager.add_tray_menu_item("-", 2);
        manager.add_tray_menu_item("Quit", 3);
        assert_eq!(manager.tray_entries().len(), 3);

        let spy = run_script(&mut manager, &injector, |handle, _| {
            assert!(!handle.select_tray_item(2));
            assert!(!handle.select_tray_item(42));
            assert!(handle.select_tray_item(3));
            assert!(handle.select_tray_index(0));
            assert!(!handle.select_tray_index(1));
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![Call::Init, Call::Tray(3), Call::Tray(1), Call::ExitRequested]
        );
    }

    #[test]
    fn test_caps_lock_restored_after_run() {
        let (mut manager, injector) = manager(quiet_config());
        injector.set_caps_lock(false);
        let spy = run_script(&mut manager, &injector, |handle, _| {
            handle.set_caps_lock_mode(true);
            handle.request_exit();
        });

        assert_eq!(spy.caps_lock_at_exit, Some(true));
        assert!(!injector.caps_lock());
    }

    #[test]
    fn test_full_queue_drops_input_not_control() {
        let (mut manager, injector) = manager(quiet_config().with_queue_capacity(2));
        let spy = run_script(&mut manager, &injector, |handle, inj| {
            inj.tap(A);
            inj.tap(A);
            inj.tap(A);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![Call::Init, Call::SomeKey, Call::SomeKey, Call::ExitRequested]
        );
    }

    #[test]
    fn test_callbacks_run_on_loop_thread() {
        let (mut manager, injector) = manager(quiet_config());
        let outside = manager.handle();
        assert!(!outside.is_loop_thread());
        run_script(&mut manager, &injector, |handle, _| {
            assert!(handle.is_loop_thread());
            assert!(handle.is_running());
            handle.request_exit();
        });
        assert!(!outside.is_loop_thread());
    }

    struct StopOnFirstKey {
        handle: InputHandle,
        injector: HookInjector,
        some_keys: usize,
    }

    impl InputHandler for StopOnFirstKey {
        fn on_init(&mut self) {
            self.injector.tap(A);
            self.injector.tap(A);
        }

        fn on_some_key(&mut self) {
            self.some_keys += 1;
            self.handle.stop();
        }
    }

    #[test]
    fn test_stop_inside_callback_ends_dispatch() {
        let (mut manager, injector) = manager(quiet_config());
        let mut handler = StopOnFirstKey {
            handle: manager.handle(),
            injector,
            some_keys: 0,
        };
        manager.run(&mut handler).unwrap();
        assert_eq!(handler.some_keys, 1);
        assert_eq!(handler.handle.state(), LoopState::Stopped);
    }

    struct PanicOnInit;

    impl InputHandler for PanicOnInit {
        fn on_init(&mut self) {
            panic!("host failed to start");
        }
    }

    #[test]
    fn test_panicking_callback_leaves_manager_stopped() {
        let (mut manager, injector) = manager(quiet_config());
        let handle = manager.handle();

        let result = panic::catch_unwind(AssertUnwindSafe(|| manager.run(&mut PanicOnInit)));
        assert!(result.is_err());
        assert_eq!(handle.state(), LoopState::Stopped);
        assert!(!handle.is_loop_thread());
        assert!(!injector.is_installed());
        assert!(matches!(
            manager.run(&mut PanicOnInit),
            Err(Error::AlreadyStopped)
        ));
    }

    #[cfg(feature = "test-quit-key")]
    #[test]
    fn test_quit_key_stops_loop() {
        let q = Key::Q.code();
        let (mut manager, injector) = manager(quiet_config());
        let spy = run_script(&mut manager, &injector, move |handle, inj| {
            inj.key_down(CAPS);
            inj.key_down(q);
            inj.key_up(q);
            inj.key_up(CAPS);
            handle.request_exit();
        });

        assert_eq!(
            spy.calls,
            vec![
                Call::Init,
                keypress(Keypress::QuasimodeStart),
                keypress(Keypress::Down(q)),
            ]
        );
        assert_eq!(manager.state(), LoopState::Stopped);
        assert!(!injector.is_installed());
    }

    struct Ready(mpsc::Sender<()>);

    impl InputHandler for Ready {
        fn on_init(&mut self) {
            let _ = self.0.send(());
        }
    }

    #[test]
    fn test_stop_from_another_thread() {
        let (mut manager, injector) = manager(quiet_config());
        let handle = manager.handle();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let result = manager.run(&mut Ready(ready_tx));
            (result, manager.state())
        });

        ready_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(handle.is_running());
        assert!(!handle.is_loop_thread());
        assert!(injector.is_installed());

        // Default callbacks ignore everything.
        injector.tap(CAPS);
        injector.tap(A);
        handle.enable_mouse_events(true);
        injector.mouse_button();

        handle.stop();
        let (result, state) = worker.join().unwrap();
        assert!(result.is_ok());
        assert_eq!(state, LoopState::Stopped);
        assert!(!injector.is_installed());
    }

    #[test]
    fn test_stop_before_run_is_ignored() {
        let (mut manager, injector) = manager(quiet_config());
        manager.stop();
        assert_eq!(manager.state(), LoopState::Created);

        let spy = run_script(&mut manager, &injector, |handle, _| handle.request_exit());
        assert_eq!(spy.calls, vec![Call::Init, Call::ExitRequested]);
    }

    #[test]
    fn test_run_twice_fails() {
        let (mut manager, injector) = manager(quiet_config());
        run_script(&mut manager, &injector, |handle, _| handle.request_exit());

        let mut spy = Spy {
            handle: manager.handle(),
            injector: injector.clone(),
            script: None,
            calls: Vec::new(),
            caps_lock_at_exit: None,
        };
        assert!(matches!(manager.run(&mut spy), Err(Error::AlreadyStopped)));
        assert!(spy.calls.is_empty());
    }

    #[test]
    fn test_hook_failure_aborts_run() {
        let mut manager =
            InputManager::with_backend(quiet_config(), SyntheticHooks::failing("access denied"));
        let (_, injector) = SyntheticHooks::new();
        let mut spy = Spy {
            handle: manager.handle(),
            injector,
            script: None,
            calls: Vec::new(),
            caps_lock_at_exit: None,
        };

        let result = manager.run(&mut spy);
        assert!(matches!(result, Err(Error::HookStartFailed(reason)) if reason == "access denied"));
        assert!(spy.calls.is_empty());
        assert_eq!(manager.state(), LoopState::Stopped);
    }

    struct TickCounter {
        handle: InputHandle,
        ticks: Vec<u64>,
    }

    impl InputHandler for TickCounter {
        fn on_tick(&mut self, ms_passed: u64) {
            self.ticks.push(ms_passed);
            if self.ticks.len() == 3 {
                self.handle.stop();
            }
        }
    }

    #[test]
    fn test_ticks_delivered() {
        let (mut manager, _injector) =
            manager(InputConfig::default().with_tick_interval(Duration::from_millis(5)));
        let mut counter = TickCounter {
            handle: manager.handle(),
            ticks: Vec::new(),
        };

        let started = Instant::now();
        manager.run(&mut counter).unwrap();
        assert_eq!(counter.ticks.len(), 3);
        assert!(counter.ticks.iter().all(|&ms| ms >= 4));
        assert!(started.elapsed() >= Duration::from_millis(12));
    }

    struct TickWatch {
        handle: InputHandle,
        injector: HookInjector,
        ticks: usize,
        some_keys: usize,
    }

    impl InputHandler for TickWatch {
        fn on_init(&mut self) {
            self.injector.tap(A);
            thread::sleep(Duration::from_millis(30));
            self.handle.request_exit();
        }

        fn on_some_key(&mut self) {
            self.some_keys += 1;
        }

        fn on_tick(&mut self, _ms_passed: u64) {
            self.ticks += 1;
        }

        fn on_exit_requested(&mut self) {
            self.handle.stop();
        }
    }

    #[test]
    fn test_timer_failure_runs_without_ticks() {
        let (mut manager, injector) =
            manager(InputConfig::default().with_tick_interval(Duration::from_millis(1)));
        manager.timer = TickTimer::failing(Duration::from_millis(1), "no timer slots left");

        let mut watch = TickWatch {
            handle: manager.handle(),
            injector: injector.clone(),
            ticks: 0,
            some_keys: 0,
        };
        manager.run(&mut watch).unwrap();

        assert_eq!(watch.ticks, 0);
        assert_eq!(watch.some_keys, 2);
        assert_eq!(manager.state(), LoopState::Stopped);
        assert!(!injector.is_installed());
    }

    #[test]
    fn test_config_applied() {
        let config = InputConfig::new(Key::Scroll, "tray.ico").with_modal(true);
        let (manager, _injector) = manager(config);
        let handle = manager.handle();
        assert_eq!(manager.tray_icon_path(), Path::new("tray.ico"));
        assert_eq!(
            handle.get_quasimode_keycode(QuasimodeSlot::Start),
            Key::Scroll.code()
        );
        assert!(handle.is_modal());
        assert!(!handle.mouse_events_enabled());
        assert_eq!(manager.tick_interval(), Duration::from_millis(10));

        handle.set_modality(false);
        assert!(!handle.is_modal());
    }
}
