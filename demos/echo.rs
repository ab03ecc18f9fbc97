//! Prints every callback the input loop delivers.
//!
//! Run with: cargo run --example echo
//!
//! Hold Caps Lock and type to see quasimode keypresses. Press Ctrl+C to exit.
//! On Linux, build with `--features x11`.

use quasimode::{InputConfig, InputHandle, InputHandler, InputManager, Key, Keypress};

struct Echo {
    handle: InputHandle,
    ticks: u64,
}

impl InputHandler for Echo {
    fn on_init(&mut self) {
        println!("hooks installed; hold Caps Lock to enter the quasimode");
    }

    fn on_keypress(&mut self, keypress: Keypress) {
        match keypress {
            Keypress::QuasimodeStart => println!("-- quasimode start"),
            Keypress::QuasimodeEnd => println!("-- quasimode end"),
            Keypress::Down(code) => println!("down {:?} ({code:#04x})", Key::from_code(code)),
            Keypress::Up(code) => println!("up   {:?} ({code:#04x})", Key::from_code(code)),
        }
    }

    fn on_some_key(&mut self) {
        print!(".");
    }

    fn on_some_mouse_button(&mut self) {
        println!("mouse button");
    }

    fn on_tick(&mut self, ms_passed: u64) {
        self.ticks += ms_passed;
    }

    fn on_tray_menu_item(&mut self, menu_id: i32) {
        println!("tray item {menu_id}");
    }

    fn on_exit_requested(&mut self) {
        println!("\nexit requested after {:.1}s", self.ticks as f64 / 1000.0);
        self.handle.stop();
    }
}

fn main() {
    let config = InputConfig::new(Key::Capital, "quasimode.ico").with_mouse_events(false);
    let mut manager = InputManager::new(config);
    manager.add_tray_menu_item("About", 1);
    manager.add_tray_menu_item("-", 0);
    manager.add_tray_menu_item("Exit", 2);

    let handle = manager.handle();
    let ctrlc_handle = handle.clone();
    ctrlc::set_handler(move || ctrlc_handle.request_exit()).expect("error setting Ctrl-C handler");

    let mut echo = Echo { handle, ticks: 0 };
    if let Err(e) = manager.run(&mut echo) {
        eprintln!("error: {e}");
    }
}
