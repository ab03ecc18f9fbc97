//! X11 backend using XRecord.
//!
//! XRecord only observes the event stream, so this backend cannot swallow
//! input: quasimode keys and keys typed inside the quasimode also reach the
//! focused application.

use super::keycodes::keycode_to_key;
use crate::error::{Error, Result};
use crate::event::KeyEventType;
use crate::hook::{HookBackend, HookSink};
use std::cell::RefCell;
use std::os::raw::{c_char, c_int, c_uchar, c_ulong};
use std::ptr::{null, null_mut};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use x11::xlib;
use x11::xrecord;

const FALSE: c_int = 0;

thread_local! {
    static SINK: RefCell<Option<HookSink>> = const { RefCell::new(None) };
}

/// Layout of the protocol event inside an XRecord data block.
#[repr(C)]
struct XRecordDatum {
    type_: u8,
    code: u8,
    _rest: u64,
    _1: bool,
    _2: bool,
    _3: bool,
    root_x: i16,
    root_y: i16,
    _event_x: i16,
    _event_y: i16,
    _state: u16,
}

struct RecordThread {
    context: xrecord::XRecordContext,
    handle: JoinHandle<()>,
}

/// Listen-only hooks on the X server's event stream.
#[derive(Default)]
pub struct X11Hooks {
    thread: Option<RecordThread>,
}

impl X11Hooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HookBackend for X11Hooks {
    fn install(&mut self, sink: HookSink) -> Result<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("quasimode-xrecord".into())
            .spawn(move || record_thread(sink, ready_tx))
            .map_err(|e| Error::ThreadError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(context)) => {
                self.thread = Some(RecordThread { context, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::HookStartFailed("record thread exited during setup".into()))
            }
        }
    }

    fn uninstall(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        // XRecordEnableContext only returns once the context is disabled from
        // a second connection.
        unsafe {
            let dpy_control = xlib::XOpenDisplay(null());
            if dpy_control.is_null() {
                log::warn!("cannot open X display to stop recording");
                return;
            }
            xrecord::XRecordDisableContext(dpy_control, thread.context);
            xlib::XFlush(dpy_control);
            xlib::XCloseDisplay(dpy_control);
        }

        if thread.handle.join().is_err() {
            log::warn!("record thread panicked");
        }
    }

    fn can_swallow(&self) -> bool {
        false
    }
}

impl Drop for X11Hooks {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn record_thread(sink: HookSink, ready: Sender<Result<xrecord::XRecordContext>>) {
    SINK.with(|s| *s.borrow_mut() = Some(sink));

    unsafe {
        let dpy_data = xlib::XOpenDisplay(null());
        if dpy_data.is_null() {
            let _ = ready.send(Err(Error::HookStartFailed(
                "failed to open X display".into(),
            )));
            return;
        }

        let extension = xlib::XInitExtension(dpy_data, c"RECORD".as_ptr());
        if extension.is_null() {
            xlib::XCloseDisplay(dpy_data);
            let _ = ready.send(Err(Error::HookStartFailed(
                "XRecord extension not available".into(),
            )));
            return;
        }

        let range_ptr = xrecord::XRecordAllocRange();
        if range_ptr.is_null() {
            xlib::XCloseDisplay(dpy_data);
            let _ = ready.send(Err(Error::HookStartFailed(
                "failed to allocate XRecord range".into(),
            )));
            return;
        }
        (*range_ptr).device_events.first = xlib::KeyPress as c_uchar;
        (*range_ptr).device_events.last = xlib::MotionNotify as c_uchar;

        let mut clients: c_ulong = xrecord::XRecordAllClients;
        let mut ranges = range_ptr;
        let context =
            xrecord::XRecordCreateContext(dpy_data, 0, &mut clients, 1, &mut ranges, 1);
        xlib::XFree(range_ptr.cast());

        if context == 0 {
            xlib::XCloseDisplay(dpy_data);
            let _ = ready.send(Err(Error::HookStartFailed(
                "failed to create XRecord context".into(),
            )));
            return;
        }
        xlib::XSync(dpy_data, FALSE);

        let _ = ready.send(Ok(context));
        log::debug!("record thread running");

        let enabled = xrecord::XRecordEnableContext(
            dpy_data,
            context,
            Some(record_callback),
            null_mut(),
        );
        if enabled == 0 {
            log::warn!("failed to enable XRecord context");
        }

        xrecord::XRecordFreeContext(dpy_data, context);
        xlib::XCloseDisplay(dpy_data);
    }

    SINK.with(|s| s.borrow_mut().take());
    log::debug!("record thread exited");
}

fn forward(type_: c_int, code: u8, x: i32, y: i32) {
    SINK.with(|s| {
        let Ok(sink) = s.try_borrow() else {
            return;
        };
        let Some(sink) = sink.as_ref() else {
            return;
        };

        match type_ {
            t if t == xlib::KeyPress || t == xlib::KeyRelease => {
                let event_type = if t == xlib::KeyPress {
                    KeyEventType::KeyDown
                } else {
                    KeyEventType::KeyUp
                };
                if let Some(key) = keycode_to_key(u32::from(code)) {
                    sink.key(event_type, key.code());
                }
            }
            // Wheel "releases" (buttons 4-7) carry no information.
            t if t == xlib::ButtonRelease && (4..=7).contains(&code) => {}
            t if t == xlib::ButtonPress || t == xlib::ButtonRelease => {
                sink.mouse_button();
            }
            t if t == xlib::MotionNotify => {
                sink.mouse_move(x, y);
            }
            _ => {}
        }
    });
}

unsafe extern "C" fn record_callback(
    _closure: *mut c_char,
    raw_data: *mut xrecord::XRecordInterceptData,
) {
    unsafe {
        let Some(data) = raw_data.as_ref() else {
            return;
        };

        if data.category == xrecord::XRecordFromServer {
            #[allow(clippy::cast_ptr_alignment)]
            if let Some(datum) = (data.data as *const XRecordDatum).as_ref() {
                forward(
                    c_int::from(datum.type_),
                    datum.code,
                    i32::from(datum.root_x),
                    i32::from(datum.root_y),
                );
            }
        }

        xrecord::XRecordFreeData(raw_data);
    }
}
