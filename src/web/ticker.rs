use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Window;

use crate::popup::TICK_INTERVAL;

/// A `setInterval` that only runs while there is something to animate.
///
/// The callback returns whether it wants another tick. The interval is
/// cleared the first time it says no, and [`Ticker::start`] arms it again.
pub struct Ticker {
    window: Window,
    handle: Rc<Cell<Option<i32>>>,
    callback: Closure<dyn FnMut()>,
}

impl Ticker {
    pub fn new(window: Window, mut on_tick: impl FnMut() -> bool + 'static) -> Self {
        let handle = Rc::new(Cell::new(None::<i32>));
        let callback = {
            let window = window.clone();
            let handle = Rc::clone(&handle);
            Closure::<dyn FnMut()>::new(move || {
                if on_tick() {
                    return;
                }
                if let Some(id) = handle.take() {
                    window.clear_interval_with_handle(id);
                }
            })
        };
        Self {
            window,
            handle,
            callback,
        }
    }

    /// No-op while already running.
    pub fn start(&self) -> Result<(), JsValue> {
        if self.is_running() {
            return Ok(());
        }
        let id = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                self.callback.as_ref().unchecked_ref(),
                TICK_INTERVAL.as_millis() as i32,
            )?;
        self.handle.set(Some(id));
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(id) = self.handle.take() {
            self.window.clear_interval_with_handle(id);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.get().is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
