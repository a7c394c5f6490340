//! Browser entry points. The extension's loader scripts call
//! [`start_content`] in every page and [`start_background`] in the service
//! worker.

mod chrome;
mod overlay;
mod page;
mod settings;
mod ticker;

use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, EventTarget, KeyboardEvent, MouseEvent};

pub use chrome::{listen_for_requests, ChromeRelay, ChromeStorage};
pub use overlay::WebOverlay;
pub use page::{NavigatorClipboard, WebElement, WebPage};
pub use ticker::Ticker;

use crate::controller::{Activation, Controller, KeyAction, KeyInput};
use crate::logger;
use crate::relay::RelayBackend;

type WebController = Controller<WebPage, WebOverlay, RelayBackend<ChromeRelay>, ChromeStorage>;

#[wasm_bindgen(js_name = startContent)]
pub fn start_content() -> Result<(), JsValue> {
    logger::init(false);

    let page = WebPage::new()?;
    let window = page.window().clone();
    let document = page.document().clone();
    let overlay = WebOverlay::new(document.clone());
    let controller = Rc::new(Controller::new(
        page,
        overlay,
        RelayBackend::new(ChromeRelay),
        ChromeStorage,
    ));

    let ticker = {
        let controller = Rc::clone(&controller);
        Rc::new(Ticker::new(window, move || controller.tick().is_some()))
    };

    listen_for_keys(&document, &controller, &ticker)?;
    listen_for_popup(&document, &controller, &ticker)?;
    log::info!("Content script ready, Alt+T to translate");
    Ok(())
}

#[wasm_bindgen(js_name = startBackground)]
pub fn start_background() {
    logger::init(false);
    listen_for_requests();
    log::info!("Background relay listening");
}

fn key_input(event: &KeyboardEvent) -> KeyInput {
    KeyInput {
        key: event.key(),
        alt: event.alt_key(),
        ctrl: event.ctrl_key(),
        shift: event.shift_key(),
        meta: event.meta_key(),
    }
}

fn listen_for_keys(
    document: &Document,
    controller: &Rc<WebController>,
    ticker: &Rc<Ticker>,
) -> Result<(), JsValue> {
    let controller = Rc::clone(controller);
    let ticker = Rc::clone(ticker);
    let on_key = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
        match controller.handle_key(&key_input(&event)) {
            KeyAction::Pass => {}
            KeyAction::Dismissed => {
                event.prevent_default();
                ticker.stop();
            }
            KeyAction::Activate => {
                event.prevent_default();
                event.stop_propagation();
                let controller = Rc::clone(&controller);
                let ticker = Rc::clone(&ticker);
                spawn_local(async move {
                    if let Activation::Displayed = controller.activate().await {
                        // the countdown stops itself once the popup is gone
                        if let Err(e) = ticker.start() {
                            log::warn!("Could not start countdown: {}", page::describe(&e));
                        }
                    }
                });
            }
        }
    });
    // capture phase, ahead of the page's own shortcuts
    document.add_event_listener_with_callback_and_bool(
        "keydown",
        on_key.as_ref().unchecked_ref(),
        true,
    )?;
    on_key.forget();
    Ok(())
}

fn within(target: Option<EventTarget>, selector: &str) -> bool {
    target
        .and_then(|t| t.dyn_into::<Element>().ok())
        .is_some_and(|el| matches!(el.closest(selector), Ok(Some(_))))
}

fn listen_for_popup(
    document: &Document,
    controller: &Rc<WebController>,
    ticker: &Rc<Ticker>,
) -> Result<(), JsValue> {
    let on_click = {
        let controller = Rc::clone(controller);
        let ticker = Rc::clone(ticker);
        Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            if within(event.target(), overlay::CLOSE_SELECTOR) {
                controller.dismiss();
                ticker.stop();
            } else if within(event.target(), overlay::COPY_SELECTOR) {
                let controller = Rc::clone(&controller);
                spawn_local(async move { controller.copy_popup_text().await });
            }
        })
    };
    let on_over = {
        let controller = Rc::clone(controller);
        Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            if within(event.target(), overlay::POPUP_SELECTOR) {
                controller.pointer_enter();
            }
        })
    };
    let on_out = {
        let controller = Rc::clone(controller);
        Closure::<dyn FnMut(MouseEvent)>::new(move |event: MouseEvent| {
            // moving between children of the popup is not leaving it
            if within(event.target(), overlay::POPUP_SELECTOR)
                && !within(event.related_target(), overlay::POPUP_SELECTOR)
            {
                controller.pointer_leave();
            }
        })
    };

    for (name, handler) in [("click", on_click), ("mouseover", on_over), ("mouseout", on_out)] {
        document.add_event_listener_with_callback(name, handler.as_ref().unchecked_ref())?;
        handler.forget();
    }
    Ok(())
}
