use async_trait::async_trait;
use js_sys::{Array, Function, Promise, Reflect};
use std::time::Duration;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    DataTransfer, Document, Element, Event, EventInit, HtmlDocument, HtmlElement, HtmlInputElement,
    HtmlTextAreaElement, InputEvent, InputEventInit, KeyboardEvent, KeyboardEventInit, Window,
};

use crate::controller::{Anchor, PageHost, SelectionSnapshot};
use crate::dom::{Clipboard, ClipboardError, DomError, DomEvent, EditCommand, EditSurface, ElementShape};

/// `<input>` types that hold free text.
const TEXT_INPUT_TYPES: &[&str] = &["", "text", "search", "email", "url", "tel"];

/// Gap between the selection and the popup.
const ANCHOR_OFFSET_Y: f64 = 8.0;

pub(crate) fn js_err(e: JsValue) -> DomError {
    DomError::Js(describe(&e))
}

pub(crate) fn describe(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// Resolves after `delay` on the page's timer queue.
pub(crate) async fn sleep(delay: Duration) {
    let ms = delay.as_millis().min(i32::MAX as u128) as i32;
    let promise = Promise::new(&mut |resolve, _reject| match web_sys::window() {
        Some(window) => {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
        }
        None => {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

pub struct WebPage {
    window: Window,
    document: Document,
    clipboard: NavigatorClipboard,
}

impl WebPage {
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Ok(Self {
            window,
            document,
            clipboard: NavigatorClipboard,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl PageHost for WebPage {
    type Element = WebElement;

    fn hostname(&self) -> String {
        self.window.location().hostname().unwrap_or_default()
    }

    fn focused_element(&self) -> Option<WebElement> {
        let element = self.document.active_element()?;
        WebElement::new(element, &self.document)
    }

    fn selection(&self) -> Option<SelectionSnapshot> {
        let selection = self.window.get_selection().ok()??;
        let text = String::from(selection.to_string());
        let anchor = if selection.range_count() > 0 {
            selection.get_range_at(0).ok().and_then(|range| {
                let rect = range.get_bounding_client_rect();
                // Collapsed or detached ranges report an all-zero rect.
                (rect.width() > 0.0 || rect.height() > 0.0).then(|| Anchor {
                    x: rect.left(),
                    y: rect.bottom() + ANCHOR_OFFSET_Y,
                })
            })
        } else {
            None
        };
        Some(SelectionSnapshot { text, anchor })
    }

    fn clipboard(&self) -> &dyn Clipboard {
        &self.clipboard
    }

    fn now(&self) -> Duration {
        let ms = self
            .window
            .performance()
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now);
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }
}

enum Field {
    Input(HtmlInputElement),
    TextArea(HtmlTextAreaElement),
}

/// A focused page element, held for one activation.
pub struct WebElement {
    element: HtmlElement,
    field: Option<Field>,
    document: HtmlDocument,
    shape: ElementShape,
}

impl WebElement {
    pub fn new(element: Element, document: &Document) -> Option<Self> {
        let element = element.dyn_into::<HtmlElement>().ok()?;
        let field = if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            let kind = input.type_().to_ascii_lowercase();
            TEXT_INPUT_TYPES
                .contains(&kind.as_str())
                .then(|| Field::Input(input.clone()))
        } else {
            element
                .dyn_ref::<HtmlTextAreaElement>()
                .map(|t| Field::TextArea(t.clone()))
        };
        let shape = if field.is_some() {
            ElementShape::ValueField
        } else if element.is_content_editable() {
            ElementShape::ContentEditable
        } else {
            ElementShape::Other
        };
        Some(Self {
            element,
            field,
            document: document.clone().unchecked_into(),
            shape,
        })
    }

    /// Global constructor whose prototype owns the untouched `value` accessor.
    fn prototype_name(&self) -> Option<&'static str> {
        match self.field.as_ref()? {
            Field::Input(_) => Some("HTMLInputElement"),
            Field::TextArea(_) => Some("HTMLTextAreaElement"),
        }
    }

    fn build_event(&self, event: &DomEvent) -> Result<Event, JsValue> {
        match event {
            DomEvent::Input | DomEvent::Change => {
                let init = EventInit::new();
                init.set_bubbles(true);
                let name = if matches!(event, DomEvent::Input) {
                    "input"
                } else {
                    "change"
                };
                Event::new_with_event_init_dict(name, &init)
            }
            DomEvent::KeyDown(c) | DomEvent::KeyUp(c) => {
                let init = KeyboardEventInit::new();
                init.set_bubbles(true);
                init.set_cancelable(true);
                init.set_key(&c.to_string());
                let name = if matches!(event, DomEvent::KeyDown(_)) {
                    "keydown"
                } else {
                    "keyup"
                };
                Ok(KeyboardEvent::new_with_keyboard_event_init_dict(name, &init)?.into())
            }
            DomEvent::PasteInput(text) => {
                let transfer = DataTransfer::new()?;
                transfer.set_data("text/plain", text)?;
                let init = InputEventInit::new();
                init.set_bubbles(true);
                init.set_cancelable(true);
                init.set_input_type("insertFromPaste");
                init.set_data(Some(text));
                init.set_data_transfer(Some(&transfer));
                Ok(InputEvent::new_with_event_init_dict("input", &init)?.into())
            }
        }
    }
}

#[async_trait(?Send)]
impl EditSurface for WebElement {
    fn shape(&self) -> ElementShape {
        self.shape
    }

    fn focus(&self) -> Result<(), DomError> {
        self.element.focus().map_err(js_err)
    }

    fn select_field(&self) -> Result<(), DomError> {
        match &self.field {
            Some(Field::Input(input)) => input.select(),
            Some(Field::TextArea(area)) => area.select(),
            None => return Err(DomError::Unsupported("select()")),
        }
        Ok(())
    }

    fn exec_command(&self, command: EditCommand<'_>) -> Result<bool, DomError> {
        let result = match command {
            EditCommand::InsertText(text) => {
                self.document
                    .exec_command_with_show_ui_and_value(command.name(), false, text)
            }
            EditCommand::SelectAll | EditCommand::Paste | EditCommand::Delete => {
                self.document.exec_command(command.name())
            }
        };
        result.map_err(js_err)
    }

    fn read_content(&self) -> String {
        match &self.field {
            Some(Field::Input(input)) => input.value(),
            Some(Field::TextArea(area)) => area.value(),
            None => self.element.inner_text(),
        }
    }

    fn set_value_native(&self, text: &str) -> Result<(), DomError> {
        let name = self
            .prototype_name()
            .ok_or(DomError::Unsupported("value setter"))?;
        let ctor = Reflect::get(&js_sys::global(), &JsValue::from_str(name)).map_err(js_err)?;
        let proto = Reflect::get(&ctor, &JsValue::from_str("prototype")).map_err(js_err)?;
        let descriptor =
            Reflect::get_own_property_descriptor(proto.unchecked_ref(), &JsValue::from_str("value"))
                .map_err(js_err)?;
        let setter = Reflect::get(&descriptor, &JsValue::from_str("set"))
            .map_err(js_err)?
            .dyn_into::<Function>()
            .map_err(|_| DomError::Unsupported("value setter"))?;
        setter
            .call1(self.element.as_ref(), &JsValue::from_str(text))
            .map_err(js_err)?;
        Ok(())
    }

    fn set_content_direct(&self, text: &str) -> Result<(), DomError> {
        match &self.field {
            Some(Field::Input(input)) => input.set_value(text),
            Some(Field::TextArea(area)) => area.set_value(text),
            None => self.element.set_text_content(Some(text)),
        }
        Ok(())
    }

    fn read_markup(&self) -> String {
        match &self.field {
            Some(_) => self.read_content(),
            None => self.element.inner_html(),
        }
    }

    fn restore_markup(&self, markup: &str) -> Result<(), DomError> {
        match &self.field {
            Some(_) => self.set_content_direct(markup),
            None => {
                self.element.set_inner_html(markup);
                Ok(())
            }
        }
    }

    fn dispatch(&self, event: &DomEvent) -> Result<(), DomError> {
        let event = self.build_event(event).map_err(js_err)?;
        self.element.dispatch_event(&event).map_err(js_err)?;
        Ok(())
    }

    async fn settle(&self, delay: Duration) {
        sleep(delay).await;
    }
}

/// `navigator.clipboard`, reached through `Reflect` so insecure contexts
/// without the API degrade to [`ClipboardError::Unavailable`].
pub struct NavigatorClipboard;

impl NavigatorClipboard {
    async fn call(method: &str, args: &Array) -> Result<JsValue, ClipboardError> {
        let navigator = Reflect::get(&js_sys::global(), &JsValue::from_str("navigator"))
            .map_err(|_| ClipboardError::Unavailable)?;
        let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .map_err(|_| ClipboardError::Unavailable)?;
        if clipboard.is_undefined() || clipboard.is_null() {
            return Err(ClipboardError::Unavailable);
        }
        let function = Reflect::get(&clipboard, &JsValue::from_str(method))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or(ClipboardError::Unavailable)?;
        let promise = Reflect::apply(&function, &clipboard, args)
            .map_err(|e| ClipboardError::Denied(describe(&e)))?
            .dyn_into::<Promise>()
            .map_err(|_| ClipboardError::Unavailable)?;
        JsFuture::from(promise)
            .await
            .map_err(|e| ClipboardError::Denied(describe(&e)))
    }
}

#[async_trait(?Send)]
impl Clipboard for NavigatorClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        let value = Self::call("readText", &Array::new()).await?;
        Ok(value.as_string().unwrap_or_default())
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let args = Array::of1(&JsValue::from_str(text));
        Self::call("writeText", &args).await?;
        Ok(())
    }
}
