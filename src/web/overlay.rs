use std::cell::RefCell;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement};

use crate::controller::{Anchor, NoticeKind, Overlay};
use crate::popup::{popup_position, NOTIFICATION_TTL};

pub const POPUP_ID: &str = "ot-popup";
pub const CLOSE_SELECTOR: &str = "#ot-popup .ot-close";
pub const COPY_SELECTOR: &str = "#ot-popup .ot-btn";
pub const POPUP_SELECTOR: &str = "#ot-popup";

const STYLE_ID: &str = "ollama-translator-styles";

const STYLES: &str = r#"
.ot-popup {
  position: fixed; z-index: 2147483647; top: 20px; left: 50%; transform: translateX(-50%);
  width: auto; max-width: min(600px, calc(100vw - 40px)); min-width: 300px;
  background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 16px 20px;
  box-shadow: 0 20px 50px rgba(0,0,0,0.5); font-family: -apple-system, sans-serif; color: #f1f5f9;
}
.ot-popup.ot-anchored { transform: none; }
.ot-header { display: flex; justify-content: space-between; align-items: center; margin-bottom: 12px; padding-bottom: 10px; border-bottom: 1px solid #334155; }
.ot-title { font-size: 12px; font-weight: 600; color: #4facfe; text-transform: uppercase; letter-spacing: 1px; }
.ot-close { background: transparent; border: none; color: #94a3b8; cursor: pointer; font-size: 18px; }
.ot-close:hover { color: #ef4444; }
.ot-text { font-size: 15px; line-height: 1.7; margin-bottom: 14px; max-height: 60vh; overflow-y: auto; white-space: pre-wrap; }
.ot-actions { display: flex; gap: 8px; margin-bottom: 12px; }
.ot-btn { background: rgba(79,172,254,0.15); border: 1px solid rgba(79,172,254,0.3); color: #4facfe; padding: 8px 14px; border-radius: 8px; cursor: pointer; font-size: 12px; }
.ot-btn:hover { background: rgba(79,172,254,0.25); }
.ot-progress { height: 3px; background: rgba(255,255,255,0.1); border-radius: 2px; overflow: hidden; }
.ot-progress-fill { height: 100%; background: linear-gradient(90deg, #4facfe, #00f2fe); width: 100%; }
.ot-loading { position: fixed; z-index: 2147483647; top: 20px; left: 50%; transform: translateX(-50%); background: #1e293b; padding: 14px 24px; border-radius: 10px; color: #f1f5f9; display: flex; align-items: center; gap: 10px; }
.ot-spinner { width: 16px; height: 16px; border: 2px solid rgba(79,172,254,0.3); border-top-color: #4facfe; border-radius: 50%; animation: ot-spin 0.8s linear infinite; }
@keyframes ot-spin { to { transform: rotate(360deg); } }
.ot-notification { position: fixed; bottom: 20px; right: 20px; background: #1e293b; border: 1px solid #334155; padding: 12px 20px; border-radius: 8px; color: #f1f5f9; z-index: 2147483647; }
.ot-notification.warning { border-color: #eab308; }
.ot-notification.error { border-color: #ef4444; }
"#;

/// Popup, loading indicator and notifications injected into the page.
pub struct WebOverlay {
    document: Document,
    popup: RefCell<Option<Element>>,
}

impl WebOverlay {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            popup: RefCell::new(None),
        }
    }

    fn inject_styles(&self) -> Result<(), JsValue> {
        if self.document.get_element_by_id(STYLE_ID).is_some() {
            return Ok(());
        }
        let style = self.document.create_element("style")?;
        style.set_id(STYLE_ID);
        style.set_text_content(Some(STYLES));
        match self.document.head() {
            Some(head) => head.append_child(&style)?,
            None => self.body()?.append_child(&style)?,
        };
        Ok(())
    }

    fn body(&self) -> Result<HtmlElement, JsValue> {
        self.document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))
    }

    fn div(&self, class: &str, text: Option<&str>) -> Result<Element, JsValue> {
        let el = self.document.create_element("div")?;
        el.set_class_name(class);
        if let Some(text) = text {
            el.set_text_content(Some(text));
        }
        Ok(el)
    }

    fn button(&self, class: &str, label: &str) -> Result<Element, JsValue> {
        let el = self.document.create_element("button")?;
        el.set_class_name(class);
        el.set_text_content(Some(label));
        Ok(el)
    }

    fn mount_popup(&self, popup: Element) -> Result<(), JsValue> {
        self.remove_popup();
        self.inject_styles()?;
        self.body()?.append_child(&popup)?;
        *self.popup.borrow_mut() = Some(popup);
        Ok(())
    }

    fn build_loading(&self) -> Result<(), JsValue> {
        let loading = self.div("ot-loading", None)?;
        loading.append_child(&self.div("ot-spinner", None)?)?;
        let label = self.document.create_element("span")?;
        label.set_text_content(Some("Translating..."));
        loading.append_child(&label)?;
        self.mount_popup(loading)
    }

    fn build_translation(&self, text: &str, anchor: Option<Anchor>) -> Result<(), JsValue> {
        let popup = self.div("ot-popup", None)?;
        popup.set_id(POPUP_ID);

        let header = self.div("ot-header", None)?;
        let title = self.document.create_element("span")?;
        title.set_class_name("ot-title");
        title.set_text_content(Some("Translation"));
        header.append_child(&title)?;
        header.append_child(&self.button("ot-close", "×")?)?;
        popup.append_child(&header)?;

        popup.append_child(&self.div("ot-text", Some(text))?)?;

        let actions = self.div("ot-actions", None)?;
        actions.append_child(&self.button("ot-btn", "📋 Copy")?)?;
        popup.append_child(&actions)?;

        let progress = self.div("ot-progress", None)?;
        progress.append_child(&self.div("ot-progress-fill", None)?)?;
        popup.append_child(&progress)?;

        if let Some(anchor) = anchor {
            self.place(&popup, anchor)?;
        }
        self.mount_popup(popup)
    }

    /// Pin the popup under the selection, kept inside the viewport.
    fn place(&self, popup: &Element, anchor: Anchor) -> Result<(), JsValue> {
        let viewport = web_sys::window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::MAX);
        let Anchor { x, y } = popup_position(anchor, viewport);

        popup.set_class_name("ot-popup ot-anchored");
        let style = popup.unchecked_ref::<HtmlElement>().style();
        style.set_property("left", &format!("{}px", x))?;
        style.set_property("top", &format!("{}px", y))?;
        Ok(())
    }

    fn build_notice(&self, message: &str, kind: NoticeKind) -> Result<(), JsValue> {
        let class = match kind {
            NoticeKind::Success => "ot-notification",
            NoticeKind::Warning => "ot-notification warning",
            NoticeKind::Error => "ot-notification error",
        };
        self.inject_styles()?;
        let notice = self.div(class, Some(message))?;
        self.body()?.append_child(&notice)?;

        let expire = Closure::once_into_js(move || notice.remove());
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        window.set_timeout_with_callback_and_timeout_and_arguments_0(
            expire.unchecked_ref(),
            NOTIFICATION_TTL.as_millis() as i32,
        )?;
        Ok(())
    }
}

impl Overlay for WebOverlay {
    fn show_loading(&self) {
        if let Err(e) = self.build_loading() {
            log::error!("Could not show loading indicator: {:?}", e);
        }
    }

    fn show_translation(&self, text: &str, anchor: Option<Anchor>) {
        if let Err(e) = self.build_translation(text, anchor) {
            log::error!("Could not show translation popup: {:?}", e);
        }
    }

    fn set_progress(&self, fraction: f64) {
        let Some(popup) = self.popup.borrow().clone() else {
            return;
        };
        if let Ok(Some(fill)) = popup.query_selector(".ot-progress-fill") {
            let width = format!("{:.1}%", fraction * 100.0);
            let _ = fill
                .unchecked_ref::<HtmlElement>()
                .style()
                .set_property("width", &width);
        }
    }

    fn remove_popup(&self) {
        let popup = self.popup.borrow_mut().take();
        if let Some(popup) = popup {
            popup.remove();
        }
    }

    fn notify(&self, message: &str, kind: NoticeKind) {
        if let Err(e) = self.build_notice(message, kind) {
            log::error!("Could not show notification {:?}: {:?}", message, e);
        }
    }
}
