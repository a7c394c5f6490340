//! Scriptable stand-ins for the browser, shared by the unit tests.

use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::config::TranslatorConfig;
use crate::controller::{Anchor, NoticeKind, Overlay, PageHost, SelectionSnapshot};
use crate::dom::{
    Clipboard, ClipboardError, DomError, DomEvent, EditCommand, EditSurface, ElementShape,
};
use crate::ollama::OllamaModel;
use crate::relay::{RelayError, TranslatorBackend};

#[derive(Default)]
pub struct FakeClipboard {
    content: RefCell<String>,
    pub read_fails: Cell<bool>,
    pub write_fails: Cell<bool>,
    pub writes: RefCell<Vec<String>>,
}

impl FakeClipboard {
    pub fn holding(text: &str) -> Self {
        let cb = Self::default();
        *cb.content.borrow_mut() = text.to_string();
        cb
    }

    pub fn current(&self) -> String {
        self.content.borrow().clone()
    }
}

#[async_trait(?Send)]
impl Clipboard for FakeClipboard {
    async fn read_text(&self) -> Result<String, ClipboardError> {
        if self.read_fails.get() {
            return Err(ClipboardError::Denied("document is not focused".into()));
        }
        Ok(self.current())
    }

    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.write_fails.get() {
            return Err(ClipboardError::Unavailable);
        }
        self.writes.borrow_mut().push(text.to_string());
        *self.content.borrow_mut() = text.to_string();
        Ok(())
    }
}

/// How `insertText` behaves on a fake element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Works,
    /// `execCommand` returns false.
    Refused,
    /// Returns true but the framework reverts the DOM.
    Reverted,
    /// Writes only the first half of the text.
    Partial,
    /// Like `Partial` on the first call, then works.
    PartialOnce,
}

/// Quirks of the page framework owning a fake element.
#[derive(Debug, Clone, Copy)]
pub struct Quirks {
    pub insert_text: ExecMode,
    pub select_all_works: bool,
    pub paste_works: bool,
    /// A framework listener turns synthetic paste events into content.
    pub handles_paste_event: bool,
    pub native_setter_works: bool,
    /// A framework accessor swallows plain `value` / `textContent` writes.
    pub intercepts_direct: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            insert_text: ExecMode::Works,
            select_all_works: true,
            paste_works: true,
            handles_paste_event: false,
            native_setter_works: true,
            intercepts_direct: false,
        }
    }
}

impl Quirks {
    /// Nothing the page allows gets text in.
    pub fn locked() -> Self {
        Self {
            insert_text: ExecMode::Refused,
            select_all_works: true,
            paste_works: false,
            handles_paste_event: false,
            native_setter_works: false,
            intercepts_direct: true,
        }
    }
}

struct ElementState {
    shape: ElementShape,
    content: RefCell<String>,
    selected: Cell<bool>,
    focused: Cell<bool>,
    quirks: RefCell<Quirks>,
    clipboard: Rc<FakeClipboard>,
    events: RefCell<Vec<DomEvent>>,
    commands: RefCell<Vec<String>>,
    settles: RefCell<Vec<Duration>>,
    insert_calls: Cell<usize>,
    direct_writes: RefCell<Vec<String>>,
    markup_writes: RefCell<Vec<String>>,
}

#[derive(Clone)]
pub struct FakeElement(Rc<ElementState>);

impl FakeElement {
    pub fn new(shape: ElementShape, content: &str, clipboard: Rc<FakeClipboard>) -> Self {
        Self(Rc::new(ElementState {
            shape,
            content: RefCell::new(content.to_string()),
            selected: Cell::new(false),
            focused: Cell::new(false),
            quirks: RefCell::new(Quirks::default()),
            clipboard,
            events: RefCell::new(Vec::new()),
            commands: RefCell::new(Vec::new()),
            settles: RefCell::new(Vec::new()),
            insert_calls: Cell::new(0),
            direct_writes: RefCell::new(Vec::new()),
            markup_writes: RefCell::new(Vec::new()),
        }))
    }

    pub fn with_quirks(self, quirks: Quirks) -> Self {
        *self.0.quirks.borrow_mut() = quirks;
        self
    }

    pub fn content(&self) -> String {
        self.0.content.borrow().clone()
    }

    pub fn events(&self) -> Vec<DomEvent> {
        self.0.events.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.0.commands.borrow().clone()
    }

    pub fn settles(&self) -> Vec<Duration> {
        self.0.settles.borrow().clone()
    }

    /// Every plain `value` / `textContent` write, swallowed or not.
    pub fn direct_writes(&self) -> Vec<String> {
        self.0.direct_writes.borrow().clone()
    }

    pub fn markup_writes(&self) -> Vec<String> {
        self.0.markup_writes.borrow().clone()
    }

    pub fn was_focused(&self) -> bool {
        self.0.focused.get()
    }

    fn quirks(&self) -> Quirks {
        *self.0.quirks.borrow()
    }

    fn put_half(&self, text: &str) {
        let half: String = text.chars().take(text.chars().count() / 2).collect();
        self.put(&half);
    }

    fn put(&self, text: &str) {
        let mut content = self.0.content.borrow_mut();
        if self.0.selected.replace(false) {
            *content = text.to_string();
        } else {
            content.push_str(text);
        }
    }
}

#[async_trait(?Send)]
impl EditSurface for FakeElement {
    fn shape(&self) -> ElementShape {
        self.0.shape
    }

    fn focus(&self) -> Result<(), DomError> {
        self.0.focused.set(true);
        Ok(())
    }

    fn select_field(&self) -> Result<(), DomError> {
        if self.0.shape != ElementShape::ValueField {
            return Err(DomError::Unsupported("select()"));
        }
        self.0.selected.set(true);
        Ok(())
    }

    fn exec_command(&self, command: EditCommand<'_>) -> Result<bool, DomError> {
        self.0.commands.borrow_mut().push(command.name().to_string());
        let quirks = self.quirks();
        match command {
            EditCommand::SelectAll => {
                if quirks.select_all_works {
                    self.0.selected.set(true);
                }
                Ok(quirks.select_all_works)
            }
            EditCommand::InsertText(text) => {
                let call = self.0.insert_calls.get();
                self.0.insert_calls.set(call + 1);
                match quirks.insert_text {
                    ExecMode::Works => self.put(text),
                    ExecMode::Refused => return Ok(false),
                    ExecMode::Reverted => {}
                    ExecMode::Partial => self.put_half(text),
                    ExecMode::PartialOnce if call == 0 => self.put_half(text),
                    ExecMode::PartialOnce => self.put(text),
                }
                Ok(true)
            }
            EditCommand::Paste => {
                if !quirks.paste_works {
                    return Ok(false);
                }
                let pasted = self.0.clipboard.current();
                self.put(&pasted);
                Ok(true)
            }
            EditCommand::Delete => {
                if self.0.selected.replace(false) {
                    self.0.content.borrow_mut().clear();
                }
                Ok(true)
            }
        }
    }

    fn read_content(&self) -> String {
        self.content()
    }

    fn set_value_native(&self, text: &str) -> Result<(), DomError> {
        if self.0.shape != ElementShape::ValueField {
            return Err(DomError::Unsupported("value setter"));
        }
        if self.quirks().native_setter_works {
            *self.0.content.borrow_mut() = text.to_string();
        }
        Ok(())
    }

    fn set_content_direct(&self, text: &str) -> Result<(), DomError> {
        self.0.direct_writes.borrow_mut().push(text.to_string());
        if !self.quirks().intercepts_direct {
            *self.0.content.borrow_mut() = text.to_string();
        }
        self.0.selected.set(false);
        Ok(())
    }

    fn read_markup(&self) -> String {
        self.content()
    }

    fn restore_markup(&self, markup: &str) -> Result<(), DomError> {
        if self.0.shape == ElementShape::ValueField {
            return self.set_content_direct(markup);
        }
        self.0.markup_writes.borrow_mut().push(markup.to_string());
        *self.0.content.borrow_mut() = markup.to_string();
        self.0.selected.set(false);
        Ok(())
    }

    fn dispatch(&self, event: &DomEvent) -> Result<(), DomError> {
        self.0.events.borrow_mut().push(event.clone());
        if let DomEvent::PasteInput(text) = event {
            if self.quirks().handles_paste_event {
                *self.0.content.borrow_mut() = text.clone();
            }
        }
        Ok(())
    }

    async fn settle(&self, delay: Duration) {
        self.0.settles.borrow_mut().push(delay);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCall {
    Loading,
    Translation(String, Option<Anchor>),
    Progress(f64),
    Remove,
    Notice(String, NoticeKind),
}

#[derive(Default)]
pub struct FakeOverlay {
    pub calls: RefCell<Vec<OverlayCall>>,
}

impl FakeOverlay {
    pub fn calls(&self) -> Vec<OverlayCall> {
        self.calls.borrow().clone()
    }

    pub fn notices(&self) -> Vec<(String, NoticeKind)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                OverlayCall::Notice(m, k) => Some((m.clone(), *k)),
                _ => None,
            })
            .collect()
    }
}

impl Overlay for FakeOverlay {
    fn show_loading(&self) {
        self.calls.borrow_mut().push(OverlayCall::Loading);
    }

    fn show_translation(&self, text: &str, anchor: Option<Anchor>) {
        self.calls
            .borrow_mut()
            .push(OverlayCall::Translation(text.to_string(), anchor));
    }

    fn set_progress(&self, fraction: f64) {
        self.calls.borrow_mut().push(OverlayCall::Progress(fraction));
    }

    fn remove_popup(&self) {
        self.calls.borrow_mut().push(OverlayCall::Remove);
    }

    fn notify(&self, message: &str, kind: NoticeKind) {
        self.calls
            .borrow_mut()
            .push(OverlayCall::Notice(message.to_string(), kind));
    }
}

pub struct FakePage {
    pub hostname: RefCell<String>,
    pub focused: RefCell<Option<FakeElement>>,
    pub selection: RefCell<Option<SelectionSnapshot>>,
    pub clipboard: Rc<FakeClipboard>,
    pub now: Cell<Duration>,
}

impl FakePage {
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: RefCell::new(hostname.to_string()),
            focused: RefCell::new(None),
            selection: RefCell::new(None),
            clipboard: Rc::new(FakeClipboard::default()),
            now: Cell::new(Duration::ZERO),
        }
    }

    pub fn element(&self, shape: ElementShape, content: &str) -> FakeElement {
        FakeElement::new(shape, content, Rc::clone(&self.clipboard))
    }

    pub fn focus(&self, element: Option<FakeElement>) {
        *self.focused.borrow_mut() = element;
    }

    pub fn select(&self, text: &str) {
        *self.selection.borrow_mut() = Some(SelectionSnapshot {
            text: text.to_string(),
            anchor: Some(Anchor { x: 10.0, y: 20.0 }),
        });
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl PageHost for FakePage {
    type Element = FakeElement;

    fn hostname(&self) -> String {
        self.hostname.borrow().clone()
    }

    fn focused_element(&self) -> Option<FakeElement> {
        self.focused.borrow().clone()
    }

    fn selection(&self) -> Option<SelectionSnapshot> {
        self.selection.borrow().clone()
    }

    fn clipboard(&self) -> &dyn Clipboard {
        self.clipboard.as_ref()
    }

    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// One scripted reply; `gate` holds the reply back until it fires.
pub struct Scripted {
    pub reply: Result<String, String>,
    pub gate: Option<tokio::sync::oneshot::Receiver<()>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslateCall {
    pub text: String,
    pub language: String,
    pub model: String,
}

#[derive(Default)]
pub struct FakeBackend {
    pub replies: RefCell<VecDeque<Scripted>>,
    pub calls: RefCell<Vec<TranslateCall>>,
    pub connected: Cell<bool>,
    pub models: RefCell<Vec<OllamaModel>>,
}

impl FakeBackend {
    pub fn replying(reply: Result<&str, &str>) -> Self {
        let backend = Self::default();
        backend.push(reply, None);
        backend
    }

    pub fn push(&self, reply: Result<&str, &str>, gate: Option<tokio::sync::oneshot::Receiver<()>>) {
        self.replies.borrow_mut().push_back(Scripted {
            reply: reply.map(str::to_string).map_err(str::to_string),
            gate,
        });
    }

    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.borrow().clone()
    }
}

#[async_trait(?Send)]
impl TranslatorBackend for FakeBackend {
    async fn check_connection(&self, _cfg: &TranslatorConfig) -> bool {
        self.connected.get()
    }

    async fn list_models(&self, _cfg: &TranslatorConfig) -> Vec<OllamaModel> {
        self.models.borrow().clone()
    }

    async fn translate(
        &self,
        cfg: &TranslatorConfig,
        text: &str,
        target_language: &str,
    ) -> Result<String, RelayError> {
        self.calls.borrow_mut().push(TranslateCall {
            text: text.to_string(),
            language: target_language.to_string(),
            model: cfg.selected_model.clone(),
        });
        let scripted = self.replies.borrow_mut().pop_front();
        let Some(Scripted { reply, gate }) = scripted else {
            return Err(RelayError::Transport("no scripted reply".into()));
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        reply.map_err(RelayError::Remote)
    }
}
