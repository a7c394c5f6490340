//! Alt+T handling: find what the user wants translated, translate it, and
//! put the result back into the page.

use std::cell::{Cell, RefCell};
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigStore;
use crate::dom::{classify, Clipboard, EditSurface, TargetKind};
use crate::insert::{Inserter, StrategyId};
use crate::popup::{reading_time, DismissTimer};
use crate::relay::{RelayError, TranslatorBackend};

pub const SHORTCUT_LETTER: &str = "t";

pub const MSG_NO_TEXT: &str = "No text to translate";
pub const MSG_NO_MODEL: &str = "Please select a model in settings";
pub const MSG_TRANSLATION_FAILED: &str = "Translation failed. Check Ollama.";
pub const MSG_INSERT_FAILED: &str = "⚠ Auto-insert failed. Text copied to clipboard.";
pub const MSG_INSERT_AND_COPY_FAILED: &str = "Auto-insert failed and the clipboard is unavailable.";
pub const MSG_COPIED: &str = "Copied!";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl KeyInput {
    pub fn is_shortcut(&self) -> bool {
        self.alt && !self.ctrl && !self.meta && self.key.eq_ignore_ascii_case(SHORTCUT_LETTER)
    }

    pub fn is_escape(&self) -> bool {
        self.key == "Escape"
    }
}

/// What the host should do with a keydown after the controller saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Let the page have it.
    Pass,
    /// An open popup was closed; swallow the key.
    Dismissed,
    /// Swallow the key and run [`Controller::activate`].
    Activate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionSnapshot {
    pub text: String,
    /// Bottom-left of the selection's bounding box, in viewport pixels.
    pub anchor: Option<Anchor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// Where the controller finds its targets.
pub trait PageHost {
    type Element: EditSurface;

    fn hostname(&self) -> String;
    fn focused_element(&self) -> Option<Self::Element>;
    fn selection(&self) -> Option<SelectionSnapshot>;
    fn clipboard(&self) -> &dyn Clipboard;
    /// Monotonic timestamp used for the dismiss timer.
    fn now(&self) -> Duration;
}

/// Transient UI injected into the page. At most one popup (loading or
/// translation) exists at a time; notifications remove themselves.
pub trait Overlay {
    fn show_loading(&self);
    fn show_translation(&self, text: &str, anchor: Option<Anchor>);
    fn set_progress(&self, fraction: f64);
    fn remove_popup(&self);
    fn notify(&self, message: &str, kind: NoticeKind);
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no model selected")]
    MissingModel,
    #[error("nothing to translate")]
    EmptyInput,
    #[error("translation failed: {0}")]
    Translation(#[from] RelayError),
    #[error("no insert strategy worked (copied to clipboard: {copied})")]
    Insertion { copied: bool },
}

/// How one activation ended.
#[derive(Debug)]
pub enum Activation {
    /// Nothing focused and nothing selected.
    Ignored,
    Inserted(StrategyId),
    Displayed,
    /// A newer activation started while this one waited; its result was dropped.
    Superseded,
    Failed(ControllerError),
}

enum LiveOverlay {
    None,
    Loading,
    Translation { text: String, timer: DismissTimer },
}

/// State owned by the most recent activation.
struct Session {
    id: u64,
    overlay: LiveOverlay,
}

enum Target<E> {
    Input { element: E, kind: TargetKind },
    Selection(SelectionSnapshot),
}

pub struct Controller<P, O, B, S> {
    page: P,
    overlay: O,
    backend: B,
    store: S,
    inserter: Inserter,
    next_id: Cell<u64>,
    session: RefCell<Option<Session>>,
}

impl<P, O, B, S> Controller<P, O, B, S>
where
    P: PageHost,
    O: Overlay,
    B: TranslatorBackend,
    S: ConfigStore,
{
    pub fn new(page: P, overlay: O, backend: B, store: S) -> Self {
        Self {
            page,
            overlay,
            backend,
            store,
            inserter: Inserter::new(),
            next_id: Cell::new(0),
            session: RefCell::new(None),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn has_popup(&self) -> bool {
        matches!(
            self.session.borrow().as_ref().map(|s| &s.overlay),
            Some(LiveOverlay::Loading | LiveOverlay::Translation { .. })
        )
    }

    pub fn handle_key(&self, key: &KeyInput) -> KeyAction {
        if key.is_escape() && self.has_popup() {
            self.dismiss();
            return KeyAction::Dismissed;
        }
        if key.is_shortcut() {
            return KeyAction::Activate;
        }
        KeyAction::Pass
    }

    /// Runs one translation cycle. Every failure is reported to the user here.
    pub async fn activate(&self) -> Activation {
        let Some(target) = self.resolve() else {
            log::debug!("Shortcut pressed with nothing focused or selected");
            return Activation::Ignored;
        };
        let id = self.begin_session();

        let outcome = match target {
            Target::Input { element, kind } => self.translate_input(id, element, kind).await,
            Target::Selection(selection) => self.translate_selection(id, selection).await,
        };

        match &outcome {
            Activation::Failed(e) => log::warn!("Activation {} failed: {}", id, e),
            other => log::info!("Activation {} finished: {:?}", id, other),
        }
        outcome
    }

    fn resolve(&self) -> Option<Target<P::Element>> {
        if let Some(element) = self.page.focused_element() {
            if let Some(kind) = classify(element.shape(), &self.page.hostname()) {
                return Some(Target::Input { element, kind });
            }
        }
        self.page
            .selection()
            .filter(|s| !s.text.trim().is_empty())
            .map(Target::Selection)
    }

    /// Tears down whatever the previous activation left up and starts a new session.
    fn begin_session(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let previous = self.session.replace(Some(Session {
            id,
            overlay: LiveOverlay::None,
        }));
        if let Some(prev) = previous {
            if !matches!(prev.overlay, LiveOverlay::None) {
                self.overlay.remove_popup();
            }
        }
        id
    }

    fn is_current(&self, id: u64) -> bool {
        self.session.borrow().as_ref().map(|s| s.id) == Some(id)
    }

    fn set_overlay(&self, id: u64, overlay: LiveOverlay) {
        if let Some(session) = self.session.borrow_mut().as_mut().filter(|s| s.id == id) {
            session.overlay = overlay;
        }
    }

    fn show_loading(&self, id: u64) {
        self.overlay.show_loading();
        self.set_overlay(id, LiveOverlay::Loading);
    }

    fn clear_popup(&self, id: u64) {
        self.overlay.remove_popup();
        self.set_overlay(id, LiveOverlay::None);
    }

    fn fail(&self, message: &str, error: ControllerError) -> Activation {
        self.overlay.notify(message, NoticeKind::Error);
        Activation::Failed(error)
    }

    async fn translate_input(&self, id: u64, element: P::Element, kind: TargetKind) -> Activation {
        let text = element.read_content();
        if text.trim().is_empty() {
            return self.fail(MSG_NO_TEXT, ControllerError::EmptyInput);
        }

        let cfg = self.store.load().await;
        if !self.is_current(id) {
            return Activation::Superseded;
        }
        if !cfg.has_model() {
            return self.fail(MSG_NO_MODEL, ControllerError::MissingModel);
        }
        let language = cfg.write_language_name();

        self.show_loading(id);
        let result = self.backend.translate(&cfg, &text, language).await;
        if !self.is_current(id) {
            log::debug!("Dropping translation for superseded activation {}", id);
            return Activation::Superseded;
        }
        self.clear_popup(id);

        let translated = match result {
            Ok(t) => t,
            Err(e) => return self.fail(MSG_TRANSLATION_FAILED, e.into()),
        };

        let outcome = self
            .inserter
            .insert(&element, self.page.clipboard(), kind, &translated)
            .await;
        if let Some(method) = outcome.method {
            self.overlay
                .notify(&format!("✓ Translated to {}!", language), NoticeKind::Success);
            return Activation::Inserted(method);
        }

        match self.page.clipboard().write_text(&translated).await {
            Ok(()) => {
                self.overlay.notify(MSG_INSERT_FAILED, NoticeKind::Warning);
                Activation::Failed(ControllerError::Insertion { copied: true })
            }
            Err(e) => {
                log::error!("Clipboard fallback failed: {}", e);
                self.fail(
                    MSG_INSERT_AND_COPY_FAILED,
                    ControllerError::Insertion { copied: false },
                )
            }
        }
    }

    async fn translate_selection(&self, id: u64, selection: SelectionSnapshot) -> Activation {
        let text = selection.text.trim();

        let cfg = self.store.load().await;
        if !self.is_current(id) {
            return Activation::Superseded;
        }
        if !cfg.has_model() {
            return self.fail(MSG_NO_MODEL, ControllerError::MissingModel);
        }
        let language = cfg.read_language_name();

        self.show_loading(id);
        let result = self.backend.translate(&cfg, text, language).await;
        if !self.is_current(id) {
            log::debug!("Dropping translation for superseded activation {}", id);
            return Activation::Superseded;
        }
        self.clear_popup(id);

        let translated = match result {
            Ok(t) => t,
            Err(e) => return self.fail(MSG_TRANSLATION_FAILED, e.into()),
        };

        let timer = DismissTimer::start(reading_time(&translated), self.page.now());
        self.overlay.show_translation(&translated, selection.anchor);
        self.set_overlay(
            id,
            LiveOverlay::Translation {
                text: translated,
                timer,
            },
        );
        Activation::Displayed
    }

    /// Close button / Escape.
    pub fn dismiss(&self) {
        let had_popup = match self.session.borrow_mut().as_mut() {
            Some(s) if !matches!(s.overlay, LiveOverlay::None) => {
                s.overlay = LiveOverlay::None;
                true
            }
            _ => false,
        };
        // DOM teardown can fire pointer events back into the controller
        if had_popup {
            self.overlay.remove_popup();
        }
    }

    /// Copy button on the translation popup.
    pub async fn copy_popup_text(&self) {
        let text = match self.session.borrow().as_ref().map(|s| &s.overlay) {
            Some(LiveOverlay::Translation { text, .. }) => text.clone(),
            _ => return,
        };
        match self.page.clipboard().write_text(&text).await {
            Ok(()) => self.overlay.notify(MSG_COPIED, NoticeKind::Success),
            Err(e) => {
                log::warn!("Copy failed: {}", e);
                self.overlay.notify("Copy failed", NoticeKind::Error);
            }
        }
    }

    pub fn pointer_enter(&self) {
        let now = self.page.now();
        self.with_timer(|timer| timer.pause(now));
    }

    pub fn pointer_leave(&self) {
        let now = self.page.now();
        self.with_timer(|timer| timer.resume(now));
    }

    /// Advances the popup's countdown. Returns the remaining fraction, or
    /// `None` once there is no popup (including when this tick dismissed it).
    pub fn tick(&self) -> Option<f64> {
        let now = self.page.now();
        let fraction = {
            let session = self.session.borrow();
            match session.as_ref().map(|s| &s.overlay) {
                Some(LiveOverlay::Translation { timer, .. }) => {
                    if timer.expired(now) {
                        None
                    } else {
                        Some(timer.remaining_fraction(now))
                    }
                }
                _ => return None,
            }
        };
        match fraction {
            Some(f) => {
                self.overlay.set_progress(f);
                Some(f)
            }
            None => {
                self.dismiss();
                None
            }
        }
    }

    fn with_timer(&self, f: impl FnOnce(&mut DismissTimer)) {
        let mut session = self.session.borrow_mut();
        if let Some(Session {
            overlay: LiveOverlay::Translation { timer, .. },
            ..
        }) = session.as_mut()
        {
            f(timer);
        }
    }
}
