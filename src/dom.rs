//! The slice of the page the controller and the inserter work against.
//!
//! Browser handles live behind these traits so the same insertion chain runs
//! over `web-sys` elements in the extension and over scripted fakes in tests.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Hosts whose composers ignore direct DOM writes and only react to input events.
pub const COMPLEX_EDITOR_HOSTS: &[&str] = &["web.whatsapp.com", "web.telegram.org"];

/// What the element looks like, before taking the page host into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShape {
    /// `<input>` / `<textarea>`.
    ValueField,
    /// Anything with `isContentEditable`.
    ContentEditable,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    NativeField,
    EditableRegion,
    ComplexEditableRegion,
}

impl TargetKind {
    pub fn is_native_field(self) -> bool {
        self == TargetKind::NativeField
    }
}

pub fn is_complex_editor_host(hostname: &str) -> bool {
    COMPLEX_EDITOR_HOSTS.iter().any(|h| hostname.contains(h))
}

/// Decided once per activation; `None` means the element is not a translation target.
pub fn classify(shape: ElementShape, hostname: &str) -> Option<TargetKind> {
    match shape {
        ElementShape::ValueField => Some(TargetKind::NativeField),
        ElementShape::ContentEditable if is_complex_editor_host(hostname) => {
            Some(TargetKind::ComplexEditableRegion)
        }
        ElementShape::ContentEditable => Some(TargetKind::EditableRegion),
        ElementShape::Other => None,
    }
}

/// Document-level editing commands (`document.execCommand`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand<'a> {
    SelectAll,
    InsertText(&'a str),
    Paste,
    /// Deletes the current selection.
    Delete,
}

impl EditCommand<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            EditCommand::SelectAll => "selectAll",
            EditCommand::InsertText(_) => "insertText",
            EditCommand::Paste => "paste",
            EditCommand::Delete => "delete",
        }
    }
}

/// Synthetic events dispatched on the target element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomEvent {
    /// Plain bubbling `input`.
    Input,
    /// Plain bubbling `change`.
    Change,
    KeyDown(char),
    KeyUp(char),
    /// `InputEvent` with `inputType: "insertFromPaste"` and a `text/plain` DataTransfer.
    PasteInput(String),
}

#[derive(Debug, Error)]
pub enum DomError {
    #[error("{0} is not supported by this element")]
    Unsupported(&'static str),
    #[error("DOM call failed: {0}")]
    Js(String),
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable")]
    Unavailable,
    #[error("clipboard access denied: {0}")]
    Denied(String),
}

/// One element the user asked us to fill, for the duration of one activation.
#[async_trait(?Send)]
pub trait EditSurface {
    fn shape(&self) -> ElementShape;

    fn focus(&self) -> Result<(), DomError>;

    /// Full-range `select()` on value fields.
    fn select_field(&self) -> Result<(), DomError>;

    /// `document.execCommand`; `Ok(false)` when the browser refused the command.
    fn exec_command(&self, command: EditCommand<'_>) -> Result<bool, DomError>;

    /// `value` for fields, rendered text (`innerText`) for regions.
    fn read_content(&self) -> String;

    /// Call the `value` setter from the element's base prototype, skipping
    /// any accessor a framework installed on the instance.
    fn set_value_native(&self, text: &str) -> Result<(), DomError>;

    /// Plain `el.value = ..` / `el.textContent = ..`.
    fn set_content_direct(&self, text: &str) -> Result<(), DomError>;

    /// `value` for fields, `innerHTML` for regions.
    fn read_markup(&self) -> String;

    /// Put back markup captured by [`EditSurface::read_markup`].
    fn restore_markup(&self, markup: &str) -> Result<(), DomError>;

    fn dispatch(&self, event: &DomEvent) -> Result<(), DomError>;

    /// Yield to the page so it can process a selection change.
    async fn settle(&self, delay: Duration);
}

#[async_trait(?Send)]
pub trait Clipboard {
    async fn read_text(&self) -> Result<String, ClipboardError>;
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}
