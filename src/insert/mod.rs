//! Writing translated text back into a page element.
//!
//! No single DOM API works across every site: plain inputs accept a value
//! write, framework-managed composers only react to editing commands or input
//! events, and some sites override the `value` accessor. [`Inserter`] walks an
//! ordered chain of [`InsertStrategy`]s, verifies the element after each one
//! and stops at the first that sticks.

mod strategies;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::dom::{
    Clipboard, ClipboardError, DomError, DomEvent, EditCommand, EditSurface, TargetKind,
};

pub use strategies::{
    BypassSetter, ClipboardPaste, DirectAssign, NativeCommand, SimulatedTyping, SyntheticPaste,
};

/// Texts this long or longer are never typed out character by character.
pub const TYPING_MAX_CHARS: usize = 500;

/// Pause after select-all so the page's own selection handlers run first.
pub const SELECT_SETTLE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyId {
    NativeCommand,
    ClipboardPaste,
    SyntheticPaste,
    BypassSetter,
    DirectAssign,
    SimulatedTyping,
}

impl StrategyId {
    pub fn label(self) -> &'static str {
        match self {
            StrategyId::NativeCommand => "exec-insert-text",
            StrategyId::ClipboardPaste => "clipboard-paste",
            StrategyId::SyntheticPaste => "synthetic-paste",
            StrategyId::BypassSetter => "native-setter",
            StrategyId::DirectAssign => "direct-value",
            StrategyId::SimulatedTyping => "simulated-typing",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    pub succeeded: bool,
    /// Strategy whose result verified, if any.
    pub method: Option<StrategyId>,
    /// Every strategy tried, in order.
    pub attempted: Vec<StrategyId>,
}

#[derive(Debug, Error)]
pub enum InsertError {
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error("browser refused the {0} command")]
    Refused(&'static str),
}

/// What a strategy gets to work with during one attempt.
pub struct InsertContext<'a> {
    pub element: &'a dyn EditSurface,
    pub clipboard: &'a dyn Clipboard,
    pub kind: TargetKind,
}

impl InsertContext<'_> {
    /// Select the element's whole content the way its kind requires.
    pub(crate) fn select_all(&self) -> Result<(), InsertError> {
        if self.kind.is_native_field() {
            self.element.select_field()?;
            return Ok(());
        }
        if self.element.exec_command(EditCommand::SelectAll)? {
            Ok(())
        } else {
            Err(InsertError::Refused("selectAll"))
        }
    }
}

#[async_trait(?Send)]
pub trait InsertStrategy {
    fn id(&self) -> StrategyId;

    fn applies_to(&self, _kind: TargetKind, _text: &str) -> bool {
        true
    }

    /// Apply the strategy. `Ok` only means nothing blew up; the chain verifies.
    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError>;
}

/// Whether the element now shows `expected`.
pub fn content_matches(kind: TargetKind, actual: &str, expected: &str) -> bool {
    if kind.is_native_field() {
        actual == expected
    } else {
        actual.trim() == expected.trim()
    }
}

pub struct Inserter {
    chain: Vec<Box<dyn InsertStrategy>>,
}

impl Default for Inserter {
    fn default() -> Self {
        Self::new()
    }
}

impl Inserter {
    pub fn new() -> Self {
        Self::with_chain(vec![
            Box::new(NativeCommand),
            Box::new(ClipboardPaste),
            Box::new(SyntheticPaste),
            Box::new(BypassSetter),
            Box::new(DirectAssign),
            Box::new(SimulatedTyping),
        ])
    }

    pub fn with_chain(chain: Vec<Box<dyn InsertStrategy>>) -> Self {
        Self { chain }
    }

    /// Strategies to try for this target, in order.
    pub fn plan(&self, kind: TargetKind, text: &str) -> Vec<&dyn InsertStrategy> {
        self.chain
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| match kind {
                // Chat composers only take editing commands or a paste.
                TargetKind::ComplexEditableRegion => matches!(
                    s.id(),
                    StrategyId::NativeCommand | StrategyId::ClipboardPaste
                ),
                _ => s.applies_to(kind, text),
            })
            .collect()
    }

    pub async fn insert(
        &self,
        element: &dyn EditSurface,
        clipboard: &dyn Clipboard,
        kind: TargetKind,
        text: &str,
    ) -> InsertOutcome {
        let cx = InsertContext {
            element,
            clipboard,
            kind,
        };
        let mut attempted = Vec::new();

        for strategy in self.plan(kind, text) {
            let id = strategy.id();
            attempted.push(id);
            let before = Snapshot::take(element, kind);
            log::debug!("Insert attempt {} on {:?}", id, kind);

            match strategy.attempt(&cx, text).await {
                Ok(()) if content_matches(kind, &element.read_content(), text) => {
                    notify_change(element);
                    log::info!("Inserted translation via {}", id);
                    return InsertOutcome {
                        succeeded: true,
                        method: Some(id),
                        attempted,
                    };
                }
                Ok(()) => log::debug!("{} ran but the element did not take the text", id),
                Err(e) => log::warn!("{} failed: {}", id, e),
            }

            rollback(element, kind, &before).await;
        }

        log::warn!("No insert strategy worked for {:?}", kind);
        InsertOutcome {
            succeeded: false,
            method: None,
            attempted,
        }
    }
}

/// Standard `input` + `change` so plain DOM listeners see the new content.
fn notify_change(element: &dyn EditSurface) {
    for event in [DomEvent::Input, DomEvent::Change] {
        if let Err(e) = element.dispatch(&event) {
            log::debug!("Could not dispatch {:?}: {}", event, e);
        }
    }
}

/// Element content captured before an attempt.
struct Snapshot {
    text: String,
    /// `innerHTML`, kept for plain editable regions only. Composer DOM belongs
    /// to the page's framework and is never written back wholesale.
    markup: Option<String>,
}

impl Snapshot {
    fn take(element: &dyn EditSurface, kind: TargetKind) -> Self {
        Self {
            text: element.read_content(),
            markup: (kind == TargetKind::EditableRegion).then(|| element.read_markup()),
        }
    }
}

/// Undo whatever a failed attempt left behind.
async fn rollback(element: &dyn EditSurface, kind: TargetKind, before: &Snapshot) {
    if element.read_content() == before.text {
        return;
    }
    let restored = match kind {
        TargetKind::NativeField => restore_field(element, &before.text),
        TargetKind::EditableRegion => match &before.markup {
            Some(markup) => element.restore_markup(markup).map_err(InsertError::from),
            None => Ok(()),
        },
        TargetKind::ComplexEditableRegion => restore_by_command(element, &before.text).await,
    };
    if let Err(e) = restored {
        log::debug!("Restore failed: {}", e);
    }
    if element.read_content() != before.text {
        log::warn!("Could not restore content after failed attempt");
    }
}

/// Plain write first, then the prototype setter for fields whose framework
/// swallows plain writes.
fn restore_field(element: &dyn EditSurface, text: &str) -> Result<(), InsertError> {
    if let Err(e) = element.set_content_direct(text) {
        log::debug!("Direct restore failed: {}", e);
    }
    if element.read_content() != text {
        element.set_value_native(text)?;
    }
    Ok(())
}

/// Replace the composer content through the editing pipeline its framework
/// listens to.
async fn restore_by_command(element: &dyn EditSurface, text: &str) -> Result<(), InsertError> {
    element.focus()?;
    if !element.exec_command(EditCommand::SelectAll)? {
        return Err(InsertError::Refused("selectAll"));
    }
    element.settle(SELECT_SETTLE).await;
    let command = if text.is_empty() {
        EditCommand::Delete
    } else {
        EditCommand::InsertText(text)
    };
    if element.exec_command(command)? {
        Ok(())
    } else {
        Err(InsertError::Refused(command.name()))
    }
}
