use async_trait::async_trait;

use super::{InsertContext, InsertError, InsertStrategy, StrategyId, SELECT_SETTLE, TYPING_MAX_CHARS};
use crate::dom::{DomEvent, EditCommand, TargetKind};

fn exec(cx: &InsertContext<'_>, command: EditCommand<'_>) -> Result<(), InsertError> {
    if cx.element.exec_command(command)? {
        Ok(())
    } else {
        Err(InsertError::Refused(command.name()))
    }
}

fn dispatch_all(cx: &InsertContext<'_>, events: &[DomEvent]) -> Result<(), InsertError> {
    for event in events {
        cx.element.dispatch(event)?;
    }
    Ok(())
}

/// Select everything, then `insertText` over the selection.
pub struct NativeCommand;

#[async_trait(?Send)]
impl InsertStrategy for NativeCommand {
    fn id(&self) -> StrategyId {
        StrategyId::NativeCommand
    }

    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError> {
        cx.element.focus()?;
        cx.select_all()?;
        cx.element.settle(SELECT_SETTLE).await;
        exec(cx, EditCommand::InsertText(text))
    }
}

/// Put the text on the clipboard and paste it over the selection.
///
/// Whatever was on the clipboard before is written back afterwards, provided
/// it could be read in the first place.
pub struct ClipboardPaste;

#[async_trait(?Send)]
impl InsertStrategy for ClipboardPaste {
    fn id(&self) -> StrategyId {
        StrategyId::ClipboardPaste
    }

    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError> {
        let saved = match cx.clipboard.read_text().await {
            Ok(s) => Some(s),
            Err(e) => {
                log::debug!("Clipboard not readable, it will not be restored: {}", e);
                None
            }
        };

        let pasted: Result<(), InsertError> = async {
            cx.clipboard.write_text(text).await?;
            cx.element.focus()?;
            cx.select_all()?;
            cx.element.settle(SELECT_SETTLE).await;
            exec(cx, EditCommand::Paste)
        }
        .await;

        if let Some(prev) = saved {
            if let Err(e) = cx.clipboard.write_text(&prev).await {
                log::warn!("Could not restore clipboard: {}", e);
            }
        }
        pasted
    }
}

/// An `insertFromPaste` input event carrying the text as a DataTransfer.
pub struct SyntheticPaste;

#[async_trait(?Send)]
impl InsertStrategy for SyntheticPaste {
    fn id(&self) -> StrategyId {
        StrategyId::SyntheticPaste
    }

    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError> {
        cx.element.focus()?;
        if cx.kind.is_native_field() {
            cx.element.set_value_native(text)?;
        }
        cx.element.dispatch(&DomEvent::PasteInput(text.to_string()))?;
        Ok(())
    }
}

/// The prototype's `value` setter, past any framework-installed accessor.
pub struct BypassSetter;

#[async_trait(?Send)]
impl InsertStrategy for BypassSetter {
    fn id(&self) -> StrategyId {
        StrategyId::BypassSetter
    }

    fn applies_to(&self, kind: TargetKind, _text: &str) -> bool {
        kind.is_native_field()
    }

    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError> {
        cx.element.set_value_native(text)?;
        dispatch_all(cx, &[DomEvent::Input, DomEvent::Change])
    }
}

pub struct DirectAssign;

#[async_trait(?Send)]
impl InsertStrategy for DirectAssign {
    fn id(&self) -> StrategyId {
        StrategyId::DirectAssign
    }

    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError> {
        cx.element.set_content_direct(text)?;
        dispatch_all(cx, &[DomEvent::Input, DomEvent::Change])
    }
}

/// Clear the element and type the text one character at a time.
pub struct SimulatedTyping;

#[async_trait(?Send)]
impl InsertStrategy for SimulatedTyping {
    fn id(&self) -> StrategyId {
        StrategyId::SimulatedTyping
    }

    fn applies_to(&self, _kind: TargetKind, text: &str) -> bool {
        text.chars().count() < TYPING_MAX_CHARS
    }

    async fn attempt(&self, cx: &InsertContext<'_>, text: &str) -> Result<(), InsertError> {
        cx.element.focus()?;
        cx.element.set_content_direct("")?;

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            cx.element.dispatch(&DomEvent::KeyDown(ch))?;
            exec(cx, EditCommand::InsertText(ch.encode_utf8(&mut buf)))?;
            cx.element.dispatch(&DomEvent::KeyUp(ch))?;
        }

        dispatch_all(cx, &[DomEvent::Input, DomEvent::Change])
    }
}
