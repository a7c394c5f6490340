//! Exports for the extension's settings page and toolbar popup.
//!
//! Each function resolves to a plain JS object shaped like the JSON the core
//! types serialize to, so the page scripts only render what they get back.

use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsValue;

use super::chrome::{from_js, to_js, ChromeRelay, ChromeStorage};
use crate::config::{ConfigPatch, ConfigStore, SUPPORTED_LANGUAGES};
use crate::logger;
use crate::relay::RelayBackend;
use crate::status::{PopupState, StatusReport};

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Saved settings merged over defaults.
#[wasm_bindgen(js_name = loadSettings)]
pub async fn load_settings() -> Result<JsValue, JsValue> {
    logger::init(false);
    let cfg = ChromeStorage.load().await;
    to_js(&cfg).map_err(js_error)
}

/// Merge a partial `{ollamaHost, ollamaPort, selectedModel, readLanguage,
/// writeLanguage}` over the saved record. Resolves to the full record.
#[wasm_bindgen(js_name = saveSettings)]
pub async fn save_settings(patch: JsValue) -> Result<JsValue, JsValue> {
    logger::init(false);
    let patch: ConfigPatch = from_js(&patch).map_err(js_error)?;
    patch.validate().map_err(js_error)?;
    let cfg = ChromeStorage.save(&patch).await.map_err(js_error)?;
    to_js(&cfg).map_err(js_error)
}

/// Check the server through the background relay and list its models.
#[wasm_bindgen(js_name = refreshStatus)]
pub async fn refresh_status() -> Result<JsValue, JsValue> {
    logger::init(false);
    let cfg = ChromeStorage.load().await;
    let mut state = PopupState::default();
    state.refresh(&RelayBackend::new(ChromeRelay), &cfg).await;
    to_js(&StatusReport::new(&state, cfg)).map_err(js_error)
}

/// `[[code, name], ..]` for the language pickers.
#[wasm_bindgen(js_name = supportedLanguages)]
pub fn supported_languages() -> Result<JsValue, JsValue> {
    to_js(&SUPPORTED_LANGUAGES).map_err(js_error)
}
