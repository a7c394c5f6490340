//! Extension APIs: `chrome.runtime` messaging and `chrome.storage.local`.

use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

use super::page::describe;
use crate::config::{ConfigError, ConfigPatch, ConfigStore, TranslatorConfig, STORAGE_KEY};
use crate::relay::{handle_request, Relay, RelayError, RelayRequest, RelayResponse};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    fn send_message(message: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn add_message_listener(listener: &Function);

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    fn storage_get(keys: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    fn storage_set(items: &JsValue) -> Result<Promise, JsValue>;
}

/// Rust value to plain JS object, through JSON.
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    let json = serde_json::to_string(value).map_err(|e| e.to_string())?;
    js_sys::JSON::parse(&json).map_err(|e| describe(&e))
}

/// Plain JS value to Rust, through JSON. `undefined` reads as `null`.
pub(crate) fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, String> {
    let json = if value.is_undefined() {
        "null".to_string()
    } else {
        js_sys::JSON::stringify(value)
            .map_err(|e| describe(&e))?
            .as_string()
            .unwrap_or_else(|| "null".to_string())
    };
    serde_json::from_str(&json).map_err(|e| e.to_string())
}

/// Content side of the relay: `chrome.runtime.sendMessage`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeRelay;

#[async_trait(?Send)]
impl Relay for ChromeRelay {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        let message = to_js(&request).map_err(RelayError::Malformed)?;
        let promise = send_message(&message).map_err(|e| RelayError::Transport(describe(&e)))?;
        let reply = JsFuture::from(promise)
            .await
            .map_err(|e| RelayError::Transport(describe(&e)))?;
        if reply.is_undefined() {
            return Err(RelayError::Transport("background sent no response".into()));
        }
        from_js(&reply).map_err(RelayError::Malformed)
    }
}

/// Background side: answer every relay request with [`handle_request`].
pub fn listen_for_requests() {
    let listener = Closure::<dyn FnMut(JsValue, JsValue, Function) -> bool>::new(
        |message: JsValue, _sender: JsValue, send_response: Function| {
            let request: RelayRequest = match from_js(&message) {
                Ok(r) => r,
                Err(e) => {
                    log::debug!("Ignoring unrelated message: {}", e);
                    return false;
                }
            };
            spawn_local(async move {
                let response = handle_request(request).await;
                match to_js(&response) {
                    Ok(value) => {
                        if let Err(e) = send_response.call1(&JsValue::NULL, &value) {
                            log::warn!("Could not answer relay request: {}", describe(&e));
                        }
                    }
                    Err(e) => log::error!("Could not encode relay response: {}", e),
                }
            });
            // keep the channel open for the async answer
            true
        },
    );
    add_message_listener(listener.as_ref().unchecked_ref());
    listener.forget();
}

/// Settings record in `chrome.storage.local`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeStorage;

impl ChromeStorage {
    async fn read(&self) -> Result<TranslatorConfig, ConfigError> {
        let key = JsValue::from_str(STORAGE_KEY);
        let promise = storage_get(&key).map_err(|e| ConfigError::Read(describe(&e)))?;
        let items = JsFuture::from(promise)
            .await
            .map_err(|e| ConfigError::Read(describe(&e)))?;
        let stored = Reflect::get(&items, &key).map_err(|e| ConfigError::Read(describe(&e)))?;
        let value: serde_json::Value = from_js(&stored).map_err(ConfigError::Read)?;
        TranslatorConfig::from_stored(value)
    }
}

#[async_trait(?Send)]
impl ConfigStore for ChromeStorage {
    async fn load(&self) -> TranslatorConfig {
        match self.read().await {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("Using default settings: {}", e);
                TranslatorConfig::default()
            }
        }
    }

    async fn save(&self, patch: &ConfigPatch) -> Result<TranslatorConfig, ConfigError> {
        let mut cfg = self.load().await;
        cfg.apply(patch);

        let record = to_js(&cfg).map_err(ConfigError::Write)?;
        let items = Object::new();
        Reflect::set(&items, &JsValue::from_str(STORAGE_KEY), &record)
            .map_err(|e| ConfigError::Write(describe(&e)))?;
        let promise = storage_set(&items).map_err(|e| ConfigError::Write(describe(&e)))?;
        JsFuture::from(promise)
            .await
            .map_err(|e| ConfigError::Write(describe(&e)))?;
        log::info!("Settings saved");
        Ok(cfg)
    }
}
