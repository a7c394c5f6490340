//! Messages between the page context and the privileged background context.
//!
//! Content scripts cannot reach `http://localhost:11434` themselves, so every
//! Ollama call is wrapped in a [`RelayRequest`], answered by
//! [`handle_request`] in the background, and unwrapped again by
//! [`RelayBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TranslatorConfig;
use crate::ollama::{OllamaClient, OllamaModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelayRequest {
    Translate(TranslatePayload),
    CheckConnection(Endpoint),
    ListModels(Endpoint),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn from_config(cfg: &TranslatorConfig) -> Self {
        Self {
            host: cfg.ollama_host.clone(),
            port: cfg.ollama_port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatePayload {
    pub text: String,
    pub target_language: String,
    pub model: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    fn into_data<T: for<'de> Deserialize<'de>>(self) -> Result<T, RelayError> {
        if !self.success {
            let error = self.error.unwrap_or_else(|| "Unknown error".to_string());
            return Err(RelayError::Remote(error));
        }
        let data = self.data.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| RelayError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    /// The background answered `{success: false}`.
    #[error("{0}")]
    Remote(String),
    /// The message never made it across (no receiver, context invalidated, ...).
    #[error("relay unavailable: {0}")]
    Transport(String),
    #[error("malformed relay response: {0}")]
    Malformed(String),
}

/// Background side: performs the HTTP call a request asks for.
pub async fn handle_request(request: RelayRequest) -> RelayResponse {
    match request {
        RelayRequest::Translate(p) => {
            let client = OllamaClient::new(&p.host, p.port);
            match client.translate(&p.text, &p.target_language, &p.model).await {
                Ok(text) => RelayResponse::ok(serde_json::Value::String(text)),
                Err(e) => {
                    log::warn!("Translate request failed: {}", e);
                    RelayResponse::err(e.to_string())
                }
            }
        }
        RelayRequest::CheckConnection(ep) => {
            let ok = OllamaClient::new(&ep.host, ep.port).check_connection().await;
            RelayResponse::ok(serde_json::Value::Bool(ok))
        }
        RelayRequest::ListModels(ep) => {
            let models = OllamaClient::new(&ep.host, ep.port).list_models().await;
            match serde_json::to_value(models) {
                Ok(v) => RelayResponse::ok(v),
                Err(e) => RelayResponse::err(e.to_string()),
            }
        }
    }
}

/// Carries one request to the background context and returns its answer.
#[async_trait(?Send)]
pub trait Relay {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, RelayError>;
}

/// Answers requests in-process; used where there is no separate background context.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalRelay;

#[async_trait(?Send)]
impl Relay for LocalRelay {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        Ok(handle_request(request).await)
    }
}

/// What the controller and the status surface need from the translation service.
#[async_trait(?Send)]
pub trait TranslatorBackend {
    async fn check_connection(&self, cfg: &TranslatorConfig) -> bool;
    async fn list_models(&self, cfg: &TranslatorConfig) -> Vec<OllamaModel>;
    async fn translate(
        &self,
        cfg: &TranslatorConfig,
        text: &str,
        target_language: &str,
    ) -> Result<String, RelayError>;
}

pub struct RelayBackend<R> {
    relay: R,
}

impl<R: Relay> RelayBackend<R> {
    pub fn new(relay: R) -> Self {
        Self { relay }
    }
}

#[async_trait(?Send)]
impl<R: Relay> TranslatorBackend for RelayBackend<R> {
    async fn check_connection(&self, cfg: &TranslatorConfig) -> bool {
        let request = RelayRequest::CheckConnection(Endpoint::from_config(cfg));
        match self.relay.send(request).await {
            Ok(resp) => resp.into_data::<bool>().unwrap_or(false),
            Err(e) => {
                log::debug!("Connection check not relayed: {}", e);
                false
            }
        }
    }

    async fn list_models(&self, cfg: &TranslatorConfig) -> Vec<OllamaModel> {
        let request = RelayRequest::ListModels(Endpoint::from_config(cfg));
        match self.relay.send(request).await {
            Ok(resp) => resp.into_data().unwrap_or_default(),
            Err(e) => {
                log::debug!("Model listing not relayed: {}", e);
                Vec::new()
            }
        }
    }

    async fn translate(
        &self,
        cfg: &TranslatorConfig,
        text: &str,
        target_language: &str,
    ) -> Result<String, RelayError> {
        let request = RelayRequest::Translate(TranslatePayload {
            text: text.to_string(),
            target_language: target_language.to_string(),
            model: cfg.selected_model.clone(),
            host: cfg.ollama_host.clone(),
            port: cfg.ollama_port,
        });
        self.relay.send(request).await?.into_data()
    }
}

// needs a local HTTP server
#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[test]
    fn requests_use_type_payload_shape() {
        let req = RelayRequest::Translate(TranslatePayload {
            text: "Hello".into(),
            target_language: "Spanish".into(),
            model: "llama3.2".into(),
            host: "localhost".into(),
            port: 11434,
        });
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "type": "TRANSLATE",
                "payload": {
                    "text": "Hello",
                    "targetLanguage": "Spanish",
                    "model": "llama3.2",
                    "host": "localhost",
                    "port": 11434
                }
            })
        );

        let parsed: RelayRequest = serde_json::from_value(json!({
            "type": "CHECK_CONNECTION",
            "payload": { "host": "127.0.0.1", "port": 8080 }
        }))
        .unwrap();
        assert_eq!(
            parsed,
            RelayRequest::CheckConnection(Endpoint {
                host: "127.0.0.1".into(),
                port: 8080
            })
        );
    }

    #[test]
    fn responses_keep_success_flag() {
        assert_eq!(
            serde_json::to_value(RelayResponse::ok(json!("Hola"))).unwrap(),
            json!({ "success": true, "data": "Hola" })
        );
        assert_eq!(
            serde_json::to_value(RelayResponse::err("boom")).unwrap(),
            json!({ "success": false, "error": "boom" })
        );
        let parsed: RelayResponse =
            serde_json::from_value(json!({ "success": false, "error": "Not Found" })).unwrap();
        assert_eq!(parsed, RelayResponse::err("Not Found"));
    }

    #[test]
    fn remote_error_surfaces_message() {
        let err = RelayResponse::err("Translation failed: Not Found")
            .into_data::<String>()
            .unwrap_err();
        assert_eq!(err.to_string(), "Translation failed: Not Found");
    }

    fn config_for(server: &MockServer) -> TranslatorConfig {
        let addr = server.address();
        TranslatorConfig {
            ollama_host: addr.ip().to_string(),
            ollama_port: addr.port(),
            selected_model: "llama3.2".into(),
            ..TranslatorConfig::default()
        }
    }

    #[tokio::test]
    async fn local_relay_round_trips_a_translation() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hallo\n" })))
            .mount(&server)
            .await;

        let backend = RelayBackend::new(LocalRelay);
        let out = backend
            .translate(&config_for(&server), "Hello", "German")
            .await
            .unwrap();
        assert_eq!(out, "Hallo");
    }

    #[tokio::test]
    async fn local_relay_reports_remote_failure() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = RelayBackend::new(LocalRelay);
        let err = backend
            .translate(&config_for(&server), "Hello", "German")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Remote(ref m) if m.contains("Internal Server Error")));
    }

    #[tokio::test]
    async fn connection_and_models_through_relay() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "models": [{ "name": "phi3" }] })),
            )
            .mount(&server)
            .await;

        let backend = RelayBackend::new(LocalRelay);
        let cfg = config_for(&server);
        assert!(backend.check_connection(&cfg).await);
        let models = backend.list_models(&cfg).await;
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "phi3");
    }

    #[tokio::test]
    async fn unreachable_service_through_relay() {
        let backend = RelayBackend::new(LocalRelay);
        let cfg = TranslatorConfig {
            ollama_host: "127.0.0.1".into(),
            ollama_port: 9,
            ..TranslatorConfig::default()
        };
        assert!(!backend.check_connection(&cfg).await);
        assert!(backend.list_models(&cfg).await.is_empty());
    }
}
