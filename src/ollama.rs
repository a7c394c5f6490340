use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static CLIENT: Lazy<reqwest::Client> = Lazy::new(build_client);

#[cfg(not(target_arch = "wasm32"))]
fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

// fetch has no client-side timeout knob
#[cfg(target_arch = "wasm32")]
fn build_client() -> reqwest::Client {
    reqwest::Client::new()
}

const TEMPERATURE: f32 = 0.3;
const NUM_PREDICT: u32 = 2048;

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation failed: {0}")]
    Status(String),
    #[error("Translation request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Translation response was malformed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaModel {
    pub name: String,
    pub model: String,
    pub modified_at: String,
    pub size: u64,
    pub digest: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {}. Only respond with the translation, no explanations:\n\n{}",
        target_language, text
    )
}

/// Thin client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(format!("http://{}:{}", host, port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when `/api/tags` answers with a success status. Never errors.
    pub async fn check_connection(&self) -> bool {
        match CLIENT.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::debug!("Ollama at {} unreachable: {}", self.base_url, e);
                false
            }
        }
    }

    /// Installed models; any failure yields an empty list.
    pub async fn list_models(&self) -> Vec<OllamaModel> {
        let resp = match CLIENT.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(resp) => resp,
            Err(e) => {
                log::debug!("Listing models failed: {}", e);
                return Vec::new();
            }
        };
        if !resp.status().is_success() {
            log::debug!("Listing models failed with status {}", resp.status());
            return Vec::new();
        }
        match resp.json::<TagsResponse>().await {
            Ok(tags) => tags.models,
            Err(e) => {
                log::warn!("Unreadable /api/tags body: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
        model: &str,
    ) -> Result<String, TranslationError> {
        let req = GenerateRequest {
            model,
            prompt: translation_prompt(text, target_language),
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: NUM_PREDICT,
            },
        };

        log::debug!(
            "Translating {} chars with model {} to {}",
            text.len(),
            model,
            target_language
        );

        let resp = CLIENT
            .post(format!("{}/api/generate", self.base_url))
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            return Err(TranslationError::Status(reason));
        }

        let body = resp.text().await?;
        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| TranslationError::Decode(e.to_string()))?;
        Ok(parsed.response.trim().to_string())
    }
}
