//! Connection status and model list, as shown on the settings surfaces.

use serde::Serialize;
use std::fmt;

use crate::config::TranslatorConfig;
use crate::ollama::OllamaModel;
use crate::relay::TranslatorBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Checking,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionStatus::Checking => "Checking",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Offline",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PopupState {
    pub status: ConnectionStatus,
    pub models: Vec<OllamaModel>,
}

impl PopupState {
    pub async fn refresh<B: TranslatorBackend + ?Sized>(&mut self, backend: &B, cfg: &TranslatorConfig) {
        self.status = ConnectionStatus::Checking;
        self.models.clear();

        if backend.check_connection(cfg).await {
            self.status = ConnectionStatus::Connected;
            self.models = backend.list_models(cfg).await;
            log::info!(
                "Ollama reachable at {}:{} with {} models",
                cfg.ollama_host,
                cfg.ollama_port,
                self.models.len()
            );
        } else {
            self.status = ConnectionStatus::Disconnected;
            log::warn!("Ollama not reachable at {}:{}", cfg.ollama_host, cfg.ollama_port);
        }
    }

    /// Hints for the user, most important first.
    pub fn warnings(&self, cfg: &TranslatorConfig) -> Vec<String> {
        let mut out = Vec::new();
        match self.status {
            ConnectionStatus::Disconnected => out.push(format!(
                "Ollama not running on {}:{}",
                cfg.ollama_host, cfg.ollama_port
            )),
            ConnectionStatus::Connected if !cfg.has_model() => {
                out.push(crate::controller::MSG_NO_MODEL.to_string())
            }
            ConnectionStatus::Connected if self.model(&cfg.selected_model).is_none() => out.push(
                format!("Model {} is not installed", cfg.selected_model),
            ),
            _ => {}
        }
        out
    }

    pub fn model(&self, name: &str) -> Option<&OllamaModel> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// One installed model as listed on the settings page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub name: String,
    pub size: String,
    pub selected: bool,
}

/// Everything the settings page renders after a refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub status_label: String,
    pub models: Vec<ModelEntry>,
    pub warnings: Vec<String>,
    pub config: TranslatorConfig,
}

impl StatusReport {
    pub fn new(state: &PopupState, config: TranslatorConfig) -> Self {
        let models = state
            .models
            .iter()
            .map(|m| ModelEntry {
                name: m.name.clone(),
                size: format_size(m.size),
                selected: m.name == config.selected_model,
            })
            .collect();
        Self {
            status: state.status,
            status_label: state.status.to_string(),
            models,
            warnings: state.warnings(&config),
            config,
        }
    }
}

/// Human-readable model size: one decimal in GB, whole MB below that.
pub fn format_size(bytes: u64) -> String {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    if gb >= 1.0 {
        format!("{:.1} GB", gb)
    } else {
        format!("{:.0} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
