use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::PathBuf;
use thiserror::Error;

/// Key the record is stored under in extension storage.
pub const STORAGE_KEY: &str = "ollama-translator-config";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 11434;

pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("nl", "Dutch"),
    ("pl", "Polish"),
    ("tr", "Turkish"),
    ("vi", "Vietnamese"),
    ("th", "Thai"),
    ("sv", "Swedish"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("no", "Norwegian"),
    ("cs", "Czech"),
    ("el", "Greek"),
    ("he", "Hebrew"),
    ("hu", "Hungarian"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("ro", "Romanian"),
    ("sk", "Slovak"),
    ("uk", "Ukrainian"),
];

/// Display name for a language code, if the code is one we offer.
pub fn language_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),
    #[error("failed to write config: {0}")]
    Write(String),
    #[error("invalid config record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported language code {0:?}")]
    UnknownLanguage(String),
    #[error("Ollama host must not be empty")]
    EmptyHost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranslatorConfig {
    pub ollama_host: String,
    pub ollama_port: u16,
    pub selected_model: String,
    /// Language selections are translated into.
    pub read_language: String,
    /// Language text typed into fields is translated into.
    pub write_language: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            ollama_host: DEFAULT_HOST.to_string(),
            ollama_port: DEFAULT_PORT,
            selected_model: String::new(),
            read_language: "es".to_string(),
            write_language: "en".to_string(),
        }
    }
}

impl TranslatorConfig {
    pub fn has_model(&self) -> bool {
        !self.selected_model.trim().is_empty()
    }

    pub fn read_language_name(&self) -> &'static str {
        language_name(&self.read_language).unwrap_or("Spanish")
    }

    pub fn write_language_name(&self) -> &'static str {
        language_name(&self.write_language).unwrap_or("English")
    }

    /// Parses a stored record; missing or null fields fall back to defaults.
    pub fn from_stored(value: serde_json::Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(v) = &patch.ollama_host {
            self.ollama_host = v.clone();
        }
        if let Some(v) = patch.ollama_port {
            self.ollama_port = v;
        }
        if let Some(v) = &patch.selected_model {
            self.selected_model = v.clone();
        }
        if let Some(v) = &patch.read_language {
            self.read_language = v.clone();
        }
        if let Some(v) = &patch.write_language {
            self.write_language = v.clone();
        }
    }
}

/// Partial update merged over the current record on save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_language: Option<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Rejects values no settings surface should be able to store.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ollama_host.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConfigError::EmptyHost);
        }
        for code in [&self.read_language, &self.write_language].into_iter().flatten() {
            if language_name(code).is_none() {
                return Err(ConfigError::UnknownLanguage(code.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait(?Send)]
pub trait ConfigStore {
    /// Current record merged over defaults. Never fails: unreadable storage yields defaults.
    async fn load(&self) -> TranslatorConfig;

    /// Merges `patch` over the current record, persists and returns it.
    async fn save(&self, patch: &ConfigPatch) -> Result<TranslatorConfig, ConfigError>;
}

/// `config.json` next to the executable.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn beside_exe() -> Self {
        Self::new(crate::logger::exe_dir().join("config.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read(&self) -> Result<TranslatorConfig, ConfigError> {
        let s = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let value: serde_json::Value = serde_json::from_str(&s)?;
        TranslatorConfig::from_stored(value)
    }
}

#[async_trait(?Send)]
impl ConfigStore for FileConfigStore {
    async fn load(&self) -> TranslatorConfig {
        match self.read() {
            Ok(cfg) => cfg,
            Err(e) => {
                log::debug!("Using default config ({}): {}", self.path.display(), e);
                TranslatorConfig::default()
            }
        }
    }

    async fn save(&self, patch: &ConfigPatch) -> Result<TranslatorConfig, ConfigError> {
        let mut cfg = self.load().await;
        cfg.apply(patch);
        let s = serde_json::to_string_pretty(&cfg)?;
        std::fs::write(&self.path, s).map_err(|e| ConfigError::Write(e.to_string()))?;
        log::info!("Config saved to {}", self.path.display());
        Ok(cfg)
    }
}

/// In-process store, used by tests and as a scratch store.
#[derive(Default)]
pub struct MemoryConfigStore {
    current: RefCell<TranslatorConfig>,
}

impl MemoryConfigStore {
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            current: RefCell::new(config),
        }
    }
}

#[async_trait(?Send)]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> TranslatorConfig {
        self.current.borrow().clone()
    }

    async fn save(&self, patch: &ConfigPatch) -> Result<TranslatorConfig, ConfigError> {
        let mut cur = self.current.borrow_mut();
        cur.apply(patch);
        Ok(cur.clone())
    }
}
